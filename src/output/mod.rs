pub mod combinatorics;
pub mod enumerator;
pub mod traits;
pub mod value;

pub use enumerator::{
    output_space, OutputSpaceIter, RecursiveEnumerator, StarsAndBarsEnumerator,
    MAX_ENUMERATED_OUTPUTS,
};
pub use traits::OutputSpaceEnumerator;
pub use value::{Output, ReportSlot};
