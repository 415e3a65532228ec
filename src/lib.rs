pub mod config;
pub mod correction;
pub mod errors;
pub mod events;
pub mod mechanisms;
pub mod output;
pub mod util;

pub use errors::NoiseCorrectionError;
