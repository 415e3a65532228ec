pub mod input;
pub mod join;
pub mod report;
pub mod source;
