pub mod log_util;
pub mod serde_util;
