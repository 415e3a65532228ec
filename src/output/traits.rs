use super::value::Output;
use crate::{config::ApiConfig, errors::Result};

/// Produces the output space of an API configuration.
pub trait OutputSpaceEnumerator {
    /// Returns every distinct output of `config` exactly once. The order is
    /// unspecified, but two enumerators must agree on the resulting set.
    fn enumerate(&self, config: &ApiConfig) -> Result<Vec<Output>>;
}
