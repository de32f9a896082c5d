//! Pass-through optimizer options.
//!
//! Strategies forward an [`OptimizerOptions`] map untouched; each optimizer
//! parses it into its own config struct, rejecting keys it does not know.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Result, SymfitError};

/// Keyword options forwarded verbatim to the optimizer.
pub type OptimizerOptions = Map<String, Value>;

/// Deserialize `options` into a config type.
///
/// Config types use `#[serde(default, deny_unknown_fields)]`, so missing keys
/// keep their defaults and unknown keys are an `InvalidOption` error.
pub fn parse_options<T: DeserializeOwned>(options: &OptimizerOptions) -> Result<T> {
    serde_json::from_value(Value::Object(options.clone()))
        .map_err(|e| SymfitError::InvalidOption(e.to_string()))
}

/// Build an options map from `(key, value)` pairs.
///
/// ```
/// let options = symfit_rs::options::options([("max_iterations", 50.into())]);
/// assert_eq!(options["max_iterations"], 50);
/// ```
pub fn options<I, K>(pairs: I) -> OptimizerOptions
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
