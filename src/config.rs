/*!
# Configuration errors
All component configs are immutable values built with `derive_builder`.
Their `build()` functions validate eagerly and return a `ConfigurationError`, so a bad setting fails before any input is read.
*/

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigurationError {
    #[error("score field name must not be empty")]
    EmptyScoreField,
    #[error("score threshold must be a finite number, found {0}")]
    InvalidThreshold(f64),
    #[error("max display must be > 0")]
    ZeroMaxDisplay,
    #[error("max checked annotations must be > 0")]
    ZeroMaxChecked,
    #[error("{0} label must not be empty")]
    EmptyLabel(&'static str),
    #[error("{0}")]
    UninitializedField(String)
}

impl From<derive_builder::UninitializedFieldError> for ConfigurationError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        ConfigurationError::UninitializedField(e.to_string())
    }
}
