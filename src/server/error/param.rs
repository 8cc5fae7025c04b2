use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    /// The parameter key is absent from its source and no default was given.
    ///
    /// A key present with an empty or null value is not missing.
    #[error("Missing required parameter: {0}")]
    Missing(String),

    /// The parameter was found but the coercion function rejected it.
    #[error("Invalid parameter {name}: {reason}")]
    Coercion {
        /// Name of the parameter that failed to coerce
        name: String,
        /// Coercion failure description
        reason: String,
    },
}
