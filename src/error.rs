use thiserror::Error;

/// Errors raised while binding keyword values to a model's symbols.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    /// A variable or non-fixed parameter was not supplied.
    #[error("No value bound for '{name}'")]
    Missing { name: String },

    /// A keyword does not name any symbol of the model.
    #[error("'{name}' is not a symbol of this model")]
    Unknown { name: String },

    /// The same keyword was bound twice.
    #[error("'{name}' was bound more than once")]
    Duplicate { name: String },
}

/// Error types for the symfit-rs library.
#[derive(Error, Debug)]
pub enum SymfitError {
    /// Invalid construction of a parameter, model or strategy.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing, unknown or duplicated keyword binding.
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// A constraint relation that no numerical optimizer can express.
    #[error("Unsupported constraint: {0}")]
    UnsupportedConstraint(String),

    /// Lookup of an argument that is not part of the fit results.
    #[error("No such parameter: {0}")]
    NoSuchParameter(String),

    /// A statistic the producing strategy does not compute.
    #[error("Statistic '{statistic}' is not available for {strategy} fits")]
    UnsupportedStatistic {
        statistic: &'static str,
        strategy: &'static str,
    },

    /// Error indicating a mismatch in array or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The symbolic engine rejected an expression.
    #[error("Symbolic engine error: {0}")]
    Symbolic(#[from] symb_anafis::DiffError),

    /// Error while parsing an expression string.
    #[error("Failed to parse expression: {0}")]
    Parse(String),

    /// An optimizer option that the optimizer does not understand.
    #[error("Invalid optimizer option: {0}")]
    InvalidOption(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// Error during function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for symfit-rs operations.
pub type Result<T> = std::result::Result<T, SymfitError>;
