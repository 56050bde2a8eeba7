/// Result alias that carries the custom [`MusicConfigError`] type.
pub type Result<T> = std::result::Result<T, MusicConfigError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MusicConfigError {
    /// Free-form failure message.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The document could not be encoded or decoded.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
    /// A mutation targeted an entry that does not exist.
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },
    /// A user-entered value could not be coerced for the named field.
    #[error("invalid value `{value}` for {field}")]
    InvalidValue { field: String, value: String },
    /// A field name that is not editable.
    #[error("unknown field `{0}`")]
    UnknownField(String),
}

impl MusicConfigError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
