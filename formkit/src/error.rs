//! Error types for the form definition model

use thiserror::Error;

/// Result type for form model operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Coarse classification of a [`FormError`].
///
/// Embedding callers branch on the kind rather than on individual variants,
/// which carry context for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IdentifierInvalid,
    DuplicateIdentifier,
    NotFound,
    ConsistencyViolation,
    TypeDefinitionInvalid,
    TypeNotFound,
    TypeHierarchyInvalid,
    FinisherPresetNotFound,
    ValidatorPresetNotFound,
    PresetNotFound,
    Settings,
}

/// Errors raised while assembling or mutating a form definition
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormError {
    /// Identifier missing, not a string, or empty
    #[error("invalid identifier: {message}")]
    IdentifierInvalid { message: String },

    /// Two elements share an identifier under one definition
    #[error("duplicate form element identifier: {identifier}")]
    DuplicateIdentifier { identifier: String },

    /// Page index out of bounds
    #[error("no page with index {index} (form has {count} pages)")]
    PageNotFound { index: usize, count: usize },

    /// Tree ownership rule broken (re-parenting, cross-parent moves, foreign removal)
    #[error("form definition consistency violated: {message}")]
    ConsistencyViolation { message: String },

    /// Merged type definition or option map carries an unrecognized key
    #[error("type definition '{type_name}' is not valid: {message}")]
    TypeDefinitionInvalid { type_name: String, message: String },

    /// Type name absent from the registry
    #[error("type definition not found: {type_name}")]
    TypeNotFound { type_name: String },

    /// Type resolves but cannot be instantiated
    #[error("type '{type_name}' has no usable implementation: {message}")]
    ImplementationNotFound { type_name: String, message: String },

    /// Renderable entry declares no type
    #[error("renderable '{identifier}' declares no type")]
    MissingType { identifier: String },

    /// Supertype chain loops back on itself
    #[error("cyclic type hierarchy: {}", chain.join(" -> "))]
    CyclicTypeHierarchy { chain: Vec<String> },

    /// Finisher preset missing or without implementation
    #[error("finisher preset not found: {name} ({message})")]
    FinisherPresetNotFound { name: String, message: String },

    /// Validator preset missing or without implementation
    #[error("validator preset not found: {name} ({message})")]
    ValidatorPresetNotFound { name: String, message: String },

    /// Settings preset missing or inheriting in a cycle
    #[error("form preset not found: {name}")]
    PresetNotFound { name: String },

    /// Preset settings could not be loaded
    #[error("settings error: {0}")]
    Settings(#[from] figment::Error),
}

impl FormError {
    /// The caller-facing classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormError::IdentifierInvalid { .. } => ErrorKind::IdentifierInvalid,
            FormError::DuplicateIdentifier { .. } => ErrorKind::DuplicateIdentifier,
            FormError::PageNotFound { .. } => ErrorKind::NotFound,
            FormError::ConsistencyViolation { .. } => ErrorKind::ConsistencyViolation,
            FormError::TypeDefinitionInvalid { .. } => ErrorKind::TypeDefinitionInvalid,
            FormError::TypeNotFound { .. }
            | FormError::ImplementationNotFound { .. }
            | FormError::MissingType { .. } => ErrorKind::TypeNotFound,
            FormError::CyclicTypeHierarchy { .. } => ErrorKind::TypeHierarchyInvalid,
            FormError::FinisherPresetNotFound { .. } => ErrorKind::FinisherPresetNotFound,
            FormError::ValidatorPresetNotFound { .. } => ErrorKind::ValidatorPresetNotFound,
            FormError::PresetNotFound { .. } => ErrorKind::PresetNotFound,
            FormError::Settings(_) => ErrorKind::Settings,
        }
    }

    pub(crate) fn consistency(message: impl Into<String>) -> Self {
        FormError::ConsistencyViolation {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_identifier(message: impl Into<String>) -> Self {
        FormError::IdentifierInvalid {
            message: message.into(),
        }
    }
}

/// Reject empty identifiers.
pub(crate) fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(FormError::invalid_identifier("identifier must not be empty"));
    }
    Ok(())
}
