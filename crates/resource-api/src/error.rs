//! Error types for the resource-api crate

use thiserror::Error;

/// Errors raised while defining, registering or validating resource types
#[derive(Error, Debug)]
pub enum Error {
    /// A type expression could not be parsed
    #[error("invalid type expression `{expr}`: {message}")]
    TypeParse { expr: String, message: String },

    /// An attribute of a definition carries an unusable type
    #[error("{type_name}.{attribute} has an invalid type: {source}")]
    AttributeType {
        type_name: String,
        attribute: String,
        #[source]
        source: Box<Error>,
    },

    /// An attribute default does not match the attribute's type
    #[error("{type_name}.{attribute} has an invalid default: {message}")]
    InvalidDefault {
        type_name: String,
        attribute: String,
        message: String,
    },

    /// A definition has no namevar attribute
    #[error("{0} has no namevar")]
    NoNamevar(String),

    /// A definition declares more than one namevar
    #[error("{type_name} declares more than one namevar: {first}, {second}")]
    MultipleNamevars {
        type_name: String,
        first: String,
        second: String,
    },

    /// A type with this name was already registered
    #[error("resource type {0} is already defined")]
    AlreadyDefined(String),

    /// No type with this name was registered
    #[error("unknown resource type: {0}")]
    UnknownType(String),

    /// The type already has a provider attached
    #[error("resource type {0} already has a provider")]
    AlreadyImplemented(String),

    /// The type has no provider attached
    #[error("resource type {0} has no provider implementation")]
    NotImplemented(String),

    /// A resource hash failed validation against its type
    #[error("{resource}: {message}")]
    Validation { resource: String, message: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

/// Result type for resource-api operations
pub type Result<T> = std::result::Result<T, Error>;
