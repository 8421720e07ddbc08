//! Error types for binding generation

use thiserror::Error;

/// Errors raised while turning interface descriptors into bindings.
///
/// Every variant is terminal for the whole batch: the generator never returns
/// partial output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The interface text does not follow the ABI grammar
    #[error("malformed descriptor for {contract}{}: {fragment}", index.map(|i| format!(" (entry {})", i)).unwrap_or_default())]
    MalformedDescriptor {
        contract: String,
        index: Option<usize>,
        fragment: String,
    },

    /// A parameter type string matches no known production
    #[error("unsupported type: {raw}")]
    UnsupportedType { raw: String },

    /// The parallel input slices differ in length
    #[error("arity mismatch: {names} type names, {abis} ABIs, {bins} bytecodes")]
    ArityMismatch { names: usize, abis: usize, bins: usize },

    /// Two events of one contract export the same name with different signatures
    #[error("duplicate event name {name} in {contract}")]
    DuplicateEventName { contract: String, name: String },

    /// Two contracts of the batch bind to the same Rust type name
    #[error("duplicate contract {name} in batch")]
    DuplicateContract { name: String },

    /// A package or contract name cannot be used as a Rust identifier
    #[error("invalid identifier: {name:?}")]
    InvalidIdentifier { name: String },
}

impl BindError {
    pub(crate) fn malformed(contract: &str, index: Option<usize>, fragment: impl Into<String>) -> Self {
        BindError::MalformedDescriptor {
            contract: contract.to_string(),
            index,
            fragment: fragment.into(),
        }
    }

    pub(crate) fn unsupported(raw: impl Into<String>) -> Self {
        BindError::UnsupportedType { raw: raw.into() }
    }
}

/// Result type for binding generation
pub type Result<T> = std::result::Result<T, BindError>;
