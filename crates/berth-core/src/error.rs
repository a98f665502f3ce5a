//! Error types for berth-core

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::reference::ReferenceError;
use crate::registry::RegistryError;

/// Errors raised while expanding `${name}` tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    /// A `${` was opened but never closed
    #[error("malformed variable token in: {input}")]
    MalformedToken {
        /// The raw input as given to the substitutor
        input: String,
    },

    /// A token references a name missing from the variable table
    #[error("unknown variable '{name}' in: {input}")]
    UnknownVariable {
        /// Name inside the token
        name: String,
        /// The raw input as given to the substitutor
        input: String,
    },

    /// Values kept expanding into further tokens past the nesting limit
    #[error("variable expansion nested deeper than {limit} levels (cyclic definition?) in: {input}")]
    CyclicVariable {
        /// The raw input as given to the substitutor
        input: String,
        /// Nesting limit that was hit
        limit: usize,
    },
}

/// Recoverable problems found while reducing descriptor events.
///
/// These are collected rather than raised; a non-empty collection rejects the
/// descriptor once the event stream ends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required attribute missing on an element
    #[error("element '{element}' is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: String,
    },

    /// Element requires non-empty text content
    #[error("element '{element}' has no content")]
    MissingContent { element: String },

    /// Descriptor tried to redefine a reserved variable
    #[error("variable '{name}' is reserved and cannot be redefined")]
    ReservedVariable { name: String },

    /// Path escapes the data root
    #[error("path '{path}' must not contain '..' components")]
    PathTraversal { path: String },

    /// Offer declared but no registry handle was configured
    #[error("registry not configured, can't register offer '{offer}'")]
    RegistryNotConfigured { offer: String },

    /// Offer target does not parse as an object reference
    #[error("invalid object reference '{reference}' for offer '{offer}': {source}")]
    InvalidReference {
        offer: String,
        reference: String,
        #[source]
        source: ReferenceError,
    },
}

/// Failure of a single task's `apply` or `revert`.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Filesystem call failed
    #[error("can't {action} {}: {source}", path.display())]
    FileSystem {
        /// What the task was doing (e.g. "create directory")
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Registry call failed
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl TaskError {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        TaskError::FileSystem {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Top-level errors of the deployer.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Substitution failed while handling a descriptor event
    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    /// Descriptor was rejected after parsing; the plan is unusable
    #[error(
        "descriptor rejected: {} validation error(s), {document_errors} document error(s)",
        validation_errors.len()
    )]
    InvalidDescriptor {
        /// Every validation problem, in descriptor order
        validation_errors: Vec<ValidationError>,
        /// Errors reported by the document parser or the element reducer
        document_errors: usize,
    },

    /// A task failed to apply; earlier tasks were rolled back
    #[error("deployment failed at task {index} ({task}): {source}")]
    DeploymentFailed {
        /// Plan index of the failing task
        index: usize,
        /// Description of the failing task
        task: String,
        #[source]
        source: TaskError,
    },
}

impl DeployError {
    /// Check if the error came from the forward pass of `deploy()`
    #[must_use]
    pub fn is_apply_failure(&self) -> bool {
        matches!(self, DeployError::DeploymentFailed { .. })
    }
}
