//! Discovery registry seam.
//!
//! Offers are advertised through an [`OfferRegistry`]. The deployer only needs
//! `add` and `remove`; how the registry is reached is up to the implementation.

pub mod file;

use std::fmt;

use thiserror::Error;

use crate::reference::ObjectReference;

pub use file::{FileRegistry, OfferEntry};

#[derive(Error, Debug)]
pub enum RegistryError {
    /// No offer with this name and reference is registered
    #[error("no such offer: {offer}")]
    OfferNotFound { offer: String },

    /// The same offer/reference pair is already registered
    #[error("offer '{offer}' is already registered for {reference}")]
    AlreadyRegistered { offer: String, reference: String },

    /// Registry could not be reached or its backing store failed
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry data is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

impl RegistryError {
    /// An offer that is already gone needs no removal.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::OfferNotFound { .. })
    }
}

/// Client of the external offer registry.
///
/// Calls are blocking and carry no timeout of their own.
pub trait OfferRegistry: Send + Sync + fmt::Debug {
    fn add(&self, offer: &str, reference: &ObjectReference) -> Result<(), RegistryError>;
    fn remove(&self, offer: &str, reference: &ObjectReference) -> Result<(), RegistryError>;
}
