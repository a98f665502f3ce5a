//! Offer registry persisted as a JSON document.
//!
//! Every call loads, modifies and saves the document. Saves go through a
//! temporary file and a rename so readers never observe a partial write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OfferRegistry, RegistryError};
use crate::reference::ObjectReference;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferEntry {
    pub reference: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OfferDocument {
    #[serde(default)]
    offers: BTreeMap<String, Vec<OfferEntry>>,
}

/// Registry backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All registered offers, keyed by offer name.
    pub fn list(&self) -> Result<BTreeMap<String, Vec<OfferEntry>>, RegistryError> {
        Ok(self.load()?.offers)
    }

    fn load(&self) -> Result<OfferDocument, RegistryError> {
        if !self.path.exists() {
            return Ok(OfferDocument::default());
        }
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, document: &OfferDocument) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl OfferRegistry for FileRegistry {
    fn add(&self, offer: &str, reference: &ObjectReference) -> Result<(), RegistryError> {
        let mut document = self.load()?;
        let reference = reference.to_string();
        let entries = document.offers.entry(offer.to_string()).or_default();
        if entries.iter().any(|e| e.reference == reference) {
            return Err(RegistryError::AlreadyRegistered {
                offer: offer.to_string(),
                reference,
            });
        }
        entries.push(OfferEntry {
            reference,
            registered_at: Utc::now(),
        });
        self.save(&document)
    }

    fn remove(&self, offer: &str, reference: &ObjectReference) -> Result<(), RegistryError> {
        let mut document = self.load()?;
        let reference = reference.to_string();
        let not_found = || RegistryError::OfferNotFound {
            offer: offer.to_string(),
        };

        let entries = document.offers.get_mut(offer).ok_or_else(not_found)?;
        let before = entries.len();
        entries.retain(|e| e.reference != reference);
        if entries.len() == before {
            return Err(not_found());
        }
        if entries.is_empty() {
            document.offers.remove(offer);
        }
        self.save(&document)
    }
}
