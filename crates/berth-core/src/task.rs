//! Deployment tasks with paired forward and reverse operations.

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::TaskError;
use crate::properties::PropertySet;
use crate::reference::ObjectReference;
use crate::registry::OfferRegistry;

/// What a successful `revert` actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    /// The task's effect was undone
    Reverted,
    /// Nothing to undo; the effect was already gone
    AlreadyAbsent,
    /// Undo failed and the failure was logged instead of raised
    Abandoned,
}

/// Creates a single directory.
#[derive(Debug, Clone)]
pub struct DirectoryTask {
    path: PathBuf,
}

impl DirectoryTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fails if the directory exists or its parent is missing.
    pub fn apply(&self) -> Result<(), TaskError> {
        fs::create_dir(&self.path).map_err(|e| TaskError::fs("create directory", &self.path, e))
    }

    /// Fails if the directory is missing or not empty.
    pub fn revert(&self) -> Result<RevertOutcome, TaskError> {
        fs::remove_dir(&self.path)
            .map(|()| RevertOutcome::Reverted)
            .map_err(|e| TaskError::fs("remove directory", &self.path, e))
    }
}

/// Writes a property set to a configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFileTask {
    path: PathBuf,
    properties: PropertySet,
}

impl ConfigFileTask {
    pub fn new(path: impl Into<PathBuf>, properties: PropertySet) -> Self {
        Self {
            path: path.into(),
            properties,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    pub(crate) fn bind_properties(&mut self, properties: PropertySet) {
        self.properties = properties;
    }

    pub fn apply(&self) -> Result<(), TaskError> {
        let file = File::create(&self.path)
            .map_err(|e| TaskError::fs("create configuration file", &self.path, e))?;
        self.properties
            .write_to(BufWriter::new(file))
            .map_err(|e| TaskError::fs("write configuration file", &self.path, e))
    }

    pub fn revert(&self) -> Result<RevertOutcome, TaskError> {
        fs::remove_file(&self.path)
            .map(|()| RevertOutcome::Reverted)
            .map_err(|e| TaskError::fs("remove configuration file", &self.path, e))
    }
}

/// Advertises an object reference under an offer name.
#[derive(Debug, Clone)]
pub struct RegistryOfferTask {
    offer: String,
    reference: ObjectReference,
    registry: Arc<dyn OfferRegistry>,
}

impl RegistryOfferTask {
    pub fn new(
        offer: impl Into<String>,
        reference: ObjectReference,
        registry: Arc<dyn OfferRegistry>,
    ) -> Self {
        Self {
            offer: offer.into(),
            reference,
            registry,
        }
    }

    pub fn offer(&self) -> &str {
        &self.offer
    }

    pub fn reference(&self) -> &ObjectReference {
        &self.reference
    }

    pub fn apply(&self) -> Result<(), TaskError> {
        self.registry.add(&self.offer, &self.reference)?;
        Ok(())
    }

    /// Never fails: registry errors are logged and reported in the outcome.
    pub fn revert(&self) -> Result<RevertOutcome, TaskError> {
        match self.registry.remove(&self.offer, &self.reference) {
            Ok(()) => Ok(RevertOutcome::Reverted),
            Err(e) if e.is_not_found() => {
                tracing::info!(offer = %self.offer, "offer already removed from registry");
                Ok(RevertOutcome::AlreadyAbsent)
            }
            Err(e) => {
                tracing::warn!(
                    offer = %self.offer,
                    reference = %self.reference,
                    error = %e,
                    "failed to remove offer from registry"
                );
                Ok(RevertOutcome::Abandoned)
            }
        }
    }
}

/// One step of a deployment plan.
#[derive(Debug, Clone)]
pub enum Task {
    Directory(DirectoryTask),
    ConfigFile(ConfigFileTask),
    RegistryOffer(RegistryOfferTask),
}

impl Task {
    pub fn apply(&self) -> Result<(), TaskError> {
        match self {
            Task::Directory(task) => task.apply(),
            Task::ConfigFile(task) => task.apply(),
            Task::RegistryOffer(task) => task.apply(),
        }
    }

    pub fn revert(&self) -> Result<RevertOutcome, TaskError> {
        match self {
            Task::Directory(task) => task.revert(),
            Task::ConfigFile(task) => task.revert(),
            Task::RegistryOffer(task) => task.revert(),
        }
    }

    /// Short name of the variant, used in listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Directory(_) => "directory",
            Task::ConfigFile(_) => "configfile",
            Task::RegistryOffer(_) => "offer",
        }
    }

    /// Path or reference the task acts on.
    pub fn target(&self) -> String {
        match self {
            Task::Directory(task) => task.path().display().to_string(),
            Task::ConfigFile(task) => task.path().display().to_string(),
            Task::RegistryOffer(task) => task.reference().to_string(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Directory(task) => write!(f, "create directory {}", task.path().display()),
            Task::ConfigFile(task) => {
                write!(f, "generate configuration {}", task.path().display())
            }
            Task::RegistryOffer(task) => {
                write!(f, "register offer '{}' -> {}", task.offer(), task.reference())
            }
        }
    }
}

impl From<DirectoryTask> for Task {
    fn from(task: DirectoryTask) -> Self {
        Task::Directory(task)
    }
}

impl From<ConfigFileTask> for Task {
    fn from(task: ConfigFileTask) -> Self {
        Task::ConfigFile(task)
    }
}

impl From<RegistryOfferTask> for Task {
    fn from(task: RegistryOfferTask) -> Self {
        Task::RegistryOffer(task)
    }
}
