//! Berth Core Library
//!
//! Turns a component descriptor into an ordered plan of deployment tasks
//! (directories, generated configuration files, registry offers), applies it
//! with rollback on failure, and tears it down again.

pub mod deployer;
pub mod descriptor;
pub mod error;
pub mod plan;
pub mod properties;
pub mod reference;
pub mod registry;
pub mod settings;
pub mod substitute;
pub mod task;

/// Re-exports of commonly used types
pub mod prelude {
    // Deployment
    pub use crate::deployer::{
        DeployReport, Deployer, DeployerConfig, Deployment, RevertFailure, UndeployReport,
    };
    pub use crate::plan::Plan;
    pub use crate::task::{
        ConfigFileTask, DirectoryTask, RegistryOfferTask, RevertOutcome, Task,
    };

    // Descriptor
    pub use crate::descriptor::{
        Attributes, DescriptorEvent, Severity, TomlDescriptor, read_descriptor,
    };

    // Values
    pub use crate::properties::PropertySet;
    pub use crate::reference::ObjectReference;
    pub use crate::substitute::{VariableTable, expand};

    // Registry
    pub use crate::registry::{FileRegistry, OfferRegistry, RegistryError};

    // Errors
    pub use crate::error::{DeployError, SubstitutionError, TaskError, ValidationError};

    // Settings
    pub use crate::settings::Settings;
}
