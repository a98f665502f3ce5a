//! Descriptor reduction and plan execution.
//!
//! A [`Deployer`] is built for one descriptor. [`Deployer::parse`] consumes it
//! together with the descriptor's events and yields a [`Deployment`] only when
//! the descriptor validated cleanly. The deployment then applies its plan with
//! [`Deployment::deploy`] (rolling back on the first failure) or tears it down
//! with [`Deployment::undeploy`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::descriptor::{Attributes, DescriptorEvent, DescriptorHandler, EventReducer, Severity};
use crate::error::{DeployError, SubstitutionError, TaskError, ValidationError};
use crate::plan::Plan;
use crate::properties::PropertySet;
use crate::reference::ObjectReference;
use crate::registry::OfferRegistry;
use crate::substitute::{DATADIR, VariableTable};
use crate::task::{ConfigFileTask, DirectoryTask, RegistryOfferTask, RevertOutcome, Task};

/// Immutable environment a deployer runs in.
#[derive(Clone)]
pub struct DeployerConfig {
    data_dir: PathBuf,
    registry: Option<Arc<dyn OfferRegistry>>,
    variables: BTreeMap<String, String>,
}

impl DeployerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            registry: None,
            variables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn OfferRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Seed an extra variable. `datadir` is always taken from the data root.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn registry(&self) -> Option<&Arc<dyn OfferRegistry>> {
        self.registry.as_ref()
    }
}

impl fmt::Debug for DeployerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployerConfig")
            .field("data_dir", &self.data_dir)
            .field("registry", &self.registry.is_some())
            .field("variables", &self.variables)
            .finish()
    }
}

/// Reduces descriptor events into a plan.
#[derive(Debug)]
pub struct Deployer {
    config: DeployerConfig,
    variables: VariableTable,
    properties: PropertySet,
    plan: Plan,
    validation_errors: Vec<ValidationError>,
    document_errors: usize,
}

impl Deployer {
    pub fn new(config: DeployerConfig) -> Self {
        let mut variables: VariableTable = config.variables.clone().into_iter().collect();
        variables.set(DATADIR, config.data_dir.to_string_lossy());

        Self {
            config,
            variables,
            properties: PropertySet::new(),
            plan: Plan::new(),
            validation_errors: Vec::new(),
            document_errors: 0,
        }
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Consume the descriptor's events and build the deployment.
    ///
    /// Substitution errors abort immediately. Validation problems and parser
    /// errors are collected; if any occurred the descriptor is rejected once
    /// the stream ends.
    pub fn parse<I>(mut self, events: I) -> Result<Deployment, DeployError>
    where
        I: IntoIterator<Item = DescriptorEvent>,
    {
        let mut reducer = EventReducer::new();
        for event in events {
            reducer.feed(event, &mut self)?;
        }
        reducer.finish(&mut self);

        if !self.validation_errors.is_empty() || self.document_errors > 0 {
            tracing::error!(
                validation_errors = self.validation_errors.len(),
                document_errors = self.document_errors,
                "descriptor rejected"
            );
            return Err(DeployError::InvalidDescriptor {
                validation_errors: self.validation_errors,
                document_errors: self.document_errors,
            });
        }

        self.plan.bind_properties(&self.properties);
        tracing::debug!(tasks = self.plan.len(), "descriptor parsed");

        Ok(Deployment {
            plan: self.plan,
            properties: self.properties,
            variables: self.variables,
        })
    }

    fn reject(&mut self, error: ValidationError) {
        tracing::warn!("{error}");
        self.validation_errors.push(error);
    }

    fn add_property(&mut self, attributes: &Attributes) -> Result<(), SubstitutionError> {
        let (Some(name), Some(value)) = (
            self.required_attribute("property", attributes, "name"),
            self.required_attribute("property", attributes, "value"),
        ) else {
            return Ok(());
        };

        let name = self.variables.expand(name)?;
        let value = self.variables.expand(value)?;

        if name.is_empty() {
            self.reject(ValidationError::MissingAttribute {
                element: "property".to_string(),
                attribute: "name".to_string(),
            });
            return Ok(());
        }
        if name == DATADIR {
            self.reject(ValidationError::ReservedVariable { name });
            return Ok(());
        }

        self.variables.set(name.as_str(), value.as_str());
        self.properties.set(name, value);
        Ok(())
    }

    fn add_directory(&mut self, content: &str) -> Result<(), SubstitutionError> {
        if let Some(path) = self.resolve_path("directory", content)? {
            self.plan.push(DirectoryTask::new(path));
        }
        Ok(())
    }

    fn add_config_file(&mut self, content: &str) -> Result<(), SubstitutionError> {
        if let Some(path) = self.resolve_path("configfile", content)? {
            self.plan.push(ConfigFileTask::new(path, PropertySet::new()));
        }
        Ok(())
    }

    fn add_offer(&mut self, attributes: &Attributes, content: &str) -> Result<(), SubstitutionError> {
        let Some(name) = self.required_attribute("offer", attributes, "name") else {
            return Ok(());
        };
        let reference = match attributes.get("reference") {
            Some(reference) => reference,
            None if !content.is_empty() => content,
            None => {
                self.reject(ValidationError::MissingAttribute {
                    element: "offer".to_string(),
                    attribute: "reference".to_string(),
                });
                return Ok(());
            }
        };

        let offer = self.variables.expand(name)?;
        let reference = self.variables.expand(reference)?;

        let Some(registry) = self.config.registry.clone() else {
            self.reject(ValidationError::RegistryNotConfigured { offer });
            return Ok(());
        };

        match reference.parse::<ObjectReference>() {
            Ok(object) => self.plan.push(RegistryOfferTask::new(offer, object, registry)),
            Err(source) => self.reject(ValidationError::InvalidReference {
                offer,
                reference,
                source,
            }),
        }
        Ok(())
    }

    fn required_attribute<'a>(
        &mut self,
        element: &str,
        attributes: &'a Attributes,
        attribute: &str,
    ) -> Option<&'a str> {
        let value = attributes.get(attribute);
        if value.is_none() {
            self.reject(ValidationError::MissingAttribute {
                element: element.to_string(),
                attribute: attribute.to_string(),
            });
        }
        value
    }

    /// Root a descriptor path under the data directory.
    ///
    /// Returns `Ok(None)` when the path was rejected as a validation error.
    fn resolve_path(
        &mut self,
        element: &str,
        content: &str,
    ) -> Result<Option<PathBuf>, SubstitutionError> {
        if content.is_empty() {
            self.reject(ValidationError::MissingContent {
                element: element.to_string(),
            });
            return Ok(None);
        }

        let normalized = if content.starts_with('/') {
            content.to_string()
        } else {
            format!("/{content}")
        };
        let expanded = self.variables.expand(&normalized)?;

        let relative = Path::new(expanded.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            self.reject(ValidationError::PathTraversal { path: expanded });
            return Ok(None);
        }

        Ok(Some(self.config.data_dir.join(relative)))
    }
}

impl DescriptorHandler for Deployer {
    type Error = SubstitutionError;

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), Self::Error> {
        match name {
            "property" => self.add_property(attributes),
            _ => Ok(()),
        }
    }

    fn end_element(
        &mut self,
        name: &str,
        attributes: &Attributes,
        content: &str,
    ) -> Result<(), Self::Error> {
        match name {
            "directory" => self.add_directory(content),
            "configfile" => self.add_config_file(content),
            "offer" => self.add_offer(attributes, content),
            "property" => Ok(()),
            other => {
                tracing::debug!(element = other, "ignoring element");
                Ok(())
            }
        }
    }

    fn diagnostic(&mut self, severity: Severity, message: &str) {
        if severity.is_error() {
            tracing::error!(%severity, "{message}");
            self.document_errors += 1;
        } else {
            tracing::warn!(%severity, "{message}");
        }
    }
}

/// Outcome of a successful [`Deployment::deploy`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    /// Number of tasks applied, which is the whole plan
    pub applied: usize,
}

/// A revert that failed and was skipped.
#[derive(Debug)]
pub struct RevertFailure {
    pub index: usize,
    pub task: String,
    pub error: TaskError,
}

/// Outcome of a reverse pass, from [`Deployment::undeploy`] or a rollback.
#[derive(Debug, Default)]
pub struct UndeployReport {
    /// Tasks whose effect was undone
    pub reverted: usize,
    /// Offers that were no longer in the registry, so there was nothing to undo
    pub already_absent: usize,
    /// Offers whose removal failed; the failure was logged and the offer may remain
    pub abandoned: usize,
    /// Directory and configuration file reverts that failed, in revert order
    pub failures: Vec<RevertFailure>,
}

impl UndeployReport {
    /// True when every task was fully reverted or already gone.
    pub fn is_clean(&self) -> bool {
        self.abandoned == 0 && self.failures.is_empty()
    }

    fn record(&mut self, index: usize, task: &Task, result: Result<RevertOutcome, TaskError>) {
        match result {
            Ok(RevertOutcome::Reverted) => {
                tracing::info!(index, "reverted: {task}");
                self.reverted += 1;
            }
            Ok(RevertOutcome::AlreadyAbsent) => self.already_absent += 1,
            Ok(RevertOutcome::Abandoned) => self.abandoned += 1,
            Err(error) => {
                tracing::warn!(index, %error, "revert failed: {task}");
                self.failures.push(RevertFailure {
                    index,
                    task: task.to_string(),
                    error,
                });
            }
        }
    }
}

/// A validated plan ready to be applied or torn down.
#[derive(Debug)]
pub struct Deployment {
    plan: Plan,
    properties: PropertySet,
    variables: VariableTable,
}

impl Deployment {
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Apply every task in order.
    ///
    /// On the first failure, the tasks already applied are reverted in reverse
    /// order (failures there are logged and skipped) and the apply error is
    /// returned. The failing task and everything after it are left untouched.
    pub fn deploy(&self) -> Result<DeployReport, DeployError> {
        for (index, task) in self.plan.iter().enumerate() {
            if let Err(source) = task.apply() {
                tracing::error!(index, error = %source, "deploy failed: {task}");
                let rollback = revert_in_reverse(&self.plan.tasks()[..index]);
                if !rollback.is_clean() {
                    tracing::warn!(
                        failures = rollback.failures.len(),
                        abandoned = rollback.abandoned,
                        "rollback left residual artifacts"
                    );
                }
                return Err(DeployError::DeploymentFailed {
                    index,
                    task: task.to_string(),
                    source,
                });
            }
            tracing::info!(index, "applied: {task}");
        }

        Ok(DeployReport {
            applied: self.plan.len(),
        })
    }

    /// Revert every task, last to first, whether or not it was ever applied.
    ///
    /// Never fails; individual failures are logged and listed in the report.
    pub fn undeploy(&self) -> UndeployReport {
        revert_in_reverse(self.plan.tasks())
    }
}

fn revert_in_reverse(tasks: &[Task]) -> UndeployReport {
    let mut report = UndeployReport::default();
    for (index, task) in tasks.iter().enumerate().rev() {
        report.record(index, task, task.revert());
    }
    report
}
