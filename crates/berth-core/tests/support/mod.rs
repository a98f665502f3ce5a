#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use berth_core::deployer::{Deployer, DeployerConfig, Deployment};
use berth_core::descriptor::DescriptorEvent;
use berth_core::reference::ObjectReference;
use berth_core::registry::{OfferRegistry, RegistryError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add(String),
    Remove(String),
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotFound,
    Unavailable,
}

impl Failure {
    fn to_error(self, offer: &str) -> RegistryError {
        match self {
            Failure::NotFound => RegistryError::OfferNotFound {
                offer: offer.to_string(),
            },
            Failure::Unavailable => RegistryError::Unavailable("connection refused".to_string()),
        }
    }
}

/// In-memory registry that records every call and fails on demand.
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    calls: Mutex<Vec<Call>>,
    add_failures: Mutex<HashMap<String, Failure>>,
    remove_failures: Mutex<HashMap<String, Failure>>,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_add(&self, offer: &str, failure: Failure) {
        self.add_failures
            .lock()
            .unwrap()
            .insert(offer.to_string(), failure);
    }

    pub fn fail_remove(&self, offer: &str, failure: Failure) {
        self.remove_failures
            .lock()
            .unwrap()
            .insert(offer.to_string(), failure);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl OfferRegistry for RecordingRegistry {
    fn add(&self, offer: &str, _reference: &ObjectReference) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(Call::Add(offer.to_string()));
        match self.add_failures.lock().unwrap().get(offer) {
            Some(failure) => Err(failure.to_error(offer)),
            None => Ok(()),
        }
    }

    fn remove(&self, offer: &str, _reference: &ObjectReference) -> Result<(), RegistryError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Remove(offer.to_string()));
        match self.remove_failures.lock().unwrap().get(offer) {
            Some(failure) => Err(failure.to_error(offer)),
            None => Ok(()),
        }
    }
}

pub fn add(offer: &str) -> Call {
    Call::Add(offer.to_string())
}

pub fn remove(offer: &str) -> Call {
    Call::Remove(offer.to_string())
}

pub fn property(name: &str, value: &str) -> Vec<DescriptorEvent> {
    vec![
        DescriptorEvent::start("property", [("name", name), ("value", value)]),
        DescriptorEvent::end("property"),
    ]
}

pub fn directory(path: &str) -> Vec<DescriptorEvent> {
    DescriptorEvent::element_with_text("directory", path).to_vec()
}

pub fn configfile(path: &str) -> Vec<DescriptorEvent> {
    DescriptorEvent::element_with_text("configfile", path).to_vec()
}

pub fn offer(name: &str, reference: &str) -> Vec<DescriptorEvent> {
    vec![
        DescriptorEvent::start("offer", [("name", name), ("reference", reference)]),
        DescriptorEvent::end("offer"),
    ]
}

/// Wrap element groups in a `component` root.
pub fn component(parts: Vec<Vec<DescriptorEvent>>) -> Vec<DescriptorEvent> {
    let mut events = vec![DescriptorEvent::start("component", Vec::<(String, String)>::new())];
    events.extend(parts.into_iter().flatten());
    events.push(DescriptorEvent::end("component"));
    events
}

pub fn parse_with_registry(
    data_dir: &Path,
    registry: Arc<RecordingRegistry>,
    parts: Vec<Vec<DescriptorEvent>>,
) -> Deployment {
    Deployer::new(DeployerConfig::new(data_dir).with_registry(registry))
        .parse(component(parts))
        .expect("descriptor should parse")
}
