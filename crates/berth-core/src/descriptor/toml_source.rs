//! TOML descriptor documents as an event source.
//!
//! ```toml
//! name = "greeter"
//!
//! [[item]]
//! kind = "directory"
//! path = "/logs"
//!
//! [[item]]
//! kind = "property"
//! name = "level"
//! value = "debug"
//! ```
//!
//! Items are emitted in document order inside a `component` element.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use super::{Attributes, DescriptorEvent, Severity};

const ROOT_ELEMENT: &str = "component";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DescriptorItem {
    Property {
        name: Option<String>,
        value: Option<String>,
    },
    Directory {
        path: Option<String>,
    },
    #[serde(alias = "config-file")]
    ConfigFile {
        path: Option<String>,
    },
    Offer {
        name: Option<String>,
        reference: Option<String>,
    },
}

/// A parsed TOML descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TomlDescriptor {
    /// Component name, informational only
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "item")]
    pub items: Vec<DescriptorItem>,
}

impl TomlDescriptor {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The event stream for this document.
    pub fn events(&self) -> Vec<DescriptorEvent> {
        let mut events = Vec::with_capacity(self.items.len() * 3 + 2);

        let mut root = Attributes::new();
        if let Some(ref name) = self.name {
            root.push("name", name.as_str());
        }
        events.push(DescriptorEvent::ElementStart {
            name: ROOT_ELEMENT.to_string(),
            attributes: root,
        });

        for item in &self.items {
            match item {
                DescriptorItem::Property { name, value } => {
                    let attributes = optional_attributes([("name", name), ("value", value)]);
                    events.push(DescriptorEvent::ElementStart {
                        name: "property".to_string(),
                        attributes,
                    });
                    events.push(DescriptorEvent::end("property"));
                }
                DescriptorItem::Directory { path } => {
                    events.extend(DescriptorEvent::element_with_text(
                        "directory",
                        path.clone().unwrap_or_default(),
                    ));
                }
                DescriptorItem::ConfigFile { path } => {
                    events.extend(DescriptorEvent::element_with_text(
                        "configfile",
                        path.clone().unwrap_or_default(),
                    ));
                }
                DescriptorItem::Offer { name, reference } => {
                    let attributes =
                        optional_attributes([("name", name), ("reference", reference)]);
                    events.push(DescriptorEvent::ElementStart {
                        name: "offer".to_string(),
                        attributes,
                    });
                    events.push(DescriptorEvent::end("offer"));
                }
            }
        }

        events.push(DescriptorEvent::end(ROOT_ELEMENT));
        events
    }
}

fn optional_attributes<const N: usize>(pairs: [(&str, &Option<String>); N]) -> Attributes {
    pairs
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
}

/// Read a descriptor file into events.
///
/// A document that fails to parse becomes a single error diagnostic so the
/// deployer counts it like any other document error. Only I/O failures are
/// returned as errors.
pub fn read_descriptor(path: &Path) -> anyhow::Result<Vec<DescriptorEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptor: {}", path.display()))?;

    Ok(match TomlDescriptor::parse(&content) {
        Ok(descriptor) => descriptor.events(),
        Err(e) => vec![DescriptorEvent::diagnostic(
            Severity::Fatal,
            format!("{}: {}", path.display(), e.to_string().trim_end()),
        )],
    })
}
