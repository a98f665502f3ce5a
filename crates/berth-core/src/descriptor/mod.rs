//! Descriptor event model.
//!
//! Descriptors reach the deployer as a stream of [`DescriptorEvent`]s produced
//! by a document parser. The parser itself lives outside this crate; the
//! [`toml_source`] module provides one event source, and anything else that can emit
//! element start/characters/end callbacks works the same way.

pub mod reducer;
pub mod toml_source;

use std::fmt;

pub use reducer::{DescriptorHandler, EventReducer};
pub use toml_source::{TomlDescriptor, read_descriptor};

/// Element attributes in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (name, value) in iter {
            attributes.push(name, value);
        }
        attributes
    }
}

/// Severity of a problem reported by the document parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Errors and fatal errors invalidate the descriptor; warnings don't.
    pub fn is_error(self) -> bool {
        !matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// One parse event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorEvent {
    ElementStart { name: String, attributes: Attributes },
    Characters(String),
    ElementEnd { name: String },
    Diagnostic { severity: Severity, message: String },
}

impl DescriptorEvent {
    pub fn start<I, K, V>(name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        DescriptorEvent::ElementStart {
            name: name.into(),
            attributes: attributes.into_iter().collect(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        DescriptorEvent::Characters(text.into())
    }

    pub fn end(name: impl Into<String>) -> Self {
        DescriptorEvent::ElementEnd { name: name.into() }
    }

    pub fn diagnostic(severity: Severity, message: impl Into<String>) -> Self {
        DescriptorEvent::Diagnostic {
            severity,
            message: message.into(),
        }
    }

    /// Start, content and end of an element with no attributes.
    pub fn element_with_text(name: &str, text: impl Into<String>) -> [Self; 3] {
        [
            DescriptorEvent::ElementStart {
                name: name.to_string(),
                attributes: Attributes::new(),
            },
            DescriptorEvent::text(text),
            DescriptorEvent::end(name),
        ]
    }
}
