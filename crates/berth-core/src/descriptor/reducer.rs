//! Element stack bookkeeping between raw events and a handler.

use super::{Attributes, DescriptorEvent, Severity};

/// Receives fully assembled elements.
///
/// `start_element` fires when an element opens; `end_element` fires when it
/// closes, with its accumulated text content trimmed.
pub trait DescriptorHandler {
    type Error;

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), Self::Error>;

    fn end_element(
        &mut self,
        name: &str,
        attributes: &Attributes,
        content: &str,
    ) -> Result<(), Self::Error>;

    fn diagnostic(&mut self, severity: Severity, message: &str);
}

#[derive(Debug)]
struct OpenElement {
    name: String,
    attributes: Attributes,
    content: String,
}

/// Tracks open elements and their character content.
#[derive(Debug, Default)]
pub struct EventReducer {
    stack: Vec<OpenElement>,
}

impl EventReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed<H: DescriptorHandler>(
        &mut self,
        event: DescriptorEvent,
        handler: &mut H,
    ) -> Result<(), H::Error> {
        match event {
            DescriptorEvent::ElementStart { name, attributes } => {
                handler.start_element(&name, &attributes)?;
                self.stack.push(OpenElement {
                    name,
                    attributes,
                    content: String::new(),
                });
            }
            DescriptorEvent::Characters(text) => match self.stack.last_mut() {
                Some(open) => open.content.push_str(&text),
                None => {
                    if !text.trim().is_empty() {
                        handler.diagnostic(Severity::Error, "text outside of any element");
                    }
                }
            },
            DescriptorEvent::ElementEnd { name } => match self.stack.pop() {
                Some(open) => {
                    if open.name != name {
                        let message =
                            format!("element '{}' closed by '</{}>'", open.name, name);
                        handler.diagnostic(Severity::Error, &message);
                    }
                    handler.end_element(&open.name, &open.attributes, open.content.trim())?;
                }
                None => {
                    let message = format!("unexpected end of element '{name}'");
                    handler.diagnostic(Severity::Error, &message);
                }
            },
            DescriptorEvent::Diagnostic { severity, message } => {
                handler.diagnostic(severity, &message);
            }
        }
        Ok(())
    }

    /// Report elements left open once the stream is exhausted.
    pub fn finish<H: DescriptorHandler>(&mut self, handler: &mut H) {
        for open in self.stack.drain(..).rev() {
            let message = format!("element '{}' was never closed", open.name);
            handler.diagnostic(Severity::Error, &message);
        }
    }
}
