//! Ordered deployment plan.

use crate::properties::PropertySet;
use crate::task::Task;

/// Append-only sequence of tasks, applied front to back and reverted back to
/// front.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    tasks: Vec<Task>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: impl Into<Task>) {
        self.tasks.push(task.into());
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    /// Give every configuration file task the final property set.
    pub(crate) fn bind_properties(&mut self, properties: &PropertySet) {
        for task in &mut self.tasks {
            if let Task::ConfigFile(config) = task {
                config.bind_properties(properties.clone());
            }
        }
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
