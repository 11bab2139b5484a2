//! Ordered task collection.
//!
//! Position in the collection is the on-screen position within each status
//! column, so every mutation here keeps the relative order of the tasks it
//! does not touch.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{Status, Task};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Task> {
        self.get(id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn require_mut(&mut self, id: &str) -> Result<&mut Task> {
        self.get_mut(id).ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn remove(&mut self, id: &str) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok(self.tasks.remove(index))
    }

    pub fn clear(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.tasks.iter().map(|task| task.id.as_str()).collect()
    }

    /// Tasks of one column, in display order.
    pub fn column(&self, status: Status) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.status == status)
    }

    pub fn tracking(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.is_tracking)
    }

    pub(crate) fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }
        let needle = trimmed.to_ascii_lowercase();

        if let Some(task) = self
            .tasks
            .iter()
            .find(|task| task.id.eq_ignore_ascii_case(&needle))
        {
            return Ok(task.id.clone());
        }

        let mut matches: Vec<&str> = self
            .tasks
            .iter()
            .filter(|task| task.id.to_ascii_lowercase().starts_with(&needle))
            .map(|task| task.id.as_str())
            .collect();
        matches.sort_unstable();

        match matches.as_slice() {
            [] => Err(Error::NotFound(trimmed.to_string())),
            [only] => Ok((*only).to_string()),
            many => Err(Error::AmbiguousId {
                input: trimmed.to_string(),
                matches: many.join(", "),
            }),
        }
    }
}
