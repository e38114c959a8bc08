use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Result};
use log::debug;

use crate::model::{status_for, TaskRow};

/// Owns the loaded rows. Completion status is the only field that changes
/// after load, and only through [`RowStore::set_done`].
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<TaskRow>,
    index: HashMap<String, usize>,
    revision: u64,
}

impl RowStore {
    pub fn new(rows: Vec<TaskRow>) -> Self {
        let mut store = Self::default();
        store.replace_rows(rows);
        store.revision = 0;
        store
    }

    /// Build a store and apply previously saved statuses by id.
    /// Saved entries for ids that no longer exist are ignored.
    pub fn with_overrides(mut rows: Vec<TaskRow>, overrides: &HashMap<String, String>) -> Self {
        for row in &mut rows {
            if let Some(status) = overrides.get(&row.id) {
                row.status = status.clone();
            }
        }
        Self::new(rows)
    }

    /// Swap in a freshly loaded row set (e.g. after the data file changed).
    pub fn replace_rows(&mut self, rows: Vec<TaskRow>) {
        self.index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.id.clone(), i))
            .collect();
        self.rows = rows;
        self.revision += 1;
    }

    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&TaskRow> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bumped on every change to the row set.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Distinct sections in first-seen order.
    pub fn sections(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.rows
            .iter()
            .filter(|row| seen.insert(row.section.as_str()))
            .map(|row| row.section.clone())
            .collect()
    }

    /// Distinct tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let tags: BTreeSet<&String> = self.rows.iter().flat_map(|row| &row.tags).collect();
        tags.into_iter().cloned().collect()
    }

    /// Set a row's completion flag. Returns the previous status string.
    pub fn set_done(&mut self, id: &str, done: bool) -> Result<String> {
        let Some(&i) = self.index.get(id) else {
            bail!("task '{id}' not found");
        };
        let row = &mut self.rows[i];
        let new_status = status_for(done);
        let previous = row.status.clone();
        if previous != new_status {
            row.status = new_status.to_string();
            self.revision += 1;
            debug!("'{id}': {previous} -> {new_status}");
        }
        Ok(previous)
    }
}
