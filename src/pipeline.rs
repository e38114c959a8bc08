//! Recompute closure → filter → graph → layout from one consistent view of
//! the rows and the view settings.

use std::collections::HashMap;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::closure::Closure;
use crate::filter::{filter_rows, FilterState, StatusFilter};
use crate::graph::{build_graph, Graph};
use crate::layout::{layout, Direction, Layout, LayoutConfig};
use crate::model::{status_for, Stage, TaskRow};
use crate::persist::StatusOverrides;
use crate::store::RowStore;

/// Everything the user can change about what is shown and how.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub filter: FilterState,
    pub direction: Direction,
    pub layout: LayoutConfig,
}

impl ViewSettings {
    pub fn new(store: &RowStore, direction: Direction, layout: LayoutConfig) -> Self {
        Self {
            filter: FilterState::new(store),
            direction,
            layout,
        }
    }
}

/// Result of one full recomputation. Never patched; replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Store revision this snapshot was computed from.
    pub revision: u64,
    pub closure: Closure,
    /// Ids of visible rows, in input order.
    pub visible: Vec<String>,
    /// Visible graph with layout positions applied.
    pub graph: Graph,
    pub layout: Layout,
}

impl Snapshot {
    pub fn compute(store: &RowStore, settings: &ViewSettings) -> Self {
        let closure = Closure::compute(store.rows());
        let visible: Vec<&TaskRow> = filter_rows(store.rows(), &settings.filter, &closure);
        let mut graph = build_graph(&visible, &closure);
        let layout = layout(&graph, settings.direction, &settings.layout);
        layout.apply(&mut graph);
        debug!(
            "recomputed: {} of {} rows visible, {} edges",
            graph.nodes.len(),
            store.len(),
            graph.edges.len()
        );
        Self {
            revision: store.revision(),
            closure,
            visible: visible.iter().map(|row| row.id.clone()).collect(),
            graph,
            layout,
        }
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.iter().any(|v| v == id)
    }
}

/// Owns the rows and view settings, and keeps the snapshot current.
/// Every mutation goes through a method here so that nothing can change
/// without a recompute.
pub struct Session {
    store: RowStore,
    settings: ViewSettings,
    overrides: Option<StatusOverrides>,
    /// Statuses set during this session, re-applied when rows reload.
    changed: HashMap<String, String>,
    snapshot: Snapshot,
}

impl Session {
    pub fn new(
        store: RowStore,
        settings: ViewSettings,
        overrides: Option<StatusOverrides>,
    ) -> Self {
        let snapshot = Snapshot::compute(&store, &settings);
        Self {
            store,
            settings,
            overrides,
            changed: HashMap::new(),
            snapshot,
        }
    }

    /// Build a session from freshly loaded rows, applying saved statuses
    /// and the startup filter defaults.
    pub fn open(
        rows: Vec<TaskRow>,
        overrides: Option<StatusOverrides>,
        direction: Direction,
        layout: LayoutConfig,
    ) -> Result<Self> {
        let saved = match &overrides {
            Some(o) => o.load()?,
            None => HashMap::new(),
        };
        let store = RowStore::with_overrides(rows, &saved);
        let settings = ViewSettings::new(&store, direction, layout);
        Ok(Self::new(store, settings, overrides))
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn overrides(&self) -> Option<&StatusOverrides> {
        self.overrides.as_ref()
    }

    fn recompute(&mut self) {
        self.snapshot = Snapshot::compute(&self.store, &self.settings);
    }

    /// Apply a status change to the store and recompute. Returns the new
    /// status when the row actually changed.
    fn change_done(&mut self, id: &str, done: bool) -> Result<Option<&'static str>> {
        let previous = self.store.set_done(id, done)?;
        let status = status_for(done);
        if previous == status {
            return Ok(None);
        }
        self.changed.insert(id.to_string(), status.to_string());
        self.recompute();
        Ok(Some(status))
    }

    fn save_status(&self, id: &str, status: &str) -> Result<()> {
        match &self.overrides {
            Some(overrides) => overrides
                .record(id, status)
                .with_context(|| format!("failed to save status for '{id}'")),
            None => Ok(()),
        }
    }

    /// Set a row's completion flag, save it, and recompute. A failed save
    /// is logged; the change still applies to this session.
    pub fn set_done(&mut self, id: &str, done: bool) -> Result<()> {
        if let Some(status) = self.change_done(id, done)? {
            if let Err(e) = self.save_status(id, status) {
                warn!("{e:#}");
            }
        }
        Ok(())
    }

    /// Like `set_done`, but a failed save is an error. Returns whether the
    /// status changed.
    pub fn commit_done(&mut self, id: &str, done: bool) -> Result<bool> {
        let Some(status) = self.change_done(id, done)? else {
            return Ok(false);
        };
        self.save_status(id, status)?;
        Ok(true)
    }

    /// Flip a row's completion flag. Returns the new flag.
    pub fn toggle_done(&mut self, id: &str) -> Result<bool> {
        let done = !self
            .store
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("task '{id}' not found"))?
            .is_done();
        self.set_done(id, done)?;
        Ok(done)
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.settings.filter = filter;
        self.recompute();
    }

    pub fn set_query(&mut self, query: &str) {
        self.settings.filter.query = query.to_string();
        self.recompute();
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.settings.filter.status = status;
        self.recompute();
    }

    pub fn cycle_status_filter(&mut self) {
        let next = self.settings.filter.status.cycle();
        self.set_status_filter(next);
    }

    pub fn toggle_stage(&mut self, stage: Stage) {
        self.settings.filter.toggle_stage(stage);
        self.recompute();
    }

    pub fn toggle_section(&mut self, section: &str) {
        self.settings.filter.toggle_section(section);
        self.recompute();
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        self.settings.filter.toggle_tag(tag);
        self.recompute();
    }

    pub fn toggle_actionable_only(&mut self) {
        self.settings.filter.actionable_only = !self.settings.filter.actionable_only;
        self.recompute();
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.settings.direction = direction;
        self.recompute();
    }

    /// Replace the rows after the data file changed. Saved statuses and
    /// statuses set during this session win over the file's values.
    pub fn reload_rows(&mut self, rows: Vec<TaskRow>) -> Result<()> {
        let mut saved = match &self.overrides {
            Some(o) => o.load()?,
            None => HashMap::new(),
        };
        saved.extend(self.changed.iter().map(|(k, v)| (k.clone(), v.clone())));

        let previous_sections = self.store.sections();
        let fresh = RowStore::with_overrides(rows, &saved);
        self.settings
            .filter
            .sync_sections(&previous_sections, &fresh.sections());
        self.store.replace_rows(fresh.rows().to_vec());
        self.recompute();
        Ok(())
    }
}
