use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::closure::Closure;
use crate::model::{Stage, TaskRow};
use crate::store::RowStore;

/// Status selector for the visible subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Todo,
    Done,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "todo" => Ok(Self::Todo),
            "done" => Ok(Self::Done),
            _ => bail!("invalid status '{s}': must be all, todo, or done"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Todo => "todo",
            Self::Done => "done",
        }
    }

    /// Next selector in `all -> todo -> done` order.
    pub fn cycle(self) -> Self {
        match self {
            Self::All => Self::Todo,
            Self::Todo => Self::Done,
            Self::Done => Self::All,
        }
    }

    fn matches(self, row: &TaskRow) -> bool {
        match self {
            Self::All => true,
            Self::Todo => !row.is_done(),
            Self::Done => row.is_done(),
        }
    }
}

/// Every filter the user can set. Categories combine with AND; the
/// stage, section and tag sets each match if any member matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub query: String,
    pub status: StatusFilter,
    pub stages: BTreeSet<Stage>,
    pub sections: BTreeSet<String>,
    /// Empty means no tag restriction.
    pub tags: BTreeSet<String>,
    pub actionable_only: bool,
}

impl FilterState {
    /// Startup defaults: the four named stages, every section present in
    /// the data, no tag restriction.
    pub fn new(store: &RowStore) -> Self {
        Self {
            query: String::new(),
            status: StatusFilter::All,
            stages: Stage::ALL.into_iter().collect(),
            sections: store.sections().into_iter().collect(),
            tags: BTreeSet::new(),
            actionable_only: false,
        }
    }

    pub fn matches(&self, row: &TaskRow, closure: &Closure) -> bool {
        matches_search(row, &self.query)
            && self.status.matches(row)
            && matches_stage(row, &self.stages)
            && matches_section(row, &self.sections)
            && matches_tags(row, &self.tags)
            && (!self.actionable_only || closure.is_actionable(&row.id))
    }

    pub fn toggle_stage(&mut self, stage: Stage) {
        if !self.stages.remove(&stage) {
            self.stages.insert(stage);
        }
    }

    pub fn toggle_section(&mut self, section: &str) {
        if !self.sections.remove(section) {
            self.sections.insert(section.to_string());
        }
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        if !self.tags.remove(tag) {
            self.tags.insert(tag.to_string());
        }
    }

    /// Select sections that appear for the first time after a reload.
    /// Sections the user already deselected stay deselected.
    pub fn sync_sections(&mut self, previously_known: &[String], now_known: &[String]) {
        for section in now_known {
            if !previously_known.contains(section) {
                self.sections.insert(section.clone());
            }
        }
    }
}

pub fn matches_search(row: &TaskRow, query: &str) -> bool {
    query.is_empty() || row.search_haystack().contains(&query.to_lowercase())
}

pub fn matches_status(row: &TaskRow, status: StatusFilter) -> bool {
    status.matches(row)
}

pub fn matches_stage(row: &TaskRow, stages: &BTreeSet<Stage>) -> bool {
    stages.contains(&row.stage)
}

pub fn matches_section(row: &TaskRow, sections: &BTreeSet<String>) -> bool {
    sections.contains(&row.section)
}

pub fn matches_tags(row: &TaskRow, tags: &BTreeSet<String>) -> bool {
    tags.is_empty() || row.tags.iter().any(|t| tags.contains(t))
}

/// Rows passing every filter, in input order.
pub fn filter_rows<'a>(
    rows: &'a [TaskRow],
    state: &FilterState,
    closure: &Closure,
) -> Vec<&'a TaskRow> {
    rows.iter().filter(|row| state.matches(row, closure)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(id: &str, stage: Stage, section: &str, status: &str, tags: &[&str]) -> TaskRow {
        let mut row = TaskRow::new(id);
        row.title = format!("Task {id}");
        row.stage = stage;
        row.section = section.into();
        row.status = status.into();
        row.tags = tags.iter().map(|t| t.to_string()).collect();
        row
    }

    fn sample() -> Vec<TaskRow> {
        vec![
            make_row("a", Stage::Setup, "Core", "done", &["infra"]),
            make_row("b", Stage::Early, "Core", "todo", &["ui", "infra"]),
            make_row("c", Stage::Late, "Docs", "todo", &[]),
            make_row("d", Stage::Unsorted, "Docs", "todo", &[]),
        ]
    }

    fn ids(rows: &[&TaskRow]) -> Vec<String> {
        rows.iter().map(|r| r.id.clone()).collect()
    }

    fn default_state(rows: &[TaskRow]) -> FilterState {
        FilterState::new(&RowStore::new(rows.to_vec()))
    }

    #[test]
    fn defaults_hide_unsorted_only() {
        let rows = sample();
        let closure = Closure::compute(&rows);
        let state = default_state(&rows);
        assert_eq!(ids(&filter_rows(&rows, &state, &closure)), vec!["a", "b", "c"]);
    }

    #[test]
    fn unsorted_is_selectable() {
        let rows = sample();
        let closure = Closure::compute(&rows);
        let mut state = default_state(&rows);
        state.toggle_stage(Stage::Unsorted);
        assert_eq!(filter_rows(&rows, &state, &closure).len(), 4);
    }

    #[test]
    fn search_is_case_insensitive_over_all_fields() {
        let rows = sample();
        assert!(matches_search(&rows[1], "UI"));
        assert!(matches_search(&rows[1], "early"));
        assert!(matches_search(&rows[2], "docs"));
        assert!(matches_search(&rows[0], "task a"));
        assert!(!matches_search(&rows[0], "nope"));
        assert!(matches_search(&rows[0], ""));
    }

    #[test]
    fn search_whitespace_is_part_of_the_query() {
        let rows = sample();
        assert!(!matches_search(&rows[0], "   "));
        assert!(matches_search(&rows[0], "setup "));
        assert!(!matches_search(&rows[0], "infra "));
    }

    #[test]
    fn status_selector() {
        let rows = sample();
        assert!(matches_status(&rows[0], StatusFilter::Done));
        assert!(!matches_status(&rows[0], StatusFilter::Todo));
        assert!(matches_status(&rows[1], StatusFilter::Todo));
        assert!(matches_status(&rows[1], StatusFilter::All));

        let mut odd = rows[1].clone();
        odd.status = "blocked".into();
        assert!(matches_status(&odd, StatusFilter::Todo));
        assert!(!matches_status(&odd, StatusFilter::Done));
    }

    #[test]
    fn tags_empty_matches_all_otherwise_any() {
        let rows = sample();
        let mut tags = BTreeSet::new();
        assert!(matches_tags(&rows[2], &tags));
        tags.insert("ui".to_string());
        assert!(matches_tags(&rows[1], &tags));
        assert!(!matches_tags(&rows[0], &tags));
        assert!(!matches_tags(&rows[2], &tags));
    }

    #[test]
    fn categories_combine_with_and() {
        let rows = sample();
        let closure = Closure::compute(&rows);
        let mut state = default_state(&rows);
        state.toggle_tag("infra");
        state.status = StatusFilter::Todo;
        assert_eq!(ids(&filter_rows(&rows, &state, &closure)), vec!["b"]);

        state.toggle_section("Core");
        assert!(filter_rows(&rows, &state, &closure).is_empty());
    }

    #[test]
    fn actionable_only_uses_closure() {
        let mut rows = sample();
        rows[2].depends_on.insert("b".into());
        let closure = Closure::compute(&rows);
        let mut state = default_state(&rows);
        state.actionable_only = true;
        assert_eq!(ids(&filter_rows(&rows, &state, &closure)), vec!["b"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let rows = sample();
        let closure = Closure::compute(&rows);
        let mut state = default_state(&rows);
        state.query = "core".into();
        let once: Vec<TaskRow> = filter_rows(&rows, &state, &closure)
            .into_iter()
            .cloned()
            .collect();
        let twice = filter_rows(&once, &state, &closure);
        assert_eq!(ids(&twice), once.iter().map(|r| r.id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn sync_sections_adds_only_new() {
        let rows = sample();
        let mut state = default_state(&rows);
        state.toggle_section("Docs");
        let before = vec!["Core".to_string(), "Docs".to_string()];
        let after = vec!["Core".to_string(), "Docs".to_string(), "Ops".to_string()];
        state.sync_sections(&before, &after);
        assert!(state.sections.contains("Ops"));
        assert!(state.sections.contains("Core"));
        assert!(!state.sections.contains("Docs"));
    }

    #[test]
    fn status_parse_and_cycle() {
        assert_eq!(StatusFilter::parse("todo").unwrap(), StatusFilter::Todo);
        assert!(StatusFilter::parse("open").is_err());
        assert_eq!(StatusFilter::All.cycle(), StatusFilter::Todo);
        assert_eq!(StatusFilter::Done.cycle(), StatusFilter::All);
    }
}
