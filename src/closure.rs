use std::collections::HashSet;

use crate::model::TaskRow;

/// Completion facts derived from the full row set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Ids whose status is `done`.
    pub done: HashSet<String>,
    /// Ids that are not done and whose every dependency is done.
    pub actionable: HashSet<String>,
}

impl Closure {
    pub fn compute(rows: &[TaskRow]) -> Self {
        let done = done_ids(rows);
        let actionable = rows
            .iter()
            .filter(|row| is_actionable(row, &done))
            .map(|row| row.id.clone())
            .collect();
        Self { done, actionable }
    }

    pub fn is_actionable(&self, id: &str) -> bool {
        self.actionable.contains(id)
    }

    pub fn is_done(&self, id: &str) -> bool {
        self.done.contains(id)
    }
}

fn done_ids(rows: &[TaskRow]) -> HashSet<String> {
    rows.iter()
        .filter(|row| row.is_done())
        .map(|row| row.id.clone())
        .collect()
}

// A dependency on an id missing from the data never counts as satisfied.
fn is_actionable(row: &TaskRow, done: &HashSet<String>) -> bool {
    !row.is_done() && row.depends_on.iter().all(|dep| done.contains(dep))
}

pub fn compute_actionable(rows: &[TaskRow]) -> HashSet<String> {
    Closure::compute(rows).actionable
}

/// Dependencies of `row` that are not yet done, sorted.
pub fn blockers(row: &TaskRow, done: &HashSet<String>) -> Vec<String> {
    row.depends_on
        .iter()
        .filter(|dep| !done.contains(*dep))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(id: &str, deps: &[&str], status: &str) -> TaskRow {
        let mut row = TaskRow::new(id);
        row.depends_on = deps.iter().map(|d| d.to_string()).collect();
        row.status = status.into();
        row
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn done_dependency_unlocks_dependent() {
        let rows = vec![make_row("A", &[], "done"), make_row("B", &["A"], "todo")];
        let closure = Closure::compute(&rows);
        assert_eq!(closure.done, set(&["A"]));
        assert_eq!(closure.actionable, set(&["B"]));
    }

    #[test]
    fn no_dependencies_actionable_iff_not_done() {
        let rows = vec![make_row("A", &[], "todo"), make_row("B", &[], "done")];
        assert_eq!(compute_actionable(&rows), set(&["A"]));
    }

    #[test]
    fn missing_dependency_never_satisfied() {
        let rows = vec![make_row("A", &["X"], "todo"), make_row("B", &[], "done")];
        assert!(compute_actionable(&rows).is_empty());
    }

    #[test]
    fn partial_dependencies_block() {
        let rows = vec![
            make_row("A", &[], "done"),
            make_row("B", &[], "todo"),
            make_row("C", &["A", "B"], "todo"),
        ];
        let closure = Closure::compute(&rows);
        assert!(!closure.is_actionable("C"));
        assert!(closure.is_actionable("B"));
        assert_eq!(blockers(&rows[2], &closure.done), vec!["B"]);
    }

    #[test]
    fn cycle_members_are_never_actionable() {
        let rows = vec![
            make_row("A", &["C"], "todo"),
            make_row("B", &["A"], "todo"),
            make_row("C", &["B"], "todo"),
            make_row("D", &[], "todo"),
        ];
        assert_eq!(compute_actionable(&rows), set(&["D"]));
    }

    #[test]
    fn unknown_status_counts_as_not_done() {
        let rows = vec![make_row("A", &[], "in-progress"), make_row("B", &["A"], "todo")];
        let closure = Closure::compute(&rows);
        assert!(closure.is_actionable("A"));
        assert!(!closure.is_actionable("B"));
        assert!(!closure.is_done("A"));
    }

    #[test]
    fn actionable_rows_are_never_done() {
        let rows = vec![
            make_row("A", &[], "done"),
            make_row("B", &["A"], "done"),
            make_row("C", &["B"], "todo"),
        ];
        let closure = Closure::compute(&rows);
        for id in &closure.actionable {
            let row = rows.iter().find(|r| &r.id == id).unwrap();
            assert!(!row.is_done());
            assert!(row.depends_on.iter().all(|d| closure.done.contains(d)));
        }
        assert_eq!(closure.actionable, set(&["C"]));
    }
}
