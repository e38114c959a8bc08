use serde::Serialize;

use crate::closure::{blockers, Closure};
use crate::graph::{NodeData, Point};
use crate::layout::{Direction, EdgeRoute};
use crate::model::TaskRow;
use crate::pipeline::Snapshot;

#[derive(Serialize)]
pub struct TaskDetail<'a> {
    #[serde(flatten)]
    pub task: &'a TaskRow,
    pub actionable: bool,
    pub blocked_by: &'a [String],
    pub blocks: &'a [String],
}

/// Ids of rows that list `id` as a dependency, in input order.
pub fn dependents(rows: &[TaskRow], id: &str) -> Vec<String> {
    rows.iter()
        .filter(|row| row.depends_on.contains(id))
        .map(|row| row.id.clone())
        .collect()
}

pub fn format_task_detail(task: &TaskRow, closure: &Closure, dependents: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:          {}\n", task.id));
    if !task.title.is_empty() {
        out.push_str(&format!("Title:       {}\n", task.title));
    }
    out.push_str(&format!("Status:      {}\n", task.status));
    out.push_str(&format!("Stage:       {}\n", task.stage));
    out.push_str(&format!("Section:     {}\n", task.section));
    if let Some(p) = task.priority {
        out.push_str(&format!("Priority:    {p}\n"));
    }
    if !task.tags.is_empty() {
        let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();
        out.push_str(&format!("Tags:        {}\n", tags.join(", ")));
    }
    if !task.description.is_empty() {
        out.push_str(&format!("Description: {}\n", task.description));
    }
    if closure.is_actionable(&task.id) {
        out.push_str("Actionable:  yes\n");
    }

    let blocked_by = blockers(task, &closure.done);
    if !blocked_by.is_empty() {
        out.push_str(&format!("Blocked by:  {}\n", blocked_by.join(", ")));
    }
    if !dependents.is_empty() {
        out.push_str(&format!("Blocks:      {}\n", dependents.join(", ")));
    }
    out
}

pub fn format_task_list(tasks: &[&TaskRow], closure: &Closure) -> String {
    let mut out = String::new();
    for task in tasks {
        let marker = if closure.is_actionable(&task.id) { " *" } else { "" };
        let title = if task.title.is_empty() {
            String::new()
        } else {
            format!("  {}", task.title)
        };
        let deps = if task.depends_on.is_empty() {
            String::new()
        } else {
            let deps: Vec<&str> = task.depends_on.iter().map(String::as_str).collect();
            format!(" (after: {})", deps.join(", "))
        };
        out.push_str(&format!(
            "{} {}{}{}{}\n",
            task.icon(),
            task.id,
            marker,
            title,
            deps
        ));
    }
    out
}

#[derive(Debug, Serialize)]
pub struct ExportNode<'a> {
    pub id: &'a str,
    #[serde(flatten)]
    pub data: &'a NodeData,
    pub position: Point,
    pub rank: Option<usize>,
}

/// Positioned graph as written by `depflow graph`.
#[derive(Debug, Serialize)]
pub struct GraphExport<'a> {
    pub direction: Direction,
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<ExportNode<'a>>,
    pub edges: &'a [EdgeRoute],
}

impl<'a> GraphExport<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let nodes = snapshot
            .graph
            .nodes
            .iter()
            .map(|n| ExportNode {
                id: &n.id,
                data: &n.data,
                position: n.position,
                rank: snapshot.layout.rank(&n.id),
            })
            .collect();
        Self {
            direction: snapshot.layout.direction,
            width: snapshot.layout.width,
            height: snapshot.layout.height,
            nodes,
            edges: &snapshot.layout.edges,
        }
    }
}
