use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::closure::Closure;
use crate::model::{Stage, TaskRow};

/// A 2D coordinate in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Display payload carried by a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub title: String,
    pub section: String,
    pub stage: Stage,
    pub description: String,
    pub done: bool,
    pub actionable: bool,
    pub priority: Option<u32>,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub data: NodeData,
    /// Top-left corner; zero until layout runs.
    pub position: Point,
}

/// `source` must be finished before `target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    pub fn id(&self) -> String {
        format!("{}->{}", self.source, self.target)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }
}

fn node_for(row: &TaskRow, closure: &Closure) -> GraphNode {
    GraphNode {
        id: row.id.clone(),
        data: NodeData {
            title: row.label().to_string(),
            section: row.section.clone(),
            stage: row.stage.clone(),
            description: row.description.clone(),
            done: row.is_done(),
            actionable: closure.is_actionable(&row.id),
            priority: row.priority,
            tags: row.tags.clone(),
        },
        position: Point::ZERO,
    }
}

/// Build nodes for the visible rows and an edge `dep -> row` for every
/// dependency whose endpoint is also visible.
pub fn build_graph(visible: &[&TaskRow], closure: &Closure) -> Graph {
    let visible_ids: HashSet<&str> = visible.iter().map(|row| row.id.as_str()).collect();

    let nodes = visible.iter().map(|row| node_for(row, closure)).collect();

    let edges: BTreeSet<GraphEdge> = visible
        .iter()
        .flat_map(|row| {
            row.depends_on
                .iter()
                .filter(|dep| visible_ids.contains(dep.as_str()))
                .map(|dep| GraphEdge {
                    source: dep.clone(),
                    target: row.id.clone(),
                })
        })
        .collect();

    Graph {
        nodes,
        edges: edges.into_iter().collect(),
    }
}
