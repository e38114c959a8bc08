//! Layered (Sugiyama-style) layout of the visible dependency graph.
//!
//! Phases:
//! 1. Cycle breaking: DFS in id order, back edges are reversed.
//! 2. Ranking: longest path from sources, so every edge goes from a lower
//!    rank to a strictly higher one.
//! 3. Edges spanning more than one rank are split by virtual nodes.
//! 4. Ordering within ranks: iterated barycenter sweeps, keeping the order
//!    with the fewest crossings. Ties break by id.
//! 5. Coordinates: rank picks the rank axis (x for LR, y for TB), order
//!    picks the other axis, then nodes are pulled toward the median of
//!    their neighbours without breaking minimum separation.
//!
//! Everything is keyed by node id, so the result does not depend on the
//! order nodes arrive in.

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::graph::{Graph, Point};

/// Which way dependencies flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Direction {
    /// Dependencies flow left to right.
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    /// Dependencies flow top to bottom.
    #[serde(rename = "TB")]
    TopBottom,
}

impl Direction {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LR" => Ok(Self::LeftRight),
            "TB" => Ok(Self::TopBottom),
            _ => bail!("invalid direction '{s}': must be LR or TB"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftRight => "LR",
            Self::TopBottom => "TB",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::LeftRight => Self::TopBottom,
            Self::TopBottom => Self::LeftRight,
        }
    }
}

/// Node box size and spacing, in layout units (terminal cells by default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between adjacent ranks.
    pub rank_sep: f64,
    /// Gap between sibling nodes in a rank.
    pub node_sep: f64,
    /// Gap next to edge bends routed through a rank.
    pub edge_sep: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 24.0,
            node_height: 3.0,
            rank_sep: 6.0,
            node_sep: 2.0,
            edge_sep: 1.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.node_width > 0.0 && self.node_height > 0.0) {
            bail!("node width and height must be positive");
        }
        if self.rank_sep < 0.0 || self.node_sep < 0.0 || self.edge_sep < 0.0 {
            bail!("separations must not be negative");
        }
        Ok(())
    }
}

/// Route of one graph edge, from source border to target border.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRoute {
    pub source: String,
    pub target: String,
    /// Polyline points. Empty for self-loops.
    pub points: Vec<Point>,
    /// True when the edge was reversed to break a cycle.
    pub reversed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub direction: Direction,
    /// Top-left corner of each node box.
    pub positions: HashMap<String, Point>,
    pub ranks: HashMap<String, usize>,
    pub edges: Vec<EdgeRoute>,
    pub width: f64,
    pub height: f64,
}

impl Layout {
    pub fn position(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn rank(&self, id: &str) -> Option<usize> {
        self.ranks.get(id).copied()
    }

    /// Write positions into the graph's nodes.
    pub fn apply(&self, graph: &mut Graph) {
        for node in &mut graph.nodes {
            if let Some(p) = self.positions.get(&node.id) {
                node.position = *p;
            }
        }
    }
}

// ── Internal graph ───────────────────────────────────────────────────

struct LayerGraph {
    /// Sort key per vertex: node id for real vertices, edge-derived for
    /// virtual ones.
    keys: Vec<String>,
    /// Number of real vertices; vertices at `real..` are virtual.
    real: usize,
    rank: Vec<usize>,
    succ: Vec<Vec<usize>>,
    pred: Vec<Vec<usize>>,
}

impl LayerGraph {
    fn is_virtual(&self, v: usize) -> bool {
        v >= self.real
    }

    fn add_virtual(&mut self, key: String, rank: usize) -> usize {
        self.keys.push(key);
        self.rank.push(rank);
        self.succ.push(Vec::new());
        self.pred.push(Vec::new());
        self.keys.len() - 1
    }

    fn link(&mut self, u: usize, v: usize) {
        self.succ[u].push(v);
        self.pred[v].push(u);
    }
}

/// An input edge after cycle breaking, oriented from lower to higher rank.
struct OrientedEdge {
    source: String,
    target: String,
    /// Vertex chain in rank order, endpoints included.
    chain: Vec<usize>,
    reversed: bool,
}

// ── Phase 1: cycle breaking ──────────────────────────────────────────

/// Edges that close a cycle when the graph is walked depth-first from
/// each unvisited vertex in index order.
fn back_edges(n: usize, adj: &[Vec<usize>]) -> Vec<(usize, usize)> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        OnStack,
        Finished,
    }

    let mut state = vec![State::Unvisited; n];
    let mut back = Vec::new();

    for root in 0..n {
        if state[root] != State::Unvisited {
            continue;
        }
        // (vertex, next successor index)
        let mut stack = vec![(root, 0usize)];
        state[root] = State::OnStack;
        while let Some(top) = stack.last_mut() {
            let u = top.0;
            if let Some(&v) = adj[u].get(top.1) {
                top.1 += 1;
                match state[v] {
                    State::Unvisited => {
                        state[v] = State::OnStack;
                        stack.push((v, 0));
                    }
                    State::OnStack => back.push((u, v)),
                    State::Finished => {}
                }
            } else {
                state[u] = State::Finished;
                stack.pop();
            }
        }
    }
    back
}

// ── Phase 2: ranking ─────────────────────────────────────────────────

/// Longest-path ranks over an acyclic edge list.
fn longest_path_ranks(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut adj = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for &(u, v) in edges {
        adj[u].push(v);
        in_degree[v] += 1;
    }

    let mut rank = vec![0usize; n];
    let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut head = 0;
    while head < queue.len() {
        let u = queue[head];
        head += 1;
        for &v in &adj[u] {
            rank[v] = rank[v].max(rank[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push(v);
            }
        }
    }
    rank
}

// ── Phase 4: ordering ────────────────────────────────────────────────

const MAX_SWEEPS: usize = 24;

fn rank_buckets(g: &LayerGraph) -> Vec<Vec<usize>> {
    let max_rank = g.rank.iter().copied().max().unwrap_or(0);
    let mut buckets = vec![Vec::new(); max_rank + 1];
    for (v, &r) in g.rank.iter().enumerate() {
        buckets[r].push(v);
    }
    for bucket in &mut buckets {
        bucket.sort_by(|a, b| g.keys[*a].cmp(&g.keys[*b]));
    }
    buckets
}

fn positions_of(order: &[Vec<usize>], n: usize) -> Vec<usize> {
    let mut pos = vec![0; n];
    for rank in order {
        for (i, &v) in rank.iter().enumerate() {
            pos[v] = i;
        }
    }
    pos
}

fn barycenter(neighbors: &[usize], pos: &[usize]) -> Option<f64> {
    if neighbors.is_empty() {
        return None;
    }
    let sum: usize = neighbors.iter().map(|&u| pos[u]).sum();
    Some(sum as f64 / neighbors.len() as f64)
}

/// Reorder one rank by the barycenter of its neighbours in the adjacent
/// rank. Vertices without neighbours keep their current slot.
fn sweep_rank(rank: &mut [usize], g: &LayerGraph, pos: &[usize], downward: bool) {
    let mut scored: Vec<(usize, f64)> = rank
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let neighbors = if downward { &g.pred[v] } else { &g.succ[v] };
            (v, barycenter(neighbors, pos).unwrap_or(i as f64))
        })
        .collect();
    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| g.keys[a.0].cmp(&g.keys[b.0]))
    });
    for (slot, (v, _)) in rank.iter_mut().zip(scored) {
        *slot = v;
    }
}

fn count_crossings(upper: &[usize], lower: &[usize], g: &LayerGraph, pos: &[usize]) -> usize {
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (i, &u) in upper.iter().enumerate() {
        for &v in &g.succ[u] {
            if lower.get(pos[v]) == Some(&v) {
                pairs.push((i, pos[v]));
            }
        }
    }
    let mut crossings = 0;
    for i in 0..pairs.len() {
        for j in (i + 1)..pairs.len() {
            let (a1, b1) = pairs[i];
            let (a2, b2) = pairs[j];
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn total_crossings(order: &[Vec<usize>], g: &LayerGraph) -> usize {
    let pos = positions_of(order, g.keys.len());
    order
        .windows(2)
        .map(|w| count_crossings(&w[0], &w[1], g, &pos))
        .sum()
}

fn order_ranks(g: &LayerGraph) -> Vec<Vec<usize>> {
    let mut order = rank_buckets(g);
    if order.len() <= 1 {
        return order;
    }
    let mut best = order.clone();
    let mut best_crossings = total_crossings(&order, g);

    for _ in 0..MAX_SWEEPS {
        if best_crossings == 0 {
            break;
        }
        for r in 1..order.len() {
            let pos = positions_of(&order, g.keys.len());
            sweep_rank(&mut order[r], g, &pos, true);
        }
        for r in (0..order.len() - 1).rev() {
            let pos = positions_of(&order, g.keys.len());
            sweep_rank(&mut order[r], g, &pos, false);
        }
        let crossings = total_crossings(&order, g);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = order.clone();
        } else {
            break;
        }
    }
    best
}

// ── Phase 5: coordinates ─────────────────────────────────────────────

const ALIGN_PASSES: usize = 4;

struct Extents {
    /// Size of a real node along the rank axis.
    along: f64,
    /// Size of a real node across the rank axis.
    across: f64,
}

fn extents(direction: Direction, config: &LayoutConfig) -> Extents {
    match direction {
        Direction::LeftRight => Extents {
            along: config.node_width,
            across: config.node_height,
        },
        Direction::TopBottom => Extents {
            along: config.node_height,
            across: config.node_width,
        },
    }
}

/// Minimum distance between the centers of two neighbours in a rank.
fn separation(g: &LayerGraph, a: usize, b: usize, across: f64, config: &LayoutConfig) -> f64 {
    let half = |v: usize| if g.is_virtual(v) { 0.0 } else { across / 2.0 };
    let gap = if g.is_virtual(a) || g.is_virtual(b) {
        config.edge_sep
    } else {
        config.node_sep
    };
    half(a) + half(b) + gap
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Place one rank as close to `desired` as separation allows: pack from
/// the left, pack from the right, and average the two. Both packings
/// satisfy the separation constraints, so their average does too.
fn place_rank(rank: &[usize], desired: &[f64], seps: &[f64]) -> Vec<f64> {
    let n = rank.len();
    let mut left = desired.to_vec();
    for i in 1..n {
        left[i] = left[i].max(left[i - 1] + seps[i - 1]);
    }
    let mut right = desired.to_vec();
    for i in (0..n.saturating_sub(1)).rev() {
        right[i] = right[i].min(right[i + 1] - seps[i]);
    }
    left.iter().zip(&right).map(|(l, r)| (l + r) / 2.0).collect()
}

/// Center coordinate across the rank axis for every vertex.
fn assign_cross_coords(
    order: &[Vec<usize>],
    g: &LayerGraph,
    across: f64,
    config: &LayoutConfig,
) -> Vec<f64> {
    let mut coord = vec![0.0; g.keys.len()];
    let seps: Vec<Vec<f64>> = order
        .iter()
        .map(|rank| {
            rank.windows(2)
                .map(|w| separation(g, w[0], w[1], across, config))
                .collect()
        })
        .collect();

    for (rank, sep) in order.iter().zip(&seps) {
        let mut c = 0.0;
        for (i, &v) in rank.iter().enumerate() {
            if i > 0 {
                c += sep[i - 1];
            }
            coord[v] = c;
        }
    }

    for pass in 0..ALIGN_PASSES {
        let downward = pass % 2 == 0;
        let ranks: Vec<usize> = if downward {
            (1..order.len()).collect()
        } else {
            (0..order.len().saturating_sub(1)).rev().collect()
        };
        for r in ranks {
            let desired: Vec<f64> = order[r]
                .iter()
                .map(|&v| {
                    let neighbors = if downward { &g.pred[v] } else { &g.succ[v] };
                    let mut values: Vec<f64> = neighbors.iter().map(|&u| coord[u]).collect();
                    median(&mut values).unwrap_or(coord[v])
                })
                .collect();
            let placed = place_rank(&order[r], &desired, &seps[r]);
            for (&v, c) in order[r].iter().zip(placed) {
                coord[v] = c;
            }
        }
    }
    coord
}

// ── Entry point ──────────────────────────────────────────────────────

/// Lay out `graph`. Positions are top-left corners, normalized so the
/// smallest coordinate on each axis is zero.
pub fn layout(graph: &Graph, direction: Direction, config: &LayoutConfig) -> Layout {
    if graph.nodes.is_empty() {
        return Layout {
            direction,
            ..Layout::default()
        };
    }

    // Real vertices sorted by id.
    let mut ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let n = ids.len();

    let mut input: Vec<(usize, usize)> = graph
        .edges
        .iter()
        .filter(|e| !e.is_self_loop())
        .filter_map(|e| Some((*index.get(e.source.as_str())?, *index.get(e.target.as_str())?)))
        .collect();
    input.sort_unstable();
    input.dedup();

    let mut adj = vec![Vec::new(); n];
    for &(u, v) in &input {
        adj[u].push(v);
    }
    let back = back_edges(n, &adj);
    let acyclic: Vec<(usize, usize, bool)> = input
        .iter()
        .map(|&(u, v)| {
            if back.contains(&(u, v)) {
                (v, u, true)
            } else {
                (u, v, false)
            }
        })
        .collect();
    let mut rank_edges: Vec<(usize, usize)> = acyclic.iter().map(|&(u, v, _)| (u, v)).collect();
    rank_edges.sort_unstable();
    rank_edges.dedup();
    let rank = longest_path_ranks(n, &rank_edges);

    let mut g = LayerGraph {
        keys: ids.iter().map(|s| s.to_string()).collect(),
        real: n,
        rank,
        succ: vec![Vec::new(); n],
        pred: vec![Vec::new(); n],
    };

    // Phase 3: split long edges.
    let mut oriented = Vec::with_capacity(acyclic.len());
    for &(u, v, reversed) in &acyclic {
        let (source, target) = if reversed { (v, u) } else { (u, v) };
        let mut chain = vec![u];
        for r in (g.rank[u] + 1)..g.rank[v] {
            let key = format!("{}\u{0}{}\u{0}{r}", ids[u], ids[v]);
            chain.push(g.add_virtual(key, r));
        }
        chain.push(v);
        for w in chain.windows(2) {
            g.link(w[0], w[1]);
        }
        oriented.push(OrientedEdge {
            source: ids[source].to_string(),
            target: ids[target].to_string(),
            chain,
            reversed,
        });
    }

    let order = order_ranks(&g);
    let ext = extents(direction, config);
    let cross = assign_cross_coords(&order, &g, ext.across, config);
    let rank_step = ext.along + config.rank_sep;

    // Center of every vertex in (along, across) space.
    let center = |v: usize| -> (f64, f64) {
        (g.rank[v] as f64 * rank_step + ext.along / 2.0, cross[v])
    };
    let min_across = (0..g.keys.len())
        .map(|v| cross[v] - if g.is_virtual(v) { 0.0 } else { ext.across / 2.0 })
        .fold(f64::INFINITY, f64::min);

    let to_xy = |along: f64, across: f64| -> Point {
        let across = across - min_across;
        match direction {
            Direction::LeftRight => Point::new(along, across),
            Direction::TopBottom => Point::new(across, along),
        }
    };

    let mut positions = HashMap::with_capacity(n);
    let mut ranks = HashMap::with_capacity(n);
    let mut width: f64 = 0.0;
    let mut height: f64 = 0.0;
    for (v, id) in ids.iter().enumerate() {
        let (along, across) = center(v);
        let c = to_xy(along, across);
        let top_left = Point::new(c.x - config.node_width / 2.0, c.y - config.node_height / 2.0);
        width = width.max(top_left.x + config.node_width);
        height = height.max(top_left.y + config.node_height);
        positions.insert(id.to_string(), top_left);
        ranks.insert(id.to_string(), g.rank[v]);
    }

    let mut edges: Vec<EdgeRoute> = oriented
        .into_iter()
        .map(|e| {
            let last = e.chain.len() - 1;
            let mut points: Vec<Point> = e
                .chain
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let (along, across) = center(v);
                    // Leave the first box from its far side, enter the last from its near side.
                    let along = if i == 0 {
                        along + ext.along / 2.0
                    } else if i == last {
                        along - ext.along / 2.0
                    } else {
                        along
                    };
                    to_xy(along, across)
                })
                .collect();
            if e.reversed {
                points.reverse();
            }
            EdgeRoute {
                source: e.source,
                target: e.target,
                points,
                reversed: e.reversed,
            }
        })
        .collect();

    for e in graph.edges.iter().filter(|e| e.is_self_loop()) {
        if index.contains_key(e.source.as_str()) {
            edges.push(EdgeRoute {
                source: e.source.clone(),
                target: e.target.clone(),
                points: Vec::new(),
                reversed: false,
            });
        }
    }
    edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

    Layout {
        direction,
        positions,
        ranks,
        edges,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode, NodeData};
    use crate::model::Stage;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            data: NodeData {
                title: id.into(),
                section: "General".into(),
                stage: Stage::Setup,
                description: String::new(),
                done: false,
                actionable: false,
                priority: None,
                tags: Default::default(),
            },
            position: Point::ZERO,
        }
    }

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
        Graph {
            nodes: ids.iter().map(|id| node(id)).collect(),
            edges: edges
                .iter()
                .map(|(s, t)| GraphEdge {
                    source: s.to_string(),
                    target: t.to_string(),
                })
                .collect(),
        }
    }

    fn overlaps(a: Point, b: Point, config: &LayoutConfig) -> bool {
        let eps = 1e-9;
        a.x < b.x + config.node_width - eps
            && b.x < a.x + config.node_width - eps
            && a.y < b.y + config.node_height - eps
            && b.y < a.y + config.node_height - eps
    }

    fn assert_no_overlap(layout: &Layout, config: &LayoutConfig) {
        let all: Vec<(&String, &Point)> = layout.positions.iter().collect();
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert!(
                    !overlaps(*all[i].1, *all[j].1, config),
                    "{} overlaps {}",
                    all[i].0,
                    all[j].0
                );
            }
        }
    }

    #[test]
    fn chain_ranks_increase_horizontally() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let config = LayoutConfig::default();
        let l = layout(&g, Direction::LeftRight, &config);
        assert_eq!(l.rank("A"), Some(0));
        assert_eq!(l.rank("B"), Some(1));
        assert_eq!(l.rank("C"), Some(2));
        let (a, b, c) = (
            l.position("A").unwrap(),
            l.position("B").unwrap(),
            l.position("C").unwrap(),
        );
        assert!(a.x < b.x && b.x < c.x);
        assert_eq!(a.y, b.y);
        assert!(b.x - a.x >= config.node_width + config.rank_sep - 1e-9);
    }

    #[test]
    fn vertical_direction_swaps_axes() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let l = layout(&g, Direction::TopBottom, &LayoutConfig::default());
        let (a, b) = (l.position("A").unwrap(), l.position("B").unwrap());
        assert!(a.y < b.y);
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn rank_is_longest_path() {
        // A -> B -> C and A -> C: C sits after B, not next to A.
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("A", "C")]);
        let l = layout(&g, Direction::LeftRight, &LayoutConfig::default());
        assert_eq!(l.rank("C"), Some(2));
        let route = l.edges.iter().find(|e| e.source == "A" && e.target == "C").unwrap();
        // Source border, one bend through rank 1, target border.
        assert_eq!(route.points.len(), 3);
        assert!(route.points.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn siblings_do_not_overlap() {
        let g = graph(
            &["root", "a", "b", "c", "d", "leaf"],
            &[
                ("root", "a"),
                ("root", "b"),
                ("root", "c"),
                ("root", "d"),
                ("a", "leaf"),
                ("d", "leaf"),
            ],
        );
        for direction in [Direction::LeftRight, Direction::TopBottom] {
            let config = LayoutConfig::default();
            let l = layout(&g, direction, &config);
            assert_no_overlap(&l, &config);
        }
    }

    #[test]
    fn separation_respected_within_rank() {
        let g = graph(&["r", "a", "b"], &[("r", "a"), ("r", "b")]);
        let config = LayoutConfig {
            node_sep: 5.0,
            ..LayoutConfig::default()
        };
        let l = layout(&g, Direction::LeftRight, &config);
        let (a, b) = (l.position("a").unwrap(), l.position("b").unwrap());
        assert!((a.y - b.y).abs() >= config.node_height + config.node_sep - 1e-9);
    }

    #[test]
    fn every_acyclic_edge_points_forward() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "c"), ("b", "c"), ("c", "e"), ("a", "d"), ("d", "e"), ("b", "e")],
        );
        let l = layout(&g, Direction::TopBottom, &LayoutConfig::default());
        for e in &g.edges {
            assert!(l.rank(&e.source) < l.rank(&e.target), "{}", e.id());
            assert!(l.position(&e.source).unwrap().y < l.position(&e.target).unwrap().y);
        }
    }

    #[test]
    fn cycles_terminate_and_mark_reversed() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let config = LayoutConfig::default();
        let l = layout(&g, Direction::LeftRight, &config);
        assert_eq!(l.positions.len(), 3);
        assert_eq!(l.edges.iter().filter(|e| e.reversed).count(), 1);
        assert_no_overlap(&l, &config);
        let again = layout(&g, Direction::LeftRight, &config);
        assert_eq!(l, again);
    }

    #[test]
    fn reversed_route_runs_source_to_target() {
        let g = graph(&["a", "b"], &[("a", "b"), ("b", "a")]);
        let l = layout(&g, Direction::LeftRight, &LayoutConfig::default());
        let back = l.edges.iter().find(|e| e.reversed).unwrap();
        let src = l.position(&back.source).unwrap();
        let first = back.points[0];
        assert!((first.x - src.x).abs() < 1e-9, "route starts at source's near border");
    }

    #[test]
    fn self_loops_are_ignored_for_ranking() {
        let g = graph(&["a", "b"], &[("a", "a"), ("a", "b")]);
        let l = layout(&g, Direction::LeftRight, &LayoutConfig::default());
        assert_eq!(l.rank("a"), Some(0));
        assert_eq!(l.rank("b"), Some(1));
        let self_loop = l.edges.iter().find(|e| e.source == e.target).unwrap();
        assert!(self_loop.points.is_empty());
    }

    #[test]
    fn empty_graph() {
        let l = layout(&Graph::default(), Direction::TopBottom, &LayoutConfig::default());
        assert!(l.positions.is_empty());
        assert_eq!(l.width, 0.0);
        assert_eq!(l.direction, Direction::TopBottom);
    }

    #[test]
    fn input_order_does_not_matter() {
        let edges = [("a", "c"), ("b", "c"), ("c", "d")];
        let config = LayoutConfig::default();
        let one = layout(&graph(&["a", "b", "c", "d"], &edges), Direction::LeftRight, &config);
        let two = layout(&graph(&["d", "c", "b", "a"], &edges), Direction::LeftRight, &config);
        assert_eq!(one.positions, two.positions);
    }

    #[test]
    fn coordinates_are_normalized() {
        let g = graph(&["r", "a", "b", "c"], &[("r", "a"), ("r", "b"), ("r", "c")]);
        let l = layout(&g, Direction::LeftRight, &LayoutConfig::default());
        let min_x = l.positions.values().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = l.positions.values().map(|p| p.y).fold(f64::INFINITY, f64::min);
        assert_eq!(min_x, 0.0);
        assert!(min_y.abs() < 1e-9);
    }

    #[test]
    fn apply_writes_positions() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        let l = layout(&g, Direction::LeftRight, &LayoutConfig::default());
        l.apply(&mut g);
        assert_eq!(g.node("b").unwrap().position, l.position("b").unwrap());
    }

    #[test]
    fn direction_parse() {
        assert_eq!(Direction::parse("lr").unwrap(), Direction::LeftRight);
        assert_eq!(Direction::parse("TB").unwrap(), Direction::TopBottom);
        assert!(Direction::parse("RL").is_err());
        assert_eq!(Direction::LeftRight.toggle(), Direction::TopBottom);
    }

    #[test]
    fn config_validation() {
        assert!(LayoutConfig::default().validate().is_ok());
        let bad = LayoutConfig {
            node_width: 0.0,
            ..LayoutConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
