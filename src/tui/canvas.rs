//! Rasterizes a laid-out snapshot into a grid of terminal cells.

use std::collections::HashSet;

use crate::graph::{GraphNode, Point};
use crate::layout::{Direction, LayoutConfig};
use crate::pipeline::Snapshot;

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Edge,
    Arrow,
    Border(usize),
    Text(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub kind: CellKind,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            kind: CellKind::Empty,
        }
    }
}

/// Character grid for the whole graph. The view scrolls over it.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    pub width: usize,
    pub height: usize,
    cells: Vec<Cell>,
}

fn line_char(mask: u8) -> char {
    match mask {
        m if m == LEFT | RIGHT || m == LEFT || m == RIGHT => '─',
        m if m == UP | DOWN || m == UP || m == DOWN => '│',
        m if m == DOWN | RIGHT => '┌',
        m if m == DOWN | LEFT => '┐',
        m if m == UP | RIGHT => '└',
        m if m == UP | LEFT => '┘',
        m if m == UP | DOWN | RIGHT => '├',
        m if m == UP | DOWN | LEFT => '┤',
        m if m == LEFT | RIGHT | DOWN => '┬',
        m if m == LEFT | RIGHT | UP => '┴',
        _ => '┼',
    }
}

fn cell_of(p: Point) -> (usize, usize) {
    (p.x.max(0.0).floor() as usize, p.y.max(0.0).floor() as usize)
}

struct Painter {
    width: usize,
    height: usize,
    masks: Vec<u8>,
    arrows: Vec<(usize, usize, char)>,
}

impl Painter {
    fn mark(&mut self, x: usize, y: usize, bits: u8) {
        if x < self.width && y < self.height {
            self.masks[y * self.width + x] |= bits;
        }
    }

    fn horizontal(&mut self, y: usize, x0: usize, x1: usize) {
        let (lo, hi) = (x0.min(x1), x0.max(x1));
        for x in lo..hi {
            self.mark(x, y, RIGHT);
            self.mark(x + 1, y, LEFT);
        }
    }

    fn vertical(&mut self, x: usize, y0: usize, y1: usize) {
        let (lo, hi) = (y0.min(y1), y0.max(y1));
        for y in lo..hi {
            self.mark(x, y, DOWN);
            self.mark(x, y + 1, UP);
        }
    }

    /// Connect two points with an elbow: along the rank axis to the
    /// midpoint, across, then along again.
    fn elbow(&mut self, a: (usize, usize), b: (usize, usize), direction: Direction) {
        match direction {
            Direction::LeftRight => {
                let mid = (a.0 + b.0) / 2;
                self.horizontal(a.1, a.0, mid);
                self.vertical(mid, a.1, b.1);
                self.horizontal(b.1, mid, b.0);
            }
            Direction::TopBottom => {
                let mid = (a.1 + b.1) / 2;
                self.vertical(a.0, a.1, mid);
                self.horizontal(mid, a.0, b.0);
                self.vertical(b.0, mid, b.1);
            }
        }
    }

    /// Arrowhead on the cell in front of the target border.
    fn arrow(&mut self, prev: (usize, usize), end: (usize, usize), direction: Direction) {
        let arrow = match direction {
            Direction::LeftRight if end.0 >= prev.0 => {
                end.0.checked_sub(1).map(|x| (x, end.1, '▶'))
            }
            Direction::LeftRight => Some((end.0, end.1, '◀')),
            Direction::TopBottom if end.1 >= prev.1 => {
                end.1.checked_sub(1).map(|y| (end.0, y, '▼'))
            }
            Direction::TopBottom => Some((end.0, end.1, '▲')),
        };
        if let Some(a) = arrow {
            self.arrows.push(a);
        }
    }
}

impl Canvas {
    pub fn draw(snapshot: &Snapshot, config: &LayoutConfig) -> Self {
        let layout = &snapshot.layout;
        let width = layout.width.ceil() as usize + 2;
        let height = layout.height.ceil() as usize + 1;
        let mut canvas = Canvas {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        };
        if snapshot.graph.nodes.is_empty() {
            return canvas;
        }

        let mut painter = Painter {
            width,
            height,
            masks: vec![0; width * height],
            arrows: Vec::new(),
        };
        for route in layout.edges.iter().filter(|r| r.points.len() >= 2) {
            let cells: Vec<(usize, usize)> = route.points.iter().map(|p| cell_of(*p)).collect();
            for w in cells.windows(2) {
                painter.elbow(w[0], w[1], layout.direction);
            }
            let n = cells.len();
            painter.arrow(cells[n - 2], cells[n - 1], layout.direction);
        }

        for (i, mask) in painter.masks.iter().enumerate() {
            if *mask != 0 {
                canvas.cells[i] = Cell {
                    ch: line_char(*mask),
                    kind: CellKind::Edge,
                };
            }
        }
        let mut arrow_cells = HashSet::new();
        for (x, y, ch) in painter.arrows {
            if arrow_cells.insert((x, y)) {
                canvas.put(x, y, ch, CellKind::Arrow);
            }
        }

        for (i, node) in snapshot.graph.nodes.iter().enumerate() {
            canvas.draw_node(i, node, config);
        }
        canvas
    }

    fn put(&mut self, x: usize, y: usize, ch: char, kind: CellKind) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = Cell { ch, kind };
        }
    }

    fn draw_node(&mut self, index: usize, node: &GraphNode, config: &LayoutConfig) {
        let (x, y) = cell_of(node.position);
        let w = config.node_width.round().max(1.0) as usize;
        let h = config.node_height.round().max(1.0) as usize;
        let border = CellKind::Border(index);

        let (text_x, text_y, text_w) = if w >= 3 && h >= 3 {
            for dx in 0..w {
                let ch = if dx == 0 || dx == w - 1 { None } else { Some('─') };
                self.put(x + dx, y, ch.unwrap_or(if dx == 0 { '┌' } else { '┐' }), border);
                self.put(x + dx, y + h - 1, ch.unwrap_or(if dx == 0 { '└' } else { '┘' }), border);
            }
            for dy in 1..h - 1 {
                self.put(x, y + dy, '│', border);
                self.put(x + w - 1, y + dy, '│', border);
                for dx in 1..w - 1 {
                    self.put(x + dx, y + dy, ' ', CellKind::Text(index));
                }
            }
            (x + 1, y + h / 2, w - 2)
        } else {
            (x, y, w)
        };

        let icon = if node.data.done { 'x' } else { '.' };
        let label = format!("{icon} {}", node.data.title);
        for (dx, ch) in label.chars().take(text_w).enumerate() {
            self.put(text_x + dx, text_y, ch, CellKind::Text(index));
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| c.ch).collect::<String>().trim_end().to_string())
            .collect()
    }
}
