use anyhow::Result;

use super::canvas::Canvas;
use crate::layout::Direction;
use crate::model::{Stage, TaskRow};
use crate::pipeline::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    /// Cursor is in the sidebar's section and tag list.
    Filters,
    Help,
}

/// A toggleable entry in the sidebar list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterItem {
    Section(String),
    Tag(String),
}

/// Stages bound to the number keys, in key order.
pub const STAGE_KEYS: [Stage; 5] = [
    Stage::Setup,
    Stage::Start,
    Stage::Early,
    Stage::Late,
    Stage::Unsorted,
];

pub const PAN_X: i64 = 8;
pub const PAN_Y: i64 = 3;

pub struct App {
    pub session: Session,
    pub canvas: Canvas,
    pub mode: Mode,
    pub selected: Option<String>,
    /// Canvas cell shown at the top-left of the view.
    pub offset: (i64, i64),
    /// Size of the canvas area at the last draw.
    pub viewport: (u16, u16),
    pub search_input: String,
    /// Index into `filter_items()`.
    pub filter_cursor: usize,
    pub error: Option<String>,
}

impl App {
    pub fn new(session: Session) -> Self {
        let mut app = App {
            canvas: Canvas::default(),
            session,
            mode: Mode::Normal,
            selected: None,
            offset: (0, 0),
            viewport: (0, 0),
            search_input: String::new(),
            filter_cursor: 0,
            error: None,
        };
        app.refresh();
        app
    }

    /// Redraw the canvas from the current snapshot and keep the selection
    /// on a visible node.
    pub fn refresh(&mut self) {
        self.canvas = Canvas::draw(self.session.snapshot(), &self.session.settings().layout);
        let order = self.node_order();
        let still_visible = self
            .selected
            .as_deref()
            .is_some_and(|id| order.iter().any(|o| o == id));
        if !still_visible {
            self.selected = order.into_iter().next();
        }
        self.clamp_offset();
        let items = self.filter_items().len();
        self.filter_cursor = self.filter_cursor.min(items.saturating_sub(1));
    }

    /// Visible node ids in reading order: by rank, then across the rank.
    pub fn node_order(&self) -> Vec<String> {
        let snapshot = self.session.snapshot();
        let direction = snapshot.layout.direction;
        let mut nodes: Vec<(usize, f64, &str)> = snapshot
            .graph
            .nodes
            .iter()
            .map(|n| {
                let across = match direction {
                    Direction::LeftRight => n.position.y,
                    Direction::TopBottom => n.position.x,
                };
                (snapshot.layout.rank(&n.id).unwrap_or(0), across, n.id.as_str())
            })
            .collect();
        nodes.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .then(a.2.cmp(b.2))
        });
        nodes.into_iter().map(|(_, _, id)| id.to_string()).collect()
    }

    fn step_selection(&mut self, forward: bool) {
        let order = self.node_order();
        if order.is_empty() {
            self.selected = None;
            return;
        }
        let current = self
            .selected
            .as_deref()
            .and_then(|id| order.iter().position(|o| o == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % order.len(),
            (Some(i), false) => (i + order.len() - 1) % order.len(),
        };
        self.selected = Some(order[next].clone());
        self.scroll_to_selected();
    }

    pub fn select_next(&mut self) {
        self.step_selection(true);
    }

    pub fn select_prev(&mut self) {
        self.step_selection(false);
    }

    pub fn selected_row(&self) -> Option<&TaskRow> {
        self.selected.as_deref().and_then(|id| self.session.store().get(id))
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_deref()?;
        self.session.snapshot().graph.nodes.iter().position(|n| n.id == id)
    }

    pub fn toggle_selected(&mut self) -> Result<()> {
        if let Some(id) = self.selected.clone() {
            self.session.toggle_done(&id)?;
            self.refresh();
        }
        Ok(())
    }

    pub fn pan(&mut self, dx: i64, dy: i64) {
        self.offset.0 += dx;
        self.offset.1 += dy;
        self.clamp_offset();
    }

    fn clamp_offset(&mut self) {
        let max_x = (self.canvas.width as i64 - 1).max(0);
        let max_y = (self.canvas.height as i64 - 1).max(0);
        self.offset.0 = self.offset.0.clamp(0, max_x);
        self.offset.1 = self.offset.1.clamp(0, max_y);
    }

    /// Center the view on the selected node, or return to the origin.
    pub fn recenter(&mut self) {
        let snapshot = self.session.snapshot();
        let layout = &self.session.settings().layout;
        let target = self
            .selected
            .as_deref()
            .and_then(|id| snapshot.layout.position(id))
            .map(|p| {
                (
                    (p.x + layout.node_width / 2.0) as i64 - i64::from(self.viewport.0) / 2,
                    (p.y + layout.node_height / 2.0) as i64 - i64::from(self.viewport.1) / 2,
                )
            });
        self.offset = target.unwrap_or((0, 0));
        self.clamp_offset();
    }

    /// Recenter when the selected node is off screen.
    fn scroll_to_selected(&mut self) {
        let Some(p) = self
            .selected
            .as_deref()
            .and_then(|id| self.session.snapshot().layout.position(id))
        else {
            return;
        };
        let layout = &self.session.settings().layout;
        let (vw, vh) = (i64::from(self.viewport.0), i64::from(self.viewport.1));
        if vw == 0 || vh == 0 {
            return;
        }
        let (x0, y0) = (p.x as i64, p.y as i64);
        let (x1, y1) = (x0 + layout.node_width as i64, y0 + layout.node_height as i64);
        if x0 < self.offset.0
            || x1 > self.offset.0 + vw
            || y0 < self.offset.1
            || y1 > self.offset.1 + vh
        {
            self.recenter();
        }
    }

    pub fn cycle_status(&mut self) {
        self.session.cycle_status_filter();
        self.refresh();
    }

    pub fn toggle_actionable(&mut self) {
        self.session.toggle_actionable_only();
        self.refresh();
    }

    /// `key` is 1-based, matching the number row.
    pub fn toggle_stage_key(&mut self, key: usize) {
        if let Some(stage) = key.checked_sub(1).and_then(|i| STAGE_KEYS.get(i)) {
            self.session.toggle_stage(stage.clone());
            self.refresh();
        }
    }

    pub fn toggle_direction(&mut self) {
        let next = self.session.settings().direction.toggle();
        self.session.set_direction(next);
        self.refresh();
        self.recenter();
    }

    pub fn start_search(&mut self) {
        self.search_input = self.session.settings().filter.query.clone();
        self.mode = Mode::Search;
    }

    pub fn apply_search(&mut self) {
        let query = std::mem::take(&mut self.search_input);
        self.session.set_query(&query);
        self.mode = Mode::Normal;
        self.refresh();
    }

    pub fn cancel_search(&mut self) {
        self.search_input.clear();
        self.mode = Mode::Normal;
    }

    /// Sections in first-seen order, then tags sorted.
    pub fn filter_items(&self) -> Vec<FilterItem> {
        let store = self.session.store();
        store
            .sections()
            .into_iter()
            .map(FilterItem::Section)
            .chain(store.tags().into_iter().map(FilterItem::Tag))
            .collect()
    }

    pub fn start_filter_pick(&mut self) {
        self.mode = Mode::Filters;
    }

    pub fn close_filter_pick(&mut self) {
        self.mode = Mode::Normal;
    }

    /// Move the sidebar cursor, wrapping at either end.
    pub fn move_filter_cursor(&mut self, delta: isize) {
        let len = self.filter_items().len() as isize;
        if len == 0 {
            self.filter_cursor = 0;
            return;
        }
        self.filter_cursor = (self.filter_cursor as isize + delta).rem_euclid(len) as usize;
    }

    pub fn toggle_filter_item(&mut self) {
        match self.filter_items().into_iter().nth(self.filter_cursor) {
            Some(FilterItem::Section(section)) => self.session.toggle_section(&section),
            Some(FilterItem::Tag(tag)) => self.session.toggle_tag(&tag),
            None => return,
        }
        self.refresh();
    }

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            Mode::Help => Mode::Normal,
            _ => Mode::Help,
        };
    }

    pub fn reload(&mut self, rows: Vec<TaskRow>) -> Result<()> {
        self.session.reload_rows(rows)?;
        self.refresh();
        Ok(())
    }
}
