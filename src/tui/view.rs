use ratatui::buffer::Buffer;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap};

use super::app::{App, FilterItem, Mode, STAGE_KEYS};
use super::canvas::{Canvas, CellKind};
use crate::graph::GraphNode;
use crate::output::{dependents, format_task_detail};

const SIDEBAR_WIDTH: u16 = 36;

/// Scrolled window onto the canvas.
struct FlowView<'a> {
    canvas: &'a Canvas,
    nodes: &'a [GraphNode],
    offset: (i64, i64),
    selected: Option<usize>,
}

impl FlowView<'_> {
    fn style_for(&self, kind: CellKind) -> Style {
        let node_style = |i: usize| {
            let Some(node) = self.nodes.get(i) else {
                return Style::default();
            };
            if node.data.done {
                Style::default().fg(Color::DarkGray)
            } else if node.data.actionable {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            }
        };
        match kind {
            CellKind::Empty => Style::default(),
            CellKind::Edge => Style::default().fg(Color::Blue),
            CellKind::Arrow => Style::default().fg(Color::Cyan),
            CellKind::Border(i) if Some(i) == self.selected => {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            }
            CellKind::Border(i) => node_style(i),
            CellKind::Text(i) if Some(i) == self.selected => {
                node_style(i).add_modifier(Modifier::BOLD)
            }
            CellKind::Text(i) => node_style(i),
        }
    }
}

impl Widget for FlowView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for dy in 0..area.height {
            for dx in 0..area.width {
                let cx = self.offset.0 + i64::from(dx);
                let cy = self.offset.1 + i64::from(dy);
                if cx < 0 || cy < 0 {
                    continue;
                }
                let Some(cell) = self.canvas.get(cx as usize, cy as usize) else {
                    continue;
                };
                if cell.kind == CellKind::Empty {
                    continue;
                }
                if let Some(target) = buf.cell_mut((area.x + dx, area.y + dy)) {
                    target.set_char(cell.ch).set_style(self.style_for(cell.kind));
                }
            }
        }
    }
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(SIDEBAR_WIDTH)])
        .split(rows[0]);

    render_flow(frame, app, cols[0]);
    render_sidebar(frame, app, cols[1]);
    render_status_line(frame, app, rows[1]);

    if app.mode == Mode::Help {
        render_help(frame);
    }
}

fn render_flow(frame: &mut Frame, app: &mut App, area: Rect) {
    let snapshot = app.session.snapshot();
    let title = format!(
        " Flow {} · {}/{} tasks ",
        snapshot.layout.direction.as_str(),
        snapshot.visible.len(),
        app.session.store().len()
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.viewport = (inner.width, inner.height);

    if snapshot.graph.nodes.is_empty() {
        frame.render_widget(
            Paragraph::new("No tasks match the current filters.")
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let view = FlowView {
        canvas: &app.canvas,
        nodes: &snapshot.graph.nodes,
        offset: app.offset,
        selected: app.selected_index(),
    };
    frame.render_widget(view, inner);
}

fn checkbox(on: bool) -> &'static str {
    if on {
        "[x]"
    } else {
        "[ ]"
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let filter = &app.session.settings().filter;
    let key_style = Style::default().fg(Color::Cyan);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("/ ", key_style),
            Span::raw(format!("Search: {}", filter.query)),
        ]),
        Line::from(vec![
            Span::styled("s ", key_style),
            Span::raw(format!("Status: {}", filter.status.as_str())),
        ]),
        Line::from(vec![
            Span::styled("a ", key_style),
            Span::raw(format!("{} Actionable only", checkbox(filter.actionable_only))),
        ]),
        Line::from(""),
    ];
    for (i, stage) in STAGE_KEYS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", i + 1), key_style),
            Span::raw(format!("{} {stage}", checkbox(filter.stages.contains(stage)))),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("f ", key_style),
        Span::styled("Sections / #tags", Style::default().bold()),
    ]));

    let picking = app.mode == Mode::Filters;
    let first_item = lines.len();
    for (i, item) in app.filter_items().iter().enumerate() {
        let text = match item {
            FilterItem::Section(section) => {
                format!("  {} {section}", checkbox(filter.sections.contains(section)))
            }
            FilterItem::Tag(tag) => format!("  {} #{tag}", checkbox(filter.tags.contains(tag))),
        };
        let style = if picking && i == app.filter_cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    // Keep the cursor row in view.
    let height = chunks[0].height.saturating_sub(2) as usize;
    let cursor_line = first_item + app.filter_cursor;
    let scroll = if picking {
        (cursor_line + 1).saturating_sub(height)
    } else {
        0
    };

    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Filters "))
            .scroll((scroll as u16, 0)),
        chunks[0],
    );

    let detail = match app.selected_row() {
        Some(row) => {
            let snapshot = app.session.snapshot();
            let deps = dependents(app.session.store().rows(), &row.id);
            format_task_detail(row, &snapshot.closure, &deps)
        }
        None => "Nothing selected.".to_string(),
    };
    frame.render_widget(
        Paragraph::new(detail)
            .block(Block::default().borders(Borders::ALL).title(" Task "))
            .wrap(Wrap { trim: false }),
        chunks[1],
    );
}

fn render_status_line(frame: &mut Frame, app: &App, area: Rect) {
    let line = if app.mode == Mode::Search {
        Line::from(vec![
            Span::styled("/", Style::default().fg(Color::Cyan)),
            Span::raw(app.search_input.as_str()),
            Span::styled("█", Style::default().fg(Color::DarkGray)),
        ])
    } else if app.mode == Mode::Filters {
        Line::from(Span::styled(
            "j/k move · Space toggle · Esc/f done",
            Style::default().fg(Color::Cyan),
        ))
    } else if let Some(err) = &app.error {
        Line::from(Span::styled(err.as_str(), Style::default().fg(Color::Red)))
    } else {
        Line::from(Span::styled(
            "Tab select · Space done · hjkl pan · f filters · ? help · q quit",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn render_help(frame: &mut Frame) {
    let bindings = [
        ("Tab/S-Tab", "Select next/previous task"),
        ("Space/x", "Toggle done"),
        ("hjkl/arrows", "Pan"),
        ("0", "Center on selection"),
        ("/", "Search (Enter apply, Esc cancel)"),
        ("s", "Cycle status filter"),
        ("a", "Actionable only"),
        ("1-5", "Toggle stage"),
        ("f", "Pick sections and tags"),
        ("d", "Toggle LR/TB layout"),
        ("?", "Toggle help"),
        ("q/Esc", "Quit"),
    ];

    let term = frame.area();
    let width = 50.min(term.width.saturating_sub(4));
    let height = (bindings.len() as u16 + 2).min(term.height.saturating_sub(2));
    let area = centered_rect(width, height, term);

    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let help_text: Vec<Line> = bindings
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:<12}"), Style::default().fg(Color::Cyan)),
                Span::raw(*action),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(help_text), inner);
}
