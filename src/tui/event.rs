use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Mode, PAN_X, PAN_Y};

/// Result of handling a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    ToggleDone,
    Continue,
}

/// Handle a key press. Returns an action indicating what the event loop should do.
pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    match app.mode {
        Mode::Search => handle_search(app, key),
        Mode::Filters => handle_filters(app, key),
        Mode::Help => {
            if matches!(key.code, KeyCode::Char('q')) {
                return KeyAction::Quit;
            }
            app.toggle_help();
            KeyAction::Continue
        }
        Mode::Normal => handle_normal(app, key),
    }
}

fn handle_normal(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return KeyAction::Quit
        }
        KeyCode::Char('h') | KeyCode::Left => app.pan(-PAN_X, 0),
        KeyCode::Char('l') | KeyCode::Right => app.pan(PAN_X, 0),
        KeyCode::Char('k') | KeyCode::Up => app.pan(0, -PAN_Y),
        KeyCode::Char('j') | KeyCode::Down => app.pan(0, PAN_Y),
        KeyCode::Tab => app.select_next(),
        KeyCode::BackTab => app.select_prev(),
        KeyCode::Char(' ') | KeyCode::Char('x') => return KeyAction::ToggleDone,
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('s') => app.cycle_status(),
        KeyCode::Char('a') => app.toggle_actionable(),
        KeyCode::Char(c @ '1'..='5') => app.toggle_stage_key(c as usize - '0' as usize),
        KeyCode::Char('f') => app.start_filter_pick(),
        KeyCode::Char('d') => app.toggle_direction(),
        KeyCode::Char('0') => app.recenter(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
    KeyAction::Continue
}

fn handle_filters(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return KeyAction::Quit
        }
        KeyCode::Esc | KeyCode::Char('f') => app.close_filter_pick(),
        KeyCode::Char('j') | KeyCode::Down => app.move_filter_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_filter_cursor(-1),
        KeyCode::Char(' ') | KeyCode::Enter => app.toggle_filter_item(),
        _ => {}
    }
    KeyAction::Continue
}

fn handle_search(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Enter => app.apply_search(),
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.search_input.clear();
        }
        KeyCode::Char(c) => app.search_input.push(c),
        _ => {}
    }
    KeyAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Direction, LayoutConfig};
    use crate::model::{Stage, TaskRow};
    use crate::pipeline::Session;

    fn app() -> App {
        let mut a = TaskRow::new("a");
        a.stage = Stage::Setup;
        let mut b = TaskRow::new("b");
        b.stage = Stage::Late;
        b.depends_on.insert("a".into());
        b.tags.insert("ui".into());
        let session =
            Session::open(vec![a, b], None, Direction::LeftRight, LayoutConfig::default()).unwrap();
        App::new(session)
    }

    fn press(app: &mut App, code: KeyCode) -> KeyAction {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyAction::Quit);
        assert_eq!(press(&mut app, KeyCode::Esc), KeyAction::Quit);
    }

    #[test]
    fn space_and_x_request_toggle() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Char(' ')), KeyAction::ToggleDone);
        assert_eq!(press(&mut app, KeyCode::Char('x')), KeyAction::ToggleDone);
    }

    #[test]
    fn search_mode_captures_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.mode, Mode::Search);
        // 'q' is text while searching
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyAction::Continue);
        press(&mut app, KeyCode::Backspace);
        for c in "late".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.session.settings().filter.query, "late");
        assert_eq!(app.session.snapshot().visible, vec!["b"]);
    }

    #[test]
    fn esc_cancels_search_without_quitting() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        assert_eq!(press(&mut app, KeyCode::Esc), KeyAction::Continue);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn number_keys_toggle_stages() {
        let mut app = app();
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.session.snapshot().visible, vec!["a"]);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.session.snapshot().visible.len(), 2);
    }

    #[test]
    fn filter_and_direction_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        assert!(app.session.settings().filter.actionable_only);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.session.settings().filter.status.as_str(), "todo");
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.session.settings().direction, Direction::TopBottom);
    }

    #[test]
    fn tab_moves_selection() {
        let mut app = app();
        assert_eq!(app.selected.as_deref(), Some("a"));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.selected.as_deref(), Some("b"));
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.selected.as_deref(), Some("a"));
    }

    #[test]
    fn any_key_closes_help() {
        let mut app = app();
        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.mode, Mode::Help);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn filter_pick_toggles_sections_and_tags() {
        let mut app = app();
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.mode, Mode::Filters);

        // Only "General" exists; turning it off hides everything.
        press(&mut app, KeyCode::Char(' '));
        assert!(app.session.snapshot().visible.is_empty());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.session.snapshot().visible.len(), 2);

        let offset = app.offset;
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.offset, offset);
        assert_eq!(app.filter_cursor, 1);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.session.settings().filter.tags.contains("ui"));
        assert_eq!(app.session.snapshot().visible, vec!["b"]);

        assert_eq!(press(&mut app, KeyCode::Esc), KeyAction::Continue);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn q_does_not_quit_while_picking_filters() {
        let mut app = app();
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyAction::Continue);
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.mode, Mode::Normal);
    }
}
