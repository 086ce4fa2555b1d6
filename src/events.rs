use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::app::{Action, App};
use crate::ui::{screen_layout, TableHit};

/// Rows skipped by PageUp/PageDown.
const PAGE: isize = 10;

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Translate a key press into an action.
pub fn action_for_key(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let action = match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,

        // Table navigation
        KeyCode::Up | KeyCode::Char('k') => Action::MoveSelection { rows: -1, cols: 0 },
        KeyCode::Down | KeyCode::Char('j') => Action::MoveSelection { rows: 1, cols: 0 },
        KeyCode::Left | KeyCode::Char('h') => Action::MoveSelection { rows: 0, cols: -1 },
        KeyCode::Right | KeyCode::Char('l') => Action::MoveSelection { rows: 0, cols: 1 },
        KeyCode::PageUp => Action::MoveSelection {
            rows: -PAGE,
            cols: 0,
        },
        KeyCode::PageDown => Action::MoveSelection { rows: PAGE, cols: 0 },
        KeyCode::Home => Action::SelectFirstRow,
        KeyCode::End => Action::SelectLastRow,
        KeyCode::Enter => Action::OpenSelected,

        // Charts
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => Action::FocusPrevViewer,
        KeyCode::Tab => Action::FocusNextViewer,
        KeyCode::BackTab => Action::FocusPrevViewer,
        KeyCode::Char('x') => Action::CloseFocusedViewer,
        KeyCode::Char('X') => Action::CloseAllViewers,

        KeyCode::Char('r') => Action::Reload,
        KeyCode::Char('e') => Action::Export,
        KeyCode::Char('?') => Action::ToggleHelp,
        _ => return None,
    };
    Some(action)
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if let Some(action) = action_for_key(key) {
        app.dispatch(action);
    }
}

/// Translate a mouse event into actions, using the layout of the last frame.
///
/// Clicking a cell selects it and opens its chart; clicking a host or
/// process name only selects the row. Clicking a chart focuses it and
/// right-clicking closes it.
pub fn actions_for_mouse(app: &App, mouse: MouseEvent) -> Vec<Action> {
    match mouse.kind {
        MouseEventKind::ScrollUp => vec![Action::MoveSelection { rows: -1, cols: 0 }],
        MouseEventKind::ScrollDown => vec![Action::MoveSelection { rows: 1, cols: 0 }],

        MouseEventKind::Down(button @ (MouseButton::Left | MouseButton::Right)) => {
            let layout = screen_layout(app.frame_area, app.viewers.len(), app.focused_viewer);

            for (idx, area) in &layout.viewers {
                if area.contains((mouse.column, mouse.row).into()) {
                    return match button {
                        MouseButton::Right => {
                            let key = app.viewers[*idx].borrow().key().clone();
                            vec![Action::CloseViewer(key)]
                        }
                        _ => vec![Action::FocusViewer(*idx)],
                    };
                }
            }

            if button != MouseButton::Left {
                return Vec::new();
            }

            let (selected_row, _) = app.dashboard.selected();
            match app
                .dashboard
                .hit_test(layout.dashboard, mouse.column, mouse.row)
            {
                Some(TableHit::Cell(row, col)) => {
                    let mut actions = vec![Action::SelectCell { row, col }];
                    if let Some(key) = app.dashboard.table().key_at(row, col) {
                        actions.push(Action::OpenViewer(key));
                    }
                    actions
                }
                Some(TableHit::Row(row)) if row != selected_row => {
                    let (_, col) = app.dashboard.selected();
                    vec![Action::SelectCell { row, col }]
                }
                _ => Vec::new(),
            }
        }

        _ => Vec::new(),
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if app.show_help {
        return;
    }
    for action in actions_for_mouse(app, mouse) {
        app.dispatch(action);
    }
}
