use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Something the user asked the show to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    TogglePause,
    LaunchRandom,
    /// Launch at a terminal cell (column, half-block row).
    LaunchAt(u16, u16),
    /// Set the simulation speed from a column on the speed bar.
    SpeedFromColumn(u16),
    NudgeSpeed(f32),
    SetSize(f32),
    NextShell,
    CycleQuality,
    CycleSky,
    ToggleFinale,
    ToggleAutoLaunch,
    ToggleLongExposure,
    Reload,
    Resize(u16, u16),
}

/// Tracks whether a drag started on the speed bar.
#[derive(Debug, Default)]
pub struct InputState {
    dragging_speed: bool,
}

impl InputState {
    pub fn action_for(&mut self, event: &Event, rows: u16) -> Option<Action> {
        match event {
            Event::Key(key) => key_action(key),
            Event::Mouse(mouse) => self.mouse_action(mouse, rows),
            Event::Resize(cols, rows) => Some(Action::Resize(*cols, *rows)),
            _ => None,
        }
    }

    fn mouse_action(&mut self, mouse: &MouseEvent, rows: u16) -> Option<Action> {
        let on_speed_bar = mouse.row + 1 >= rows;
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if on_speed_bar {
                    self.dragging_speed = true;
                    Some(Action::SpeedFromColumn(mouse.column))
                } else {
                    Some(Action::LaunchAt(mouse.column, mouse.row * 2))
                }
            }
            MouseEventKind::Drag(MouseButton::Left) if self.dragging_speed => {
                Some(Action::SpeedFromColumn(mouse.column))
            }
            MouseEventKind::Up(_) => {
                self.dragging_speed = false;
                None
            }
            _ => None,
        }
    }
}

fn key_action(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::TogglePause,
        KeyCode::Char(' ') => Action::LaunchRandom,
        KeyCode::Char(c @ '1'..='5') => Action::SetSize(f32::from(c as u8 - b'1')),
        KeyCode::Char('s') => Action::NextShell,
        KeyCode::Char('l') => Action::CycleQuality,
        KeyCode::Char('k') => Action::CycleSky,
        KeyCode::Char('f') => Action::ToggleFinale,
        KeyCode::Char('a') => Action::ToggleAutoLaunch,
        KeyCode::Char('e') => Action::ToggleLongExposure,
        KeyCode::Char('r') => Action::Reload,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::NudgeSpeed(0.1),
        KeyCode::Char('-') => Action::NudgeSpeed(-0.1),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_keys() {
        let mut input = InputState::default();
        assert_eq!(input.action_for(&key(KeyCode::Char('3')), 40), Some(Action::SetSize(2.0)));
        assert_eq!(input.action_for(&key(KeyCode::Esc), 40), Some(Action::Quit));
        assert_eq!(input.action_for(&key(KeyCode::Char('x')), 40), None);
        let ctrl_c = Event::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        });
        assert_eq!(input.action_for(&ctrl_c, 40), Some(Action::Quit));
    }

    #[test]
    fn test_click_launches_or_sets_speed() {
        let mut input = InputState::default();
        let down = MouseEventKind::Down(MouseButton::Left);
        assert_eq!(input.action_for(&mouse(down, 10, 5), 40), Some(Action::LaunchAt(10, 10)));
        assert_eq!(
            input.action_for(&mouse(down, 30, 39), 40),
            Some(Action::SpeedFromColumn(30))
        );
        let drag = MouseEventKind::Drag(MouseButton::Left);
        assert_eq!(
            input.action_for(&mouse(drag, 32, 20), 40),
            Some(Action::SpeedFromColumn(32))
        );
        input.action_for(&mouse(MouseEventKind::Up(MouseButton::Left), 32, 20), 40);
        assert_eq!(input.action_for(&mouse(drag, 33, 20), 40), None);
    }
}
