/*
 * This file is part of Quadromon.
 *
 * Copyright (C) 2025 Quadromon contributors
 *
 * Quadromon is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Quadromon is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Quadromon. If not, see <https://www.gnu.org/licenses/>.
 */

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::source::SensorSource;

/// Apply one key press. Returns true when the view should close.
pub fn handle_key_event<S: SensorSource>(app: &mut App<S>, key_event: KeyEvent) -> bool {
    let KeyEvent { code, modifiers, .. } = key_event;

    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => return true,
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => return true,
        (KeyCode::Char('r'), _) => app.refresh(),
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => app.move_up(),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => app.move_down(),
        _ => {}
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSensorSource;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new(MockSensorSource::new());
        assert!(handle_key_event(&mut app, key(KeyCode::Char('q'))));
        assert!(handle_key_event(&mut app, key(KeyCode::Esc)));
        assert!(handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('x'))));
    }

    #[test]
    fn test_r_refreshes() {
        let mut source = MockSensorSource::new();
        source
            .expect_table()
            .times(1)
            .returning(|| Err(qm_core::QuadroError::NoData));

        let mut app = App::new(source);
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('r'))));
        assert!(app.status.starts_with("Error:"));
    }
}
