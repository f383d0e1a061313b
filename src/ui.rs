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

use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use crate::app::App;
use crate::render::display_value;
use crate::source::SensorSource;

pub fn ui<S: SensorSource>(f: &mut Frame, app: &App<S>) {
    let size = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(1)])
        .split(size);

    // Header
    let title = match &app.table {
        Some(table) => format!(" {}-{} ", table.chip, table.device),
        None => " quadromon ".to_string(),
    };
    let status_style = if app.table.is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };
    let header = Paragraph::new(app.status.as_str())
        .style(status_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title),
        );
    f.render_widget(header, chunks[0]);

    // Sensor table
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Sensors ");
    match &app.table {
        Some(table) => {
            let rows: Vec<Row> = table
                .readings
                .iter()
                .map(|r| {
                    let style = if r.stale {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    Row::new(vec![
                        Cell::from(r.label.clone()),
                        Cell::from(display_value(r)),
                        Cell::from(format!("{}{}", r.kind, r.channel + 1)),
                    ])
                    .style(style)
                })
                .collect();

            let widths = [Constraint::Length(20), Constraint::Length(14), Constraint::Min(6)];
            let sensors = Table::new(rows, widths)
                .header(
                    Row::new(vec!["Sensor", "Value", "Channel"])
                        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
                )
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

            let mut state = TableState::default().with_selected(Some(app.selected));
            f.render_stateful_widget(sensors, chunks[1], &mut state);
        }
        None => {
            let empty = Paragraph::new("(no readings)")
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(empty, chunks[1]);
        }
    }

    let help = Paragraph::new("↑/↓ scroll  |  r refresh  |  q/Esc quit")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    f.render_widget(help, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSensorSource;
    use qm_protocol::{SensorReading, SensorTable};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(app: &App<MockSensorSource>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_readings() {
        let mut source = MockSensorSource::new();
        source.expect_table().returning(|| {
            Ok(SensorTable {
                device: "hidraw3".into(),
                chip: "quadro".into(),
                readings: vec![
                    SensorReading {
                        kind: "fan".into(),
                        channel: 1,
                        label: "Fan1 speed".into(),
                        value: Some(1200),
                        stale: false,
                        mode: 0o444,
                    },
                    SensorReading {
                        kind: "temp".into(),
                        channel: 3,
                        label: "Temp4".into(),
                        value: None,
                        stale: true,
                        mode: 0o444,
                    },
                ],
            })
        });

        let mut app = App::new(source);
        app.refresh();
        let text = screen(&app);
        assert!(text.contains("quadro-hidraw3"));
        assert!(text.contains("1200 RPM"));
        assert!(text.contains("N/A"));
        assert!(text.contains("1/2 channels fresh"));
    }

    #[test]
    fn test_renders_placeholder_without_data() {
        let app = App::new(MockSensorSource::new());
        let text = screen(&app);
        assert!(text.contains("(no readings)"));
        assert!(text.contains("Connecting..."));
    }
}
