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

use std::time::{Duration, Instant};

use qm_protocol::SensorTable;

use crate::source::SensorSource;

/// Redraw and re-query period of the watch view
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// State of the `watch` view
pub struct App<S: SensorSource> {
    source: S,
    pub table: Option<SensorTable>,
    pub status: String,
    pub last_refresh: Instant,
    pub refresh_interval: Duration,
    /// Highlighted row
    pub selected: usize,
}

impl<S: SensorSource> App<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            table: None,
            status: "Connecting...".to_string(),
            last_refresh: Instant::now(),
            refresh_interval: REFRESH_INTERVAL,
            selected: 0,
        }
    }

    /// Re-query the source. On failure the previous table is dropped so that
    /// old values are never shown as current.
    pub fn refresh(&mut self) {
        self.last_refresh = Instant::now();
        match self.source.table() {
            Ok(table) => {
                let fresh = table.readings.iter().filter(|r| !r.stale).count();
                self.status = if fresh == 0 {
                    "No data received from device".to_string()
                } else {
                    format!("{}/{} channels fresh", fresh, table.readings.len())
                };
                self.table = Some(table);
                self.clamp_selection();
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.table = None;
            }
        }
    }

    pub fn row_count(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.readings.len())
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.row_count() {
            self.selected += 1;
        }
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.row_count().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockSensorSource;
    use qm_core::QuadroError;
    use qm_protocol::SensorReading;

    fn table(stale: &[bool]) -> SensorTable {
        SensorTable {
            device: "hidraw3".into(),
            chip: "quadro".into(),
            readings: stale
                .iter()
                .enumerate()
                .map(|(i, &stale)| SensorReading {
                    kind: "temp".into(),
                    channel: i,
                    label: format!("Temp{}", i + 1),
                    value: if stale { None } else { Some(24_000) },
                    stale,
                    mode: 0o444,
                })
                .collect(),
        }
    }

    #[test]
    fn test_new_app_is_empty() {
        let app = App::new(MockSensorSource::new());
        assert!(app.table.is_none());
        assert_eq!(app.row_count(), 0);
        assert_eq!(app.refresh_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_refresh_counts_fresh_channels() {
        let mut source = MockSensorSource::new();
        source
            .expect_table()
            .times(1)
            .returning(|| Ok(table(&[false, false, true, true])));

        let mut app = App::new(source);
        app.refresh();
        assert_eq!(app.status, "2/4 channels fresh");
        assert_eq!(app.row_count(), 4);
    }

    #[test]
    fn test_refresh_error_clears_table() {
        let mut source = MockSensorSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_table()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(table(&[false])));
        source
            .expect_table()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(QuadroError::DaemonNotAvailable));

        let mut app = App::new(source);
        app.refresh();
        assert!(app.table.is_some());
        app.refresh();
        assert!(app.table.is_none());
        assert!(app.status.starts_with("Error:"));
    }

    #[test]
    fn test_all_stale_status() {
        let mut source = MockSensorSource::new();
        source.expect_table().returning(|| Ok(table(&[true, true])));

        let mut app = App::new(source);
        app.refresh();
        assert_eq!(app.status, "No data received from device");
    }

    #[test]
    fn test_selection_stays_in_range() {
        let mut source = MockSensorSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_table()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(table(&[false; 3])));
        source
            .expect_table()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(table(&[false; 1])));

        let mut app = App::new(source);
        app.refresh();
        app.move_up();
        assert_eq!(app.selected, 0);
        for _ in 0..5 {
            app.move_down();
        }
        assert_eq!(app.selected, 2);

        // Table shrank
        app.refresh();
        assert_eq!(app.selected, 0);
    }
}
