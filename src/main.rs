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

use std::io::stdout;
use std::path::Path;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::Terminal;

use qm_core::{load_settings, resolve_socket_path, QuadroError};
use quadromon::app::App;
use quadromon::capture::{decode_capture, load_capture, snapshot_info, snapshot_table};
use quadromon::cli::{parse_args, usage, Cli, Command, VERSION};
use quadromon::events::handle_key_event;
use quadromon::render::{render_devices, render_info, render_json, render_table};
use quadromon::source::{DaemonSource, SensorSource};
use quadromon::ui::ui;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run 'quadromon help' for usage.");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        if matches!(err.downcast_ref::<QuadroError>(), Some(QuadroError::DaemonNotAvailable)) {
            eprintln!("Is quadromond running? Start it with: sudo quadromond");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli { socket, command } = cli;
    match command {
        Command::Help => print!("{}", usage()),
        Command::Version => println!("quadromon {VERSION}"),
        Command::Decode { input, json } => {
            let raw = load_capture(&input)
                .with_context(|| format!("Cannot read capture {}", input.display()))?;
            let snapshot = decode_capture(&raw)?;
            let table = snapshot_table("capture", &snapshot);
            if json {
                println!("{}", render_json(&table)?);
            } else {
                print!("{}", render_table(&table));
                println!();
                print!("{}", render_info(&snapshot_info("capture", &snapshot)));
            }
        }
        Command::Sensors { device, json } => {
            let mut source = connect(socket.as_deref(), device)?;
            let table = source.table()?;
            if json {
                println!("{}", render_json(&table)?);
            } else {
                print!("{}", render_table(&table));
            }
        }
        Command::Devices => {
            let mut source = connect(socket.as_deref(), None)?;
            print!("{}", render_devices(&source.devices()?));
        }
        Command::Info { device } => {
            let mut source = connect(socket.as_deref(), device)?;
            print!("{}", render_info(&source.diagnostics()?));
        }
        Command::Watch { device } => {
            let source = connect(socket.as_deref(), device)?;
            watch(App::new(source))?;
        }
    }
    Ok(())
}

fn connect(socket: Option<&Path>, device: Option<String>) -> Result<DaemonSource> {
    let settings = load_settings().context("Cannot load configuration")?;
    let socket = resolve_socket_path(socket, &settings);
    Ok(DaemonSource::connect(&socket, device)?)
}

fn watch<S: SensorSource>(mut app: App<S>) -> Result<()> {
    // Terminal init
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<S: SensorSource>(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    app: &mut App<S>,
) -> Result<()> {
    app.refresh();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .refresh_interval
            .saturating_sub(app.last_refresh.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key_event) = event::read()? {
                if handle_key_event(app, key_event) {
                    return Ok(());
                }
            }
        }

        if app.last_refresh.elapsed() >= app.refresh_interval {
            app.refresh();
        }
    }
}
