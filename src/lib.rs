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

//! Quadromon - sensor monitor for Aquacomputer Quadro fan controllers
//!
//! The command-line frontend. Live data comes from `quadromond` over its
//! socket; captured reports can be decoded offline without a daemon.

pub mod app;
pub mod capture;
pub mod cli;
pub mod events;
pub mod render;
pub mod source;
pub mod ui;
