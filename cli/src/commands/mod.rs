// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the org chart CLI

pub mod config;
pub mod department;
pub mod employee;
pub mod manager;

pub use self::config::ConfigCommand;
pub use self::department::DepartmentCommand;
pub use self::employee::EmployeeCommand;
pub use self::manager::ManagerCommand;

use anyhow::{Context, Result};
use serde::Serialize;

/// Records go to stdout as pretty JSON so they can be piped into other tools.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{}", json);
    Ok(())
}
