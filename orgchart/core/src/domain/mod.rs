// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: the employee aggregate, the directory contract, hierarchy
//! rules and configuration types. Storage lives in `crate::infrastructure`;
//! the only I/O here is reading the configuration file and environment.

pub mod config;
pub mod directory;
pub mod employee;
pub mod hierarchy;
