// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Org Chart Core
//!
//! Hierarchy integrity engine for an employee directory: every employee has
//! at most one manager, managers must carry the manager role, and the
//! reporting graph never contains a cycle.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services and storage adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::hierarchy_service::{HierarchyService, StandardHierarchyService};
pub use domain::hierarchy::HierarchyError;
