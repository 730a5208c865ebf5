// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: validation, the hierarchy service and the transaction
//! runner every service operation goes through.

pub mod directory_factory;
pub mod hierarchy_service;
pub mod reassignment;
pub mod transaction;
pub mod validation_engine;
