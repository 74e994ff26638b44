// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # GARRISON Gateway Core
//!
//! Core domain and runtime primitives for the GARRISON integration gateway:
//! tenant authentication, provider action dispatch, and the durable
//! action/audit log surface.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain aggregates, application services, storage and
//!   provider adapters, HTTP presentation

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
