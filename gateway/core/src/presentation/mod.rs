// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`garrison-core`)
//!
//! HTTP surface that translates external requests into application
//! service calls. **No business logic lives here** — all real work is
//! delegated to application services in `crate::application`.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | REST endpoints (Axum): dispatch, admin tenants, log queries, health |
//! | [`auth`] | `X-API-Key` tenant extractor and `X-Admin-Token` guard |
//! | [`error`] | Uniform error envelope with correlation ids |

pub mod api;
pub mod auth;
pub mod error;
