// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # GARRISON Gateway SDK
//!
//! Typed Rust client for the GARRISON gateway REST surface. The web
//! console and evaluation harness consume the same endpoints; this crate
//! is the programmatic way in.

pub mod client;
pub mod types;

pub use client::{GatewayClient, SdkError};
pub use types::*;
