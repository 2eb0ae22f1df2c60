// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota enforcement for the Quill enhancement service.
//!
//! This crate provides:
//! - **Quota tracker**: atomic reserve and refund of per-user call units over
//!   a fixed window, failing closed when the store is unreachable
//! - **Tier limits**: mapping from subscription tier to quota ceiling

pub mod tier;
pub mod tracker;

pub use tier::TierLimits;
pub use tracker::{QuotaTracker, Reservation};
