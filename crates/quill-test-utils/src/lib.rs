// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Quill integration tests.
//!
//! Provides a scripted completion client and a harness that wires the real
//! quota tracker, SQLite stores and orchestrator around it, so tests run
//! without network access.
//!
//! # Components
//!
//! - [`MockCompletionClient`] - completion client with queued replies
//! - [`TestHarness`] - full enhancement stack on a temp database

pub mod harness;
pub mod mock_completion;

pub use harness::TestHarness;
pub use mock_completion::{MockCompletionClient, RecordedCall};
