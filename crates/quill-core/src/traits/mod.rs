// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the orchestrator drives.
//!
//! Network and storage adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod completion;
pub mod storage;

pub use adapter::PluginAdapter;
pub use completion::CompletionClient;
pub use storage::{RateLimitStore, SessionStore, StorageAdapter};
