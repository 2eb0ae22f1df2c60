// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limited prompt enhancement for Quill.
//!
//! [`Enhancer`] is the single entry point callers use. It reserves quota
//! before calling the completion service, records every attempt as an
//! [`EnhancementSession`](quill_core::EnhancementSession), and refunds the
//! reservation when the call fails.

pub mod instructions;
pub mod orchestrator;
pub mod result;

pub use instructions::compose_instructions;
pub use orchestrator::Enhancer;
pub use result::{EnhanceFailure, EnhanceRequest, EnhanceResponse, Enhancement, SessionSummary};
