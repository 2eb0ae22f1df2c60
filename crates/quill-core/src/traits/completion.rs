// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Narrow interface over the external text completion service.

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Completion;

/// Turns a system instruction plus user content into generated text.
///
/// Implementations must not retry internally and must classify every failure
/// as one of the [`CompletionError`] variants.
#[async_trait]
pub trait CompletionClient: PluginAdapter {
    async fn complete(
        &self,
        system_instructions: &str,
        user_content: &str,
    ) -> Result<Completion, CompletionError>;
}
