// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Quill enhancement service.

use thiserror::Error;

use crate::types::SessionStatus;

/// The primary error type used across Quill adapter traits and core operations.
#[derive(Debug, Error)]
pub enum QuillError {
    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A terminal session was written to a second time.
    #[error("session {id} is already settled as {status}")]
    SessionSettled { id: String, status: SessionStatus },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuillError {
    /// Wrap any error as a storage failure.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage { source: err.into() }
    }
}

/// Failure classes of the external text completion call.
///
/// The orchestrator treats every variant as a failed attempt; the class only
/// decides which caller-safe message is returned and what gets logged.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Credentials or client setup are missing. Not retryable.
    #[error("completion service not configured: {0}")]
    Configuration(String),

    /// Network failure or timeout before a response was received.
    #[error("completion transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service answered with a non-success status.
    #[error("completion service returned {status}: {body}")]
    Service { status: u16, body: String },
}

impl CompletionError {
    /// Build a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Short machine-readable label for logs and metrics fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transport { .. } => "transport",
            Self::Service { .. } => "service",
        }
    }
}
