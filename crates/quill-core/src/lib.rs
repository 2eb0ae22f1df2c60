// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Quill prompt enhancement service.
//!
//! This crate provides the trait definitions, error types, and domain types
//! shared by the quota tracker, the stores, the completion client, and the
//! enhancement orchestrator.

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CompletionError, QuillError};
pub use types::{
    AdapterType, Completion, EnhancementOptions, EnhancementSession, Focus, HealthStatus,
    RateLimitInfo, RateLimitWindow, ReserveOutcome, SessionOutcome, SessionStatus, Tier, Tone,
};

pub use traits::{CompletionClient, PluginAdapter, RateLimitStore, SessionStore, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quill_error_has_all_variants() {
        let _storage = QuillError::storage(std::io::Error::other("test"));
        let _settled = QuillError::SessionSettled {
            id: "s1".into(),
            status: SessionStatus::Failed,
        };
        let _internal = QuillError::Internal("test".into());
    }

    #[test]
    fn completion_error_messages_carry_detail() {
        let err = CompletionError::Service {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "completion service returned 503: overloaded");
        assert_eq!(err.kind(), "service");
        assert_eq!(
            CompletionError::Configuration("no key".into()).kind(),
            "configuration"
        );
    }

    #[test]
    fn session_settled_message_names_status() {
        let err = QuillError::SessionSettled {
            id: "abc".into(),
            status: SessionStatus::Success,
        };
        assert_eq!(err.to_string(), "session abc is already settled as success");
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [AdapterType::Completion, AdapterType::Storage] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_completion_client<T: CompletionClient>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_session_store<T: SessionStore>() {}
        fn _assert_rate_limit_store<T: RateLimitStore>() {}
    }
}
