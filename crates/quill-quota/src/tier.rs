// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier to ceiling mapping.

use quill_config::model::QuotaConfig;
use quill_core::Tier;

/// Quota ceilings per subscription tier.
///
/// Looked up on every call, so a tier change takes effect on the user's
/// next request without touching the stored window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub free: u32,
    pub premium: u32,
}

impl TierLimits {
    pub fn from_config(config: &QuotaConfig) -> Self {
        Self {
            free: config.free_limit,
            premium: config.premium_limit,
        }
    }

    pub fn limit_for(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Free => self.free,
            Tier::Premium => self.premium,
        }
    }
}
