// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System instruction composition.
//!
//! Output depends only on the options passed in: no clock, no randomness.

use quill_core::{EnhancementOptions, Focus, Tone};

/// Directive every enhancement starts from.
pub const BASE_DIRECTIVE: &str = "You are an expert prompt engineer. Rewrite the user's prompt \
so that it preserves the original intent while improving clarity, specificity and structure. \
Remove ambiguity and fill in context only where it is clearly implied. Respond with the \
improved prompt alone, without commentary or surrounding quotes.";

fn tone_phrase(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "Use a professional, precise and businesslike tone.",
        Tone::Casual => "Use a relaxed, conversational and friendly tone.",
        Tone::Academic => "Use a formal, scholarly tone with exact terminology.",
        Tone::Creative => "Use an imaginative, vivid and expressive tone.",
    }
}

fn focus_phrase(focus: Focus) -> &'static str {
    match focus {
        Focus::Clarity => "Above all, make the prompt easy to understand and unambiguous.",
        Focus::Engagement => "Above all, make the prompt compelling and likely to draw a rich response.",
        Focus::Specificity => {
            "Above all, add concrete details, constraints and expected output format."
        }
        Focus::Structure => "Above all, organize the prompt into clear, logically ordered parts.",
    }
}

/// Build the system instructions for one enhancement.
///
/// Clauses follow the base directive in a fixed order: platform, tone, focus.
pub fn compose_instructions(options: &EnhancementOptions) -> String {
    let mut instructions = String::from(BASE_DIRECTIVE);

    if let Some(platform) = options.platform() {
        instructions.push_str("\n\nOptimize the prompt for use with ");
        instructions.push_str(platform);
        instructions.push_str(", following that platform's conventions and strengths.");
    }
    if let Some(tone) = options.tone {
        instructions.push_str("\n\n");
        instructions.push_str(tone_phrase(tone));
    }
    if let Some(focus) = options.focus {
        instructions.push_str("\n\n");
        instructions.push_str(focus_phrase(focus));
    }

    instructions
}
