//! Solution progress derivation
//!
//! Pure, total classification of an assistant reply into the phase,
//! percentage and artifact labels shown next to it, plus detection of the
//! greeting -> collaborating mode switch.
//!
//! The rules live in ordered tables so they can be read, tested, and later
//! swapped for a real classifier without touching the session code.

use std::collections::BTreeSet;

use crate::types::{clamp_percentage, SolutionProgress};

/// Phase reported when no rule matches
pub const DEFAULT_PHASE: &str = "Active Collaboration";

/// Upper bound for the length-based progress estimate
pub const MAX_DERIVED_PROGRESS: u8 = 90;

/// Progress gained per message already in the conversation
const PROGRESS_STEP: i64 = 15;

/// Phase rules, checked in order; the first rule with any matching cue wins.
pub const PHASE_RULES: &[(&[&str], &str)] = &[
    (&["analyzing", "understanding"], "Problem Analysis"),
    (&["solution", "approach"], "Solution Development"),
    (&["implement", "execute"], "Implementation Planning"),
    (&["proposal", "document"], "Solution Documentation"),
];

/// Artifact rules; every matching cue contributes its label.
pub const ARTIFACT_RULES: &[(&str, &str)] = &[
    ("strategy", "Strategy Framework"),
    ("analysis", "Risk Analysis"),
    ("plan", "Action Plan"),
    ("proposal", "Solution Proposal"),
];

/// Words signalling that the assistant is partnering rather than greeting
pub const COLLABORATION_CUES: &[&str] = &[
    "together",
    "partnership",
    "collaborate",
    "develop",
    "build",
    "solution",
];

/// Classify a reply into a discourse phase.
///
/// Matching is case-sensitive substring search.
pub fn derive_phase(reply: &str) -> &'static str {
    PHASE_RULES
        .iter()
        .find(|(cues, _)| cues.iter().any(|cue| reply.contains(cue)))
        .map(|(_, phase)| *phase)
        .unwrap_or(DEFAULT_PHASE)
}

/// Progress estimate from conversation length: `min(90, (n - 1) * 15)`, floored at 0.
pub fn derive_progress(message_count: usize) -> u8 {
    let count = i64::try_from(message_count).unwrap_or(i64::MAX);
    let raw = count.saturating_sub(1).saturating_mul(PROGRESS_STEP);
    clamp_percentage(raw).min(MAX_DERIVED_PROGRESS)
}

/// Artifact labels evidenced by a reply. Duplicates collapse.
pub fn derive_artifacts(reply: &str) -> BTreeSet<String> {
    ARTIFACT_RULES
        .iter()
        .filter(|(cue, _)| reply.contains(cue))
        .map(|(_, label)| label.to_string())
        .collect()
}

/// True if the reply signals partnership (case-insensitive).
pub fn is_collaborative(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    COLLABORATION_CUES.iter().any(|cue| lowered.contains(cue))
}

/// All three derivations for one reply.
pub fn derive(reply: &str, message_count: usize) -> SolutionProgress {
    SolutionProgress {
        phase: derive_phase(reply).to_string(),
        progress: derive_progress(message_count),
        artifacts: derive_artifacts(reply),
    }
}
