//! Formatting helpers shared across front ends.
//!
//! Message content carries lightweight markup (`**bold**` segments and `•`,
//! `-` or `*` bullet prefixes). It is stored verbatim and only interpreted
//! here, at render time.

use chrono::{DateTime, Utc};

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// A run of text with uniform styling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub bold: bool,
}

/// One rendered line of message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub bullet: bool,
    pub spans: Vec<Span<'a>>,
}

/// Split message content into lines of styled spans.
///
/// An unmatched `**` is kept as literal text.
pub fn parse_markup(content: &str) -> Vec<Line<'_>> {
    content.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Line<'_> {
    let trimmed = line.trim_start();
    let (bullet, body) = match ["• ", "- ", "* "]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
    {
        Some(rest) => (true, rest),
        None => (false, line),
    };

    let mut spans = Vec::new();
    let mut rest = body;
    let mut bold = false;
    while let Some(idx) = rest.find("**") {
        // A closing marker only counts when one follows; otherwise keep it literally
        if !bold && !rest[idx + 2..].contains("**") {
            break;
        }
        if idx > 0 {
            spans.push(Span {
                text: &rest[..idx],
                bold,
            });
        }
        bold = !bold;
        rest = &rest[idx + 2..];
    }
    if !rest.is_empty() {
        spans.push(Span { text: rest, bold });
    }

    Line { bullet, spans }
}

/// Render content with markup markers removed
pub fn plain_text(content: &str) -> String {
    parse_markup(content)
        .iter()
        .map(|line| {
            let text: String = line.spans.iter().map(|s| s.text).collect();
            if line.bullet {
                format!("• {}", text)
            } else {
                text
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-line preview with markup removed, truncated to `max_chars`
pub fn preview(content: &str, max_chars: usize) -> String {
    let flat = plain_text(content)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let truncated: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", truncated)
}

/// Fixed-width text progress bar, e.g. `[#####-----] 50%`
pub fn progress_bar(progress: u8, width: usize) -> String {
    let progress = progress.min(100) as usize;
    let filled = progress * width / 100;
    format!(
        "[{}{}] {}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        progress
    )
}
