//! Reply summaries.
//!
//! Decodes the counts carried by a response and totals them per tag, the
//! way a test client sending packets at a counter would report results.

use crate::codec::decode_count;
use crate::models::Response;
use std::collections::BTreeMap;
use tracing::warn;

/// Totals decoded from a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplySummary {
    /// Number of replies in the response.
    pub replies: usize,
    /// Sum of all decoded counts.
    pub total_count: u64,
    /// Decoded counts grouped by tag.
    pub by_tag: BTreeMap<String, u64>,
    /// Replies whose data could not be decoded.
    pub undecodable: usize,
}

/// Summarize the replies in a response.
pub fn summarize(response: &Response) -> ReplySummary {
    let mut summary = ReplySummary {
        replies: response.replies.len(),
        ..ReplySummary::default()
    };

    for reply in &response.replies {
        match decode_count(&reply.data) {
            Ok(count) => {
                summary.total_count = summary.total_count.saturating_add(count);
                *summary.by_tag.entry(reply.tag.clone()).or_insert(0) += count;
            }
            Err(e) => {
                warn!("Could not decode reply for tag {}: {}", reply.tag, e);
                summary.undecodable += 1;
            }
        }
    }

    summary
}

/// Render a summary as plain text.
pub fn render_text(summary: &ReplySummary) -> String {
    let rule = "=".repeat(50);
    let mut lines = vec![rule.clone(), "SUMMARY".to_string(), rule.clone()];

    if summary.replies == 0 {
        lines.push("No replies received!".to_string());
        return lines.join("\n");
    }

    lines.push(format!("Total replies: {}", summary.replies));
    if summary.undecodable > 0 {
        lines.push(format!("Undecodable replies: {}", summary.undecodable));
    }

    lines.push(String::new());
    lines.push("Packet counts by tag:".to_string());
    for (tag, count) in &summary.by_tag {
        lines.push(format!("  {}: {} packets", tag, count));
    }

    lines.push(String::new());
    lines.push(format!("Total packets counted: {}", summary.total_count));
    lines.push(rule);

    lines.join("\n")
}
