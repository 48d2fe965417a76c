//! Deterministic context blocks handed to the synthesis collaborator.
//!
//! Every block here is assembled from data the engine has already computed:
//! retrieved item excerpts with their attributes, or exact aggregate
//! tables. The language model only ever phrases these — it never sees a
//! raw corpus dump — and each block doubles as the user-facing fallback
//! when synthesis is unavailable.

use crate::aggregate::IterationMetrics;
use crate::item::Item;
use crate::retrieval::RankedCandidate;

/// Maximum excerpt length per item in a retrieval context block.
const EXCERPT_MAX_CHARS: usize = 300;

/// Render retrieved candidates as an excerpt block.
///
/// One numbered entry per item: id, attributes line, trimmed excerpt.
pub fn retrieval_block(candidates: &[RankedCandidate]) -> String {
    let mut parts = Vec::with_capacity(candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        let item = &candidate.item;
        let attrs = &item.attributes;
        let excerpt = excerpt(&item.content);

        parts.push(format!(
            "{}. [{}] iteration: {} | status: {} | priority: {} | assignees: {}\n   {}",
            i + 1,
            item.id,
            attrs.iteration.as_deref().unwrap_or("-"),
            attrs.status,
            attrs.priority,
            join_or_dash(&attrs.assignees),
            excerpt,
        ));
    }
    parts.join("\n")
}

/// Render a full attribute block for one item (detail lookups).
pub fn detail_block(item: &Item) -> String {
    let attrs = &item.attributes;
    let mut out = format!("Item {}\n", item.id);
    out.push_str(&format!(
        "- iteration: {}\n",
        attrs.iteration.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("- status: {}\n", attrs.status));
    out.push_str(&format!("- priority: {}\n", attrs.priority));
    out.push_str(&format!("- assignees: {}\n", join_or_dash(&attrs.assignees)));
    out.push_str(&format!("- labels: {}\n", join_or_dash(&attrs.labels)));
    out.push_str(&format!("- blocked: {}\n", yes_no(attrs.is_blocked)));
    out.push_str(&format!(
        "- open comments: {}\n",
        yes_no(attrs.has_open_comments)
    ));
    if attrs.has_subitems {
        out.push_str(&format!(
            "- subitems: {}/{} done\n",
            attrs.subitems_done, attrs.subitems_total
        ));
    }
    out.push_str(&format!("\n{}", item.content));
    out
}

/// Render metrics for one iteration as a report block.
pub fn metrics_block(metrics: &IterationMetrics) -> String {
    let mut out = format!("{}\n", metrics.iteration);
    out.push_str(&format!("- total items: {}\n", metrics.total));
    for (status, count) in &metrics.by_status {
        out.push_str(&format!("- {}: {}\n", status, count));
    }
    out.push_str(&format!(
        "- completion: {:.0}%\n",
        metrics.completion_ratio * 100.0
    ));
    out.push_str(&format!("- blocked: {}\n", metrics.blocked_count));
    out.push_str(&format!("- high priority: {}", metrics.high_priority_count));
    out
}

/// Render a comparison of several iterations as one merged table, in the
/// order the caller requested.
pub fn comparison_block(comparison: &[IterationMetrics]) -> String {
    comparison
        .iter()
        .map(metrics_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn excerpt(content: &str) -> String {
    let flattened = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.len() <= EXCERPT_MAX_CHARS {
        return flattened;
    }
    let mut cut = EXCERPT_MAX_CHARS;
    while !flattened.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", flattened[..cut].trim_end())
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
