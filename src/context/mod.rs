// Context assembly
// Turns ranked hits into a bounded, citation-carrying prompt


use serde::{Deserialize, Serialize};

use crate::ranker::RankedHit;

/// Marker inserted when retrieval produced nothing. Downstream instructions
/// hang off this so the model declines instead of fabricating.
pub const NO_CONTEXT_MARKER: &str = "[NO CONTEXT FOUND]";

/// Appended where a source was cut at the character budget.
pub const TRUNCATION_MARKER: &str = "[truncated]";

const SOURCE_SEPARATOR: &str = "---\n";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub document_id: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    pub prompt: String,
    pub citations: Vec<Citation>,
    pub truncated: bool,
}

/// Build the bounded prompt. The hit list is cut to `max_results` before any
/// formatting; `max_context_chars` budgets the concatenated source texts, and
/// a hit crossing the budget is truncated at a character boundary with a
/// marker rather than dropped.
#[inline]
pub fn assemble(
    query: &str,
    hits: &[RankedHit],
    max_context_chars: usize,
    max_results: usize,
) -> AssembledContext {
    let considered = &hits[..hits.len().min(max_results)];

    let mut citations = Vec::new();
    let mut blocks: Vec<String> = Vec::new();
    let mut truncated = false;
    let mut remaining = max_context_chars;

    for hit in considered {
        if remaining == 0 {
            break;
        }

        let char_count = hit.text.chars().count();
        let text = if char_count <= remaining {
            remaining -= char_count;
            hit.text.clone()
        } else {
            let mut cut: String = hit.text.chars().take(remaining).collect();
            remaining = 0;
            truncated = true;
            cut.push(' ');
            cut.push_str(TRUNCATION_MARKER);
            cut
        };

        blocks.push(format!("[source: {}]\n{}\n", hit.document_id, text));
        citations.push(Citation {
            document_id: hit.document_id.clone(),
            score: hit.score,
        });
    }

    let mut prompt = String::from(
        "You are the parish assistant. Answer the question using only the context below.\n\n",
    );

    if blocks.is_empty() {
        prompt.push_str("Context:\n");
        prompt.push_str(NO_CONTEXT_MARKER);
        prompt.push_str(
            "\nNo relevant documents were retrieved. Say that you could not find \
             this information and suggest contacting the parish office; do not \
             invent an answer.\n",
        );
    } else {
        prompt.push_str("Context:\n");
        prompt.push_str(&blocks.join(SOURCE_SEPARATOR));
    }

    prompt.push_str("\nQuestion: ");
    prompt.push_str(query);
    prompt.push_str("\nAnswer:");

    AssembledContext {
        prompt,
        citations,
        truncated,
    }
}
