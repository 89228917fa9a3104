//! Artifact generation: render the approved quote into a document.
//!
//! Pure and CPU-bound; no hidden state and no I/O. A failure here halts
//! finalization before any durable side effect, so the caller can safely
//! retry the whole finalize step.

use crate::core::state::ExecutionState;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Execution state has no draft to render")]
    MissingDraft,
    #[error("Draft has no line items")]
    EmptyDraft,
}

/// Renders the quote document from the union of prior node outputs.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPipeline;

impl ArtifactPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Produce the rendered document bytes for a quote.
    pub fn generate(&self, state: &ExecutionState) -> Result<Vec<u8>, ArtifactError> {
        let draft = state.draft.as_ref().ok_or(ArtifactError::MissingDraft)?;
        if draft.line_items.is_empty() {
            return Err(ArtifactError::EmptyDraft);
        }

        let mut doc = String::with_capacity(1024);
        doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        doc.push_str(&format!("<title>{}</title>\n", escape_html(&draft.title)));
        doc.push_str("</head>\n<body>\n");
        doc.push_str(&format!("<h1>{}</h1>\n", escape_html(&draft.title)));
        doc.push_str(&format!(
            "<p>Prepared for: {}</p>\n",
            escape_html(&draft.customer)
        ));
        if let Some(summary) = &draft.summary {
            doc.push_str(&format!("<p>{}</p>\n", escape_html(summary)));
        }

        doc.push_str("<table>\n<tr><th>Item</th><th>Qty</th><th>Unit</th><th>Total</th></tr>\n");
        for item in &draft.line_items {
            doc.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&item.description),
                item.quantity,
                format_amount(item.unit_price_cents, &draft.currency),
                format_amount(item.total_cents(), &draft.currency),
            ));
        }
        doc.push_str(&format!(
            "<tr><td colspan=\"3\">Grand total</td><td>{}</td></tr>\n</table>\n",
            format_amount(draft.total_cents(), &draft.currency)
        ));

        if let Some(decision) = &state.decision {
            if !decision.notes.is_empty() {
                doc.push_str(&format!(
                    "<p>Reviewer notes: {}</p>\n",
                    escape_html(&decision.notes)
                ));
            }
        }

        doc.push_str("</body>\n</html>\n");
        Ok(doc.into_bytes())
    }
}

fn format_amount(cents: i64, currency: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
