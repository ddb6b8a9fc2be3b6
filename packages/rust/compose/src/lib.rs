//! Knowledge-base composition with provenance markers.
//!
//! Staged ingestion results are merged into a department's knowledge text as
//! append-only blocks, each preceded by a provenance header of the exact
//! literal form `--- Source: <source> ---`. The marker line is the only
//! durable wire format this crate owns: [`list_sources`] recovers the ordered
//! source list from any knowledge text, tolerating arbitrary free text
//! between blocks.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use chatdesk_shared::{ChatdeskError, Result, StagedItem};

/// Matches a provenance header line and captures the source identifier.
static SOURCE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--- Source: (.*?) ---").expect("valid regex"));

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Render the provenance header for a source identifier.
///
/// Fails with a validation error if the source contains the literal `---`
/// sequence, which would corrupt the marker line.
pub fn provenance_header(source: &str) -> Result<String> {
    if source.contains("---") {
        return Err(ChatdeskError::validation(format!(
            "source '{source}' contains '---', which is reserved for provenance markers"
        )));
    }
    Ok(format!("--- Source: {source} ---"))
}

/// Append staged items to existing knowledge text.
///
/// Each item becomes a provenance header followed by its text; blocks are
/// joined with blank-line separators, and the whole batch is appended to
/// `existing` separated by a blank line when prior content is non-empty.
/// Prior content is never rewritten. An empty batch returns `existing`
/// unchanged. Duplicate sources are appended again, not collapsed.
pub fn append_staged(existing: &str, items: &[StagedItem]) -> Result<String> {
    if items.is_empty() {
        return Ok(existing.to_string());
    }

    let mut blocks = Vec::with_capacity(items.len());
    for item in items {
        let header = provenance_header(&item.source)?;
        blocks.push(format!("{header}\n{}", item.text));
    }
    let batch = blocks.join("\n\n");

    debug!(
        items = items.len(),
        existing_len = existing.len(),
        batch_len = batch.len(),
        "composing staged items into knowledge text"
    );

    if existing.is_empty() {
        Ok(batch)
    } else {
        Ok(format!("{existing}\n\n{batch}"))
    }
}

// ---------------------------------------------------------------------------
// Source extraction
// ---------------------------------------------------------------------------

/// Scan knowledge text for provenance headers, in appearance order.
///
/// Read-only; imposes no ordering constraint between blocks and ignores any
/// interleaved free text. Duplicated sources yield duplicated entries.
pub fn list_sources(text: &str) -> Vec<String> {
    SOURCE_MARKER_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk_shared::StagedKind;

    fn staged(source: &str, text: &str) -> StagedItem {
        StagedItem {
            kind: StagedKind::Web,
            source: source.into(),
            text: text.into(),
        }
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let existing = "manual notes about refunds";
        let out = append_staged(existing, &[]).expect("compose");
        assert_eq!(out, existing);

        let out = append_staged("", &[]).expect("compose");
        assert_eq!(out, "");
    }

    #[test]
    fn first_batch_into_empty_text_has_no_leading_separator() {
        let out = append_staged("", &[staged("a.pdf", "refund policy text")]).expect("compose");
        assert_eq!(out, "--- Source: a.pdf ---\nrefund policy text");
    }

    #[test]
    fn batch_appends_after_blank_line() {
        let out = append_staged(
            "hand-written intro",
            &[staged("http://x.com", "pricing table")],
        )
        .expect("compose");
        assert_eq!(
            out,
            "hand-written intro\n\n--- Source: http://x.com ---\npricing table"
        );
    }

    #[test]
    fn list_sources_returns_appearance_order() {
        let out = append_staged(
            "",
            &[
                staged("a.pdf", "alpha"),
                staged("http://x.com", "beta"),
            ],
        )
        .expect("compose");
        assert_eq!(list_sources(&out), vec!["a.pdf", "http://x.com"]);
    }

    #[test]
    fn list_sources_tolerates_interleaved_free_text() {
        let text = "intro paragraph\n\n--- Source: a.pdf ---\nalpha\n\nan admin typed \
                    this in between\n\n--- Source: http://x.com ---\nbeta\n\ntrailing note";
        assert_eq!(list_sources(text), vec!["a.pdf", "http://x.com"]);
    }

    #[test]
    fn list_sources_on_plain_text_is_empty() {
        assert!(list_sources("no markers anywhere in here").is_empty());
    }

    #[test]
    fn duplicate_sources_are_preserved_not_collapsed() {
        let once = append_staged("", &[staged("a.pdf", "v1")]).expect("compose");
        let twice = append_staged(&once, &[staged("a.pdf", "v2")]).expect("compose");

        assert_eq!(list_sources(&twice), vec!["a.pdf", "a.pdf"]);
        assert!(twice.contains("v1"));
        assert!(twice.contains("v2"));
    }

    #[test]
    fn prior_content_is_never_rewritten() {
        let existing = "--- Source: old.pdf ---\noriginal block";
        let out = append_staged(existing, &[staged("new.pdf", "new block")]).expect("compose");
        assert!(out.starts_with(existing));
    }

    #[test]
    fn source_containing_marker_sequence_is_rejected() {
        let err = append_staged("", &[staged("evil --- name", "text")]).unwrap_err();
        assert!(err.to_string().contains("provenance"));

        assert!(provenance_header("a.pdf").is_ok());
        assert!(provenance_header("x---y").is_err());
    }
}
