//! Intake validation for uploaded documents.
//!
//! Runs before any record is created: a rejected upload leaves no trace in
//! the registry or the chunk store. Content type is sniffed from the raw
//! bytes; the caller's declared type is only consulted when sniffing is
//! inconclusive.

use crate::config::IntakeConfig;
use crate::error::{PipelineError, PipelineResult};

/// An upload as received from the intake surface (HTTP body or CLI file).
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Vec<u8>,
    /// Content type declared by the caller, if any.
    pub declared_type: Option<String>,
    /// Existing document id to re-ingest. When set, the document's
    /// lifecycle restarts and its chunk generation is replaced; when
    /// absent, a fresh id is assigned.
    pub document_id: Option<String>,
}

/// Validates an upload and resolves its content type.
///
/// Checks, in order: non-empty content, size cap, content-type allowlist.
/// All failures are validation-class.
pub fn validate(config: &IntakeConfig, upload: &Upload) -> PipelineResult<String> {
    if upload.content.is_empty() {
        return Err(PipelineError::Validation(
            "document content is empty".to_string(),
        ));
    }

    if upload.content.len() as i64 > config.max_size_bytes {
        return Err(PipelineError::Validation(format!(
            "document too large: {} bytes (max {})",
            upload.content.len(),
            config.max_size_bytes
        )));
    }

    let content_type = resolve_content_type(&upload.content, upload.declared_type.as_deref());

    if !config.allowed_types.iter().any(|t| t == &content_type) {
        return Err(PipelineError::Validation(format!(
            "unsupported content type: {}",
            content_type
        )));
    }

    Ok(content_type)
}

/// Sniffs the content type from magic bytes, falling back to the declared
/// type, then to `application/octet-stream`.
fn resolve_content_type(content: &[u8], declared: Option<&str>) -> String {
    if let Some(sniffed) = sniff_content_type(content) {
        return sniffed.to_string();
    }

    match declared {
        // Drop parameters like "; charset=utf-8".
        Some(t) => t.split(';').next().unwrap_or(t).trim().to_string(),
        None => "application/octet-stream".to_string(),
    }
}

fn sniff_content_type(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(b"%PDF-") {
        return Some("application/pdf");
    }
    if content.starts_with(b"{\\rtf") {
        return Some("text/rtf");
    }
    if std::str::from_utf8(content).is_ok() {
        return Some("text/plain");
    }
    None
}
