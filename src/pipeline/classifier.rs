//! Classifier client: prompt construction, one generation call, verdict parsing.
//!
//! Parsing is its own stage: strip a surrounding code fence, trim, then
//! require a JSON object with a boolean `requiresResponse`. Nothing else is
//! accepted, so a chatty model answer fails cleanly instead of being guessed at.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::ClassificationError;
use crate::llm::TextGenerator;
use crate::mailbox::Message;
use crate::pipeline::types::Verdict;

/// Bodies longer than this are cut before they go into the prompt.
const MAX_BODY_CHARS: usize = 8_000;

/// How much of a bad model answer ends up in the error text.
const RAW_PREVIEW_CHARS: usize = 200;

/// Opening fence with an optional language tag (```json, ```JSON, ```).
static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:[A-Za-z][\w+-]*)?").unwrap());

/// Decides whether a message needs a reply from the mailbox owner.
pub struct Classifier {
    generator: Arc<dyn TextGenerator>,
}

impl Classifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Classify one message with exactly one generation call.
    pub async fn classify(&self, message: &Message) -> Result<Verdict, ClassificationError> {
        let prompt = build_prompt(message);
        let raw = self.generator.generate(&prompt).await?;

        let verdict = parse_verdict(&raw).inspect_err(|e| {
            warn!(
                message_id = %message.id,
                provider = self.generator.name(),
                error = %e,
                "Unusable classification output"
            );
        })?;

        debug!(
            message_id = %message.id,
            requires_response = verdict.requires_response,
            "Message classified"
        );
        Ok(verdict)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the classification prompt for one message.
pub fn build_prompt(message: &Message) -> String {
    let body = truncate_chars(&message.plain_body, MAX_BODY_CHARS);
    let subject = if message.subject.trim().is_empty() {
        "(no subject)"
    } else {
        message.subject.trim()
    };

    format!(
        "You triage email for a busy professional. Decide whether the email below \
         requires a personal response from them.\n\n\
         It REQUIRES a response when any of these hold:\n\
         - It asks them a direct question addressed to them personally.\n\
         - It requests a deliverable they own (a document, data, a fix, an answer).\n\
         - It explicitly asks them to review, approve, or make a decision.\n\
         - They started the conversation and it is now waiting on their own follow-up.\n\n\
         It does NOT require a response when it is:\n\
         - An automated or system notification (alerts, receipts, build results, password resets).\n\
         - A calendar invitation, update, or cancellation.\n\
         - A mass announcement, newsletter, or marketing email.\n\
         - An informational note with nothing asked of them.\n\
         - A generic call to action aimed at many recipients.\n\
         - A thread where they are only copied for information.\n\n\
         Respond with ONLY a single JSON object with exactly one boolean key:\n\
         {{\"requiresResponse\": true}} or {{\"requiresResponse\": false}}\n\
         Do not add any other keys, text, or explanation.\n\n\
         Subject: {subject}\n\n\
         Body:\n{body}"
    )
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Remove a surrounding ``` fence (with optional language tag) and trim.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = match LEADING_FENCE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };
    let without_close = without_open.trim_end();
    without_close
        .strip_suffix("```")
        .unwrap_or(without_close)
        .trim()
}

/// Parse generated text into a [`Verdict`].
pub fn parse_verdict(raw: &str) -> Result<Verdict, ClassificationError> {
    let invalid = |reason: String| ClassificationError::InvalidVerdict {
        reason,
        raw: truncate_chars(raw, RAW_PREVIEW_CHARS).to_string(),
    };

    let cleaned = strip_code_fences(raw);
    let value: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|e| invalid(format!("not JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object".into()))?;

    let requires_response = object
        .get("requiresResponse")
        .and_then(serde_json::Value::as_bool)
        .ok_or_else(|| invalid("missing boolean requiresResponse".into()))?;

    Ok(Verdict { requires_response })
}
