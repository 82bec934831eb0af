//! Gmail REST v1 implementation of [`Mailbox`].
//!
//! Endpoints used:
//! - `users.threads.list` for candidate search
//! - `users.threads.get` for the first message of a thread
//! - `users.labels.list` / `users.labels.create` for label resolution
//! - `users.threads.modify` for attaching labels
//!
//! Authentication is a caller-supplied OAuth bearer token.

use async_trait::async_trait;
use base64::prelude::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LabelRef, Mailbox, Message, Thread};
use crate::config::GmailConfig;
use crate::error::MailboxError;

/// Gmail caps `maxResults` on list calls.
const GMAIL_MAX_RESULTS: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    threads: Option<Vec<ThreadSummary>>,
}

#[derive(Debug, Deserialize)]
struct ThreadSummary {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailThread {
    id: String,
    messages: Option<Vec<GmailMessage>>,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    payload: Option<GmailPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPayload {
    mime_type: Option<String>,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPayload>>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GmailBody {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelsListResponse {
    labels: Option<Vec<GmailLabel>>,
}

#[derive(Debug, Deserialize)]
struct GmailLabel {
    id: String,
    name: String,
    #[serde(rename = "type")]
    label_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLabelRequest<'a> {
    name: &'a str,
    label_list_visibility: &'a str,
    message_list_visibility: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyRequest {
    add_label_ids: Vec<String>,
}

/// Gmail-backed mailbox.
pub struct GmailMailbox {
    client: reqwest::Client,
    api_base: String,
    access_token: SecretString,
}

impl GmailMailbox {
    pub fn new(config: &GmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api_base, endpoint)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, MailboxError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .bearer_auth(self.access_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| MailboxError::Connection(e.without_url().to_string()))?;

        handle_response(response).await
    }

    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, MailboxError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| MailboxError::Connection(e.without_url().to_string()))?;

        handle_response(response).await
    }
}

async fn handle_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, MailboxError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match status.as_u16() {
            401 | 403 => MailboxError::Auth(format!("{status}: {body}")),
            404 => MailboxError::NotFound(body),
            code => MailboxError::Api { status: code, body },
        });
    }

    response
        .json()
        .await
        .map_err(|e| MailboxError::Parse(e.without_url().to_string()))
}

/// Gmail encodes bodies as base64url, sometimes padded.
fn decode_body(data: &str) -> Option<String> {
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// First `text/plain` body in the payload tree, depth first.
fn extract_plain_body(payload: &GmailPayload) -> Option<String> {
    let is_plain = payload
        .mime_type
        .as_deref()
        .is_none_or(|m| m.eq_ignore_ascii_case("text/plain"));

    if is_plain {
        if let Some(text) = payload
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .and_then(decode_body)
        {
            return Some(text);
        }
    }

    payload
        .parts
        .iter()
        .flatten()
        .find_map(extract_plain_body)
}

fn header<'a>(payload: &'a GmailPayload, name: &str) -> Option<&'a str> {
    payload
        .headers
        .iter()
        .flatten()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn search(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Thread>, MailboxError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let max_results = (offset + limit).min(GMAIL_MAX_RESULTS);
        let response: ThreadListResponse = self
            .get(
                "/threads",
                &[("q", query.to_string()), ("maxResults", max_results.to_string())],
            )
            .await?;

        Ok(response
            .threads
            .unwrap_or_default()
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|t| Thread::new(t.id))
            .collect())
    }

    async fn first_message(&self, thread: &Thread) -> Result<Message, MailboxError> {
        let response: GmailThread = self
            .get(
                &format!("/threads/{}", thread.id),
                &[("format", "full".to_string())],
            )
            .await?;

        let first = response
            .messages
            .and_then(|m| m.into_iter().next())
            .ok_or_else(|| MailboxError::NotFound(format!("thread {} has no messages", response.id)))?;

        let (subject, plain_body) = match &first.payload {
            Some(payload) => (
                header(payload, "Subject").unwrap_or_default().to_string(),
                extract_plain_body(payload).unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        Ok(Message {
            id: first.id,
            subject,
            plain_body,
        })
    }

    async fn user_label_by_name(&self, name: &str) -> Result<Option<LabelRef>, MailboxError> {
        let response: LabelsListResponse = self.get("/labels", &[]).await?;

        Ok(response
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter(|l| l.label_type.as_deref() == Some("user"))
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .map(|l| LabelRef {
                id: l.id,
                name: l.name,
            }))
    }

    async fn create_label(&self, name: &str) -> Result<LabelRef, MailboxError> {
        let request = CreateLabelRequest {
            name,
            label_list_visibility: "labelShow",
            message_list_visibility: "show",
        };
        let created: GmailLabel = self.post("/labels", &request).await?;
        tracing::info!(label = %created.name, id = %created.id, "Created Gmail label");

        Ok(LabelRef {
            id: created.id,
            name: created.name,
        })
    }

    async fn add_label(&self, thread: &Thread, label: &LabelRef) -> Result<(), MailboxError> {
        let request = ModifyRequest {
            add_label_ids: vec![label.id.clone()],
        };
        let _: serde_json::Value = self
            .post(&format!("/threads/{}/modify", thread.id), &request)
            .await?;
        Ok(())
    }
}
