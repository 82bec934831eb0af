//! Mailbox search query: `is:unread label:<tag> -label:<tag>`.

use crate::error::MailboxError;

/// Structured form of the search language the selector sends to a mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub unread_only: bool,
    pub include_labels: Vec<String>,
    pub exclude_labels: Vec<String>,
}

impl SearchQuery {
    /// Unread threads carrying `inclusion` but not `processed`.
    pub fn candidates(inclusion: &str, processed: &str) -> Self {
        Self {
            unread_only: true,
            include_labels: vec![inclusion.to_string()],
            exclude_labels: vec![processed.to_string()],
        }
    }

    /// Render to the provider query string.
    pub fn render(&self) -> String {
        let mut terms = Vec::with_capacity(1 + self.include_labels.len() + self.exclude_labels.len());
        if self.unread_only {
            terms.push("is:unread".to_string());
        }
        for label in &self.include_labels {
            terms.push(format!("label:{}", label_token(label)));
        }
        for label in &self.exclude_labels {
            terms.push(format!("-label:{}", label_token(label)));
        }
        terms.join(" ")
    }

    /// Parse a query string produced by [`SearchQuery::render`].
    pub fn parse(query: &str) -> Result<Self, MailboxError> {
        let mut parsed = Self::default();
        for term in query.split_whitespace() {
            if term.eq_ignore_ascii_case("is:unread") {
                parsed.unread_only = true;
            } else if let Some(label) = term.strip_prefix("-label:") {
                parsed.exclude_labels.push(non_empty(term, label)?);
            } else if let Some(label) = term.strip_prefix("label:") {
                parsed.include_labels.push(non_empty(term, label)?);
            } else {
                return Err(MailboxError::InvalidQuery(format!(
                    "unsupported term '{term}'"
                )));
            }
        }
        Ok(parsed)
    }

    /// Whether a thread with the given state satisfies this query.
    pub fn matches<'a, I>(&self, unread: bool, labels: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.unread_only && !unread {
            return false;
        }
        let labels: Vec<&str> = labels.into_iter().collect();
        let has = |wanted: &str| labels.iter().any(|l| label_matches(wanted, l));

        self.include_labels.iter().all(|l| has(l.as_str()))
            && !self.exclude_labels.iter().any(|l| has(l.as_str()))
    }
}

/// Labels appear in queries with whitespace collapsed to hyphens.
pub fn label_token(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Case-insensitive comparison of a query label against a label name.
pub fn label_matches(query_label: &str, name: &str) -> bool {
    label_token(query_label).eq_ignore_ascii_case(&label_token(name))
}

fn non_empty(term: &str, label: &str) -> Result<String, MailboxError> {
    if label.is_empty() {
        Err(MailboxError::InvalidQuery(format!("empty label in '{term}'")))
    } else {
        Ok(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_query_renders_all_terms() {
        let query = SearchQuery::candidates("Triage", "Processed");
        assert_eq!(query.render(), "is:unread label:Triage -label:Processed");
    }

    #[test]
    fn labels_with_spaces_render_hyphenated() {
        let query = SearchQuery::candidates("Needs AI  Review", "Processed");
        assert_eq!(
            query.render(),
            "is:unread label:Needs-AI-Review -label:Processed"
        );
    }

    #[test]
    fn parse_reads_back_rendered_query() {
        let query = SearchQuery::candidates("Triage", "Processed");
        assert_eq!(SearchQuery::parse(&query.render()).unwrap(), query);
    }

    #[test]
    fn parse_rejects_unknown_terms() {
        let err = SearchQuery::parse("is:unread from:alice").unwrap_err();
        assert!(matches!(err, MailboxError::InvalidQuery(_)));
        assert!(SearchQuery::parse("label:").is_err());
    }

    #[test]
    fn matches_respects_unread_include_and_exclude() {
        let query = SearchQuery::candidates("Triage", "Processed");

        assert!(query.matches(true, ["Triage"]));
        assert!(query.matches(true, ["triage", "Other"]));
        assert!(!query.matches(false, ["Triage"]));
        assert!(!query.matches(true, ["Other"]));
        assert!(!query.matches(true, ["Triage", "Processed"]));
    }

    #[test]
    fn matches_hyphenated_query_against_spaced_name() {
        let query = SearchQuery::parse("label:Needs-AI").unwrap();
        assert!(query.matches(false, ["Needs AI"]));
    }
}
