//! Inbox triage: classify unread, tagged mail and label what needs a reply.

pub mod config;
pub mod error;
pub mod llm;
pub mod mailbox;
pub mod pipeline;
