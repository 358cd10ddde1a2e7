// SPDX-License-Identifier: MIT

//! API types for mailbox endpoints.

use serde::{Deserialize, Serialize};

/// Summary of an unread message, as returned by `/email/emails/unread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<String>,
    pub snippet: Option<String>,
}

/// Priority assigned by the keyword analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
}

/// Category assigned by the keyword analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Meeting,
    Task,
    Report,
    Question,
    Other,
}

/// Full analysis of a single message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAnalysis {
    pub id: String,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub date: Option<String>,
    pub content: String,
    pub priority: Priority,
    pub category: Category,
}
