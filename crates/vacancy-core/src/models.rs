use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::AppError;

/// A job posting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacancy {
    pub job_title: String,
    pub company_name: String,
    #[serde(default)]
    pub company_location: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub relevant_tags: Vec<String>,
    pub apply_url: String,
}

impl Vacancy {
    /// Checks the fields every stored vacancy must carry.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.job_title.trim().is_empty() {
            return Err(AppError::BadRequest("missing job_title".into()));
        }
        if self.company_name.trim().is_empty() {
            return Err(AppError::BadRequest("missing company_name".into()));
        }
        if self.apply_url.trim().is_empty() {
            return Err(AppError::BadRequest("missing apply_url".into()));
        }
        parse_apply_url(&self.apply_url)?;
        Ok(())
    }
}

/// Parse an apply URL, accepting only `http` and `https`.
pub fn parse_apply_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("invalid apply_url '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(AppError::BadRequest(format!(
            "apply_url must be an http(s) URL, got '{raw}'"
        ))),
    }
}

/// A persisted vacancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VacancyRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub vacancy: Vacancy,
    pub created_at: DateTime<Utc>,
}

/// The payload of an intake request, tagged by `submission_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "submission_type", rename_all = "lowercase")]
pub enum Submission {
    /// A fully specified vacancy typed in by a person.
    Manual { vacancy: Vacancy },
    /// A posting URL that still has to be resolved.
    Url {
        apply_url: String,
        /// Result of inline resolution at intake time.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolved: Option<Vacancy>,
    },
    /// Many candidate postings, split into url submissions on intake.
    Bulk { vacancies: Vec<Vacancy> },
}

/// An intake unit travelling through approval and the vacancy queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(flatten)]
    pub submission: Submission,
    pub submission_email: String,
    #[serde(default)]
    pub retries: u32,
}

impl SubmitRequest {
    pub fn manual(vacancy: Vacancy, submission_email: impl Into<String>) -> Self {
        Self {
            submission: Submission::Manual { vacancy },
            submission_email: submission_email.into(),
            retries: 0,
        }
    }

    pub fn url(apply_url: impl Into<String>, submission_email: impl Into<String>) -> Self {
        Self {
            submission: Submission::Url {
                apply_url: apply_url.into(),
                resolved: None,
            },
            submission_email: submission_email.into(),
            retries: 0,
        }
    }

    pub fn bulk(vacancies: Vec<Vacancy>, submission_email: impl Into<String>) -> Self {
        Self {
            submission: Submission::Bulk { vacancies },
            submission_email: submission_email.into(),
            retries: 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.submission {
            Submission::Manual { .. } => "manual",
            Submission::Url { .. } => "url",
            Submission::Bulk { .. } => "bulk",
        }
    }

    /// The apply URL for single-item submissions.
    pub fn apply_url(&self) -> Option<&str> {
        match &self.submission {
            Submission::Manual { vacancy } => Some(&vacancy.apply_url),
            Submission::Url { apply_url, .. } => Some(apply_url),
            Submission::Bulk { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        match &self.submission {
            Submission::Manual { vacancy } => vacancy.validate(),
            Submission::Url { apply_url, .. } => parse_apply_url(apply_url).map(|_| ()),
            Submission::Bulk { vacancies } => {
                if vacancies.is_empty() {
                    return Err(AppError::BadRequest("bulk submission is empty".into()));
                }
                for vacancy in vacancies {
                    parse_apply_url(&vacancy.apply_url)?;
                }
                Ok(())
            }
        }
    }
}

/// A request to deliver a stored vacancy to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: String,
    pub record: VacancyRecord,
    #[serde(default)]
    pub retries: u32,
}

/// State of a pending human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApprovalState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalState::Pending),
            "approved" => Ok(ApprovalState::Approved),
            "rejected" => Ok(ApprovalState::Rejected),
            _ => Err(format!("Unknown approval state: {}", s)),
        }
    }
}

/// The reviewer's choice on an approval callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_state(self) -> ApprovalState {
        match self {
            Decision::Approve => ApprovalState::Approved,
            Decision::Reject => ApprovalState::Rejected,
        }
    }
}

const SINGLE_SUFFIX: &str = "@single";
const BATCH_SUFFIX: &str = "@bulk";

/// Identifier of an approval record, shared with the review notification.
///
/// Ids minted for bulk submissions end with `@bulk`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn single() -> Self {
        Self(format!("{}{SINGLE_SUFFIX}", Uuid::new_v4().simple()))
    }

    pub fn batch() -> Self {
        Self(format!("{}{BATCH_SUFFIX}", Uuid::new_v4().simple()))
    }

    pub fn is_batch(&self) -> bool {
        self.0.ends_with(BATCH_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One item a reviewer is asked to approve or reject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub message_id: MessageId,
    pub token: String,
    pub submission_email: String,
    /// What the reviewer sees; for crawled items only what the crawler scraped.
    pub preview: Vacancy,
}
