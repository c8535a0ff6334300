use serde::{Deserialize, Serialize};
use vacancy_core::models::{SubmitRequest, Vacancy};
use vacancy_core::SubmitOutcome;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VacancyBody {
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

impl From<VacancyBody> for Vacancy {
    fn from(body: VacancyBody) -> Self {
        Vacancy {
            job_title: body.job_title,
            company_name: body.company_name,
            company_location: body.company_location,
            short_description: body.short_description,
            relevant_tags: body.relevant_tags,
            apply_url: body.apply_url,
        }
    }
}

/// Body of `POST /vacancies`, tagged by `submission_type`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(tag = "submission_type", rename_all = "lowercase")]
pub enum SubmitVacancyRequest {
    Manual {
        submission_email: String,
        vacancy: VacancyBody,
    },
    Url {
        submission_email: String,
        apply_url: String,
    },
    Bulk {
        submission_email: String,
        vacancies: Vec<VacancyBody>,
    },
}

impl From<SubmitVacancyRequest> for SubmitRequest {
    fn from(body: SubmitVacancyRequest) -> Self {
        match body {
            SubmitVacancyRequest::Manual {
                submission_email,
                vacancy,
            } => SubmitRequest::manual(vacancy.into(), submission_email),
            SubmitVacancyRequest::Url {
                submission_email,
                apply_url,
            } => SubmitRequest::url(apply_url, submission_email),
            SubmitVacancyRequest::Bulk {
                submission_email,
                vacancies,
            } => SubmitRequest::bulk(
                vacancies.into_iter().map(Into::into).collect(),
                submission_email,
            ),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmitVacancyResponse {
    pub ok: bool,
    /// `pending_approval` or `enqueued`.
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub message_ids: Vec<String>,
}

impl From<SubmitOutcome> for SubmitVacancyResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::PendingApproval { message_ids } => Self {
                ok: true,
                status: "pending_approval".into(),
                message_ids: message_ids.iter().map(|id| id.to_string()).collect(),
            },
            SubmitOutcome::Enqueued => Self {
                ok: true,
                status: "enqueued".into(),
                message_ids: Vec::new(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Approval callbacks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DecisionQuery {
    /// Signed request token from the review link.
    pub data: String,
    pub message_id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DecisionResponse {
    pub ok: bool,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub ok: bool,
    pub err: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(err: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            err: err.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}
