//! Signed, self-contained approval tokens.
//!
//! A token carries everything needed to rebuild a submission when the
//! reviewer clicks approve or reject, so nothing has to be looked up first.
//! Tokens are HS256 JWTs without expiry.

use std::collections::HashSet;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{SubmitRequest, Submission, Vacancy};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "submission_type", rename_all = "lowercase")]
enum Claims {
    Manual(ManualClaims),
    Url(UrlClaims),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManualClaims {
    submission_email: String,
    retries: u32,
    vacancy: VacancyClaims,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct UrlClaims {
    submission_email: String,
    retries: u32,
    apply_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct VacancyClaims {
    job_title: String,
    company_name: String,
    company_location: String,
    short_description: String,
    relevant_tags: Vec<String>,
    apply_url: String,
}

impl From<&Vacancy> for VacancyClaims {
    fn from(v: &Vacancy) -> Self {
        Self {
            job_title: v.job_title.clone(),
            company_name: v.company_name.clone(),
            company_location: v.company_location.clone(),
            short_description: v.short_description.clone(),
            relevant_tags: v.relevant_tags.clone(),
            apply_url: v.apply_url.clone(),
        }
    }
}

impl From<VacancyClaims> for Vacancy {
    fn from(c: VacancyClaims) -> Self {
        Self {
            job_title: c.job_title,
            company_name: c.company_name,
            company_location: c.company_location,
            short_description: c.short_description,
            relevant_tags: c.relevant_tags,
            apply_url: c.apply_url,
        }
    }
}

/// Encodes submissions into tokens and back.
#[derive(Clone)]
pub struct RequestTokenizer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl RequestTokenizer {
    pub fn new(secret: &str) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::ConfigError(
                "token signing secret must not be empty".into(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign a manual or url submission. A url submission's resolved
    /// vacancy is not carried; the token only holds the apply URL.
    pub fn encode(&self, request: &SubmitRequest) -> Result<String, AppError> {
        let claims = match &request.submission {
            Submission::Manual { vacancy } => Claims::Manual(ManualClaims {
                submission_email: request.submission_email.clone(),
                retries: request.retries,
                vacancy: vacancy.into(),
            }),
            Submission::Url { apply_url, .. } => Claims::Url(UrlClaims {
                submission_email: request.submission_email.clone(),
                retries: request.retries,
                apply_url: apply_url.clone(),
            }),
            Submission::Bulk { .. } => {
                return Err(AppError::BadRequest(
                    "bulk submissions cannot be tokenized".into(),
                ));
            }
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Generic(format!("failed to sign token: {e}")))
    }

    pub fn decode(&self, token: &str) -> Result<SubmitRequest, AppError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::InvalidToken(e.to_string()))?;

        let request = match data.claims {
            Claims::Manual(c) => SubmitRequest {
                submission: Submission::Manual {
                    vacancy: c.vacancy.into(),
                },
                submission_email: c.submission_email,
                retries: c.retries,
            },
            Claims::Url(c) => SubmitRequest {
                submission: Submission::Url {
                    apply_url: c.apply_url,
                    resolved: None,
                },
                submission_email: c.submission_email,
                retries: c.retries,
            },
        };
        Ok(request)
    }
}
