//! JSON Schemas for LLM extraction calls.
//!
//! Each schema is sent to the model to instruct structured output and then
//! used to validate what comes back before it is deserialized.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::models::Vacancy;

/// Vacancy details as extracted from a posting.
#[derive(Debug, Clone, Deserialize)]
pub struct VacancyInfo {
    pub job_title: String,
    pub company_name: String,
    pub company_location: String,
    pub short_description: String,
    pub relevant_tags: Vec<String>,
}

impl VacancyInfo {
    /// Build a vacancy for `apply_url`, normalizing tags to trimmed lowercase.
    pub fn into_vacancy(self, apply_url: &str) -> Vacancy {
        let relevant_tags = self
            .relevant_tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Vacancy {
            job_title: self.job_title.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
            company_location: self.company_location.trim().to_string(),
            short_description: self.short_description.trim().to_string(),
            relevant_tags,
            apply_url: apply_url.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInfo {
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicabilityInfo {
    pub is_applicable: bool,
    pub reason: String,
}

pub fn vacancy_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "job_title": {
                "type": "string",
                "description": "Title of the job, empty if not found"
            },
            "company_name": {
                "type": "string",
                "description": "Name of the company that posted the vacancy, empty if not found"
            },
            "company_location": {
                "type": "string",
                "description":
                    "Company headquarters as 'City, Country'. Use 'Global Remote' when unknown"
            },
            "short_description": {
                "type": "string",
                "description": "Summary of the vacancy highlighting the important points"
            },
            "relevant_tags": {
                "type": "array",
                "items": {"type": "string"},
                "maxItems": 5,
                "description": "At most 5 lowercase tags relevant to the vacancy"
            }
        },
        "required": [
            "job_title",
            "company_name",
            "company_location",
            "short_description",
            "relevant_tags"
        ],
        "additionalProperties": false
    })
}

pub fn location_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "location": {
                "type": "string",
                "description":
                    "Headquarters location formatted as 'City, Country', empty if unknown"
            }
        },
        "required": ["location"],
        "additionalProperties": false
    })
}

pub fn applicability_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "is_applicable": {
                "type": "boolean",
                "description": "True if the vacancy accepts the target audience"
            },
            "reason": {
                "type": "string",
                "description": "Short justification for the decision"
            }
        },
        "required": ["is_applicable", "reason"],
        "additionalProperties": false
    })
}

/// Validate LLM output against `schema` and deserialize it.
pub fn parse_output<T: DeserializeOwned>(schema: &Value, output: Value) -> Result<T, AppError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| AppError::SchemaValidationError(format!("invalid schema: {e}")))?;
    validator
        .validate(&output)
        .map_err(|e| AppError::SchemaValidationError(e.to_string()))?;
    Ok(serde_json::from_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacancy_output_is_normalized() {
        let output = json!({
            "job_title": " Senior Rust Engineer ",
            "company_name": "Acme",
            "company_location": "Berlin, Germany",
            "short_description": "Build things",
            "relevant_tags": ["Rust", "  ", " Backend "]
        });
        let info: VacancyInfo = parse_output(&vacancy_schema(), output).unwrap();
        let vacancy = info.into_vacancy("https://acme.example/jobs/1");

        assert_eq!(vacancy.job_title, "Senior Rust Engineer");
        assert_eq!(vacancy.relevant_tags, vec!["rust", "backend"]);
        assert_eq!(vacancy.apply_url, "https://acme.example/jobs/1");
    }

    #[test]
    fn output_missing_required_field_is_rejected() {
        let output = json!({"job_title": "Engineer"});
        let err = parse_output::<VacancyInfo>(&vacancy_schema(), output).unwrap_err();
        assert!(matches!(err, AppError::SchemaValidationError(_)));
    }

    #[test]
    fn output_with_wrong_type_is_rejected() {
        let output = json!({"is_applicable": "yes", "reason": "looks fine"});
        let err = parse_output::<ApplicabilityInfo>(&applicability_schema(), output).unwrap_err();
        assert!(matches!(err, AppError::SchemaValidationError(_)));
    }

    #[test]
    fn location_output_parses() {
        let info: LocationInfo =
            parse_output(&location_schema(), json!({"location": "Oslo, Norway"})).unwrap();
        assert_eq!(info.location, "Oslo, Norway");
    }
}
