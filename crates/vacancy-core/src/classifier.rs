use crate::error::AppError;
use crate::models::Vacancy;
use crate::schema::{ApplicabilityInfo, applicability_schema, parse_output};
use crate::traits::{Extractor, RelevanceClassifier};

const DEFAULT_CRITERIA: &str = "The vacancy must be an engineering role \
    (such as software engineer) or a creative role (such as designer). \
    It must be fully remote or open to candidates living in GMT+7 or GMT+8. \
    If unsure, answer that it is not applicable.";

/// Asks the model whether a crawled posting fits the audience.
#[derive(Clone)]
pub struct LlmRelevanceClassifier<E: Extractor> {
    extractor: E,
    criteria: String,
}

impl<E: Extractor> LlmRelevanceClassifier<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            criteria: DEFAULT_CRITERIA.to_string(),
        }
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = criteria.into();
        self
    }

    fn prompt(&self, vacancy: &Vacancy) -> String {
        format!(
            "Decide whether this vacancy is applicable.\n\nCriteria: {}\n\n\
             Title: {}\nCompany: {}\nLocation: {}\n\n{}",
            self.criteria,
            vacancy.job_title,
            vacancy.company_name,
            vacancy.company_location,
            vacancy.short_description
        )
    }
}

impl<E: Extractor> RelevanceClassifier for LlmRelevanceClassifier<E> {
    async fn is_applicable(&self, vacancy: &Vacancy) -> Result<bool, AppError> {
        let schema = applicability_schema();
        let output = self.extractor.extract(&self.prompt(vacancy), &schema).await?;
        let info: ApplicabilityInfo = parse_output(&schema, output)?;
        tracing::debug!(
            url = %vacancy.apply_url,
            applicable = info.is_applicable,
            reason = %info.reason,
            "Classified posting"
        );
        Ok(info.is_applicable)
    }
}
