use crate::error::AppError;
use crate::location::is_placeholder_location;
use crate::models::Vacancy;
use crate::traits::{CompanyLocator, Parser, Resolver};

/// Resolves a posting URL into a validated vacancy with a concrete location
/// where one can be found.
#[derive(Clone)]
pub struct VacancyResolver<P, L>
where
    P: Parser,
    L: CompanyLocator,
{
    parser: P,
    locator: L,
}

impl<P, L> VacancyResolver<P, L>
where
    P: Parser,
    L: CompanyLocator,
{
    pub fn new(parser: P, locator: L) -> Self {
        Self { parser, locator }
    }
}

impl<P, L> Resolver for VacancyResolver<P, L>
where
    P: Parser,
    L: CompanyLocator,
{
    async fn resolve(&self, url: &str) -> Result<Vacancy, AppError> {
        let mut vacancy = self.parser.parse(url).await?;
        vacancy.validate()?;

        let location = vacancy.company_location.trim();
        if location.is_empty() || is_placeholder_location(location) {
            match self.locator.locate(&vacancy.company_name).await {
                Ok(found) if !found.trim().is_empty() => {
                    vacancy.company_location = found.trim().to_string();
                }
                Ok(_) => {
                    tracing::debug!(company = %vacancy.company_name, "Company HQ unknown");
                }
                Err(e) => {
                    tracing::warn!(
                        company = %vacancy.company_name,
                        %url,
                        error = %e,
                        "Company HQ lookup failed, keeping extracted location"
                    );
                }
            }
        }

        Ok(vacancy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    fn posting(location: &str) -> Vacancy {
        Vacancy {
            job_title: "Backend Engineer".into(),
            company_name: "Acme".into(),
            company_location: location.into(),
            short_description: "APIs".into(),
            relevant_tags: vec!["rust".into()],
            apply_url: "https://acme.example/jobs/1".into(),
        }
    }

    #[tokio::test]
    async fn concrete_location_skips_locator() {
        let locator = MockLocator::new("Paris, France");
        let parser = MockParser::new(posting("Berlin, Germany"));
        let resolver = VacancyResolver::new(parser, locator.clone());

        let vacancy = resolver.resolve("https://acme.example/jobs/1").await.unwrap();

        assert_eq!(vacancy.company_location, "Berlin, Germany");
        assert_eq!(locator.calls(), 0);
    }

    #[tokio::test]
    async fn placeholder_location_is_replaced() {
        let resolver = VacancyResolver::new(
            MockParser::new(posting("Global Remote")),
            MockLocator::new("Paris, France"),
        );

        let vacancy = resolver.resolve("https://acme.example/jobs/1").await.unwrap();
        assert_eq!(vacancy.company_location, "Paris, France");
    }

    #[tokio::test]
    async fn unknown_location_keeps_extracted_value() {
        let resolver = VacancyResolver::new(
            MockParser::new(posting("Remote")),
            MockLocator::new(""),
        );

        let vacancy = resolver.resolve("https://acme.example/jobs/1").await.unwrap();
        assert_eq!(vacancy.company_location, "Remote");
    }

    #[tokio::test]
    async fn locator_failure_is_not_fatal() {
        let resolver = VacancyResolver::new(
            MockParser::new(posting("")),
            MockLocator::with_error(AppError::Timeout(30)),
        );

        let vacancy = resolver.resolve("https://acme.example/jobs/1").await.unwrap();
        assert_eq!(vacancy.company_location, "");
        assert_eq!(vacancy.job_title, "Backend Engineer");
    }

    #[tokio::test]
    async fn invalid_extraction_aborts_before_location_lookup() {
        let mut incomplete = posting("");
        incomplete.company_name = String::new();
        let locator = MockLocator::new("Paris, France");
        let resolver = VacancyResolver::new(MockParser::new(incomplete), locator.clone());

        let err = resolver.resolve("https://acme.example/jobs/1").await.unwrap_err();

        assert!(err.is_bad_request());
        assert_eq!(locator.calls(), 0);
    }

    #[tokio::test]
    async fn parser_error_propagates() {
        let resolver = VacancyResolver::new(
            MockParser::with_error(AppError::HttpError("HTTP 503".into())),
            MockLocator::new("Paris, France"),
        );

        let err = resolver.resolve("https://acme.example/jobs/1").await.unwrap_err();
        assert!(matches!(err, AppError::HttpError(_)));
    }
}
