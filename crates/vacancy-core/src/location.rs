use std::time::Duration;

use moka::future::Cache;
use url::Url;

use crate::error::AppError;
use crate::schema::{LocationInfo, location_schema, parse_output};
use crate::traits::{CompanyLocator, Extractor, Screenshotter, VacancyStore, VisionExtractor};

const SEARCH_URL: &str = "https://duckduckgo.com/";
const CACHE_CAPACITY: u64 = 10_000;
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// True for locations that name no place, such as "Remote" or "Global Remote".
pub fn is_placeholder_location(location: &str) -> bool {
    let lower = location.to_lowercase();
    lower.contains("remote") || lower.contains("global")
}

fn concrete(location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() || is_placeholder_location(location) {
        None
    } else {
        Some(location.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Store,
    Knowledge,
    Search,
}

/// Finds where a company is headquartered.
///
/// Tries, in order: a location already stored for the company, the model's
/// own knowledge, and a screenshot of web search results. The first concrete
/// answer wins. The empty string means unknown.
#[derive(Clone)]
pub struct LocationResolver<S, E, B, V>
where
    S: VacancyStore,
    E: Extractor,
    B: Screenshotter,
    V: VisionExtractor,
{
    store: S,
    extractor: E,
    screenshotter: B,
    vision: V,
    cache: Cache<String, String>,
}

impl<S, E, B, V> LocationResolver<S, E, B, V>
where
    S: VacancyStore,
    E: Extractor,
    B: Screenshotter,
    V: VisionExtractor,
{
    pub fn new(store: S, extractor: E, screenshotter: B, vision: V) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();
        Self {
            store,
            extractor,
            screenshotter,
            vision,
            cache,
        }
    }

    /// Returns "City, Country" or "" when no step produced an answer.
    ///
    /// A failing step is logged and the next one tried. An error is
    /// returned only when every step failed.
    pub async fn resolve(&self, company_name: &str) -> Result<String, AppError> {
        let company = company_name.trim();
        if company.is_empty() {
            return Ok(String::new());
        }

        if let Some(cached) = self.cache.get(company).await {
            return Ok(cached);
        }

        let mut last_error = None;
        let mut any_answered = false;
        for step in [Step::Store, Step::Knowledge, Step::Search] {
            let outcome = match step {
                Step::Store => self.from_store(company).await,
                Step::Knowledge => self.from_knowledge(company).await,
                Step::Search => self.from_search(company).await,
            };
            match outcome {
                Ok(Some(location)) => {
                    tracing::info!(%company, %location, ?step, "Resolved company HQ");
                    self.cache
                        .insert(company.to_string(), location.clone())
                        .await;
                    return Ok(location);
                }
                Ok(None) => any_answered = true,
                Err(e) => {
                    tracing::warn!(%company, ?step, error = %e, "HQ lookup step failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !any_answered => Err(e),
            _ => Ok(String::new()),
        }
    }

    async fn from_store(&self, company: &str) -> Result<Option<String>, AppError> {
        let stored = self.store.lookup_company_location(company).await?;
        Ok(stored.as_deref().and_then(concrete))
    }

    async fn from_knowledge(&self, company: &str) -> Result<Option<String>, AppError> {
        let schema = location_schema();
        let prompt = format!(
            "Company: {company}\n\nWhere is this company headquartered? \
             Answer with 'City, Country'. Leave the location empty if you are not sure."
        );
        let output = self.extractor.extract(&prompt, &schema).await?;
        let info: LocationInfo = parse_output(&schema, output)?;
        Ok(concrete(&info.location))
    }

    async fn from_search(&self, company: &str) -> Result<Option<String>, AppError> {
        let url = search_url(company)?;
        let png = self.screenshotter.capture(url.as_str()).await?;

        let schema = location_schema();
        let instruction = format!(
            "The image shows web search results for where the headquarters of {company} is. \
             Extract the headquarters location as 'City, Country', \
             or leave it empty if the results do not say."
        );
        let output = self
            .vision
            .extract_from_image(&png, &instruction, &schema)
            .await?;
        let info: LocationInfo = parse_output(&schema, output)?;
        Ok(concrete(&info.location))
    }
}

impl<S, E, B, V> CompanyLocator for LocationResolver<S, E, B, V>
where
    S: VacancyStore,
    E: Extractor,
    B: Screenshotter,
    V: VisionExtractor,
{
    async fn locate(&self, company_name: &str) -> Result<String, AppError> {
        self.resolve(company_name).await
    }
}

fn search_url(company: &str) -> Result<Url, AppError> {
    let query = format!("Where is {company} hq located?");
    Url::parse_with_params(SEARCH_URL, &[("q", query)])
        .map_err(|e| AppError::Generic(format!("failed to build search URL: {e}")))
}
