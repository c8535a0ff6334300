use scraper::{Html, Selector};
use vacancy_core::error::AppError;
use vacancy_core::models::Vacancy;
use vacancy_core::schema::{VacancyInfo, parse_output, vacancy_schema};
use vacancy_core::traits::{Cleaner, Extractor, Fetcher, Parser};

const OG_TITLE: &str = r#"meta[property="og:title"]"#;

/// Text parser for Greenhouse job boards.
///
/// Greenhouse pages publish the exact posting title as `og:title`, which is
/// more reliable than the title the model reads out of the page body, so it
/// replaces the extracted one whenever the tag is present.
#[derive(Clone)]
pub struct GreenhouseParser<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    fetcher: F,
    cleaner: C,
    extractor: E,
}

impl<F, C, E> GreenhouseParser<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    pub fn new(fetcher: F, cleaner: C, extractor: E) -> Self {
        Self {
            fetcher,
            cleaner,
            extractor,
        }
    }
}

impl<F, C, E> Parser for GreenhouseParser<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    async fn parse(&self, url: &str) -> Result<Vacancy, AppError> {
        tracing::info!("Fetching Greenhouse posting {}", url);
        let html = self.fetcher.fetch(url).await?;
        let title = og_title(&html)?;
        let markdown = self.cleaner.clean(&html)?;

        let schema = vacancy_schema();
        let output = self.extractor.extract(&markdown, &schema).await?;
        let info: VacancyInfo = parse_output(&schema, output)?;
        let mut vacancy = info.into_vacancy(url);
        match title {
            Some(title) => vacancy.job_title = title,
            None => tracing::debug!(url, "No og:title, keeping extracted job title"),
        }
        Ok(vacancy)
    }
}

/// The non-blank `og:title` of a page, whitespace collapsed.
fn og_title(html: &str) -> Result<Option<String>, AppError> {
    let selector = Selector::parse(OG_TITLE)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{OG_TITLE}': {e}")))?;
    let document = Html::parse_document(html);
    let title = document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|content| content.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|content| !content.is_empty());
    Ok(title)
}
