use url::Url;

use crate::error::AppError;
use crate::models::{Vacancy, parse_apply_url};
use crate::schema::{VacancyInfo, parse_output, vacancy_schema};
use crate::traits::{Cleaner, Extractor, Fetcher, Parser, Screenshotter, VisionExtractor};

const VISION_INSTRUCTION: &str =
    "The image is a screenshot of a job posting. Extract the vacancy details from it.";

/// Fetch the page, strip it to Markdown, and extract vacancy fields from the text.
#[derive(Clone)]
pub struct TextParser<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    fetcher: F,
    cleaner: C,
    extractor: E,
}

impl<F, C, E> TextParser<F, C, E>
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

impl<F, C, E> Parser for TextParser<F, C, E>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
{
    async fn parse(&self, url: &str) -> Result<Vacancy, AppError> {
        tracing::info!("Fetching {}", url);
        let html = self.fetcher.fetch(url).await?;

        let markdown = self.cleaner.clean(&html)?;
        tracing::debug!(
            html_bytes = html.len(),
            markdown_bytes = markdown.len(),
            "Cleaned posting"
        );

        let schema = vacancy_schema();
        let output = self.extractor.extract(&markdown, &schema).await?;
        let info: VacancyInfo = parse_output(&schema, output)?;
        Ok(info.into_vacancy(url))
    }
}

/// Render the page and extract vacancy fields from a screenshot.
///
/// Used for boards whose markup hides the posting from plain fetches.
#[derive(Clone)]
pub struct ScreenshotParser<S, V>
where
    S: Screenshotter,
    V: VisionExtractor,
{
    screenshotter: S,
    vision: V,
}

impl<S, V> ScreenshotParser<S, V>
where
    S: Screenshotter,
    V: VisionExtractor,
{
    pub fn new(screenshotter: S, vision: V) -> Self {
        Self {
            screenshotter,
            vision,
        }
    }
}

impl<S, V> Parser for ScreenshotParser<S, V>
where
    S: Screenshotter,
    V: VisionExtractor,
{
    async fn parse(&self, url: &str) -> Result<Vacancy, AppError> {
        tracing::info!("Capturing {}", url);
        let png = self.screenshotter.capture(url).await?;
        tracing::debug!(png_bytes = png.len(), "Captured posting");

        let schema = vacancy_schema();
        let output = self
            .vision
            .extract_from_image(&png, VISION_INSTRUCTION, &schema)
            .await?;
        let info: VacancyInfo = parse_output(&schema, output)?;
        Ok(info.into_vacancy(url))
    }
}

/// The strategies a dispatcher can route to.
#[derive(Clone)]
pub enum ParseStrategy<F, C, E, S, V>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    S: Screenshotter,
    V: VisionExtractor,
{
    Text(TextParser<F, C, E>),
    Screenshot(ScreenshotParser<S, V>),
}

impl<F, C, E, S, V> Parser for ParseStrategy<F, C, E, S, V>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    S: Screenshotter,
    V: VisionExtractor,
{
    async fn parse(&self, url: &str) -> Result<Vacancy, AppError> {
        match self {
            ParseStrategy::Text(p) => p.parse(url).await,
            ParseStrategy::Screenshot(p) => p.parse(url).await,
        }
    }
}

struct Registration<P> {
    domains: Vec<String>,
    parser: P,
}

/// Routes a URL to the first registered parser whose domains match its host,
/// or to the default parser.
pub struct ParserDispatcher<P: Parser> {
    registrations: Vec<Registration<P>>,
    default: P,
}

impl<P: Parser> ParserDispatcher<P> {
    pub fn new(default: P) -> Self {
        Self {
            registrations: Vec::new(),
            default,
        }
    }

    /// Register `parser` for `domains`. Earlier registrations take precedence.
    pub fn register<I, S>(mut self, domains: I, parser: P) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| {
                let d = d.as_ref().trim().to_lowercase();
                d.trim_start_matches("*.").trim_start_matches('.').to_string()
            })
            .filter(|d| !d.is_empty())
            .collect();
        self.registrations.push(Registration { domains, parser });
        self
    }

    fn select(&self, url: &Url) -> &P {
        let Some(host) = url.host_str() else {
            return &self.default;
        };
        self.registrations
            .iter()
            .find(|r| r.domains.iter().any(|d| host_matches(host, d)))
            .map(|r| &r.parser)
            .unwrap_or(&self.default)
    }
}

impl<P: Parser> Parser for ParserDispatcher<P> {
    async fn parse(&self, url: &str) -> Result<Vacancy, AppError> {
        let parsed = parse_apply_url(url)?;
        self.select(&parsed).parse(url).await
    }
}

/// `host` is `domain` itself or one of its subdomains.
pub(crate) fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
