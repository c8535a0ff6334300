use vacancy_core::error::AppError;
use vacancy_core::models::Vacancy;
use vacancy_core::parser::{ParseStrategy, ParserDispatcher, ScreenshotParser, TextParser};
use vacancy_core::traits::{Parser, VacancyStore};
use vacancy_core::{LocationResolver, VacancyResolver};

use crate::{ChromiumBrowser, GreenhouseParser, HtmdCleaner, OpenAiClient, ReqwestFetcher};

/// Hosts served by Greenhouse, subdomains included.
pub const GREENHOUSE_DOMAINS: &[&str] = &["greenhouse.io"];

pub type ParseStrategyImpl =
    ParseStrategy<ReqwestFetcher, HtmdCleaner, OpenAiClient, ChromiumBrowser, OpenAiClient>;

pub type StandardLocator<S> = LocationResolver<S, OpenAiClient, ChromiumBrowser, OpenAiClient>;

pub type StandardResolver<S> =
    VacancyResolver<ParserDispatcher<StandardParser>, StandardLocator<S>>;

/// Every parser the standard resolver can route to.
#[derive(Clone)]
pub enum StandardParser {
    Strategy(ParseStrategyImpl),
    Greenhouse(GreenhouseParser<ReqwestFetcher, HtmdCleaner, OpenAiClient>),
}

impl Parser for StandardParser {
    async fn parse(&self, url: &str) -> Result<Vacancy, AppError> {
        match self {
            StandardParser::Strategy(p) => p.parse(url).await,
            StandardParser::Greenhouse(p) => p.parse(url).await,
        }
    }
}

/// The resolver used by the server and the workers.
///
/// Postings are read from a screenshot by default. Greenhouse boards are
/// fetched as HTML and titled from their `og:title`. Hosts under
/// `text_domains` serve their postings as plain HTML and are fetched and
/// extracted as text instead.
pub fn standard_resolver<S: VacancyStore>(
    store: S,
    llm: OpenAiClient,
    browser: ChromiumBrowser,
    fetcher: ReqwestFetcher,
    text_domains: &[String],
) -> StandardResolver<S> {
    let screenshot = ScreenshotParser::new(browser.clone(), llm.clone());
    let greenhouse = GreenhouseParser::new(fetcher.clone(), HtmdCleaner::new(), llm.clone());
    let text = TextParser::new(fetcher, HtmdCleaner::new(), llm.clone());
    let dispatcher = route_parsers(
        StandardParser::Strategy(ParseStrategy::Screenshot(screenshot)),
        StandardParser::Greenhouse(greenhouse),
        StandardParser::Strategy(ParseStrategy::Text(text)),
        text_domains,
    );

    let locator = LocationResolver::new(store, llm.clone(), browser, llm);
    VacancyResolver::new(dispatcher, locator)
}

/// Greenhouse hosts first, then any configured text hosts, then `default`.
fn route_parsers<P: Parser>(
    default: P,
    greenhouse: P,
    text: P,
    text_domains: &[String],
) -> ParserDispatcher<P> {
    let dispatcher = ParserDispatcher::new(default).register(GREENHOUSE_DOMAINS, greenhouse);
    if text_domains.is_empty() {
        dispatcher
    } else {
        dispatcher.register(text_domains, text)
    }
}
