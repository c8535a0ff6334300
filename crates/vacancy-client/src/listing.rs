use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use url::Url;
use vacancy_core::error::AppError;
use vacancy_core::models::Vacancy;
use vacancy_core::traits::{CrawlSource, Fetcher};

/// How postings are delimited on a listing page.
#[derive(Debug, Clone)]
pub enum ItemLayout {
    /// Every element matching the selector is one posting.
    Element(String),
    /// A posting is the run of sibling elements after each separator, up to
    /// the next separator.
    SeparatedBy(String),
}

/// Where the description sits on a posting page.
#[derive(Debug, Clone)]
pub enum DescriptionLayout {
    /// The children of the first matching element, one line each.
    Block(String),
    /// The siblings following the parent of a label element, stopping at the
    /// first one whose text contains `stop_text`.
    AfterLabel {
        label_selector: String,
        label_text: String,
        stop_text: Option<String>,
    },
}

/// Where a job board lists its postings and how to read a posting page.
#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub name: String,
    pub listing_url: String,
    pub items: ItemLayout,
    /// The detail link inside an item; the first match wins.
    pub link_selector: String,
    /// Skip items whose text does not contain this.
    pub required_text: Option<String>,
    pub title_selector: String,
    pub company_selector: String,
    /// Take the first company element starting with this label, minus the label.
    pub company_label: Option<String>,
    pub location_selector: Option<String>,
    pub description: DescriptionLayout,
    pub apply_selector: String,
    /// Among apply candidates, take the first whose text contains this (case-insensitive).
    pub apply_text: Option<String>,
}

impl ListingConfig {
    pub fn weworkremotely() -> Self {
        Self {
            name: "weworkremotely".into(),
            listing_url: "https://weworkremotely.com/100-percent-remote-jobs".into(),
            items: ItemLayout::Element(".jobs li".into()),
            link_selector: "a[href^='/remote-jobs/']".into(),
            required_text: None,
            title_selector: "h2.lis-container__header__hero__company-info__title".into(),
            company_selector: "div.lis-container__job__sidebar__companyDetails__info__title h3"
                .into(),
            company_label: None,
            location_selector: None,
            description: DescriptionLayout::Block(
                "div.lis-container__job__content__description".into(),
            ),
            apply_selector: "a#job-cta-alt".into(),
            apply_text: None,
        }
    }

    /// Go jobs open to the rest of the world. Only worldwide fully remote
    /// postings are followed.
    pub fn golangprojects() -> Self {
        Self {
            name: "golangprojects".into(),
            listing_url: "https://www.golangprojects.com/golang-rest-of-world-jobs.html".into(),
            items: ItemLayout::SeparatedBy("hr.clear-both".into()),
            link_selector: "a[href]".into(),
            required_text: Some("Worldwide, 100% Remote".into()),
            title_selector: "h1".into(),
            company_selector: "h3".into(),
            company_label: Some("Company:".into()),
            location_selector: None,
            description: DescriptionLayout::AfterLabel {
                label_selector: "b".into(),
                label_text: "Job description".into(),
                stop_text: Some("Other Golang jobs".into()),
            },
            apply_selector: "a.cs-button[role='button']".into(),
            apply_text: Some("apply now".into()),
        }
    }

    /// Both supported boards.
    pub fn defaults() -> Vec<Self> {
        vec![Self::weworkremotely(), Self::golangprojects()]
    }

    pub fn with_required_text(mut self, text: impl Into<String>) -> Self {
        self.required_text = Some(text.into());
        self
    }

    pub fn with_apply_text(mut self, text: impl Into<String>) -> Self {
        self.apply_text = Some(text.into());
        self
    }

    pub fn with_location_selector(mut self, selector: impl Into<String>) -> Self {
        self.location_selector = Some(selector.into());
        self
    }
}

enum ItemSelector {
    Element(Selector),
    SeparatedBy(Selector),
}

enum DescriptionSelector {
    Block(Selector),
    AfterLabel {
        label: Selector,
        label_text: String,
        stop_text: Option<String>,
    },
}

struct Selectors {
    item: ItemSelector,
    link: Selector,
    title: Selector,
    company: Selector,
    location: Option<Selector>,
    description: DescriptionSelector,
    apply: Selector,
}

fn compile(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{selector}': {e}")))
}

impl Selectors {
    fn compile(config: &ListingConfig) -> Result<Self, AppError> {
        let item = match &config.items {
            ItemLayout::Element(s) => ItemSelector::Element(compile(s)?),
            ItemLayout::SeparatedBy(s) => ItemSelector::SeparatedBy(compile(s)?),
        };
        let description = match &config.description {
            DescriptionLayout::Block(s) => DescriptionSelector::Block(compile(s)?),
            DescriptionLayout::AfterLabel {
                label_selector,
                label_text,
                stop_text,
            } => DescriptionSelector::AfterLabel {
                label: compile(label_selector)?,
                label_text: label_text.clone(),
                stop_text: stop_text.clone(),
            },
        };
        Ok(Self {
            item,
            link: compile(&config.link_selector)?,
            title: compile(&config.title_selector)?,
            company: compile(&config.company_selector)?,
            location: config.location_selector.as_deref().map(compile).transpose()?,
            description,
            apply: compile(&config.apply_selector)?,
        })
    }
}

/// A job board crawled by reading its listing page and then each posting.
#[derive(Clone)]
pub struct ListingSource<F: Fetcher> {
    fetcher: F,
    config: Arc<ListingConfig>,
    listing_url: Url,
    selectors: Arc<Selectors>,
}

impl<F: Fetcher> ListingSource<F> {
    pub fn new(fetcher: F, config: ListingConfig) -> Result<Self, AppError> {
        let listing_url = Url::parse(&config.listing_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid listing URL: {e}")))?;
        let selectors = Selectors::compile(&config)?;
        Ok(Self {
            fetcher,
            config: Arc::new(config),
            listing_url,
            selectors: Arc::new(selectors),
        })
    }

    fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut links = Vec::new();

        for item in items(&document, &self.selectors.item) {
            if let Some(required) = &self.config.required_text {
                let text = item.iter().map(|e| element_text(*e)).collect::<Vec<_>>().join(" ");
                if !text.contains(required.as_str()) {
                    continue;
                }
            }
            let Some(href) = item
                .iter()
                .flat_map(|e| e.select(&self.selectors.link))
                .find_map(|a| a.value().attr("href"))
            else {
                continue;
            };
            match self.listing_url.join(href) {
                Ok(url) => {
                    let url = String::from(url);
                    if !links.contains(&url) {
                        links.push(url);
                    }
                }
                Err(e) => tracing::debug!(href, error = %e, "Skipping unparseable link"),
            }
        }
        links
    }

    fn extract_posting(&self, page_url: &str, html: &str) -> Result<Vacancy, AppError> {
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let apply_url = document
            .select(&s.apply)
            .filter(|a| match &self.config.apply_text {
                Some(text) => element_text(*a)
                    .to_lowercase()
                    .contains(&text.to_lowercase()),
                None => true,
            })
            .find_map(|a| a.value().attr("href"))
            .ok_or_else(|| AppError::Generic(format!("No apply link found on {page_url}")))?;
        let apply_url = Url::parse(page_url)
            .and_then(|base| base.join(apply_url))
            .map_err(|e| AppError::Generic(format!("Invalid apply link on {page_url}: {e}")))?;

        let first_text = |selector: &Selector| {
            document
                .select(selector)
                .next()
                .map(element_text)
                .unwrap_or_default()
        };

        let company_name = match &self.config.company_label {
            Some(label) => document
                .select(&s.company)
                .map(element_text)
                .find_map(|text| text.strip_prefix(label.as_str()).map(|c| c.trim().to_string()))
                .unwrap_or_default(),
            None => first_text(&s.company),
        };

        Ok(Vacancy {
            job_title: first_text(&s.title),
            company_name,
            company_location: s.location.as_ref().map(first_text).unwrap_or_default(),
            short_description: description(&document, &s.description),
            relevant_tags: Vec::new(),
            apply_url: apply_url.into(),
        })
    }
}

/// Each posting on the listing page as the elements it spans.
fn items<'a>(document: &'a Html, selector: &ItemSelector) -> Vec<Vec<ElementRef<'a>>> {
    match selector {
        ItemSelector::Element(item) => document.select(item).map(|e| vec![e]).collect(),
        ItemSelector::SeparatedBy(separator) => document
            .select(separator)
            .map(|hr| {
                hr.next_siblings()
                    .filter_map(ElementRef::wrap)
                    .take_while(|e| !separator.matches(e))
                    .collect()
            })
            .collect(),
    }
}

fn description(document: &Html, selector: &DescriptionSelector) -> String {
    match selector {
        DescriptionSelector::Block(block) => document
            .select(block)
            .next()
            .map(block_text)
            .unwrap_or_default(),
        DescriptionSelector::AfterLabel {
            label,
            label_text,
            stop_text,
        } => {
            let Some(section) = document
                .select(label)
                .find(|e| element_text(*e).contains(label_text.as_str()))
                .and_then(|e| e.parent())
                .and_then(ElementRef::wrap)
            else {
                return String::new();
            };
            section
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .map(element_text)
                .take_while(|text| match stop_text {
                    Some(stop) => !text.contains(stop.as_str()),
                    None => true,
                })
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of each child block on its own line.
fn block_text(element: ElementRef<'_>) -> String {
    let lines: Vec<String> = element
        .children()
        .filter_map(ElementRef::wrap)
        .map(element_text)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        element_text(element)
    } else {
        lines.join("\n")
    }
}

impl<F: Fetcher + 'static> CrawlSource for ListingSource<F> {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn list_links(&self) -> Result<Vec<String>, AppError> {
        let html = self.fetcher.fetch(self.listing_url.as_str()).await?;
        let links = self.extract_links(&html);
        tracing::info!(source = %self.config.name, count = links.len(), "Listing read");
        Ok(links)
    }

    async fn fetch_posting(&self, link: &str) -> Result<Vacancy, AppError> {
        let html = self.fetcher.fetch(link).await?;
        self.extract_posting(link, &html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vacancy_core::testutil::MockFetcher;

    const LISTING: &str = r#"
        <html><body>
          <section class="jobs"><ul>
            <li><a href="/remote-jobs/acme-rust-engineer">Rust Engineer</a>
                Anywhere in the World</li>
            <li><a href="/company/acme">Acme</a></li>
            <li><a href="/remote-jobs/globex-designer">Designer</a> USA Only</li>
            <li><a href="/remote-jobs/acme-rust-engineer">Rust Engineer (again)</a>
                Anywhere in the World</li>
          </ul></section>
        </body></html>"#;

    const POSTING: &str = r#"
        <html><body>
          <h2 class="lis-container__header__hero__company-info__title"> Senior  Rust Engineer </h2>
          <div class="lis-container__job__sidebar__companyDetails__info__title"><h3>Acme</h3></div>
          <div class="lis-container__job__content__description">
            <p>Build the ingestion pipeline.</p>
            <p></p>
            <ul><li>Rust</li><li>PostgreSQL</li></ul>
          </div>
          <a id="job-cta-alt" href="https://acme.example/careers/42">Apply</a>
        </body></html>"#;

    const GOLANG_LISTING: &str = r#"
        <html><body><div class="jobs">
          <hr class="clear-both">
          <div><a href="/golang-go-job-aa1-Backend-Engineer.html">Backend Engineer</a></div>
          <p>Initech - Worldwide, 100% Remote</p>
          <hr class="clear-both">
          <div><a href="/golang-go-job-bb2-Platform-Engineer.html">Platform Engineer</a></div>
          <p>Hooli - Berlin, Germany</p>
          <hr class="clear-both">
          <p>Umbrella - Worldwide, 100% Remote</p>
          <div><a href="https://jobs.umbrella.example/go">SRE</a><a href="/ignored">x</a></div>
        </div></body></html>"#;

    const GOLANG_POSTING: &str = r#"
        <html><body>
          <h1> Backend Engineer (Go) </h1>
          <h3>Posted 3 days ago</h3>
          <h3>Company: Initech</h3>
          <div><b>Job description</b></div>
          <p>Own the billing services.</p>
          <ul><li>Go</li><li>gRPC</li></ul>
          <div><h3>Other Golang jobs</h3></div>
          <p>Unrelated posting</p>
          <a class="cs-button" role="button" href="/share">Share</a>
          <a class="cs-button" role="button" href="https://initech.example/apply/9">Apply now!</a>
        </body></html>"#;

    fn source(config: ListingConfig) -> ListingSource<MockFetcher> {
        ListingSource::new(MockFetcher::new(""), config).unwrap()
    }

    #[test]
    fn links_are_absolute_and_deduplicated() {
        let links = source(ListingConfig::weworkremotely()).extract_links(LISTING);
        assert_eq!(
            links,
            vec![
                "https://weworkremotely.com/remote-jobs/acme-rust-engineer",
                "https://weworkremotely.com/remote-jobs/globex-designer",
            ]
        );
    }

    #[test]
    fn required_text_filters_items() {
        let config = ListingConfig::weworkremotely().with_required_text("Anywhere in the World");
        let links = source(config).extract_links(LISTING);
        assert_eq!(
            links,
            vec!["https://weworkremotely.com/remote-jobs/acme-rust-engineer"]
        );
    }

    #[test]
    fn posting_fields_are_read() {
        let vacancy = source(ListingConfig::weworkremotely())
            .extract_posting("https://weworkremotely.com/remote-jobs/acme-rust-engineer", POSTING)
            .unwrap();
        assert_eq!(vacancy.job_title, "Senior Rust Engineer");
        assert_eq!(vacancy.company_name, "Acme");
        assert_eq!(vacancy.apply_url, "https://acme.example/careers/42");
        assert_eq!(
            vacancy.short_description,
            "Build the ingestion pipeline.\nRust PostgreSQL"
        );
        assert!(vacancy.company_location.is_empty());
    }

    #[test]
    fn separated_items_keep_worldwide_postings_only() {
        let links = source(ListingConfig::golangprojects()).extract_links(GOLANG_LISTING);
        assert_eq!(
            links,
            vec![
                "https://www.golangprojects.com/golang-go-job-aa1-Backend-Engineer.html",
                "https://jobs.umbrella.example/go",
            ]
        );
    }

    #[test]
    fn labelled_company_and_description_are_read() {
        let vacancy = source(ListingConfig::golangprojects())
            .extract_posting(
                "https://www.golangprojects.com/golang-go-job-aa1-Backend-Engineer.html",
                GOLANG_POSTING,
            )
            .unwrap();
        assert_eq!(vacancy.job_title, "Backend Engineer (Go)");
        assert_eq!(vacancy.company_name, "Initech");
        assert_eq!(vacancy.apply_url, "https://initech.example/apply/9");
        assert_eq!(vacancy.short_description, "Own the billing services.\nGo gRPC");
    }

    #[test]
    fn missing_label_leaves_fields_empty() {
        let html = r#"<h1>Dev</h1><a class="cs-button" role="button" href="/a">Apply now</a>"#;
        let vacancy = source(ListingConfig::golangprojects())
            .extract_posting("https://www.golangprojects.com/x.html", html)
            .unwrap();
        assert!(vacancy.company_name.is_empty());
        assert!(vacancy.short_description.is_empty());
        assert_eq!(vacancy.apply_url, "https://www.golangprojects.com/a");
    }

    #[test]
    fn relative_apply_link_and_apply_text() {
        let mut config = ListingConfig::weworkremotely().with_apply_text("apply now");
        config.apply_selector = "a.button".into();
        let html = r#"<h2 class="lis-container__header__hero__company-info__title">Dev</h2>
            <a class="button" href="/share">Share</a>
            <a class="button" href="/apply/7">Apply Now!</a>"#;

        let vacancy = source(config)
            .extract_posting("https://board.example/jobs/7", html)
            .unwrap();
        assert_eq!(vacancy.apply_url, "https://board.example/apply/7");
    }

    #[test]
    fn missing_apply_link_is_an_error() {
        let err = source(ListingConfig::weworkremotely())
            .extract_posting("https://weworkremotely.com/remote-jobs/x", "<h1>Closed</h1>")
            .unwrap_err();
        assert!(err.to_string().contains("No apply link"));
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let mut config = ListingConfig::golangprojects();
        config.items = ItemLayout::SeparatedBy("hr[".into());
        assert!(matches!(
            ListingSource::new(MockFetcher::new(""), config),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn defaults_cover_both_boards() {
        let names: Vec<_> = ListingConfig::defaults().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["weworkremotely", "golangprojects"]);
    }

    #[tokio::test]
    async fn crawl_source_fetches_through_the_fetcher() {
        let fetcher = MockFetcher::with_responses(vec![Ok(LISTING.into()), Ok(POSTING.into())]);
        let source = ListingSource::new(fetcher, ListingConfig::weworkremotely()).unwrap();

        let links = source.list_links().await.unwrap();
        assert_eq!(links.len(), 2);
        let vacancy = source.fetch_posting(&links[0]).await.unwrap();
        assert_eq!(vacancy.company_name, "Acme");
        assert_eq!(source.name(), "weworkremotely");
    }
}
