//! Harvests postings from job boards and proposes them for review.
//!
//! The crawler never stores anything itself. Surviving candidates are
//! forwarded as one bulk submission, which always goes through approval.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};

use crate::error::AppError;
use crate::models::{SubmitRequest, Vacancy, parse_apply_url};
use crate::parser::host_matches;
use crate::traits::{
    ApprovalStore, CrawlSource, RelevanceClassifier, Submitter, VacancyStore,
};

/// Submitter identity used for crawled bulk requests.
pub const CRAWLER_EMAIL: &str = "crawler";

const NOISE_PATTERN: &str = r"[\p{Extended_Pictographic}\x{FE0F}\x{200D}]";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Detail pages fetched at the same time, per source.
    pub concurrency: usize,
    /// Hosts whose postings are never forwarded. Subdomains are included.
    pub blacklist: Vec<String>,
    pub submission_email: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            blacklist: Vec::new(),
            submission_email: CRAWLER_EMAIL.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_blacklist<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blacklist = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self
    }

    pub fn with_submission_email(mut self, email: impl Into<String>) -> Self {
        self.submission_email = email.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    /// Postings fetched successfully.
    pub found: usize,
    /// Detail pages that could not be fetched.
    pub failed: usize,
    /// Set when the listing itself could not be read.
    pub error: Option<String>,
}

/// Outcome of one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub sources: Vec<SourceReport>,
    pub ineligible: usize,
    pub duplicates: usize,
    pub already_requested: usize,
    pub not_applicable: usize,
    pub forwarded: usize,
}

/// Runs every source, filters the harvest, and forwards what is new.
pub struct CrawlOrchestrator<S, VS, AS, C, SUB>
where
    S: CrawlSource,
    VS: VacancyStore,
    AS: ApprovalStore,
    C: RelevanceClassifier,
    SUB: Submitter,
{
    sources: Vec<S>,
    vacancies: VS,
    approvals: AS,
    classifier: Option<C>,
    submitter: SUB,
    config: CrawlConfig,
    noise: Regex,
}

impl<S, VS, AS, C, SUB> CrawlOrchestrator<S, VS, AS, C, SUB>
where
    S: CrawlSource,
    VS: VacancyStore,
    AS: ApprovalStore,
    C: RelevanceClassifier,
    SUB: Submitter,
{
    pub fn new(
        sources: Vec<S>,
        vacancies: VS,
        approvals: AS,
        classifier: Option<C>,
        submitter: SUB,
        config: CrawlConfig,
    ) -> Result<Self, AppError> {
        let noise = Regex::new(NOISE_PATTERN)
            .map_err(|e| AppError::ConfigError(format!("invalid noise pattern: {e}")))?;
        Ok(Self {
            sources,
            vacancies,
            approvals,
            classifier,
            submitter,
            config,
            noise,
        })
    }

    pub async fn run(&self) -> Result<CrawlReport, AppError> {
        let mut report = CrawlReport::default();

        let stored = self.vacancies.all_apply_urls().await?;
        tracing::info!(stored = stored.len(), "Loaded stored apply URLs");

        let mut harvested = Vec::new();
        for source in &self.sources {
            let (postings, source_report) = self.harvest(source).await;
            harvested.extend(postings);
            report.sources.push(source_report);
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for mut vacancy in harvested {
            if !self.is_eligible(&vacancy) {
                report.ineligible += 1;
                continue;
            }
            vacancy.short_description = self.scrub(&vacancy.short_description);

            if stored.contains(&vacancy.apply_url) || !seen.insert(vacancy.apply_url.clone()) {
                report.duplicates += 1;
                continue;
            }

            match self.approvals.is_already_requested(&vacancy.apply_url).await {
                Ok(false) => {}
                Ok(true) => {
                    report.already_requested += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        url = %vacancy.apply_url,
                        error = %e,
                        "Approval lookup failed, skipping"
                    );
                    continue;
                }
            }

            if let Some(classifier) = &self.classifier {
                match classifier.is_applicable(&vacancy).await {
                    Ok(true) => {}
                    Ok(false) => {
                        report.not_applicable += 1;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            url = %vacancy.apply_url,
                            error = %e,
                            "Classification failed, skipping"
                        );
                        continue;
                    }
                }
            }

            candidates.push(vacancy);
        }

        if candidates.is_empty() {
            tracing::info!("No new postings to forward");
            return Ok(report);
        }

        report.forwarded = candidates.len();
        self.submitter
            .submit(SubmitRequest::bulk(candidates, &self.config.submission_email))
            .await?;
        tracing::info!(forwarded = report.forwarded, "Forwarded crawled postings");

        Ok(report)
    }

    /// Fetch every posting a source lists, in listing order.
    async fn harvest(&self, source: &S) -> (Vec<Vacancy>, SourceReport) {
        let mut report = SourceReport {
            name: source.name().to_string(),
            ..Default::default()
        };

        let links = match source.list_links().await {
            Ok(links) => links,
            Err(e) => {
                tracing::error!(source = %report.name, error = %e, "Failed to list postings");
                report.error = Some(e.to_string());
                return (Vec::new(), report);
            }
        };
        if links.is_empty() {
            return (Vec::new(), report);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let (tx, mut rx) = mpsc::channel(links.len());

        for (index, link) in links.into_iter().enumerate() {
            let source = source.clone();
            let semaphore = semaphore.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let result = source.fetch_posting(&link).await;
                let _ = tx.send((index, link, result)).await;
            });
        }
        drop(tx);

        let mut fetched = Vec::new();
        while let Some((index, link, result)) = rx.recv().await {
            match result {
                Ok(vacancy) => fetched.push((index, vacancy)),
                Err(e) => {
                    tracing::warn!(
                        source = %report.name,
                        %link,
                        error = %e,
                        "Failed to fetch posting"
                    );
                    report.failed += 1;
                }
            }
        }
        fetched.sort_by_key(|(index, _)| *index);
        report.found = fetched.len();

        tracing::info!(
            source = %report.name,
            found = report.found,
            failed = report.failed,
            "Source crawled"
        );
        (fetched.into_iter().map(|(_, v)| v).collect(), report)
    }

    fn is_eligible(&self, vacancy: &Vacancy) -> bool {
        let Ok(url) = parse_apply_url(&vacancy.apply_url) else {
            return false;
        };
        if url.scheme() != "https" {
            return false;
        }
        let host = url.host_str().unwrap_or_default().to_lowercase();
        if self.config.blacklist.iter().any(|b| host_matches(&host, b)) {
            return false;
        }
        vacancy.validate().is_ok()
    }

    fn scrub(&self, text: &str) -> String {
        let stripped = self.noise.replace_all(text, "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
