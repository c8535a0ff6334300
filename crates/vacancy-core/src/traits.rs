use std::collections::HashSet;
use std::future::Future;

use crate::error::AppError;
use crate::models::{
    ApprovalRequest, ApprovalState, MessageId, Notification, SubmitRequest, Vacancy, VacancyRecord,
};

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Converts raw HTML into clean Markdown text.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}

/// Extracts structured JSON data from text content using an LLM.
pub trait Extractor: Send + Sync + Clone {
    /// Sends the content and JSON schema to the LLM and returns extracted JSON.
    fn extract(
        &self,
        content: &str,
        schema: &serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, AppError>> + Send;
}

/// Extracts structured JSON data from an image using a vision-capable LLM.
pub trait VisionExtractor: Send + Sync + Clone {
    fn extract_from_image(
        &self,
        png: &[u8],
        instruction: &str,
        schema: &serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, AppError>> + Send;
}

/// Renders a page and captures it as a PNG.
pub trait Screenshotter: Send + Sync + Clone {
    fn capture(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, AppError>> + Send;
}

/// Turns a posting URL into a vacancy.
pub trait Parser: Send + Sync {
    fn parse(&self, url: &str) -> impl Future<Output = Result<Vacancy, AppError>> + Send;
}

/// Produces a validated vacancy for a posting URL.
pub trait Resolver: Send + Sync {
    fn resolve(&self, url: &str) -> impl Future<Output = Result<Vacancy, AppError>> + Send;
}

/// Finds a company's headquarters. The empty string means unknown.
pub trait CompanyLocator: Send + Sync {
    fn locate(&self, company_name: &str)
    -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Persists vacancies and answers lookups over what is already stored.
pub trait VacancyStore: Send + Sync + Clone {
    fn save(&self, vacancy: &Vacancy)
    -> impl Future<Output = Result<VacancyRecord, AppError>> + Send;

    /// Location recorded for the most recent vacancy of this company, if any.
    fn lookup_company_location(
        &self,
        company_name: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    fn all_apply_urls(&self) -> impl Future<Output = Result<HashSet<String>, AppError>> + Send;
}

/// Persists approval records.
pub trait ApprovalStore: Send + Sync + Clone {
    fn save(
        &self,
        message_id: &MessageId,
        request: &SubmitRequest,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Inserts every record or none of them.
    fn save_batch(
        &self,
        items: &[(MessageId, SubmitRequest)],
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn get_state(
        &self,
        message_id: &MessageId,
    ) -> impl Future<Output = Result<Option<ApprovalState>, AppError>> + Send;

    /// Moves a pending record to `state`. Returns false if the record was not pending.
    fn transition(
        &self,
        message_id: &MessageId,
        state: ApprovalState,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// True if a pending record already exists for this apply URL.
    fn is_already_requested(
        &self,
        apply_url: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;
}

/// A claimed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: i64,
    pub body: Vec<u8>,
}

/// How a delivery leaves the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryAction {
    /// Processed successfully.
    Acknowledge,
    /// Dropped without further processing.
    Discard,
}

/// A named message queue with explicit settlement.
pub trait MessageQueue: Send + Sync + Clone {
    fn publish(&self, body: &[u8]) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Claim the next available message for `consumer_id`.
    fn receive(
        &self,
        consumer_id: &str,
    ) -> impl Future<Output = Result<Option<Delivery>, AppError>> + Send;

    fn settle(
        &self,
        delivery: &Delivery,
        action: DeliveryAction,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Return every message still claimed by `consumer_id` to the queue.
    fn release(&self, consumer_id: &str) -> impl Future<Output = Result<u64, AppError>> + Send;
}

/// Delivers a stored vacancy to a recipient.
pub trait Notifier: Send + Sync + Clone {
    fn notify(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Sends review requests and decision acknowledgments to human reviewers.
pub trait ApprovalGateway: Send + Sync + Clone {
    fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// One consolidated message listing every item with its own links.
    fn request_batch_approval(
        &self,
        requests: &[ApprovalRequest],
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn acknowledge_decision(
        &self,
        message_id: &MessageId,
        state: ApprovalState,
        request: &SubmitRequest,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Decides whether a crawled posting is in scope.
pub trait RelevanceClassifier: Send + Sync + Clone {
    fn is_applicable(
        &self,
        vacancy: &Vacancy,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;
}

/// A classifier that accepts everything, for runs without relevance filtering.
#[derive(Debug, Clone)]
pub struct NullClassifier;

impl RelevanceClassifier for NullClassifier {
    async fn is_applicable(&self, _vacancy: &Vacancy) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// A job board the crawler harvests.
pub trait CrawlSource: Send + Sync + Clone + 'static {
    fn name(&self) -> &str;

    /// Links to the detail pages currently listed.
    fn list_links(&self) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;

    fn fetch_posting(&self, link: &str)
    -> impl Future<Output = Result<Vacancy, AppError>> + Send;
}

/// Accepts intake requests, in process or over the network.
pub trait Submitter: Send + Sync + Clone {
    fn submit(&self, request: SubmitRequest)
    -> impl Future<Output = Result<(), AppError>> + Send;
}
