//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls. Clones share state, so a test can
//! hand one clone to the code under test and inspect the other.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    ApprovalRequest, ApprovalState, MessageId, Notification, SubmitRequest, Vacancy, VacancyRecord,
};
use crate::traits::{
    ApprovalGateway, ApprovalStore, Cleaner, CompanyLocator, CrawlSource, Delivery, DeliveryAction,
    Extractor, Fetcher, MessageQueue, Notifier, Parser, RelevanceClassifier, Resolver,
    Screenshotter, Submitter, VacancyStore, VisionExtractor,
};
use crate::worker::{MessageProcessor, WorkerEvent, WorkerReporter};

/// Pop the next queued response, or fall back to a repeating one.
fn next_response<T: Clone>(
    queue: &Mutex<VecDeque<Result<T, AppError>>>,
    fallback: &Option<T>,
    name: &str,
) -> Result<T, AppError> {
    if let Some(next) = queue.lock().unwrap().pop_front() {
        return next;
    }
    fallback
        .clone()
        .ok_or_else(|| AppError::Generic(format!("{name}: no response configured")))
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn test_vacancy(apply_url: &str) -> Vacancy {
    Vacancy {
        job_title: "Backend Engineer".to_string(),
        company_name: "Acme".to_string(),
        company_location: "Berlin, Germany".to_string(),
        short_description: "Build Rust services".to_string(),
        relevant_tags: vec!["rust".to_string(), "backend".to_string()],
        apply_url: apply_url.to_string(),
    }
}

pub fn test_record(apply_url: &str) -> VacancyRecord {
    VacancyRecord {
        id: Uuid::new_v4(),
        vacancy: test_vacancy(apply_url),
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Ok(html.to_string())])),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(error)])),
        }
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, AppError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCleaner {
    /// Creates a cleaner that returns the input unchanged.
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor. `new` answers every call with the same JSON;
/// `with_responses` plays back a script and then fails.
#[derive(Clone)]
pub struct MockExtractor {
    responses: Arc<Mutex<VecDeque<Result<serde_json::Value, AppError>>>>,
    fallback: Option<serde_json::Value>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Some(data),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<serde_json::Value, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            fallback: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl Extractor for MockExtractor {
    async fn extract(
        &self,
        content: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        self.prompts.lock().unwrap().push(content.to_string());
        next_response(&self.responses, &self.fallback, "MockExtractor")
    }
}

// ---------------------------------------------------------------------------
// MockVisionExtractor
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockVisionExtractor {
    responses: Arc<Mutex<VecDeque<Result<serde_json::Value, AppError>>>>,
    fallback: Option<serde_json::Value>,
    sizes: Arc<Mutex<Vec<usize>>>,
}

impl MockVisionExtractor {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Some(data),
            sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from([Err(error)]))),
            fallback: None,
            sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.sizes.lock().unwrap().len()
    }

    /// Byte length of every image received.
    pub fn image_sizes(&self) -> Vec<usize> {
        self.sizes.lock().unwrap().clone()
    }
}

impl VisionExtractor for MockVisionExtractor {
    async fn extract_from_image(
        &self,
        png: &[u8],
        _instruction: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        self.sizes.lock().unwrap().push(png.len());
        next_response(&self.responses, &self.fallback, "MockVisionExtractor")
    }
}

// ---------------------------------------------------------------------------
// MockScreenshotter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockScreenshotter {
    png: Vec<u8>,
    error: Arc<Mutex<Option<AppError>>>,
    captured: Arc<Mutex<Vec<String>>>,
}

impl MockScreenshotter {
    pub fn new(png: Vec<u8>) -> Self {
        Self {
            png,
            error: Arc::new(Mutex::new(None)),
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            png: Vec::new(),
            error: Arc::new(Mutex::new(Some(error))),
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn captured(&self) -> Vec<String> {
        self.captured.lock().unwrap().clone()
    }
}

impl Screenshotter for MockScreenshotter {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.captured.lock().unwrap().push(url.to_string());
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.png.clone())
    }
}

// ---------------------------------------------------------------------------
// MockParser / MockResolver / MockLocator
// ---------------------------------------------------------------------------

/// Parser that returns a fixed vacancy, or fails once with a given error.
#[derive(Clone)]
pub struct MockParser {
    vacancy: Option<Vacancy>,
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockParser {
    pub fn new(vacancy: Vacancy) -> Self {
        Self {
            vacancy: Some(vacancy),
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            vacancy: None,
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Parser for MockParser {
    async fn parse(&self, _url: &str) -> Result<Vacancy, AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.vacancy
            .clone()
            .ok_or_else(|| AppError::Generic("MockParser: no vacancy configured".into()))
    }
}

/// Resolver that records the URLs it was asked to resolve.
#[derive(Clone)]
pub struct MockResolver {
    vacancy: Option<Vacancy>,
    error: Arc<Mutex<Option<AppError>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    pub fn new(vacancy: Vacancy) -> Self {
        Self {
            vacancy: Some(vacancy),
            error: Arc::new(Mutex::new(None)),
            urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            vacancy: None,
            error: Arc::new(Mutex::new(Some(error))),
            urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn resolved_urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Resolver for MockResolver {
    async fn resolve(&self, url: &str) -> Result<Vacancy, AppError> {
        self.urls.lock().unwrap().push(url.to_string());
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.vacancy
            .clone()
            .ok_or_else(|| AppError::Generic("MockResolver: no vacancy configured".into()))
    }
}

#[derive(Clone)]
pub struct MockLocator {
    answer: String,
    error: Arc<Mutex<Option<AppError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockLocator {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            answer: String::new(),
            error: Arc::new(Mutex::new(Some(error))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompanyLocator for MockLocator {
    async fn locate(&self, _company_name: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.answer.clone())
    }
}

// ---------------------------------------------------------------------------
// MockVacancyStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MockVacancyStore {
    pub saved: Arc<Mutex<Vec<Vacancy>>>,
    location: Option<String>,
    urls: HashSet<String>,
    lookup_error: Arc<Mutex<Option<AppError>>>,
    urls_error: Arc<Mutex<Option<AppError>>>,
    save_error: Arc<Mutex<Option<AppError>>>,
}

impl MockVacancyStore {
    pub fn empty() -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            location: None,
            urls: HashSet::new(),
            lookup_error: Arc::new(Mutex::new(None)),
            urls_error: Arc::new(Mutex::new(None)),
            save_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Store that knows a location for every company.
    pub fn with_location(location: &str) -> Self {
        Self {
            location: Some(location.to_string()),
            ..Self::empty()
        }
    }

    pub fn with_lookup_error(error: AppError) -> Self {
        Self {
            lookup_error: Arc::new(Mutex::new(Some(error))),
            ..Self::empty()
        }
    }

    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            ..Self::empty()
        }
    }

    pub fn with_urls_error(error: AppError) -> Self {
        Self {
            urls_error: Arc::new(Mutex::new(Some(error))),
            ..Self::empty()
        }
    }

    pub fn with_save_error(error: AppError) -> Self {
        Self {
            save_error: Arc::new(Mutex::new(Some(error))),
            ..Self::empty()
        }
    }

    pub fn saved_urls(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.apply_url.clone())
            .collect()
    }
}

impl VacancyStore for MockVacancyStore {
    async fn save(&self, vacancy: &Vacancy) -> Result<VacancyRecord, AppError> {
        if let Some(e) = self.save_error.lock().unwrap().take() {
            return Err(e);
        }
        self.saved.lock().unwrap().push(vacancy.clone());
        Ok(VacancyRecord {
            id: Uuid::new_v4(),
            vacancy: vacancy.clone(),
            created_at: Utc::now(),
        })
    }

    async fn lookup_company_location(
        &self,
        _company_name: &str,
    ) -> Result<Option<String>, AppError> {
        if let Some(e) = self.lookup_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.location.clone())
    }

    async fn all_apply_urls(&self) -> Result<HashSet<String>, AppError> {
        if let Some(e) = self.urls_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut urls = self.urls.clone();
        urls.extend(self.saved_urls());
        Ok(urls)
    }
}

// ---------------------------------------------------------------------------
// MockApprovalStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ApprovalRecords {
    records: HashMap<MessageId, (ApprovalState, SubmitRequest)>,
    requested: HashSet<String>,
    failing_lookups: HashSet<String>,
    fail_batch_at: Option<usize>,
    batch_calls: usize,
    lose_transition: bool,
}

/// In-memory approval store with the same conditional transition rule as
/// the database: only pending records move.
#[derive(Clone, Default)]
pub struct MockApprovalStore {
    inner: Arc<Mutex<ApprovalRecords>>,
}

impl MockApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `save_batch` fails on the nth item (1-based) and stores none of them.
    pub fn failing_batch_at(n: usize) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().fail_batch_at = Some(n);
        store
    }

    /// Treat `apply_url` as already awaiting review.
    pub fn mark_requested(&self, apply_url: &str) {
        self.inner
            .lock()
            .unwrap()
            .requested
            .insert(apply_url.to_string());
    }

    /// Make `is_already_requested` fail for `apply_url`.
    pub fn fail_lookup_for(&self, apply_url: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_lookups
            .insert(apply_url.to_string());
    }

    /// The next transition reports that another caller got there first.
    pub fn lose_next_transition(&self) {
        self.inner.lock().unwrap().lose_transition = true;
    }

    pub fn state(&self, message_id: &MessageId) -> Option<ApprovalState> {
        self.inner
            .lock()
            .unwrap()
            .records
            .get(message_id)
            .map(|(state, _)| *state)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn save_batch_calls(&self) -> usize {
        self.inner.lock().unwrap().batch_calls
    }
}

impl ApprovalStore for MockApprovalStore {
    async fn save(&self, message_id: &MessageId, request: &SubmitRequest) -> Result<(), AppError> {
        self.inner
            .lock()
            .unwrap()
            .records
            .insert(message_id.clone(), (ApprovalState::Pending, request.clone()));
        Ok(())
    }

    async fn save_batch(&self, items: &[(MessageId, SubmitRequest)]) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.batch_calls += 1;

        let mut staged = Vec::with_capacity(items.len());
        for (position, (id, request)) in items.iter().enumerate() {
            if inner.fail_batch_at == Some(position + 1) {
                return Err(AppError::DatabaseError(format!(
                    "insert {} failed",
                    position + 1
                )));
            }
            staged.push((id.clone(), (ApprovalState::Pending, request.clone())));
        }
        inner.records.extend(staged);
        Ok(())
    }

    async fn get_state(&self, message_id: &MessageId) -> Result<Option<ApprovalState>, AppError> {
        Ok(self.state(message_id))
    }

    async fn transition(
        &self,
        message_id: &MessageId,
        state: ApprovalState,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if std::mem::take(&mut inner.lose_transition) {
            return Ok(false);
        }
        match inner.records.get_mut(message_id) {
            Some(record) if record.0 == ApprovalState::Pending => {
                record.0 = state;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn is_already_requested(&self, apply_url: &str) -> Result<bool, AppError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing_lookups.contains(apply_url) {
            return Err(AppError::DatabaseError("lookup failed".into()));
        }
        let pending = inner.records.values().any(|(state, request)| {
            *state == ApprovalState::Pending && request.apply_url() == Some(apply_url)
        });
        Ok(pending || inner.requested.contains(apply_url))
    }
}

// ---------------------------------------------------------------------------
// MockGateway
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockGateway {
    error: Arc<Mutex<Option<AppError>>>,
    singles: Arc<Mutex<Vec<ApprovalRequest>>>,
    batches: Arc<Mutex<Vec<Vec<ApprovalRequest>>>>,
    acks: Arc<Mutex<Vec<(MessageId, ApprovalState)>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next call of any kind fails with `error`.
    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
            ..Self::default()
        }
    }

    pub fn single_requests(&self) -> Vec<ApprovalRequest> {
        self.singles.lock().unwrap().clone()
    }

    pub fn batch_requests(&self) -> Vec<Vec<ApprovalRequest>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn acknowledgments(&self) -> Vec<(MessageId, ApprovalState)> {
        self.acks.lock().unwrap().clone()
    }

    fn fail(&self) -> Result<(), AppError> {
        match self.error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl ApprovalGateway for MockGateway {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<(), AppError> {
        self.fail()?;
        self.singles.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn request_batch_approval(&self, requests: &[ApprovalRequest]) -> Result<(), AppError> {
        self.fail()?;
        self.batches.lock().unwrap().push(requests.to_vec());
        Ok(())
    }

    async fn acknowledge_decision(
        &self,
        message_id: &MessageId,
        state: ApprovalState,
        _request: &SubmitRequest,
    ) -> Result<(), AppError> {
        self.fail()?;
        self.acks.lock().unwrap().push((message_id.clone(), state));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockQueue
// ---------------------------------------------------------------------------

#[derive(Default)]
struct QueueState {
    next_id: i64,
    pending: VecDeque<Delivery>,
    claimed: Vec<(String, Delivery)>,
    published: Vec<Vec<u8>>,
    settled: Vec<DeliveryAction>,
    released: Vec<String>,
    publish_error: Option<AppError>,
}

impl QueueState {
    fn enqueue(&mut self, body: Vec<u8>) {
        self.next_id += 1;
        self.pending.push_back(Delivery {
            id: self.next_id,
            body,
        });
    }
}

/// In-memory FIFO queue. Published messages become receivable.
#[derive(Clone, Default)]
pub struct MockQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a message without recording it as published.
    pub fn push_json<T: Serialize>(&self, message: &T) {
        let body = serde_json::to_vec(message).unwrap();
        self.push_raw(body);
    }

    pub fn push_raw(&self, body: Vec<u8>) {
        self.state.lock().unwrap().enqueue(body);
    }

    pub fn fail_next_publish(&self, error: AppError) {
        self.state.lock().unwrap().publish_error = Some(error);
    }

    pub fn published(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn settled_actions(&self) -> Vec<DeliveryAction> {
        self.state.lock().unwrap().settled.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn released_consumers(&self) -> Vec<String> {
        self.state.lock().unwrap().released.clone()
    }
}

impl MessageQueue for MockQueue {
    async fn publish(&self, body: &[u8]) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.publish_error.take() {
            return Err(e);
        }
        state.published.push(body.to_vec());
        state.enqueue(body.to_vec());
        Ok(())
    }

    async fn receive(&self, consumer_id: &str) -> Result<Option<Delivery>, AppError> {
        let mut state = self.state.lock().unwrap();
        let Some(delivery) = state.pending.pop_front() else {
            return Ok(None);
        };
        state
            .claimed
            .push((consumer_id.to_string(), delivery.clone()));
        Ok(Some(delivery))
    }

    async fn settle(&self, delivery: &Delivery, action: DeliveryAction) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.claimed.retain(|(_, d)| d.id != delivery.id);
        state.settled.push(action);
        Ok(())
    }

    async fn release(&self, consumer_id: &str) -> Result<u64, AppError> {
        let mut state = self.state.lock().unwrap();
        state.released.push(consumer_id.to_string());
        let (mine, others): (Vec<_>, Vec<_>) = std::mem::take(&mut state.claimed)
            .into_iter()
            .partition(|(owner, _)| owner == consumer_id);
        state.claimed = others;
        let count = mine.len() as u64;
        for (_, delivery) in mine.into_iter().rev() {
            state.pending.push_front(delivery);
        }
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// MockProcessor
// ---------------------------------------------------------------------------

/// Processor that fails the first `k` calls and succeeds afterwards.
#[derive(Clone)]
pub struct MockProcessor {
    failures_left: Arc<Mutex<u32>>,
    calls: Arc<Mutex<u32>>,
}

impl MockProcessor {
    pub fn failing_times(k: u32) -> Self {
        Self {
            failures_left: Arc::new(Mutex::new(k)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl<M: Sync> MessageProcessor<M> for MockProcessor {
    async fn process(&self, _message: &M) -> Result<(), AppError> {
        *self.calls.lock().unwrap() += 1;
        let mut left = self.failures_left.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            return Err(AppError::Generic("processing failed".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock worker reporter that records event names.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl WorkerReporter for MockReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        let label = match &event {
            WorkerEvent::Started { .. } => "Started",
            WorkerEvent::Polling => "Polling",
            WorkerEvent::DeliveryReceived { .. } => "DeliveryReceived",
            WorkerEvent::Acknowledged { .. } => "Acknowledged",
            WorkerEvent::Retrying { .. } => "Retrying",
            WorkerEvent::DiscardedPoison { .. } => "DiscardedPoison",
            WorkerEvent::DiscardedExhausted { .. } => "DiscardedExhausted",
            WorkerEvent::ShuttingDown { .. } => "ShuttingDown",
            WorkerEvent::Stopped { .. } => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// MockNotifier
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockNotifier {
    error: Arc<Mutex<Option<AppError>>>,
    delivered: Arc<Mutex<Vec<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
            ..Self::default()
        }
    }

    /// Recipient ids in delivery order.
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.delivered
            .lock()
            .unwrap()
            .push(notification.recipient_id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

/// Accepts everything except the URLs it is told to reject or fail on.
#[derive(Clone, Default)]
pub struct MockClassifier {
    rejected: HashSet<String>,
    failing: HashSet<String>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, apply_url: &str) -> Self {
        self.rejected.insert(apply_url.to_string());
        self
    }

    pub fn failing_on(mut self, apply_url: &str) -> Self {
        self.failing.insert(apply_url.to_string());
        self
    }
}

impl RelevanceClassifier for MockClassifier {
    async fn is_applicable(&self, vacancy: &Vacancy) -> Result<bool, AppError> {
        if self.failing.contains(&vacancy.apply_url) {
            return Err(AppError::LlmError {
                message: "classifier unavailable".into(),
                status_code: 503,
            });
        }
        Ok(!self.rejected.contains(&vacancy.apply_url))
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Crawl source whose listing links are the apply URLs of its postings.
#[derive(Clone)]
pub struct MockSource {
    name: String,
    postings: Vec<Vacancy>,
    failing: HashSet<String>,
    listing_error: Arc<Mutex<Option<AppError>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new(name: &str, postings: Vec<Vacancy>) -> Self {
        Self {
            name: name.to_string(),
            postings,
            failing: HashSet::new(),
            listing_error: Arc::new(Mutex::new(None)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_listing_error(name: &str, error: AppError) -> Self {
        let source = Self::new(name, Vec::new());
        *source.listing_error.lock().unwrap() = Some(error);
        source
    }

    pub fn failing_link(mut self, link: &str) -> Self {
        self.failing.insert(link.to_string());
        self
    }

    /// Highest number of detail fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CrawlSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_links(&self) -> Result<Vec<String>, AppError> {
        if let Some(e) = self.listing_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.postings.iter().map(|p| p.apply_url.clone()).collect())
    }

    async fn fetch_posting(&self, link: &str) -> Result<Vacancy, AppError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(link) {
            return Err(AppError::HttpError(format!("HTTP 404 for {link}")));
        }
        self.postings
            .iter()
            .find(|p| p.apply_url == link)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("unknown link {link}")))
    }
}

// ---------------------------------------------------------------------------
// MockSubmitter
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockSubmitter {
    error: Arc<Mutex<Option<AppError>>>,
    submitted: Arc<Mutex<Vec<SubmitRequest>>>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

impl Submitter for MockSubmitter {
    async fn submit(&self, request: SubmitRequest) -> Result<(), AppError> {
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        self.submitted.lock().unwrap().push(request);
        Ok(())
    }
}
