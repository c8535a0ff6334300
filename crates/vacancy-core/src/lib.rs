pub mod approval;
pub mod classifier;
pub mod crawl;
pub mod error;
pub mod location;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod review;
pub mod schema;
pub mod session;
pub mod submission;
pub mod token;
pub mod traits;
pub mod worker;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use approval::ApprovalGate;
pub use classifier::LlmRelevanceClassifier;
pub use crawl::{CrawlConfig, CrawlOrchestrator, CrawlReport};
pub use error::AppError;
pub use location::LocationResolver;
pub use models::{
    ApprovalRequest, ApprovalState, Decision, MessageId, Notification, SubmitRequest, Submission,
    Vacancy, VacancyRecord,
};
pub use parser::{ParseStrategy, ParserDispatcher, ScreenshotParser, TextParser};
pub use pipeline::{NotificationProcessor, VacancyProcessor};
pub use resolver::VacancyResolver;
pub use review::ApprovalService;
pub use submission::{SubmissionService, SubmitOutcome};
pub use token::RequestTokenizer;
pub use traits::{Cleaner, Extractor, Fetcher};
pub use worker::{QueueWorker, RetryPolicy, TracingWorkerReporter, WorkerConfig};
