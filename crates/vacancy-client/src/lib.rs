#[cfg(feature = "browser")]
pub mod browser;
pub mod cleaner;
pub mod fetcher;
pub mod greenhouse;
pub mod listing;
pub mod llm;
#[cfg(feature = "browser")]
pub mod stack;
pub mod submitter;
pub mod webhook;

#[cfg(feature = "browser")]
pub use browser::ChromiumBrowser;
pub use cleaner::HtmdCleaner;
pub use fetcher::ReqwestFetcher;
pub use greenhouse::GreenhouseParser;
pub use listing::{ListingConfig, ListingSource};
pub use llm::OpenAiClient;
#[cfg(feature = "browser")]
pub use stack::{StandardParser, StandardResolver, standard_resolver};
pub use submitter::HttpSubmitter;
pub use webhook::{WebhookApprovalGateway, WebhookNotifier};
