pub mod approval_repository;
pub mod config;
pub mod database;
pub mod queue;
pub mod vacancy_repository;

pub use approval_repository::ApprovalRepository;
pub use config::DatabaseConfig;
pub use database::Database;
pub use queue::PgMessageQueue;
pub use vacancy_repository::VacancyRepository;
