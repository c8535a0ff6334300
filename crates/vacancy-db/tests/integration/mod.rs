mod approval_tests;
pub mod common;
mod queue_tests;
mod vacancy_tests;
