use std::sync::Arc;

use futures::future::BoxFuture;
use vacancy_core::traits::{ApprovalGateway, ApprovalStore, MessageQueue, Resolver};
use vacancy_core::{
    AppError, ApprovalService, Decision, MessageId, SubmissionService, SubmitOutcome,
    SubmitRequest,
};
use vacancy_db::Database;

/// Object-safe view of the intake service, so handlers do not carry its
/// generic parameters.
pub trait Intake: Send + Sync {
    fn submit(&self, request: SubmitRequest) -> BoxFuture<'_, Result<SubmitOutcome, AppError>>;
}

/// Object-safe view of the approval callback service.
pub trait Review: Send + Sync {
    fn decide<'a>(
        &'a self,
        token: &'a str,
        message_id: Option<&'a MessageId>,
        decision: Decision,
    ) -> BoxFuture<'a, Result<(), AppError>>;
}

impl<R, AS, G, Q> Intake for SubmissionService<R, AS, G, Q>
where
    R: Resolver + 'static,
    AS: ApprovalStore + 'static,
    G: ApprovalGateway + 'static,
    Q: MessageQueue + 'static,
{
    fn submit(&self, request: SubmitRequest) -> BoxFuture<'_, Result<SubmitOutcome, AppError>> {
        Box::pin(SubmissionService::submit(self, request))
    }
}

impl<AS, G, Q> Review for ApprovalService<AS, G, Q>
where
    AS: ApprovalStore + 'static,
    G: ApprovalGateway + 'static,
    Q: MessageQueue + 'static,
{
    fn decide<'a>(
        &'a self,
        token: &'a str,
        message_id: Option<&'a MessageId>,
        decision: Decision,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(ApprovalService::decide(self, token, message_id, decision))
    }
}

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub intake: Arc<dyn Intake>,
    pub review: Arc<dyn Review>,
    /// Key expected in `X-Api-Key` on `POST /vacancies`.
    pub api_key: String,
    /// Checked by `/health` when present.
    pub db: Option<Database>,
}
