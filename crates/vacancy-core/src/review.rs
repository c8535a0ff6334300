use crate::error::AppError;
use crate::models::{ApprovalState, Decision, MessageId, SubmitRequest};
use crate::token::RequestTokenizer;
use crate::traits::{ApprovalGateway, ApprovalStore, MessageQueue};

/// Applies a reviewer's approve or reject callback.
#[derive(Clone)]
pub struct ApprovalService<AS, G, Q>
where
    AS: ApprovalStore,
    G: ApprovalGateway,
    Q: MessageQueue,
{
    approvals: AS,
    gateway: G,
    queue: Q,
    tokenizer: RequestTokenizer,
}

impl<AS, G, Q> ApprovalService<AS, G, Q>
where
    AS: ApprovalStore,
    G: ApprovalGateway,
    Q: MessageQueue,
{
    pub fn new(approvals: AS, gateway: G, queue: Q, tokenizer: RequestTokenizer) -> Self {
        Self {
            approvals,
            gateway,
            queue,
            tokenizer,
        }
    }

    /// Decode the token, move the record out of pending, and enqueue on approval.
    ///
    /// Without a message id there is no record to guard: approve enqueues
    /// and reject does nothing.
    ///
    /// The record is marked approved before the request is published. If
    /// publishing fails the record stays approved and the error is returned,
    /// so a later click on the same link reports it as already processed and
    /// the request is not enqueued twice.
    pub async fn decide(
        &self,
        token: &str,
        message_id: Option<&MessageId>,
        decision: Decision,
    ) -> Result<(), AppError> {
        let request = self.tokenizer.decode(token)?;
        request.validate()?;

        let Some(message_id) = message_id else {
            if decision == Decision::Approve {
                self.enqueue(&request).await?;
            }
            return Ok(());
        };

        match self.approvals.get_state(message_id).await? {
            None => return Err(AppError::BadRequest("approval not found".into())),
            Some(ApprovalState::Pending) => {}
            Some(_) => return Err(already_processed()),
        }

        let state = decision.target_state();
        if !self.approvals.transition(message_id, state).await? {
            return Err(already_processed());
        }
        tracing::info!(%message_id, %state, "Approval decided");

        if decision == Decision::Approve {
            self.enqueue(&request).await?;
        }

        if !message_id.is_batch() {
            if let Err(e) = self
                .gateway
                .acknowledge_decision(message_id, state, &request)
                .await
            {
                tracing::warn!(%message_id, error = %e, "Failed to acknowledge decision");
            }
        }

        Ok(())
    }

    async fn enqueue(&self, request: &SubmitRequest) -> Result<(), AppError> {
        let body = serde_json::to_vec(request)?;
        self.queue.publish(&body).await
    }
}

fn already_processed() -> AppError {
    AppError::BadRequest("approval already processed".into())
}
