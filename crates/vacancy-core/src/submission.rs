use crate::approval::ApprovalGate;
use crate::error::AppError;
use crate::models::{ApprovalRequest, MessageId, SubmitRequest, Submission, Vacancy};
use crate::token::RequestTokenizer;
use crate::traits::{ApprovalGateway, ApprovalStore, MessageQueue, Resolver, Submitter};

/// Where an accepted submission went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Held for a human decision under these ids.
    PendingApproval { message_ids: Vec<MessageId> },
    /// Published to the vacancy queue.
    Enqueued,
}

/// Intake entry point: validates a submission, resolves url submissions
/// inline, then either holds it for review or enqueues it.
#[derive(Clone)]
pub struct SubmissionService<R, AS, G, Q>
where
    R: Resolver,
    AS: ApprovalStore,
    G: ApprovalGateway,
    Q: MessageQueue,
{
    resolver: R,
    approvals: AS,
    gateway: G,
    queue: Q,
    tokenizer: RequestTokenizer,
    gate: ApprovalGate,
}

impl<R, AS, G, Q> SubmissionService<R, AS, G, Q>
where
    R: Resolver,
    AS: ApprovalStore,
    G: ApprovalGateway,
    Q: MessageQueue,
{
    pub fn new(
        resolver: R,
        approvals: AS,
        gateway: G,
        queue: Q,
        tokenizer: RequestTokenizer,
        gate: ApprovalGate,
    ) -> Self {
        Self {
            resolver,
            approvals,
            gateway,
            queue,
            tokenizer,
            gate,
        }
    }

    pub async fn submit(&self, mut request: SubmitRequest) -> Result<SubmitOutcome, AppError> {
        request.validate()?;

        if let Submission::Bulk { vacancies } = &request.submission {
            return self.submit_bulk(vacancies, &request.submission_email).await;
        }

        if let Submission::Url { apply_url, resolved } = &mut request.submission {
            let vacancy = self.resolver.resolve(apply_url).await?;
            *resolved = Some(vacancy);
        }

        if self.gate.needs_approval(&request.submission_email) {
            return self.hold_for_approval(&request).await;
        }

        let body = serde_json::to_vec(&request)?;
        self.queue.publish(&body).await?;
        tracing::info!(
            kind = request.kind(),
            email = %request.submission_email,
            "Submission enqueued"
        );
        Ok(SubmitOutcome::Enqueued)
    }

    async fn hold_for_approval(&self, request: &SubmitRequest) -> Result<SubmitOutcome, AppError> {
        let preview = match &request.submission {
            Submission::Manual { vacancy } => vacancy.clone(),
            Submission::Url {
                resolved: Some(vacancy),
                ..
            } => vacancy.clone(),
            Submission::Url { apply_url, .. } => Vacancy {
                apply_url: apply_url.clone(),
                ..Default::default()
            },
            Submission::Bulk { .. } => {
                return Err(AppError::BadRequest(
                    "bulk submissions are reviewed as a batch".into(),
                ));
            }
        };

        let message_id = MessageId::single();
        let approval = ApprovalRequest {
            message_id: message_id.clone(),
            token: self.tokenizer.encode(request)?,
            submission_email: request.submission_email.clone(),
            preview,
        };

        // Notify first so a failed notification leaves no pending record behind.
        self.gateway.request_approval(&approval).await?;
        self.approvals.save(&message_id, request).await?;

        tracing::info!(%message_id, kind = request.kind(), "Submission held for approval");
        Ok(SubmitOutcome::PendingApproval {
            message_ids: vec![message_id],
        })
    }

    async fn submit_bulk(
        &self,
        vacancies: &[Vacancy],
        submission_email: &str,
    ) -> Result<SubmitOutcome, AppError> {
        let mut approvals = Vec::with_capacity(vacancies.len());
        let mut records = Vec::with_capacity(vacancies.len());

        for vacancy in vacancies {
            let item = SubmitRequest::url(vacancy.apply_url.clone(), submission_email);
            let message_id = MessageId::batch();
            approvals.push(ApprovalRequest {
                message_id: message_id.clone(),
                token: self.tokenizer.encode(&item)?,
                submission_email: submission_email.to_string(),
                preview: vacancy.clone(),
            });
            records.push((message_id, item));
        }

        self.gateway.request_batch_approval(&approvals).await?;
        self.approvals.save_batch(&records).await?;

        tracing::info!(
            items = records.len(),
            email = %submission_email,
            "Bulk submission held for approval"
        );
        Ok(SubmitOutcome::PendingApproval {
            message_ids: records.into_iter().map(|(id, _)| id).collect(),
        })
    }
}

impl<R, AS, G, Q> Submitter for SubmissionService<R, AS, G, Q>
where
    R: Resolver + Clone,
    AS: ApprovalStore,
    G: ApprovalGateway,
    Q: MessageQueue,
{
    async fn submit(&self, request: SubmitRequest) -> Result<(), AppError> {
        SubmissionService::submit(self, request).await.map(|_| ())
    }
}
