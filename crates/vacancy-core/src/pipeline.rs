use crate::error::AppError;
use crate::models::{Notification, SubmitRequest, Submission};
use crate::traits::{MessageQueue, Notifier, Resolver, VacancyStore};
use crate::worker::MessageProcessor;

/// Stores a queued submission and fans it out to every recipient.
#[derive(Clone)]
pub struct VacancyProcessor<R, VS, Q>
where
    R: Resolver,
    VS: VacancyStore,
    Q: MessageQueue,
{
    resolver: R,
    store: VS,
    notifications: Q,
    recipients: Vec<String>,
}

impl<R, VS, Q> VacancyProcessor<R, VS, Q>
where
    R: Resolver,
    VS: VacancyStore,
    Q: MessageQueue,
{
    pub fn new(resolver: R, store: VS, notifications: Q, recipients: Vec<String>) -> Self {
        Self {
            resolver,
            store,
            notifications,
            recipients,
        }
    }
}

impl<R, VS, Q> MessageProcessor<SubmitRequest> for VacancyProcessor<R, VS, Q>
where
    R: Resolver,
    VS: VacancyStore,
    Q: MessageQueue,
{
    async fn process(&self, request: &SubmitRequest) -> Result<(), AppError> {
        let vacancy = match &request.submission {
            Submission::Manual { vacancy } => vacancy.clone(),
            Submission::Url {
                resolved: Some(vacancy),
                ..
            } => vacancy.clone(),
            Submission::Url { apply_url, .. } => self.resolver.resolve(apply_url).await?,
            Submission::Bulk { .. } => {
                return Err(AppError::BadRequest(
                    "bulk submissions are not processed from the queue".into(),
                ));
            }
        };
        vacancy.validate()?;

        let record = self.store.save(&vacancy).await?;
        tracing::info!(id = %record.id, url = %record.vacancy.apply_url, "Vacancy stored");

        for recipient in &self.recipients {
            let notification = Notification {
                recipient_id: recipient.clone(),
                record: record.clone(),
                retries: 0,
            };
            let published = match serde_json::to_vec(&notification) {
                Ok(body) => self.notifications.publish(&body).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = published {
                tracing::error!(
                    %recipient,
                    id = %record.id,
                    error = %e,
                    "Failed to queue notification"
                );
            }
        }

        Ok(())
    }
}

/// Hands a notification to the notifier.
#[derive(Clone)]
pub struct NotificationProcessor<N: Notifier> {
    notifier: N,
}

impl<N: Notifier> NotificationProcessor<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

impl<N: Notifier> MessageProcessor<Notification> for NotificationProcessor<N> {
    async fn process(&self, notification: &Notification) -> Result<(), AppError> {
        self.notifier.notify(notification).await?;
        tracing::info!(
            recipient = %notification.recipient_id,
            id = %notification.record.id,
            "Notification delivered"
        );
        Ok(())
    }
}
