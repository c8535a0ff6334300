use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Notification, SubmitRequest};
use crate::traits::{Delivery, DeliveryAction, MessageQueue};

/// A queue payload that carries its own attempt counter.
pub trait RetryableMessage: Serialize + DeserializeOwned + Send + Sync {
    fn retries(&self) -> u32;

    fn increment_retries(&mut self);

    fn to_bytes(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl RetryableMessage for SubmitRequest {
    fn retries(&self) -> u32 {
        self.retries
    }

    fn increment_retries(&mut self) {
        self.retries += 1;
    }
}

impl RetryableMessage for Notification {
    fn retries(&self) -> u32 {
        self.retries
    }

    fn increment_retries(&mut self) {
        self.retries += 1;
    }
}

/// Handles one decoded message.
pub trait MessageProcessor<M>: Send + Sync {
    fn process(&self, message: &M) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Fixed-delay retry policy.
///
/// A message is processed at most `max_attempts` times. The attempt counter
/// travels in the payload, and each retry is published as a new message.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// Configuration for a worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", &Uuid::new_v4().to_string()[..8]),
            poll_interval: Duration::from_secs(1),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl WorkerConfig {
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: &'a str,
    },
    Polling,
    DeliveryReceived {
        delivery_id: i64,
    },
    Acknowledged {
        delivery_id: i64,
    },
    Retrying {
        delivery_id: i64,
        attempt: u32,
        error: &'a str,
    },
    DiscardedPoison {
        delivery_id: i64,
        error: &'a str,
    },
    DiscardedExhausted {
        delivery_id: i64,
        attempts: u32,
        error: &'a str,
        payload: &'a str,
    },
    ShuttingDown {
        worker_id: &'a str,
        released: u64,
    },
    Stopped {
        worker_id: &'a str,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::info!(%worker_id, "Worker started");
            }
            WorkerEvent::Polling => {
                tracing::debug!("Polling for messages");
            }
            WorkerEvent::DeliveryReceived { delivery_id } => {
                tracing::info!(%delivery_id, "Message received");
            }
            WorkerEvent::Acknowledged { delivery_id } => {
                tracing::info!(%delivery_id, "Message processed");
            }
            WorkerEvent::Retrying {
                delivery_id,
                attempt,
                error,
            } => {
                tracing::warn!(%delivery_id, %attempt, %error, "Processing failed, republishing");
            }
            WorkerEvent::DiscardedPoison { delivery_id, error } => {
                tracing::warn!(%delivery_id, %error, "Unparseable message discarded");
            }
            WorkerEvent::DiscardedExhausted {
                delivery_id,
                attempts,
                error,
                payload,
            } => {
                // Not dead-lettered; nothing consumes it again.
                tracing::warn!(
                    %delivery_id,
                    %attempts,
                    %error,
                    %payload,
                    "Retries exhausted, message dropped"
                );
            }
            WorkerEvent::ShuttingDown {
                worker_id,
                released,
            } => {
                tracing::info!(%worker_id, %released, "Worker shutting down");
            }
            WorkerEvent::Stopped { worker_id } => {
                tracing::info!(%worker_id, "Worker stopped");
            }
        }
    }
}

/// Consumes one queue, processing deliveries one at a time.
pub struct QueueWorker<Q, P, M>
where
    Q: MessageQueue,
    P: MessageProcessor<M>,
    M: RetryableMessage,
{
    queue: Q,
    processor: P,
    config: WorkerConfig,
    _message: PhantomData<fn() -> M>,
}

impl<Q, P, M> QueueWorker<Q, P, M>
where
    Q: MessageQueue,
    P: MessageProcessor<M>,
    M: RetryableMessage,
{
    pub fn new(queue: Q, processor: P, config: WorkerConfig) -> Self {
        Self {
            queue,
            processor,
            config,
            _message: PhantomData,
        }
    }

    /// Run the worker loop until cancellation.
    ///
    /// The in-flight delivery is always finished and settled before the
    /// loop observes the cancellation.
    pub async fn run<WR: WorkerReporter>(
        &self,
        cancel_token: CancellationToken,
        reporter: &WR,
    ) -> Result<(), AppError> {
        reporter.report(WorkerEvent::Started {
            worker_id: &self.config.worker_id,
        });

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            reporter.report(WorkerEvent::Polling);

            match self.queue.receive(&self.config.worker_id).await {
                Ok(Some(delivery)) => {
                    reporter.report(WorkerEvent::DeliveryReceived {
                        delivery_id: delivery.id,
                    });
                    let action = self.handle(&delivery, reporter).await;
                    if let Err(e) = self.queue.settle(&delivery, action).await {
                        tracing::error!(
                            delivery_id = %delivery.id,
                            error = %e,
                            "Failed to settle message"
                        );
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive message");
                    tokio::select! {
                        () = tokio::time::sleep(self.config.poll_interval * 2) => {}
                        () = cancel_token.cancelled() => break,
                    }
                }
            }
        }

        let released = match self.queue.release(&self.config.worker_id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "Failed to release claimed messages");
                0
            }
        };

        reporter.report(WorkerEvent::ShuttingDown {
            worker_id: &self.config.worker_id,
            released,
        });
        reporter.report(WorkerEvent::Stopped {
            worker_id: &self.config.worker_id,
        });

        Ok(())
    }

    /// Decide how a delivery leaves the queue.
    ///
    /// - unparseable payload: discard, never retried
    /// - processed: acknowledge
    /// - failed below the attempt ceiling: wait, republish with the counter
    ///   incremented, discard the original
    /// - failed at the ceiling: discard
    pub async fn handle<WR: WorkerReporter>(
        &self,
        delivery: &Delivery,
        reporter: &WR,
    ) -> DeliveryAction {
        let mut message: M = match serde_json::from_slice(&delivery.body) {
            Ok(message) => message,
            Err(e) => {
                reporter.report(WorkerEvent::DiscardedPoison {
                    delivery_id: delivery.id,
                    error: &e.to_string(),
                });
                return DeliveryAction::Discard;
            }
        };

        let error = match self.processor.process(&message).await {
            Ok(()) => {
                reporter.report(WorkerEvent::Acknowledged {
                    delivery_id: delivery.id,
                });
                return DeliveryAction::Acknowledge;
            }
            Err(e) => e.to_string(),
        };

        message.increment_retries();
        let policy = &self.config.retry_policy;
        if message.retries() >= policy.max_attempts {
            reporter.report(WorkerEvent::DiscardedExhausted {
                delivery_id: delivery.id,
                attempts: message.retries(),
                error: &error,
                payload: &String::from_utf8_lossy(&delivery.body),
            });
            return DeliveryAction::Discard;
        }

        tokio::time::sleep(policy.backoff).await;
        reporter.report(WorkerEvent::Retrying {
            delivery_id: delivery.id,
            attempt: message.retries(),
            error: &error,
        });

        let republished = match message.to_bytes() {
            Ok(body) => self.queue.publish(&body).await,
            Err(e) => Err(e),
        };
        if let Err(e) = republished {
            tracing::error!(
                delivery_id = %delivery.id,
                error = %e,
                "Failed to republish message, it will be lost"
            );
        }

        DeliveryAction::Discard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    fn fast_config() -> WorkerConfig {
        WorkerConfig::default()
            .with_worker_id("test-worker")
            .with_poll_interval(Duration::from_millis(10))
            .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
    }

    /// Receive, handle, and settle until the queue is empty.
    async fn drain(
        worker: &QueueWorker<MockQueue, MockProcessor, SubmitRequest>,
        queue: &MockQueue,
    ) {
        let reporter = MockReporter::new();
        while let Some(delivery) = queue.receive("test-worker").await.unwrap() {
            let action = worker.handle(&delivery, &reporter).await;
            queue.settle(&delivery, action).await.unwrap();
        }
    }

    fn request() -> SubmitRequest {
        SubmitRequest::url("https://a.com/job", "x@unknown.com")
    }

    #[tokio::test]
    async fn success_acknowledges() {
        let queue = MockQueue::new();
        queue.push_json(&request());
        let processor = MockProcessor::failing_times(0);
        let worker = QueueWorker::new(queue.clone(), processor.clone(), fast_config());

        drain(&worker, &queue).await;

        assert_eq!(processor.calls(), 1);
        assert_eq!(queue.settled_actions(), vec![DeliveryAction::Acknowledge]);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        for k in 0..3u32 {
            let queue = MockQueue::new();
            queue.push_json(&request());
            let processor = MockProcessor::failing_times(k);
            let worker = QueueWorker::new(queue.clone(), processor.clone(), fast_config());

            drain(&worker, &queue).await;

            assert_eq!(processor.calls(), k + 1, "k = {k}");
            let actions = queue.settled_actions();
            assert_eq!(actions.last(), Some(&DeliveryAction::Acknowledge));
            assert_eq!(actions.len() as u32, k + 1);
        }
    }

    #[tokio::test]
    async fn persistent_failure_stops_after_three_attempts() {
        for k in [3u32, 4, 10] {
            let queue = MockQueue::new();
            queue.push_json(&request());
            let processor = MockProcessor::failing_times(k);
            let worker = QueueWorker::new(queue.clone(), processor.clone(), fast_config());

            drain(&worker, &queue).await;

            assert_eq!(processor.calls(), 3, "k = {k}");
            assert!(
                queue
                    .settled_actions()
                    .iter()
                    .all(|a| *a == DeliveryAction::Discard)
            );
            assert_eq!(queue.pending_len(), 0);
        }
    }

    #[tokio::test]
    async fn republished_message_carries_incremented_counter() {
        let queue = MockQueue::new();
        queue.push_json(&request());
        let processor = MockProcessor::failing_times(1);
        let worker: QueueWorker<_, _, SubmitRequest> = QueueWorker::new(queue.clone(), processor, fast_config());
        let reporter = MockReporter::new();

        let delivery = queue.receive("test-worker").await.unwrap().unwrap();
        let action = worker.handle(&delivery, &reporter).await;
        assert_eq!(action, DeliveryAction::Discard);

        let published = queue.published();
        assert_eq!(published.len(), 1);
        let retried: SubmitRequest = serde_json::from_slice(&published[0]).unwrap();
        assert_eq!(retried.retries, 1);
        assert_eq!(retried.submission, request().submission);
        assert_eq!(reporter.labels(), vec!["Retrying"]);
    }

    #[tokio::test]
    async fn poison_message_is_discarded_without_processing() {
        let queue = MockQueue::new();
        queue.push_raw(b"{not json".to_vec());
        let processor = MockProcessor::failing_times(0);
        let worker = QueueWorker::new(queue.clone(), processor.clone(), fast_config());

        drain(&worker, &queue).await;

        assert_eq!(processor.calls(), 0);
        assert_eq!(queue.settled_actions(), vec![DeliveryAction::Discard]);
        assert!(queue.published().is_empty());
    }

    #[tokio::test]
    async fn failed_republish_still_discards_original() {
        let queue = MockQueue::new();
        queue.push_json(&request());
        queue.fail_next_publish(AppError::QueueError("broker down".into()));
        let processor = MockProcessor::failing_times(5);
        let worker = QueueWorker::new(queue.clone(), processor.clone(), fast_config());

        drain(&worker, &queue).await;

        assert_eq!(processor.calls(), 1);
        assert_eq!(queue.settled_actions(), vec![DeliveryAction::Discard]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_processes_and_shuts_down_on_cancel() {
        let queue = MockQueue::new();
        queue.push_json(&request());
        let processor = MockProcessor::failing_times(0);
        let worker: QueueWorker<_, _, SubmitRequest> = QueueWorker::new(queue.clone(), processor.clone(), fast_config());
        let reporter = MockReporter::new();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        worker.run(cancel, &reporter).await.unwrap();

        assert_eq!(processor.calls(), 1);
        assert_eq!(queue.released_consumers(), vec!["test-worker".to_string()]);
        let labels = reporter.labels();
        assert_eq!(labels.first().map(String::as_str), Some("Started"));
        assert!(labels.contains(&"Acknowledged".to_string()));
        assert_eq!(
            &labels[labels.len() - 2..],
            &["ShuttingDown".to_string(), "Stopped".to_string()]
        );
    }
}
