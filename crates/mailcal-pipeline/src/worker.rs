//! Message worker: evaluates inbound messages concurrently and writes
//! accepted events to the calendar.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use mailcal_core::config::{env_parse, env_string};
use mailcal_core::{defaults, CalendarWriter, Error, InboundMessage, RejectReason, Result};

use crate::pipeline::{EventPipeline, Outcome};

/// Configuration for the message worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of messages evaluated at once.
    pub max_concurrent: usize,
    /// Capacity of the inbound message queue.
    pub queue_capacity: usize,
    /// Whether to process messages at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::WORKER_MAX_CONCURRENT,
            queue_capacity: defaults::WORKER_QUEUE_CAPACITY,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MAILCAL_WORKER_ENABLED` | `true` | Enable/disable processing |
    /// | `MAILCAL_MAX_CONCURRENT` | `4` | Max concurrent evaluations |
    /// | `MAILCAL_QUEUE_CAPACITY` | `64` | Inbound queue size |
    pub fn from_env() -> Result<Self> {
        let enabled = env_string("MAILCAL_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = env_parse::<usize>("MAILCAL_MAX_CONCURRENT")?
            .unwrap_or(defaults::WORKER_MAX_CONCURRENT)
            .max(1);

        let queue_capacity = env_parse::<usize>("MAILCAL_QUEUE_CAPACITY")?
            .unwrap_or(defaults::WORKER_QUEUE_CAPACITY)
            .max(1);

        Ok(Self {
            max_concurrent,
            queue_capacity,
            enabled,
        })
    }

    /// Set maximum concurrent evaluations.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the inbound queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Enable or disable processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the message worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Worker started.
    WorkerStarted,
    /// A message was already processed and was not evaluated again.
    MessageSkipped { message_id: String },
    /// A message was evaluated and produced no event.
    MessageRejected {
        message_id: String,
        reason: RejectReason,
        score: u8,
    },
    /// An event was written to the calendar.
    EventCreated {
        message_id: String,
        event_id: String,
        start: DateTime<FixedOffset>,
    },
    /// The calendar refused an accepted event.
    CalendarWriteFailed { message_id: String, error: String },
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for feeding and controlling a running worker.
pub struct WorkerHandle {
    message_tx: mpsc::Sender<InboundMessage>,
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queue a message, waiting for room if the queue is full.
    pub async fn submit(&self, message: InboundMessage) -> Result<()> {
        check_message_id(&message)?;
        self.message_tx
            .send(message)
            .await
            .map_err(|_| Error::Internal("Worker is not accepting messages".into()))
    }

    /// Queue a message without waiting.
    pub fn try_submit(&self, message: InboundMessage) -> Result<()> {
        check_message_id(&message)?;
        self.message_tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                Error::Internal("Worker queue is full".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                Error::Internal("Worker is not accepting messages".into())
            }
        })
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }

    /// Stop accepting messages, finish everything already queued, and wait
    /// for the worker to exit.
    pub async fn shutdown(self) -> Result<()> {
        // The worker may already have exited (disabled); that is fine.
        let _ = self.shutdown_tx.send(()).await;
        drop(self.message_tx);
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Worker task failed: {}", e)))
    }
}

/// Worker that evaluates messages from a queue.
pub struct MessageWorker {
    pipeline: Arc<EventPipeline>,
    calendar: Arc<dyn CalendarWriter>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl MessageWorker {
    /// Create a new message worker.
    pub fn new(
        pipeline: Arc<EventPipeline>,
        calendar: Arc<dyn CalendarWriter>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            pipeline,
            calendar,
            config,
            event_tx,
        }
    }

    pub fn pipeline(&self) -> &Arc<EventPipeline> {
        &self.pipeline
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (message_tx, message_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let task = tokio::spawn(async move {
            self.run(message_rx, shutdown_rx).await;
        });

        WorkerHandle {
            message_tx,
            shutdown_tx,
            event_rx,
            task,
        }
    }

    /// Run the worker loop.
    ///
    /// Evaluates up to `max_concurrent` messages at a time. On shutdown the
    /// queue is closed and drained, and in-flight evaluations finish before
    /// the loop returns.
    #[instrument(
        skip(self, message_rx, shutdown_rx),
        fields(subsystem = "pipeline", component = "worker")
    )]
    async fn run(
        self,
        mut message_rx: mpsc::Receiver<InboundMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        if !self.config.enabled {
            info!("Message worker is disabled, not starting");
            return;
        }

        info!(
            max_concurrent = self.config.max_concurrent,
            queue_capacity = self.config.queue_capacity,
            classifier_mode = %self.pipeline.classifier_mode(),
            "Message worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Message worker received shutdown signal");
                    break;
                }
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = result {
                        error!(error = ?e, "Message task panicked");
                    }
                }
                message = message_rx.recv() => match message {
                    Some(message) => self.dispatch(message, &permits, &mut tasks).await,
                    None => {
                        debug!("All message senders dropped");
                        break;
                    }
                },
            }
        }

        // Drain whatever was queued before shutdown.
        message_rx.close();
        while let Some(message) = message_rx.recv().await {
            self.dispatch(message, &permits, &mut tasks).await;
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Message task panicked");
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Message worker stopped");
    }

    /// Wait for a free slot, then evaluate the message in its own task.
    async fn dispatch(
        &self,
        message: InboundMessage,
        permits: &Arc<Semaphore>,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(message_id = %message.id, "Concurrency limiter closed, dropping message");
                return;
            }
        };
        let worker = self.clone_refs();
        tasks.spawn(async move {
            let _permit = permit;
            worker.process(message).await;
        });
    }

    /// Clone references needed for spawned message tasks.
    fn clone_refs(&self) -> MessageWorkerRef {
        MessageWorkerRef {
            pipeline: self.pipeline.clone(),
            calendar: self.calendar.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

/// Lightweight reference bundle for processing a single message in a
/// spawned task.
struct MessageWorkerRef {
    pipeline: Arc<EventPipeline>,
    calendar: Arc<dyn CalendarWriter>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl MessageWorkerRef {
    async fn process(self, message: InboundMessage) {
        let start = Instant::now();
        let evaluation = self.pipeline.evaluate(&message).await;
        let message_id = evaluation.message_id;

        match evaluation.outcome {
            Outcome::Duplicate => {
                let _ = self
                    .event_tx
                    .send(WorkerEvent::MessageSkipped { message_id });
            }
            Outcome::Rejected(reason) => {
                let score = evaluation.score.map(|s| s.total).unwrap_or(0);
                let _ = self.event_tx.send(WorkerEvent::MessageRejected {
                    message_id,
                    reason,
                    score,
                });
            }
            Outcome::Accepted(event) => match self.calendar.create_event(&event).await {
                Ok(event_id) => {
                    info!(
                        %message_id,
                        %event_id,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Calendar event created"
                    );
                    let _ = self.event_tx.send(WorkerEvent::EventCreated {
                        message_id,
                        event_id,
                        start: event.start,
                    });
                }
                Err(e) => {
                    warn!(
                        %message_id,
                        error = %e,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Calendar write failed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::CalendarWriteFailed {
                        message_id,
                        error: e.to_string(),
                    });
                }
            },
        }
    }
}

/// Builder for creating a message worker.
pub struct WorkerBuilder {
    pipeline: EventPipeline,
    calendar: Arc<dyn CalendarWriter>,
    config: WorkerConfig,
}

impl WorkerBuilder {
    /// Create a new worker builder.
    pub fn new(pipeline: EventPipeline, calendar: Arc<dyn CalendarWriter>) -> Self {
        Self {
            pipeline,
            calendar,
            config: WorkerConfig::default(),
        }
    }

    /// Set the worker configuration.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build and return the worker.
    pub fn build(self) -> MessageWorker {
        MessageWorker::new(Arc::new(self.pipeline), self.calendar, self.config)
    }
}

/// The ledger keys on the message id, so a blank one cannot be deduplicated.
fn check_message_id(message: &InboundMessage) -> Result<()> {
    if message.id.trim().is_empty() {
        return Err(Error::InvalidInput("message id is empty".into()));
    }
    Ok(())
}
