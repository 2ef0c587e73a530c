//! Streaming client - consumes an SSE response as typed events.
//!
//! One `connect` call drives one logical stream through
//! `idle → connecting → streaming → (complete | aborted | failed)`.
//!
//! # Delivery guarantees
//!
//! - `on_event` is called in arrival order, once per event.
//! - At most one terminal callback (`on_complete` or `on_error`) per connect.
//! - After `disconnect()` no callback fires at all.
//!
//! Transport failures before any event was delivered retry the whole
//! connection with linear backoff. Once events have been delivered a failure
//! is terminal, so no event is ever delivered twice.

use std::sync::Mutex;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::foundation::StateMachine;
use crate::domain::resilience::{classify, ClassifiedError, OperationError};
use crate::domain::streaming::{ChatRequest, SseDecoder, SseItem, StreamEvent, StreamState};
use crate::ports::StreamTransport;

/// Receives the events and terminal outcome of a stream.
pub trait StreamObserver: Send + Sync {
    fn on_event(&self, event: &StreamEvent);
    fn on_error(&self, error: &ClassifiedError);
    fn on_complete(&self);
}

#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// Reconnects allowed after the first attempt fails.
    pub retry_attempts: u32,
    /// Base delay; the wait before reconnect `n` is `retry_delay * n`.
    pub retry_delay: Duration,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// How a `connect` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed { events: usize },
    Aborted,
    Failed(ClassifiedError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamClientError {
    #[error("A stream is already active on this client")]
    AlreadyActive,
}

enum Attempt {
    Completed(usize),
    Aborted,
    Failed { error: OperationError, delivered: usize },
}

pub struct StreamingClient<T: StreamTransport> {
    transport: T,
    config: StreamClientConfig,
    state: Mutex<StreamState>,
    abort: Mutex<Option<watch::Sender<bool>>>,
}

impl<T: StreamTransport> StreamingClient<T> {
    pub fn new(transport: T, config: StreamClientConfig) -> Self {
        Self {
            transport,
            config,
            state: Mutex::new(StreamState::Idle),
            abort: Mutex::new(None),
        }
    }

    pub fn state(&self) -> StreamState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Streams `request` to `observer` until completion, failure or abort.
    pub async fn connect(
        &self,
        request: &ChatRequest,
        observer: &dyn StreamObserver,
    ) -> Result<StreamOutcome, StreamClientError> {
        let mut abort = self.begin()?;
        let wire = request.streaming();
        let mut reconnects = 0u32;

        loop {
            match self.attempt(&wire, observer, &mut abort).await {
                Attempt::Completed(events) => {
                    self.set_state(StreamState::Complete);
                    observer.on_complete();
                    tracing::debug!(events, "Stream completed");
                    return Ok(StreamOutcome::Completed { events });
                }
                Attempt::Aborted => return Ok(self.aborted()),
                Attempt::Failed { error, delivered } => {
                    let classified = classify(&error);
                    let retryable = delivered == 0
                        && classified.recoverable
                        && reconnects < self.config.retry_attempts;

                    if !retryable {
                        tracing::error!(
                            error = %error,
                            code = %classified.code,
                            reconnects,
                            "Stream failed"
                        );
                        self.set_state(StreamState::Failed);
                        observer.on_error(&classified);
                        return Ok(StreamOutcome::Failed(classified));
                    }

                    reconnects += 1;
                    let delay = self.config.retry_delay.saturating_mul(reconnects);
                    tracing::warn!(
                        error = %error,
                        attempt = reconnects,
                        delay_ms = delay.as_millis() as u64,
                        "Stream connection failed, reconnecting"
                    );

                    tokio::select! {
                        biased;
                        _ = wait_for_abort(&mut abort) => return Ok(self.aborted()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Aborts the active stream. Returns false when nothing was active.
    pub fn disconnect(&self) -> bool {
        if !self.state().is_active() {
            return false;
        }
        let sender = self.abort.lock().unwrap_or_else(|p| p.into_inner());
        sender.as_ref().is_some_and(|tx| tx.send(true).is_ok())
    }

    fn begin(&self) -> Result<watch::Receiver<bool>, StreamClientError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if state.is_active() {
            return Err(StreamClientError::AlreadyActive);
        }
        *state = StreamState::Connecting;

        let (tx, rx) = watch::channel(false);
        *self.abort.lock().unwrap_or_else(|p| p.into_inner()) = Some(tx);
        Ok(rx)
    }

    async fn attempt(
        &self,
        request: &ChatRequest,
        observer: &dyn StreamObserver,
        abort: &mut watch::Receiver<bool>,
    ) -> Attempt {
        self.set_state(StreamState::Connecting);

        let opened = tokio::select! {
            biased;
            _ = wait_for_abort(abort) => return Attempt::Aborted,
            opened = self.transport.open(request) => opened,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(e) => {
                return Attempt::Failed {
                    error: e.into(),
                    delivered: 0,
                }
            }
        };

        self.set_state(StreamState::Streaming);
        let mut decoder = SseDecoder::new();
        let mut delivered = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = wait_for_abort(abort) => return Attempt::Aborted,
                next = body.next() => next,
            };

            let (items, finished) = match next {
                Some(Ok(chunk)) => (decoder.push(&chunk), false),
                Some(Err(e)) => {
                    return Attempt::Failed {
                        error: e.into(),
                        delivered,
                    }
                }
                None => (decoder.finish(), true),
            };

            for item in items {
                if *abort.borrow() {
                    return Attempt::Aborted;
                }
                match item {
                    SseItem::Event(event) => {
                        observer.on_event(&event);
                        delivered += 1;
                    }
                    SseItem::Done => return Attempt::Completed(delivered),
                }
            }

            if finished {
                return Attempt::Completed(delivered);
            }
        }
    }

    fn aborted(&self) -> StreamOutcome {
        self.set_state(StreamState::Aborted);
        tracing::debug!("Stream aborted by caller");
        StreamOutcome::Aborted
    }

    fn set_state(&self, target: StreamState) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match state.transition_to(target) {
            Ok(next) => *state = next,
            Err(e) => tracing::debug!(error = %e, "Ignoring stream state transition"),
        }
    }
}

async fn wait_for_abort(abort: &mut watch::Receiver<bool>) {
    loop {
        if *abort.borrow() {
            return;
        }
        if abort.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}
