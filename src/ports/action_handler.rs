//! Action Handler Port - executable bodies of `function` actions.
//!
//! Handlers are registered by name in a [`HandlerMap`] and resolved once when
//! the registry is built. A handler receives validated parameters and the
//! turn's context snapshot, and reports what it changed as a [`ContextDelta`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::context::{AssistantContext, ContextDelta};
use crate::domain::resilience::OperationError;

/// Result data plus the context changes a handler made.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionOutput {
    pub data: Value,
    pub delta: ContextDelta,
}

impl ActionOutput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            delta: ContextDelta::default(),
        }
    }

    pub fn with_delta(mut self, delta: ContextDelta) -> Self {
        self.delta = delta;
        self
    }
}

/// Port for executing a named action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(
        &self,
        params: Value,
        context: &AssistantContext,
    ) -> Result<ActionOutput, OperationError>;
}

/// Handlers keyed by the name used in `implementation.handler`.
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> &mut Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerMap").field("handlers", &names).finish()
    }
}

/// Adapts an async closure into an [`ActionHandler`].
///
/// The closure receives an owned copy of the context.
pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Value, AssistantContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActionOutput, OperationError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn shared(f: F) -> Arc<dyn ActionHandler>
    where
        F: 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(Value, AssistantContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActionOutput, OperationError>> + Send,
{
    async fn handle(
        &self,
        params: Value,
        context: &AssistantContext,
    ) -> Result<ActionOutput, OperationError> {
        (self.f)(params, context.clone()).await
    }
}
