//! The action registry: resolved handlers plus effective per-mode policy.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use super::effective::effective_definition;
use super::rate_limit::FixedWindowLimiter;
use super::tool::{ToolDefinition, ToolFormat};
use super::{InvokeError, RegistryError};
use crate::domain::actions::{
    validate_parameters, ActionDefinition, ConfigurationFile, HttpMethod, Implementation, InputGuard, Mode,
    PatternSet,
};
use crate::domain::context::{AssistantContext, ContextDelta};
use crate::domain::resilience::{retry, OperationError, RetryPolicy};
use crate::ports::{ActionHandler, ActionOutput, ExternalActionClient, ExternalRequest, HandlerMap};

/// Collaborators injected when a registry is built.
#[derive(Clone, Default)]
pub struct RegistryDeps {
    pub handlers: HandlerMap,
    pub external: Option<Arc<dyn ExternalActionClient>>,
}

impl RegistryDeps {
    pub fn new(handlers: HandlerMap) -> Self {
        Self {
            handlers,
            external: None,
        }
    }

    pub fn with_external(mut self, client: Arc<dyn ExternalActionClient>) -> Self {
        self.external = Some(client);
        self
    }
}

enum Executor {
    Function(Arc<dyn ActionHandler>),
    Composed(Vec<String>),
    External {
        client: Arc<dyn ExternalActionClient>,
        endpoint: String,
        method: HttpMethod,
    },
}

struct RegisteredAction {
    definition: ActionDefinition,
    executor: Executor,
    patterns: PatternSet,
    guard: Option<InputGuard>,
    limiter: Option<FixedWindowLimiter>,
    tool: ToolDefinition,
}

/// Immutable set of actions callable in one mode.
///
/// Built once per configuration and mode; reloads build a new registry and
/// swap it in through [`RegistryHandle`](super::RegistryHandle).
pub struct ActionRegistry {
    mode: Mode,
    version: String,
    entries: BTreeMap<String, RegisteredAction>,
    tools: Vec<ToolDefinition>,
}

impl ActionRegistry {
    /// Resolves every action enabled for `mode` against `deps`.
    pub fn build(
        config: &ConfigurationFile,
        mode: Mode,
        deps: &RegistryDeps,
    ) -> Result<Self, RegistryError> {
        let mut order = Vec::new();
        let mut definitions = HashMap::new();

        for action in &config.actions {
            if !action.is_enabled_for(mode) {
                tracing::debug!(action = %action.id, %mode, "Skipping disabled action");
                continue;
            }
            let effective = effective_definition(action, mode, &config.globals)?;
            if !effective.enabled {
                tracing::debug!(action = %action.id, %mode, "Skipping action disabled by mode override");
                continue;
            }
            order.push(effective.id.clone());
            definitions.insert(effective.id.clone(), effective);
        }

        for id in &order {
            let Some(definition) = definitions.get(id) else {
                continue;
            };
            for dependency in &definition.dependencies {
                if !definitions.contains_key(dependency) {
                    return Err(RegistryError::DependencyUnavailable {
                        action: id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
            if let Implementation::Composed { steps } = &definition.implementation {
                for step in steps {
                    if !definitions.contains_key(step) {
                        return Err(RegistryError::ComposedStepUnavailable {
                            action: id.clone(),
                            step: step.clone(),
                        });
                    }
                }
            }
        }

        if let Some(cycle) = find_composed_cycle(&order, &definitions) {
            return Err(RegistryError::ComposedCycle { cycle });
        }

        let mut entries = BTreeMap::new();
        for id in order {
            let Some(definition) = definitions.remove(&id) else {
                continue;
            };
            let entry = RegisteredAction::resolve(definition, deps)?;
            entries.insert(id, entry);
        }

        let tools = entries.values().map(|entry| entry.tool.clone()).collect();

        tracing::info!(
            %mode,
            version = %config.version,
            actions = entries.len(),
            "Action registry built"
        );

        Ok(Self {
            mode,
            version: config.version.clone(),
            entries,
            tools,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Version string of the configuration this registry was built from.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Enabled tools for this registry's mode, sorted by id.
    pub fn get_tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Tool listing rendered for a specific function-calling format.
    pub fn tools_in_format(&self, format: ToolFormat) -> Vec<Value> {
        self.tools.iter().map(|tool| tool.to_format(format)).collect()
    }

    /// Effective definition of an action in this mode.
    pub fn definition(&self, id: &str) -> Option<&ActionDefinition> {
        self.entries.get(id).map(|entry| &entry.definition)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invokes an action.
    ///
    /// Checks run in order: existence, authorization, rate limit, parameter
    /// and input validation. Only then is the implementation called, under the
    /// action's timeout and retry policy.
    pub fn invoke<'a>(
        &'a self,
        id: &'a str,
        params: Value,
        context: &'a AssistantContext,
    ) -> BoxFuture<'a, Result<ActionOutput, InvokeError>> {
        async move {
            let entry = self
                .entries
                .get(id)
                .ok_or_else(|| InvokeError::UnknownAction(id.to_string()))?;

            let started = Instant::now();
            let result = self.run(entry, params.clone(), context).await;
            entry.audit(self.mode, &params, &result, started.elapsed());
            result
        }
        .boxed()
    }

    async fn run(
        &self,
        entry: &RegisteredAction,
        params: Value,
        context: &AssistantContext,
    ) -> Result<ActionOutput, InvokeError> {
        let action = entry.definition.id.as_str();

        authorize(&entry.definition, context)?;

        if let Some(limiter) = &entry.limiter {
            limiter
                .check()
                .await
                .map_err(|retry_after| InvokeError::RateLimited {
                    action: action.to_string(),
                    retry_after_ms: retry_after.as_millis() as u64,
                })?;
        }

        let params = validate_parameters(&entry.definition.parameters, &params, &entry.patterns)
            .map_err(|violations| InvokeError::Validation {
                action: action.to_string(),
                violations,
            })?;

        if let Some(guard) = &entry.guard {
            guard.check(&params).map_err(|violations| InvokeError::Validation {
                action: action.to_string(),
                violations,
            })?;
        }

        match &entry.executor {
            Executor::Function(handler) => {
                entry
                    .with_policy(|| handler.handle(params.clone(), context))
                    .await
            }
            Executor::External {
                client,
                endpoint,
                method,
            } => {
                let request = ExternalRequest {
                    action_id: action.to_string(),
                    endpoint: endpoint.clone(),
                    method: *method,
                    params,
                    access_token: context.customer.as_ref().and_then(|c| c.access_token.clone()),
                    timeout: entry.definition.performance.timeout(),
                };
                entry
                    .with_policy(|| {
                        let request = request.clone();
                        async move { client.call(request).await.map(ActionOutput::new) }
                    })
                    .await
            }
            Executor::Composed(steps) => {
                // Step attempts carry their own timeouts; this bounds the whole pipeline.
                let timeout = entry.definition.performance.timeout();
                tokio::time::timeout(timeout, self.run_pipeline(action, steps, params, context))
                    .await
                    .map_err(|_| InvokeError::Failed {
                        action: action.to_string(),
                        source: OperationError::timeout(timeout.as_millis() as u64),
                    })?
            }
        }
    }

    /// Runs steps strictly in order. Each step's input is the pipeline input
    /// with the previous step's output fields laid over it.
    async fn run_pipeline(
        &self,
        action: &str,
        steps: &[String],
        params: Value,
        context: &AssistantContext,
    ) -> Result<ActionOutput, InvokeError> {
        let mut current = context.clone();
        let mut delta = ContextDelta::default();
        let mut previous: Option<Value> = None;

        for step in steps {
            let input = overlay(&params, previous.as_ref());
            let output = self
                .invoke(step, input, &current)
                .await
                .map_err(|source| InvokeError::StepFailed {
                    action: action.to_string(),
                    step: step.clone(),
                    source: Box::new(source),
                })?;

            current = current.apply(&output.delta);
            delta = delta.merge(output.delta);
            previous = Some(output.data);
        }

        Ok(ActionOutput {
            data: previous.unwrap_or(Value::Null),
            delta,
        })
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("mode", &self.mode)
            .field("version", &self.version)
            .field("actions", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RegisteredAction {
    fn resolve(definition: ActionDefinition, deps: &RegistryDeps) -> Result<Self, RegistryError> {
        let executor = match &definition.implementation {
            Implementation::Function { handler } => deps
                .handlers
                .get(handler)
                .map(Executor::Function)
                .ok_or_else(|| RegistryError::HandlerNotFound {
                    action: definition.id.clone(),
                    handler: handler.clone(),
                })?,
            Implementation::Composed { steps } => Executor::Composed(steps.clone()),
            Implementation::External { endpoint, method } => {
                let client = deps.external.clone().ok_or_else(|| {
                    RegistryError::ExternalClientMissing {
                        action: definition.id.clone(),
                    }
                })?;
                Executor::External {
                    client,
                    endpoint: endpoint.clone(),
                    method: *method,
                }
            }
        };

        let invalid_pattern = |(pattern, e): (String, regex::Error)| RegistryError::InvalidPattern {
            action: definition.id.clone(),
            pattern,
            message: e.to_string(),
        };

        let patterns = PatternSet::for_parameters(&definition.parameters).map_err(invalid_pattern)?;
        let guard = definition
            .security
            .input_validation
            .as_ref()
            .map(InputGuard::compile)
            .transpose()
            .map_err(invalid_pattern)?;
        let limiter = definition.security.rate_limit.as_ref().map(FixedWindowLimiter::new);
        let tool = ToolDefinition::from_action(&definition);

        Ok(Self {
            definition,
            executor,
            patterns,
            guard,
            limiter,
            tool,
        })
    }

    /// Runs `operation` with the per-attempt timeout inside the retry policy.
    async fn with_policy<F, Fut>(&self, mut operation: F) -> Result<ActionOutput, InvokeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ActionOutput, OperationError>>,
    {
        let performance = &self.definition.performance;
        let timeout = performance.timeout();
        let policy = RetryPolicy::new(performance.retries(), performance.backoff());

        retry(&policy, || {
            let attempt = operation();
            async move {
                tokio::time::timeout(timeout, attempt)
                    .await
                    .map_err(|_| OperationError::timeout(timeout.as_millis() as u64))?
            }
        })
        .await
        .map_err(|source| InvokeError::Failed {
            action: self.definition.id.clone(),
            source,
        })
    }

    fn audit(
        &self,
        mode: Mode,
        params: &Value,
        result: &Result<ActionOutput, InvokeError>,
        elapsed: Duration,
    ) {
        let observability = &self.definition.observability;
        if !observability.log_invocations() {
            return;
        }

        let outcome = match result {
            Ok(_) => "success".to_string(),
            Err(e) => e.classify().code.to_string(),
        };
        let tags = observability.tags.as_deref().unwrap_or(&[]).join(",");
        let duration_ms = elapsed.as_millis() as u64;

        if observability.log_parameters() {
            tracing::info!(
                action = %self.definition.id,
                %mode,
                %outcome,
                duration_ms,
                tags = %tags,
                params = %params,
                "Action invoked"
            );
        } else {
            tracing::info!(
                action = %self.definition.id,
                %mode,
                %outcome,
                duration_ms,
                tags = %tags,
                "Action invoked"
            );
        }
    }
}

fn authorize(definition: &ActionDefinition, context: &AssistantContext) -> Result<(), InvokeError> {
    let security = &definition.security;
    let permissions = security.required_permissions();
    if !security.requires_auth() && permissions.is_empty() {
        return Ok(());
    }

    let Some(customer) = &context.customer else {
        return Err(InvokeError::Unauthorized {
            action: definition.id.clone(),
        });
    };

    match permissions.iter().find(|p| !customer.has_permission(p)) {
        Some(missing) => Err(InvokeError::Forbidden {
            action: definition.id.clone(),
            permission: missing.clone(),
        }),
        None => Ok(()),
    }
}

/// Lays the fields of `previous` over `input` when both are objects.
fn overlay(input: &Value, previous: Option<&Value>) -> Value {
    match (input, previous) {
        (Value::Object(base), Some(Value::Object(fields))) => {
            let mut merged = base.clone();
            merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::Object(merged)
        }
        (Value::Null, Some(prev @ Value::Object(_))) => prev.clone(),
        _ => input.clone(),
    }
}

/// Finds a cycle among composed actions, returned as the ids along the loop.
fn find_composed_cycle(
    order: &[String],
    definitions: &HashMap<String, ActionDefinition>,
) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        id: &'a str,
        definitions: &'a HashMap<String, ActionDefinition>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        match marks.get(id) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|s| *s == id).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(id.to_string());
                return Some(cycle);
            }
            None => {}
        }

        marks.insert(id, Mark::Visiting);
        stack.push(id);
        if let Some(ActionDefinition {
            implementation: Implementation::Composed { steps },
            ..
        }) = definitions.get(id)
        {
            for step in steps {
                if let Some(cycle) = visit(step, definitions, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(id, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    order
        .iter()
        .find_map(|id| visit(id, definitions, &mut marks, &mut stack))
}
