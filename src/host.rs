//! Named client actions and the host that dispatches them.
//!
//! A server response asks the client to run an action by name with JSON
//! parameters. `wait_for_background_job` is the one this crate registers: it
//! builds a [`JobMonitor`] for `{ "uuid": ..., "next_action": ... }`.

use crate::channel::NotificationBus;
use crate::config::JobwatchConfig;
use crate::errors::ActionError;
use crate::job::{Job, NextAction};
use crate::monitor::JobMonitor;
use crate::navigator::Navigator;
use crate::registry::JobRegistry;
use crate::view::{ViewAdapter, build_view};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Name under which the job monitor action is registered.
pub const WAIT_FOR_BACKGROUND_JOB: &str = "wait_for_background_job";

/// Parameters of a client action, as sent by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionParams {
    pub uuid: String,
    #[serde(default)]
    pub next_action: Option<serde_json::Value>,
}

impl ActionParams {
    /// Decode `params` for action `name`.
    pub fn from_json(name: &str, params: &serde_json::Value) -> Result<Self, ActionError> {
        let decoded: ActionParams =
            serde_json::from_value(params.clone()).map_err(|e| ActionError::InvalidParams {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        if decoded.uuid.trim().is_empty() {
            return Err(ActionError::InvalidParams {
                name: name.to_string(),
                message: "uuid must not be empty".to_string(),
            });
        }
        Ok(decoded)
    }
}

/// Builds the view for a job uuid.
pub type ViewFactory = Arc<dyn Fn(&str) -> Box<dyn ViewAdapter> + Send + Sync>;

/// Everything an action handler may use to build its monitor.
pub struct HostContext {
    pub config: JobwatchConfig,
    pub registry: JobRegistry,
    pub bus: NotificationBus,
    pub view_factory: ViewFactory,
}

type ActionHandler = Box<
    dyn Fn(ActionParams, &HostContext, Box<dyn Navigator>) -> Result<JobMonitor, ActionError>
        + Send
        + Sync,
>;

/// Table of named client actions.
#[derive(Default)]
pub struct ClientActions {
    handlers: HashMap<String, ActionHandler>,
}

impl ClientActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn add<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(ActionParams, &HostContext, Box<dyn Navigator>) -> Result<JobMonitor, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn get(&self, name: &str) -> Option<&ActionHandler> {
        self.handlers.get(name)
    }
}

/// Handler for [`WAIT_FOR_BACKGROUND_JOB`].
pub fn wait_for_background_job(
    params: ActionParams,
    ctx: &HostContext,
    navigator: Box<dyn Navigator>,
) -> Result<JobMonitor, ActionError> {
    let job = Job::with_namespace(
        &ctx.config.monitor.namespace,
        params.uuid,
        NextAction::from_optional(params.next_action),
    );
    let view = (ctx.view_factory)(job.uuid());
    Ok(
        JobMonitor::new(job, &ctx.bus, &ctx.registry, view, navigator)
            .with_timeout(ctx.config.monitor.timeout()),
    )
}

/// Owns the shared pieces every monitor needs and dispatches actions.
pub struct Host {
    actions: ClientActions,
    context: HostContext,
}

impl Host {
    /// Host with the configured view and `wait_for_background_job` registered.
    pub fn new(config: JobwatchConfig) -> Self {
        let mode = config.ui.mode();
        let verbose = config.ui.verbose;
        let factory: ViewFactory = Arc::new(move |uuid: &str| build_view(mode, uuid, verbose));
        Self::with_view_factory(config, factory)
    }

    pub fn with_view_factory(config: JobwatchConfig, view_factory: ViewFactory) -> Self {
        let mut actions = ClientActions::new();
        actions.add(WAIT_FOR_BACKGROUND_JOB, wait_for_background_job);
        Self {
            actions,
            context: HostContext {
                config,
                registry: JobRegistry::new(),
                bus: NotificationBus::new(),
                view_factory,
            },
        }
    }

    pub fn actions_mut(&mut self) -> &mut ClientActions {
        &mut self.actions
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.context.bus
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.context.registry
    }

    pub fn config(&self) -> &JobwatchConfig {
        &self.context.config
    }

    /// Number of monitors built by this host that have not been destroyed.
    pub fn pending_jobs(&self) -> usize {
        self.context.registry.pending()
    }

    /// Run the action `name` with JSON `params`.
    pub fn dispatch(
        &self,
        name: &str,
        params: &serde_json::Value,
        navigator: Box<dyn Navigator>,
    ) -> Result<JobMonitor, ActionError> {
        let handler = self
            .actions
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction {
                name: name.to_string(),
            })?;
        let params = ActionParams::from_json(name, params)?;
        tracing::debug!(action = name, uuid = %params.uuid, "Dispatching client action");

        handler(params, &self.context, navigator)
    }
}
