//! The job progress monitor.
//!
//! A [`JobMonitor`] follows one background job from the moment its view is on
//! screen until exactly one of three things happens: the job reports success,
//! the job reports failure, or the client gives up after the timeout. It then
//! tears itself down once and hands the user off to the next location.
//!
//! ```text
//! Created --begin_waiting--> Waiting --success--> Succeeded --+
//!                               |  \--failure--> Failed ------+--> Destroyed
//!                               \----timeout---> TimedOut ----+
//! ```

use crate::channel::{NotificationChannel, Subscription};
use crate::job::{Job, NextAction};
use crate::navigator::{NavigationPlan, Navigator, execute_plan};
use crate::notification::{JobFailure, Notification};
use crate::progress::ProgressState;
use crate::race::{Winner, race};
use crate::registry::{JobRegistry, Registration};
use crate::schedule::{AfterTurn, Deferred};
use crate::timer::{DEFAULT_TIMEOUT, TimeoutTimer};
use crate::view::ViewAdapter;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Where a monitor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    Created,
    Waiting,
    Succeeded,
    Failed,
    TimedOut,
    Destroyed,
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorPhase::Created => "created",
            MonitorPhase::Waiting => "waiting",
            MonitorPhase::Succeeded => "succeeded",
            MonitorPhase::Failed => "failed",
            MonitorPhase::TimedOut => "timed_out",
            MonitorPhase::Destroyed => "destroyed",
        };
        write!(f, "{}", name)
    }
}

/// How a monitor ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TerminalState {
    Succeeded,
    Failed(JobFailure),
    TimedOut,
    /// Torn down by its owner before the job settled.
    Cancelled,
}

impl TerminalState {
    fn phase(&self) -> MonitorPhase {
        match self {
            TerminalState::Succeeded => MonitorPhase::Succeeded,
            TerminalState::Failed(_) => MonitorPhase::Failed,
            TerminalState::TimedOut => MonitorPhase::TimedOut,
            TerminalState::Cancelled => MonitorPhase::Destroyed,
        }
    }
}

/// Summary returned by [`JobMonitor::run`].
#[derive(Debug, Clone, Serialize)]
pub struct MonitorOutcome {
    pub uuid: String,
    pub terminal: TerminalState,
    pub next_action: Option<NextAction>,
    pub navigation: NavigationPlan,
    pub progress: ProgressState,
    pub notifications: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Watches one job. See the module docs for the state machine.
pub struct JobMonitor {
    job: Job,
    state: ProgressState,
    subscription: Box<dyn Subscription>,
    timer: Option<TimeoutTimer>,
    timeout: Duration,
    view: Box<dyn ViewAdapter>,
    navigator: Box<dyn Navigator>,
    registration: Option<Registration>,
    deferred: AfterTurn,
    phase: MonitorPhase,
    terminal: Option<TerminalState>,
    navigation: Option<NavigationPlan>,
    notifications: usize,
    started: Instant,
}

impl JobMonitor {
    /// Register with `registry` and subscribe to the job's progress channel.
    ///
    /// Polling does not start until [`begin_waiting`](Self::begin_waiting);
    /// anything published before then is buffered by the subscription.
    pub fn new(
        job: Job,
        channel: &dyn NotificationChannel,
        registry: &JobRegistry,
        view: Box<dyn ViewAdapter>,
        navigator: Box<dyn Navigator>,
    ) -> Self {
        let registration = registry.register();
        let subscription = channel.subscribe(job.channel_id());
        tracing::debug!(uuid = job.uuid(), channel = job.channel_id(), "Monitor created");
        Self {
            job,
            state: ProgressState::new(),
            subscription,
            timer: None,
            timeout: DEFAULT_TIMEOUT,
            view,
            navigator,
            registration: Some(registration),
            deferred: AfterTurn::new(),
            phase: MonitorPhase::Created,
            terminal: None,
            navigation: None,
            notifications: 0,
            started: Instant::now(),
        }
    }

    /// Override the time limit. Only effective before waiting begins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn terminal(&self) -> Option<&TerminalState> {
        self.terminal.as_ref()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn next_action(&self) -> Option<&NextAction> {
        self.job.next_action()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn notifications(&self) -> usize {
        self.notifications
    }

    pub fn is_polling(&self) -> bool {
        self.subscription.is_polling()
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.as_ref().is_some_and(TimeoutTimer::is_armed)
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Deferred tasks not yet flushed.
    pub fn deferred(&self) -> usize {
        self.deferred.pending()
    }

    /// Start polling and arm the timer. Call once the view is showing.
    pub fn begin_waiting(&mut self) {
        if self.phase != MonitorPhase::Created {
            return;
        }
        self.subscription.start_polling();
        self.timer = Some(TimeoutTimer::start(self.timeout));
        self.phase = MonitorPhase::Waiting;
        tracing::info!(
            uuid = self.job.uuid(),
            channel = self.subscription.channel_id(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Waiting for job"
        );
    }

    /// Apply one notification. Ignored unless waiting.
    pub fn handle_notification(&mut self, notification: Notification) {
        if self.phase != MonitorPhase::Waiting {
            tracing::debug!(
                uuid = self.job.uuid(),
                phase = %self.phase,
                "Ignoring notification outside of waiting"
            );
            return;
        }
        self.notifications += 1;

        match notification {
            Notification::Progress {
                progress,
                valuemin,
                valuemax,
                message,
            } => {
                self.state = self.state.update(progress, valuemin, valuemax, message);
                tracing::debug!(
                    uuid = self.job.uuid(),
                    percent = self.state.percent(),
                    "Progress merged"
                );
                self.view.update_view(&self.state);
            }
            Notification::Success { result } => {
                if let Some(next) = result {
                    self.job.set_next_action(next);
                }
                self.finish(TerminalState::Succeeded);
            }
            Notification::Failure(failure) => {
                self.deferred.schedule(Deferred::ShowFailure(failure.clone()));
                self.finish(TerminalState::Failed(failure));
            }
        }
    }

    /// The timer fired. Ignored unless still waiting.
    pub fn handle_timeout(&mut self) {
        if self.phase != MonitorPhase::Waiting {
            return;
        }
        tracing::warn!(
            uuid = self.job.uuid(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Gave up waiting for job"
        );
        self.view.warn_timeout(self.timeout);
        self.finish(TerminalState::TimedOut);
    }

    fn finish(&mut self, terminal: TerminalState) {
        self.subscription.stop_polling();
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
        self.phase = terminal.phase();
        tracing::info!(uuid = self.job.uuid(), phase = %self.phase, "Job settled");
        self.terminal = Some(terminal);
        self.destroy();
    }

    /// Tear the monitor down. Only the first call has any effect.
    ///
    /// Releases the registry slot, removes the view and schedules navigation
    /// away from the progress location.
    pub fn destroy(&mut self) {
        if self.phase == MonitorPhase::Destroyed {
            return;
        }
        self.subscription.stop_polling();
        if let Some(timer) = self.timer.as_mut() {
            timer.cancel();
        }
        if self.terminal.is_none() {
            self.terminal = Some(TerminalState::Cancelled);
        }
        if let Some(registration) = self.registration.take() {
            registration.release();
        }
        self.view.teardown();

        let plan = NavigationPlan::for_next_action(self.job.next_action());
        self.deferred.schedule(Deferred::Navigate(plan.clone()));
        self.navigation = Some(plan);
        self.phase = MonitorPhase::Destroyed;
    }

    /// Run deferred work: yield once, then show failures and navigate in the
    /// order they were scheduled.
    pub async fn flush_deferred(&mut self) {
        for task in self.deferred.flush().await {
            match task {
                Deferred::ShowFailure(failure) => self.view.show_failure(&failure),
                Deferred::Navigate(plan) => execute_plan(&mut *self.navigator, &plan).await,
            }
        }
    }

    /// Race notifications against the timer until the job settles.
    async fn wait(&mut self) {
        let mut channel_open = true;
        while self.phase == MonitorPhase::Waiting {
            let Some(timer) = self.timer.as_mut() else {
                break;
            };
            let next = next_or_pending(&mut *self.subscription, channel_open);
            match race(next, timer.fired()).await {
                Winner::First(Some(notification)) => self.handle_notification(notification),
                Winner::First(None) => {
                    // Transport went away; only the timer can settle the job now
                    tracing::debug!(uuid = self.job.uuid(), "Notification channel closed");
                    channel_open = false;
                }
                Winner::Second(()) => self.handle_timeout(),
            }
        }
    }

    /// Show the view, wait for the job to settle, run deferred work, and
    /// report how it ended.
    pub async fn run(mut self) -> MonitorOutcome {
        if self.phase == MonitorPhase::Created {
            self.view.show().await;
            self.begin_waiting();
        }
        self.wait().await;
        self.destroy();
        self.flush_deferred().await;

        MonitorOutcome {
            uuid: self.job.uuid().to_string(),
            terminal: self.terminal.clone().unwrap_or(TerminalState::Cancelled),
            next_action: self.job.next_action().cloned(),
            navigation: self
                .navigation
                .clone()
                .unwrap_or_else(|| NavigationPlan::for_next_action(self.job.next_action())),
            progress: self.state.clone(),
            notifications: self.notifications,
            elapsed: self.started.elapsed(),
        }
    }
}

async fn next_or_pending(
    subscription: &mut dyn Subscription,
    channel_open: bool,
) -> Option<Notification> {
    if channel_open {
        subscription.next().await
    } else {
        std::future::pending().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::errors::NavigationError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum ViewCall {
        Show,
        Update(u8, Option<String>),
        Failure(JobFailure),
        Timeout(Duration),
        Teardown,
    }

    /// View recording every call it receives.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingView {
        calls: Arc<Mutex<Vec<ViewCall>>>,
    }

    impl RecordingView {
        pub fn calls(&self) -> Vec<ViewCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: ViewCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ViewAdapter for RecordingView {
        async fn show(&mut self) {
            self.record(ViewCall::Show);
        }

        fn update_view(&mut self, state: &ProgressState) {
            self.record(ViewCall::Update(
                state.percent(),
                state.message().map(str::to_string),
            ));
        }

        fn show_failure(&mut self, failure: &JobFailure) {
            self.record(ViewCall::Failure(failure.clone()));
        }

        fn warn_timeout(&mut self, waited: Duration) {
            self.record(ViewCall::Timeout(waited));
        }

        fn teardown(&mut self) {
            self.record(ViewCall::Teardown);
        }
    }

    /// Navigator that always refuses, for failure-path tests.
    pub struct RefusingNavigator;

    #[async_trait]
    impl Navigator for RefusingNavigator {
        async fn go_back(&mut self) -> Result<(), NavigationError> {
            Err(NavigationError::Rejected {
                target: "back".to_string(),
                reason: "locked".to_string(),
            })
        }

        async fn go_to(&mut self, target: &NextAction) -> Result<(), NavigationError> {
            Err(NavigationError::Rejected {
                target: target.to_string(),
                reason: "locked".to_string(),
            })
        }
    }
}
