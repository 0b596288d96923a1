//! Host navigation after a job monitor finishes.

use crate::errors::NavigationError;
use crate::job::NextAction;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// What to do once the monitor is torn down.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum NavigationPlan {
    /// Leave the progress location only.
    Back,
    /// Leave the progress location, then open the next action.
    BackThen(NextAction),
}

impl NavigationPlan {
    pub fn for_next_action(next_action: Option<&NextAction>) -> Self {
        match next_action {
            Some(next) if next.is_actionable() => NavigationPlan::BackThen(next.clone()),
            _ => NavigationPlan::Back,
        }
    }

    pub fn next_action(&self) -> Option<&NextAction> {
        match self {
            NavigationPlan::Back => None,
            NavigationPlan::BackThen(next) => Some(next),
        }
    }
}

/// The host's navigation stack.
#[async_trait]
pub trait Navigator: Send {
    async fn go_back(&mut self) -> Result<(), NavigationError>;

    async fn go_to(&mut self, target: &NextAction) -> Result<(), NavigationError>;
}

/// Run a plan: go back first, and only once that completed, go to the target.
///
/// Failures are logged, never propagated: the job outcome is already settled.
pub async fn execute_plan(navigator: &mut dyn Navigator, plan: &NavigationPlan) {
    if let Err(e) = navigator.go_back().await {
        tracing::warn!("Navigation back failed: {}", e);
        return;
    }
    if let NavigationPlan::BackThen(target) = plan
        && let Err(e) = navigator.go_to(target).await
    {
        tracing::warn!(%target, "Navigation to next action failed: {}", e);
    }
}

/// One recorded navigation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", content = "target", rename_all = "snake_case")]
pub enum NavigationStep {
    Back,
    GoTo(NextAction),
}

#[derive(Debug, Default)]
struct Breadcrumbs {
    stack: Vec<String>,
    steps: Vec<NavigationStep>,
}

/// In-memory breadcrumb trail.
///
/// Clones share the trail, so a caller can keep one handle for inspection
/// while the monitor owns another.
#[derive(Debug, Clone, Default)]
pub struct BreadcrumbNavigator {
    inner: Arc<Mutex<Breadcrumbs>>,
}

impl BreadcrumbNavigator {
    /// Start with the given trail, root first.
    pub fn new<I, S>(trail: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(Mutex::new(Breadcrumbs {
                stack: trail.into_iter().map(Into::into).collect(),
                steps: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Breadcrumbs> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current location, if any.
    pub fn current(&self) -> Option<String> {
        self.lock().stack.last().cloned()
    }

    pub fn trail(&self) -> Vec<String> {
        self.lock().stack.clone()
    }

    pub fn steps(&self) -> Vec<NavigationStep> {
        self.lock().steps.clone()
    }
}

#[async_trait]
impl Navigator for BreadcrumbNavigator {
    async fn go_back(&mut self) -> Result<(), NavigationError> {
        let mut crumbs = self.lock();
        if crumbs.stack.len() <= 1 {
            return Err(NavigationError::AtRoot);
        }
        let left = crumbs.stack.pop();
        crumbs.steps.push(NavigationStep::Back);
        tracing::debug!(?left, "Navigated back");
        Ok(())
    }

    async fn go_to(&mut self, target: &NextAction) -> Result<(), NavigationError> {
        let mut crumbs = self.lock();
        crumbs.stack.push(target.to_string());
        crumbs.steps.push(NavigationStep::GoTo(target.clone()));
        tracing::debug!(%target, "Navigated to next action");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigator() -> BreadcrumbNavigator {
        BreadcrumbNavigator::new(["Invoices", "wait_for_background_job"])
    }

    #[test]
    fn test_plan_for_next_action() {
        assert_eq!(NavigationPlan::for_next_action(None), NavigationPlan::Back);
        let next = NextAction::from("X");
        let plan = NavigationPlan::for_next_action(Some(&next));
        assert_eq!(plan, NavigationPlan::BackThen(next.clone()));
        assert_eq!(plan.next_action(), Some(&next));

        let empty = NextAction::from("");
        assert_eq!(
            NavigationPlan::for_next_action(Some(&empty)),
            NavigationPlan::Back
        );
    }

    #[tokio::test]
    async fn test_execute_back_only() {
        let mut nav = navigator();
        execute_plan(&mut nav, &NavigationPlan::Back).await;
        assert_eq!(nav.current().as_deref(), Some("Invoices"));
        assert_eq!(nav.steps(), vec![NavigationStep::Back]);
    }

    #[tokio::test]
    async fn test_execute_back_then_next_action() {
        let mut nav = navigator();
        let inspect = nav.clone();
        execute_plan(&mut nav, &NavigationPlan::BackThen(NextAction::from("Report")))
            .await;
        assert_eq!(inspect.trail(), vec!["Invoices", "Report"]);
        assert_eq!(
            inspect.steps(),
            vec![
                NavigationStep::Back,
                NavigationStep::GoTo(NextAction::from("Report"))
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_back_skips_next_action() {
        let mut nav = BreadcrumbNavigator::new(["root"]);
        execute_plan(&mut nav, &NavigationPlan::BackThen(NextAction::from("Report")))
            .await;
        assert!(nav.steps().is_empty());
        assert_eq!(nav.trail(), vec!["root"]);
    }

    #[tokio::test]
    async fn test_go_back_at_root_errors() {
        let mut nav = BreadcrumbNavigator::default();
        assert!(matches!(nav.go_back().await, Err(NavigationError::AtRoot)));
    }

    #[test]
    fn test_plan_serializes_with_kind_tag() {
        let json = serde_json::to_string(&NavigationPlan::BackThen(NextAction::from("X"))).unwrap();
        assert_eq!(json, r#"{"kind":"back_then","target":"X"}"#);
        let json = serde_json::to_string(&NavigationPlan::Back).unwrap();
        assert_eq!(json, r#"{"kind":"back"}"#);
    }
}
