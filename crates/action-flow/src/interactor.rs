//! Resolve, wait, then act
//!
//! [`Interactor`] is what page objects talk to. Every element operation
//! first waits for the state the action needs, then hands the target to the
//! retrying actuator, which re-resolves it before each attempt. Each
//! operation ends with one [`StepRecord`] delivered to the configured
//! [`InteractionEvents`] observer.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use action_locator::{FallbackResolver, Resolution};
use action_primitives::{
    ActionError, ActionSuccess, InteractionConfig, PollingAssertion, RetryingActuator,
    VisibilityWaiter, WaitReport, WaitSpec,
};
use tracing::{debug, field, info, instrument, warn, Span};
use twizz_core_types::{Action, BrowserPort, ElementLocator, InteractionTarget, TargetState};

use crate::errors::FlowError;
use crate::events::{InteractionEvents, NullEvents};
use crate::types::{StepRecord, StepScope};

/// Page-object facing façade over the waiting, retrying and polling
/// primitives.
#[derive(Clone)]
pub struct Interactor {
    port: Arc<dyn BrowserPort>,
    resolver: FallbackResolver,
    waiter: VisibilityWaiter,
    actuator: RetryingActuator,
    config: Arc<InteractionConfig>,
    profile: Option<String>,
    wait_timeout: Duration,
    poll_interval: Duration,
    events: Arc<dyn InteractionEvents>,
}

impl Interactor {
    pub fn new(port: Arc<dyn BrowserPort>, config: InteractionConfig) -> Self {
        let resolver = FallbackResolver::new(port.clone());
        let actuator = RetryingActuator::new(port.clone(), config.retry_policy());
        Self {
            waiter: VisibilityWaiter::new(resolver.clone()),
            resolver,
            actuator,
            wait_timeout: config.wait.timeout(),
            poll_interval: config.wait.poll_interval(),
            config: Arc::new(config),
            profile: None,
            port,
            events: Arc::new(NullEvents),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn InteractionEvents>) -> Self {
        self.events = events;
        self
    }

    /// Copy of this interactor whose waits use the named profile's timing.
    pub fn with_profile(&self, name: &str) -> Result<Interactor, FlowError> {
        let spec = self
            .config
            .profile_spec(name, TargetState::Visible)
            .ok_or_else(|| FlowError::UnknownProfile(name.to_string()))?;
        let mut scoped = self.clone();
        scoped.wait_timeout = spec.timeout();
        scoped.poll_interval = spec.poll_interval();
        scoped.profile = Some(name.to_string());
        Ok(scoped)
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn port(&self) -> &Arc<dyn BrowserPort> {
        &self.port
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Wait spec for `state` under the active profile.
    pub fn spec(&self, state: TargetState) -> WaitSpec {
        WaitSpec::new(state, self.wait_timeout).with_poll_interval(self.poll_interval)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poller bounded by the active wait timing.
    pub fn poller(&self) -> PollingAssertion {
        PollingAssertion::new(self.wait_timeout, self.poll_interval)
    }

    /// Single scan of the target's strategies, no waiting.
    #[instrument(skip_all, fields(target = %target.label(), action_id = field::Empty))]
    pub async fn resolve(&self, target: &InteractionTarget) -> Result<Resolution, FlowError> {
        let mut scope = self.begin("resolve", Some(target.label()));
        let result = self.resolver.resolve(target).await.map_err(FlowError::from);
        if let Ok(resolution) = &result {
            scope.note_strategy(resolution.strategy_index);
        }
        self.finish(scope, result).await
    }

    pub async fn count(&self, target: &InteractionTarget) -> Result<usize, FlowError> {
        Ok(self.resolver.count(target).await?)
    }

    /// Whether the target is visible right now. Never waits and never fails.
    pub async fn is_showing(&self, target: &InteractionTarget) -> bool {
        match self.resolver.resolve(target).await {
            Ok(resolution) => resolution.visible(),
            Err(err) => {
                debug!(target = %target.label(), error = %err, "target not showing");
                false
            }
        }
    }

    pub async fn wait_for(
        &self,
        target: &InteractionTarget,
        state: TargetState,
    ) -> Result<WaitReport, FlowError> {
        self.wait_with(target, &self.spec(state)).await
    }

    #[instrument(skip_all, fields(target = %target.label(), state = %spec.state, action_id = field::Empty))]
    pub async fn wait_with(
        &self,
        target: &InteractionTarget,
        spec: &WaitSpec,
    ) -> Result<WaitReport, FlowError> {
        let mut scope = self.begin("wait", Some(target.label()));
        let result = self.waiter.wait(target, spec).await.map_err(FlowError::from);
        if let Ok(report) = &result {
            scope.note_wait(report);
        }
        self.finish(scope, result).await
    }

    #[instrument(skip_all, fields(target = %target.label(), action_id = field::Empty))]
    pub async fn click(&self, target: &InteractionTarget) -> Result<ActionSuccess, FlowError> {
        self.act("click", target, TargetState::Visible, Action::Click)
            .await
    }

    #[instrument(skip_all, fields(target = %target.label(), action_id = field::Empty))]
    pub async fn fill(
        &self,
        target: &InteractionTarget,
        text: impl Into<String>,
    ) -> Result<ActionSuccess, FlowError> {
        self.act("fill", target, TargetState::Visible, Action::Fill(text.into()))
            .await
    }

    /// File inputs are often styled away, so only attachment is awaited.
    #[instrument(skip_all, fields(target = %target.label(), action_id = field::Empty))]
    pub async fn set_files(
        &self,
        target: &InteractionTarget,
        files: Vec<PathBuf>,
    ) -> Result<ActionSuccess, FlowError> {
        self.act("set_files", target, TargetState::Attached, Action::SetFiles(files))
            .await
    }

    #[instrument(skip_all, fields(target = %target.label(), action_id = field::Empty))]
    pub async fn read_attribute(
        &self,
        target: &InteractionTarget,
        name: &str,
    ) -> Result<Option<String>, FlowError> {
        let success = self
            .act(
                "read_attribute",
                target,
                TargetState::Attached,
                Action::ReadAttribute(name.to_string()),
            )
            .await?;
        Ok(success.value.into_attribute())
    }

    #[instrument(skip_all, fields(target = %target.label(), action_id = field::Empty))]
    pub async fn hover(&self, target: &InteractionTarget) -> Result<(), FlowError> {
        let mut scope = self.begin("hover", Some(target.label()));
        let result = async {
            let locator = self.wait_locator(&mut scope, target, TargetState::Visible).await?;
            self.port.hover(&locator).await?;
            Ok::<(), FlowError>(())
        }
        .await;
        self.finish(scope, result).await
    }

    #[instrument(skip_all, fields(target = %target.label(), action_id = field::Empty))]
    pub async fn scroll_into_view(&self, target: &InteractionTarget) -> Result<(), FlowError> {
        let mut scope = self.begin("scroll_into_view", Some(target.label()));
        let result = async {
            let locator = self
                .wait_locator(&mut scope, target, TargetState::Attached)
                .await?;
            self.port.scroll_into_view(&locator).await?;
            Ok::<(), FlowError>(())
        }
        .await;
        self.finish(scope, result).await
    }

    /// Best-effort click: failures are logged with their full diagnostic and
    /// reported as `false`.
    pub async fn try_click(&self, target: &InteractionTarget) -> bool {
        match self.click(target).await {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    target = %target.label(),
                    kind = err.kind(),
                    retryable = err.as_action().map_or(false, ActionError::is_retryable),
                    error = %err,
                    "best-effort click failed; continuing"
                );
                false
            }
        }
    }

    /// Click the first candidate that is showing and accepts the click.
    ///
    /// Waits until at least one candidate shows, then tries the showing ones
    /// in order. Returns the index of the clicked candidate.
    #[instrument(skip_all, fields(candidates = targets.len(), action_id = field::Empty))]
    pub async fn click_first_available(
        &self,
        targets: &[InteractionTarget],
    ) -> Result<usize, FlowError> {
        let labels: Vec<String> = targets.iter().map(InteractionTarget::label).collect();
        let mut scope = self.begin("click_first_available", Some(labels.join(" | ")));

        let this = self;
        let appeared = self
            .poller()
            .until_value(
                move || async move { this.first_showing(targets).await },
                |found: &Option<usize>| found.is_some(),
            )
            .await;
        debug!(
            polls = appeared.polls(),
            elapsed_ms = appeared.elapsed().as_millis() as u64,
            "candidate scan finished"
        );

        let mut tried = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            if !self.is_showing(target).await {
                tried.push(format!("{} (not showing)", labels[index]));
                continue;
            }
            match self
                .actuator
                .perform_target(&self.resolver, target, &Action::Click)
                .await
            {
                Ok(success) => {
                    info!(candidate = index, target = %labels[index], "clicked candidate");
                    scope.note_strategy(index);
                    scope.note_actuation(&success);
                    return self.finish(scope, Ok(index)).await;
                }
                Err(err) => {
                    warn!(
                        candidate = index,
                        target = %labels[index],
                        error = %err,
                        "candidate rejected click; trying next"
                    );
                    tried.push(format!("{} ({})", labels[index], err.kind()));
                }
            }
        }
        self.finish(scope, Err(FlowError::NoneAvailable { tried }))
            .await
    }

    /// Poll `condition` under the configured poll timing; a timeout is fatal.
    #[instrument(skip_all, fields(description = %description, action_id = field::Empty))]
    pub async fn eventually<F, Fut>(&self, description: &str, condition: F) -> Result<(), FlowError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let scope = self.begin("eventually", Some(description.to_string()));
        let result = self
            .config
            .polling()
            .until(condition)
            .await
            .into_result(description)
            .map(|_| ())
            .map_err(FlowError::from);
        self.finish(scope, result).await
    }

    #[instrument(skip_all, fields(url = %url, action_id = field::Empty))]
    pub async fn navigate(&self, url: &str) -> Result<(), FlowError> {
        let scope = self.begin("navigate", Some(url.to_string()));
        let result = self.port.navigate(url).await.map_err(FlowError::from);
        self.finish(scope, result).await
    }

    /// Wait until the current URL contains `fragment`; returns that URL.
    #[instrument(skip_all, fields(fragment = %fragment, action_id = field::Empty))]
    pub async fn wait_for_url(&self, fragment: &str) -> Result<String, FlowError> {
        let scope = self.begin("wait_for_url", Some(fragment.to_string()));
        let port = &self.port;
        let result = self
            .poller()
            .until_ok(move || async move {
                match port.current_url().await {
                    Ok(url) if url.contains(fragment) => Ok(url),
                    Ok(url) => Err(format!("current url is {}", url)),
                    Err(err) => Err(err.to_string()),
                }
            })
            .await
            .into_result(format!("url contains '{}'", fragment))
            .map_err(FlowError::from);
        self.finish(scope, result).await
    }

    pub async fn press_key(&self, key: &str) -> Result<(), FlowError> {
        let scope = self.begin("press_key", Some(key.to_string()));
        let result = self.port.press_key(key).await.map_err(FlowError::from);
        self.finish(scope, result).await
    }

    pub async fn mouse_wheel(&self, delta_x: f64, delta_y: f64) -> Result<(), FlowError> {
        let scope = self.begin("mouse_wheel", None);
        let result = self
            .port
            .mouse_wheel(delta_x, delta_y)
            .await
            .map_err(FlowError::from);
        self.finish(scope, result).await
    }

    async fn act(
        &self,
        step: &'static str,
        target: &InteractionTarget,
        state: TargetState,
        action: Action,
    ) -> Result<ActionSuccess, FlowError> {
        let mut scope = self.begin(step, Some(target.label()));
        let result = async {
            let report = self.waiter.wait(target, &self.spec(state)).await?;
            scope.note_wait(&report);
            let success = self
                .actuator
                .perform_target(&self.resolver, target, &action)
                .await?;
            scope.note_actuation(&success);
            Ok::<ActionSuccess, FlowError>(success)
        }
        .await;
        self.finish(scope, result).await
    }

    async fn wait_locator(
        &self,
        scope: &mut StepScope,
        target: &InteractionTarget,
        state: TargetState,
    ) -> Result<ElementLocator, FlowError> {
        let report = self.waiter.wait(target, &self.spec(state)).await?;
        scope.note_wait(&report);
        match report.resolution {
            Some(resolution) => Ok(resolution.locator),
            None => Ok(self.resolver.resolve(target).await?.locator),
        }
    }

    async fn first_showing(&self, targets: &[InteractionTarget]) -> Option<usize> {
        for (index, target) in targets.iter().enumerate() {
            if self.is_showing(target).await {
                return Some(index);
            }
        }
        None
    }

    fn begin(&self, step: &'static str, target: Option<String>) -> StepScope {
        let scope = StepScope::begin(step, target);
        Span::current().record("action_id", field::display(scope.action_id()));
        debug!(step, profile = ?self.profile, "step started");
        scope
    }

    pub(crate) async fn finish<T>(
        &self,
        scope: StepScope,
        result: Result<T, FlowError>,
    ) -> Result<T, FlowError> {
        let elapsed = scope.elapsed();
        let record: StepRecord = scope.finish(result.as_ref().err());
        match &result {
            Ok(_) => debug!(step = %record.step, elapsed_ms = elapsed.as_millis() as u64, "step finished"),
            Err(err) => warn!(step = %record.step, error = %err, "step failed"),
        }
        self.events.on_step(&record).await;
        result
    }
}
