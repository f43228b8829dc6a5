use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use action_locator::FallbackResolver;
use action_primitives::{
    ActionError, ActionOutcome, Observation, PollingAssertion, RetryPolicy, RetryingActuator,
    VisibilityWaiter, WaitSpec,
};
use async_trait::async_trait;
use cdp_adapter::{FakeElement, InMemoryPage};
use twizz_core_types::{
    Action, ActionValue, ActuationMethod, BrowserPort, ElementLocator, ElementSnapshot,
    InteractionTarget, ProviderError, ProviderErrorKind, SelectorStrategy, TargetState,
};

fn waiter(page: &Arc<InMemoryPage>) -> VisibilityWaiter {
    VisibilityWaiter::new(FallbackResolver::new(page.clone()))
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[tokio::test(start_paused = true)]
async fn waiter_returns_when_element_becomes_visible() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("toast")
            .text("Saved")
            .visible_after(ms(700)),
    ));
    let target = InteractionTarget::new(SelectorStrategy::text("Saved"));

    let report = waiter(&page)
        .wait(&target, &WaitSpec::visible(Duration::from_secs(2)))
        .await
        .unwrap();

    assert!(report.elapsed >= ms(700), "returned before visible: {:?}", report.elapsed);
    assert!(report.elapsed <= ms(800));
    assert_eq!(report.strategy_index(), Some(0));
}

#[tokio::test(start_paused = true)]
async fn waiter_times_out_at_deadline_with_last_observation() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("panel")
            .css(".panel")
            .visible_after(Duration::from_secs(5)),
    ));
    let target = InteractionTarget::new(SelectorStrategy::css(".panel"));

    let err = waiter(&page)
        .wait(&target, &WaitSpec::visible(Duration::from_secs(1)))
        .await
        .unwrap_err();

    match err {
        ActionError::WaitTimeout {
            state,
            elapsed,
            last,
            ..
        } => {
            assert_eq!(state, TargetState::Visible);
            assert!(elapsed >= Duration::from_secs(1));
            assert!(elapsed < ms(1100));
            assert_eq!(
                last,
                Observation::WrongState {
                    strategy_index: 0,
                    snapshot: ElementSnapshot::new(false, true),
                }
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn detached_wait_succeeds_when_element_is_removed() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("spinner")
            .css(".spinner")
            .detached_after(ms(500)),
    ));
    let target = InteractionTarget::new(SelectorStrategy::css(".spinner"));

    let report = waiter(&page)
        .wait(&target, &WaitSpec::detached(Duration::from_secs(2)))
        .await
        .unwrap();

    assert!(report.elapsed >= ms(500));
    assert!(report.elapsed <= ms(650));
    assert!(report.resolution.is_none());
}

#[tokio::test(start_paused = true)]
async fn missing_target_times_out_with_not_found() {
    let page = Arc::new(InMemoryPage::new());
    let target = InteractionTarget::new(SelectorStrategy::css(".never"))
        .or(SelectorStrategy::text("Never"));

    let err = waiter(&page)
        .wait(&target, &WaitSpec::attached(ms(300)))
        .await
        .unwrap_err();

    match &err {
        ActionError::WaitTimeout {
            last: Observation::NotFound { attempts },
            ..
        } => assert_eq!(attempts.len(), 2),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("waiting for css=.never to be attached"));
}

#[tokio::test(start_paused = true)]
async fn enabled_wait_sees_state_change() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("submit")
            .role("button", "Publish")
            .disabled(),
    ));
    let target = InteractionTarget::new(SelectorStrategy::role("button", "Publish"));

    let toggler = page.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ms(350)).await;
        toggler.set_enabled("submit", true);
    });

    let report = waiter(&page)
        .wait(&target, &WaitSpec::enabled(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(report.elapsed >= ms(350));
    assert!(report.elapsed <= ms(450));
}

#[tokio::test(start_paused = true)]
async fn overlay_forces_escalation_to_force_click() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("delete")
            .role("button", "Delete")
            .covered_by(".toast-overlay"),
    ));
    let actuator = RetryingActuator::new(page.clone(), RetryPolicy::new(3));
    let locator = ElementLocator::new(SelectorStrategy::role("button", "Delete"), 0);

    let success = actuator.perform(&locator, &Action::Click).await.unwrap();

    assert_eq!(success.attempts, 3);
    assert_eq!(success.method, ActuationMethod::Force);
    assert_eq!(success.failures.len(), 2);
    assert!(success
        .failures
        .iter()
        .all(|f| f.method == ActuationMethod::Standard));
    assert_eq!(success.elapsed, ms(400));

    let methods: Vec<_> = page.actuations().iter().map(|a| a.method).collect();
    assert_eq!(
        methods,
        vec![
            ActuationMethod::Standard,
            ActuationMethod::Standard,
            ActuationMethod::Force
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn transient_failures_succeed_on_nth_attempt() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("name")
            .css("input[name=name]")
            .failing(3),
    ));
    let actuator = RetryingActuator::new(page.clone(), RetryPolicy::new(5).with_delay(ms(50)));
    let locator = ElementLocator::new(SelectorStrategy::css("input[name=name]"), 0);

    let outcome = actuator
        .attempt(&locator, &Action::Fill("Weekend picks".into()))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 4);
    assert_eq!(page.value_of("name").as_deref(), Some("Weekend picks"));
}

#[tokio::test(start_paused = true)]
async fn exhaustion_records_exactly_max_attempts() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("stuck")
            .css("#stuck")
            .covered_by(".modal")
            .rejecting(ActuationMethod::Force)
            .rejecting(ActuationMethod::Script),
    ));
    let actuator = RetryingActuator::new(page.clone(), RetryPolicy::new(4));
    let locator = ElementLocator::new(SelectorStrategy::css("#stuck"), 0);

    let outcome = actuator.attempt(&locator, &Action::Click).await;
    match &outcome {
        ActionOutcome::Failed { attempts, elapsed } => {
            assert_eq!(attempts.len(), 4);
            let numbers: Vec<_> = attempts.iter().map(|a| a.attempt).collect();
            assert_eq!(numbers, vec![1, 2, 3, 4]);
            assert_eq!(attempts[3].method, ActuationMethod::Force);
            assert_eq!(*elapsed, ms(600));
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let err = outcome.into_result("stuck button", &Action::Click).unwrap_err();
    match &err {
        ActionError::ActuationFailed { failures, .. } => assert_eq!(failures.len(), 4),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("'.modal' intercepts pointer events"));
}

#[tokio::test(start_paused = true)]
async fn target_actuation_picks_up_rerendered_element() {
    let page = Arc::new(
        InMemoryPage::new()
            .with(
                FakeElement::new("old")
                    .role("button", "Continue")
                    .detached_after(ms(100))
                    .failing(1),
            )
            .with(
                FakeElement::new("new")
                    .text("Continue")
                    .attached_after(ms(100)),
            ),
    );
    let resolver = FallbackResolver::new(page.clone());
    let actuator = RetryingActuator::new(page.clone(), RetryPolicy::new(3));
    let target = InteractionTarget::new(SelectorStrategy::role("button", "Continue"))
        .or(SelectorStrategy::text("Continue"));

    let success = actuator
        .perform_target(&resolver, &target, &Action::Click)
        .await
        .unwrap();

    assert_eq!(success.attempts, 2);
    let keys: Vec<_> = page.actuations().into_iter().map(|a| a.key).collect();
    assert_eq!(keys, vec!["old".to_string(), "new".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn list_emptying_satisfies_count_poll() {
    let page = Arc::new(
        InMemoryPage::new()
            .with(FakeElement::new("a").css(".item").detached_after(ms(400)))
            .with(FakeElement::new("b").css(".item").detached_after(ms(800)))
            .with(FakeElement::new("c").css(".item").detached_after(ms(1200))),
    );
    let resolver = FallbackResolver::new(page.clone());
    let items = InteractionTarget::new(SelectorStrategy::css(".item"));
    let poll = PollingAssertion::new(Duration::from_secs(3), ms(150));

    let resolver = &resolver;
    let items = &items;
    let result = poll
        .until_value(
            move || async move { resolver.count(items).await },
            |count| matches!(count, Ok(0)),
        )
        .await;

    assert!(result.is_satisfied());
    assert!(result.elapsed() >= ms(1200));
    assert!(result.elapsed() <= ms(1350));
}

/// Port whose first actuation hangs past the per-attempt sub-timeout.
struct HangingPort {
    inner: InMemoryPage,
    calls: AtomicU32,
}

#[async_trait]
impl BrowserPort for HangingPort {
    async fn count(&self, strategy: &SelectorStrategy) -> Result<usize, ProviderError> {
        self.inner.count(strategy).await
    }

    async fn snapshot(
        &self,
        locator: &ElementLocator,
    ) -> Result<Option<ElementSnapshot>, ProviderError> {
        self.inner.snapshot(locator).await
    }

    async fn actuate(
        &self,
        locator: &ElementLocator,
        action: &Action,
        method: ActuationMethod,
    ) -> Result<ActionValue, ProviderError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        self.inner.actuate(locator, action, method).await
    }

    async fn scroll_into_view(&self, locator: &ElementLocator) -> Result<(), ProviderError> {
        self.inner.scroll_into_view(locator).await
    }

    async fn hover(&self, locator: &ElementLocator) -> Result<(), ProviderError> {
        self.inner.hover(locator).await
    }

    async fn navigate(&self, url: &str) -> Result<(), ProviderError> {
        self.inner.navigate(url).await
    }

    async fn current_url(&self) -> Result<String, ProviderError> {
        self.inner.current_url().await
    }

    async fn mouse_wheel(&self, delta_x: f64, delta_y: f64) -> Result<(), ProviderError> {
        self.inner.mouse_wheel(delta_x, delta_y).await
    }

    async fn press_key(&self, key: &str) -> Result<(), ProviderError> {
        self.inner.press_key(key).await
    }
}

#[tokio::test(start_paused = true)]
async fn hung_attempt_is_cut_by_sub_timeout() {
    let port = Arc::new(HangingPort {
        inner: InMemoryPage::new().with(FakeElement::new("ok").css("#ok")),
        calls: AtomicU32::new(0),
    });
    let policy = RetryPolicy::new(2).with_attempt_timeout(Duration::from_secs(1));
    let actuator = RetryingActuator::new(port, policy);
    let locator = ElementLocator::new(SelectorStrategy::css("#ok"), 0);

    let success = actuator.perform(&locator, &Action::Click).await.unwrap();

    assert_eq!(success.attempts, 2);
    assert_eq!(success.failures[0].error.kind, ProviderErrorKind::Timeout);
    assert_eq!(success.elapsed, ms(1200));
}
