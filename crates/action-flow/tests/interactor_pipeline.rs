use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use action_flow::{FlowError, Interactor, RecordingEvents};
use action_primitives::{ActionError, InteractionConfig};
use cdp_adapter::{ClickEffect, FakeElement, InMemoryPage};
use twizz_core_types::{ActuationMethod, InteractionTarget, SelectorStrategy, TargetState};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn interactor(page: &Arc<InMemoryPage>, events: &RecordingEvents) -> Interactor {
    Interactor::new(page.clone(), InteractionConfig::default()).with_events(Arc::new(events.clone()))
}

fn button(name: &str) -> InteractionTarget {
    InteractionTarget::new(SelectorStrategy::role("button", name))
}

#[tokio::test(start_paused = true)]
async fn click_escalates_past_overlay_and_records_step() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("delete")
            .role("button", "Delete")
            .covered_by(".toast-overlay"),
    ));
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events);

    let success = ui.click(&button("Delete")).await.unwrap();

    assert_eq!(success.attempts, 3);
    assert_eq!(success.method, ActuationMethod::Force);
    let records = events.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.step, "click");
    assert!(record.ok);
    assert_eq!(record.attempts, Some(3));
    assert_eq!(record.method, Some(ActuationMethod::Force));
    assert_eq!(record.strategy_index, Some(0));
    assert_eq!(record.latency_ms, 400);
}

#[tokio::test(start_paused = true)]
async fn fallback_strategy_is_reported_in_step() {
    let page = Arc::new(InMemoryPage::new().with(FakeElement::new("save").text("Save changes")));
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events);
    let target = button("Save")
        .or(SelectorStrategy::text("Save changes"))
        .labelled("save button");

    ui.click(&target).await.unwrap();

    let record = &events.records()[0];
    assert_eq!(record.target.as_deref(), Some("save button"));
    assert_eq!(record.strategy_index, Some(1));
    assert_eq!(page.actuations()[0].key, "save");
}

#[tokio::test(start_paused = true)]
async fn quick_profile_times_out_after_five_seconds() {
    let page = Arc::new(InMemoryPage::new());
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events).with_profile("quick").unwrap();
    assert_eq!(ui.profile(), Some("quick"));

    let err = ui.click(&button("Publish")).await.unwrap_err();

    match &err {
        FlowError::Action(ActionError::WaitTimeout { elapsed, state, .. }) => {
            assert_eq!(*state, TargetState::Visible);
            assert_eq!(*elapsed, Duration::from_secs(5));
        }
        other => panic!("unexpected error {other:?}"),
    }
    let failures = events.failures();
    assert_eq!(failures.len(), 1);
    let error = failures[0].error.as_ref().expect("error summary");
    assert_eq!(error.kind, "wait_timeout");
    assert!(error.message.contains("role=button"));
}

#[tokio::test(start_paused = true)]
async fn unknown_profile_is_rejected() {
    let page = Arc::new(InMemoryPage::new());
    let ui = Interactor::new(page, InteractionConfig::default());
    let err = ui.with_profile("glacial").err().expect("unknown profile");
    assert_eq!(err, FlowError::UnknownProfile("glacial".into()));
}

#[tokio::test(start_paused = true)]
async fn fill_and_read_attribute_go_through_pipeline() {
    let page = Arc::new(
        InMemoryPage::new()
            .with(
                FakeElement::new("title")
                    .css("input[name=title]")
                    .visible_after(ms(300)),
            )
            .with(
                FakeElement::new("home")
                    .role("link", "Home")
                    .attribute("href", "/home")
                    .hidden(),
            ),
    );
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events);

    ui.fill(
        &InteractionTarget::new(SelectorStrategy::css("input[name=title]")),
        "Weekend picks",
    )
    .await
    .unwrap();
    let href = ui
        .read_attribute(
            &InteractionTarget::new(SelectorStrategy::role("link", "Home")),
            "href",
        )
        .await
        .unwrap();
    let missing = ui
        .read_attribute(
            &InteractionTarget::new(SelectorStrategy::role("link", "Home")),
            "target",
        )
        .await
        .unwrap();

    assert_eq!(page.value_of("title").as_deref(), Some("Weekend picks"));
    assert_eq!(href.as_deref(), Some("/home"));
    assert_eq!(missing, None);
    assert_eq!(events.steps(), vec!["fill", "read_attribute", "read_attribute"]);
    assert!(events.records()[0].latency_ms >= 300);
}

#[tokio::test(start_paused = true)]
async fn hidden_file_input_gets_files_by_escalating() {
    let page = Arc::new(
        InMemoryPage::new().with(FakeElement::new("upload").css("input[type=file]").hidden()),
    );
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events).with_profile("upload").unwrap();
    let files = vec![PathBuf::from("fixtures/cover.png")];

    let success = ui
        .set_files(
            &InteractionTarget::new(SelectorStrategy::css("input[type=file]")),
            files.clone(),
        )
        .await
        .unwrap();

    assert_eq!(success.method, ActuationMethod::Force);
    assert_eq!(page.files_of("upload"), files);
}

#[tokio::test(start_paused = true)]
async fn try_click_reports_false_and_keeps_diagnostics() {
    let page = Arc::new(InMemoryPage::new());
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events).with_profile("quick").unwrap();

    let clicked = ui.try_click(&button("Dismiss")).await;

    assert!(!clicked);
    let failures = events.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].step, "click");
}

#[tokio::test(start_paused = true)]
async fn click_first_available_skips_absent_candidates() {
    let page = Arc::new(
        InMemoryPage::new().with(
            FakeElement::new("later")
                .role("button", "Not now")
                .attached_after(ms(300)),
        ),
    );
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events);
    let candidates = vec![button("Close"), button("Not now")];

    let chosen = ui.click_first_available(&candidates).await.unwrap();

    assert_eq!(chosen, 1);
    assert_eq!(page.actuations()[0].key, "later");
    let record = events.records().pop().expect("record");
    assert_eq!(record.step, "click_first_available");
    assert!(record.latency_ms >= 300);
}

#[tokio::test(start_paused = true)]
async fn click_first_available_fails_when_nothing_shows() {
    let page = Arc::new(InMemoryPage::new());
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events).with_profile("quick").unwrap();

    let err = ui
        .click_first_available(&[button("Close"), button("Not now")])
        .await
        .unwrap_err();

    match err {
        FlowError::NoneAvailable { tried } => assert_eq!(tried.len(), 2),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn navigation_by_click_is_awaited_by_url() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("dashboard")
            .role("link", "Dashboard")
            .on_click(ClickEffect::Navigate {
                url: "https://app.test/dashboard".into(),
            }),
    ));
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events);

    ui.navigate("https://app.test/login").await.unwrap();
    ui.click(&InteractionTarget::new(SelectorStrategy::role("link", "Dashboard")))
        .await
        .unwrap();
    let url = ui.wait_for_url("/dashboard").await.unwrap();

    assert_eq!(url, "https://app.test/dashboard");
    assert_eq!(events.steps(), vec!["navigate", "click", "wait_for_url"]);
}

#[tokio::test(start_paused = true)]
async fn url_wait_times_out_with_last_url() {
    let page = Arc::new(InMemoryPage::new());
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events).with_profile("quick").unwrap();

    let err = ui.wait_for_url("/settings").await.unwrap_err();

    match &err {
        FlowError::Action(ActionError::PollTimeout {
            last_error,
            elapsed,
            ..
        }) => {
            assert_eq!(last_error.as_deref(), Some("current url is about:blank"));
            assert_eq!(*elapsed, Duration::from_secs(5));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn page_level_operations_reach_the_port() {
    let page = Arc::new(
        InMemoryPage::new()
            .with(FakeElement::new("menu").role("button", "Menu"))
            .with(FakeElement::new("footer").css("footer").hidden()),
    );
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events);

    ui.hover(&button("Menu")).await.unwrap();
    ui.scroll_into_view(&InteractionTarget::new(SelectorStrategy::css("footer")))
        .await
        .unwrap();
    ui.press_key("Escape").await.unwrap();
    ui.mouse_wheel(0.0, 480.0).await.unwrap();

    assert_eq!(page.hovered(), vec!["menu".to_string()]);
    assert_eq!(page.scrolled(), vec!["footer".to_string()]);
    assert_eq!(page.pressed_keys(), vec!["Escape".to_string()]);
    assert_eq!(page.wheel_events(), vec![(0.0, 480.0)]);
    assert_eq!(
        events.steps(),
        vec!["hover", "scroll_into_view", "press_key", "mouse_wheel"]
    );
    assert_eq!(events.to_json().as_array().map(Vec::len), Some(4));
}

#[tokio::test(start_paused = true)]
async fn eventually_and_is_showing_track_page_state() {
    let page = Arc::new(InMemoryPage::new().with(
        FakeElement::new("toast")
            .text("Saved")
            .visible_after(ms(600)),
    ));
    let events = RecordingEvents::new();
    let ui = interactor(&page, &events);
    let toast = InteractionTarget::new(SelectorStrategy::text("Saved"));

    assert!(!ui.is_showing(&toast).await);
    let probe = &ui;
    let toast_ref = &toast;
    ui.eventually("toast shows", move || async move {
        probe.is_showing(toast_ref).await
    })
    .await
    .unwrap();
    assert!(ui.is_showing(&toast).await);

    let resolution = ui.resolve(&toast).await.unwrap();
    assert!(resolution.visible());
    assert_eq!(events.steps(), vec!["eventually", "resolve"]);
}
