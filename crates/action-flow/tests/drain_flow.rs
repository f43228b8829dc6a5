use std::sync::Arc;
use std::time::Duration;

use action_flow::{DrainLimits, DrainStop, FlowError, Interactor, RecordingEvents};
use action_primitives::InteractionConfig;
use cdp_adapter::{ClickEffect, FakeElement, InMemoryPage};
use twizz_core_types::{InteractionTarget, SelectorStrategy};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// A row plus a delete button that removes both `settle` after a click.
fn deletable_row(page: InMemoryPage, id: usize, settle: Duration) -> InMemoryPage {
    let row = format!("row-{id}");
    let delete = format!("delete-{id}");
    page.with(FakeElement::new(&row).css(".row").text(format!("Item {id}")))
        .with(
            FakeElement::new(&delete)
                .role("button", "Delete")
                .child_of(&row)
                .on_click(ClickEffect::Remove {
                    key: row.clone(),
                    after: settle,
                })
                .on_click(ClickEffect::Remove {
                    key: delete.clone(),
                    after: settle,
                }),
        )
}

fn rows() -> InteractionTarget {
    InteractionTarget::new(SelectorStrategy::css(".row")).labelled("saved items")
}

fn first_delete() -> InteractionTarget {
    InteractionTarget::new(SelectorStrategy::role("button", "Delete")).first()
}

#[tokio::test(start_paused = true)]
async fn drain_removes_every_row() {
    let mut page = InMemoryPage::new();
    for id in 0..3 {
        page = deletable_row(page, id, ms(250));
    }
    let page = Arc::new(page);
    let events = RecordingEvents::new();
    let ui = Interactor::new(page.clone(), InteractionConfig::default())
        .with_events(Arc::new(events.clone()));
    let items = rows();
    let delete = first_delete();

    let driver = &ui;
    let delete_ref = &delete;
    let report = ui
        .drain_until_empty(
            &items,
            move |_| async move { driver.click(delete_ref).await.map(|_| ()) },
            &DrainLimits::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.initial, 3);
    assert_eq!(report.removed, 3);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.stalls, 0);
    assert_eq!(report.stopped, DrainStop::Empty);
    assert_eq!(ui.count(&items).await.unwrap(), 0);
    assert_eq!(page.actuations().len(), 3);

    let steps = events.steps();
    assert_eq!(steps.last().map(String::as_str), Some("drain_until_empty"));
    assert_eq!(steps.iter().filter(|s| *s == "click").count(), 3);
}

#[tokio::test(start_paused = true)]
async fn empty_list_needs_no_iterations() {
    let page = Arc::new(InMemoryPage::new());
    let ui = Interactor::new(page, InteractionConfig::default());

    let report = ui
        .drain_until_empty(
            &rows(),
            |_| async { Err::<(), _>(FlowError::UnknownProfile("unused".into())) },
            &DrainLimits::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.iterations, 0);
    assert_eq!(report.stopped, DrainStop::Empty);
}

#[tokio::test(start_paused = true)]
async fn stuck_row_aborts_after_tolerated_stalls() {
    let page = Arc::new(
        InMemoryPage::new()
            .with(FakeElement::new("row").css(".row"))
            .with(FakeElement::new("delete").role("button", "Delete")),
    );
    let ui = Interactor::new(page.clone(), InteractionConfig::default());
    let limits = DrainLimits::default()
        .with_max_stalls(2)
        .with_settle_timeout(ms(500));
    let delete = first_delete();

    let driver = &ui;
    let delete_ref = &delete;
    let err = ui
        .drain_until_empty(
            &rows(),
            move |_| async move { driver.click(delete_ref).await.map(|_| ()) },
            &limits,
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FlowError::DrainStalled {
            target: "saved items".into(),
            stalls: 3,
            remaining: 1,
        }
    );
    assert_eq!(page.actuations().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failed_removal_counts_as_stall_then_recovers() {
    let page = Arc::new(deletable_row(InMemoryPage::new(), 0, ms(100)));
    let ui = Interactor::new(page.clone(), InteractionConfig::default());
    let delete = first_delete();

    let driver = &ui;
    let delete_ref = &delete;
    let report = ui
        .drain_until_empty(
            &rows(),
            move |iteration| async move {
                if iteration == 1 {
                    return Err(FlowError::UnknownProfile("flaky".into()));
                }
                driver.click(delete_ref).await.map(|_| ())
            },
            &DrainLimits::default(),
        )
        .await
        .unwrap();

    assert_eq!(report.iterations, 2);
    assert_eq!(report.stalls, 1);
    assert_eq!(report.removed, 1);
}

#[tokio::test(start_paused = true)]
async fn iteration_bound_stops_runaway_lists() {
    let mut page = InMemoryPage::new();
    for id in 0..5 {
        page = deletable_row(page, id, ms(50));
    }
    let page = Arc::new(page);
    let ui = Interactor::new(page.clone(), InteractionConfig::default());
    let delete = first_delete();

    let driver = &ui;
    let delete_ref = &delete;
    let err = ui
        .drain_until_empty(
            &rows(),
            move |_| async move { driver.click(delete_ref).await.map(|_| ()) },
            &DrainLimits::default().with_max_iterations(2),
        )
        .await
        .unwrap_err();

    match err {
        FlowError::DrainExhausted {
            iterations,
            remaining,
            ..
        } => {
            assert_eq!(iterations, 2);
            assert_eq!(remaining, 3);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn empty_state_marker_ends_drain() {
    let page = Arc::new(
        InMemoryPage::new()
            .with(FakeElement::new("template").css(".row").hidden())
            .with(FakeElement::new("placeholder").text("No saved items yet")),
    );
    let ui = Interactor::new(page.clone(), InteractionConfig::default());
    let limits = DrainLimits::default().with_empty_state(InteractionTarget::new(
        SelectorStrategy::text("No saved items yet"),
    ));

    let report = ui
        .drain_until_empty(
            &rows(),
            |_| async { Ok::<(), FlowError>(()) },
            &limits,
        )
        .await
        .unwrap();

    assert_eq!(report.stopped, DrainStop::EmptyState);
    assert_eq!(report.iterations, 0);
    assert_eq!(report.initial, 1);
    assert!(page.actuations().is_empty());
}
