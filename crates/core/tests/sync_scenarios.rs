//! End-to-end drain scenarios for the sync engine

mod support;

use std::time::Duration;

use support::{input, Harness};
use tether_domain::constants::DEFAULT_DIAGNOSTIC_RETRY_THRESHOLD;
use tether_domain::{
    MutationOutcome, NotificationSeverity, OperationStatus, Reminder, SyncOutcome, SyncSkipReason,
};

fn completed(outcome: SyncOutcome) -> tether_domain::SyncReport {
    match outcome {
        SyncOutcome::Completed { report } => report,
        other => panic!("expected a completed drain, got {other:?}"),
    }
}

#[tokio::test]
async fn offline_create_drains_to_one_remote_row_at_version_one() {
    let h = Harness::new();
    h.go_offline().await;

    let created = h.layer.create_entity(input("r-a", "Pay rent")).await.unwrap();
    assert_eq!(created.outcome, MutationOutcome::Queued);
    assert_eq!(created.value.version, None);
    assert_eq!(h.fallback.queue_len(), 1);
    assert!(h.fallback.get_stored_entity("r-a").is_some());

    h.go_online().await;
    let report = completed(h.layer.trigger_sync().await);

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.remaining, 0);
    assert!(report.fallback_cleared);
    assert_eq!(h.remote.len(), 1);
    assert_eq!(h.remote.row("r-a").unwrap().version, Some(1));
    assert_eq!(h.fallback.get_stored_entity("r-a").unwrap().version, Some(1));
    assert!(!h.fallback.is_fallback_mode());
    assert!(h.fallback.last_sync_at().is_some());
}

#[tokio::test]
async fn two_offline_updates_on_the_same_version_end_at_version_three() {
    let h = Harness::new();
    h.go_online().await;
    let committed = h.layer.create_entity(input("r-b", "Original")).await.unwrap();
    assert_eq!(committed.outcome, MutationOutcome::Committed);
    assert_eq!(committed.value.version, Some(1));

    h.go_offline().await;
    let first = Reminder { title: "First edit".into(), ..committed.value.clone() };
    h.layer.update_entity(first, Some(1)).await.unwrap();
    h.clock.advance(Duration::from_secs(1));
    let second = Reminder { title: "Second edit".into(), ..committed.value.clone() };
    let queued = h.layer.update_entity(second, Some(1)).await.unwrap();
    assert_eq!(queued.outcome, MutationOutcome::Queued);
    assert_eq!(h.fallback.queue_len(), 2);

    h.go_online().await;
    let report = completed(h.sync.sync().await);

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.conflicts_resolved, 1);
    let row = h.remote.row("r-b").unwrap();
    assert_eq!(row.version, Some(3));
    assert_eq!(row.title, "Second edit");
}

#[tokio::test]
async fn offline_create_then_delete_replays_both() {
    let h = Harness::new();
    h.go_offline().await;

    h.layer.create_entity(input("r-c", "Temporary")).await.unwrap();
    let deleted = h.layer.delete_entity("r-c").await.unwrap();
    assert_eq!(deleted.outcome, MutationOutcome::Queued);
    assert!(deleted.value);
    assert!(h.fallback.get_stored_entity("r-c").is_none());
    assert_eq!(h.fallback.queue_len(), 2);

    h.go_online().await;
    let report = completed(h.sync.sync().await);

    assert_eq!(report.succeeded, 2);
    assert_eq!(h.remote.calls("create"), 1);
    assert_eq!(h.remote.calls("delete"), 1);
    assert_eq!(h.remote.len(), 0);
}

#[tokio::test]
async fn replayed_create_is_skipped_when_the_remote_already_has_it() {
    let h = Harness::new();
    h.go_offline().await;
    let queued = h.layer.create_entity(input("r-d", "Dentist")).await.unwrap();

    h.remote.seed(Reminder { version: Some(1), ..queued.value });

    h.go_online().await;
    let report = completed(h.sync.sync().await);

    assert_eq!(report.succeeded, 1);
    assert_eq!(h.remote.calls("create"), 0);
    assert_eq!(h.remote.len(), 1);
    assert_eq!(h.fallback.get_stored_entity("r-d").unwrap().version, Some(1));
}

#[tokio::test]
async fn queue_survives_a_restart() {
    let h = Harness::new();
    h.go_offline().await;
    let first = h.layer.create_entity(input("r-e", "Water plants")).await.unwrap();
    h.layer.create_entity(input("r-k", "Feed the cat")).await.unwrap();
    let edited = Reminder { title: "Water the ferns".into(), ..first.value };
    h.layer.update_entity(edited, None).await.unwrap();

    let before: Vec<String> = h.fallback.operation_queue().into_iter().map(|op| op.id).collect();
    assert_eq!(before.len(), 3);
    // Interrupted mid-drain: two operations are claimed when the process dies.
    let claimed = h.fallback.dequeue_ready_operations(2);
    assert_eq!(claimed.len(), 2);

    let restarted = Harness::with_parts(h.clock.clone(), h.remote.clone(), h.kv.clone());
    let queue = restarted.fallback.operation_queue();
    assert_eq!(queue.iter().map(|op| op.id.clone()).collect::<Vec<_>>(), before);
    assert_eq!(
        queue.iter().map(|op| op.entity_id()).collect::<Vec<_>>(),
        vec!["r-e", "r-k", "r-e"]
    );
    assert!(queue.iter().all(|op| op.status == OperationStatus::Pending));
    assert!(restarted.fallback.is_fallback_mode());
    assert!(restarted.fallback.get_stored_entity("r-e").is_some());

    restarted.go_online().await;
    let report = completed(restarted.sync.sync().await);
    assert_eq!(report.succeeded, 3);
    assert!(report.fallback_cleared);
    assert_eq!(restarted.remote.row("r-e").unwrap().title, "Water the ferns");
    assert_eq!(restarted.remote.row("r-k").unwrap().version, Some(1));
}

#[tokio::test]
async fn drain_dropped_mid_replay_leaves_nothing_claimed() {
    let h = Harness::new();
    h.go_offline().await;
    h.layer.create_entity(input("r-x", "Slow create")).await.unwrap();
    h.layer.create_entity(input("r-y", "Waiting behind it")).await.unwrap();
    h.go_online().await;
    h.remote.set_latency(Duration::from_millis(200));

    let timed_out = tokio::time::timeout(Duration::from_millis(50), h.sync.sync()).await;
    assert!(timed_out.is_err());
    assert!(!h.sync.is_syncing());

    let queue = h.fallback.operation_queue();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].entity_id(), "r-x");
    assert_eq!(queue[0].status, OperationStatus::Failed);
    assert_eq!(queue[0].retry_count, 1);
    assert_eq!(queue[1].entity_id(), "r-y");
    assert_eq!(queue[1].status, OperationStatus::Pending);
    assert_eq!(queue[1].retry_count, 0);

    h.remote.set_latency(Duration::ZERO);
    h.clock.advance(Duration::from_secs(3600));
    let report = completed(h.sync.sync().await);
    assert_eq!(report.claimed, 2);
    assert_eq!(report.succeeded, 2);
    assert!(report.fallback_cleared);
    assert_eq!(h.remote.len(), 2);
}

#[tokio::test]
async fn failed_operation_backs_off_and_blocks_its_entity() {
    let h = Harness::new();
    h.go_offline().await;
    let created = h.layer.create_entity(input("r-f", "Call mom")).await.unwrap();
    let edited = Reminder { title: "Call mom back".into(), ..created.value };
    h.layer.update_entity(edited, None).await.unwrap();

    h.probe.set_up(true);
    assert!(h.monitor.force_reconnect().await);
    let report = completed(h.sync.sync().await);

    assert_eq!(report.failed, 1);
    assert_eq!(report.released, 1);
    assert!(report.pull_error.is_some());
    assert!(!report.fallback_cleared);
    assert!(h.fallback.is_fallback_mode());
    assert!(h.notifier.count(NotificationSeverity::Warning) >= 1);

    let queue = h.fallback.operation_queue();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].retry_count, 1);
    assert_eq!(queue[0].status, OperationStatus::Failed);
    assert!(queue[0].last_error.is_some());
    assert_eq!(queue[1].retry_count, 0);
    assert_eq!(queue[1].status, OperationStatus::Pending);

    h.remote.set_failing(false);
    let waiting = completed(h.sync.sync().await);
    assert_eq!(waiting.claimed, 0);
    assert_eq!(waiting.remaining, 2);

    h.clock.advance(Duration::from_secs(2));
    let report = completed(h.sync.sync().await);
    assert_eq!(report.succeeded, 2);
    assert!(report.fallback_cleared);
    assert_eq!(h.remote.row("r-f").unwrap().title, "Call mom back");
}

#[tokio::test]
async fn repeated_failures_raise_one_error_notification_at_the_threshold() {
    let h = Harness::new();
    h.go_offline().await;
    h.layer.create_entity(input("r-t", "Stuck forever")).await.unwrap();
    h.probe.set_up(true);
    assert!(h.monitor.force_reconnect().await);

    let threshold = DEFAULT_DIAGNOSTIC_RETRY_THRESHOLD;
    for attempt in 1..=threshold + 1 {
        let report = completed(h.sync.sync().await);
        assert_eq!(report.failed, 1, "attempt {attempt}");
        let expected_errors = usize::from(attempt >= threshold);
        let errors = h.notifier.count(NotificationSeverity::Error);
        assert_eq!(errors, expected_errors, "attempt {attempt}");
        h.clock.advance(Duration::from_secs(3600));
    }

    let queue = h.fallback.operation_queue();
    assert_eq!(queue[0].retry_count, threshold + 1);
    assert_eq!(h.notifier.count(NotificationSeverity::Error), 1);
}

#[tokio::test]
async fn queued_update_for_a_remotely_deleted_reminder_is_dropped() {
    let h = Harness::new();
    h.go_online().await;
    let committed = h.layer.create_entity(input("r-g", "Gym")).await.unwrap();

    h.go_offline().await;
    let edited = Reminder { title: "Gym at 7".into(), ..committed.value };
    h.layer.update_entity(edited, Some(1)).await.unwrap();

    h.go_online().await;
    assert!(h.remote.delete_row("r-g"));
    let report = completed(h.sync.sync().await);

    assert_eq!(report.dropped, 1);
    assert_eq!(report.remaining, 0);
    assert!(h.fallback.get_stored_entity("r-g").is_none());
}

#[tokio::test]
async fn sync_is_skipped_while_disconnected_or_outside_fallback() {
    let h = Harness::new();
    h.go_offline().await;
    assert_eq!(
        h.sync.sync().await,
        SyncOutcome::Skipped { reason: SyncSkipReason::Disconnected }
    );

    h.go_online().await;
    assert_eq!(
        h.sync.sync().await,
        SyncOutcome::Skipped { reason: SyncSkipReason::NotInFallback }
    );
}

#[tokio::test]
async fn overlapping_sync_returns_already_in_progress() {
    let h = Harness::new();
    h.go_offline().await;
    h.layer.create_entity(input("r-h", "Slow network")).await.unwrap();
    h.go_online().await;
    h.remote.set_latency(Duration::from_millis(50));

    let (first, second) = tokio::join!(h.sync.sync(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.sync.sync().await
    });

    assert!(matches!(first, SyncOutcome::Completed { .. }));
    assert_eq!(second, SyncOutcome::AlreadyInProgress);
    assert!(!h.sync.is_syncing());
    assert_eq!(h.remote.calls("create"), 1);
}

#[tokio::test]
async fn delta_pull_refreshes_cache_but_keeps_queued_local_copies() {
    let h = Harness::new();
    h.go_offline().await;
    h.layer.create_entity(input("r-i", "First")).await.unwrap();
    h.go_online().await;
    completed(h.sync.sync().await);

    let mut other = h.remote.row("r-i").unwrap();
    h.clock.advance(Duration::from_secs(5));
    other.title = "Edited elsewhere".into();
    other.version = Some(2);
    h.remote.seed(other);

    h.go_offline().await;
    h.layer.create_entity(input("r-j", "Second")).await.unwrap();
    h.go_online().await;
    let report = completed(h.sync.sync().await);

    assert!(h.remote.calls("query_updated_since") >= 1);
    assert!(report.pulled >= 1);
    assert_eq!(h.fallback.get_stored_entity("r-i").unwrap().title, "Edited elsewhere");
    assert_eq!(h.fallback.get_stored_entity("r-j").unwrap().version, Some(1));
}
