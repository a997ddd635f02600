mod common;

use common::{OTHER_SOURCE, engine, engine_with_notices, secs, source, t0};
use vitalsync::core::backfill::{BackfillOrchestrator, BackfillOutcome};
use vitalsync::models::metric::MetricKind;
use vitalsync::models::sync_state::{BackfillState, SyncState};

const KINDS: [MetricKind; 3] = [MetricKind::Weight, MetricKind::BodyFat, MetricKind::Height];

/// Scenario: Backfill imports every designated kind and records completion
#[test]
fn test_backfill_completes_all_kinds() {
    let src = source();
    let mut engine = engine(&src);
    src.push(MetricKind::Weight, 72.0, t0(), None);
    src.push(MetricKind::Weight, 71.8, t0() + secs(86_400), None);
    src.push(MetricKind::BodyFat, 0.21, t0(), None);
    src.push(MetricKind::Height, 178.0, t0(), None);

    let mut state = SyncState::default();
    let outcome = BackfillOrchestrator::new(KINDS)
        .run(&mut engine, &mut state)
        .unwrap();

    assert_eq!(outcome, BackfillOutcome::Completed { inserted: 4 });
    assert_eq!(state.backfill, BackfillState::Completed);
    assert!(engine.database().backfill_complete().unwrap());
}

/// Scenario: One failing kind fails the whole backfill
///   Given body fat cannot be fetched
///   When the backfill runs
///   Then it is reported incomplete and the flag stays unset
///   And the other kinds were still imported
#[test]
fn test_backfill_is_all_or_nothing() {
    let src = source();
    let mut engine = engine(&src);
    src.push(MetricKind::Weight, 72.0, t0(), None);
    src.push(MetricKind::BodyFat, 0.21, t0(), None);
    src.fail(MetricKind::BodyFat);

    let orchestrator = BackfillOrchestrator::new(KINDS);
    let mut state = SyncState::default();
    let outcome = orchestrator.run(&mut engine, &mut state).unwrap();

    assert_eq!(
        outcome,
        BackfillOutcome::Incomplete {
            failed: vec![MetricKind::BodyFat]
        }
    );
    assert!(!outcome.is_complete());
    assert_eq!(state.backfill, BackfillState::NotStarted);
    assert!(!engine.database().backfill_complete().unwrap());
    assert_eq!(engine.database().count_samples(MetricKind::Weight).unwrap(), 1);
}

/// Scenario: A retry after recovery completes without re-inserting
#[test]
fn test_backfill_retry_completes_without_duplicates() {
    let src = source();
    let mut engine = engine(&src);
    src.push(MetricKind::Weight, 72.0, t0(), None);
    src.push(MetricKind::BodyFat, 0.21, t0(), None);
    src.fail(MetricKind::BodyFat);

    let orchestrator = BackfillOrchestrator::new(KINDS);
    let mut state = SyncState::default();
    orchestrator.run(&mut engine, &mut state).unwrap();

    src.recover(MetricKind::BodyFat);
    let outcome = orchestrator.run(&mut engine, &mut state).unwrap();

    assert_eq!(outcome, BackfillOutcome::Completed { inserted: 1 });
    assert!(state.backfill_complete());
    assert_eq!(engine.database().count_samples(MetricKind::Weight).unwrap(), 1);
    assert_eq!(engine.database().count_samples(MetricKind::BodyFat).unwrap(), 1);
}

/// Scenario: A completed backfill never runs again
#[test]
fn test_completed_backfill_is_skipped() {
    let src = source();
    let mut engine = engine(&src);
    let mut state = SyncState::new(true, MetricKind::ALL);

    let outcome = BackfillOrchestrator::new(KINDS)
        .run(&mut engine, &mut state)
        .unwrap();

    assert_eq!(outcome, BackfillOutcome::AlreadyComplete);
    assert!(outcome.is_complete());
    for kind in KINDS {
        assert_eq!(src.batch_fetch_count(kind), 0);
    }
}

/// Scenario: Backfilled history raises no new-sample notices
#[test]
fn test_backfill_does_not_notify() {
    let src = source();
    let (mut engine, notices) = engine_with_notices(&src);
    src.push(MetricKind::Weight, 72.0, t0(), Some(OTHER_SOURCE));

    let mut state = SyncState::default();
    BackfillOrchestrator::new(KINDS)
        .run(&mut engine, &mut state)
        .unwrap();
    assert_eq!(notices.count(), 0);
}
