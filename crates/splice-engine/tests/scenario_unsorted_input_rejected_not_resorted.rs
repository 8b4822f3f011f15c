use chrono::Duration;
use splice_engine::{reconcile, ReconcileError, ReconcileOptions};
use splice_testkit::{base_instant, hourly_rows, MemoryAnchorStore};

#[test]
fn scenario_unsorted_series_is_rejected() {
    let t = base_instant();
    let mut store = MemoryAnchorStore::new();
    store.insert("sensor.energy", t - Duration::hours(2), 0.0, 0.0);

    let mut rows = hourly_rows("sensor.energy", t, &[1.0, 2.0, 3.0]);
    rows.swap(0, 1);

    let err = reconcile(&rows, &store, ReconcileOptions::default()).unwrap_err();
    match err {
        ReconcileError::UnsortedInput { series_id, .. } => assert_eq!(series_id, "sensor.energy"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn scenario_resorting_scrambled_input_restores_the_original_output() {
    // Scrambling a valid ascending input and re-sorting it before calling
    // the engine must yield exactly the output of the original call.
    let t = base_instant();
    let mut store = MemoryAnchorStore::new();
    store.insert("sensor.energy", t - Duration::hours(2), 7.0, 7.0);

    let sorted = hourly_rows("sensor.energy", t, &[1.5, -0.5, 2.0, 4.25]);
    let baseline = reconcile(&sorted, &store, ReconcileOptions::default()).unwrap();

    let mut scrambled = sorted.clone();
    scrambled.swap(0, 3);
    scrambled.swap(1, 2);
    scrambled.sort_by_key(|r| r.at);

    let resorted = reconcile(&scrambled, &store, ReconcileOptions::default()).unwrap();
    assert_eq!(baseline, resorted);
}
