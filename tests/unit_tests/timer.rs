use fem_miniapp::timer::{timings, Timer, TimingSummary};
use std::time::Duration;

#[test]
fn timers_are_recorded_once_per_stop() {
    let mut timer = Timer::new("unit test: stop twice");
    let first = timer.stop();
    let second = timer.stop();
    assert!(second >= first);
    drop(timer);

    let summary = timings().get("unit test: stop twice").copied().unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.total, first);
}

#[test]
fn dropped_timers_are_aggregated_by_name() {
    for _ in 0..3 {
        let _timer = Timer::new("unit test: dropped");
    }
    let table = timings();
    let summary = table.get("unit test: dropped").unwrap();
    assert_eq!(summary.count, 3);
    assert!(summary.max <= summary.total);
    assert!(table.to_string().contains("unit test: dropped"));
}

#[test]
fn average_of_empty_summary_is_zero() {
    assert_eq!(TimingSummary::default().average(), Duration::ZERO);
    let summary = TimingSummary {
        count: 4,
        total: Duration::from_millis(10),
        max: Duration::from_millis(4),
    };
    assert_eq!(summary.average(), Duration::from_micros(2500));
}
