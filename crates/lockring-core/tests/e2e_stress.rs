/// End-to-end stress driver tests.
///
/// These run the real `start_stress` coordinator with a real rayon pool and
/// drain its crossbeam progress channel exactly as the binary does.
use lockring_core::stress::{
    start_stress, StressConfig, StressHandle, StressProgress, StressReport,
    PROGRESS_CHANNEL_CAPACITY,
};
use std::time::Duration;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Drain progress messages until the run finishes, failing after a generous
/// timeout so a deadlocked run cannot hang the suite.
fn drain_to_completion(handle: &StressHandle) -> Option<StressReport> {
    let deadline = std::time::Instant::now() + Duration::from_secs(60);
    loop {
        assert!(
            std::time::Instant::now() < deadline,
            "stress run did not complete within 60 seconds"
        );
        match handle.progress_rx.try_recv() {
            Ok(StressProgress::Complete(report)) => return Some(report),
            Ok(StressProgress::Cancelled) => return None,
            Ok(StressProgress::Update { .. }) => continue,
            Err(crossbeam_channel::TryRecvError::Empty) => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                panic!("stress channel disconnected before completion");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn stress_run_is_consistent() {
    let config = StressConfig {
        workers: 8,
        ops_per_worker: 2_000,
        prefill: 32,
        progress_interval: 250,
    };
    let handle = start_stress(config).expect("failed to start stress run");
    let report = drain_to_completion(&handle).expect("run should complete");

    assert!(report.is_consistent(), "{report:?}");
    assert_eq!(report.final_len, handle.list.len());
    assert_eq!(report.ring, Ok(report.final_len));
    assert!(report.pushed >= 32);
}

#[test]
fn stress_reports_progress() {
    let config = StressConfig {
        workers: 2,
        ops_per_worker: 1_000,
        prefill: 0,
        progress_interval: 100,
    };
    let handle = start_stress(config).expect("failed to start stress run");

    let mut updates = 0;
    loop {
        match handle.progress_rx.recv_timeout(Duration::from_secs(60)) {
            Ok(StressProgress::Update { completed_ops, .. }) => {
                assert!(completed_ops > 0 && completed_ops < 1_000);
                updates += 1;
            }
            Ok(StressProgress::Complete(report)) => {
                assert!(report.is_consistent(), "{report:?}");
                break;
            }
            Ok(StressProgress::Cancelled) => panic!("run was unexpectedly cancelled"),
            Err(err) => panic!("no completion message: {err}"),
        }
    }
    // Nine checkpoints per worker, far below the channel capacity.
    assert!(updates <= 18 && updates < PROGRESS_CHANNEL_CAPACITY);
    assert!(updates > 0);
}

#[test]
fn cancelled_run_leaves_consistent_list() {
    let config = StressConfig {
        workers: 4,
        ops_per_worker: 5_000_000,
        prefill: 16,
        progress_interval: 100,
    };
    let handle = start_stress(config).expect("failed to start stress run");
    handle.cancel();
    assert!(handle.is_cancelled());

    assert!(drain_to_completion(&handle).is_none(), "run should be cancelled");
    // Workers have stopped, so the ring can be checked quiescently.
    assert_eq!(handle.list.check_ring(), Ok(handle.list.len()));
}
