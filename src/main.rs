//! LockRing — stress runner for the lock-per-element list.
//!
//! Thin binary entry point. All logic lives in the `lockring-core` crate.
//!
//! Usage: `lockring [CONFIG.json]`

use lockring_core::stress::{start_stress, StressConfig, StressProgress};
use std::path::PathBuf;
use tracing::{debug, info};

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            info!("Loading stress config from {}", path.display());
            StressConfig::from_json_file(&path)?
        }
        None => StressConfig::default(),
    };
    config.validate()?;

    let handle = start_stress(config)?;
    for message in handle.progress_rx.iter() {
        match message {
            StressProgress::Update {
                worker,
                completed_ops,
                len,
            } => debug!(worker, completed_ops, len, "progress"),
            StressProgress::Complete(report) => {
                if let Err(err) = &report.ring {
                    anyhow::bail!("ring is inconsistent after the run: {err}");
                }
                if !report.is_consistent() {
                    anyhow::bail!(
                        "pushed {} and popped {} but {} elements remain",
                        report.pushed,
                        report.popped,
                        report.final_len
                    );
                }
                info!(
                    "LockRing stress run passed: {} pushed, {} popped, {} remaining in {:?}",
                    report.pushed, report.popped, report.final_len, report.duration
                );
                return Ok(());
            }
            StressProgress::Cancelled => anyhow::bail!("stress run was cancelled"),
        }
    }

    anyhow::bail!("stress driver exited without reporting completion")
}
