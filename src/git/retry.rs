//! Repair for "exited successfully but printed nothing"
//!
//! git occasionally exits 0 with empty stdout when it should have printed
//! something. The fix is to run the identical command again.

use tracing::{info, instrument, warn};

use super::job::Job;
use crate::model::JobStatus;

/// Re-run silently empty jobs until they produce output
///
/// For up to `max_retries` passes, every job that exited 0 with no stdout
/// is respawned with the identical command and joined; its output and
/// exit code are spliced back onto the original job. A job counts as fixed
/// once a run prints something or fails (failures are left to the caller).
/// Each job's attempts are counted on their own.
///
/// Returns `Success` when no job is silently empty any more, `Error` when
/// the budget runs out first.
#[instrument(level = "debug", skip_all, fields(jobs = jobs.len(), max_retries = max_retries))]
pub async fn ensure_output(jobs: &[Job], max_retries: usize) -> JobStatus {
    for attempt in 1..=max_retries {
        let pending: Vec<&Job> = jobs.iter().filter(|j| j.is_silently_empty()).collect();
        if pending.is_empty() {
            return JobStatus::Success;
        }

        for job in pending {
            let retry = job.respawn();
            let outcome = retry.run().await;
            job.splice_from(&retry);

            match outcome {
                Ok(0) if retry.stdout_len() == 0 => {
                    warn!(
                        command = %job.spec().display(),
                        attempt,
                        "retry produced no output"
                    );
                }
                Ok(code) => {
                    info!(
                        command = %job.spec().display(),
                        attempt,
                        exit_code = code,
                        lines = retry.stdout_len(),
                        "retry recovered output"
                    );
                }
                Err(e) => {
                    warn!(command = %job.spec().display(), attempt, error = %e, "retry failed");
                }
            }
        }
    }

    if jobs.iter().any(Job::is_silently_empty) {
        warn!(max_retries, "output still empty after retries");
        JobStatus::Error
    } else {
        JobStatus::Success
    }
}
