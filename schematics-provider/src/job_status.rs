//! Status codes reported by agent deploy, health, prs and destroy jobs

use schematics_core::wait::Progress;

use crate::models::{Agent, AgentJob};

pub const JOB_PENDING: &str = "job_pending";
pub const JOB_IN_PROGRESS: &str = "job_in_progress";
pub const JOB_READY_TO_EXECUTE: &str = "job_ready_to_execute";
pub const JOB_STOP_IN_PROGRESS: &str = "job_stop_in_progress";
pub const JOB_FINISHED: &str = "job_finished";
pub const JOB_FAILED: &str = "job_failed";
pub const JOB_CANCELLED: &str = "job_cancelled";
pub const JOB_STOPPED: &str = "job_stopped";
const RETRY: &str = "retry";

const PENDING: &[&str] = &[
    RETRY,
    JOB_IN_PROGRESS,
    JOB_PENDING,
    JOB_READY_TO_EXECUTE,
    JOB_STOP_IN_PROGRESS,
];

/// The empty code means there is nothing to wait for
const TERMINAL: &[&str] = &[JOB_FINISHED, JOB_FAILED, JOB_CANCELLED, JOB_STOPPED, ""];

pub fn classify(code: &str) -> Progress {
    if PENDING.contains(&code) {
        Progress::Pending(code.to_string())
    } else if TERMINAL.contains(&code) {
        Progress::Done
    } else {
        Progress::Unexpected(code.to_string())
    }
}

/// Status of the destroy-resources job; the job may not have been created yet
pub fn destroy_status(agent: &Agent) -> &str {
    agent
        .recent_destroy_job
        .as_ref()
        .and_then(|job| job.status_code.as_deref())
        .unwrap_or(JOB_PENDING)
}

/// Status of a triggered job; an absent code ends the wait
pub fn trigger_status(job: &AgentJob) -> &str {
    job.status_code.as_deref().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecentAgentJob;

    #[test]
    fn classifies_known_codes() {
        assert_eq!(classify("job_in_progress"), Progress::Pending("job_in_progress".into()));
        assert_eq!(classify("retry"), Progress::Pending("retry".into()));
        assert_eq!(classify("job_finished"), Progress::Done);
        assert_eq!(classify("job_failed"), Progress::Done);
        assert_eq!(classify(""), Progress::Done);
        assert_eq!(classify("bogus"), Progress::Unexpected("bogus".into()));
    }

    #[test]
    fn missing_destroy_job_is_pending() {
        assert_eq!(destroy_status(&Agent::default()), JOB_PENDING);

        let agent = Agent {
            recent_destroy_job: Some(RecentAgentJob {
                status_code: Some(JOB_STOPPED.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(destroy_status(&agent), JOB_STOPPED);
    }

    #[test]
    fn missing_trigger_status_is_terminal() {
        assert_eq!(classify(trigger_status(&AgentJob::default())), Progress::Done);
    }
}
