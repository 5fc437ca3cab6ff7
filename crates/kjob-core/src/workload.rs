use std::time::Duration;

use kjob_model::{Env, ExecutionId, Labels};

use crate::identity::{labels_for, new_execution_id};

/// Restart behaviour of a workload's unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart the container in place when it exits non-zero.
    #[default]
    OnFailure,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::OnFailure => "OnFailure",
        }
    }
}

/// Platform-neutral description of one workload to submit.
///
/// Built once per submission with a fresh identifier; the labels always match
/// [`crate::label_selector_for`] for that identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub id: ExecutionId,
    pub image: String,
    pub env: Env,
    pub restart_policy: RestartPolicy,
    /// Upper bound on workload runtime. `None` leaves the platform default.
    pub active_deadline: Option<Duration>,
    pub labels: Labels,
}

impl WorkloadSpec {
    /// Build a spec for `job_name` under a newly generated identifier.
    pub fn build(job_name: &str, image: &str, env: Env, active_deadline: Option<Duration>) -> Self {
        Self::with_id(new_execution_id(job_name), image, env, active_deadline)
    }

    /// Build a spec under an already chosen identifier.
    pub fn with_id(
        id: ExecutionId,
        image: &str,
        env: Env,
        active_deadline: Option<Duration>,
    ) -> Self {
        let labels = labels_for(&id);
        Self {
            id,
            image: image.to_string(),
            env,
            restart_policy: RestartPolicy::OnFailure,
            active_deadline: active_deadline.filter(|d| !d.is_zero()),
            labels,
        }
    }

    /// Deadline in whole seconds, rounded up so a sub-second deadline is not lost.
    pub fn active_deadline_seconds(&self) -> Option<i64> {
        self.active_deadline.map(|d| {
            let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
            i64::try_from(secs).unwrap_or(i64::MAX)
        })
    }
}

#[cfg(test)]
mod tests {
    use kjob_model::LABEL_JOB;

    use super::*;
    use crate::label_selector_for;

    #[test]
    fn build_labels_match_selector() {
        let spec = WorkloadSpec::build("backup", "busybox:1", Env::new(), None);

        assert_eq!(spec.labels.get(LABEL_JOB), Some(spec.id.as_str()));
        assert_eq!(spec.labels.to_selector(), label_selector_for(&spec.id));
        assert_eq!(spec.restart_policy.as_str(), "OnFailure");
    }

    #[test]
    fn zero_deadline_is_dropped() {
        let spec = WorkloadSpec::build("backup", "busybox:1", Env::new(), Some(Duration::ZERO));
        assert_eq!(spec.active_deadline, None);
        assert_eq!(spec.active_deadline_seconds(), None);
    }

    #[test]
    fn deadline_seconds_round_up() {
        let spec = WorkloadSpec::build(
            "backup",
            "busybox:1",
            Env::new(),
            Some(Duration::from_millis(1500)),
        );
        assert_eq!(spec.active_deadline_seconds(), Some(2));

        let spec = WorkloadSpec::build("backup", "busybox:1", Env::new(), Some(Duration::from_secs(600)));
        assert_eq!(spec.active_deadline_seconds(), Some(600));
    }

    #[test]
    fn each_build_gets_its_own_identifier() {
        let a = WorkloadSpec::build("backup", "busybox:1", Env::new(), None);
        let b = WorkloadSpec::build("backup", "busybox:1", Env::new(), None);
        assert_ne!(a.id, b.id);
    }
}
