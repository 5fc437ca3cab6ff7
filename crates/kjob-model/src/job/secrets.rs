use serde::{Deserialize, Serialize};

use crate::{Env, ModelResult};

/// Secret values registered for a catalog job.
///
/// Stored per job name and injected into every execution of that job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSecrets {
    pub job_name: String,
    #[serde(default)]
    pub secrets: Env,
}

impl JobSecrets {
    pub fn new(job_name: impl Into<String>, secrets: Env) -> Self {
        Self {
            job_name: job_name.into(),
            secrets,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        super::require("job_name", &self.job_name)
    }
}
