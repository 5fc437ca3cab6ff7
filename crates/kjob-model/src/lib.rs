mod domain;
pub use domain::{Env, ExecutionId, LABEL_JOB, Labels};

mod error;
pub use error::{ModelError, ModelResult};

mod job;
pub use job::{ExecutionRequest, JobMetadata, JobSecrets};
