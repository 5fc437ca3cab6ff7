use serde::{Deserialize, Serialize};

use crate::{Env, ModelResult};

/// Request to run a catalog job once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Catalog job name.
    pub name: String,
    /// Caller-supplied arguments, exposed to the container as environment variables.
    #[serde(default, alias = "arguments")]
    pub args: Env,
}

impl ExecutionRequest {
    pub fn new(name: impl Into<String>, args: Env) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        super::require("name", &self.name)
    }
}
