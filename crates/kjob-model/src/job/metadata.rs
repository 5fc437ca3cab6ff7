use serde::{Deserialize, Serialize};

use crate::ModelResult;

/// Catalog entry describing a runnable job.
///
/// Owned by the metadata store; the execution path only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    /// Catalog name, used as the store key.
    pub name: String,
    /// Container image reference the job runs.
    pub image_name: String,
    /// Free-form description shown to operators.
    #[serde(default)]
    pub description: String,
}

impl JobMetadata {
    pub fn new<N, I, D>(name: N, image_name: I, description: D) -> Self
    where
        N: Into<String>,
        I: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            image_name: image_name.into(),
            description: description.into(),
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        super::require("name", &self.name)?;
        super::require("image_name", &self.image_name)
    }
}
