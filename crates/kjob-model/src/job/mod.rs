mod metadata;
pub use metadata::JobMetadata;

mod secrets;
pub use secrets::JobSecrets;

mod request;
pub use request::ExecutionRequest;

fn require(field: &'static str, value: &str) -> crate::ModelResult<()> {
    if value.trim().is_empty() {
        return Err(crate::ModelError::MissingField(field));
    }
    Ok(())
}
