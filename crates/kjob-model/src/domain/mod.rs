mod env;
pub use env::Env;

mod labels;
pub use labels::Labels;

mod constants;
pub use constants::LABEL_JOB;

mod execution_id;
pub use execution_id::ExecutionId;
