//! Common model-level constants.
//!
//! Well-known label keys shared between the submission and the correlation side.

/// Label key carrying the execution identifier.
///
/// Attached to every submitted workload and to its pod template, and used as the
/// selector when looking up the unit that produces output for an execution.
pub const LABEL_JOB: &str = "job";
