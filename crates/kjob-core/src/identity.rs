//! Execution identifiers and the labels derived from them.
//!
//! Submission attaches [`labels_for`] to the workload and its pod template;
//! correlation later queries units with [`label_selector_for`]. The selector is
//! rendered from the same label set, so the two sides cannot drift apart.

use kjob_model::{ExecutionId, LABEL_JOB, Labels};
use uuid::Uuid;

/// Longest slug kept from the job name.
///
/// Slug (30) + dash (1) + uuid simple form (32) = 63, the limit for both
/// DNS-1123 labels and label values.
const MAX_SLUG_LEN: usize = 30;

const MAX_ID_LEN: usize = 63;

/// Slug used when nothing usable remains of the job name.
const FALLBACK_SLUG: &str = "job";

/// Build a fresh execution identifier for a catalog job.
///
/// Format: `{slug}-{uuid}`.
/// - `slug`: job name lowercased, non `[a-z0-9]` runs collapsed to `-`, max 30 chars
/// - `uuid`: random v4 uuid in simple (32 hex chars) form
pub fn new_execution_id(job_name: &str) -> ExecutionId {
    let slug = slugify(job_name);
    ExecutionId::from(format!("{slug}-{}", Uuid::new_v4().simple()))
}

/// Labels attached to a workload submitted under `id`.
pub fn labels_for(id: &ExecutionId) -> Labels {
    let mut labels = Labels::new();
    labels.insert(LABEL_JOB, id.as_str());
    labels
}

/// Whether `candidate` has the shape of an identifier from [`new_execution_id`]:
/// a DNS-1123 label (`[a-z0-9]([-a-z0-9]*[a-z0-9])?`, at most 63 chars).
///
/// Only such values are safe to embed in [`label_selector_for`].
pub fn is_execution_id(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= MAX_ID_LEN
                && alnum(first)
                && alnum(last)
                && bytes.iter().all(|b| alnum(b) || *b == b'-')
        }
        _ => false,
    }
}

/// Selector matching exactly the units labelled by [`labels_for`].
pub fn label_selector_for(id: &ExecutionId) -> String {
    labels_for(id).to_selector()
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;

    for ch in name.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() && slug.len() + 1 < MAX_SLUG_LEN {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}
