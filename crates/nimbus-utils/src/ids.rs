//! Opaque id generation.
//!
//! Job ids and worker names are derived independently but from the same
//! random source: the worker name is a deterministic function of the job
//! id (invariant 4 in the data model), not a second random draw.

use uuid::Uuid;

/// Generate a fresh job id in the `job_xxxxxxxx` format: a `job_` prefix
/// followed by eight lowercase alphanumeric characters.
#[must_use]
pub fn job_id() -> String {
    format!("job_{}", short_token(Uuid::new_v4()))
}

/// Derive a DNS-label-safe, unique-per-job worker name from a job id.
///
/// Cloudflare Worker names must be lowercase alphanumeric with hyphens,
/// under 63 characters. We strip the `job_` prefix (already lowercase
/// alphanumeric) and prepend a stable tag so collisions with
/// hand-authored workers are vanishingly unlikely.
#[must_use]
pub fn worker_name(job_id: &str) -> String {
    let suffix = job_id.strip_prefix("job_").unwrap_or(job_id);
    format!("nimbus-{suffix}")
}

/// Lowercase alphanumeric token derived from a UUID's raw bytes.
fn short_token(id: Uuid) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let bytes = id.as_bytes();
    bytes
        .iter()
        .take(8)
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_has_expected_shape() {
        let id = job_id();
        assert!(id.starts_with("job_"));
        assert_eq!(id.len(), "job_".len() + 8);
        assert!(id[4..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn job_ids_are_unique() {
        let a = job_id();
        let b = job_id();
        assert_ne!(a, b);
    }

    #[test]
    fn worker_name_is_deterministic() {
        let id = "job_ab12cd34";
        assert_eq!(worker_name(id), worker_name(id));
        assert_eq!(worker_name(id), "nimbus-ab12cd34");
    }

    #[test]
    fn worker_name_differs_per_job() {
        assert_ne!(worker_name("job_aaaaaaaa"), worker_name("job_bbbbbbbb"));
    }
}
