use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "buildtask";
pub const TASK_NAME_LABEL: &str = "buildtask.io/name";
pub const NONCE_HASH_LABEL: &str = "buildtask.io/nonce-hash";

/// Job names are also used as label values, so they must fit in 63 chars.
const MAX_JOB_NAME_LEN: usize = 63;

/// short, label-safe digest of a trigger nonce
pub fn format_nonce_hash(nonce: &str) -> String {
    let digest = Sha256::digest(nonce.as_bytes());
    hex::encode(digest).chars().take(10).collect()
}

/// generate job name like `{task}-{sha256(nonce, triggered_at)[:10]}`
///
/// The trigger time keeps names unique when an earlier nonce comes back while
/// its Job is still retained.
pub fn format_job_name(task_name: &str, nonce: &str, triggered_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update(b"\n");
    hasher.update(
        triggered_at
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );
    let hash: String = hex::encode(hasher.finalize()).chars().take(10).collect();

    let prefix: String = task_name
        .chars()
        .take(MAX_JOB_NAME_LEN - hash.len() - 1)
        .collect();

    format!("{}-{}", prefix.trim_end_matches(['-', '.']), hash)
}

pub fn format_job_labels(task_name: &str, nonce: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(
        TASK_NAME_LABEL.to_string(),
        task_name.chars().take(MAX_JOB_NAME_LEN).collect(),
    );
    labels.insert(NONCE_HASH_LABEL.to_string(), format_nonce_hash(nonce));
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap()
    }

    #[test]
    fn test_job_name_is_stable_per_trigger() {
        let first = format_job_name("web", "abc", at(0));
        let second = format_job_name("web", "abc", at(0));
        let other = format_job_name("web", "abd", at(0));

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.starts_with("web-"));
        assert_eq!(first.len(), "web-".len() + 10);
    }

    #[test]
    fn test_reused_nonce_gets_a_new_job_name() {
        assert_ne!(
            format_job_name("web", "abc", at(0)),
            format_job_name("web", "abc", at(5))
        );
    }

    #[test]
    fn test_long_task_names_are_truncated() {
        let name = "a".repeat(80);
        let job_name = format_job_name(&name, "", at(0));

        assert_eq!(job_name.len(), MAX_JOB_NAME_LEN);
    }
}
