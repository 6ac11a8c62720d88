//! Reconciliation of on-disk migrations against the applied ledger.
//!
//! This is a pure join over two small sets keyed by version; no state,
//! no I/O. Any disagreement between disk and ledger is fatal and
//! requires a human to write a new forward-fixing migration.

use std::collections::HashMap;

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::LedgerEntry;
use crate::source::Candidate;

/// Compute the ordered list of migrations that still need to run.
///
/// Returns the candidates absent from the ledger, sorted ascending by
/// version (gaps in the numbering are fine). Fails when history has been
/// tampered with: a ledger version with no matching file is
/// [`MigrateError::MissingMigrations`], a matching file with a different
/// fingerprint is [`MigrateError::TamperedMigration`].
pub fn reconcile(
    candidates: Vec<Candidate>,
    ledger: Vec<LedgerEntry>,
) -> MigrateResult<Vec<Candidate>> {
    let mut on_disk: HashMap<u32, Candidate> = HashMap::with_capacity(candidates.len());
    for candidate in candidates {
        let version = candidate.version;
        if on_disk.insert(version, candidate).is_some() {
            return Err(MigrateError::DuplicateVersion(version));
        }
    }

    let mut applied: HashMap<u32, &LedgerEntry> = HashMap::with_capacity(ledger.len());
    for entry in &ledger {
        if applied.insert(entry.version, entry).is_some() {
            return Err(MigrateError::DuplicateVersion(entry.version));
        }
    }

    // First-run fast path.
    if applied.is_empty() {
        let mut pending: Vec<Candidate> = on_disk.into_values().collect();
        pending.sort_by_key(|c| c.version);
        return Ok(pending);
    }

    // The set of files on disk must never shrink below recorded history.
    if on_disk.len() < applied.len() {
        return Err(MigrateError::missing(format!(
            "{} migrations applied but only {} files on disk",
            applied.len(),
            on_disk.len()
        )));
    }

    let mut applied_versions: Vec<u32> = applied.keys().copied().collect();
    applied_versions.sort_unstable();

    for version in &applied_versions {
        if !on_disk.contains_key(version) {
            return Err(MigrateError::missing(format!(
                "version {version} is recorded as applied but its file is gone"
            )));
        }
    }

    for version in &applied_versions {
        let entry = applied[version];
        let candidate = &on_disk[version];
        if candidate.fingerprint != entry.fingerprint {
            return Err(MigrateError::TamperedMigration {
                version: *version,
                expected: entry.fingerprint.clone(),
                actual: candidate.fingerprint.clone(),
            });
        }
    }

    let mut pending: Vec<Candidate> = on_disk
        .into_values()
        .filter(|c| !applied.contains_key(&c.version))
        .collect();
    pending.sort_by_key(|c| c.version);
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn candidate(version: u32, path: &str, fingerprint: &str) -> Candidate {
        Candidate {
            version,
            path: path.into(),
            fingerprint: fingerprint.to_string(),
        }
    }

    fn entry(version: u32, fingerprint: &str) -> LedgerEntry {
        LedgerEntry {
            version,
            fingerprint: fingerprint.to_string(),
            script: format!("migrations/V{version}_x.sql"),
            applied_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_ledger_returns_all_sorted() {
        let candidates = vec![
            candidate(2, "V2_b.sql", "md5b"),
            candidate(1, "V1_a.sql", "md5a"),
        ];

        let pending = reconcile(candidates, vec![]).unwrap();
        let versions: Vec<u32> = pending.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn test_empty_both_is_empty() {
        assert!(reconcile(vec![], vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_applied_versions_are_not_pending() {
        let candidates = vec![
            candidate(1, "V1_a.sql", "md5a"),
            candidate(2, "V2_b.sql", "md5b"),
        ];
        let ledger = vec![entry(1, "md5a")];

        let pending = reconcile(candidates, ledger).unwrap();
        let versions: Vec<u32> = pending.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![2]);
    }

    #[test]
    fn test_version_gaps_are_allowed() {
        let candidates = vec![
            candidate(1, "V1_a.sql", "md5a"),
            candidate(5, "V5_b.sql", "md5b"),
            candidate(9, "V9_c.sql", "md5c"),
        ];
        let ledger = vec![entry(1, "md5a")];

        let pending = reconcile(candidates, ledger).unwrap();
        let versions: Vec<u32> = pending.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![5, 9]);
    }

    #[test]
    fn test_no_candidates_with_history_is_missing() {
        let err = reconcile(vec![], vec![entry(1, "md5a")]).unwrap_err();
        assert!(matches!(err, MigrateError::MissingMigrations { .. }));
    }

    #[test]
    fn test_vanished_applied_file_is_missing() {
        let candidates = vec![candidate(2, "V2_b.sql", "md5b")];
        let ledger = vec![entry(1, "md5a")];

        let err = reconcile(candidates, ledger).unwrap_err();
        assert!(matches!(err, MigrateError::MissingMigrations { .. }));
    }

    #[test]
    fn test_edited_applied_file_is_tampered() {
        let candidates = vec![candidate(1, "V1_a.sql", "md5x")];
        let ledger = vec![entry(1, "md5a")];

        let err = reconcile(candidates, ledger).unwrap_err();
        match err {
            MigrateError::TamperedMigration {
                version,
                expected,
                actual,
            } => {
                assert_eq!(version, 1);
                assert_eq!(expected, "md5a");
                assert_eq!(actual, "md5x");
            }
            other => panic!("expected TamperedMigration, got {other}"),
        }
    }

    #[test]
    fn test_tamper_detected_regardless_of_pending_work() {
        let candidates = vec![
            candidate(1, "V1_a.sql", "md5x"),
            candidate(2, "V2_b.sql", "md5b"),
        ];
        let ledger = vec![entry(1, "md5a")];

        let err = reconcile(candidates, ledger).unwrap_err();
        assert!(matches!(err, MigrateError::TamperedMigration { .. }));
    }

    #[test]
    fn test_duplicate_candidate_version_is_rejected() {
        let candidates = vec![
            candidate(1, "V1_a.sql", "md5a"),
            candidate(1, "V1_again.sql", "md5b"),
        ];

        let err = reconcile(candidates, vec![]).unwrap_err();
        assert!(matches!(err, MigrateError::DuplicateVersion(1)));
    }

    #[test]
    fn test_duplicate_ledger_version_is_rejected() {
        let candidates = vec![candidate(1, "V1_a.sql", "md5a")];
        let ledger = vec![entry(1, "md5a"), entry(1, "md5a")];

        let err = reconcile(candidates, ledger).unwrap_err();
        assert!(matches!(err, MigrateError::DuplicateVersion(1)));
    }

    #[test]
    fn test_fully_applied_set_has_nothing_pending() {
        let candidates = vec![
            candidate(1, "V1_a.sql", "md5a"),
            candidate(2, "V2_b.sql", "md5b"),
        ];
        let ledger = vec![entry(1, "md5a"), entry(2, "md5b")];

        assert!(reconcile(candidates, ledger).unwrap().is_empty());
    }
}
