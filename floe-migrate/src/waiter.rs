//! Queued execution: waiting out asynchronous background mutations.
//!
//! Some statements (notably `ALTER TABLE ... UPDATE/DELETE`) return as
//! soon as the server has queued a mutation, not when it has finished.
//! Running the next migration statement against a half-mutated table is
//! a race, so queued mode polls the server's mutation introspection
//! until nothing matching the issued statement remains unfinished.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::Database;

/// Default wait before giving up on a mutation.
pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Default pause between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls the database until mutations triggered by a statement finish.
#[derive(Debug, Clone)]
pub struct MutationWaiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for MutationWaiter {
    fn default() -> Self {
        Self::new(DEFAULT_MUTATION_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

impl MutationWaiter {
    /// Create a waiter with an explicit timeout and poll interval.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Suspend the run until no unfinished mutation matching `statement`
    /// remains, or fail with [`MigrateError::MutationTimeout`] once the
    /// timeout elapses (measured from `issued_at`).
    ///
    /// Correlation is heuristic: a mutation counts as ours when its
    /// recorded command is a case-insensitive substring of the issued
    /// statement. The driver exposes no mutation id, so a statement that
    /// does not round-trip verbatim through the server's command echo can
    /// mis-correlate.
    pub async fn await_completion<D: Database>(
        &self,
        db: &D,
        statement: &str,
        issued_at: DateTime<Utc>,
    ) -> MigrateResult<()> {
        let statement_lower = statement.to_lowercase();

        loop {
            let commands = db.unfinished_mutations(issued_at).await?;
            let still_running = commands
                .iter()
                .filter(|command| statement_lower.contains(&command.to_lowercase()))
                .count();

            if still_running == 0 {
                debug!(statement, "no matching unfinished mutations remain");
                return Ok(());
            }

            let elapsed = Utc::now()
                .signed_duration_since(issued_at)
                .to_std()
                .unwrap_or_default();
            if elapsed > self.timeout {
                warn!(statement, ?elapsed, "gave up waiting for mutations");
                return Err(MigrateError::MutationTimeout {
                    statement: statement.to_string(),
                    timeout: self.timeout,
                });
            }

            debug!(statement, still_running, "mutations still running");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::ledger::LedgerEntry;

    /// Fake database scripted with one `unfinished_mutations` response
    /// per poll; repeats the last response once exhausted.
    struct ScriptedDb {
        responses: Mutex<Vec<Vec<String>>>,
        polls: Mutex<u32>,
    }

    impl ScriptedDb {
        fn new(responses: Vec<Vec<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                polls: Mutex::new(0),
            }
        }

        fn polls(&self) -> u32 {
            *self.polls.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl Database for ScriptedDb {
        async fn execute(&self, _sql: &str) -> MigrateResult<()> {
            Ok(())
        }

        async fn init_ledger(&self) -> MigrateResult<()> {
            Ok(())
        }

        async fn ledger_entries(&self) -> MigrateResult<Vec<LedgerEntry>> {
            Ok(vec![])
        }

        async fn record_applied(&self, _entry: &LedgerEntry) -> MigrateResult<()> {
            Ok(())
        }

        async fn unfinished_mutations(
            &self,
            _since: DateTime<Utc>,
        ) -> MigrateResult<Vec<String>> {
            *self.polls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.remove(0))
            } else {
                Ok(responses.first().cloned().unwrap_or_default())
            }
        }
    }

    fn fast_waiter(timeout_ms: u64) -> MutationWaiter {
        MutationWaiter::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(5),
        )
    }

    const STATEMENT: &str = "ALTER TABLE sample UPDATE guard = 1 WHERE enabled = 1";

    #[tokio::test]
    async fn test_done_immediately_when_nothing_matches() {
        let db = ScriptedDb::new(vec![vec!["UPDATE other_table SET x = 1".to_string()]]);
        let waiter = fast_waiter(500);

        waiter
            .await_completion(&db, STATEMENT, Utc::now())
            .await
            .unwrap();
        assert_eq!(db.polls(), 1);
    }

    #[tokio::test]
    async fn test_polls_until_mutation_finishes() {
        let command = "UPDATE guard = 1 WHERE enabled = 1".to_string();
        let db = ScriptedDb::new(vec![
            vec![command.clone()],
            vec![command],
            vec![],
        ]);
        let waiter = fast_waiter(5_000);

        waiter
            .await_completion(&db, STATEMENT, Utc::now())
            .await
            .unwrap();
        assert_eq!(db.polls(), 3);
    }

    #[tokio::test]
    async fn test_correlation_is_case_insensitive() {
        let db = ScriptedDb::new(vec![
            vec!["update GUARD = 1 where ENABLED = 1".to_string()],
            vec![],
        ]);
        let waiter = fast_waiter(5_000);

        waiter
            .await_completion(&db, STATEMENT, Utc::now())
            .await
            .unwrap();
        assert_eq!(db.polls(), 2);
    }

    #[tokio::test]
    async fn test_times_out_on_stuck_mutation() {
        let db = ScriptedDb::new(vec![vec!["UPDATE guard = 1 WHERE enabled = 1".to_string()]]);
        let waiter = fast_waiter(30);

        let err = waiter
            .await_completion(&db, STATEMENT, Utc::now())
            .await
            .unwrap_err();
        match err {
            MigrateError::MutationTimeout { statement, timeout } => {
                assert_eq!(statement, STATEMENT);
                assert_eq!(timeout, Duration::from_millis(30));
            }
            other => panic!("expected MutationTimeout, got {other}"),
        }
    }
}
