use chrono::Duration;
use tracing::warn;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

stored_object!(RateLimitWindow, "rate_limit_window", {
    identifier: String,
    endpoint: String,
    request_count: u32,
    #[serde(serialize_with = "serialize_datetime", deserialize_with = "deserialize_datetime", default)]
    window_start: DateTime<Utc>
});

/// Outcome of a rate-limit check, with everything a handler needs to build
/// the 429 headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    pub retry_after_seconds: Option<i64>,
}

impl RateLimitWindow {
    /// Checks and bumps the window for `(identifier, endpoint)`.
    ///
    /// Fails open: a storage error must never turn the limiter into an
    /// outage, so the request is allowed and the error only logged.
    pub async fn check_and_increment(
        db: &SurrealDbClient,
        identifier: &str,
        endpoint: &str,
        max_requests: u32,
        window_minutes: i64,
    ) -> RateLimitDecision {
        match Self::try_check_and_increment(db, identifier, endpoint, max_requests, window_minutes)
            .await
        {
            Ok(decision) => decision,
            Err(err) => {
                warn!(
                    identifier,
                    endpoint,
                    error = %err,
                    "Rate limit storage error; failing open"
                );
                RateLimitDecision {
                    allowed: true,
                    remaining: max_requests.saturating_sub(1),
                    reset_time: Utc::now() + Duration::minutes(window_minutes),
                    retry_after_seconds: None,
                }
            }
        }
    }

    async fn try_check_and_increment(
        db: &SurrealDbClient,
        identifier: &str,
        endpoint: &str,
        max_requests: u32,
        window_minutes: i64,
    ) -> Result<RateLimitDecision, AppError> {
        let now = Utc::now();
        let cutoff = now - Duration::minutes(window_minutes);
        // One record per key, addressed by a deterministic id, so the whole
        // lookup-or-reset-or-increment runs as a single conditional statement.
        // The counter only moves while under the limit; denied requests leave
        // it untouched. RETURN BEFORE hands back the pre-statement row, which
        // is what the allow/deny decision is made from.
        let before: Option<RateLimitWindow> = db
            .client
            .query(
                "UPSERT type::thing($table, $key) SET \
                 identifier = $identifier, \
                 endpoint = $endpoint, \
                 request_count = IF window_start != NONE AND window_start > $cutoff THEN \
                     IF request_count < $max THEN request_count + 1 ELSE request_count END \
                 ELSE 1 END, \
                 window_start = IF window_start != NONE AND window_start > $cutoff THEN window_start ELSE time::now() END \
                 RETURN BEFORE",
            )
            .bind(("table", Self::table_name()))
            .bind(("key", format!("{identifier}:{endpoint}")))
            .bind(("identifier", identifier.to_string()))
            .bind(("endpoint", endpoint.to_string()))
            .bind(("cutoff", surrealdb::Datetime::from(cutoff)))
            .bind(("max", max_requests))
            .await?
            .take(0)?;

        match before {
            // An active window existed; its previous count decides.
            Some(prev) if prev.window_start > cutoff => {
                let reset_time = prev.window_start + Duration::minutes(window_minutes);
                if prev.request_count < max_requests {
                    Ok(RateLimitDecision {
                        allowed: true,
                        remaining: max_requests - (prev.request_count + 1),
                        reset_time,
                        retry_after_seconds: None,
                    })
                } else {
                    Ok(RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_time,
                        retry_after_seconds: Some((reset_time - now).num_seconds().max(1)),
                    })
                }
            }
            // No row or an expired window; the statement started a fresh one.
            _ => Ok(RateLimitDecision {
                allowed: true,
                remaining: max_requests.saturating_sub(1),
                reset_time: now + Duration::minutes(window_minutes),
                retry_after_seconds: None,
            }),
        }
    }

    /// Housekeeping sweep for windows that can no longer be active. Missing
    /// a sweep only costs storage, never correctness.
    pub async fn sweep_expired(
        db: &SurrealDbClient,
        older_than_minutes: i64,
    ) -> Result<(), AppError> {
        let cutoff = Utc::now() - Duration::minutes(older_than_minutes);
        db.client
            .query("DELETE FROM type::table($table) WHERE window_start < $cutoff")
            .bind(("table", Self::table_name()))
            .bind(("cutoff", surrealdb::Datetime::from(cutoff)))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn test_db() -> SurrealDbClient {
        SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb")
    }

    #[tokio::test]
    async fn test_counts_down_then_denies() {
        let db = test_db().await;

        for expected_remaining in (0..5).rev() {
            let decision =
                RateLimitWindow::check_and_increment(&db, "u1", "chat", 5, 1).await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.retry_after_seconds, None);
        }

        let denied = RateLimitWindow::check_and_increment(&db, "u1", "chat", 5, 1).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after_seconds.expect("retry_after missing") > 0);
    }

    #[tokio::test]
    async fn test_denied_requests_do_not_move_the_counter() {
        let db = test_db().await;

        for _ in 0..3 {
            RateLimitWindow::check_and_increment(&db, "u1", "chat", 3, 1).await;
        }
        for _ in 0..4 {
            let denied = RateLimitWindow::check_and_increment(&db, "u1", "chat", 3, 1).await;
            assert!(!denied.allowed);
        }

        // Over-limit traffic must not be counted.
        let row: Option<RateLimitWindow> = db
            .client
            .select((RateLimitWindow::table_name(), "u1:chat"))
            .await
            .expect("Select failed");
        assert_eq!(row.expect("row missing").request_count, 3);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let db = test_db().await;

        let first = RateLimitWindow::check_and_increment(&db, "u1", "chat", 1, 1).await;
        assert!(first.allowed);
        let denied = RateLimitWindow::check_and_increment(&db, "u1", "chat", 1, 1).await;
        assert!(!denied.allowed);

        // Other identifier and other endpoint both still have a fresh window.
        let other_user = RateLimitWindow::check_and_increment(&db, "u2", "chat", 1, 1).await;
        assert!(other_user.allowed);
        let other_endpoint =
            RateLimitWindow::check_and_increment(&db, "u1", "documents", 1, 1).await;
        assert!(other_endpoint.allowed);
    }

    #[tokio::test]
    async fn test_expired_window_resets_counter() {
        let db = test_db().await;

        for _ in 0..2 {
            RateLimitWindow::check_and_increment(&db, "u1", "chat", 2, 1).await;
        }
        let denied = RateLimitWindow::check_and_increment(&db, "u1", "chat", 2, 1).await;
        assert!(!denied.allowed);

        // Age the window past its validity instead of sleeping through it.
        let past = Utc::now() - Duration::minutes(5);
        db.client
            .query("UPDATE type::thing($table, $key) SET window_start = $past")
            .bind(("table", RateLimitWindow::table_name()))
            .bind(("key", "u1:chat"))
            .bind(("past", surrealdb::Datetime::from(past)))
            .await
            .expect("Failed to age window");

        let fresh = RateLimitWindow::check_and_increment(&db, "u1", "chat", 2, 1).await;
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_stale_windows() {
        let db = test_db().await;

        RateLimitWindow::check_and_increment(&db, "stale", "chat", 5, 1).await;
        let past = Utc::now() - Duration::minutes(120);
        db.client
            .query("UPDATE type::thing($table, $key) SET window_start = $past")
            .bind(("table", RateLimitWindow::table_name()))
            .bind(("key", "stale:chat"))
            .bind(("past", surrealdb::Datetime::from(past)))
            .await
            .expect("Failed to age window");
        RateLimitWindow::check_and_increment(&db, "live", "chat", 5, 1).await;

        RateLimitWindow::sweep_expired(&db, 60)
            .await
            .expect("Sweep failed");

        let remaining: Vec<RateLimitWindow> = db
            .client
            .select(RateLimitWindow::table_name())
            .await
            .expect("Select failed");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].identifier, "live");
    }
}
