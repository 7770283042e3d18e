//! Visitor sessions and the per-session visit counter

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;

/// Session field holding the visit counter
pub const NUM_VISITS: &str = "num_visits";

/// Server-side session state keyed by the session cookie
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Add one to an integer field of the session and return the new value.
    /// A missing session or field counts from zero.
    async fn incr(&self, session_id: &str, field: &str) -> AppResult<i64>;
    async fn ping(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SessionsService {
    store: Arc<dyn SessionStore>,
}

impl SessionsService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Count a visit and return the number of visits before this one
    pub async fn record_visit(&self, session_id: &str) -> AppResult<i64> {
        let visits = self.store.incr(session_id, NUM_VISITS).await?;
        Ok(visits - 1)
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;

    #[tokio::test]
    async fn first_visit_reports_zero() {
        let mut store = MockSessionStore::new();
        store
            .expect_incr()
            .with(eq("abc"), eq(NUM_VISITS))
            .times(1)
            .returning(|_, _| Ok(1));

        let service = SessionsService::new(Arc::new(store));
        assert_eq!(service.record_visit("abc").await.unwrap(), 0);
    }
}
