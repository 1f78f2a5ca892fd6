use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Gates monitor loops so only one process instance runs them at a time
/// when several replicas share a store (§4.5). `ais-cli`'s single-process
/// dev mode uses [`AlwaysLeader`]; a clustered deployment plugs in a
/// lease-backed implementation such as [`LeasedLeaderGate`].
#[async_trait]
pub trait LeaderGate: Send + Sync {
    async fn is_leader(&self) -> bool;
}

/// Every caller is leader. Used for the single-process CLI/dev server.
pub struct AlwaysLeader;

#[async_trait]
impl LeaderGate for AlwaysLeader {
    async fn is_leader(&self) -> bool {
        true
    }
}

struct Lease {
    holder: String,
    expires_at: DateTime<Utc>,
}

/// A renewable, time-bounded lease held by one `holder` at a time. Any
/// holder whose lease has expired is replaced by the next one to call
/// [`LeasedLeaderGate::try_acquire`]; [`LeaderGate::is_leader`] only
/// reports true for whoever currently holds an unexpired lease.
pub struct LeasedLeaderGate {
    holder_id: String,
    ttl: Duration,
    lease: Arc<RwLock<Option<Lease>>>,
}

impl LeasedLeaderGate {
    pub fn new(holder_id: impl Into<String>, ttl: Duration) -> Self {
        Self { holder_id: holder_id.into(), ttl, lease: Arc::new(RwLock::new(None)) }
    }

    /// Attempts to (re)acquire leadership. Returns true if this holder now
    /// owns an unexpired lease.
    pub async fn try_acquire(&self) -> bool {
        let mut lease = self.lease.write().await;
        let now = Utc::now();
        let expired = lease.as_ref().map(|l| l.expires_at <= now).unwrap_or(true);
        let owns_it = lease.as_ref().map(|l| l.holder == self.holder_id).unwrap_or(false);
        if expired || owns_it {
            let ttl_secs = self.ttl.as_secs() as i64;
            *lease = Some(Lease {
                holder: self.holder_id.clone(),
                expires_at: now + chrono::Duration::seconds(ttl_secs),
            });
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl LeaderGate for LeasedLeaderGate {
    async fn is_leader(&self) -> bool {
        self.try_acquire().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_leader_is_always_true() {
        let gate = AlwaysLeader;
        assert!(gate.is_leader().await);
    }

    #[tokio::test]
    async fn second_holder_cannot_acquire_live_lease() {
        let lease = Arc::new(RwLock::new(None));
        let a = LeasedLeaderGate { holder_id: "a".into(), ttl: Duration::from_secs(30), lease: lease.clone() };
        let b = LeasedLeaderGate { holder_id: "b".into(), ttl: Duration::from_secs(30), lease };
        assert!(a.try_acquire().await);
        assert!(!b.try_acquire().await);
        assert!(a.try_acquire().await, "original holder should renew");
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() {
        let lease = Arc::new(RwLock::new(None));
        let a = LeasedLeaderGate { holder_id: "a".into(), ttl: Duration::from_secs(0), lease: lease.clone() };
        let b = LeasedLeaderGate { holder_id: "b".into(), ttl: Duration::from_secs(30), lease };
        assert!(a.try_acquire().await);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(b.try_acquire().await);
    }
}
