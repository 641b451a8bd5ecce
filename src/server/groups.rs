//! Group membership table
//!
//! Maps group names to the set of member connections. All mutation and all
//! membership reads used for delivery go through one `RwLock`; delivery
//! itself runs on the snapshot returned by [`GroupTable::members`], outside
//! the lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::server::registry::ConnectionId;

/// Process-wide mapping from group name to member connection ids
#[derive(Debug, Default)]
pub struct GroupTable {
    groups: RwLock<HashMap<String, HashSet<ConnectionId>>>,
}

impl GroupTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            groups: RwLock::new(HashMap::new()),
        })
    }

    /// Add a member to the named group, creating the group if absent
    pub async fn join(&self, name: &str, id: ConnectionId) {
        let mut groups = self.groups.write().await;
        groups.entry(name.to_string()).or_default().insert(id);
    }

    /// Remove a member from the named group
    ///
    /// A no-op when the group never existed or the connection was not a
    /// member; returns whether a membership was actually removed. A group
    /// left with zero members stays in the table — clients cannot observe
    /// the difference, and the lookup treats absence and emptiness alike.
    pub async fn leave(&self, name: &str, id: ConnectionId) -> bool {
        let mut groups = self.groups.write().await;
        match groups.get_mut(name) {
            Some(members) => members.remove(&id),
            None => false,
        }
    }

    /// Evict a member found dead during delivery; same semantics as `leave`
    pub async fn remove_member(&self, name: &str, id: ConnectionId) -> bool {
        self.leave(name, id).await
    }

    /// Point-in-time copy of the group's membership
    ///
    /// Callers iterating for delivery are unaffected by concurrent
    /// join/leave. An absent group yields an empty set.
    pub async fn members(&self, name: &str) -> Vec<ConnectionId> {
        let groups = self.groups.read().await;
        groups
            .get(name)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether the connection is currently a member of the named group
    pub async fn is_member(&self, name: &str, id: ConnectionId) -> bool {
        let groups = self.groups.read().await;
        groups.get(name).is_some_and(|members| members.contains(&id))
    }

    /// Number of members in the named group
    pub async fn member_count(&self, name: &str) -> usize {
        let groups = self.groups.read().await;
        groups.get(name).map(|members| members.len()).unwrap_or(0)
    }

    /// Number of groups in the table, empty ones included
    pub async fn group_count(&self) -> usize {
        let groups = self.groups.read().await;
        groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_join_creates_group() {
        let table = GroupTable::new();
        let id = Uuid::new_v4();

        table.join("rust", id).await;
        assert!(table.is_member("rust", id).await);
        assert_eq!(table.member_count("rust").await, 1);
        assert_eq!(table.group_count().await, 1);
    }

    #[tokio::test]
    async fn test_leave_absent_is_noop() {
        let table = GroupTable::new();
        let id = Uuid::new_v4();

        // Neither the group nor the member exists
        assert!(!table.leave("rust", id).await);

        table.join("rust", id).await;
        assert!(!table.leave("rust", Uuid::new_v4()).await);
        assert!(table.leave("rust", id).await);
    }

    #[tokio::test]
    async fn test_empty_group_lingers_without_observable_effect() {
        let table = GroupTable::new();
        let id = Uuid::new_v4();

        table.join("rust", id).await;
        table.leave("rust", id).await;

        // The group record stays, but membership reads see nothing
        assert_eq!(table.group_count().await, 1);
        assert!(table.members("rust").await.is_empty());
        assert_eq!(table.member_count("rust").await, 0);
    }

    #[tokio::test]
    async fn test_members_is_a_snapshot() {
        let table = GroupTable::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        table.join("rust", a).await;
        table.join("rust", b).await;

        let snapshot = table.members("rust").await;
        table.leave("rust", a).await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(table.members("rust").await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_joins_lose_no_updates() {
        let table = GroupTable::new();
        let ids: Vec<ConnectionId> = (0..32).map(|_| Uuid::new_v4()).collect();

        let mut tasks = Vec::new();
        for id in ids.clone() {
            let table = Arc::clone(&table);
            tasks.push(tokio::spawn(async move {
                table.join("g", id).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(table.member_count("g").await, 32);
        for id in ids {
            assert!(table.is_member("g", id).await);
        }
    }
}
