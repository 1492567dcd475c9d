use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Connection-group registry for organization broadcast fan-out. One
/// instance is constructed at process start and handed to sessions as app
/// data; there is no global socket singleton.
#[derive(Default)]
pub struct RealtimeGateway {
    next_conn_id: AtomicU64,
    orgs: Mutex<HashMap<u64, HashMap<u64, UnboundedSender<String>>>>,
}

/// Holds a connection inside its organization group; dropping it releases
/// the membership, which is the only disconnect side effect.
pub struct GroupMembership {
    gateway: Arc<RealtimeGateway>,
    organization_id: u64,
    conn_id: u64,
}

impl RealtimeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast topic name for an organization.
    pub fn topic(organization_id: u64) -> String {
        format!("org:{}", organization_id)
    }

    pub fn join(
        self: Arc<Self>,
        organization_id: u64,
        sender: UnboundedSender<String>,
    ) -> GroupMembership {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.orgs
            .lock()
            .unwrap()
            .entry(organization_id)
            .or_default()
            .insert(conn_id, sender);
        debug!(topic = %Self::topic(organization_id), conn_id, "connection joined");
        GroupMembership {
            gateway: self,
            organization_id,
            conn_id,
        }
    }

    /// Fire-and-forget fan-out: a closed member never blocks or fails the
    /// originating caller, it is just pruned from the group.
    pub fn broadcast(&self, organization_id: u64, payload: &str) {
        let mut orgs = self.orgs.lock().unwrap();
        if let Some(group) = orgs.get_mut(&organization_id) {
            group.retain(|_, sender| sender.send(payload.to_owned()).is_ok());
            if group.is_empty() {
                orgs.remove(&organization_id);
            }
        }
    }

    pub fn group_size(&self, organization_id: u64) -> usize {
        self.orgs
            .lock()
            .unwrap()
            .get(&organization_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    fn leave(&self, organization_id: u64, conn_id: u64) {
        let mut orgs = self.orgs.lock().unwrap();
        if let Some(group) = orgs.get_mut(&organization_id) {
            group.remove(&conn_id);
            if group.is_empty() {
                orgs.remove(&organization_id);
            }
        }
        debug!(topic = %Self::topic(organization_id), conn_id, "connection left");
    }
}

impl Drop for GroupMembership {
    fn drop(&mut self) {
        self.gateway.leave(self.organization_id, self.conn_id);
    }
}
