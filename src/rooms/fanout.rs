use std::sync::Arc;

use futures_util::future::join_all;
use uuid::Uuid;

use super::{
    directory::{MemberFilter, RoomDirectory},
    registry::ConnectionRegistry,
    wire::{self, WireMessage},
};
use crate::error::ChatResult;

/// Outcome of delivering one message to a room.
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub delivered: Vec<Uuid>,
    /// Members with no live connection.
    pub offline: Vec<Uuid>,
    pub failed: Vec<(Uuid, axum::Error)>,
}

#[derive(Clone)]
pub struct Fanout {
    rooms: RoomDirectory,
    registry: Arc<ConnectionRegistry>,
}

impl Fanout {
    pub fn new(rooms: RoomDirectory, registry: Arc<ConnectionRegistry>) -> Self {
        Self { rooms, registry }
    }

    /// Delivers `content` to every live member of `room_id`, the sender
    /// included. A failed write only affects that recipient; it is logged and
    /// listed in the report while the other writes carry on.
    pub async fn fanout(&self, sender_id: Uuid, room_id: Uuid, content: &str) -> ChatResult<FanoutReport> {
        let members = self.rooms.get_members(MemberFilter::room(room_id)).await?;
        let frame = wire::encode(&WireMessage {
            room_id,
            content: content.to_owned(),
            user_id: Some(sender_id),
        })?;

        let mut report = FanoutReport::default();
        let mut peers = Vec::with_capacity(members.len());
        for member in members {
            match self.registry.lookup(member.user_id) {
                Some(peer) => peers.push(peer),
                None => report.offline.push(member.user_id),
            }
        }

        let writes = peers.iter().map(|peer| {
            let frame = frame.clone();
            async move { (peer.user_id(), peer.send(frame).await) }
        });

        // waits for every write to finish; a stalled peer stalls the sender
        for (user_id, result) in join_all(writes).await {
            match result {
                Ok(()) => report.delivered.push(user_id),
                Err(err) => {
                    tracing::warn!(%room_id, %user_id, error = %err, "fanout write failed");
                    report.failed.push((user_id, err));
                }
            }
        }

        tracing::debug!(
            %room_id,
            %sender_id,
            delivered = report.delivered.len(),
            offline = report.offline.len(),
            failed = report.failed.len(),
            "fanout complete"
        );
        Ok(report)
    }
}
