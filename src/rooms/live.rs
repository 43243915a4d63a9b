//! Per-connection session: authenticate, register, stream, tear down.

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures_util::{SinkExt, Stream, StreamExt};
use uuid::Uuid;

use super::{
    msg::NewMessage,
    registry::{Outbound, Registration},
    wire::{self, Inbound, WireMessage},
    Hub,
};
use crate::error::{ChatError, ChatResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshaking,
    Authenticated,
    Streaming,
    Closed,
}

pub struct LiveSession {
    hub: Hub,
    user_id: Uuid,
    registration: Registration,
    state: SessionState,
}

/// Runs one connection from handshake to teardown.
pub async fn handle_connect<S>(
    hub: Hub,
    identity: ChatResult<Uuid>,
    outbound: Outbound,
    inbound: S,
) -> ChatResult<()>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    LiveSession::handshake(hub, identity, outbound).await?.run(inbound).await
}

impl LiveSession {
    /// Completes the handshake. Without an identity the peer gets a policy
    /// close frame and nothing is registered.
    pub async fn handshake(hub: Hub, identity: ChatResult<Uuid>, mut outbound: Outbound) -> ChatResult<Self> {
        tracing::trace!(state = ?SessionState::Handshaking, "handshake");
        match identity {
            Ok(user_id) => Ok(Self::start(hub, user_id, outbound)),
            Err(err) => {
                tracing::info!(error = %err, "rejected unauthenticated connection");
                let frame = CloseFrame {
                    code: close_code::POLICY,
                    reason: "unauthorized".into(),
                };
                if let Err(err) = outbound.send(Message::Close(Some(frame))).await {
                    tracing::debug!(error = %err, "failed to send close frame");
                }
                Err(err)
            }
        }
    }

    /// Registers an already authenticated connection.
    pub fn start(hub: Hub, user_id: Uuid, outbound: Outbound) -> Self {
        let registration = hub.registry.register(user_id, outbound);
        tracing::info!(%user_id, conn_id = registration.peer().conn_id(), "session authenticated");
        Self {
            hub,
            user_id,
            registration,
            state: SessionState::Authenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conn_id(&self) -> u64 {
        self.registration.peer().conn_id()
    }

    /// Reads frames until the peer closes or an error ends the session. The
    /// connection is unregistered and closed on every exit path.
    pub async fn run<S>(mut self, mut inbound: S) -> ChatResult<()>
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        self.state = SessionState::Streaming;
        let result = self.stream(&mut inbound).await;
        self.state = SessionState::Closed;

        let (user_id, conn_id, state) = (self.user_id, self.conn_id(), self.state);
        match &result {
            Ok(()) => tracing::info!(%user_id, conn_id, ?state, "session ended"),
            Err(err) => tracing::info!(%user_id, conn_id, ?state, error = %err, "session terminated"),
        }
        self.close().await;
        result
    }

    async fn stream<S>(&mut self, inbound: &mut S) -> ChatResult<()>
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        while let Some(frame) = inbound.next().await {
            match wire::decode(frame?)? {
                Inbound::Message(message) => self.on_message(message).await?,
                Inbound::Skip => continue,
                Inbound::Close => break,
            }
        }
        Ok(())
    }

    async fn on_message(&self, message: WireMessage) -> ChatResult<()> {
        let WireMessage { room_id, content, .. } = message;

        let Some(member) = self.hub.rooms.membership(self.user_id, room_id).await? else {
            return Err(ChatError::protocol(format!("not a member of room {room_id}")));
        };

        let stored = self
            .hub
            .messages
            .append(NewMessage {
                room_id,
                room_member_id: member.id,
                user_id: self.user_id,
                content,
            })
            .await?;

        let report = self.hub.fanout.fanout(self.user_id, room_id, &stored.content).await?;
        if !report.failed.is_empty() {
            tracing::debug!(message_id = %stored.id, failed = report.failed.len(), "message partially delivered");
        }
        Ok(())
    }

    async fn close(self) {
        let LiveSession { registration, .. } = self;
        let peer = registration.peer().clone();
        drop(registration);
        peer.close().await;
    }
}
