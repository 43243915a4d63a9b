//! Shared fixtures for unit tests.

use std::pin::Pin;

use axum::extract::ws::Message;
use futures_util::{sink, stream, Stream};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    db,
    rooms::{registry::Outbound, wire::{self, Inbound, WireMessage}, Hub},
    users::{self, NewUser},
};

pub type InboundStream = Pin<Box<dyn Stream<Item = Result<Message, axum::Error>> + Send>>;

/// A migrated database in a scratch directory; keep the directory alive.
pub async fn db_pool() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let options = SqliteConnectOptions::new().filename(dir.path().join("test.db"));
    let db_pool = db::connect_with(options, 8).await.unwrap();
    (db_pool, dir)
}

pub async fn hub() -> (Hub, SqlitePool, TempDir) {
    let (db_pool, dir) = db_pool().await;
    (Hub::new(db_pool.clone()), db_pool, dir)
}

pub async fn user(db_pool: &SqlitePool, first_name: &str) -> Uuid {
    let new_user = NewUser {
        first_name: Some(first_name.to_owned()),
        ..Default::default()
    };
    users::create_user(db_pool, new_user).await.unwrap().id
}

/// An outbound sink whose frames land in the returned receiver.
pub fn channel() -> (Outbound, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let outbound = sink::unfold(tx, |tx, frame: Message| async move {
        tx.send(frame).map_err(axum::Error::new)?;
        Ok::<_, axum::Error>(tx)
    });
    (Box::pin(outbound), rx)
}

/// An inbound stream fed by the returned sender; it ends once the sender drops.
pub fn inbound() -> (mpsc::UnboundedSender<Result<Message, axum::Error>>, InboundStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let inbound = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|frame| (frame, rx)) });
    (tx, Box::pin(inbound))
}

pub fn wire(frame: Message) -> WireMessage {
    match wire::decode(frame).unwrap() {
        Inbound::Message(message) => message,
        other => panic!("expected a message frame, got {other:?}"),
    }
}

pub fn text(frame: Message) -> String {
    match frame {
        Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}
