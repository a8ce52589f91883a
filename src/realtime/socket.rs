//! WebSocket endpoint for conversation rooms.
//!
//! The handshake token is decoded with signature verification only; an
//! expired token still identifies the socket. Connections without a valid
//! token are accepted but cannot join any room.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query,
    },
    http::HeaderMap,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    events::{ClientEvent, ServerEvent},
    registry::{ConnectionId, RoomRegistry},
};
use crate::{
    middleware::{cookie_token, header_token},
    models::chatmodels::RoomId,
    utils::token,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

pub async fn socket_handler(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<Arc<AppState>>,
    Query(params): Query<SocketParams>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user_id = authenticate(
        [params.token, header_token(&headers), cookie_token(&cookie_jar)],
        app_state.env.jwt_secret.as_bytes(),
    );

    let rooms = app_state.rooms.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, rooms, user_id))
}

async fn handle_socket(socket: WebSocket, rooms: Arc<dyn RoomRegistry>, user_id: Option<Uuid>) {
    let (session, mut outbound_rx) = SocketSession::open(rooms, user_id).await;
    let (mut ws_sender, mut ws_receiver) = socket.split();

    loop {
        tokio::select! {
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!("Failed to serialize socket event: {err}"),
                }
            }

            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => session.handle_frame(&text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    session.close().await;
}

/// First candidate token that decodes to a user id. Query, header and
/// cookie are tried in that order; a stale or foreign token in one place
/// does not hide a valid one in another.
pub fn authenticate<I>(candidates: I, secret: &[u8]) -> Option<Uuid>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates.into_iter().flatten().find_map(|raw| {
        token::decode_token_ignoring_expiry(raw, secret)
            .ok()
            .and_then(|sub| Uuid::parse_str(&sub).ok())
    })
}

/// Checks a join request: the key must be non-empty, the socket must be
/// authenticated, and its user must be one of the two ids in the key.
pub fn authorize_join(user_id: Option<Uuid>, raw_room: &str) -> Result<RoomId, &'static str> {
    let room = RoomId::parse(raw_room).ok_or("Room id is required")?;
    let user_id = user_id.ok_or("Authentication is required to join a room")?;
    if !room.includes(user_id) {
        return Err("You are not a participant in this conversation");
    }
    Ok(room)
}

/// One connected socket: its identity, its outbound queue and its rooms.
pub struct SocketSession {
    pub id: ConnectionId,
    pub user_id: Option<Uuid>,
    rooms: Arc<dyn RoomRegistry>,
    outbound: mpsc::UnboundedSender<ServerEvent>,
}

impl SocketSession {
    pub async fn open(
        rooms: Arc<dyn RoomRegistry>,
        user_id: Option<Uuid>,
    ) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        rooms.register(id, outbound.clone()).await;
        tracing::debug!(socket_id = %id, user_id = ?user_id, "socket connected");

        (
            Self {
                id,
                user_id,
                rooms,
                outbound,
            },
            outbound_rx,
        )
    }

    pub async fn handle_frame(&self, text: &str) {
        let event: ClientEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(socket_id = %self.id, error = %err, "Ignoring malformed socket frame");
                return;
            }
        };

        match event {
            ClientEvent::JoinRoom(room) => self.join(&room).await,
            ClientEvent::LeaveRoom(room) => self.leave(&room).await,
        }
    }

    async fn join(&self, raw_room: &str) {
        let room = match authorize_join(self.user_id, raw_room) {
            Ok(room) => room,
            Err(message) => {
                tracing::debug!(socket_id = %self.id, room = raw_room, "join refused: {message}");
                self.reply(ServerEvent::Error {
                    message: message.to_string(),
                });
                return;
            }
        };

        if !self.rooms.join(self.id, room.clone()).await {
            self.reply(ServerEvent::Error {
                message: "Connection is no longer registered".to_string(),
            });
            return;
        }

        tracing::debug!(socket_id = %self.id, room = %room, "socket joined room");
        self.reply(ServerEvent::ConnectionConfirmed {
            message: "Joined conversation room".to_string(),
            socket_id: self.id,
            room_id: room.to_string(),
        });
    }

    async fn leave(&self, raw_room: &str) {
        let Some(room) = RoomId::parse(raw_room) else {
            return;
        };
        if self.rooms.leave(self.id, &room).await {
            tracing::debug!(socket_id = %self.id, room = %room, "socket left room");
        }
    }

    pub async fn close(self) {
        self.rooms.disconnect(self.id).await;
        tracing::debug!(socket_id = %self.id, "socket disconnected");
    }

    fn reply(&self, event: ServerEvent) {
        // The receiver only goes away when the socket task is ending
        let _ = self.outbound.send(event);
    }
}
