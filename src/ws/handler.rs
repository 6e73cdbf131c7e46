//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::RoomCommand;
use crate::util::rate_limit::SessionRateLimiter;
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// WebSocket upgrade handler. Every connection is an anonymous session.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let mut outbound = state.hub.register(session_id);
    debug!(session_id = %session_id, connected = state.hub.connected(), "Session registered");

    // Writer task: session queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let rate_limiter = SessionRateLimiter::new();

    // Reader loop: WebSocket -> lobby / room
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(session_id = %session_id, "Rate limited input message");
                    continue;
                }

                match ClientMsg::parse(&text) {
                    Ok(ClientMsg::JoinGame) if !rate_limiter.check_join() => {
                        warn!(session_id = %session_id, "Rate limited lobby join");
                    }
                    Ok(client_msg) => route_client_msg(&state, session_id, client_msg).await,
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Dropping client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup on disconnect
    state.lobby.leave(&session_id);
    state.registry.leave(session_id).await;
    state.hub.unregister(&session_id);
    writer_handle.abort();

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Route one parsed client message to the lobby or the session's room
pub async fn route_client_msg(state: &AppState, session_id: Uuid, msg: ClientMsg) {
    match msg {
        ClientMsg::JoinGame => state.lobby.join(session_id),
        ClientMsg::PlayerUpdate(input) => {
            let room_id = input.room_id;
            let command = RoomCommand::Move { session_id, input };
            state.registry.dispatch(session_id, room_id, command).await;
        }
        ClientMsg::Ability(target) => {
            let command = RoomCommand::Ability { session_id };
            state.registry.dispatch(session_id, target.room_id, command).await;
        }
        ClientMsg::Attack(target) => {
            let command = RoomCommand::Attack { session_id };
            state.registry.dispatch(session_id, target.room_id, command).await;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), ProtocolError> {
    let json = msg.to_json()?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}
