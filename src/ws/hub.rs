//! Session hub - outbound channels for every connected session

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Outbound queue depth per session
const SESSION_BUFFER: usize = 256;

/// Routes server messages to connected sessions.
///
/// Sends never block: a full queue drops the message for that session only.
pub struct SessionHub {
    sessions: DashMap<Uuid, mpsc::Sender<ServerMsg>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a session and get the receiving half of its queue
    pub fn register(&self, session_id: Uuid) -> mpsc::Receiver<ServerMsg> {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.sessions.insert(session_id, tx);
        rx
    }

    pub fn unregister(&self, session_id: &Uuid) {
        self.sessions.remove(session_id);
    }

    pub fn is_connected(&self, session_id: &Uuid) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn connected(&self) -> usize {
        self.sessions.len()
    }

    /// Send to one session. Returns false if the message was not queued.
    pub fn send(&self, session_id: &Uuid, msg: ServerMsg) -> bool {
        let Some(tx) = self.sessions.get(session_id) else {
            debug!(session_id = %session_id, "Dropping message for unknown session");
            return false;
        };
        match tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(session_id = %session_id, "Session queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id = %session_id, "Session queue closed");
                false
            }
        }
    }

    /// Send to every listed session
    pub fn broadcast(&self, session_ids: &[Uuid], msg: &ServerMsg) {
        for id in session_ids {
            self.send(id, msg.clone());
        }
    }

    /// Send to every listed session except one
    pub fn broadcast_except(&self, session_ids: &[Uuid], except: &Uuid, msg: &ServerMsg) {
        for id in session_ids.iter().filter(|id| *id != except) {
            self.send(id, msg.clone());
        }
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_everyone_but_the_excluded() {
        let hub = SessionHub::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = hub.register(a);
        let mut rx_b = hub.register(b);

        hub.broadcast(&[a, b], &ServerMsg::LobbyFull);
        assert!(matches!(rx_a.try_recv(), Ok(ServerMsg::LobbyFull)));
        assert!(matches!(rx_b.try_recv(), Ok(ServerMsg::LobbyFull)));

        hub.broadcast_except(&[a, b], &a, &ServerMsg::LobbyFull);
        assert!(rx_a.try_recv().is_err());
        assert!(matches!(rx_b.try_recv(), Ok(ServerMsg::LobbyFull)));
    }

    #[test]
    fn unknown_or_departed_sessions_are_skipped() {
        let hub = SessionHub::new();
        let a = Uuid::new_v4();
        assert!(!hub.send(&a, ServerMsg::LobbyFull));

        let rx = hub.register(a);
        assert!(hub.is_connected(&a));
        drop(rx);
        assert!(!hub.send(&a, ServerMsg::LobbyFull));

        hub.unregister(&a);
        assert_eq!(hub.connected(), 0);
    }
}
