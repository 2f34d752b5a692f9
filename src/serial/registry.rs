//! Port-name to session registry
//!
//! The single piece of process-wide serial state. All mutations happen under
//! one lock so that "open replaces existing" and "release removes entry" are
//! atomic with respect to concurrent connects on the same port.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::SerialError;
use crate::serial::device::PortOpener;
use crate::serial::session::{SerialSession, SessionConfig, SessionEvents};

/// Owns every open serial session, at most one per device path
pub struct SessionRegistry {
    opener: Arc<dyn PortOpener>,
    config: SessionConfig,
    sessions: Mutex<HashMap<String, SerialSession>>,
}

impl SessionRegistry {
    pub fn new(opener: Arc<dyn PortOpener>, config: SessionConfig) -> Self {
        Self {
            opener,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Open `port`, closing any session that already holds it first
    pub async fn open(
        &self,
        port: &str,
        baud_rate: u32,
    ) -> Result<(SerialSession, SessionEvents), SerialError> {
        let mut sessions = self.sessions.lock().await;

        if let Some(previous) = sessions.remove(port) {
            log::info!(
                "Evicting serial session {} on {} for a new monitor",
                previous.id(),
                port
            );
            previous.close().await;
        }

        // The lock is held across the open so a concurrent connect cannot slip in
        let (session, events) =
            SerialSession::open(self.opener.clone(), port, baud_rate, &self.config).await?;
        sessions.insert(port.to_string(), session.clone());

        log::info!(
            "Serial session {} opened on {} at {} baud",
            session.id(),
            port,
            baud_rate
        );
        Ok((session, events))
    }

    /// Close `session` and drop its registry entry if it still owns the port
    pub async fn release(&self, session: &SerialSession) {
        {
            let mut sessions = self.sessions.lock().await;
            let owns_port = sessions
                .get(session.port())
                .is_some_and(|current| current.id() == session.id());
            if owns_port {
                sessions.remove(session.port());
            }
        }
        session.close().await;
    }

    /// Close every open session
    pub async fn close_all(&self) {
        let drained: Vec<SerialSession> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, session)| session).collect()
        };

        if !drained.is_empty() {
            log::info!("Closing {} serial sessions", drained.len());
        }
        for session in drained {
            session.close().await;
        }
    }

    pub async fn get(&self, port: &str) -> Option<SerialSession> {
        self.sessions.lock().await.get(port).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
