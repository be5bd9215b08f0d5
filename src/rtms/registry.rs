use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Which of a session's two channels a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Control,
    Data,
}

/// Command consumed by a channel's writer task, which exclusively owns the
/// WebSocket sink. Everything that wants to transmit on a channel goes
/// through this, including cross-channel notifications and teardown.
#[derive(Debug)]
pub enum ChannelCommand {
    /// Transmit one serialized frame
    Send(String),
    /// Send a close frame and stop the writer
    Close,
}

/// Non-owning reference to an open channel. The session task owns the
/// connection; the registry and collaborating sessions hold clones of this
/// handle for sending and teardown only.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    role: ChannelRole,
    commands: mpsc::Sender<ChannelCommand>,
}

impl ChannelHandle {
    pub fn new(role: ChannelRole, commands: mpsc::Sender<ChannelCommand>) -> Self {
        Self { role, commands }
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    /// Queue one serialized frame for transmission. Fails if the channel's
    /// writer task has already stopped.
    pub async fn send_text(&self, frame: String) -> Result<()> {
        self.commands
            .send(ChannelCommand::Send(frame))
            .await
            .context("channel writer has stopped")
    }

    /// Request a close. Idempotent: once the writer task has exited the
    /// command queue is gone and subsequent closes are no-ops.
    pub async fn close(&self) {
        if self.commands.send(ChannelCommand::Close).await.is_err() {
            debug!(role = ?self.role, "channel already closed");
        }
    }
}

#[derive(Default)]
struct SessionChannels {
    control: Option<ChannelHandle>,
    data: Option<ChannelHandle>,
}

/// Map from session id to that session's registered channel handles.
///
/// Registration is last-write-wins per (session, role); the lifecycle layer
/// is responsible for tearing down a previous registration before starting a
/// replacement session. The mutex serializes concurrent teardown requests so
/// a channel is closed through the registry at most once.
pub struct ConnectionRegistry {
    sessions: Mutex<HashMap<String, SessionChannels>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Store (or overwrite) the handle for `(session_id, handle.role())`.
    pub async fn register(&self, session_id: &str, handle: ChannelHandle) {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.entry(session_id.to_string()).or_default();
        match handle.role() {
            ChannelRole::Control => entry.control = Some(handle),
            ChannelRole::Data => entry.data = Some(handle),
        }
        debug!(session_id, "channel registered");
    }

    /// Whatever is currently registered for the session; both may be absent.
    pub async fn lookup(&self, session_id: &str) -> (Option<ChannelHandle>, Option<ChannelHandle>) {
        let sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(entry) => (entry.control.clone(), entry.data.clone()),
            None => (None, None),
        }
    }

    /// Drop one channel's registration, e.g. when its session loop exits.
    /// The session entry disappears once both channels are gone.
    pub async fn remove_channel(&self, session_id: &str, role: ChannelRole) {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            match role {
                ChannelRole::Control => entry.control = None,
                ChannelRole::Data => entry.data = None,
            }
            if entry.control.is_none() && entry.data.is_none() {
                sessions.remove(session_id);
            }
        }
    }

    /// Close every channel registered for the session (best-effort; a close
    /// failure on one channel does not prevent attempting the other) and
    /// remove the entry. Concurrent calls serialize on the map lock: the
    /// second caller finds no entry and does nothing.
    pub async fn teardown_all(&self, session_id: &str) {
        let entry = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(session_id)
        };

        let Some(entry) = entry else {
            debug!(session_id, "teardown requested for unregistered session");
            return;
        };

        info!(session_id, "tearing down session channels");

        if let Some(control) = entry.control {
            control.close().await;
        }
        if let Some(data) = entry.data {
            data.close().await;
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
