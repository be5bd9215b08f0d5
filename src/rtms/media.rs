use super::messages::{self, DataHandshakeRequest, KeepAliveResponse, ServerMessage, StreamStateUpdate};
use super::registry::{ChannelCommand, ChannelHandle, ChannelRole, ConnectionRegistry};
use super::signaling::send_json;
use super::signature;
use crate::config::RtmsConfig;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

/// Data-channel lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Connecting,
    AwaitingHandshake,
    Active,
    Closed,
}

#[derive(Debug)]
pub enum MediaAction {
    /// Echo a keep-alive on this (data) channel
    Reply(KeepAliveResponse),
    /// Tell the control plane data is flowing, on the signaling channel
    NotifySignaling(StreamStateUpdate),
    /// One decoded transcript chunk for the pipeline
    Chunk(String),
    /// Exit the receive loop
    Shutdown,
}

/// The data channel's protocol logic, separated from I/O.
pub struct MediaMachine {
    state: MediaState,
    session_id: String,
    stream_id: String,
}

impl MediaMachine {
    pub fn new(session_id: &str, stream_id: &str) -> Self {
        Self {
            state: MediaState::Connecting,
            session_id: session_id.to_string(),
            stream_id: stream_id.to_string(),
        }
    }

    pub fn state(&self) -> MediaState {
        self.state
    }

    /// Build the msgType-3 handshake (transcript media, encryption off) and
    /// move to AwaitingHandshake.
    pub fn handshake_request(&mut self, client_id: &str, secret: &str) -> DataHandshakeRequest {
        let signature = signature::sign(client_id, &self.session_id, &self.stream_id, secret);
        self.state = MediaState::AwaitingHandshake;
        DataHandshakeRequest::new(&self.session_id, &self.stream_id, signature)
    }

    pub fn on_message(&mut self, msg: ServerMessage) -> Vec<MediaAction> {
        match (self.state, msg) {
            (MediaState::AwaitingHandshake, ServerMessage::DataHandshakeResponse { status_code }) => {
                if status_code != messages::STATUS_OK {
                    error!(
                        session_id = %self.session_id,
                        status_code, "data handshake rejected"
                    );
                    return vec![MediaAction::Shutdown];
                }

                // The transition to Active happens exactly once, so the
                // control plane sees exactly one "active" notification.
                self.state = MediaState::Active;
                info!(session_id = %self.session_id, "media channel active");
                let timestamp = chrono::Utc::now().timestamp_millis();
                vec![MediaAction::NotifySignaling(StreamStateUpdate::active(timestamp))]
            }

            (
                MediaState::AwaitingHandshake | MediaState::Active,
                ServerMessage::KeepAliveRequest { timestamp },
            ) => vec![MediaAction::Reply(KeepAliveResponse::echoing(timestamp))],

            (MediaState::Active, ServerMessage::TranscriptData { text }) => {
                if text.is_empty() {
                    vec![]
                } else {
                    vec![MediaAction::Chunk(text)]
                }
            }

            (_, ServerMessage::Unknown { msg_type }) => {
                warn!(
                    session_id = %self.session_id,
                    msg_type, "ignoring unconsumed message type on data channel"
                );
                vec![]
            }

            (state, msg) => {
                warn!(
                    session_id = %self.session_id,
                    ?state, ?msg, "ignoring unexpected data-channel message"
                );
                vec![]
            }
        }
    }

    pub fn on_closed(&mut self) {
        self.state = MediaState::Closed;
    }
}

/// Owns one data-channel connection. Started by the signaling session once
/// its handshake advertises a media server URL.
pub struct MediaSession {
    pub session_id: String,
    pub stream_id: String,
    pub media_url: String,
    pub rtms: RtmsConfig,
    pub registry: Arc<ConnectionRegistry>,
    /// The control channel, for the one-shot "active" state update
    pub signaling: ChannelHandle,
    pub chunks: mpsc::Sender<String>,
}

impl MediaSession {
    /// Connect, handshake, and forward transcript chunks until the peer
    /// closes. No automatic reconnection.
    ///
    /// Transport note: the service this protocol was observed against runs
    /// the data channel with certificate validation disabled. This
    /// implementation keeps standard TLS verification on both channels; see
    /// DESIGN.md if interop with a self-signed media endpoint is needed.
    pub async fn run(self) -> Result<()> {
        info!(session_id = %self.session_id, url = %self.media_url, "connecting media channel");

        let handshake_timeout = Duration::from_secs(self.rtms.handshake_timeout_secs);

        let (ws_stream, _) = tokio::time::timeout(handshake_timeout, connect_async(&self.media_url))
            .await
            .context("media channel connect timed out")?
            .context("media channel connect failed")?;
        let (mut write, mut read) = ws_stream.split();

        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ChannelCommand>(32);
        let writer_session = self.session_id.clone();
        let writer = tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    ChannelCommand::Send(frame) => {
                        if let Err(e) = write.send(Message::Text(frame)).await {
                            warn!(session_id = %writer_session, "media send failed: {e}");
                            break;
                        }
                    }
                    ChannelCommand::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        let handle = ChannelHandle::new(ChannelRole::Data, cmd_tx);
        self.registry.register(&self.session_id, handle.clone()).await;

        let mut machine = MediaMachine::new(&self.session_id, &self.stream_id);
        let request = machine.handshake_request(&self.rtms.client_id, &self.rtms.client_secret);
        if let Err(e) = send_json(&handle, &request).await {
            warn!(session_id = %self.session_id, "data handshake send failed: {e:#}");
        }

        'recv: loop {
            let next = if machine.state() == MediaState::AwaitingHandshake {
                match tokio::time::timeout(handshake_timeout, read.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(session_id = %self.session_id, "data handshake timed out");
                        break 'recv;
                    }
                }
            } else {
                read.next().await
            };

            let frame = match next {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => break 'recv,
                Some(Ok(_)) => continue 'recv,
                Some(Err(e)) => {
                    warn!(session_id = %self.session_id, "media channel error: {e}");
                    break 'recv;
                }
            };

            let msg = match ServerMessage::parse(&frame) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(session_id = %self.session_id, "dropping malformed media frame: {e:#}");
                    continue 'recv;
                }
            };

            for action in machine.on_message(msg) {
                match action {
                    MediaAction::Reply(reply) => {
                        if let Err(e) = send_json(&handle, &reply).await {
                            warn!(session_id = %self.session_id, "keep-alive reply failed: {e:#}");
                            break 'recv;
                        }
                    }
                    MediaAction::NotifySignaling(update) => {
                        if let Err(e) = send_json(&self.signaling, &update).await {
                            // The control plane missing the notification is
                            // not a reason to drop the transcript stream.
                            warn!(session_id = %self.session_id, "stream-state notify failed: {e:#}");
                        }
                    }
                    MediaAction::Chunk(text) => {
                        if self.chunks.send(text).await.is_err() {
                            warn!(session_id = %self.session_id, "pipeline stopped; discarding chunk");
                        }
                    }
                    MediaAction::Shutdown => break 'recv,
                }
            }
        }

        machine.on_closed();
        handle.close().await;
        self.registry
            .remove_channel(&self.session_id, ChannelRole::Data)
            .await;
        let _ = writer.await;

        info!(session_id = %self.session_id, "media channel closed");
        Ok(())
    }
}
