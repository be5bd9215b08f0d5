use super::media::MediaSession;
use super::messages::{
    self, KeepAliveResponse, ServerMessage, SignalingHandshakeRequest,
};
use super::registry::{ChannelCommand, ChannelHandle, ChannelRole, ConnectionRegistry};
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

/// Control-channel lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Connecting,
    AwaitingHandshake,
    Active,
    Terminating,
    Closed,
}

/// What the state machine wants done in response to one inbound frame
#[derive(Debug)]
pub enum SignalingAction {
    /// Echo a keep-alive on this channel
    Reply(KeepAliveResponse),
    /// Handshake succeeded and advertised a data-channel URL
    StartMedia(String),
    /// Exit the receive loop
    Shutdown,
}

/// The control channel's protocol logic, separated from I/O so transitions
/// are testable against frames alone.
pub struct SignalingMachine {
    state: SignalingState,
    session_id: String,
    stream_id: String,
}

impl SignalingMachine {
    pub fn new(session_id: &str, stream_id: &str) -> Self {
        Self {
            state: SignalingState::Connecting,
            session_id: session_id.to_string(),
            stream_id: stream_id.to_string(),
        }
    }

    pub fn state(&self) -> SignalingState {
        self.state
    }

    /// Build the msgType-1 handshake and move to AwaitingHandshake.
    pub fn handshake_request(&mut self, client_id: &str, secret: &str) -> SignalingHandshakeRequest {
        let signature = signature::sign(client_id, &self.session_id, &self.stream_id, secret);
        let sequence = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.state = SignalingState::AwaitingHandshake;
        SignalingHandshakeRequest::new(&self.session_id, &self.stream_id, sequence, signature)
    }

    /// Dispatch one inbound frame against the current state.
    pub fn on_message(&mut self, msg: ServerMessage) -> Vec<SignalingAction> {
        match (self.state, msg) {
            (
                SignalingState::AwaitingHandshake,
                ServerMessage::SignalingHandshakeResponse {
                    status_code,
                    media_server_urls,
                },
            ) => {
                if status_code != messages::STATUS_OK {
                    error!(
                        session_id = %self.session_id,
                        status_code, "signaling handshake rejected"
                    );
                    self.state = SignalingState::Terminating;
                    return vec![SignalingAction::Shutdown];
                }

                self.state = SignalingState::Active;
                info!(session_id = %self.session_id, "signaling channel active");

                match media_server_urls.as_ref().and_then(|u| u.preferred()) {
                    Some(url) => vec![SignalingAction::StartMedia(url.to_string())],
                    None => {
                        // Active with no data channel: this session will never
                        // produce a transcript.
                        warn!(
                            session_id = %self.session_id,
                            "handshake advertised no media server URL"
                        );
                        vec![]
                    }
                }
            }

            (
                SignalingState::AwaitingHandshake | SignalingState::Active,
                ServerMessage::KeepAliveRequest { timestamp },
            ) => vec![SignalingAction::Reply(KeepAliveResponse::echoing(timestamp))],

            (SignalingState::Active, ServerMessage::StreamStateUpdate { state })
                if state == messages::STREAM_STATE_TERMINATED =>
            {
                info!(session_id = %self.session_id, "stream terminated by peer");
                self.state = SignalingState::Terminating;
                vec![SignalingAction::Shutdown]
            }

            (_, ServerMessage::Unknown { msg_type }) => {
                warn!(
                    session_id = %self.session_id,
                    msg_type, "ignoring unconsumed message type on control channel"
                );
                vec![]
            }

            (state, msg) => {
                warn!(
                    session_id = %self.session_id,
                    ?state, ?msg, "ignoring unexpected control-channel message"
                );
                vec![]
            }
        }
    }

    /// The connection is gone, whatever state we were in.
    pub fn on_closed(&mut self) {
        self.state = SignalingState::Closed;
    }
}

/// Owns one control-channel connection for the lifetime of a session.
pub struct SignalingSession {
    pub session_id: String,
    pub stream_id: String,
    pub control_url: String,
    pub rtms: RtmsConfig,
    pub registry: Arc<ConnectionRegistry>,
    /// Where the (eventual) media session delivers transcript chunks
    pub chunks: mpsc::Sender<String>,
}

impl SignalingSession {
    /// Connect, handshake, and serve the control channel until termination.
    /// No automatic reconnection: a fresh start event is the only restart path.
    pub async fn run(self) -> Result<()> {
        info!(session_id = %self.session_id, url = %self.control_url, "connecting control channel");

        let handshake_timeout = Duration::from_secs(self.rtms.handshake_timeout_secs);

        let (ws_stream, _) = tokio::time::timeout(handshake_timeout, connect_async(&self.control_url))
            .await
            .context("control channel connect timed out")?
            .context("control channel connect failed")?;
        let (mut write, mut read) = ws_stream.split();

        // Writer task: exclusive owner of the sink. The registry handle and
        // this loop both transmit through its command queue.
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ChannelCommand>(32);
        let writer_session = self.session_id.clone();
        let writer = tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    ChannelCommand::Send(frame) => {
                        if let Err(e) = write.send(Message::Text(frame)).await {
                            warn!(session_id = %writer_session, "control send failed: {e}");
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

        let handle = ChannelHandle::new(ChannelRole::Control, cmd_tx);
        self.registry.register(&self.session_id, handle.clone()).await;

        let mut machine = SignalingMachine::new(&self.session_id, &self.stream_id);
        let request = machine.handshake_request(&self.rtms.client_id, &self.rtms.client_secret);
        if let Err(e) = send_json(&handle, &request).await {
            warn!(session_id = %self.session_id, "control handshake send failed: {e:#}");
        }

        'recv: loop {
            let next = if machine.state() == SignalingState::AwaitingHandshake {
                match tokio::time::timeout(handshake_timeout, read.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(session_id = %self.session_id, "control handshake timed out");
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
                    warn!(session_id = %self.session_id, "control channel error: {e}");
                    break 'recv;
                }
            };

            let msg = match ServerMessage::parse(&frame) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(session_id = %self.session_id, "dropping malformed control frame: {e:#}");
                    continue 'recv;
                }
            };

            for action in machine.on_message(msg) {
                match action {
                    SignalingAction::Reply(reply) => {
                        if let Err(e) = send_json(&handle, &reply).await {
                            warn!(session_id = %self.session_id, "keep-alive reply failed: {e:#}");
                            break 'recv;
                        }
                    }
                    SignalingAction::StartMedia(url) => {
                        let media = MediaSession {
                            session_id: self.session_id.clone(),
                            stream_id: self.stream_id.clone(),
                            media_url: url,
                            rtms: self.rtms.clone(),
                            registry: Arc::clone(&self.registry),
                            signaling: handle.clone(),
                            chunks: self.chunks.clone(),
                        };
                        let session_id = self.session_id.clone();
                        tokio::spawn(async move {
                            if let Err(e) = media.run().await {
                                error!(session_id = %session_id, "media session failed: {e:#}");
                            }
                        });
                    }
                    SignalingAction::Shutdown => break 'recv,
                }
            }
        }

        machine.on_closed();
        handle.close().await;
        self.registry
            .remove_channel(&self.session_id, ChannelRole::Control)
            .await;
        let _ = writer.await;

        info!(session_id = %self.session_id, "control channel closed");
        Ok(())
    }
}

/// Serialize one outbound message and queue it on the channel.
pub(crate) async fn send_json<T: serde::Serialize>(handle: &ChannelHandle, msg: &T) -> Result<()> {
    let frame = serde_json::to_string(msg).context("failed to serialize outbound frame")?;
    handle.send_text(frame).await
}
