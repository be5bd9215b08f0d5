use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Wire msgType values. These are the protocol's binding contract.
pub mod msg_type {
    pub const SIGNALING_HANDSHAKE_REQUEST: u16 = 1;
    pub const SIGNALING_HANDSHAKE_RESPONSE: u16 = 2;
    pub const DATA_HANDSHAKE_REQUEST: u16 = 3;
    pub const DATA_HANDSHAKE_RESPONSE: u16 = 4;
    pub const STREAM_STATE_UPDATE: u16 = 7;
    pub const KEEP_ALIVE_REQUEST: u16 = 12;
    pub const KEEP_ALIVE_RESPONSE: u16 = 13;
    pub const TRANSCRIPT_DATA: u16 = 17;
}

pub const PROTOCOL_VERSION: u8 = 1;

/// mediaType selector for transcript payloads in the data handshake
pub const MEDIA_TYPE_TRANSCRIPT: u8 = 8;

/// `state` value on a received stream-state-update meaning the stream ended
pub const STREAM_STATE_TERMINATED: i64 = 4;

/// `state` value sent on the signaling channel once media data is flowing
pub const STREAM_STATE_ACTIVE: &str = "active";

pub const STATUS_OK: i64 = 0;

// ============================================================================
// Outbound messages
// ============================================================================

/// msgType 1 — sent on the signaling channel immediately after connect
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingHandshakeRequest {
    pub msg_type: u16,
    pub protocol_version: u8,
    pub session_id: String,
    pub stream_id: String,
    /// Monotonically increasing per connection; a nanosecond clock value
    pub sequence: i64,
    pub signature: String,
}

impl SignalingHandshakeRequest {
    pub fn new(session_id: &str, stream_id: &str, sequence: i64, signature: String) -> Self {
        Self {
            msg_type: msg_type::SIGNALING_HANDSHAKE_REQUEST,
            protocol_version: PROTOCOL_VERSION,
            session_id: session_id.to_string(),
            stream_id: stream_id.to_string(),
            sequence,
            signature,
        }
    }
}

/// msgType 3 — sent on the data channel immediately after connect
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataHandshakeRequest {
    pub msg_type: u16,
    pub protocol_version: u8,
    pub session_id: String,
    pub stream_id: String,
    pub signature: String,
    pub media_type: u8,
    pub payload_encryption: bool,
}

impl DataHandshakeRequest {
    pub fn new(session_id: &str, stream_id: &str, signature: String) -> Self {
        Self {
            msg_type: msg_type::DATA_HANDSHAKE_REQUEST,
            protocol_version: PROTOCOL_VERSION,
            session_id: session_id.to_string(),
            stream_id: stream_id.to_string(),
            signature,
            media_type: MEDIA_TYPE_TRANSCRIPT,
            payload_encryption: false,
        }
    }
}

/// msgType 7 — sent on the signaling channel once the data handshake succeeds
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStateUpdate {
    pub msg_type: u16,
    pub state: String,
    pub timestamp: i64,
}

impl StreamStateUpdate {
    pub fn active(timestamp: i64) -> Self {
        Self {
            msg_type: msg_type::STREAM_STATE_UPDATE,
            state: STREAM_STATE_ACTIVE.to_string(),
            timestamp,
        }
    }
}

/// msgType 13 — echoes the timestamp of a keep-alive request, on the same channel
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepAliveResponse {
    pub msg_type: u16,
    pub timestamp: i64,
}

impl KeepAliveResponse {
    pub fn echoing(timestamp: i64) -> Self {
        Self {
            msg_type: msg_type::KEEP_ALIVE_RESPONSE,
            timestamp,
        }
    }
}

// ============================================================================
// Inbound messages
// ============================================================================

/// Media-server addresses advertised in the signaling handshake response
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MediaServerUrls {
    /// Transcript-specific endpoint, preferred when present
    #[serde(default)]
    pub transcript: Option<String>,

    /// Generic all-media endpoint, the fallback
    #[serde(default)]
    pub all: Option<String>,
}

impl MediaServerUrls {
    /// The data-channel URL to use: transcript-specific first, "all" fallback.
    pub fn preferred(&self) -> Option<&str> {
        self.transcript.as_deref().or(self.all.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInbound {
    msg_type: u16,
    #[serde(default)]
    status_code: Option<i64>,
    #[serde(default)]
    media_server_urls: Option<MediaServerUrls>,
    #[serde(default)]
    state: Option<i64>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    content: Option<TranscriptContent>,
}

#[derive(Debug, Deserialize)]
struct TranscriptContent {
    #[serde(default)]
    data: Option<String>,
}

/// A classified inbound frame. Every frame a channel receives must be
/// interpretable as this envelope; frames that fail to parse are dropped by
/// the session loops, never fatal to the channel.
#[derive(Debug)]
pub enum ServerMessage {
    /// msgType 2
    SignalingHandshakeResponse {
        status_code: i64,
        media_server_urls: Option<MediaServerUrls>,
    },
    /// msgType 4
    DataHandshakeResponse { status_code: i64 },
    /// msgType 7 (received direction; `state` is numeric on the wire)
    StreamStateUpdate { state: i64 },
    /// msgType 12
    KeepAliveRequest { timestamp: i64 },
    /// msgType 17
    TranscriptData { text: String },
    /// Parseable envelope with a msgType this side never consumes
    Unknown { msg_type: u16 },
}

impl ServerMessage {
    pub fn parse(raw: &str) -> Result<Self> {
        let frame: RawInbound =
            serde_json::from_str(raw).context("frame is not a protocol message envelope")?;

        Ok(match frame.msg_type {
            msg_type::SIGNALING_HANDSHAKE_RESPONSE => Self::SignalingHandshakeResponse {
                status_code: frame.status_code.unwrap_or(-1),
                media_server_urls: frame.media_server_urls,
            },
            msg_type::DATA_HANDSHAKE_RESPONSE => Self::DataHandshakeResponse {
                status_code: frame.status_code.unwrap_or(-1),
            },
            msg_type::STREAM_STATE_UPDATE => Self::StreamStateUpdate {
                state: frame.state.unwrap_or_default(),
            },
            msg_type::KEEP_ALIVE_REQUEST => Self::KeepAliveRequest {
                timestamp: frame.timestamp.unwrap_or_default(),
            },
            msg_type::TRANSCRIPT_DATA => Self::TranscriptData {
                text: frame.content.and_then(|c| c.data).unwrap_or_default(),
            },
            other => Self::Unknown { msg_type: other },
        })
    }
}
