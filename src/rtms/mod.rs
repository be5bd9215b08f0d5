//! RTMS connection protocol
//!
//! One meeting session holds two cooperating WebSocket connections:
//! - the signaling (control) channel, which authenticates the session and
//!   advertises where the media flows (`signaling`)
//! - the media (data) channel, which carries the transcript payload (`media`)
//!
//! Each channel is driven by its own state machine and answers its own
//! keep-alives. The `registry` tracks live channel handles per session so an
//! external stop event can tear both down.

pub mod media;
pub mod messages;
pub mod registry;
pub mod signaling;
pub mod signature;

pub use media::{MediaAction, MediaMachine, MediaSession, MediaState};
pub use messages::{MediaServerUrls, ServerMessage};
pub use registry::{ChannelCommand, ChannelHandle, ChannelRole, ConnectionRegistry};
pub use signaling::{SignalingAction, SignalingMachine, SignalingSession, SignalingState};
