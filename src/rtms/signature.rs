use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Compute the handshake signature: lowercase hex HMAC-SHA256 over
/// `"{client_id},{session_id},{stream_id}"` keyed by the shared secret.
/// Both the signaling and the media handshake carry this digest.
pub fn sign(client_id: &str, session_id: &str, stream_id: &str, secret: &str) -> String {
    let message = format!("{},{},{}", client_id, session_id, stream_id);

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(message.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_lowercase_hex() {
        let a = sign("client", "session", "stream", "secret");
        let b = sign("client", "session", "stream", "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn signature_depends_on_every_field() {
        let base = sign("client", "session", "stream", "secret");
        assert_ne!(base, sign("client2", "session", "stream", "secret"));
        assert_ne!(base, sign("client", "session2", "stream", "secret"));
        assert_ne!(base, sign("client", "session", "stream2", "secret"));
        assert_ne!(base, sign("client", "session", "stream", "secret2"));
    }
}
