// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `X-Hub-Signature-256` verification for webhook deliveries.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Verify `sha256=<hex>` against an HMAC-SHA256 of the raw body.
///
/// The comparison is constant-time. A missing or malformed header fails.
pub fn verify_signature(app_secret: &str, header: Option<&str>, body: &[u8]) -> bool {
    let Some(header) = header else {
        return false;
    };
    let Some(hex_digest) = header.trim().strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the header value the provider would send for `body`.
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "app-secret";
    const BODY: &[u8] = br#"{"object":"whatsapp_business_account","entry":[]}"#;

    #[test]
    fn accepts_own_signature() {
        let header = sign(SECRET, BODY);
        assert!(header.starts_with("sha256="));
        assert!(verify_signature(SECRET, Some(&header), BODY));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = sign(SECRET, BODY);
        assert!(!verify_signature(SECRET, Some(&header), b"{}"));
        assert!(!verify_signature("other", Some(&header), BODY));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(!verify_signature(SECRET, None, BODY));
        assert!(!verify_signature(SECRET, Some("md5=abc"), BODY));
        assert!(!verify_signature(SECRET, Some("sha256=not-hex"), BODY));
        assert!(!verify_signature(SECRET, Some("sha256="), BODY));
    }
}
