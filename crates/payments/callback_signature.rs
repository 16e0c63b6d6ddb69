use anyhow::{Result, anyhow, bail};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// Signatures older (or further in the future) than this are refused.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifies `t=<unix>,v1=<hex>` where the hex part is HMAC-SHA256 of `"<t>.<body>"`.
pub fn verify(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signatures.push(rest);
        }
    }

    let timestamp = timestamp.ok_or_else(|| anyhow!("missing timestamp in signature header"))?;
    if signatures.is_empty() {
        bail!("missing v1 in signature header");
    }

    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| anyhow!("signature timestamp is not a unix time"))?;

    let authentic = signatures.into_iter().any(|signature| {
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&provided).is_ok()
    });
    if !authentic {
        bail!("invalid callback signature");
    }

    let skew = now_unix.checked_sub(issued_at).map(i64::unsigned_abs);
    match skew {
        Some(skew) if skew <= tolerance_secs.unsigned_abs() => Ok(()),
        _ => bail!("signature timestamp outside tolerance window"),
    }
}

/// Builds a header value the way the gateway does. Used by tests and local tooling.
pub fn sign(secret: &str, payload: &[u8], timestamp: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let digest = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={digest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"provider_ref":"PP-1","reported_amount":"250.00","reported_status":"COMPLETED"}"#;

    #[test]
    fn accepts_fresh_signature() {
        let header = sign(SECRET, BODY, 1_700_000_000).unwrap();
        assert!(verify(SECRET, BODY, &header, 1_700_000_100, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign(SECRET, BODY, 1_700_000_000).unwrap();
        let tampered = br#"{"provider_ref":"PP-1","reported_amount":"1.00","reported_status":"COMPLETED"}"#;
        assert!(verify(SECRET, tampered, &header, 1_700_000_000, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign("other", BODY, 1_700_000_000).unwrap();
        assert!(verify(SECRET, BODY, &header, 1_700_000_000, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = sign(SECRET, BODY, 1_700_000_000).unwrap();
        assert!(verify(SECRET, BODY, &header, 1_700_000_301, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(verify(SECRET, BODY, "v1=abcd", 0, DEFAULT_TOLERANCE_SECS).is_err());
        assert!(verify(SECRET, BODY, "t=1", 1, DEFAULT_TOLERANCE_SECS).is_err());
        assert!(verify(SECRET, BODY, "t=x,v1=00", 0, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn extreme_timestamp_is_refused_without_overflow() {
        let header = "t=-9223372036854775808,v1=00";
        assert!(verify("s", b"{}", header, 1_700_000_000, DEFAULT_TOLERANCE_SECS).is_err());

        let signed = sign(SECRET, BODY, i64::MIN).unwrap();
        assert!(verify(SECRET, BODY, &signed, 1_700_000_000, DEFAULT_TOLERANCE_SECS).is_err());
        assert!(verify(SECRET, BODY, &signed, i64::MAX, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let header = sign(SECRET, BODY, 1_700_000_000).unwrap();
        let rotated = header.replace("t=1700000000,", "t=1700000000,v1=deadbeef,");
        assert!(verify(SECRET, BODY, &rotated, 1_700_000_000, DEFAULT_TOLERANCE_SECS).is_ok());
    }
}
