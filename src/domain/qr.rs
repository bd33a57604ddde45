use anyhow::Result;
use base64::engine::general_purpose;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const PAYLOAD_VERSION: &str = "TKT1";

#[derive(Debug, Clone, Serialize)]
pub struct QrCodeRecord {
    pub booking_id: Uuid,
    pub payload: String,
    pub image_svg_base64: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Same inputs always produce the same payload, so a re-issued code scans
/// identically to the lost one.
pub fn build_payload(booking_id: Uuid, transaction_id: &str, secret: &str) -> String {
    format!(
        "{}.{}.{}.{}",
        PAYLOAD_VERSION,
        booking_id,
        transaction_id,
        signature(booking_id, transaction_id, secret)
    )
}

/// Returns `(booking_id, transaction_id)` when the payload is well formed and
/// the signature matches.
pub fn parse_payload(payload: &str, secret: &str) -> Option<(Uuid, String)> {
    let mut parts = payload.splitn(3, '.');
    if parts.next()? != PAYLOAD_VERSION {
        return None;
    }
    let booking_id = Uuid::parse_str(parts.next()?).ok()?;
    let rest = parts.next()?;
    let (transaction_id, sig) = rest.rsplit_once('.')?;
    if sig != signature(booking_id, transaction_id, secret) {
        return None;
    }
    Some((booking_id, transaction_id.to_string()))
}

fn signature(booking_id: Uuid, transaction_id: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(booking_id.as_bytes());
    hasher.update(transaction_id.as_bytes());
    let hash = hasher.finalize();
    hash.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

pub fn render_svg_base64(payload: &str) -> Result<String> {
    let code = QrCode::new(payload.as_bytes())?;
    let image = code
        .render()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(general_purpose::STANDARD.encode(image))
}

pub fn issue(booking_id: Uuid, transaction_id: &str, secret: &str) -> Result<QrCodeRecord> {
    let payload = build_payload(booking_id, transaction_id, secret);
    let image_svg_base64 = render_svg_base64(&payload)?;
    Ok(QrCodeRecord {
        booking_id,
        payload,
        image_svg_base64,
        created_at: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_through_parse() {
        let id = Uuid::new_v4();
        let payload = build_payload(id, "abc123", "secret");
        assert_eq!(parse_payload(&payload, "secret"), Some((id, "abc123".to_string())));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let id = Uuid::new_v4();
        let payload = build_payload(id, "abc123", "secret").replace("abc123", "abc124");
        assert_eq!(parse_payload(&payload, "secret"), None);
        assert_eq!(parse_payload(&build_payload(id, "abc123", "secret"), "other"), None);
    }
}
