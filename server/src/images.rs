//! Decoding of base64 data-URI images submitted on the recipe write path.

use base64::Engine;

/// An image decoded from a `data:image/<ext>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Stored filename, always `temp.<ext>`.
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Parse a base64 data URI into raw image bytes.
///
/// Only `data:image/...` URIs are accepted; anything else is a validation
/// error with a client-facing message.
pub fn parse_data_uri(input: &str) -> Result<DecodedImage, String> {
    let rest = input
        .strip_prefix("data:image/")
        .ok_or_else(|| "Image must be a data:image/..;base64,.. URI".to_string())?;

    let (ext, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| "Image data URI is missing the base64 payload".to_string())?;

    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Unrecognized image format".to_string());
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| "Image payload is not valid base64".to_string())?;

    if data.is_empty() {
        return Err("Image payload is empty".to_string());
    }

    Ok(DecodedImage {
        file_name: format!("temp.{}", ext.to_ascii_lowercase()),
        data,
    })
}

/// Content type for a stored image, derived from its `temp.<ext>` name.
pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_png_data_uri() {
        // "hi!" base64-encoded
        let decoded = parse_data_uri("data:image/png;base64,aGkh").unwrap();
        assert_eq!(decoded.file_name, "temp.png");
        assert_eq!(decoded.data, b"hi!");
    }

    #[test]
    fn test_extension_is_lowercased() {
        let decoded = parse_data_uri("data:image/PNG;base64,aGkh").unwrap();
        assert_eq!(decoded.file_name, "temp.png");
    }

    #[test]
    fn test_rejects_non_image_mime() {
        assert!(parse_data_uri("data:text/plain;base64,aGkh").is_err());
    }

    #[test]
    fn test_rejects_missing_prefix() {
        assert!(parse_data_uri("aGkh").is_err());
    }

    #[test]
    fn test_rejects_missing_payload_marker() {
        assert!(parse_data_uri("data:image/png,aGkh").is_err());
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(parse_data_uri("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn test_rejects_empty_payload() {
        assert!(parse_data_uri("data:image/png;base64,").is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("temp.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("temp.jpg"), "image/jpeg");
        assert_eq!(content_type_for("temp.png"), "image/png");
        assert_eq!(content_type_for("temp"), "application/octet-stream");
    }
}
