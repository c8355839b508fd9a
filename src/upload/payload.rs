//! Data-URL payload decoding

use super::error::UploadError;
use super::kind::ImageFormat;
use base64::{engine::general_purpose, Engine as _};

/// Strip the data-URL prefix matching `format` and decode the base64 rest
///
/// The prefix must match the declared format exactly; a PNG body posted as
/// `image/jpeg` is rejected rather than silently renamed. ASCII whitespace
/// in the encoded part (line wrapping, a trailing newline) is ignored.
pub fn decode_data_url(body: &[u8], format: ImageFormat) -> Result<Vec<u8>, UploadError> {
    let prefix = format.data_url_prefix();
    let encoded = body
        .strip_prefix(prefix.as_bytes())
        .ok_or(UploadError::MissingDataUrlPrefix { expected: prefix })?;

    if encoded.iter().any(u8::is_ascii_whitespace) {
        let compact: Vec<u8> = encoded
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        return Ok(general_purpose::STANDARD.decode(compact)?);
    }
    Ok(general_purpose::STANDARD.decode(encoded)?)
}
