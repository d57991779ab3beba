//! Decoding of the `fileData` field carried by upload requests

use base64::{
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use serde::Deserialize;

/// Upload content as sent by the browser client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FilePayload {
    /// Base64 text, or plain text when it does not decode.
    Text(String),
    Bytes(Vec<u8>),
}

impl FilePayload {
    /// Never fails: text that is not valid base64 is stored as its own UTF-8 bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => decode_text(text),
            Self::Bytes(bytes) => bytes,
        }
    }
}

/// Browsers sometimes emit non-zero bits in the last symbol (`aGl=`); those
/// still decode. Padding must remain canonical.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

fn is_base64_symbol(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'=')
}

fn decode_text(text: String) -> Vec<u8> {
    // Line breaks and stray punctuation are dropped before decoding.
    let compact: Vec<u8> = text
        .bytes()
        .filter(|byte| is_base64_symbol(*byte))
        .collect();

    match LENIENT.decode(&compact) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(error = %err, "fileData is not base64, storing raw text");
            text.into_bytes()
        }
    }
}
