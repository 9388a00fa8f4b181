//! # Info Block Codec
//!
//! The attachment id is obtained with an info request. The response is a
//! tagged buffer:
//!
//! ```text
//! +-----+-----------+-----------------------------+
//! | tag | len (u16) | portable integer (len bytes)|
//! +-----+-----------+-----------------------------+
//! ```
//!
//! Both the length and the integer are little-endian. The integer is
//! variable width, 1 to 8 bytes.

/// Info item: attachment id.
pub const INFO_ATTACHMENT_ID: u8 = 22;

/// Info item: end of request / response.
pub const INFO_END: u8 = 1;

/// The request sent to obtain the attachment id.
pub const ATTACHMENT_ID_REQUEST: [u8; 2] = [INFO_ATTACHMENT_ID, INFO_END];

/// Errors decoding an info response.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InfoError {
    /// The response buffer was empty.
    #[error("empty info response")]
    Empty,

    /// The response did not start with the attachment-id tag.
    #[error("unexpected info tag {0}, expected {INFO_ATTACHMENT_ID}")]
    UnexpectedTag(u8),

    /// The buffer ended before the declared data.
    #[error("info response truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// The integer width is outside 1..=8.
    #[error("portable integer width {0} is outside 1..=8")]
    InvalidWidth(usize),
}

/// Decode the attachment id from an info response.
pub fn decode_attachment_id(response: &[u8]) -> Result<u64, InfoError> {
    let (&tag, rest) = response.split_first().ok_or(InfoError::Empty)?;
    if tag != INFO_ATTACHMENT_ID {
        return Err(InfoError::UnexpectedTag(tag));
    }
    let len_bytes = rest.get(..2).ok_or(InfoError::Truncated {
        needed: 3,
        available: response.len(),
    })?;
    let len = usize::from(u16::from_le_bytes([len_bytes[0], len_bytes[1]]));
    let value = rest.get(2..2 + len).ok_or(InfoError::Truncated {
        needed: 3 + len,
        available: response.len(),
    })?;
    decode_portable_integer(value)
}

/// Decode a little-endian integer of 1 to 8 bytes.
pub fn decode_portable_integer(bytes: &[u8]) -> Result<u64, InfoError> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(InfoError::InvalidWidth(bytes.len()));
    }
    Ok(bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Encode an attachment-id response using the narrowest integer width.
pub fn encode_attachment_id(id: u64) -> Vec<u8> {
    let width = (8 - (id.leading_zeros() / 8) as usize).max(1);
    let mut out = Vec::with_capacity(4 + width);
    out.push(INFO_ATTACHMENT_ID);
    out.extend_from_slice(&(width as u16).to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes()[..width]);
    out.push(INFO_END);
    out
}
