//! Text encoding of shares
//!
//! A share travels as lowercase hex of `index ‖ data`. For a 32-byte secret
//! that is 66 characters, which a trustee can copy, print, or scan.

use crate::shamir::{reconstruct_secret, Share};
use crate::ShamirError;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Minimum length of an encoded share, in hex characters
pub const MIN_SHARE_HEX_LEN: usize = 64;

/// A share as handed to a trustee: its 1-based index plus the hex encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedShare {
    pub index: u8,
    pub share: String,
}

/// Encode a share as hex
pub fn encode_share(share: &Share) -> EncodedShare {
    let mut bytes = Zeroizing::new(Vec::with_capacity(share.data.len() + 1));
    bytes.push(share.index);
    bytes.extend_from_slice(&share.data);
    EncodedShare {
        index: share.index,
        share: hex::encode(bytes.as_slice()),
    }
}

/// Cheap shape check for user-entered share text.
///
/// Accepts any hex string of at least [`MIN_SHARE_HEX_LEN`] characters. It
/// cannot tell whether the share is cryptographically valid: only a
/// successful [`combine`] with matching shares shows that.
pub fn validate_share(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.len() >= MIN_SHARE_HEX_LEN && trimmed.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse a hex share produced by [`encode_share`]
pub fn decode_share(input: &str) -> Result<Share, ShamirError> {
    let trimmed = input.trim();
    if !validate_share(trimmed) {
        return Err(ShamirError::InvalidShareFormat(format!(
            "expected a hex string of at least {MIN_SHARE_HEX_LEN} characters, \
             e.g. 01 followed by 64 hex digits"
        )));
    }
    if trimmed.len() % 2 != 0 {
        return Err(ShamirError::InvalidShareFormat(
            "share has an odd number of hex digits; a character is missing".into(),
        ));
    }

    let bytes = Zeroizing::new(
        hex::decode(trimmed).map_err(|e| ShamirError::InvalidShareFormat(e.to_string()))?,
    );
    let (index, data) = bytes
        .split_first()
        .ok_or_else(|| ShamirError::InvalidShareFormat("share is empty".into()))?;
    if *index == 0 {
        return Err(ShamirError::InvalidShareFormat(
            "share index byte is 0; shares are numbered from 1".into(),
        ));
    }

    Ok(Share {
        index: *index,
        data: data.to_vec(),
    })
}

/// Reconstruct a secret from hex-encoded shares.
///
/// Fails with [`ShamirError::InsufficientShares`] for fewer than two shares.
pub fn combine<S: AsRef<str>>(shares: &[S]) -> Result<Zeroizing<Vec<u8>>, ShamirError> {
    if shares.len() < 2 {
        return Err(ShamirError::InsufficientShares {
            provided: shares.len(),
        });
    }
    let decoded = shares
        .iter()
        .map(|s| decode_share(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    reconstruct_secret(&decoded)
}
