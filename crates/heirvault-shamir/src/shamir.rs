//! Shamir split and reconstruction over GF(256)
//!
//! Each byte of the secret is the constant term of its own random polynomial
//! of degree `threshold - 1`; share `i` holds the evaluations at `x = i`.

use crate::gf256::{interpolate_at_zero, poly_eval};
use crate::ShamirError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

/// One share of a split secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Evaluation point, 1..=total (never 0)
    pub index: u8,
    /// Evaluations, one per secret byte
    pub data: Vec<u8>,
}

impl Drop for Share {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

/// Split `secret` into `total` shares, any `threshold` of which reconstruct it.
///
/// Polynomial coefficients are drawn fresh from the operating system CSPRNG
/// on every call.
pub fn split_secret(secret: &[u8], threshold: u8, total: u8) -> Result<Vec<Share>, ShamirError> {
    if threshold < 2 {
        return Err(ShamirError::InvalidThreshold);
    }
    if threshold > total {
        return Err(ShamirError::ThresholdExceedsShares);
    }
    if secret.is_empty() {
        return Err(ShamirError::InvalidSecret("secret is empty".into()));
    }

    let mut shares: Vec<Share> = (1..=total)
        .map(|index| Share {
            index,
            data: Vec::with_capacity(secret.len()),
        })
        .collect();

    let mut coefficients = Zeroizing::new(vec![0u8; threshold as usize]);
    for &secret_byte in secret {
        coefficients[0] = secret_byte;
        OsRng.fill_bytes(&mut coefficients[1..]);

        for share in &mut shares {
            share.data.push(poly_eval(&coefficients, share.index));
        }
    }

    Ok(shares)
}

/// Reconstruct a secret from a set of shares.
///
/// At least two shares are required. The original threshold is not known
/// here: supplying fewer shares than the threshold yields an unrelated value
/// rather than an error.
pub fn reconstruct_secret(shares: &[Share]) -> Result<Zeroizing<Vec<u8>>, ShamirError> {
    if shares.len() < 2 {
        return Err(ShamirError::InsufficientShares {
            provided: shares.len(),
        });
    }

    let secret_len = shares[0].data.len();
    if secret_len == 0 {
        return Err(ShamirError::InvalidShareFormat("share is empty".into()));
    }
    if shares.iter().any(|s| s.data.len() != secret_len) {
        return Err(ShamirError::InvalidShareFormat(
            "shares have different lengths; they do not come from the same split".into(),
        ));
    }
    if shares.iter().any(|s| s.index == 0) {
        return Err(ShamirError::InvalidShareFormat(
            "share index 0 is not valid".into(),
        ));
    }

    let mut indices: Vec<u8> = shares.iter().map(|s| s.index).collect();
    indices.sort_unstable();
    indices.dedup();
    if indices.len() != shares.len() {
        return Err(ShamirError::InvalidShareFormat(
            "the same share was supplied twice".into(),
        ));
    }

    let mut secret = Zeroizing::new(Vec::with_capacity(secret_len));
    for byte_idx in 0..secret_len {
        let points: Vec<(u8, u8)> = shares.iter().map(|s| (s.index, s.data[byte_idx])).collect();
        secret.push(interpolate_at_zero(&points));
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret32() -> Vec<u8> {
        (0..32).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_split_and_reconstruct_2_of_3() {
        let secret = secret32();
        let shares = split_secret(&secret, 2, 3).unwrap();
        assert_eq!(shares.len(), 3);

        for (a, b) in [(0, 1), (1, 2), (0, 2)] {
            let subset = [shares[a].clone(), shares[b].clone()];
            assert_eq!(*reconstruct_secret(&subset).unwrap(), secret);
        }
    }

    #[test]
    fn test_split_and_reconstruct_3_of_5() {
        let secret = secret32();
        let shares = split_secret(&secret, 3, 5).unwrap();
        assert_eq!(shares.len(), 5);

        assert_eq!(*reconstruct_secret(&shares[0..3]).unwrap(), secret);
        assert_eq!(*reconstruct_secret(&shares[2..5]).unwrap(), secret);
        let spread = [shares[0].clone(), shares[2].clone(), shares[4].clone()];
        assert_eq!(*reconstruct_secret(&spread).unwrap(), secret);
        // More than the threshold also works
        assert_eq!(*reconstruct_secret(&shares).unwrap(), secret);
    }

    #[test]
    fn test_below_threshold_does_not_recover() {
        let secret = secret32();
        let shares = split_secret(&secret, 3, 5).unwrap();
        let recovered = reconstruct_secret(&shares[0..2]).unwrap();
        assert_ne!(*recovered, secret);
    }

    #[test]
    fn test_single_share_rejected() {
        let shares = split_secret(&secret32(), 2, 3).unwrap();
        assert!(matches!(
            reconstruct_secret(&shares[0..1]),
            Err(ShamirError::InsufficientShares { provided: 1 })
        ));
    }

    #[test]
    fn test_duplicate_share_rejected() {
        let shares = split_secret(&secret32(), 2, 3).unwrap();
        let dup = [shares[0].clone(), shares[0].clone()];
        assert!(matches!(
            reconstruct_secret(&dup),
            Err(ShamirError::InvalidShareFormat(_))
        ));
    }

    #[test]
    fn test_two_splits_differ() {
        let secret = secret32();
        let first = split_secret(&secret, 2, 3).unwrap();
        let second = split_secret(&secret, 2, 3).unwrap();
        assert_ne!(first[0].data, second[0].data);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            split_secret(b"x", 1, 3),
            Err(ShamirError::InvalidThreshold)
        ));
        assert!(matches!(
            split_secret(b"x", 4, 3),
            Err(ShamirError::ThresholdExceedsShares)
        ));
        assert!(split_secret(b"", 2, 3).is_err());
    }
}
