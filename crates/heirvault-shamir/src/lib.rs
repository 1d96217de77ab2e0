//! HeirVault Shamir Module
//!
//! Split a beneficiary private key among trustees with Shamir's Secret
//! Sharing over GF(256). Any `threshold` shares reconstruct the key; fewer
//! reveal nothing about it.
//!
//! # Example
//!
//! ```
//! use heirvault_shamir::{combine, split, ShamirConfig};
//!
//! let secret = [0x42u8; 32];
//! let shares = split(&secret, &ShamirConfig::two_of_three()).unwrap();
//!
//! let recovered = combine(&[&shares[0].share, &shares[2].share]).unwrap();
//! assert_eq!(recovered.as_slice(), &secret);
//! ```

pub mod gf256;
pub mod shamir;
pub mod shares;

pub use shamir::{reconstruct_secret, split_secret, Share};
pub use shares::{combine, decode_share, encode_share, validate_share, EncodedShare};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShamirError {
    #[error("Invalid threshold: need at least 2")]
    InvalidThreshold,
    #[error("Threshold exceeds share count")]
    ThresholdExceedsShares,
    #[error("Unsupported share configuration {threshold}-of-{total}: choose 2-of-3 or 3-of-5")]
    UnsupportedConfig { threshold: u8, total: u8 },
    #[error("Not enough shares to reconstruct: got {provided}, at least 2 are required")]
    InsufficientShares { provided: usize },
    #[error("Invalid share format: {0}")]
    InvalidShareFormat(String),
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),
}

/// Threshold configuration for a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShamirConfig {
    /// Minimum shares needed to reconstruct (M)
    pub threshold: u8,
    /// Total shares to generate (N)
    pub total: u8,
}

impl ShamirConfig {
    /// 2-of-3 trustees
    pub fn two_of_three() -> Self {
        Self {
            threshold: 2,
            total: 3,
        }
    }

    /// 3-of-5 trustees
    pub fn three_of_five() -> Self {
        Self {
            threshold: 3,
            total: 5,
        }
    }

    /// Only 2-of-3 and 3-of-5 are offered to users.
    pub fn validate(&self) -> Result<(), ShamirError> {
        if self.threshold < 2 {
            return Err(ShamirError::InvalidThreshold);
        }
        if self.threshold > self.total {
            return Err(ShamirError::ThresholdExceedsShares);
        }
        match (self.threshold, self.total) {
            (2, 3) | (3, 5) => Ok(()),
            (threshold, total) => Err(ShamirError::UnsupportedConfig { threshold, total }),
        }
    }
}

/// Split a 32-byte secret into hex-encoded shares, ordered by index.
pub fn split(secret: &[u8; 32], config: &ShamirConfig) -> Result<Vec<EncodedShare>, ShamirError> {
    config.validate()?;
    let shares = split_secret(secret, config.threshold, config.total)?;
    Ok(shares.iter().map(encode_share).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_configs() {
        assert!(ShamirConfig::two_of_three().validate().is_ok());
        assert!(ShamirConfig::three_of_five().validate().is_ok());
    }

    #[test]
    fn test_unsupported_configs() {
        let cfg = ShamirConfig {
            threshold: 2,
            total: 4,
        };
        assert!(matches!(
            cfg.validate(),
            Err(ShamirError::UnsupportedConfig { .. })
        ));
        let cfg = ShamirConfig {
            threshold: 5,
            total: 3,
        };
        assert!(matches!(
            cfg.validate(),
            Err(ShamirError::ThresholdExceedsShares)
        ));
    }

    #[test]
    fn test_split_indices_are_one_based_and_unique() {
        let shares = split(&[9u8; 32], &ShamirConfig::three_of_five()).unwrap();
        let indices: Vec<u8> = shares.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_round_trip_every_threshold_subset() {
        let secret: [u8; 32] = core::array::from_fn(|i| (255 - i) as u8);

        let shares = split(&secret, &ShamirConfig::two_of_three()).unwrap();
        for i in 0..3 {
            for j in (i + 1)..3 {
                let got = combine(&[&shares[i].share, &shares[j].share]).unwrap();
                assert_eq!(got.as_slice(), &secret);
            }
        }

        let shares = split(&secret, &ShamirConfig::three_of_five()).unwrap();
        for i in 0..5 {
            for j in (i + 1)..5 {
                for k in (j + 1)..5 {
                    let got =
                        combine(&[&shares[i].share, &shares[j].share, &shares[k].share]).unwrap();
                    assert_eq!(got.as_slice(), &secret);
                }
            }
        }
    }

    #[test]
    fn test_config_serde() {
        let json = serde_json::to_string(&ShamirConfig::three_of_five()).unwrap();
        assert_eq!(json, r#"{"threshold":3,"total":5}"#);
    }
}
