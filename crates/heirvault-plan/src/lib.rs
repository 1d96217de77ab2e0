//! HeirVault Plan Engine
//!
//! Deterministic construction of a Bitcoin inheritance vault: one output the
//! owner can always spend, which the beneficiary can spend once a relative
//! timelock has passed without owner activity.
//!
//! # Script
//!
//! ```text
//! OP_IF
//!   <owner_pubkey> OP_CHECKSIG
//! OP_ELSE
//!   <locktime_blocks> OP_CHECKSEQUENCEVERIFY OP_DROP
//!   <beneficiary_pubkey> OP_CHECKSIG
//! OP_ENDIF
//! ```
//!
//! The same template is wrapped either as P2WSH (segwit v0) or as the only
//! leaf of a taproot tree whose internal key is unspendable (segwit v1).
//!
//! # Example
//!
//! ```
//! use heirvault_plan::{build, AddressType, InheritanceType, Network, PlanInput, RecoveryMethod};
//!
//! let input = PlanInput {
//!     network: Network::Testnet,
//!     inheritance_type: InheritanceType::TimelockRecovery,
//!     owner_pubkey: "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798".into(),
//!     beneficiary_pubkey: "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5".into(),
//!     locktime_blocks: 26_280,
//!     address_type: AddressType::SegwitV1,
//!     recovery_method: RecoveryMethod::Single,
//!     sss_config: None,
//! };
//!
//! let plan = build(&input).unwrap();
//! assert!(plan.address.starts_with("tb1p"));
//! ```

pub mod address;
pub mod checkin;
pub mod kit;
pub mod plan;
pub mod primitives;
pub mod script;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_utils;

pub use address::NUMS_INTERNAL_KEY;
pub use checkin::{
    approx_duration, plan_check_in, CheckInPlan, CheckInStatus, DEFAULT_CADENCE_RATIO,
};
pub use kit::{verify_kit, verify_kit_json, verify_kit_with, RecoveryKit};
pub use plan::{build, build_with, rebuild_with};
pub use primitives::{Primitives, Secp256k1Backend};
pub use script::Timelock;
pub use types::{
    AddressType, InheritanceType, Network, PlanInput, PlanOutput, RecoveryMethod,
    SocialRecoveryKit,
};

use heirvault_shamir::ShamirError;
use std::fmt;
use thiserror::Error;

/// A valid compressed key, shown in error messages as a format example
pub const EXAMPLE_PUBKEY: &str =
    "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// Which key a validation error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Owner,
    Beneficiary,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Owner => write!(f, "owner"),
            KeyRole::Beneficiary => write!(f, "beneficiary"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(
        "Invalid {role} public key: {reason}. Expected a 33-byte compressed key written as \
         66 hex characters starting with 02 or 03, e.g. {example}",
        example = EXAMPLE_PUBKEY
    )]
    InvalidKey { role: KeyRole, reason: String },

    #[error(
        "Owner and beneficiary keys are the same. The beneficiary key must come from a \
         different wallet, e.g. one exported from the beneficiary's own hardware device"
    )]
    KeyCollision,

    #[error(
        "Locktime {value} is out of range. Enter a whole number of blocks from {min} to {max}, \
         e.g. 26280 for roughly six months",
        min = script::MIN_LOCKTIME_BLOCKS,
        max = script::MAX_LOCKTIME_BLOCKS
    )]
    LocktimeRange { value: String },

    #[error("Unsupported network '{0}'. Use one of: mainnet, testnet, regtest")]
    UnsupportedNetwork(String),

    #[error("Unsupported {field} '{value}'. Expected one of: {expected}")]
    UnsupportedType {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error(
        "Invalid social recovery setup: {0}. Choose 2-of-3 or 3-of-5, \
         e.g. \"sss_config\": {{\"threshold\": 2, \"total\": 3}}"
    )]
    InvalidRecoveryConfig(String),

    #[error("Address derivation failed: {0}. This indicates a bug, not a problem with your input")]
    AddressDerivationFailed(String),

    #[error(
        "Recovery kit integrity check failed: {field} in the kit ({found}) does not match the \
         value recomputed from its keys and locktime ({expected}). Do not send funds to this kit"
    )]
    IntegrityCheckFailed {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("Malformed recovery kit: {0}")]
    MalformedKit(String),

    #[error("Secret sharing failed: {0}")]
    Shamir(#[from] ShamirError),
}
