//! Plan request and result types.

use heirvault_shamir::{EncodedShare, ShamirConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PlanError;

/// Bitcoin network a plan targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    /// The equivalent `bitcoin::Network`
    pub fn to_bitcoin(self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(PlanError::UnsupportedNetwork(other.to_string())),
        }
    }
}

/// Vault kind. Only timelock recovery exists today; the tag keeps saved
/// plans forward compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceType {
    #[default]
    TimelockRecovery,
}

impl InheritanceType {
    pub const EXPECTED: &'static str = "timelock_recovery";

    pub fn as_str(&self) -> &'static str {
        match self {
            InheritanceType::TimelockRecovery => "timelock_recovery",
        }
    }
}

impl FromStr for InheritanceType {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timelock_recovery" => Ok(InheritanceType::TimelockRecovery),
            other => Err(PlanError::UnsupportedType {
                field: "inheritance_type",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressType {
    /// P2WSH
    #[serde(rename = "segwit-v0")]
    SegwitV0,
    /// P2TR, script path only
    #[default]
    #[serde(rename = "segwit-v1")]
    SegwitV1,
}

impl AddressType {
    pub const EXPECTED: &'static str = "segwit-v0, segwit-v1";

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::SegwitV0 => "segwit-v0",
            AddressType::SegwitV1 => "segwit-v1",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AddressType::SegwitV0 => "SegWit v0 (P2WSH)",
            AddressType::SegwitV1 => "Taproot (P2TR)",
        }
    }
}

impl FromStr for AddressType {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "segwit-v0" => Ok(AddressType::SegwitV0),
            "segwit-v1" => Ok(AddressType::SegwitV1),
            other => Err(PlanError::UnsupportedType {
                field: "address_type",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// How the beneficiary key is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMethod {
    /// The beneficiary supplies their own key
    #[default]
    Single,
    /// A fresh key is generated and split among trustees
    Social,
}

impl RecoveryMethod {
    pub const EXPECTED: &'static str = "single, social";
}

impl FromStr for RecoveryMethod {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(RecoveryMethod::Single),
            "social" => Ok(RecoveryMethod::Social),
            other => Err(PlanError::UnsupportedType {
                field: "recovery_method",
                value: other.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// A vault plan request.
///
/// For [`RecoveryMethod::Social`] the `beneficiary_pubkey` may be left empty;
/// it is replaced by the generated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInput {
    pub network: Network,
    #[serde(default)]
    pub inheritance_type: InheritanceType,
    pub owner_pubkey: String,
    #[serde(default)]
    pub beneficiary_pubkey: String,
    pub locktime_blocks: u32,
    #[serde(default)]
    pub address_type: AddressType,
    #[serde(default)]
    pub recovery_method: RecoveryMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sss_config: Option<ShamirConfig>,
}

/// Shares of a generated beneficiary key, for distribution to trustees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialRecoveryKit {
    pub config: ShamirConfig,
    /// Public key of the split secret; this is the beneficiary key in the script
    pub beneficiary_pubkey: String,
    #[serde(default)]
    pub shares: Vec<EncodedShare>,
    pub instructions: String,
}

/// The complete, displayable vault plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutput {
    pub descriptor: String,
    pub script_asm: String,
    pub script_hex: String,
    pub address: String,
    pub witness_script: String,
    pub network: Network,
    pub address_type: AddressType,
    pub human_explanation: Vec<String>,
    /// Taproot control block for the single leaf (segwit v1 only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_recovery_kit: Option<SocialRecoveryKit>,
}
