//! Plan input validation
//!
//! Every entry point validates before any cryptographic work. Typed
//! [`PlanInput`] values can only be wrong in their strings and numbers;
//! payloads read from files or storage go through
//! [`PlanInput::from_untrusted_json`] first, which also rejects unknown enum
//! values.

use heirvault_shamir::ShamirConfig;
use serde_json::Value;

use crate::primitives::Primitives;
use crate::script::Timelock;
use crate::types::{AddressType, InheritanceType, Network, PlanInput, RecoveryMethod};
use crate::{KeyRole, PlanError};

/// A validated 33-byte compressed secp256k1 public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedKey([u8; 33]);

impl CompressedKey {
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// The 32-byte x coordinate (BIP-340 x-only encoding)
    pub fn x_only(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[1..]);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse and check a hex key against the curve.
    pub fn parse<P: Primitives + ?Sized>(
        prims: &P,
        role: KeyRole,
        input: &str,
    ) -> Result<Self, PlanError> {
        let invalid = |reason: String| PlanError::InvalidKey { role, reason };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("the key is empty".into()));
        }
        let bytes = hex::decode(trimmed)
            .map_err(|_| invalid("the key contains characters that are not hex digits".into()))?;
        if bytes.len() != 33 {
            return Err(invalid(format!(
                "the key is {} bytes ({} hex characters) long",
                bytes.len(),
                trimmed.len()
            )));
        }
        if bytes[0] != 0x02 && bytes[0] != 0x03 {
            return Err(invalid(format!(
                "the key starts with {:02x}; uncompressed or x-only keys are not accepted",
                bytes[0]
            )));
        }
        if !prims.is_valid_point(&bytes) {
            return Err(invalid("the key is not a point on the secp256k1 curve".into()));
        }

        let mut key = [0u8; 33];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    pub(crate) fn from_bytes(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }
}

/// A plan request that passed every check
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub network: Network,
    pub address_type: AddressType,
    pub owner: CompressedKey,
    /// `None` only for social recovery before the key is generated
    pub beneficiary: Option<CompressedKey>,
    pub timelock: Timelock,
    pub recovery_method: RecoveryMethod,
    pub sss_config: Option<ShamirConfig>,
}

/// Validate a plan request.
///
/// Checks, in order: owner key, beneficiary key (required unless the
/// beneficiary key is generated for social recovery), key collision,
/// locktime range, social recovery configuration.
pub fn validate<P: Primitives + ?Sized>(
    input: &PlanInput,
    prims: &P,
) -> Result<ValidatedPlan, PlanError> {
    let owner = CompressedKey::parse(prims, KeyRole::Owner, &input.owner_pubkey)?;

    let generated = input.recovery_method == RecoveryMethod::Social
        && input.beneficiary_pubkey.trim().is_empty();
    let beneficiary = if generated {
        None
    } else {
        Some(CompressedKey::parse(
            prims,
            KeyRole::Beneficiary,
            &input.beneficiary_pubkey,
        )?)
    };

    if input
        .owner_pubkey
        .trim()
        .eq_ignore_ascii_case(input.beneficiary_pubkey.trim())
    {
        return Err(PlanError::KeyCollision);
    }

    let timelock = Timelock::from_blocks(input.locktime_blocks)?;

    let sss_config = match input.recovery_method {
        RecoveryMethod::Single => None,
        RecoveryMethod::Social => {
            let cfg = input.sss_config.ok_or_else(|| {
                PlanError::InvalidRecoveryConfig("social recovery needs an sss_config".into())
            })?;
            cfg.validate()
                .map_err(|e| PlanError::InvalidRecoveryConfig(e.to_string()))?;
            Some(cfg)
        }
    };

    Ok(ValidatedPlan {
        network: input.network,
        address_type: input.address_type,
        owner,
        beneficiary,
        timelock,
        recovery_method: input.recovery_method,
        sss_config,
    })
}

impl PlanInput {
    /// Read a plan request from an untrusted JSON payload.
    ///
    /// Unknown enum values map to [`PlanError::UnsupportedNetwork`] /
    /// [`PlanError::UnsupportedType`] and a non-integer locktime to
    /// [`PlanError::LocktimeRange`], so callers get the same actionable
    /// errors as for typed input. Key contents are checked later by
    /// [`validate`].
    pub fn from_untrusted_json(value: &Value) -> Result<Self, PlanError> {
        let obj = value
            .as_object()
            .ok_or_else(|| PlanError::MalformedKit("plan must be a JSON object".into()))?;

        let network: Network = match obj.get("network") {
            Some(Value::String(s)) => s.parse()?,
            Some(other) => return Err(PlanError::UnsupportedNetwork(other.to_string())),
            None => return Err(PlanError::UnsupportedNetwork("<missing>".into())),
        };

        let inheritance_type: InheritanceType =
            parse_tag(obj.get("inheritance_type"), "inheritance_type", InheritanceType::EXPECTED)?
                .unwrap_or_default();
        let address_type: AddressType =
            parse_tag(obj.get("address_type"), "address_type", AddressType::EXPECTED)?
                .unwrap_or_default();
        let recovery_method: RecoveryMethod =
            parse_tag(obj.get("recovery_method"), "recovery_method", RecoveryMethod::EXPECTED)?
                .unwrap_or_default();

        let owner_pubkey = key_string(obj.get("owner_pubkey"), KeyRole::Owner)?;
        let beneficiary_pubkey = match obj.get("beneficiary_pubkey") {
            None | Some(Value::Null) => String::new(),
            other => key_string(other, KeyRole::Beneficiary)?,
        };

        let locktime_blocks = match obj.get("locktime_blocks") {
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| PlanError::LocktimeRange {
                    value: n.to_string(),
                })?,
            Some(other) => {
                return Err(PlanError::LocktimeRange {
                    value: other.to_string(),
                })
            }
            None => {
                return Err(PlanError::LocktimeRange {
                    value: "<missing>".into(),
                })
            }
        };

        let sss_config = match obj.get("sss_config") {
            None | Some(Value::Null) => None,
            Some(v) => Some(serde_json::from_value::<ShamirConfig>(v.clone()).map_err(|e| {
                PlanError::InvalidRecoveryConfig(format!("sss_config is not readable: {}", e))
            })?),
        };

        Ok(PlanInput {
            network,
            inheritance_type,
            owner_pubkey,
            beneficiary_pubkey,
            locktime_blocks,
            address_type,
            recovery_method,
            sss_config,
        })
    }
}

fn parse_tag<T: std::str::FromStr<Err = PlanError>>(
    value: Option<&Value>,
    field: &'static str,
    expected: &'static str,
) -> Result<Option<T>, PlanError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some),
        Some(other) => Err(PlanError::UnsupportedType {
            field,
            value: other.to_string(),
            expected,
        }),
    }
}

fn key_string(value: Option<&Value>, role: KeyRole) -> Result<String, PlanError> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(PlanError::InvalidKey {
            role,
            reason: "the key must be a hex string".into(),
        }),
        None => Err(PlanError::InvalidKey {
            role,
            reason: "the key is missing".into(),
        }),
    }
}
