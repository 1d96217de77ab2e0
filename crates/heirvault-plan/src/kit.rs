//! Recovery kit: the saved `{plan, result}` pair and its integrity check.
//!
//! A kit is only trusted after its result has been rebuilt from its plan.
//! Any difference in the address, script or descriptor means the file was
//! altered (or produced by something else) and must not be funded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plan::rebuild_with;
use crate::primitives::{Primitives, Secp256k1Backend};
use crate::types::{PlanInput, PlanOutput, RecoveryMethod};
use crate::PlanError;

/// Current kit format version
pub const KIT_VERSION: u32 = 1;

/// Saved recovery kit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryKit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// RFC-3339 creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub plan: PlanInput,
    pub result: PlanOutput,
}

impl RecoveryKit {
    /// Package a freshly built plan for saving.
    ///
    /// For social plans the generated beneficiary key is written into the
    /// stored request so the kit rebuilds without randomness, and the shares
    /// are left out: they belong to the trustees, not to the kit file.
    pub fn new(plan: &PlanInput, result: &PlanOutput) -> Self {
        let mut plan = plan.clone();
        let mut result = result.clone();

        if let Some(social) = result.social_recovery_kit.as_mut() {
            if plan.recovery_method == RecoveryMethod::Social {
                plan.beneficiary_pubkey = social.beneficiary_pubkey.clone();
            }
            social.shares.clear();
        }

        Self {
            version: Some(KIT_VERSION),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            plan,
            result,
        }
    }

    /// Pretty JSON for writing to disk
    pub fn to_json(&self) -> Result<String, PlanError> {
        serde_json::to_string_pretty(self).map_err(|e| PlanError::MalformedKit(e.to_string()))
    }

    /// Rebuild and compare; see [`verify_kit`]
    pub fn verify(&self) -> Result<PlanOutput, PlanError> {
        verify_kit(&self.plan, &self.result)
    }
}

/// Rebuild `result` from `plan` and require the two to agree.
///
/// Compares `address`, `script_hex`, `witness_script`, `descriptor` and
/// `network`, in that order. Returns the rebuilt output on success.
pub fn verify_kit(plan: &PlanInput, result: &PlanOutput) -> Result<PlanOutput, PlanError> {
    verify_kit_with(plan, result, &Secp256k1Backend::default())
}

/// [`verify_kit`] over any [`Primitives`] backend
pub fn verify_kit_with<P: Primitives + ?Sized>(
    plan: &PlanInput,
    result: &PlanOutput,
    prims: &P,
) -> Result<PlanOutput, PlanError> {
    let rebuilt = rebuild_with(plan, prims)?;

    check_field("address", &rebuilt.address, &result.address)?;
    check_field("script_hex", &rebuilt.script_hex, &result.script_hex)?;
    check_field("witness_script", &rebuilt.witness_script, &result.witness_script)?;
    check_field("descriptor", &rebuilt.descriptor, &result.descriptor)?;
    check_field("network", rebuilt.network.as_str(), result.network.as_str())?;

    log::debug!("Recovery kit for {} verified", rebuilt.address);
    Ok(rebuilt)
}

/// Parse and verify a kit file.
///
/// Broken structure (not JSON, missing `plan`/`result`, unreadable result,
/// bad timestamp) fails with [`PlanError::MalformedKit`]. The plan is read
/// through [`PlanInput::from_untrusted_json`], so bad field values fail with
/// the same errors as a fresh request.
pub fn verify_kit_json(json: &str) -> Result<PlanOutput, PlanError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| PlanError::MalformedKit(format!("not valid JSON: {}", e)))?;
    let obj = value
        .as_object()
        .ok_or_else(|| PlanError::MalformedKit("the kit must be a JSON object".into()))?;

    let plan_value = obj
        .get("plan")
        .ok_or_else(|| PlanError::MalformedKit("missing \"plan\"".into()))?;
    let result_value = obj
        .get("result")
        .ok_or_else(|| PlanError::MalformedKit("missing \"result\"".into()))?;

    if let Some(created_at) = obj.get("created_at").filter(|v| !v.is_null()) {
        let text = created_at
            .as_str()
            .ok_or_else(|| PlanError::MalformedKit("created_at must be a string".into()))?;
        chrono::DateTime::parse_from_rfc3339(text).map_err(|e| {
            PlanError::MalformedKit(format!("created_at is not an RFC-3339 timestamp: {}", e))
        })?;
    }

    let plan = PlanInput::from_untrusted_json(plan_value)?;
    let result: PlanOutput = serde_json::from_value(result_value.clone())
        .map_err(|e| PlanError::MalformedKit(format!("unreadable result: {}", e)))?;

    verify_kit(&plan, &result)
}

fn check_field(field: &'static str, expected: &str, found: &str) -> Result<(), PlanError> {
    if expected != found {
        return Err(PlanError::IntegrityCheckFailed {
            field,
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}
