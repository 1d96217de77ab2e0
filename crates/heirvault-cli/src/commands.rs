//! Command implementations. Each returns a value for `main` to print.

use anyhow::{bail, Context, Result};
use heirvault_explorer::{
    explorer_address_url, AddressSummary, BroadcastResult, CancellationToken, ExplorerClient,
};
use heirvault_plan::{
    build, plan_check_in, verify_kit_json, CheckInPlan, PlanInput, PlanOutput, Primitives,
    RecoveryKit, Secp256k1Backend,
};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use zeroize::Zeroizing;

use crate::config::CliConfig;

/// `status` output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub summary: AddressSummary,
    pub explorer_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in: Option<CheckInPlan>,
}

/// A beneficiary key rebuilt from trustee shares
pub struct RecoveredKey {
    pub secret_hex: Zeroizing<String>,
    pub pubkey: String,
}

/// Build a plan from a JSON request file, optionally saving a recovery kit.
pub fn plan(request: &Path, kit: Option<&Path>) -> Result<PlanOutput> {
    let contents = std::fs::read_to_string(request)
        .with_context(|| format!("Failed to read plan request: {}", request.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).context("Plan request is not valid JSON")?;
    let input = PlanInput::from_untrusted_json(&value)?;
    let output = build(&input)?;

    if let Some(path) = kit {
        let json = RecoveryKit::new(&input, &output).to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write recovery kit: {}", path.display()))?;
        log::info!("Recovery kit written to {}", path.display());
    }
    if output.social_recovery_kit.is_some() {
        log::warn!("Shares are printed once and are not stored in the kit; hand them out now");
    }
    Ok(output)
}

/// Rebuild a saved kit and confirm it still matches.
pub fn verify(kit: &Path) -> Result<PlanOutput> {
    let contents = std::fs::read_to_string(kit)
        .with_context(|| format!("Failed to read recovery kit: {}", kit.display()))?;
    let rebuilt = verify_kit_json(&contents)?;
    log::info!("Recovery kit verified: {}", rebuilt.address);
    Ok(rebuilt)
}

pub fn checkin(config: &CliConfig, locktime: u32, confirmations: Option<u32>) -> CheckInPlan {
    plan_check_in(locktime, confirmations, config.checkin.cadence_ratio)
}

/// Fetch the vault's on-chain state, plus check-in guidance when the
/// locktime is known.
pub async fn status(
    config: &CliConfig,
    address: &str,
    locktime: Option<u32>,
    cancel: &CancellationToken,
) -> Result<StatusReport> {
    let network = config.network()?;
    let provider = config.provider()?;
    let client = ExplorerClient::new(config.explorer_config()?);

    let summary = client
        .fetch_address_summary(network, address, provider, config.explorer.fallback, cancel)
        .await?;
    if summary.used_fallback_provider {
        log::warn!("{} failed, answered by {}", provider, summary.provider_used);
    }

    let check_in = locktime.map(|blocks| {
        plan_check_in(
            blocks,
            summary.confirmations_since_last_funding(),
            config.checkin.cadence_ratio,
        )
    });

    Ok(StatusReport {
        explorer_url: explorer_address_url(network, summary.provider_used, &summary.address)?,
        summary,
        check_in,
    })
}

/// Relay a signed transaction. `-` reads the hex from stdin.
pub async fn broadcast(
    config: &CliConfig,
    tx_hex: &str,
    cancel: &CancellationToken,
) -> Result<BroadcastResult> {
    let tx_hex = if tx_hex == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read transaction hex from stdin")?;
        buf
    } else {
        tx_hex.to_string()
    };

    let client = ExplorerClient::new(config.explorer_config()?);
    let result = client
        .broadcast(
            config.network()?,
            &tx_hex,
            config.provider()?,
            config.explorer.fallback,
            cancel,
        )
        .await?;
    Ok(result)
}

/// Recombine trustee shares into the beneficiary key.
pub fn combine(shares: &[String]) -> Result<RecoveredKey> {
    let secret = heirvault_shamir::combine(shares)?;
    let Ok(bytes) = <[u8; 32]>::try_from(secret.as_slice()) else {
        bail!(
            "Recovered secret is {} bytes; a beneficiary key is 32",
            secret.len()
        );
    };
    let bytes = Zeroizing::new(bytes);

    let Some(pubkey) = Secp256k1Backend::default().derive_public_key(&bytes) else {
        bail!("Recovered secret is not a valid key; check that the shares belong to one vault");
    };

    Ok(RecoveredKey {
        secret_hex: Zeroizing::new(hex::encode(bytes.as_slice())),
        pubkey: hex::encode(pubkey),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use heirvault_plan::{AddressType, PlanError};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const OWNER: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const BENEFICIARY: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    fn request_file(json: serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", json).unwrap();
        file
    }

    #[test]
    fn test_plan_writes_verifiable_kit() {
        let request = request_file(serde_json::json!({
            "network": "testnet",
            "owner_pubkey": OWNER,
            "beneficiary_pubkey": BENEFICIARY,
            "locktime_blocks": 26280,
            "address_type": "segwit-v0"
        }));
        let dir = TempDir::new().unwrap();
        let kit_path = dir.path().join("kit.json");

        let output = plan(request.path(), Some(&kit_path)).unwrap();
        assert_eq!(output.address_type, AddressType::SegwitV0);
        assert!(output.address.starts_with("tb1q"));

        let rebuilt = verify(&kit_path).unwrap();
        assert_eq!(rebuilt.address, output.address);
    }

    #[test]
    fn test_plan_rejects_bad_request() {
        let request = request_file(serde_json::json!({
            "network": "testnet",
            "owner_pubkey": OWNER,
            "beneficiary_pubkey": OWNER,
            "locktime_blocks": 26280
        }));
        let err = plan(request.path(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlanError>(),
            Some(PlanError::KeyCollision)
        ));

        let mut not_json = NamedTempFile::new().unwrap();
        write!(not_json, "owner=02..").unwrap();
        assert!(plan(not_json.path(), None).is_err());
    }

    #[test]
    fn test_verify_detects_tampering() {
        let request = request_file(serde_json::json!({
            "network": "testnet",
            "owner_pubkey": OWNER,
            "beneficiary_pubkey": BENEFICIARY,
            "locktime_blocks": 144
        }));
        let dir = TempDir::new().unwrap();
        let kit_path = dir.path().join("kit.json");
        plan(request.path(), Some(&kit_path)).unwrap();

        let mut kit: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&kit_path).unwrap()).unwrap();
        kit["plan"]["locktime_blocks"] = serde_json::json!(145);
        std::fs::write(&kit_path, kit.to_string()).unwrap();

        assert!(verify(&kit_path).is_err());
    }

    #[test]
    fn test_social_plan_shares_recombine() {
        let request = request_file(serde_json::json!({
            "network": "testnet",
            "owner_pubkey": OWNER,
            "locktime_blocks": 4320,
            "recovery_method": "social",
            "sss_config": { "threshold": 2, "total": 3 }
        }));
        let output = plan(request.path(), None).unwrap();
        let social = output.social_recovery_kit.unwrap();

        let shares: Vec<String> = social
            .shares
            .iter()
            .skip(1)
            .map(|s| s.share.clone())
            .collect();
        let recovered = combine(&shares).unwrap();
        assert_eq!(recovered.pubkey, social.beneficiary_pubkey);
        assert_eq!(recovered.secret_hex.len(), 64);
    }

    #[test]
    fn test_combine_rejects_single_share() {
        assert!(combine(&[format!("01{}", "ab".repeat(32))]).is_err());
    }

    #[test]
    fn test_checkin_uses_configured_ratio() {
        let mut config = CliConfig::default();
        config.checkin.cadence_ratio = 0.25;
        let plan = checkin(&config, 1000, Some(100));
        assert_eq!(plan.recommended_check_in_every_blocks, 250);
        assert_eq!(plan.blocks_until_recommended_check_in, Some(150));
    }
}
