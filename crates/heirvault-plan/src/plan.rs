//! Plan orchestration: validate, compile, derive, explain.

use bitcoin::secp256k1::Secp256k1;
use heirvault_shamir::{ShamirConfig, ShamirError};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::address::{self, NUMS_INTERNAL_KEY};
use crate::primitives::{Primitives, Secp256k1Backend};
use crate::script::{compile_vault_script, ScriptContext};
use crate::types::{AddressType, PlanInput, PlanOutput, RecoveryMethod, SocialRecoveryKit};
use crate::validate::{validate, CompressedKey, ValidatedPlan};
use crate::PlanError;

/// Attempts at drawing a valid secret scalar before giving up
const KEYGEN_ATTEMPTS: usize = 8;

/// Build a vault plan with the default secp256k1 backend.
///
/// Single plans are a pure function of `input`. Social plans generate a
/// fresh beneficiary key, split it, and return the shares in
/// [`PlanOutput::social_recovery_kit`]; the secret itself never leaves this
/// call. Any beneficiary key in a social request is checked and then
/// replaced by the generated one.
pub fn build(input: &PlanInput) -> Result<PlanOutput, PlanError> {
    build_with(input, &Secp256k1Backend::default())
}

/// [`build`] over any [`Primitives`] backend
pub fn build_with<P: Primitives + ?Sized>(
    input: &PlanInput,
    prims: &P,
) -> Result<PlanOutput, PlanError> {
    let plan = validate(input, prims)?;

    match plan.recovery_method {
        RecoveryMethod::Single => {
            let beneficiary = plan.beneficiary.ok_or_else(|| PlanError::InvalidKey {
                role: crate::KeyRole::Beneficiary,
                reason: "the key is empty".into(),
            })?;
            assemble(&plan, &beneficiary, prims, None)
        }
        RecoveryMethod::Social => {
            if plan.beneficiary.is_some() {
                log::debug!("Replacing the supplied beneficiary key with a generated one");
            }
            let config = plan.sss_config.ok_or_else(|| {
                PlanError::InvalidRecoveryConfig("social recovery needs an sss_config".into())
            })?;

            let (secret, beneficiary) = generate_beneficiary_key(prims)?;
            let shares = heirvault_shamir::split(&secret, &config)?;
            drop(secret);

            let kit = SocialRecoveryKit {
                config,
                beneficiary_pubkey: beneficiary.to_hex(),
                shares,
                instructions: trustee_instructions(&config),
            };
            assemble(&plan, &beneficiary, prims, Some(kit))
        }
    }
}

/// Rebuild a plan whose beneficiary key is already fixed.
///
/// Social plans saved in a recovery kit carry the generated key, so they
/// rebuild to the same address without touching randomness. No share
/// material is produced.
pub fn rebuild_with<P: Primitives + ?Sized>(
    input: &PlanInput,
    prims: &P,
) -> Result<PlanOutput, PlanError> {
    let plan = validate(input, prims)?;
    let beneficiary = plan.beneficiary.ok_or_else(|| {
        PlanError::MalformedKit("the plan has no beneficiary key to rebuild from".into())
    })?;
    assemble(&plan, &beneficiary, prims, None)
}

fn assemble<P: Primitives + ?Sized>(
    plan: &ValidatedPlan,
    beneficiary: &CompressedKey,
    prims: &P,
    social_kit: Option<SocialRecoveryKit>,
) -> Result<PlanOutput, PlanError> {
    let ctx = match plan.address_type {
        AddressType::SegwitV0 => ScriptContext::Segwitv0,
        AddressType::SegwitV1 => ScriptContext::Tap,
    };
    let script = compile_vault_script(prims, &plan.owner, beneficiary, plan.timelock, ctx)?;

    let secp = Secp256k1::verification_only();
    let vault = address::derive(&secp, plan.address_type, &script, plan.network)?;
    let address = vault.address.to_string();
    let script_hex = script.to_hex_string();

    log::info!(
        "Built {} vault on {} with a {} block timelock",
        plan.address_type.as_str(),
        plan.network,
        plan.timelock.blocks()
    );

    Ok(PlanOutput {
        human_explanation: explain(plan, beneficiary, &address, social_kit.as_ref()),
        descriptor: vault.descriptor.clone(),
        script_asm: script.to_asm_string(),
        witness_script: script_hex.clone(),
        script_hex,
        address,
        network: plan.network,
        address_type: plan.address_type,
        control_block: vault.control_block().map(|cb| hex::encode(cb.serialize())),
        social_recovery_kit: social_kit,
    })
}

/// Draw a secret scalar from the OS RNG and derive its public key.
fn generate_beneficiary_key<P: Primitives + ?Sized>(
    prims: &P,
) -> Result<(Zeroizing<[u8; 32]>, CompressedKey), PlanError> {
    let mut secret = Zeroizing::new([0u8; 32]);
    for _ in 0..KEYGEN_ATTEMPTS {
        OsRng.fill_bytes(&mut secret[..]);
        if let Some(pubkey) = prims.derive_public_key(&secret) {
            return Ok((secret, CompressedKey::from_bytes(pubkey)));
        }
    }
    Err(PlanError::Shamir(ShamirError::InvalidSecret(
        "could not draw a valid secp256k1 scalar".into(),
    )))
}

fn explain(
    plan: &ValidatedPlan,
    beneficiary: &CompressedKey,
    address: &str,
    social_kit: Option<&SocialRecoveryKit>,
) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Vault address ({}, {}): {}",
            plan.address_type.label(),
            plan.network,
            address
        ),
        format!(
            "Owner path: the owner key {} can spend from this vault at any time.",
            plan.owner.to_hex()
        ),
        format!(
            "Beneficiary path: the beneficiary key {} can spend once a deposit has {} \
             confirmations, roughly {}.",
            beneficiary.to_hex(),
            plan.timelock.blocks(),
            plan.timelock
        ),
        "Timer reset: each deposit starts its own countdown when it confirms. Spending \
         with the owner key and sending the funds back to a vault address restarts it."
            .to_string(),
    ];

    if plan.address_type == AddressType::SegwitV1 {
        lines.push(format!(
            "Taproot: the internal key {} has no known private key, so the script above is \
             the only way to spend.",
            NUMS_INTERNAL_KEY
        ));
    }

    if let Some(kit) = social_kit {
        lines.push(format!(
            "Social recovery: the beneficiary key was generated for this vault and split \
             into {} shares; any {} trustees together can rebuild it.",
            kit.config.total, kit.config.threshold
        ));
    }

    lines
}

fn trustee_instructions(config: &ShamirConfig) -> String {
    format!(
        "Give each of the {total} trustees exactly one share, on paper or offline media. \
         Any {threshold} of them can combine their shares to rebuild the beneficiary key \
         once the timelock has matured; fewer than {threshold} learn nothing about it. \
         Store the recovery kit separately from the shares.",
        total = config.total,
        threshold = config.threshold
    )
}
