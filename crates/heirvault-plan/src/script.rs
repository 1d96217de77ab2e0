//! Vault script construction
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
//! Owner path: witness selector 1, spendable at any time.
//! Beneficiary path: witness selector 0, valid once the spending input's
//! sequence encodes a relative height lock of at least `locktime_blocks`.

use bitcoin::{ScriptBuf, Sequence};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checkin::approx_duration;
use crate::primitives::{Primitives, ScriptOp};
use crate::validate::CompressedKey;
use crate::PlanError;

/// Smallest accepted relative timelock
pub const MIN_LOCKTIME_BLOCKS: u32 = 1;

/// Largest accepted relative timelock (~1 year at 10 minutes per block)
pub const MAX_LOCKTIME_BLOCKS: u32 = 52_560;

/// Relative timelock in blocks (~10 min each)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timelock(u16);

impl Timelock {
    /// Create a timelock from a number of blocks in
    /// `MIN_LOCKTIME_BLOCKS..=MAX_LOCKTIME_BLOCKS`.
    pub fn from_blocks(blocks: u32) -> Result<Self, PlanError> {
        if !(MIN_LOCKTIME_BLOCKS..=MAX_LOCKTIME_BLOCKS).contains(&blocks) {
            return Err(PlanError::LocktimeRange {
                value: blocks.to_string(),
            });
        }
        Ok(Self(blocks as u16))
    }

    /// 6 months (~26,280 blocks)
    pub fn six_months() -> Self {
        Self(26_280)
    }

    /// 1 year (~52,560 blocks)
    pub fn one_year() -> Self {
        Self(52_560)
    }

    pub fn blocks(&self) -> u16 {
        self.0
    }

    /// nSequence value the beneficiary's spending input must carry
    pub fn to_sequence(&self) -> Sequence {
        Sequence::from_height(self.0)
    }
}

impl fmt::Display for Timelock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} blocks)",
            approx_duration(u64::from(self.0)),
            self.0
        )
    }
}

/// Key serialization inside the script.
///
/// Witness scripts take 33-byte compressed keys. Tapscript `OP_CHECKSIG`
/// only verifies 32-byte x-only keys; any other length is an unknown key
/// type that succeeds for every non-empty signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptContext {
    Segwitv0,
    Tap,
}

impl ScriptContext {
    fn key_bytes(self, key: &CompressedKey) -> Vec<u8> {
        match self {
            ScriptContext::Segwitv0 => key.as_bytes().to_vec(),
            ScriptContext::Tap => key.x_only().to_vec(),
        }
    }
}

/// The opcode template for a vault
pub fn vault_template(
    owner: &CompressedKey,
    beneficiary: &CompressedKey,
    timelock: Timelock,
    ctx: ScriptContext,
) -> Vec<ScriptOp> {
    vec![
        ScriptOp::If,
        ScriptOp::PushBytes(ctx.key_bytes(owner)),
        ScriptOp::CheckSig,
        ScriptOp::Else,
        ScriptOp::PushNumber(i64::from(timelock.blocks())),
        ScriptOp::CheckSequenceVerify,
        ScriptOp::Drop,
        ScriptOp::PushBytes(ctx.key_bytes(beneficiary)),
        ScriptOp::CheckSig,
        ScriptOp::EndIf,
    ]
}

/// Compile the vault script for the given context
pub fn compile_vault_script<P: Primitives + ?Sized>(
    prims: &P,
    owner: &CompressedKey,
    beneficiary: &CompressedKey,
    timelock: Timelock,
    ctx: ScriptContext,
) -> Result<ScriptBuf, PlanError> {
    let ops = vault_template(owner, beneficiary, timelock, ctx);
    Ok(ScriptBuf::from_bytes(prims.compile_opcodes(&ops)?))
}
