//! Curve and script primitives the plan engine depends on.
//!
//! Everything above this module talks to [`Primitives`] only, so the
//! underlying secp256k1 / script library can be swapped without touching
//! validation, compilation or the orchestrator.

use bitcoin::opcodes::all::{OP_CHECKSIG, OP_CSV, OP_DROP, OP_ELSE, OP_ENDIF, OP_IF};
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1, SecretKey};

use crate::PlanError;

/// One element of a script template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    If,
    Else,
    EndIf,
    CheckSig,
    CheckSequenceVerify,
    Drop,
    /// Raw data push (keys)
    PushBytes(Vec<u8>),
    /// Script number, minimally encoded
    PushNumber(i64),
}

/// Capability interface over elliptic-curve and script-opcode libraries
pub trait Primitives {
    /// True if `bytes` is a valid compressed secp256k1 point.
    fn is_valid_point(&self, bytes: &[u8]) -> bool;

    /// Compressed public key for a 32-byte secret scalar, or `None` if the
    /// scalar is zero or not below the curve order.
    fn derive_public_key(&self, secret: &[u8; 32]) -> Option<[u8; 33]>;

    /// Minimal little-endian script-number encoding (sign bit in the top byte).
    fn encode_minimal_number(&self, n: i64) -> Vec<u8> {
        if n == 0 {
            return Vec::new();
        }
        let negative = n < 0;
        let mut abs = n.unsigned_abs();
        let mut out = Vec::with_capacity(9);
        while abs > 0 {
            out.push((abs & 0xff) as u8);
            abs >>= 8;
        }
        let last = out.len() - 1;
        if out[last] & 0x80 != 0 {
            out.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            out[last] |= 0x80;
        }
        out
    }

    /// Serialize a template to script bytes.
    fn compile_opcodes(&self, ops: &[ScriptOp]) -> Result<Vec<u8>, PlanError>;
}

/// Default backend on `bitcoin` / `secp256k1`
pub struct Secp256k1Backend {
    secp: Secp256k1<All>,
}

impl Default for Secp256k1Backend {
    fn default() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Primitives for Secp256k1Backend {
    fn is_valid_point(&self, bytes: &[u8]) -> bool {
        bytes.len() == 33 && PublicKey::from_slice(bytes).is_ok()
    }

    fn derive_public_key(&self, secret: &[u8; 32]) -> Option<[u8; 33]> {
        let sk = SecretKey::from_slice(secret).ok()?;
        Some(PublicKey::from_secret_key(&self.secp, &sk).serialize())
    }

    fn compile_opcodes(&self, ops: &[ScriptOp]) -> Result<Vec<u8>, PlanError> {
        let mut builder = Builder::new();
        for op in ops {
            builder = match op {
                ScriptOp::If => builder.push_opcode(OP_IF),
                ScriptOp::Else => builder.push_opcode(OP_ELSE),
                ScriptOp::EndIf => builder.push_opcode(OP_ENDIF),
                ScriptOp::CheckSig => builder.push_opcode(OP_CHECKSIG),
                ScriptOp::CheckSequenceVerify => builder.push_opcode(OP_CSV),
                ScriptOp::Drop => builder.push_opcode(OP_DROP),
                ScriptOp::PushBytes(bytes) => builder.push_slice(push_bytes(bytes.clone())?),
                // Small numbers have dedicated opcodes (OP_0, OP_1NEGATE, OP_1..OP_16)
                ScriptOp::PushNumber(n) if (-1..=16).contains(n) => builder.push_int(*n),
                ScriptOp::PushNumber(n) => {
                    builder.push_slice(push_bytes(self.encode_minimal_number(*n))?)
                }
            };
        }
        Ok(builder.into_script().into_bytes())
    }
}

fn push_bytes(bytes: Vec<u8>) -> Result<PushBytesBuf, PlanError> {
    PushBytesBuf::try_from(bytes)
        .map_err(|e| PlanError::AddressDerivationFailed(format!("script push too large: {}", e)))
}
