// Copyright (c) 2018-2022 The Botho Foundation

use curve25519_dalek::Scalar;
use xmrsign_account_keys::PublicAddress;
use xmrsign_crypto_keys::CompressedPoint;

use crate::TxError;

/// A requested transaction, as the host hands it to the signer: the
/// recipients, an optional change output, and the subaddress account the
/// spent funds are drawn from.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TsxData {
    /// Transaction format version (2 for RingCT).
    pub version: u32,
    /// Encrypted payment id, if any; 0 or 8 bytes.
    pub payment_id: alloc::vec::Vec<u8>,
    /// The unlock time / block height.
    pub unlock_time: u64,
    /// The recipients and amounts.
    pub outputs: alloc::vec::Vec<Destination>,
    /// The change output, if the host pre-computed one.
    pub change_dts: Option<Destination>,
    /// The major subaddress index (account) funds are spent from.
    pub subaddr_account: u32,
    /// The minor subaddress indices the inputs may come from.
    pub subaddr_indices: alloc::vec::Vec<u32>,
}

impl TsxData {
    /// Validates the shape invariants this type is expected to uphold
    /// before a signing session begins.
    pub fn validate(&self) -> Result<(), TxError> {
        if !self.payment_id.is_empty() && self.payment_id.len() != 8 {
            return Err(TxError::InvalidPaymentIdLength(self.payment_id.len()));
        }
        if self.outputs.is_empty() {
            return Err(TxError::NoOutputs);
        }
        Ok(())
    }
}

/// A single recipient of a transaction.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Destination {
    /// The amount sent to this destination, in atomic units.
    pub amount: u64,
    /// The recipient's address.
    pub addr: PublicAddress,
    /// Whether `addr` is a subaddress (changes tx-key derivation, see
    /// `init_transaction`).
    pub is_subaddress: bool,
}

/// One ring member of a spent input: its one-time output key and the
/// commitment to its amount.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceRingMember {
    /// The global output index on the chain.
    pub global_index: u64,
    /// The one-time output public key.
    pub dest: CompressedPoint,
    /// The output's Pedersen commitment.
    pub commitment: CompressedPoint,
}

/// One input being spent: the ring it's hidden among, plus the real
/// output's private material.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceEntry {
    /// The amount being spent (cleartext; only meaningful pre-RCT, zero for
    /// RCT inputs which hide it in the commitment).
    pub amount: u64,
    /// The ring of candidate outputs, including the real one.
    pub outputs: alloc::vec::Vec<SourceRingMember>,
    /// Index into `outputs` of the output actually being spent.
    pub real_output: usize,
    /// The transaction public key of the real output's transaction.
    pub real_out_tx_key: CompressedPoint,
    /// Additional per-output tx keys, if the real output's transaction used
    /// them (subaddress destinations mixed with standard ones).
    pub real_out_additional_tx_keys: alloc::vec::Vec<CompressedPoint>,
    /// The real output's index within its own transaction's outputs.
    pub real_output_in_tx_index: u32,
    /// The real output's commitment blinding factor.
    pub mask: Scalar,
    /// Whether this is an RCT-hidden input.
    pub rct: bool,
}

impl SourceEntry {
    /// Checks `real_output` indexes into `outputs`.
    pub fn validate(&self) -> Result<(), TxError> {
        if self.real_output >= self.outputs.len() {
            return Err(TxError::RealOutputOutOfBounds(self.real_output, self.outputs.len()));
        }
        Ok(())
    }

    /// The real output's ring member.
    pub fn real_entry(&self) -> &SourceRingMember {
        &self.outputs[self.real_output]
    }
}
