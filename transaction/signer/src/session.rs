// Copyright (c) 2018-2022 The Botho Foundation

//! The Signer's transaction-signing session: the state machine of §4.1
//! driving the phases of §4.3-§4.9.
//!
//! Every public method on [`SignerSession`] corresponds to one Signer RPC
//! call; illegal phase transitions and failed re-authentication are both
//! fatal to the session (§7): once an error is returned the session is
//! poisoned and every subsequent call fails with the same state error.

use alloc::{collections::BTreeMap, vec::Vec};

use curve25519_dalek::{
    constants::ED25519_BASEPOINT_TABLE, traits::Identity, EdwardsPoint, Scalar,
};
use rand_core::{CryptoRng, RngCore};
use xmrsign_account_keys::{
    compute_key_image, derive_public_spend_key, derive_secret_spend_key, generate_key_derivation,
    AccountKeys, PublicAddress, SubaddressIndex,
};
use xmrsign_crypto_keys::{
    generators::h_generator,
    hash::{hash_to_scalar_parts, keccak256},
    varint::{encode_varint, write_varint},
    CompressedPoint,
};
use xmrsign_ring_signature::{
    borromean::{prove_range, ver_range, RangeSig},
    ecdh_encode, mlsag, pedersen_commit, Commitment, EcdhTuple, KeyImage, UnmaskedAmount,
};
use xmrsign_transaction_core::{
    Destination, PreMlsagHasher, RctSigBase, RctSigPrunable, RctType, SourceEntry,
    TxPrefixHasher, TxinToKey, TxOut, TsxData,
};

use crate::{
    config::{SessionConfig, SessionMode},
    error::SignerError,
    keys::{decrypt_alpha, encrypt_alpha, hmac_sign, hmac_verify, KeySchedule},
    state::TState,
};

/// A multisig key-image-recovery tuple. Not implemented: any `Some(_)`
/// passed to a signing entry point is rejected rather than silently
/// ignored, per the resolved Open Question (§9).
#[derive(Clone, Copy, Debug)]
pub struct MultisigKLRki {
    /// The multisig key image share.
    pub ki: CompressedPoint,
}

/// Everything `set_input` hands back to the Host for this input.
pub struct SetInputOutput {
    pub vin: TxinToKey,
    pub hmac_vin: [u8; 32],
    /// `Some` only for Simple RCT (`input_count > 1`).
    pub pseudo_out: Option<(Commitment, [u8; 32])>,
    /// `Some` only for Simple RCT in streaming mode.
    pub alpha_enc: Option<Vec<u8>>,
}

/// Everything `set_output` hands back to the Host for this destination.
pub struct SetOutputOutput {
    pub vout: TxOut,
    pub hmac_vout: [u8; 32],
    pub rsig: RangeSig,
    pub hmac_rsig: [u8; 32],
    /// The output's Pedersen commitment (`out_pk`), public chain data the
    /// Host assembles into the final `RctSigBase` alongside `ecdh`.
    pub commitment: Commitment,
    /// The output's ECDH-masked `(mask, amount)` tuple (`ecdh_info`).
    pub ecdh: EcdhTuple,
}

/// The finished RingCT signature material, assembled by the Host once
/// every input has been signed.
pub struct FinishedRct {
    pub base: RctSigBase,
    pub prunable: RctSigPrunable,
}

fn classify_destinations(
    outputs: &[Destination],
    change: Option<&Destination>,
) -> (usize, usize, Option<usize>) {
    let mut num_std = 0;
    let mut num_sub = 0;
    let mut only_sub = None;
    for (i, dst) in outputs.iter().enumerate() {
        if change.map_or(false, |c| c.addr == dst.addr) {
            continue;
        }
        if dst.is_subaddress {
            num_sub += 1;
            only_sub = Some(i);
        } else {
            num_std += 1;
        }
    }
    if num_sub != 1 {
        only_sub = None;
    }
    (num_std, num_sub, only_sub)
}

fn relative_output_offsets(indices: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(indices.len());
    let mut prev = 0u64;
    for (i, &idx) in indices.iter().enumerate() {
        out.push(if i == 0 { idx } else { idx - prev });
        prev = idx;
    }
    out
}

/// Inverse of [`relative_output_offsets`], for ascending `xs`.
pub fn absolute_output_offsets(relative: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(relative.len());
    let mut acc = 0u64;
    for (i, &r) in relative.iter().enumerate() {
        acc = if i == 0 { r } else { acc + r };
        out.push(acc);
    }
    out
}

fn serialize_src_vin(src: &SourceEntry, vin: &TxinToKey) -> Vec<u8> {
    let mut buf = Vec::new();
    write_varint(src.real_output as u64, &mut buf);
    for member in &src.outputs {
        buf.extend_from_slice(member.dest.as_bytes());
        buf.extend_from_slice(member.commitment.as_bytes());
    }
    write_varint(vin.amount, &mut buf);
    for offset in &vin.key_offsets {
        write_varint(*offset, &mut buf);
    }
    buf.extend_from_slice(vin.k_image.as_bytes());
    buf
}

fn serialize_dst_vout(dst: &Destination, vout: &TxOut) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(dst.addr.spend_public_key().as_bytes());
    buf.extend_from_slice(dst.addr.view_public_key().as_bytes());
    write_varint(dst.amount, &mut buf);
    write_varint(vout.amount, &mut buf);
    buf.extend_from_slice(vout.target.as_bytes());
    buf
}

fn amount_key_for(derivation: &EdwardsPoint, index: u64) -> Scalar {
    let mut idx_buf = encode_varint(index);
    hash_to_scalar_parts(&[derivation.compress().as_bytes(), idx_buf.as_mut_slice()])
}

/// A transaction's signing session. Holds the wallet's private keys for its
/// lifetime; every error poisons it (§7).
pub struct SignerSession {
    state: TState,
    poisoned: bool,
    config: SessionConfig,
    creds: AccountKeys,

    tsx_ctr: u64,
    version: u32,
    unlock_time: u64,
    change_address: Option<PublicAddress>,

    r: Scalar,
    r_pub: EdwardsPoint,
    need_additional: bool,
    additional_tx_keys: Vec<Scalar>,
    additional_tx_public_keys: Vec<EdwardsPoint>,
    extra: Vec<u8>,
    total_outputs: usize,

    keys: Option<KeySchedule>,

    subaddresses: BTreeMap<[u8; 32], SubaddressIndex>,

    input_count: usize,
    summary_inputs_money: u64,
    sources: Vec<SourceEntry>,
    vins: Vec<TxinToKey>,
    input_secrets: Vec<Scalar>,
    input_alphas: Vec<Scalar>,
    pseudo_outs: Vec<Commitment>,
    sumpouts_alphas: Scalar,
    source_permutation: Vec<usize>,
    permuted_vins_seen: usize,

    destinations: Vec<Destination>,
    output_amounts: Vec<u64>,
    output_masks: Vec<Scalar>,
    output_commitments: Vec<Commitment>,
    vouts: Vec<TxOut>,
    sumout: Scalar,
    txn_fee: u64,

    prefix_hasher: Option<TxPrefixHasher>,
    tx_prefix_hash: Option<[u8; 32]>,
    full_message_hasher: Option<PreMlsagHasher>,
    full_message: Option<[u8; 32]>,
    pseudo_outs_absorbed: usize,
    range_sigs_absorbed: usize,
    range_sigs: Vec<RangeSig>,
    ecdh_info: Vec<EcdhTuple>,

    sign_results: Vec<mlsag::MlsagSignature>,
}

impl SignerSession {
    /// Opens a session for `creds` with the given configuration. `tsx_ctr`
    /// is the wallet's monotonic per-session counter, mixed into
    /// `key_master` so two sessions over identical request data never share
    /// key material.
    pub fn new(creds: AccountKeys, config: SessionConfig, tsx_ctr: u64) -> Self {
        Self {
            state: TState::start(),
            poisoned: false,
            config,
            creds,
            tsx_ctr,
            version: 0,
            unlock_time: 0,
            change_address: None,
            r: Scalar::ZERO,
            r_pub: EdwardsPoint::identity(),
            need_additional: false,
            additional_tx_keys: Vec::new(),
            additional_tx_public_keys: Vec::new(),
            extra: Vec::new(),
            total_outputs: 0,
            keys: None,
            subaddresses: BTreeMap::new(),
            input_count: 0,
            summary_inputs_money: 0,
            sources: Vec::new(),
            vins: Vec::new(),
            input_secrets: Vec::new(),
            input_alphas: Vec::new(),
            pseudo_outs: Vec::new(),
            sumpouts_alphas: Scalar::ZERO,
            source_permutation: Vec::new(),
            permuted_vins_seen: 0,
            destinations: Vec::new(),
            output_amounts: Vec::new(),
            output_masks: Vec::new(),
            output_commitments: Vec::new(),
            vouts: Vec::new(),
            sumout: Scalar::ZERO,
            txn_fee: 0,
            prefix_hasher: None,
            tx_prefix_hash: None,
            full_message_hasher: None,
            full_message: None,
            pseudo_outs_absorbed: 0,
            range_sigs_absorbed: 0,
            range_sigs: Vec::new(),
            ecdh_info: Vec::new(),
            sign_results: Vec::new(),
        }
    }

    /// The current phase.
    pub fn state(&self) -> TState {
        self.state
    }

    /// Whether a prior error has torn this session's key material down.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    fn require_state(&mut self, allowed: &[TState]) -> Result<(), SignerError> {
        if self.poisoned {
            return Err(SignerError::IllegalState(self.state));
        }
        if !allowed.contains(&self.state) {
            self.poisoned = true;
            return Err(SignerError::IllegalState(self.state));
        }
        Ok(())
    }

    fn fail<T>(&mut self, e: SignerError) -> Result<T, SignerError> {
        self.poisoned = true;
        Err(e)
    }

    fn is_full_rct(&self) -> bool {
        self.input_count == 1
    }

    /// §4.3: starts a session for the given transaction request.
    pub fn init_transaction<R: RngCore + CryptoRng>(
        &mut self,
        tsx_data: &TsxData,
        rng: &mut R,
    ) -> Result<EdwardsPoint, SignerError> {
        self.require_state(&[TState::Start])?;
        if let Err(e) = tsx_data.validate() {
            return self.fail(e.into());
        }

        self.change_address = tsx_data.change_dts.as_ref().map(|d| d.addr);
        let (num_std, num_sub, only_sub) =
            classify_destinations(&tsx_data.outputs, tsx_data.change_dts.as_ref());

        let r = Scalar::random(rng);
        let mut r_pub = &r * ED25519_BASEPOINT_TABLE;
        if num_std == 0 && num_sub == 1 {
            if let Some(idx) = only_sub {
                let spend = match tsx_data.outputs[idx].addr.spend_public_key().decompress() {
                    Ok(p) => p,
                    Err(_) => return self.fail(SignerError::CryptoContract),
                };
                r_pub = r * spend;
            }
        }

        let need_additional = num_sub > 0 && (num_std > 0 || num_sub > 1);
        let additional_tx_keys = if need_additional {
            (0..tsx_data.outputs.len()).map(|_| Scalar::random(rng)).collect()
        } else {
            Vec::new()
        };

        let mut extra = Vec::new();
        if !tsx_data.payment_id.is_empty() {
            if tsx_data.outputs.len() != 1 {
                return self.fail(SignerError::MultiplePaymentIdDestinations);
            }
            let dest = &tsx_data.outputs[0];
            let view_pub = match dest.addr.view_public_key().decompress() {
                Ok(p) => p,
                Err(_) => return self.fail(SignerError::CryptoContract),
            };
            let shared = generate_key_derivation(&r, &view_pub);
            let mask = keccak256(&[shared.compress().as_bytes().as_slice(), &[0x8bu8]].concat());
            let mut encrypted = [0u8; 8];
            for i in 0..8 {
                encrypted[i] = tsx_data.payment_id[i] ^ mask[i];
            }
            extra.extend_from_slice(&encrypted);
        }

        self.r = r;
        self.r_pub = r_pub;
        self.need_additional = need_additional;
        self.additional_tx_keys = additional_tx_keys;
        self.extra = extra;
        self.version = tsx_data.version;
        self.unlock_time = tsx_data.unlock_time;
        self.total_outputs = tsx_data.outputs.len();

        let mut tsx_bytes = Vec::new();
        write_varint(tsx_data.version as u64, &mut tsx_bytes);
        write_varint(tsx_data.unlock_time, &mut tsx_bytes);
        tsx_bytes.extend_from_slice(&tsx_data.payment_id);
        for dst in &tsx_data.outputs {
            write_varint(dst.amount, &mut tsx_bytes);
            tsx_bytes.extend_from_slice(dst.addr.spend_public_key().as_bytes());
            tsx_bytes.extend_from_slice(dst.addr.view_public_key().as_bytes());
        }
        self.keys = Some(KeySchedule::derive(&tsx_bytes, &r, self.tsx_ctr));

        self.state = TState::Init;
        tracing::debug!(tsx_ctr = self.tsx_ctr, "init_transaction complete");
        Ok(r_pub)
    }

    /// §9: builds the `encoded spend key -> subaddress index` lookup used
    /// to recognize which of the wallet's subaddresses owns a spent output.
    pub fn precompute_subaddr(&mut self, major: u32, minors: &[u32]) -> Result<(), SignerError> {
        self.require_state(&[TState::Init])?;
        self.subaddresses.insert(
            *self.creds.subaddress(SubaddressIndex::PRIMARY).spend_public_key().as_bytes(),
            SubaddressIndex::PRIMARY,
        );
        for &minor in minors {
            let idx = SubaddressIndex { major, minor };
            let addr = self.creds.subaddress(idx);
            self.subaddresses.insert(*addr.spend_public_key().as_bytes(), idx);
        }
        self.state = TState::Precomputed;
        Ok(())
    }

    /// §4.1: declares how many inputs will follow.
    pub fn set_input_count(&mut self, n: usize) -> Result<(), SignerError> {
        self.require_state(&[TState::Precomputed])?;
        if n == 0 {
            return self.fail(SignerError::NoInputs);
        }
        self.input_count = n;
        self.state = TState::InputCountSet;
        Ok(())
    }

    fn resolve_real_output_secret(
        &self,
        src: &SourceEntry,
    ) -> Result<(Scalar, EdwardsPoint), SignerError> {
        let real = src.real_entry();
        let dest_point = real.dest.decompress().map_err(|_| SignerError::CryptoContract)?;

        let tx_key_bytes = if !src.real_out_additional_tx_keys.is_empty() {
            src.real_out_additional_tx_keys
                .get(src.real_output_in_tx_index as usize)
                .unwrap_or(&src.real_out_tx_key)
        } else {
            &src.real_out_tx_key
        };
        let tx_key_point = tx_key_bytes.decompress().map_err(|_| SignerError::CryptoContract)?;

        let derivation = generate_key_derivation(self.creds.view_private_key(), &tx_key_point);

        for (spend_bytes, idx) in self.subaddresses.iter() {
            let subaddress_spend_public = CompressedPoint::from(*spend_bytes)
                .decompress()
                .map_err(|_| SignerError::CryptoContract)?;
            let candidate = derive_public_spend_key(
                &derivation,
                src.real_output_in_tx_index as u64,
                &subaddress_spend_public,
            );
            if candidate.compress() == dest_point.compress() {
                let subaddress_spend_private = self.creds.subaddress_spend_private(*idx);
                let x = derive_secret_spend_key(
                    &derivation,
                    src.real_output_in_tx_index as u64,
                    &subaddress_spend_private,
                );
                return Ok((x, dest_point));
            }
        }
        Err(SignerError::CryptoContract)
    }

    /// §4.4: ingests one input.
    pub fn set_input<R: RngCore + CryptoRng>(
        &mut self,
        src: SourceEntry,
        rng: &mut R,
    ) -> Result<SetInputOutput, SignerError> {
        self.require_state(&[TState::InputCountSet, TState::InputsPartial])?;
        if let Err(e) = src.validate() {
            return self.fail(e.into());
        }

        let (secret, _dest_point) = match self.resolve_real_output_secret(&src) {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        let key_image = compute_key_image(&secret, &src.real_entry().dest.decompress().unwrap());

        self.summary_inputs_money += src.amount;
        let i = self.sources.len() as u64;

        let global_indices: Vec<u64> = src.outputs.iter().map(|m| m.global_index).collect();
        let vin = TxinToKey {
            amount: if src.rct { 0 } else { src.amount },
            key_offsets: relative_output_offsets(&global_indices),
            k_image: KeyImage::from(key_image),
        };

        let keys = self.keys.as_ref().expect("keys derived at init_transaction");
        let hmac_vin = hmac_sign(&keys.hmac_key_txin(i), &serialize_src_vin(&src, &vin));

        let mut pseudo_out = None;
        let mut alpha_enc = None;
        if self.input_count > 1 {
            let alpha = Scalar::random(rng);
            let commitment = pedersen_commit(&alpha, src.amount);
            self.sumpouts_alphas += alpha;
            self.input_alphas.push(alpha);
            self.pseudo_outs.push(commitment);

            let comm_hmac =
                hmac_sign(&keys.hmac_key_txin_comm(i), commitment.point().compress().as_bytes());
            pseudo_out = Some((commitment, comm_hmac));

            if matches!(self.config.mode, SessionMode::Streaming) {
                alpha_enc = Some(encrypt_alpha(&keys.enc_key_txin_alpha(i), &alpha));
            }
        }

        self.input_secrets.push(secret);
        self.sources.push(src);
        self.vins.push(vin.clone());

        self.state = TState::InputsPartial;
        Ok(SetInputOutput {
            vin,
            hmac_vin,
            pseudo_out,
            alpha_enc,
        })
    }

    /// §4.5: all declared inputs have been ingested.
    pub fn inputs_done(&mut self) -> Result<(), SignerError> {
        self.require_state(&[TState::InputsPartial])?;
        if self.vins.len() != self.input_count {
            return self.fail(SignerError::InputCountMismatch(self.input_count, self.vins.len()));
        }
        if matches!(self.config.mode, SessionMode::Streaming) {
            let mut hasher = TxPrefixHasher::new(self.version as u64, self.unlock_time);
            hasher.set_vin_count(self.input_count);
            self.prefix_hasher = Some(hasher);
        }
        self.state = TState::InputsDone;
        Ok(())
    }

    /// §4.5: applies the Host's key-image sort to per-input session state.
    pub fn inputs_permutation(&mut self, perm: &[usize]) -> Result<(), SignerError> {
        self.require_state(&[TState::InputsDone])?;
        if perm.len() != self.input_count {
            return self.fail(SignerError::InputCountMismatch(self.input_count, perm.len()));
        }
        self.input_secrets = perm.iter().map(|&i| self.input_secrets[i]).collect();
        if !self.input_alphas.is_empty() {
            self.input_alphas = perm.iter().map(|&i| self.input_alphas[i]).collect();
            self.pseudo_outs = perm.iter().map(|&i| self.pseudo_outs[i]).collect();
        }
        if matches!(self.config.mode, SessionMode::InMemory) {
            self.sources = perm.iter().map(|&i| self.sources[i].clone()).collect();
            self.vins = perm.iter().map(|&i| self.vins[i].clone()).collect();
        }
        self.source_permutation = perm.to_vec();
        self.permuted_vins_seen = 0;
        self.state = TState::InputsPermuted;
        Ok(())
    }

    /// §4.5: re-authenticates and absorbs one permuted vin (streaming mode
    /// only).
    pub fn input_vini(
        &mut self,
        src: &SourceEntry,
        vin: &TxinToKey,
        hmac_vin: &[u8; 32],
    ) -> Result<(), SignerError> {
        self.require_state(&[TState::InputsPermuted, TState::InputVinsPartial])?;
        let p = self.permuted_vins_seen;
        if p >= self.source_permutation.len() {
            return self.fail(SignerError::InputCountMismatch(self.source_permutation.len(), p + 1));
        }
        let orig_index = self.source_permutation[p];
        let keys = self.keys.as_ref().expect("keys derived at init_transaction");
        let expected = keys.hmac_key_txin(orig_index as u64);
        if hmac_verify(&expected, &serialize_src_vin(src, vin), hmac_vin).is_err() {
            return self.fail(SignerError::Authentication);
        }
        if let Some(hasher) = self.prefix_hasher.as_mut() {
            hasher.add_vin(vin);
        }
        self.permuted_vins_seen += 1;
        self.state = TState::InputVinsPartial;
        Ok(())
    }

    /// §4.5: every permuted vin has been replayed.
    pub fn input_vini_done(&mut self) -> Result<(), SignerError> {
        self.require_state(&[TState::InputVinsPartial])?;
        if self.permuted_vins_seen != self.source_permutation.len() {
            return self.fail(SignerError::InputCountMismatch(
                self.source_permutation.len(),
                self.permuted_vins_seen,
            ));
        }
        self.state = TState::InputVinsDone;
        Ok(())
    }

    fn output_derivation(&self, i: usize, dst: &Destination) -> Result<EdwardsPoint, SignerError> {
        let is_change = self.change_address.map_or(false, |c| c == dst.addr);
        let view_pub = dst.addr.view_public_key().decompress().map_err(|_| SignerError::CryptoContract)?;
        if is_change {
            Ok(generate_key_derivation(self.creds.view_private_key(), &self.r_pub))
        } else if dst.is_subaddress && self.need_additional {
            Ok(generate_key_derivation(&self.additional_tx_keys[i], &view_pub))
        } else {
            Ok(generate_key_derivation(&self.r, &view_pub))
        }
    }

    /// §4.6: processes one destination, emitting its output and range
    /// proof.
    pub fn set_output<R: RngCore + CryptoRng>(
        &mut self,
        dst: Destination,
        rng: &mut R,
    ) -> Result<SetOutputOutput, SignerError> {
        let allowed = match self.config.mode {
            SessionMode::Streaming => {
                [TState::InputVinsDone, TState::OutputsPartial]
            }
            SessionMode::InMemory => [TState::InputsPermuted, TState::OutputsPartial],
        };
        self.require_state(&allowed)?;

        let i = self.destinations.len();
        let derivation = match self.output_derivation(i, &dst) {
            Ok(d) => d,
            Err(e) => return self.fail(e),
        };
        let amount_key = amount_key_for(&derivation, i as u64);
        let spend_pub = match dst.addr.spend_public_key().decompress() {
            Ok(p) => p,
            Err(_) => return self.fail(SignerError::CryptoContract),
        };
        let tx_out_key = derive_public_spend_key(&derivation, i as u64, &spend_pub);
        let vout = TxOut {
            amount: 0,
            target: CompressedPoint::from(tx_out_key),
        };

        if self.need_additional && dst.is_subaddress {
            let point = self.additional_tx_keys[i] * spend_pub;
            self.additional_tx_public_keys.push(point);
        } else if self.need_additional {
            self.additional_tx_public_keys.push(&self.additional_tx_keys[i] * ED25519_BASEPOINT_TABLE);
        }

        let keys = self.keys.as_ref().expect("keys derived at init_transaction");
        let hmac_vout = hmac_sign(&keys.hmac_key_txout(i as u64), &serialize_dst_vout(&dst, &vout));

        let is_last = self.destinations.len() + 1 == self.total_outputs;
        let last_mask = if is_last && self.input_count > 1 {
            Some(self.sumpouts_alphas - self.sumout)
        } else {
            None
        };
        let (commitment, mask, rsig) = prove_range(rng, dst.amount, last_mask);
        if self.config.self_test && ver_range(&commitment, &rsig).is_err() {
            return self.fail(SignerError::RangeProofSelfTestFailed);
        }

        let hmac_rsig = hmac_sign(&keys.hmac_key_txout_asig(i as u64), &rsig.canonical_bytes());

        let unmasked = UnmaskedAmount {
            mask,
            amount: Scalar::from(dst.amount),
        };
        let ecdh = ecdh_encode(unmasked, &amount_key);

        self.sumout += mask;
        self.output_amounts.push(dst.amount);
        self.output_masks.push(mask);
        self.output_commitments.push(commitment);
        self.vouts.push(vout.clone());
        self.range_sigs.push(rsig.clone());
        self.ecdh_info.push(ecdh.clone());
        self.destinations.push(dst);

        self.state = TState::OutputsPartial;
        Ok(SetOutputOutput {
            vout,
            hmac_vout,
            rsig,
            hmac_rsig,
            commitment,
            ecdh,
        })
    }

    /// §4.7: every declared output has been processed.
    pub fn all_out1_set(&mut self) -> Result<(), SignerError> {
        self.require_state(&[TState::OutputsPartial])?;
        if self.destinations.len() != self.total_outputs {
            return self.fail(SignerError::OutputCountMismatch(self.total_outputs, self.destinations.len()));
        }
        if self.input_count > 1 && self.sumout != self.sumpouts_alphas {
            return self.fail(SignerError::BalanceMismatch);
        }
        let total_out: u64 = self.output_amounts.iter().sum();
        if total_out > self.summary_inputs_money {
            return self.fail(SignerError::NegativeFee);
        }
        self.txn_fee = self.summary_inputs_money - total_out;

        self.extra.extend_from_slice(self.r_pub.compress().as_bytes());
        for key in &self.additional_tx_public_keys {
            self.extra.extend_from_slice(key.compress().as_bytes());
        }

        let prefix_hash = match self.config.mode {
            SessionMode::Streaming => {
                let hasher = self.prefix_hasher.as_mut().expect("prefix hasher started at inputs_done");
                hasher.set_vout_count(self.vouts.len());
                for vout in &self.vouts {
                    hasher.add_vout(vout);
                }
                hasher.add_extra(&self.extra);
                hasher.finalize()
            }
            SessionMode::InMemory => {
                let mut hasher = TxPrefixHasher::new(self.version as u64, self.unlock_time);
                hasher.set_vin_count(self.vins.len());
                for vin in &self.vins {
                    hasher.add_vin(vin);
                }
                hasher.set_vout_count(self.vouts.len());
                for vout in &self.vouts {
                    hasher.add_vout(vout);
                }
                hasher.add_extra(&self.extra);
                hasher.finalize()
            }
        };
        self.tx_prefix_hash = Some(prefix_hash);

        let rct_type = if self.is_full_rct() { RctType::Full } else { RctType::Simple };
        let mut full_hasher = PreMlsagHasher::new(prefix_hash, rct_type, self.txn_fee);
        full_hasher.set_pseudo_outs_count(if rct_type == RctType::Simple { self.input_count } else { 0 });
        if rct_type == RctType::Full {
            // No pseudo-outs phase for Full RCT (one input, no mlsag_pseudo_out
            // calls ever happen), so ecdhInfo/outPk go in right away.
            for (ecdh, commit) in self.ecdh_info.iter().zip(self.output_commitments.iter()) {
                full_hasher.add_ecdh(ecdh);
                full_hasher.add_out_pk(commit);
            }
        }
        self.full_message_hasher = Some(full_hasher);

        self.state = TState::OutputsDone;
        Ok(())
    }

    /// §4.8: re-authenticates and absorbs one Simple-RCT pseudo-out.
    pub fn mlsag_pseudo_out(
        &mut self,
        commitment: &Commitment,
        hmac: &[u8; 32],
    ) -> Result<(), SignerError> {
        self.require_state(&[TState::OutputsDone, TState::PseudoOutsPartial])?;
        let p = self.pseudo_outs_absorbed;
        if p >= self.input_count {
            return self.fail(SignerError::InputCountMismatch(self.input_count, p + 1));
        }
        let orig_index = self.source_permutation[p];
        let keys = self.keys.as_ref().expect("keys derived at init_transaction");
        let expected = keys.hmac_key_txin_comm(orig_index as u64);
        if hmac_verify(&expected, commitment.point().compress().as_bytes(), hmac).is_err() {
            return self.fail(SignerError::Authentication);
        }
        self.full_message_hasher.as_mut().expect("set at all_out1_set").add_pseudo_out(commitment);
        self.pseudo_outs_absorbed += 1;

        if self.pseudo_outs_absorbed == self.input_count {
            let hasher = self.full_message_hasher.as_mut().expect("set at all_out1_set");
            for (ecdh, commit) in self.ecdh_info.iter().zip(self.output_commitments.iter()) {
                hasher.add_ecdh(ecdh);
                hasher.add_out_pk(commit);
            }
        }
        self.state = TState::PseudoOutsPartial;
        Ok(())
    }

    /// §4.8: re-authenticates and absorbs one output's range proof.
    pub fn mlsag_rangeproof(&mut self, rsig: &RangeSig, hmac: &[u8; 32]) -> Result<(), SignerError> {
        let allowed = if self.is_full_rct() {
            [TState::OutputsDone, TState::RangeProofsPartial]
        } else {
            [TState::PseudoOutsPartial, TState::RangeProofsPartial]
        };
        self.require_state(&allowed)?;
        let o = self.range_sigs_absorbed;
        if o >= self.total_outputs {
            return self.fail(SignerError::OutputCountMismatch(self.total_outputs, o + 1));
        }
        let keys = self.keys.as_ref().expect("keys derived at init_transaction");
        let expected = keys.hmac_key_txout_asig(o as u64);
        if hmac_verify(&expected, &rsig.canonical_bytes(), hmac).is_err() {
            return self.fail(SignerError::Authentication);
        }
        self.full_message_hasher.as_mut().expect("set at all_out1_set").add_range_sig(rsig);
        self.range_sigs_absorbed += 1;

        if self.range_sigs_absorbed == self.total_outputs {
            let digest = self.full_message_hasher.as_ref().expect("set at all_out1_set").finalize();
            self.full_message = Some(digest);
            self.state = TState::FinalMessageDone;
        } else {
            self.state = TState::RangeProofsPartial;
        }
        Ok(())
    }

    /// §4.9: produces the MLSAG signature for input slot `p`.
    pub fn sign_input<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        p: usize,
        src: &SourceEntry,
        vin: &TxinToKey,
        hmac_vin: &[u8; 32],
        pseudo: Option<(&Commitment, &[u8; 32])>,
        alpha_enc: Option<&[u8]>,
        k_lrki: Option<MultisigKLRki>,
    ) -> Result<mlsag::MlsagSignature, SignerError> {
        self.require_state(&[TState::FinalMessageDone, TState::Signed])?;
        if k_lrki.is_some() {
            return self.fail(SignerError::MultisigUnsupported);
        }

        let orig_index = self.source_permutation[p];
        let keys = self.keys.as_ref().expect("keys derived at init_transaction");
        let expected_vin_hmac = keys.hmac_key_txin(orig_index as u64);
        if hmac_verify(&expected_vin_hmac, &serialize_src_vin(src, vin), hmac_vin).is_err() {
            return self.fail(SignerError::Authentication);
        }

        let secret_spend = self.input_secrets[p];

        let (ring, sig_result) = if self.is_full_rct() {
            let fee_h = Scalar::from(self.txn_fee) * h_generator();
            let out_sum = self
                .output_commitments
                .iter()
                .fold(EdwardsPoint::identity(), |acc, c| acc + *c.point());
            let balance_point = out_sum + fee_h;

            let mut ring = Vec::with_capacity(src.outputs.len());
            for member in &src.outputs {
                let dest = match member.dest.decompress() {
                    Ok(p) => p,
                    Err(_) => return self.fail(SignerError::CryptoContract),
                };
                let commit = match member.commitment.decompress() {
                    Ok(p) => p,
                    Err(_) => return self.fail(SignerError::CryptoContract),
                };
                ring.push([dest, commit - balance_point]);
            }
            let mask_secret = src.mask - self.sumout;
            let result = mlsag::sign(rng, &ring, &[secret_spend, mask_secret], src.real_output);
            (ring, result)
        } else {
            let (pseudo_commit, pseudo_hmac) = match pseudo {
                Some(v) => v,
                None => return self.fail(SignerError::Authentication),
            };
            let expected_comm_hmac = keys.hmac_key_txin_comm(orig_index as u64);
            if hmac_verify(&expected_comm_hmac, pseudo_commit.point().compress().as_bytes(), pseudo_hmac).is_err() {
                return self.fail(SignerError::Authentication);
            }
            let alpha_ct = match alpha_enc {
                Some(v) => v,
                None => return self.fail(SignerError::AeadFailure),
            };
            let enc_key = keys.enc_key_txin_alpha(orig_index as u64);
            let alpha = match decrypt_alpha(&enc_key, alpha_ct) {
                Ok(a) => a,
                Err(e) => return self.fail(e),
            };

            let mut ring = Vec::with_capacity(src.outputs.len());
            for member in &src.outputs {
                let dest = match member.dest.decompress() {
                    Ok(p) => p,
                    Err(_) => return self.fail(SignerError::CryptoContract),
                };
                let commit = match member.commitment.decompress() {
                    Ok(p) => p,
                    Err(_) => return self.fail(SignerError::CryptoContract),
                };
                ring.push([dest, commit - *pseudo_commit.point()]);
            }
            let mask_secret = src.mask - alpha;
            let result = mlsag::sign(rng, &ring, &[secret_spend, mask_secret], src.real_output);
            (ring, result)
        };

        let sig = match sig_result {
            Ok(s) => s,
            Err(e) => return self.fail(e.into()),
        };

        if self.config.self_test && mlsag::verify(&ring, &sig).is_err() {
            return self.fail(SignerError::MlsagSelfTestFailed);
        }

        self.sign_results.push(sig.clone());
        self.state = TState::Signed;
        tracing::trace!(slot = p, "sign_input complete");
        Ok(sig)
    }

    /// The transaction prefix hash, once `all_out1_set` has run.
    pub fn tx_prefix_hash(&self) -> Option<[u8; 32]> {
        self.tx_prefix_hash
    }

    /// The RingCT full message, once every range proof has been absorbed.
    pub fn full_message(&self) -> Option<[u8; 32]> {
        self.full_message
    }

    /// The transaction fee, once `all_out1_set` has run.
    pub fn txn_fee(&self) -> u64 {
        self.txn_fee
    }

    /// The transaction public key.
    pub fn tx_public_key(&self) -> EdwardsPoint {
        self.r_pub
    }

    /// The finished `tx_extra` field (payment id, tx public key(s)), once
    /// `all_out1_set` has run.
    pub fn extra(&self) -> &[u8] {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use xmrsign_util_test_helper::run_with_one_seed;

    use super::*;

    fn addr(account: &AccountKeys) -> PublicAddress {
        account.primary_address()
    }

    /// Builds a ring member the wallet actually owns at `(major, minor) =
    /// (0, 0)`, plus the fabricated "previous transaction"'s public key it
    /// was sent under. Real output index within that transaction is 0.
    fn own_ring_member<R: RngCore + CryptoRng>(
        account: &AccountKeys,
        amount: u64,
        mask: Scalar,
        global_index: u64,
        rng: &mut R,
    ) -> (SourceRingMember, CompressedPoint) {
        let r0 = Scalar::random(rng);
        let tx_pub = &r0 * ED25519_BASEPOINT_TABLE;
        let derivation = generate_key_derivation(account.view_private_key(), &tx_pub);
        let dest = derive_public_spend_key(&derivation, 0, &account.spend_public_key());
        let commitment = pedersen_commit(&mask, amount);
        (
            SourceRingMember {
                global_index,
                dest: CompressedPoint::from(dest),
                commitment: CompressedPoint::from(commitment),
            },
            CompressedPoint::from(tx_pub),
        )
    }

    fn decoy_ring_member<R: RngCore + CryptoRng>(global_index: u64, rng: &mut R) -> SourceRingMember {
        let dest = &Scalar::random(rng) * ED25519_BASEPOINT_TABLE;
        let commitment = pedersen_commit(&Scalar::random(rng), rng.next_u64());
        SourceRingMember {
            global_index,
            dest: CompressedPoint::from(dest),
            commitment: CompressedPoint::from(commitment),
        }
    }

    /// One input the wallet can really spend, hidden among `ring_size - 1`
    /// decoys at `real_output`.
    fn own_source_entry<R: RngCore + CryptoRng>(
        account: &AccountKeys,
        amount: u64,
        ring_size: usize,
        real_output: usize,
        rng: &mut R,
    ) -> SourceEntry {
        let mask = Scalar::random(rng);
        let mut outputs = Vec::with_capacity(ring_size);
        let mut real_out_tx_key = CompressedPoint::from([0u8; 32]);
        for i in 0..ring_size {
            if i == real_output {
                let (member, tx_key) = own_ring_member(account, amount, mask, i as u64 * 10, rng);
                real_out_tx_key = tx_key;
                outputs.push(member);
            } else {
                outputs.push(decoy_ring_member(i as u64 * 10, rng));
            }
        }
        SourceEntry {
            amount,
            outputs,
            real_output,
            real_out_tx_key,
            real_out_additional_tx_keys: Vec::new(),
            real_output_in_tx_index: 0,
            mask,
            rct: true,
        }
    }

    fn dest(addr: PublicAddress, amount: u64) -> Destination {
        Destination {
            amount,
            addr,
            is_subaddress: false,
        }
    }

    /// The Host's key-image sort: descending by the image's byte encoding.
    fn sort_perm_desc_by_key_image(vins: &[TxinToKey]) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..vins.len()).collect();
        perm.sort_by(|&a, &b| vins[b].k_image.as_bytes().cmp(vins[a].k_image.as_bytes()));
        perm
    }

    /// Reconstructs the 2-row ring `sign_input` would have built, so the
    /// returned signature can be checked against `mlsag::verify` from
    /// outside the session.
    fn rebuild_ring(
        src: &SourceEntry,
        second_row_offset: &EdwardsPoint,
    ) -> Vec<[EdwardsPoint; 2]> {
        src.outputs
            .iter()
            .map(|m| {
                let dest = m.dest.decompress().unwrap();
                let commit = m.commitment.decompress().unwrap();
                [dest, commit - *second_row_offset]
            })
            .collect()
    }

    #[test]
    fn full_rct_round_trip_signs_and_verifies() {
        run_with_one_seed(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let external = AccountKeys::random(&mut rng);

            let src = own_source_entry(&account, 30, 3, 1, &mut rng);

            let tsx_data = TsxData {
                version: 2,
                payment_id: Vec::new(),
                unlock_time: 0,
                outputs: alloc::vec![dest(addr(&external), 20), dest(addr(&account), 9)],
                change_dts: Some(dest(addr(&account), 9)),
                subaddr_account: 0,
                subaddr_indices: Vec::new(),
            };

            let config = SessionConfig::default();
            let mut session = SignerSession::new(account.clone(), config, 0);

            session.init_transaction(&tsx_data, &mut rng).unwrap();
            session.precompute_subaddr(0, &[]).unwrap();
            session.set_input_count(1).unwrap();

            let out = session.set_input(src.clone(), &mut rng).unwrap();
            assert!(out.pseudo_out.is_none());
            session.inputs_done().unwrap();
            session.inputs_permutation(&[0]).unwrap();
            session.input_vini(&src, &out.vin, &out.hmac_vin).unwrap();
            session.input_vini_done().unwrap();

            let mut out_info = Vec::new();
            for d in tsx_data.outputs.clone() {
                out_info.push(session.set_output(d, &mut rng).unwrap());
            }
            session.all_out1_set().unwrap();
            assert_eq!(session.txn_fee(), 1);

            for o in &out_info {
                session.mlsag_rangeproof(&o.rsig, &o.hmac_rsig).unwrap();
            }
            assert!(session.full_message().is_some());

            let sig = session
                .sign_input(&mut rng, 0, &src, &out.vin, &out.hmac_vin, None, None, None)
                .unwrap();

            let fee_h = Scalar::from(session.txn_fee()) * h_generator();
            let out_sum = session
                .output_commitments
                .iter()
                .fold(EdwardsPoint::identity(), |acc, c| acc + *c.point());
            let ring = rebuild_ring(&src, &(out_sum + fee_h));
            assert!(mlsag::verify(&ring, &sig).is_ok());
        });
    }

    #[test]
    fn simple_rct_round_trip_with_swapped_permutation() {
        run_with_one_seed(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let external = AccountKeys::random(&mut rng);

            let src0 = own_source_entry(&account, 10, 3, 0, &mut rng);
            let src1 = own_source_entry(&account, 20, 3, 2, &mut rng);
            let sources = [src0, src1];

            let tsx_data = TsxData {
                version: 2,
                payment_id: Vec::new(),
                unlock_time: 0,
                outputs: alloc::vec![dest(addr(&external), 15), dest(addr(&account), 13)],
                change_dts: Some(dest(addr(&account), 13)),
                subaddr_account: 0,
                subaddr_indices: Vec::new(),
            };

            let config = SessionConfig::default();
            let mut session = SignerSession::new(account.clone(), config, 7);

            session.init_transaction(&tsx_data, &mut rng).unwrap();
            session.precompute_subaddr(0, &[]).unwrap();
            session.set_input_count(2).unwrap();

            let mut ingested = Vec::new();
            for src in &sources {
                let out = session.set_input(src.clone(), &mut rng).unwrap();
                assert!(out.pseudo_out.is_some());
                assert!(out.alpha_enc.is_some());
                ingested.push(out);
            }
            session.inputs_done().unwrap();

            let vins: Vec<TxinToKey> = ingested.iter().map(|o| o.vin.clone()).collect();
            let perm = sort_perm_desc_by_key_image(&vins);
            session.inputs_permutation(&perm).unwrap();

            for &orig in &perm {
                session
                    .input_vini(&sources[orig], &ingested[orig].vin, &ingested[orig].hmac_vin)
                    .unwrap();
            }
            session.input_vini_done().unwrap();

            let mut out_info = Vec::new();
            for d in tsx_data.outputs.clone() {
                out_info.push(session.set_output(d, &mut rng).unwrap());
            }
            session.all_out1_set().unwrap();
            assert_eq!(session.txn_fee(), 2);

            for &orig in &perm {
                let (commit, hmac) = ingested[orig].pseudo_out.as_ref().unwrap();
                session.mlsag_pseudo_out(commit, hmac).unwrap();
            }
            for o in &out_info {
                session.mlsag_rangeproof(&o.rsig, &o.hmac_rsig).unwrap();
            }

            for (p, &orig) in perm.iter().enumerate() {
                let (commit, comm_hmac) = ingested[orig].pseudo_out.as_ref().unwrap();
                let alpha_enc = ingested[orig].alpha_enc.as_ref().unwrap();
                let sig = session
                    .sign_input(
                        &mut rng,
                        p,
                        &sources[orig],
                        &ingested[orig].vin,
                        &ingested[orig].hmac_vin,
                        Some((commit, comm_hmac)),
                        Some(alpha_enc.as_slice()),
                        None,
                    )
                    .unwrap();
                let ring = rebuild_ring(&sources[orig], commit.point());
                assert!(mlsag::verify(&ring, &sig).is_ok());
            }

            let sum_pseudo = ingested
                .iter()
                .map(|o| o.pseudo_out.as_ref().unwrap().0)
                .fold(Commitment::identity(), |acc, c| acc + c);
            let fee_h = Commitment(Scalar::from(session.txn_fee()) * h_generator());
            let out_sum = session
                .output_commitments
                .iter()
                .fold(Commitment::identity(), |acc, c| acc + *c);
            assert_eq!(sum_pseudo.point(), (out_sum + fee_h).point());
        });
    }

    #[test]
    fn swapped_hmac_between_slots_is_rejected() {
        run_with_one_seed(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let external = AccountKeys::random(&mut rng);

            let src0 = own_source_entry(&account, 10, 2, 0, &mut rng);
            let src1 = own_source_entry(&account, 20, 2, 1, &mut rng);
            let sources = [src0, src1];

            let tsx_data = TsxData {
                version: 2,
                payment_id: Vec::new(),
                unlock_time: 0,
                outputs: alloc::vec![dest(addr(&external), 28)],
                change_dts: None,
                subaddr_account: 0,
                subaddr_indices: Vec::new(),
            };

            let config = SessionConfig::default();
            let mut session = SignerSession::new(account.clone(), config, 0);
            session.init_transaction(&tsx_data, &mut rng).unwrap();
            session.precompute_subaddr(0, &[]).unwrap();
            session.set_input_count(2).unwrap();

            let mut ingested = Vec::new();
            for src in &sources {
                ingested.push(session.set_input(src.clone(), &mut rng).unwrap());
            }
            session.inputs_done().unwrap();
            session.inputs_permutation(&[0, 1]).unwrap();

            // Slot 0 replays slot 1's vin but with slot 0's hmac: rejected.
            let result = session.input_vini(&sources[1], &ingested[1].vin, &ingested[0].hmac_vin);
            assert!(result.is_err());
            assert!(session.is_poisoned());
        });
    }

    #[test]
    fn illegal_state_call_is_rejected() {
        run_with_one_seed(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let config = SessionConfig::default();
            let mut session = SignerSession::new(account, config, 0);
            assert!(session.set_input_count(1).is_err());
            assert!(session.is_poisoned());

            let src = own_source_entry(&AccountKeys::random(&mut rng), 1, 2, 0, &mut rng);
            assert!(session.set_input(src, &mut rng).is_err());
        });
    }

    #[test]
    fn output_offsets_round_trip() {
        let xs = alloc::vec![5u64, 9, 9, 20, 21];
        let relative = relative_output_offsets(&xs);
        assert_eq!(absolute_output_offsets(&relative), xs);
    }
}
