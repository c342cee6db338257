// Copyright (c) 2018-2022 The Botho Foundation

//! The Host's orchestration of a signing session (§4.10): feeds a signer
//! through `init_transaction` .. `sign_input`, sorting inputs by key image
//! and replaying authenticated material back across phase boundaries, then
//! assembles the finished RingCT signature from what the Signer hands back.

use alloc::vec::Vec;

use rand_core::{CryptoRng, RngCore};
use xmrsign_ring_signature::Commitment;
use xmrsign_transaction_core::{
    RctSigBase, RctSigPrunable, RctType, SourceEntry, TsxData, TxOut, TxinToKey,
};
use xmrsign_transaction_signer::{FinishedRct, SignerSession};

use crate::error::BuilderError;

/// A transaction awaiting signing: the request plus its candidate inputs.
pub struct UnsignedTx {
    pub tsx_data: TsxData,
    pub sources: Vec<SourceEntry>,
}

/// The finished, ready-to-serialize transaction.
pub struct FinishedTransaction {
    pub version: u32,
    pub unlock_time: u64,
    pub vin: Vec<TxinToKey>,
    pub vout: Vec<TxOut>,
    pub extra: Vec<u8>,
    pub rct: FinishedRct,
}

/// Transaction-scoped bookkeeping the Host accumulates while driving one
/// session through `transfer_unsigned`: the in-progress `vin`/`vout`
/// arrays, their HMACs, and the key-image permutation, mirroring the
/// reference agent's `TData`.
struct TData {
    vin: Vec<TxinToKey>,
    vout: Vec<TxOut>,
    tx_in_hmacs: Vec<[u8; 32]>,
    source_permutation: Vec<usize>,
}

impl TData {
    fn new() -> Self {
        Self {
            vin: Vec::new(),
            vout: Vec::new(),
            tx_in_hmacs: Vec::new(),
            source_permutation: Vec::new(),
        }
    }
}

/// Sorts input slots by key image, lexicographically descending (matches
/// the reference: sort key = negative k_image).
fn sort_permutation(vins: &[TxinToKey]) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..vins.len()).collect();
    perm.sort_by(|&a, &b| vins[b].k_image.as_bytes().cmp(vins[a].k_image.as_bytes()));
    perm
}

fn apply_permutation<T: Clone>(perm: &[usize], items: &[T]) -> Vec<T> {
    perm.iter().map(|&i| items[i].clone()).collect()
}

/// Glue agent, running on the Host, driving a [`SignerSession`] through one
/// transaction.
pub struct Agent<'a> {
    session: &'a mut SignerSession,
}

impl<'a> Agent<'a> {
    pub fn new(session: &'a mut SignerSession) -> Self {
        Self { session }
    }

    /// Drives `session` through every phase for one unsigned transaction
    /// and returns the assembled, ready-to-serialize result.
    pub fn transfer_unsigned<R: RngCore + CryptoRng>(
        &mut self,
        unsig: UnsignedTx,
        rng: &mut R,
    ) -> Result<FinishedTransaction, BuilderError> {
        let UnsignedTx {
            tsx_data,
            mut sources,
        } = unsig;
        if tsx_data.outputs.is_empty() {
            return Err(BuilderError::NoDestinations);
        }
        if sources.is_empty() {
            return Err(BuilderError::NoSources);
        }

        let mut ct = TData::new();

        self.session.init_transaction(&tsx_data, rng)?;
        tracing::debug!("init_transaction sent to signer");

        self.session
            .precompute_subaddr(tsx_data.subaddr_account, &tsx_data.subaddr_indices)?;

        self.session.set_input_count(sources.len())?;

        let mut pseudo_outs: Vec<Option<(Commitment, [u8; 32])>> = Vec::with_capacity(sources.len());
        let mut alpha_encs: Vec<Option<Vec<u8>>> = Vec::with_capacity(sources.len());
        for src in &sources {
            let out = self.session.set_input(src.clone(), rng)?;
            ct.vin.push(out.vin);
            ct.tx_in_hmacs.push(out.hmac_vin);
            pseudo_outs.push(out.pseudo_out);
            alpha_encs.push(out.alpha_enc);
        }
        self.session.inputs_done()?;

        let perm = sort_permutation(&ct.vin);
        sources = apply_permutation(&perm, &sources);
        ct.vin = apply_permutation(&perm, &ct.vin);
        ct.tx_in_hmacs = apply_permutation(&perm, &ct.tx_in_hmacs);
        pseudo_outs = apply_permutation(&perm, &pseudo_outs);
        alpha_encs = apply_permutation(&perm, &alpha_encs);
        ct.source_permutation = perm;

        self.session.inputs_permutation(&ct.source_permutation)?;

        for i in 0..ct.vin.len() {
            self.session
                .input_vini(&sources[i], &ct.vin[i], &ct.tx_in_hmacs[i])?;
        }
        self.session.input_vini_done()?;

        let mut out_pk = Vec::with_capacity(tsx_data.outputs.len());
        let mut ecdh_info = Vec::with_capacity(tsx_data.outputs.len());
        let mut range_sigs = Vec::with_capacity(tsx_data.outputs.len());
        let mut range_sig_hmacs = Vec::with_capacity(tsx_data.outputs.len());
        for dst in tsx_data.outputs.clone() {
            let out = self.session.set_output(dst, rng)?;
            ct.vout.push(out.vout);
            out_pk.push(out.commitment);
            ecdh_info.push(out.ecdh);
            range_sig_hmacs.push(out.hmac_rsig);
            range_sigs.push(out.rsig);
        }
        self.session.all_out1_set()?;
        tracing::debug!(fee = self.session.txn_fee(), "all outputs set");

        let pseudo_out_commitments: Vec<Commitment> =
            pseudo_outs.iter().flatten().map(|(c, _)| *c).collect();
        for (commit, hmac) in pseudo_outs.iter().flatten() {
            self.session.mlsag_pseudo_out(commit, hmac)?;
        }
        for (rsig, hmac) in range_sigs.iter().zip(range_sig_hmacs.iter()) {
            self.session.mlsag_rangeproof(rsig, hmac)?;
        }

        let mut mlsag_sigs = Vec::with_capacity(ct.vin.len());
        for p in 0..ct.vin.len() {
            let pseudo = pseudo_outs[p].as_ref().map(|(c, h)| (c, h));
            let alpha_enc = alpha_encs[p].as_deref();
            let sig = self.session.sign_input(
                rng,
                p,
                &sources[p],
                &ct.vin[p],
                &ct.tx_in_hmacs[p],
                pseudo,
                alpha_enc,
                None,
            )?;
            mlsag_sigs.push(sig);
        }
        tracing::debug!(inputs = mlsag_sigs.len(), "transaction signed");

        let rct_type = if ct.vin.len() == 1 {
            RctType::Full
        } else {
            RctType::Simple
        };

        let extra = self.session.extra().to_vec();

        Ok(FinishedTransaction {
            version: tsx_data.version,
            unlock_time: tsx_data.unlock_time,
            vin: ct.vin,
            vout: ct.vout,
            extra,
            rct: FinishedRct {
                base: RctSigBase {
                    rct_type,
                    txn_fee: self.session.txn_fee(),
                    ecdh_info,
                    out_pk,
                },
                prunable: RctSigPrunable {
                    range_sigs,
                    mlsag_sigs,
                    pseudo_outs: pseudo_out_commitments,
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use curve25519_dalek::{constants::ED25519_BASEPOINT_TABLE, EdwardsPoint, Scalar};
    use xmrsign_account_keys::{derive_public_spend_key, generate_key_derivation, AccountKeys, PublicAddress};
    use xmrsign_crypto_keys::{generators::h_generator, CompressedPoint};
    use xmrsign_ring_signature::{mlsag, pedersen_commit};
    use xmrsign_transaction_core::{Destination, SourceRingMember, TsxData};
    use xmrsign_transaction_signer::{SessionConfig, SignerSession};
    use xmrsign_util_test_helper::run_with_one_seed;

    use super::*;

    fn addr(account: &AccountKeys) -> PublicAddress {
        account.primary_address()
    }

    fn dest(addr: PublicAddress, amount: u64) -> Destination {
        Destination {
            amount,
            addr,
            is_subaddress: false,
        }
    }

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
                let r0 = Scalar::random(rng);
                let tx_pub = &r0 * ED25519_BASEPOINT_TABLE;
                let derivation = generate_key_derivation(account.view_private_key(), &tx_pub);
                let dest = derive_public_spend_key(&derivation, 0, &account.spend_public_key());
                let commitment = pedersen_commit(&mask, amount);
                real_out_tx_key = CompressedPoint::from(tx_pub);
                outputs.push(SourceRingMember {
                    global_index: i as u64 * 10,
                    dest: CompressedPoint::from(dest),
                    commitment: CompressedPoint::from(commitment),
                });
            } else {
                let dest = &Scalar::random(rng) * ED25519_BASEPOINT_TABLE;
                let commitment = pedersen_commit(&Scalar::random(rng), rng.next_u64());
                outputs.push(SourceRingMember {
                    global_index: i as u64 * 10,
                    dest: CompressedPoint::from(dest),
                    commitment: CompressedPoint::from(commitment),
                });
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

    #[test]
    fn full_rct_transfer_unsigned_assembles_a_verifiable_transaction() {
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

            let mut session = SignerSession::new(account, SessionConfig::default(), 0);
            let mut agent = Agent::new(&mut session);
            let unsig = UnsignedTx {
                tsx_data,
                sources: alloc::vec![src.clone()],
            };
            let finished = agent.transfer_unsigned(unsig, &mut rng).unwrap();

            assert_eq!(finished.vin.len(), 1);
            assert_eq!(finished.vout.len(), 2);
            assert_eq!(finished.rct.base.txn_fee, 1);
            assert_eq!(finished.rct.base.rct_type, RctType::Full);
            assert!(finished.rct.prunable.pseudo_outs.is_empty());

            let balance_point = finished
                .rct
                .base
                .out_pk
                .iter()
                .fold(Commitment::identity(), |acc, c| acc + *c)
                + Commitment(Scalar::from(finished.rct.base.txn_fee) * h_generator());
            let ring: alloc::vec::Vec<[EdwardsPoint; 2]> = src
                .outputs
                .iter()
                .map(|m| {
                    let dest = m.dest.decompress().unwrap();
                    let commit = m.commitment.decompress().unwrap();
                    [dest, commit - *balance_point.point()]
                })
                .collect();
            assert!(mlsag::verify(&ring, &finished.rct.prunable.mlsag_sigs[0]).is_ok());
        });
    }

    #[test]
    fn simple_rct_transfer_unsigned_balances_pseudo_and_output_commitments() {
        run_with_one_seed(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let external = AccountKeys::random(&mut rng);
            let src0 = own_source_entry(&account, 10, 3, 0, &mut rng);
            let src1 = own_source_entry(&account, 20, 3, 2, &mut rng);

            let tsx_data = TsxData {
                version: 2,
                payment_id: Vec::new(),
                unlock_time: 0,
                outputs: alloc::vec![dest(addr(&external), 15), dest(addr(&account), 13)],
                change_dts: Some(dest(addr(&account), 13)),
                subaddr_account: 0,
                subaddr_indices: Vec::new(),
            };

            let mut session = SignerSession::new(account, SessionConfig::default(), 3);
            let mut agent = Agent::new(&mut session);
            let unsig = UnsignedTx {
                tsx_data,
                sources: alloc::vec![src0, src1],
            };
            let finished = agent.transfer_unsigned(unsig, &mut rng).unwrap();

            assert_eq!(finished.vin.len(), 2);
            assert_eq!(finished.rct.base.txn_fee, 2);
            assert_eq!(finished.rct.base.rct_type, RctType::Simple);
            assert_eq!(finished.rct.prunable.pseudo_outs.len(), 2);
            assert_eq!(finished.rct.prunable.mlsag_sigs.len(), 2);

            let sum_pseudo = finished
                .rct
                .prunable
                .pseudo_outs
                .iter()
                .fold(Commitment::identity(), |acc, c| acc + *c);
            let sum_out = finished
                .rct
                .base
                .out_pk
                .iter()
                .fold(Commitment::identity(), |acc, c| acc + *c);
            let fee_h = Commitment(Scalar::from(finished.rct.base.txn_fee) * h_generator());
            assert_eq!(sum_pseudo.point(), (sum_out + fee_h).point());
        });
    }
}
