// Copyright (c) 2018-2022 The Botho Foundation

//! The per-session key schedule (§4.2): a root `key_master` derived from the
//! request and the session's ephemeral secret, from which per-purpose HMAC
//! and AEAD keys fan out, each bound to an index so a resubmitted vin/vout
//! can never be replayed against the wrong slot.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use curve25519_dalek::Scalar;
use hmac::{Hmac, Mac};
use sha3::Keccak256;
use xmrsign_crypto_keys::{hash::keccak256, varint::write_varint};

use crate::error::SignerError;

type HmacKeccak = Hmac<Keccak256>;

fn keccak_twice(parts: &[&[u8]]) -> [u8; 32] {
    let mut buf = alloc::vec::Vec::new();
    for part in parts {
        buf.extend_from_slice(part);
    }
    keccak256(&keccak256(&buf))
}

/// `key_master`, `key_hmac`, `key_enc`, and the per-index derivations built
/// from them.
#[derive(Clone)]
pub struct KeySchedule {
    key_hmac: [u8; 32],
    key_enc: [u8; 32],
}

impl KeySchedule {
    /// `key_master = Keccak(serialize(TsxData) || r || varint(tsx_ctr))`,
    /// then `key_hmac`/`key_enc` fan out from it.
    pub fn derive(tsx_data_bytes: &[u8], r: &Scalar, tsx_ctr: u64) -> Self {
        let mut ctr_buf = alloc::vec::Vec::with_capacity(10);
        write_varint(tsx_ctr, &mut ctr_buf);
        let key_master = keccak256(
            &[tsx_data_bytes, r.as_bytes().as_slice(), ctr_buf.as_slice()].concat(),
        );
        let key_hmac = keccak_twice(&[b"hmac", &key_master]);
        let key_enc = keccak_twice(&[b"enc", &key_master]);
        Self { key_hmac, key_enc }
    }

    fn indexed(base: &[u8; 32], domain: &[u8], i: u64) -> [u8; 32] {
        let mut idx_buf = alloc::vec::Vec::with_capacity(10);
        write_varint(i, &mut idx_buf);
        keccak_twice(&[base, domain, &idx_buf])
    }

    /// `hmac_key_txin(i)`, indexed by the pre-permutation ingestion order.
    pub fn hmac_key_txin(&self, i: u64) -> [u8; 32] {
        Self::indexed(&self.key_hmac, b"txin", i)
    }

    /// `hmac_key_txin_comm(i)`, indexed by the pre-permutation ingestion
    /// order.
    pub fn hmac_key_txin_comm(&self, i: u64) -> [u8; 32] {
        Self::indexed(&self.key_hmac, b"txin-comm", i)
    }

    /// `hmac_key_txout(i)`, indexed by final output position.
    pub fn hmac_key_txout(&self, i: u64) -> [u8; 32] {
        Self::indexed(&self.key_hmac, b"txout", i)
    }

    /// `hmac_key_txout_asig(i)`, indexed by final output position.
    pub fn hmac_key_txout_asig(&self, i: u64) -> [u8; 32] {
        Self::indexed(&self.key_hmac, b"txout-asig", i)
    }

    /// `enc_key_txin_alpha(i)`, indexed by the pre-permutation ingestion
    /// order.
    pub fn enc_key_txin_alpha(&self, i: u64) -> [u8; 32] {
        Self::indexed(&self.key_enc, b"txin-alpha", i)
    }
}

/// `HMAC(key, message)`.
pub fn hmac_sign(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    let mut mac = HmacKeccak::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Constant-time HMAC verification.
pub fn hmac_verify(key: &[u8; 32], message: &[u8], tag: &[u8; 32]) -> Result<(), SignerError> {
    let mut mac = HmacKeccak::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(message);
    mac.verify_slice(tag).map_err(|_| SignerError::Authentication)
}

/// Encrypts a 32-byte scalar under a single-use key; the nonce is fixed at
/// zero because `enc_key_txin_alpha(i)` is never reused across sessions or
/// indices.
pub fn encrypt_alpha(key: &[u8; 32], alpha: &Scalar) -> alloc::vec::Vec<u8> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&[0u8; 12]);
    cipher
        .encrypt(nonce, alpha.as_bytes().as_slice())
        .expect("encrypting a fixed 32-byte plaintext cannot fail")
}

/// Inverse of [`encrypt_alpha`].
pub fn decrypt_alpha(key: &[u8; 32], ciphertext: &[u8]) -> Result<Scalar, SignerError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&[0u8; 12]);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| SignerError::AeadFailure)?;
    let bytes: [u8; 32] = plaintext.try_into().map_err(|_| SignerError::AeadFailure)?;
    Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes)).ok_or(SignerError::AeadFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmrsign_util_test_helper::run_with_several_seeds;

    #[test]
    fn alpha_round_trips_through_aead() {
        run_with_several_seeds(|mut rng| {
            use rand_core::RngCore;
            let mut key = [0u8; 32];
            rng.fill_bytes(&mut key);
            let alpha = Scalar::random(&mut rng);
            let ct = encrypt_alpha(&key, &alpha);
            let decrypted = decrypt_alpha(&key, &ct).unwrap();
            assert_eq!(alpha, decrypted);
        });
    }

    #[test]
    fn hmac_rejects_tampered_message() {
        let key = [7u8; 32];
        let tag = hmac_sign(&key, b"hello");
        assert!(hmac_verify(&key, b"hello", &tag).is_ok());
        assert!(hmac_verify(&key, b"hellp", &tag).is_err());
    }

    #[test]
    fn per_index_keys_differ() {
        let schedule = KeySchedule::derive(b"tsx", &Scalar::from(1u64), 0);
        assert_ne!(schedule.hmac_key_txin(0), schedule.hmac_key_txin(1));
        assert_ne!(schedule.hmac_key_txin(0), schedule.hmac_key_txin_comm(0));
    }
}
