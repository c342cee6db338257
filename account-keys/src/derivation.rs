// Copyright (c) 2018-2022 The Botho Foundation

//! One-time key derivation and key-image recovery.
//!
//! These mirror Monero's `generate_key_derivation` / `derive_public_key` /
//! `derive_secret_key` / key-image triad: a transaction's ephemeral public
//! key `R` combined with a recipient's view key yields a per-output shared
//! secret, which both sides use to compute the one-time output key, and
//! which the owner alone can turn into the spending secret and key image.

use curve25519_dalek::{constants::ED25519_BASEPOINT_TABLE, EdwardsPoint, Scalar};
use xmrsign_crypto_keys::hash::{hash_to_point, hash_to_scalar_parts};

/// `rv = 8 * (priv * pub)`: the shared-derivation point for an output,
/// computed from either side (`a * R` or `r * A`) of the Diffie-Hellman
/// exchange. Clearing the cofactor matches the reference implementation and
/// keeps the derivation in the prime-order subgroup regardless of any
/// small-subgroup component in a maliciously chosen peer key.
pub fn generate_key_derivation(private_scalar: &Scalar, public_point: &EdwardsPoint) -> EdwardsPoint {
    (private_scalar * public_point).mul_by_cofactor()
}

/// `Hs(derivation || varint(output_index))`.
pub fn derivation_to_scalar(derivation: &EdwardsPoint, output_index: u64) -> Scalar {
    let mut idx = xmrsign_crypto_keys::varint::encode_varint(output_index);
    let compressed = derivation.compress();
    hash_to_scalar_parts(&[compressed.as_bytes(), idx.as_mut_slice()])
}

/// `P = Hs(derivation||idx)*G + B`: the one-time output key a sender writes
/// to the chain for a recipient's spend public key `B`.
pub fn derive_public_spend_key(
    derivation: &EdwardsPoint,
    output_index: u64,
    spend_public: &EdwardsPoint,
) -> EdwardsPoint {
    derivation_to_scalar(derivation, output_index) * ED25519_BASEPOINT_TABLE + spend_public
}

/// `x = Hs(derivation||idx) + b`: the one-time spending secret the owner of
/// `b` can compute for output `output_index`.
pub fn derive_secret_spend_key(derivation: &EdwardsPoint, output_index: u64, spend_private: &Scalar) -> Scalar {
    derivation_to_scalar(derivation, output_index) + spend_private
}

/// Alias used by the signer's input-ingestion step, which already holds the
/// resolved per-subaddress spend secret and just needs the scalar to recover
/// `x_i`.
pub fn recover_onetime_private_key(derivation: &EdwardsPoint, output_index: u64, spend_private: &Scalar) -> Scalar {
    derive_secret_spend_key(derivation, output_index, spend_private)
}

/// `I = x * Hp(P)`: the linkable key image of a one-time output key `P`
/// whose spending secret is `x`.
pub fn compute_key_image(onetime_private_key: &Scalar, onetime_public_key: &EdwardsPoint) -> EdwardsPoint {
    let hp = hash_to_point(onetime_public_key.compress().as_bytes());
    onetime_private_key * hp
}

/// Convenience wrapper combining derivation + one-time public key, used by
/// the subaddress-matching scan loop (not exercised by the signer itself,
/// which always knows which output it owns).
pub fn derive_subaddress_public_key(
    tx_public_key: &EdwardsPoint,
    view_private: &Scalar,
    output_index: u64,
    spend_public: &EdwardsPoint,
) -> EdwardsPoint {
    let derivation = generate_key_derivation(view_private, tx_public_key);
    derive_public_spend_key(&derivation, output_index, spend_public)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use xmrsign_crypto_keys::CompressedPoint;
    use xmrsign_util_test_helper::run_with_several_seeds;

    #[test]
    fn derive_public_spend_key_matches_known_vector() {
        let derivation =
            CompressedPoint::from(hex!("259ef2aba8feb473cf39058a0fe30b9ff6d245b42b6826687ebd6b63128aff64"))
                .decompress()
                .unwrap();
        let spend_public =
            CompressedPoint::from(hex!("f4efc29da4ccd6bc6e81f52a6f47b2952966442a7efb49901cce06a7a3bef3e5"))
                .decompress()
                .unwrap();
        let expected = hex!("5a10cca900ee47a7f412cd661b29f5ab356d6a1951884593bb170b5ec8b6f2e8");

        let out = derive_public_spend_key(&derivation, 5, &spend_public);
        assert_eq!(out.compress().to_bytes(), expected);
    }

    #[test]
    fn sender_and_receiver_derivations_match() {
        run_with_several_seeds(|mut rng| {
            let r = Scalar::random(&mut rng);
            let a = Scalar::random(&mut rng);
            let big_a = &a * ED25519_BASEPOINT_TABLE;
            let big_r = &r * ED25519_BASEPOINT_TABLE;

            let sender_side = generate_key_derivation(&r, &big_a);
            let receiver_side = generate_key_derivation(&a, &big_r);
            assert_eq!(sender_side.compress(), receiver_side.compress());
        });
    }

    #[test]
    fn one_time_key_and_secret_are_consistent() {
        run_with_several_seeds(|mut rng| {
            let b = Scalar::random(&mut rng);
            let big_b = &b * ED25519_BASEPOINT_TABLE;
            let derivation_point = {
                let x = Scalar::random(&mut rng);
                &x * ED25519_BASEPOINT_TABLE
            };

            let p = derive_public_spend_key(&derivation_point, 4, &big_b);
            let x = derive_secret_spend_key(&derivation_point, 4, &b);
            assert_eq!((&x * ED25519_BASEPOINT_TABLE).compress(), p.compress());
        });
    }

    #[test]
    fn key_image_is_deterministic_in_the_secret() {
        run_with_several_seeds(|mut rng| {
            let x = Scalar::random(&mut rng);
            let p = &x * ED25519_BASEPOINT_TABLE;
            let i1 = compute_key_image(&x, &p);
            let i2 = compute_key_image(&x, &p);
            assert_eq!(i1.compress(), i2.compress());
        });
    }
}
