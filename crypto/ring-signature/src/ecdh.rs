// Copyright (c) 2018-2022 The Botho Foundation

use curve25519_dalek::Scalar;
use xmrsign_crypto_keys::hash::hash_to_scalar;

/// The plaintext `(mask, amount)` pair a recipient needs to open an output's
/// commitment, before ECDH masking.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UnmaskedAmount {
    /// The commitment's blinding factor.
    pub mask: Scalar,
    /// The output amount, as a scalar.
    pub amount: Scalar,
}

/// The masked `(mask, amount)` pair as carried in a transaction's
/// `ecdhInfo`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EcdhTuple {
    /// `mask + Hs(amount_key)`.
    pub mask: Scalar,
    /// `amount + Hs(Hs(amount_key))`.
    pub amount: Scalar,
}

/// Masks `(mask, amount)` using the per-output shared secret `amount_key`
/// (`Hs(derivation || varint(i))`, already computed by the caller).
///
/// `sharedSec1 = Hs(amount_key)`, `sharedSec2 = Hs(encode(sharedSec1))`;
/// both are added to the plaintext mask/amount.
pub fn ecdh_encode(unmasked: UnmaskedAmount, amount_key: &Scalar) -> EcdhTuple {
    let shared_sec_1 = hash_to_scalar(amount_key.as_bytes());
    let shared_sec_2 = hash_to_scalar(shared_sec_1.as_bytes());
    EcdhTuple {
        mask: unmasked.mask + shared_sec_1,
        amount: unmasked.amount + shared_sec_2,
    }
}

/// Inverse of [`ecdh_encode`].
pub fn ecdh_decode(masked: EcdhTuple, amount_key: &Scalar) -> UnmaskedAmount {
    let shared_sec_1 = hash_to_scalar(amount_key.as_bytes());
    let shared_sec_2 = hash_to_scalar(shared_sec_1.as_bytes());
    UnmaskedAmount {
        mask: masked.mask - shared_sec_1,
        amount: masked.amount - shared_sec_2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmrsign_util_test_helper::run_with_several_seeds;

    #[test]
    fn round_trips() {
        run_with_several_seeds(|mut rng| {
            let amount_key = Scalar::random(&mut rng);
            let unmasked = UnmaskedAmount {
                mask: Scalar::random(&mut rng),
                amount: Scalar::random(&mut rng),
            };
            let masked = ecdh_encode(unmasked, &amount_key);
            let recovered = ecdh_decode(masked, &amount_key);
            assert_eq!(recovered, unmasked);
        });
    }
}
