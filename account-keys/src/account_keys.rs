// Copyright (c) 2018-2022 The Botho Foundation

use core::fmt;

use curve25519_dalek::{constants::ED25519_BASEPOINT_TABLE, Scalar};
use rand_core::{CryptoRng, RngCore};
use xmrsign_crypto_keys::{hash::hash_to_scalar_parts, CompressedPoint, EdwardsPoint};
use zeroize::Zeroize;

/// A Monero subaddress index: `(account/major, index/minor)`. `(0, 0)` is
/// the primary address and uses the account keys directly, without
/// derivation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubaddressIndex {
    /// The account ("major") index.
    pub major: u32,
    /// The subaddress ("minor") index within the account.
    pub minor: u32,
}

impl SubaddressIndex {
    /// The primary address index, `(0, 0)`.
    pub const PRIMARY: SubaddressIndex = SubaddressIndex { major: 0, minor: 0 };

    /// True for the primary address.
    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }
}

/// A public Monero address: a view/spend public-key pair, one-time or
/// subaddress-derived.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PublicAddress {
    view_public: CompressedPoint,
    spend_public: CompressedPoint,
}

impl PublicAddress {
    /// Builds an address from its two public keys.
    pub fn new(spend_public: CompressedPoint, view_public: CompressedPoint) -> Self {
        Self {
            view_public,
            spend_public,
        }
    }

    /// The public view key `A` (or `C_i` for a subaddress).
    pub fn view_public_key(&self) -> &CompressedPoint {
        &self.view_public
    }

    /// The public spend key `B` (or `D_i` for a subaddress).
    pub fn spend_public_key(&self) -> &CompressedPoint {
        &self.spend_public
    }
}

impl fmt::Debug for PublicAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicAddress {{ spend: {}, view: {} }}",
            self.spend_public, self.view_public
        )
    }
}

/// A Monero account's private (view, spend) key pair.
///
/// Zeroized on drop; never serialized.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AccountKeys {
    view_private: Scalar,
    spend_private: Scalar,
}

const SUBADDR_DOMAIN: &[u8] = b"SubAddr\0";

impl AccountKeys {
    /// Builds an `AccountKeys` from the private view and spend keys.
    pub fn new(spend_private: Scalar, view_private: Scalar) -> Self {
        Self {
            spend_private,
            view_private,
        }
    }

    /// Generates a random account (for tests).
    pub fn random<T: RngCore + CryptoRng>(rng: &mut T) -> Self {
        Self::new(Scalar::random(rng), Scalar::random(rng))
    }

    /// The private view key `a`.
    pub fn view_private_key(&self) -> &Scalar {
        &self.view_private
    }

    /// The private spend key `b`.
    pub fn spend_private_key(&self) -> &Scalar {
        &self.spend_private
    }

    /// The public spend key `B = b*G`.
    pub fn spend_public_key(&self) -> EdwardsPoint {
        &self.spend_private * ED25519_BASEPOINT_TABLE
    }

    /// The public view key `A = a*G`.
    pub fn view_public_key(&self) -> EdwardsPoint {
        &self.view_private * ED25519_BASEPOINT_TABLE
    }

    /// The primary address, `(0, 0)`.
    pub fn primary_address(&self) -> PublicAddress {
        self.subaddress(SubaddressIndex::PRIMARY)
    }

    /// `m = Hs("SubAddr\0" || a || major || minor)`, the scalar offset that
    /// turns the primary spend key into a subaddress spend key. The primary
    /// index has no offset: it returns `Scalar::ZERO` so callers that branch
    /// on `index.is_primary()` aren't required to special-case this.
    fn subaddress_scalar(&self, index: SubaddressIndex) -> Scalar {
        if index.is_primary() {
            return Scalar::ZERO;
        }
        hash_to_scalar_parts(&[
            SUBADDR_DOMAIN,
            self.view_private.as_bytes(),
            &index.major.to_le_bytes(),
            &index.minor.to_le_bytes(),
        ])
    }

    /// The private spend key for subaddress `index`: `b_i = b + m` (mod `l`),
    /// or `b` unchanged for the primary address.
    pub fn subaddress_spend_private(&self, index: SubaddressIndex) -> Scalar {
        if index.is_primary() {
            return self.spend_private;
        }
        self.spend_private + self.subaddress_scalar(index)
    }

    /// The i-th subaddress: `D_i = B + m*G`, `C_i = a * D_i`.
    pub fn subaddress(&self, index: SubaddressIndex) -> PublicAddress {
        if index.is_primary() {
            return PublicAddress::new(
                self.spend_public_key().into(),
                self.view_public_key().into(),
            );
        }
        let spend_public = self.spend_public_key() + &self.subaddress_scalar(index) * ED25519_BASEPOINT_TABLE;
        let view_public = self.view_private * spend_public;
        PublicAddress::new(spend_public.into(), view_public.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmrsign_util_test_helper::run_with_several_seeds;

    #[test]
    fn primary_address_uses_raw_keys() {
        run_with_several_seeds(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let addr = account.primary_address();
            assert_eq!(
                *addr.spend_public_key(),
                CompressedPoint::from(account.spend_public_key())
            );
            assert_eq!(
                *addr.view_public_key(),
                CompressedPoint::from(account.view_public_key())
            );
        });
    }

    #[test]
    fn subaddresses_differ_by_index() {
        run_with_several_seeds(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let a = account.subaddress(SubaddressIndex { major: 0, minor: 1 });
            let b = account.subaddress(SubaddressIndex { major: 0, minor: 2 });
            assert_ne!(a.spend_public_key(), b.spend_public_key());
        });
    }

    #[test]
    fn subaddress_view_key_matches_derivation_identity() {
        // C_i = a * D_i by construction; re-derive and compare.
        run_with_several_seeds(|mut rng| {
            let account = AccountKeys::random(&mut rng);
            let idx = SubaddressIndex { major: 3, minor: 7 };
            let addr = account.subaddress(idx);
            let d_i = addr.spend_public_key().decompress().unwrap();
            let expect_view = account.view_private_key() * d_i;
            assert_eq!(*addr.view_public_key(), CompressedPoint::from(expect_view));
        });
    }
}
