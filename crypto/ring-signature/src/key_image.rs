// Copyright (c) 2018-2022 The Botho Foundation

use core::{convert::TryFrom, fmt};

use curve25519_dalek::EdwardsPoint;
use xmrsign_crypto_keys::CompressedPoint;

use crate::Error;

/// A key image `I = x*Hp(P)`: the linkable nullifier attached to a spent
/// one-time output. Two transactions spending the same output produce the
/// same key image, which is how double-spends are detected on-chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyImage(CompressedPoint);

impl KeyImage {
    /// The compressed point bytes as they appear in a `TxinToKey`.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Decompresses to the underlying curve point.
    pub fn decompress(&self) -> Result<EdwardsPoint, Error> {
        self.0.decompress().map_err(|_| Error::InvalidCurvePoint)
    }
}

impl From<EdwardsPoint> for KeyImage {
    fn from(point: EdwardsPoint) -> Self {
        KeyImage(CompressedPoint::from(point))
    }
}

impl From<CompressedPoint> for KeyImage {
    fn from(point: CompressedPoint) -> Self {
        KeyImage(point)
    }
}

impl TryFrom<[u8; 32]> for KeyImage {
    type Error = Error;

    fn try_from(bytes: [u8; 32]) -> Result<Self, Error> {
        Ok(KeyImage(CompressedPoint::from(bytes)))
    }
}

impl fmt::Debug for KeyImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyImage({})", self.0)
    }
}

impl Ord for KeyImage {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for KeyImage {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::{constants::ED25519_BASEPOINT_POINT, Scalar};

    #[test]
    fn orders_lexicographically_by_encoded_bytes() {
        let a = KeyImage::from(ED25519_BASEPOINT_POINT);
        let b = KeyImage::from(Scalar::from(2u64) * ED25519_BASEPOINT_POINT);
        assert_eq!(a.cmp(&a), core::cmp::Ordering::Equal);
        let _ = a.cmp(&b); // just needs to not panic; order depends on the encodings
    }
}
