// Copyright (c) 2018-2022 The Botho Foundation

#![cfg_attr(not(feature = "std"), no_std)]

//! Curve and hash primitives for Monero-style RingCT: Ed25519 scalars and
//! points, Keccak ("cn_fast_hash") hashing, hash-to-scalar / hash-to-point,
//! and Monero's varint encoding.
//!
//! This crate deliberately works over Ed25519 (`curve25519_dalek::EdwardsPoint`)
//! rather than Ristretto: Monero's wire format and key-image construction are
//! defined directly on the Edwards curve, including its cofactor-8 subgroup
//! structure, so Ristretto's cofactor-clearing abstraction doesn't apply here.

extern crate alloc;

mod error;
mod point;

pub mod generators;
pub mod hash;
pub mod varint;

pub use curve25519_dalek::{edwards::CompressedEdwardsY, EdwardsPoint, Scalar};
pub use error::KeyError;
pub use point::CompressedPoint;
