// Copyright (c) 2018-2022 The Botho Foundation

#![cfg_attr(not(feature = "std"), no_std)]

//! RingCT's cryptographic building blocks: Pedersen commitments,
//! memory-bounded Borromean range proofs, and MLSAG ring signatures (both
//! the per-input "Simple" variant and the whole-transaction "Full" variant),
//! plus the ECDH amount/mask masking used between sender and recipient and
//! the single-key linkable ring signature used for key-image export proofs.

extern crate alloc;

mod commitment;
mod ecdh;
mod error;
mod key_image;

pub mod borromean;
pub mod mlsag;
pub mod onetime_keys;

pub use commitment::{pedersen_commit, Commitment};
pub use ecdh::{ecdh_decode, ecdh_encode, EcdhTuple, UnmaskedAmount};
pub use error::Error;
pub use key_image::KeyImage;
