// Copyright (c) 2018-2022 The Botho Foundation

#![cfg_attr(not(feature = "std"), no_std)]

//! The untrusted Host side of RingCT transaction signing.
//!
//! An [`Agent`] drives a [`xmrsign_transaction_signer::SignerSession`]
//! through one transaction: it ingests sources and destinations, computes
//! the key-image permutation (§4.5, descending by `k_image` byte
//! encoding), replays authenticated material back across phase
//! boundaries, and assembles the signer's per-input/per-output material
//! into a [`FinishedTransaction`] once every input is signed. The Host
//! holds no wallet key material; every value it hands the Signer back was
//! first produced and HMAC-tagged by that same Signer.

extern crate alloc;

mod agent;
mod error;

pub use agent::{Agent, FinishedTransaction, UnsignedTx};
pub use error::BuilderError;
