// Copyright (c) 2018-2022 The Botho Foundation

#![cfg_attr(not(feature = "std"), no_std)]

//! The trusted-device (Signer) side of RingCT transaction signing.
//!
//! A [`session::SignerSession`] holds a wallet's private keys for the
//! lifetime of one transaction and walks through the phases of
//! `init_transaction` -> inputs -> outputs -> range proofs -> per-input
//! MLSAG signatures, each phase gated by [`state::TState`] and, wherever the
//! untrusted Host hands data back across a phase boundary, re-authenticated
//! against an HMAC keyed off [`keys::KeySchedule`]. Every failure is fatal to
//! the session: see [`error::SignerError`].

extern crate alloc;

mod config;
mod error;
mod keys;
mod session;
mod state;

pub use config::{SessionConfig, SessionMode};
pub use error::SignerError;
pub use session::{
    absolute_output_offsets, FinishedRct, MultisigKLRki, SetInputOutput, SetOutputOutput,
    SignerSession,
};
pub use state::TState;
