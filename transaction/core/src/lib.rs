// Copyright (c) 2018-2022 The Botho Foundation

#![cfg_attr(not(feature = "std"), no_std)]

//! The RingCT transaction data model (requests, ring members, wire types)
//! and the two incremental hashers the signer feeds as it streams inputs
//! and outputs: the transaction-prefix hash and the "full message" the
//! MLSAG signatures are computed over.

extern crate alloc;

mod data;
mod error;
mod hashing;
mod wire;

pub use data::{Destination, SourceEntry, SourceRingMember, TsxData};
pub use error::TxError;
pub use hashing::{PreMlsagHasher, TxPrefixHasher};
pub use wire::{RctSigBase, RctSigPrunable, RctType, TxOut, TxinToKey};
