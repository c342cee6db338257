// Copyright (c) 2018-2022 The Botho Foundation

#![cfg_attr(not(feature = "std"), no_std)]

//! Monero account keys: the (view, spend) key pair, subaddress derivation,
//! and the one-time key / key-image recovery used when a wallet claims an
//! output it owns.

mod account_keys;
mod derivation;

pub use account_keys::{AccountKeys, PublicAddress, SubaddressIndex};
pub use derivation::{
    compute_key_image, derive_public_spend_key, derive_secret_spend_key,
    derive_subaddress_public_key, generate_key_derivation, recover_onetime_private_key,
};
