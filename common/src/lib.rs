// Copyright (c) 2018-2022 The Botho Foundation

#![cfg_attr(not(feature = "std"), no_std)]

//! Shared logging and small utilities used across the `xmrsign-*` crates.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod logger;

pub use logger::log;
