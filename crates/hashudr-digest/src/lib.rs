//! # hashudr-digest — Digest Engine
//!
//! Stateless mapping from a [`HashAlgorithm`](hashudr_core::HashAlgorithm)
//! and a byte sequence to the digest text returned to the host.
//!
//! ## Architecture
//!
//! - **Engine** (`engine.rs`): the closed dispatch. Each supported algorithm
//!   is applied with a single update over the whole input followed by
//!   finalization. Declared-only algorithms resolve to
//!   `UdrError::UnsupportedAlgorithm`.
//!
//! - **HAS-160** (`has160.rs`) and **FNV-1a** (`fnv.rs`): the two primitives
//!   without a RustCrypto crate, implemented locally.
//!
//! Everything else delegates to the RustCrypto hash crates, `crc32fast` and
//! `siphasher`.
//!
//! ## Crate Policy
//!
//! - Pure functions only: no I/O, no locking, no global state.
//! - No `unsafe` code.

pub mod engine;
pub mod fnv;
pub mod has160;

pub use engine::{digest, DigestEngine};
