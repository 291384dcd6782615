//! Hashing, HMAC, the TLS 1.2 PRF, CBC block cipher plumbing, and
//! elliptic-curve key agreement/signatures, all built against a `Hasher`
//! trait / `HasherFactory` abstraction so the PRF and transcript hashing
//! stay hash-agnostic (`hasher.rs`). Curve arithmetic and ECDSA are
//! delegated to dedicated elliptic-curve crates rather than hand-rolled
//! big-integer math (see DESIGN.md).

pub mod cbc;
pub mod constant_time;
pub mod dh;
pub mod elliptic;
pub mod hasher;
pub mod hmac;
pub mod prf;
pub mod random;
pub mod sha256;
