//! Unique serial key generation library.
//!
//! This crate provides the core of a serial key issuing system including:
//! - Uniform random key generation over a caller-supplied alphabet
//! - A non-repeating-adjacent variant (no two consecutive equal characters)
//! - Global uniqueness with bounded-loop termination guarantees
//! - CSV serialization (one key per line, no header)
//! - Storage and link-issuing seams for handing off the result document
//!
//! Only the high-level API is exposed publicly. Low-level components
//! are kept internal to ensure consistency and prevent misuse.

/// Key generation logic: request validation, key space math, sampling.
///
/// This module exposes the high-level generator interface while keeping
/// the internal alphabet representation private.
pub mod keygen;

/// Error taxonomy for generation and storage.
///
/// One variant per caller-visible failure condition.
pub mod error;

/// CSV serialization of a key set (single column, no header).
pub mod serializer;

/// Storage seam: object store and link issuer traits plus local backends.
pub mod storage;
