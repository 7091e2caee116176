//! Top-level module for the serial key generation system.
//!
//! This module provides the unique key generator, including:
//! - Request validation (`GenerationRequest`)
//! - Key space feasibility math (internal `Alphabet`)
//! - Bounded rejection-sampling generation (`KeyGenerator`)
//! - An exhaustive-enumeration fallback for high key-space coverage
//! - A threaded generation path for large issue counts

/// High-level interface for generating sets of unique serial keys.
///
/// Exposes sequential, deadline-aware and threaded generation with
/// a dependency-injected random source.
pub mod generator;

/// Validated parameter object for a single generation invocation.
///
/// Carries the alphabet, key length, issue count and the
/// non-repeating-adjacent flag; performs all fail-fast checks.
pub mod request;

/// Internal representation of the sampling alphabet.
///
/// Tracks the character multiset, its distinct count, and supports
/// uniform and exclusion-constrained random picks.
/// This module is not exposed publicly.
mod alphabet;
