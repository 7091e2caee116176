use std::collections::HashSet;

use rand::Rng;

/// Sampling alphabet of a generation invocation.
///
/// An `Alphabet` holds the character multiset exactly as entered: duplicate
/// characters are kept and make their character proportionally more likely
/// to be drawn. The distinct-character view drives the key space arithmetic
/// and the exhaustive enumeration fallback.
///
/// ## Responsibilities
/// - Uniform random picks over the multiset
/// - Exclusion-constrained picks for the non-repeating-adjacent mode
/// - Overflow-safe, capped key space computation
///
/// ## Invariants
/// - `distinct` preserves first-occurrence order and holds no duplicates
/// - `distinct.len() <= chars.len()`
#[derive(Clone, Debug)]
pub(crate) struct Alphabet {
	/// The multiset, as entered by the caller.
	chars: Vec<char>,
	/// Distinct characters in first-occurrence order.
	distinct: Vec<char>,
}

impl Alphabet {
	/// Builds an alphabet from the raw allowed-characters string.
	pub(crate) fn new(allowed: &str) -> Self {
		let chars: Vec<char> = allowed.chars().collect();

		let mut seen = HashSet::new();
		let distinct = chars
			.iter()
			.copied()
			.filter(|c| seen.insert(*c))
			.collect();

		Self { chars, distinct }
	}

	/// Number of distinct characters.
	pub(crate) fn distinct_len(&self) -> usize {
		self.distinct.len()
	}

	/// Distinct characters in first-occurrence order.
	///
	/// Used by the exhaustive enumeration fallback, which walks distinct
	/// keys and therefore must ignore multiset duplicates.
	pub(crate) fn distinct_chars(&self) -> &[char] {
		&self.distinct
	}

	/// Draws one character uniformly over the multiset.
	///
	/// Returns `None` on an empty alphabet.
	pub(crate) fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<char> {
		if self.chars.is_empty() {
			return None;
		}
		Some(self.chars[rng.random_range(0..self.chars.len())])
	}

	/// Draws one character over the multiset, excluding `last`.
	///
	/// The pick is uniform over the remaining multiset entries, so duplicate
	/// characters keep their bias among the candidates (matching a filtered
	/// candidate-list draw).
	///
	/// Returns `None` if every character of the multiset equals `last`.
	pub(crate) fn draw_excluding<R: Rng + ?Sized>(&self, rng: &mut R, last: char) -> Option<char> {
		let candidates: Vec<char> = self.chars.iter().copied().filter(|c| *c != last).collect();
		if candidates.is_empty() {
			return None;
		}
		Some(candidates[rng.random_range(0..candidates.len())])
	}

	/// Computes the distinct-key space size, saturated at `cap`.
	///
	/// # Parameters
	/// - `length`: key length in characters.
	/// - `non_repeating`: whether the adjacent-repeat constraint applies.
	/// - `cap`: saturation bound; any true size above it is reported as `cap`.
	///
	/// # Behavior
	/// - Uniform mode: `d ^ length` where `d` is the distinct count.
	/// - Non-repeating mode: `d * (d - 1) ^ (length - 1)`.
	/// - `length == 0` yields exactly 1 (the empty key), whatever the mode.
	///
	/// The multiplication chain stops as soon as the running product reaches
	/// `cap`, so extreme alphabet/length combinations never overflow.
	pub(crate) fn key_space(&self, length: usize, non_repeating: bool, cap: u64) -> u64 {
		if length == 0 {
			return 1.min(cap);
		}

		let d = self.distinct.len() as u64;
		if d == 0 {
			return 0;
		}

		let per_position = if non_repeating { d - 1 } else { d };

		let mut space = d;
		for _ in 1..length {
			if space >= cap {
				return cap;
			}
			space = match space.checked_mul(per_position) {
				Some(s) => s,
				None => return cap,
			};
		}

		space.min(cap)
	}
}
