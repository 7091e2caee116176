use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

/// Fixed system ceiling on the issue count of a single invocation.
///
/// Checked before any generation work, independently of the key space
/// feasibility check.
pub const MAX_ISSUE_COUNT: usize = 1_000_000;

/// Parameters of a single generation invocation.
///
/// `GenerationRequest` is constructed from external input, validated once,
/// consumed by the generator, and discarded. Nothing is retained between
/// invocations.
///
/// # Invariants (established by [`GenerationRequest::validate`])
/// - `count <= MAX_ISSUE_COUNT`
/// - `alphabet` is non-empty whenever `length > 0`
/// - in non-repeating mode with `length > 0`, `alphabet` holds at least
///   two distinct characters
///
/// The alphabet may contain duplicate characters; duplicates are legal and
/// simply bias the sampling distribution toward the repeated characters.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerationRequest {
	/// Characters eligible to appear in a key (order kept, duplicates legal).
	pub alphabet: String,

	/// Exact length of every issued key, in characters.
	pub length: usize,

	/// Number of distinct keys to issue.
	pub count: usize,

	/// When true, no two consecutive characters of a key may be equal.
	pub non_repeating: bool,
}

impl GenerationRequest {
	/// Creates a request and validates it in one step.
	///
	/// # Errors
	/// See [`GenerationRequest::validate`].
	pub fn new(
		alphabet: &str,
		length: usize,
		count: usize,
		non_repeating: bool,
	) -> Result<Self, GenerateError> {
		let request = Self {
			alphabet: alphabet.to_owned(),
			length,
			count,
			non_repeating,
		};
		request.validate()?;
		Ok(request)
	}

	/// Runs every fail-fast check that does not require randomness.
	///
	/// # Behavior
	/// Checks are applied in a fixed order so the caller always sees the
	/// same condition for the same input:
	/// 1. issue count ceiling
	/// 2. empty alphabet with a nonzero length
	/// 3. non-repeating mode with fewer than two distinct characters
	///
	/// The key space feasibility check is NOT performed here; it belongs to
	/// the generator, which knows the sampling mode arithmetic.
	///
	/// # Errors
	/// - `IssueCountTooLarge` if `count > MAX_ISSUE_COUNT`
	/// - `InvalidAlphabet` for the two alphabet conditions above
	pub fn validate(&self) -> Result<(), GenerateError> {
		if self.count > MAX_ISSUE_COUNT {
			return Err(GenerateError::IssueCountTooLarge {
				count: self.count,
				max: MAX_ISSUE_COUNT,
			});
		}

		if self.length > 0 && self.alphabet.is_empty() {
			return Err(GenerateError::InvalidAlphabet(
				"The allowed characters must not be empty.".to_owned(),
			));
		}

		if self.non_repeating && self.length > 0 && self.distinct_characters() < 2 {
			return Err(GenerateError::InvalidAlphabet(
				"At least two different characters are required to avoid repetition.".to_owned(),
			));
		}

		Ok(())
	}

	/// Number of distinct characters in the alphabet.
	pub fn distinct_characters(&self) -> usize {
		self.alphabet.chars().collect::<HashSet<_>>().len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_plain_request() {
		assert!(GenerationRequest::new("ABC", 3, 10, false).is_ok());
	}

	#[test]
	fn rejects_count_above_ceiling() {
		let err = GenerationRequest::new("ABC", 8, MAX_ISSUE_COUNT + 1, false).unwrap_err();
		assert!(matches!(err, GenerateError::IssueCountTooLarge { .. }));
	}

	#[test]
	fn accepts_count_at_ceiling() {
		assert!(GenerationRequest::new("ABCDEFGH", 16, MAX_ISSUE_COUNT, false).is_ok());
	}

	#[test]
	fn rejects_empty_alphabet_with_nonzero_length() {
		let err = GenerationRequest::new("", 5, 1, false).unwrap_err();
		assert!(matches!(err, GenerateError::InvalidAlphabet(_)));
	}

	#[test]
	fn allows_empty_alphabet_with_zero_length() {
		assert!(GenerationRequest::new("", 0, 1, false).is_ok());
	}

	#[test]
	fn rejects_single_character_alphabet_in_non_repeating_mode() {
		let err = GenerationRequest::new("A", 5, 1, true).unwrap_err();
		assert!(matches!(err, GenerateError::InvalidAlphabet(_)));
	}

	#[test]
	fn duplicates_do_not_count_as_distinct() {
		// "AAAA" holds one distinct character, so non-repeating mode fails.
		let err = GenerationRequest::new("AAAA", 5, 1, true).unwrap_err();
		assert!(matches!(err, GenerateError::InvalidAlphabet(_)));
	}

	#[test]
	fn single_character_alphabet_is_fine_in_uniform_mode() {
		assert!(GenerationRequest::new("A", 5, 1, false).is_ok());
	}
}
