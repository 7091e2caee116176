use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::GenerateError;
use crate::keygen::alphabet::Alphabet;
use crate::keygen::request::GenerationRequest;

/// Rejection-sampling attempt budget, expressed per requested key.
///
/// On the low-coverage path the expected number of draws per key is below 2,
/// so this budget is never reached in practice; it exists so the loop is
/// bounded by construction.
const ATTEMPTS_PER_KEY: usize = 64;

/// Flat attempt allowance so tiny counts still get a reasonable budget.
const ATTEMPT_FLOOR: usize = 1024;

/// Unique serial key generator for a single validated request.
///
/// # Responsibilities
/// - Pre-compute the distinct-key space and reject infeasible requests
///   before consuming any randomness
/// - Collect `count` distinct keys via bounded rejection sampling
/// - Fall back to exhaustive enumeration when the requested coverage of the
///   key space makes rejection sampling degrade
/// - Offer a threaded variant for large issue counts
///
/// The random source is injected by the caller, so a fixed-seed generator
/// yields reproducible results in tests.
#[derive(Clone, Debug)]
pub struct KeyGenerator {
	alphabet: Alphabet,
	length: usize,
	count: usize,
	non_repeating: bool,
}

impl KeyGenerator {
	/// Creates a generator from a request, validating it first.
	///
	/// # Errors
	/// Propagates every [`GenerationRequest::validate`] failure; no
	/// randomness is consumed on the error path.
	pub fn new(request: &GenerationRequest) -> Result<Self, GenerateError> {
		request.validate()?;
		Ok(Self {
			alphabet: Alphabet::new(&request.alphabet),
			length: request.length,
			count: request.count,
			non_repeating: request.non_repeating,
		})
	}

	/// Generates the requested set of distinct keys.
	///
	/// Equivalent to [`KeyGenerator::generate_until`] without a deadline.
	pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<HashSet<String>, GenerateError> {
		self.generate_until(rng, None)
	}

	/// Generates the requested set of distinct keys, honoring a deadline.
	///
	/// # Parameters
	/// - `rng`: the random source; pass a seeded `StdRng` for determinism.
	/// - `deadline`: optional instant checked between loop iterations, so an
	///   external timeout can abort generation mid-flight.
	///
	/// # Behavior
	/// - `count == 0` returns an empty set without touching `rng`.
	/// - The key space is computed up front: a count beyond it fails
	///   immediately with `KeySpaceExhausted` instead of looping forever.
	/// - Coverage above half the key space switches to exhaustive
	///   enumeration plus a partial shuffle; the feasibility check bounds
	///   that enumeration to at most twice the issue-count ceiling.
	/// - Otherwise keys are drawn and re-drawn on collision until `count`
	///   distinct members are collected, within a fixed attempt budget.
	///
	/// # Errors
	/// - `KeySpaceExhausted` if the request is infeasible, or if the attempt
	///   budget runs out (the loop is bounded by design).
	/// - `DeadlineExceeded` if `deadline` elapses between iterations.
	pub fn generate_until<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
		deadline: Option<Instant>,
	) -> Result<HashSet<String>, GenerateError> {
		if self.count == 0 {
			return Ok(HashSet::new());
		}

		let (space, exhaustive) = self.feasible_space()?;

		if exhaustive {
			return self.generate_exhaustive(rng);
		}

		let mut keys = HashSet::with_capacity(self.count);
		self.rejection_sample(&mut keys, rng, deadline, space)?;
		Ok(keys)
	}

	/// Generates the requested set using one worker thread per CPU.
	///
	/// # Behavior
	/// - Splits the target count across `num_cpus` workers, each drawing
	///   with its own OS-seeded `StdRng` so streams are independent.
	/// - Partial sets are collected over an MPSC channel and merged; cross-
	///   worker duplicates are topped up sequentially, and over-generation
	///   is trimmed so exactly `count` keys are returned.
	/// - High-coverage requests are redirected to the exhaustive path, where
	///   threading has nothing to win.
	///
	/// # Errors
	/// Same conditions as [`KeyGenerator::generate_until`].
	pub fn generate_parallel(&self) -> Result<HashSet<String>, GenerateError> {
		if self.count == 0 {
			return Ok(HashSet::new());
		}

		let (space, exhaustive) = self.feasible_space()?;
		if exhaustive {
			return self.generate_exhaustive(&mut rand::rng());
		}

		let workers = num_cpus::get().max(1);
		let per_worker = self.count.div_ceil(workers);

		let (tx, rx) = mpsc::channel();
		for _ in 0..workers {
			let tx = tx.clone();
			let generator = self.clone();

			thread::spawn(move || {
				let mut rng = StdRng::from_os_rng();
				let mut partial = HashSet::with_capacity(per_worker);
				let result = generator
					.rejection_sample_target(&mut partial, per_worker, &mut rng, None, space)
					.map(|_| partial);
				tx.send(result).expect("Failed to send from thread");
			});
		}
		drop(tx);

		let mut keys = HashSet::with_capacity(self.count);
		for partial in rx.iter() {
			keys.extend(partial?);
		}

		// Cross-worker collisions may leave the merged set short.
		if keys.len() < self.count {
			self.rejection_sample(&mut keys, &mut rand::rng(), None, space)?;
		}

		if keys.len() > self.count {
			keys = keys.into_iter().take(self.count).collect();
		}
		Ok(keys)
	}

	/// Computes the key space and checks the request against it.
	///
	/// Returns `(space, exhaustive)` where `space` is saturated at twice the
	/// requested count (enough for both comparisons below) and `exhaustive`
	/// is true when the request covers more than half the key space.
	///
	/// # Errors
	/// `KeySpaceExhausted` if `count` exceeds the space.
	fn feasible_space(&self) -> Result<(u64, bool), GenerateError> {
		let count = self.count as u64;
		let cap = count.saturating_mul(2).max(1);
		let space = self.alphabet.key_space(self.length, self.non_repeating, cap);

		if count > space {
			return Err(GenerateError::KeySpaceExhausted {
				count: self.count,
				space,
			});
		}

		Ok((space, count.saturating_mul(2) > space))
	}

	/// Draws one candidate key, without any uniqueness consideration.
	///
	/// In non-repeating mode each position after the first draws from the
	/// multiset restricted to characters different from its predecessor.
	///
	/// Returns `None` only if the alphabet cannot supply a character, which
	/// validation rules out for every reachable call site.
	fn draw_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
		let mut key = String::with_capacity(self.length);
		let mut last: Option<char> = None;

		for _ in 0..self.length {
			let c = match last {
				Some(previous) if self.non_repeating => self.alphabet.draw_excluding(rng, previous)?,
				_ => self.alphabet.draw(rng)?,
			};
			key.push(c);
			last = Some(c);
		}

		Some(key)
	}

	/// Rejection-sampling loop filling `keys` up to the requested count.
	fn rejection_sample<R: Rng + ?Sized>(
		&self,
		keys: &mut HashSet<String>,
		rng: &mut R,
		deadline: Option<Instant>,
		space: u64,
	) -> Result<(), GenerateError> {
		self.rejection_sample_target(keys, self.count, rng, deadline, space)
	}

	/// Rejection-sampling loop filling `keys` up to `target` members.
	///
	/// The loop is bounded: it stops after `ATTEMPTS_PER_KEY * target`
	/// draws (plus a flat floor) or when the deadline elapses, whichever
	/// comes first, so no input can make it spin forever.
	fn rejection_sample_target<R: Rng + ?Sized>(
		&self,
		keys: &mut HashSet<String>,
		target: usize,
		rng: &mut R,
		deadline: Option<Instant>,
		space: u64,
	) -> Result<(), GenerateError> {
		let budget = ATTEMPTS_PER_KEY.saturating_mul(target).saturating_add(ATTEMPT_FLOOR);
		let mut attempts = 0;

		while keys.len() < target {
			if let Some(deadline) = deadline {
				if Instant::now() >= deadline {
					return Err(GenerateError::DeadlineExceeded);
				}
			}
			if attempts >= budget {
				return Err(GenerateError::KeySpaceExhausted {
					count: self.count,
					space,
				});
			}
			attempts += 1;

			let key = match self.draw_key(rng) {
				Some(key) => key,
				None => {
					return Err(GenerateError::InvalidAlphabet(
						"The allowed characters must not be empty.".to_owned(),
					));
				}
			};
			keys.insert(key);
		}

		Ok(())
	}

	/// Exhaustive path: enumerate the whole key space, shuffle, take `count`.
	fn generate_exhaustive<R: Rng + ?Sized>(
		&self,
		rng: &mut R,
	) -> Result<HashSet<String>, GenerateError> {
		let mut all = self.enumerate_all();
		let (picked, _) = all.partial_shuffle(rng, self.count);
		Ok(picked.iter().map(|key| key.to_owned()).collect())
	}

	/// Enumerates every distinct key of the space, in no particular order.
	///
	/// Only reached when the space fits in twice the requested count, so at
	/// most 2,000,000 keys are materialized. Two degenerate shapes keep the
	/// key space tiny at arbitrary lengths and are built directly; any other
	/// shape reaching this path has `length <= log2(space)`, so the level by
	/// level expansion stays small.
	fn enumerate_all(&self) -> Vec<String> {
		let distinct = self.alphabet.distinct_chars();

		if self.length == 0 {
			return vec![String::new()];
		}

		// Single distinct character: the space is one repeated-char key.
		if distinct.len() == 1 {
			return vec![std::iter::repeat(distinct[0]).take(self.length).collect()];
		}

		// Two distinct characters without adjacent repeats: the space is the
		// two alternating keys, whatever the length.
		if self.non_repeating && distinct.len() == 2 {
			let build = |first: char, second: char| -> String {
				(0..self.length)
					.map(|i| if i % 2 == 0 { first } else { second })
					.collect()
			};
			return vec![build(distinct[0], distinct[1]), build(distinct[1], distinct[0])];
		}

		let mut keys: Vec<(String, char)> = distinct
			.iter()
			.map(|&c| (c.to_string(), c))
			.collect();

		for _ in 1..self.length {
			let mut next = Vec::with_capacity(keys.len() * distinct.len());
			for (prefix, last) in &keys {
				for &c in distinct {
					if self.non_repeating && c == *last {
						continue;
					}
					let mut key = String::with_capacity(self.length);
					key.push_str(prefix);
					key.push(c);
					next.push((key, c));
				}
			}
			keys = next;
		}

		keys.into_iter().map(|(key, _)| key).collect()
	}
}

#[cfg(test)]
mod tests {
	use rand::RngCore;

	use super::*;

	fn generator(alphabet: &str, length: usize, count: usize, non_repeating: bool) -> KeyGenerator {
		let request = GenerationRequest::new(alphabet, length, count, non_repeating).unwrap();
		KeyGenerator::new(&request).unwrap()
	}

	fn assert_valid_keys(keys: &HashSet<String>, alphabet: &str, length: usize, count: usize) {
		assert_eq!(keys.len(), count);
		for key in keys {
			assert_eq!(key.chars().count(), length);
			assert!(key.chars().all(|c| alphabet.contains(c)));
		}
	}

	/// Random source that panics on first use, to prove a path draws nothing.
	struct PanicRng;

	impl RngCore for PanicRng {
		fn next_u32(&mut self) -> u32 {
			panic!("randomness consumed");
		}

		fn next_u64(&mut self) -> u64 {
			panic!("randomness consumed");
		}

		fn fill_bytes(&mut self, _dest: &mut [u8]) {
			panic!("randomness consumed");
		}
	}

	#[test]
	fn zero_count_yields_empty_set_without_randomness() {
		let generator = generator("ABC", 5, 0, false);
		let keys = generator.generate(&mut PanicRng).unwrap();
		assert!(keys.is_empty());
	}

	#[test]
	fn infeasible_request_fails_without_randomness() {
		let generator = generator("AB", 2, 10, false);
		let err = generator.generate(&mut PanicRng).unwrap_err();
		assert_eq!(err, GenerateError::KeySpaceExhausted { count: 10, space: 4 });
	}

	#[test]
	fn generates_requested_count_of_valid_keys() {
		let mut rng = StdRng::seed_from_u64(7);
		let alphabet = "ABCDEFGHJKLMNPRTUVWXY123456789";
		let generator = generator(alphabet, 15, 100, false);
		let keys = generator.generate(&mut rng).unwrap();
		assert_valid_keys(&keys, alphabet, 15, 100);
	}

	#[test]
	fn non_repeating_keys_have_no_adjacent_repeats() {
		let mut rng = StdRng::seed_from_u64(11);
		let generator = generator("ABCDE", 12, 500, true);
		let keys = generator.generate(&mut rng).unwrap();
		assert_valid_keys(&keys, "ABCDE", 12, 500);
		for key in &keys {
			let chars: Vec<char> = key.chars().collect();
			assert!(chars.windows(2).all(|pair| pair[0] != pair[1]), "adjacent repeat in {key}");
		}
	}

	#[test]
	fn high_coverage_non_repeating_request_succeeds() {
		// Key space is 3 * 2 * 2 = 12; requesting 10 of it exercises the
		// exhaustive enumeration path.
		let mut rng = StdRng::seed_from_u64(13);
		let generator = generator("ABC", 3, 10, true);
		let keys = generator.generate(&mut rng).unwrap();
		assert_valid_keys(&keys, "ABC", 3, 10);
		for key in &keys {
			let chars: Vec<char> = key.chars().collect();
			assert!(chars.windows(2).all(|pair| pair[0] != pair[1]));
		}
	}

	#[test]
	fn requesting_the_entire_space_returns_it() {
		let mut rng = StdRng::seed_from_u64(17);
		let generator = generator("ABC", 2, 9, false);
		let keys = generator.generate(&mut rng).unwrap();
		assert_eq!(keys.len(), 9);
		for a in "ABC".chars() {
			for b in "ABC".chars() {
				assert!(keys.contains(&format!("{a}{b}")));
			}
		}
	}

	#[test]
	fn binary_alphabet_non_repeating_space_is_two() {
		let mut rng = StdRng::seed_from_u64(19);
		let generator = generator("AB", 10, 2, true);
		let keys = generator.generate(&mut rng).unwrap();
		assert_eq!(keys, HashSet::from(["ABABABABAB".to_owned(), "BABABABABA".to_owned()]));
	}

	#[test]
	fn binary_alphabet_non_repeating_overflow_fails() {
		let generator = generator("AB", 10, 1024, true);
		let err = generator.generate(&mut rand::rng()).unwrap_err();
		assert!(matches!(err, GenerateError::KeySpaceExhausted { space: 2, .. }));
	}

	#[test]
	fn zero_length_supports_exactly_one_key() {
		let mut rng = StdRng::seed_from_u64(23);
		let generator = generator("ABC", 0, 1, false);
		let keys = generator.generate(&mut rng).unwrap();
		assert_eq!(keys, HashSet::from([String::new()]));
	}

	#[test]
	fn zero_length_with_larger_count_fails() {
		let generator = generator("ABC", 0, 2, false);
		let err = generator.generate(&mut rand::rng()).unwrap_err();
		assert!(matches!(err, GenerateError::KeySpaceExhausted { space: 1, .. }));
	}

	#[test]
	fn duplicate_alphabet_characters_are_legal() {
		let mut rng = StdRng::seed_from_u64(29);
		let generator = generator("AABBC", 6, 50, false);
		let keys = generator.generate(&mut rng).unwrap();
		assert_valid_keys(&keys, "ABC", 6, 50);
	}

	/// Random source that always yields zero, so every draw picks the same
	/// character and the uniqueness loop can never make progress.
	struct ZeroRng;

	impl RngCore for ZeroRng {
		fn next_u32(&mut self) -> u32 {
			0
		}

		fn next_u64(&mut self) -> u64 {
			0
		}

		fn fill_bytes(&mut self, dest: &mut [u8]) {
			dest.fill(0);
		}
	}

	#[test]
	fn stalled_sampling_exhausts_the_attempt_budget() {
		// Space is 4^3 = 64 for a count of 2, so this stays on the
		// rejection-sampling path; the constant source draws "AAA" forever
		// and the bounded loop must give up instead of spinning.
		let generator = generator("ABCD", 3, 2, false);
		let err = generator.generate(&mut ZeroRng).unwrap_err();
		assert!(matches!(err, GenerateError::KeySpaceExhausted { count: 2, .. }));
	}

	#[test]
	fn elapsed_deadline_aborts_generation() {
		let mut rng = StdRng::seed_from_u64(31);
		let generator = generator("ABCDEF", 8, 100, false);
		let deadline = Instant::now() - std::time::Duration::from_secs(1);
		let err = generator.generate_until(&mut rng, Some(deadline)).unwrap_err();
		assert_eq!(err, GenerateError::DeadlineExceeded);
	}

	#[test]
	fn seeded_generation_is_reproducible() {
		let generator = generator("ABCDEFGH", 10, 20, false);
		let first = generator.generate(&mut StdRng::seed_from_u64(37)).unwrap();
		let second = generator.generate(&mut StdRng::seed_from_u64(37)).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn parallel_generation_returns_exact_count() {
		let alphabet = "ABCDEFGHJKLMNPRTUVWXY123456789";
		let generator = generator(alphabet, 12, 5000, false);
		let keys = generator.generate_parallel().unwrap();
		assert_valid_keys(&keys, alphabet, 12, 5000);
	}

	#[test]
	fn parallel_generation_rejects_infeasible_requests() {
		let generator = generator("AB", 10, 1024, true);
		let err = generator.generate_parallel().unwrap_err();
		assert!(matches!(err, GenerateError::KeySpaceExhausted { .. }));
	}
}
