use thiserror::Error;

/// Failure conditions of a generation request.
///
/// Each variant corresponds to one caller-visible condition; the HTTP layer
/// maps every variant to a distinct response. All validation variants are
/// raised before any randomness is consumed or any I/O performed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GenerateError {
	/// One or more required inputs are absent; generation never starts.
	#[error("Please specify the allowed characters, serial key length and issue count.")]
	MissingParameter,

	/// The requested count exceeds the fixed system ceiling.
	#[error("The issue count cannot be greater than {max}.")]
	IssueCountTooLarge {
		/// Requested issue count.
		count: usize,
		/// The fixed ceiling ([`crate::keygen::request::MAX_ISSUE_COUNT`]).
		max: usize,
	},

	/// The alphabet cannot produce keys under the requested mode.
	#[error("{0}")]
	InvalidAlphabet(String),

	/// The requested count exceeds (or the retry budget shows it unsafely
	/// approaches) the achievable distinct-key space.
	#[error("Cannot issue {count} unique keys: the key space holds only {space} keys.")]
	KeySpaceExhausted {
		/// Requested issue count.
		count: usize,
		/// Distinct-key space size, saturated at the feasibility cap.
		space: u64,
	},

	/// An external deadline elapsed between generation iterations.
	#[error("Generation aborted: deadline exceeded.")]
	DeadlineExceeded,

	/// The result document could not be serialized to CSV.
	#[error("CSV serialization failed: {0}")]
	Serialization(String),

	/// The storage collaborator failed to persist the result.
	#[error(transparent)]
	Storage(#[from] StorageError),
}

/// Failure conditions of the storage collaborators.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StorageError {
	/// The object store could not persist or retrieve the payload.
	#[error("Storage unavailable: {0}")]
	Unavailable(String),

	/// The requested object does not exist in the store.
	#[error("Object not found: {0}")]
	NotFound(String),

	/// The object name is not a plain file name and could address content
	/// outside the store.
	#[error("Invalid object name: {0}")]
	InvalidObjectName(String),
}
