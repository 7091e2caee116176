use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};

use crate::error::{GenerateError, StorageError};
use crate::serializer;

/// Logical bucket every generated document is stored under.
pub const BUCKET: &str = "serial-key-generator";

/// Default validity window of an issued retrieval link.
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(300);

/// Durable byte storage, addressed by (bucket, object).
///
/// The generation core has no knowledge of the backing implementation;
/// failures surface as `StorageError` and are never retried here.
pub trait ObjectStore {
	/// Durably stores `bytes` under `bucket`/`object`, replacing any
	/// previous content.
	fn put(&self, bucket: &str, object: &str, bytes: &[u8]) -> Result<(), StorageError>;

	/// Retrieves the content stored under `bucket`/`object`.
	fn get(&self, bucket: &str, object: &str) -> Result<Vec<u8>, StorageError>;
}

/// Issues time-bounded retrieval URLs for stored objects.
pub trait LinkIssuer {
	/// Returns a URL through which `object` can be fetched for `ttl`.
	fn issue(&self, bucket: &str, object: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Builds the deterministic object name for an invocation timestamp.
///
/// Example: an invocation at 2026-08-30 14:05:09 local time stores
/// `output_20260830140509.csv`.
pub fn output_object_name(now: DateTime<Local>) -> String {
	format!("output_{}.csv", now.format("%Y%m%d%H%M%S"))
}

/// Serializes a key set to CSV, stores it, and returns a retrieval link.
///
/// This is the hand-off step between generation and the outside world: the
/// document is named from the invocation timestamp, stored under [`BUCKET`],
/// and exchanged for a URL valid for `ttl`.
///
/// # Errors
/// Surfaces serialization and storage failures as `GenerateError::Storage`;
/// no URL is fabricated when the store fails.
pub fn publish_csv<S: ObjectStore + ?Sized, L: LinkIssuer + ?Sized>(
	store: &S,
	issuer: &L,
	keys: &HashSet<String>,
	now: DateTime<Local>,
	ttl: Duration,
) -> Result<String, GenerateError> {
	let bytes = serializer::to_csv(keys)
		.map_err(|e| GenerateError::Serialization(e.to_string()))?;

	let object = output_object_name(now);
	store.put(BUCKET, &object, &bytes)?;
	let url = issuer.issue(BUCKET, &object, ttl)?;
	Ok(url)
}

/// Checks that a bucket or object name is a plain file name.
///
/// Names carrying path separators or dot components would address content
/// outside `<root>/<bucket>` once joined into a file-system path, so they
/// are refused before any path is built. HTTP callers can smuggle such
/// names through percent-encoding, hence the check sits in the store, not
/// in the transport.
fn validate_name(name: &str) -> Result<(), StorageError> {
	if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
		return Err(StorageError::InvalidObjectName(name.to_owned()));
	}
	Ok(())
}

/// Object store backed by the local file system.
///
/// Objects live at `<root>/<bucket>/<object>`. Buckets are created lazily
/// on first put. Bucket and object names must be plain file names; anything
/// that could escape the root is rejected with `InvalidObjectName`.
#[derive(Debug)]
pub struct FsObjectStore {
	root: PathBuf,
}

impl FsObjectStore {
	pub fn new<P: Into<PathBuf>>(root: P) -> Self {
		Self { root: root.into() }
	}

	fn object_path(&self, bucket: &str, object: &str) -> Result<PathBuf, StorageError> {
		validate_name(bucket)?;
		validate_name(object)?;
		Ok(self.root.join(bucket).join(object))
	}
}

impl ObjectStore for FsObjectStore {
	fn put(&self, bucket: &str, object: &str, bytes: &[u8]) -> Result<(), StorageError> {
		let path = self.object_path(bucket, object)?;

		let parent = path.parent().unwrap_or(&self.root);
		fs::create_dir_all(parent)
			.map_err(|e| StorageError::Unavailable(e.to_string()))?;

		fs::write(&path, bytes).map_err(|e| StorageError::Unavailable(e.to_string()))
	}

	fn get(&self, bucket: &str, object: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.object_path(bucket, object)?;
		if !path.is_file() {
			return Err(StorageError::NotFound(object.to_owned()));
		}
		fs::read(&path).map_err(|e| StorageError::Unavailable(e.to_string()))
	}
}

/// In-process object store for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
	objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl ObjectStore for MemoryObjectStore {
	fn put(&self, bucket: &str, object: &str, bytes: &[u8]) -> Result<(), StorageError> {
		let mut objects = self
			.objects
			.lock()
			.map_err(|_| StorageError::Unavailable("Store lock poisoned".to_owned()))?;
		objects.insert((bucket.to_owned(), object.to_owned()), bytes.to_vec());
		Ok(())
	}

	fn get(&self, bucket: &str, object: &str) -> Result<Vec<u8>, StorageError> {
		let objects = self
			.objects
			.lock()
			.map_err(|_| StorageError::Unavailable("Store lock poisoned".to_owned()))?;
		objects
			.get(&(bucket.to_owned(), object.to_owned()))
			.cloned()
			.ok_or_else(|| StorageError::NotFound(object.to_owned()))
	}
}

/// Link issuer producing URLs with an embedded expiry timestamp.
///
/// The URL shape is `{base}/v1/download/{object}?expires={unix_seconds}`;
/// the serving side is expected to reject requests past the timestamp.
#[derive(Debug, Clone)]
pub struct ExpiringLinkIssuer {
	base_url: String,
}

impl ExpiringLinkIssuer {
	/// `base_url` is used verbatim, without a trailing slash.
	pub fn new<S: Into<String>>(base_url: S) -> Self {
		Self { base_url: base_url.into() }
	}
}

impl LinkIssuer for ExpiringLinkIssuer {
	fn issue(&self, _bucket: &str, object: &str, ttl: Duration) -> Result<String, StorageError> {
		let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
		Ok(format!("{}/v1/download/{}?expires={}", self.base_url, object, expires))
	}
}

#[cfg(test)]
mod tests {
	use chrono::TimeZone;

	use super::*;

	#[test]
	fn object_name_is_deterministic_for_a_timestamp() {
		let now = Local.with_ymd_and_hms(2026, 8, 30, 14, 5, 9).unwrap();
		assert_eq!(output_object_name(now), "output_20260830140509.csv");
	}

	#[test]
	fn fs_store_round_trips_bytes() {
		let dir = tempfile::tempdir().unwrap();
		let store = FsObjectStore::new(dir.path());

		store.put(BUCKET, "output_1.csv", b"KEY1\nKEY2\n").unwrap();
		assert_eq!(store.get(BUCKET, "output_1.csv").unwrap(), b"KEY1\nKEY2\n");
	}

	#[test]
	fn fs_store_refuses_to_read_outside_its_root() {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path().join("store");
		fs::create_dir_all(&root).unwrap();
		fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();

		let store = FsObjectStore::new(&root);
		store.put(BUCKET, "output_1.csv", b"KEY1\n").unwrap();

		let leaked = store.get(BUCKET, "../../secret.txt");
		assert_eq!(
			leaked.unwrap_err(),
			StorageError::InvalidObjectName("../../secret.txt".to_owned())
		);
	}

	#[test]
	fn fs_store_refuses_to_write_outside_its_root() {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path().join("store");
		fs::create_dir_all(&root).unwrap();

		let store = FsObjectStore::new(&root);
		assert!(store.put(BUCKET, "../evil.csv", b"X\n").is_err());
		assert!(!dir.path().join(BUCKET).join("evil.csv").exists());
		assert!(!root.join("evil.csv").exists());
	}

	#[test]
	fn traversal_and_separator_names_are_rejected() {
		for name in ["", ".", "..", "a/b", "a\\b", "/etc/passwd", "../output.csv"] {
			assert!(validate_name(name).is_err(), "accepted {name:?}");
		}
		assert!(validate_name("output_20260830140509.csv").is_ok());
	}

	#[test]
	fn fs_store_reports_missing_objects() {
		let dir = tempfile::tempdir().unwrap();
		let store = FsObjectStore::new(dir.path());
		let err = store.get(BUCKET, "absent.csv").unwrap_err();
		assert_eq!(err, StorageError::NotFound("absent.csv".to_owned()));
	}

	#[test]
	fn memory_store_round_trips_bytes() {
		let store = MemoryObjectStore::default();
		store.put(BUCKET, "output_2.csv", b"KEY\n").unwrap();
		assert_eq!(store.get(BUCKET, "output_2.csv").unwrap(), b"KEY\n");
	}

	#[test]
	fn issued_links_embed_a_future_expiry() {
		let issuer = ExpiringLinkIssuer::new("http://127.0.0.1:5000");
		let url = issuer.issue(BUCKET, "output_3.csv", DEFAULT_LINK_TTL).unwrap();

		let (path, query) = url.split_once('?').unwrap();
		assert_eq!(path, "http://127.0.0.1:5000/v1/download/output_3.csv");

		let expires: i64 = query.strip_prefix("expires=").unwrap().parse().unwrap();
		assert!(expires >= Utc::now().timestamp() + 290);
	}

	#[test]
	fn publish_stores_the_document_and_returns_a_link() {
		let store = MemoryObjectStore::default();
		let issuer = ExpiringLinkIssuer::new("http://127.0.0.1:5000");
		let keys: HashSet<String> = ["AAA", "BBB"].into_iter().map(str::to_owned).collect();

		let now = Local.with_ymd_and_hms(2026, 8, 30, 14, 5, 9).unwrap();
		let url = publish_csv(&store, &issuer, &keys, now, DEFAULT_LINK_TTL).unwrap();
		assert!(url.contains("/v1/download/output_20260830140509.csv"));

		let bytes = store.get(BUCKET, "output_20260830140509.csv").unwrap();
		assert_eq!(serializer::from_csv(&bytes).unwrap(), keys);
	}
}
