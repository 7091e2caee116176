use std::collections::HashSet;

use csv::{ReaderBuilder, WriterBuilder};

/// Serializes a key set to CSV bytes: one key per record, a single column,
/// no header. Key order is not preserved (the set carries no ordering).
pub fn to_csv(keys: &HashSet<String>) -> Result<Vec<u8>, csv::Error> {
	let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());

	for key in keys {
		writer.write_record([key.as_str()])?;
	}

	writer
		.into_inner()
		.map_err(|e| csv::Error::from(e.into_error()))
}

/// Parses a single-column CSV document back into a key set.
///
/// Inverse of [`to_csv`] up to ordering; used for the round-trip property
/// and by consumers re-reading a stored document.
pub fn from_csv(bytes: &[u8]) -> Result<HashSet<String>, csv::Error> {
	let mut reader = ReaderBuilder::new().has_headers(false).from_reader(bytes);

	let mut keys = HashSet::new();
	for record in reader.records() {
		let record = record?;
		if let Some(key) = record.get(0) {
			keys.insert(key.to_owned());
		}
	}

	Ok(keys)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn writes_one_key_per_line_without_header() {
		let keys = HashSet::from(["KEY1".to_owned()]);
		let bytes = to_csv(&keys).unwrap();
		assert_eq!(String::from_utf8(bytes).unwrap(), "KEY1\n");
	}

	#[test]
	fn round_trip_preserves_the_set() {
		let keys: HashSet<String> = ["A7X", "B2K", "C9M", "D4T"]
			.into_iter()
			.map(str::to_owned)
			.collect();

		let bytes = to_csv(&keys).unwrap();
		assert_eq!(from_csv(&bytes).unwrap(), keys);
	}

	#[test]
	fn empty_set_serializes_to_empty_document() {
		let bytes = to_csv(&HashSet::new()).unwrap();
		assert!(bytes.is_empty());
		assert!(from_csv(&bytes).unwrap().is_empty());
	}
}
