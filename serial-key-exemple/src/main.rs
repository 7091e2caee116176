use chrono::Local;
use rand::SeedableRng;
use rand::rngs::StdRng;

use serial_key_core::keygen::generator::KeyGenerator;
use serial_key_core::keygen::request::GenerationRequest;
use serial_key_core::storage::{
    DEFAULT_LINK_TTL, ExpiringLinkIssuer, MemoryObjectStore, ObjectStore, publish_csv,
};
use serial_key_core::{serializer, storage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build a request: 31 allowed characters, 15-character keys, 100 keys.
    // The fourth parameter enables the non-repeating-adjacent mode.
    let request = GenerationRequest::new("ABCDEFGHJKLMNPRTUVWXY123456789", 15, 100, false)?;

    // The random source is injected; a seeded generator makes the run
    // reproducible. Use rand::rng() for a fresh stream instead.
    let mut rng = StdRng::seed_from_u64(42);

    let generator = KeyGenerator::new(&request)?;
    let keys = generator.generate(&mut rng)?;
    println!("Generated {} unique serial keys", keys.len());
    for key in keys.iter().take(5) {
        println!("  {key}");
    }

    // Requesting non-repeating keys from a single-character alphabet is
    // rejected before any key is drawn
    match GenerationRequest::new("A", 5, 1, true) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Rejected as expected: {e}"),
    }

    // "AB" without adjacent repeats only ever yields 2 distinct keys,
    // so asking for 1024 fails fast instead of looping forever
    let impossible = GenerationRequest::new("AB", 10, 1024, true)?;
    match KeyGenerator::new(&impossible)?.generate(&mut rng) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Rejected as expected: {e}"),
    }

    // Serialize to CSV (one key per line, no header) and hand the document
    // to a store; the returned link embeds a 300-second expiry
    let store = MemoryObjectStore::default();
    let issuer = ExpiringLinkIssuer::new("http://127.0.0.1:5000");
    let now = Local::now();
    let url = publish_csv(&store, &issuer, &keys, now, DEFAULT_LINK_TTL)?;
    println!("Download link: {url}");

    // Read the document back through the store to close the loop
    let object = storage::output_object_name(now);
    let bytes = store.get(storage::BUCKET, &object)?;
    let restored = serializer::from_csv(&bytes)?;
    println!("Document holds {} keys", restored.len());

    Ok(())
}
