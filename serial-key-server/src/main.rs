use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};

use chrono::{Local, Utc};
use log::{error, info};
use serde::Deserialize;

use serial_key_core::error::{GenerateError, StorageError};
use serial_key_core::keygen::generator::KeyGenerator;
use serial_key_core::keygen::request::GenerationRequest;
use serial_key_core::storage::{
	BUCKET, DEFAULT_LINK_TTL, ExpiringLinkIssuer, FsObjectStore, ObjectStore, publish_csv,
};

/// Issue counts at or above this use the threaded generation path.
const PARALLEL_THRESHOLD: usize = 100_000;

/// Struct representing query parameters for the `/v1/serial-keys` endpoint
///
/// Parameter names follow the public API: `ac` (allowed characters),
/// `skl` (serial key length), `ic` (issue count). `norepeat` enables the
/// non-repeating-adjacent mode by mere presence, whatever its value.
#[derive(Deserialize)]
struct SerialKeyParams {
	ac: Option<String>,
	skl: Option<usize>,
	ic: Option<usize>,
	norepeat: Option<String>,
}

/// Query parameters for the `/v1/download/{object}` endpoint.
#[derive(Deserialize)]
struct DownloadParams {
	expires: Option<i64>,
}

struct AppState {
	store: FsObjectStore,
	issuer: ExpiringLinkIssuer,
}

/// HTTP GET endpoint `/v1/serial-keys`
///
/// Generates the requested number of unique serial keys, stores them as a
/// single-column CSV document and returns a time-limited download URL as
/// the response body.
///
/// Responses:
/// - 200 with the retrieval URL on success
/// - 400 for missing parameters, an oversized issue count, an invalid
///   alphabet, or an exhausted key space
/// - 502 if the document could not be stored (no URL is fabricated)
#[get("/v1/serial-keys")]
async fn get_serial_keys(
	data: web::Data<AppState>,
	query: web::Query<SerialKeyParams>,
) -> impl Responder {
	let (alphabet, length, count) = match (&query.ac, query.skl, query.ic) {
		(Some(alphabet), Some(length), Some(count)) => (alphabet, length, count),
		_ => return HttpResponse::BadRequest().body(GenerateError::MissingParameter.to_string()),
	};

	let request = GenerationRequest {
		alphabet: alphabet.to_owned(),
		length,
		count,
		non_repeating: query.norepeat.is_some(),
	};

	let generator = match KeyGenerator::new(&request) {
		Ok(generator) => generator,
		Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
	};

	let keys = if count >= PARALLEL_THRESHOLD {
		generator.generate_parallel()
	} else {
		generator.generate(&mut rand::rng())
	};

	let keys = match keys {
		Ok(keys) => keys,
		Err(e @ GenerateError::Storage(_)) => {
			return HttpResponse::BadGateway().body(e.to_string());
		}
		Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
	};
	info!("Generated {} serial keys of length {}", keys.len(), length);

	match publish_csv(&data.store, &data.issuer, &keys, Local::now(), DEFAULT_LINK_TTL) {
		Ok(url) => HttpResponse::Ok().body(url),
		Err(e @ GenerateError::Storage(_)) => {
			error!("Failed to store the generated document: {e}");
			HttpResponse::BadGateway().body(e.to_string())
		}
		Err(e) => {
			error!("Failed to serialize the generated document: {e}");
			HttpResponse::InternalServerError().body(e.to_string())
		}
	}
}

/// HTTP GET endpoint `/v1/download/{object}`
///
/// Serves a stored CSV document, honoring the expiry timestamp embedded in
/// the issued link. Requests without an `expires` parameter or past the
/// timestamp are refused.
#[get("/v1/download/{object}")]
async fn get_download(
	data: web::Data<AppState>,
	path: web::Path<String>,
	query: web::Query<DownloadParams>,
) -> impl Responder {
	let expires = match query.expires {
		Some(expires) => expires,
		None => return HttpResponse::Forbidden().body("Missing link expiry."),
	};
	if expires < Utc::now().timestamp() {
		return HttpResponse::Forbidden().body("The link has expired.");
	}

	match data.store.get(BUCKET, &path) {
		Ok(bytes) => HttpResponse::Ok().content_type("text/csv").body(bytes),
		Err(StorageError::NotFound(_)) => HttpResponse::NotFound().body("Object not found."),
		// Traversal attempts get the same answer as a missing object.
		Err(StorageError::InvalidObjectName(_)) => {
			HttpResponse::NotFound().body("Object not found.")
		}
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// Main entry point for the server.
///
/// Wires the file-system object store and the expiring link issuer into the
/// shared state and starts an Actix-web HTTP server with the generation and
/// download endpoints.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Documents land under ./data/serial-key-generator/.
/// - Request logging goes through env_logger (RUST_LOG, default info).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let state = web::Data::new(AppState {
		store: FsObjectStore::new("./data"),
		issuer: ExpiringLinkIssuer::new("http://127.0.0.1:5000"),
	});

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(state.clone())
			.service(get_serial_keys)
			.service(get_download)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
