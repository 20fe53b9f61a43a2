mod config;
mod database;
mod db;
mod error;
mod images;
pub mod maintenance;
mod models;
mod routes;
mod service;
mod storage;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::db::stage_db;
use crate::routes as app_routes;
use crate::service::gemini::GeminiClient;
use crate::storage::Storage;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use tracing_subscriber::EnvFilter;

/// Mount point for stored images; relative storage paths become URLs by
/// prefixing this.
pub const STATIC_MOUNT: &str = "/static";

pub fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG takes precedence for per-module control, e.g.
    //   RUST_LOG=info,tryon_api::service=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // try_init: tests build several rockets in one process.
    if json_format {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        panic!(
            "Invalid CORS configuration: Cannot use wildcard origins (*) with credentials enabled. \
            Either set specific origins or disable credentials."
        );
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Options, Method::Head]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Accept"]),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

pub fn build_rocket(config: Config) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);

    let cors = build_cors(&config.cors).to_cors().expect("Failed to create CORS fairing");

    let storage = Storage::new(&config.storage.root, config.generator.disallowed_formats.clone());
    let generator = GeminiClient::new(config.generator.clone());

    let mut rocket = rocket::build()
        .attach(cors)
        .attach(stage_db(config.database.clone()))
        .manage(storage)
        .manage(generator)
        .manage(config);

    for routes in [
        app_routes::health::routes(),
        app_routes::user::routes(),
        app_routes::product::routes(),
        app_routes::tryon::routes(),
        app_routes::files::routes(),
    ] {
        rocket = rocket.mount("/", routes);
    }

    rocket.register("/", app_routes::error::catchers())
}
