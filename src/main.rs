use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer};
use chrono::Utc;
use mongodb::Client;
use serde_json::json;
use tracing::{error, info};

mod auth;
mod error;
mod expenses;
mod ledger;
mod metadata;
mod money;
mod presenter;
mod schemas;
mod settlement;
mod shares;
mod store;

use crate::auth::TokenSecret;
use crate::store::Store;

struct Config {
    mongodb_uri: String,
    database: String,
    bind_addr: String,
    token_secret: String,
    cors_origin: Option<String>,
}

impl Config {
    fn from_env() -> Self {
        Config {
            mongodb_uri: std::env::var("MONGODB_URI")
                .expect("You need to add the MONGODB_URI to the env"),
            database: std::env::var("DATABASE_NAME").unwrap_or_else(|_| "gatherly".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            token_secret: std::env::var("TOKEN_SECRET")
                .expect("You need to add the TOKEN_SECRET to the env"),
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
        }
    }
}

#[get("/health")]
async fn health(store: web::Data<Store>) -> HttpResponse {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "OK",
            "database": "connected",
            "timestamp": Utc::now(),
        })),
        Err(err) => {
            error!(%err, "health check failed");
            HttpResponse::InternalServerError().json(json!({
                "status": "ERROR",
                "database": "disconnected",
                "timestamp": Utc::now(),
            }))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .expect("failed to connect");
    let store = Store::new(&client, &config.database);
    let secret = TokenSecret(config.token_secret.clone().into_bytes());
    info!(database = %config.database, addr = %config.bind_addr, "starting server");

    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                .allow_any_header()
                .supports_credentials(),
            None => Cors::permissive(),
        };
        App::new()
            .wrap(cors)
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(secret.clone()))
            .service(health)
            .service(expenses::settle_up)
            .service(expenses::mark_sent)
            .service(expenses::mark_received)
            .service(expenses::create_expense)
            .service(expenses::get_expense)
            .service(expenses::update_expense)
            .service(expenses::delete_expense)
            .service(expenses::get_expense_shares)
            .service(metadata::get_metadata)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}
