mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod utils;

use actix_web::{web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use log::{error, info};
use env_logger::Env;
use actix_web::middleware::Logger;
use actix_web_httpauth::middleware::HttpAuthentication;
use std::collections::HashMap;
use std::io;

use crate::config::Config;
use crate::utils::auth_client::AuthClient;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|msg| {
        error!("Invalid configuration: {}", msg);
        io::Error::new(io::ErrorKind::InvalidInput, msg)
    })?;

    // Initialize the database pool
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to the database: {}", e);
            io::Error::new(io::ErrorKind::ConnectionRefused, e)
        })?;

    let auth_client = AuthClient::new(reqwest::Client::new(), &config);

    let bind_address = config.bind_address.clone();
    info!("Starting server at {}", bind_address);

    // Authentication middleware
    let auth = HttpAuthentication::bearer(crate::utils::jwt::validator);

    // Set up Prometheus metrics
    let mut labels = HashMap::new();
    labels.insert("app".to_string(), "sanctuary".to_string());
    let prometheus = PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics")
        .const_labels(labels)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let config = web::Data::new(config);
    let pool = web::Data::new(pool);
    let auth_client = web::Data::new(auth_client);

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(prometheus.clone())
            .app_data(config.clone())
            .app_data(pool.clone())
            .app_data(auth_client.clone())
            .service(
                web::scope("/v1/auth")
                    .route("/signup", web::post().to(handlers::auth::signup))
                    .route("/login", web::post().to(handlers::auth::login))
                    .service(
                        web::resource("/logout")
                            .wrap(auth.clone())
                            .route(web::post().to(handlers::auth::logout)),
                    )
                    .service(
                        web::resource("/session")
                            .wrap(auth.clone())
                            .route(web::get().to(handlers::auth::session)),
                    ),
            )
            .service(
                web::resource("/v1/profile")
                    .wrap(auth.clone())
                    .route(web::get().to(handlers::profile::get_profile))
                    .route(web::patch().to(handlers::profile::update_profile)),
            )
            .service(
                web::resource("/v1/profile/reset")
                    .wrap(auth.clone())
                    .route(web::post().to(handlers::profile::reset_progress)),
            )
            .service(
                web::resource("/v1/study-logs")
                    .wrap(auth.clone())
                    .route(web::get().to(handlers::study_log::get_study_logs))
                    .route(web::post().to(handlers::study_log::create_study_log)),
            )
            .service(
                web::resource("/v1/xp/explain")
                    .route(web::get().to(handlers::study_log::explain)),
            )
            .service(
                web::resource("/v1/analytics")
                    .wrap(auth.clone())
                    .route(web::get().to(handlers::analytics::get_analytics)),
            )
            .service(
                web::resource("/v1/milestones")
                    .wrap(auth.clone())
                    .route(web::get().to(handlers::milestone::get_milestones)),
            )
            .service(
                web::resource("/v1/milestones/{milestoneId}/claim")
                    .wrap(auth.clone())
                    .route(web::post().to(handlers::milestone::claim_milestone)),
            )
            .service(
                web::resource("/v1/leaderboard")
                    .route(web::get().to(handlers::leaderboard::get_leaderboard)),
            )
            // Reads are public; writes validate the bearer token in `AuthUser`.
            .service(
                web::resource("/v1/forum/posts")
                    .route(web::get().to(handlers::forum::list_posts))
                    .route(web::post().to(handlers::forum::create_post)),
            )
            .service(
                web::resource("/v1/forum/posts/{postId}")
                    .route(web::get().to(handlers::forum::get_post))
                    .route(web::patch().to(handlers::forum::update_post))
                    .route(web::delete().to(handlers::forum::delete_post)),
            )
            .service(
                web::resource("/v1/forum/posts/{postId}/comments")
                    .wrap(auth.clone())
                    .route(web::post().to(handlers::forum::create_comment)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
