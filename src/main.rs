use actix_web::middleware::{Logger, from_fn};
use actix_web::{App, HttpServer, web};

use ratemylifedecision::config::Config;
use ratemylifedecision::middleware::{cors, ip_rate_limit, security_headers};
use ratemylifedecision::rate_limit::RateLimits;
use ratemylifedecision::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let port = config.port;
    let config_data = web::Data::new(config);
    let pool_data = web::Data::new(pool);
    let limits = web::Data::new(RateLimits::new());

    log::info!("Starting server at http://0.0.0.0:{port}");

    HttpServer::new(move || {
        App::new()
            // Wraps run outside-in from the last registered: logging, security
            // headers, CORS, the IP rate limit, then route dispatch.
            .wrap(from_fn(ip_rate_limit))
            .wrap(from_fn(cors))
            .wrap(from_fn(security_headers))
            .wrap(Logger::default())
            .app_data(config_data.clone())
            .app_data(pool_data.clone())
            .app_data(limits.clone())
            .configure(handlers::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
