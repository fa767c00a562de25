use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};

use taskdesk::auth::{AuthMiddleware, AuthService};
use taskdesk::config::Config;
use taskdesk::{db, routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    if config.jwt_secret.is_none() {
        error!("JWT_SECRET is not set; every authenticated request will be rejected");
    }

    let pool = match db::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };
    if let Err(e) = db::run_migrations(&pool).await {
        error!("Failed to run migrations: {}", e);
        return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }

    std::fs::create_dir_all(&config.upload_dir)?;

    let auth_service = web::Data::new(AuthService::new(config.auth_settings()));
    let pool_data = web::Data::new(pool);
    let config_data = web::Data::new(config.clone());

    info!("Starting TaskDesk server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(auth_service.clone())
            .app_data(config_data.clone())
            .wrap(routes::cors(config_data.client_url.as_deref()))
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(Files::new("/uploads", &config_data.upload_dir))
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
