use actix_web::{middleware::Logger, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use employee_records::config::Config;
use employee_records::{db, routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().map_err(|err| {
        error!("{}", err);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
    })?;

    // One set of stores for the whole process, shared by every worker.
    let stores = db::connect(&config.database_url).await.map_err(|err| {
        error!("Failed to open the record store: {}", err);
        std::io::Error::new(std::io::ErrorKind::Other, err)
    })?;

    let (host, port) = config.bind_address();
    info!("Starting server at {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| routes::configure(cfg, &stores))
    })
    .bind((host, port))?
    .run()
    .await
}
