use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use log::{error, info};

use wort::api;
use wort::config::Config;
use wort::sqlite_database::SqliteDatabase;

fn build_http(database: SqliteDatabase, config: &Config) -> std::io::Result<actix_web::dev::Server> {
    let db = web::Data::new(database);
    let config_data = web::Data::new(config.clone());
    let html_dir = config.html_dir.clone();

    let srv = HttpServer::new(move || {
        App::new()
            .configure(api::routes::<SqliteDatabase>)
            .configure(|cfg| api::frontend(cfg, &html_dir))
            .default_service(web::route().to(api::not_found))
            .wrap(Logger::default())
            .app_data(db.clone())
            .app_data(config_data.clone())
    })
    .bind(config.listen_addr())?
    .shutdown_timeout(60)
    .run();

    Ok(srv)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::parse();

    let database = match SqliteDatabase::open(&config.database_file) {
        Ok(database) => database,
        Err(err) => {
            error!("Could not open {}: {}", config.database_file.display(), err);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", config.listen_addr());
    build_http(database, &config)?.await?;

    info!("Server stopped");
    Ok(())
}
