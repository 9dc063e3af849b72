use memeflow::{
    logger::{self, LoggerConfig},
    server, Config,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::from_env())?;

    if env_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env()?;

    logger::log_startup_info(
        server::SERVICE_NAME,
        server::VERSION,
        &config.server.host,
        config.server.port,
    );
    logger::log_config_info(&config);

    server::run(config).await?;

    log::info!("👋 Server stopped");
    Ok(())
}
