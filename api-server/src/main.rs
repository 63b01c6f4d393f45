mod api;
mod models;
mod routes;

use log::info;
use models::config::Config;
use models::context::Context;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::sync::Arc;

const CONFIG_PATH_VAR: &str = "ALNVIEW_CONFIG";

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    TermLogger::init(
        config.log_level_filter(),
        ConfigBuilder::new().set_time_format_rfc3339().build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;
    info!("Loaded configuration from {}", config_path);

    let context = Arc::new(Context::new(config.clone()).await?);
    let schema = api::build_schema(Arc::clone(&context));

    let figment = rocket::Config::figment()
        .merge(("address", config.address().as_str()))
        .merge(("port", *config.port()));

    let _rocket = rocket::custom(figment)
        .manage(context)
        .manage(schema)
        .mount("/", routes::routes())
        .launch()
        .await?;

    Ok(())
}
