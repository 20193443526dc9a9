use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = taskretro_server::config::Config::from_env()?;
    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
    taskretro_server::web::start_web_server(config).await
}
