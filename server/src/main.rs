use waypoint_server::{Config, Server, ServerState, init_logger_with_file};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 加载 .env (缺失时忽略)
    let _ = dotenv::dotenv();

    // 2. 初始化日志
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(
        std::env::var("LOG_LEVEL").ok().as_deref(),
        log_dir.as_deref(),
    );

    tracing::info!("Waypoint server starting...");

    // 3. 加载配置并初始化服务器状态
    let config = Config::from_env();
    let state = ServerState::initialize(&config).await?;

    // 4. 启动 HTTP 服务器
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
