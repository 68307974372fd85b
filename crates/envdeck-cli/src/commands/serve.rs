use anyhow::Result;
use envdeck_core::Config;
use envdeck_server::AppState;
use std::path::PathBuf;

pub fn execute(port: Option<u16>, config_path: Option<PathBuf>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut config = Config::load(config_path.as_deref())?;
        if let Some(port) = port {
            config.port = port;
        }

        println!("🚀 Starting envdeck on port {}", config.port);
        println!(
            "   Profile-manager API expected on port {}",
            config.profile_api_port
        );
        if !config.any_model_configured() {
            println!("⚠️  No AI API keys configured; AI endpoints will report disabled models");
        }

        let state = AppState::new(config);
        envdeck_server::serve(state).await?;
        Ok(())
    })
}
