use anyhow::Result;
use console::style;
use envdeck_client::{ProfileApi, ProfileApiClient, ProfileApiConfig};
use envdeck_core::Config;
use std::path::PathBuf;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let config = Config::load(config_path.as_deref())?;
        let client = ProfileApiClient::new(ProfileApiConfig {
            port: config.profile_api_port,
            base_url: config.profile_api_url.clone(),
            ..ProfileApiConfig::default()
        });

        println!(
            "🔍 Probing the profile-manager API on port {}...",
            config.profile_api_port
        );
        match client.probe().await {
            Some(base_url) => {
                println!("✅ Profile API reachable at {base_url}");
                match client.list_environments(None).await {
                    Ok(envs) => println!("   {} environments known", envs.len()),
                    Err(e) => println!("⚠️  Environment listing failed: {e}"),
                }
            }
            None => {
                println!("❌ No reachable profile API");
                println!("   Is the desktop application running with its local API enabled?");
            }
        }

        println!();
        println!("AI keys:");
        println!("  OpenAI:   {}", configured_label(config.openai_api_key.is_some()));
        println!("  DeepSeek: {}", configured_label(config.deepseek_api_key.is_some()));
        Ok(())
    })
}

fn configured_label(configured: bool) -> String {
    if configured {
        style("configured").green().to_string()
    } else {
        style("not configured").dim().to_string()
    }
}
