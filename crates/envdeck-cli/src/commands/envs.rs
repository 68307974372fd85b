use anyhow::Result;
use console::style;
use envdeck_client::{ProfileApi, ProfileApiClient, ProfileApiConfig};
use envdeck_core::Config;
use std::path::PathBuf;

pub fn execute(
    config_path: Option<PathBuf>,
    group: Option<String>,
    groups: bool,
    json: bool,
) -> Result<()> {
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

        if client.probe().await.is_none() {
            anyhow::bail!(
                "no reachable profile API on port {}; is the desktop application running?",
                config.profile_api_port
            );
        }

        if groups {
            return list_groups(&client, json).await;
        }

        let environments = client.list_environments(group.as_deref()).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&environments)?);
            return Ok(());
        }

        println!(
            "{:<20} {:<28} {:<10} {:<16}",
            style("ID").bold(),
            style("NAME").bold(),
            style("SERIAL").bold(),
            style("GROUP").bold()
        );
        for env in &environments {
            println!(
                "{:<20} {:<28} {:<10} {:<16}",
                env.user_id, env.name, env.serial_number, env.group_name
            );
        }
        println!();
        println!("{} environments", environments.len());
        Ok(())
    })
}

async fn list_groups(client: &ProfileApiClient, json: bool) -> Result<()> {
    let groups = client.list_groups().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    println!("{:<16} {:<28}", style("ID").bold(), style("NAME").bold());
    for group in &groups {
        println!("{:<16} {:<28}", group.group_id, group.group_name);
    }
    println!();
    println!("{} groups", groups.len());
    Ok(())
}
