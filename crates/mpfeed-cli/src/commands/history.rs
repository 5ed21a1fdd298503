use anyhow::{bail, Result};

use mpfeed_core::{sync::HistoryStart, AppConfig, RpcClient};

use super::running_server;

async fn server(config: &AppConfig) -> Result<RpcClient> {
    match running_server(config).await {
        Some(client) => Ok(client),
        None => bail!(
            "mpfeed server is not running at {}. Start it with 'mpfeed serve'.",
            config.local_url()
        ),
    }
}

pub async fn start(config: &AppConfig, id: &str) -> Result<()> {
    let client = server(config).await?;
    match client.start_history(id).await? {
        HistoryStart::Started => println!("Fetching history of {}...", id),
        HistoryStart::AlreadyRunning => println!("History of {} is already being fetched.", id),
        HistoryStart::NoHistory => println!("{} has no more history.", id),
        HistoryStart::Stopped => println!("History fetch stopped."),
    }
    Ok(())
}

pub async fn stop(config: &AppConfig) -> Result<()> {
    let client = server(config).await?;
    client.stop_history().await?;
    println!("History fetch stopped.");
    Ok(())
}

pub async fn status(config: &AppConfig) -> Result<()> {
    let client = server(config).await?;
    let progress = client.history_progress().await?;

    if progress.is_idle() {
        println!("No history fetch in progress.");
    } else {
        println!("Fetching history of {} (page {})", progress.id, progress.page);
    }
    Ok(())
}
