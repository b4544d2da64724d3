use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    ConnectionManager, LiveTruckList, RenderedList, TruckFeedClient, TruckListProps, TruckSource,
};
use shared::protocol::TRUCKS_ENDPOINT;
use tracing::{info, warn};

mod config;

#[derive(Parser, Debug)]
#[command(about = "Live truck list for the simulation dashboard")]
struct Args {
    /// Feed server, e.g. http://127.0.0.1:8080
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = TRUCKS_ENDPOINT)]
    endpoint: String,
    /// Fetch the trucks once over HTTP and show those instead of the live rows.
    #[arg(long)]
    prefetch: bool,
    /// Reconnect this many seconds after the connection closes instead of exiting.
    #[arg(long)]
    reconnect_after_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let settings = config::load_settings(args.server_url.clone());

    let manager = ConnectionManager::websocket(&settings.server_url)
        .with_context(|| format!("invalid server url {}", settings.server_url))?;
    let source = if args.prefetch {
        let trucks = TruckFeedClient::new(settings.server_url.as_str())
            .fetch_trucks()
            .await
            .context("failed to prefetch trucks")?;
        info!(trucks = trucks.len(), "prefetched trucks");
        TruckSource::Props(TruckListProps::new(trucks))
    } else {
        TruckSource::Live
    };

    let mut list = LiveTruckList::mount(&manager, &args.endpoint, source)?;
    print!("{}", format_render(&list.render()));

    let reconnect_after = args.reconnect_after_secs.map(Duration::from_secs);
    loop {
        tokio::select! {
            rendered = list.next_render() => {
                let Some(rendered) = rendered else {
                    break;
                };
                print!("{}", format_render(&rendered));
                if !list.subscription().status().is_closed() {
                    continue;
                }
                let Some(delay) = reconnect_after else {
                    warn!(endpoint = list.subscription().endpoint(), "connection closed");
                    break;
                };
                info!(endpoint = list.subscription().endpoint(), delay_secs = delay.as_secs(), "connection closed, reconnecting");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        list.subscription().reconnect();
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    list.unmount();
    Ok(())
}

fn format_render(rendered: &RenderedList) -> String {
    let mut out = rendered.to_string();
    if !rendered.changes.is_empty() {
        let changes: Vec<String> = rendered.changes.iter().map(ToString::to_string).collect();
        out.push_str(&format!("changes: {}\n", changes.join(", ")));
    }
    out.push('\n');
    out
}
