use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use sales_agent_client::config::Settings;
use sales_agent_client::session::generate_session_id;
use sales_agent_client::telemetry::init_tracing;
use sales_agent_client::SalesAgentClient;

/// Time allowed for the close frame to go out before the runtime stops
const CLOSE_GRACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;
    init_tracing(&settings.logging)?;
    tracing::info!("Configuration loaded");

    let session_id = settings
        .client
        .session_id
        .clone()
        .unwrap_or_else(generate_session_id);
    let options = settings.client.to_options(&session_id)?;
    tracing::info!(
        tenant_id = %options.endpoint.tenant_id(),
        session_id = %session_id,
        url = %options.endpoint.url(),
        "Starting sales agent chat"
    );

    let client = SalesAgentClient::with_websocket(options)?;
    client.on_status_change(|status| println!("* {}", status));
    client.on_message(|text| println!("agent> {}", text));
    client.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, closing session");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_line(&client, line.trim())? {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    client.disconnect();
    tokio::time::sleep(CLOSE_GRACE).await;
    tracing::info!("Chat session ended");
    Ok(())
}

/// Returns false when the user asked to quit.
fn handle_line(client: &SalesAgentClient, line: &str) -> Result<bool> {
    match line {
        "" => {}
        "/quit" => return Ok(false),
        "/stats" => println!("{}", serde_json::to_string_pretty(&client.stats())?),
        "/reconnect" => client.connect(),
        text => {
            // Submission is only offered while connected
            if client.status().is_connected() {
                client.send(text);
            } else {
                println!("* not connected ({}), message not sent", client.status());
            }
        }
    }
    Ok(true)
}
