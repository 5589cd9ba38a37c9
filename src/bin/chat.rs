use std::io::Write;

use clap::Parser;
use provenance_chat::client::{send_message, ChatClient, ChatWidget, Sender};
use provenance_chat::config::ClientConfig;
use provenance_chat::init_tracing;
use tokio::io::{AsyncBufReadExt, BufReader};

const QUIT: &str = "/quit";

#[derive(Parser, Debug)]
#[command(name = "chat", about = "Terminal chat client for the provenance chat backend")]
struct Args {
    #[arg(long, help = "Chat endpoint, defaults to CHAT_URL or http://localhost:5000/chat")]
    url: Option<String>,
    #[arg(long, help = "Reuse an existing session id instead of generating one")]
    session: Option<String>,
}

fn prompt() {
    print!("> ");
    std::io::stdout().flush().ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = ClientConfig::from_env()?;

    let client = ChatClient::new(args.url.unwrap_or(config.chat_url), config.timeout_ms)?;
    let mut widget = match args.session {
        Some(id) => ChatWidget::new(id),
        None => ChatWidget::with_random_session(),
    };
    println!(
        "Connected to {} (session {}). Type {QUIT} to exit.",
        client.endpoint(),
        widget.session_id()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == QUIT {
            break;
        }

        let rendered = widget.transcript().len();
        widget.input = line;
        send_message(&mut widget, &client).await;

        for bubble in &widget.transcript().bubbles()[rendered..] {
            if bubble.sender == Sender::Bot {
                println!("{bubble}");
            }
        }
        prompt();
    }

    Ok(())
}
