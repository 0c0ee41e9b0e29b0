use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use marvin_core::{ChartDescriptor, ChartKind, Config, Conversation, Directive, TurnOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod client;
mod server;

use client::ChatClient;

#[derive(Parser)]
#[command(name = "marvin")]
#[command(about = "Streaming analytics chat assistant with inline chart and artifact directives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat server
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        addr: Option<String>,
        /// Delay between streamed tokens, in milliseconds
        #[arg(short, long)]
        pacing_ms: Option<u64>,
    },
    /// Ask a single question and stream the answer
    Ask {
        /// Your question
        question: String,
        /// Chat server URL
        #[arg(short, long)]
        url: Option<String>,
        /// Print resolved directives as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive multi-turn chat session
    Chat {
        /// Chat server URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Show or update the saved configuration
    Config {
        #[arg(short, long)]
        addr: Option<String>,
        #[arg(short, long)]
        pacing_ms: Option<u64>,
        #[arg(short, long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // `config` must stay usable when the saved file is what needs fixing.
    let config = match cli.command {
        Commands::Config { .. } => Config::load_or_default(),
        _ => Config::load()?,
    };

    match cli.command {
        Commands::Serve { addr, pacing_ms } => {
            let addr = addr.as_deref().unwrap_or(config.bind_addr());
            let pacing = pacing_ms.map(Duration::from_millis).unwrap_or(config.pacing());
            println!("🚀 Marvin ready on {}", format!("http://{}", addr).bold().cyan());
            server::serve(addr, pacing).await?
        }
        Commands::Ask { question, url, json } => {
            let client = ChatClient::new(url.as_deref().unwrap_or(config.server_url()));
            let mut conversation = Conversation::new();
            conversation.push_user(question);
            let outcome = run_turn(&client, &conversation).await?;
            if json {
                let directives: Vec<&Directive> = outcome.resolved.iter().map(|r| &r.directive).collect();
                println!("{}", serde_json::to_string_pretty(&directives)?);
            }
        }
        Commands::Chat { url } => {
            let client = ChatClient::new(url.as_deref().unwrap_or(config.server_url()));
            chat_session(&client).await?
        }
        Commands::Config { addr, pacing_ms, url } => update_config(config, addr, pacing_ms, url)?,
    }

    Ok(())
}

async fn chat_session(client: &ChatClient) -> Result<()> {
    println!("\n{}", "💬 Marvin chat (type 'exit' to quit)".bold().blue());

    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n{} ", "You:".bold().yellow());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        conversation.push_user(line);
        match run_turn(client, &conversation).await {
            Ok(outcome) => conversation.push_assistant(outcome.text),
            Err(e) => println!("{}: {}", "Error".red(), e),
        }
    }

    if let Some(summary) = conversation.summary() {
        println!("\n{} {}", "Session:".bold(), summary.title);
        println!("{} {}", "Last reply:".dimmed(), summary.last_message.dimmed());
    }

    Ok(())
}

/// Stream one reply, printing text as it settles, then render its directives.
async fn run_turn(client: &ChatClient, conversation: &Conversation) -> Result<TurnOutcome> {
    println!("\n{}", "Marvin:".bold().green());

    let mut printed = 0;
    let outcome = client
        .stream_reply(conversation.messages(), |_, parser| {
            let settled = parser.settled_text();
            if settled.len() > printed {
                print!("{}", &settled[printed..]);
                let _ = std::io::stdout().flush();
                printed = settled.len();
            }
        })
        .await?;

    if outcome.display_text.len() > printed {
        print!("{}", &outcome.display_text[printed..]);
    }
    println!();

    if !outcome.complete {
        println!("{}", "⚠️  Assistant response incomplete".yellow());
    }
    if outcome.malformed > 0 {
        println!("{}", format!("{} malformed frames skipped", outcome.malformed).dimmed());
    }

    for resolution in &outcome.resolved {
        match &resolution.directive {
            Directive::RenderChart(chart) => print_chart(chart),
            Directive::OpenArtifact { id } => open_artifact(client, id).await,
        }
    }

    Ok(outcome)
}

fn print_chart(chart: &ChartDescriptor) {
    let kind = match chart.kind {
        ChartKind::Line => "Line chart",
        ChartKind::Bar => "Bar chart",
        ChartKind::Pie => "Pie chart",
    };
    println!("\n📊 {}: {}", kind.bold().magenta(), chart.title.bold());

    if let (Some(labels), Some(values)) = (&chart.x_axis_data, &chart.series_data) {
        for (label, value) in labels.iter().zip(values) {
            println!("   {:<12} {}", label, value.to_string().cyan());
        }
    }
    if let Some(slices) = &chart.pie_data {
        for slice in slices {
            println!("   {:<12} {}", slice.name, slice.value.to_string().cyan());
        }
    }
}

async fn open_artifact(client: &ChatClient, id: &str) {
    match client.artifact(id).await {
        Ok(report) => {
            println!("\n📄 {} {}", report.title.bold().blue(), format!("({})", report.id).dimmed());
            println!("   {}", report.description);
            println!(
                "   {}",
                format!("Generated {}", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")).dimmed()
            );
            for chart in &report.charts {
                println!("   • {} ({} points)", chart.title, chart.len());
            }
            println!("   {}", "Key Insights".bold());
            for insight in &report.insights {
                println!("   • {}", insight);
            }
        }
        Err(e) => println!("{}: {}", "Could not open artifact".red(), e),
    }
}

fn update_config(
    mut config: Config,
    addr: Option<String>,
    pacing_ms: Option<u64>,
    url: Option<String>,
) -> Result<()> {
    let changed = addr.is_some() || pacing_ms.is_some() || url.is_some();
    if addr.is_some() {
        config.bind_addr = addr;
    }
    if pacing_ms.is_some() {
        config.pacing_ms = pacing_ms;
    }
    if url.is_some() {
        config.server_url = url;
    }

    if changed {
        let path = config.save()?;
        println!("✅ Saved {}", path.display());
    }

    println!("\n{}", "⚙️  Configuration".bold().blue());
    println!("  bind address: {}", config.bind_addr().green());
    println!("  pacing:       {} ms", config.pacing().as_millis().to_string().green());
    println!("  server url:   {}", config.server_url().green());

    Ok(())
}
