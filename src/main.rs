use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use namecast::channel::{Channel, SubscriptionConfig};
use namecast::config::{Config, ENV_API_URL, ENV_EVENTS_URL};
use namecast::logging::{default_log_path, init_tracing, LogTarget};
use namecast::publish::{PublishClient, PublishConfig};
use namecast::relay::Relay;
use namecast::view::{self, LinePrinter, ViewBinding};

#[derive(Parser, Debug)]
#[command(name = "namecast", version, about = "Publish a name and watch it change live")]
struct Cli {
    /// Config file (default: <config_dir>/namecast/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the subscription endpoint
    #[arg(long, global = true)]
    events_url: Option<String>,

    /// Override the publish endpoint
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive form showing the latest name
    Ui,
    /// Print the name every time it changes
    Watch {
        #[arg(long)]
        event: Option<String>,
    },
    /// Publish one name and exit
    Submit {
        name: String,
        #[arg(long)]
        event: Option<String>,
    },
    /// Run the reference relay server
    Relay {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = Config::load_with_env(&path, |key| match key {
        ENV_EVENTS_URL if cli.events_url.is_some() => cli.events_url.clone(),
        ENV_API_URL if cli.api_url.is_some() => cli.api_url.clone(),
        _ => std::env::var(key).ok(),
    })
    .with_context(|| format!("loading config from {}", path.display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = match cli.command {
        Command::Ui => LogTarget::File(
            default_log_path().unwrap_or_else(|| std::env::temp_dir().join("namecast.log")),
        ),
        _ => LogTarget::Stderr,
    };
    init_tracing(&target).context("initializing logging")?;

    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Ui => run_ui(&config).await,
        Command::Watch { event } => {
            let event = event.unwrap_or_else(|| config.view.event_name.clone());
            run_watch(&config, &event).await
        }
        Command::Submit { name, event } => {
            let event = event.unwrap_or_else(|| config.view.event_name.clone());
            run_submit(&config, &event, name).await
        }
        Command::Relay { bind } => {
            if let Some(bind) = bind {
                config.relay.bind_addr = bind;
            }
            run_relay(&config).await
        }
    }
}

async fn run_ui(config: &Config) -> Result<()> {
    let channel = Channel::open(SubscriptionConfig::from(config));
    let publisher =
        PublishClient::new(PublishConfig::from(config)).context("building publish client")?;
    let binding = ViewBinding::bind(
        &channel,
        publisher,
        &config.view.event_name,
        &config.view.field,
    );
    let result = view::run(&channel, binding).await;
    channel.close();
    result.context("running terminal UI")
}

async fn run_watch(config: &Config, event: &str) -> Result<()> {
    let channel = Channel::open(SubscriptionConfig::from(config));
    channel.on_error(|e| {
        if e.is_decode() {
            tracing::warn!(error = %e, "Ignoring undecodable message");
        }
    });
    let mut printer = LinePrinter::new(io::stdout(), config.view.field.clone());
    view::watch(&channel, event, &mut printer, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("writing to stdout")?;
    channel.close();
    Ok(())
}

async fn run_submit(config: &Config, event: &str, name: String) -> Result<()> {
    let client =
        PublishClient::new(PublishConfig::from(config)).context("building publish client")?;
    let mut payload = Map::new();
    payload.insert(config.view.field.clone(), Value::String(name));
    let ack = client
        .publish(event, &payload)
        .await
        .with_context(|| format!("publishing to {}", client.endpoint()))?;
    match ack.body {
        Some(body) => println!("{} {}", ack.status, body),
        None => println!("{}", ack.status),
    }
    Ok(())
}

async fn run_relay(config: &Config) -> Result<()> {
    let relay = Relay::bind(&config.relay)
        .await
        .context("starting relay")?
        .with_reset_event(config.subscription.reset_event.clone());
    eprintln!("namecast relay listening on http://{}", relay.local_addr());
    relay.run().await.context("serving relay")?;
    Ok(())
}
