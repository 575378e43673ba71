//! CLI application for controlling Hue lights.
//!
//! The first run discovers the bridge and registers a user; press the bridge
//! link button beforehand. Pass `--store` to keep the credential between runs.
//!
//! Run with: cargo run --example hue_cli -- --help

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hue_command_rs::{
    Brightness, ConnectOptions, FileStore, HttpTransport, LightRef, NUPNP_URL, RetryPolicy,
    connect, discover_bridges,
};

#[derive(Parser)]
#[command(name = "hue-cli")]
#[command(about = "Control Philips Hue lights from the command line", long_about = None)]
struct Cli {
    /// Bridge address; discovered when omitted
    #[arg(short, long, global = true)]
    address: Option<String>,

    /// Username issued by the bridge; registers a new one when omitted
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// File to persist the session in
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Registration attempts after the first one [default: 30, or the stored policy]
    #[arg(long, global = true)]
    retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bridges known to the discovery service
    Discover,

    /// List every light
    List,

    /// Show one light, by id or name
    Show { light: String },

    /// Turn a light on
    On { light: String },

    /// Turn a light off
    Off { light: String },

    /// Set brightness (1-254)
    Brightness {
        light: String,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=254))]
        level: u8,
    },

    /// Rename a light
    Rename { light: String, name: String },
}

/// Numeric arguments address lights by id, anything else by name.
fn light_ref(arg: &str) -> LightRef {
    match arg.parse::<u32>() {
        Ok(id) => LightRef::Id(id),
        Err(_) => LightRef::Name(arg.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Discover = cli.command {
        println!("Asking {NUPNP_URL} for bridges...");
        let bridges = discover_bridges(&HttpTransport::default(), NUPNP_URL).await?;
        if bridges.is_empty() {
            println!("No bridges found.");
        } else {
            println!("\nFound {} bridge(s):", bridges.len());
            for bridge in bridges {
                println!("  ID: {:18}  Address: {}", bridge.id, bridge.address());
            }
        }
        return Ok(());
    }

    let mut options = ConnectOptions::default();
    if let Some(total) = cli.retries {
        options = options.retries(RetryPolicy {
            total,
            ..RetryPolicy::default()
        });
    }
    if let Some(address) = cli.address {
        options = options.address(address);
    }
    if let Some(username) = cli.username {
        options = options.username(username);
    }
    let persist = cli.store.is_some();
    if let Some(path) = cli.store {
        options = options.store(Box::new(FileStore::new(path)));
    }

    let hue = connect(options);
    let connection = hue.connection().await?;
    println!(
        "Connected to {} as {}",
        connection.address(),
        connection.username()
    );
    if persist {
        hue.state().save();
    }

    let lights = hue.lights();
    match cli.command {
        Commands::Discover => unreachable!(),

        Commands::List => {
            for (id, light) in lights.all().await? {
                let power = match light.is_on() {
                    Some(true) => "ON",
                    Some(false) => "OFF",
                    None => "?",
                };
                println!(
                    "  {:>3}  {:24}  {}",
                    id,
                    light.name().unwrap_or("-"),
                    power
                );
            }
        }

        Commands::Show { light } => match lights.get(light_ref(&light)).value().await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => eprintln!("No light matches {light}"),
        },

        Commands::On { light } => match lights.get(light_ref(&light)).on().await? {
            Some(_) => println!("Light turned ON"),
            None => eprintln!("No light matches {light}"),
        },

        Commands::Off { light } => match lights.get(light_ref(&light)).off().await? {
            Some(_) => println!("Light turned OFF"),
            None => eprintln!("No light matches {light}"),
        },

        Commands::Brightness { light, level } => {
            let brightness = Brightness::clamped(level);
            match lights.get(light_ref(&light)).set_brightness(brightness).await? {
                Some(bri) => println!("Brightness set to {bri}"),
                None => eprintln!("No light matches {light}"),
            }
        }

        Commands::Rename { light, name } => {
            match lights.get(light_ref(&light)).rename(&name).await? {
                Some(name) => println!("Light renamed to {name}"),
                None => eprintln!("No light matches {light}"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_only_when_given() {
        let cli = Cli::try_parse_from(["hue-cli", "--store", "hue.json", "list"]).unwrap();
        assert_eq!(cli.retries, None);

        let cli = Cli::try_parse_from(["hue-cli", "list", "--retries", "3"]).unwrap();
        assert_eq!(cli.retries, Some(3));
    }
}
