use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dhcpserve::{Config, DhcpRequest, DhcpServer, FixedAddressHandler, Result};

#[derive(Parser)]
#[command(name = "dhcpserve")]
#[command(author, version, about = "A fixed-address DHCP responder", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run,
    ShowConfig,
    /// Print the decoded fields of a raw DHCP packet file
    Decode {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = Config::load_or_create(&cli.config)?;
            info!("Starting DHCP server with config: {:?}", cli.config);

            let handler = FixedAddressHandler::from_config(&config);
            let server = DhcpServer::new(config, handler)?;

            tokio::select! {
                result = server.run() => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server...");
                    Ok(())
                }
            }
        }
        Commands::ShowConfig => {
            let config = Config::load_or_create(&cli.config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Decode { path } => {
            let data = std::fs::read(&path)?;
            print_request(&DhcpRequest::decode(&data)?)
        }
    }
}

fn print_request(request: &DhcpRequest) -> Result<()> {
    let packet = request.packet();

    let message_type = match request.message_type() {
        Some(message_type) => message_type.to_string(),
        None => format!("unknown ({})", request.message_type_code()),
    };

    println!("{:<16} {}", "Message type", message_type);
    println!("{:<16} {:02x?}", "Transaction ID", packet.xid);
    println!("{:<16} {}", "Client MAC", packet.format_mac());
    println!("{:<16} {}", "Broadcast flag", packet.is_broadcast());
    println!("{:<16} {}", "Magic cookie", packet.has_magic_cookie());
    println!("{:<16} {}", "ciaddr", packet.ciaddr);
    println!("{:<16} {}", "yiaddr", packet.yiaddr);
    println!("{:<16} {}", "siaddr", packet.siaddr);
    println!("{:<16} {}", "giaddr", packet.giaddr);

    if let Some(name) = packet.server_host_name() {
        println!("{:<16} {}", "Server name", name);
    }
    if let Some(file) = packet.boot_file_name() {
        println!("{:<16} {}", "Boot file", file);
    }
    if let Some(requested) = request.requested_ip() {
        println!("{:<16} {}", "Requested IP", requested);
    }
    if let Some(codes) = request.requested_options() {
        println!("{:<16} {:?}", "Requested codes", codes);
    }
    if let Some(relay) = request.relay_info()? {
        if let Some(circuit_id) = &relay.circuit_id {
            println!("{:<16} {:02x?}", "Circuit ID", circuit_id);
        }
        if let Some(remote_id) = &relay.remote_id {
            println!("{:<16} {:02x?}", "Remote ID", remote_id);
        }
    }

    println!();
    println!("{:<6} {:<6} Value", "Code", "Length");
    println!("{}", "-".repeat(40));
    for (code, value) in request.options() {
        println!("{:<6} {:<6} {:02x?}", code, value.len(), value);
    }

    Ok(())
}
