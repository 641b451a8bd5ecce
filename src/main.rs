//! Chat relay binary
//!
//! Usage:
//!   cargo run -- server                    # Run the relay server
//!   cargo run -- server --port 5000        # Run on a specific port
//!   cargo run -- client --port 5000        # Connect the interactive client

use std::env;

use palaver::client::{ClientConfig, RelayClient};
use palaver::{RelayConfig, RelayServer};
use tracing::{error, info};

const DEFAULT_PORT: u16 = 5000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "server" => {
            let port = parse_port(&args);
            run_server(port).await?;
        }
        "client" => {
            let port = parse_port(&args);
            run_client(port).await?;
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!("Palaver - Line-Oriented TCP Chat Relay");
    println!();
    println!("USAGE:");
    println!("    cargo run -- <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    server              Start the relay server");
    println!("    client              Start the interactive client");
    println!("    help                Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>       Port to listen on / connect to (default: 5000)");
    println!();
    println!("CHAT COMMANDS (typed in the client):");
    println!("    /join <group_name>  Join a group (leaves your current one)");
    println!("    /leave              Leave your current group");
    println!("    /dm <IP:PORT> <msg> Message one client by address");
    println!("    /all <msg>          Message every connected client");
    println!("    <msg>               Message your current group");
    println!("    exit                Quit the client");
    println!();
    println!("EXAMPLES:");
    println!("    cargo run -- server");
    println!("    cargo run -- client --port 5000");
    println!("    RUST_LOG=debug cargo run -- server");
}

fn parse_port(args: &[String]) -> u16 {
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            if let Ok(port) = args[i + 1].parse() {
                return port;
            }
        }
    }
    DEFAULT_PORT
}

async fn run_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = RelayConfig {
        bind_addr: format!("0.0.0.0:{}", port).parse()?,
    };
    info!("Starting chat relay on {}", config.bind_addr);

    let server = RelayServer::new(config);
    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn run_client(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig {
        server_addr: format!("127.0.0.1:{}", port).parse()?,
    };

    let client = RelayClient::new(config);
    if let Err(e) = client.run().await {
        error!("Client error: {}", e);
        return Err(e.into());
    }
    Ok(())
}
