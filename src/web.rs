#![cfg(not(tarpaulin_include))]

use env_logger::Env;
use std::env;
use vizboard::app;

/// Main entry point for the web application
///
/// Initializes logging, then starts the dashboard server. The listen port
/// can be given as the first command-line argument (default 3000).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    let mut port: u16 = 3000;
    if args.len() >= 2 {
        port = args[1].parse().unwrap_or(3000);
    }

    app::run(port).await
}
