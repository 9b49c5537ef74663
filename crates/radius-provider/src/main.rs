use clap::Parser;
use radius_provider::{
    encode_attribute_payload, render_attributes, ProviderConfig, ProviderSnapshot,
};
use std::path::Path;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RADIUS provider core - client authorization and signed responses
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-provider")]
struct Cli {
    /// Path to configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config_path: String,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Print the accept attributes and their outpost payload
    #[arg(long)]
    attributes: bool,

    /// Check whether a source address is an authorized client
    #[arg(long, value_name = "ADDR")]
    check: Option<String>,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    let cli = Cli::parse();

    if !Path::new(&cli.config_path).exists() {
        init_tracing("info");
        warn!("Could not find config file: {}", cli.config_path);
        info!("Creating example configuration at: {}", cli.config_path);

        if let Err(e) = ProviderConfig::example().to_file(&cli.config_path) {
            error!("Error creating example config: {}", e);
            process::exit(1);
        }

        info!("Please edit {} and run again", cli.config_path);
        process::exit(0);
    }

    let config = match ProviderConfig::from_file(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation failed: {}", e);
            process::exit(1);
        }
    };

    init_tracing(config.log_level.as_deref().unwrap_or("info"));

    let snapshot = match config.compile() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    if cli.validate {
        print_summary(&config, &snapshot);
    }

    if cli.attributes {
        print_attributes(&snapshot);
    }

    if let Some(ref addr) = cli.check {
        match snapshot.networks().authorize_str(addr) {
            Ok(result) => match result.matched_prefix {
                Some(network) => println!("{} allowed by {}", addr.trim(), network),
                None => {
                    println!("{} not authorized", addr.trim());
                    process::exit(2);
                }
            },
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
    }

    if !cli.validate && !cli.attributes && cli.check.is_none() {
        info!(provider = %snapshot.name(), "Configuration loaded from {}", cli.config_path);
        info!("Use --validate, --attributes or --check <ADDR>");
    }
}

fn print_summary(config: &ProviderConfig, snapshot: &ProviderSnapshot) {
    println!("Configuration validated successfully");
    println!();
    println!("  Provider: {}", snapshot.name());
    println!("  Client networks: {}", snapshot.networks());
    println!("  MFA support: {}", snapshot.mfa_support());
    println!(
        "  Require Message-Authenticator: {}",
        snapshot.require_message_authenticator()
    );
    println!("  Strict RFC compliance: {}", config.strict_rfc_compliance);
    println!("  Log level: {}", config.log_level.as_deref().unwrap_or("info"));
    if let Some(ref path) = config.audit_log_path {
        println!("  Audit log: {}", path);
    }
    if let Some(ref path) = config.dictionary_path {
        println!("  Dictionary: {}", path);
    }
    println!(
        "  Vendors: {}, vendor attributes: {}",
        snapshot.dictionary().vendor_count(),
        snapshot.dictionary().attribute_count()
    );
}

fn print_attributes(snapshot: &ProviderSnapshot) {
    for line in render_attributes(snapshot.dictionary(), snapshot.accept_attributes()) {
        println!("{}", line);
    }

    match encode_attribute_payload(snapshot) {
        Ok(payload) => println!("{}", payload),
        Err(e) => {
            error!("Failed to encode attribute payload: {}", e);
            process::exit(1);
        }
    }
}
