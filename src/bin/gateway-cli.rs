use clap::{Parser, Subcommand, ValueEnum};
use rand::RngCore;
use std::path::PathBuf;

use admission_gateway::config::loader::load_config;
use admission_gateway::lifecycle::startup::assemble;
use admission_gateway::security::clock::SystemClock;
use admission_gateway::SecuritySettings;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator tooling for the admission gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random secret for one of the gateway's environment variables
    Keygen {
        #[arg(value_enum)]
        kind: SecretKind,
    },
    /// Parse and validate a configuration file, then list its routes
    CheckConfig { path: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum SecretKind {
    /// PUBLIC_API_KEY: `usk_` followed by 64 hex characters
    ApiKey,
    /// INTERNAL_API_SECRET: 128 hex characters
    InternalSecret,
    /// JWT signing secret: 128 hex characters
    JwtSecret,
}

impl SecretKind {
    fn generate(self) -> String {
        match self {
            SecretKind::ApiKey => format!("usk_{}", random_hex(32)),
            SecretKind::InternalSecret | SecretKind::JwtSecret => random_hex(64),
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            SecretKind::ApiKey => "PUBLIC_API_KEY",
            SecretKind::InternalSecret => "INTERNAL_API_SECRET",
            SecretKind::JwtSecret => "JWT_SECRET",
        }
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { kind } => {
            println!("{}={}", kind.env_var(), kind.generate());
        }
        Commands::CheckConfig { path } => {
            let config = load_config(&path)?;
            let gateway = assemble(
                config.clone(),
                SecuritySettings::from_env(),
                std::sync::Arc::new(SystemClock),
            )?;

            println!("Configuration OK: {}", path.display());
            println!(
                "Profiles: {}",
                gateway
                    .control
                    .profiles()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            for route in &config.routes {
                println!(
                    "  {} (priority {}): host={} prefix={} -> {}",
                    route.name,
                    route.priority,
                    route.host.as_deref().unwrap_or("*"),
                    route.path_prefix.as_deref().unwrap_or("/"),
                    route.profile
                );
            }
            match &config.default_profile {
                Some(profile) => println!("  (default) -> {}", profile),
                None => println!("  (default) -> 404"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_format() {
        let key = SecretKind::ApiKey.generate();
        assert!(key.starts_with("usk_"));
        assert_eq!(key.len(), 4 + 64);
        assert!(key[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_secrets_are_128_hex_and_distinct() {
        let a = SecretKind::InternalSecret.generate();
        let b = SecretKind::JwtSecret.generate();
        assert_eq!(a.len(), 128);
        assert_eq!(b.len(), 128);
        assert_ne!(a, b);
    }
}
