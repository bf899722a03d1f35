//! Legal Assist CLI
//!
//! Command-line interface for the Legal Assist API.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use legal_client::LegalClient;
use legal_types::{
    AccountId, ConversationId, RegisterClientRequest, RegisterLawyerRequest, UpdateLawyerRequest,
};

#[derive(Parser)]
#[command(name = "legal")]
#[command(author, version, about = "Legal Assist API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Legal Assist API
    #[arg(long, env = "LEGAL_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Bearer token from `legal login`
    #[arg(long, env = "LEGAL_API_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a client account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        country: String,
    },
    /// Log in and print a bearer token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Log in as a lawyer
        #[arg(long)]
        lawyer: bool,
    },
    /// Show the caller's profile and conversations
    Profile,
    /// Lawyer operations
    Lawyer {
        #[command(subcommand)]
        action: LawyerCommands,
    },
    /// Payment operations
    Pay {
        #[command(subcommand)]
        action: PayCommands,
    },
    /// Ask the legal assistant
    Chat {
        /// Message to send
        message: String,
        #[arg(long, default_value = "")]
        country: String,
        /// Continue an existing conversation (UUID)
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum LawyerCommands {
    /// Register a lawyer account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        specialization: Option<String>,
        /// Consultation charge in major currency units
        #[arg(long)]
        charge: Option<i64>,
        /// RFC 3339 timestamp
        #[arg(long)]
        available_from: Option<String>,
        /// RFC 3339 timestamp
        #[arg(long)]
        available_to: Option<String>,
    },
    /// List lawyers available right now
    Available,
    /// Show the calling lawyer's profile
    Profile,
    /// Update the calling lawyer's details
    Update {
        #[arg(long)]
        specialization: Option<String>,
        #[arg(long)]
        charge: Option<i64>,
        #[arg(long)]
        available_from: Option<String>,
        #[arg(long)]
        available_to: Option<String>,
    },
    /// List clients who booked the calling lawyer
    Clients,
}

#[derive(Subcommand)]
enum PayCommands {
    /// Open an order for the PREMIUM subscription
    Subscribe,
    /// Open an order for a consultation
    Consult {
        /// Lawyer account ID (UUID)
        lawyer: String,
    },
    /// Verify a checkout confirmation
    Verify {
        #[arg(long)]
        order: String,
        #[arg(long)]
        payment: String,
        #[arg(long)]
        signature: String,
    },
}

fn parse_account_id(s: &str) -> Result<AccountId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid account ID: {}", s))
}

fn parse_conversation_id(s: &str) -> Result<ConversationId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid conversation ID: {}", s))
}

fn parse_time(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| anyhow::anyhow!("Invalid timestamp: {}. Expected RFC 3339", s))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = LegalClient::new(&cli.api_url);
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Register {
            name,
            email,
            password,
            country,
        } => {
            let req = RegisterClientRequest {
                name,
                email,
                password,
                country,
            };
            let account = client.register_client(&req).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }

        Commands::Login {
            email,
            password,
            lawyer,
        } => {
            let login = client.login(&email, &password, lawyer).await?;
            println!("{}", login.token);
        }

        Commands::Profile => {
            let profile = client.profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }

        Commands::Lawyer { action } => match action {
            LawyerCommands::Register {
                name,
                email,
                password,
                country,
                phone,
                specialization,
                charge,
                available_from,
                available_to,
            } => {
                let req = RegisterLawyerRequest {
                    name,
                    email,
                    password,
                    country,
                    phone,
                    specialization,
                    charge,
                    available_from: parse_time(available_from)?,
                    available_to: parse_time(available_to)?,
                };
                let lawyer = client.register_lawyer(&req).await?;
                println!("{}", serde_json::to_string_pretty(&lawyer)?);
            }
            LawyerCommands::Available => {
                let lawyers = client.available_lawyers().await?;
                println!("{}", serde_json::to_string_pretty(&lawyers)?);
            }
            LawyerCommands::Profile => {
                let profile = client.lawyer_profile().await?;
                println!("{}", serde_json::to_string_pretty(&profile)?);
            }
            LawyerCommands::Update {
                specialization,
                charge,
                available_from,
                available_to,
            } => {
                let patch = UpdateLawyerRequest {
                    specialization,
                    charge,
                    available_from: parse_time(available_from)?,
                    available_to: parse_time(available_to)?,
                    ..Default::default()
                };
                let lawyer = client.update_lawyer(&patch).await?;
                println!("{}", serde_json::to_string_pretty(&lawyer)?);
            }
            LawyerCommands::Clients => {
                let clients = client.lawyer_clients().await?;
                println!("{}", serde_json::to_string_pretty(&clients)?);
            }
        },

        Commands::Pay { action } => match action {
            PayCommands::Subscribe => {
                let order = client.create_subscription_order().await?;
                println!("{}", serde_json::to_string_pretty(&order)?);
            }
            PayCommands::Consult { lawyer } => {
                let lawyer_id = parse_account_id(&lawyer)?;
                let order = client.create_consultation_order(lawyer_id).await?;
                println!("{}", serde_json::to_string_pretty(&order)?);
            }
            PayCommands::Verify {
                order,
                payment,
                signature,
            } => {
                let result = client.verify_payment(&order, &payment, &signature).await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        },

        Commands::Chat {
            message,
            country,
            conversation,
        } => {
            let conversation_id = conversation
                .as_deref()
                .map(parse_conversation_id)
                .transpose()?;
            let resp = client.send_chat(&message, &country, conversation_id).await?;
            println!("{}", resp.reply);
            println!("(conversation {})", resp.conversation_id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time(Some("2026-01-05T09:00:00Z".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(t.to_rfc3339(), "2026-01-05T09:00:00+00:00");
        assert!(parse_time(None).unwrap().is_none());
        assert!(parse_time(Some("tomorrow".to_string())).is_err());
    }

    #[test]
    fn test_chat_args() {
        let cli = Cli::try_parse_from([
            "legal",
            "--token",
            "jwt",
            "chat",
            "Is a verbal contract valid?",
            "--country",
            "India",
        ])
        .unwrap();
        assert_eq!(cli.token.as_deref(), Some("jwt"));
        assert!(matches!(cli.command, Commands::Chat { .. }));
    }
}
