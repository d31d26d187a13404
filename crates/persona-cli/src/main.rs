//! Persona CLI
//!
//! Thin wrapper around persona-core functions for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Show store information
//! persona info
//!
//! # Create a persona (prints the recovery phrase once)
//! persona persona create --nickname "Me"
//!
//! # Restore a persona from its phrase
//! persona persona restore abandon abandon ... about
//!
//! # List personas
//! persona persona list
//!
//! # Record an account and link it to a persona
//! persona profile observe person:twitter/alice --nickname Alice
//! persona profile attach person:twitter/alice ec_key:secp256k1/<point> --state confirmed
//!
//! # Inspect an identifier
//! persona identifier decode person:twitter/alice
//!
//! # Import a legacy people snapshot
//! persona migrate people.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persona_core::keys::JsonWebKey;
use persona_core::{
    ConnectionConfirmState, Identifier, LegacySnapshot, LinkedProfileDetails, PersonaEngine,
    PersonaIdentifier, PersonaRecord, ProfileIdentifier, ProfileRecord,
};

/// Persona - identities you can rebuild from 12 words
#[derive(Parser)]
#[command(name = "persona")]
#[command(version = "0.1.0")]
#[command(about = "Persona - manage personas and the profiles linked to them")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.persona/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show store information
    Info,

    /// Persona management
    Persona {
        #[command(subcommand)]
        action: PersonaAction,
    },

    /// Profile management
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Identifier utilities
    Identifier {
        #[command(subcommand)]
        action: IdentifierAction,
    },

    /// Import a legacy people snapshot (JSON)
    Migrate {
        /// Path to the snapshot file
        snapshot: PathBuf,
        /// Run even if the migration already completed
        #[arg(long)]
        force: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PersonaAction {
    /// Create a new persona from a fresh mnemonic
    Create {
        /// Local display name
        #[arg(short, long)]
        nickname: Option<String>,
        /// Optional mnemonic password
        #[arg(short, long, default_value = "")]
        password: String,
    },
    /// Restore a persona from its mnemonic phrase
    Restore {
        /// The phrase words
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
        /// Mnemonic password used at creation
        #[arg(short, long, default_value = "")]
        password: String,
        /// Local display name
        #[arg(short, long)]
        nickname: Option<String>,
    },
    /// List personas
    List {
        /// Only personas with a private key on this device
        #[arg(long)]
        mine: bool,
    },
    /// Show persona details
    Show {
        /// Persona identifier (ec_key:secp256k1/...)
        persona_id: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Record a profile (no-op if already known)
    Observe {
        /// Profile identifier (person:<network>/<user>)
        profile_id: String,
        /// Display name
        #[arg(short, long)]
        nickname: Option<String>,
    },
    /// List profiles
    List,
    /// Show profile details
    Show {
        /// Profile identifier (person:<network>/<user>)
        profile_id: String,
    },
    /// Link a profile to a persona
    Attach {
        /// Profile identifier (person:<network>/<user>)
        profile_id: String,
        /// Persona identifier (ec_key:secp256k1/...)
        persona_id: String,
        /// Connection state: pending, confirmed, or denied
        #[arg(short, long, default_value = "pending")]
        state: String,
    },
}

#[derive(Subcommand)]
enum IdentifierAction {
    /// Decode an identifier and print its parts
    Decode {
        /// Canonical identifier text
        text: String,
    },
}

/// Set up tracing based on verbosity level
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".persona")
        .join("data")
}

/// Parse a persona identifier
fn parse_persona_id(s: &str) -> Result<PersonaIdentifier> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("Invalid persona ID '{}': {}", s, e))
}

/// Parse a profile identifier
fn parse_profile_id(s: &str) -> Result<ProfileIdentifier> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("Invalid profile ID '{}': {}", s, e))
}

/// Parse a connection state from string
fn parse_confirm_state(s: &str) -> Result<ConnectionConfirmState> {
    s.to_lowercase().parse().map_err(|_| {
        anyhow::anyhow!(
            "Invalid state '{}'. Must be one of: pending, confirmed, denied",
            s
        )
    })
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

fn print_persona(persona: &PersonaRecord) {
    println!("Persona: {}", persona.nickname.as_deref().unwrap_or("(unnamed)"));
    println!("  ID: {}", persona.identifier);
    println!("  Private key: {}", if persona.has_private_key() { "Yes" } else { "No" });
    println!("  Recoverable: {}", if persona.has_mnemonic() { "Yes" } else { "No" });
    println!("  Created: {}", format_timestamp(persona.created_at));
    if persona.linked_profiles.is_empty() {
        println!("  Profiles: none");
    } else {
        println!("  Profiles ({}):", persona.linked_profiles.len());
        for (profile, details) in &persona.linked_profiles {
            println!("    {} [{}]", profile, details.connection_confirm_state);
        }
    }
}

fn print_profile(profile: &ProfileRecord) {
    println!("Profile: {}", profile.identifier.friendly_text());
    println!("  ID: {}", profile.identifier);
    if let Some(nickname) = &profile.nickname {
        println!("  Nickname: {}", nickname);
    }
    match &profile.linked_persona {
        Some(persona) => println!("  Persona: {}", persona),
        None => println!("  Persona: (not linked)"),
    }
    println!("  Local key: {}", if profile.local_key.is_some() { "Yes" } else { "No" });
    println!("  Created: {}", format_timestamp(profile.created_at));
}

fn print_identifier(id: &Identifier) {
    println!("Kind: {}", id.kind());
    match id {
        Identifier::Profile(profile) => {
            println!("  Network: {}", profile.network());
            println!("  User: {}", profile.user_id());
            if profile.is_unknown() {
                println!("  (unknown profile)");
            }
        }
        Identifier::Group(group) => {
            println!("  Network: {}", group.network());
            println!("  Group: {}", group.group_id());
            match group.virtual_group_owner() {
                Some(owner) => println!("  Owner: {} (virtual)", owner),
                None => println!("  Owner: (real group)"),
            }
        }
        Identifier::Post(post) => {
            println!("  Post: {}", post.post_id());
            println!("  Inner: {}", post.inner());
        }
        Identifier::PostIv(post_iv) => {
            println!("  Network: {}", post_iv.network());
            println!("  IV: {}", post_iv.iv());
        }
        Identifier::EcKey(ec_key) => {
            println!("  Curve: {}", ec_key.curve());
            println!("  Point: {}", ec_key.compressed_point());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let engine = PersonaEngine::new(&data_dir).await?;

    match cli.command {
        Commands::Info => {
            let personas = engine.list_personas().await?;
            let mine = personas.iter().filter(|p| p.has_private_key()).count();
            let profiles = engine.list_profiles().await?;

            println!("Persona v0.1.0");
            println!();
            println!("Data directory: {}", engine.data_dir().display());
            println!("Personas: {} ({} owned)", personas.len(), mine);
            println!("Profiles: {}", profiles.len());
        }

        Commands::Persona { action } => match action {
            PersonaAction::Create { nickname, password } => {
                let (id, mnemonic) = engine
                    .create_persona_by_mnemonic(nickname.as_deref(), &password)
                    .await?;
                println!("Created persona");
                println!("  ID: {}", id);
                println!("  Path: {}", mnemonic.parameter.path);
                println!("  Mnemonic: {}", mnemonic.word);
                println!();
                println!("Write the mnemonic down. It is the only way to recover this persona.");
            }

            PersonaAction::Restore {
                words,
                password,
                nickname,
            } => {
                let phrase = words.join(" ");
                let persona = engine
                    .restore_persona_by_mnemonic(&phrase, &password, nickname.as_deref())
                    .await?;
                println!("Restored persona");
                println!("  ID: {}", persona.identifier);
            }

            PersonaAction::List { mine } => {
                let personas = if mine {
                    engine.my_personas().await?
                } else {
                    engine.list_personas().await?
                };
                if personas.is_empty() {
                    println!("No personas found.");
                } else {
                    println!("Personas ({}):", personas.len());
                    println!();
                    for persona in personas {
                        let owned = if persona.has_private_key() { " [owned]" } else { "" };
                        let name = persona.nickname.as_deref().unwrap_or("");
                        println!("  {} {}{}", persona.identifier, name, owned);
                    }
                }
            }

            PersonaAction::Show { persona_id } => {
                let id = parse_persona_id(&persona_id)?;
                match engine.query_persona(&id).await? {
                    Some(persona) => print_persona(&persona),
                    None => anyhow::bail!("Persona not found: {}", persona_id),
                }
            }
        },

        Commands::Profile { action } => match action {
            ProfileAction::Observe {
                profile_id,
                nickname,
            } => {
                let id = parse_profile_id(&profile_id)?;
                let profile = engine.observe_profile(&id, nickname.as_deref()).await?;
                println!("Observed profile");
                println!("  ID: {}", profile.identifier);
            }

            ProfileAction::List => {
                let profiles = engine.list_profiles().await?;
                if profiles.is_empty() {
                    println!("No profiles found.");
                } else {
                    println!("Profiles ({}):", profiles.len());
                    println!();
                    for profile in profiles {
                        let linked = if profile.linked_persona.is_some() { " [linked]" } else { "" };
                        let name = profile.nickname.as_deref().unwrap_or("");
                        println!("  {} {}{}", profile.identifier, name, linked);
                    }
                }
            }

            ProfileAction::Show { profile_id } => {
                let id = parse_profile_id(&profile_id)?;
                match engine.query_profile(&id).await? {
                    Some(profile) => print_profile(&profile),
                    None => anyhow::bail!("Profile not found: {}", profile_id),
                }
            }

            ProfileAction::Attach {
                profile_id,
                persona_id,
                state,
            } => {
                let profile = parse_profile_id(&profile_id)?;
                let persona = parse_persona_id(&persona_id)?;
                let state = parse_confirm_state(&state)?;
                engine
                    .attach_profile(&profile, &persona, LinkedProfileDetails::with_state(state))
                    .await?;
                println!("Attached {} to {} [{}]", profile, persona, state);
            }
        },

        Commands::Identifier { action } => match action {
            IdentifierAction::Decode { text } => match engine.codec().decode(&text) {
                Some(id) => print_identifier(&id),
                None => anyhow::bail!("Not an identifier: {}", text),
            },
        },

        Commands::Migrate {
            snapshot,
            force,
            json,
        } => {
            let contents = std::fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to read {}", snapshot.display()))?;
            let legacy: LegacySnapshot = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid snapshot {}", snapshot.display()))?;
            let local_keys = |id: &ProfileIdentifier| -> Option<JsonWebKey> { legacy.local_key(id) };

            let report = if force {
                Some(engine.migrate_legacy(&legacy, &local_keys).await?)
            } else {
                engine.migrate_legacy_once(&legacy, &local_keys).await?
            };

            match report {
                None => println!("Migration already completed. Use --force to run it again."),
                Some(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
                Some(report) => {
                    println!("Migration complete");
                    println!("  Personas created: {}", report.personas_created);
                    println!("  Profiles created: {}", report.profiles_created);
                    println!("  Links attached: {}", report.links_attached);
                    for failure in &report.failures {
                        println!("  Failed: {} ({})", failure.subject, failure.reason);
                    }
                    for conflict in &report.conflicts {
                        println!("  Conflict: {:?}", conflict);
                    }
                }
            }
        }
    }

    Ok(())
}
