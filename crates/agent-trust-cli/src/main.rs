//! AgentTrust CLI: `agent-trust` command.
//!
//! Provides a command-line interface for issuing and inspecting sealed
//! agent trust tokens and for managing per-user trust settings.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::debug;
use serde::Serialize;

use agent_trust::crypto::random;
use agent_trust::time;
use agent_trust::{
    ChannelSecret, FileSettingsStore, HmacChannel, Principal, TokenVerification, TrustConfig,
    TrustEvaluator, TrustSettings, TrustSettingsStore, TrustToken, UserId,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn trust_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set")?;
    Ok(PathBuf::from(home).join(".agent-trust"))
}

fn default_store_dir() -> Result<PathBuf> {
    Ok(trust_home()?.join("settings"))
}

// ── Formatting helpers ────────────────────────────────────────────────────────

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn format_days(days: Option<f64>) -> String {
    days.map(|d| format!("{d} days"))
        .unwrap_or_else(|| "no limit".to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// AgentTrust CLI: issue, inspect and revoke sealed agent trust tokens.
#[derive(Parser, Debug)]
#[command(
    name = "agent-trust",
    about = "AgentTrust CLI",
    version,
    long_about = "agent-trust: AgentTrust CLI\n\nIssue and inspect sealed agent trust tokens, revoke a user's\nagents, and manage per-user trust settings."
)]
struct Cli {
    /// Trust configuration file (JSON)
    #[arg(long, global = true, env = "AGENT_TRUST_CONFIG")]
    config: Option<PathBuf>,

    /// Settings store directory (default: ~/.agent-trust/settings)
    #[arg(long, global = true, env = "AGENT_TRUST_STORE")]
    store: Option<PathBuf>,

    /// Hex-encoded channel secret
    #[arg(long, global = true, env = "AGENT_TRUST_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue a sealed trust token for a user's agent
    Issue {
        /// User identity
        #[arg(long)]
        user: String,

        /// Cap trust in this agent at this many days
        #[arg(long)]
        days: Option<f64>,

        /// Trust only while this session token is current
        #[arg(long, conflicts_with = "days")]
        session: Option<String>,
    },

    /// Decode and verify a sealed trust token
    Inspect {
        /// User identity the token was presented for
        #[arg(long)]
        user: String,

        /// Session token currently held by the server
        #[arg(long)]
        session: Option<String>,

        /// Sealed token value
        blob: String,
    },

    /// Revoke every agent the user has trusted so far
    RevokeOthers {
        /// User identity
        #[arg(long)]
        user: String,
    },

    /// Manage per-user trust settings
    Settings {
        #[command(subcommand)]
        subcommand: SettingsCommands,
    },

    /// Print the transport channel name for a user
    ChannelName {
        /// User identity
        #[arg(long)]
        user: String,
    },

    /// Generate a fresh channel secret
    GenSecret,
}

#[derive(Subcommand, Debug)]
enum SettingsCommands {
    /// Show a user's trust settings
    Show {
        /// User identity
        #[arg(long)]
        user: String,
    },

    /// Change a user's trust settings
    Set {
        /// User identity
        #[arg(long)]
        user: String,

        /// Days this user's agents stay trusted
        #[arg(long, conflicts_with = "clear_trust_days")]
        trust_days: Option<f64>,

        /// Days a token may go unused before it lapses
        #[arg(long, conflicts_with = "clear_inactivity_days")]
        inactivity_days: Option<f64>,

        /// Remove the user's trust limit
        #[arg(long)]
        clear_trust_days: bool,

        /// Remove the user's inactivity limit
        #[arg(long)]
        clear_inactivity_days: bool,
    },
}

/// Global options shared by every command.
struct Globals {
    config: Option<PathBuf>,
    store: Option<PathBuf>,
    secret: Option<String>,
    json: bool,
}

impl Globals {
    fn load_config(&self) -> Result<TrustConfig> {
        match &self.config {
            Some(path) => TrustConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display())),
            None => {
                debug!("No config file given, using defaults");
                Ok(TrustConfig::default())
            }
        }
    }

    fn open_store(&self) -> Result<FileSettingsStore> {
        let dir = match &self.store {
            Some(dir) => dir.clone(),
            None => default_store_dir()?,
        };
        debug!("Opening settings store at {}", dir.display());
        FileSettingsStore::new(&dir)
            .with_context(|| format!("failed to open settings store {}", dir.display()))
    }

    fn evaluator(&self) -> Result<TrustEvaluator<HmacChannel>> {
        let encoded = self
            .secret
            .as_deref()
            .ok_or_else(|| anyhow!("no channel secret: pass --secret or set AGENT_TRUST_SECRET"))?;
        let secret = ChannelSecret::from_hex(encoded).context("invalid channel secret")?;
        TrustEvaluator::new(self.load_config()?, HmacChannel::new(secret))
            .context("invalid trust configuration")
    }
}

// ── JSON output ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct InspectOutput {
    user: String,
    channel: String,
    is_trusted: bool,
    error: Option<String>,
    token: Option<TokenOutput>,
}

#[derive(Serialize)]
struct TokenOutput {
    is_trusted: bool,
    trusted_at: Option<String>,
    trust_days: Option<f64>,
    serial: i64,
    session: Option<String>,
    expiration: Option<String>,
    not_expired: bool,
    not_revoked: bool,
    session_valid: bool,
}

impl From<&TokenVerification> for TokenOutput {
    fn from(v: &TokenVerification) -> Self {
        Self {
            is_trusted: v.token.is_trusted(),
            trusted_at: v.token.trusted_at().map(time::to_rfc3339),
            trust_days: v.token.trust_days(),
            serial: v.token.serial(),
            session: v.token.session().map(str::to_string),
            expiration: v.expiration.map(time::to_rfc3339),
            not_expired: v.not_expired,
            not_revoked: v.not_revoked,
            session_valid: v.session_valid,
        }
    }
}

#[derive(Serialize)]
struct SettingsOutput<'a> {
    user: &'a str,
    settings: &'a TrustSettings,
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let globals = Globals {
        config: cli.config,
        store: cli.store,
        secret: cli.secret,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Issue {
            user,
            days,
            session,
        } => cmd_issue(&globals, &user, days, session),
        Commands::Inspect {
            user,
            session,
            blob,
        } => cmd_inspect(&globals, &user, session.as_deref(), &blob),
        Commands::RevokeOthers { user } => cmd_revoke_others(&globals, &user),
        Commands::Settings { subcommand } => match subcommand {
            SettingsCommands::Show { user } => cmd_settings_show(&globals, &user),
            SettingsCommands::Set {
                user,
                trust_days,
                inactivity_days,
                clear_trust_days,
                clear_inactivity_days,
            } => {
                let trust_days = if clear_trust_days {
                    Some(None)
                } else {
                    trust_days.map(Some)
                };
                let inactivity_days = if clear_inactivity_days {
                    Some(None)
                } else {
                    inactivity_days.map(Some)
                };
                cmd_settings_set(&globals, &user, trust_days, inactivity_days)
            }
        },
        Commands::ChannelName { user } => cmd_channel_name(&globals, &user),
        Commands::GenSecret => cmd_gen_secret(),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_issue(
    globals: &Globals,
    user: &str,
    days: Option<f64>,
    session: Option<String>,
) -> Result<()> {
    let evaluator = globals.evaluator()?;
    let store = globals.open_store()?;
    let user_id = UserId::from(user);
    let owner = Principal::User(user_id.clone());
    let now = time::now();

    let settings = store
        .ensure(&user_id)
        .with_context(|| format!("failed to load settings for '{user}'"))?;

    let token = match session {
        Some(session) => TrustToken::session_trusted(owner, &settings, session, now)?,
        None => TrustToken::trusted(owner, &settings, days, now)?,
    };

    let sealed = evaluator
        .store(&token, &settings, now)
        .context("failed to seal trust token")?
        .ok_or_else(|| anyhow!("no token to seal for '{user}'"))?;

    if globals.json {
        println!("{}", serde_json::to_string_pretty(&sealed)?);
        return Ok(());
    }

    let expiration = token.trust_expiration(evaluator.config().trust_days, &settings);

    println!("Trust token issued for '{user}'");
    println!("  Channel:    {}", sealed.name);
    println!("  Serial:     {}", token.serial());
    println!("  Trusted At: {}", format_time(token.trusted_at()));
    println!("  Expires:    {}", format_time(expiration));
    if let Some(session) = token.session() {
        println!("  Session:    {session}");
    }
    println!("  Max-Age:    {}s", sealed.max_age);
    println!("  Value:      {}", sealed.value);

    Ok(())
}

fn cmd_inspect(globals: &Globals, user: &str, session: Option<&str>, blob: &str) -> Result<()> {
    let evaluator = globals.evaluator()?;
    let store = globals.open_store()?;
    let user_id = UserId::from(user);
    let owner = Principal::User(user_id.clone());
    let channel = evaluator.channel_name(&user_id);

    let settings = store
        .load(&user_id)
        .with_context(|| format!("failed to load settings for '{user}'"))?
        .unwrap_or_default();

    let outcome = evaluator.try_load(Some(blob), &owner, &settings, session, time::now());

    if globals.json {
        let output = match &outcome {
            Ok(v) => InspectOutput {
                user: user.to_string(),
                channel,
                is_trusted: v.is_valid && v.token.is_trusted(),
                error: None,
                token: Some(TokenOutput::from(v)),
            },
            Err(e) => InspectOutput {
                user: user.to_string(),
                channel,
                is_trusted: false,
                error: Some(e.to_string()),
                token: None,
            },
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Trust token for '{user}'");
    println!("  Channel:    {channel}");

    let v = match outcome {
        Ok(v) => v,
        Err(e) => {
            println!();
            println!("Result: UNTRUSTED ({e})");
            return Ok(());
        }
    };

    println!("  Trusted:    {}", yes_no(v.token.is_trusted()));
    println!("  Trusted At: {}", format_time(v.token.trusted_at()));
    println!("  Trust Days: {}", format_days(v.token.trust_days()));
    println!(
        "  Serial:     {} (current {})",
        v.token.serial(),
        settings.serial
    );
    if let Some(s) = v.token.session() {
        println!("  Session:    {s}");
    }
    println!("  Expires:    {}", format_time(v.expiration));
    println!();
    println!("Verification:");
    println!("  Not expired:   {}", yes_no(v.not_expired));
    println!("  Not revoked:   {}", yes_no(v.not_revoked));
    println!("  Session valid: {}", yes_no(v.session_valid));
    println!();
    if v.is_valid && v.token.is_trusted() {
        println!("Result: TRUSTED");
    } else {
        println!("Result: UNTRUSTED");
    }

    Ok(())
}

fn cmd_revoke_others(globals: &Globals, user: &str) -> Result<()> {
    let store = globals.open_store()?;
    let serial = store
        .increment_serial(&UserId::from(user))
        .with_context(|| format!("failed to revoke agents for '{user}'"))?;

    if globals.json {
        println!("{}", serde_json::json!({ "user": user, "serial": serial }));
        return Ok(());
    }

    println!("Revoked all trusted agents for '{user}'");
    println!("  Serial:     {serial}");
    Ok(())
}

fn cmd_settings_show(globals: &Globals, user: &str) -> Result<()> {
    let store = globals.open_store()?;
    let settings = store
        .load(&UserId::from(user))
        .with_context(|| format!("failed to load settings for '{user}'"))?;

    let Some(settings) = settings else {
        if globals.json {
            let settings = TrustSettings::default();
            println!(
                "{}",
                serde_json::to_string_pretty(&SettingsOutput {
                    user,
                    settings: &settings
                })?
            );
        } else {
            println!("No settings stored for '{user}' (defaults apply)");
        }
        return Ok(());
    };

    print_settings(globals, user, &settings)
}

fn cmd_settings_set(
    globals: &Globals,
    user: &str,
    trust_days: Option<Option<f64>>,
    inactivity_days: Option<Option<f64>>,
) -> Result<()> {
    let store = globals.open_store()?;
    let settings = store
        .update(&UserId::from(user), &mut |settings| {
            if let Some(days) = trust_days {
                settings.trust_days = days;
            }
            if let Some(days) = inactivity_days {
                settings.inactivity_days = days;
            }
        })
        .with_context(|| format!("failed to save settings for '{user}'"))?;

    print_settings(globals, user, &settings)
}

fn print_settings(globals: &Globals, user: &str, settings: &TrustSettings) -> Result<()> {
    if globals.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SettingsOutput { user, settings })?
        );
        return Ok(());
    }

    println!("Trust settings for '{user}'");
    println!("  Trust Days:      {}", format_days(settings.trust_days));
    println!("  Inactivity Days: {}", format_days(settings.inactivity_days));
    println!("  Serial:          {}", settings.serial);
    Ok(())
}

fn cmd_channel_name(globals: &Globals, user: &str) -> Result<()> {
    let config = globals.load_config()?;
    println!(
        "{}",
        agent_trust::channel_name(&config.transport.cookie_name, &UserId::from(user))
    );
    Ok(())
}

fn cmd_gen_secret() -> Result<()> {
    println!("{}", random::channel_secret_hex());
    Ok(())
}
