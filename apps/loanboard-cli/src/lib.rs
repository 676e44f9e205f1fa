#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use loanboard_client_core::{
    ActionArgs, ActionName, Attachment, ClientConfig, DashboardShell, EmiRequest, Panel,
};

#[derive(Parser, Debug)]
#[command(name = "loanboard")]
#[command(about = "Drive the loan dashboard client against a live service")]
pub struct Cli {
    /// Service base url; overrides LOANBOARD_API_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Credential state file; overrides LOANBOARD_STATE_PATH.
    #[arg(long, global = true)]
    pub state_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Boot the dashboard and write the rendered page
    Dashboard {
        /// Output file; prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Exchange email and password for a stored credential
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Drop the stored credential
    Logout,
    /// Create a client account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Resolve the stored credential and show the dispatched panels
    Whoami,
    /// Run a named dashboard action, e.g. `application.approve --arg id=42`
    Action(ActionCommandArgs),
    /// Quote a monthly instalment
    Emi {
        #[arg(long)]
        principal: f64,
        #[arg(long)]
        annual_rate: f64,
        #[arg(long)]
        months: u32,
    },
    /// Send the public contact form
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
    /// Submit a loan application with its three proof documents
    Apply {
        #[arg(long)]
        loan_type: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        purpose: String,
        #[arg(long)]
        id_proof: PathBuf,
        #[arg(long)]
        income_proof: PathBuf,
        #[arg(long)]
        address_proof: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct ActionCommandArgs {
    /// Action name from the command table.
    pub name: String,

    /// Action argument as key=value; repeatable.
    #[arg(long = "arg", value_parser = parse_key_value)]
    pub args: Vec<(String, String)>,

    /// File argument as key=path; repeatable.
    #[arg(long = "file", value_parser = parse_key_path)]
    pub files: Vec<(String, PathBuf)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_key_path(raw: &str) -> Result<(String, PathBuf), String> {
    parse_key_value(raw).map(|(key, path)| (key, PathBuf::from(path)))
}

impl Cli {
    pub fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env().context("invalid environment configuration")?;
        if let Some(base_url) = &self.base_url {
            let state_path = config.state_path.clone();
            let ttl = config.notification_ttl;
            let log_filter = config.log_filter.clone();
            config = ClientConfig::new(base_url)
                .with_context(|| format!("invalid --base-url '{base_url}'"))?
                .with_state_path(state_path)
                .with_notification_ttl(ttl);
            config.log_filter = log_filter;
        }
        if let Some(state_path) = &self.state_path {
            config = config.with_state_path(state_path.clone());
        }
        Ok(config)
    }
}

pub async fn run(cli: Cli, config: &ClientConfig) -> Result<()> {
    let shell = DashboardShell::from_config(config).context("failed to open dashboard state")?;
    let outcome = execute(&shell, cli.command).await;
    if let Some(text) = shell.notifications().current_text() {
        eprintln!("{text}");
    }
    outcome
}

async fn execute(shell: &DashboardShell, command: Commands) -> Result<()> {
    match command {
        Commands::Dashboard { out } => {
            shell.boot().await;
            let html = shell.render_dashboard();
            match out {
                Some(path) => {
                    std::fs::write(&path, html)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => println!("{html}"),
            }
        }
        Commands::Login { email, password } => {
            let identity = shell.login(&email, &password).await?;
            println!("{} ({})", identity.name, identity.role.as_str());
        }
        Commands::Logout => {
            shell.logout().await;
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let identity = shell.register(&name, &email, &password).await?;
            println!("registered {} <{}>", identity.name, identity.email);
        }
        Commands::Whoami => {
            let outcome = shell.resolve_and_dispatch().await;
            match outcome.resolution.identity {
                Some(identity) => println!("{} ({})", identity.name, identity.role.as_str()),
                None => println!("anonymous"),
            }
            let panels: Vec<&str> = outcome
                .plan
                .panels
                .visible()
                .into_iter()
                .map(Panel::as_str)
                .collect();
            println!("panels: {}", panels.join(", "));
        }
        Commands::Action(action) => {
            let mut args = ActionArgs::new();
            for (key, value) in action.args {
                args.insert(key, value);
            }
            for (key, path) in action.files {
                args.insert_attachment(key, read_attachment(&path)?);
            }
            run_named_action(shell, &action.name, &args).await?;
        }
        Commands::Emi {
            principal,
            annual_rate,
            months,
        } => {
            let quote = shell
                .calculate_emi(EmiRequest {
                    principal,
                    annual_rate,
                    months,
                })
                .await?;
            println!(
                "emi {:.2}, total payment {:.2}, total interest {:.2}",
                quote.emi, quote.total_payment, quote.total_interest
            );
        }
        Commands::Contact {
            name,
            email,
            message,
        } => {
            let args = ActionArgs::new()
                .with("name", name)
                .with("email", email)
                .with("message", message);
            run_named_action(shell, "contact.submit", &args).await?;
        }
        Commands::Apply {
            loan_type,
            amount,
            purpose,
            id_proof,
            income_proof,
            address_proof,
        } => {
            let args = ActionArgs::new()
                .with("loan_type", loan_type)
                .with("amount", amount)
                .with("purpose", purpose)
                .with_attachment("id_proof", read_attachment(&id_proof)?)
                .with_attachment("income_proof", read_attachment(&income_proof)?)
                .with_attachment("address_proof", read_attachment(&address_proof)?);
            run_named_action(shell, "application.submit", &args).await?;
        }
    }
    Ok(())
}

/// Actions run against the panels of the resolved session, so the refresh
/// that follows them covers the right loaders.
async fn run_named_action(shell: &DashboardShell, name: &str, args: &ActionArgs) -> Result<()> {
    let outcome = shell.resolve_and_dispatch().await;
    if outcome.resolution.rejected.is_some() && needs_session(name) {
        bail!("stored credential was rejected; log in again");
    }
    shell.dispatch_action(name, args).await?;
    Ok(())
}

/// Public actions refresh nothing and send no credential.
fn needs_session(name: &str) -> bool {
    ActionName::parse(name).is_none_or(|action| !action.affected_loaders().is_empty())
}

fn read_attachment(path: &Path) -> Result<Attachment> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("attachment path has no file name")?;
    let attachment = Attachment::new(file_name, bytes);
    Ok(match content_type_for(path) {
        Some(content_type) => attachment.with_content_type(content_type),
        None => attachment,
    })
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}
