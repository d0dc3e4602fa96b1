//! ChatterMate CLI - manage organizations and conversational agents

use std::path::PathBuf;

use chattermate_core::api::agents::{self, AgentSummary, CreateAgentRequest, UpdateAgentRequest};
use chattermate_core::api::{health, organizations, resolve_organization};
use chattermate_core::config::Config;
use chattermate_core::domain::agents::{AgentType, InstructionsInput};
use chattermate_core::domain::groups::{UserGroup, UserGroupRepository};
use chattermate_core::storage::{Database, DatabaseConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "chattermate")]
#[command(author, version, about = "Multi-tenant conversational agent backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (overrides configuration and CHATTERMATE_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage organizations
    Orgs {
        #[command(subcommand)]
        action: OrgAction,
    },

    /// Manage agents
    Agents {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Manage user groups
    Groups {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Database maintenance
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Show service information
    Info,

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum OrgAction {
    /// Create an organization
    Create {
        name: String,
        /// Unique domain, e.g. acme.com
        #[arg(short, long)]
        domain: String,
        /// IANA timezone (defaults to UTC)
        #[arg(short, long)]
        timezone: Option<String>,
    },
    /// List all organizations
    List,
    /// Show an organization by ID or domain
    Show { org: String },
    /// Show whether any organization has been set up
    Status,
}

#[derive(Subcommand)]
enum AgentAction {
    /// Create an agent in an organization
    Create {
        /// Organization ID or domain
        org: String,
        name: String,
        /// Agent type (general, customer_support, sales, tech_support, custom)
        #[arg(short = 't', long = "type")]
        agent_type: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Instruction line; repeat for several
        #[arg(short, long = "instruction")]
        instructions: Vec<String>,
        /// Tool configuration as JSON
        #[arg(long)]
        tools: Option<String>,
        #[arg(long)]
        transfer_to_human: bool,
        /// Mark as the organization's default agent
        #[arg(long)]
        default: bool,
    },
    /// List the agents of an organization
    List {
        /// Organization ID or domain
        org: String,
        /// Include deactivated agents
        #[arg(short, long)]
        all: bool,
    },
    /// Show agent details
    Show { id: String },
    /// Update agent fields
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 't', long = "type")]
        agent_type: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Instructions as text or a JSON list
        #[arg(long)]
        instructions: Option<String>,
        /// Tool configuration as JSON
        #[arg(long)]
        tools: Option<String>,
        #[arg(long)]
        transfer_to_human: Option<bool>,
        #[arg(long)]
        default: Option<bool>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Deactivate an agent
    Delete { id: String },
    /// Show the default agent of an organization
    Default { org: String },
    /// Count the agents of an organization
    Count { org: String },
}

#[derive(Subcommand)]
enum GroupAction {
    /// Create a user group in an organization
    Create {
        /// Organization ID or domain
        org: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Assign an agent to a group
    Assign { group_id: String, agent_id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Show config file path
    Path,
}

#[derive(Subcommand)]
enum DbAction {
    /// Apply pending migrations
    Migrate,
    /// Show schema version
    Status,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let filter = match "chattermate=info".parse() {
        Ok(directive) => tracing_subscriber::EnvFilter::from_default_env().add_directive(directive),
        Err(_) => tracing_subscriber::EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        report_error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Config { action } => cmd_config(action, out),
        Commands::Info => cmd_info(&config, out),
        command => {
            let db = Database::new(database_config(cli.database, &config)).await?;
            debug!(path = %db.path().display(), "Using database");
            let result = match command {
                Commands::Orgs { action } => cmd_orgs(&db, action, out).await,
                Commands::Agents { action } => cmd_agents(&db, action, out).await,
                Commands::Groups { action } => cmd_groups(&db, action, out).await,
                Commands::Db { action } => cmd_db(&db, action, out).await,
                Commands::Doctor => cmd_doctor(&db, &config, out).await,
                Commands::Config { .. } | Commands::Info => Ok(()),
            };
            db.close().await;
            result
        }
    }
}

fn database_config(path: Option<PathBuf>, config: &Config) -> DatabaseConfig {
    match path {
        Some(path) => {
            let db_config =
                DatabaseConfig::with_path(path).max_connections(config.database.max_connections);
            if config.database.auto_migrate {
                db_config
            } else {
                db_config.no_migrate()
            }
        }
        None => config.database_config(),
    }
}

fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<chattermate_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(suggestion) = core.suggestion() {
                eprintln!("  Try: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", e),
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Print a value as JSON; returns false in text mode so the caller prints text
    fn emit<T: Serialize>(&self, value: &T) -> anyhow::Result<bool> {
        if self.json() {
            println!("{}", serde_json::to_string_pretty(value)?);
            return Ok(true);
        }
        Ok(false)
    }

    /// Status line suppressed in quiet and JSON mode
    fn note(&self, message: impl std::fmt::Display) {
        if !self.quiet && !self.json() {
            println!("{}", message);
        }
    }
}

/// JSON text is structured tools; anything else is kept as already-encoded text
fn parse_tools(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn print_agent_line(a: &AgentSummary) {
    let mut flags = Vec::new();
    if a.is_default {
        flags.push("default");
    }
    if !a.is_active {
        flags.push("inactive");
    }
    let suffix = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    println!("  {} - {} ({}){}", a.id, a.name, a.agent_type, suffix);
}

fn print_agent(a: &AgentSummary) {
    println!("Agent: {}", a.name);
    println!("  ID: {}", a.id);
    println!("  Organization: {}", a.organization_id);
    println!("  Type: {}", a.agent_type);
    if let Some(display_name) = &a.display_name {
        println!("  Display name: {}", display_name);
    }
    if let Some(desc) = &a.description {
        println!("  Description: {}", desc);
    }
    println!("  Default: {}", a.is_default);
    println!("  Active: {}", a.is_active);
    println!("  Transfer to human: {}", a.transfer_to_human);
    if !a.instructions.is_empty() {
        println!("  Instructions:");
        for (i, line) in a.instructions.iter().enumerate() {
            println!("    {}. {}", i + 1, line);
        }
    }
    if let Some(tools) = &a.tools {
        println!("  Tools: {}", tools);
    }
    println!("  Created: {}", a.created_at);
    println!("  Updated: {}", a.updated_at);
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_orgs(db: &Database, action: OrgAction, out: Output) -> anyhow::Result<()> {
    match action {
        OrgAction::Create {
            name,
            domain,
            timezone,
        } => {
            let org = organizations::create(
                db,
                organizations::CreateOrganizationRequest {
                    name,
                    domain,
                    timezone,
                },
            )
            .await?;
            if !out.emit(&org)? {
                out.note("Organization created successfully!");
                println!("  ID: {}", org.id);
                println!("  Name: {}", org.name);
                println!("  Domain: {}", org.domain);
                println!("  Timezone: {}", org.timezone);
            }
        }
        OrgAction::List => {
            let orgs = organizations::list(db).await?;
            if out.emit(&orgs)? {
                return Ok(());
            }
            if orgs.is_empty() {
                out.note("No organizations found.");
                out.note("\nCreate one with: chattermate orgs create <name> --domain <domain>");
            } else {
                out.note("Organizations:");
                for o in orgs {
                    println!("  {} - {} ({})", o.id, o.name, o.domain);
                }
            }
        }
        OrgAction::Show { org } => {
            let o = organizations::get(db, &org).await?;
            if !out.emit(&o)? {
                println!("Organization: {}", o.name);
                println!("  ID: {}", o.id);
                println!("  Domain: {}", o.domain);
                println!("  Timezone: {}", o.timezone);
                println!("  Active: {}", o.is_active);
                println!("  Created: {}", o.created_at);
            }
        }
        OrgAction::Status => {
            let status = organizations::setup_status(db).await?;
            if !out.emit(&status)? {
                println!("{}", status.status);
                out.note(format!("  Organizations: {}", status.organization_count));
            }
        }
    }
    Ok(())
}

async fn cmd_agents(db: &Database, action: AgentAction, out: Output) -> anyhow::Result<()> {
    match action {
        AgentAction::Create {
            org,
            name,
            agent_type,
            display_name,
            description,
            instructions,
            tools,
            transfer_to_human,
            default,
        } => {
            let mut request = CreateAgentRequest::new(org, name);
            request.agent_type = agent_type;
            request.display_name = display_name;
            request.description = description;
            if !instructions.is_empty() {
                request.instructions = Some(InstructionsInput::List(instructions));
            }
            request.tools = tools.as_deref().map(parse_tools);
            request.transfer_to_human = transfer_to_human;
            request.is_default = default;

            let agent = agents::create(db, request).await?;
            if !out.emit(&agent)? {
                out.note("Agent created successfully!");
                println!("  ID: {}", agent.id);
                println!("  Name: {}", agent.name);
                println!("  Type: {}", agent.agent_type);
            }
        }
        AgentAction::List { org, all } => {
            let list = agents::list(db, &org, all).await?;
            if out.emit(&list)? {
                return Ok(());
            }
            if list.is_empty() {
                out.note("No agents found.");
                out.note(format!(
                    "\nCreate one with: chattermate agents create {} <name>",
                    org
                ));
            } else {
                out.note("Agents:");
                for a in &list {
                    print_agent_line(a);
                }
            }
        }
        AgentAction::Show { id } => {
            let detail = agents::get(db, &id).await?;
            if !out.emit(&detail)? {
                print_agent(&detail.agent);
                if let Some(org) = &detail.organization {
                    println!("  Organization domain: {}", org.domain);
                }
                if !detail.groups.is_empty() {
                    let names: Vec<&str> = detail.groups.iter().map(|g| g.name.as_str()).collect();
                    println!("  Groups: {}", names.join(", "));
                }
            }
        }
        AgentAction::Update {
            id,
            name,
            agent_type,
            display_name,
            description,
            instructions,
            tools,
            transfer_to_human,
            default,
            active,
        } => {
            let agent_type = agent_type
                .map(|text| {
                    AgentType::parse(text.trim()).ok_or_else(|| {
                        chattermate_core::Error::InvalidInput(format!(
                            "Unknown agent type '{}'",
                            text
                        ))
                    })
                })
                .transpose()?;
            let request = UpdateAgentRequest {
                name,
                display_name,
                description,
                agent_type,
                instructions: instructions.map(InstructionsInput::Text),
                tools: tools.as_deref().map(parse_tools),
                transfer_to_human,
                is_default: default,
                is_active: active,
            };

            let agent = agents::update(db, &id, request).await?;
            if !out.emit(&agent)? {
                out.note(format!("Agent '{}' updated.", agent.name));
                if !out.quiet {
                    print_agent(&agent);
                }
            }
        }
        AgentAction::Delete { id } => {
            agents::delete(db, &id).await?;
            if !out.emit(&serde_json::json!({ "id": id, "is_active": false }))? {
                out.note(format!("Agent '{}' deactivated.", id));
            }
        }
        AgentAction::Default { org } => {
            let agent = agents::default_agent(db, &org).await?;
            if out.emit(&agent)? {
                return Ok(());
            }
            match agent {
                Some(a) => print_agent(&a),
                None => out.note(format!("No default agent set for '{}'.", org)),
            }
        }
        AgentAction::Count { org } => {
            let count = agents::count(db, &org).await?;
            if !out.emit(&serde_json::json!({ "count": count }))? {
                println!("{}", count);
            }
        }
    }
    Ok(())
}

async fn cmd_groups(db: &Database, action: GroupAction, out: Output) -> anyhow::Result<()> {
    let repo = UserGroupRepository::new(db);
    match action {
        GroupAction::Create {
            org,
            name,
            description,
        } => {
            let org = resolve_organization(db, &org).await?;
            let mut group = UserGroup::new(org.id, name);
            if let Some(desc) = description {
                group = group.with_description(desc);
            }
            repo.create(&group).await?;
            if !out.emit(&group)? {
                out.note("Group created successfully!");
                println!("  ID: {}", group.id);
                println!("  Name: {}", group.name);
            }
        }
        GroupAction::Assign { group_id, agent_id } => {
            let group_uuid = Uuid::parse_str(&group_id)
                .map_err(|_| chattermate_core::Error::InvalidIdentifier(group_id.clone()))?;
            let group = repo.get(group_uuid).await?.ok_or_else(|| {
                chattermate_core::Error::InvalidInput(format!("Group '{}' not found", group_id))
            })?;
            let agent = agents::get(db, &agent_id).await?;
            let agent_uuid = Uuid::parse_str(&agent.agent.id)?;

            repo.assign_agent(group.id, agent_uuid).await?;
            if !out.emit(&serde_json::json!({ "group_id": group.id, "agent_id": agent_uuid }))? {
                out.note(format!(
                    "Agent '{}' assigned to group '{}'.",
                    agent.agent.name, group.name
                ));
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, out: Output) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            out.note(format!("Set {} = {}", key, value));
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            if out.json() {
                let map: serde_json::Map<String, Value> = items
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (key, value) in items {
                    println!("{} = {}", key, value);
                }
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn cmd_db(db: &Database, action: DbAction, out: Output) -> anyhow::Result<()> {
    match action {
        DbAction::Migrate => {
            db.migrate().await?;
            out.note("Database is up to date.");
        }
        DbAction::Status => {
            let status = db.migration_status().await?;
            let value = serde_json::json!({
                "path": db.path().display().to_string(),
                "current_version": status.current_version,
                "target_version": status.target_version,
                "needs_migration": status.needs_migration,
            });
            if !out.emit(&value)? {
                println!("Database: {}", db.path().display());
                println!(
                    "  Schema version: {} of {}",
                    status.current_version, status.target_version
                );
                if status.needs_migration {
                    println!("  Run `chattermate db migrate` to upgrade.");
                }
            }
        }
    }
    Ok(())
}

fn cmd_info(config: &Config, out: Output) -> anyhow::Result<()> {
    let info = health::service_info(config);
    let pong = health::ping();
    if !out.emit(&serde_json::json!({ "service": info, "ping": pong }))? {
        println!("{} v{}", info.name, info.version);
        println!("{}", info.description);
        out.note(format!("Status: {} ({})", pong.status, pong.message));
    }
    Ok(())
}

async fn cmd_doctor(db: &Database, config: &Config, out: Output) -> anyhow::Result<()> {
    let report = health::doctor(db, config).await?;
    if out.emit(&report)? {
        return Ok(());
    }

    out.note("ChatterMate Health Check");
    out.note("========================");
    out.note("");

    for check in &report.checks {
        let marker = match check.status {
            health::HealthStatus::Ok => "[OK]",
            health::HealthStatus::Warning => "[--]",
            health::HealthStatus::Error => "[!!]",
        };
        match &check.message {
            Some(message) => println!("{} {}: {}", marker, check.name, message),
            None => println!("{} {}", marker, check.name),
        }
    }

    if report.overall_status == health::HealthStatus::Error {
        return Err(anyhow::anyhow!("Health check failed"));
    }
    out.note("\nAll checks passed.");
    Ok(())
}
