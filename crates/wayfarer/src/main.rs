//! Wayfarer travel CRM server.
//!
//! Runs the HTTP API and offers a few administration commands for
//! provisioning tenants and their first users.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use tracing::info;
use wayfarer_persistence::backends::sqlite::SqliteBackend;
use wayfarer_persistence::core::{RecordStorage, TenantDirectory, UserDirectory};
use wayfarer_persistence::identity::NewUser;
use wayfarer_persistence::tenant::{NewTenant, TenantContext};
use wayfarer_persistence::{ResourceKind, Role, TenantId};
use wayfarer_rest::auth::hash_password;
use wayfarer_rest::{ServerConfig, create_app_with_config, init_logging};

/// Domain of the demonstration tenant.
const DEMO_DOMAIN: &str = "demo.travelco";

#[derive(Debug, Parser)]
#[command(name = "wayfarer", version, about = "Wayfarer travel CRM")]
struct Cli {
    #[command(flatten)]
    server: ServerConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (the default).
    Serve {
        /// Provision the demonstration tenant before serving.
        #[arg(long)]
        seed_demo: bool,
    },
    /// Manage tenants.
    #[command(subcommand)]
    Tenant(TenantCommand),
    /// Manage users.
    #[command(subcommand)]
    User(UserCommand),
    /// Provision the demonstration tenant with sample data.
    SeedDemo,
}

#[derive(Debug, Subcommand)]
enum TenantCommand {
    /// Register a travel agency.
    Create {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Domain the agency is served on.
        #[arg(long)]
        domain: String,
        /// Subscription tier.
        #[arg(long)]
        tier: Option<String>,
        /// Settings as a JSON object.
        #[arg(long)]
        settings: Option<String>,
    },
    /// List all tenants.
    List,
    /// Delete a tenant with all of its users and records.
    Delete {
        /// Tenant id.
        id: TenantId,
    },
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    /// Create a user in a tenant.
    Create {
        /// Domain of the tenant the user belongs to.
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "WAYFARER_USER_PASSWORD", hide_env_values = true)]
        password: String,
        /// ADMIN, MANAGER, AGENT or VIEWER.
        #[arg(long, default_value = "AGENT")]
        role: Role,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
}

/// Opens the configured database and makes sure its schema exists.
fn open_backend(config: &ServerConfig) -> anyhow::Result<SqliteBackend> {
    let backend = match config.database_path.as_deref() {
        Some(path) if path != ":memory:" => {
            info!(database = %path, "Opening SQLite database");
            SqliteBackend::open(path)
                .with_context(|| format!("Failed to open database {path}"))?
        }
        _ => {
            info!("Using an in-memory database; data is lost on exit");
            SqliteBackend::in_memory()?
        }
    };
    backend.init_schema()?;
    Ok(backend)
}

/// Opens the database for an administration command, which is pointless
/// against an in-memory database.
fn open_persistent_backend(config: &ServerConfig) -> anyhow::Result<SqliteBackend> {
    if matches!(config.database_path.as_deref(), None | Some(":memory:")) {
        bail!("This command needs --database-path (or WAYFARER_DATABASE_PATH)");
    }
    open_backend(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.server;
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    match cli.command.unwrap_or(Command::Serve { seed_demo: false }) {
        Command::Serve { seed_demo } => {
            let backend = open_backend(&config)?;
            if seed_demo {
                seed_demo_tenant(&backend).await?;
            }
            run_server(backend, config).await
        }
        Command::Tenant(command) => {
            tenant_command(&open_persistent_backend(&config)?, command).await
        }
        Command::User(command) => {
            user_command(&open_persistent_backend(&config)?, command).await
        }
        Command::SeedDemo => seed_demo_tenant(&open_persistent_backend(&config)?).await,
    }
}

async fn run_server(backend: SqliteBackend, config: ServerConfig) -> anyhow::Result<()> {
    info!(
        port = config.port,
        host = %config.host,
        domain_match = %config.domain_match,
        "Starting Wayfarer CRM"
    );
    let app = create_app_with_config(backend, config.clone());
    wayfarer_rest::serve(app, &config).await?;
    Ok(())
}

async fn tenant_command(backend: &SqliteBackend, command: TenantCommand) -> anyhow::Result<()> {
    match command {
        TenantCommand::Create {
            name,
            domain,
            tier,
            settings,
        } => {
            let mut tenant = NewTenant::new(name, domain);
            if let Some(tier) = tier {
                tenant = tenant.with_tier(tier);
            }
            if let Some(raw) = settings {
                tenant = tenant.with_settings(parse_settings(&raw)?);
            }
            let tenant = backend.create_tenant(tenant).await?;
            println!("{}", serde_json::to_string_pretty(&tenant)?);
        }
        TenantCommand::List => {
            for tenant in backend.list_tenants().await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    tenant.id, tenant.domain, tenant.subscription_tier, tenant.name
                );
            }
        }
        TenantCommand::Delete { id } => {
            backend.delete_tenant(id).await?;
            info!(tenant = %id, "Tenant deleted");
        }
    }
    Ok(())
}

fn parse_settings(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("Settings are not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("Settings must be a JSON object"),
    }
}

async fn user_command(backend: &SqliteBackend, command: UserCommand) -> anyhow::Result<()> {
    match command {
        UserCommand::Create {
            tenant,
            email,
            password,
            role,
            first_name,
            last_name,
        } => {
            let tenant = backend
                .find_tenant_by_domain(&tenant.to_ascii_lowercase())
                .await?
                .with_context(|| format!("No tenant is served on {tenant}"))?;
            let mut user = NewUser::new(email, hash_password(&password)?).with_role(role);
            user.first_name = first_name;
            user.last_name = last_name;

            let user = backend
                .create_user(&TenantContext::new(tenant.id), user)
                .await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
    }
    Ok(())
}

/// Creates the demonstration agency with one admin, one agent and a small
/// booked trip. Does nothing if the demo domain is already taken.
async fn seed_demo_tenant(backend: &SqliteBackend) -> anyhow::Result<()> {
    if backend.find_tenant_by_domain(DEMO_DOMAIN).await?.is_some() {
        info!(domain = DEMO_DOMAIN, "Demo tenant already exists");
        return Ok(());
    }

    let mut settings = Map::new();
    settings.insert("currency".to_string(), json!("USD"));
    let tenant = backend
        .create_tenant(
            NewTenant::new("Demo Travel Co", DEMO_DOMAIN)
                .with_tier("starter")
                .with_settings(settings),
        )
        .await?;
    let ctx = TenantContext::new(tenant.id);

    let hash = hash_password("demo-password")?;
    let admin = backend
        .create_user(
            &ctx,
            NewUser::new("admin@demo.travelco", hash.clone()).with_role(Role::Admin),
        )
        .await?;
    let agent = backend
        .create_user(
            &ctx,
            NewUser::new("agent@demo.travelco", hash).with_role(Role::Agent),
        )
        .await?;

    let lead = backend
        .create(
            &ctx,
            ResourceKind::Lead,
            json!({
                "email": "maria.silva@example.com",
                "first_name": "Maria",
                "last_name": "Silva",
                "source": "website",
                "destination": "Azores",
                "budget": "4500",
                "adults": 2,
                "assigned_to": agent.id
            }),
        )
        .await?;
    let customer = backend
        .create(
            &ctx,
            ResourceKind::Customer,
            json!({"lead": lead.id(), "customer_type": "leisure", "loyalty_level": "silver"}),
        )
        .await?;
    let package = backend
        .create(
            &ctx,
            ResourceKind::Package,
            json!({
                "name": "Azores Explorer",
                "description": "Eight days of hiking and whale watching",
                "base_price": "2200",
                "duration": 8,
                "destination": "Azores"
            }),
        )
        .await?;
    backend
        .create(
            &ctx,
            ResourceKind::Booking,
            json!({
                "customer": customer.id(),
                "package": package.id(),
                "status": "confirmed",
                "total_amount": "4400",
                "travel_date": "2026-06-01",
                "pax_count": 2
            }),
        )
        .await?;

    info!(
        tenant = %tenant.id,
        domain = DEMO_DOMAIN,
        admin = %admin.email,
        "Demo tenant provisioned (password: demo-password)"
    );
    Ok(())
}
