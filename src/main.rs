use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

mod config;
mod dashboard;
mod db;
mod insights;
mod models;
mod report;
mod server;
mod source;

use config::Config;
use dashboard::{DashboardError, DashboardView};
use insights::MonthBucket;
use source::{IdentityProvider, PgStore, RecordSource};

#[derive(Parser)]
#[command(name = "certfolio")]
#[command(about = "Certificate portfolio dashboards backed by Postgres", long_about = None)]
struct Cli {
    /// How upload dates are grouped in the monthly trend
    #[arg(long, global = true, env = "CERTFOLIO_MONTH_BUCKET", value_enum, default_value_t = MonthBucket::MonthOnly)]
    month_bucket: MonthBucket,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo users, sessions and certificates
    Seed,
    /// Upload certificates for an owner from a CSV file
    Import {
        #[arg(long)]
        owner: Uuid,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Render the signed-in user's dashboard
    Dashboard {
        #[arg(long, env = "CERTFOLIO_SESSION")]
        session: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the signed-in user's certificates, newest first
    Certificates {
        #[arg(long, env = "CERTFOLIO_SESSION")]
        session: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Render the read-only dashboard of any user
    PublicDashboard {
        #[arg(long)]
        user_id: Uuid,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the public dashboard link for the signed-in user
    ShareLink {
        #[arg(long, env = "CERTFOLIO_SESSION")]
        session: String,
    },
    /// Serve both dashboards over HTTP
    Serve {
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("certfolio=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Cancelled on Ctrl-C so an in-flight refresh never lands after exit starts.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
        }
        trigger.cancel();
    });
    token
}

fn emit(
    view: &DashboardView,
    format: OutputFormat,
    share_link: Option<&str>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let Some(dashboard) = view.current() else {
        println!("No dashboard data available.");
        return Ok(());
    };

    let rendered = match format {
        OutputFormat::Markdown => report::build_report(dashboard, share_link),
        OutputFormat::Json => serde_json::to_string_pretty(&server::DashboardResponse {
            dashboard: dashboard.clone(),
            theme: report::Theme::for_audience(dashboard.audience),
            share_link: share_link.map(str::to_string),
        })?,
    };

    write_output(&rendered, "Dashboard", out)
}

fn write_output(rendered: &str, what: &str, out: Option<PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{what} written to {}.", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;
    let store = Arc::new(PgStore::new(pool));

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(store.pool()).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { owner, csv } => {
            let inserted = db::import_csv(store.pool(), owner, &csv).await?;
            println!("Inserted {inserted} certificates from {}.", csv.display());
        }
        Commands::Dashboard {
            session,
            format,
            out,
        } => {
            let source: Arc<dyn RecordSource> = store.clone();
            let mut view =
                match DashboardView::private(&*store, source, &session, cli.month_bucket)
                    .await
                {
                    Ok(view) => view,
                    Err(DashboardError::NotSignedIn) => {
                        warn!("session did not resolve to a user");
                        println!("Not signed in. Log in to view your dashboard.");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                };

            view.refresh(&shutdown_token()).await;
            let link = dashboard::share_link(&config.public_url, view.owner_id());
            emit(&view, format, Some(&link), out)?;
        }
        Commands::Certificates {
            session,
            format,
            out,
        } => {
            let gallery = match dashboard::load_gallery(&*store, &*store, &session).await {
                Ok(gallery) => gallery,
                Err(DashboardError::NotSignedIn) => {
                    warn!("session did not resolve to a user");
                    println!("Not signed in. Log in to view your certificates.");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let rendered = match format {
                OutputFormat::Markdown => report::build_gallery(&gallery),
                OutputFormat::Json => serde_json::to_string_pretty(&gallery)?,
            };
            write_output(&rendered, "Certificate list", out)?;
        }
        Commands::PublicDashboard {
            user_id,
            format,
            out,
        } => {
            let mut view = DashboardView::public(store.clone(), user_id, cli.month_bucket);
            view.refresh(&shutdown_token()).await;
            emit(&view, format, None, out)?;
        }
        Commands::ShareLink { session } => {
            match store.resolve_session(&session).await? {
                Some(owner_id) => {
                    println!("{}", dashboard::share_link(&config.public_url, owner_id))
                }
                None => println!("Not signed in. Log in to share your dashboard."),
            }
        }
        Commands::Serve { bind } => {
            let bind = match bind {
                Some(bind) => bind,
                None => config.bind_addr()?,
            };
            let state = Arc::new(server::AppState {
                source: store.clone(),
                identity: store,
                public_url: config.public_url.clone(),
                bucket: cli.month_bucket,
            });
            server::serve(state, bind, shutdown_token()).await?;
        }
    }

    Ok(())
}

