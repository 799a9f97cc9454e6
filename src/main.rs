use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use briefing::archive::{Article, ContentBatch};
use briefing::config::{Config, API_KEY_ENV};
use briefing::feed::{FeedClient, FeedError, HttpFeedClient};
use briefing::identity::{record_sign_in, record_subscription, LocalIdentity};
use briefing::session::{ArchiveSession, RefreshOutcome, RefreshTrigger, SessionSnapshot};
use briefing::storage::{Database, DatabaseError};
use briefing::util::{sanitize_line, truncate_to_width};

const TITLE_WIDTH: usize = 72;

/// Get the config directory path (~/.config/briefing/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("briefing"))
}

#[derive(Parser, Debug)]
#[command(name = "briefing", about = "Local-first AI news briefing archive")]
struct Args {
    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Fetch now, ignoring any rate-limit cooldown
    #[arg(long)]
    refresh: bool,

    /// Show only one category (e.g. MODELS, POLICY)
    #[arg(long, value_name = "NAME")]
    category: Option<String>,

    /// Print the full text of the Nth listed article (1-based)
    #[arg(long, value_name = "N")]
    open: Option<usize>,

    /// Record a sign-in for EMAIL
    #[arg(long, value_name = "EMAIL", conflicts_with_all = ["subscribe", "sign_out"])]
    sign_in: Option<String>,

    /// Subscribe EMAIL to the briefing
    #[arg(long, value_name = "EMAIL", conflicts_with = "sign_out")]
    subscribe: Option<String>,

    /// Forget the locally remembered identity
    #[arg(long)]
    sign_out: bool,

    /// Show the cached archive without contacting the feed
    #[arg(long, conflicts_with = "refresh")]
    offline: bool,
}

/// Stands in for the feed when no `feed_url` is configured.
struct UnconfiguredFeed;

#[async_trait]
impl FeedClient for UnconfiguredFeed {
    async fn fetch_batch(&self) -> Result<ContentBatch, FeedError> {
        Err(FeedError::new("No feed endpoint configured"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    // User-only access: the database holds the identity records
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config = Config::load(&config_dir.join("config.toml")).context("Failed to load config")?;
    let db_path = config_dir.join("briefing.db");

    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of briefing appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    if run_identity_command(&args, &db).await? {
        return Ok(());
    }

    let category = match &args.category {
        Some(name) => match config.find_category(name) {
            Some(category) => Some(category),
            None => {
                eprintln!("Unknown category '{}'.", name);
                eprintln!("Available: {}", config.categories.join(", "));
                std::process::exit(2);
            }
        },
        None => None,
    };

    let api_key = config.resolve_api_key(std::env::var(API_KEY_ENV).ok());
    let client: Arc<dyn FeedClient> = match config.feed_config(api_key) {
        Some(feed) => Arc::new(HttpFeedClient::new(feed).context("Invalid feed_url in config")?),
        None => {
            tracing::info!("No feed_url configured, running from seed and cache only");
            Arc::new(UnconfiguredFeed)
        }
    };

    let mut session = ArchiveSession::new(db.clone(), client, config.session_settings());
    if let Some(category) = &category {
        session.select_category(category);
    }

    if args.offline {
        session.startup().await.context("Failed to load archive")?;
    } else if args.refresh {
        // The manual refresh replaces whatever sync startup would plan
        let plan = session.startup().await.context("Failed to load archive")?;
        tracing::debug!(?plan, "Startup plan superseded by manual refresh");
        let outcome = session
            .refresh(RefreshTrigger::Manual)
            .await
            .context("Refresh failed")?;
        report_outcome(outcome);
    } else {
        let (plan, outcome) = session
            .run_startup()
            .await
            .context("Failed to load archive")?;
        tracing::debug!(?plan, ?outcome, "Startup complete");
        if let Some(outcome) = outcome {
            report_outcome(outcome);
        }
    }

    let snapshot = session.snapshot();
    match args.open {
        Some(n) => match n.checked_sub(1).and_then(|i| session.open_article(i)) {
            Some(article) => print_article(article),
            None => {
                eprintln!(
                    "No article #{} in {} ({} listed).",
                    n,
                    session.category(),
                    session.visible_articles().len()
                );
                std::process::exit(2);
            }
        },
        None => print_listing(&snapshot, session.category(), &session.visible_articles()),
    }

    Ok(())
}

/// Handle --sign-in / --subscribe / --sign-out. Returns true if one ran.
async fn run_identity_command(args: &Args, db: &Database) -> Result<bool> {
    if args.sign_out {
        LocalIdentity::sign_out(db).await?;
        println!("Signed out.");
        return Ok(true);
    }
    if let Some(email) = &args.sign_in {
        let token = record_sign_in(db, email, Utc::now()).await?;
        println!("Signed in as {}.", email.trim());
        println!("Session token: {}", token);
        return Ok(true);
    }
    if let Some(email) = &args.subscribe {
        record_subscription(db, email, Utc::now()).await?;
        println!("Subscribed {} to the briefing.", email.trim());
        return Ok(true);
    }

    let identity = LocalIdentity::load(db).await?;
    if let Some(email) = identity.email {
        let status = if identity.subscribed {
            "subscribed"
        } else {
            "not subscribed"
        };
        tracing::debug!(status, "Local identity loaded");
        println!("Signed in as {} ({})", email, status);
    }
    Ok(false)
}

fn report_outcome(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Updated { articles } => {
            println!("Briefing updated: {} articles archived.", articles)
        }
        RefreshOutcome::NoNewContent { .. } => println!("No new stories since the last sync."),
        RefreshOutcome::CoolingDown { until } => println!(
            "Feed is cooling down after a rate limit; next attempt after {}.",
            until.with_timezone(&chrono::Local).format("%H:%M")
        ),
        // The session decides what to show; raw errors only go to the log
        RefreshOutcome::Failed { .. } => {}
    }
}

fn print_listing(snapshot: &SessionSnapshot, category: &str, articles: &[&Article]) {
    if let Some(error) = &snapshot.last_error {
        eprintln!("{}", error);
    }

    let Some(archive) = &snapshot.archive else {
        println!("No briefing loaded.");
        return;
    };

    println!(
        "AI Briefing  |  {}  |  updated {}",
        category,
        sanitize_line(&archive.last_updated)
    );
    println!();

    if articles.is_empty() {
        println!("No stories in this category yet.");
        return;
    }

    for (i, article) in articles.iter().enumerate() {
        let title = sanitize_line(&article.title);
        let marker = if article.is_fallback_link() {
            " [unverified]"
        } else {
            ""
        };
        println!(
            "{:>3}. {:<10} {}{}",
            i + 1,
            article.category,
            truncate_to_width(&title, TITLE_WIDTH),
            marker
        );
        println!(
            "     {}  {}  {}",
            sanitize_line(&article.date),
            article.source_host(),
            article.display_tags().join(" ")
        );
    }

    if !archive.sources.is_empty() {
        println!();
        println!("{} cited sources", archive.sources.len());
    }
}

fn print_article(article: &Article) {
    println!("{}", sanitize_line(&article.title));
    println!(
        "{}  |  {}  |  {}",
        article.category,
        sanitize_line(&article.date),
        article.source_host()
    );
    let tags = article.display_tags();
    if !tags.is_empty() {
        println!("{}", tags.join(" "));
    }
    println!();
    println!("{}", sanitize_line(&article.excerpt));
    println!();
    for paragraph in article.content.split("\n\n") {
        println!("{}", sanitize_line(paragraph));
        println!();
    }
    if article.is_fallback_link() {
        println!("Source not yet verified: {}", sanitize_line(&article.source_url));
    } else {
        println!("Source: {}", sanitize_line(&article.source_url));
    }
}
