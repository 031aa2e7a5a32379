//! Command-line client for a local CrazyPaste store.

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use crazypaste_core::db::backup::{read_export_file, write_export_file};
use crazypaste_core::db::stats::StatsPoller;
use crazypaste_core::models::paste::{CreatePasteRequest, Expiration, Paste};
use crazypaste_core::models::stats::{GlobalStats, UserStats};
use crazypaste_core::models::user::{ProfileUpdate, User};
use crazypaste_core::roles::Role;
use crazypaste_core::{Config, CrazyPaste};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cpaste", about = "CrazyPaste CLI", version)]
struct Cli {
    /// Database directory (can also be set via DB_PATH env var)
    #[arg(long = "db", env = "DB_PATH", global = true)]
    db_path: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Create an account and log in as it
    Register {
        email: String,
        username: String,
        #[arg(short, long)]
        password: String,
    },
    Login {
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    /// Show the session user
    Whoami,
    /// Create a paste from a file or stdin
    New {
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        language: Option<String>,
        /// 10m, 1h, 1d, 1w, 1m, never or burn
        #[arg(short, long, default_value = "never")]
        expires: Expiration,
        #[arg(short, long)]
        password: Option<String>,
        /// Delete after the first read
        #[arg(long)]
        burn: bool,
    },
    Get {
        id: String,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// List public pastes, or your own with --mine
    List {
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        mine: bool,
    },
    Delete {
        id: String,
    },
    /// Show user stats, or site totals with --global
    Stats {
        user_id: Option<String>,
        #[arg(long, conflicts_with = "user_id")]
        global: bool,
        /// Keep refreshing at the configured poll interval
        #[arg(long, conflicts_with = "global")]
        watch: bool,
    },
    /// Assign a role to another user
    Role {
        user_id: String,
        role: Role,
    },
    Follow {
        user_id: String,
    },
    Unfollow {
        user_id: String,
    },
    /// Edit your profile; an empty value clears a field
    Profile {
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        github: Option<String>,
    },
    /// Delete your account and log out
    DeleteAccount,
    /// Write the user directory and stats as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the user directory from an export file
    Import {
        input: PathBuf,
    },
    /// Remove expired pastes
    Purge,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("response encoding error")
}

fn expiry_label(paste: &Paste) -> String {
    if paste.burn_after_reading {
        return "burn".to_string();
    }
    match paste.expires {
        Some(ms) => chrono::DateTime::from_timestamp_millis(ms)
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| ms.to_string()),
        None => "never".to_string(),
    }
}

fn format_summary_output(pastes: &[Paste], json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(pastes);
    }
    let rows: Vec<String> = pastes
        .iter()
        .map(|paste| {
            format!(
                "{:<10} {:<30} {:<12} {:>6}  {}",
                paste.id,
                paste.title,
                paste.language,
                paste.views,
                expiry_label(paste)
            )
        })
        .collect();
    Ok(rows.join("\n"))
}

fn format_get_output(paste: &Paste, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(paste);
    }
    Ok(paste.content.clone())
}

fn format_user_output(user: &User, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(user);
    }
    if user.is_guest {
        return Ok(format!("{} (guest)", user.username));
    }
    Ok(format!(
        "{} <{}> [{}] {}",
        user.username, user.email, user.role, user.id
    ))
}

fn format_stats_output(stats: &UserStats, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(stats);
    }
    Ok(format!(
        "pastes: {} ({} public, {} private)\nviews: {}\nfollowers: {}  following: {}\nreputation: {}",
        stats.total_pastes,
        stats.public_pastes,
        stats.private_pastes,
        stats.total_views,
        stats.followers,
        stats.following,
        stats.reputation
    ))
}

fn format_global_output(stats: &GlobalStats, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(stats);
    }
    Ok(format!(
        "users: {}\npastes: {} ({} public)\nviews: {}",
        stats.total_users, stats.total_pastes, stats.public_pastes, stats.total_views
    ))
}

fn read_content(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn resolve_config(db_path: Option<String>) -> Config {
    let config = Config::from_env();
    match db_path.map(|path| path.trim().to_string()) {
        Some(path) if !path.is_empty() => Config {
            db_path: path,
            ..config
        },
        _ => config,
    }
}

fn run(app: &CrazyPaste, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Completions { .. } => unreachable!("completions handled before opening the store"),
        Commands::Register {
            email,
            username,
            password,
        } => {
            let user = app.register(&email, &password, &username)?;
            println!("{}", format_user_output(&user, json)?);
        }
        Commands::Login { email, password } => {
            let user = app.login(&email, &password)?;
            println!("{}", format_user_output(&user, json)?);
        }
        Commands::Logout => {
            let guest = app.logout()?;
            println!("{}", format_user_output(&guest, json)?);
        }
        Commands::Whoami => {
            println!("{}", format_user_output(&app.current_user()?, json)?);
        }
        Commands::New {
            file,
            title,
            language,
            expires,
            password,
            burn,
        } => {
            let content = read_content(file)?;
            let paste = app.create_paste(CreatePasteRequest {
                title,
                content,
                language,
                expiration: expires,
                password,
                burn_after_reading: burn,
            })?;
            if json {
                println!("{}", to_json(&paste)?);
            } else {
                println!("Created: {} ({})", paste.title, paste.id);
            }
        }
        Commands::Get { id, password } => {
            let paste = app.open_paste(&id, password.as_deref())?;
            println!("{}", format_get_output(&paste, json)?);
        }
        Commands::List { limit, mine } => {
            let pastes = if mine {
                let mut pastes = app.my_pastes()?;
                if let Some(limit) = limit {
                    pastes.truncate(limit);
                }
                pastes
            } else {
                app.list_public(limit)?
            };
            let output = format_summary_output(&pastes, json)?;
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Commands::Delete { id } => {
            app.delete_paste(&id)?;
            if json {
                println!("{}", to_json(&serde_json::json!({ "deleted": id }))?);
            } else {
                println!("Deleted paste: {}", id);
            }
        }
        Commands::Stats {
            user_id,
            global,
            watch,
        } => {
            if global {
                println!("{}", format_global_output(&app.global_stats()?, json)?);
            } else if watch {
                let user_id = match user_id {
                    Some(id) => id,
                    None => {
                        let user = app.current_user()?;
                        if user.is_guest {
                            anyhow::bail!("guests have no stored stats; log in or pass a user id");
                        }
                        user.id
                    }
                };
                let interval = app.config().stats_poll_interval_ms;
                let mut poller = StatsPoller::new(user_id, interval);
                loop {
                    if let Some(stats) = poller.tick(&app.database().stats, chrono::Utc::now())? {
                        println!("{}", format_stats_output(&stats, json)?);
                    }
                    std::thread::sleep(Duration::from_millis(interval.max(100)));
                }
            } else {
                let stats = app.stats(user_id.as_deref())?;
                println!("{}", format_stats_output(&stats, json)?);
            }
        }
        Commands::Role { user_id, role } => {
            let user = app.assign_role(&user_id, role)?;
            println!("{}", format_user_output(&user, json)?);
        }
        Commands::Follow { user_id } => {
            app.follow(&user_id)?;
            println!("Following {}", user_id);
        }
        Commands::Unfollow { user_id } => {
            app.unfollow(&user_id)?;
            println!("Unfollowed {}", user_id);
        }
        Commands::Profile {
            bio,
            location,
            website,
            github,
        } => {
            let update = ProfileUpdate {
                bio,
                location,
                website,
                github,
                ..ProfileUpdate::default()
            };
            if update.is_empty() {
                anyhow::bail!("nothing to update; pass at least one field");
            }
            let user = app.update_profile(&update)?;
            if json {
                println!("{}", to_json(&user.profile)?);
            } else {
                println!("Updated profile for {}", user.username);
            }
        }
        Commands::DeleteAccount => {
            app.delete_account()?;
            println!("Account deleted");
        }
        Commands::Export { output } => {
            let export = app.export()?;
            match output {
                Some(path) => {
                    write_export_file(&path, &export)?;
                    println!("Exported {} users to {}", export.users.len(), path.display());
                }
                None => println!("{}", export.to_json_pretty()?),
            }
        }
        Commands::Import { input } => {
            let export = read_export_file(&input)?;
            let imported = app.import(&export)?;
            println!("Imported {} users", imported);
        }
        Commands::Purge => {
            let removed = app.purge_expired()?;
            println!("Purged {} expired paste(s)", removed);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let Cli {
        db_path,
        json,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crazypaste_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = resolve_config(db_path);
    tracing::debug!("Using database directory {}", config.db_path);
    let app = CrazyPaste::open(config).context("failed to open the paste store")?;
    run(&app, command, json)
}
