//! Prompt Sync - Manage reusable AI prompts and sync them with Notion.
//!
//! Prompts live in a local `SQLite` record store. When Notion is connected,
//! `sync` merges the local collection with a Notion database using
//! last-writer-wins on each prompt's update time.
//!
//! QUICK START:
//!   prompt-sync init                                  # Config file + default tags
//!   prompt-sync add "Explain this code" -t Coding     # Add a prompt
//!   pbpaste | prompt-sync capture --title "Snippet"   # Save selected text
//!   prompt-sync search review -t Coding               # Find prompts
//!   prompt-sync connect --api-key K --page-id P       # Link Notion
//!   prompt-sync backend notion && prompt-sync sync    # Sync both ways

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::io::{Read, Write};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_prompt_detail, format_prompts_json, format_prompts_table, format_status,
    format_sync_report, format_tags, OutputFormat, PromptService, SyncService,
};
use cli::{Cli, Commands};
use domain::{AppConfig, AppError, NewPrompt, Prompt, PromptPatch, RemoteConfig};
use infrastructure::{
    config_file_path, ensure_config_exists, load_config, LocalStorage, NotionClient, PromptStore,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Wired-up services for one command.
struct App {
    store: PromptStore,
    prompts: PromptService,
    sync: SyncService,
}

impl App {
    fn open(config: &AppConfig) -> domain::Result<Self> {
        let records = LocalStorage::open(&config.records_db_path())?;
        let store = PromptStore::new(Arc::new(records));
        let remote = Arc::new(NotionClient::new(&config.notion)?);

        Ok(Self {
            prompts: PromptService::new(store.clone(), remote.clone()),
            sync: SyncService::new(store.clone(), remote),
            store,
        })
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;

    let config = load_config()?;
    let app = App::open(&config)?;
    let mutated = cli.command.mutates_prompts();

    match cli.command {
        Commands::Init => cmd_init(&app, &config).await?,
        Commands::Add {
            content,
            title,
            tags,
        } => {
            let content = match content {
                Some(text) => text,
                None => read_stdin()?,
            };
            let prompt = app
                .prompts
                .add(NewPrompt {
                    title,
                    content,
                    tags: Some(tags),
                })
                .await?;
            print_saved("Added", &prompt, format)?;
        }
        Commands::Capture { title, tags } => {
            let selection = read_stdin()?;
            let prompt = app.prompts.capture(&selection, title, Some(tags)).await?;
            print_saved("Captured", &prompt, format)?;
        }
        Commands::Edit {
            id,
            title,
            content,
            tags,
        } => {
            let prompt = app
                .prompts
                .edit(
                    &id,
                    PromptPatch {
                        title,
                        content,
                        tags,
                    },
                )
                .await?;
            print_saved("Updated", &prompt, format)?;
        }
        Commands::Delete { id } => {
            let prompt = app.prompts.delete(&id).await?;
            println!("{} Deleted {}", "✓".green().bold(), prompt.title);
        }
        Commands::List => {
            let prompts = app.prompts.list().await?;
            print_prompts(&prompts, format)?;
        }
        Commands::Show { id } => {
            let prompt = app.prompts.get(&id).await?;
            match format {
                OutputFormat::Table => println!("{}", format_prompt_detail(&prompt)),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&prompt).map_err(AppError::json_parse)?
                ),
            }
        }
        Commands::Search { query, tags } => {
            let prompts = app.prompts.search(&query, &tags).await?;
            print_prompts(&prompts, format)?;
        }
        Commands::Tags => {
            let tags = app.prompts.tags().await?;
            match format {
                OutputFormat::Table => println!("{}\n{}", "🏷  Tags".bold(), format_tags(&tags)),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&tags).map_err(AppError::json_parse)?
                ),
            }
        }
        Commands::Export { output } => cmd_export(&app, output.as_deref()).await?,
        Commands::Import { input } => cmd_import(&app, input.as_deref()).await?,
        Commands::Backend { backend } => {
            app.prompts.switch_backend(backend).await?;
            println!("{} Active backend: {}", "✓".green().bold(), backend);
        }
        Commands::Connect { api_key, page_id } => {
            app.prompts
                .configure_remote(RemoteConfig { api_key, page_id })
                .await?;
            println!("{} Connected to Notion", "✓".green().bold());
            println!("  Run `prompt-sync backend notion` then `prompt-sync sync`");
        }
        Commands::Disconnect => {
            app.prompts.disconnect_remote().await?;
            println!("{} Disconnected from Notion, using local storage", "✓".green().bold());
        }
        Commands::Sync { force } => {
            let report = app.sync.sync(force).await?;
            println!("{}", format_sync_report(&report));
        }
        Commands::Status => cmd_status(&app, format).await?,
    }

    if mutated {
        sync_after_change(&app, &config).await;
    }

    Ok(())
}

/// Follow a local change with a sync pass when `auto_sync` is set. The
/// change itself is already saved, so a failed pass is only reported.
async fn sync_after_change(app: &App, config: &AppConfig) {
    match app.sync.sync_after_change(config.notion.auto_sync).await {
        Ok(Some(report)) => println!("{}", format_sync_report(&report)),
        Ok(None) => {}
        Err(e) => eprintln!("{} Auto-sync failed: {}", "⚠".yellow(), e),
    }
}

/// Write the default config and seed tags.
async fn cmd_init(app: &App, config: &AppConfig) -> domain::Result<()> {
    let path = config_file_path();
    if ensure_config_exists(&path)? {
        println!("{} Created {}", "✓".green().bold(), path.display());
    } else {
        println!("{} Config already exists: {}", "ℹ".blue(), path.display());
    }

    app.store.initialize_default_tags().await?;
    println!("  Data: {}", config.records_db_path().display());

    Ok(())
}

/// Export prompts to a file or stdout.
async fn cmd_export(app: &App, output_path: Option<&str>) -> domain::Result<()> {
    let content = app.prompts.export_json().await?;

    match output_path {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .map_err(|e| AppError::io(format!("Failed to create {path}"), e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| AppError::io("Failed to write file", e))?;
            println!("{} Exported prompts to {}", "✓".green().bold(), path);
        }
        None => {
            println!("{content}");
        }
    }

    Ok(())
}

/// Import prompts from a file or stdin.
async fn cmd_import(app: &App, input_path: Option<&str>) -> domain::Result<()> {
    let text = match input_path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read {path}"), e))?,
        None => read_stdin()?,
    };

    let merged = app.prompts.import_from_str(&text).await?;
    println!(
        "{} Imported prompts, collection now has {}",
        "✓".green().bold(),
        merged.len()
    );

    Ok(())
}

/// Show backend, connection and sync state.
async fn cmd_status(app: &App, format: OutputFormat) -> domain::Result<()> {
    let state = app.prompts.state().await?;
    let remote = app.store.remote_config().await?;
    let status = app.store.sync_status().await?;

    match format {
        OutputFormat::Table => println!(
            "{}",
            format_status(state.backend, remote.as_ref(), &status, state.prompts.len())
        ),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "backend": state.backend,
                "connected": remote.is_some(),
                "prompts": state.prompts.len(),
                "syncStatus": status,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).map_err(AppError::json_parse)?
            );
        }
    }

    Ok(())
}

fn print_prompts(prompts: &[Prompt], format: OutputFormat) -> domain::Result<()> {
    match format {
        OutputFormat::Table => {
            if prompts.is_empty() {
                println!("No prompts found.");
            } else {
                println!("{}", format_prompts_table(prompts));
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                format_prompts_json(prompts).map_err(AppError::json_parse)?
            );
        }
    }
    Ok(())
}

fn print_saved(action: &str, prompt: &Prompt, format: OutputFormat) -> domain::Result<()> {
    match format {
        OutputFormat::Table => {
            println!(
                "{} {} {} ({})",
                "✓".green().bold(),
                action,
                prompt.title,
                prompt.id.cyan()
            );
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(prompt).map_err(AppError::json_parse)?
        ),
    }
    Ok(())
}

fn read_stdin() -> domain::Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| AppError::io("Failed to read stdin", e))?;
    Ok(text)
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
