use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use computinator::envs::EnvironmentManager;
use computinator::fs::paths::app_data_dir;
use computinator::validation::clap_name_validator;

#[derive(Parser)]
#[command(name = "compenv")]
#[command(about = "Manage Computinator Code language environments", long_about = None)]
#[command(version)]
struct Cli {
    /// Environment tree root (defaults to <appdata>/environments)
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an environment directory and record it
    Create {
        /// Environment name (alphanumeric, dash, underscore, space; max 50 characters)
        #[arg(value_parser = clap_name_validator)]
        name: String,

        /// Language the environment targets (e.g. python)
        language: String,

        /// Language version (e.g. 3.11)
        version: String,
    },

    /// Delete an environment and its directory
    Delete {
        #[arg(value_parser = clap_name_validator)]
        name: String,
    },

    /// List recorded environments
    List,
}

fn open_manager(root: Option<PathBuf>) -> Result<EnvironmentManager> {
    match root {
        Some(root) => EnvironmentManager::new(root),
        None => EnvironmentManager::in_app_dir(&app_data_dir()?),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut manager = open_manager(cli.root)?;

    match cli.command {
        Commands::Create {
            name,
            language,
            version,
        } => {
            let environment = manager.create(&name, &language, &version)?;
            println!(
                "{} {} ({} {}) at {}",
                "Created".green().bold(),
                name,
                environment.language,
                environment.version,
                environment.path.display()
            );
        }
        Commands::Delete { name } => {
            if manager.delete(&name)? {
                println!("{} {}", "Deleted".green().bold(), name);
            } else {
                eprintln!("{} no such environment '{}'", "Error:".red().bold(), name);
                std::process::exit(1);
            }
        }
        Commands::List => {
            let environments = manager.list();
            if environments.is_empty() {
                println!("No environments recorded.");
            } else {
                for (name, environment) in environments {
                    println!(
                        "{}  {} {}  {}",
                        name.bold(),
                        environment.language,
                        environment.version,
                        environment.path.display().to_string().dimmed()
                    );
                }
            }
        }
    }

    Ok(())
}
