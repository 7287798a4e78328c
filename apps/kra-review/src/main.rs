//! `kra-review` command-line entry point.

use clap::{Args, Parser, Subcommand};
use kra_review::cli::{
    cmd_attach, cmd_can_edit, cmd_detach, cmd_edit, cmd_import, cmd_score, cmd_submit,
    cmd_validate, parse_edit, parse_section,
};
use kra_review::config::Config;
use kra_review::error::AppError;
use kra_review_core::{Actor, Role, Stage};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Staged KRA/goal performance reviews.
#[derive(Parser, Debug)]
#[command(name = "kra-review")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./kra-review.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Who is acting.
#[derive(Args, Debug)]
struct ActorArgs {
    /// User id of the actor
    #[arg(long)]
    user: String,

    /// employee, team_lead (r1), manager (r2) or hr
    #[arg(long)]
    role: Role,
}

impl ActorArgs {
    fn into_actor(self) -> Actor {
        Actor::new(self.user, self.role)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show KRA scores, the overall score and the performance band
    Score {
        /// Review JSON document
        file: PathBuf,
    },

    /// Check whether the current stage is ready to submit
    Validate {
        /// Review JSON document
        file: PathBuf,
    },

    /// Evaluate the role/stage edit rule
    CanEdit {
        #[arg(long)]
        role: Role,
        #[arg(long)]
        stage: Stage,
        #[arg(long)]
        read_only: bool,
    },

    /// Copy a review document into the data directory
    Import {
        /// Review JSON document
        file: PathBuf,
    },

    /// Set one field and save the draft
    Edit {
        review: String,
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        kra: String,
        /// Edit a goal of the KRA instead of the KRA itself
        #[arg(long)]
        goal: Option<String>,
        /// self, r1 or r2
        #[arg(long)]
        section: String,
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: String,
    },

    /// Submit the current stage
    Submit {
        review: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Upload a file as evidence
    Attach {
        review: String,
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        kra: String,
        #[arg(long)]
        goal: Option<String>,
        /// File to upload
        file: PathBuf,
    },

    /// Remove an evidence file
    Detach {
        review: String,
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        kra: String,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long)]
        evidence: String,
    },
}

async fn run(command: Command, config: &Config, json: bool) -> Result<ExitCode, AppError> {
    match command {
        Command::Score { file } => cmd_score(&file, json)?,
        Command::Validate { file } => {
            if !cmd_validate(&file, json)? {
                return Ok(ExitCode::from(2));
            }
        }
        Command::CanEdit {
            role,
            stage,
            read_only,
        } => cmd_can_edit(role, stage, read_only, json)?,
        Command::Import { file } => {
            cmd_import(config, &file, json).await?;
        }
        Command::Edit {
            review,
            actor,
            kra,
            goal,
            section,
            field,
            value,
        } => {
            let section = parse_section(&section)?;
            let edit = parse_edit(&kra, goal.as_deref(), section, &field, &value)?;
            cmd_edit(config, &review, actor.into_actor(), edit, json).await?;
        }
        Command::Submit { review, actor } => {
            cmd_submit(config, &review, actor.into_actor(), json).await?;
        }
        Command::Attach {
            review,
            actor,
            kra,
            goal,
            file,
        } => {
            cmd_attach(config, &review, actor.into_actor(), &kra, goal.as_deref(), &file, json)
                .await?;
        }
        Command::Detach {
            review,
            actor,
            kra,
            goal,
            evidence,
        } => {
            cmd_detach(config, &review, actor.into_actor(), &kra, goal.as_deref(), &evidence, json)
                .await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over the configured filter
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli.command, &config, cli.json).await {
        Ok(code) => code,
        Err(AppError::Review(e)) if !e.messages().is_empty() => {
            eprintln!("Error: review is incomplete");
            for message in e.messages() {
                eprintln!("  - {message}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
