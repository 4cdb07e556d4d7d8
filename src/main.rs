//! studyrag CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::{Path, PathBuf};
use studyrag::{
    commands::{
        cmd_diagnose, cmd_info, cmd_ingest, cmd_init, cmd_questions, cmd_search, cmd_study_plan,
        cmd_summary, cmd_sweep, print_diagnose, print_document_info, print_generation,
        print_ingest_report, print_init, print_search_results, print_sweep_stats,
        QuestionOptions, SearchOptions, StudyPlanOptions, SummaryOptions,
    },
    config::Config,
    error::{Error, Result},
    generate::{Difficulty, Level, QuestionType, SummaryStyle},
    ingest::IngestOptions,
    models::{ContentType, MediaKind},
    progress::LogWriterFactory,
    store::ChromaStore,
};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "studyrag")]
#[command(version, about = "Turn study material into a searchable index and generate study aids", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Check embedding service and vector store connectivity
    Diagnose,

    /// Ingest a study file (pdf, txt, md, pptx, docx, video or audio)
    Ingest {
        /// Path to the file
        file: PathBuf,

        /// Media kind (defaults to the file extension)
        #[arg(long)]
        kind: Option<MediaKind>,

        /// Reuse an existing document id, overwriting its records
        #[arg(long)]
        document_id: Option<String>,
    },

    /// Semantic search over ingested material
    Search {
        /// The search query
        query: String,

        /// Restrict to these document ids
        #[arg(long = "document")]
        documents: Vec<String>,

        /// Restrict to these content types (combined, text, image_description, ocr, transcript)
        #[arg(long = "content-type")]
        content_types: Vec<ContentType>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Generate practice questions for a document
    Questions {
        /// Document id
        document_id: String,

        /// Topic to focus retrieval on
        #[arg(long)]
        topic: Option<String>,

        /// Number of questions
        #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
        count: u32,

        #[arg(long, value_enum, default_value_t)]
        difficulty: Difficulty,

        /// Question types to include
        #[arg(long = "type", value_enum, default_values_t = [QuestionType::MultipleChoice])]
        types: Vec<QuestionType>,

        /// Leave image descriptions out of the context
        #[arg(long)]
        no_visual: bool,
    },

    /// Summarize a document
    Summary {
        /// Document id
        document_id: String,

        #[arg(long, value_enum, default_value_t)]
        style: SummaryStyle,

        /// Approximate summary length in words
        #[arg(long, default_value = "500", value_parser = clap::value_parser!(u32).range(100..=5000))]
        max_length: u32,

        /// Summarize text records only
        #[arg(long)]
        no_multimedia: bool,
    },

    /// Build a study plan for a document
    StudyPlan {
        /// Document id
        document_id: String,

        /// Total study hours available
        #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=168))]
        hours: u32,

        #[arg(long, value_enum, default_value_t)]
        level: Level,

        /// Areas to emphasize
        #[arg(long = "focus")]
        focus_areas: Vec<String>,
    },

    /// Show what is stored for a document
    Info {
        /// Document id
        document_id: String,
    },

    /// Remove stale ingestion artifacts from the temp directory
    Sweep {
        /// Age in seconds after which artifacts are removed
        #[arg(long)]
        max_age_secs: Option<u64>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(e) = run(cli).await {
        if json {
            match serde_json::to_string_pretty(&e.payload()) {
                Ok(payload) => println!("{}", payload),
                Err(_) => error!("{}", e),
            }
        } else {
            error!("{}", e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory))
        .with(filter)
        .init();

    if let Commands::Init { force } = cli.command {
        let path = cmd_init(&init_config_path(cli.config.as_deref()), force)?;
        if cli.json {
            println!("{}", serde_json::json!({ "config": path }));
        } else {
            print_init(&path);
        }
        return Ok(());
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "studyrag", &mut std::io::stdout());
        return Ok(());
    }

    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_from(None)?,
    };

    if let Commands::Sweep { max_age_secs } = cli.command {
        let stats = cmd_sweep(&config, max_age_secs);
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print_sweep_stats(&stats);
        }
        return Ok(());
    }

    let store = ChromaStore::connect(&config)?;

    match cli.command {
        Commands::Diagnose => {
            let report = cmd_diagnose(&config, &store).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_diagnose(&report);
            }
            if !report.passed() {
                return Err(Error::Other("Diagnostics failed".to_string()));
            }
        }

        Commands::Ingest {
            file,
            kind,
            document_id,
        } => {
            let options = IngestOptions { kind, document_id };
            let report = cmd_ingest(&config, &store, &file, options, !cli.json).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_ingest_report(&report);
            }
        }

        Commands::Search {
            query,
            documents,
            content_types,
            limit,
        } => {
            let options = SearchOptions {
                document_ids: documents,
                content_types,
                limit,
            };
            let output = cmd_search(&config, &store, &query, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_search_results(&output);
            }
        }

        Commands::Questions {
            document_id,
            topic,
            count,
            difficulty,
            types,
            no_visual,
        } => {
            let options = QuestionOptions {
                topic,
                count,
                difficulty,
                question_types: types,
                include_visual: !no_visual,
            };
            let report = cmd_questions(&config, &store, &document_id, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_generation(&report);
            }
        }

        Commands::Summary {
            document_id,
            style,
            max_length,
            no_multimedia,
        } => {
            let options = SummaryOptions {
                style,
                max_length,
                include_multimedia: !no_multimedia,
            };
            let report = cmd_summary(&config, &store, &document_id, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_generation(&report);
            }
        }

        Commands::StudyPlan {
            document_id,
            hours,
            level,
            focus_areas,
        } => {
            let options = StudyPlanOptions {
                hours,
                level,
                focus_areas,
            };
            let report = cmd_study_plan(&config, &store, &document_id, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_generation(&report);
            }
        }

        Commands::Info { document_id } => {
            let info = cmd_info(&config, &store, &document_id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                print_document_info(&info);
            }
        }

        Commands::Init { .. } | Commands::Completions { .. } | Commands::Sweep { .. } => {}
    }

    Ok(())
}

/// A `--config` pointing at a .toml file is used as-is; a directory gets
/// `config.toml` inside it
fn init_config_path(config: Option<&Path>) -> PathBuf {
    match config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => path.to_path_buf(),
        Some(dir) => dir.join("config.toml"),
        None => Config::default_config_path(),
    }
}
