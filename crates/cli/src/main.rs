//! localai CLI
//!
//! Command-line host for the Local AI formula functions. Every formula
//! subcommand prints exactly what a spreadsheet cell would show.
//!
//! Copyright (c) 2025 Michael A Wright

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_formulas::{
    formulas, AddinConfig, ConfigStore, Formula, GenerationRequest, Range, Service, SummaryStyle,
};
use llm_bridge::{ClientConfig, FormulaRunner, LocalAiClient};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, Level};

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nbuilt: ",
    env!("LOCALAI_BUILD_TIME"),
    "\nhost: ",
    env!("LOCALAI_BUILD_HOST")
);

#[derive(Parser)]
#[command(name = "localai")]
#[command(about = "AI formula functions backed by a local Ollama or LM Studio server", long_about = None)]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// Config file (default: <config dir>/localai-sheets/LocalAI.config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service to use instead of the configured one: ollama or lmstudio
    #[arg(long, global = true)]
    service: Option<Service>,

    /// Server base URL instead of the configured one
    #[arg(long, global = true)]
    url: Option<String>,

    /// Generation timeout in seconds
    #[arg(long, global = true, default_value_t = 120)]
    timeout: u64,

    /// Log requests to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// AI.CHAT - General AI conversation and responses
    Chat {
        /// Prompt to send ("-" reads stdin)
        prompt: String,

        #[arg(short, long)]
        model: Option<String>,

        /// Response creativity 0-1
        #[arg(short, long)]
        temperature: Option<f64>,
    },

    /// AI.SUMMARIZE - Summarize text
    Summarize {
        /// Text to summarize ("-" reads stdin)
        text: String,

        #[arg(short, long)]
        model: Option<String>,

        /// Summary style: brief, detailed, bullet
        #[arg(short, long, default_value = "brief")]
        style: String,
    },

    /// AI.TRANSLATE - Translate to any language
    Translate {
        /// Text to translate ("-" reads stdin)
        text: String,

        /// Target language
        #[arg(short, long)]
        language: String,

        #[arg(short, long)]
        model: Option<String>,

        /// Use a formal tone
        #[arg(long)]
        formal: bool,
    },

    /// AI.ANALYZE - Analyze tabular data and answer a question about it
    Analyze {
        /// Question about the data
        question: String,

        /// Delimited data file ("-" reads stdin)
        #[arg(short, long)]
        data: PathBuf,

        /// Field delimiter
        #[arg(long, default_value_t = ',')]
        delimiter: char,

        #[arg(short, long)]
        model: Option<String>,
    },

    /// AI.SENTIMENT - Analyze text sentiment
    Sentiment {
        /// Text to analyze ("-" reads stdin)
        text: String,

        #[arg(short, long)]
        model: Option<String>,

        /// Return a detailed analysis
        #[arg(long)]
        detailed: bool,
    },

    /// AI.CODE - Generate code or spreadsheet formulas
    Code {
        /// What the code or formula should do ("-" reads stdin)
        description: String,

        /// Programming language, or "excel" for formulas
        #[arg(short, long)]
        language: Option<String>,

        #[arg(short, long)]
        model: Option<String>,
    },

    /// Run AI.CHAT for every line of a file concurrently
    Batch {
        /// One prompt per line ("-" reads stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long)]
        temperature: Option<f64>,

        /// Requests sent to the server at once
        #[arg(short, long, default_value_t = llm_bridge::functions::DEFAULT_MAX_CONCURRENT)]
        concurrency: usize,

        /// Emit a JSON array of {prompt, result}
        #[arg(long)]
        json: bool,
    },

    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check that the configured server answers
    TestConnection {
        /// Also send a short generation request
        #[arg(long)]
        generate: bool,
    },

    /// List models offered by the configured server
    Models {
        #[arg(long)]
        json: bool,
    },

    /// Show the function guide
    Functions,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Print the config file location
    Path,

    /// Save --service, --url and --model to the config file
    Set {
        /// Default model
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    debug!(
        version = built_info::PKG_VERSION,
        target = built_info::TARGET,
        "localai starting"
    );

    let store = match &cli.config {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::from_default_location()?,
    };

    match cli.command {
        Commands::Config { action } => run_config(&store, action, cli.service, cli.url),
        Commands::Functions => {
            println!("{}", formulas::help_text());
            Ok(())
        }
        command => {
            let addin = effective_config(&store, cli.service, cli.url)?;
            let mut client_config = ClientConfig::from_addin(addin);
            client_config.generate_timeout_secs = cli.timeout;
            let client = Arc::new(LocalAiClient::new(client_config)?);
            run_command(client, command).await
        }
    }
}

/// Saved config, then environment, then command-line overrides
fn effective_config(
    store: &ConfigStore,
    service: Option<Service>,
    url: Option<String>,
) -> Result<AddinConfig> {
    let mut config = store.load_or_init()?.with_env_overrides();
    if let Some(service) = service {
        config.service = service;
    }
    if let Some(url) = url {
        config.api_url = url;
    }
    debug!(?config, "effective configuration");
    Ok(config)
}

fn run_config(
    store: &ConfigStore,
    action: ConfigAction,
    service: Option<Service>,
    url: Option<String>,
) -> Result<()> {
    match action {
        ConfigAction::Show { json } => {
            let config = effective_config(store, service, url)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Service={}", config.service);
                println!("ApiUrl={}", config.api_url);
                println!("DefaultModel={}", config.default_model);
            }
        }
        ConfigAction::Path => println!("{}", store.path().display()),
        ConfigAction::Set { model } => {
            let mut config = store.load_or_init()?;
            match (service, url) {
                (Some(service), url) => config.set_service(service, url),
                (None, Some(url)) => config.api_url = url,
                (None, None) => {}
            }
            if let Some(model) = model {
                config.default_model = model;
            }
            store.save(&config)?;
            println!("Configuration saved to {}", store.path().display());
        }
    }
    Ok(())
}

async fn run_command(client: Arc<LocalAiClient>, command: Commands) -> Result<()> {
    let default_model = client.config().addin.default_model.clone();
    let runner = FormulaRunner::new(Arc::clone(&client), default_model);

    let formula = match command {
        Commands::Chat {
            prompt,
            model,
            temperature,
        } => Formula::Chat {
            prompt: read_arg(&prompt)?,
            model,
            temperature,
        },
        Commands::Summarize { text, model, style } => Formula::Summarize {
            text: read_arg(&text)?,
            model,
            style: style.parse::<SummaryStyle>().unwrap_or_default(),
        },
        Commands::Translate {
            text,
            language,
            model,
            formal,
        } => Formula::Translate {
            text: read_arg(&text)?,
            language,
            model,
            formal,
        },
        Commands::Analyze {
            question,
            data,
            delimiter,
            model,
        } => Formula::Analyze {
            data: Range::from_delimited(&read_source(&data)?, delimiter),
            question,
            model,
        },
        Commands::Sentiment {
            text,
            model,
            detailed,
        } => Formula::Sentiment {
            text: read_arg(&text)?,
            model,
            detailed,
        },
        Commands::Code {
            description,
            language,
            model,
        } => Formula::Code {
            description: read_arg(&description)?,
            language,
            model,
        },
        Commands::Batch {
            input,
            model,
            temperature,
            concurrency,
            json,
        } => {
            let runner = runner.with_max_concurrent(concurrency);
            return run_batch(&runner, &input, model, temperature, json).await;
        }
        Commands::TestConnection { generate } => return test_connection(&client, generate).await,
        Commands::Models { json } => {
            let models = client.list_models().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else {
                for model in models {
                    println!("{}", model);
                }
            }
            return Ok(());
        }
        Commands::Config { .. } | Commands::Functions => unreachable!("handled in main"),
    };

    let text = runner
        .spawn(formula)
        .await
        .context("formula task failed")?;
    println!("{}", text);
    Ok(())
}

async fn run_batch(
    runner: &FormulaRunner<LocalAiClient>,
    input: &Path,
    model: Option<String>,
    temperature: Option<f64>,
    json: bool,
) -> Result<()> {
    let source = read_source(input)?;
    let prompts: Vec<String> = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    let batch = prompts
        .iter()
        .map(|prompt| Formula::Chat {
            prompt: prompt.clone(),
            model: model.clone(),
            temperature,
        })
        .collect();
    let results = runner.evaluate_all(batch).await;

    if json {
        let rows: Vec<_> = prompts
            .iter()
            .zip(&results)
            .map(|(prompt, result)| serde_json::json!({ "prompt": prompt, "result": result }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for (prompt, result) in prompts.iter().zip(&results) {
            println!("## {}\n{}\n", prompt, result);
        }
    }
    Ok(())
}

async fn test_connection(client: &LocalAiClient, generate: bool) -> Result<()> {
    let report = client.test_connection().await?;
    println!(
        "Connected to {} at {}. Found {} model(s).",
        report.service.label(),
        report.url,
        report.models.len()
    );

    if generate {
        let request = GenerationRequest::new(
            "Test connection",
            client.config().addin.default_model.as_str(),
            0.7,
        );
        let response = client.generate(&request).await?;
        let preview: String = response.chars().take(100).collect();
        println!("Response: {}...", preview);
    }
    Ok(())
}

/// Literal argument, or stdin when it is "-"
fn read_arg(value: &str) -> Result<String> {
    if value == "-" {
        read_stdin()
    } else {
        Ok(value.to_string())
    }
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        read_stdin()
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}
