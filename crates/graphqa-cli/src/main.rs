//! GraphQA CLI
//!
//! Ask a Neo4j graph questions in plain language:
//! - `ask`: generate Cypher, run it (healing once on a syntax error), summarize
//! - `schema`: print the schema the prompt would carry
//! - `extract`: pull the delimited query out of model text on stdin

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use graphqa_core::config::Neo4jConfig;
use graphqa_core::llm::providers::UnifiedClient;
use graphqa_core::llm::ChannelSink;
use graphqa_core::store::neo4j::Neo4jStore;
use graphqa_core::{
    extract_query, remove_relationship_direction, ExampleSet, GraphQaAssistant, GraphStore,
    LanguageModel, QueryOutput, Schema, Summarizer, Text2Cypher, Text2CypherConfig,
};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "graphqa")]
#[command(author, version, about = "GraphQA: ask a graph database questions in natural language")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question against the configured Neo4j database.
    ///
    /// Reads the model from OPENAI_*/ANTHROPIC_*/LOCAL_LLM_* and the database
    /// from NEO4J_* environment variables.
    Ask(AskArgs),

    /// Print the schema discovered from the database.
    Schema,

    /// Read model output from stdin and print the delimited query.
    Extract {
        /// Keep `->`/`<-` in the printed query
        #[arg(long)]
        keep_direction: bool,
    },
}

#[derive(Args)]
struct AskArgs {
    question: String,

    /// Pipeline settings (JSON); GRAPHQA_* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not retry a query the database rejects
    #[arg(long)]
    no_heal: bool,

    /// Execute the query with relationship directions as generated
    #[arg(long)]
    keep_direction: bool,

    /// Leave the schema out of the prompt
    #[arg(long)]
    no_schema: bool,

    /// Few-shot examples file (`#question` lines followed by Cypher)
    #[arg(long)]
    examples: Option<PathBuf>,

    /// Use this schema text instead of asking the database
    #[arg(long)]
    schema_file: Option<PathBuf>,

    /// Stream the answer as it is generated
    #[arg(long)]
    stream: bool,

    /// Print the query output without a summary
    #[arg(long)]
    no_summary: bool,

    /// Emit JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphqa_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ask(args) => cmd_ask(args).await,
        Commands::Schema => cmd_schema().await,
        Commands::Extract { keep_direction } => cmd_extract(keep_direction),
    }
}

fn connect_store() -> Result<Arc<dyn GraphStore>> {
    let config = Neo4jConfig::from_env()?;
    Ok(Arc::new(Neo4jStore::new(config)?))
}

fn pipeline_config(args: &AskArgs) -> Result<Text2CypherConfig> {
    let config = match &args.config {
        Some(path) => Text2CypherConfig::load(path)?,
        None => Text2CypherConfig::default(),
    };
    let mut config = config.with_env_overrides()?;

    if args.no_heal {
        config.heal_cypher = false;
    }
    if args.keep_direction {
        config.ignore_relationship_direction = false;
    }
    if args.no_schema || args.schema_file.is_some() {
        config.use_schema = false;
    }
    Ok(config)
}

async fn cmd_ask(args: AskArgs) -> Result<()> {
    let config = pipeline_config(&args)?;
    let model: Arc<dyn LanguageModel> = Arc::new(UnifiedClient::from_env()?);
    let store = connect_store()?;

    let examples = match &args.examples {
        Some(path) => {
            let examples = ExampleSet::load(path)?;
            eprintln!("{} {} example(s) from {}", "loaded".green().bold(), examples.len(), path.display());
            examples
        }
        None => ExampleSet::default(),
    };

    let mut text2cypher = Text2Cypher::from_config(model.clone(), store, &config, examples)
        .await
        .context("failed to build the prompt")?;
    if let Some(path) = &args.schema_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        text2cypher = text2cypher.with_schema(Some(Schema::new(text)));
    }

    if args.no_summary {
        let output = text2cypher
            .run(&args.question, &[], config.heal_cypher)
            .await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&output.to_json())?);
        } else {
            print_cypher(output.generated_cypher.as_deref(), output.healed());
            print_output(&output.output)?;
        }
        return Ok(());
    }

    let assistant = GraphQaAssistant::new(
        text2cypher,
        Summarizer::new(model, config.exclude_embeddings),
    );

    let answer = if args.stream && !args.json {
        let (tx, mut rx) = mpsc::channel::<String>(64);
        let printer = tokio::spawn(async move {
            let mut stdout = io::stdout();
            while let Some(fragment) = rx.recv().await {
                let _ = write!(stdout, "{fragment}");
                let _ = stdout.flush();
            }
        });

        let mut sink = ChannelSink(tx);
        let answer = assistant
            .ask_streaming(&args.question, &[], config.heal_cypher, &mut sink)
            .await;
        drop(sink);
        printer.await?;
        println!();
        answer?
    } else {
        assistant
            .ask(&args.question, &[], config.heal_cypher)
            .await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    print_cypher(answer.generated_cypher.as_deref(), answer.healed);
    if !args.stream {
        println!("{}", answer.answer);
    }
    Ok(())
}

fn print_cypher(cypher: Option<&str>, healed: bool) {
    let Some(cypher) = cypher else {
        return;
    };
    let label = if healed {
        "cypher (healed)".yellow().bold()
    } else {
        "cypher".green().bold()
    };
    eprintln!("{label} {}", cypher.bold());
}

fn print_output(output: &QueryOutput) -> Result<()> {
    match output {
        QueryOutput::Rows { rows } => {
            for row in rows {
                println!("{}", serde_json::to_string(row)?);
            }
            eprintln!("{} {} row(s)", "ok".green().bold(), rows.len());
        }
        QueryOutput::QueryError { code, message } => {
            eprintln!("{} [{code}] {message}", "error".red().bold());
        }
        QueryOutput::Clarification { message } => {
            println!("{message}");
        }
    }
    Ok(())
}

async fn cmd_schema() -> Result<()> {
    let store = connect_store()?;
    let schema = store.schema().await?;
    if schema.is_empty() {
        eprintln!("{}", "database reported no labels or relationships".yellow());
    } else {
        println!("{schema}");
    }
    Ok(())
}

fn cmd_extract(keep_direction: bool) -> Result<()> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;

    let query = extract_query(&text).ok_or_else(|| anyhow!("no delimited query in input"))?;
    if keep_direction {
        println!("{query}");
    } else {
        println!("{}", remove_relationship_direction(query));
    }
    Ok(())
}
