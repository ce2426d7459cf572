use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use veda::sink::{FileOutputSink, LogStatusReporter};
use veda::{
    EngineConfig, FixSuggestion, Graph, GraphExecutor, LlmInvoker, MockLlmInvoker, OpenAiInvoker,
    RunRequest, RunStatus, TextAggregator, ToolRegistry, VedaError, WorkflowRunner,
};

#[derive(Parser)]
#[command(name = "veda", version, about = "Workflow-graph executor for research summarization")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Provider {
    Mock,
    Openai,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a workflow graph over a set of input files
    Run {
        /// Path to the graph JSON document
        graph: String,

        /// Project name, first level of the output tree
        #[arg(long)]
        project: String,

        /// Run date (YYYY-MM-DD), second level of the output tree
        #[arg(long)]
        date: String,

        /// Input files; repeat the flag for multiple files
        #[arg(long = "file")]
        files: Vec<String>,

        /// Replace the prompt template for every LLM node
        #[arg(long)]
        custom_prompt: Option<String>,

        /// LLM backend
        #[arg(long, value_enum, default_value = "mock")]
        provider: Provider,

        /// Override the graph's LLM model
        #[arg(long)]
        model: Option<String>,

        /// Override the step guard
        #[arg(long)]
        step_limit: Option<u32>,

        /// Override the output base directory
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Parse and validate a graph document without running it
    Check {
        /// Path to the graph JSON document
        graph: String,
    },

    /// Print a starter graph document to stdout
    Template,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            if let Some(fix) = e.fix_suggestion() {
                eprintln!("{} {fix}", "hint:".yellow().bold());
            }
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command) -> Result<ExitCode, VedaError> {
    match command {
        Command::Run {
            graph,
            project,
            date,
            files,
            custom_prompt,
            provider,
            model,
            step_limit,
            output_dir,
        } => {
            run(
                &graph,
                project,
                date,
                files,
                custom_prompt,
                provider,
                model,
                step_limit,
                output_dir,
            )
            .await
        }
        Command::Check { graph } => check(&graph).await,
        Command::Template => {
            let doc = serde_json::to_string_pretty(&veda::graph::template())?;
            println!("{doc}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    graph_path: &str,
    project: String,
    date: String,
    files: Vec<String>,
    custom_prompt: Option<String>,
    provider: Provider,
    model: Option<String>,
    step_limit: Option<u32>,
    output_dir: Option<String>,
) -> Result<ExitCode, VedaError> {
    let mut config = EngineConfig::from_env();
    if let Some(limit) = step_limit {
        config.step_limit = limit;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir.into();
    }

    let doc = tokio::fs::read_to_string(graph_path).await?;
    let mut graph = Graph::from_json(&doc)?;
    if let Some(model) = model {
        graph.llm_model = Some(model);
    }

    let tools: Arc<ToolRegistry> = Arc::new(ToolRegistry::with_builtins());
    let llm: Arc<dyn LlmInvoker> = match provider {
        Provider::Mock => Arc::new(MockLlmInvoker::new()),
        Provider::Openai => {
            Arc::new(OpenAiInvoker::from_env().map_err(|e| VedaError::NodeExecution {
                node_id: "llm".to_string(),
                reason: e.to_string(),
            })?)
        }
    };

    let runner = WorkflowRunner::new(
        GraphExecutor::new(tools.clone(), llm).with_step_limit(config.step_limit),
        TextAggregator::new(tools),
        Arc::new(FileOutputSink::new(config.output_dir)),
        Arc::new(LogStatusReporter),
    );

    let result = runner
        .run(
            &graph,
            RunRequest {
                project,
                date,
                wf_id: None,
                files,
                custom_prompt,
            },
        )
        .await;

    match result.status {
        RunStatus::Success => {
            println!(
                "{} workflow {} in {} steps ({:.2}s)",
                "ok:".green().bold(),
                result.wf_id,
                result.report.steps,
                result.report.duration.as_secs_f64()
            );
            if let Some(path) = result.output_path {
                println!("     output: {path}");
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => match result.report.outcome {
            Err(e) => Err(e),
            Ok(()) => Ok(ExitCode::FAILURE),
        },
    }
}

async fn check(graph_path: &str) -> Result<ExitCode, VedaError> {
    let doc = tokio::fs::read_to_string(graph_path).await?;
    let graph = Graph::from_json(&doc)?;
    println!(
        "{} {} ({} nodes, {} edges)",
        "ok:".green().bold(),
        graph.name,
        graph.nodes.len(),
        graph.edges.len()
    );
    Ok(ExitCode::SUCCESS)
}
