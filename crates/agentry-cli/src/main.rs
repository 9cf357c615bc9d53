//! Agentry CLI — synthesize and run declarative agent chains.

use std::path::PathBuf;

use agentry_cli::commands::{self, RunOptions};
use clap::{Args, Parser, Subcommand};

/// Agentry — declarative agent-chain synthesis
#[derive(Parser)]
#[command(name = "agentry", version, about = "Agentry — declarative agent-chain synthesis")]
pub struct Cli {
    /// Enable debug logging (also DEBUG=true|1|yes)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the agents in a workflow document and run the chain
    Run {
        /// Workflow YAML file
        #[arg(default_value = "config/agents.yaml")]
        file: String,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        options: RunArgs,
    },

    /// Validate a workflow document without calling the model
    Validate {
        /// Workflow YAML file
        file: String,
    },

    /// Run the safety screener over a generated definition
    Screen {
        /// File to screen
        file: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Overall run timeout in seconds
    #[arg(long, env = "WORKFLOW_TIMEOUT")]
    timeout: Option<u64>,

    /// Directory for generated definitions (relative to the workspace root)
    #[arg(long, env = "AGENTRY_GENERATED_DIR")]
    generated_dir: Option<PathBuf>,

    /// Directory with worker.yaml / worker_with_tools.yaml overrides
    #[arg(long, env = "AGENTRY_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,

    /// Base directory for relative paths
    #[arg(long, env = "AGENTRY_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Summarize the final result through the model before reporting it
    #[arg(long)]
    summarize: bool,

    /// Backend adapter: openai | anthropic
    #[arg(long, env = "AGENTRY_ADAPTER")]
    adapter: Option<String>,

    /// Model API base URL
    #[arg(long, env = "AGENTRY_BASE_URL")]
    base_url: Option<String>,

    /// Model ID
    #[arg(long, env = "AGENTRY_MODEL")]
    model: Option<String>,

    /// API key (falls back to GOOGLE_API_KEY)
    #[arg(long, env = "AGENTRY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        RunOptions {
            timeout_secs: args.timeout,
            generated_dir: args.generated_dir,
            template_dir: args.template_dir,
            workspace_root: args.workspace_root,
            summarize: args.summarize,
            adapter: args.adapter,
            base_url: args.base_url,
            model: args.model,
            api_key: args.api_key,
        }
    }
}

#[tokio::main]
async fn main() {
    let env_files = commands::load_dotenv();
    let cli = Cli::parse();

    let default_filter = if cli.debug || commands::env_flag("DEBUG") {
        "agentry_core=debug,agentry_cli=debug"
    } else {
        "agentry_core=info,agentry_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
    for path in &env_files {
        tracing::debug!("[Cli] Loaded environment from '{}'", path.display());
    }

    let result = match cli.command {
        Some(Commands::Run {
            file,
            json,
            options,
        }) => commands::workflow::run(&file, &RunOptions::from(options), json).await,
        Some(Commands::Validate { file }) => commands::workflow::validate(&file),
        Some(Commands::Screen { file }) => commands::screen::screen(&file),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
