mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ColorChoice, CommandFactory as _, Parser, Subcommand};
use rudder_core::pipeline_api::{stage_context_from_json, StageExecution, Task as _};
use rudder_kato::{KatoClient, KatoClientConfig};
use rudder_tasks::PatchManifestTask;
use serde_json::Value;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    match &args.command {
        Commands::PatchManifest {
            backend_exe,
            backend_arg,
            context_json,
            context_file,
            stage_name,
        } => {
            logging::set_up(&args.options)?;

            let context_text = match (context_json, context_file) {
                (Some(inline), None) => inline.clone(),
                (None, Some(file)) => std::fs::read_to_string(file).with_context(|| {
                    format!("could not read stage context from {}", file.display())
                })?,
                _ => bail!(
                    "provide the stage context with exactly one of --context-json or --context-file"
                ),
            };
            let context =
                stage_context_from_json(&context_text).context("could not parse stage context")?;
            let stage = StageExecution::new(stage_name.clone(), context);

            let task = PatchManifestTask::new(Arc::new(KatoClient::new(KatoClientConfig {
                backend_executable: backend_exe.clone(),
                backend_args: backend_arg.clone(),
            })));

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(task.execute(&stage))?;

            println!(
                "{}",
                serde_json::to_string_pretty(&Value::Object(result.context))?
            );
            Ok(())
        }
        Commands::GenerateMan => {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        }
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            // TODO: remove the generate-* commands from the completion
            let mut cmd = Args::command();
            clap_complete::generate(
                shell.clone(),
                &mut cmd,
                "rudder-task-runner",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("rudder-task-runner error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Run a single rudder pipeline task against a stage context, without the
/// pipeline engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Parser, Debug, Clone)]
struct Options {
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the patch-manifest task once and print its output context
    PatchManifest {
        /// The executable that implements the operation-execution backend
        #[arg(long)]
        backend_exe: String,

        /// Extra argument for the backend executable; repeatable
        #[arg(long)]
        backend_arg: Vec<String>,

        /// The (whole) JSON stage context
        #[arg(long("context-json"))]
        context_json: Option<String>,

        /// Read the JSON stage context from a file
        #[arg(long("context-file"), conflicts_with = "context_json")]
        context_file: Option<PathBuf>,

        /// Stage name used in logs
        #[arg(long, default_value = "patchManifest")]
        stage_name: String,
    },

    /// Generate markdown documentation for rudder-task-runner
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for rudder-task-runner
    #[command(hide = true)]
    GenerateMan,

    /// Generate a shell completion script
    #[command(hide = true)]
    GenerateCompletion {
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
