mod commands;
mod output;
mod session;
mod theme;

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};

use blockfield::{BlockRegistry, BlockType};

use commands::{
    handle::{self, HandleArgs, handle_handle},
    key::{self, KeyArgs, handle_key},
    render::{self, RenderArgs, handle_render},
    scopes::{self, handle_scopes},
};
use output::{GlobalOptions, OutputFormat, OutputManager};
use session::Session;
use theme::Notice;

/// Load block scenarios and exercise their scoped field storage.
///
/// A scenario is a TOML tree of blocks. It is loaded into an in-memory
/// store, after which views can be rendered as different users, handlers
/// dispatched, and the stored fields dumped by scope.
#[derive(Parser)]
#[command(name = "blockfield", version)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Runtime config file (TOML)
    #[arg(long, global = true, env = "BLOCKFIELD_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Only print errors
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Trace which blocks are rendered and dispatched
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the root block of a scenario
    #[command(after_long_help = render::EXAMPLES)]
    Render(RenderArgs),

    /// Call a handler on a block of a scenario
    #[command(after_long_help = handle::EXAMPLES)]
    Handle(HandleArgs),

    /// Print the storage key of a field
    #[command(after_long_help = key::EXAMPLES)]
    Key(KeyArgs),

    /// List the known scopes
    #[command(after_long_help = scopes::EXAMPLES)]
    Scopes,
}

/// Long help appendix: what a scenario can name, and the environment.
fn block_catalog(registry: &BlockRegistry) -> String {
    let mut text = String::from("Block types:\n");
    for name in registry.names() {
        if let Some(block_type) = registry.get(&name) {
            let _ = writeln!(text, "  {name:<14} {}", entry_points(&block_type));
        }
    }
    text.push_str(
        "\nEnvironment:\n  \
         BLOCKFIELD_CONFIG  runtime config used when --config is not given\n  \
         RUST_LOG           log filter, e.g. 'blockfield=debug'\n",
    );
    text
}

fn entry_points(block_type: &BlockType) -> String {
    let mut views = block_type.view_names().join(", ");
    if block_type.fallback_view().is_some() {
        views.push_str(if views.is_empty() { "any" } else { ", any" });
    }
    let handlers = block_type.handler_names();
    if handlers.is_empty() {
        format!("views: {views}")
    } else {
        format!("views: {views}; handlers: {}", handlers.join(", "))
    }
}

fn main() {
    env_logger::init();

    let command = Cli::command().after_long_help(block_catalog(&BlockRegistry::standard()));
    let cli = Cli::from_arg_matches(&command.get_matches()).unwrap_or_else(|err| err.exit());
    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });
    if let Err(err) = execute(cli, &output) {
        output.notice(Notice::Failure, &format!("{err:#}"));
        std::process::exit(1);
    }
}

fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Render(args) => {
            let session = Session::open(config, &args.scenario)?;
            handle_render(args, &session, output)
        }
        Commands::Handle(args) => {
            let session = Session::open(config, &args.scenario)?;
            handle_handle(args, &session, output)
        }
        Commands::Key(args) => handle_key(args, output),
        Commands::Scopes => handle_scopes(output),
    }
}
