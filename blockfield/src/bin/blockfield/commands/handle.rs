use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Args;
use serde_json::Value;

use blockfield::Request;

use crate::output::OutputManager;
use crate::session::{Session, parse_path};
use crate::theme::Notice;

pub const EXAMPLES: &str = r#"Examples:
  blockfield handle demos/lesson.toml --path 2 --handler vote --data '{"vote_type":"up"}'
  blockfield handle demos/lesson.toml --path 2 --handler vote --user bob --dump"#;

#[derive(Args)]
pub struct HandleArgs {
    /// Scenario file (TOML)
    pub scenario: PathBuf,

    /// Child indices from the root, dot separated (empty for the root)
    #[arg(long, default_value = "")]
    pub path: String,

    /// Handler name
    #[arg(long)]
    pub handler: String,

    /// Request body as JSON
    #[arg(long, default_value = "{}")]
    pub data: String,

    /// Act as this user
    #[arg(long)]
    pub user: Option<String>,

    /// Print the store afterwards
    #[arg(long)]
    pub dump: bool,
}

pub fn handle_handle(args: HandleArgs, session: &Session, output: &OutputManager) -> Result<()> {
    let body: Value = serde_json::from_str(&args.data)?;
    let path = parse_path(&args.path).map_err(|message| anyhow!(message))?;
    let runtime = session.runtime_for(args.user.as_deref());
    let mut block = session.block_at(&runtime, &path)?;
    let target = format!("{} ({})", block.usage_id(), block.block_type().name());
    output.notice(Notice::Trace, &format!("dispatching '{}' to {target}", args.handler));

    let response = runtime.handle(&mut block, &args.handler, &Request::json(body))?;
    if output.is_json() {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if response.is_null() {
        output.notice(Notice::Caution, &format!("handler '{}' returned no data", args.handler));
    } else {
        output.notice(Notice::Done, &format!("{} {}", args.handler, block.usage_id()));
        output.labelled("response", &response.to_string());
    }
    if args.dump {
        output.heading("Store");
        output.display(&session.dump())?;
    }
    Ok(())
}
