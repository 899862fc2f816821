use anyhow::{Result, anyhow};
use clap::Args;

use blockfield::{Scope, ScopeIds, scope_key};

use crate::output::OutputManager;

pub const EXAMPLES: &str = "\
Examples:
  blockfield key --scope user_state --field voted --user alice --usage u_1
  blockfield key --scope preferences --field theme --user alice --block-type thumbs";

#[derive(Args)]
pub struct KeyArgs {
    /// Field name
    #[arg(long)]
    pub field: String,

    /// Scope name (see `blockfield scopes`)
    #[arg(long, default_value = "content")]
    pub scope: String,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long, default_value = "html")]
    pub block_type: String,

    #[arg(long, default_value = "d_1")]
    pub definition: String,

    #[arg(long, default_value = "u_1")]
    pub usage: String,
}

pub fn handle_key(args: KeyArgs, output: &OutputManager) -> Result<()> {
    let scope =
        Scope::by_name(&args.scope).ok_or_else(|| anyhow!("unknown scope '{}'", args.scope))?;
    let ids = ScopeIds::new(args.user, args.block_type, args.definition, args.usage);
    let key = scope_key(&args.field, scope, &ids);
    if output.is_json() {
        println!("{}", serde_json::json!({ "scope": scope.name(), "key": key }));
    } else {
        output.labelled(scope.name(), &key);
    }
    Ok(())
}
