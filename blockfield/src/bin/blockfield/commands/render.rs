use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;
use serde_json::Value;

use crate::output::{GlobalOptions, OutputManager, TableDisplay, table};
use crate::session::Session;
use crate::theme::Notice;

pub const EXAMPLES: &str = "\
Examples:
  blockfield render demos/lesson.toml
  blockfield render demos/lesson.toml --user alice --user bob --times 3 --dump
  blockfield --config demos/runtime.toml render demos/lesson.toml";

#[derive(Args)]
pub struct RenderArgs {
    /// Scenario file (TOML)
    pub scenario: PathBuf,

    /// View to render on the root block
    #[arg(long, default_value = "student_view")]
    pub view: String,

    /// Render as this user; repeat for several users
    #[arg(long = "user")]
    pub users: Vec<String>,

    /// Render this many times per user
    #[arg(long, default_value_t = 1)]
    pub times: usize,

    /// View arguments as JSON
    #[arg(long)]
    pub args: Option<String>,

    /// Print the store afterwards
    #[arg(long)]
    pub dump: bool,
}

#[derive(Debug, Serialize)]
pub struct RenderedView {
    pub user: Option<String>,
    pub view: String,
    pub content: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RenderReport {
    pub root: String,
    pub renders: Vec<RenderedView>,
}

impl TableDisplay for RenderReport {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = table(options, &["User", "View", "Content", "Resources"]);
        for render in &self.renders {
            table.add_row(vec![
                Cell::new(render.user.as_deref().unwrap_or("-")),
                Cell::new(&render.view),
                Cell::new(&render.content),
                Cell::new(render.resources.join(", ")),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.renders
            .iter()
            .map(|render| render.content.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn handle_render(args: RenderArgs, session: &Session, output: &OutputManager) -> Result<()> {
    let view_args: Value = match &args.args {
        Some(text) => serde_json::from_str(text)?,
        None => Value::Null,
    };
    let users: Vec<Option<&str>> = if args.users.is_empty() {
        vec![None]
    } else {
        args.users.iter().map(|user| Some(user.as_str())).collect()
    };

    let mut renders = Vec::new();
    for user in users {
        let runtime = session.runtime_for(user);
        for _ in 0..args.times {
            let mut block = runtime.get_block(&session.root)?;
            let fragment = runtime.render(&mut block, &args.view, &view_args)?;
            output.notice(Notice::Trace, &format!("rendered {} as {user:?}", block.usage_id()));
            renders.push(RenderedView {
                user: runtime.user_id().map(str::to_string),
                view: args.view.clone(),
                content: fragment.content,
                resources: fragment.resources,
            });
        }
    }

    output.heading(session.title.as_deref().unwrap_or("Render"));
    output.notice(Notice::Note, &format!("root block {}", session.root));
    output.display(&RenderReport {
        root: session.root.clone(),
        renders,
    })?;
    if args.dump {
        output.heading("Store");
        output.display(&session.dump())?;
    }
    Ok(())
}
