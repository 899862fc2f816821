use anyhow::Result;
use comfy_table::{Cell, Table};
use serde::Serialize;

use blockfield::Scope;

use crate::output::{GlobalOptions, OutputManager, TableDisplay, scope_cell, table};

pub const EXAMPLES: &str = "\
Examples:
  blockfield scopes
  blockfield --output json scopes";

#[derive(Debug, Serialize)]
pub struct ScopeRow {
    pub name: &'static str,
    pub user: blockfield::UserScope,
    pub block: blockfield::BlockScope,
    pub structural: bool,
}

#[derive(Debug, Serialize)]
pub struct ScopeList(pub Vec<ScopeRow>);

impl TableDisplay for ScopeList {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = table(options, &["Scope", "User", "Block", "Structural"]);
        for row in &self.0 {
            table.add_row(vec![
                scope_cell(options, row.name),
                Cell::new(format!("{:?}", row.user)),
                Cell::new(format!("{:?}", row.block)),
                Cell::new(if row.structural { "yes" } else { "" }),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0.iter().map(|row| row.name).collect::<Vec<_>>().join(" ")
    }
}

pub fn handle_scopes(output: &OutputManager) -> Result<()> {
    let rows = Scope::NAMED
        .into_iter()
        .chain([Scope::CONFIGURATION, Scope::Children, Scope::Parent])
        .map(|scope| ScopeRow {
            name: scope.name(),
            user: scope.user(),
            block: scope.block(),
            structural: scope.is_structural(),
        })
        .collect();
    output.display(&ScopeList(rows))
}
