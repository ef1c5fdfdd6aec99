//! Tree command - Print the permission tree

use std::path::Path;

use crate::cli::workspace::print_json;
use crate::cli::Workspace;
use crate::errors::Result;
use crate::permissions::render;

pub async fn run(cwd: Option<&Path>, json: bool) -> Result<()> {
    let workspace = Workspace::open(cwd)?;
    let tree = workspace.directory().tree()?;

    if json {
        return print_json(tree.as_slice());
    }
    if tree.is_empty() {
        println!("No permission groups.");
        return Ok(());
    }
    print!("{}", render(&tree));
    Ok(())
}
