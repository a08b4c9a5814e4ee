//! Order command - print the compilation order

use crate::config::ProjectArgs;
use crate::report::{self, JsonOrder};
use anyhow::{Context, Result};
use solbatch_build::Builder;

/// Run the order command, returning the process exit code
pub fn run(args: &ProjectArgs, json: bool) -> Result<u8> {
    let project = args.load()?;
    let plan = Builder::new(args.build_config(&project))
        .plan()
        .context("Failed to compute compilation order")?;

    if json {
        let doc = JsonOrder {
            root: &project.root,
            order: &plan.order,
        };
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", report::render_order(&project.root, &plan.order));
    }

    Ok(0)
}
