use anyhow::{Context, Result};

use super::common::Session;

pub fn run(session: &Session) -> Result<()> {
    let planner = session.config.planner()?;
    let plan = planner.plan_snapshot(&session.store.snapshot())?;
    let json = serde_json::to_string_pretty(&plan).context("encode plan")?;
    println!("{json}");
    Ok(())
}
