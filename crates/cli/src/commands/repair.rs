use std::io::Read;

use anyhow::Result;
use nbsim_core::repair_notebook_json;

/// Prints the repaired notebook; returns whether the input was already
/// complete JSON.
pub(crate) fn run() -> Result<bool> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let (json, complete) = repair_notebook_json(&input);
    println!("{json}");
    Ok(complete)
}
