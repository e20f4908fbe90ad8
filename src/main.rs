use std::env;
use std::fs;
use std::process::exit;

use anyhow::{bail, Context, Result};

use repkit::RobotsMatcher;

/// Checks whether a user-agent may fetch a URL under a robots.txt file.
///
/// Usage: repkit <robots.txt path> <user-agent> <url>
fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        bail!("usage: {} <robots.txt path> <user-agent> <url>", args[0]);
    }
    let (filename, agent, url) = (&args[1], &args[2], &args[3]);

    let body = fs::read(filename).with_context(|| format!("failed to read {}", filename))?;
    if body.is_empty() {
        println!("notice: robots file is empty, so all user-agents are allowed");
    }

    let mut matcher = RobotsMatcher::new();
    let allowed = matcher.one_agent_allowed(&body, agent, url);

    println!(
        "user-agent '{}' with url '{}': {}",
        agent,
        url,
        if allowed { "ALLOWED" } else { "DISALLOWED" }
    );
    if !allowed {
        exit(1);
    }
    Ok(())
}
