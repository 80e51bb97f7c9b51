//! Point d'entrée d'instant-prefetch : rejoue une trace de gestes.
//!
//! Usage :
//!   instant-prefetch <TRACE.toml> [--save-config]
//!
//! Exemples :
//!   cargo run -- demos/hover.toml                  → affiche les changements du hint
//!   RUST_LOG=instant_prefetch=debug cargo run -- demos/touch.toml
//!   cargo run -- demos/hover.toml --save-config    → écrit la config effective

use std::env;
use std::error::Error;
use std::fs;

use instant_prefetch::config::Config;
use instant_prefetch::trace::Trace;

fn main() -> Result<(), Box<dyn Error>> {
    // ── 1. Logging / Tracing ───────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ── 2. Arguments ───────────────────────────────────────────────────
    let args: Vec<String> = env::args().skip(1).collect();
    let save_config = args.iter().any(|a| a == "--save-config");
    let Some(path) = args.iter().find(|arg| !arg.starts_with("--")) else {
        return Err("missing trace file\nusage: instant-prefetch <TRACE.toml> [--save-config]".into());
    };

    // ── 3. Configuration ───────────────────────────────────────────────
    let config = Config::load();
    if save_config {
        config.save()?;
    }

    // ── 4. Rejeu ───────────────────────────────────────────────────────
    let content = fs::read_to_string(path)?;
    let trace = Trace::parse(&content)?;
    let replay = trace.replay(&config.prefetch);

    if !replay.installed {
        println!("prefetch unavailable (no support or data saver), nothing replayed");
        return Ok(());
    }

    if replay.transitions.is_empty() {
        println!("no prefetch triggered");
    }
    for transition in &replay.transitions {
        println!("{transition}");
    }

    Ok(())
}
