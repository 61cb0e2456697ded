// SPDX-License-Identifier: MIT OR Apache-2.0
//! Patchbay replay - headless wiring gestures
//!
//! Loads a RON script describing a gameplay graph and a sequence of pointer
//! actions, runs them through the connection engine and prints the
//! resulting connections, one per line.
//!
//! ```text
//! patchbay_replay scripts/exec_chain.ron
//! ```

mod runner;
mod script;

use runner::Replay;
use script::{ReplayError, ReplayScript};
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("patchbay_replay=info,patchbay_graph=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: patchbay_replay <script.ron>");
        std::process::exit(2);
    };

    if let Err(e) = run(Path::new(&path)) {
        tracing::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}

fn run(path: &Path) -> Result<(), ReplayError> {
    let script = ReplayScript::load(path)?;
    let mut replay = Replay::new(&script)?;
    replay.run(&script.steps)?;

    tracing::info!(
        "Replayed {} gesture(s), {} connection(s) remain",
        replay.outcomes().len(),
        replay.graph().connection_count()
    );
    for line in replay.describe() {
        println!("{line}");
    }
    Ok(())
}
