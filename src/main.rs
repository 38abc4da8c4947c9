mod chat;
mod flow;
mod poi;
mod timer;
mod video;
mod widget;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use flow::table::{self, FlowTable};
use widget::Viewport;

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   cargo run              # node entries + transitions
    //   RUST_LOG=debug  cargo run              # + timers and drag frames
    //   RUST_LOG=trace  cargo run              # + every emitted effect
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();

    let table = match args.get(1).map(String::as_str) {
        None | Some("-") => table::campus_scenario().context("built-in flow table is invalid")?,
        Some(path) => FlowTable::load(Path::new(path))
            .with_context(|| format!("failed to load flow table from {path}"))?,
    };

    let viewport = Viewport::new(
        args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1280.0),
        args.get(3).and_then(|s| s.parse().ok()).unwrap_or(800.0),
    );

    println!("Flow nodes : {}", table.node_count());
    println!("Viewport   : {}x{}", viewport.width, viewport.height);

    chat::run(Arc::new(table), viewport)
}
