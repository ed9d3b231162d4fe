//! Demo driver: many parallel runners.
//!
//! Spawns one worker thread per runner; each thread builds its own
//! [`Runner`] (independent runners execute truly in parallel), marshals a
//! worker record into the script, and lets the script greet through the
//! `print` capability.

use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use luahost::{baselib, Capability, Runner};

const NUM_RUNNERS: usize = 100;

const GREET: &str = r#"
    function Run(input)
        print("Hello from: " .. string.upper(input.id) .. ", start time: " .. tostring(input.stats.start_time))
    end
"#;

#[derive(Serialize)]
struct Worker {
    id: String,
    stats: Stats,
}

#[derive(Serialize)]
struct Stats {
    start_time: i64,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn greet(id: usize) -> Result<(), luahost::Error> {
    let runner = Runner::new(
        true,
        &[
            Capability::library("string"),
            Capability::function(baselib::PRINT),
            Capability::function(baselib::TOSTRING),
        ],
    )?;

    let worker = Worker {
        id: format!("runner {id}"),
        stats: Stats { start_time: now_millis() },
    };

    runner.run("Run", GREET, 0, (worker,))?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let handles: Vec<_> = (0..NUM_RUNNERS)
        .map(|id| thread::spawn(move || greet(id)))
        .collect();

    let mut failures = 0;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "runner failed");
                failures += 1;
            }
            Err(_) => {
                tracing::error!("worker thread panicked");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
