//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run one agent response document against a fresh in-memory tree.
//! - Print the batch report as JSON for quick local checks.
//!
//! Usage: `treeline_cli [response.json]` (reads stdin when no path is given).
//! Environment: `TREELINE_CONFIG` (config JSON path), `TREELINE_LOG_DIR`
//! (absolute directory, enables file logging), `TREELINE_LOG_LEVEL`.

use std::io::Read;
use std::process::ExitCode;
use treeline_core::{
    default_log_level, init_logging, ActionExecutor, AgentResponse, BatchCoordinator,
    EngineConfig, SessionContext,
};

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            eprintln!("treeline: {message}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether every action succeeded.
fn run() -> Result<bool, String> {
    if let Ok(log_dir) = std::env::var("TREELINE_LOG_DIR") {
        let level = std::env::var("TREELINE_LOG_LEVEL")
            .unwrap_or_else(|_| default_log_level().to_string());
        init_logging(&level, &log_dir).map_err(|err| err.to_string())?;
    }

    let config = match std::env::var("TREELINE_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|err| format!("cannot read config `{path}`: {err}"))?;
            EngineConfig::from_json_str(&text).map_err(|err| err.to_string())?
        }
        Err(_) => EngineConfig::default(),
    };

    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|err| format!("cannot read `{path}`: {err}"))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| format!("cannot read stdin: {err}"))?;
            buffer
        }
    };

    let response = AgentResponse::from_json_str(&input);
    let mut executor = ActionExecutor::new(config);
    let mut session = SessionContext::new();
    let report = BatchCoordinator::new(&mut executor, &mut session).run_response(&response);
    log::info!(
        "event=cli_done module=cli status=ok action_count={}",
        report.results.len()
    );

    let rendered = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(!report.any_failure)
}
