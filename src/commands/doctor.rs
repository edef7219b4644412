//! Implementation of the `copatch doctor` command.
//!
//! Read-only report of the environment a workflow would run in:
//! - whether the docker CLI answers at all
//! - which patch backend the daemon calls for
//! - the resolved settings and where the event log goes

use super::{docker_runner, load_settings, open_event_log, settings_path};
use crate::capability::detect_patch_backend;
use crate::error::Result;
use crate::invocation::build_probe_command;
use crate::process::run_to_completion;
use std::path::Path;

/// Execute the `copatch doctor` command.
pub fn cmd_doctor(config: Option<&Path>) -> Result<()> {
    let path = settings_path(config);
    let settings = load_settings(config)?;
    let runner = docker_runner(&settings);

    println!("Copatch Doctor Report");
    println!("=====================");
    println!();

    let docker_ok = match run_to_completion(&runner, &build_probe_command()) {
        Ok(output) if output.success() => {
            println!("[OK]      docker daemon reachable via '{}'", settings.docker_binary);
            true
        }
        Ok(output) => {
            println!(
                "[WARNING] '{} info' exited with code {}: {}",
                settings.docker_binary,
                output.exit_code,
                output.stderr.trim()
            );
            false
        }
        Err(err) => {
            println!("[ERROR]   {}", err);
            false
        }
    };

    if docker_ok {
        let backend = detect_patch_backend(&runner);
        println!("[OK]      patch backend: {}", backend);
    } else {
        println!("[WARNING] patch backend: unknown (falls back to buildx)");
    }

    println!();
    if path.exists() {
        println!("Settings ({}):", path.display());
    } else {
        println!("Settings (defaults; {} not found):", path.display());
    }
    for line in settings.to_yaml()?.lines() {
        println!("  {}", line);
    }

    println!();
    let log = open_event_log(&settings)?;
    match log.path() {
        Some(events) => {
            println!("Event log: {}", events.display());
            let recorded = log.read_all()?;
            if let Some(last) = recorded.last() {
                println!(
                    "  {} events, last: {} {} at {}",
                    recorded.len(),
                    last.action,
                    last.image.as_deref().unwrap_or("-"),
                    last.ts.to_rfc3339()
                );
            }
        }
        None => println!("Event log: disabled"),
    }

    Ok(())
}
