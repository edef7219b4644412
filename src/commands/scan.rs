//! Implementation of the `copatch scan` command.
//!
//! Runs only the scan stage and prints the severity table. The scan stage
//! helper here is shared with `copatch run`.

use super::{acknowledge_pending, console_workflow, format_counts, load_settings};
use crate::cli::ScanArgs;
use crate::error::{CopatchError, Result};
use crate::observer::Observer;
use crate::process::ProcessRunner;
use crate::workflow::{StageOutcome, Workflow, WorkflowConfig};
use std::path::Path;

/// Execute the `copatch scan` command.
pub fn cmd_scan(config: Option<&Path>, args: ScanArgs) -> Result<()> {
    let settings = load_settings(config)?;
    let mut wf = console_workflow(settings, args.show_output)?;

    let mut workflow_config =
        WorkflowConfig::new(&args.image, wf.settings().report_file_name.clone());
    if let Some(timeout) = args.timeout {
        workflow_config = workflow_config.with_timeout(timeout);
    }

    wf.select_image(&args.image);
    scan_stage(&mut wf, workflow_config, args.show_output)?;
    acknowledge_pending(&mut wf)
}

/// Run the scan stage to completion and print its result.
///
/// Returns whether the patch action is enabled. A failed scan leaves the
/// workflow in Idle and is returned as an error. A cancelled scan (the
/// scanner was killed on purpose) also ends in Idle but is not an error;
/// it reports the patch action as disabled.
pub(super) fn scan_stage<R: ProcessRunner, O: Observer>(
    wf: &mut Workflow<R, O>,
    workflow_config: WorkflowConfig,
    show_output: bool,
) -> Result<bool> {
    let image = workflow_config.image_reference.clone();
    println!("Scanning {} with {}...", image, workflow_config.scanner);

    let invocation = wf.start_scan(workflow_config)?;
    match wf.drive(invocation) {
        Some(StageOutcome::ScanLoaded {
            counts,
            patch_enabled,
        }) => {
            println!();
            match &counts {
                Some(counts) => {
                    println!("Fixable OS vulnerabilities in {}:", image);
                    print!("{}", format_counts(counts));
                }
                None => println!("Vulnerability counts for {} are unavailable.", image),
            }
            if !patch_enabled {
                println!();
                println!("No fixable vulnerabilities found; nothing to patch.");
            }
            Ok(patch_enabled)
        }
        Some(StageOutcome::ScanFailed(failure)) => {
            if !show_output && !wf.transcript().is_empty() {
                eprintln!("--- scanner output ---");
                eprint!("{}", wf.transcript().text());
                eprintln!("----------------------");
            }
            eprintln!("Hint: {}", failure.category.summary());
            Err(CopatchError::ScanFailed {
                image: failure.image,
                category: failure.category,
                diagnostic: failure.diagnostic,
            })
        }
        Some(StageOutcome::Cancelled(_)) => {
            println!("Scan of {} was cancelled.", image);
            Ok(false)
        }
        other => Err(CopatchError::ProcessError(format!(
            "scan of {} ended unexpectedly ({:?})",
            image, other
        ))),
    }
}
