//! Implementation of the `copatch run` command.
//!
//! Full workflow: scan, confirm, patch, and optionally re-scan the patched
//! image. Without `--yes` the user is asked before the patch stage starts.

use super::scan::scan_stage;
use super::{acknowledge_pending, console_workflow, load_settings};
use crate::capability::detect_patch_backend;
use crate::cli::RunArgs;
use crate::config::ZeroVulnerabilityPolicy;
use crate::error::{CopatchError, Result};
use crate::observer::Observer;
use crate::process::ProcessRunner;
use crate::workflow::{StageOutcome, Workflow, WorkflowConfig};
use std::io::{BufRead, Write};
use std::path::Path;

/// Execute the `copatch run` command.
pub fn cmd_run(config: Option<&Path>, args: RunArgs) -> Result<()> {
    let mut settings = load_settings(config)?;
    if args.force_patch {
        settings.zero_vulnerability_policy = ZeroVulnerabilityPolicy::AllowPatch;
    }
    let mut wf = console_workflow(settings, args.show_output)?;

    let backend = detect_patch_backend(wf.runner());
    let mut workflow_config =
        WorkflowConfig::new(&args.image, wf.settings().report_file_name.clone())
            .with_backend(backend);
    if let Some(tag) = &args.tag {
        workflow_config = workflow_config.with_tag(tag);
    }
    if let Some(timeout) = &args.timeout {
        workflow_config = workflow_config.with_timeout(timeout);
    }
    // Validate up front so a bad tag is reported before the scan runs.
    workflow_config.validate()?;

    wf.select_image(&args.image);
    let patch_enabled = scan_stage(&mut wf, workflow_config.clone(), args.show_output)?;
    if !patch_enabled {
        return acknowledge_pending(&mut wf);
    }

    if !args.yes && !confirm(&format!("Patch {}?", args.image))? {
        println!("Patch skipped.");
        wf.acknowledge()?;
        return Ok(());
    }

    let Some(patched_image) = patch_stage(&mut wf, args.show_output)? else {
        return Ok(());
    };
    wf.acknowledge()?;

    if args.rescan {
        // The selection now points at the patched image.
        let rescan_config = WorkflowConfig {
            image_reference: wf.selected_image().unwrap_or(&patched_image).to_string(),
            image_tag: String::new(),
            ..workflow_config
        };
        println!();
        scan_stage(&mut wf, rescan_config, args.show_output)?;
        acknowledge_pending(&mut wf)?;
    } else {
        println!();
        println!("Re-scan with: copatch scan {}", patched_image);
    }

    Ok(())
}

/// Run the patch stage to completion.
///
/// Returns the patched image reference, or `None` when the patch tool was
/// cancelled. A failure is acknowledged before it is returned.
fn patch_stage<R: ProcessRunner, O: Observer>(
    wf: &mut Workflow<R, O>,
    show_output: bool,
) -> Result<Option<String>> {
    let image = wf.config().map(|c| c.image_reference.clone()).unwrap_or_default();
    let backend = wf.config().map(|c| c.patch_backend).unwrap_or_default();
    println!();
    println!("Patching {} (backend: {})...", image, backend);

    let invocation = wf.start_patch()?;
    match wf.drive(invocation) {
        Some(StageOutcome::PatchSucceeded { patched_image }) => {
            if !show_output && let Some(line) = wf.transcript().latest_stdout() {
                println!("  {}", line);
            }
            Ok(Some(patched_image))
        }
        Some(StageOutcome::PatchFailed(failure)) => {
            if !show_output && !wf.transcript().is_empty() {
                eprintln!("--- patch output ---");
                eprint!("{}", wf.transcript().text());
                eprintln!("--------------------");
            }
            eprintln!("Hint: {}", failure.category.summary());
            wf.acknowledge()?;
            Err(CopatchError::PatchFailed {
                image: failure.image,
                category: failure.category,
                diagnostic: failure.diagnostic,
            })
        }
        Some(StageOutcome::Cancelled(_)) => {
            println!("Patch of {} was cancelled.", image);
            Ok(None)
        }
        other => Err(CopatchError::ProcessError(format!(
            "patch of {} ended unexpectedly ({:?})",
            image, other
        ))),
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout()
        .flush()
        .map_err(|e| CopatchError::UserError(format!("failed to write prompt: {}", e)))?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CopatchError::UserError(format!("failed to read answer: {}", e)))?;

    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
