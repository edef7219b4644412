//! The workflow coordinator.
//!
//! `Workflow` owns the one live [`WorkflowState`] together with the
//! transcript, severity counts and configuration of the current run. All
//! mutation happens through its methods, driven by the caller's thread of
//! control; process output reaches it as [`ProcessEvent`]s tagged with the
//! [`RunId`] of the invocation that produced them. Events for any id other
//! than the tracked invocation are dropped, which is how an abandoned run's
//! late output is discarded.

use super::config::WorkflowConfig;
use super::state::{RunId, StageKind, WorkflowState};
use crate::classify::ErrorCategory;
use crate::config::{Settings, ZeroVulnerabilityPolicy};
use crate::error::{CopatchError, Result};
use crate::events::{Event, EventAction, EventLog};
use crate::invocation::{
    build_cleanup_commands, build_patch_command, build_report_command, build_scan_command,
    display_command,
};
use crate::observer::{Notification, Observer};
use crate::process::{
    Disposition, OutputAggregator, OutputChunk, OutputStream, ProcessEvent, ProcessRunner,
    RunOutcome, RunTranscript, UNKNOWN_EXIT_CODE, run_checked, run_to_completion,
};
use crate::report::{SeverityCounts, count_severities};
use serde_json::json;

/// A started invocation: its id and its event stream.
pub struct Invocation {
    pub run: RunId,
    pub stage: StageKind,
    events: OutputStream,
}

impl Invocation {
    /// Take the event stream, e.g. to feed events one at a time via
    /// [`Workflow::handle`].
    pub fn into_events(self) -> OutputStream {
        self.events
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("run", &self.run)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

/// Details of a stage that exited with a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub image: String,
    pub category: ErrorCategory,
    pub diagnostic: String,
    pub exit_code: i32,
}

/// Result of a closed stage, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    ScanLoaded {
        counts: Option<SeverityCounts>,
        patch_enabled: bool,
    },
    ScanFailed(StageFailure),
    PatchSucceeded {
        patched_image: String,
    },
    PatchFailed(StageFailure),
    Cancelled(StageKind),
}

/// Coordinator of one scan-then-patch workflow.
pub struct Workflow<R: ProcessRunner, O: Observer> {
    runner: R,
    observer: O,
    settings: Settings,
    events: EventLog,
    state: WorkflowState,
    config: Option<WorkflowConfig>,
    selected_image: Option<String>,
    aggregator: OutputAggregator,
    counts: Option<SeverityCounts>,
    last_scan_failure: Option<StageFailure>,
    next_run: u64,
}

impl<R: ProcessRunner, O: Observer> Workflow<R, O> {
    pub fn new(runner: R, observer: O, settings: Settings, events: EventLog) -> Self {
        Self {
            runner,
            observer,
            settings,
            events,
            state: WorkflowState::Idle,
            config: None,
            selected_image: None,
            aggregator: OutputAggregator::new(),
            counts: None,
            last_scan_failure: None,
            next_run: 1,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn config(&self) -> Option<&WorkflowConfig> {
        self.config.as_ref()
    }

    pub fn selected_image(&self) -> Option<&str> {
        self.selected_image.as_deref()
    }

    pub fn transcript(&self) -> &RunTranscript {
        self.aggregator.transcript()
    }

    pub fn counts(&self) -> Option<&SeverityCounts> {
        self.counts.as_ref()
    }

    pub fn last_scan_failure(&self) -> Option<&StageFailure> {
        self.last_scan_failure.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    // ========================================================================
    // User actions
    // ========================================================================

    /// The user changed the image selector.
    ///
    /// A running stage is abandoned: the workflow returns to Idle, stops
    /// tracking the invocation and discards its transcript. The external
    /// process itself is not killed. A loaded scan result is discarded too,
    /// since it describes a different image.
    pub fn select_image(&mut self, image: impl Into<String>) {
        let image = image.into();

        if self.state.is_running() || matches!(self.state, WorkflowState::ScanLoaded { .. }) {
            tracing::info!(
                state = self.state.name(),
                "image selection changed; abandoning current workflow"
            );
            let mut event = Event::new(EventAction::Abandoned)
                .with_details(json!({ "state": self.state.name(), "new_image": image }));
            if let Some(old) = &self.selected_image {
                event = event.with_image(old.clone());
            }
            self.events.record(event);

            self.config = None;
            self.reset_run_data();
            self.transition(WorkflowState::Idle);
        }

        self.selected_image = Some(image);
    }

    /// Submit a configuration and start the scan stage.
    ///
    /// Accepted only from Idle. Invalid configurations are rejected without
    /// leaving Idle. Stale containers and the report volume are removed first.
    pub fn start_scan(&mut self, config: WorkflowConfig) -> Result<Invocation> {
        if self.state != WorkflowState::Idle {
            return Err(CopatchError::UserError(format!(
                "cannot start a scan while the workflow is {}",
                self.state
            )));
        }

        config.validate()?;

        self.cleanup();
        self.reset_run_data();
        self.last_scan_failure = None;

        let argv = build_scan_command(&config, &self.settings);
        tracing::info!(
            image = %config.image_reference,
            command = %display_command(self.runner.program(), &argv),
            "starting scan"
        );

        let stream = match self.runner.run(&argv) {
            Ok(stream) => stream,
            Err(err) => {
                // Launch failure of a tracked invocation counts as a failed scan.
                let failure = StageFailure {
                    image: config.image_reference.clone(),
                    category: ErrorCategory::Unclassified,
                    diagnostic: err.to_string(),
                    exit_code: UNKNOWN_EXIT_CODE,
                };
                self.record_failure(EventAction::ScanFailed, &failure);
                self.observer.notify(&Notification::error(format!(
                    "Failed to scan {}: {}",
                    failure.image, failure.diagnostic
                )));
                self.last_scan_failure = Some(failure);
                return Err(err);
            }
        };

        let run = self.next_run_id();
        self.events.record(
            Event::new(EventAction::ScanStarted)
                .with_image(config.image_reference.clone())
                .with_details(json!({
                    "run": run.to_string(),
                    "scanner": config.scanner.to_string(),
                    "patch_backend": config.patch_backend.to_string(),
                })),
        );
        self.selected_image = Some(config.image_reference.clone());
        self.config = Some(config);
        self.transition(WorkflowState::ScanRunning { run });

        Ok(Invocation {
            run,
            stage: StageKind::Scan,
            events: stream,
        })
    }

    /// The user confirmed patching; start the patch stage.
    pub fn start_patch(&mut self) -> Result<Invocation> {
        match &self.state {
            WorkflowState::ScanLoaded {
                patch_enabled: true,
                ..
            } => {}
            WorkflowState::ScanLoaded {
                patch_enabled: false,
                ..
            } => {
                return Err(CopatchError::UserError(
                    "the scan found no fixable vulnerabilities; patching is disabled for this run \
                     (set zero_vulnerability_policy: allow_patch or pass --force-patch to override)"
                        .to_string(),
                ));
            }
            other => {
                return Err(CopatchError::UserError(format!(
                    "cannot start a patch while the workflow is {}; run a scan first",
                    other
                )));
            }
        }

        let Some(config) = self.config.clone() else {
            return Err(CopatchError::UserError(
                "no workflow configuration is active; run a scan first".to_string(),
            ));
        };

        let derived_tag = config.derived_tag();
        let argv = build_patch_command(&config, &derived_tag, &self.settings);
        tracing::info!(
            image = %config.image_reference,
            tag = %derived_tag,
            command = %display_command(self.runner.program(), &argv),
            "starting patch"
        );

        self.aggregator.reset();

        let stream = match self.runner.run(&argv) {
            Ok(stream) => stream,
            Err(err) => {
                let failure = StageFailure {
                    image: config.image_reference.clone(),
                    category: ErrorCategory::Unclassified,
                    diagnostic: err.to_string(),
                    exit_code: UNKNOWN_EXIT_CODE,
                };
                self.fail_patch(&failure);
                return Err(err);
            }
        };

        let run = self.next_run_id();
        self.events.record(
            Event::new(EventAction::PatchStarted)
                .with_image(config.image_reference.clone())
                .with_details(json!({
                    "run": run.to_string(),
                    "tag": derived_tag,
                    "patch_backend": config.patch_backend.to_string(),
                })),
        );
        self.transition(WorkflowState::PatchRunning { run });

        Ok(Invocation {
            run,
            stage: StageKind::Patch,
            events: stream,
        })
    }

    /// The user acknowledged the result and returns to the start.
    ///
    /// After a successful patch the patched image stays selected so it can
    /// be re-scanned directly; after anything else the selection is cleared.
    pub fn acknowledge(&mut self) -> Result<()> {
        if !self.state.is_terminal() {
            return Err(CopatchError::UserError(format!(
                "nothing to acknowledge while the workflow is {}",
                self.state
            )));
        }

        if !matches!(self.state, WorkflowState::PatchSucceeded { .. }) {
            self.selected_image = None;
        }

        self.events.record(
            Event::new(EventAction::Acknowledged)
                .with_details(json!({ "state": self.state.name() })),
        );
        self.config = None;
        self.reset_run_data();
        self.transition(WorkflowState::Idle);
        Ok(())
    }

    /// Remove leftovers of a previous run of the same logical name.
    ///
    /// Failures are logged and ignored; calling this repeatedly is harmless
    /// and never changes workflow state.
    pub fn cleanup(&self) {
        for argv in build_cleanup_commands(&self.settings) {
            match run_to_completion(&self.runner, &argv) {
                Ok(output) if output.success() => {
                    tracing::debug!(target = %argv[argv.len() - 1], "removed stale resource");
                }
                Ok(output) => {
                    tracing::debug!(
                        target = %argv[argv.len() - 1],
                        exit_code = output.exit_code,
                        "nothing to remove"
                    );
                }
                Err(err) => {
                    tracing::warn!(error = %err, "cleanup command could not be started");
                }
            }
        }
    }

    // ========================================================================
    // Process events
    // ========================================================================

    /// Handle one event of invocation `run`.
    ///
    /// Returns the stage outcome when the event closed the tracked invocation.
    pub fn handle(&mut self, run: RunId, event: ProcessEvent) -> Option<StageOutcome> {
        match event {
            ProcessEvent::Output(chunk) => {
                self.on_output(run, &chunk);
                None
            }
            ProcessEvent::Error(message) => {
                tracing::warn!(%run, %message, "process runner error");
                None
            }
            ProcessEvent::Closed(exit_code) => self.on_close(run, exit_code),
        }
    }

    /// Append an output increment of invocation `run`.
    pub fn on_output(&mut self, run: RunId, chunk: &OutputChunk) {
        if !self.is_tracking(run) {
            tracing::trace!(%run, "dropping output of an untracked invocation");
            return;
        }
        for entry in self.aggregator.on_chunk(chunk) {
            self.observer.output(entry.kind, &entry.text);
        }
    }

    /// Close invocation `run` with `exit_code`.
    pub fn on_close(&mut self, run: RunId, exit_code: i32) -> Option<StageOutcome> {
        let (stage, _) = self.state.running().filter(|(_, tracked)| *tracked == run)?;
        let outcome = self.aggregator.on_close(exit_code);
        tracing::debug!(%run, %stage, exit_code, "invocation closed");

        Some(match stage {
            StageKind::Scan => self.finish_scan(outcome),
            StageKind::Patch => self.finish_patch(outcome),
        })
    }

    /// Pump an invocation's events until it closes.
    pub fn drive(&mut self, invocation: Invocation) -> Option<StageOutcome> {
        let run = invocation.run;
        for event in invocation.events {
            if let Some(outcome) = self.handle(run, event) {
                return Some(outcome);
            }
        }
        // Stream ended without a close event.
        self.on_close(run, UNKNOWN_EXIT_CODE)
    }

    // ========================================================================
    // Stage completion
    // ========================================================================

    fn finish_scan(&mut self, outcome: RunOutcome) -> StageOutcome {
        let image = self.current_image();

        match outcome.disposition() {
            Disposition::Succeeded => {
                let counts = match self.fetch_report() {
                    Ok(counts) => Some(counts),
                    Err(err) => {
                        tracing::warn!(error = %err, "scan report unavailable");
                        self.observer.notify(&Notification::error(format!(
                            "Scanned {} but could not read the report: {}",
                            image, err
                        )));
                        None
                    }
                };

                let patch_enabled = match &counts {
                    Some(c) if c.total() == 0 => {
                        self.settings.zero_vulnerability_policy
                            == ZeroVulnerabilityPolicy::AllowPatch
                    }
                    _ => true,
                };

                self.events.record(
                    Event::new(EventAction::ScanLoaded)
                        .with_image(image)
                        .with_details(json!({
                            "counts": counts,
                            "patch_enabled": patch_enabled,
                        })),
                );
                self.counts = counts.clone();
                self.transition(WorkflowState::ScanLoaded {
                    counts: counts.clone(),
                    patch_enabled,
                });
                StageOutcome::ScanLoaded {
                    counts,
                    patch_enabled,
                }
            }
            Disposition::Cancelled => self.cancel(StageKind::Scan, image),
            Disposition::Failed {
                category,
                diagnostic,
            } => {
                let failure = StageFailure {
                    image,
                    category,
                    diagnostic,
                    exit_code: outcome.exit_code,
                };
                self.record_failure(EventAction::ScanFailed, &failure);
                self.observer.notify(&Notification::error(format!(
                    "Failed to scan {}: {}",
                    failure.image, failure.diagnostic
                )));
                self.last_scan_failure = Some(failure.clone());
                self.config = None;
                self.transition(WorkflowState::Idle);
                StageOutcome::ScanFailed(failure)
            }
        }
    }

    fn finish_patch(&mut self, outcome: RunOutcome) -> StageOutcome {
        let image = self.current_image();

        match outcome.disposition() {
            Disposition::Succeeded => {
                let patched_image = self
                    .config
                    .as_ref()
                    .map(WorkflowConfig::patched_image)
                    .unwrap_or_else(|| image.clone());

                self.events.record(
                    Event::new(EventAction::PatchSucceeded)
                        .with_image(image)
                        .with_details(json!({ "patched_image": patched_image })),
                );
                self.observer.notify(&Notification::success(format!(
                    "Created new patched image {}",
                    patched_image
                )));
                self.selected_image = Some(patched_image.clone());
                self.transition(WorkflowState::PatchSucceeded {
                    patched_image: patched_image.clone(),
                });
                StageOutcome::PatchSucceeded { patched_image }
            }
            Disposition::Cancelled => self.cancel(StageKind::Patch, image),
            Disposition::Failed {
                category,
                diagnostic,
            } => {
                let failure = StageFailure {
                    image,
                    category,
                    diagnostic,
                    exit_code: outcome.exit_code,
                };
                self.fail_patch(&failure);
                StageOutcome::PatchFailed(failure)
            }
        }
    }

    fn fail_patch(&mut self, failure: &StageFailure) {
        self.record_failure(EventAction::PatchFailed, failure);
        self.observer.notify(&Notification::error(format!(
            "Failed to patch {}: {}",
            failure.image, failure.diagnostic
        )));
        self.transition(WorkflowState::PatchFailed {
            category: failure.category,
            diagnostic: failure.diagnostic.clone(),
        });
    }

    /// Intentional kill: back to Idle without reporting an error.
    fn cancel(&mut self, stage: StageKind, image: String) -> StageOutcome {
        tracing::info!(%stage, %image, "invocation was cancelled");
        self.events.record(
            Event::new(EventAction::Cancelled)
                .with_image(image)
                .with_details(json!({ "stage": stage })),
        );
        self.config = None;
        self.transition(WorkflowState::Idle);
        StageOutcome::Cancelled(stage)
    }

    fn record_failure(&self, action: EventAction, failure: &StageFailure) {
        self.events.record(
            Event::new(action)
                .with_image(failure.image.clone())
                .with_details(json!({
                    "category": failure.category,
                    "diagnostic": failure.diagnostic,
                    "exit_code": failure.exit_code,
                    "transcript": self.aggregator.transcript().text(),
                })),
        );
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Read the report produced by the scan and reduce it.
    pub fn fetch_report(&self) -> Result<SeverityCounts> {
        let report_file = self
            .config
            .as_ref()
            .map(|c| c.report_file_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.settings.report_file_name);

        let argv = build_report_command(report_file, &self.settings);
        let text = run_checked(&self.runner, &argv)?;
        Ok(count_severities(&text)?)
    }

    fn is_tracking(&self, run: RunId) -> bool {
        matches!(self.state.running(), Some((_, tracked)) if tracked == run)
    }

    fn current_image(&self) -> String {
        self.config
            .as_ref()
            .map(|c| c.image_reference.clone())
            .or_else(|| self.selected_image.clone())
            .unwrap_or_default()
    }

    fn next_run_id(&mut self) -> RunId {
        let run = RunId(self.next_run);
        self.next_run += 1;
        run
    }

    fn reset_run_data(&mut self) {
        self.aggregator.reset();
        self.counts = None;
    }

    fn transition(&mut self, next: WorkflowState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "workflow transition");
        self.state = next;
        self.observer.state_changed(&self.state);
    }
}
