//! `apply` - converge every key listed in a manifest

use anyhow::{Context as AnyhowContext, Result, bail};
use budgetkit::KeyApi;
use colored::Colorize;
use declarative::{
    ApplyContext, ApplyResult, ConfirmCallback, ExecuteOptions, ExecuteReport, ExecuteSummary,
    Instance, ProgressCallback, execute,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::{self, Manifest};
use crate::resource::api_key::RESOURCE_TYPE;
use crate::resource::{ApiKeyModel, ApiKeyResource};
use crate::ui;

pub fn run(ctx: &Context, api: &dyn KeyApi, args: ApplyArgs) -> Result<()> {
    let path = match args.file {
        Some(path) => path,
        None => config::default_manifest_path()?,
    };
    let manifest = Manifest::load(&path)?;

    if manifest.api_keys.is_empty() {
        ui::info(&format!("No API keys declared in {}", path.display()));
        return Ok(());
    }

    let instances: Vec<Instance<ApiKeyModel>> = manifest
        .api_keys
        .iter()
        .map(|spec| Instance::fresh(address(&spec.name), spec.to_model()))
        .collect();

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: usize::from(args.jobs),
    };
    let resource = ApiKeyResource::new(api);
    let mut progress = BarProgress::new(ctx.quiet);
    let mut confirm = PromptConfirm { yes: args.yes };

    if !ctx.quiet {
        ui::header(&format!("Applying {}", path.display()));
    }

    let report = execute(
        &resource,
        instances,
        &opts,
        &ApplyContext::new(args.dry_run),
        &mut progress,
        &mut confirm,
    )
    .context("Failed to apply manifest")?;

    if !ctx.quiet {
        print_outcomes(&report, ctx.verbose > 0);
        print_summary(&report.summary, args.dry_run);
    }

    if !report.summary.is_success() {
        bail!("{} of {} API keys failed", report.summary.failed, report.summary.total());
    }
    Ok(())
}

/// Address of a manifest entry, e.g. `budgeteer_api_key.svc-a`
fn address(name: &str) -> String {
    format!("{}.{}", RESOURCE_TYPE, name)
}

// ============================================================================
// Host callbacks
// ============================================================================

/// Spinner while keys are reconciled, advanced as results come in
struct BarProgress {
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl BarProgress {
    fn new(quiet: bool) -> Self {
        Self { quiet, bar: None }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        let bar = if self.quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(count as u64)
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{} {}", ui::result_symbol(result), address));
            bar.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// dialoguer prompt unless `--yes`
struct PromptConfirm {
    yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        Ok(confirmed)
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_outcomes(report: &ExecuteReport<ApiKeyModel>, verbose: bool) {
    println!();
    for outcome in &report.outcomes {
        let line = format!(
            "  {} {} {}",
            ui::result_symbol(&outcome.result),
            outcome.address,
            ui::describe_result(&outcome.result)
        );
        match &outcome.result {
            ApplyResult::Failed { .. } => println!("{}", line.red()),
            _ => println!("{}", line),
        }
        if verbose && !outcome.data.id().is_empty() {
            ui::dim(&format!("id {}", outcome.data.id()));
        }
        if outcome.drifted {
            ui::warn(&format!("{} was deleted outside budgeteer", outcome.address));
        }
    }
}

fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        ui::info("Dry run - no changes made");
    } else if summary.is_success() {
        ui::success("API keys converged");
    } else {
        ui::error("API keys applied with errors");
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} updated", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} deleted", summary.removed);
    }
    if summary.no_change > 0 {
        println!("    • {} unchanged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}
