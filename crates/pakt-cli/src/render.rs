use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use pakt_core::PackageEntry;
use pakt_transaction::{
    MissingRequirement, TransactionEvent, TransactionFrontend, TransactionMode,
    TransactionOutcome,
};
use tracing::debug;

use crate::prompt::confirm_on_stdin;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

pub(crate) struct TerminalProgress {
    style: OutputStyle,
    label: String,
    total: u64,
    current: u64,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", self.status_line(status, message));
    }

    pub(crate) fn print_error(self, err: &anyhow::Error) {
        eprintln!("{}", self.status_line("err", &format!("error: {err:#}")));
    }

    pub(crate) fn print_section(self, title: &str) {
        if self.style == OutputStyle::Rich {
            println!();
            println!("{}", colorize(section_style(), &format!("== {title} ==")));
        }
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn start_progress(self, label: &str, total: u64) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(total.max(1));
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<10} [{bar:20.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise}",
            ) {
                progress_bar.set_style(
                    style
                        .tick_chars(progress_tick_chars(label))
                        .progress_chars("=>-"),
                );
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            style: self.style,
            label: label.to_string(),
            total,
            current: 0,
            progress_bar,
            started_at: Instant::now(),
        }
    }

    fn status_line(self, status: &str, message: &str) -> String {
        match self.style {
            OutputStyle::Plain => render_status_line(self.style, status, message),
            OutputStyle::Rich => format!(
                "{} {}",
                colorize(badge_style(status), status_badge(status)),
                message
            ),
        }
    }
}

impl TerminalProgress {
    fn advance(&mut self) {
        self.current = (self.current + 1).min(self.total);
        if let Some(progress_bar) = &self.progress_bar {
            progress_bar.set_position(self.current);
        }
    }

    /// Prints above the bar while one is drawn.
    fn println(&self, line: &str) {
        match &self.progress_bar {
            Some(progress_bar) => progress_bar.println(line),
            None => println!("{line}"),
        }
    }

    fn finish_success(mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };

        progress_bar.finish_and_clear();
        if let Some(line) = render_progress_line(
            self.style,
            &self.label,
            self.current,
            self.total,
            Some(self.started_at.elapsed()),
        ) {
            println!("{line}");
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

/// Terminal side of a transaction: prompts on stdin and prints what the
/// engine reports.
pub(crate) struct ConsoleFrontend {
    renderer: TerminalRenderer,
    progress: Option<TerminalProgress>,
}

impl ConsoleFrontend {
    pub(crate) fn new(renderer: TerminalRenderer) -> Self {
        Self {
            renderer,
            progress: None,
        }
    }

    fn print_step(&self, message: &str) {
        let line = self.renderer.status_line("step", message);
        match &self.progress {
            Some(progress) => progress.println(&line),
            None => println!("{line}"),
        }
    }
}

impl TransactionFrontend for ConsoleFrontend {
    fn confirm(&mut self, prompt: &str) -> bool {
        confirm_on_stdin(prompt)
    }

    fn report(&mut self, event: TransactionEvent<'_>) {
        match event {
            TransactionEvent::MissingDependencies { origin, missing } => {
                for line in missing_dependency_lines(origin, missing) {
                    println!("{line}");
                }
            }
            TransactionEvent::CheckingIntegrity { entries } => {
                debug!(entries, "verifying artifacts");
                self.print_step("Checking binary package file(s) integrity...");
            }
            TransactionEvent::Summary(summary) => {
                self.renderer.print_section("transaction");
                println!();
                self.renderer.print_lines(&summary.render_lines());
                println!();
            }
            TransactionEvent::Declined => println!("Aborting!"),
            TransactionEvent::PhaseStarted { phase, total } => {
                self.progress = Some(self.renderer.start_progress(phase.as_str(), total as u64));
            }
            TransactionEvent::Removing { name, version } => {
                self.print_step(&format!("Removing {name}-{version} ..."));
            }
            TransactionEvent::Unpacking { entry } => {
                self.print_step(&unpacking_message(entry));
                if let Some(progress) = self.progress.as_mut() {
                    progress.advance();
                }
            }
            TransactionEvent::Skipped { entry } => {
                debug!(package = %entry.name, "already unpacked");
                if let Some(progress) = self.progress.as_mut() {
                    progress.advance();
                }
            }
            TransactionEvent::Configuring { name, version } => {
                self.print_step(&format!("Configuring package {name}-{version} ..."));
                if let Some(progress) = self.progress.as_mut() {
                    progress.advance();
                }
            }
            TransactionEvent::PhaseFinished { .. } => {
                if let Some(progress) = self.progress.take() {
                    progress.finish_success();
                }
            }
        }
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    let requested = std::env::var("PAKT_OUTPUT").ok();
    resolve_output_style(std::io::stdout().is_terminal(), requested.as_deref())
}

pub(crate) fn resolve_output_style(stdout_is_tty: bool, requested: Option<&str>) -> OutputStyle {
    match requested.map(str::trim) {
        Some("plain") => OutputStyle::Plain,
        Some("rich") => OutputStyle::Rich,
        _ if stdout_is_tty => OutputStyle::Rich,
        _ => OutputStyle::Plain,
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {}", status_badge(status), message),
    }
}

pub(crate) fn missing_dependency_lines(origin: &str, missing: &[MissingRequirement]) -> Vec<String> {
    let mut lines = vec![format!(
        "Unable to locate some required packages for {origin}:"
    )];
    lines.extend(
        missing
            .iter()
            .map(|dep| format!("  * Missing binary package for: {dep}")),
    );
    lines
}

pub(crate) fn unpacking_message(entry: &PackageEntry) -> String {
    format!(
        "Unpacking {} (from .../{}) ...",
        entry.label(),
        entry.artifact_filename
    )
}

/// Final line for a transaction that did not fail. Declined transactions
/// already said so when the user answered.
pub(crate) fn format_outcome_line(outcome: &TransactionOutcome) -> Option<(&'static str, String)> {
    let line = match outcome {
        TransactionOutcome::Completed { mode, packages } => {
            let verb = match mode {
                TransactionMode::SingleOrigin => "installed",
                TransactionMode::Bulk => "updated",
            };
            ("ok", format!("{verb} {packages} package(s)"))
        }
        TransactionOutcome::AlreadyInstalled { name } => {
            ("info", format!("Package '{name}' is already installed."))
        }
        TransactionOutcome::AlreadyUpToDate { name } => {
            ("info", format!("Package '{name}' is up to date."))
        }
        TransactionOutcome::NothingToDo => ("info", "All packages are up-to-date.".to_string()),
        TransactionOutcome::NothingInstalled => {
            ("info", "No packages currently installed.".to_string())
        }
        TransactionOutcome::Declined => return None,
    };
    Some(line)
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

fn badge_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "err" => AnsiColor::BrightRed,
        _ => AnsiColor::BrightCyan,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn progress_tick_chars(label: &str) -> &'static str {
    match label {
        "unpack" => ".oO@* ",
        "configure" => "-=~* ",
        _ => "|/-\\ ",
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn progress_bar_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightBlue.into()))
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub(crate) fn render_progress_line(
    style: OutputStyle,
    label: &str,
    current: u64,
    total: u64,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let width = 18_usize;
    let safe_total = total.max(1);
    let bounded_current = current.min(safe_total);
    let filled = ((bounded_current as usize) * width) / (safe_total as usize);
    let bar = format!(
        "{}{}",
        "=".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    let percent = (bounded_current * 100) / safe_total;
    let counts = format!("{}/{}", HumanCount(current), HumanCount(total));
    let suffix = elapsed
        .map(|value| format!(" complete in {}", format_elapsed(value)))
        .unwrap_or_default();

    Some(format!(
        "{} [{}] {:>3}% {}{}",
        colorize(progress_label_style(), label),
        colorize(progress_bar_style(), &bar),
        percent,
        counts,
        suffix
    ))
}
