use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use console::style;
use homily_core::{Config, Pipeline, PipelineRun, Stage, StageObserver, format_duration};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Everything is configured through environment variables (or a `.env` file):
/// GEMINI_API_KEY, PEXELS_API_KEY, YOUTUBE_TOKEN_JSON and VIDEO_MODE (Short|Long).
#[derive(Parser)]
#[command(name = "homily", version)]
#[command(about = "Turn the next queued topic into a narrated devotional video and upload it")]
struct Cli {}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Renders pipeline stages as spinners with per-step timings.
#[derive(Default)]
struct SpinnerObserver {
    spinner: Option<ProgressBar>,
    step_start: Option<Instant>,
}

impl SpinnerObserver {
    fn elapsed(&self) -> String {
        let elapsed = self.step_start.map(|s| s.elapsed()).unwrap_or_default();
        style(format!("[{}]", format_duration(elapsed))).dim().to_string()
    }
}

impl StageObserver for SpinnerObserver {
    fn started(&mut self, stage: Stage) {
        self.step_start = Some(Instant::now());
        self.spinner = Some(create_spinner(&format!("{}...", stage.label())));
    }

    fn finished(&mut self, stage: Stage, summary: &str) {
        let line = format!(
            "{} {}: {} {}",
            style("✓").green().bold(),
            stage.label(),
            style(summary).dim(),
            self.elapsed()
        );
        match self.spinner.take() {
            Some(pb) => pb.finish_with_message(line),
            None => println!("{}", line),
        }
    }

    fn failed(&mut self, stage: Stage, message: &str) {
        let line = format!(
            "{} {}: {} {}",
            style("✗").red().bold(),
            stage.label(),
            style(message).red(),
            self.elapsed()
        );
        match self.spinner.take() {
            Some(pb) => pb.finish_with_message(line),
            None => println!("{}", line),
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(run: &PipelineRun) {
    println!("{}", style("─".repeat(60)).dim());
    println!("{} {}", style("Title:").dim(), style(&run.title).cyan().bold());
    println!("{} {}", style("Mode:").dim(), run.mode);
    println!(
        "{} {}{}",
        style("Output:").dim(),
        style(run.video.path.display()).cyan(),
        if run.used_placeholder {
            style(" (placeholder script)").yellow().to_string()
        } else {
            String::new()
        }
    );
    match &run.video_id {
        Some(id) => println!("{} {}", style("Video ID:").dim(), style(id).green().bold()),
        None => println!("{} {}", style("Video ID:").dim(), style("not uploaded").red()),
    }
}

async fn run() -> Result<()> {
    let pipeline = Pipeline::new(Config::from_env()?)?;

    println!(
        "\n{}  {}\n",
        style("homily").cyan().bold(),
        style(format!("{} mode", pipeline.mode())).dim()
    );

    let mut observer = SpinnerObserver::default();
    let total_start = Instant::now();

    match pipeline.run(&mut observer).await {
        Ok(run) => print_summary(&run),
        Err(failed) => {
            tracing::error!(stage = failed.stage.id(), message = %failed.message, "run aborted");
            println!(
                "\n{} {}",
                style("Aborted:").red().bold(),
                style(&failed).red()
            );
        }
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let _cli = Cli::parse();

    // Every failure ends here as a log line; the process always exits cleanly.
    if let Err(e) = run().await {
        tracing::error!(error = %e, "critical error");
        eprintln!("{} {:#}", style("Critical error:").red().bold(), e);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_accepts_no_behavioural_flags() {
        Cli::command().debug_assert();
        assert!(Cli::try_parse_from(["homily"]).is_ok());
        assert!(Cli::try_parse_from(["homily", "--mode", "long"]).is_err());
    }
}
