mod cli;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use audiomosaic_core::{run_with_progress, Config, ProgressEvent};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::cli::build_cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();

    let target_path = matches
        .get_one::<PathBuf>("target")
        .expect("required argument");
    let palette_path = matches
        .get_one::<PathBuf>("palette")
        .expect("required argument");
    let output_path = matches
        .get_one::<PathBuf>("output")
        .expect("required argument");

    if !target_path.is_file() {
        return Err(anyhow!(
            "target file does not exist: {}",
            target_path.display()
        ));
    }
    if !palette_path.is_file() {
        return Err(anyhow!(
            "palette file does not exist: {}",
            palette_path.display()
        ));
    }

    let chunk_length = *matches
        .get_one::<Duration>("chunk-length")
        .expect("defaulted argument");
    let seed = matches.get_one::<u64>("seed").copied();
    let max_swap_fails = *matches
        .get_one::<u32>("max-swap-fails")
        .expect("defaulted argument");

    let config = Config::new(
        target_path,
        palette_path,
        output_path,
        chunk_length,
        seed,
        max_swap_fails,
    )
    .with_context(|| {
        format!(
            "failed to create configuration for '{}'",
            target_path.display()
        )
    })?;

    let progress = ProgressBar::new_spinner();
    progress.set_draw_target(ProgressDrawTarget::stderr());

    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let spinner_style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    progress.set_style(spinner_style);
    progress.enable_steady_tick(Duration::from_millis(100));

    // Rolling window over recent failure-counter values. Display smoothing
    // only; the refiner's termination never reads it.
    let mut failure_history: VecDeque<u32> = VecDeque::new();

    let progress_handle = progress.clone();
    let result = run_with_progress(config, move |event| match event {
        ProgressEvent::Resampling {
            palette_rate,
            target_rate,
        } => {
            progress_handle.set_message(format!(
                "Resampling palette from {palette_rate} Hz to {target_rate} Hz"
            ));
        }
        ProgressEvent::Chunked {
            target_chunks,
            palette_chunks,
        } => {
            progress_handle.set_message(format!(
                "Chopped sound files into {target_chunks} target and {palette_chunks} palette chunks"
            ));
        }
        ProgressEvent::Selected { drawn } => {
            progress_handle.set_message(format!("Moulded palette into {drawn} chunks"));
        }
        ProgressEvent::Normalized => {
            progress_handle.set_message("Normalized chunk lengths");
        }
        ProgressEvent::RefineStart { max_failures } => {
            progress_handle.set_style(bar_style.clone());
            progress_handle.set_length(u64::from(max_failures));
            progress_handle.set_position(0);
            progress_handle.set_message("Maximizing sound quality");
        }
        ProgressEvent::RefineTrial {
            consecutive_failures,
            swaps,
            trials,
        } => {
            failure_history.push_back(consecutive_failures);
            while failure_history.len() > max_swap_fails as usize {
                failure_history.pop_front();
            }
            let mean = failure_history.iter().map(|&f| f64::from(f)).sum::<f64>()
                / failure_history.len() as f64;
            progress_handle.set_position(mean.round() as u64);
            progress_handle.set_message(format!("s: {swaps}, t: {trials}"));
        }
        ProgressEvent::Assembled { frames } => {
            progress_handle.set_message(format!("Assembled {frames} frames"));
        }
    })
    .with_context(|| format!("failed to rearrange '{}'", target_path.display()));

    progress.finish_and_clear();

    let metrics = result?;
    println!(
        "Wrote {} ({} chunks of {} frames, {} swaps over {} trials)",
        output_path.display(),
        metrics.target_chunks,
        metrics.frames_per_chunk,
        metrics.swaps,
        metrics.trials
    );

    Ok(())
}
