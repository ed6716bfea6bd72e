//! Command implementations

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::analysis::{Analyzer, SuggestionParams};
use crate::cli::args::{ExportArgs, RunArgs, SuggestArgs};
use crate::clips::{Clip, ClipStore};
use crate::config::Config;
use crate::export::retry::RetryPolicy;
use crate::export::scheduler::ExportScheduler;
use crate::export::{ExportJob, ExportRequest, RenderOptions};
use crate::tools::ProcessRunner;
use crate::transcribe::WhisperCommand;
use crate::utils::progress::ProgressTracker;
use crate::utils::time::{format_ms, parse_time_ms};

/// Execute the suggest command
pub async fn suggest(args: SuggestArgs, config: &Config) -> Result<()> {
    info!("Starting clip suggestion");
    info!("Input: {}", args.input.display());

    let clips = suggest_clips(&args, config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&clips)?);
    } else if clips.is_empty() {
        println!("No clips suggested");
    } else {
        println!("{:<4} {:>8} {:>8} {:>7}", "#", "start", "end", "score");
        for (i, clip) in clips.iter().enumerate() {
            println!(
                "{:<4} {:>8} {:>8} {:>7.3}",
                i,
                format_ms(clip.start_ms),
                format_ms(clip.end_ms),
                clip.score
            );
        }
    }
    Ok(())
}

/// Execute the export command
pub async fn export(args: ExportArgs, config: &Config) -> Result<()> {
    info!("Starting clip export");
    info!("Input: {}", args.input.display());

    let start_ms = parse_time_ms(&args.start)
        .with_context(|| format!("Invalid start time '{}'", args.start))?;
    let end_ms =
        parse_time_ms(&args.end).with_context(|| format!("Invalid end time '{}'", args.end))?;
    if start_ms >= end_ms {
        return Err(anyhow::anyhow!("Start time must be before end time"));
    }

    let output = match args.output {
        Some(path) => path,
        None => generated_output_path(&args.input, start_ms, end_ms),
    };
    info!("Output: {}", output.display());

    let request = ExportRequest {
        input: args.input,
        clip: Clip {
            start_ms,
            end_ms,
            score: 0.0,
        },
        output,
        options: render_options(args.portrait, args.overlay, args.subtitles, config),
    };

    let scheduler = build_scheduler(config);
    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler.submit(
        request,
        Box::new(move |artifact, error| {
            let _ = tx.send((artifact, error));
        }),
    );
    scheduler.shutdown().await;

    match rx.await {
        Ok((Some(artifact), _)) => {
            println!("Exported {}", artifact.display());
            Ok(())
        }
        Ok((None, Some(error))) => Err(error).context("Export failed"),
        _ => Err(anyhow::anyhow!("Export finished without a result")),
    }
}

/// Execute the run command
pub async fn run(args: RunArgs, config: &Config) -> Result<()> {
    info!("Starting batch run");
    info!("Input: {}", args.input.display());

    let suggest_args = SuggestArgs {
        input: args.input.clone(),
        window: args.window,
        stride: args.stride,
        max_clips: args.max_clips,
        overlap: args.overlap,
        json: false,
    };
    let suggested = suggest_clips(&suggest_args, config).await?;
    if suggested.is_empty() {
        println!("No clips suggested, nothing to export");
        return Ok(());
    }

    let mut store = ClipStore::new();
    for clip in &suggested {
        store.add_clip(clip.start_ms, clip.end_ms, clip.score);
    }
    info!("Exporting {} clip(s) to {}", store.len(), args.output_dir.display());
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Cannot create {}", args.output_dir.display()))?;

    let scheduler = build_scheduler(config);
    let tracker = Arc::new(Mutex::new(ProgressTracker::new("export", store.len())));

    for (i, clip) in store.clips().iter().enumerate() {
        let name = format!("clip_{:02}.mp4", i);
        let request = ExportRequest {
            input: args.input.clone(),
            clip: *clip,
            output: args.output_dir.join(&name),
            options: render_options(args.portrait, args.overlay.clone(), args.subtitles, config),
        };
        let tracker = Arc::clone(&tracker);
        scheduler.submit(
            request,
            Box::new(move |artifact, error| {
                let mut tracker = tracker.lock().expect("progress tracker poisoned");
                match (artifact, error) {
                    (Some(path), _) => tracker.mark_completed(path.display().to_string()),
                    (None, Some(e)) => tracker.mark_failed(name, e.to_string()),
                    (None, None) => tracker.mark_failed(name, "no result"),
                }
            }),
        );
    }
    scheduler.shutdown().await;

    let summary = tracker.lock().expect("progress tracker poisoned").complete();
    println!(
        "Exported {}/{} clip(s) to {}",
        summary.completed,
        summary.total,
        args.output_dir.display()
    );
    if summary.failed > 0 {
        warn!("{} export(s) failed", summary.failed);
        return Err(anyhow::anyhow!("{} export(s) failed", summary.failed));
    }
    Ok(())
}

async fn suggest_clips(args: &SuggestArgs, config: &Config) -> Result<Vec<Clip>> {
    let analyzer = Analyzer::new(Arc::new(ProcessRunner::new()), config.performance.clone());
    let params = SuggestionParams {
        window_sec: args.window,
        stride_sec: args.stride,
        max_clips: args.max_clips,
        allowed_overlap_sec: args.overlap,
        ..Default::default()
    };
    analyzer
        .suggest_clips(&args.input, &params)
        .await
        .context("Analysis failed")
}

fn build_scheduler(config: &Config) -> ExportScheduler {
    let runner = Arc::new(ProcessRunner::new());
    let transcriber = Arc::new(WhisperCommand::new(
        Arc::clone(&runner) as Arc<dyn crate::tools::ToolRunner>,
        config.performance.whisper_device.clone(),
        config.performance.whisper_compute_type.clone(),
    ));
    let job = ExportJob::new(runner, transcriber, RetryPolicy::default());
    ExportScheduler::new(Arc::new(job), config.performance.export_workers())
}

fn render_options(
    portrait: bool,
    overlay: Option<PathBuf>,
    subtitles: bool,
    config: &Config,
) -> RenderOptions {
    RenderOptions {
        portrait,
        overlay: overlay.is_some(),
        subtitles,
        overlay_asset: overlay.unwrap_or_default(),
        style: config.subtitles.clone(),
        preset: config.performance.ffmpeg_preset.clone(),
        crf: config.performance.ffmpeg_crf,
    }
}

fn generated_output_path(input: &Path, start_ms: u64, end_ms: u64) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let name = format!("{}_clip_{}_{}.mp4", stem, start_ms, end_ms);
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_output_path() {
        let path = generated_output_path(Path::new("videos/stream.mkv"), 5_000, 25_000);
        assert_eq!(path, PathBuf::from("videos/stream_clip_5000_25000.mp4"));
    }

    #[test]
    fn test_render_options_from_config() {
        let config = Config::default();
        let opts = render_options(true, Some(PathBuf::from("g.mp4")), false, &config);
        assert!(opts.portrait);
        assert!(opts.overlay);
        assert_eq!(opts.overlay_asset, PathBuf::from("g.mp4"));
        assert_eq!(opts.preset, "ultrafast");
        assert_eq!(opts.crf, 23);
    }
}
