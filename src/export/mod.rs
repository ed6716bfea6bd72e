//! Clip export pipeline
//!
//! An export job turns one selected clip into a finished artifact through up
//! to four stages: cutting the base clip, extracting its audio, transcribing
//! and rendering karaoke subtitles, and burning those subtitles into the
//! video. Each stage is an external tool invocation wrapped in the retry
//! layer; intermediate files are cleaned up on success.

pub mod retry;
pub mod scheduler;
pub mod subtitle;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::clips::Clip;
use crate::config::SubtitleStyle;
use crate::error::{ClipError, ClipResult};
use crate::tools::{ToolCommand, ToolRunner};
use crate::transcribe::Transcriber;
use crate::utils::disk::check_disk_space;
use crate::utils::format_file_size;

use retry::{retry_stage, run_with_retry, RetryPolicy};

/// Rough output size estimate per second of clip, for the disk preflight
const BYTES_PER_SECOND_ESTIMATE: u64 = 5_000_000;

/// How the clip should be rendered
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Letterbox into a 1080x1920 portrait frame
    pub portrait: bool,
    /// Stack a looping companion video under the clip
    pub overlay: bool,
    /// Transcribe and burn in karaoke subtitles
    pub subtitles: bool,
    /// Video looped below the clip when `overlay` is set
    pub overlay_asset: PathBuf,
    pub style: SubtitleStyle,
    pub preset: String,
    pub crf: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            portrait: false,
            overlay: false,
            subtitles: false,
            overlay_asset: PathBuf::new(),
            style: SubtitleStyle::default(),
            preset: "ultrafast".to_string(),
            crf: 23,
        }
    }
}

/// Immutable snapshot of one export's inputs.
///
/// Taken when the job is submitted, so later edits to the clip store never
/// affect an export already in flight.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub input: PathBuf,
    pub clip: Clip,
    pub output: PathBuf,
    pub options: RenderOptions,
}

/// Runs the staged export pipeline for one clip
pub struct ExportJob {
    runner: Arc<dyn ToolRunner>,
    transcriber: Arc<dyn Transcriber>,
    retry: RetryPolicy,
}

impl ExportJob {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        transcriber: Arc<dyn Transcriber>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            runner,
            transcriber,
            retry,
        }
    }

    /// Run all stages for the request, returning the final artifact path.
    ///
    /// Without subtitles the base cut is the final artifact and no
    /// intermediate files are created. With subtitles the base cut, its
    /// extracted audio and the subtitle file are all removed once the
    /// burned-in video exists.
    pub fn run(&self, request: &ExportRequest) -> ClipResult<PathBuf> {
        if !request.input.exists() {
            return Err(ClipError::InputFileNotFound {
                path: request.input.display().to_string(),
            });
        }

        let clip_seconds =
            (request.clip.end_ms.saturating_sub(request.clip.start_ms)) as f64 / 1000.0;
        let target_dir = request
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        check_disk_space(
            target_dir,
            (clip_seconds * BYTES_PER_SECOND_ESTIMATE as f64) as u64,
        )?;

        info!(
            "Exporting clip {}ms..{}ms of {} -> {}",
            request.clip.start_ms,
            request.clip.end_ms,
            request.input.display(),
            request.output.display()
        );

        let base = request.output.clone();
        let cut = base_cut_command(request, &base);
        run_with_retry(self.runner.as_ref(), &self.retry, "base_cut", &cut)?;

        if !request.options.subtitles {
            return Ok(base);
        }

        let audio = base.with_extension("wav");
        let extract = audio_extract_command(&base, &audio);
        run_with_retry(self.runner.as_ref(), &self.retry, "audio_extract", &extract)?;

        let subs = base.with_extension("ass");
        let style = &request.options.style;
        let transcript = retry_stage(&self.retry, "transcribe", || {
            self.transcriber.transcribe(&audio, &style.model_size)
        })?;
        info!(
            "Transcribed {} segments ({})",
            transcript.segments.len(),
            transcript.language
        );
        subtitle::write_ass(&subs, &transcript, style)?;

        let artifact = subtitled_output_path(&base);
        let burn = burn_in_command(&base, &subs, &artifact, &request.options);
        run_with_retry(self.runner.as_ref(), &self.retry, "burn_in", &burn)?;

        cleanup_intermediates(&[&base, &audio, &subs], &artifact);
        if let Ok(meta) = std::fs::metadata(&artifact) {
            info!("Artifact size: {}", format_file_size(meta.len()));
        }
        Ok(artifact)
    }
}

/// Final artifact path for a subtitled export: `<stem>_sub.<ext>`
fn subtitled_output_path(base: &Path) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{}_sub.{}", stem, ext.to_string_lossy()),
        None => format!("{}_sub", stem),
    };
    base.with_file_name(name)
}

/// Stage 1: cut the clip range out of the source, applying the render layout
fn base_cut_command(request: &ExportRequest, output: &Path) -> ToolCommand {
    let opts = &request.options;
    let start = request.clip.start_ms as f64 / 1000.0;
    let duration = (request.clip.end_ms.saturating_sub(request.clip.start_ms)) as f64 / 1000.0;

    let mut cmd = ToolCommand::new("ffmpeg")
        .arg("-y")
        .args(["-i".to_string(), request.input.display().to_string()]);

    if opts.overlay {
        cmd = cmd
            .args(["-stream_loop", "-1"])
            .args(["-i".to_string(), opts.overlay_asset.display().to_string()])
            .args([
                "-filter_complex",
                "[0:v]scale=1080:960,setsar=1[v0];[1:v]scale=1080:960,setsar=1[v1];[v0][v1]vstack=inputs=2[outv]",
            ])
            .args(["-map", "[outv]", "-map", "0:a?", "-shortest"])
            .args(["-preset", opts.preset.as_str()])
            .args(["-crf".to_string(), opts.crf.to_string()]);
    } else if opts.portrait {
        cmd = cmd
            .args([
                "-vf",
                "scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2",
            ])
            .args(["-preset", opts.preset.as_str()])
            .args(["-crf".to_string(), opts.crf.to_string()]);
    } else {
        cmd = cmd.args(["-c", "copy"]);
    }

    cmd.args(["-ss".to_string(), format!("{:.3}", start)])
        .args(["-t".to_string(), format!("{:.3}", duration)])
        .arg(output.display().to_string())
}

/// Stage 2: extract mono 16 kHz audio for transcription
fn audio_extract_command(base: &Path, audio: &Path) -> ToolCommand {
    ToolCommand::new("ffmpeg")
        .arg("-y")
        .args(["-i".to_string(), base.display().to_string()])
        .args(["-vn", "-ac", "1", "-ar", "16000"])
        .arg(audio.display().to_string())
}

/// Stage 4: burn the subtitle file into the base cut
fn burn_in_command(base: &Path, subs: &Path, output: &Path, opts: &RenderOptions) -> ToolCommand {
    ToolCommand::new("ffmpeg")
        .arg("-y")
        .args(["-i".to_string(), base.display().to_string()])
        .args(["-vf".to_string(), format!("ass={}", subs.display())])
        .args(["-preset", opts.preset.as_str()])
        .args(["-crf".to_string(), opts.crf.to_string()])
        .arg(output.display().to_string())
}

/// Remove intermediate files, never touching the final artifact
fn cleanup_intermediates(paths: &[&Path], artifact: &Path) {
    for path in paths {
        if *path == artifact || !path.exists() {
            continue;
        }
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Could not remove intermediate {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: RenderOptions) -> ExportRequest {
        ExportRequest {
            input: PathBuf::from("in.mp4"),
            clip: Clip {
                start_ms: 5_000,
                end_ms: 20_000,
                score: 0.8,
            },
            output: PathBuf::from("out/clip_0.mp4"),
            options,
        }
    }

    #[test]
    fn test_plain_cut_uses_stream_copy() {
        let cmd = base_cut_command(&request(RenderOptions::default()), Path::new("out/clip_0.mp4"));
        let line = cmd.to_line();
        assert!(line.contains("-c copy"));
        assert!(line.contains("-ss 5.000"));
        assert!(line.contains("-t 15.000"));
        assert!(!line.contains("-preset"));
        assert!(line.ends_with("out/clip_0.mp4"));
    }

    #[test]
    fn test_portrait_cut_reencodes_with_pad() {
        let options = RenderOptions {
            portrait: true,
            ..Default::default()
        };
        let line = base_cut_command(&request(options), Path::new("o.mp4")).to_line();
        assert!(line.contains("scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(line.contains("pad=1080:1920"));
        assert!(line.contains("-preset ultrafast"));
        assert!(line.contains("-crf 23"));
        assert!(!line.contains("-c copy"));
    }

    #[test]
    fn test_overlay_cut_stacks_inputs() {
        let options = RenderOptions {
            overlay: true,
            overlay_asset: PathBuf::from("gameplay.mp4"),
            ..Default::default()
        };
        let cmd = base_cut_command(&request(options), Path::new("o.mp4"));
        let line = cmd.to_line();
        assert!(line.contains("-stream_loop -1 -i gameplay.mp4"));
        assert!(line.contains("vstack=inputs=2[outv]"));
        assert!(line.contains("-map [outv] -map 0:a? -shortest"));
        // The looping flag must precede the second input only
        let loop_pos = line.find("-stream_loop").unwrap();
        let first_input = line.find("-i in.mp4").unwrap();
        assert!(first_input < loop_pos);
    }

    #[test]
    fn test_audio_extract_is_mono_16k() {
        let line = audio_extract_command(Path::new("c.mp4"), Path::new("c.wav")).to_line();
        assert_eq!(line, "ffmpeg -y -i c.mp4 -vn -ac 1 -ar 16000 c.wav");
    }

    #[test]
    fn test_burn_in_references_subtitle_file() {
        let line = burn_in_command(
            Path::new("c.mp4"),
            Path::new("c.ass"),
            Path::new("c_sub.mp4"),
            &RenderOptions::default(),
        )
        .to_line();
        assert!(line.contains("-vf ass=c.ass"));
        assert!(line.ends_with("c_sub.mp4"));
    }

    #[test]
    fn test_subtitled_output_path() {
        assert_eq!(
            subtitled_output_path(Path::new("out/clip_3.mp4")),
            PathBuf::from("out/clip_3_sub.mp4")
        );
        assert_eq!(
            subtitled_output_path(Path::new("clip")),
            PathBuf::from("clip_sub")
        );
    }
}
