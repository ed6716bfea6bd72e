//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the suggest command
#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Window length in seconds
    #[arg(long, default_value = "20")]
    pub window: f64,

    /// Offset between window starts in seconds
    #[arg(long, default_value = "5")]
    pub stride: f64,

    /// Maximum number of suggested clips
    #[arg(long, default_value = "5")]
    pub max_clips: usize,

    /// Allowed overlap between selected clips in seconds
    #[arg(long, default_value = "1")]
    pub overlap: f64,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (HH:MM:SS, MM:SS, or seconds)
    #[arg(short, long)]
    pub start: String,

    /// End time (HH:MM:SS, MM:SS, or seconds)
    #[arg(short, long)]
    pub end: String,

    /// Output file path (default: auto-generated)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Letterbox into a 1080x1920 portrait frame
    #[arg(long)]
    pub portrait: bool,

    /// Stack this video, looped, under the clip
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Transcribe and burn in karaoke subtitles
    #[arg(long)]
    pub subtitles: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for exported clips
    #[arg(short, long, default_value = "clips")]
    pub output_dir: PathBuf,

    /// Window length in seconds
    #[arg(long, default_value = "20")]
    pub window: f64,

    /// Offset between window starts in seconds
    #[arg(long, default_value = "5")]
    pub stride: f64,

    /// Maximum number of exported clips
    #[arg(long, default_value = "5")]
    pub max_clips: usize,

    /// Allowed overlap between selected clips in seconds
    #[arg(long, default_value = "1")]
    pub overlap: f64,

    /// Letterbox into a 1080x1920 portrait frame
    #[arg(long)]
    pub portrait: bool,

    /// Stack this video, looped, under each clip
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Transcribe and burn in karaoke subtitles
    #[arg(long)]
    pub subtitles: bool,
}
