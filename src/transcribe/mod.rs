//! Transcription collaborator interface
//!
//! Transcription is delegated to an external speech-to-text tool. The core
//! only depends on the `Transcriber` trait and the segment/word data it
//! returns; `WhisperCommand` adapts a whisper-style CLI that writes a JSON
//! transcript with word-level timestamps.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ClipError, ClipResult};
use crate::tools::{ToolCommand, ToolRunner};

/// A word with timing.
///
/// `Synthetic` covers segments whose backend produced no word-level
/// timestamps: one pseudo-word spanning the whole segment. Both variants
/// expose the same start/end/text accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum Word {
    Real { start: f64, end: f64, text: String },
    Synthetic { start: f64, end: f64, text: String },
}

impl Word {
    pub fn start(&self) -> f64 {
        match self {
            Word::Real { start, .. } | Word::Synthetic { start, .. } => *start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Word::Real { end, .. } | Word::Synthetic { end, .. } => *end,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Word::Real { text, .. } | Word::Synthetic { text, .. } => text,
        }
    }
}

/// One transcript segment
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Word-level timing when the backend provides it
    pub words: Option<Vec<Word>>,
}

impl Segment {
    /// Words with timing, synthesizing a single pseudo-word for segments
    /// that lack word-level timestamps
    pub fn timed_words(&self) -> Vec<Word> {
        match &self.words {
            Some(words) if !words.is_empty() => words.clone(),
            _ => vec![Word::Synthetic {
                start: self.start,
                end: self.end,
                text: self.text.trim().to_string(),
            }],
        }
    }
}

/// Full transcription result
#[derive(Debug, Clone)]
pub struct Transcript {
    pub language: String,
    pub language_probability: f64,
    pub segments: Vec<Segment>,
}

/// External transcription collaborator
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &Path, model_size: &str) -> ClipResult<Transcript>;
}

/// Model sizes ordered largest to smallest for load-failure fallback
pub const MODEL_HIERARCHY: [&str; 7] = [
    "large-v3", "large-v2", "large", "medium", "small", "base", "tiny",
];

/// Next smaller model to try after a load failure, if any
pub fn fallback_model(current: &str) -> Option<&'static str> {
    let index = MODEL_HIERARCHY.iter().position(|&m| m == current)?;
    MODEL_HIERARCHY.get(index + 1).copied()
}

/// Whether stderr describes a failure to load or fetch the model itself,
/// as opposed to an unrelated error that merely mentions the word
pub fn is_model_load_failure(stderr: &str) -> bool {
    let text = stderr.to_lowercase();
    text.contains("model")
        && (text.contains("load") || text.contains("download") || text.contains("out of memory"))
}

/// Adapter for a whisper CLI writing JSON transcripts beside the audio file
pub struct WhisperCommand {
    runner: Arc<dyn ToolRunner>,
    program: String,
    device: String,
    compute_type: String,
}

impl WhisperCommand {
    pub fn new(runner: Arc<dyn ToolRunner>, device: String, compute_type: String) -> Self {
        Self {
            runner,
            program: "whisper-ctranslate2".to_string(),
            device,
            compute_type,
        }
    }

    /// Override the transcription binary name
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn run_once(&self, audio: &Path, model_size: &str) -> ClipResult<Transcript> {
        let output_dir = audio.parent().unwrap_or_else(|| Path::new("."));
        let cmd = ToolCommand::new(&self.program)
            .arg(audio.display().to_string())
            .args(["--model", model_size])
            .args(["--device", self.device.as_str()])
            .args(["--compute_type", self.compute_type.as_str()])
            .args(["--word_timestamps", "True"])
            .args(["--output_format", "json"])
            .args(["--output_dir".to_string(), output_dir.display().to_string()]);

        let output = self.runner.run(&cmd)?;
        if !output.success() {
            return Err(output.into_error(&self.program));
        }

        let json_path = audio.with_extension("json");
        let contents = std::fs::read_to_string(&json_path)?;
        let transcript = parse_transcript(&contents)?;
        // Best-effort cleanup of the sidecar file
        if let Err(e) = std::fs::remove_file(&json_path) {
            warn!("Could not delete transcript sidecar {}: {}", json_path.display(), e);
        }
        Ok(transcript)
    }
}

impl Transcriber for WhisperCommand {
    fn transcribe(&self, audio: &Path, model_size: &str) -> ClipResult<Transcript> {
        info!("Starting transcription: {} (model {})", audio.display(), model_size);
        let mut model = model_size.to_string();
        loop {
            match self.run_once(audio, &model) {
                Ok(transcript) => {
                    info!(
                        "Detected language: {}, probability: {:.2}",
                        transcript.language, transcript.language_probability
                    );
                    return Ok(transcript);
                }
                // Model-load failures fall back one size and retry; anything
                // else propagates to the stage retry policy
                Err(ClipError::ToolFailed { stderr, .. })
                    if is_model_load_failure(&stderr) =>
                {
                    match fallback_model(&model) {
                        Some(smaller) => {
                            warn!("Model '{}' failed to load, falling back to '{}'", model, smaller);
                            model = smaller.to_string();
                        }
                        None => {
                            return Err(ClipError::TranscriptionError {
                                message: format!("no smaller model available than '{}'", model),
                            });
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTranscript {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    language_probability: Option<f64>,
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Option<Vec<RawWord>>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    start: f64,
    end: f64,
    #[serde(alias = "text")]
    word: String,
}

/// Parse a whisper-style JSON transcript
pub fn parse_transcript(json: &str) -> ClipResult<Transcript> {
    let raw: RawTranscript =
        serde_json::from_str(json).map_err(|e| ClipError::TranscriptionError {
            message: format!("unparseable transcript JSON: {}", e),
        })?;

    let segments = raw
        .segments
        .into_iter()
        .map(|seg| Segment {
            start: seg.start,
            end: seg.end,
            text: seg.text,
            words: seg.words.map(|words| {
                words
                    .into_iter()
                    .map(|w| Word::Real {
                        start: w.start,
                        end: w.end,
                        text: w.word.trim().to_string(),
                    })
                    .collect()
            }),
        })
        .collect();

    Ok(Transcript {
        language: raw.language.unwrap_or_else(|| "unknown".to_string()),
        language_probability: raw.language_probability.unwrap_or(0.0),
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_with_words() {
        let json = r#"{
            "language": "en",
            "language_probability": 0.97,
            "segments": [
                {
                    "start": 0.0, "end": 1.5, "text": " Hello world",
                    "words": [
                        {"start": 0.0, "end": 0.6, "word": " Hello"},
                        {"start": 0.6, "end": 1.5, "word": " world"}
                    ]
                }
            ]
        }"#;
        let transcript = parse_transcript(json).unwrap();
        assert_eq!(transcript.language, "en");
        let words = transcript.segments[0].timed_words();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text(), "Hello");
        assert!(matches!(words[0], Word::Real { .. }));
    }

    #[test]
    fn test_segment_without_words_synthesizes_pseudo_word() {
        let seg = Segment {
            start: 2.0,
            end: 4.5,
            text: "  untimed text ".to_string(),
            words: None,
        };
        let words = seg.timed_words();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0], Word::Synthetic {
            start: 2.0,
            end: 4.5,
            text: "untimed text".to_string(),
        });
        assert_eq!(words[0].start(), 2.0);
        assert_eq!(words[0].end(), 4.5);
    }

    #[test]
    fn test_parse_transcript_missing_language_defaults() {
        let json = r#"{"segments": []}"#;
        let transcript = parse_transcript(json).unwrap();
        assert_eq!(transcript.language, "unknown");
        assert_eq!(transcript.language_probability, 0.0);
    }

    #[test]
    fn test_fallback_model_ladder() {
        assert_eq!(fallback_model("large-v3"), Some("large-v2"));
        assert_eq!(fallback_model("small"), Some("base"));
        assert_eq!(fallback_model("tiny"), None);
        assert_eq!(fallback_model("no-such-model"), None);
    }

    use crate::tools::ToolOutput;
    use std::sync::Mutex;

    /// Runner whose scripted model sizes fail to load; success writes an
    /// empty-transcript sidecar beside the audio argument
    struct ModelLadderRunner {
        broken_models: Vec<&'static str>,
        stderr: &'static str,
        requested: Mutex<Vec<String>>,
    }

    impl ToolRunner for ModelLadderRunner {
        fn run(&self, cmd: &ToolCommand) -> ClipResult<ToolOutput> {
            let model = cmd.args[cmd.value_index_of("--model").unwrap()].clone();
            self.requested.lock().unwrap().push(model.clone());
            if self.broken_models.contains(&model.as_str()) {
                return Ok(ToolOutput {
                    status: 1,
                    stdout: String::new(),
                    stderr: self.stderr.to_string(),
                });
            }
            let audio = Path::new(&cmd.args[0]);
            std::fs::write(
                audio.with_extension("json"),
                r#"{"language": "en", "language_probability": 1.0, "segments": []}"#,
            )?;
            Ok(ToolOutput {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[test]
    fn test_load_failure_walks_down_the_ladder() {
        let runner = Arc::new(ModelLadderRunner {
            broken_models: vec!["small", "base"],
            stderr: "RuntimeError: Failed to load model",
            requested: Mutex::new(Vec::new()),
        });
        let whisper = WhisperCommand::new(
            Arc::clone(&runner) as Arc<dyn ToolRunner>,
            "cpu".to_string(),
            "int8".to_string(),
        );
        let audio = tempfile::NamedTempFile::new().unwrap();

        let transcript = whisper.transcribe(audio.path(), "small").unwrap();
        assert_eq!(transcript.language, "en");
        assert_eq!(
            *runner.requested.lock().unwrap(),
            vec!["small", "base", "tiny"]
        );
    }

    #[test]
    fn test_unrelated_failure_mentioning_model_does_not_fall_back() {
        let runner = Arc::new(ModelLadderRunner {
            broken_models: vec!["small"],
            stderr: "error: unrecognized arguments: --model_dir",
            requested: Mutex::new(Vec::new()),
        });
        let whisper = WhisperCommand::new(
            Arc::clone(&runner) as Arc<dyn ToolRunner>,
            "cpu".to_string(),
            "int8".to_string(),
        );
        let audio = tempfile::NamedTempFile::new().unwrap();

        let err = whisper.transcribe(audio.path(), "small").unwrap_err();
        assert!(matches!(err, ClipError::ToolFailed { .. }));
        assert_eq!(*runner.requested.lock().unwrap(), vec!["small"]);
    }

    #[test]
    fn test_model_load_failure_detection() {
        assert!(is_model_load_failure("RuntimeError: Failed to load model small"));
        assert!(is_model_load_failure("Could not download model from hub"));
        assert!(is_model_load_failure("CUDA out of memory while initializing model"));
        // Mentions "model" but is not a load failure
        assert!(!is_model_load_failure("error: unrecognized arguments: --model_dir"));
        assert!(!is_model_load_failure("Invalid data found when processing input"));
    }
}
