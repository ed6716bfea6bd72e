//! Styled subtitle synthesis
//!
//! Turns a transcript into an ASS subtitle document: one named style, and
//! one dialogue event per chunk of `words_per_line * lines_per_event` words.
//! Each word carries an inline karaoke duration tag and every event is
//! wrapped in a fade effect.

use std::path::Path;

use crate::config::SubtitleStyle;
use crate::error::ClipResult;
use crate::transcribe::{Transcript, Word};
use crate::utils::time::ass_timestamp;

/// Canvas resolution declared in the script header
const PLAY_RES_X: u32 = 1080;
const PLAY_RES_Y: u32 = 1920;

/// Build the complete ASS document for a transcript
pub fn build_ass(transcript: &Transcript, style: &SubtitleStyle) -> String {
    let mut doc = String::new();
    doc.push_str("[Script Info]\n");
    doc.push_str("ScriptType: v4.00+\n");
    doc.push_str(&format!("PlayResX: {}\n", PLAY_RES_X));
    doc.push_str(&format!("PlayResY: {}\n", PLAY_RES_Y));
    doc.push_str("WrapStyle: 0\n");
    doc.push_str("ScaledBorderAndShadow: yes\n\n");

    doc.push_str("[V4+ Styles]\n");
    doc.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
         BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
         BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    doc.push_str(&format!(
        "Style: Karaoke,{},{},{},{},{},{},0,0,0,0,100,100,0,0,1,3,0,2,40,40,120,1\n\n",
        style.font,
        style.font_size,
        style.primary_color,
        style.secondary_color,
        style.outline_color,
        style.back_color,
    ));

    doc.push_str("[Events]\n");
    doc.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    let words: Vec<Word> = transcript
        .segments
        .iter()
        .flat_map(|seg| seg.timed_words())
        .filter(|w| !w.text().is_empty())
        .collect();

    for chunk in words.chunks(style.words_per_event()) {
        doc.push_str(&dialogue_line(chunk, style));
        doc.push('\n');
    }

    doc
}

/// One `Dialogue:` line for a chunk of words
fn dialogue_line(words: &[Word], style: &SubtitleStyle) -> String {
    let start = words.first().map(Word::start).unwrap_or(0.0);
    let end = words.last().map(Word::end).unwrap_or(start);
    format!(
        "Dialogue: 0,{},{},Karaoke,,0,0,0,,{}",
        ass_timestamp(start),
        ass_timestamp(end),
        event_text(words, style),
    )
}

/// Event text: fade wrapper, per-word karaoke tags, line breaks between rows
fn event_text(words: &[Word], style: &SubtitleStyle) -> String {
    let mut text = format!("{{\\fad({},{})}}", style.fade_ms, style.fade_ms);
    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            if index % style.words_per_line.max(1) == 0 {
                text.push_str("\\N");
            } else {
                text.push(' ');
            }
        }
        text.push_str(&format!("{{\\k{}}}{}", karaoke_cs(word), word.text()));
    }
    text
}

/// Karaoke duration tag value: the word's span in centiseconds
fn karaoke_cs(word: &Word) -> u32 {
    (((word.end() - word.start()) * 100.0).round()).max(0.0) as u32
}

/// Write the document to disk
pub fn write_ass(path: &Path, transcript: &Transcript, style: &SubtitleStyle) -> ClipResult<()> {
    std::fs::write(path, build_ass(transcript, style))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::Segment;

    fn word(start: f64, end: f64, text: &str) -> Word {
        Word::Real {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn transcript(segments: Vec<Segment>) -> Transcript {
        Transcript {
            language: "en".to_string(),
            language_probability: 0.9,
            segments,
        }
    }

    #[test]
    fn test_header_and_style_table() {
        let style = SubtitleStyle::default();
        let doc = build_ass(&transcript(vec![]), &style);
        assert!(doc.contains("ScriptType: v4.00+"));
        assert!(doc.contains("PlayResX: 1080"));
        assert!(doc.contains("PlayResY: 1920"));
        assert!(doc.contains("Style: Karaoke,Comic Sans MS,72,&H00FFFFFF,&H0000FFFF,&H00000000,&H64000000"));
    }

    #[test]
    fn test_event_spans_first_to_last_word() {
        let style = SubtitleStyle::default();
        let seg = Segment {
            start: 0.0,
            end: 3.0,
            text: "one two three".to_string(),
            words: Some(vec![
                word(0.5, 1.0, "one"),
                word(1.0, 1.8, "two"),
                word(1.8, 3.0, "three"),
            ]),
        };
        let doc = build_ass(&transcript(vec![seg]), &style);
        assert!(doc.contains("Dialogue: 0,0:00:00.50,0:00:03.00,Karaoke"));
    }

    #[test]
    fn test_karaoke_tags_and_fade() {
        let style = SubtitleStyle::default();
        let seg = Segment {
            start: 0.0,
            end: 1.0,
            text: "hi there".to_string(),
            words: Some(vec![word(0.0, 0.25, "hi"), word(0.25, 1.0, "there")]),
        };
        let doc = build_ass(&transcript(vec![seg]), &style);
        assert!(doc.contains("{\\fad(100,100)}"));
        assert!(doc.contains("{\\k25}hi"));
        assert!(doc.contains("{\\k75}there"));
    }

    #[test]
    fn test_chunking_and_line_breaks() {
        let style = SubtitleStyle {
            words_per_line: 2,
            lines_per_event: 2,
            ..Default::default()
        };
        // 5 words with 4 per event: two events
        let words: Vec<Word> = (0..5)
            .map(|i| word(i as f64, i as f64 + 1.0, &format!("w{}", i)))
            .collect();
        let seg = Segment {
            start: 0.0,
            end: 5.0,
            text: String::new(),
            words: Some(words),
        };
        let doc = build_ass(&transcript(vec![seg]), &style);
        let dialogues: Vec<&str> = doc.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert_eq!(dialogues.len(), 2);
        // Line break after the second word of the first event
        assert!(dialogues[0].contains("w1\\N{\\k100}w2"));
        assert!(dialogues[1].contains("w4"));
    }

    #[test]
    fn test_segment_without_word_timing_gets_one_tag() {
        let style = SubtitleStyle::default();
        let seg = Segment {
            start: 10.0,
            end: 12.5,
            text: "untimed".to_string(),
            words: None,
        };
        let doc = build_ass(&transcript(vec![seg]), &style);
        assert!(doc.contains("Dialogue: 0,0:00:10.00,0:00:12.50,Karaoke"));
        assert!(doc.contains("{\\k250}untimed"));
    }
}
