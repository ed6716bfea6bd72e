//! Time parsing and formatting utilities

use crate::error::{ClipError, ClipResult};

/// Parse a time string to seconds
///
/// Accepts plain seconds (`123.45`), `MM:SS[.ms]`, or `HH:MM:SS[.ms]`.
pub fn parse_time(time_str: &str) -> ClipResult<f64> {
    let trimmed = time_str.trim();

    // Plain seconds (float)
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if seconds < 0.0 {
            return Err(ClipError::InvalidTimeFormat {
                time: time_str.to_string(),
            });
        }
        return Ok(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    match parts.len() {
        2 => {
            let minutes = parse_component(parts[0], time_str)?;
            let seconds = parse_seconds_component(parts[1], time_str)?;
            Ok(minutes as f64 * 60.0 + seconds)
        }
        3 => {
            let hours = parse_component(parts[0], time_str)?;
            let minutes = parse_component(parts[1], time_str)?;
            if minutes >= 60 {
                return Err(ClipError::InvalidTimeFormat {
                    time: time_str.to_string(),
                });
            }
            let seconds = parse_seconds_component(parts[2], time_str)?;
            Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
        }
        _ => Err(ClipError::InvalidTimeFormat {
            time: time_str.to_string(),
        }),
    }
}

fn parse_component(part: &str, original: &str) -> ClipResult<u32> {
    part.parse::<u32>().map_err(|_| ClipError::InvalidTimeFormat {
        time: original.to_string(),
    })
}

fn parse_seconds_component(part: &str, original: &str) -> ClipResult<f64> {
    let seconds = part.parse::<f64>().map_err(|_| ClipError::InvalidTimeFormat {
        time: original.to_string(),
    })?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(ClipError::InvalidTimeFormat {
            time: original.to_string(),
        });
    }
    Ok(seconds)
}

/// Parse a time string to milliseconds
pub fn parse_time_ms(time_str: &str) -> ClipResult<u64> {
    Ok((parse_time(time_str)? * 1000.0).round() as u64)
}

/// Format milliseconds as `MM:SS` for display
pub fn format_ms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}

/// Format seconds as an ASS timestamp: `H:MM:SS.CC` (centisecond precision)
pub fn ass_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let total_cs = (seconds * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_seconds = total_cs / 100;
    let s = total_seconds % 60;
    let m = (total_seconds / 60) % 60;
    let h = total_seconds / 3600;
    format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
}
