use regex::Regex;
use std::sync::LazyLock;

static MIME_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|;)\s*rate\s*=\s*(\d+)").expect("valid rate regex"));

/// First `max_chars` characters of `text` on a single line, for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Pulls the sample rate out of a MIME type such as `audio/L16;codec=pcm;rate=24000`.
pub fn sample_rate_from_mime(mime: &str) -> Option<u32> {
    MIME_RATE
        .captures(mime)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|rate| *rate > 0)
}
