//! Text tailing: the trailing-bytes-bounded-by-trailing-lines logic used
//! for both live log streaming and post-mortem error context (spec §4.3
//! "Log tail reader").

/// Return the trailing `max_lines` lines of `text`, then truncate the
/// result to at most `max_chars` characters by keeping the tail end.
///
/// Order of operations matters: line-trim first, then char-trim, so a
/// single enormous line doesn't get recorded as the whole budget while
/// still respecting the character ceiling afterward.
#[must_use]
pub fn tail(text: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    let joined = lines[start..].join("\n");

    if joined.chars().count() <= max_chars {
        return joined;
    }

    let char_count = joined.chars().count();
    let skip = char_count - max_chars;
    joined.chars().skip(skip).collect()
}
