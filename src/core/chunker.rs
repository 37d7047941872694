//! Text chunking for provider request sizing.
//!
//! Providers cap the number of characters accepted per request and most of them
//! reset prosody at request boundaries, so long input is cut at the most natural
//! boundary available inside each window: sentence end, then clause (comma or
//! newline), then word, and only as a last resort mid-word.
//!
//! All lengths are counted in characters, never bytes.

/// Default per-request character limit.
pub const DEFAULT_CHUNK_LIMIT: usize = 9000;

/// Fraction of the window that may trail a sentence terminator before a later
/// clause boundary is preferred.
const DANGLING_TAIL_RATIO: f64 = 0.2;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
const CLAUSE_BREAKS: [char; 2] = [',', '\n'];

/// Split `text` into ordered, non-empty chunks of at most `max_length` characters.
///
/// Whitespace around every cut point is trimmed, so joining the chunks with a
/// single space reproduces the trimmed input modulo whitespace at the cuts.
/// Empty or whitespace-only input yields no chunks.
pub fn split_text(text: &str, max_length: usize) -> Vec<String> {
    let max_length = max_length.max(1);
    let mut chunks = Vec::new();
    let mut remaining: Vec<char> = text.trim().chars().collect();

    while !remaining.is_empty() {
        if remaining.len() <= max_length {
            chunks.push(remaining.iter().collect());
            break;
        }

        let split = find_split_index(&remaining[..max_length], max_length);

        let head: String = remaining[..=split].iter().collect();
        let head = head.trim();
        if !head.is_empty() {
            chunks.push(head.to_string());
        }

        let tail: String = remaining[split + 1..].iter().collect();
        remaining = tail.trim().chars().collect();
    }

    chunks
}

/// Pick the index (inclusive) at which the window is cut.
fn find_split_index(window: &[char], max_length: usize) -> usize {
    let mut split = last_of(window, &SENTENCE_TERMINATORS);

    let leaves_long_tail =
        |idx: usize| (window.len() - idx - 1) as f64 > max_length as f64 * DANGLING_TAIL_RATIO;

    if split.is_none_or(leaves_long_tail) {
        for brk in CLAUSE_BREAKS {
            if let Some(idx) = last_of(window, &[brk])
                && split.is_none_or(|current| idx > current)
            {
                split = Some(idx);
            }
        }
    }

    split
        .or_else(|| last_of(window, &[' ']))
        .unwrap_or(max_length - 1)
}

fn last_of(window: &[char], targets: &[char]) -> Option<usize> {
    window.iter().rposition(|c| targets.contains(c))
}
