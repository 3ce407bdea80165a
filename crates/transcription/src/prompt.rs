//! Token-budgeted prompt assembly for the speaker relabeling pass.

/// Model-specific token counting.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;

    /// Longest suffix of `text` that fits in `max_tokens`, with leading
    /// whitespace dropped when a cut was made.
    ///
    /// Assumes the count never shrinks when text is prepended, which holds
    /// for any subword tokenizer in practice.
    fn tail<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        if max_tokens == 0 {
            return "";
        }
        if self.count_tokens(text) <= max_tokens {
            return text;
        }
        let starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        // First start offset whose suffix fits; the empty suffix always does.
        let (mut lo, mut hi) = (0, starts.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.count_tokens(&text[starts[mid]..]) <= max_tokens {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        starts.get(lo).map_or("", |&start| text[start..].trim_start())
    }
}

/// Instruction placed ahead of both context spans.
pub const RELABEL_INSTRUCTIONS: &str =
    "Please ensure that speakers are consistently identified across the previous and current contexts.";

const CLOSING_INSTRUCTION: &str =
    "Please identify and map speakers consistently across these contexts.";

/// Prefix that opens a speaker turn in diarized text.
pub const SPEAKER_PREFIX: &str = "Speaker";

/// Splits `available` tokens between the two spans.
///
/// Both spans keep their full size when they fit together; otherwise each
/// gets a share proportional to its own size, rounded down.
pub fn allocate(previous_tokens: usize, current_tokens: usize, available: usize) -> (usize, usize) {
    let total = previous_tokens + current_tokens;
    if total <= available {
        return (previous_tokens, current_tokens);
    }
    let prev = (available as u128 * previous_tokens as u128 / total as u128) as usize;
    let curr = (available as u128 * current_tokens as u128 / total as u128) as usize;
    (prev, curr)
}

/// Trims `text` so it starts at its last line opening a speaker turn.
///
/// Text without any speaker line is returned unchanged.
pub fn from_last_speaker_turn(text: &str) -> &str {
    let mut offset = 0;
    let mut boundary = None;
    for line in text.split_inclusive('\n') {
        if line.starts_with(SPEAKER_PREFIX) {
            boundary = Some(offset);
        }
        offset += line.len();
    }
    match boundary {
        Some(start) => text[start..].trim_end_matches(['\n', '\r']),
        None => text,
    }
}

/// Builds the relabeling prompt within `max_tokens`.
///
/// Deterministic: identical inputs give a byte-identical prompt.
pub fn build_prompt(
    counter: &dyn TokenCounter,
    previous_text: &str,
    current_text: &str,
    fixed_text: &str,
    max_tokens: usize,
) -> String {
    let available = max_tokens.saturating_sub(counter.count_tokens(fixed_text));
    let (prev_budget, curr_budget) = allocate(
        counter.count_tokens(previous_text),
        counter.count_tokens(current_text),
        available,
    );

    // Only a cut context can start mid-utterance.
    let previous_tail = counter.tail(previous_text, prev_budget);
    let previous = if previous_tail.len() < previous_text.len() {
        from_last_speaker_turn(previous_tail)
    } else {
        previous_tail
    };
    let current = counter.tail(current_text, curr_budget);

    format!(
        "{fixed_text}\n\nPrevious context:\n{previous}\n\nCurrent text:\n{current}\n\n{CLOSING_INSTRUCTION}"
    )
}
