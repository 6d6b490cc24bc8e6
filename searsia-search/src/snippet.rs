//! Query-relevant excerpts of long descriptions.
//!
//! Positions and sizes are counted in characters, not bytes.

use crate::types::Hit;

/// Marker for text cut off at either end of a window.
pub const ELLIPSIS: &str = "...";

/// Size of a single window spanning both anchors.
pub const WIDE_WINDOW: usize = 192;

/// Size of each of two separate windows.
pub const NARROW_WINDOW: usize = 92;

/// Longest HTML entity a window cut has to keep whole.
const MAX_ENTITY_LEN: usize = 10;

/// Anchors closer than this share one window.
pub const ANCHOR_DISTANCE: usize = 120;

/// Window of at most `size` characters of `text` starting near `start`.
///
/// Text no longer than `size` is returned unchanged. Otherwise a start
/// beyond the second character moves back to the beginning of its word and
/// gets an [`ELLIPSIS`] prefix, which counts towards `size`; the end moves
/// back to the last whitespace inside the window and gets an [`ELLIPSIS`]
/// suffix unless the window reaches the end of the text. A single word
/// longer than the window is cut, before any HTML entity the cut would
/// split. `size` must be greater than 3.
pub fn restrict_start(text: &str, start: usize, size: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= size {
        return text.to_owned();
    }

    let mut begin = start.min(len);
    let mut prefix = "";
    if begin > 2 {
        while begin < len && chars[begin].is_whitespace() {
            begin += 1;
        }
        while begin > 0 && !chars[begin - 1].is_whitespace() {
            begin -= 1;
        }
        if begin > 0 {
            prefix = ELLIPSIS;
        }
    } else {
        begin = 0;
    }

    let budget = size.saturating_sub(prefix.len()).max(1);
    let mut end = begin + budget;
    let mut suffix = "";
    if end >= len {
        end = len;
    } else {
        suffix = ELLIPSIS;
        let mut cut = end;
        while cut > begin && !chars[cut].is_whitespace() {
            cut -= 1;
        }
        if cut > begin {
            end = cut;
        } else {
            end = entity_boundary(&chars, begin, end);
        }
    }

    let body: String = chars[begin..end].iter().collect();
    format!("{prefix}{}{suffix}", body.trim_end())
}

/// Move a hard cut at `end` back before an HTML entity it would split.
/// Descriptions are escaped, so any `&` starts an entity.
fn entity_boundary(chars: &[char], begin: usize, end: usize) -> usize {
    let floor = end.saturating_sub(MAX_ENTITY_LEN).max(begin);
    match (floor..end).rev().find(|&i| chars[i] == '&' || chars[i] == ';') {
        Some(i) if chars[i] == '&' && i > begin => i,
        _ => end,
    }
}

/// Replace every long description in `hits` by one or two windows around
/// query term matches. `terms` should be normalised, longest first.
pub fn matching_snippets(hits: &mut [Hit], terms: &[String]) {
    for hit in hits.iter_mut() {
        if let Some(description) = hit.description.as_deref() {
            let snippet = description_snippet(description, terms);
            hit.description = Some(snippet);
        }
    }
}

/// Excerpt of a single description, see [`matching_snippets`].
pub fn description_snippet(description: &str, terms: &[String]) -> String {
    let lowered: Vec<char> = description
        .chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect();
    if lowered.len() <= WIDE_WINDOW {
        return description.to_owned();
    }

    let occurrences = term_positions(&lowered, terms);
    let first = if terms.len() >= 2 {
        occurrences.first().copied().unwrap_or(0)
    } else {
        0
    };
    let second = occurrences
        .iter()
        .copied()
        .find(|&pos| pos.abs_diff(first) >= ANCHOR_DISTANCE)
        .or_else(|| occurrences.iter().copied().find(|&pos| pos != first));

    match second {
        Some(second) if second.abs_diff(first) >= ANCHOR_DISTANCE => {
            let (a, b) = if first <= second {
                (first, second)
            } else {
                (second, first)
            };
            let left = restrict_start(description, a, NARROW_WINDOW);
            let right = restrict_start(description, b, NARROW_WINDOW);
            match (left.strip_suffix(ELLIPSIS), right.strip_prefix(ELLIPSIS)) {
                (Some(left), Some(right)) => format!("{left} {ELLIPSIS} {right}"),
                _ => format!("{left} {right}"),
            }
        }
        Some(second) => restrict_start(description, first.min(second), WIDE_WINDOW),
        None => restrict_start(description, first, WIDE_WINDOW),
    }
}

/// Sorted character positions where any term starts a word.
fn term_positions(text: &[char], terms: &[String]) -> Vec<usize> {
    let mut positions = Vec::new();
    for term in terms {
        let needle: Vec<char> = term.chars().collect();
        if needle.is_empty() || needle.len() > text.len() {
            continue;
        }
        for pos in 0..=text.len() - needle.len() {
            let at_word_start = pos == 0 || !text[pos - 1].is_alphanumeric();
            if at_word_start && text[pos..pos + needle.len()] == needle[..] {
                positions.push(pos);
            }
        }
    }
    positions.sort_unstable();
    positions.dedup();
    positions
}
