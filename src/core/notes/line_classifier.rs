// Single-pass line classifier for meeting notes.
//
// Rules are tried in order: blank, heading, checkbox, bullet, paragraph.
// The first match wins, so "- [ ] task" is a checkbox and never a bullet.
// Mentions are picked up afterwards from the display text, whatever the kind.

use std::sync::OnceLock;

use regex::Regex;

use super::notes_models::{ClassifiedLine, LineKind, Mention};

const CHECKBOX_MARKERS: [(&str, bool); 3] = [("- [ ]", false), ("- [x]", true), ("- [X]", true)];
const BULLET_MARKERS: [char; 3] = ['*', '-', '+'];

fn mention_regex() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| Regex::new(r"@(\w+)").expect("mention pattern is valid"))
}

/// Splits the notes into lines and classifies each one.
pub fn classify_document(markdown: &str) -> Vec<ClassifiedLine> {
    markdown.lines().map(classify_line).collect()
}

/// Classifies one markdown line.
pub fn classify_line(line: &str) -> ClassifiedLine {
    if line.trim().is_empty() {
        return ClassifiedLine::blank();
    }

    let (kind, text) = if line.starts_with('#') {
        classify_heading(line)
    } else if let Some(checked) = checkbox_state(line) {
        (LineKind::Checkbox { checked }, strip_checkbox_markers(line))
    } else if let Some((indent_level, text)) = parse_bullet(line) {
        if text.is_empty() {
            return ClassifiedLine::blank();
        }
        (LineKind::Bullet { indent_level }, text)
    } else {
        (LineKind::Paragraph, line.trim().to_string())
    };

    let mentions = find_mentions(&text);
    ClassifiedLine {
        kind,
        text,
        mentions,
    }
}

fn classify_heading(line: &str) -> (LineKind, String) {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    let level = u8::try_from(hashes).unwrap_or(u8::MAX);
    let text = line.trim_start_matches('#').trim().to_string();
    (LineKind::Heading { level }, text)
}

fn checkbox_state(line: &str) -> Option<bool> {
    let mut found = None;
    for (marker, checked) in CHECKBOX_MARKERS {
        if line.contains(marker) {
            // Any ticked marker on the line marks the item as done.
            found = Some(found.unwrap_or(false) || checked);
        }
    }
    found
}

fn strip_checkbox_markers(line: &str) -> String {
    CHECKBOX_MARKERS
        .iter()
        .fold(line.to_string(), |acc, (marker, _)| acc.replace(marker, ""))
        .trim()
        .to_string()
}

/// Returns the indent level and item text when the line is a list item.
/// The marker must be followed by whitespace or end the line, so `**bold**`
/// and `---` are not bullets.
fn parse_bullet(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    let marker = chars.next()?;
    if !BULLET_MARKERS.contains(&marker) {
        return None;
    }

    let rest = chars.as_str();
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }

    let leading = &line[..line.len() - trimmed.len()];
    let columns: usize = leading
        .chars()
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();

    Some((columns / 2, rest.trim().to_string()))
}

fn find_mentions(text: &str) -> Vec<Mention> {
    mention_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Mention {
                name: name.as_str().to_string(),
                start: utf16_offset(text, whole.start()),
                end: utf16_offset(text, whole.end()),
            })
        })
        .collect()
}

fn utf16_offset(text: &str, byte_index: usize) -> usize {
    text[..byte_index].encode_utf16().count()
}
