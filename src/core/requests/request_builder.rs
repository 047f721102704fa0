// Turns classified lines into an ordered list of batchUpdate requests.
//
// The Docs API addresses text by absolute UTF-16 index, not by paragraph, so
// every styling request has to know where its line landed. Each line becomes
// one paragraph: its display text followed by "\n". A blank line is just the
// "\n" and still takes up one index.

use crate::core::notes::{ClassifiedLine, LineKind};

use super::request_models::{BulletPreset, NamedStyleType, Range, Request, RgbColor};

/// Index of the first character in a fresh document body.
pub const BODY_START_INDEX: usize = 1;

/// Left indent added per nesting level of a bullet.
pub const INDENT_PER_LEVEL_PT: f64 = 36.0;

pub const MENTION_COLOR: RgbColor = RgbColor {
    red: 0.2,
    green: 0.2,
    blue: 0.8,
};

/// How text insertion is laid out in the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertionStrategy {
    /// One `insertText` with the whole body, then every styling request.
    #[default]
    Bulk,
    /// Each line inserted at a running index, followed by its own styling.
    PerLine,
}

pub struct RequestBuilder {
    strategy: InsertionStrategy,
}

impl RequestBuilder {
    pub fn new(strategy: InsertionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> InsertionStrategy {
        self.strategy
    }

    pub fn build(&self, lines: &[ClassifiedLine]) -> Vec<Request> {
        match self.strategy {
            InsertionStrategy::Bulk => build_bulk(lines),
            InsertionStrategy::PerLine => build_per_line(lines),
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(InsertionStrategy::default())
    }
}

/// Absolute start index of every line once the whole body is inserted.
pub fn line_start_indices(lines: &[ClassifiedLine]) -> Vec<usize> {
    let mut index = BODY_START_INDEX;
    lines
        .iter()
        .map(|line| {
            let start = index;
            index += paragraph_len(line);
            start
        })
        .collect()
}

fn build_bulk(lines: &[ClassifiedLine]) -> Vec<Request> {
    if lines.is_empty() {
        return Vec::new();
    }

    let body: String = lines.iter().map(paragraph_text).collect();
    let mut requests = vec![Request::insert_text(BODY_START_INDEX, body)];

    for (line, start) in lines.iter().zip(line_start_indices(lines)) {
        requests.extend(style_requests(line, start));
    }

    requests
}

fn build_per_line(lines: &[ClassifiedLine]) -> Vec<Request> {
    let mut requests = Vec::new();
    let mut index = BODY_START_INDEX;

    for line in lines {
        requests.push(Request::insert_text(index, paragraph_text(line)));
        requests.extend(style_requests(line, index));
        index += paragraph_len(line);
    }

    requests
}

fn paragraph_text(line: &ClassifiedLine) -> String {
    format!("{}\n", line.text)
}

fn paragraph_len(line: &ClassifiedLine) -> usize {
    line.utf16_len() + 1
}

fn style_requests(line: &ClassifiedLine, start: usize) -> Vec<Request> {
    // The range includes the trailing newline so it is never empty.
    let paragraph = Range::new(start, start + paragraph_len(line));
    let mut requests = Vec::new();

    match line.kind {
        LineKind::Blank | LineKind::Paragraph => {}
        LineKind::Heading { level } => {
            requests.push(Request::named_style(
                paragraph,
                NamedStyleType::for_heading_level(level),
            ));
        }
        LineKind::Checkbox { .. } => {
            requests.push(Request::bullets(paragraph, BulletPreset::BulletCheckbox));
        }
        LineKind::Bullet { indent_level } => {
            requests.push(Request::bullets(
                paragraph,
                BulletPreset::BulletDiscCircleSquare,
            ));
            if indent_level > 0 {
                requests.push(Request::indent(
                    paragraph,
                    INDENT_PER_LEVEL_PT * indent_level as f64,
                ));
            }
        }
    }

    for mention in &line.mentions {
        requests.push(Request::bold_colored(
            Range::new(start + mention.start, start + mention.end),
            MENTION_COLOR,
        ));
    }

    requests
}
