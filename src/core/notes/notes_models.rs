// Domain models for a parsed page of meeting notes.
// Nothing in here knows about Google Docs; the request builder decides how
// each kind of line is rendered remotely.

/// What a single markdown line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace-only line. Still occupies one paragraph.
    Blank,
    /// `#`-prefixed line. `level` is the number of leading `#`.
    Heading { level: u8 },
    /// Action item written as `- [ ]` or `- [x]`.
    Checkbox { checked: bool },
    /// `*`, `-` or `+` list item. Two columns of indentation per level.
    Bullet { indent_level: usize },
    Paragraph,
}

/// An `@name` reference inside a line's display text.
///
/// Offsets are UTF-16 code units relative to the start of the display text,
/// because that is how the Docs API counts characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// A markdown line after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub kind: LineKind,
    /// Text that will end up in the document, with markdown markers removed.
    pub text: String,
    pub mentions: Vec<Mention>,
}

impl ClassifiedLine {
    pub fn blank() -> Self {
        Self {
            kind: LineKind::Blank,
            text: String::new(),
            mentions: Vec::new(),
        }
    }

    /// Length of the display text as the Docs API sees it.
    pub fn utf16_len(&self) -> usize {
        self.text.encode_utf16().count()
    }
}
