//! Directive vocabulary of the Docs `batchUpdate` endpoint.
//!
//! Only the four request kinds the converter emits are modelled. They
//! serialize to exactly the JSON shape the API expects, so a `Vec<Request>`
//! can be sent verbatim as the `requests` array.

use serde::Serialize;

/// A single entry of a `batchUpdate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    InsertText(InsertTextRequest),
    UpdateParagraphStyle(UpdateParagraphStyleRequest),
    CreateParagraphBullets(CreateParagraphBulletsRequest),
    UpdateTextStyle(UpdateTextStyleRequest),
}

impl Request {
    pub fn insert_text(index: usize, text: impl Into<String>) -> Self {
        Request::InsertText(InsertTextRequest {
            location: Location { index },
            text: text.into(),
        })
    }

    pub fn named_style(range: Range, style: NamedStyleType) -> Self {
        Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range,
            paragraph_style: ParagraphStyle {
                named_style_type: Some(style),
                ..ParagraphStyle::default()
            },
            fields: "namedStyleType".to_string(),
        })
    }

    pub fn indent(range: Range, magnitude_pt: f64) -> Self {
        Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
            range,
            paragraph_style: ParagraphStyle {
                indent_start: Some(Dimension::pt(magnitude_pt)),
                indent_first_line: Some(Dimension::pt(magnitude_pt)),
                ..ParagraphStyle::default()
            },
            fields: "indentStart,indentFirstLine".to_string(),
        })
    }

    pub fn bullets(range: Range, preset: BulletPreset) -> Self {
        Request::CreateParagraphBullets(CreateParagraphBulletsRequest {
            range,
            bullet_preset: preset,
        })
    }

    pub fn bold_colored(range: Range, color: RgbColor) -> Self {
        Request::UpdateTextStyle(UpdateTextStyleRequest {
            range,
            text_style: TextStyle {
                bold: Some(true),
                foreground_color: Some(OptionalColor {
                    color: Color { rgb_color: color },
                }),
            },
            fields: "bold,foregroundColor".to_string(),
        })
    }

    /// The range a styling request applies to. Insertions have none.
    pub fn range(&self) -> Option<Range> {
        match self {
            Request::InsertText(_) => None,
            Request::UpdateParagraphStyle(r) => Some(r.range),
            Request::CreateParagraphBullets(r) => Some(r.range),
            Request::UpdateTextStyle(r) => Some(r.range),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertTextRequest {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub index: usize,
}

/// Half-open `[start_index, end_index)` span of the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_index: usize,
    pub end_index: usize,
}

impl Range {
    pub fn new(start_index: usize, end_index: usize) -> Self {
        debug_assert!(start_index < end_index, "empty range");
        Self {
            start_index,
            end_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParagraphStyleRequest {
    pub range: Range,
    pub paragraph_style: ParagraphStyle,
    pub fields: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_style_type: Option<NamedStyleType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_start: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent_first_line: Option<Dimension>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NamedStyleType {
    #[serde(rename = "NORMAL_TEXT")]
    NormalText,
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[serde(rename = "HEADING_3")]
    Heading3,
    #[serde(rename = "HEADING_4")]
    Heading4,
    #[serde(rename = "HEADING_5")]
    Heading5,
    #[serde(rename = "HEADING_6")]
    Heading6,
}

impl NamedStyleType {
    /// Docs only has six heading styles; anything deeper is body text.
    pub fn for_heading_level(level: u8) -> Self {
        match level {
            1 => NamedStyleType::Heading1,
            2 => NamedStyleType::Heading2,
            3 => NamedStyleType::Heading3,
            4 => NamedStyleType::Heading4,
            5 => NamedStyleType::Heading5,
            6 => NamedStyleType::Heading6,
            _ => NamedStyleType::NormalText,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimension {
    pub magnitude: f64,
    pub unit: Unit,
}

impl Dimension {
    pub fn pt(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: Unit::Pt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Unit {
    Pt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParagraphBulletsRequest {
    pub range: Range,
    pub bullet_preset: BulletPreset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulletPreset {
    BulletDiscCircleSquare,
    BulletCheckbox,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyleRequest {
    pub range: Range,
    pub text_style: TextStyle,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<OptionalColor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionalColor {
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub rgb_color: RgbColor,
}

/// Channel values in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RgbColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}
