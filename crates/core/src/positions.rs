//! Signature-field placement vocabulary.
//!
//! The signing handler accepts natural-language placement ("bottom right
//! corner") and normalizes it to one of six named slots with fixed
//! coordinates for a standard letter-size page (612x792 points).

use serde_json::{json, Value};

pub const STANDARD_FIELD_WIDTH: u32 = 200;
pub const STANDARD_FIELD_HEIGHT: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldPosition {
    TopLeft,
    CenterLeft,
    BottomLeft,
    TopRight,
    CenterRight,
    BottomRight,
}

/// Remote field-type discriminants used by the automation service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Signature = 1,
    Initial = 2,
    Text = 3,
    Date = 4,
    Checkbox = 5,
}

impl FieldPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::CenterLeft => "center-left",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::CenterRight => "center-right",
            Self::BottomRight => "bottom-right",
        }
    }

    pub fn coordinates(self) -> (u32, u32) {
        match self {
            Self::TopLeft => (50, 100),
            Self::CenterLeft => (50, 370),
            Self::BottomLeft => (50, 650),
            Self::TopRight => (350, 100),
            Self::CenterRight => (350, 370),
            Self::BottomRight => (350, 650),
        }
    }
}

/// Alias table for natural-language placement. First alias found in the
/// lowercased text wins; longer aliases are listed before their prefixes.
const POSITION_ALIASES: &[(&str, FieldPosition)] = &[
    ("top left", FieldPosition::TopLeft),
    ("upper left", FieldPosition::TopLeft),
    ("top-left", FieldPosition::TopLeft),
    ("top right", FieldPosition::TopRight),
    ("upper right", FieldPosition::TopRight),
    ("top-right", FieldPosition::TopRight),
    ("center left", FieldPosition::CenterLeft),
    ("middle left", FieldPosition::CenterLeft),
    ("center-left", FieldPosition::CenterLeft),
    ("center right", FieldPosition::CenterRight),
    ("middle right", FieldPosition::CenterRight),
    ("center-right", FieldPosition::CenterRight),
    ("bottom left", FieldPosition::BottomLeft),
    ("lower left", FieldPosition::BottomLeft),
    ("bottom-left", FieldPosition::BottomLeft),
    ("bottom right", FieldPosition::BottomRight),
    ("lower right", FieldPosition::BottomRight),
    ("bottom-right", FieldPosition::BottomRight),
];

pub fn parse_position(text: &str) -> Option<FieldPosition> {
    let lowered = text.to_lowercase();
    POSITION_ALIASES
        .iter()
        .find(|(alias, _)| lowered.contains(alias))
        .map(|(_, position)| *position)
}

/// Build the field object the automation service expects.
pub fn signature_field(position: FieldPosition, page_number: u32, kind: FieldKind) -> Value {
    let (x, y) = position.coordinates();
    json!({
        "x": x,
        "y": y,
        "width": STANDARD_FIELD_WIDTH,
        "height": STANDARD_FIELD_HEIGHT,
        "pageNumber": page_number,
        "fieldType": kind as u32,
    })
}
