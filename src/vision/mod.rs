//! Vision/OCR Layer
//!
//! Data model for the text recognizer's per-frame output: blocks made of
//! lines made of elements, each with frame-relative geometry. The recognizer
//! itself is an external collaborator; this module only validates its output
//! at the boundary and offers the alignment heuristic used for feedback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default fraction of the view a block must span to count as aligned
pub const DEFAULT_MIN_BLOCK_WIDTH_RATIO: f32 = 0.8;

/// Errors raised while reading recognizer output
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload is not valid JSON or misses a required field
    #[error("invalid recognizer payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    /// Payload could not be read
    #[error("failed to read recognizer output: {0}")]
    Io(#[from] std::io::Error),
}

/// Frame-relative rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// Smallest recognized unit, usually a word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    /// Recognized text
    pub text: String,
    /// Bounding geometry
    pub frame: Rect,
}

/// One recognized line of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Recognized text
    pub text: String,
    /// Bounding geometry
    pub frame: Rect,
    /// Elements making up the line
    #[serde(default)]
    pub elements: Vec<TextElement>,
}

impl TextLine {
    /// Create a line without geometry or elements
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            frame: Rect::default(),
            elements: Vec::new(),
        }
    }
}

/// A paragraph-like group of lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognized text of the whole block
    pub text: String,
    /// Bounding geometry
    pub frame: Rect,
    /// Lines in recognizer order
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    /// Build a block from bare line texts, without geometry
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let lines: Vec<TextLine> = lines
            .iter()
            .map(|line| TextLine::from_text(line.as_ref()))
            .collect();
        Self {
            text: lines
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            frame: Rect::default(),
            lines,
        }
    }
}

/// Everything the recognizer found in one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognizedText {
    /// Full recognized text
    #[serde(default)]
    pub text: String,
    /// Text blocks
    pub blocks: Vec<TextBlock>,
}

/// Envelope emitted by the recognizer plugin
#[derive(Debug, Deserialize)]
struct RecognizerPayload {
    result: RecognizedText,
}

impl RecognizedText {
    /// Parse a recognizer payload of the form `{"result": {...}}`
    pub fn from_payload_json(json: &str) -> Result<Self, FrameError> {
        let payload: RecognizerPayload = serde_json::from_str(json)?;
        Ok(payload.result)
    }

    /// Whether the recognizer found any text at all
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Whether any block spans at least `min_ratio` of the view width
///
/// Callers use this to tell the user the document is framed well enough,
/// independently of whether an MRZ was decoded.
pub fn is_aligned(blocks: &[TextBlock], view_width: f32, min_ratio: f32) -> bool {
    if view_width <= 0.0 {
        return false;
    }
    blocks
        .iter()
        .any(|block| block.frame.width / view_width >= min_ratio)
}
