//! Frame data structures for delivered camera frames

use std::time::Instant;

use crate::vision::RecognizedText;

/// OCR output for one camera frame
#[derive(Debug, Clone)]
pub struct OcrFrame {
    /// Capture order, strictly increasing within a scan
    pub sequence: u64,
    /// Width of the preview the frame was shown in
    pub view_width: f32,
    /// Text the recognizer found in the frame
    pub recognized: RecognizedText,
    /// Timestamp when frame was delivered
    pub timestamp: Instant,
}

impl OcrFrame {
    /// Create a new frame
    pub fn new(sequence: u64, view_width: f32, recognized: RecognizedText) -> Self {
        Self {
            sequence,
            view_width,
            recognized,
            timestamp: Instant::now(),
        }
    }

    /// Whether the recognizer found no text blocks
    pub fn is_blank(&self) -> bool {
        self.recognized.is_empty()
    }
}
