//! Frame Delivery Layer
//!
//! Camera capture and text recognition happen outside this crate. Frames
//! arrive here already recognized, get stamped with a capture sequence, and
//! are handed to the scan worker strictly in that order.

pub mod frame;

use std::io::BufRead;

use crate::vision::{FrameError, RecognizedText};
use frame::OcrFrame;

/// Anything that yields recognized frames in capture order
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<OcrFrame>, FrameError>;
}

/// Assigns strictly increasing sequence numbers to delivered frames
#[derive(Debug, Default)]
pub struct FrameSequencer {
    next: u64,
}

impl FrameSequencer {
    /// Create a sequencer starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap recognizer output into the next frame
    pub fn stamp(&mut self, view_width: f32, recognized: RecognizedText) -> OcrFrame {
        let frame = OcrFrame::new(self.next, view_width, recognized);
        self.next += 1;
        frame
    }
}

/// Replays recorded recognizer payloads, one JSON document per line
pub struct JsonLinesSource<R> {
    reader: R,
    view_width: f32,
    sequencer: FrameSequencer,
    buffer: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Read payloads from `reader`, reporting them at `view_width`
    pub fn new(reader: R, view_width: f32) -> Self {
        Self {
            reader,
            view_width,
            sequencer: FrameSequencer::new(),
            buffer: String::new(),
        }
    }
}

impl<R: BufRead> FrameSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<OcrFrame>, FrameError> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }
            let recognized = RecognizedText::from_payload_json(line)?;
            return Ok(Some(self.sequencer.stamp(self.view_width, recognized)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sequencer_increments() {
        let mut sequencer = FrameSequencer::new();
        let first = sequencer.stamp(100.0, RecognizedText::default());
        let second = sequencer.stamp(100.0, RecognizedText::default());
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert!(first.is_blank());
    }

    #[test]
    fn test_json_lines_source() {
        let data = concat!(
            r#"{"result": {"text": "", "blocks": []}}"#,
            "\n\n",
            r#"{"result": {"text": "A", "blocks": [{"text": "A", "frame": {"x": 0, "y": 0, "width": 5, "height": 5}}]}}"#,
            "\n"
        );
        let mut source = JsonLinesSource::new(Cursor::new(data), 320.0);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert!(first.is_blank());

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.sequence, 1);
        assert_eq!(second.view_width, 320.0);
        assert_eq!(second.recognized.blocks.len(), 1);

        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_json_lines_source_bad_payload() {
        let mut source = JsonLinesSource::new(Cursor::new("not json\n"), 320.0);
        assert!(source.next_frame().is_err());
    }
}
