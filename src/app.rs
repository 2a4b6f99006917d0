//! Scan Coordinator
//!
//! Runs the parser and the consensus session on a dedicated worker thread.
//! Frames reach the worker through a single FIFO channel, so one session is
//! only ever driven by one consumer, in capture order.

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::analysis::{ScanEvent, ScanSession, TimestampedEvent};
use crate::capture::frame::OcrFrame;
use crate::config::AppConfig;
use crate::mrz::MrzParser;
use crate::shared::{CallerToScanner, RuntimeState, ScannerToCaller};
use crate::vision::is_aligned;

/// Main scan coordinator
pub struct ScannerApp {
    /// Runtime counters shared with the worker
    pub runtime: Arc<RwLock<RuntimeState>>,
    /// Channel to send frames and commands to the worker
    to_worker: Sender<CallerToScanner>,
    /// Channel to receive events from the worker
    from_worker: Receiver<ScannerToCaller>,
    /// Handle to worker thread
    worker_handle: Option<JoinHandle<()>>,
}

impl ScannerApp {
    /// Validate the configuration and start the worker thread
    pub fn start(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let session = ScanSession::new(&config.consensus)?;

        let runtime = Arc::new(RwLock::new(RuntimeState::default()));
        let (to_worker, worker_rx) = unbounded();
        let (worker_tx, from_worker) = unbounded();

        let worker = ScanWorker {
            parser: config.parser.build(),
            session,
            min_block_width_ratio: config.alignment.min_block_width_ratio,
            runtime: runtime.clone(),
            events: worker_tx,
            last_sequence: None,
        };

        runtime.write().is_running = true;
        let handle = std::thread::Builder::new()
            .name("mrz-scan-worker".to_string())
            .spawn(move || worker.run(worker_rx))
            .context("Failed to spawn scan worker")?;

        info!("Scan worker started");

        Ok(Self {
            runtime,
            to_worker,
            from_worker,
            worker_handle: Some(handle),
        })
    }

    /// Queue the next frame for processing
    pub fn submit(&self, frame: OcrFrame) -> Result<()> {
        self.send(CallerToScanner::Frame(frame))
    }

    /// Discard the current scan and start over
    pub fn reset(&self) -> Result<()> {
        self.send(CallerToScanner::Reset)
    }

    /// Events produced by the worker
    pub fn events(&self) -> &Receiver<ScannerToCaller> {
        &self.from_worker
    }

    /// Stop the worker and wait for it to finish
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn send(&self, message: CallerToScanner) -> Result<()> {
        self.to_worker
            .send(message)
            .map_err(|_| anyhow!("Scan worker is not running"))
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.worker_handle.take() else {
            return Ok(());
        };
        let _ = self.to_worker.send(CallerToScanner::Shutdown);
        handle
            .join()
            .map_err(|_| anyhow!("Scan worker panicked"))?;
        info!("Scan worker stopped");
        Ok(())
    }
}

impl Drop for ScannerApp {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Error stopping scan worker: {}", e);
        }
    }
}

/// State owned by the worker thread
struct ScanWorker {
    parser: MrzParser,
    session: ScanSession,
    min_block_width_ratio: f32,
    runtime: Arc<RwLock<RuntimeState>>,
    events: Sender<ScannerToCaller>,
    last_sequence: Option<u64>,
}

impl ScanWorker {
    fn run(mut self, input: Receiver<CallerToScanner>) {
        while let Ok(message) = input.recv() {
            match message {
                CallerToScanner::Frame(frame) => self.handle_frame(&frame),
                CallerToScanner::Reset => self.handle_reset(),
                CallerToScanner::Shutdown => break,
            }
        }

        self.runtime.write().is_running = false;
        let _ = self.events.send(ScannerToCaller::Stopped);
    }

    fn emit(&self, event: ScanEvent) {
        let _ = self
            .events
            .send(ScannerToCaller::Event(TimestampedEvent::now(event)));
    }

    fn handle_frame(&mut self, frame: &OcrFrame) {
        self.runtime.write().frames_received += 1;

        if let Some(last) = self.last_sequence {
            if frame.sequence <= last {
                warn!(
                    "Dropping out-of-order frame {} (last processed {})",
                    frame.sequence, last
                );
                self.runtime.write().frames_dropped += 1;
                self.emit(ScanEvent::FrameDropped {
                    sequence: frame.sequence,
                    last_sequence: last,
                });
                return;
            }
        }
        self.last_sequence = Some(frame.sequence);

        let blocks = &frame.recognized.blocks;
        let aligned = !frame.is_blank()
            && is_aligned(blocks, frame.view_width, self.min_block_width_ratio);
        self.update_alignment(aligned);

        if frame.is_blank() || self.session.is_resolved() {
            return;
        }

        let decoded = self.parser.decode_blocks(blocks);
        if decoded.is_some() {
            self.runtime.write().frames_decoded += 1;
        } else {
            debug!("Frame {}: no MRZ", frame.sequence);
        }

        let before = self.session.phase();
        let result = self.session.observe(decoded);
        self.update_phase(before);

        trace!(
            "Frame {} handled {:?} after delivery",
            frame.sequence,
            frame.timestamp.elapsed()
        );
        if let Some(fields) = result {
            self.emit(ScanEvent::Resolved(fields));
        }
    }

    fn handle_reset(&mut self) {
        let before = self.session.phase();
        self.session.reset();
        {
            let mut runtime = self.runtime.write();
            runtime.reset_session();
        }
        self.update_phase(before);
    }

    fn update_alignment(&mut self, aligned: bool) {
        let changed = {
            let mut runtime = self.runtime.write();
            let changed = runtime.aligned != aligned;
            runtime.aligned = aligned;
            changed
        };
        if changed {
            self.emit(ScanEvent::AlignmentChanged { aligned });
        }
    }

    fn update_phase(&mut self, before: crate::analysis::ScanPhase) {
        let after = self.session.phase();
        self.runtime.write().phase = after;
        if before != after {
            self.emit(ScanEvent::PhaseChanged {
                from: before,
                to: after,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ScanPhase;
    use crate::capture::FrameSequencer;
    use crate::vision::{RecognizedText, Rect, TextBlock};
    use std::time::Duration;

    const LINE1: &str = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36UTO7408122F1204159ZE184226B<<<<<10";

    fn mrz_text(width: f32) -> RecognizedText {
        let mut block = TextBlock::from_lines(&[LINE1, LINE2]);
        block.frame = Rect::new(0.0, 0.0, width, 80.0);
        RecognizedText {
            text: block.text.clone(),
            blocks: vec![block],
        }
    }

    fn next_event(app: &ScannerApp) -> ScanEvent {
        loop {
            match app.events().recv_timeout(Duration::from_secs(5)) {
                Ok(ScannerToCaller::Event(stamped)) => return stamped.event,
                Ok(ScannerToCaller::Stopped) => panic!("worker stopped"),
                Err(e) => panic!("no event: {}", e),
            }
        }
    }

    fn wait_for_resolution(app: &ScannerApp) -> crate::mrz::DecodedMrzFields {
        loop {
            if let ScanEvent::Resolved(fields) = next_event(app) {
                return fields;
            }
        }
    }

    #[test]
    fn test_resolves_after_three_frames() {
        let app = ScannerApp::start(&AppConfig::default()).unwrap();
        let mut sequencer = FrameSequencer::new();

        for _ in 0..3 {
            app.submit(sequencer.stamp(1000.0, mrz_text(900.0))).unwrap();
        }

        let fields = wait_for_resolution(&app);
        assert_eq!(fields.document_number, "L898902C3");
        assert_eq!(fields.surname, "ERIKSSON");

        let runtime = app.runtime.read().clone();
        assert_eq!(runtime.phase, ScanPhase::Resolved);
        assert_eq!(runtime.frames_decoded, 3);
        assert!(runtime.aligned);
        drop(runtime);

        app.shutdown().unwrap();
    }

    #[test]
    fn test_events_stamped_after_submission() {
        let app = ScannerApp::start(&AppConfig::default()).unwrap();
        let mut sequencer = FrameSequencer::new();
        let submitted = std::time::Instant::now();

        app.submit(sequencer.stamp(1000.0, mrz_text(900.0))).unwrap();

        match app.events().recv_timeout(Duration::from_secs(5)) {
            Ok(ScannerToCaller::Event(stamped)) => {
                assert!(matches!(stamped.event, ScanEvent::AlignmentChanged { aligned: true }));
                assert!(stamped.timestamp >= submitted);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        app.shutdown().unwrap();
    }

    #[test]
    fn test_out_of_order_frame_dropped() {
        let app = ScannerApp::start(&AppConfig::default()).unwrap();

        app.submit(OcrFrame::new(5, 1000.0, RecognizedText::default())).unwrap();
        app.submit(OcrFrame::new(3, 1000.0, RecognizedText::default())).unwrap();

        loop {
            if let ScanEvent::FrameDropped { sequence, last_sequence } = next_event(&app) {
                assert_eq!(sequence, 3);
                assert_eq!(last_sequence, 5);
                break;
            }
        }
        app.shutdown().unwrap();
    }

    #[test]
    fn test_reset_starts_new_scan() {
        let app = ScannerApp::start(&AppConfig::default()).unwrap();
        let mut sequencer = FrameSequencer::new();

        for _ in 0..3 {
            app.submit(sequencer.stamp(1000.0, mrz_text(900.0))).unwrap();
        }
        wait_for_resolution(&app);

        app.reset().unwrap();
        loop {
            if let ScanEvent::PhaseChanged { from, to } = next_event(&app) {
                assert_eq!(from, ScanPhase::Resolved);
                assert_eq!(to, ScanPhase::Searching);
                break;
            }
        }

        for _ in 0..3 {
            app.submit(sequencer.stamp(1000.0, mrz_text(500.0))).unwrap();
        }
        let fields = wait_for_resolution(&app);
        assert_eq!(fields.birth_date, "740812");
        assert!(!app.runtime.read().aligned);

        app.shutdown().unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.consensus.window_size = 1;
        assert!(ScannerApp::start(&config).is_err());
    }
}
