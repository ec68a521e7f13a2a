// Frame loop: one segmenter step per frame, with its directives carried out
// against the clip writer and the catalog.

use crate::dataset::{Catalog, ClipRecord};
use crate::display::{StatusDisplay, StatusView};
use crate::pose::PoseSource;
use crate::segmentation::{
    Command, FinishedClip, FrameInput, LandmarkSnapshot, Segmenter, Transition,
};
use crate::video::{Acquired, ClipWriter, Frame, FrameSource};
use anyhow::{anyhow, Result};
use chrono::Local;
use std::time::Duration;

/// What happened while processing one frame
#[derive(Debug, Default)]
pub struct FrameReport {
    pub transition: Option<Transition>,
    pub saved: Option<ClipRecord>,
    pub failure: Option<String>,
}

/// Totals for a finished run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub missed: usize,
    pub clips_saved: usize,
    pub failures: usize,
}

pub struct Recorder<F, W: ClipWriter<F>, C: Catalog> {
    label: String,
    segmenter: Box<dyn Segmenter<F>>,
    writer: W,
    catalog: C,
    frame_rate: f64,
    active: Option<W::Handle>,
    clips_saved: usize,
    last_error: Option<String>,
}

impl<F: Frame, W: ClipWriter<F>, C: Catalog> Recorder<F, W, C> {
    pub fn new(
        label: &str,
        segmenter: Box<dyn Segmenter<F>>,
        writer: W,
        catalog: C,
        frame_rate: f64,
    ) -> Self {
        Self {
            label: label.to_string(),
            segmenter,
            writer,
            catalog,
            frame_rate,
            active: None,
            clips_saved: 0,
            last_error: None,
        }
    }

    pub fn clips_saved(&self) -> usize {
        self.clips_saved
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn status_view(&self, landmarks: &LandmarkSnapshot) -> StatusView {
        StatusView {
            label: self.label.clone(),
            segmenter: self.segmenter.status(),
            landmarks: *landmarks,
            clips_saved: self.clips_saved,
            last_error: self.last_error.clone(),
        }
    }

    /// Step the segmenter with one frame and execute what it asks for:
    /// open a clip, write the frame, close a clip. In that order.
    pub fn process(
        &mut self,
        frame: &F,
        landmarks: &LandmarkSnapshot,
        command: Option<Command>,
        elapsed: Duration,
    ) -> FrameReport {
        let outcome = self.segmenter.step(FrameInput {
            frame,
            landmarks,
            command,
            elapsed,
        });

        let mut report = FrameReport {
            transition: outcome.transition,
            ..FrameReport::default()
        };
        if let Some(t) = outcome.transition {
            tracing::info!("{} -> {}", t.from, t.to);
        }

        if let Some(ticket) = &outcome.opened {
            match self
                .writer
                .open(&ticket.path, frame.dimensions(), self.frame_rate)
            {
                Ok(handle) => self.active = Some(handle),
                Err(e) => {
                    report.failure = Some(self.fail_clip(elapsed, e));
                    return report;
                }
            }
        }

        if outcome.record_frame {
            if let Some(handle) = self.active.as_mut() {
                if let Err(e) = self.writer.write(handle, frame) {
                    report.failure = Some(self.fail_clip(elapsed, e));
                    return report;
                }
            }
        }

        if let Some(finished) = outcome.finished {
            match self.finalize(finished) {
                Ok(record) => report.saved = Some(record),
                Err(e) => report.failure = Some(self.record_failure(e)),
            }
        }

        report
    }

    /// Flush any open clip through the normal save path.
    pub fn shutdown(&mut self, elapsed: Duration) -> Result<Option<ClipRecord>> {
        match self.segmenter.force_finalize(elapsed) {
            Some(finished) => {
                tracing::info!("Flushing open clip {} on exit", finished.ticket.file_name);
                self.finalize(finished).map(Some)
            }
            None => Ok(None),
        }
    }

    fn finalize(&mut self, finished: FinishedClip) -> Result<ClipRecord> {
        let handle = self
            .active
            .take()
            .ok_or_else(|| anyhow!("No open writer for {}", finished.ticket.file_name))?;
        self.writer.close(handle)?;

        let record = ClipRecord {
            file_name: finished.ticket.file_name.clone(),
            label: self.label.clone(),
            created_at: Local::now().naive_local(),
            frame_count: finished.frame_count,
        };
        self.catalog.append(&record)?;
        self.clips_saved += 1;
        self.last_error = None;

        tracing::info!(
            "Saved {} ({} frames, {:.2}s)",
            record.file_name,
            record.frame_count,
            finished.ended_at.saturating_sub(finished.started_at).as_secs_f32()
        );
        Ok(record)
    }

    /// Abandon the open clip after a writer error. No record is written.
    fn fail_clip(&mut self, elapsed: Duration, err: anyhow::Error) -> String {
        let abandoned = self.segmenter.force_finalize(elapsed);
        if let Some(handle) = self.active.take() {
            if let Err(close_err) = self.writer.close(handle) {
                tracing::warn!("Failed to close abandoned clip: {}", close_err);
            }
        }
        if let Some(clip) = abandoned {
            tracing::error!("Abandoned {} after {} frames", clip.ticket.file_name, clip.frame_count);
        }
        self.record_failure(err)
    }

    fn record_failure(&mut self, err: anyhow::Error) -> String {
        let message = format!("{:#}", err);
        tracing::error!("Clip persistence failed: {}", message);
        self.last_error = Some(message.clone());
        message
    }
}

/// Drive the recorder until the source runs dry or the operator quits.
/// An open clip is flushed before returning, even when the loop failed.
pub fn run<F, W, C, S, P, D>(
    recorder: &mut Recorder<F, W, C>,
    source: &mut S,
    pose: &mut P,
    display: &mut D,
) -> Result<RunSummary>
where
    F: Frame,
    W: ClipWriter<F>,
    C: Catalog,
    S: FrameSource<F> + ?Sized,
    P: PoseSource<F> + ?Sized,
    D: StatusDisplay<F> + ?Sized,
{
    let mut summary = RunSummary::default();
    let mut last_elapsed = Duration::ZERO;

    let outcome = drive(
        recorder,
        source,
        pose,
        display,
        &mut summary,
        &mut last_elapsed,
    );
    if let Err(e) = &outcome {
        tracing::error!("Frame loop stopped: {:#}", e);
    }

    if let Err(e) = recorder.shutdown(last_elapsed) {
        summary.failures += 1;
        tracing::error!("Failed to save the open clip on exit: {:#}", e);
    }
    summary.clips_saved = recorder.clips_saved();

    outcome.map(|_| summary)
}

fn drive<F, W, C, S, P, D>(
    recorder: &mut Recorder<F, W, C>,
    source: &mut S,
    pose: &mut P,
    display: &mut D,
    summary: &mut RunSummary,
    last_elapsed: &mut Duration,
) -> Result<()>
where
    F: Frame,
    W: ClipWriter<F>,
    C: Catalog,
    S: FrameSource<F> + ?Sized,
    P: PoseSource<F> + ?Sized,
    D: StatusDisplay<F> + ?Sized,
{
    let mut pending: Option<Command> = None;

    loop {
        let (frame, elapsed) = match source.next_frame()? {
            Acquired::Frame(frame, elapsed) => (frame, elapsed),
            Acquired::Missed => {
                summary.missed += 1;
                tracing::warn!("Frame acquisition failed, skipping iteration");
                continue;
            }
            Acquired::Exhausted => {
                tracing::info!("Input exhausted");
                return Ok(());
            }
        };
        summary.frames += 1;
        *last_elapsed = elapsed;

        let landmarks = pose.detect(&frame);
        let report = recorder.process(&frame, &landmarks, pending.take(), elapsed);
        if report.failure.is_some() {
            summary.failures += 1;
        }

        let view = recorder.status_view(&landmarks);
        let command = if report.saved.is_some() {
            display.confirm_clip(&frame, &view)?
        } else {
            display.show(&frame, &view)?
        };

        match command {
            Some(Command::Quit) => {
                tracing::info!("Quit requested");
                return Ok(());
            }
            other => pending = other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ClipAllocator;
    use crate::segmentation::{
        ManualController, Point, RecorderState, SegmentationConfig, SegmentationController,
    };
    use crate::video::FrameSize;
    use std::collections::{HashMap, VecDeque};
    use std::path::{Path, PathBuf};

    #[derive(Debug, Clone, PartialEq)]
    struct TestFrame(u32);

    impl Frame for TestFrame {
        fn dimensions(&self) -> FrameSize {
            FrameSize {
                width: 640,
                height: 480,
            }
        }
    }

    /// Records what went into each clip path
    #[derive(Default)]
    struct MemoryWriter {
        written: HashMap<PathBuf, Vec<u32>>,
        closed: Vec<PathBuf>,
        fail_open: bool,
        fail_write_at: Option<usize>,
        writes: usize,
    }

    impl ClipWriter<TestFrame> for MemoryWriter {
        type Handle = PathBuf;

        fn open(&mut self, path: &Path, _size: FrameSize, _rate: f64) -> Result<PathBuf> {
            if self.fail_open {
                anyhow::bail!("codec unavailable");
            }
            self.written.insert(path.to_path_buf(), Vec::new());
            Ok(path.to_path_buf())
        }

        fn write(&mut self, handle: &mut PathBuf, frame: &TestFrame) -> Result<()> {
            self.writes += 1;
            if self.fail_write_at == Some(self.writes) {
                anyhow::bail!("disk full");
            }
            self.written
                .get_mut(handle.as_path())
                .ok_or_else(|| anyhow!("unknown handle"))?
                .push(frame.0);
            Ok(())
        }

        fn close(&mut self, handle: PathBuf) -> Result<()> {
            self.closed.push(handle);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryCatalog {
        records: Vec<ClipRecord>,
        fail_append: bool,
    }

    impl Catalog for MemoryCatalog {
        fn append(&mut self, record: &ClipRecord) -> Result<()> {
            if self.fail_append {
                anyhow::bail!("catalog is read-only");
            }
            self.records.push(record.clone());
            Ok(())
        }
    }

    fn allocator() -> ClipAllocator {
        ClipAllocator::from_existing(Path::new("dataset/hola"), std::iter::empty())
    }

    fn auto_recorder(writer: MemoryWriter) -> Recorder<TestFrame, MemoryWriter, MemoryCatalog> {
        auto_recorder_with(writer, MemoryCatalog::default())
    }

    fn auto_recorder_with(
        writer: MemoryWriter,
        catalog: MemoryCatalog,
    ) -> Recorder<TestFrame, MemoryWriter, MemoryCatalog> {
        let controller = SegmentationController::new(SegmentationConfig::default(), allocator());
        Recorder::new("hola", Box::new(controller), writer, catalog, 30.0)
    }

    fn wrists_at(x: f32, y: f32) -> LandmarkSnapshot {
        LandmarkSnapshot::from_wrists(Point::new(x, y), Point::new(x, y))
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Frames that go into the clip recorded by `drive_one_gesture`
    const GESTURE_FRAMES: usize = 9;

    /// Calibrate at (0.5, 0.5), then move, then hold still past the cooldown.
    /// Returns the report of the frame that closed the clip.
    fn drive_one_gesture(
        rec: &mut Recorder<TestFrame, MemoryWriter, MemoryCatalog>,
    ) -> FrameReport {
        let still = wrists_at(0.5, 0.5);
        let moved = wrists_at(0.5, 0.9);
        let mut frames: Vec<(LandmarkSnapshot, u64)> = vec![(still, 0), (still, 3000)];
        // Trigger frame, then four more while moving
        for i in 0..5 {
            frames.push((moved, 3100 + i * 100));
        }
        // Drop into ENDING at 3600, then hold until the cooldown expires
        for t in [3600, 3850, 4100, 4350, 4600] {
            frames.push((still, t));
        }

        let mut last = FrameReport::default();
        for (i, (snap, t)) in frames.iter().enumerate() {
            last = rec.process(&TestFrame(i as u32 + 1), snap, None, ms(*t));
        }
        last
    }

    #[test]
    fn test_writes_match_recorded_frame_count() {
        let mut rec = auto_recorder(MemoryWriter::default());
        let last = drive_one_gesture(&mut rec);

        assert!(last.saved.is_some());
        assert_eq!(rec.clips_saved(), 1);
        let record = &rec.catalog().records[0];
        assert_eq!(record.file_name, "video_0.mp4");
        assert_eq!(record.label, "hola");
        assert_eq!(record.frame_count, GESTURE_FRAMES);

        let path = Path::new("dataset/hola").join("video_0.mp4");
        assert_eq!(rec.writer().written[&path].len(), record.frame_count);
        assert_eq!(rec.writer().closed, vec![path]);
    }

    #[test]
    fn test_trigger_frame_not_written() {
        let mut rec = auto_recorder(MemoryWriter::default());
        drive_one_gesture(&mut rec);
        let path = Path::new("dataset/hola").join("video_0.mp4");
        // Frames 1-2 calibrate, frame 3 triggers
        assert_eq!(rec.writer().written[&path].first(), Some(&4));
    }

    #[test]
    fn test_write_failure_resets_without_record() {
        let writer = MemoryWriter {
            fail_write_at: Some(2),
            ..MemoryWriter::default()
        };
        let mut rec = auto_recorder(writer);
        let still = wrists_at(0.5, 0.5);
        let moved = wrists_at(0.5, 0.9);

        rec.process(&TestFrame(1), &still, None, ms(0));
        rec.process(&TestFrame(2), &still, None, ms(3000));
        rec.process(&TestFrame(3), &moved, None, ms(3100));
        let ok = rec.process(&TestFrame(4), &moved, None, ms(3200));
        assert!(ok.failure.is_none());
        let failed = rec.process(&TestFrame(5), &moved, None, ms(3300));

        assert!(failed.failure.as_deref().unwrap().contains("disk full"));
        assert_eq!(rec.status_view(&moved).segmenter.state, RecorderState::Idle);
        assert!(rec.catalog().records.is_empty());
        assert_eq!(rec.clips_saved(), 0);
        assert_eq!(rec.writer().closed.len(), 1);
        assert!(rec.last_error().is_some());

        // Still at the moved position: the next frame starts a fresh clip
        let report = rec.process(&TestFrame(6), &moved, None, ms(3400));
        assert_eq!(
            report.transition.map(|t| t.to),
            Some(RecorderState::Recording)
        );
    }

    #[test]
    fn test_open_failure_resets_without_writes() {
        let writer = MemoryWriter {
            fail_open: true,
            ..MemoryWriter::default()
        };
        let mut rec = auto_recorder(writer);
        let still = wrists_at(0.5, 0.5);
        let moved = wrists_at(0.5, 0.9);

        rec.process(&TestFrame(1), &still, None, ms(0));
        rec.process(&TestFrame(2), &still, None, ms(3000));
        let report = rec.process(&TestFrame(3), &moved, None, ms(3100));

        assert!(report.failure.as_deref().unwrap().contains("codec unavailable"));
        assert_eq!(rec.status_view(&moved).segmenter.state, RecorderState::Idle);
        assert_eq!(rec.writer().writes, 0);
        assert!(rec.writer().closed.is_empty());
        assert!(rec.catalog().records.is_empty());
        assert_eq!(rec.last_error(), Some("codec unavailable"));
    }

    #[test]
    fn test_append_failure_closes_clip_without_counting_it() {
        let catalog = MemoryCatalog {
            fail_append: true,
            ..MemoryCatalog::default()
        };
        let mut rec = auto_recorder_with(MemoryWriter::default(), catalog);
        let last = drive_one_gesture(&mut rec);

        assert!(last.saved.is_none());
        assert!(last.failure.as_deref().unwrap().contains("read-only"));
        assert_eq!(rec.clips_saved(), 0);
        assert!(rec.last_error().is_some());
        let first = Path::new("dataset/hola").join("video_0.mp4");
        assert_eq!(rec.writer().closed, vec![first]);
        assert_eq!(rec.status_view(&wrists_at(0.5, 0.5)).segmenter.state, RecorderState::Idle);

        // The next excursion gets a fresh name
        let report = rec.process(&TestFrame(20), &wrists_at(0.5, 0.9), None, ms(4700));
        assert_eq!(
            report.transition.map(|t| t.to),
            Some(RecorderState::Recording)
        );
        let second = Path::new("dataset/hola").join("video_1.mp4");
        assert!(rec.writer().written.contains_key(&second));
    }

    #[test]
    fn test_shutdown_flushes_open_clip() {
        let mut rec = auto_recorder(MemoryWriter::default());
        let still = wrists_at(0.5, 0.5);
        let moved = wrists_at(0.5, 0.9);

        rec.process(&TestFrame(1), &still, None, ms(0));
        rec.process(&TestFrame(2), &still, None, ms(3000));
        rec.process(&TestFrame(3), &moved, None, ms(3100));
        rec.process(&TestFrame(4), &moved, None, ms(3200));
        rec.process(&TestFrame(5), &moved, None, ms(3300));

        let record = rec.shutdown(ms(3300)).unwrap().unwrap();
        assert_eq!(record.frame_count, 2);
        assert_eq!(rec.catalog().records.len(), 1);
        assert!(rec.shutdown(ms(3400)).unwrap().is_none());
    }

    struct ScriptedSource {
        frames: VecDeque<Acquired<TestFrame>>,
    }

    impl FrameSource<TestFrame> for ScriptedSource {
        fn next_frame(&mut self) -> Result<Acquired<TestFrame>> {
            Ok(self.frames.pop_front().unwrap_or(Acquired::Exhausted))
        }
    }

    /// Presses a key on a given frame and counts confirmations
    struct ScriptedDisplay {
        keys: HashMap<u32, Command>,
        confirmations: usize,
        fail_on: Option<u32>,
    }

    impl StatusDisplay<TestFrame> for ScriptedDisplay {
        fn show(&mut self, frame: &TestFrame, _status: &StatusView) -> Result<Option<Command>> {
            if self.fail_on == Some(frame.0) {
                anyhow::bail!("imshow failed");
            }
            Ok(self.keys.get(&frame.0).copied())
        }

        fn confirm_clip(
            &mut self,
            frame: &TestFrame,
            status: &StatusView,
        ) -> Result<Option<Command>> {
            self.confirmations += 1;
            self.show(frame, status)
        }
    }

    #[test]
    fn test_manual_run_loop() {
        let controller = ManualController::new(3, allocator());
        let mut rec = Recorder::new(
            "hola",
            Box::new(controller),
            MemoryWriter::default(),
            MemoryCatalog::default(),
            30.0,
        );

        let mut frames = VecDeque::new();
        for i in 1..=10u32 {
            if i == 4 {
                frames.push_back(Acquired::Missed);
            }
            frames.push_back(Acquired::Frame(TestFrame(i), ms(i as u64 * 33)));
        }
        let mut source = ScriptedSource { frames };
        // Pressed on frame 2, so frame 3 carries the start command
        let mut display = ScriptedDisplay {
            keys: HashMap::from([(2, Command::StartRecording), (8, Command::Quit)]),
            confirmations: 0,
            fail_on: None,
        };
        let mut pose = |_: &TestFrame| LandmarkSnapshot::absent();

        let summary = run(&mut rec, &mut source, &mut pose, &mut display).unwrap();

        assert_eq!(summary.frames, 8);
        assert_eq!(summary.missed, 1);
        assert_eq!(summary.clips_saved, 1);
        assert_eq!(display.confirmations, 1);
        let path = Path::new("dataset/hola").join("video_0.mp4");
        assert_eq!(rec.writer().written[&path], vec![3, 4, 5]);
        assert_eq!(rec.catalog().records[0].frame_count, 3);
    }

    #[test]
    fn test_run_flushes_on_exhausted_input() {
        let controller = ManualController::new(30, allocator());
        let mut rec = Recorder::new(
            "hola",
            Box::new(controller),
            MemoryWriter::default(),
            MemoryCatalog::default(),
            30.0,
        );
        let frames = (1..=5u32)
            .map(|i| Acquired::Frame(TestFrame(i), ms(i as u64 * 33)))
            .collect();
        let mut source = ScriptedSource { frames };
        let mut display = ScriptedDisplay {
            keys: HashMap::from([(1, Command::StartRecording)]),
            confirmations: 0,
            fail_on: None,
        };
        let mut pose = |_: &TestFrame| LandmarkSnapshot::absent();

        let summary = run(&mut rec, &mut source, &mut pose, &mut display).unwrap();

        assert_eq!(summary.clips_saved, 1);
        assert_eq!(rec.catalog().records[0].frame_count, 4);
    }

    #[test]
    fn test_display_error_still_flushes_open_clip() {
        let controller = ManualController::new(30, allocator());
        let mut rec = Recorder::new(
            "hola",
            Box::new(controller),
            MemoryWriter::default(),
            MemoryCatalog::default(),
            30.0,
        );
        let frames = (1..=10u32)
            .map(|i| Acquired::Frame(TestFrame(i), ms(i as u64 * 33)))
            .collect();
        let mut source = ScriptedSource { frames };
        let mut display = ScriptedDisplay {
            keys: HashMap::from([(1, Command::StartRecording)]),
            confirmations: 0,
            fail_on: Some(5),
        };
        let mut pose = |_: &TestFrame| LandmarkSnapshot::absent();

        let err = run(&mut rec, &mut source, &mut pose, &mut display).unwrap_err();

        assert!(err.to_string().contains("imshow failed"));
        let path = Path::new("dataset/hola").join("video_0.mp4");
        assert_eq!(rec.writer().written[&path], vec![2, 3, 4, 5]);
        assert_eq!(rec.writer().closed, vec![path]);
        assert_eq!(rec.catalog().records.len(), 1);
        assert_eq!(rec.catalog().records[0].frame_count, 4);
    }

    /// Fails after handing out a few frames
    struct BrokenSource {
        remaining: u32,
    }

    impl FrameSource<TestFrame> for BrokenSource {
        fn next_frame(&mut self) -> Result<Acquired<TestFrame>> {
            if self.remaining == 0 {
                anyhow::bail!("decode error");
            }
            let id = 4 - self.remaining;
            self.remaining -= 1;
            Ok(Acquired::Frame(TestFrame(id), ms(id as u64 * 33)))
        }
    }

    #[test]
    fn test_source_error_still_flushes_open_clip() {
        let controller = ManualController::new(30, allocator());
        let mut rec = Recorder::new(
            "hola",
            Box::new(controller),
            MemoryWriter::default(),
            MemoryCatalog::default(),
            30.0,
        );
        let mut source = BrokenSource { remaining: 3 };
        let mut display = ScriptedDisplay {
            keys: HashMap::from([(1, Command::StartRecording)]),
            confirmations: 0,
            fail_on: None,
        };
        let mut pose = |_: &TestFrame| LandmarkSnapshot::absent();

        assert!(run(&mut rec, &mut source, &mut pose, &mut display).is_err());
        assert_eq!(rec.catalog().records.len(), 1);
        assert_eq!(rec.catalog().records[0].frame_count, 2);
    }
}
