//! Live capture as a poll-driven state machine.
//!
//! A session walks `Opening → Polling → {Saving → Processing | Quitting} → Done`.
//! Every `step` is one transition, so the loop can be driven one state at a time.
//! The device is released exactly once when the session is dropped, whichever
//! path ends it.

#[cfg(feature = "camera")]
mod ffmpeg;
mod stdin;

#[cfg(feature = "camera")]
pub use ffmpeg::FfmpegCamera;
pub use stdin::StdinTriggers;

use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info, trace, warn};

use crate::error::{CaptureError, Result};
use crate::models::record::{ExtractionResult, FieldRecord};

/// A live video source.
pub trait CaptureDevice {
    /// Open the device. Called once per session.
    fn open(&mut self) -> std::result::Result<(), CaptureError>;

    /// Grab the next frame.
    fn read_frame(&mut self) -> std::result::Result<RgbImage, CaptureError>;

    /// Present a frame to the operator.
    fn show(&mut self, _frame: &RgbImage) {}

    /// Release the device. Must tolerate being called on an unopened device.
    fn release(&mut self);
}

/// Operator request observed between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Save,
    Quit,
}

/// Non-blocking source of operator triggers.
pub trait TriggerSource {
    /// The pending trigger, if any.
    fn poll(&mut self) -> Option<Trigger>;
}

/// States of a capture session.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Opening,
    Polling,
    Saving(RgbImage),
    Processing(RgbImage),
    Quitting,
    Done,
}

impl CaptureState {
    pub fn is_done(&self) -> bool {
        matches!(self, CaptureState::Done)
    }
}

/// Releases the device on drop.
struct DeviceGuard<'a, D: CaptureDevice> {
    device: &'a mut D,
}

impl<D: CaptureDevice> Deref for DeviceGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &*self.device
    }
}

impl<D: CaptureDevice> DerefMut for DeviceGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut *self.device
    }
}

impl<D: CaptureDevice> Drop for DeviceGuard<'_, D> {
    fn drop(&mut self) {
        self.device.release();
        debug!("Capture device released");
    }
}

/// One interactive capture run over a borrowed device.
pub struct CaptureSession<'a, D: CaptureDevice, T: TriggerSource> {
    device: DeviceGuard<'a, D>,
    triggers: &'a mut T,
    frame_path: PathBuf,
}

impl<'a, D: CaptureDevice, T: TriggerSource> CaptureSession<'a, D, T> {
    pub fn new(device: &'a mut D, triggers: &'a mut T, frame_path: impl Into<PathBuf>) -> Self {
        Self {
            device: DeviceGuard { device },
            triggers,
            frame_path: frame_path.into(),
        }
    }

    /// Advance one transition.
    ///
    /// `Processing` is returned unchanged: handing the frame to the pipeline
    /// is the caller's job (see [`CaptureSession::run`]).
    pub fn step(&mut self, state: CaptureState) -> CaptureState {
        match state {
            CaptureState::Opening => match self.device.open() {
                Ok(()) => {
                    info!("Capture started: 's' saves and processes a frame, 'q' quits");
                    CaptureState::Polling
                }
                Err(e) => {
                    warn!("Could not open capture device: {}", e);
                    CaptureState::Done
                }
            },
            CaptureState::Polling => {
                let frame = match self.device.read_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Failed to grab frame: {}", e);
                        return CaptureState::Done;
                    }
                };

                trace!("Frame {}x{}", frame.width(), frame.height());
                self.device.show(&frame);

                match self.triggers.poll() {
                    Some(Trigger::Save) => CaptureState::Saving(frame),
                    Some(Trigger::Quit) => CaptureState::Quitting,
                    None => CaptureState::Polling,
                }
            }
            CaptureState::Saving(frame) => {
                match write_frame(&frame, &self.frame_path) {
                    Ok(()) => info!("Image saved at {}", self.frame_path.display()),
                    Err(e) => warn!(
                        "Could not save frame to {}: {}",
                        self.frame_path.display(),
                        e
                    ),
                }
                CaptureState::Processing(frame)
            }
            CaptureState::Processing(frame) => CaptureState::Processing(frame),
            CaptureState::Quitting => {
                info!("Capture quit without saving");
                CaptureState::Done
            }
            CaptureState::Done => CaptureState::Done,
        }
    }

    /// Drive the session to completion.
    ///
    /// Yields one record when a frame is saved and zero otherwise. An error
    /// from `process` propagates after the device has been released.
    pub fn run<F>(mut self, mut process: F) -> Result<ExtractionResult>
    where
        F: FnMut(RgbImage) -> Result<FieldRecord>,
    {
        let mut state = CaptureState::Opening;
        loop {
            state = match state {
                CaptureState::Processing(frame) => {
                    let record = process(frame)?;
                    return Ok(ExtractionResult::from(vec![record]));
                }
                CaptureState::Done => return Ok(ExtractionResult::empty()),
                other => self.step(other),
            };
        }
    }
}

fn write_frame(frame: &RgbImage, path: &Path) -> std::result::Result<(), image::ImageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    frame.save(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::fields::{FieldParser, LineFieldParser};
    use image::Rgb;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;

    pub(crate) struct FakeDevice {
        pub(crate) fail_open: bool,
        pub(crate) frames: VecDeque<std::result::Result<RgbImage, CaptureError>>,
        pub(crate) shown: usize,
        pub(crate) released: usize,
    }

    impl FakeDevice {
        /// A device that yields `count` frames and then fails.
        pub(crate) fn with_frames(count: usize) -> Self {
            Self {
                fail_open: false,
                frames: (0..count)
                    .map(|i| Ok(RgbImage::from_pixel(6, 4, Rgb([i as u8 * 40, 90, 200]))))
                    .collect(),
                shown: 0,
                released: 0,
            }
        }

        pub(crate) fn unopenable() -> Self {
            Self {
                fail_open: true,
                ..Self::with_frames(3)
            }
        }
    }

    impl CaptureDevice for FakeDevice {
        fn open(&mut self) -> std::result::Result<(), CaptureError> {
            if self.fail_open {
                Err(CaptureError::Open("no such device".to_string()))
            } else {
                Ok(())
            }
        }

        fn read_frame(&mut self) -> std::result::Result<RgbImage, CaptureError> {
            self.frames
                .pop_front()
                .unwrap_or_else(|| Err(CaptureError::Read("stream ended".to_string())))
        }

        fn show(&mut self, _frame: &RgbImage) {
            self.shown += 1;
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    /// Hands out one scripted poll result per frame.
    pub(crate) struct ScriptedTriggers(pub(crate) VecDeque<Option<Trigger>>);

    impl ScriptedTriggers {
        pub(crate) fn new(polls: impl IntoIterator<Item = Option<Trigger>>) -> Self {
            Self(polls.into_iter().collect())
        }
    }

    impl TriggerSource for ScriptedTriggers {
        fn poll(&mut self) -> Option<Trigger> {
            self.0.pop_front().flatten()
        }
    }

    fn parse_frame(frame: RgbImage) -> Result<FieldRecord> {
        let text = format!(
            "frame {}x{}\nTotal: {}",
            frame.width(),
            frame.height(),
            frame.get_pixel(0, 0)[0]
        );
        Ok(LineFieldParser::new().parse(&text))
    }

    #[test]
    fn test_quit_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = FakeDevice::with_frames(5);
        let mut triggers = ScriptedTriggers::new([None, Some(Trigger::Quit)]);

        let result = CaptureSession::new(&mut device, &mut triggers, dir.path().join("f.jpg"))
            .run(parse_frame)
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(device.shown, 2);
        assert_eq!(device.released, 1);
        assert!(!dir.path().join("f.jpg").exists());
    }

    #[test]
    fn test_save_yields_one_record_and_writes_frame() {
        let dir = tempfile::tempdir().unwrap();
        let frame_path = dir.path().join("captured_images").join("captured_frame.jpg");
        let mut device = FakeDevice::with_frames(5);
        let mut triggers = ScriptedTriggers::new([None, None, Some(Trigger::Save)]);

        let result = CaptureSession::new(&mut device, &mut triggers, &frame_path)
            .run(parse_frame)
            .unwrap();

        assert_eq!(result.len(), 1);
        // third frame was the one saved
        assert_eq!(result.records()[0].get("total"), Some("Total: 80"));
        assert!(frame_path.exists());
        assert_eq!(device.released, 1);
    }

    #[test]
    fn test_open_failure_yields_nothing() {
        let mut device = FakeDevice::unopenable();
        let mut triggers = ScriptedTriggers::new([Some(Trigger::Save)]);

        let result = CaptureSession::new(&mut device, &mut triggers, "unused.jpg")
            .run(parse_frame)
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(device.shown, 0);
        assert_eq!(device.released, 1);
    }

    #[test]
    fn test_read_failure_yields_nothing() {
        let mut device = FakeDevice::with_frames(2);
        let mut triggers = ScriptedTriggers::new([]);

        let result = CaptureSession::new(&mut device, &mut triggers, "unused.jpg")
            .run(parse_frame)
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(device.shown, 2);
        assert_eq!(device.released, 1);
    }

    #[test]
    fn test_processing_error_still_releases() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = FakeDevice::with_frames(1);
        let mut triggers = ScriptedTriggers::new([Some(Trigger::Save)]);

        let result = CaptureSession::new(&mut device, &mut triggers, dir.path().join("f.jpg"))
            .run(|_| Err(ScanError::Config("boom".to_string())));

        assert!(matches!(result, Err(ScanError::Config(_))));
        assert_eq!(device.released, 1);
    }

    #[test]
    fn test_unwritable_frame_path_still_processes() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let mut device = FakeDevice::with_frames(1);
        let mut triggers = ScriptedTriggers::new([Some(Trigger::Save)]);

        let result = CaptureSession::new(&mut device, &mut triggers, blocker.join("f.jpg"))
            .run(parse_frame)
            .unwrap();

        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_step_transitions() {
        let mut device = FakeDevice::with_frames(2);
        let mut triggers = ScriptedTriggers::new([None, Some(Trigger::Save)]);
        let mut session = CaptureSession::new(&mut device, &mut triggers, "unused.jpg");

        assert_eq!(session.step(CaptureState::Opening), CaptureState::Polling);
        assert_eq!(session.step(CaptureState::Polling), CaptureState::Polling);
        assert!(matches!(
            session.step(CaptureState::Polling),
            CaptureState::Saving(_)
        ));
        assert_eq!(session.step(CaptureState::Quitting), CaptureState::Done);
        assert!(session.step(CaptureState::Done).is_done());
    }
}
