//! Camera capture through an `ffmpeg` child process, previewed with `ffplay`.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use image::RgbImage;
use tracing::{debug, trace, warn};

use super::CaptureDevice;
use crate::error::CaptureError;
use crate::models::config::CaptureConfig;

/// ffmpeg stderr lines kept for error messages.
const STDERR_TAIL: usize = 20;

/// Reads `rgb24` frames that `ffmpeg` decodes from a camera device.
pub struct FfmpegCamera {
    config: CaptureConfig,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    first_frame: Option<RgbImage>,
    preview: Option<PreviewWindow>,
}

impl FfmpegCamera {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            child: None,
            stdout: None,
            stderr: None,
            first_frame: None,
            preview: None,
        }
    }

    fn frame_len(&self) -> usize {
        self.config.width as usize * self.config.height as usize * 3
    }

    fn args(&self) -> Vec<String> {
        let size = format!("{}x{}", self.config.width, self.config.height);
        let scale = format!("scale={}:{}", self.config.width, self.config.height);

        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            self.config.input_format.as_str(),
            "-video_size",
            size.as_str(),
            "-i",
            self.config.device.as_str(),
            "-vf",
            scale.as_str(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn preview_args(&self) -> Vec<String> {
        let size = format!("{}x{}", self.config.width, self.config.height);
        let title = format!("fieldscan: {} (s = save, q = quit)", self.config.device);

        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-window_title",
            title.as_str(),
            "-f",
            "rawvideo",
            "-pixel_format",
            "rgb24",
            "-video_size",
            size.as_str(),
            "-i",
            "-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn open_preview(&mut self) {
        let mut command = Command::new(&self.config.ffplay_path);
        command.args(self.preview_args());

        match PreviewWindow::spawn(command) {
            Ok(window) => {
                debug!("Preview window opened with {}", self.config.ffplay_path);
                self.preview = Some(window);
            }
            Err(e) => warn!(
                "Live preview unavailable ({}: {}), capturing without it",
                self.config.ffplay_path, e
            ),
        }
    }

    fn next_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let len = self.frame_len();
        let stdout = self.stdout.as_mut().ok_or(CaptureError::NotOpen)?;

        let mut buf = vec![0u8; len];
        stdout
            .read_exact(&mut buf)
            .map_err(|e| CaptureError::Read(e.to_string()))?;

        RgbImage::from_raw(self.config.width, self.config.height, buf)
            .ok_or_else(|| CaptureError::Read("short frame".to_string()))
    }

    /// Kill the child and return the tail of what it wrote to stderr.
    fn shutdown(&mut self) -> String {
        self.stdout = None;
        self.first_frame = None;

        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }

        self.stderr
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
    }
}

impl CaptureDevice for FfmpegCamera {
    fn open(&mut self) -> Result<(), CaptureError> {
        if self.config.width == 0 || self.config.height == 0 {
            return Err(CaptureError::Open(format!(
                "invalid frame size {}x{}",
                self.config.width, self.config.height
            )));
        }

        let args = self.args();
        debug!("Spawning {} {}", self.config.ffmpeg_path, args.join(" "));

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CaptureError::Open(format!(
                    "failed to execute {}: {}",
                    self.config.ffmpeg_path, e
                ))
            })?;

        self.stdout = child.stdout.take();
        self.stderr = child.stderr.take().map(read_stderr);
        self.child = Some(child);

        // The device counts as open once the first frame arrives
        match self.next_frame() {
            Ok(frame) => {
                self.first_frame = Some(frame);
                if self.config.preview {
                    self.open_preview();
                }
                Ok(())
            }
            Err(e) => {
                let stderr = self.shutdown();
                Err(CaptureError::Open(if stderr.is_empty() {
                    format!("{}: {}", self.config.device, e)
                } else {
                    format!("{}: {}", self.config.device, stderr)
                }))
            }
        }
    }

    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        match self.first_frame.take() {
            Some(frame) => Ok(frame),
            None => self.next_frame(),
        }
    }

    fn show(&mut self, frame: &RgbImage) {
        trace!("Live frame {}x{}", frame.width(), frame.height());

        if let Some(preview) = self.preview.as_mut() {
            if !preview.show(frame) {
                warn!("Preview window closed, capture continues without it");
                if let Some(preview) = self.preview.take() {
                    preview.close();
                }
            }
        }
    }

    fn release(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.close();
            debug!("Preview window closed");
        }

        if self.child.is_some() {
            let stderr = self.shutdown();
            if !stderr.is_empty() {
                debug!("ffmpeg: {}", stderr);
            }
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.release();
    }
}

/// Drain a child's stderr on its own thread so the pipe never fills up.
///
/// The thread yields the last lines once the pipe closes.
fn read_stderr<R: Read + Send + 'static>(pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);
        for line in BufReader::new(pipe).lines().map_while(Result::ok) {
            trace!("ffmpeg: {}", line);
            if tail.len() == STDERR_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        Vec::from(tail).join("\n").trim().to_string()
    })
}

/// A player window fed raw frames on its stdin.
struct PreviewWindow {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl PreviewWindow {
    fn spawn(mut command: Command) -> std::io::Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let stdin = child.stdin.take();

        Ok(Self { child, stdin })
    }

    /// Send one frame. False once the window is gone.
    fn show(&mut self, frame: &RgbImage) -> bool {
        let Some(stdin) = self.stdin.as_mut() else {
            return false;
        };

        if stdin.write_all(frame.as_raw()).is_err() {
            self.stdin = None;
            return false;
        }
        true
    }

    fn close(mut self) {
        // EOF lets the player exit on its own; kill covers one that does not
        self.stdin = None;
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
