// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Capturing simulation frames and exporting them to disk.
//!
//! A [`Recording`] captures one [`Frame`] per tick until it is stopped. It then
//! creates a numbered output directory, writes the frame table and renders the
//! captured frames one per step into PNG files, so the live loop stays
//! responsive while exporting. Cancelling at any point jumps straight to
//! [`RecordingState::Finished`]; files already written stay on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cartpole_core::physics::{Cart, CartParameters, CartState};
use cartpole_core::renderer::{CameraPose, RenderError, RenderSurface, SurfaceFactory};
use thiserror::Error;

use crate::scene::{paint_cart, Scenery};

/// Name of the frame table inside a recording directory.
pub const FRAME_TABLE: &str = "frames.csv";

/// Header row of the frame table.
pub const FRAME_TABLE_HEADER: [&str; 11] = [
    "frame", "time", "F", "x", "y", "theta", "phi", "x'", "x''", "theta'", "theta''",
];

/// One captured tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Force applied on that tick.
    pub force: f64,
    /// Cart state after the tick.
    pub state: CartState,
    /// Camera at capture time.
    pub camera: CameraPose,
}

impl Frame {
    fn table_row(&self, index: usize, time: f64) -> Vec<String> {
        let s = &self.state;
        std::iter::once(index.to_string())
            .chain(
                [time, self.force, s.x, s.y, s.theta, s.phi, s.dx, s.ddx, s.dtheta, s.ddtheta]
                    .iter()
                    .map(|v| format!("{v:.6}")),
            )
            .collect()
    }
}

/// Observable state of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Appending a frame on every tick.
    Capturing,
    /// Capture ended; the export starts on the next step.
    Stopped,
    /// Rendering one captured frame per step.
    Processing,
    /// Done or cancelled; the owner should discard the recording.
    Finished,
}

/// What a call to [`Recording::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// A frame was appended.
    Captured,
    /// The output directory and frame table were written.
    ExportStarted {
        /// The new recording directory.
        directory: PathBuf,
    },
    /// The frame with this 1-based index was saved.
    FrameExported(usize),
    /// Nothing is left to do.
    Finished,
}

/// An error that abandons the export of a recording.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// No output directory could be created.
    #[error("cannot create recording directory '{}': {source}", path.display())]
    CreateDirectory {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The frame table could not be written.
    #[error("frame table error: {0}")]
    FrameTable(#[from] csv::Error),
    /// Any other file-system failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The offline surface failed.
    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

/// Everything the export needs from the live simulation.
pub struct Exporter<'a> {
    /// The scenery painted behind every frame.
    pub scenery: Scenery<'a>,
    /// Physical constants of the recorded cart.
    pub cart: &'a CartParameters,
    /// Creates the offline surface.
    pub surfaces: &'a dyn SurfaceFactory,
    /// Directory the numbered recording directories are created in.
    pub output_root: &'a Path,
    /// Size of the exported images in pixels.
    pub frame_size: (u32, u32),
}

/// Resources that only exist while exporting.
struct ExportJob {
    directory: PathBuf,
    surface: Box<dyn RenderSurface>,
    cart: Cart,
}

enum Phase {
    Capturing,
    Stopped,
    Processing(ExportJob),
    Finished,
}

/// A capture-then-export state machine.
pub struct Recording {
    frames: Vec<Frame>,
    phase: Phase,
    fps: f64,
    time: f64,
    saved_frames: usize,
    name: String,
    directory: Option<PathBuf>,
}

impl Recording {
    /// Starts capturing. `fps` is the tick frequency, used for the time column.
    pub fn new(fps: f64) -> Self {
        Self {
            frames: Vec::new(),
            phase: Phase::Capturing,
            fps,
            time: 0.0,
            saved_frames: 0,
            name: String::new(),
            directory: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> RecordingState {
        match self.phase {
            Phase::Capturing => RecordingState::Capturing,
            Phase::Stopped => RecordingState::Stopped,
            Phase::Processing(_) => RecordingState::Processing,
            Phase::Finished => RecordingState::Finished,
        }
    }

    /// Number of captured frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of images written so far.
    pub fn saved_frames(&self) -> usize {
        self.saved_frames
    }

    /// Simulated time spent capturing, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Adds simulated time. Only counted while capturing.
    pub fn add_time(&mut self, dt: f64) {
        if matches!(self.phase, Phase::Capturing) {
            self.time += dt;
        }
    }

    /// Display name ("recording N"), known once the export has started.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The output directory, known once the export has started.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Ends the capture. Has no effect in any other state.
    pub fn stop(&mut self) {
        if matches!(self.phase, Phase::Capturing) {
            log::info!("Recording stopped after {} frames", self.frames.len());
            self.phase = Phase::Stopped;
        }
    }

    /// Abandons whatever is left and finishes, releasing the export resources.
    pub fn cancel(&mut self) {
        if !matches!(self.phase, Phase::Finished) {
            log::info!(
                "Recording cancelled ({} of {} frames exported)",
                self.saved_frames,
                self.frames.len()
            );
            self.phase = Phase::Finished;
        }
    }

    /// Advances the state machine by one tick.
    ///
    /// `snapshot` is appended while capturing and ignored otherwise. On error the
    /// recording is already [`RecordingState::Finished`].
    pub fn step(
        &mut self,
        snapshot: Frame,
        exporter: &Exporter<'_>,
    ) -> Result<RecordingEvent, RecordingError> {
        let result = match self.phase {
            Phase::Capturing => {
                self.frames.push(snapshot);
                Ok(RecordingEvent::Captured)
            }
            Phase::Stopped => self.begin_export(exporter),
            Phase::Processing(_) => self.export_next(exporter),
            Phase::Finished => Ok(RecordingEvent::Finished),
        };
        if result.is_err() {
            self.phase = Phase::Finished;
        }
        result
    }

    fn begin_export(&mut self, exporter: &Exporter<'_>) -> Result<RecordingEvent, RecordingError> {
        let (directory, number) = create_numbered_directory(exporter.output_root)?;
        self.name = format!("recording {number}");
        self.directory = Some(directory.clone());
        log::info!("Exporting {} frames to '{}'", self.frames.len(), directory.display());

        self.write_frame_table(&directory.join(FRAME_TABLE))?;

        let (width, height) = exporter.frame_size;
        let surface = exporter.surfaces.create(width, height)?;
        self.saved_frames = 0;
        self.phase = Phase::Processing(ExportJob {
            directory: directory.clone(),
            surface,
            cart: Cart::new(*exporter.cart),
        });
        Ok(RecordingEvent::ExportStarted { directory })
    }

    fn export_next(&mut self, exporter: &Exporter<'_>) -> Result<RecordingEvent, RecordingError> {
        let Phase::Processing(job) = &mut self.phase else {
            return Ok(RecordingEvent::Finished);
        };
        let Some(frame) = self.frames.get(self.saved_frames) else {
            log::info!("'{}' exported ({} frames)", self.name, self.saved_frames);
            self.phase = Phase::Finished;
            return Ok(RecordingEvent::Finished);
        };

        job.cart.state = frame.state;
        let surface = job.surface.as_mut();
        surface.set_camera(frame.camera);
        surface.begin_draw();
        exporter.scenery.paint(surface);
        paint_cart(surface, &job.cart.state, job.cart.params());
        surface.end_draw();

        let index = self.saved_frames + 1;
        surface.save_to_file(&job.directory.join(format!("frame{index}.png")))?;
        self.saved_frames = index;
        log::trace!("Exported frame {index}/{}", self.frames.len());
        Ok(RecordingEvent::FrameExported(index))
    }

    fn write_frame_table(&self, path: &Path) -> Result<(), RecordingError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(path)?;
        writer.write_record(FRAME_TABLE_HEADER)?;
        let dt = if self.fps > 0.0 { 1.0 / self.fps } else { 0.0 };
        for (i, frame) in self.frames.iter().enumerate() {
            writer.write_record(frame.table_row(i + 1, i as f64 * dt))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Recording {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recording")
            .field("state", &self.state())
            .field("frames", &self.frames.len())
            .field("saved_frames", &self.saved_frames)
            .field("time", &self.time)
            .field("name", &self.name)
            .finish()
    }
}

/// Creates `root/recordingN` for the smallest free `N >= 1`.
fn create_numbered_directory(root: &Path) -> Result<(PathBuf, u32), RecordingError> {
    fs::create_dir_all(root).map_err(|source| RecordingError::CreateDirectory {
        path: root.to_path_buf(),
        source,
    })?;
    let mut number = 1;
    loop {
        let path = root.join(format!("recording{number}"));
        match fs::create_dir(&path) {
            Ok(()) => return Ok((path, number)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && number < u32::MAX => number += 1,
            Err(source) => return Err(RecordingError::CreateDirectory { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartpole_core::config::SimulatorConfig;
    use cartpole_core::terrain::Terrain;
    use cartpole_infra::ImageSurfaceFactory;

    fn frame(x: f64) -> Frame {
        Frame {
            force: 2.5,
            state: CartState {
                x,
                ..CartState::default()
            },
            camera: CameraPose::default(),
        }
    }

    #[test]
    fn table_row_uses_six_decimals() {
        let row = frame(-1.0 / 3.0).table_row(4, 0.06);
        assert_eq!(row.len(), FRAME_TABLE_HEADER.len());
        assert_eq!(row[0], "4");
        assert_eq!(row[1], "0.060000");
        assert_eq!(row[2], "2.500000");
        assert_eq!(row[3], "-0.333333");
    }

    #[test]
    fn only_capturing_accepts_frames_and_time() {
        let root = tempfile::tempdir().unwrap();
        let terrain = Terrain::flat();
        let params = CartParameters::from(&SimulatorConfig::default());
        let factory = ImageSurfaceFactory::default();
        let exporter = Exporter {
            scenery: Scenery::new(&terrain, &[]),
            cart: &params,
            surfaces: &factory,
            output_root: root.path(),
            frame_size: (32, 18),
        };

        let mut recording = Recording::new(50.0);
        assert_eq!(recording.step(frame(0.0), &exporter).unwrap(), RecordingEvent::Captured);
        recording.add_time(0.02);
        recording.stop();
        recording.add_time(0.02);
        assert_eq!(recording.state(), RecordingState::Stopped);
        assert_eq!(recording.time(), 0.02);

        // The first step after stopping starts the export and drops its snapshot.
        let event = recording.step(frame(1.0), &exporter).unwrap();
        assert!(matches!(event, RecordingEvent::ExportStarted { .. }));
        assert_eq!(recording.frame_count(), 1);
    }

    #[test]
    fn cancel_is_final() {
        let mut recording = Recording::new(50.0);
        recording.cancel();
        recording.stop();
        assert_eq!(recording.state(), RecordingState::Finished);
    }

    #[test]
    fn directories_are_numbered_from_one() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("recording1")).unwrap();
        let (path, number) = create_numbered_directory(root.path()).unwrap();
        assert_eq!(number, 2);
        assert_eq!(path, root.path().join("recording2"));
        assert!(path.is_dir());
    }

    #[test]
    fn unwritable_root_abandons_the_export() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();

        let terrain = Terrain::flat();
        let params = CartParameters::from(&SimulatorConfig::default());
        let factory = ImageSurfaceFactory::default();
        let exporter = Exporter {
            scenery: Scenery::new(&terrain, &[]),
            cart: &params,
            surfaces: &factory,
            output_root: &blocker,
            frame_size: (32, 18),
        };

        let mut recording = Recording::new(50.0);
        recording.step(frame(0.0), &exporter).unwrap();
        recording.stop();
        let err = recording.step(frame(0.0), &exporter).unwrap_err();
        assert!(matches!(err, RecordingError::CreateDirectory { .. }));
        assert_eq!(recording.state(), RecordingState::Finished);
    }
}
