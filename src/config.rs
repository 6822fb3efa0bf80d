use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Upper bound for any single blocking wait; this is the shutdown latency.
pub const MAX_WAIT_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: PathBuf,
    /// First-level subfolders to restrict discovery to; empty scans everything.
    pub folder_filter: Vec<String>,
    /// JSON file recording which images were already shown.
    pub visited_db_path: PathBuf,
    /// Time an image stays on screen before the slideshow advances.
    #[serde(with = "humantime_serde")]
    pub dwell: Duration,
    /// Whether next/previous/pause requests from the input surface are honoured.
    pub enable_input: bool,
    /// Preloading and navigation tuning.
    pub preload: PreloadOptions,
    /// Which caption elements the renderer should draw.
    pub overlay: OverlayOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_path.as_os_str().is_empty(),
            "photo-library-path must be set"
        );
        ensure!(self.dwell > Duration::ZERO, "dwell must be greater than zero");
        ensure!(
            !self.visited_db_path.as_os_str().is_empty(),
            "visited-db-path must not be empty"
        );
        self.preload.validate()?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::new(),
            folder_filter: Vec::new(),
            visited_db_path: PathBuf::from("db.json"),
            dwell: Duration::from_secs(30),
            enable_input: true,
            preload: PreloadOptions::default(),
            overlay: OverlayOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PreloadOptions {
    /// Maximum number of decoded frames held in memory.
    pub buffer_capacity: usize,
    /// Frames that must be buffered before the first image is shown.
    pub initial_ready: usize,
    /// Frames dropped from the head when browsing forward past the window.
    pub trim_chunk: usize,
    /// Longest single blocking wait; bounds how long shutdown takes to be noticed.
    #[serde(with = "humantime_serde")]
    pub wait_slice: Duration,
    /// How long "next" at the newest frame waits for the preloader.
    #[serde(with = "humantime_serde")]
    pub next_frame_wait: Duration,
    /// Pause before sampling again when no unvisited image is available.
    #[serde(with = "humantime_serde")]
    pub exhaustion_backoff: Duration,
    /// Optional deterministic seed for the preloader's sampling RNG.
    pub seed: Option<u64>,
    /// Drop visited entries that no longer exist in the catalog at startup.
    pub prune_stale_visited: bool,
}

impl PreloadOptions {
    const fn default_buffer_capacity() -> usize {
        10
    }

    const fn default_initial_ready() -> usize {
        5
    }

    const fn default_trim_chunk() -> usize {
        5
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(
            self.buffer_capacity >= 2,
            "preload.buffer-capacity must be at least 2"
        );
        ensure!(
            (1..=self.buffer_capacity).contains(&self.initial_ready),
            "preload.initial-ready must be between 1 and buffer-capacity"
        );
        ensure!(
            (1..self.buffer_capacity).contains(&self.trim_chunk),
            "preload.trim-chunk must be at least 1 and below buffer-capacity"
        );
        ensure!(
            self.wait_slice > Duration::ZERO && self.wait_slice <= MAX_WAIT_SLICE,
            "preload.wait-slice must be positive and at most {}",
            humantime::format_duration(MAX_WAIT_SLICE)
        );
        ensure!(
            self.next_frame_wait > Duration::ZERO,
            "preload.next-frame-wait must be positive"
        );
        ensure!(
            self.exhaustion_backoff > Duration::ZERO,
            "preload.exhaustion-backoff must be positive"
        );
        Ok(())
    }
}

impl Default for PreloadOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: Self::default_buffer_capacity(),
            initial_ready: Self::default_initial_ready(),
            trim_chunk: Self::default_trim_chunk(),
            wait_slice: MAX_WAIT_SLICE,
            next_frame_wait: Duration::from_millis(100),
            exhaustion_backoff: Duration::from_millis(500),
            seed: None,
            prune_stale_visited: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OverlayOptions {
    pub show_date: bool,
    pub show_image_count: bool,
    pub show_folder_name: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            show_date: true,
            show_image_count: true,
            show_folder_name: true,
        }
    }
}
