//! Clip state around one audio output
//!
//! A [`Clip`] owns exactly one [`AudioOutput`] and keeps the playing/looping
//! flags consistent with the calls made on it. It does not guard against
//! re-entrant `play`; that is the registry's job.

use crate::output::AudioOutput;
use std::fmt;
use std::time::Duration;

/// Identifier of a clip, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(u64);

impl ClipId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        ClipId(raw)
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip#{}", self.0)
    }
}

/// One playable sound with play/stop/reset semantics.
pub struct Clip {
    id: ClipId,
    resource: String,
    output: Box<dyn AudioOutput>,
    playing: bool,
    looping: bool,
}

impl Clip {
    /// Wrap an already opened output.
    pub fn new(id: ClipId, resource: impl Into<String>, output: Box<dyn AudioOutput>) -> Self {
        Clip {
            id,
            resource: resource.into(),
            output,
            playing: false,
            looping: false,
        }
    }

    /// Start output from the current position.
    ///
    /// Calling this while already playing resumes from wherever the output
    /// is; the position is not rewound.
    pub fn play(&mut self, looping: bool) {
        self.playing = true;
        self.looping = looping;
        self.output.set_looping(looping);
        self.output.play();
    }

    /// Pause output, keeping the position.
    pub fn stop(&mut self) {
        self.playing = false;
        self.output.pause();
    }

    /// Pause output, disable looping and rewind to the start.
    pub fn reset(&mut self) {
        self.playing = false;
        self.output.pause();
        self.looping = false;
        self.output.set_looping(false);
        self.output.seek(Duration::ZERO);
    }

    /// Apply a natural-end notice for the session started in `epoch`.
    ///
    /// Returns `false` when the notice is stale (the output has started a new
    /// session since) and was ignored. A notice arriving after `stop` or
    /// `reset` is accepted and leaves the clip stopped.
    pub fn natural_end(&mut self, epoch: u64) -> bool {
        if epoch != self.output.epoch() {
            return false;
        }
        self.playing = false;
        true
    }

    /// Whether playback was started and has not been stopped, reset or ended since.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Loop flag of the last `play` call (cleared by `reset`).
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Current playback position reported by the output.
    pub fn position(&self) -> Duration {
        self.output.position()
    }

    /// Set output volume (0.0 to 1.0).
    pub fn set_volume(&mut self, volume: f32) {
        self.output.set_volume(volume.clamp(0.0, 1.0));
    }

    /// Resource path the clip was registered with.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Clip identifier.
    pub fn id(&self) -> ClipId {
        self.id
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .field("playing", &self.playing)
            .field("looping", &self.looping)
            .finish()
    }
}
