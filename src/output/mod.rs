//! Audio output boundary
//!
//! Decoding and sending samples to a device is the host's business; clips
//! only drive an [`AudioOutput`] through play/pause/loop/seek and listen for
//! the natural end of a session. Outputs are created by an
//! [`OutputBackend`], one per registered clip.
//!
//! Two backends ship with the crate:
//! - [`VirtualBackend`]: a headless, manually clocked deck (tests, servers)
//! - `RodioBackend` (feature `device`): the system audio device via rodio

use crate::events::EndedNotifier;
use std::time::Duration;

#[cfg(feature = "device")]
mod rodio_device;
mod virtual_deck;

#[cfg(feature = "device")]
pub use rodio_device::{RodioBackend, RodioOutput};
pub use virtual_deck::{VirtualBackend, VirtualOutput};

/// One playable audio stream.
///
/// # Epochs
///
/// An output counts playback sessions. A session starts when `play` is
/// called on an output that is idle (never started, finished, or rewound by
/// `seek(Duration::ZERO)` while paused) and ends when the stream runs out.
/// Natural-end notices carry the epoch they belong to, so notices from an
/// earlier session can be told apart from the current one.
pub trait AudioOutput {
    /// Start or resume output from the current position.
    ///
    /// Load and decode failures are reported through the [`EndedNotifier`]
    /// given at open time, never returned here.
    fn play(&mut self);

    /// Pause output, keeping the position.
    fn pause(&mut self);

    /// Enable or disable looping of the stream.
    fn set_looping(&mut self, looping: bool);

    /// Whether the stream loops.
    fn is_looping(&self) -> bool;

    /// Current playback position.
    fn position(&self) -> Duration;

    /// Move the playback position.
    fn seek(&mut self, position: Duration);

    /// Set output volume (0.0 to 1.0).
    fn set_volume(&mut self, volume: f32);

    /// Epoch of the current (or most recent) playback session.
    fn epoch(&self) -> u64;
}

/// Factory for [`AudioOutput`]s.
pub trait OutputBackend {
    /// Open an output for `resource`.
    ///
    /// No validation happens here: an unreadable resource surfaces later as
    /// a failure notice when the output is first played.
    fn open(&self, resource: &str, notifier: EndedNotifier) -> Box<dyn AudioOutput>;
}

impl<B: OutputBackend + ?Sized> OutputBackend for &B {
    fn open(&self, resource: &str, notifier: EndedNotifier) -> Box<dyn AudioOutput> {
        (**self).open(resource, notifier)
    }
}
