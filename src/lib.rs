//! Client-side support for the chessy chess UI
//!
//! The core of this crate is a sound cue registry: application events such
//! as `"move"`, `"check"` or `"victory"` are bound to audio clips, and firing
//! an event plays its clip unless that clip is already playing. Each event
//! therefore has at most one playback session at a time.
//!
//! # Features
//! - Strongly-typed event name → [`Clip`] registry with last-registration-wins
//! - Pluggable audio output through the [`AudioOutput`] / [`OutputBackend`] traits
//! - Single-threaded message pump: event triggers and natural-end notices are
//!   applied in FIFO order when the owner calls [`PlaybackRegistry::pump`]
//! - JSON sound banks ([`SoundBank`]) for registering a whole set of cues at once
//! - Regex-backed form-field validation ([`FormField`])
//!
//! # Crate feature flags
//! - `device` (opt-in): playback through the system audio device (enables optional `rodio` dep)
//!
//! # Quick start
//! ```
//! use chessy_client::{EventEmitter, PlaybackRegistry, VirtualBackend};
//! use std::time::Duration;
//!
//! let deck = VirtualBackend::new(Duration::from_millis(400));
//! let mut sounds = PlaybackRegistry::new(deck.clone());
//! let mut board = EventEmitter::new();
//!
//! sounds.register_on_event(&mut board, "move", "sounds/move.ogg");
//!
//! board.emit("move");
//! sounds.pump();
//! assert!(sounds.is_playing("move"));
//!
//! deck.advance(Duration::from_millis(500));
//! sounds.pump();
//! assert!(!sounds.is_playing("move"));
//! ```
//!
//! ## Real audio output
//! ```no_run
//! # #[cfg(feature = "device")]
//! # {
//! use chessy_client::{PlaybackRegistry, RodioBackend, SoundBank};
//!
//! let bank = SoundBank::load("sounds/bank.json").unwrap();
//! let mut sounds = PlaybackRegistry::new(RodioBackend::new().unwrap());
//! sounds.load_bank(&bank);
//! sounds.dispatch("move", false).unwrap();
//! # }
//! ```

#![warn(missing_docs)]

pub mod clip; // Clip state around one audio output
pub mod config; // Sound bank configuration
pub mod events; // Event sources and the playback mailbox
pub mod field; // Form-field validation
pub mod output; // Audio output boundary
pub mod registry; // Event name → clip registry

/// Error types for sound cue and form-field operations
#[derive(thiserror::Error, Debug)]
pub enum SoundError {
    /// Dispatch for an event name that was never registered
    #[error("No sound registered for event '{0}'")]
    UnregisteredEvent(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Audio resource could not be read or decoded
    #[error("Failed to load sound '{path}': {reason}")]
    ResourceLoad {
        /// Resource path as registered
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// Invalid sound bank configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Form-field pattern failed to compile
    #[error("Invalid field pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sound bank JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl SoundError {
    /// Creates a resource load error with path and reason
    pub fn resource_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SoundError::ResourceLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<String> for SoundError {
    /// Converts a String into `SoundError::Other`.
    ///
    /// Prefer the specific variants (`Config`, `AudioDevice`, `ResourceLoad`)
    /// where the failure has a known category.
    fn from(msg: String) -> Self {
        SoundError::Other(msg)
    }
}

impl From<&str> for SoundError {
    /// Converts a string slice into `SoundError::Other`.
    fn from(msg: &str) -> Self {
        SoundError::Other(msg.to_string())
    }
}

/// Result type for sound cue operations
pub type Result<T> = std::result::Result<T, SoundError>;

// Public API exports
pub use clip::{Clip, ClipId};
pub use config::{SoundBank, SoundBinding};
pub use events::{EndedNotifier, EventEmitter, EventSource, Listener, Mailbox, PlaybackMessage};
pub use field::FormField;
pub use output::{AudioOutput, OutputBackend, VirtualBackend, VirtualOutput};
pub use registry::{PlaybackRegistry, PumpReport};

#[cfg(feature = "device")]
pub use output::{RodioBackend, RodioOutput};
