//! Event sources and the playback mailbox
//!
//! Everything that changes a clip's state from "outside" (a UI event firing,
//! an audio output reaching the end of a clip, an output failing to load)
//! is turned into a [`PlaybackMessage`] and posted to the registry's
//! [`Mailbox`]. The registry applies them in FIFO order when its owner calls
//! `pump`, which mirrors how callbacks are queued on a UI event loop.

use crate::clip::ClipId;
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

/// Callback installed on an [`EventSource`].
pub type Listener = Box<dyn FnMut()>;

/// Anything that can raise named events and accept listeners for them.
///
/// A UI element, a game controller or the bundled [`EventEmitter`] all fit;
/// the registry only needs the ability to subscribe.
pub trait EventSource {
    /// Install `listener` to be invoked every time `event_name` fires.
    fn add_event_listener(&mut self, event_name: &str, listener: Listener);
}

/// Simple in-process emitter of named events.
///
/// Listeners run synchronously inside [`EventEmitter::emit`], in the order
/// they were added.
#[derive(Default)]
pub struct EventEmitter {
    listeners: HashMap<String, Vec<Listener>>,
}

impl EventEmitter {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `event_name`, returning how many listeners were invoked.
    pub fn emit(&mut self, event_name: &str) -> usize {
        match self.listeners.get_mut(event_name) {
            Some(listeners) => {
                for listener in listeners.iter_mut() {
                    listener();
                }
                listeners.len()
            }
            None => 0,
        }
    }

    /// Number of listeners subscribed to `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners.get(event_name).map_or(0, Vec::len)
    }
}

impl EventSource for EventEmitter {
    fn add_event_listener(&mut self, event_name: &str, listener: Listener) {
        self.listeners
            .entry(event_name.to_string())
            .or_default()
            .push(listener);
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .listeners
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventEmitter")
            .field("listeners", &counts)
            .finish()
    }
}

/// A queued state change for the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackMessage {
    /// A subscribed event fired.
    Trigger {
        /// Event name as registered
        event: String,
    },
    /// An output reached the end of a non-looping clip.
    Ended {
        /// Clip whose output finished
        clip: ClipId,
        /// Output epoch the finished session belonged to
        epoch: u64,
    },
    /// An output could not load or decode its resource.
    Failed {
        /// Clip whose output failed
        clip: ClipId,
        /// Human-readable failure reason
        reason: String,
    },
}

/// FIFO queue of [`PlaybackMessage`]s.
///
/// The sending half is `Send`, so audio threads can post natural-end notices;
/// the receiving half stays with the registry on the UI thread.
pub struct Mailbox {
    tx: Sender<PlaybackMessage>,
    rx: Receiver<PlaybackMessage>,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Clone a sender for listeners and notifiers.
    pub fn sender(&self) -> Sender<PlaybackMessage> {
        self.tx.clone()
    }

    /// Queue a message.
    pub fn post(&self, message: PlaybackMessage) {
        // The receiver lives in `self`, so the send cannot fail here.
        let _ = self.tx.send(message);
    }

    /// Take every message queued so far, oldest first.
    pub fn drain(&self) -> Vec<PlaybackMessage> {
        self.rx.try_iter().collect()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").finish_non_exhaustive()
    }
}

/// The `ended` subscription handed to an output when it is opened.
///
/// Outputs call [`EndedNotifier::ended`] when a non-looping session runs out
/// and [`EndedNotifier::failed`] when their resource cannot be played. Both
/// are fire-and-forget: if the registry is gone the notice is dropped.
#[derive(Clone, Debug)]
pub struct EndedNotifier {
    clip: ClipId,
    tx: Sender<PlaybackMessage>,
}

impl EndedNotifier {
    /// Create a notifier posting on behalf of `clip`.
    pub fn new(clip: ClipId, tx: Sender<PlaybackMessage>) -> Self {
        Self { clip, tx }
    }

    /// Clip this notifier reports for.
    pub fn clip(&self) -> ClipId {
        self.clip
    }

    /// Report the natural end of the session started in `epoch`.
    pub fn ended(&self, epoch: u64) {
        let _ = self.tx.send(PlaybackMessage::Ended {
            clip: self.clip,
            epoch,
        });
    }

    /// Report a load/decode failure.
    pub fn failed(&self, reason: impl Into<String>) {
        let _ = self.tx.send(PlaybackMessage::Failed {
            clip: self.clip,
            reason: reason.into(),
        });
    }
}

/// Build the listener that forwards `event_name` into the mailbox.
pub(crate) fn trigger_listener(event_name: &str, tx: Sender<PlaybackMessage>) -> Listener {
    let event = event_name.to_string();
    Box::new(move || {
        let _ = tx.send(PlaybackMessage::Trigger {
            event: event.clone(),
        });
    })
}
