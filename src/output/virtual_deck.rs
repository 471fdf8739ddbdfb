//! Headless output deck with a manual clock
//!
//! Every output opened from a [`VirtualBackend`] is a track on a shared
//! deck. Nothing is decoded; tracks have a nominal length and only move when
//! [`VirtualBackend::advance`] is called. Reaching the end of a non-looping
//! track posts a natural-end notice exactly like a real device would.

use super::{AudioOutput, OutputBackend};
use crate::events::EndedNotifier;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct Track {
    resource: String,
    length: Duration,
    position: Duration,
    running: bool,
    looping: bool,
    /// A session was started and has not ended or been rewound.
    in_session: bool,
    epoch: u64,
    volume: f32,
    released: bool,
    notifier: EndedNotifier,
}

struct DeckState {
    default_length: Duration,
    lengths: HashMap<String, Duration>,
    failures: HashMap<String, String>,
    tracks: Vec<Track>,
    /// Resource of every session start, in order.
    started: Vec<String>,
}

/// Manually clocked, shareable output backend.
///
/// Clones share the same deck, so a test can keep one handle while the
/// registry owns another.
#[derive(Clone)]
pub struct VirtualBackend {
    deck: Arc<Mutex<DeckState>>,
}

impl VirtualBackend {
    /// Create a deck where every resource is `default_length` long.
    pub fn new(default_length: Duration) -> Self {
        VirtualBackend {
            deck: Arc::new(Mutex::new(DeckState {
                default_length,
                lengths: HashMap::new(),
                failures: HashMap::new(),
                tracks: Vec::new(),
                started: Vec::new(),
            })),
        }
    }

    /// Override the length of one resource (applies to outputs opened afterwards).
    pub fn set_length(&self, resource: impl Into<String>, length: Duration) {
        self.deck.lock().lengths.insert(resource.into(), length);
    }

    /// Make every output of `resource` fail with `reason` when played.
    pub fn fail_resource(&self, resource: impl Into<String>, reason: impl Into<String>) {
        self.deck
            .lock()
            .failures
            .insert(resource.into(), reason.into());
    }

    /// Move the clock forward for every running track.
    ///
    /// Non-looping tracks that reach their end stop there and post a
    /// natural-end notice; looping tracks wrap around.
    pub fn advance(&self, elapsed: Duration) {
        let mut deck = self.deck.lock();
        for track in deck.tracks.iter_mut().filter(|t| t.running) {
            let position = track.position + elapsed;
            if position < track.length {
                track.position = position;
            } else if track.looping && !track.length.is_zero() {
                let wrapped = position.as_nanos() % track.length.as_nanos();
                track.position = Duration::from_nanos(wrapped as u64);
            } else {
                track.position = track.length;
                track.running = false;
                track.in_session = false;
                track.notifier.ended(track.epoch);
            }
        }
    }

    /// Whether any live output of `resource` is currently producing sound.
    pub fn is_running(&self, resource: &str) -> bool {
        self.deck
            .lock()
            .tracks
            .iter()
            .any(|t| !t.released && t.running && t.resource == resource)
    }

    /// Number of outputs currently producing sound.
    pub fn running_count(&self) -> usize {
        self.deck.lock().tracks.iter().filter(|t| t.running).count()
    }

    /// Resources of every session started so far, oldest first.
    pub fn started(&self) -> Vec<String> {
        self.deck.lock().started.clone()
    }

    /// Number of sessions started for `resource`.
    pub fn session_count(&self, resource: &str) -> usize {
        self.deck
            .lock()
            .started
            .iter()
            .filter(|r| r.as_str() == resource)
            .count()
    }

    /// Number of outputs ever opened on this deck.
    pub fn opened_count(&self) -> usize {
        self.deck.lock().tracks.len()
    }

    /// Volume of the most recently opened live output of `resource`.
    pub fn volume_of(&self, resource: &str) -> Option<f32> {
        self.deck
            .lock()
            .tracks
            .iter()
            .rev()
            .find(|t| !t.released && t.resource == resource)
            .map(|t| t.volume)
    }
}

impl OutputBackend for VirtualBackend {
    fn open(&self, resource: &str, notifier: EndedNotifier) -> Box<dyn AudioOutput> {
        let mut deck = self.deck.lock();
        let length = deck
            .lengths
            .get(resource)
            .copied()
            .unwrap_or(deck.default_length);
        deck.tracks.push(Track {
            resource: resource.to_string(),
            length,
            position: Duration::ZERO,
            running: false,
            looping: false,
            in_session: false,
            epoch: 0,
            volume: 1.0,
            released: false,
            notifier,
        });
        let index = deck.tracks.len() - 1;
        drop(deck);

        Box::new(VirtualOutput {
            deck: Arc::clone(&self.deck),
            index,
        })
    }
}

/// One track on a [`VirtualBackend`] deck.
pub struct VirtualOutput {
    deck: Arc<Mutex<DeckState>>,
    index: usize,
}

impl VirtualOutput {
    fn with_track<R>(&self, f: impl FnOnce(&mut Track) -> R) -> R {
        let mut deck = self.deck.lock();
        f(&mut deck.tracks[self.index])
    }
}

impl AudioOutput for VirtualOutput {
    fn play(&mut self) {
        let mut deck = self.deck.lock();
        let deck = &mut *deck;
        let track = &mut deck.tracks[self.index];

        if let Some(reason) = deck.failures.get(&track.resource) {
            track.notifier.failed(reason.clone());
            return;
        }
        if track.running {
            return;
        }
        if !track.in_session {
            if track.position >= track.length {
                track.position = Duration::ZERO;
            }
            track.in_session = true;
            track.epoch += 1;
            deck.started.push(track.resource.clone());
        }
        track.running = true;
    }

    fn pause(&mut self) {
        self.with_track(|t| t.running = false);
    }

    fn set_looping(&mut self, looping: bool) {
        self.with_track(|t| t.looping = looping);
    }

    fn is_looping(&self) -> bool {
        self.with_track(|t| t.looping)
    }

    fn position(&self) -> Duration {
        self.with_track(|t| t.position)
    }

    fn seek(&mut self, position: Duration) {
        self.with_track(|t| {
            t.position = position.min(t.length);
            if position.is_zero() && !t.running {
                t.in_session = false;
            }
        });
    }

    fn set_volume(&mut self, volume: f32) {
        self.with_track(|t| t.volume = volume);
    }

    fn epoch(&self) -> u64 {
        self.with_track(|t| t.epoch)
    }
}

impl Drop for VirtualOutput {
    fn drop(&mut self) {
        self.with_track(|t| {
            t.running = false;
            t.released = true;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipId;
    use crate::events::{Mailbox, PlaybackMessage};

    fn open(deck: &VirtualBackend, mailbox: &Mailbox, resource: &str) -> Box<dyn AudioOutput> {
        deck.open(resource, EndedNotifier::new(ClipId::new(9), mailbox.sender()))
    }

    #[test]
    fn test_track_ends_and_notifies() {
        let deck = VirtualBackend::new(Duration::from_secs(1));
        let mailbox = Mailbox::new();
        let mut output = open(&deck, &mailbox, "check.ogg");

        output.play();
        assert_eq!(output.epoch(), 1);
        deck.advance(Duration::from_millis(400));
        assert!(mailbox.drain().is_empty());

        deck.advance(Duration::from_millis(600));
        assert_eq!(
            mailbox.drain(),
            vec![PlaybackMessage::Ended {
                clip: ClipId::new(9),
                epoch: 1
            }]
        );
        assert!(!deck.is_running("check.ogg"));
        assert_eq!(output.position(), Duration::from_secs(1));
    }

    #[test]
    fn test_looping_track_wraps() {
        let deck = VirtualBackend::new(Duration::from_secs(1));
        let mailbox = Mailbox::new();
        let mut output = open(&deck, &mailbox, "theme.ogg");

        output.set_looping(true);
        output.play();
        deck.advance(Duration::from_millis(2_250));

        assert!(mailbox.drain().is_empty());
        assert!(deck.is_running("theme.ogg"));
        assert_eq!(output.position(), Duration::from_millis(250));
    }

    #[test]
    fn test_play_after_end_starts_new_session_from_zero() {
        let deck = VirtualBackend::new(Duration::from_millis(500));
        let mailbox = Mailbox::new();
        let mut output = open(&deck, &mailbox, "move.ogg");

        output.play();
        deck.advance(Duration::from_secs(1));
        output.play();

        assert_eq!(output.epoch(), 2);
        assert_eq!(output.position(), Duration::ZERO);
        assert_eq!(deck.session_count("move.ogg"), 2);
    }

    #[test]
    fn test_resume_keeps_session() {
        let deck = VirtualBackend::new(Duration::from_secs(1));
        let mailbox = Mailbox::new();
        let mut output = open(&deck, &mailbox, "move.ogg");

        output.play();
        deck.advance(Duration::from_millis(100));
        output.pause();
        output.play();

        assert_eq!(output.epoch(), 1);
        assert_eq!(deck.started(), vec!["move.ogg".to_string()]);
    }

    #[test]
    fn test_failing_resource_reports_and_stays_silent() {
        let deck = VirtualBackend::new(Duration::from_secs(1));
        deck.fail_resource("missing.ogg", "file not found");
        let mailbox = Mailbox::new();
        let mut output = open(&deck, &mailbox, "missing.ogg");

        output.play();

        assert!(!deck.is_running("missing.ogg"));
        assert_eq!(
            mailbox.drain(),
            vec![PlaybackMessage::Failed {
                clip: ClipId::new(9),
                reason: "file not found".into()
            }]
        );
    }

    #[test]
    fn test_dropping_output_silences_track() {
        let deck = VirtualBackend::new(Duration::from_secs(1));
        let mailbox = Mailbox::new();
        let mut output = open(&deck, &mailbox, "move.ogg");

        output.play();
        assert_eq!(deck.running_count(), 1);
        drop(output);
        assert_eq!(deck.running_count(), 0);
        assert_eq!(deck.opened_count(), 1);
    }

    #[test]
    fn test_per_resource_length_overrides_default() {
        let deck = VirtualBackend::new(Duration::from_secs(1));
        deck.set_length("move.ogg", Duration::from_millis(300));
        let mailbox = Mailbox::new();
        let mut short = deck.open("move.ogg", EndedNotifier::new(ClipId::new(1), mailbox.sender()));
        let mut long = deck.open("theme.ogg", EndedNotifier::new(ClipId::new(2), mailbox.sender()));

        short.play();
        long.play();
        deck.advance(Duration::from_millis(500));

        assert_eq!(
            mailbox.drain(),
            vec![PlaybackMessage::Ended {
                clip: ClipId::new(1),
                epoch: 1
            }]
        );
        assert!(!deck.is_running("move.ogg"));
        assert!(deck.is_running("theme.ogg"));
        assert_eq!(short.position(), Duration::from_millis(300));
        assert_eq!(long.position(), Duration::from_millis(500));
    }
}
