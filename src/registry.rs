//! Event name → clip registry
//!
//! [`PlaybackRegistry`] binds application event names to [`Clip`]s and
//! enforces at most one playback session per event: dispatching an event
//! whose clip is still playing is silently dropped.
//!
//! Lookups are deliberately asymmetric. [`PlaybackRegistry::dispatch`] is
//! strict and reports unknown names, since its normal caller is the listener
//! installed at registration. [`PlaybackRegistry::stop`] and
//! [`PlaybackRegistry::reset`] are tolerant and ignore unknown names, since
//! they are called from arbitrary application code.

use crate::clip::{Clip, ClipId};
use crate::config::SoundBank;
use crate::events::{trigger_listener, EndedNotifier, EventSource, Mailbox, PlaybackMessage};
use crate::output::OutputBackend;
use crate::{Result, SoundError};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Summary of one [`PlaybackRegistry::pump`] call.
#[derive(Debug, Default)]
pub struct PumpReport {
    /// Triggers that started playback
    pub started: usize,
    /// Triggers dropped because the clip was already playing
    pub dropped: usize,
    /// Natural ends applied to clips
    pub ended: usize,
    /// Triggers for names with no binding
    pub unregistered: Vec<String>,
    /// Load/decode failures reported by outputs
    pub failures: Vec<SoundError>,
}

impl PumpReport {
    /// Whether the pump had nothing to do.
    pub fn is_empty(&self) -> bool {
        self.started == 0
            && self.dropped == 0
            && self.ended == 0
            && self.unregistered.is_empty()
            && self.failures.is_empty()
    }
}

/// Registry of sound cues keyed by event name.
pub struct PlaybackRegistry<B: OutputBackend> {
    backend: B,
    bindings: HashMap<String, Clip>,
    mailbox: Mailbox,
    next_id: u64,
    master_volume: f32,
}

impl<B: OutputBackend> PlaybackRegistry<B> {
    /// Create an empty registry opening outputs on `backend`.
    pub fn new(backend: B) -> Self {
        PlaybackRegistry {
            backend,
            bindings: HashMap::new(),
            mailbox: Mailbox::new(),
            next_id: 0,
            master_volume: 1.0,
        }
    }

    /// Bind `event_name` to a new clip for `resource_path`.
    ///
    /// Any previous binding for the name is replaced (and its clip dropped).
    /// The path is not validated; an unreadable resource is reported by
    /// [`pump`](Self::pump) once the clip is played.
    pub fn register(&mut self, event_name: &str, resource_path: &str) -> ClipId {
        let id = ClipId::new(self.next_id);
        self.next_id += 1;

        let notifier = EndedNotifier::new(id, self.mailbox.sender());
        let output = self.backend.open(resource_path, notifier);
        let mut clip = Clip::new(id, resource_path, output);
        clip.set_volume(self.master_volume);

        if let Some(previous) = self.bindings.insert(event_name.to_string(), clip) {
            tracing::debug!(
                event = event_name,
                previous = previous.resource(),
                resource = resource_path,
                "replacing sound binding"
            );
        } else {
            tracing::debug!(event = event_name, resource = resource_path, %id, "registered sound");
        }
        id
    }

    /// Bind `event_name` and subscribe to it on `source`.
    ///
    /// Every later occurrence of the event on `source` queues a trigger that
    /// the next [`pump`](Self::pump) turns into a [`dispatch`](Self::dispatch).
    pub fn register_on_event<S>(
        &mut self,
        source: &mut S,
        event_name: &str,
        resource_path: &str,
    ) -> ClipId
    where
        S: EventSource + ?Sized,
    {
        let id = self.register(event_name, resource_path);
        source.add_event_listener(event_name, trigger_listener(event_name, self.mailbox.sender()));
        id
    }

    /// Register every binding of `bank`, in file order.
    ///
    /// The bank's volume becomes the master volume first.
    pub fn load_bank(&mut self, bank: &SoundBank) {
        self.set_master_volume(bank.volume);
        for binding in &bank.sounds {
            self.register(&binding.event, &binding.path_str());
        }
    }

    /// Like [`load_bank`](Self::load_bank), also subscribing every event on `source`.
    pub fn load_bank_on<S>(&mut self, source: &mut S, bank: &SoundBank)
    where
        S: EventSource + ?Sized,
    {
        self.set_master_volume(bank.volume);
        for binding in &bank.sounds {
            self.register_on_event(source, &binding.event, &binding.path_str());
        }
    }

    /// Play the clip bound to `event_name` unless it is already playing.
    ///
    /// Returns `Ok(true)` when playback started and `Ok(false)` when the call
    /// was dropped because the clip is still playing.
    ///
    /// # Errors
    ///
    /// [`SoundError::UnregisteredEvent`] if nothing is bound to `event_name`.
    pub fn dispatch(&mut self, event_name: &str, looping: bool) -> Result<bool> {
        let Some(clip) = self.bindings.get_mut(event_name) else {
            tracing::warn!(event = event_name, "dispatch for unregistered sound event");
            return Err(SoundError::UnregisteredEvent(event_name.to_string()));
        };
        if clip.is_playing() {
            tracing::trace!(event = event_name, "already playing; dispatch dropped");
            return Ok(false);
        }
        tracing::debug!(event = event_name, looping, "playing sound");
        clip.play(looping);
        Ok(true)
    }

    /// Pause the clip bound to `event_name`, keeping its position.
    ///
    /// Unknown names are ignored.
    pub fn stop(&mut self, event_name: &str) {
        if let Some(clip) = self.bindings.get_mut(event_name) {
            tracing::debug!(event = event_name, "stopping sound");
            clip.stop();
        }
    }

    /// Stop the clip bound to `event_name`, clear its loop flag and rewind it.
    ///
    /// Unknown names are ignored.
    pub fn reset(&mut self, event_name: &str) {
        if let Some(clip) = self.bindings.get_mut(event_name) {
            tracing::debug!(event = event_name, "resetting sound");
            clip.reset();
        }
    }

    /// Queue a trigger for `event_name`, as if a subscribed source fired it.
    pub fn trigger(&self, event_name: &str) {
        self.mailbox.post(PlaybackMessage::Trigger {
            event: event_name.to_string(),
        });
    }

    /// Apply every queued trigger and output notice, oldest first.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        for message in self.mailbox.drain() {
            match message {
                PlaybackMessage::Trigger { event } => match self.dispatch(&event, false) {
                    Ok(true) => report.started += 1,
                    Ok(false) => report.dropped += 1,
                    Err(_) => report.unregistered.push(event),
                },
                PlaybackMessage::Ended { clip, epoch } => {
                    let Some((event, target)) = self.find_clip_mut(clip) else {
                        tracing::trace!(%clip, "ended notice for a replaced clip");
                        continue;
                    };
                    if target.natural_end(epoch) {
                        tracing::debug!(event = event.as_str(), "sound finished");
                        report.ended += 1;
                    } else {
                        tracing::debug!(event = event.as_str(), epoch, "stale ended notice ignored");
                    }
                }
                PlaybackMessage::Failed { clip, reason } => {
                    let path = match self.find_clip_mut(clip) {
                        Some((_, target)) => target.resource().to_string(),
                        None => clip.to_string(),
                    };
                    tracing::error!(resource = path.as_str(), "sound output failed: {}", reason);
                    report.failures.push(SoundError::resource_load(path, reason));
                }
            }
        }

        report
    }

    fn find_clip_mut(&mut self, id: ClipId) -> Option<(&String, &mut Clip)> {
        self.bindings.iter_mut().find(|(_, clip)| clip.id() == id)
    }

    /// Set the volume applied to every current and future clip (clamped to 0.0..=1.0).
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        for clip in self.bindings.values_mut() {
            clip.set_volume(self.master_volume);
        }
    }

    /// Current master volume.
    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Whether the clip bound to `event_name` is playing (false if unbound).
    pub fn is_playing(&self, event_name: &str) -> bool {
        self.bindings
            .get(event_name)
            .is_some_and(Clip::is_playing)
    }

    /// Playback position of the clip bound to `event_name`.
    pub fn position(&self, event_name: &str) -> Option<Duration> {
        self.bindings.get(event_name).map(Clip::position)
    }

    /// Clip bound to `event_name`.
    pub fn clip(&self, event_name: &str) -> Option<&Clip> {
        self.bindings.get(event_name)
    }

    /// Whether `event_name` has a binding.
    pub fn contains(&self, event_name: &str) -> bool {
        self.bindings.contains_key(event_name)
    }

    /// Registered event names, sorted.
    pub fn event_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<B: OutputBackend> fmt::Debug for PlaybackRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackRegistry")
            .field("bindings", &self.event_names())
            .field("master_volume", &self.master_volume)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventEmitter;
    use crate::output::VirtualBackend;
    use approx::assert_relative_eq;

    const LENGTH: Duration = Duration::from_secs(1);

    fn registry() -> (VirtualBackend, PlaybackRegistry<VirtualBackend>) {
        let deck = VirtualBackend::new(LENGTH);
        (deck.clone(), PlaybackRegistry::new(deck))
    }

    #[test]
    fn test_double_dispatch_plays_once() {
        let (deck, mut sounds) = registry();
        sounds.register("move", "move.ogg");

        assert!(sounds.dispatch("move", false).unwrap());
        assert!(!sounds.dispatch("move", false).unwrap());

        assert_eq!(deck.session_count("move.ogg"), 1);
        assert_eq!(deck.running_count(), 1);
    }

    #[test]
    fn test_dispatch_unregistered_is_an_error() {
        let (_deck, mut sounds) = registry();
        let err = sounds.dispatch("castle", false).unwrap_err();
        assert!(matches!(err, SoundError::UnregisteredEvent(name) if name == "castle"));
    }

    #[test]
    fn test_stop_and_reset_tolerate_unknown_names() {
        let (deck, mut sounds) = registry();
        sounds.stop("castle");
        sounds.reset("castle");
        assert!(sounds.is_empty());
        assert_eq!(deck.opened_count(), 0);
        assert!(sounds.pump().is_empty());
    }

    #[test]
    fn test_move_scenario() {
        let (_deck, mut sounds) = registry();
        sounds.register("move", "move.ogg");

        sounds.dispatch("move", false).unwrap();
        assert!(sounds.is_playing("move"));

        sounds.stop("move");
        assert!(!sounds.is_playing("move"));
    }

    #[test]
    fn test_stop_keeps_position_and_reset_rewinds() {
        let (deck, mut sounds) = registry();
        sounds.register("check", "check.ogg");

        sounds.dispatch("check", false).unwrap();
        deck.advance(Duration::from_millis(250));
        sounds.stop("check");
        assert_eq!(sounds.position("check"), Some(Duration::from_millis(250)));

        sounds.reset("check");
        assert!(!sounds.is_playing("check"));
        assert_eq!(sounds.position("check"), Some(Duration::ZERO));
    }

    #[test]
    fn test_reset_clears_loop_flag() {
        let (_deck, mut sounds) = registry();
        sounds.register("theme", "theme.ogg");

        sounds.dispatch("theme", true).unwrap();
        assert!(sounds.clip("theme").unwrap().is_looping());

        sounds.reset("theme");
        assert!(!sounds.clip("theme").unwrap().is_looping());
    }

    #[test]
    fn test_victory_ends_naturally() {
        let (deck, mut sounds) = registry();
        sounds.register("victory", "victory.ogg");

        sounds.dispatch("victory", false).unwrap();
        deck.advance(LENGTH * 2);
        let report = sounds.pump();

        assert_eq!(report.ended, 1);
        assert!(!sounds.is_playing("victory"));
    }

    #[test]
    fn test_last_registration_wins() {
        let (deck, mut sounds) = registry();
        sounds.register("check", "check-old.ogg");
        sounds.register("check", "check-new.ogg");

        sounds.dispatch("check", false).unwrap();

        assert_eq!(sounds.len(), 1);
        assert_eq!(sounds.clip("check").unwrap().resource(), "check-new.ogg");
        assert_eq!(deck.started(), vec!["check-new.ogg".to_string()]);
    }

    #[test]
    fn test_same_path_gets_separate_outputs() {
        let (deck, mut sounds) = registry();
        sounds.register("move", "click.ogg");
        sounds.register("capture", "click.ogg");

        sounds.dispatch("move", false).unwrap();
        assert!(sounds.dispatch("capture", false).unwrap());

        assert_eq!(deck.opened_count(), 2);
        assert_eq!(deck.session_count("click.ogg"), 2);
    }

    #[test]
    fn test_emitter_triggers_through_pump() {
        let (_deck, mut sounds) = registry();
        let mut board = EventEmitter::new();
        sounds.register_on_event(&mut board, "move", "move.ogg");

        board.emit("move");
        assert!(!sounds.is_playing("move"), "triggers wait for the pump");

        let report = sounds.pump();
        assert_eq!(report.started, 1);
        assert!(sounds.is_playing("move"));
    }

    #[test]
    fn test_ended_for_replaced_clip_is_ignored() {
        let (deck, mut sounds) = registry();
        sounds.register("check", "a.ogg");
        sounds.dispatch("check", false).unwrap();
        deck.advance(LENGTH);

        sounds.register("check", "b.ogg");
        sounds.dispatch("check", false).unwrap();
        let report = sounds.pump();

        assert_eq!(report.ended, 0);
        assert!(sounds.is_playing("check"));
    }

    #[test]
    fn test_failure_is_reported_not_raised() {
        let (deck, mut sounds) = registry();
        deck.fail_resource("broken.ogg", "unsupported format");
        sounds.register("defeat", "broken.ogg");

        assert!(sounds.dispatch("defeat", false).unwrap());
        let report = sounds.pump();

        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            SoundError::ResourceLoad { path, .. } if path == "broken.ogg"
        ));
    }

    #[test]
    fn test_master_volume_applies_to_all_clips() {
        let (deck, mut sounds) = registry();
        sounds.register("move", "move.ogg");
        sounds.set_master_volume(1.7);
        sounds.register("check", "check.ogg");
        assert_relative_eq!(sounds.master_volume(), 1.0);

        sounds.set_master_volume(0.25);
        assert_relative_eq!(deck.volume_of("move.ogg").unwrap(), 0.25);
        assert_relative_eq!(deck.volume_of("check.ogg").unwrap(), 0.25);
    }

    #[test]
    fn test_event_names_sorted() {
        let (_deck, mut sounds) = registry();
        sounds.register("victory", "v.ogg");
        sounds.register("check", "c.ogg");
        sounds.register("move", "m.ogg");
        assert_eq!(sounds.event_names(), vec!["check", "move", "victory"]);
    }
}
