//! Audio device integration using rodio
//!
//! One output stream is opened per backend; every clip gets its own `Sink`
//! on that stream. Resources are read and decoded lazily on first play, so a
//! bad path turns into a failure notice instead of a registration error.

use super::{AudioOutput, OutputBackend};
use crate::events::EndedNotifier;
use crate::{Result, SoundError};
use rodio::source::{EmptyCallback, Source};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Output backend playing through the default system audio device.
pub struct RodioBackend {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl RodioBackend {
    /// Open the default output device.
    pub fn new() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| SoundError::AudioDevice(format!("Failed to open audio stream: {}", e)))?;
        tracing::debug!("opened default audio output stream");

        Ok(RodioBackend {
            _stream: stream,
            handle,
        })
    }
}

impl OutputBackend for RodioBackend {
    fn open(&self, resource: &str, notifier: EndedNotifier) -> Box<dyn AudioOutput> {
        Box::new(RodioOutput::new(self.handle.clone(), resource, notifier))
    }
}

/// One clip's stream on the system audio device.
pub struct RodioOutput {
    handle: OutputStreamHandle,
    resource: PathBuf,
    notifier: EndedNotifier,
    /// File contents, read on first play
    data: Option<Arc<[u8]>>,
    sink: Option<Sink>,
    looping: bool,
    /// Loop flag the queued source was built with
    queued_looping: bool,
    volume: f32,
    epoch: u64,
}

impl RodioOutput {
    fn new(handle: OutputStreamHandle, resource: &str, notifier: EndedNotifier) -> Self {
        RodioOutput {
            handle,
            resource: PathBuf::from(resource),
            notifier,
            data: None,
            sink: None,
            looping: false,
            queued_looping: false,
            volume: 1.0,
            epoch: 0,
        }
    }

    fn load(&mut self) -> Result<Arc<[u8]>> {
        if let Some(data) = &self.data {
            return Ok(Arc::clone(data));
        }
        let bytes = std::fs::read(&self.resource).map_err(|e| {
            SoundError::resource_load(self.resource.display().to_string(), e.to_string())
        })?;
        let data: Arc<[u8]> = bytes.into();
        self.data = Some(Arc::clone(&data));
        Ok(data)
    }

    fn is_idle(&self) -> bool {
        self.sink.as_ref().map_or(true, Sink::empty)
    }

    /// Queue a fresh decode of the resource on a new, paused sink.
    fn start_session(&mut self) -> Result<()> {
        let data = self.load()?;
        let decoder = Decoder::new(Cursor::new(data)).map_err(|e| {
            SoundError::resource_load(self.resource.display().to_string(), e.to_string())
        })?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| SoundError::AudioDevice(format!("Failed to create audio sink: {}", e)))?;
        sink.pause();
        sink.set_volume(self.volume);

        self.epoch += 1;
        if self.looping {
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
            let notifier = self.notifier.clone();
            let epoch = self.epoch;
            sink.append(EmptyCallback::<f32>::new(Box::new(move || {
                notifier.ended(epoch)
            })));
        }

        self.queued_looping = self.looping;
        self.sink = Some(sink);
        Ok(())
    }

    fn try_play(&mut self) -> Result<()> {
        if self.is_idle() {
            self.start_session()?;
        } else if self.queued_looping != self.looping {
            // The queued source was built for the other loop mode; rebuild it
            // and continue from the same spot.
            let position = self.position();
            self.sink = None;
            self.start_session()?;
            // A fresh session already starts at zero.
            if !position.is_zero() {
                if let Some(sink) = &self.sink {
                    if let Err(err) = sink.try_seek(position) {
                        tracing::warn!(
                            resource = %self.resource.display(),
                            ?position,
                            "seek not supported: {}",
                            err
                        );
                    }
                }
            }
        }
        if let Some(sink) = &self.sink {
            sink.play();
        }
        Ok(())
    }
}

impl AudioOutput for RodioOutput {
    fn play(&mut self) {
        if let Err(err) = self.try_play() {
            tracing::error!(
                resource = %self.resource.display(),
                clip = %self.notifier.clip(),
                "failed to start playback: {}",
                err
            );
            self.notifier.failed(err.to_string());
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn position(&self) -> Duration {
        self.sink.as_ref().map_or(Duration::ZERO, Sink::get_pos)
    }

    fn seek(&mut self, position: Duration) {
        let Some(sink) = &self.sink else {
            return;
        };
        if position.is_zero() && sink.is_paused() {
            // Dropping the sink discards the queued source; the next play
            // decodes from the start.
            self.sink = None;
            return;
        }
        if let Err(err) = sink.try_seek(position) {
            tracing::warn!(
                resource = %self.resource.display(),
                ?position,
                "seek not supported: {}",
                err
            );
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }
}
