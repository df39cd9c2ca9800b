//! The playback engine: single source of truth for "what is playing".
//!
//! Owns the queue, the transport state and the shuffle/repeat flags, and
//! drives one [`AudioOutput`]. Track URLs are resolved lazily through the
//! [`TrackResolver`] seam; a resolution that completes after a newer
//! `play_track` call started is discarded (last call wins).

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::catalog::{CatalogError, Song, TrackResolver};

use super::output::AudioOutput;
use super::queue;

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Resolve(#[from] CatalogError),
}

/// State changes pushed to the view layer.
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    TransportChanged(Transport),
    TrackStarted { track_id: String },
    QueueReplaced { size: usize },
    ResolutionFailed { track_id: String, message: String },
}

/// Advisory snapshot of the engine state.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub transport: Transport,
    pub current_track_id: Option<String>,
    pub queue_size: usize,
    pub shuffle: bool,
    pub repeat: bool,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
}

struct EngineInner {
    transport: Transport,
    queue: Vec<Song>,
    current_index: Option<usize>,
    current: Option<Song>,
    shuffle: bool,
    repeat: bool,
    /// Monotonically increasing per load; stale resolutions compare against
    /// it and drop out.
    load_seq: u64,
}

enum EndOfTrack {
    Restart,
    Play(String),
    Stop,
}

pub struct PlaybackEngine {
    resolver: Arc<dyn TrackResolver>,
    output: Arc<dyn AudioOutput>,
    inner: Mutex<EngineInner>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackEngine {
    pub fn new(resolver: Arc<dyn TrackResolver>, output: Arc<dyn AudioOutput>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            resolver,
            output,
            inner: Mutex::new(EngineInner {
                transport: Transport::Idle,
                queue: Vec::new(),
                current_index: None,
                current: None,
                shuffle: false,
                repeat: false,
                load_seq: 0,
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.inner.lock().unwrap();
        PlaybackSnapshot {
            transport: inner.transport,
            current_track_id: inner.current.as_ref().map(|song| song.id.clone()),
            queue_size: inner.queue.len(),
            shuffle: inner.shuffle,
            repeat: inner.repeat,
            position_secs: self.output.position_secs(),
            duration_secs: self.output.duration_secs(),
        }
    }

    /// Starts playing the given track. A supplied non-empty queue replaces
    /// the engine's queue wholesale; this is how "play this album" and
    /// "play this single track" are unified.
    ///
    /// Calling with the id of the current track restarts it from position
    /// zero without refetching the URL.
    pub async fn play_track(
        &self,
        track_id: &str,
        new_queue: Option<Vec<Song>>,
    ) -> Result<(), PlaybackError> {
        let seq = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(new_queue) = new_queue {
                if !new_queue.is_empty() {
                    inner.queue = new_queue;
                    let size = inner.queue.len();
                    let current_id = inner.current.as_ref().map(|song| song.id.clone());
                    if let Some(current_id) = current_id {
                        inner.current_index =
                            inner.queue.iter().position(|song| song.id == current_id);
                    }
                    let _ = self.events.send(PlaybackEvent::QueueReplaced { size });
                }
            }

            if inner
                .current
                .as_ref()
                .is_some_and(|current| current.id == track_id)
            {
                // Restart from zero; also invalidates any resolution still
                // in flight for a previous call.
                inner.load_seq += 1;
                self.output.seek(0.0);
                self.output.play();
                self.set_transport(&mut inner, Transport::Playing);
                return Ok(());
            }

            inner.load_seq += 1;
            self.set_transport(&mut inner, Transport::Loading);
            inner.load_seq
        };

        let resolution = self.resolver.resolve_track(track_id).await;

        let mut inner = self.inner.lock().unwrap();
        if inner.load_seq != seq {
            debug!("Discarding stale resolution for track {}", track_id);
            return Ok(());
        }

        match resolution {
            Ok(resolved) => {
                let index = inner
                    .queue
                    .iter()
                    .position(|song| song.id == resolved.song.id);
                if index.is_none() {
                    // The track was requested outside any queue context;
                    // it becomes a queue of one.
                    inner.queue = vec![resolved.song.clone()];
                }
                inner.current_index = Some(index.unwrap_or(0));
                inner.current = Some(resolved.song.clone());
                self.output.load(&resolved.stream_url);
                self.set_transport(&mut inner, Transport::Playing);
                let _ = self.events.send(PlaybackEvent::TrackStarted {
                    track_id: resolved.song.id,
                });
                Ok(())
            }
            Err(err) => {
                inner.current = None;
                inner.current_index = None;
                self.set_transport(&mut inner, Transport::Idle);
                let _ = self.events.send(PlaybackEvent::ResolutionFailed {
                    track_id: track_id.to_owned(),
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// No-op unless a track is loaded.
    pub fn toggle_play_pause(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.transport {
            Transport::Playing => {
                self.output.pause();
                self.set_transport(&mut inner, Transport::Paused);
            }
            Transport::Paused => {
                self.output.play();
                self.set_transport(&mut inner, Transport::Playing);
            }
            Transport::Idle | Transport::Loading => {}
        }
    }

    /// Clamps to `[0, duration]`; ignored unless a track is loaded.
    pub fn seek(&self, position_secs: f64) {
        let inner = self.inner.lock().unwrap();
        if !matches!(inner.transport, Transport::Playing | Transport::Paused) {
            return;
        }
        let upper = self.output.duration_secs().unwrap_or(f64::INFINITY);
        self.output.seek(position_secs.clamp(0.0, upper));
    }

    /// Skips forward: random other index under shuffle, `index + 1` with
    /// wrap-around otherwise.
    pub async fn next(&self) -> Result<(), PlaybackError> {
        let target = {
            let inner = self.inner.lock().unwrap();
            let (current, len) = match (inner.current_index, inner.queue.len()) {
                (Some(current), len) if len > 0 => (current, len),
                _ => return Ok(()),
            };
            let target = if inner.shuffle {
                queue::random_other_index(current, len)
            } else {
                queue::next_index(current, len)
            };
            inner.queue[target].id.clone()
        };
        self.play_track(&target, None).await
    }

    /// Skips backward with wrap-around from the first index. Shuffle does
    /// not affect it.
    pub async fn previous(&self) -> Result<(), PlaybackError> {
        let target = {
            let inner = self.inner.lock().unwrap();
            let (current, len) = match (inner.current_index, inner.queue.len()) {
                (Some(current), len) if len > 0 => (current, len),
                _ => return Ok(()),
            };
            inner.queue[queue::previous_index(current, len)].id.clone()
        };
        self.play_track(&target, None).await
    }

    /// Called when the output reports natural end of the current track.
    pub async fn handle_track_ended(&self) -> Result<(), PlaybackError> {
        let action = {
            let mut inner = self.inner.lock().unwrap();
            let (current, len) = match (inner.current_index, inner.queue.len()) {
                (Some(current), len) if len > 0 => (current, len),
                _ => return Ok(()),
            };

            if inner.repeat {
                EndOfTrack::Restart
            } else if inner.shuffle && len > 1 {
                EndOfTrack::Play(inner.queue[queue::random_other_index(current, len)].id.clone())
            } else if !inner.shuffle && current + 1 < len {
                EndOfTrack::Play(inner.queue[current + 1].id.clone())
            } else {
                // Nothing further to auto-advance to: hold the last track.
                self.set_transport(&mut inner, Transport::Paused);
                EndOfTrack::Stop
            }
        };

        match action {
            EndOfTrack::Restart => {
                self.output.seek(0.0);
                self.output.play();
                Ok(())
            }
            EndOfTrack::Play(track_id) => self.play_track(&track_id, None).await,
            EndOfTrack::Stop => Ok(()),
        }
    }

    /// Turning shuffle on clears repeat. No effect on an empty queue.
    pub fn toggle_shuffle(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.queue.is_empty() {
            return;
        }
        inner.shuffle = !inner.shuffle;
        if inner.shuffle {
            inner.repeat = false;
        }
    }

    /// Turning repeat on clears shuffle. No effect on an empty queue.
    pub fn toggle_repeat(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.queue.is_empty() {
            return;
        }
        inner.repeat = !inner.repeat;
        if inner.repeat {
            inner.shuffle = false;
        }
    }

    fn set_transport(&self, inner: &mut EngineInner, transport: Transport) {
        if inner.transport != transport {
            inner.transport = transport;
            let _ = self.events.send(PlaybackEvent::TransportChanged(transport));
        }
    }
}
