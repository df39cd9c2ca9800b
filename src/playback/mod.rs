mod engine;
mod output;
mod queue;

pub use engine::{PlaybackEngine, PlaybackError, PlaybackEvent, PlaybackSnapshot, Transport};
pub use output::AudioOutput;
