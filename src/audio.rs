//! Audio playback for timer completion sounds.

use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to initialize audio output: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("Failed to play audio: {0}")]
    Play(#[from] rodio::PlayError),
    #[error("No audio output available")]
    Unavailable,
}

/// Audio playback sink.
pub trait SoundPlayer {
    fn play(&self) -> Result<(), AudioError>;
}

pub struct AudioPlayer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl AudioPlayer {
    /// Creates a new audio player on the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Plays a two-tone chime without blocking.
    fn play_generated_tone(&self) -> Result<(), AudioError> {
        use rodio::source::{SineWave, Source};

        let sink = Sink::try_new(&self.handle)?;

        // 880 Hz (A5), a short gap, then 1046.5 Hz (C6)
        let tone1 = SineWave::new(880.0)
            .take_duration(Duration::from_millis(150))
            .amplify(0.3);
        let silence =
            rodio::source::Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(50));
        let tone2 = SineWave::new(1046.5)
            .take_duration(Duration::from_millis(200))
            .amplify(0.3);

        sink.append(tone1);
        sink.append(silence);
        sink.append(tone2);
        sink.detach();

        Ok(())
    }
}

impl SoundPlayer for AudioPlayer {
    fn play(&self) -> Result<(), AudioError> {
        self.play_generated_tone()
    }
}

/// Stand-in used when no output device could be opened.
pub struct Muted;

impl SoundPlayer for Muted {
    fn play(&self) -> Result<(), AudioError> {
        Err(AudioError::Unavailable)
    }
}

/// Opens the default output device, falling back to [`Muted`].
///
/// The returned player is not `Send`; open it on the thread that plays.
pub fn open_default() -> Box<dyn SoundPlayer> {
    match AudioPlayer::new() {
        Ok(player) => Box::new(player),
        Err(e) => {
            warn!("Audio disabled: {}", e);
            Box::new(Muted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_player_creation() {
        // Fails on systems without audio output, which is fine on CI
        match AudioPlayer::new() {
            Ok(player) => {
                let _ = player.play();
            }
            Err(e) => println!("Audio player creation failed (expected on CI): {}", e),
        }
    }

    #[test]
    fn test_muted_player_reports_unavailable() {
        assert!(matches!(Muted.play(), Err(AudioError::Unavailable)));
    }
}
