//! Decode-success feedback: audio alert plus haptic pulse.
//!
//! The platform audio resource becomes usable asynchronously and must not
//! be torn down mid-playback. [`FeedbackSignaler`] makes that lifecycle an
//! explicit state machine with guarded transitions instead of nullable
//! handle checks: `Idle → Preparing → Ready → Playing → (Ready | Closing)
//! → Released`.

use tracing::debug;

pub type Result<M> = std::result::Result<M, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("AlertError({0})")]
    AlertError(String),
}

impl<'a> From<&'a str> for Error {
    fn from(orig: &'a str) -> Error {
        Error::AlertError(orig.to_string())
    }
}

/// Lifecycle of the audio alert resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Preparing,
    Ready,
    Playing,
    /// Close requested while playing; release deferred until the
    /// resource's own completion notification.
    Closing,
    Released,
}

/// Platform audio alert resource.
///
/// `prepare` only starts preparation; readiness arrives later through
/// [`FeedbackSignaler::on_prepared`]. After `play` the resource loops
/// until torn down; completion of one pass arrives through
/// [`FeedbackSignaler::on_playback_complete`].
pub trait AudioAlert {
    fn prepare(&mut self) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn release(&mut self);
}

/// Platform vibrator.
pub trait HapticBuzzer {
    fn pulse(&mut self, duration_millis: u64);
}

const PULSE_MILLIS: u64 = 100;

pub struct FeedbackSignaler<A: AudioAlert, H: HapticBuzzer> {
    state: PlayerState,
    audio: A,
    haptic: H,
}

impl<A: AudioAlert, H: HapticBuzzer> FeedbackSignaler<A, H> {
    pub fn new(audio: A, haptic: H) -> Self {
        Self {
            state: PlayerState::Idle,
            audio,
            haptic,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Begin asynchronous preparation. No-op unless idle.
    pub fn arm(&mut self) -> Result<()> {
        if self.state != PlayerState::Idle {
            return Ok(());
        }
        self.audio.prepare()?;
        self.state = PlayerState::Preparing;
        Ok(())
    }

    /// Readiness notification from the audio resource.
    pub fn on_prepared(&mut self) {
        if self.state == PlayerState::Preparing {
            self.state = PlayerState::Ready;
        } else {
            debug!("spurious prepared notification in state {:?}", self.state);
        }
    }

    /// Fire the success feedback.
    ///
    /// No-op unless armed and ready. The haptic pulse is unconditional;
    /// `play_sound` gates only the audio path (ringer mode is a platform
    /// policy the caller resolves).
    pub fn fire_once(&mut self, play_sound: bool) -> Result<()> {
        if self.state != PlayerState::Ready {
            debug!("feedback requested in state {:?}; ignored", self.state);
            return Ok(());
        }
        self.haptic.pulse(PULSE_MILLIS);
        if play_sound {
            self.audio.play()?;
            self.state = PlayerState::Playing;
        }
        Ok(())
    }

    /// Completion notification from the audio resource.
    pub fn on_playback_complete(&mut self) {
        match self.state {
            PlayerState::Playing => self.state = PlayerState::Ready,
            PlayerState::Closing => {
                self.audio.release();
                self.state = PlayerState::Released;
            }
            _ => {}
        }
    }

    /// Tear down. Deferred while playing so an in-progress alert is not
    /// truncated; immediate otherwise.
    pub fn close(&mut self) {
        match self.state {
            PlayerState::Playing => self.state = PlayerState::Closing,
            PlayerState::Closing | PlayerState::Released => {}
            _ => {
                self.audio.release();
                self.state = PlayerState::Released;
            }
        }
    }
}
