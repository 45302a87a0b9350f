// Capture, feature extraction, beat/mood analysis for vibepal.

pub mod beat;
pub mod capture;
pub mod engine;
pub mod error;
pub mod features;
pub mod fft;
pub mod mood;
pub mod session;
pub mod smoothing;

pub use error::AudioError;
pub use session::{SessionHandle, TempoUpdate, start_session};
