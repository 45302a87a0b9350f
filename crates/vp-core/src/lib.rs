/// Configuration and shared types for vibepal.
///
/// This crate contains the published snapshot contract, the enums shared
/// between the analysis pipeline and its consumers, and the tunable
/// analysis configuration.

pub mod config;
pub mod error;
pub mod snapshot;

pub use config::AnalysisConfig;
pub use error::CoreError;
pub use snapshot::{AudioData, BandEnergies, BpmStatus, CaptureMode, Mood, SpectralShape};
