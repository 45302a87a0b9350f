use thiserror::Error;

/// Errors originating from the audio module.
///
/// All of these are fatal to session *start*; once a session is running,
/// the tick path never surfaces an error.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("No audio input device found")]
    NoInputDevice,

    /// System mode requested but no loopback/monitor endpoint exists.
    #[error("No system loopback/monitor input device found")]
    NoLoopbackDevice,

    /// Device enumeration failed.
    #[error("Cannot enumerate audio devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    /// Device name query failed.
    #[error("Cannot read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    /// The device has no usable default input config.
    #[error("Unsupported input stream config: {0}")]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),

    /// The input stream could not be built.
    #[error("Cannot build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The input stream could not be started.
    #[error("Cannot start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}
