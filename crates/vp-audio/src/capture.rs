use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};
use vp_core::snapshot::CaptureMode;

use crate::error::AudioError;

/// Device-name fragments that identify a system loopback endpoint.
const LOOPBACK_HINTS: [&str; 3] = ["loopback", "monitor", "system audio"];

/// Audio capture via cpal.
///
/// Downmixes to mono f32 and writes into a lock-free ring buffer consumed
/// by the analysis thread. `Microphone` uses the default input device;
/// `System` looks for a loopback/monitor input endpoint and fails with a
/// typed error when none exists, so the caller can surface it at session
/// start.
///
/// Dropping the capture releases the stream and the device.
///
/// # Example
/// ```no_run
/// use vp_audio::capture::AudioCapture;
/// use vp_core::snapshot::CaptureMode;
/// let capture = AudioCapture::start(CaptureMode::Microphone).unwrap();
/// ```
pub struct AudioCapture {
    stream: cpal::Stream,
    consumer: Consumer<f32>,
    sample_rate: u32,
}

impl AudioCapture {
    /// Start capturing from the endpoint selected by `mode`.
    ///
    /// # Errors
    /// Returns a typed `AudioError` when no suitable device exists or the
    /// stream cannot be built/started. Nothing is left held on failure.
    pub fn start(mode: CaptureMode) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = pick_device(&host, mode)?;

        let name = device.name()?;
        let config = device.default_input_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        log::info!("capture: \"{name}\" @ {sample_rate}Hz, {channels}ch ({mode:?})");

        // Ring buffer: 2 seconds of mono audio
        let buf_size = sample_rate as usize * 2;
        let (mut producer, consumer) = RingBuffer::new(buf_size);

        let stream = device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for chunk in data.chunks(channels) {
                    let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                    let _ = producer.push(mono);
                }
            },
            |err| {
                log::error!("audio stream error: {err}");
            },
            None,
        )?;

        stream.play()?;

        Ok(Self {
            stream,
            consumer,
            sample_rate,
        })
    }

    /// Drain available samples from the ring buffer into `out`.
    ///
    /// Returns how many samples were read. Never blocks.
    pub fn read_samples(&mut self, out: &mut Vec<f32>) -> usize {
        let available = self.consumer.slots();
        out.clear();
        out.reserve(available);
        let mut count = 0;
        while let Ok(sample) = self.consumer.pop() {
            out.push(sample);
            count += 1;
        }
        count
    }

    /// The sample rate of the capture stream.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Best-effort stop before drop. Platform teardown hiccups are logged
    /// and swallowed; stop must never fail.
    pub fn shutdown(&self) {
        if let Err(err) = self.stream.pause() {
            log::warn!("audio stream pause failed (ignored): {err}");
        }
    }
}

/// Select the input device for a capture mode.
fn pick_device(host: &cpal::Host, mode: CaptureMode) -> Result<cpal::Device, AudioError> {
    match mode {
        CaptureMode::Microphone => host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice),
        CaptureMode::System => {
            for device in host.input_devices()? {
                let name = device.name().unwrap_or_default().to_lowercase();
                if LOOPBACK_HINTS.iter().any(|hint| name.contains(hint)) {
                    return Ok(device);
                }
            }
            Err(AudioError::NoLoopbackDevice)
        }
    }
}
