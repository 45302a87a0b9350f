use std::thread;
use std::time::Instant;

use triple_buffer::TripleBuffer;
use vp_core::config::AnalysisConfig;
use vp_core::snapshot::{AudioData, CaptureMode};

use crate::capture::AudioCapture;
use crate::engine::AnalysisEngine;
use crate::fft::SpectrumAnalyzer;

/// Commands accepted by a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Stop the tick loop, publish a default snapshot and release the
    /// device.
    Stop,
}

/// Asynchronous tempo reading from an external realtime BPM estimator.
///
/// Deliveries are opportunistic overrides: no ordering is guaranteed
/// against the tick loop, and messages arriving after the session stopped
/// are dropped with the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoUpdate {
    /// Estimated tempo, beats per minute.
    pub bpm: u16,
}

/// Handle to one running capture session.
///
/// Owns the snapshot reader; dropping the handle stops the session and
/// joins the analysis thread.
pub struct SessionHandle {
    output: triple_buffer::Output<AudioData>,
    cmd_tx: flume::Sender<SessionCommand>,
    tempo_tx: flume::Sender<TempoUpdate>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SessionHandle {
    /// Latest published snapshot. Wait-free; returns the same value until
    /// the session publishes a newer one.
    pub fn snapshot(&mut self) -> AudioData {
        *self.output.read()
    }

    /// Sender half for an external realtime BPM estimator. May be cloned;
    /// sends after stop fail silently (the receiver is gone).
    #[must_use]
    pub fn tempo_sender(&self) -> flume::Sender<TempoUpdate> {
        self.tempo_tx.clone()
    }

    /// Stop the session: no further ticks fire, the audio source is
    /// released, the thread is joined. Idempotent.
    pub fn stop(&mut self) {
        let _ = self.cmd_tx.send(SessionCommand::Stop);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("session thread panicked during shutdown");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start a capture session: acquire the audio source, spawn the analysis
/// thread, return the snapshot reader.
///
/// Acquisition is the only slow, failing step and happens here, fully
/// isolated from the tick loop. On failure nothing is left running or
/// held.
///
/// # Errors
/// Fails on invalid config or on audio source acquisition (no device,
/// no loopback endpoint, stream setup).
pub fn start_session(mode: CaptureMode, config: AnalysisConfig) -> anyhow::Result<SessionHandle> {
    use anyhow::Context;

    config.validate().context("analysis config")?;
    let capture = AudioCapture::start(mode)
        .with_context(|| format!("cannot acquire audio source ({mode:?})"))?;

    let (buf_input, buf_output) = TripleBuffer::new(&AudioData::default()).split();
    let (cmd_tx, cmd_rx) = flume::bounded(4);
    let (tempo_tx, tempo_rx) = flume::unbounded();

    let thread = thread::Builder::new()
        .name("vp-session".to_string())
        .spawn(move || {
            run_session_loop(capture, &config, buf_input, &cmd_rx, &tempo_rx);
        })
        .context("cannot spawn session thread")?;

    Ok(SessionHandle {
        output: buf_output,
        cmd_tx,
        tempo_tx,
        thread: Some(thread),
    })
}

/// The serial tick loop: one tick completes before the next is scheduled,
/// so no pipeline state is ever touched by two ticks at once.
fn run_session_loop(
    mut capture: AudioCapture,
    config: &AnalysisConfig,
    mut buf_input: triple_buffer::Input<AudioData>,
    cmd_rx: &flume::Receiver<SessionCommand>,
    tempo_rx: &flume::Receiver<TempoUpdate>,
) {
    let sample_rate = capture.sample_rate();
    let mut fft = SpectrumAnalyzer::new(config.fft_size, config.spectrum_smoothing);
    let mut engine = AnalysisEngine::new(config.clone(), 0.0);

    let mut incoming: Vec<f32> = Vec::with_capacity(config.fft_size * 2);
    let mut window: Vec<f32> = vec![0.0; config.fft_size];

    let started = Instant::now();
    let period = config.tick_period();

    log::info!(
        "session loop: {}Hz, fft {}, tick {:?}",
        sample_rate,
        config.fft_size,
        period
    );

    loop {
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                SessionCommand::Stop => {
                    // Reset contract: consumers see defaults after stop.
                    buf_input.write(AudioData::default());
                    capture.shutdown();
                    log::info!("session stopped");
                    return;
                }
            }
        }

        // Opportunistic realtime-estimator overrides, drained before the
        // tick reads detector state.
        while let Ok(update) = tempo_rx.try_recv() {
            engine.apply_tempo(update.bpm);
        }

        capture.read_samples(&mut incoming);
        roll_window(&mut window, &incoming);

        let now_ms = started.elapsed().as_secs_f64() * 1000.0;
        let bins = fft.process(&window);
        let snapshot = engine.process_frame(bins, sample_rate, now_ms);
        buf_input.write(snapshot);

        thread::sleep(period);
    }
}

/// Slide `incoming` samples into the tail of the fixed analysis window.
fn roll_window(window: &mut [f32], incoming: &[f32]) {
    if incoming.is_empty() {
        return;
    }
    let len = window.len();
    if incoming.len() >= len {
        window.copy_from_slice(&incoming[incoming.len() - len..]);
    } else {
        let n = incoming.len();
        window.rotate_left(n);
        window[len - n..].copy_from_slice(incoming);
    }
}
