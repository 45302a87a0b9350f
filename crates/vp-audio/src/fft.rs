use realfft::RealFftPlanner;

/// Decibel range mapped onto the 0–255 byte spectrum.
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// Windowed real FFT producing a byte magnitude spectrum.
///
/// Pre-allocates the FFT plan and scratch buffers for a zero-allocation
/// hot path. Each bin is exponentially smoothed across frames, then mapped
/// from dB into 0–255, so one frame of output is the tick's frequency
/// snapshot.
///
/// # Example
/// ```
/// use vp_audio::fft::SpectrumAnalyzer;
/// let fft = SpectrumAnalyzer::new(2048, 0.8);
/// assert_eq!(fft.bin_count(), 1025); // N/2 + 1
/// ```
pub struct SpectrumAnalyzer {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
    /// Per-bin exponentially smoothed magnitudes.
    smoothed: Vec<f32>,
    /// Byte output, reused every frame.
    bytes: Vec<u8>,
    /// Smoothing time constant [0.0, 1.0). 0 = raw.
    smoothing: f32,
}

impl SpectrumAnalyzer {
    /// Create a new analyzer with the given window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize, smoothing: f32) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        let bins = spectrum_buf.len();

        // Hann window
        let window: Vec<f32> = (0..size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (size as f32 - 1.0)).cos())
            })
            .collect();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            smoothing: smoothing.clamp(0.0, 0.99),
        }
    }

    /// Process `samples` through the windowed FFT and return the byte
    /// spectrum (one 0–255 magnitude per bin).
    ///
    /// Fewer samples than the window size are zero-padded; extra samples
    /// are ignored past the window.
    ///
    /// # Example
    /// ```
    /// use vp_audio::fft::SpectrumAnalyzer;
    /// let mut fft = SpectrumAnalyzer::new(256, 0.0);
    /// let samples = vec![0.0f32; 256];
    /// assert!(fft.process(&samples).iter().all(|&b| b == 0));
    /// ```
    pub fn process(&mut self, samples: &[f32]) -> &[u8] {
        let n = self.fft_size.min(samples.len());

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                samples[i] * self.window[i]
            } else {
                0.0
            };
        }

        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            self.bytes.fill(0);
            return &self.bytes;
        }

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (i, c) in self.spectrum_buf.iter().enumerate() {
            let mag = (c.re * c.re + c.im * c.im).sqrt() * scale;
            self.smoothed[i] = tau * self.smoothed[i] + (1.0 - tau) * mag;
            self.bytes[i] = to_byte(self.smoothed[i]);
        }

        &self.bytes
    }

    /// Clear the smoothing state (new session, new signal).
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.bytes.fill(0);
    }

    /// Number of output bins (N/2 + 1).
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

/// Map a linear magnitude into the 0–255 dB byte scale.
#[inline]
fn to_byte(mag: f32) -> u8 {
    if mag <= 0.0 {
        return 0;
    }
    let db = 20.0 * mag.log10();
    let norm = (db - MIN_DB) / (MAX_DB - MIN_DB);
    (norm.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_produces_zero_bytes() {
        let mut fft = SpectrumAnalyzer::new(1024, 0.8);
        let samples = vec![0.0f32; 1024];
        assert!(fft.process(&samples).iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sample_rate = 44100.0f32;
        let freq = 440.0f32;
        let size = 2048;
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect();

        let mut fft = SpectrumAnalyzer::new(size, 0.0);
        let bins = fft.process(&samples).to_vec();

        let expected_bin = (freq / (sample_rate / size as f32)).round() as usize;
        let peak_bin = bins
            .iter()
            .enumerate()
            .max_by_key(|&(_, &b)| b)
            .map_or(0, |(i, _)| i);
        assert!(
            peak_bin.abs_diff(expected_bin) <= 1,
            "peak at bin {peak_bin}, expected near {expected_bin}"
        );
        // Far-away bins carry much less
        assert!(bins[expected_bin] > bins[expected_bin + 200]);
    }

    #[test]
    fn smoothing_carries_energy_across_frames() {
        let size = 512;
        let loud: Vec<f32> = (0..size).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
        let silence = vec![0.0f32; size];
        let mut fft = SpectrumAnalyzer::new(size, 0.8);
        let after_loud: Vec<u8> = fft.process(&loud).to_vec();
        let after_silent: Vec<u8> = fft.process(&silence).to_vec();

        let loud_max = after_loud.iter().copied().max().unwrap_or(0);
        let silent_max = after_silent.iter().copied().max().unwrap_or(0);
        assert!(loud_max > 0);
        // The smoothed spectrum decays instead of dropping to zero
        assert!(silent_max > 0, "smoothing should retain energy one frame later");
    }

    #[test]
    fn reset_clears_smoothing_state() {
        let size = 512;
        let loud: Vec<f32> = (0..size).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
        let silence = vec![0.0f32; size];
        let mut fft = SpectrumAnalyzer::new(size, 0.8);
        let _ = fft.process(&loud);
        fft.reset();
        assert!(fft.process(&silence).iter().all(|&b| b == 0));
    }
}
