use vp_core::snapshot::{BandEnergies, SpectralShape};

/// Band split frequencies: below `BASS_HZ` is bass, up to `MID_HZ` is mid,
/// the rest is treble.
const BASS_HZ: f32 = 250.0;
const MID_HZ: f32 = 2000.0;

/// Extract band energies and spectral shape from one frequency snapshot.
///
/// Stateless: everything is recomputed from the byte magnitudes. Each band
/// energy is the *average* normalized magnitude of its bins times `gain`,
/// so bands compare on the same scale regardless of how many bins they
/// span, and values above 1.0 survive for transient detection.
///
/// # Example
/// ```
/// use vp_audio::features::extract_features;
/// let bins = vec![0u8; 1024];
/// let (bands, shape) = extract_features(&bins, 44100, 5.0);
/// assert_eq!(bands.total, 0.0);
/// assert!((shape.centroid - 0.5).abs() < f32::EPSILON);
/// ```
#[must_use]
pub fn extract_features(bins: &[u8], sample_rate: u32, gain: f32) -> (BandEnergies, SpectralShape) {
    let len = bins.len();
    if len == 0 {
        return (BandEnergies::default(), SpectralShape::default());
    }

    let bin_hz = (sample_rate as f32 / 2.0) / len as f32;
    let bass_end = ((BASS_HZ / bin_hz) as usize).min(len);
    let mid_end = ((MID_HZ / bin_hz) as usize).min(len).max(bass_end);

    let mut bass_sum = 0.0f32;
    let mut mid_sum = 0.0f32;
    let mut treble_sum = 0.0f32;
    for (i, &v) in bins.iter().enumerate() {
        let norm = f32::from(v) / 255.0;
        if i < bass_end {
            bass_sum += norm;
        } else if i < mid_end {
            mid_sum += norm;
        } else {
            treble_sum += norm;
        }
    }
    let total_sum = bass_sum + mid_sum + treble_sum;

    let bands = BandEnergies {
        bass: bass_sum / bass_end.max(1) as f32 * gain,
        mid: mid_sum / (mid_end - bass_end).max(1) as f32 * gain,
        treble: treble_sum / (len - mid_end).max(1) as f32 * gain,
        total: total_sum / len as f32 * gain,
    };

    (bands, spectral_shape(bins))
}

/// Centroid and flatness of a byte spectrum.
fn spectral_shape(bins: &[u8]) -> SpectralShape {
    let len = bins.len();

    // Centroid: energy-weighted mean bin index, normalized by length once.
    let mut weighted = 0.0f64;
    let mut sum = 0.0f64;
    for (i, &v) in bins.iter().enumerate() {
        weighted += i as f64 * f64::from(v);
        sum += f64::from(v);
    }
    let centroid = if sum > 0.0 {
        (weighted / sum / len as f64) as f32
    } else {
        0.5
    };

    // Flatness: geometric/arithmetic mean ratio of (v + 1), the offset
    // guarding ln(0).
    let mut log_sum = 0.0f64;
    let mut arith_sum = 0.0f64;
    for &v in bins {
        let value = f64::from(v) + 1.0;
        log_sum += value.ln();
        arith_sum += value;
    }
    let count = len.max(1) as f64;
    let geometric = (log_sum / count).exp();
    let arithmetic = arith_sum / count;
    let flatness = if arithmetic > 0.0 {
        (geometric / arithmetic).clamp(0.0, 1.0) as f32
    } else {
        0.0
    };

    SpectralShape { centroid, flatness }
}
