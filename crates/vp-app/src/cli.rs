use std::path::PathBuf;

use clap::Parser;
use vp_core::snapshot::CaptureMode;

/// vibepal — real-time audio mood companion.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Audio source: "microphone" or "system" (loopback).
    #[arg(long, default_value = "microphone")]
    pub mode: String,

    /// Analysis configuration TOML. Defaults apply when missing.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Analysis ticks per second (overrides the config).
    #[arg(long)]
    pub fps: Option<u32>,

    /// Stop after this many seconds. Runs until Enter otherwise.
    #[arg(long)]
    pub duration: Option<u64>,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse the capture mode argument.
    ///
    /// # Errors
    /// Returns an error naming the accepted values.
    pub fn capture_mode(&self) -> anyhow::Result<CaptureMode> {
        match self.mode.as_str() {
            "microphone" | "mic" => Ok(CaptureMode::Microphone),
            "system" => Ok(CaptureMode::System),
            other => anyhow::bail!("Unknown mode '{other}'. Use \"microphone\" or \"system\"."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_strings_parse() {
        let cli = Cli::parse_from(["vibepal", "--mode", "system"]);
        assert_eq!(
            cli.capture_mode().ok(),
            Some(CaptureMode::System)
        );

        let cli = Cli::parse_from(["vibepal", "--mode", "mic"]);
        assert_eq!(
            cli.capture_mode().ok(),
            Some(CaptureMode::Microphone)
        );

        let cli = Cli::parse_from(["vibepal", "--mode", "vinyl"]);
        assert!(cli.capture_mode().is_err());
    }
}
