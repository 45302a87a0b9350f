use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use vp_core::config::AnalysisConfig;
use vp_core::snapshot::AudioData;

pub mod cli;

/// How often the status line refreshes.
const STATUS_PERIOD: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    // 1. Parse CLI
    let cli = cli::Cli::parse();

    // 2. Initialize logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    // 3. Load config (defaults when the file is absent)
    let mut config = resolve_config(&cli)?;
    if let Some(fps) = cli.fps {
        config.target_fps = fps;
    }

    // 4. Start the capture session
    let mode = cli.capture_mode()?;
    let mut session = vp_audio::start_session(mode, config)?;

    // 5. Watch stdin so Enter stops a duration-less run
    let (quit_tx, quit_rx) = flume::bounded::<()>(1);
    std::thread::Builder::new()
        .name("vp-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            let _ = quit_tx.send(());
        })?;

    let deadline = cli
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    log::info!("listening ({mode:?}); press Enter to stop");

    // 6. Status loop
    loop {
        if quit_rx.try_recv().is_ok() {
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        let snapshot = session.snapshot();
        print_status(&snapshot);
        std::thread::sleep(STATUS_PERIOD);
    }

    println!();
    session.stop();
    Ok(())
}

/// One carriage-returned status line per refresh.
fn print_status(data: &AudioData) {
    print!(
        "\r{:>3} bpm [{:<11}] {:<9} conf {:>3.0}%  energy {} {}",
        data.bpm,
        data.bpm_status.as_str(),
        data.mood.as_str(),
        data.mood_confidence * 100.0,
        level_bar(data.energy),
        if data.beat { "*" } else { " " },
    );
    let _ = std::io::stdout().flush();
}

/// 10-slot unicode level meter.
fn level_bar(level: f32) -> String {
    let filled = (level.clamp(0.0, 1.0) * 10.0).round() as usize;
    let mut bar = String::with_capacity(10 * 3);
    for i in 0..10 {
        bar.push(if i < filled { '█' } else { '░' });
    }
    bar
}

/// Load the analysis config, warning and defaulting when the file is
/// missing.
fn resolve_config(cli: &cli::Cli) -> Result<AnalysisConfig> {
    if cli.config.exists() {
        vp_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config not found: {}. Using defaults.",
            cli.config.display()
        );
        Ok(AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bar_is_always_ten_slots() {
        assert_eq!(level_bar(0.0).chars().count(), 10);
        assert_eq!(level_bar(0.5).chars().count(), 10);
        assert_eq!(level_bar(2.0).chars().count(), 10);
        assert!(level_bar(1.0).chars().all(|c| c == '█'));
        assert!(level_bar(0.0).chars().all(|c| c == '░'));
    }
}
