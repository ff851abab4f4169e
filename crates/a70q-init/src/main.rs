//! a70q init helper
//!
//! Runs once at boot before the HAL services start:
//! 1. Detect the retail variant from the bootloader version
//! 2. Write the product property overrides
//! 3. Probe the display and touch nodes
//!
//! In recovery, `verify-bootloader <supported>` prints `1` when the
//! installed bootloader is newer than the package supports, `0` otherwise.

use a70q_config::{HalConfig, PropertyStore, detect_model, verify_bootloader};
use a70q_hal::{DisplayConfig, SunlightEnhancement, TouchConfig, TouchscreenGesture};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
enum BootStage {
    Identity,
    Hardware,
}

impl BootStage {
    fn name(&self) -> &'static str {
        match self {
            BootStage::Identity => "identity",
            BootStage::Hardware => "hardware",
        }
    }
}

/// Boot-time identity and HAL bring-up for the Galaxy A70
#[derive(Debug, Parser)]
#[command(name = "a70q-init", version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: standard search paths)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print 1 when the installed bootloader is newer than supported, else 0
    VerifyBootloader {
        /// Supported bootloader revision (leading digit is used)
        supported: String,
    },
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => HalConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => HalConfig::load_default().context("Failed to load configuration")?,
    };

    let mut store = PropertyStore::load(&config.properties.store_path).with_context(|| {
        format!(
            "Failed to read properties from {}",
            config.properties.store_path.display()
        )
    })?;
    let bootloader = store
        .get_or(&config.properties.bootloader_property, "")
        .to_string();

    match cli.command {
        Some(Commands::VerifyBootloader { supported }) => {
            let needs_update = verify_bootloader(&bootloader, &supported)
                .context("Bootloader verification failed")?;
            println!("{}", if needs_update { "1" } else { "0" });
            Ok(())
        }
        None => boot(&config, &mut store, &bootloader),
    }
}

fn boot(config: &HalConfig, store: &mut PropertyStore, bootloader: &str) -> Result<()> {
    let boot_start = Instant::now();
    info!("a70q init starting...");

    let stage_start = Instant::now();
    let identity = detect_model(bootloader);
    identity.apply(store);
    store
        .save(&config.properties.store_path)
        .context("Failed to write property overrides")?;
    log_stage_complete(BootStage::Identity, stage_start);

    let stage_start = Instant::now();
    probe_display(config);
    probe_touch(config);
    log_stage_complete(BootStage::Hardware, stage_start);

    info!("Init complete in {:?}", boot_start.elapsed());
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false))
        .init();
}

fn display_config(config: &HalConfig) -> DisplayConfig {
    DisplayConfig {
        brightness_path: config.display.brightness_path.clone(),
        sunlight_level: config.display.sunlight_level.clone(),
        boost_level: config.display.boost_level.clone(),
        restore_delay: Duration::from_millis(config.display.restore_delay_ms),
    }
}

fn probe_display(config: &HalConfig) {
    let sunlight = SunlightEnhancement::new(&display_config(config));
    if sunlight.is_supported() {
        info!(
            "Sunlight enhancement available (enabled: {})",
            sunlight.is_enabled()
        );
    } else {
        warn!(
            "Backlight node {} not writable, sunlight enhancement disabled",
            config.display.brightness_path.display()
        );
    }
}

fn probe_touch(config: &HalConfig) {
    let touch = TouchscreenGesture::new(&TouchConfig {
        cmd_path: config.touch.cmd_path.clone(),
    });
    if !touch.is_supported() {
        warn!("TSP command node {} missing", config.touch.cmd_path.display());
        return;
    }
    for gesture in touch.supported_gestures() {
        info!(
            "Gesture {} ({}) keycode {:#x}",
            gesture.id, gesture.name, gesture.keycode
        );
    }
}

fn log_stage_complete(stage: BootStage, start: Instant) {
    info!("Stage {} complete in {:?}", stage.name(), start.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(list: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("a70q-init").chain(list.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command() {
        let cli = parse(&[]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_verify_bootloader_command() {
        let cli = parse(&["--config", "/tmp/hal.toml", "verify-bootloader", "7"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/hal.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::VerifyBootloader { ref supported }) if supported == "7"
        ));
    }

    #[test]
    fn test_verify_bootloader_requires_revision() {
        assert!(parse(&["verify-bootloader"]).is_err());
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["reboot"]).is_err());
    }

    #[test]
    fn test_display_config_mapping() {
        let mut config = HalConfig::default();
        config.display.restore_delay_ms = 250;
        let display = display_config(&config);
        assert_eq!(display.restore_delay, Duration::from_millis(250));
        assert_eq!(display.sunlight_level, "365");
    }
}
