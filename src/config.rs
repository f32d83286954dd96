/*
 *  config.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use log::{error, info, warn};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::display::traits::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

pub const DEFAULT_I2C_PORT: u8 = 6;
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3C;
pub const DEFAULT_REFRESH_SECS: u64 = 1;
pub const DEFAULT_RESET_SECS: u64 = 3600;
pub const DEFAULT_INTERFACE: &str = "eth0";
pub const DEFAULT_FONT_PATH: &str = "NotoMono-Regular.ttf";
pub const DEFAULT_FONT_ZH_PATH: &str = "wqy-microhei.ttc";
pub const DEFAULT_FONT_SIZE: u32 = 10;
pub const DEFAULT_TEMP_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const DEFAULT_FREQ_PATH: &str = "/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq";
pub const DEFAULT_HORIZONTAL_MIRROR: bool = false;
pub const DEFAULT_VERTICAL_MIRROR: bool = true;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "oledmon", version, about = "SSD1306 OLED system monitor")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Append log output to this file instead of stderr
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,
    /// I2C bus number (/dev/i2c-N)
    #[arg(long)]
    pub i2c_port: Option<u8>,
    /// I2C address, hex (0x3C) or decimal
    #[arg(long, value_parser = parse_address_arg)]
    pub i2c_address: Option<u8>,
    /// Refresh interval in seconds
    #[arg(long = "refresh")]
    pub refresh_interval: Option<u64>,
    /// Periodic panel reset interval in seconds
    #[arg(long)]
    pub reset_interval: Option<u64>,
    /// Network interface shown on the first row
    #[arg(long = "interface")]
    pub network_interface: Option<String>,
    #[arg(long = "font", value_hint = ValueHint::FilePath)]
    pub font_path: Option<String>,
    #[arg(long = "font-zh", alias = "font_zh", value_hint = ValueHint::FilePath)]
    pub font_zh_path: Option<String>,
    #[arg(long)]
    pub font_size: Option<u32>,
    /// Mirror horizontally (0|1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub horizontal_mirror: Option<u8>,
    /// Mirror vertically (0|1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub vertical_mirror: Option<u8>,
    #[arg(long, allow_negative_numbers = true)]
    pub x_offset: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    pub y_offset: Option<i32>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub cpu_temp_path: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub cpu_freq_path: Option<PathBuf>,
    /// Niceness increment applied at startup
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    pub nice: i32,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Layered file representation. Every field is optional so a file may set
/// only what it cares about.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub monitor: MonitorSection,
    pub display: DisplaySection,
    pub soc: SocSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorSection {
    pub i2c_port: Option<u8>,
    pub i2c_address: Option<AddressValue>,
    pub refresh_interval: Option<u64>,
    pub reset_interval: Option<u64>,
    pub network_interface: Option<String>,
    pub font_path: Option<String>,
    pub font_zh_path: Option<String>,
    pub font_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DisplaySection {
    pub horizontal_mirror: Option<u8>,
    pub vertical_mirror: Option<u8>,
    pub x_offset: Option<i32>,
    pub y_offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SocSection {
    pub cpu_temp_path: Option<PathBuf>,
    pub cpu_freq_path: Option<PathBuf>,
}

/// Addresses may be written as a YAML integer or as "0x3C" / "60".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressValue {
    Number(u64),
    Text(String),
}

/// Panel wiring and behaviour. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayConfig {
    pub i2c_port: u8,
    pub i2c_address: u8,
    pub width: u32,
    pub height: u32,
    pub horizontal_mirror: bool,
    pub vertical_mirror: bool,
    pub x_offset: i32,
    pub y_offset: i32,
    pub reset_interval_secs: u64,
    pub refresh_interval_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            i2c_port: DEFAULT_I2C_PORT,
            i2c_address: DEFAULT_I2C_ADDRESS,
            width: DISPLAY_WIDTH,
            height: DISPLAY_HEIGHT,
            horizontal_mirror: DEFAULT_HORIZONTAL_MIRROR,
            vertical_mirror: DEFAULT_VERTICAL_MIRROR,
            x_offset: 0,
            y_offset: 0,
            reset_interval_secs: DEFAULT_RESET_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
        }
    }
}

impl DisplayConfig {
    pub fn reset_interval(&self) -> Duration {
        Duration::from_secs(self.reset_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Y offset as the 0xD3 argument: the panel shifts COM lines modulo its height.
    pub fn display_offset(&self) -> u8 {
        self.y_offset.rem_euclid(self.height as i32) as u8
    }

    /// linux i2c-dev node for the configured port
    pub fn bus_path(&self) -> String {
        format!("/dev/i2c-{}", self.i2c_port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontConfig {
    pub font_path: String,
    pub font_zh_path: String,
    pub font_size: u32,
}

/// Everything the daemon needs after defaults, file and CLI are merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorConfig {
    pub display: DisplayConfig,
    pub network_interface: String,
    pub font: FontConfig,
    pub cpu_temp_path: PathBuf,
    pub cpu_freq_path: PathBuf,
}

impl MonitorConfig {
    /// One log line per effective setting
    pub fn log_summary(&self) {
        let d = &self.display;
        info!("=== oledmon configuration ===");
        info!("I2C port: {} ({})", d.i2c_port, d.bus_path());
        info!("I2C address: 0x{:02X}", d.i2c_address);
        info!("Refresh interval: {}s", d.refresh_interval_secs);
        info!("Reset interval: {}s", d.reset_interval_secs);
        info!("Network interface: {}", self.network_interface);
        info!("Font: {} (size: {}px)", self.font.font_path, self.font.font_size);
        info!("Font (zh): {} (size: {}px)", self.font.font_zh_path, self.font.font_size);
        info!("CPU temperature path: {}", self.cpu_temp_path.display());
        info!("CPU frequency path: {}", self.cpu_freq_path.display());
        info!("Horizontal mirror: {}", d.horizontal_mirror as u8);
        info!("Vertical mirror: {}", d.vertical_mirror as u8);
        info!("X offset: {}", d.x_offset);
        info!("Y offset: {}", d.y_offset);
    }
}

/// Public entry point: read YAML, merge CLI, validate.
pub fn load(cli: &Cli) -> Result<MonitorConfig, ConfigError> {
    let mut layered = FileConfig::default();

    match cli.config.as_ref() {
        Some(p) if p.exists() => {
            merge(&mut layered, read_yaml(p)?);
            info!("Loaded config file {}", p.display());
        }
        Some(p) => {
            warn!("Config file {} does not exist, using defaults", p.display());
        }
        None => match find_config_file() {
            Some(p) => {
                merge(&mut layered, read_yaml(&p)?);
                info!("Loaded config file {}", p.display());
            }
            None => info!("No config file found, using defaults"),
        },
    }

    apply_cli_overrides(&mut layered, cli);
    resolve(layered)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    let p = PathBuf::from("/etc/oledmon.yaml");
    if p.exists() { return Some(p) }
    if let Some(home) = home_dir() {
        let p = home.join(".config/oledmon/config.yaml");
        if p.exists() { return Some(p) }
    }
    let p = PathBuf::from("oledmon.yaml");
    if p.exists() { return Some(p) }
    None
}

fn read_yaml(path: &Path) -> Result<FileConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<FileConfig, ConfigError> {
    // an empty file is a valid "no overrides" file
    if s.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    Ok(serde_yaml::from_str(s)?)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut FileConfig, src: FileConfig) {
    let (m, s) = (&mut dst.monitor, src.monitor);
    if s.i2c_port.is_some()          { m.i2c_port = s.i2c_port; }
    if s.i2c_address.is_some()       { m.i2c_address = s.i2c_address; }
    if s.refresh_interval.is_some()  { m.refresh_interval = s.refresh_interval; }
    if s.reset_interval.is_some()    { m.reset_interval = s.reset_interval; }
    if s.network_interface.is_some() { m.network_interface = s.network_interface; }
    if s.font_path.is_some()         { m.font_path = s.font_path; }
    if s.font_zh_path.is_some()      { m.font_zh_path = s.font_zh_path; }
    if s.font_size.is_some()         { m.font_size = s.font_size; }

    let (d, s) = (&mut dst.display, src.display);
    if s.horizontal_mirror.is_some() { d.horizontal_mirror = s.horizontal_mirror; }
    if s.vertical_mirror.is_some()   { d.vertical_mirror = s.vertical_mirror; }
    if s.x_offset.is_some()          { d.x_offset = s.x_offset; }
    if s.y_offset.is_some()          { d.y_offset = s.y_offset; }

    let (c, s) = (&mut dst.soc, src.soc);
    if s.cpu_temp_path.is_some()     { c.cpu_temp_path = s.cpu_temp_path; }
    if s.cpu_freq_path.is_some()     { c.cpu_freq_path = s.cpu_freq_path; }
}

pub fn apply_cli_overrides(cfg: &mut FileConfig, cli: &Cli) {
    let m = &mut cfg.monitor;
    if cli.i2c_port.is_some()          { m.i2c_port = cli.i2c_port; }
    if let Some(a) = cli.i2c_address   { m.i2c_address = Some(AddressValue::Number(a as u64)); }
    if cli.refresh_interval.is_some()  { m.refresh_interval = cli.refresh_interval; }
    if cli.reset_interval.is_some()    { m.reset_interval = cli.reset_interval; }
    if cli.network_interface.is_some() { m.network_interface = cli.network_interface.clone(); }
    if cli.font_path.is_some()         { m.font_path = cli.font_path.clone(); }
    if cli.font_zh_path.is_some()      { m.font_zh_path = cli.font_zh_path.clone(); }
    if cli.font_size.is_some()         { m.font_size = cli.font_size; }

    let d = &mut cfg.display;
    if cli.horizontal_mirror.is_some() { d.horizontal_mirror = cli.horizontal_mirror; }
    if cli.vertical_mirror.is_some()   { d.vertical_mirror = cli.vertical_mirror; }
    if cli.x_offset.is_some()          { d.x_offset = cli.x_offset; }
    if cli.y_offset.is_some()          { d.y_offset = cli.y_offset; }

    let c = &mut cfg.soc;
    if cli.cpu_temp_path.is_some()     { c.cpu_temp_path = cli.cpu_temp_path.clone(); }
    if cli.cpu_freq_path.is_some()     { c.cpu_freq_path = cli.cpu_freq_path.clone(); }
}

/// Fill defaults and check invariants.
pub fn resolve(cfg: FileConfig) -> Result<MonitorConfig, ConfigError> {
    let FileConfig { monitor, display, soc } = cfg;

    let i2c_address = match monitor.i2c_address {
        None => DEFAULT_I2C_ADDRESS,
        Some(value) => address_or_default(&value),
    };

    let display = DisplayConfig {
        i2c_port: monitor.i2c_port.unwrap_or(DEFAULT_I2C_PORT),
        i2c_address,
        horizontal_mirror: flag(display.horizontal_mirror, DEFAULT_HORIZONTAL_MIRROR, "horizontal_mirror")?,
        vertical_mirror: flag(display.vertical_mirror, DEFAULT_VERTICAL_MIRROR, "vertical_mirror")?,
        x_offset: display.x_offset.unwrap_or(0),
        y_offset: display.y_offset.unwrap_or(0),
        reset_interval_secs: monitor.reset_interval.unwrap_or(DEFAULT_RESET_SECS),
        refresh_interval_secs: monitor.refresh_interval.unwrap_or(DEFAULT_REFRESH_SECS),
        ..DisplayConfig::default()
    };

    let resolved = MonitorConfig {
        display,
        network_interface: monitor.network_interface.unwrap_or_else(|| DEFAULT_INTERFACE.to_string()),
        font: FontConfig {
            font_path: monitor.font_path.unwrap_or_else(|| DEFAULT_FONT_PATH.to_string()),
            font_zh_path: monitor.font_zh_path.unwrap_or_else(|| DEFAULT_FONT_ZH_PATH.to_string()),
            font_size: monitor.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        },
        cpu_temp_path: soc.cpu_temp_path.unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_PATH)),
        cpu_freq_path: soc.cpu_freq_path.unwrap_or_else(|| PathBuf::from(DEFAULT_FREQ_PATH)),
    };

    validate(&resolved)?;
    Ok(resolved)
}

fn flag(value: Option<u8>, default: bool, name: &str) -> Result<bool, ConfigError> {
    match value {
        None => Ok(default),
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        Some(other) => Err(ConfigError::Validation(format!("{} must be 0 or 1, got {}", name, other))),
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &MonitorConfig) -> Result<(), ConfigError> {
    if cfg.display.refresh_interval_secs == 0 {
        return Err(ConfigError::Validation("refresh_interval must be >= 1 second".into()));
    }
    if cfg.display.reset_interval_secs == 0 {
        return Err(ConfigError::Validation("reset_interval must be >= 1 second".into()));
    }
    if !(1..=64).contains(&cfg.font.font_size) {
        return Err(ConfigError::Validation("font_size must be 1..=64".into()));
    }
    let d = &cfg.display;
    if d.x_offset.unsigned_abs() > d.width {
        return Err(ConfigError::Validation(format!("x_offset must be within -{0}..={0}", d.width)));
    }
    if d.y_offset.unsigned_abs() > d.height {
        return Err(ConfigError::Validation(format!("y_offset must be within -{0}..={0}", d.height)));
    }
    if cfg.network_interface.trim().is_empty() {
        return Err(ConfigError::Validation("network_interface must not be empty".into()));
    }
    Ok(())
}

/// Parse "0x3C", "0X3c" or "60" as a 7-bit I2C address.
pub fn parse_address(text: &str) -> Option<u8> {
    let t = text.trim();
    let value = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok()?,
        None => t.parse::<u8>().ok()?,
    };
    (value <= 0x7F).then_some(value)
}

fn parse_address_arg(text: &str) -> Result<u8, String> {
    parse_address(text).ok_or_else(|| format!("invalid I2C address '{}'", text))
}

/// Malformed addresses are not fatal: log and fall back to the stock 0x3C.
fn address_or_default(value: &AddressValue) -> u8 {
    let parsed = match value {
        AddressValue::Number(n) => u8::try_from(*n).ok().filter(|a| *a <= 0x7F),
        AddressValue::Text(t) => parse_address(t),
    };
    parsed.unwrap_or_else(|| {
        error!("Invalid I2C address {:?}, using default 0x{:02X}", value, DEFAULT_I2C_ADDRESS);
        DEFAULT_I2C_ADDRESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = resolve(FileConfig::default()).unwrap();
        assert_eq!(cfg.display.i2c_port, 6);
        assert_eq!(cfg.display.i2c_address, 0x3C);
        assert_eq!(cfg.display.refresh_interval(), Duration::from_secs(1));
        assert_eq!(cfg.display.reset_interval(), Duration::from_secs(3600));
        assert!(!cfg.display.horizontal_mirror);
        assert!(cfg.display.vertical_mirror);
        assert_eq!((cfg.display.width, cfg.display.height), (128, 64));
        assert_eq!(cfg.network_interface, "eth0");
    }

    #[test]
    fn test_address_forms() {
        assert_eq!(parse_address("0x3C"), Some(0x3C));
        assert_eq!(parse_address("0X3d"), Some(0x3D));
        assert_eq!(parse_address("60"), Some(60));
        assert_eq!(parse_address("0xZZ"), None);
        assert_eq!(parse_address("0x80"), None);
        assert_eq!(parse_address(""), None);
    }

    #[test]
    fn test_malformed_file_address_falls_back() {
        let mut f = FileConfig::default();
        f.monitor.i2c_address = Some(AddressValue::Text("sixty".into()));
        assert_eq!(resolve(f).unwrap().display.i2c_address, 0x3C);

        let mut f = FileConfig::default();
        f.monitor.i2c_address = Some(AddressValue::Number(300));
        assert_eq!(resolve(f).unwrap().display.i2c_address, 0x3C);
    }

    #[test]
    fn test_yaml_layer_then_cli_wins() {
        let yaml = r#"
monitor:
  i2c_port: 1
  i2c_address: "0x3D"
  network_interface: wlan0
display:
  horizontal_mirror: 1
  y_offset: 4
soc:
  cpu_freq_path: /tmp/freq
"#;
        let mut layered = FileConfig::default();
        merge(&mut layered, parse_yaml(yaml).unwrap());

        let cli = Cli {
            i2c_port: Some(3),
            y_offset: Some(-2),
            ..Cli::default()
        };
        apply_cli_overrides(&mut layered, &cli);
        let cfg = resolve(layered).unwrap();

        assert_eq!(cfg.display.i2c_port, 3);
        assert_eq!(cfg.display.i2c_address, 0x3D);
        assert_eq!(cfg.network_interface, "wlan0");
        assert!(cfg.display.horizontal_mirror);
        assert_eq!(cfg.display.y_offset, -2);
        assert_eq!(cfg.cpu_freq_path, PathBuf::from("/tmp/freq"));
        assert_eq!(cfg.cpu_temp_path, PathBuf::from(DEFAULT_TEMP_PATH));
    }

    #[test]
    fn test_integer_address_in_yaml() {
        let f = parse_yaml("monitor:\n  i2c_address: 61\n").unwrap();
        assert_eq!(resolve(f).unwrap().display.i2c_address, 61);
    }

    #[test]
    fn test_empty_yaml_is_defaults() {
        let f = parse_yaml("   \n").unwrap();
        assert_eq!(resolve(f).unwrap(), resolve(FileConfig::default()).unwrap());
    }

    #[test]
    fn test_validation_rejects() {
        let mut f = FileConfig::default();
        f.monitor.refresh_interval = Some(0);
        assert!(matches!(resolve(f), Err(ConfigError::Validation(_))));

        let mut f = FileConfig::default();
        f.display.vertical_mirror = Some(2);
        assert!(matches!(resolve(f), Err(ConfigError::Validation(_))));

        let mut f = FileConfig::default();
        f.monitor.font_size = Some(0);
        assert!(matches!(resolve(f), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_offsets_limited_to_panel() {
        let cli = Cli::try_parse_from(["oledmon", "--x-offset", "2147483647"]).unwrap();
        let mut layered = FileConfig::default();
        apply_cli_overrides(&mut layered, &cli);
        assert!(matches!(resolve(layered), Err(ConfigError::Validation(_))));

        let mut f = FileConfig::default();
        f.display.y_offset = Some(-65);
        assert!(matches!(resolve(f), Err(ConfigError::Validation(_))));

        let mut f = FileConfig::default();
        f.display.x_offset = Some(-128);
        f.display.y_offset = Some(64);
        let cfg = resolve(f).unwrap();
        assert_eq!((cfg.display.x_offset, cfg.display.y_offset), (-128, 64));
    }

    #[test]
    fn test_display_offset_wraps() {
        let mut d = DisplayConfig::default();
        d.y_offset = 5;
        assert_eq!(d.display_offset(), 5);
        d.y_offset = -1;
        assert_eq!(d.display_offset(), 63);
        d.y_offset = 64;
        assert_eq!(d.display_offset(), 0);
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let f = parse_yaml(include_str!("../config/oledmon.yaml")).unwrap();
        assert_eq!(resolve(f).unwrap(), resolve(FileConfig::default()).unwrap());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "oledmon", "--i2c-address", "0x3d", "--refresh", "2",
            "--horizontal-mirror", "1", "--x-offset", "-4", "--font_zh", "zh.ttc",
        ]).unwrap();
        assert_eq!(cli.i2c_address, Some(0x3D));
        assert_eq!(cli.refresh_interval, Some(2));
        assert_eq!(cli.horizontal_mirror, Some(1));
        assert_eq!(cli.x_offset, Some(-4));
        assert_eq!(cli.font_zh_path.as_deref(), Some("zh.ttc"));
        assert_eq!(cli.nice, 10);

        assert!(Cli::try_parse_from(["oledmon", "--vertical-mirror", "2"]).is_err());
        assert!(Cli::try_parse_from(["oledmon", "--i2c-address", "bogus"]).is_err());
    }
}
