/*
 *  telemetry.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
//! Host telemetry gathered from the network stack and /sys files.
//!
//! Every query here degrades to a fallback value instead of failing; the
//! panel shows a stale or zero reading and the log carries the detail.

use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{error, info, warn};
use thiserror::Error;

/// Shown in place of an address when the interface has no IPv4
pub const IP_UNAVAILABLE: &str = "ip:N/A";

/// Thermal zones probed when the configured sensor path is missing
pub const TEMP_PATH_CANDIDATES: [&str; 3] = [
    "/sys/class/thermal/thermal_zone0/temp",
    "/sys/class/thermal/thermal_zone1/temp",
    "/sys/devices/virtual/thermal/thermal_zone0/temp",
];

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("no network interfaces available")]
    NoInterfaces,
}

/// One tick worth of readings
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    pub interface: String,
    pub ip_address: String,
    pub temperature_c: f64,
    pub frequency_mhz: f64,
    pub timestamp: String,
}

/// Anything that can produce a sample on demand.
pub trait TelemetrySource {
    fn sample(&mut self) -> TelemetrySample;
}

/// Reads the live host.
#[derive(Debug, Clone)]
pub struct HostTelemetry {
    interface: String,
    temp_path: PathBuf,
    freq_path: PathBuf,
}

impl HostTelemetry {
    pub fn new(interface: impl Into<String>, temp_path: impl Into<PathBuf>, freq_path: impl Into<PathBuf>) -> Self {
        Self {
            interface: interface.into(),
            temp_path: temp_path.into(),
            freq_path: freq_path.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl TelemetrySource for HostTelemetry {
    fn sample(&mut self) -> TelemetrySample {
        TelemetrySample {
            interface: self.interface.clone(),
            ip_address: ip_address(&self.interface),
            temperature_c: cpu_temperature(&self.temp_path),
            frequency_mhz: cpu_frequency(&self.freq_path),
            timestamp: current_time(),
        }
    }
}

/// All (interface, address) pairs the host reports. Empty on error.
pub fn interface_addresses() -> Vec<(String, IpAddr)> {
    match local_ip_address::list_afinet_netifas() {
        Ok(list) => list,
        Err(e) => {
            error!("Failed to enumerate network interfaces: {}", e);
            Vec::new()
        }
    }
}

/// First IPv4 address bound to `interface`, if any.
pub fn first_ipv4(addrs: &[(String, IpAddr)], interface: &str) -> Option<Ipv4Addr> {
    addrs.iter()
        .filter(|(name, _)| name == interface)
        .find_map(|(_, ip)| match ip {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
}

/// Address text for the network row.
pub fn ip_address(interface: &str) -> String {
    format_ip(first_ipv4(&interface_addresses(), interface))
}

pub fn format_ip(ip: Option<Ipv4Addr>) -> String {
    ip.map(|v4| v4.to_string())
        .unwrap_or_else(|| IP_UNAVAILABLE.to_string())
}

/// Interface names in first-seen order, duplicates removed.
pub fn interface_names(addrs: &[(String, IpAddr)]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (name, _) in addrs {
        if !names.iter().any(|n| n == name) {
            names.push(name.clone());
        }
    }
    names
}

/// Startup check: keep `configured` when it carries an address, otherwise
/// fall back to the first interface that does.
pub fn select_interface(configured: &str, addrs: &[(String, IpAddr)]) -> Result<String, TelemetryError> {
    let names = interface_names(addrs);
    if names.iter().any(|n| n == configured) {
        return Ok(configured.to_string());
    }

    warn!("Network interface '{}' has no addresses", configured);
    info!("Available interfaces: {:?}", names);

    match names.into_iter().next() {
        Some(first) => {
            info!("Using interface: {}", first);
            Ok(first)
        }
        None => {
            error!("No usable network interface");
            Err(TelemetryError::NoInterfaces)
        }
    }
}

/// Reads the first number in a sysfs file.
fn read_first_float_from_file(path: &Path) -> io::Result<f64> {
    let content = fs::read_to_string(path)?;
    let first_word = content.split_whitespace().next().unwrap_or("");
    first_word.parse::<f64>().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Raw sysfs value divided by 1000, or 0.0 with a warning.
fn read_scaled(path: &Path, what: &str) -> f64 {
    if !path.exists() {
        warn!("{} path does not exist: {}", what, path.display());
        return 0.0;
    }
    match read_first_float_from_file(path) {
        Ok(raw) => raw / 1000.0,
        Err(e) => {
            warn!("Failed to read {} from {}: {}", what, path.display(), e);
            0.0
        }
    }
}

/// CPU temperature in Celsius (sysfs reports millidegrees).
pub fn cpu_temperature(path: &Path) -> f64 {
    read_scaled(path, "CPU temperature")
}

/// CPU clock in MHz (cpufreq reports kHz).
pub fn cpu_frequency(path: &Path) -> f64 {
    read_scaled(path, "CPU frequency")
}

/// Local wall-clock time for the clock row.
pub fn current_time() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Use `configured` when present, otherwise the first thermal zone that exists.
pub fn resolve_temp_path(configured: &Path) -> PathBuf {
    resolve_temp_path_from(configured, &TEMP_PATH_CANDIDATES)
}

fn resolve_temp_path_from(configured: &Path, candidates: &[&str]) -> PathBuf {
    if configured.exists() {
        return configured.to_path_buf();
    }
    candidates.iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .unwrap_or_else(|| configured.to_path_buf())
}
