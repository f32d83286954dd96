/*
 *  tests/monitor_integration.rs
 *
 *  oledmon - system monitor for SSD1306 panels
 *  (c) 2020-26 Stuart Hunter
 *
 *  End-to-end checks through the public API: config file -> manager ->
 *  supervisor tick -> pixels on a recording panel
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

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_graphics::pixelcolor::BinaryColor;
use tempfile::TempDir;

use oledmon::config::{self, Cli};
use oledmon::display::{DeviceOpener, DisplayDevice, DisplayError, DisplayManager, FontSet};
use oledmon::frame::{build_frame, FrameLayout};
use oledmon::supervisor::{Supervisor, SupervisorState};
use oledmon::telemetry::{HostTelemetry, TelemetrySample, TelemetrySource};
use oledmon::vframebuf::VarFrameBuf;

#[derive(Default)]
struct Recorded {
    commands: Vec<u8>,
    frames: Vec<VarFrameBuf<BinaryColor>>,
    closed: usize,
}

struct RecordingPanel {
    canvas: VarFrameBuf<BinaryColor>,
    log: Arc<Mutex<Recorded>>,
}

impl DisplayDevice for RecordingPanel {
    fn command(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.log.lock().unwrap().commands.push(byte);
        Ok(())
    }

    fn canvas(&mut self) -> &mut VarFrameBuf<BinaryColor> {
        &mut self.canvas
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.log.lock().unwrap().frames.push(self.canvas.clone());
        Ok(())
    }

    fn hide(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.canvas.clear_color(BinaryColor::Off);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingOpener {
    log: Arc<Mutex<Recorded>>,
}

impl DeviceOpener for RecordingOpener {
    type Device = RecordingPanel;

    fn open(&mut self, _port: u8, _address: u8) -> Result<RecordingPanel, DisplayError> {
        Ok(RecordingPanel {
            canvas: VarFrameBuf::new(128, 64, BinaryColor::Off),
            log: Arc::clone(&self.log),
        })
    }
}

struct StaticTelemetry;

impl TelemetrySource for StaticTelemetry {
    fn sample(&mut self) -> TelemetrySample {
        TelemetrySample {
            interface: "eth0".into(),
            ip_address: "192.168.1.20".into(),
            temperature_c: 45.0,
            frequency_mhz: 1800.0,
            timestamp: "2024-05-01 12:34:56".into(),
        }
    }
}

fn lit_rows(fb: &VarFrameBuf<BinaryColor>) -> Vec<u32> {
    (0..64)
        .filter(|&y| (0..128).any(|x| fb.pixel(x, y) == Some(BinaryColor::On)))
        .collect()
}

fn cli_with_config(path: PathBuf) -> Cli {
    Cli { config: Some(path), ..Cli::default() }
}

#[test]
fn config_file_drives_panel_setup() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("oledmon.yaml");
    fs::write(
        &path,
        "monitor:\n  i2c_address: \"0x3D\"\n  refresh_interval: 2\ndisplay:\n  horizontal_mirror: 1\n  vertical_mirror: 0\n  y_offset: 2\n",
    )
    .unwrap();

    let cfg = config::load(&cli_with_config(path)).unwrap();
    assert_eq!(cfg.display.i2c_address, 0x3D);
    assert_eq!(cfg.display.refresh_interval(), Duration::from_secs(2));

    let opener = RecordingOpener::default();
    let log = Arc::clone(&opener.log);
    let mut manager = DisplayManager::new(opener, cfg.display.clone(), FontSet::for_size(cfg.font.font_size))
        .with_settle_delay(Duration::ZERO);
    assert!(manager.init_display());
    assert_eq!(log.lock().unwrap().commands, vec![0xA1, 0xC0, 0xD3, 2]);
}

#[test]
fn missing_explicit_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let cfg = config::load(&cli_with_config(tmp.path().join("absent.yaml"))).unwrap();
    assert_eq!(cfg.display.i2c_port, 6);
    assert_eq!(cfg.display.i2c_address, 0x3C);
    assert_eq!(cfg.network_interface, "eth0");
}

#[test]
fn malformed_yaml_fails_startup() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.yaml");
    fs::write(&path, "monitor: [not, a, map").unwrap();
    assert!(config::load(&cli_with_config(path)).is_err());
}

#[test]
fn tick_draws_three_rows_inside_the_panel() {
    let opener = RecordingOpener::default();
    let log = Arc::clone(&opener.log);
    let cfg = config::resolve(config::FileConfig::default()).unwrap();
    let manager = DisplayManager::new(opener, cfg.display, FontSet::for_size(10))
        .with_settle_delay(Duration::ZERO);

    let mut supervisor = Supervisor::new(manager, StaticTelemetry, FrameLayout::default());
    assert_eq!(supervisor.tick(), SupervisorState::Running);

    let recorded = log.lock().unwrap();
    let frame = recorded.frames.last().unwrap();
    let rows = lit_rows(frame);
    assert!(!rows.is_empty());
    assert!(*rows.first().unwrap() >= 16);
    assert!(*rows.last().unwrap() < 46);
    // frequency column is populated
    assert!((72..128).any(|x| (26..36).any(|y| frame.pixel(x, y) == Some(BinaryColor::On))));
}

#[test]
fn dropping_supervisor_releases_panel() {
    let opener = RecordingOpener::default();
    let log = Arc::clone(&opener.log);
    let cfg = config::resolve(config::FileConfig::default()).unwrap();
    let manager = DisplayManager::new(opener, cfg.display, FontSet::for_size(10))
        .with_settle_delay(Duration::ZERO);

    let mut supervisor = Supervisor::new(manager, StaticTelemetry, FrameLayout::default());
    supervisor.tick();
    drop(supervisor);
    assert_eq!(log.lock().unwrap().closed, 1);
}

#[test]
fn host_telemetry_falls_back_on_missing_sensors() {
    let tmp = TempDir::new().unwrap();
    let mut host = HostTelemetry::new(
        "definitely-not-an-interface0",
        tmp.path().join("temp"),
        tmp.path().join("freq"),
    );
    assert_eq!(host.interface(), "definitely-not-an-interface0");
    let sample = host.sample();
    assert_eq!(sample.interface, host.interface());
    assert_eq!(sample.ip_address, "ip:N/A");
    assert_eq!(sample.temperature_c, 0.0);
    assert_eq!(sample.frequency_mhz, 0.0);

    let frame = build_frame(&sample, &FrameLayout { x_offset: 2 });
    assert_eq!(frame.glyphs()[0].text, "definitely-not-an-interface0:ip:N/A");
    assert_eq!(frame.glyphs()[0].x, 2);
}
