/*
 *  main.rs
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

use std::fs::OpenOptions;

use anyhow::Context;
use clap::Parser;
use env_logger::{Env, Target};
use log::{debug, error, info, warn};

use oledmon::config::{self, Cli};
use oledmon::display::{DisplayManager, FontSet, Ssd1306Opener};
use oledmon::frame::FrameLayout;
use oledmon::supervisor::{Supervisor, TerminationSignals};
use oledmon::telemetry::{self, HostTelemetry};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn main() {
    let cli = Cli::parse();
    let log_fallback = init_logging(&cli);

    info!("{} - SSD1306 system monitor", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    if let Some(reason) = log_fallback {
        warn!("{}, logging to stderr", reason);
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

/// Returns why the log file was not used, if one was asked for and failed.
fn init_logging(cli: &Cli) -> Option<String> {
    let mut builder = env_logger::Builder::from_env(
        Env::default().default_filter_or(if cli.debug { "debug" } else { "info" }),
    );
    builder.format_timestamp_secs();

    let mut fallback = None;
    if let Some(path) = cli.log_file.as_ref() {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => fallback = Some(format!("Cannot open log file {}: {}", path.display(), e)),
        }
    }
    builder.init();
    fallback
}

/// Run at a lower scheduling priority; the monitor is never urgent.
fn lower_priority(increment: i32) {
    if increment == 0 {
        return;
    }
    // SAFETY: nice(2) takes a plain int and only touches this process
    let niceness = unsafe { libc::nice(increment) };
    if niceness == -1 {
        debug!("nice({}) returned -1: {}", increment, std::io::Error::last_os_error());
    } else {
        debug!("Process niceness now {}", niceness);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&cfg).context("serializing configuration")?);
        return Ok(0);
    }

    lower_priority(cli.nice);
    cfg.log_summary();

    let temp_path = telemetry::resolve_temp_path(&cfg.cpu_temp_path);
    if temp_path != cfg.cpu_temp_path {
        info!("Using CPU temperature path: {}", temp_path.display());
        cfg.cpu_temp_path = temp_path;
    }

    let addrs = telemetry::interface_addresses();
    cfg.network_interface = telemetry::select_interface(&cfg.network_interface, &addrs)?;

    // TrueType paths are kept for config compatibility, text uses built-in faces
    let fonts = FontSet::for_size(cfg.font.font_size);
    debug!("Fonts: {:?} for requested {} / {}", fonts, cfg.font.font_path, cfg.font.font_zh_path);

    let mut signals = TerminationSignals::install().context("installing signal handlers")?;

    let mut manager = DisplayManager::new(Ssd1306Opener, cfg.display.clone(), fonts);
    if !manager.init_display() {
        warn!("Display not ready at startup, retrying on the first tick");
    }

    let telemetry = HostTelemetry::new(
        cfg.network_interface.clone(),
        cfg.cpu_temp_path.clone(),
        cfg.cpu_freq_path.clone(),
    );
    info!("Monitoring interface {}", telemetry.interface());
    let layout = FrameLayout { x_offset: cfg.display.x_offset };

    info!("Press Ctrl+C to exit");
    let mut supervisor = Supervisor::new(manager, telemetry, layout);
    let reason = supervisor.run(signals.recv()).await;

    info!("Monitor stopped: {:?}", reason);
    Ok(reason.exit_code())
}
