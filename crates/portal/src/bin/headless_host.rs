//! # PORTAL Headless Host
//!
//! Runs the bridge natively with a stand-in page and a demo application.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: threaded, parked waits, 60 Hz
//! RUST_LOG=info ./headless_host
//!
//! # Cooperative mode from a config file
//! RUST_LOG=portal=debug ./headless_host cooperative.toml
//! ```
//!
//! The host posts `GET_STATE`, `FULLSCREEN`, `MENU` and `QUIT`. The demo
//! application answers each one, holds a fake block while the "menu" is
//! open (cooperative mode), and exits on `QUIT`.

use std::process::ExitCode;

use portal::platform::{PortalConfig, ThreadingMode};
use portal::{Application, Flow, Frame, HostRequest, Runtime, RuntimeResult};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Iterations the menu stays open.
const MENU_ITERATIONS: u64 = 10;

/// Gives up if `QUIT` never arrives.
const MAX_ITERATIONS: u64 = 600;

#[derive(Default)]
struct DemoApplication {
    buffer: Vec<u8>,
    menu_until: Option<u64>,
}

impl DemoApplication {
    fn handle(&mut self, command: &[u8], frame: &mut Frame<'_>) -> Flow {
        let reply: Vec<u8> = match command {
            b"GET_STATE" => format!("OK iteration={}", frame.iteration()).into_bytes(),
            b"FULLSCREEN" => {
                frame.runtime().request(HostRequest::Fullscreen(true));
                b"OK".to_vec()
            }
            b"MENU" => {
                if frame.runtime().mode() == ThreadingMode::Cooperative {
                    frame.pacer().enter_fake_block(16);
                }
                self.menu_until = Some(frame.iteration() + MENU_ITERATIONS);
                b"OK".to_vec()
            }
            b"QUIT" => {
                frame.channel().post_reply(b"BYE");
                return Flow::Exit;
            }
            other => {
                warn!(command = %String::from_utf8_lossy(other), "unknown command");
                b"ERR".to_vec()
            }
        };
        frame.channel().post_reply(&reply);
        Flow::Continue
    }
}

impl Application for DemoApplication {
    fn iterate(&mut self, frame: &mut Frame<'_>) -> Flow {
        if self.menu_until.is_some_and(|until| frame.iteration() >= until) {
            self.menu_until = None;
            if frame.pacer().state().fake_block {
                frame.pacer().exit_fake_block();
            }
            info!(iteration = frame.iteration(), "menu closed");
        }

        // Commands wait while the menu is open.
        if self.menu_until.is_none() {
            let max_len = frame.runtime().config().channel.max_message_len;
            let len = frame.channel().read_command(&mut self.buffer, max_len);
            if len > 0 {
                let command = std::mem::take(&mut self.buffer);
                let flow = self.handle(&command[..len], frame);
                self.buffer = command;
                if flow == Flow::Exit {
                    return flow;
                }
            }
        }

        if frame.iteration() >= MAX_ITERATIONS {
            warn!("no QUIT received, exiting");
            return Flow::Exit;
        }
        Flow::Continue
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run() -> RuntimeResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => PortalConfig::from_toml_file(path)?,
        None => PortalConfig::default(),
    };

    let (runtime, page) = Runtime::headless(config)?;
    let runtime = Runtime::install(runtime)?;

    for command in ["GET_STATE", "FULLSCREEN", "MENU", "GET_STATE", "QUIT"] {
        runtime.channel().post_command(command.as_bytes());
    }

    let summary = runtime.host_loop().run(DemoApplication::default())?;

    let mut reply = Vec::new();
    while runtime.channel().read_reply(&mut reply, 256) > 0 {
        info!(reply = %String::from_utf8_lossy(&reply), "reply");
    }

    info!(
        mode = %runtime.mode(),
        iterations = summary.stats.iterations,
        avg_ms = summary.stats.avg_iteration_ms(),
        drop_ratio = summary.stats.drop_ratio(),
        fullscreen = page.is_fullscreen(),
        diagnostics = ?summary.report.diagnostics,
        channel = ?summary.report.channel,
        "headless host finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "headless host failed");
            ExitCode::FAILURE
        }
    }
}
