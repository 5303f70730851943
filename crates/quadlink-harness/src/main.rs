//! Scripted session runner.
//!
//! Creates a session over the deterministic scripted core, plays a canned
//! input script for the requested number of frames, and prints (or writes)
//! a JSON report with frame and state digests.

use std::path::PathBuf;
use std::process;

use log::info;
use quadlink_core::HostButton;
use quadlink_harness::{InputScript, RecordingHost, RunReport, ScriptedFactory};
use quadlink_session::{LinkMode, Session, SessionConfig};

struct CliArgs {
    instances: usize,
    frames: u64,
    link: bool,
    rumble_period: Option<u16>,
    report_path: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        instances: 2,
        frames: 600,
        link: false,
        rumble_period: None,
        report_path: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--instances" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.instances = s.parse().unwrap_or(2);
                }
            }
            "--frames" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frames = s.parse().unwrap_or(600);
                }
            }
            "--link" => {
                cli.link = true;
            }
            "--rumble" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.rumble_period = s.parse().ok();
                }
            }
            "--report" => {
                i += 1;
                cli.report_path = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                eprintln!("Usage: quadlink-harness [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --instances <n>  Instances to run, 1..=4 [default: 2]");
                eprintln!("  --frames <n>     Frames to run [default: 600]");
                eprintln!("  --link           Wire the serial link cable");
                eprintln!("  --rumble <n>     Scripted motor period in frames");
                eprintln!("  --report <file>  Write the JSON report here (default: stdout)");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Canned ROM image: seed bytes for the scripted core.
fn scripted_rom() -> Vec<u8> {
    (0u8..64).map(|i| i.wrapping_mul(37) ^ 0x5A).collect()
}

/// Canned input: every port mashes A and holds its direction for a while.
fn scripted_input(instances: usize, frames: u64) -> InputScript {
    let directions = [
        HostButton::Right,
        HostButton::Left,
        HostButton::Up,
        HostButton::Down,
    ];
    let mut script = InputScript::new();
    for port in 0..instances {
        for frame in (10..frames).step_by(7) {
            script.tap(port, HostButton::A, frame);
        }
        script.hold(port, directions[port % 4], 20, frames.saturating_sub(20));
    }
    script
}

fn main() {
    env_logger::init();
    let cli = parse_args();

    let host = RecordingHost::new();
    let link = if cli.link {
        LinkMode::Cable
    } else {
        LinkMode::Broadcast
    };
    let mut session = Session::new(
        host.bundle(scripted_input(cli.instances, cli.frames)),
        SessionConfig {
            instances: cli.instances,
            link,
        },
    );

    let mut factory = ScriptedFactory::new();
    if let Some(period) = cli.rumble_period {
        factory = factory.with_rumble_period(period);
    }
    if let Err(e) = session.load(&factory, &scripted_rom(), None) {
        eprintln!("Load error: {e}");
        process::exit(1);
    }
    info!(
        "running {} frame(s) over {} instance(s), link {:?}",
        cli.frames, cli.instances, link
    );

    for _ in 0..cli.frames {
        session.run_frame();
    }

    let report = RunReport::from_session(&session, host.motor.peak());
    let json = match serde_json::to_string_pretty(&report) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Report error: {e}");
            process::exit(1);
        }
    };
    match cli.report_path {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, json) {
                eprintln!("Write error ({}): {e}", path.display());
                process::exit(1);
            }
        }
        None => println!("{json}"),
    }
}
