//! `armsim-cli` – drive a simulated 2-link arm from the terminal.
//!
//! This binary plays the script-agent role against the execution engine. It:
//!
//! 1. Loads `~/.armsim/config.toml`, writing the defaults on first run.
//! 2. Starts a [`SimulationDriver`] on a tokio runtime.
//! 3. Runs the script file given as the first argument, or drops into the
//!    interactive REPL when there is none.
//! 4. Maps **Ctrl-C** to Stop: every running and queued command fails with
//!    `stopped` and the CLI exits.

mod config;
mod repl;
mod script;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use armsim_engine::SimulationContext;
use armsim_runtime::{SimulationDriver, init_tracing};

fn main() -> ExitCode {
    let telemetry = init_tracing("armsim");
    info!(otlp = telemetry.is_exporting(), "tracing initialised");
    let script_path = std::env::args().nth(1);

    if script_path.is_none() {
        print_banner();
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            info!(path = %config::config_path().display(), "config loaded");
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    let model = match cfg.arm_model() {
        Ok(model) => model,
        Err(e) => {
            eprintln!("{}: {}", "Invalid arm configuration".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Simulation ────────────────────────────────────────────────────────
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = SimulationContext::with_default_speed(model, cfg.default_speed);
    let (driver, arm) = SimulationDriver::new(ctx, &cfg.driver_config());
    let driver_task = rt.spawn(driver.run());

    // ── Ctrl-C → Stop ─────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    let arm_ctrlc = arm.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the arm …".yellow().bold());
        match arm_ctrlc.stop_blocking() {
            Ok(aborted) => println!("  {} {} command(s) aborted.", "✓".green(), aborted),
            Err(e) => println!("  {}: {}", "Stop failed".red(), e),
        }
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will not stop the arm");
    }

    let code = match script_path {
        Some(path) => run_script_file(&rt, &arm, &path, cfg.line_steps),
        None => {
            println!("  Type {} for a list of commands.\n", "/help".bold().cyan());
            repl::run(&rt, &arm, cfg.line_steps, shutdown);
            ExitCode::SUCCESS
        }
    };

    // The Ctrl-C handler keeps a client alive, so end the driver explicitly.
    if let Err(e) = rt.block_on(arm.stop()) {
        warn!(error = %e, "final stop failed");
    }
    driver_task.abort();
    code
}

fn run_script_file(
    rt: &tokio::runtime::Runtime,
    arm: &armsim_runtime::ArmClient,
    path: &str,
    line_steps: u32,
) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}: {}: {}", "Cannot read script".red(), path, e);
            return ExitCode::FAILURE;
        }
    };
    let mut stdout = std::io::stdout();
    match rt.block_on(script::run_script(arm, &source, line_steps, &mut stdout)) {
        Ok(executed) => {
            info!(path, executed, "script finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Script aborted".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn first_run() -> config::Config {
    let cfg = config::Config::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    let mut cfg = cfg;
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___                 _         "#.bold().cyan());
    println!("{}", r#"  / _ | ______ _  ___ (_)_ _    "#.bold().cyan());
    println!("{}", r#" / __ |/ __/  ' \(_-</ /  ' \   "#.bold().cyan());
    println!("{}", r#"/_/ |_/_/ /_/_/_/___/_/_/_/_/   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "armsim".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Two-link planar arm simulator");
    println!();
}
