//! REPL – the interactive armsim shell.
//!
//! Every script statement (see [`crate::script`]) works at the prompt, one
//! at a time, waiting for completion. Slash-commands:
//!   /help         – show this list
//!   /schema       – print the JSON schema of wire commands
//!   /quit | /exit – leave the shell

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use armsim_runtime::ArmClient;
use armsim_types::command_schema;
use tokio::runtime::Runtime;

use crate::script::{self, Outcome};

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(rt: &Runtime, arm: &ArmClient, line_steps: u32, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "armsim>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/help" => cmd_help(),
            "/schema" => cmd_schema(),
            "/quit" | "/exit" => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            other if other.starts_with('/') => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
            statement => run_statement(rt, arm, statement, line_steps),
        }
    }
}

fn run_statement(rt: &Runtime, arm: &ArmClient, input: &str, line_steps: u32) {
    let stmt = match script::parse_line(input, line_steps) {
        Ok(Some(stmt)) => stmt,
        Ok(None) => return,
        Err(e) => {
            println!("{}: {}", "Parse error".red(), e);
            return;
        }
    };
    match rt.block_on(script::execute(arm, stmt)) {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => println!("{}: {}", "Simulation unavailable".red(), e),
    }
}

fn print_outcome(outcome: &Outcome) {
    let line = outcome.to_json().to_string();
    match outcome {
        Outcome::Completed(event) if event.is_ok() => println!("  {}", line.green()),
        Outcome::Completed(_) => println!("  {}", line.red()),
        Outcome::Ack(_) => println!("  {}", line.dimmed()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Slash-commands
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Arm statements".bold().underline());
    println!("  {}                    – drive both joints to 0°", "home".bold().cyan());
    println!("  {}         – drive to joint angles (degrees)", "set_joints A B".bold().cyan());
    println!("  {}              – move the effector to (x, y)", "move_to X Y".bold().cyan());
    println!("  {}   – straight line, optional step count", "line_to X Y [STEPS]".bold().cyan());
    println!("  {}                 – wait S seconds", "sleep S".bold().cyan());
    println!("  {}                 – set the speed scale (0..1)", "speed V".bold().cyan());
    println!("  {}              – clear the toolpath", "reset_path".bold().cyan());
    println!("  {}                    – abort running and queued commands", "stop".bold().cyan());
    println!("  {}                   – stop, home, default speed, clear path", "reset".bold().cyan());
    println!("  {}                  – show the arm state", "status".bold().cyan());
    println!("  {}                – a raw wire command", "{\"id\": …}".bold().cyan());
    println!();
    println!("{}", "Shell".bold().underline());
    println!("  {}   – JSON schema of wire commands", "/schema".bold().cyan());
    println!("  {}  – exit the shell", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_schema() {
    match serde_json::to_string_pretty(&command_schema()) {
        Ok(schema) => println!("{schema}"),
        Err(e) => println!("{}: {}", "Schema error".red(), e),
    }
}
