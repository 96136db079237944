use std::io::{self, BufRead};
use std::time::Instant;

use tracing::error;

mod app;

fn main() {
    let mut runner = match app::build_app() {
        Ok(runner) => runner,
        Err(startup_error) => {
            error!(error = %startup_error, "startup_failed");
            eprintln!("{startup_error}");
            std::process::exit(1);
        }
    };

    println!("landscope round runner; type 'help' for commands");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match app::parse_command(trimmed) {
            Ok(app::Command::Quit) => {
                println!("bye");
                break;
            }
            Ok(command) => {
                for output in runner.execute(command, Instant::now()) {
                    println!("{output}");
                }
            }
            Err(message) => println!("{message}"),
        }
    }
}
