//! Interactive session.
//!
//! Reads one command per line from stdin while calls are in flight, so a new
//! `select` can supersede an analysis that has not answered yet.

use std::path::PathBuf;

use anyhow::Result;
use piiguard_config::Config;
use piiguard_core::render::{render_redacted_image, render_result, render_view};
use piiguard_core::{AnalysisResult, OperationState, SelectedFile};
use piiguard_engine::UploadOrchestrator;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Select(PathBuf),
    Analyze,
    Status,
    Save(PathBuf),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "" => Command::Empty,
        "select" | "open" if !rest.is_empty() => Command::Select(PathBuf::from(rest)),
        "analyze" | "upload" => Command::Analyze,
        "status" => Command::Status,
        "save" if !rest.is_empty() => Command::Save(PathBuf::from(rest)),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  select <path>   choose a document (.pdf, .jpg, .jpeg, .png)");
    println!("  analyze         upload and analyze the selected document");
    println!("  status          show the current state and result");
    println!("  save <path>     write the redacted image to disk");
    println!("  quit            leave the session");
}

pub async fn handle(config: &Config) -> Result<()> {
    let mut orchestrator = super::build_orchestrator(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_help();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Command::Quit => break,
                    command => run_command(&mut orchestrator, config, command).await,
                }
            }
            Some(completion) = orchestrator.next_completion(), if orchestrator.has_pending_calls() => {
                let before = orchestrator.state();
                orchestrator.handle_completion(completion);
                if orchestrator.state() != before {
                    report(&mut orchestrator, before);
                }
            }
        }
    }

    orchestrator.teardown();
    Ok(())
}

async fn run_command(orchestrator: &mut UploadOrchestrator, config: &Config, command: Command) {
    match command {
        Command::Select(path) => {
            match SelectedFile::from_path(&path, config.selection.max_bytes).await {
                Ok(file) => {
                    orchestrator.select_file(file);
                    print!("{}", render_view(&orchestrator.view()));
                }
                Err(e) => println!("✗ {}", e),
            }
        }
        Command::Analyze => {
            if orchestrator.start_analysis() {
                println!("Processing document...");
            } else if orchestrator.is_loading() {
                println!("Still processing the current document.");
            } else {
                println!("Select a file first.");
            }
        }
        Command::Status => {
            let stats = orchestrator.previews().stats();
            println!("State: {}", orchestrator.state().as_str());
            println!(
                "Previews: {} live ({} created, {} released)",
                stats.live, stats.created, stats.released
            );
            print!("{}", render_view(&orchestrator.view()));
        }
        Command::Save(dest) => match super::save_redacted(orchestrator, &dest).await {
            Ok(true) => println!("✓ Saved redacted image to {}", dest.display()),
            Ok(false) => println!("No redacted image available."),
            Err(e) => println!("✗ {}", e),
        },
        Command::Help => print_help(),
        Command::Empty | Command::Quit => {}
        Command::Unknown(line) => println!("Unknown command: {} (try `help`)", line),
    }
}

fn report(orchestrator: &mut UploadOrchestrator, before: OperationState) {
    if orchestrator.state() == OperationState::Failed {
        if let Some(notice) = orchestrator.take_notice() {
            println!("✗ {}", notice.message);
        }
        return;
    }

    if let Some(text) = progress_report(before, orchestrator.state(), orchestrator.result()) {
        print!("{}", text);
    }
}

/// Text for a successful state change. The full result is printed once, when
/// it is published; finishing a redaction only adds the image line.
fn progress_report(
    before: OperationState,
    after: OperationState,
    result: Option<&AnalysisResult>,
) -> Option<String> {
    let result = result?;
    match (before, after) {
        (_, OperationState::ImageRedacting) => Some(format!(
            "{}\nAnalysis complete, waiting for redacted image...\n",
            render_result(result)
        )),
        (OperationState::ImageRedacting, OperationState::Done) => {
            Some(match &result.redacted_image {
                Some(handle) => format!("{}\n", render_redacted_image(handle)),
                None => "Redacted image unavailable.\n".to_string(),
            })
        }
        (_, OperationState::Done) => Some(render_result(result)),
        _ => None,
    }
}
