//! CLI Module for snipscope
//! Drives the snippet trees from a terminal: prompts are answered on stdin
//! and snippet documents are edited in an external editor.

pub mod commands;
pub mod host;
pub mod tree;

use anyhow::{Context, Result};
use colored::Colorize;
use snipscope::orchestrator::{Command, Orchestrator};
use snipscope::settings::Settings;
use snipscope::syntax::{CommentResolver, DirectoryConfigSource};
use snipscope::tree::TreeCommand;
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;

use self::host::TerminalHost;

/// Executes CLI commands based on the provided arguments. Failures already
/// shown to the user turn into [`ExitCode::FAILURE`].
pub async fn execute_cli(args: &[String], settings: Settings) -> Result<ExitCode> {
    let global = args.iter().any(|arg| arg == "--global" || arg == "-g");
    let args: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|arg| *arg != "--global" && *arg != "-g")
        .collect();

    let Some(&name) = args.first() else {
        print_help();
        return Ok(ExitCode::SUCCESS);
    };
    if name == "help" {
        print_help();
        return Ok(ExitCode::SUCCESS);
    }

    let workspace = std::env::current_dir().context("Failed to get current directory")?;
    let host = TerminalHost::new(vec![workspace], settings.languages.clone());
    let syntax = Rc::new(CommentResolver::new(DirectoryConfigSource::new(
        settings.language_config_dirs.clone(),
    )));
    let mut orchestrator = Orchestrator::new(&settings, syntax);
    let activated = orchestrator.activate(&host).await.is_ok();

    let command = match name {
        "list" | "ls" => {
            commands::list(&orchestrator, global);
            return Ok(exit_code(activated));
        }
        "search" | "find" => TreeCommand::Search,
        "add-group" => TreeCommand::AddGroup,
        "add-snippet" => TreeCommand::AddSnippet {
            group: args
                .get(1)
                .map(|group| commands::resolve_group(&orchestrator, global, group)),
        },
        "edit-group" | "delete-group" => {
            let Some(group) = args.get(1) else {
                missing_argument(name, "<GROUP>");
                return Ok(ExitCode::FAILURE);
            };
            let group = commands::resolve_group(&orchestrator, global, group);
            if name == "edit-group" {
                TreeCommand::EditGroup { group }
            } else {
                TreeCommand::DeleteGroup { group }
            }
        }
        "edit-snippet" | "delete-snippet" => {
            let (Some(group), Some(key)) = (args.get(1), args.get(2)) else {
                missing_argument(name, "<GROUP> <KEY>");
                return Ok(ExitCode::FAILURE);
            };
            let group = commands::resolve_group(&orchestrator, global, group);
            let key = key.to_string();
            if name == "edit-snippet" {
                TreeCommand::EditSnippet { group, key }
            } else {
                TreeCommand::DeleteSnippet { group, key }
            }
        }
        "convert" => {
            let Some(file) = args.get(1) else {
                missing_argument(name, "<FILE> [FROM:TO]");
                return Ok(ExitCode::FAILURE);
            };
            let converted = commands::convert(
                &host,
                &mut orchestrator,
                &settings,
                Path::new(file),
                args.get(2).copied(),
            )
            .await?;
            let applied = commands::edit_opened(&host, &mut orchestrator).await?;
            return Ok(exit_code(activated && converted && applied));
        }
        "saved" => {
            let Some(path) = args.get(1) else {
                missing_argument(name, "<PATH>");
                return Ok(ExitCode::FAILURE);
            };
            let applied = commands::saved(&host, &mut orchestrator, Path::new(path)).await?;
            return Ok(exit_code(activated && applied));
        }
        _ => {
            println!("{}  Unknown command: {}", "┃".bright_magenta(), name);
            print_help();
            return Ok(ExitCode::FAILURE);
        }
    };

    let command = if global {
        Command::Global(command)
    } else {
        Command::Scope(command)
    };
    let executed = orchestrator.execute(&host, &command).await.is_ok();
    let applied = commands::edit_opened(&host, &mut orchestrator).await?;
    Ok(exit_code(activated && executed && applied))
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn missing_argument(name: &str, usage: &str) {
    println!("{}  Error: Missing argument", "┃".bright_magenta());
    println!(
        "{}  Usage: snipscope {name} [--global] {usage}",
        "┃".bright_magenta()
    );
}

/// Prints the help message with available commands
fn print_help() {
    println!(
        "{}  {}",
        "┃".bright_magenta(),
        "SNIPSCOPE - EDITOR SNIPPET MANAGER".bold()
    );

    println!("{}  {}", "┃".bright_magenta(), "USAGE:".bright_yellow());
    println!("{}  snipscope [COMMAND] [--global] [ARGS]", "┃".bright_magenta());
    println!("{}  {}", "┃".bright_magenta(), "COMMANDS:".bright_yellow());
    for (usage, about) in [
        ("list, ls", "Show snippet files and their snippets"),
        ("search, find", "Pick a snippet file, then a snippet to edit"),
        ("add-group", "Create a snippet file"),
        ("add-snippet [GROUP]", "Add a snippet to a snippet file"),
        ("edit-group <GROUP>", "Open a snippet file in your editor"),
        ("delete-group <GROUP>", "Delete a snippet file"),
        ("edit-snippet <GROUP> <KEY>", "Edit one snippet as annotated text"),
        ("delete-snippet <GROUP> <KEY>", "Delete one snippet"),
        ("convert <FILE> [FROM:TO]", "Turn a file or line range into a snippet"),
        ("saved <PATH>", "Apply a snippet document saved elsewhere"),
        ("help", "Display this help message"),
    ] {
        println!(
            "{}  {:<30} {}",
            "┃".bright_magenta(),
            usage.bright_white(),
            about
        );
    }

    println!("{}  {}", "┃".bright_magenta(), "TIP:".bright_green());
    println!(
        "{}  GROUP is a workspace snippet file (name or path), or a language id with --global",
        "┃".bright_magenta()
    );
}
