use anyhow::{Context, Result, bail};
use colored::Colorize;
use log::info;
use snipscope::host::ActiveEditor;
use snipscope::orchestrator::{Command, EditorEvent, Orchestrator};
use snipscope::settings::Settings;
use snipscope::tree::SnippetTree;
use std::fs;
use std::path::{Path, PathBuf};

use super::host::{TerminalHost, launch_editor};
use super::tree::display_forest;

/// Prints both trees, or only the global one.
pub fn list(orchestrator: &Orchestrator, global_only: bool) {
    if !global_only {
        display_forest("WORKSPACE SNIPPETS", orchestrator.scope().forest());
    }
    display_forest("USER SNIPPETS", orchestrator.global().forest());
}

/// Maps a scope group argument to its collection path. A file label
/// (`app` for `app.code-snippets`) is accepted as well as a path.
pub fn resolve_group(orchestrator: &Orchestrator, global: bool, group: &str) -> String {
    if global {
        return group.to_string();
    }
    orchestrator
        .scope()
        .forest()
        .groups()
        .find(|g| g.label == group)
        .map(|g| g.path.display().to_string())
        .unwrap_or_else(|| group.to_string())
}

/// Lines `FROM:TO` of `text`, 1-based and inclusive. `FROM:` runs to the end.
pub fn select_lines(text: &str, range: &str) -> Result<String> {
    let (from, to) = range
        .split_once(':')
        .with_context(|| format!("Invalid line range \"{range}\", expected FROM:TO"))?;
    let from: usize = from
        .trim()
        .parse()
        .with_context(|| format!("Invalid start line in \"{range}\""))?;
    let lines: Vec<&str> = text.lines().collect();
    let to: usize = match to.trim() {
        "" => lines.len(),
        to => to
            .parse()
            .with_context(|| format!("Invalid end line in \"{range}\""))?,
    };
    if from == 0 || from > to || to > lines.len() {
        bail!(
            "Line range {range} is outside 1:{} of the file",
            lines.len()
        );
    }
    Ok(lines[from - 1..to].join("\n"))
}

/// Makes `file` (or a line range of it) the active selection and converts it.
/// `Ok(false)` when the conversion failed and was already shown to the user.
pub async fn convert(
    host: &TerminalHost,
    orchestrator: &mut Orchestrator,
    settings: &Settings,
    file: &Path,
    range: Option<&str>,
) -> Result<bool> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let selection = match range {
        Some(range) => select_lines(&text, range)?,
        None => text.clone(),
    };
    let language_id = settings.language_for(file).unwrap_or("plaintext").to_string();
    info!("converting selection from {} as {language_id}", file.display());

    host.set_editor(ActiveEditor {
        path: file.to_path_buf(),
        language_id,
        text,
        selection,
    });
    Ok(orchestrator
        .execute(host, &Command::ConvertSelection)
        .await
        .is_ok())
}

/// Feeds a file saved outside this process back as a save event.
/// `Ok(false)` when applying it failed and was already shown to the user.
pub async fn saved(host: &TerminalHost, orchestrator: &mut Orchestrator, path: &Path) -> Result<bool> {
    let path = absolute(path)?;
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(orchestrator
        .handle(host, EditorEvent::DocumentSaved { path, text })
        .await
        .is_ok())
}

/// Opens every document the last command opened in an external editor and
/// reports the ones that changed as saved. `Ok(false)` when any of them
/// could not be applied.
pub async fn edit_opened(host: &TerminalHost, orchestrator: &mut Orchestrator) -> Result<bool> {
    let mut applied = true;
    while let Some(path) = host.next_opened() {
        let before = fs::read_to_string(&path).unwrap_or_default();
        println!(
            "{}  {} {}",
            "┃".bright_magenta(),
            "Editing".bright_blue(),
            path.display().to_string().bright_black().italic()
        );
        launch_editor(&path)?;

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if text == before {
            println!("{}  No changes", "┃".bright_magenta());
            continue;
        }
        applied &= orchestrator
            .handle(host, EditorEvent::DocumentSaved { path, text })
            .await
            .is_ok();
    }
    Ok(applied)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(path))
}
