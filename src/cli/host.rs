//! Terminal implementation of the editor host: prompts on stdin, messages on
//! stdout, documents opened in an external editor.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use colored::Colorize;
use log::debug;
use snipscope::host::{ActiveEditor, Host, NodeRef, PickItem, View};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const FALLBACK_EDITORS: [&str; 3] = ["nvim", "vim", "nano"];

pub struct TerminalHost {
    stdin: RefCell<Option<Lines<BufReader<Stdin>>>>,
    workspace: Vec<PathBuf>,
    languages: Vec<String>,
    editor: RefCell<Option<ActiveEditor>>,
    /// Documents opened during the current command, edited once it returns.
    opened: RefCell<VecDeque<PathBuf>>,
}

impl TerminalHost {
    pub fn new(workspace: Vec<PathBuf>, languages: Vec<String>) -> Self {
        Self {
            stdin: RefCell::new(Some(BufReader::new(tokio::io::stdin()).lines())),
            workspace,
            languages,
            editor: RefCell::new(None),
            opened: RefCell::new(VecDeque::new()),
        }
    }

    pub fn set_editor(&self, editor: ActiveEditor) {
        *self.editor.borrow_mut() = Some(editor);
    }

    pub fn next_opened(&self) -> Option<PathBuf> {
        self.opened.borrow_mut().pop_front()
    }

    async fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{}  {} ", "┃".bright_magenta(), prompt.bright_yellow());
        let _ = std::io::stdout().flush();

        let mut lines = self.stdin.borrow_mut().take()?;
        let line = lines.next_line().await.ok().flatten();
        *self.stdin.borrow_mut() = Some(lines);
        line.map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
    }
}

#[async_trait(?Send)]
impl Host for TerminalHost {
    async fn pick(&self, items: &[PickItem], placeholder: &str) -> Option<usize> {
        println!("{}  {}", "┃".bright_magenta(), placeholder.bold());
        for (idx, item) in items.iter().enumerate() {
            let description = item.description.as_deref().unwrap_or_default();
            println!(
                "{}  {}. {} {}",
                "┃".bright_magenta(),
                (idx + 1).to_string().yellow(),
                item.label.bright_white(),
                description.bright_black()
            );
        }

        let answer = self.read_line(">").await?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=items.len()).contains(&n) => Some(n - 1),
            _ => items.iter().position(|item| item.label == answer),
        }
    }

    async fn input(&self, placeholder: &str) -> Option<String> {
        self.read_line(&format!("{placeholder}:")).await
    }

    async fn offer(&self, message: &str, action: &str) -> bool {
        println!("{}  {}", "┃".bright_magenta(), message);
        self.read_line(&format!("{action}? [y/N]"))
            .await
            .is_some_and(|answer| answer.eq_ignore_ascii_case("y"))
    }

    async fn open_document(&self, path: &Path, language_id: Option<&str>) -> Result<String> {
        debug!("open {} as {language_id:?}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut opened = self.opened.borrow_mut();
        if !opened.iter().any(|p| p == path) {
            opened.push_back(path.to_path_buf());
        }
        Ok(text)
    }

    async fn replace_document(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    fn active_editor(&self) -> Option<ActiveEditor> {
        self.editor.borrow().clone()
    }

    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.workspace.clone()
    }

    fn show_info(&self, message: &str) {
        println!("{}  {}", "┃".bright_magenta(), message.bright_green());
    }

    fn show_warning(&self, message: &str) {
        println!("{}  {}", "┃".bright_magenta(), message.bright_yellow());
    }

    fn show_error(&self, message: &str) {
        eprintln!("{}  {} {}", "┃".bright_magenta(), "Error:".bright_red(), message);
    }

    fn reveal(&self, view: View, node: &NodeRef) {
        let target = match &node.key {
            Some(key) => format!("{} › {key}", node.group.display()),
            None => node.group.display().to_string(),
        };
        println!(
            "{}  {} {}",
            "┃".bright_magenta(),
            format!("[{view:?}]").bright_blue(),
            target.bright_black().italic()
        );
    }

    fn tree_changed(&self, view: View) {
        debug!("{view:?} tree changed");
    }
}

/// Editor command candidates: `$VISUAL`, `$EDITOR`, then common fallbacks.
fn editor_commands() -> Vec<Vec<String>> {
    let configured = ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .map(|value| value.split_whitespace().map(str::to_owned).collect::<Vec<_>>())
        .filter(|parts| !parts.is_empty());
    configured
        .chain(FALLBACK_EDITORS.iter().map(|e| vec![e.to_string()]))
        .collect()
}

/// Opens `path` in the first editor that launches and waits for it to exit.
pub fn launch_editor(path: &Path) -> Result<()> {
    for parts in editor_commands() {
        let Some((program, args)) = parts.split_first() else {
            continue;
        };
        match Command::new(program).args(args).arg(path).status() {
            Ok(status) => {
                debug!("{program} exited with {status}");
                return Ok(());
            }
            Err(err) => debug!("could not launch {program}: {err}"),
        }
    }
    bail!("Could not launch any editor (set $EDITOR, or install nvim, vim or nano)")
}
