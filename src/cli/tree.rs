use colored::Colorize;
use snipscope::tree::Forest;

/// Prints a forest with box-drawing guides under a `title` heading.
pub fn display_forest(title: &str, forest: &Forest) {
    println!("{}  {}", "┃".bright_magenta(), title.bright_yellow());

    if forest.is_empty() {
        println!("{}  {}", "┃".bright_magenta(), "(no snippet files)".bright_black());
        return;
    }

    let count = forest.len();
    for (idx, group) in forest.groups().enumerate() {
        let last_group = idx == count - 1;
        let connector = if last_group { "└── " } else { "├── " };
        let description = group.description.as_deref().unwrap_or_default();
        println!(
            "{}  {}{} {}",
            "┃".bright_magenta(),
            connector,
            group.label.bold(),
            description.bright_black().italic()
        );

        let guide = if last_group { "    " } else { "┃   " };
        let leaves = group.children.len();
        for (i, leaf) in group.children.iter().enumerate() {
            let connector = if i == leaves - 1 { "└── " } else { "├── " };
            let description = leaf
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or_default();
            println!(
                "{}  {}{}{} {}",
                "┃".bright_magenta(),
                guide,
                connector,
                leaf.key.bright_white(),
                description.bright_black()
            );
        }
    }
}
