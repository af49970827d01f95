//! Available commands and autocomplete logic

use crate::resources::ResourceDef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: String,
  pub aliases: Vec<String>,
  pub description: String,
}

impl Command {
  fn new(name: &str, aliases: &[&str], description: &str) -> Self {
    Self {
      name: name.to_string(),
      aliases: aliases.iter().map(|a| a.to_string()).collect(),
      description: description.to_string(),
    }
  }
}

/// Built-in page commands: name, aliases, description
const PAGE_COMMANDS: &[(&str, &[&str], &str)] = &[
  ("hosting", &["h", "servers"], "Servers, costs and projects"),
  ("avito", &["a"], "Avito messenger chats"),
  ("chats", &["c", "messages"], "Internal chats"),
];

/// Commands for every resource page, followed by `quit`.
pub fn command_list(defs: &[ResourceDef]) -> Vec<Command> {
  let mut commands: Vec<Command> = defs
    .iter()
    .map(|def| match PAGE_COMMANDS.iter().find(|(name, ..)| *name == def.name) {
      Some((name, aliases, description)) => Command::new(name, aliases, description),
      None => Command::new(&def.name, &[], &def.title),
    })
    .collect();

  commands.push(Command::new("quit", &["q", "exit"], "Exit agency-dash"));
  commands
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions<'a>(commands: &'a [Command], input: &str) -> Vec<&'a Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return commands.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in commands {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.iter().any(|a| *a == input_lower) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, priority));
  }

  // Stable sort keeps list order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
