use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, ATTRIBUTE_COMMANDS, NO_ARG_COMMANDS, NUMERIC_ARG_COMMANDS,
    OPTIONAL_ARG_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.command_args.insert(key.to_string(), value);
        self
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

/// Quotes are optional: `/style "Monochrome zen"` and `/style Monochrome zen` agree.
/// Unquoted input skips shell splitting so a bare `#rrggbb` is not read as a comment.
fn join_args(arg: &str) -> String {
    if arg.contains(['"', '\'']) {
        return split_args(arg).join(" ");
    }
    arg.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn attribute_key(action: &str) -> &'static str {
    match action {
        "load_history" => "index",
        "remove_favorite" => "timestamp",
        "download" => "dir",
        "add_favorite" => "url",
        "set_theme" => "theme",
        _ => "value",
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop");
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return Intent::new("unknown")
            .with_arg("arg", Value::String(raw_trimmed.to_string()));
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return Intent::new("unknown")
            .with_arg("arg", Value::String(raw_trimmed.to_string()));
    }

    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, ATTRIBUTE_COMMANDS) {
        return Intent::new(action)
            .with_arg(attribute_key(action), Value::String(join_args(arg)));
    }

    if let Some(action) = find_action(&command, NUMERIC_ARG_COMMANDS) {
        let value = join_args(arg)
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null);
        return Intent::new(action).with_arg(attribute_key(action), value);
    }

    if let Some(action) = find_action(&command, OPTIONAL_ARG_COMMANDS) {
        let joined = join_args(arg);
        let value = if joined.is_empty() {
            Value::Null
        } else {
            Value::String(joined)
        };
        return Intent::new(action).with_arg(attribute_key(action), value);
    }

    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return Intent::new(action);
    }

    Intent::new("unknown")
        .with_arg("command", Value::String(command))
        .with_arg("arg", Value::String(arg.to_string()))
}
