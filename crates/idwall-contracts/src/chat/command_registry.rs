#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// `/role Founder / Builder` style setters; the whole tail is the value.
pub(crate) const ATTRIBUTE_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "role",
        action: "set_role",
    },
    CommandSpec {
        command: "mindset",
        action: "set_mindset",
    },
    CommandSpec {
        command: "style",
        action: "set_style",
    },
    CommandSpec {
        command: "device",
        action: "set_device",
    },
    CommandSpec {
        command: "accent",
        action: "set_accent",
    },
];

pub(crate) const NUMERIC_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "load",
        action: "load_history",
    },
    CommandSpec {
        command: "unfavorite",
        action: "remove_favorite",
    },
];

pub(crate) const OPTIONAL_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "download",
        action: "download",
    },
    CommandSpec {
        command: "favorite",
        action: "add_favorite",
    },
    CommandSpec {
        command: "theme",
        action: "set_theme",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "surprise",
        action: "surprise",
    },
    CommandSpec {
        command: "show",
        action: "show",
    },
    CommandSpec {
        command: "prompt",
        action: "show_prompt",
    },
    CommandSpec {
        command: "history",
        action: "list_history",
    },
    CommandSpec {
        command: "favorites",
        action: "list_favorites",
    },
    CommandSpec {
        command: "clear_history",
        action: "clear_history",
    },
    CommandSpec {
        command: "options",
        action: "list_options",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/role",
    "/mindset",
    "/style",
    "/device",
    "/accent",
    "/show",
    "/prompt",
    "/generate",
    "/surprise",
    "/history",
    "/favorites",
    "/load",
    "/favorite",
    "/unfavorite",
    "/download",
    "/clear_history",
    "/theme",
    "/options",
    "/quit",
];
