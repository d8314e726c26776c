use std::io::{self, BufRead, ErrorKind, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Args, Parser, Subcommand};
use idwall_contracts::catalog::{
    accent_colors, normalize_accent_hex, DEFAULT_ACCENT_COLOR, DEFAULT_DEVICE, DEFAULT_MINDSET,
    DEFAULT_ROLE, DEFAULT_STYLE, DEVICES, MINDSETS, ROLES, STYLES,
};
use idwall_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS};
use idwall_contracts::prompt::AttributeSet;
use idwall_contracts::session::{FavoriteEntry, GenerationEntry, Theme};
use idwall_engine::{EngineConfig, WallpaperEngine, DEFAULT_SERVICE};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "idwall",
    version,
    about = "Identity wallpaper prompts, history and favorites"
)]
struct Cli {
    /// Where history, favorites, theme and the event log live.
    #[arg(long, global = true, env = "IDWALL_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Image service: pollinations or dryrun.
    #[arg(long, global = true, env = "IDWALL_SERVICE", default_value = DEFAULT_SERVICE)]
    service: String,
    /// Simulated processing delay before a generation completes.
    #[arg(long, global = true, env = "IDWALL_GENERATION_DELAY_MS", default_value_t = 1500)]
    delay_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the prompt for a set of attributes.
    Prompt(AttributeArgs),
    /// Generate a wallpaper URL and record it in history.
    Generate(AttributeArgs),
    /// Pick random attributes, then generate.
    Surprise(SurpriseArgs),
    History,
    Favorites,
    /// Show a history entry and the prompt it was built from.
    Load(LoadArgs),
    Favorite(TargetArgs),
    Unfavorite(UnfavoriteArgs),
    ClearHistory(ClearHistoryArgs),
    /// Set the theme, or toggle it when no value is given.
    Theme(ThemeArgs),
    Download(DownloadArgs),
    /// List the built-in attribute options.
    Options,
    /// Interactive session driven by slash commands.
    Chat,
}

#[derive(Debug, Args)]
struct AttributeArgs {
    #[arg(long, default_value = DEFAULT_ROLE)]
    role: String,
    #[arg(long, default_value = DEFAULT_MINDSET)]
    mindset: String,
    #[arg(long, default_value = DEFAULT_STYLE)]
    style: String,
    #[arg(long, default_value = DEFAULT_DEVICE, value_parser = ["mobile", "desktop"])]
    device: String,
    #[arg(long, default_value = DEFAULT_ACCENT_COLOR, value_parser = parse_accent)]
    accent: String,
}

impl AttributeArgs {
    fn into_attributes(self) -> AttributeSet {
        AttributeSet {
            role: self.role,
            mindset: self.mindset,
            style: self.style,
            device: self.device,
            accent_color: self.accent,
        }
    }
}

#[derive(Debug, Args)]
struct SurpriseArgs {
    #[arg(long, default_value = DEFAULT_DEVICE, value_parser = ["mobile", "desktop"])]
    device: String,
}

#[derive(Debug, Args)]
struct LoadArgs {
    index: usize,
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// History index to use (0 is newest).
    #[arg(long, default_value_t = 0, conflicts_with = "url")]
    index: usize,
    /// Use this image URL; it must be one recorded in history.
    #[arg(long)]
    url: Option<String>,
}

#[derive(Debug, Args)]
struct UnfavoriteArgs {
    timestamp: i64,
}

#[derive(Debug, Args)]
struct ClearHistoryArgs {
    /// Skip the confirmation question.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Args)]
struct ThemeArgs {
    theme: Option<Theme>,
}

#[derive(Debug, Args)]
struct DownloadArgs {
    #[command(flatten)]
    target: TargetArgs,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("idwall error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let command = match cli.command {
        Command::Prompt(args) => {
            println!("{}", args.into_attributes().prompt());
            return Ok(0);
        }
        Command::Options => {
            print_options();
            return Ok(0);
        }
        command => command,
    };

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let mut config = EngineConfig::new(data_dir);
    config.service = cli.service;
    config.generation_delay = Duration::from_millis(cli.delay_ms);
    let mut engine = WallpaperEngine::new(config)?;

    let result = dispatch(&mut engine, command);
    engine.finish()?;
    result
}

fn dispatch(engine: &mut WallpaperEngine, command: Command) -> Result<i32> {
    match command {
        Command::Prompt(_) | Command::Options => Ok(0),
        Command::Generate(args) => {
            engine.set_attributes(args.into_attributes());
            let entry = run_generation(engine, false)?;
            println!("{}", entry.url);
            Ok(0)
        }
        Command::Surprise(args) => {
            engine.set_device(args.device);
            let entry = run_generation(engine, true)?;
            print_attributes(&entry.attributes());
            println!("{}", entry.url);
            Ok(0)
        }
        Command::History => {
            print_history(engine);
            Ok(0)
        }
        Command::Favorites => {
            print_favorites(engine.favorites());
            Ok(0)
        }
        Command::Load(args) => {
            let entry = engine.load_from_history(args.index)?;
            print_attributes(&entry.attributes());
            println!();
            println!("{}", entry.attributes().prompt());
            println!();
            println!("{}", entry.url);
            Ok(0)
        }
        Command::Favorite(args) => {
            let url = select_target(engine, &args)?;
            favorite_current(engine, Some(&url))?;
            Ok(0)
        }
        Command::Unfavorite(args) => {
            let removed = engine.remove_favorite(args.timestamp)?;
            if removed == 0 {
                println!("No favorite with timestamp {}", args.timestamp);
                return Ok(1);
            }
            println!("Removed {removed} favorite(s)");
            Ok(0)
        }
        Command::ClearHistory(args) => {
            if !args.yes && !confirm("Clear all history?")? {
                println!("History kept");
                return Ok(0);
            }
            let removed = engine.clear_history()?;
            println!("Cleared {removed} history entries");
            Ok(0)
        }
        Command::Theme(args) => {
            let theme = match args.theme {
                Some(theme) => {
                    engine.set_theme(theme)?;
                    theme
                }
                None => engine.toggle_theme()?,
            };
            println!("Theme set to {theme}");
            Ok(0)
        }
        Command::Download(args) => {
            let url = select_target(engine, &args.target)?;
            let path = engine.download(Some(&url), &args.out)?;
            println!("Saved {}", path.display());
            Ok(0)
        }
        Command::Chat => {
            run_chat(engine)?;
            Ok(0)
        }
    }
}

fn run_chat(engine: &mut WallpaperEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    println!("Identity wallpaper session started. Type /help for commands.");
    println!("Theme: {}", engine.theme());
    println!("Event log: {}", engine.events_path().display());

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        let outcome = match intent.action.as_str() {
            "noop" => Ok(true),
            "quit" => Ok(false),
            action => handle_chat_action(engine, &mut input, action, &intent.command_args)
                .map(|()| true),
        };
        match outcome {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => println!("Error: {err:#}"),
        }
    }
    Ok(())
}

fn handle_chat_action(
    engine: &mut WallpaperEngine,
    input: &mut impl BufRead,
    action: &str,
    args: &std::collections::BTreeMap<String, Value>,
) -> Result<()> {
    match action {
        "help" => {
            println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
        }
        "set_role" | "set_mindset" | "set_style" => {
            let Some(value) = value_as_non_empty_string(args.get("value")) else {
                bail!("/{} needs a value", action.trim_start_matches("set_"));
            };
            match action {
                "set_role" => engine.set_role(value.clone()),
                "set_mindset" => engine.set_mindset(value.clone()),
                _ => engine.set_style(value.clone()),
            }
            println!("{} set to {value}", capitalize(action.trim_start_matches("set_")));
        }
        "set_device" => {
            let value = value_as_non_empty_string(args.get("value"))
                .map(|value| value.to_ascii_lowercase())
                .unwrap_or_default();
            if !DEVICES.contains(&value.as_str()) {
                bail!("/device expects one of: {}", DEVICES.join(", "));
            }
            engine.set_device(value.clone());
            println!("Device set to {value}");
        }
        "set_accent" => {
            let raw = value_as_non_empty_string(args.get("value")).unwrap_or_default();
            let hex = parse_accent(&raw).map_err(anyhow::Error::msg)?;
            engine.set_accent_color(hex.clone());
            println!("Accent set to {hex}");
        }
        "show" => {
            print_attributes(engine.attributes());
            println!("Theme: {}", engine.theme());
            match engine.current_image() {
                Some(url) => println!("Showing: {url}"),
                None => println!("Showing: nothing yet"),
            }
        }
        "show_prompt" => {
            println!("{}", engine.preview_prompt());
        }
        "generate" | "surprise" => {
            let entry = run_generation(engine, action == "surprise")?;
            if action == "surprise" {
                print_attributes(&entry.attributes());
            }
            println!("{}", entry.url);
        }
        "list_history" => print_history(engine),
        "list_favorites" => print_favorites(engine.favorites()),
        "list_options" => print_options(),
        "load_history" => {
            let Some(index) = args
                .get("index")
                .and_then(Value::as_i64)
                .and_then(|value| usize::try_from(value).ok())
            else {
                bail!("/load needs a history index");
            };
            let entry = engine.load_from_history(index)?;
            print_attributes(&entry.attributes());
            println!("{}", entry.url);
        }
        "add_favorite" => {
            let url = value_as_non_empty_string(args.get("url"));
            favorite_current(engine, url.as_deref())?;
        }
        "remove_favorite" => {
            let Some(timestamp) = args.get("timestamp").and_then(Value::as_i64) else {
                bail!("/unfavorite needs a favorite timestamp");
            };
            let removed = engine.remove_favorite(timestamp)?;
            println!("Removed {removed} favorite(s)");
        }
        "clear_history" => {
            if engine.history().is_empty() {
                println!("History is already empty");
            } else if confirm_with(input, "Clear all history?")? {
                let removed = engine.clear_history()?;
                println!("Cleared {removed} history entries");
            } else {
                println!("History kept");
            }
        }
        "set_theme" => {
            let theme = match value_as_non_empty_string(args.get("theme")) {
                Some(raw) => {
                    let theme = raw.parse::<Theme>().map_err(anyhow::Error::msg)?;
                    engine.set_theme(theme)?;
                    theme
                }
                None => engine.toggle_theme()?,
            };
            println!("Theme set to {theme}");
        }
        "download" => {
            let dir = value_as_non_empty_string(args.get("dir"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let path = engine.download(None, &dir)?;
            println!("Saved {}", path.display());
        }
        "unknown" => {
            match value_as_non_empty_string(args.get("command")) {
                Some(command) => println!("Unknown command /{command}. Type /help."),
                None => println!("Attributes are set with slash commands. Type /help."),
            }
        }
        other => println!("Unhandled action {other}"),
    }
    Ok(())
}

fn run_generation(engine: &mut WallpaperEngine, surprise: bool) -> Result<GenerationEntry> {
    println!("Generating…");
    io::stdout().flush()?;
    if surprise {
        engine.surprise()
    } else {
        engine.generate()
    }
}

fn favorite_current(engine: &mut WallpaperEngine, url: Option<&str>) -> Result<()> {
    match engine.add_favorite(url)? {
        Some(favorite) => println!("Favorited (timestamp {})", favorite.timestamp),
        None => println!("Already a favorite"),
    }
    Ok(())
}

/// One-shot commands target a history entry (newest by default) or an explicit URL.
fn select_target(engine: &mut WallpaperEngine, args: &TargetArgs) -> Result<String> {
    if let Some(url) = args.url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
        return Ok(url.to_string());
    }
    Ok(engine.load_from_history(args.index)?.url)
}

fn print_attributes(attributes: &AttributeSet) {
    println!("Role:    {}", attributes.role);
    println!("Mindset: {}", attributes.mindset);
    println!("Style:   {}", attributes.style);
    println!("Device:  {}", attributes.device);
    println!("Accent:  {}", attributes.accent_color);
}

fn print_history(engine: &WallpaperEngine) {
    let history = engine.history();
    if history.is_empty() {
        println!("No history yet");
        return;
    }
    println!("History ({})", history.len());
    for (index, entry) in history.iter().enumerate() {
        let star = if engine.is_favorite(&entry.url) { " ★" } else { "" };
        println!(
            "[{index}] {}  {} · {} · {} · {} · {}{star}",
            format_timestamp(entry.timestamp),
            entry.role,
            entry.mindset,
            entry.style,
            entry.device,
            entry.accent_color,
        );
        println!("    {}", entry.url);
    }
}

fn print_favorites(favorites: &[FavoriteEntry]) {
    if favorites.is_empty() {
        println!("No favorites yet");
        return;
    }
    println!("Favorites ({})", favorites.len());
    for favorite in favorites {
        println!(
            "{}  {}  {} · {} · {}",
            favorite.timestamp,
            format_timestamp(favorite.timestamp),
            favorite.role,
            favorite.mindset,
            favorite.style,
        );
        println!("    {}", favorite.url);
    }
}

fn print_options() {
    println!("Roles:    {}", ROLES.join(" | "));
    println!("Mindsets: {}", MINDSETS.join(" | "));
    println!("Styles:   {}", STYLES.join(" | "));
    println!("Devices:  {}", DEVICES.join(" | "));
    println!("Accents:");
    for (hex, phrase) in accent_colors() {
        println!("  {hex}  {phrase}");
    }
}

fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    confirm_with(&mut input, question)
}

fn confirm_with(input: &mut impl BufRead, question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed reading confirmation")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn parse_accent(raw: &str) -> Result<String, String> {
    normalize_accent_hex(raw).ok_or_else(|| format!("'{raw}' is not a #rrggbb color"))
}

fn default_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("could not determine a data directory; pass --data-dir")?;
    Ok(base.join("idwall"))
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|stamp| stamp.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn value_as_non_empty_string(value: Option<&Value>) -> Option<String> {
    let raw = value
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
