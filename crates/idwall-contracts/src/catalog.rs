use indexmap::IndexMap;

pub const ROLES: &[&str] = &[
    "Focused professional",
    "Creative thinker",
    "Founder / Builder",
    "Quiet achiever",
    "Student",
    "Minimalist",
];

pub const MINDSETS: &[&str] = &[
    "Deep focus",
    "Calm clarity",
    "Low-stress productivity",
    "Evening wind-down",
    "Morning energy",
    "Creative flow",
];

pub const STYLES: &[&str] = &[
    "Soft neutral light",
    "Muted dark elegance",
    "Warm minimal calm",
    "Cool modern stillness",
    "Pastel dreamscape",
    "Monochrome zen",
];

pub const DEVICES: &[&str] = &["mobile", "desktop"];

pub const DEFAULT_ROLE: &str = "Focused professional";
pub const DEFAULT_MINDSET: &str = "Deep focus";
pub const DEFAULT_STYLE: &str = "Soft neutral light";
pub const DEFAULT_DEVICE: &str = "mobile";
pub const DEFAULT_ACCENT_COLOR: &str = "#667eea";

pub const FALLBACK_ACCENT_PHRASE: &str = "balanced neutral";
pub const PORTRAIT_PHRASE: &str = "portrait 9:16 smartphone format";
pub const LANDSCAPE_PHRASE: &str = "landscape 16:9 desktop format";

const ACCENT_ROWS: &[(&str, &str)] = &[
    ("#667eea", "soft purple-blue"),
    ("#f093fb", "gentle pink-purple"),
    ("#4facfe", "calm sky blue"),
    ("#43e97b", "fresh mint green"),
    ("#fa709a", "warm coral pink"),
    ("#feca57", "soft golden yellow"),
];

/// Known accent colors in display order, keyed by lowercase `#rrggbb`.
pub fn accent_colors() -> IndexMap<&'static str, &'static str> {
    ACCENT_ROWS.iter().copied().collect()
}

/// Exact-match lookup; anything outside the table reads as neutral.
pub fn describe_accent(hex: &str) -> &'static str {
    ACCENT_ROWS
        .iter()
        .find(|(code, _)| *code == hex)
        .map(|(_, phrase)| *phrase)
        .unwrap_or(FALLBACK_ACCENT_PHRASE)
}

/// Only the literal `mobile` is portrait.
pub fn aspect_ratio_phrase(device: &str) -> &'static str {
    if device == "mobile" {
        PORTRAIT_PHRASE
    } else {
        LANDSCAPE_PHRASE
    }
}

/// Accepts `#rrggbb` (any case) and returns it lowercased.
pub fn normalize_accent_hex(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#')?;
    if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", digits.to_ascii_lowercase()))
}
