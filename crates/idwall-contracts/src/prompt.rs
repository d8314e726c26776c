use serde::{Deserialize, Serialize};

use crate::catalog::{
    aspect_ratio_phrase, describe_accent, DEFAULT_ACCENT_COLOR, DEFAULT_DEVICE, DEFAULT_MINDSET,
    DEFAULT_ROLE, DEFAULT_STYLE,
};

/// The form state a prompt is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSet {
    pub role: String,
    pub mindset: String,
    pub style: String,
    pub device: String,
    pub accent_color: String,
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self {
            role: DEFAULT_ROLE.to_string(),
            mindset: DEFAULT_MINDSET.to_string(),
            style: DEFAULT_STYLE.to_string(),
            device: DEFAULT_DEVICE.to_string(),
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

impl AttributeSet {
    pub fn prompt(&self) -> String {
        build_prompt(
            &self.role,
            &self.mindset,
            &self.style,
            &self.device,
            &self.accent_color,
        )
    }
}

/// Renders the wallpaper prompt. Pure: equal inputs give byte-identical output.
pub fn build_prompt(
    role: &str,
    mindset: &str,
    style: &str,
    device: &str,
    accent_color: &str,
) -> String {
    let color_desc = describe_accent(accent_color);
    let aspect_ratio = aspect_ratio_phrase(device);

    let lines = [
        format!("A premium, calming wallpaper designed for a {role}."),
        format!(
            "The image should evoke {mindset}, creating a visually quiet and mentally relaxing atmosphere."
        ),
        format!("Use a {style} color palette with {color_desc} subtle accents."),
        format!(
            "The composition is {aspect_ratio}, minimal, perfectly balanced, and completely uncluttered."
        ),
        "Soft gradients, gentle atmospheric lighting, and smooth color transitions.".to_string(),
        "Nothing dramatic, nothing distracting, nothing busy.".to_string(),
        "Feels modern, refined, sophisticated, and suitable for extended viewing during work or relaxation."
            .to_string(),
        "Absolutely no text, no symbols, no logos, no sharp contrasts, no visual noise, no clutter."
            .to_string(),
        "Pure aesthetic harmony and tranquility.".to_string(),
    ];
    lines.join("\n").trim().to_string()
}
