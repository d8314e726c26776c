use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::prompt::AttributeSet;

/// One completed generation. Field names match the persisted layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationEntry {
    pub url: String,
    pub timestamp: i64,
    pub role: String,
    pub mindset: String,
    pub style: String,
    pub device: String,
    pub accent_color: String,
}

impl GenerationEntry {
    pub fn new(url: impl Into<String>, timestamp: i64, attributes: &AttributeSet) -> Self {
        Self {
            url: url.into(),
            timestamp,
            role: attributes.role.clone(),
            mindset: attributes.mindset.clone(),
            style: attributes.style.clone(),
            device: attributes.device.clone(),
            accent_color: attributes.accent_color.clone(),
        }
    }

    pub fn attributes(&self) -> AttributeSet {
        AttributeSet {
            role: self.role.clone(),
            mindset: self.mindset.clone(),
            style: self.style.clone(),
            device: self.device.clone(),
            accent_color: self.accent_color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub url: String,
    pub timestamp: i64,
    pub role: String,
    pub mindset: String,
    pub style: String,
}

impl FavoriteEntry {
    pub fn new(url: impl Into<String>, timestamp: i64, attributes: &AttributeSet) -> Self {
        Self {
            url: url.into(),
            timestamp,
            role: attributes.role.clone(),
            mindset: attributes.mindset.clone(),
            style: attributes.style.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{other}' (expected dark or light)")),
        }
    }
}
