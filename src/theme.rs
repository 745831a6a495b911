use serde::{Deserialize, Serialize};

pub const SETTINGS_KEY: &str = "ui.theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// State of the dark-mode checkbox.
    pub fn from_toggle(checked: bool) -> Self {
        if checked {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

/// A stored preference wins; otherwise follow the system setting.
pub fn resolve_theme(stored: Option<Theme>, prefers_dark: bool) -> Theme {
    stored.unwrap_or(Theme::from_toggle(prefers_dark))
}
