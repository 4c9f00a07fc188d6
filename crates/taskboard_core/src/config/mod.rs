use crate::error::AppError;
use crate::storage::THEME_KEY;
use crate::storage::kv::KvStore;
use log::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match canonical_theme_name(raw)?.as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        return None;
    }

    match trimmed {
        "light" | "default" | "vanilla" => Some("light".to_string()),
        "dark" | "dark_mode" | "darkmode" | "noir" => Some("dark".to_string()),
        other => Some(other.to_string()),
    }
}

/// Reads the persisted theme preference; anything missing, unreadable or
/// unrecognized falls back to light.
pub fn load_theme<S: KvStore>(store: &S) -> Theme {
    match store.get(THEME_KEY) {
        Ok(Some(value)) => Theme::parse(&value).unwrap_or_else(|| {
            warn!("unknown theme {value:?}, using light");
            Theme::Light
        }),
        Ok(None) => Theme::Light,
        Err(err) => {
            warn!("theme read failed, using light: {err}");
            Theme::Light
        }
    }
}

pub fn save_theme<S: KvStore>(store: &S, theme: Theme) -> Result<(), AppError> {
    store.set(THEME_KEY, theme.as_str())
}

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        if self.accent.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.accent, text, self.reset)
        }
    }

    pub fn mutedize(&self, text: &str) -> String {
        if self.muted.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", self.muted, text, self.reset)
        }
    }
}

pub fn palette_for_theme(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            accent: "\x1b[38;5;208m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        Theme::Light => Palette {
            accent: "",
            muted: "",
            reset: "",
        },
    }
}
