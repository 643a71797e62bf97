use serde::{Deserialize, Serialize};

/// Host settings applied by `runway system`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// IANA zone name, e.g. `Europe/Moscow`.
    pub timezone: String,

    /// Left unchanged when empty.
    pub hostname: String,

    /// Swap file size (`2G`, `512M`). Empty picks a size from installed RAM.
    pub swap_size: String,

    pub language: String,

    pub locale: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Moscow".into(),
            hostname: String::new(),
            swap_size: "2G".into(),
            language: "ru_RU".into(),
            locale: "ru_RU.UTF-8".into(),
        }
    }
}

impl SystemConfig {
    pub(crate) fn blank() -> Self {
        Self {
            timezone: String::new(),
            hostname: String::new(),
            swap_size: String::new(),
            language: String::new(),
            locale: String::new(),
        }
    }

    pub(crate) fn merge(&mut self, other: SystemConfig) {
        let take = |dst: &mut String, src: String| {
            if !src.is_empty() {
                *dst = src;
            }
        };

        take(&mut self.timezone, other.timezone);
        take(&mut self.hostname, other.hostname);
        take(&mut self.swap_size, other.swap_size);
        take(&mut self.language, other.language);
        take(&mut self.locale, other.locale);
    }
}
