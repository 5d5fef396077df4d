use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct AppSettings {
    pub theme: String,
    pub store_dir: String,
    pub nudge_step: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            store_dir: "moodboard-data".to_string(),
            nudge_step: 10.0,
        }
    }
}

pub(super) fn load_settings(path: &str) -> Option<AppSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    if path.ends_with(".toml") {
        toml::from_str::<AppSettings>(&s)
            .ok()
            .or_else(|| serde_json::from_str::<AppSettings>(&s).ok())
    } else {
        serde_json::from_str::<AppSettings>(&s)
            .ok()
            .or_else(|| toml::from_str::<AppSettings>(&s).ok())
    }
}

pub(super) fn save_settings(path: &str, settings: &AppSettings) -> Result<(), String> {
    if path.ends_with(".toml") {
        let toml = toml::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, toml).map_err(|e| e.to_string())
    } else {
        let json = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
        std::fs::write(path, json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn settings_round_trip_as_toml() {
        let dir = std::env::temp_dir().join(format!("moodboard-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        let path = path.to_str().unwrap();
        let settings = AppSettings {
            theme: "light".to_string(),
            store_dir: "/tmp/boards".to_string(),
            nudge_step: 5.0,
        };
        save_settings(path, &settings).unwrap();
        let loaded = load_settings(path).unwrap();
        assert_eq!(loaded.theme, "light");
        assert_eq!(loaded.store_dir, "/tmp/boards");
        assert_eq!(loaded.nudge_step, 5.0);
    }

    #[test]
    fn missing_file_yields_none() {
        assert!(load_settings("definitely-not-here.toml").is_none());
    }
}
