use crate::config::{Settings, SettingsError};

/// Settings to run with. `fallback` holds the error that made us ignore the
/// user's config, so it can be logged once logging is up.
pub struct LoadedSettings {
    pub settings: Settings,
    pub fallback: Option<SettingsError>,
}

pub fn load_settings() -> LoadedSettings {
    match Settings::load().and_then(|s| s.validate().map(|()| s)) {
        Ok(settings) => LoadedSettings {
            settings,
            fallback: None,
        },
        Err(e) => {
            // A broken config file must not keep the player from starting.
            eprintln!("cadenza: {e}, using defaults");
            LoadedSettings {
                settings: Settings::default(),
                fallback: Some(e),
            }
        }
    }
}
