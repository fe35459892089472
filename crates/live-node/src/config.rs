use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub transcoder_bin: String,
    pub max_transcodes: usize,
    pub restart_delay_ms: u64,
    pub broadcast_capacity: usize,
    pub cameras_file: String,
    pub settings_file: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            transcoder_bin: env::var("TRANSCODER_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            max_transcodes: env_usize("MAX_TRANSCODES", 4),
            restart_delay_ms: env_u64("RESTART_DELAY_MS", 1500),
            broadcast_capacity: env_usize("BROADCAST_CAPACITY", 64),
            cameras_file: env::var("CAMERAS_FILE").unwrap_or_else(|_| "./cameras.yaml".to_string()),
            settings_file: env::var("SETTINGS_FILE").ok(),
        })
    }
}

fn env_usize(key: &str, def: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(def)
}

fn env_u64(key: &str, def: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(def)
}

#[cfg(test)]
mod tests {
    use super::*;

    // env vars are process-global, so defaults and fallbacks share one test
    #[test]
    fn defaults_and_fallbacks() {
        env::remove_var("TRANSCODER_BIN");
        env::remove_var("MAX_TRANSCODES");
        env::remove_var("RESTART_DELAY_MS");

        let config = Config::from_env().unwrap();
        assert_eq!(config.transcoder_bin, "ffmpeg");
        assert_eq!(config.max_transcodes, 4);
        assert_eq!(config.restart_delay_ms, 1500);
        assert!(config.settings_file.is_none());

        env::set_var("MAX_TRANSCODES", "not-a-number");
        let config = Config::from_env().unwrap();
        assert_eq!(config.max_transcodes, 4);
        env::remove_var("MAX_TRANSCODES");
    }
}
