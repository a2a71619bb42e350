use std::path::PathBuf;

const APP_DIR: &str = "spolist";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/spolist/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Token cache shared with other spotipy-style tools:
/// `~/.cache/spotify/.spotify_cache`.
pub fn token_cache_path() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(temp_dir)
            .join(".cache")
            .join("spotify")
            .join(".spotify_cache")
    }
    #[cfg(windows)]
    {
        dirs::cache_dir()
            .unwrap_or_else(temp_dir)
            .join("spotify")
            .join(".spotify_cache")
    }
}

pub fn log_path() -> PathBuf {
    data_dir().join("spolist.log")
}
