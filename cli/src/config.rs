use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

pub struct Config {
    pub data_dir: PathBuf,
    /// `None` means every model call degrades to its fallback.
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "grozo").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let gemini_api_key = match non_empty_env("GEMINI_API_KEY") {
            Some(key) => Some(key),
            None => read_key_file(&data_dir.join("gemini_api_key"))?,
        };
        let gemini_api_url =
            non_empty_env("GEMINI_API_URL").unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string());

        if gemini_api_key.is_none() {
            tracing::warn!(
                "no Gemini API key (set GEMINI_API_KEY or write {}); suggestions will use fallbacks",
                data_dir.join("gemini_api_key").display()
            );
        }

        Ok(Config {
            data_dir,
            gemini_api_key,
            gemini_api_url,
        })
    }

    /// Load the server API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if let Some(key) = read_key_file(&path)? {
            return Ok((key, false));
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok((key, true))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a single-line secret; `None` when the file is missing or blank.
fn read_key_file(path: &std::path::Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let key = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let key = key.trim().to_string();
    Ok((!key.is_empty()).then_some(key))
}
