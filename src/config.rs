use crate::{
    Address,
    i18n::Language,
    units::parse_address,
};
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    io::Write,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

pub const MONAD_TESTNET_CHAIN_ID: u64 = 10143;
pub const DEFAULT_RPC_URL: &str = "https://testnet-rpc.monad.xyz";
pub const DEFAULT_WS_URL: &str = "wss://testnet-rpc.monad.xyz";
pub const DEFAULT_GAME_ADDRESS: &str = "0x8cDdbc30cc9E4fe404EecD254056d9736f9Dc168";
pub const DEFAULT_LEADERBOARD_ADDRESS: &str = "0xceCBFF203C8B6044F52CE23D914A1bfD997541A4";
pub const DEFAULT_API_URL: &str = "https://monad-games-id-site.vercel.app";
pub const DEFAULT_GAME_ID: &str = "jdb";

pub const APP_DIR: &str = ".jdb";
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTimings {
    /// Game status and player state.
    pub fast: Duration,
    /// Draw history and leaderboard.
    pub slow: Duration,
    pub receipt_poll: Duration,
    pub signer_retry: Duration,
    pub ws_reconnect: Duration,
    /// Budget for one leaderboard load.
    pub leaderboard: Duration,
    pub notification_ttl: Duration,
    pub bet_banner_ttl: Duration,
}

impl Default for RefreshTimings {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(5),
            slow: Duration::from_secs(15),
            receipt_poll: Duration::from_secs(1),
            signer_retry: Duration::from_secs(1),
            ws_reconnect: Duration::from_secs(5),
            leaderboard: Duration::from_secs(20),
            notification_ttl: Duration::from_secs(5),
            bet_banner_ttl: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub ws_url: Option<String>,
    pub game: Address,
    pub leaderboard: Address,
    pub api_url: String,
    pub game_id: String,
}

impl NetworkConfig {
    pub fn monad_testnet() -> Result<Self> {
        Ok(Self {
            chain_id: MONAD_TESTNET_CHAIN_ID,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            ws_url: Some(DEFAULT_WS_URL.to_string()),
            game: parse_address(DEFAULT_GAME_ADDRESS)
                .wrap_err("invalid default game address")?,
            leaderboard: parse_address(DEFAULT_LEADERBOARD_ADDRESS)
                .wrap_err("invalid default leaderboard address")?,
            api_url: DEFAULT_API_URL.to_string(),
            game_id: DEFAULT_GAME_ID.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletConfig {
    ReadOnly,
    Keystore { name: String, dir: PathBuf },
    Custodial { signer_url: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub timings: RefreshTimings,
    pub preferences_path: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// JSON file holding [`Preferences`], created with defaults on first use.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_file(&path)?;
        Ok(Self { path })
    }

    pub fn load(&self) -> Result<Preferences> {
        let data = fs::read(&self.path).wrap_err("Failed to read preferences")?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Preferences::default());
        }
        serde_json::from_slice(&data).wrap_err("Failed to parse preferences JSON")
    }

    pub fn save(&self, preferences: &Preferences) -> Result<()> {
        let mut preferences = preferences.clone();
        preferences.updated_at = Some(Utc::now().to_rfc3339());
        let json =
            serde_json::to_vec_pretty(&preferences).wrap_err("Failed to serialize preferences")?;
        fs::write(&self.path, json).wrap_err("Failed to write preferences")?;
        Ok(())
    }

    pub fn set_language(&self, language: Language) -> Result<()> {
        let mut preferences = self.load()?;
        preferences.language = language;
        self.save(&preferences)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn default_preferences_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(APP_DIR).join(PREFERENCES_FILE))
}

fn ensure_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!("Failed to create preferences directory {}", parent.display())
        })?;
    }
    if !path.exists() {
        let mut file = fs::File::create(path).wrap_err_with(|| {
            format!("Failed to create preferences file at {}", path.display())
        })?;
        file.write_all(b"{}")
            .wrap_err("Failed to initialize preferences file")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn preference_store__creates_file_and_persists_language() {
        // given
        let dir = TempDir::new("prefs").unwrap();
        let path = dir.path().join("nested").join(PREFERENCES_FILE);

        // when
        let store = PreferenceStore::open(&path).unwrap();
        let initial = store.load().unwrap();
        store.set_language(Language::Pt).unwrap();
        let reopened = PreferenceStore::open(&path).unwrap().load().unwrap();

        // then
        assert!(path.exists());
        assert_eq!(initial.language, Language::En);
        assert_eq!(reopened.language, Language::Pt);
        assert!(reopened.updated_at.is_some());
    }

    #[test]
    fn monad_testnet__parses_default_addresses() {
        let network = NetworkConfig::monad_testnet().unwrap();
        assert_eq!(network.chain_id, 10143);
        assert_eq!(
            crate::units::format_address(&network.game),
            "0x8cddbc30cc9e4fe404eecd254056d9736f9dc168"
        );
    }
}
