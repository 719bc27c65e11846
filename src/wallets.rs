//! Encrypted Ethereum keystores (the v3 JSON format) kept in one directory.

use crate::{
    Address,
    config::APP_DIR,
    signing::address_of,
    units::{
        format_address,
        parse_address,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use itertools::Itertools;
use k256::ecdsa::SigningKey;
use rpassword::prompt_password;
use serde_json::Value;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::warn;

const KEYSTORE_SUBDIR: &str = "wallets";

/// One keystore file. `address` is the one the file declares, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keystore {
    pub name: String,
    pub path: PathBuf,
    pub address: Option<Address>,
}

impl Keystore {
    /// Read the file and keep it only if it carries a `crypto` section.
    fn read(path: PathBuf) -> Option<Self> {
        let name = path.file_stem()?.to_str()?.to_owned();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable keystore");
                return None;
            }
        };
        let json: Value = match serde_json::from_str(&raw) {
            Ok(json) => json,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "keystore is not json");
                return None;
            }
        };
        if json.get("crypto").or_else(|| json.get("Crypto")).is_none() {
            return None;
        }
        let address = json
            .get("address")
            .and_then(Value::as_str)
            .and_then(|raw| parse_address(raw).ok());
        Some(Self {
            name,
            path,
            address,
        })
    }

    pub fn decrypt(&self, password: &str) -> Result<SigningKey> {
        let secret = decrypt_key(&self.path, password.as_bytes())
            .map_err(|_| eyre!("wrong password for keystore '{}'", self.name))?;
        let key = SigningKey::from_slice(&secret)
            .map_err(|_| eyre!("keystore '{}' holds an invalid secp256k1 key", self.name))?;
        let derived = address_of(&key);
        if let Some(declared) = self.address
            && declared != derived
        {
            return Err(eyre!(
                "keystore '{}' declares {} but its key controls {}",
                self.name,
                format_address(&declared),
                format_address(&derived)
            ));
        }
        Ok(key)
    }

    pub fn unlock(&self) -> Result<SigningKey> {
        let label = match self.address {
            Some(address) => format!("{} ({})", self.name, format_address(&address)),
            None => self.name.clone(),
        };
        let password = prompt_password(format!("Password for keystore {label}: "))
            .wrap_err("failed to read keystore password")?;
        self.decrypt(&password)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeystoreDir {
    root: PathBuf,
}

impl KeystoreDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.jdb/wallets` unless overridden; `~` is expanded.
    pub fn resolve(custom: Option<&str>) -> Result<Self> {
        let root = match custom {
            Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
            None => {
                let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
                PathBuf::from(home).join(APP_DIR).join(KEYSTORE_SUBDIR)
            }
        };
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Keystores in the directory ordered by name. A missing directory holds
    /// none.
    pub fn keystores(&self) -> Result<Vec<Keystore>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root)
            .wrap_err_with(|| format!("failed to read {}", self.root.display()))?;
        let mut keystores = Vec::new();
        for entry in entries {
            let path = entry.wrap_err("failed to read keystore entry")?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                keystores.extend(Keystore::read(path));
            }
        }
        Ok(keystores
            .into_iter()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect())
    }

    /// Look a keystore up by file name or by the address it declares.
    pub fn open(&self, wanted: &str) -> Result<Keystore> {
        let by_address = parse_address(wanted).ok();
        let keystores = self.keystores()?;
        keystores
            .iter()
            .find(|keystore| keystore.name == wanted)
            .or_else(|| {
                by_address.and_then(|address| {
                    keystores
                        .iter()
                        .find(|keystore| keystore.address == Some(address))
                })
            })
            .cloned()
            .ok_or_else(|| {
                let known = keystores.iter().map(|keystore| &keystore.name).join(", ");
                eyre!(
                    "no keystore '{wanted}' in {} (found: {})",
                    self.root.display(),
                    if known.is_empty() { "none" } else { known.as_str() }
                )
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    fn keystore_json(address: &str) -> String {
        format!(
            r#"{{"version": 3, "id": "0", "address": "{address}",
                "crypto": {{"cipher": "aes-128-ctr", "ciphertext": "00",
                            "cipherparams": {{"iv": "00"}}, "kdf": "scrypt",
                            "kdfparams": {{"dklen": 32, "n": 2, "p": 1, "r": 8, "salt": "00"}},
                            "mac": "00"}}}}"#
        )
    }

    #[test]
    fn keystores__skips_files_without_a_crypto_section() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        let addr = "1111111111111111111111111111111111111111";
        fs::write(dir.path().join("zed.json"), keystore_json(addr)).unwrap();
        fs::write(dir.path().join("alice.json"), keystore_json(addr)).unwrap();
        fs::write(dir.path().join("settings.json"), "{}").unwrap();
        fs::write(dir.path().join("garbage.json"), "not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        // when
        let keystores = KeystoreDir::new(dir.path()).keystores().unwrap();

        // then
        let names: Vec<_> = keystores.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "zed"]);
        assert_eq!(keystores[0].address, Some(Address::repeat_byte(0x11)));
    }

    #[test]
    fn open__finds_keystore_by_declared_address() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        fs::write(
            dir.path().join("UTC--2025-01-01--2222.json"),
            keystore_json("2222222222222222222222222222222222222222"),
        )
        .unwrap();

        // when
        let keystore = KeystoreDir::new(dir.path())
            .open("0x2222222222222222222222222222222222222222")
            .unwrap();

        // then
        assert_eq!(keystore.name, "UTC--2025-01-01--2222");
    }

    #[test]
    fn open__missing_directory_reports_no_keystores() {
        let dir = TempDir::new("keystores").unwrap();
        let missing = KeystoreDir::new(dir.path().join("absent"));
        assert!(missing.keystores().unwrap().is_empty());
        let err = missing.open("alice").unwrap_err();
        assert!(err.to_string().contains("none"));
    }

    #[test]
    fn resolve__uses_explicit_directory() {
        let dir = KeystoreDir::resolve(Some("/tmp/jdb-keys")).unwrap();
        assert_eq!(dir.path(), Path::new("/tmp/jdb-keys"));
    }

    #[test]
    fn decrypt__names_the_keystore_on_failure() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        fs::write(
            dir.path().join("broken.json"),
            keystore_json("1111111111111111111111111111111111111111"),
        )
        .unwrap();
        let keystore = KeystoreDir::new(dir.path()).open("broken").unwrap();

        // when
        let err = keystore.decrypt("hunter2").unwrap_err();

        // then
        assert!(err.to_string().contains("broken"));
    }
}
