//! Endpoint settings and encrypted API credential storage

use crate::data_paths::DataPaths;
use aes_gcm::{
    aead::{
        rand_core::{OsRng, RngCore},
        Aead, KeyInit,
    },
    Aes256Gcm, Key, Nonce,
};
use anyhow::{anyhow, Result};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAINNET_REST_URL: &str = "https://fapi.binance.com";
pub const MAINNET_WS_URL: &str = "wss://fstream.binance.com";
pub const TESTNET_REST_URL: &str = "https://testnet.binancefuture.com";
pub const TESTNET_WS_URL: &str = "wss://stream.binancefuture.com";

pub const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Everything the gateway needs to talk to one venue environment.
#[derive(Clone)]
pub struct Settings {
    pub rest_url: String,
    pub ws_url: String,
    pub credentials: Credentials,
    pub recv_window: u64,
}

impl Settings {
    /// Resolve endpoints for the chosen environment and load credentials
    /// (environment variables first, then the encrypted store).
    pub async fn load(testnet: bool, data_paths: &DataPaths) -> Result<Self> {
        let credentials = load_credentials(data_paths).await?;
        Ok(Self::with_credentials(testnet, credentials))
    }

    pub fn with_credentials(testnet: bool, credentials: Credentials) -> Self {
        let (rest_url, ws_url) = if testnet {
            (TESTNET_REST_URL, TESTNET_WS_URL)
        } else {
            (MAINNET_REST_URL, MAINNET_WS_URL)
        };
        Self {
            rest_url: rest_url.to_string(),
            ws_url: ws_url.to_string(),
            credentials,
            recv_window: DEFAULT_RECV_WINDOW_MS,
        }
    }
}

/// Default data directory under the platform config root.
pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "futdash", "futdash")
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Get the path to the credentials file
fn get_creds_path(data_paths: &DataPaths) -> Result<PathBuf> {
    let auth_dir = data_paths.auth();
    std::fs::create_dir_all(&auth_dir)?;
    Ok(auth_dir.join("creds.json.enc"))
}

/// Get or prompt for passphrase
fn get_passphrase() -> Result<String> {
    // First check environment variable
    if let Ok(passphrase) = std::env::var("FUTDASH_PASSPHRASE") {
        return Ok(passphrase);
    }

    // Otherwise prompt
    let passphrase = rpassword::prompt_password("Enter passphrase for credential encryption: ")?;
    if passphrase.is_empty() {
        return Err(anyhow!("Passphrase cannot be empty"));
    }
    Ok(passphrase)
}

/// Derive encryption key from passphrase
fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Key<Aes256Gcm>> {
    let mut key_bytes = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| anyhow!("Failed to derive key: {}", e))?;
    Ok(Key::<Aes256Gcm>::from_slice(&key_bytes).clone())
}

/// Decrypt `salt(16) || nonce(12) || ciphertext` into credentials.
fn read_encrypted(creds_path: &Path, passphrase: &str) -> Result<Credentials> {
    let encrypted = std::fs::read(creds_path)?;

    if encrypted.len() < 28 {
        // 16 (salt) + 12 (nonce) = 28
        return Err(anyhow!("Invalid encrypted file format"));
    }

    let salt = &encrypted[..16];
    let nonce_bytes = &encrypted[16..28];
    let ciphertext = &encrypted[28..];

    let key = derive_key(passphrase, salt)?;
    let cipher = Aes256Gcm::new(&key);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| anyhow!("Decryption failed. Wrong passphrase?"))?;

    let stored: Credentials = serde_json::from_slice(&plaintext)?;
    Ok(stored)
}

fn write_encrypted(creds_path: &Path, passphrase: &str, credentials: &Credentials) -> Result<()> {
    let json = serde_json::to_string(credentials)?;

    let mut salt = [0u8; 16];
    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new(&key);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, json.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    // salt + nonce + ciphertext
    let mut output = Vec::new();
    output.extend_from_slice(&salt);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);

    std::fs::write(creds_path, output)?;
    Ok(())
}

/// Save credentials to encrypted file
pub async fn save_credentials(data_paths: &DataPaths, credentials: &Credentials) -> Result<()> {
    let creds_path = get_creds_path(data_paths)?;
    let passphrase = get_passphrase()?;
    write_encrypted(&creds_path, &passphrase, credentials)
}

/// Load credentials: `BINANCE_API_KEY`/`BINANCE_API_SECRET` override the
/// encrypted store when both are set.
pub async fn load_credentials(data_paths: &DataPaths) -> Result<Credentials> {
    if let (Ok(api_key), Ok(api_secret)) = (
        std::env::var("BINANCE_API_KEY"),
        std::env::var("BINANCE_API_SECRET"),
    ) {
        return Ok(Credentials {
            api_key,
            api_secret,
        });
    }

    let creds_path = get_creds_path(data_paths)?;
    if !creds_path.exists() {
        return Err(anyhow!("No credentials found. Run 'futdash init' first"));
    }

    let passphrase = get_passphrase()?;
    read_encrypted(&creds_path, &passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_pick_testnet_endpoints() {
        let creds = Credentials {
            api_key: "k".into(),
            api_secret: "s".into(),
        };
        let settings = Settings::with_credentials(true, creds.clone());
        assert_eq!(settings.rest_url, TESTNET_REST_URL);
        assert_eq!(settings.ws_url, TESTNET_WS_URL);

        let settings = Settings::with_credentials(false, creds);
        assert_eq!(settings.rest_url, MAINNET_REST_URL);
        assert_eq!(settings.recv_window, DEFAULT_RECV_WINDOW_MS);
    }

    #[test]
    fn encrypted_credentials_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json.enc");
        let credentials = Credentials {
            api_key: "test-key".into(),
            api_secret: "test-secret".into(),
        };

        write_encrypted(&path, "hunter2", &credentials).unwrap();
        let loaded = read_encrypted(&path, "hunter2").unwrap();
        assert_eq!(loaded.api_key, "test-key");
        assert_eq!(loaded.api_secret, "test-secret");
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json.enc");
        let credentials = Credentials {
            api_key: "k".into(),
            api_secret: "s".into(),
        };

        write_encrypted(&path, "right", &credentials).unwrap();
        assert!(read_encrypted(&path, "wrong").is_err());
    }

    #[test]
    fn truncated_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json.enc");
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(read_encrypted(&path, "any").is_err());
    }
}
