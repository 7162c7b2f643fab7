//! Credential store for the control-server token.
//!
//! Resolution order (highest first): a token saved during this process, the OS
//! keychain entry, the plaintext preference file, the compiled-in default.
//! `resolve` never fails; every unavailable source is skipped. The result of the
//! keychain/preference lookup is cached until the next `save` or `invalidate`.

use crate::config::ClientConfig;
use crate::error::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

pub const DEFAULT_CONTROL_TOKEN: &str = "changeme_local_token";
/// Keychain entry and preference key naming the control token.
pub const CONTROL_TOKEN_ENTRY: &str = "FTGControlToken";
/// Keychain entry for the LLM provider API key.
pub const LLM_API_KEY_ENTRY: &str = "LLM_API_KEY";

const PREFS_TOKEN_KEY: &str = "control_token";

/// Secure storage for named secrets.
pub trait SecretBackend: Send + Sync {
    /// `Ok(None)` when the entry does not exist.
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
}

/// OS keychain backend (macOS Keychain, Windows Credential Manager, Linux keyutils).
#[cfg(feature = "keyring")]
pub struct KeychainBackend {
    service: String,
}

#[cfg(feature = "keyring")]
impl KeychainBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[cfg(feature = "keyring")]
impl SecretBackend for KeychainBackend {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entry = keyring::Entry::new(&self.service, key)
            .map_err(|e| format!("keyring entry failed: {}", e))?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(format!("keyring get failed: {}", e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let entry = keyring::Entry::new(&self.service, key)
            .map_err(|e| format!("keyring entry failed: {}", e))?;
        entry
            .set_password(value)
            .map_err(|e| format!("keyring set failed: {}", e))
    }
}

/// In-process secret storage. Used in tests and when the `keyring` feature is off.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    read_only: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose writes always fail (simulates a locked keychain).
    pub fn read_only() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            read_only: true,
        }
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        self
    }
}

impl SecretBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self.entries.lock().map_err(|e| e.to_string())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        if self.read_only {
            return Err("secure store is read-only".to_string());
        }
        let mut entries = self.entries.lock().map_err(|e| e.to_string())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Plaintext TOML preference file. Keys this crate does not own are preserved on write.
#[derive(Debug, Clone)]
pub struct PreferenceFile {
    path: PathBuf,
}

impl PreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<toml::Table, String> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        content.parse::<toml::Table>().map_err(|e| e.to_string())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, String> {
        let table = self.read_table()?;
        Ok(table
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    /// Fails without writing when the existing file cannot be parsed, so keys this
    /// crate does not own are never dropped.
    pub fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut table = self.read_table()?;
        table.insert(key.to_string(), toml::Value::String(value.to_string()));
        let content = toml::to_string_pretty(&table).map_err(|e| e.to_string())?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
        }
        std::fs::write(&self.path, content).map_err(|e| e.to_string())
    }
}

/// Process-wide credential service. Share it as `Arc<CredentialStore>`.
pub struct CredentialStore {
    secure: Box<dyn SecretBackend>,
    prefs: PreferenceFile,
    session: RwLock<Option<String>>,
    cached: RwLock<Option<String>>,
}

impl CredentialStore {
    pub fn new(secure: Box<dyn SecretBackend>, prefs: PreferenceFile) -> Self {
        Self {
            secure,
            prefs,
            session: RwLock::new(None),
            cached: RwLock::new(None),
        }
    }

    /// Keychain-backed store (or in-memory when built without `keyring`) using the
    /// configured preference file.
    pub fn from_config(config: &ClientConfig) -> Self {
        #[cfg(feature = "keyring")]
        let secure: Box<dyn SecretBackend> =
            Box::new(KeychainBackend::new(config.keychain_service.clone()));
        #[cfg(not(feature = "keyring"))]
        let secure: Box<dyn SecretBackend> = Box::new(MemoryBackend::new());
        Self::new(secure, PreferenceFile::new(config.prefs_file()))
    }

    /// The active token. Never fails.
    pub fn resolve(&self) -> String {
        if let Some(token) = read_slot(&self.session).filter(|t| !t.is_empty()) {
            return token;
        }
        if let Some(token) = read_slot(&self.cached) {
            return token;
        }
        let token = self.lookup();
        write_slot(&self.cached, Some(token.clone()));
        token
    }

    /// Drop the cached lookup; the next `resolve` reads the keychain and preference
    /// file again.
    pub fn invalidate(&self) {
        write_slot(&self.cached, None);
    }

    fn lookup(&self) -> String {
        match self.secure.get(CONTROL_TOKEN_ENTRY) {
            Ok(Some(token)) if !token.trim().is_empty() => return token,
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "secure store unavailable for control token"),
        }
        match self.prefs.get(PREFS_TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => return token,
            Ok(_) => {}
            Err(e) => tracing::debug!(
                error = %e,
                path = %self.prefs.path().display(),
                "preference file unreadable"
            ),
        }
        DEFAULT_CONTROL_TOKEN.to_string()
    }

    /// Persist a new token to the keychain and the preference file. The token is
    /// active for this process even when an error (partial failure) is returned.
    pub fn save(&self, token: &str) -> Result<(), StoreError> {
        let token = token.trim().to_string();
        write_slot(&self.session, Some(token.clone()));
        self.invalidate();

        let secure = self.secure.set(CONTROL_TOKEN_ENTRY, &token);
        if let Err(e) = &secure {
            tracing::warn!(
                error = %e,
                "control token not written to secure store; using preference file"
            );
        }
        let prefs = self.prefs.set(PREFS_TOKEN_KEY, &token);
        if let Err(e) = &prefs {
            tracing::warn!(
                error = %e,
                path = %self.prefs.path().display(),
                "control token not written to preference file"
            );
        }

        match (secure, prefs) {
            (Err(e), _) => Err(StoreError::SecureStore(e)),
            (Ok(()), Err(e)) => Err(StoreError::Preferences(e)),
            (Ok(()), Ok(())) => {
                tracing::info!("control token saved");
                Ok(())
            }
        }
    }

    /// LLM provider API key from the secure store, if any.
    pub fn llm_api_key(&self) -> Option<String> {
        match self.secure.get(LLM_API_KEY_ENTRY) {
            Ok(key) => key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                tracing::debug!(error = %e, "secure store unavailable for LLM API key");
                None
            }
        }
    }

    /// Secure store only; the API key is never written to the preference file.
    pub fn save_llm_api_key(&self, key: &str) -> Result<(), StoreError> {
        self.secure
            .set(LLM_API_KEY_ENTRY, key.trim())
            .map_err(StoreError::SecureStore)
    }
}

fn read_slot(slot: &RwLock<Option<String>>) -> Option<String> {
    match slot.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write_slot(slot: &RwLock<Option<String>>, value: Option<String>) {
    match slot.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}
