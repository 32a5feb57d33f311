//! Session lifecycle: setup, rate-limited unlock, lock, idle auto-lock, and
//! master-password change.
//!
//! One `SessionManager` exists per process and owns all mutable session
//! state: the throttle counters, the idle timer, and (while unlocked) the
//! derived key inside the open `VaultStore`. Taking `&mut self` for every
//! transition serializes them.

use crate::autolock::AutoLock;
use crate::crypto::kdf::{derive_key, EncryptionSalt};
use crate::crypto::password::{hash_password, verify_password, BCRYPT_COST};
use crate::lockout::AuthThrottle;
use crate::store::{ConfigStore, VaultStore};
use crate::{CryptoError, Result, VaultError};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;
use tracing::{info, warn};

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// bcrypt cost factor for the master-password hash.
    pub bcrypt_cost: u32,
    /// Idle time before the vault auto-locks.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: BCRYPT_COST,
            idle_timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Events emitted to external collaborators (the UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    AutoLocked,
}

/// Result of a successful unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked,
    /// The store failed to decrypt and one-shot recovery ran: the vault is
    /// open but empty, under a fresh salt. Prior data is lost. Callers must
    /// surface this, never swallow it.
    RecoveredEmpty,
}

/// Lock/unlock state machine and owner of the vault handle.
pub struct SessionManager {
    config: ConfigStore,
    vault_path: PathBuf,
    store: Option<VaultStore>,
    throttle: AuthThrottle,
    idle: AutoLock,
    events: Sender<SessionEvent>,
    settings: SessionConfig,
}

impl SessionManager {
    /// Create a session manager rooted at `data_dir`.
    ///
    /// Returns the manager plus the receiving end of its event channel.
    pub fn new(data_dir: PathBuf, settings: SessionConfig) -> Result<(Self, Receiver<SessionEvent>)> {
        std::fs::create_dir_all(&data_dir)?;
        let config = ConfigStore::open(data_dir.join("config.db"))?;
        let (tx, rx) = channel();

        let idle = AutoLock::new(settings.idle_timeout);
        Ok((
            Self {
                config,
                vault_path: data_dir.join("vault.db"),
                store: None,
                throttle: AuthThrottle::new(),
                idle,
                events: tx,
                settings,
            },
            rx,
        ))
    }

    pub fn is_setup(&self) -> Result<bool> {
        self.config.is_setup()
    }

    pub fn is_locked(&self) -> bool {
        self.store.is_none()
    }

    /// Initialize a new vault. Fails if one already exists.
    pub fn setup(&mut self, password: &str) -> Result<()> {
        if self.is_setup()? {
            return Err(VaultError::AlreadyInitialized);
        }

        let record = hash_password(password, self.settings.bcrypt_cost)?;
        let salt = EncryptionSalt::generate();
        self.config.set_password_record(&record)?;
        self.config.set_encryption_salt(&salt)?;

        let key = derive_key(password, &salt);
        self.store = Some(VaultStore::initialize(&self.vault_path, key)?);
        self.idle.record_activity();
        info!("Vault set up and unlocked");
        Ok(())
    }

    /// Verify the master password and unlock the vault. Rate-limited.
    pub fn verify(&mut self, password: &str) -> Result<UnlockOutcome> {
        let record = self
            .config
            .password_record()?
            .ok_or(VaultError::NotInitialized)?;

        // The backoff rejection happens before bcrypt is consulted and does
        // not consume an attempt.
        if let Err(remaining_seconds) = self.throttle.check() {
            return Err(VaultError::RateLimited { remaining_seconds });
        }

        let ok = verify_password(password, &record).map_err(|e| match e {
            CryptoError::HashFailed(msg) => VaultError::CorruptConfig(msg),
            other => VaultError::Crypto(other),
        })?;

        if !ok {
            self.throttle.record_failure();
            warn!(
                failed_attempts = self.throttle.failed_attempts(),
                "Master password verification failed"
            );
            return Err(VaultError::InvalidPassword);
        }

        self.throttle.reset();
        let outcome = self.open_store(password)?;
        self.idle.record_activity();
        info!("Vault unlocked");
        Ok(outcome)
    }

    /// Open the vault store, running the one-shot recovery protocol when the
    /// persisted data no longer decrypts.
    fn open_store(&mut self, password: &str) -> Result<UnlockOutcome> {
        let salt = self
            .config
            .encryption_salt()?
            .ok_or_else(|| VaultError::CorruptConfig("Missing encryption salt".to_string()))?;
        let key = derive_key(password, &salt);

        match VaultStore::open(&self.vault_path, key) {
            Ok(store) => {
                self.store = Some(store);
                Ok(UnlockOutcome::Unlocked)
            }
            Err(e) => {
                if self.config.recovery_attempted()? {
                    return Err(VaultError::PersistentCorruption);
                }
                warn!("Vault store failed to open ({}); running one-shot recovery - prior data is lost", e);
                let new_salt = EncryptionSalt::generate();
                let new_key = derive_key(password, &new_salt);
                let _ = std::fs::remove_file(&self.vault_path);
                let store = VaultStore::initialize(&self.vault_path, new_key)?;
                self.config.set_encryption_salt(&new_salt)?;
                self.config.set_recovery_attempted(true)?;
                self.store = Some(store);
                Ok(UnlockOutcome::RecoveredEmpty)
            }
        }
    }

    /// Lock the vault, discarding the key and store handle. Idempotent.
    pub fn lock(&mut self) {
        if self.store.take().is_some() {
            info!("Vault locked");
        }
    }

    /// Change the master password, re-encrypting the vault under the
    /// new-password key before the verification hash is swapped.
    ///
    /// The previous lock state is restored afterwards. A store that fails to
    /// decrypt aborts the change: corruption recovery only runs through
    /// `verify`, where the data loss is surfaced, never as a side effect
    /// here.
    pub fn change_password(&mut self, current: &str, new: &str) -> Result<()> {
        let record = self
            .config
            .password_record()?
            .ok_or(VaultError::NotInitialized)?;
        let ok = verify_password(current, &record).map_err(|e| match e {
            CryptoError::HashFailed(msg) => VaultError::CorruptConfig(msg),
            other => VaultError::Crypto(other),
        })?;
        if !ok {
            return Err(VaultError::InvalidPassword);
        }

        let salt = self
            .config
            .encryption_salt()?
            .ok_or_else(|| VaultError::CorruptConfig("Missing encryption salt".to_string()))?;

        let was_locked = self.is_locked();
        if was_locked {
            let key = derive_key(current, &salt);
            self.store = Some(VaultStore::open(&self.vault_path, key)?);
        }

        let new_key = derive_key(new, &salt);

        // Re-key first, hash swap second: a failure mid-way leaves the old
        // password valid for both authentication and decryption.
        self.store
            .as_mut()
            .ok_or(VaultError::VaultLocked)?
            .rekey(new_key)?;

        let new_record = hash_password(new, self.settings.bcrypt_cost)?;
        self.config.set_password_record(&new_record)?;

        if was_locked {
            self.lock();
        }
        info!("Master password changed and vault re-keyed");
        Ok(())
    }

    /// Check the idle timer, auto-locking on expiry.
    ///
    /// Returns true when this call performed the lock; an `AutoLocked` event
    /// is emitted on the session's event channel.
    pub fn poll_auto_lock(&mut self) -> bool {
        if !self.is_locked() && self.idle.should_lock() {
            self.lock();
            warn!("Vault auto-locked after idle timeout");
            let _ = self.events.send(SessionEvent::AutoLocked);
            return true;
        }
        false
    }

    /// Access the open vault store. Fails with `VaultLocked` while locked;
    /// resets the idle timer otherwise.
    pub fn store_mut(&mut self) -> Result<&mut VaultStore> {
        self.idle.record_activity();
        self.store.as_mut().ok_or(VaultError::VaultLocked)
    }

    /// Read-only access to the open vault store.
    pub fn store(&mut self) -> Result<&VaultStore> {
        self.idle.record_activity();
        self.store.as_ref().ok_or(VaultError::VaultLocked)
    }

    /// Run the password health audit over the open vault.
    pub fn audit_passwords(&mut self) -> Result<crate::audit::PasswordAuditReport> {
        Ok(crate::audit::audit_passwords(self.store()?.password_entries()))
    }

    /// Disable the idle timer (e.g. while a long export runs).
    pub fn disable_auto_lock(&mut self) {
        self.idle.disable();
    }

    pub fn enable_auto_lock(&mut self) {
        self.idle.enable();
    }

    pub fn set_idle_timeout(&mut self, timeout: Duration) {
        self.idle.set_timeout(timeout);
    }
}
