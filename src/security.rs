use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Permissions a requester may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageOptions,
    EditThemeOptions,
}

/// Who is making a request.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    capabilities: HashSet<Capability>,
}

impl Requester {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug)]
struct IssuedNonce {
    action: String,
    issued_at: DateTime<Utc>,
}

/// Anti-forgery tokens bound to a named action.
pub struct NonceRegistry {
    lifetime: Duration,
    issued: Mutex<HashMap<String, IssuedNonce>>,
}

impl Default for NonceRegistry {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

impl NonceRegistry {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            issued: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, action: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.lock().insert(
            token.clone(),
            IssuedNonce {
                action: action.to_string(),
                issued_at: Utc::now(),
            },
        );
        token
    }

    /// Whether `token` was issued for `action` and is still fresh.
    pub fn verify(&self, action: &str, token: &str) -> bool {
        let now = Utc::now();
        let mut issued = self.lock();
        issued.retain(|_, nonce| now - nonce.issued_at < self.lifetime);
        issued
            .get(token)
            .is_some_and(|nonce| nonce.action == action)
    }

    /// Verifies `token` and burns it so it cannot be replayed.
    pub fn consume(&self, action: &str, token: &str) -> bool {
        if !self.verify(action, token) {
            debug!("Rejected nonce for '{}'", action);
            return false;
        }
        self.lock().remove(token).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, IssuedNonce>> {
        self.issued.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
