// ── Core identity types ──
//
// Every registry entry is addressed two ways: by the backend's own key
// (owning client + backend uid) and by the surrogate id assigned locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── ClientId ────────────────────────────────────────────────────────

/// Identifier of the client backend (PVR add-on instance) that owns an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i32);

impl ClientId {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for ClientId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── BackendUid ──────────────────────────────────────────────────────

/// Key of an entity on its backend. Only meaningful together with the
/// owning [`ClientId`].
///
/// Providers are keyed by integers, media tags by opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendUid {
    Int(i64),
    Str(String),
}

impl BackendUid {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for BackendUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for BackendUid {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<String> for BackendUid {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for BackendUid {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

// ── EntityKey ───────────────────────────────────────────────────────

/// Composite identity `(client, backend uid)`. Unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub client_id: ClientId,
    pub uid: BackendUid,
}

impl EntityKey {
    pub fn new(client_id: impl Into<ClientId>, uid: impl Into<BackendUid>) -> Self {
        Self {
            client_id: client_id.into(),
            uid: uid.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.client_id, self.uid)
    }
}

/// Parses the `client/uid` form produced by `Display`. A numeric uid
/// becomes [`BackendUid::Int`].
impl FromStr for EntityKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (client, uid) = s
            .split_once('/')
            .ok_or_else(|| format!("expected '<client>/<uid>', got '{s}'"))?;
        let client_id: i32 = client
            .parse()
            .map_err(|_| format!("invalid client id '{client}'"))?;
        if uid.is_empty() {
            return Err(format!("missing backend uid in '{s}'"));
        }
        let uid = uid
            .parse::<i64>()
            .map_or_else(|_| BackendUid::from(uid), BackendUid::Int);
        Ok(Self::new(client_id, uid))
    }
}

// ── SurrogateId ─────────────────────────────────────────────────────

/// Locally assigned, monotonically increasing id. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurrogateId(pub u64);

impl SurrogateId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn backend_uid_untagged_serde() {
        let int: BackendUid = serde_json::from_str("42").unwrap();
        assert_eq!(int, BackendUid::Int(42));

        let s: BackendUid = serde_json::from_str("\"rec-7\"").unwrap();
        assert_eq!(s.as_str(), Some("rec-7"));
    }

    #[test]
    fn entity_key_display_and_parse() {
        let key = EntityKey::new(3, "abc");
        assert_eq!(key.to_string(), "3/abc");

        let parsed: EntityKey = "3/abc".parse().unwrap();
        assert_eq!(parsed, key);

        let numeric: EntityKey = "1/-1".parse().unwrap();
        assert_eq!(numeric.uid, BackendUid::Int(-1));
    }

    #[test]
    fn entity_key_parse_rejects_garbage() {
        assert!("nope".parse::<EntityKey>().is_err());
        assert!("x/1".parse::<EntityKey>().is_err());
        assert!("1/".parse::<EntityKey>().is_err());
    }

    #[test]
    fn keys_with_same_uid_on_different_clients_differ() {
        assert_ne!(EntityKey::new(1, 5_i64), EntityKey::new(2, 5_i64));
    }
}
