/// Core identifier types for the lobby
use serde::{Deserialize, Serialize};

/// Unique player identifier, minted by the coordinator when a connection
/// is accepted. Opaque to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Generate a new unique player ID
    /// Uses base58 encoding of UUID so the ID is short and URL/log friendly
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let encoded = bs58::encode(uuid.as_bytes()).into_string();
        // Take first 16 characters for reasonable length
        let shortened = encoded.chars().take(16).collect::<String>();
        PlayerId(shortened)
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room code shared between players to pair up. Short and alphanumeric so
/// it can be read aloud or typed by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

/// Length of generated room codes
const ROOM_CODE_LEN: usize = 7;

impl RoomId {
    /// Generate a new random room code
    pub fn generate() -> Self {
        use rand::distr::Alphanumeric;
        use rand::Rng;

        let code: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(ROOM_CODE_LEN)
            .map(char::from)
            .collect();
        RoomId(code.to_lowercase())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        RoomId(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        RoomId(s)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name used when a player never set one, or submitted a blank one
pub fn default_display_name(id: &PlayerId) -> String {
    format!("Player-{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_generation_unique() {
        let id1 = PlayerId::generate();
        let id2 = PlayerId::generate();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_room_code_shape() {
        let id = RoomId::generate();
        assert_eq!(id.as_str().len(), ROOM_CODE_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(id.as_str(), id.as_str().to_lowercase());
    }

    #[test]
    fn test_default_display_name() {
        let id = PlayerId::from("abc123");
        assert_eq!(default_display_name(&id), "Player-abc123");
    }
}
