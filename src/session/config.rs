use serde::{Deserialize, Serialize};

/// Engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Longest key/alias, in whitespace-bounded words, the matcher will
    /// consider.
    pub max_key_words: usize,

    /// Cap on candidates listed by the built-in multimatch response.
    pub multimatch_limit: usize,

    /// Built-in response when nothing matches. Also used for denied
    /// commands, which must stay indistinguishable from a no-match.
    pub nomatch_message: String,

    /// Generic response when a command's execution fails.
    pub failure_message: String,

    /// Posts kept per channel by the in-memory channel directory.
    pub channel_history: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            max_key_words: 3,
            multimatch_limit: 10,
            nomatch_message: "Command not found.".to_string(),
            failure_message: "Something went wrong. Nothing happened.".to_string(),
            channel_history: 50,
        }
    }

    pub fn max_key_words(mut self, words: usize) -> Self {
        self.max_key_words = words;
        self
    }

    pub fn multimatch_limit(mut self, limit: usize) -> Self {
        self.multimatch_limit = limit;
        self
    }

    pub fn nomatch_message(mut self, message: &str) -> Self {
        self.nomatch_message = message.to_string();
        self
    }

    pub fn failure_message(mut self, message: &str) -> Self {
        self.failure_message = message.to_string();
        self
    }

    pub fn channel_history(mut self, posts: usize) -> Self {
        self.channel_history = posts;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> crate::core::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| crate::core::CmdError::ParseError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_key_words == 0 {
            return Err("max_key_words must be at least 1".to_string());
        }
        if self.multimatch_limit == 0 {
            return Err("multimatch_limit must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .max_key_words(5)
            .nomatch_message("Huh?");
        assert_eq!(config.max_key_words, 5);
        assert_eq!(config.nomatch_message, "Huh?");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = EngineConfig::new().max_key_words(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let json = serde_json::to_string(&EngineConfig::new().max_key_words(5)).unwrap();
        std::fs::write(&path, json).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_key_words, 5);

        assert!(EngineConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
