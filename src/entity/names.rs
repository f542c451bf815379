//! Syllable name generator for entities spawned during play

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameGenerator {
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
}

impl Default for NameGenerator {
    fn default() -> Self {
        let prefixes = ["Aki", "Yuki", "Hana", "Saki", "Miko", "Rei", "Kyo", "Tai", "Ren", "Nao"];
        let suffixes = ["ko", "mi", "ka", "na", "ri", "to", "ya", "hi", "ru", "ta"];
        Self {
            prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NameGenerator {
    /// Draws one prefix then one suffix
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let prefix = self.prefixes.choose(rng).map(String::as_str).unwrap_or("");
        let suffix = self.suffixes.choose(rng).map(String::as_str).unwrap_or("");
        let name = format!("{prefix}{suffix}");
        if name.is_empty() {
            "Unnamed".to_string()
        } else {
            name
        }
    }
}
