//! Universe configuration: the ordered list of instruments to screen.
//!
//! Stored as TOML `[[instrument]]` tables. Order is significant; it is the
//! order of the screening table.

use crate::domain::Instrument;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    #[serde(rename = "instrument", default)]
    pub instruments: Vec<Instrument>,
}

impl Universe {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// The eight large-cap US names the screener ships with.
    pub fn default_screen() -> Self {
        let instruments = [
            ("ALPHABET INC", "GOOGL"),
            ("AMAZON", "AMZN"),
            ("AMERICA AIRLINES", "AAL"),
            ("ALIBABA GROUP HOLDING", "BABA"),
            ("BANK OF AMERICA CORP", "BAC"),
            ("NETFLIX", "NFLX"),
            ("NVIDIA", "NVDA"),
            ("TESLA", "TSLA"),
        ]
        .into_iter()
        .map(|(name, symbol)| Instrument::new(name, symbol))
        .collect();
        Self { instruments }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::default_screen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_order() {
        let u = Universe::default_screen();
        assert_eq!(
            u.symbols(),
            vec!["GOOGL", "AMZN", "AAL", "BABA", "BAC", "NFLX", "NVDA", "TSLA"]
        );
        assert_eq!(u.instruments[3].display_name, "ALIBABA GROUP HOLDING");
    }

    #[test]
    fn toml_roundtrip_keeps_order() {
        let u = Universe::default_screen();
        let text = u.to_toml().unwrap();
        assert!(text.contains("[[instrument]]"));
        assert_eq!(Universe::from_toml(&text).unwrap(), u);
    }

    #[test]
    fn parses_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("universe.toml");
        std::fs::write(
            &path,
            "[[instrument]]\nname = \"TESLA\"\nsymbol = \"TSLA\"\n\n\
             [[instrument]]\nname = \"NETFLIX\"\nsymbol = \"NFLX\"\n",
        )
        .unwrap();
        let u = Universe::from_file(&path).unwrap();
        assert_eq!(u.symbols(), vec!["TSLA", "NFLX"]);
    }

    #[test]
    fn empty_file_is_empty_universe() {
        assert!(Universe::from_toml("").unwrap().is_empty());
    }
}
