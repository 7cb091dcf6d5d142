use serde::{Deserialize, Serialize};

/// A screened instrument: the name shown in the table and the provider symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Instrument {
    #[serde(rename = "name")]
    pub display_name: String,
    pub symbol: String,
}

impl Instrument {
    pub fn new(display_name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            symbol: symbol.into(),
        }
    }
}
