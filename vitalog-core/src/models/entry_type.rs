use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a food entry was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Text,
    Image,
    Audio,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Text => write!(f, "text"),
            EntryType::Image => write!(f, "image"),
            EntryType::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(EntryType::Text),
            "image" => Ok(EntryType::Image),
            "audio" => Ok(EntryType::Audio),
            _ => Err(format!(
                "Invalid entry type '{}'. Valid options: text, image, audio",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_from_str() {
        assert_eq!(EntryType::from_str("TEXT").unwrap(), EntryType::Text);
        assert_eq!(EntryType::from_str("audio").unwrap(), EntryType::Audio);
        assert!(EntryType::from_str("video").is_err());
    }
}
