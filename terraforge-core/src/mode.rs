//! Operation modes - the four TerraForge workflows

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the fixed workflows. Decides which prompt template applies and
/// which input fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationMode {
    #[default]
    Generate,
    Edit,
    Analyze,
    History,
}

impl OperationMode {
    pub const ALL: [OperationMode; 4] = [
        OperationMode::Generate,
        OperationMode::Edit,
        OperationMode::Analyze,
        OperationMode::History,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Generate => "GENERATE",
            OperationMode::Edit => "EDIT",
            OperationMode::Analyze => "ANALYZE",
            OperationMode::History => "HISTORY",
        }
    }

    /// Whether this mode runs an inference call (History only browses).
    pub fn is_actionable(&self) -> bool {
        !matches!(self, OperationMode::History)
    }

    /// Whether the mode carries a free-text instruction next to the code.
    pub fn takes_instruction(&self) -> bool {
        matches!(self, OperationMode::Edit)
    }

    pub fn title(&self) -> &'static str {
        match self {
            OperationMode::Generate => "Infrastructure Generator",
            OperationMode::Edit => "Code Refactor & Edit",
            OperationMode::Analyze => "Security & Logic Analyzer",
            OperationMode::History => "Session History",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for OperationMode {
    type Err = terraforge_error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GENERATE" => Ok(OperationMode::Generate),
            "EDIT" => Ok(OperationMode::Edit),
            "ANALYZE" => Ok(OperationMode::Analyze),
            "HISTORY" => Ok(OperationMode::History),
            _ => Err(crate::error::invalid_argument(format!("unknown mode '{}'", s))),
        }
    }
}

/// Modes that own a draft. History has none, so it is not a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftMode {
    Generate,
    Edit,
    Analyze,
}

impl DraftMode {
    pub const ALL: [DraftMode; 3] = [DraftMode::Generate, DraftMode::Edit, DraftMode::Analyze];

    pub fn storage_key(&self) -> &'static str {
        match self {
            DraftMode::Generate => "terraforge_draft_GENERATE",
            DraftMode::Edit => "terraforge_draft_EDIT",
            DraftMode::Analyze => "terraforge_draft_ANALYZE",
        }
    }
}

impl TryFrom<OperationMode> for DraftMode {
    type Error = OperationMode;

    fn try_from(mode: OperationMode) -> Result<Self, OperationMode> {
        match mode {
            OperationMode::Generate => Ok(DraftMode::Generate),
            OperationMode::Edit => Ok(DraftMode::Edit),
            OperationMode::Analyze => Ok(DraftMode::Analyze),
            OperationMode::History => Err(mode),
        }
    }
}

impl From<DraftMode> for OperationMode {
    fn from(mode: DraftMode) -> Self {
        match mode {
            DraftMode::Generate => OperationMode::Generate,
            DraftMode::Edit => OperationMode::Edit,
            DraftMode::Analyze => OperationMode::Analyze,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serializes_uppercase() {
        let json = serde_json::to_string(&OperationMode::Analyze).unwrap();
        assert_eq!(json, "\"ANALYZE\"");

        let mode: OperationMode = serde_json::from_str("\"EDIT\"").unwrap();
        assert_eq!(mode, OperationMode::Edit);
    }

    #[test]
    fn test_mode_from_str_is_case_insensitive() {
        assert_eq!("generate".parse::<OperationMode>().unwrap(), OperationMode::Generate);
        assert_eq!("History".parse::<OperationMode>().unwrap(), OperationMode::History);
        assert!("plan".parse::<OperationMode>().is_err());
    }

    #[test]
    fn test_mode_names_parse_back() {
        for mode in OperationMode::ALL {
            assert_eq!(mode.as_str().parse::<OperationMode>().unwrap(), mode);
        }
        assert!(!OperationMode::History.is_actionable());
        assert!(OperationMode::Edit.takes_instruction());
    }

    #[test]
    fn test_display_respects_width() {
        assert_eq!(format!("{:<8}|", OperationMode::Edit), "EDIT    |");
        assert_eq!(format!("{:>9}", OperationMode::Analyze), "  ANALYZE");
        assert_eq!(OperationMode::Generate.to_string(), "GENERATE");
    }

    #[test]
    fn test_history_has_no_draft() {
        assert!(DraftMode::try_from(OperationMode::History).is_err());
        for mode in DraftMode::ALL {
            assert_eq!(DraftMode::try_from(OperationMode::from(mode)), Ok(mode));
        }
    }

    #[test]
    fn test_draft_keys_are_distinct() {
        let keys: std::collections::HashSet<_> =
            DraftMode::ALL.iter().map(|m| m.storage_key()).collect();
        assert_eq!(keys.len(), DraftMode::ALL.len());
    }
}
