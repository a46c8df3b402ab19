/// Response script, detected structurally from the user's message. The
/// engine supports Latin-script (English) and Hebrew output; a single
/// response never mixes the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Latin,
    Hebrew,
}

/// Any code point in the Hebrew block selects Hebrew output for the whole
/// response. Structural detection, not language identification.
pub fn detect_script(text: &str) -> Script {
    if text.chars().any(is_hebrew) {
        Script::Hebrew
    } else {
        Script::Latin
    }
}

fn is_hebrew(ch: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&ch)
}

impl Script {
    /// Prefix for failure outcomes surfaced verbatim to the user.
    pub fn error_prefix(self) -> &'static str {
        match self {
            Self::Latin => "Error: ",
            Self::Hebrew => "שגיאה: ",
        }
    }

    /// Truncation marker appended when a listing exceeds the item cap.
    pub fn more_marker(self, hidden: usize) -> String {
        match self {
            Self::Latin => format!("+{hidden} more"),
            Self::Hebrew => format!("ועוד {hidden}"),
        }
    }

    /// Default label for a missing status-like field. Scoped to fields
    /// documented as safe to default; never a general null-to-text rule.
    pub fn default_status_label(self) -> &'static str {
        match self {
            Self::Latin => "Active",
            Self::Hebrew => "פעיל",
        }
    }

    pub fn what_next_header(self) -> &'static str {
        match self {
            Self::Latin => "What next:",
            Self::Hebrew => "מה הלאה:",
        }
    }

    /// Generic message for the top-level catch path. The caller always
    /// receives a well-formed response; this is its text.
    pub fn generic_failure(self) -> &'static str {
        match self {
            Self::Latin => "I encountered an unexpected error. Please try again.",
            Self::Hebrew => "נתקלתי בשגיאה בלתי צפויה. נסו שוב.",
        }
    }
}
