//! Override Command Parsing
//!
//! Control phrases get first refusal on user input, parsed into typed
//! commands before anything reaches the skill registry. Unrecognized text
//! returns None and flows on to skill matching and the completion
//! fallback.

/// A parsed control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideCommand {
    PauseAutonomy,
    ResumeAutonomy,
    SetGoal(String),
    ClearGoal,
    FocusOn(String),
    ShowGoal,
    ShowStatus,
}

/// Match the fixed set of control phrases. Case-insensitive, whitespace
/// trimmed; prefix commands take the remainder as their argument.
pub fn parse_override(text: &str) -> Option<OverrideCommand> {
    let text = text.trim().to_lowercase();

    match text.as_str() {
        "stop autonomy" | "pause autonomy" => return Some(OverrideCommand::PauseAutonomy),
        "resume autonomy" | "start autonomy" => return Some(OverrideCommand::ResumeAutonomy),
        "clear goal" | "remove goal" => return Some(OverrideCommand::ClearGoal),
        "what is your goal" | "current goal" => return Some(OverrideCommand::ShowGoal),
        "status" | "show status" => return Some(OverrideCommand::ShowStatus),
        _ => {}
    }

    if let Some(rest) = text.strip_prefix("set goal") {
        let name = rest.trim();
        if !name.is_empty() {
            return Some(OverrideCommand::SetGoal(name.to_string()));
        }
    }

    if let Some(rest) = text.strip_prefix("focus on") {
        let name = rest.trim();
        if !name.is_empty() {
            return Some(OverrideCommand::FocusOn(name.to_string()));
        }
    }

    None
}
