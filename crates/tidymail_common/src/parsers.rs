//! Model reply parsing.
//!
//! A reply is either a tool invocation (`TOOL:COMMAND:arg1:arg2`), a terminal
//! category answer, or noise. The three-way split is made explicit here so
//! the categorization loop never does its own prefix checks.

/// Marker a reply must start with to count as a tool invocation.
pub const TOOL_MARKER: &str = "TOOL:";

/// Maximum accepted category name length, in characters.
pub const MAX_CATEGORY_LEN: usize = 100;

/// Generic acknowledgements that are never valid category names.
pub const GENERIC_RESPONSES: [&str; 7] =
    ["ok", "si", "no", "grazie", "thanks", "thank you", "okay"];

/// A parsed tool invocation: command name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub command: String,
    pub args: Vec<String>,
}

/// Classified model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// Reply requests a tool; dispatch it and keep the conversation going.
    ToolCall(ToolInvocation),

    /// Reply is a valid terminal category answer (already trimmed).
    Category(String),

    /// Reply is neither; the model must be told to answer with a category.
    Invalid,
}

/// Classify a raw model reply.
pub fn parse_reply(text: &str) -> ModelReply {
    if is_tool_call(text) {
        return ModelReply::ToolCall(parse_tool_call(text));
    }
    match parse_category(text) {
        Some(category) => ModelReply::Category(category),
        None => ModelReply::Invalid,
    }
}

/// Whether the reply is a tool invocation.
pub fn is_tool_call(text: &str) -> bool {
    text.starts_with(TOOL_MARKER)
}

/// Parse a tool invocation: strip the marker and split on `:`.
///
/// The first segment is the command, the rest are positional arguments in
/// order. Segments are not trimmed - the argument grammar is exactly what
/// the model typed.
pub fn parse_tool_call(text: &str) -> ToolInvocation {
    let rest = text.strip_prefix(TOOL_MARKER).unwrap_or(text).trim();
    let mut segments = rest.split(':');
    let command = segments.next().unwrap_or("").to_string();
    let args = segments.map(str::to_string).collect();
    ToolInvocation { command, args }
}

/// Extract a category name from a terminal answer.
///
/// Returns `None` for tool calls, empty or overlong text, text containing
/// characters outside alphanumerics/whitespace/`-`/`_`, and generic
/// acknowledgements. Otherwise returns the trimmed text unchanged.
pub fn parse_category(text: &str) -> Option<String> {
    if is_tool_call(text) {
        return None;
    }

    let category = text.trim();
    if !is_valid_category_name(category) {
        return None;
    }

    Some(category.to_string())
}

/// Validation shared by terminal answers and the ADD_CATEGORY tool.
pub fn is_valid_category_name(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > MAX_CATEGORY_LEN {
        return false;
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_whitespace() || c == '-' || c == '_')
    {
        return false;
    }

    let lowered = name.to_lowercase();
    !GENERIC_RESPONSES.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_tool_call() {
        assert!(is_tool_call("TOOL:GET_CATEGORIES"));
        assert!(!is_tool_call("Work"));
        assert!(!is_tool_call(" TOOL:GET_CATEGORIES"));
        assert!(!is_tool_call("tool:GET_CATEGORIES"));
    }

    #[test]
    fn test_parse_tool_call_no_args() {
        let inv = parse_tool_call("TOOL:GET_CATEGORIES");
        assert_eq!(inv.command, "GET_CATEGORIES");
        assert!(inv.args.is_empty());
    }

    #[test]
    fn test_parse_tool_call_with_args() {
        let inv = parse_tool_call("TOOL:ADD_CATEGORY:Travel:trips and bookings");
        assert_eq!(inv.command, "ADD_CATEGORY");
        assert_eq!(inv.args, vec!["Travel", "trips and bookings"]);
    }

    #[test]
    fn test_parse_tool_call_preserves_arg_order() {
        let inv = parse_tool_call("TOOL:CMD:a:b:c");
        assert_eq!(inv.args, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_category_accepts_plain_names() {
        assert_eq!(parse_category("Work"), Some("Work".to_string()));
        assert_eq!(parse_category("  Travel  "), Some("Travel".to_string()));
        assert_eq!(
            parse_category("Job Offers-2024_b"),
            Some("Job Offers-2024_b".to_string())
        );
    }

    #[test]
    fn test_parse_category_rejects_tool_calls() {
        assert_eq!(parse_category("TOOL:GET_CATEGORIES"), None);
    }

    #[test]
    fn test_parse_category_rejects_empty() {
        assert_eq!(parse_category(""), None);
        assert_eq!(parse_category("   "), None);
    }

    #[test]
    fn test_parse_category_rejects_overlong() {
        let long = "a".repeat(MAX_CATEGORY_LEN + 1);
        assert_eq!(parse_category(&long), None);

        let exactly = "a".repeat(MAX_CATEGORY_LEN);
        assert_eq!(parse_category(&exactly), Some(exactly));
    }

    #[test]
    fn test_parse_category_rejects_special_characters() {
        assert_eq!(parse_category("Work!"), None);
        assert_eq!(parse_category("a/b"), None);
        assert_eq!(parse_category("name@domain"), None);
    }

    #[test]
    fn test_parse_category_rejects_generic_responses() {
        for generic in GENERIC_RESPONSES {
            assert_eq!(parse_category(generic), None, "accepted {:?}", generic);
        }
        assert_eq!(parse_category("OK"), None);
        assert_eq!(parse_category("  Thank You  "), None);
    }

    #[test]
    fn test_parse_reply_variants() {
        assert_eq!(
            parse_reply("TOOL:GET_CATEGORY_INFO:Work"),
            ModelReply::ToolCall(ToolInvocation {
                command: "GET_CATEGORY_INFO".to_string(),
                args: vec!["Work".to_string()],
            })
        );
        assert_eq!(parse_reply("Work"), ModelReply::Category("Work".to_string()));
        assert_eq!(parse_reply("ok"), ModelReply::Invalid);
        assert_eq!(parse_reply("I think it is Work."), ModelReply::Invalid);
    }
}
