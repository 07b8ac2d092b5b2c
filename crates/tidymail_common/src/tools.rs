//! Tool commands the model may invoke during categorization.
//!
//! A fixed, closed set: every command maps onto one CategoryStore operation.
//! All failure modes (unknown command, missing or invalid arguments) are
//! returned as ordinary result strings and fed back into the conversation,
//! never raised as errors.

use crate::categories::CategoryStore;
use crate::parsers::{is_valid_category_name, ToolInvocation};

/// Closed enumeration of tool commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCommand {
    GetCategories,
    AddCategory,
    GetCategoryInfo,
}

/// Command names in documentation order.
pub const KNOWN_COMMANDS: [&str; 3] = ["GET_CATEGORIES", "ADD_CATEGORY", "GET_CATEGORY_INFO"];

impl ToolCommand {
    /// Resolve a command name; `None` for anything outside the closed set.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "GET_CATEGORIES" => Some(Self::GetCategories),
            "ADD_CATEGORY" => Some(Self::AddCategory),
            "GET_CATEGORY_INFO" => Some(Self::GetCategoryInfo),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetCategories => "GET_CATEGORIES",
            Self::AddCategory => "ADD_CATEGORY",
            Self::GetCategoryInfo => "GET_CATEGORY_INFO",
        }
    }
}

/// Execute a parsed tool invocation against the store.
///
/// Always returns a result string for the conversation, including for
/// unknown commands and malformed arguments.
pub fn dispatch(store: &mut CategoryStore, invocation: &ToolInvocation) -> String {
    let Some(command) = ToolCommand::parse(&invocation.command) else {
        return format!(
            "Unknown tool: {}. Available tools: {}",
            invocation.command,
            KNOWN_COMMANDS.join(", ")
        );
    };

    match command {
        ToolCommand::GetCategories => format!("{:?}", store.list()),
        ToolCommand::AddCategory => add_category(store, &invocation.args),
        ToolCommand::GetCategoryInfo => category_info(store, &invocation.args),
    }
}

fn add_category(store: &mut CategoryStore, args: &[String]) -> String {
    let Some(name) = args.first() else {
        return "Error: missing category name".to_string();
    };
    let description = args.get(1).map(String::as_str).unwrap_or("");

    if !is_valid_category_name(name) {
        return format!("Error: invalid category name: '{}'", name);
    }

    if store.add(name, description) {
        format!("Category '{}' added successfully", name)
    } else {
        format!("Category '{}' already exists", name)
    }
}

fn category_info(store: &CategoryStore, args: &[String]) -> String {
    let Some(name) = args.first() else {
        return "Error: missing category name".to_string();
    };

    match store.info(name) {
        Some(category) => {
            let description = if category.description.is_empty() {
                "no description"
            } else {
                category.description.as_str()
            };
            format!(
                "Category '{}': {} (created {})",
                name,
                description,
                category.created_at.to_rfc3339()
            )
        }
        None => format!("Category '{}' does not exist", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_tool_call;

    fn empty_store() -> (tempfile::TempDir, CategoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CategoryStore::load(dir.path().join("categories.json"));
        (dir, store)
    }

    #[test]
    fn test_add_category_then_list_and_info() {
        let (_dir, mut store) = empty_store();

        let result = dispatch(&mut store, &parse_tool_call("TOOL:ADD_CATEGORY:Foo:bar"));
        assert_eq!(result, "Category 'Foo' added successfully");
        assert_eq!(store.list(), vec!["Foo".to_string()]);
        assert_eq!(store.info("Foo").unwrap().description, "bar");
    }

    #[test]
    fn test_add_category_already_exists() {
        let (_dir, mut store) = empty_store();
        store.add("Work", "office");

        let result = dispatch(&mut store, &parse_tool_call("TOOL:ADD_CATEGORY:Work"));
        assert_eq!(result, "Category 'Work' already exists");
        assert_eq!(store.info("Work").unwrap().description, "office");
    }

    #[test]
    fn test_add_category_missing_name() {
        let (_dir, mut store) = empty_store();
        let result = dispatch(&mut store, &parse_tool_call("TOOL:ADD_CATEGORY"));
        assert_eq!(result, "Error: missing category name");
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_category_invalid_name() {
        let (_dir, mut store) = empty_store();
        let result = dispatch(&mut store, &parse_tool_call("TOOL:ADD_CATEGORY:a/b:desc"));
        assert_eq!(result, "Error: invalid category name: 'a/b'");
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_categories_renders_list() {
        let (_dir, mut store) = empty_store();
        store.add("Work", "");

        let result = dispatch(&mut store, &parse_tool_call("TOOL:GET_CATEGORIES"));
        assert_eq!(result, r#"["Work"]"#);
    }

    #[test]
    fn test_get_category_info_not_found() {
        let (_dir, mut store) = empty_store();
        let result = dispatch(&mut store, &parse_tool_call("TOOL:GET_CATEGORY_INFO:Ghost"));
        assert_eq!(result, "Category 'Ghost' does not exist");
    }

    #[test]
    fn test_get_category_info_found() {
        let (_dir, mut store) = empty_store();
        store.add("Travel", "trips");

        let result = dispatch(&mut store, &parse_tool_call("TOOL:GET_CATEGORY_INFO:Travel"));
        assert!(result.starts_with("Category 'Travel': trips (created "));
    }

    #[test]
    fn test_unknown_command_enumerates_tools() {
        let (_dir, mut store) = empty_store();
        let result = dispatch(&mut store, &parse_tool_call("TOOL:UNKNOWN_CMD"));
        assert_eq!(
            result,
            "Unknown tool: UNKNOWN_CMD. Available tools: GET_CATEGORIES, ADD_CATEGORY, GET_CATEGORY_INFO"
        );
    }
}
