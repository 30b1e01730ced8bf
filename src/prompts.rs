//! Fixed prompt catalog.

use rmcp::model::{GetPromptResult, Prompt, PromptMessage, PromptMessageRole};

pub const SCHEMA_ADDITION_NAME: &str = "schema-addition";
pub const SCHEMA_ADDITION_DESCRIPTION: &str = "Add a schema to the query";
pub const SCHEMA_ADDITION_TEXT: &str =
    "Add always in the sql query the schema of the table in order to provide a context for the query";

/// All prompts the server offers.
pub fn list_prompts() -> Vec<Prompt> {
    vec![Prompt::new(
        SCHEMA_ADDITION_NAME,
        Some(SCHEMA_ADDITION_DESCRIPTION),
        None,
    )]
}

/// Instantiate a prompt.
///
/// There is a single prompt without arguments, so the requested name is not
/// consulted.
pub fn get_prompt(_name: &str) -> GetPromptResult {
    GetPromptResult {
        description: Some(SCHEMA_ADDITION_DESCRIPTION.to_string()),
        messages: vec![PromptMessage::new_text(
            PromptMessageRole::User,
            SCHEMA_ADDITION_TEXT,
        )],
    }
}
