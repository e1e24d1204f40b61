//! Prompt sent to the model for every description.

/// Builds the description prompt for `tool`. Deterministic for a given name.
#[must_use]
pub fn description_prompt(tool: &str) -> String {
    format!(
        "You are ivelLevi, a brilliant strategist and master of OSINT. Provide a short, clever, \
         and insightful description for the tool named \"{tool}\". Your tone should be sharp, \
         witty, and subtly powerful. Explain its use in a way that highlights its strategic value \
         for information gathering."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_the_tool_name() {
        let prompt = description_prompt("Maltego");
        assert!(prompt.contains("the tool named \"Maltego\""));
        assert_eq!(prompt, description_prompt("Maltego"));
    }
}
