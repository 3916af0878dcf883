//! Prompt rendering.
//!
//! A prompt is a template with `{{name}}` placeholders plus ordered
//! variable specs. Missing required variables are a normal interaction
//! turn, not a protocol error: the client receives the exact missing
//! names and can resubmit.

use std::collections::HashMap;

use flymcp_protocol::{GetPromptResult, PromptDefinition};

/// A registered prompt: definition plus template text.
#[derive(Debug, Clone)]
pub struct PromptEntry {
    /// The prompt definition.
    pub definition: PromptDefinition,
    /// Template text with `{{name}}` placeholders.
    pub template: String,
}

impl PromptEntry {
    /// Creates a prompt entry.
    #[must_use]
    pub fn new(definition: PromptDefinition, template: impl Into<String>) -> Self {
        Self {
            definition,
            template: template.into(),
        }
    }

    /// Renders the template with the supplied variables.
    ///
    /// Defaults are applied for absent optional variables; absent
    /// required variables produce a `variablesNeeded` result listing
    /// exactly the missing names, in declaration order.
    #[must_use]
    pub fn render(&self, variables: &HashMap<String, String>) -> GetPromptResult {
        let mut missing = Vec::new();
        let mut values: HashMap<&str, &str> = HashMap::new();

        for spec in &self.definition.variables {
            match (variables.get(&spec.name), spec.default.as_deref()) {
                (Some(value), _) => {
                    values.insert(spec.name.as_str(), value.as_str());
                }
                (None, Some(default)) => {
                    values.insert(spec.name.as_str(), default);
                }
                (None, None) if spec.required => missing.push(spec.name.clone()),
                (None, None) => {}
            }
        }

        if !missing.is_empty() {
            return GetPromptResult::VariablesNeeded {
                variables_needed: missing,
            };
        }

        let mut text = self.template.clone();
        for (name, value) in &values {
            text = text.replace(&format!("{{{{{name}}}}}"), value);
        }

        GetPromptResult::Text { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flymcp_protocol::VariableSpec;

    fn entry() -> PromptEntry {
        PromptEntry::new(
            PromptDefinition {
                id: "add_screen".into(),
                title: "Add screen".into(),
                description: "Scaffold a new screen".into(),
                variables: vec![
                    VariableSpec::required("name"),
                    VariableSpec::required("feature"),
                    VariableSpec::with_default("type", "generic"),
                ],
            },
            "Add a {{type}} screen named {{name}} to the {{feature}} feature.",
        )
    }

    #[test]
    fn renders_with_defaults_applied() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "home".to_string());
        vars.insert("feature".to_string(), "auth".to_string());

        let GetPromptResult::Text { text } = entry().render(&vars) else {
            panic!("expected rendered text");
        };
        assert_eq!(text, "Add a generic screen named home to the auth feature.");
    }

    #[test]
    fn missing_required_variables_listed_in_declaration_order() {
        let vars = HashMap::new();
        let GetPromptResult::VariablesNeeded { variables_needed } = entry().render(&vars) else {
            panic!("expected variablesNeeded");
        };
        assert_eq!(variables_needed, vec!["name", "feature"]);
    }

    #[test]
    fn partial_variables_report_only_the_missing() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "home".to_string());

        let GetPromptResult::VariablesNeeded { variables_needed } = entry().render(&vars) else {
            panic!("expected variablesNeeded");
        };
        assert_eq!(variables_needed, vec!["feature"]);
    }
}
