//! Scaffolding prompt templates.
//!
//! Each prompt turns a scaffolding intent into a concrete `fly`
//! command line the agent can run, mirroring the CLI's own argument
//! surface.

use flymcp_protocol::{PromptDefinition, VariableSpec};

/// All prompts registered by the binary, as (definition, template).
pub fn scaffolding_prompts() -> Vec<(PromptDefinition, String)> {
    vec![
        (
            PromptDefinition {
                id: "create_project".into(),
                title: "Create a Flutter project".into(),
                description: "Scaffold a new Flutter project with the Fly CLI".into(),
                variables: vec![
                    VariableSpec::required("name"),
                    VariableSpec::with_default("template", "riverpod"),
                    VariableSpec::with_default("organization", "com.example"),
                    VariableSpec::with_default("platforms", "ios,android"),
                ],
            },
            "Create a new Flutter project named {{name}} using the {{template}} \
             template for organization {{organization}}, targeting {{platforms}}. \
             Run: fly create {{name}} --template {{template}} \
             --organization {{organization}} --platforms {{platforms}} --output json"
                .into(),
        ),
        (
            PromptDefinition {
                id: "add_screen".into(),
                title: "Add a screen".into(),
                description: "Scaffold a screen inside a feature module".into(),
                variables: vec![
                    VariableSpec::required("name"),
                    VariableSpec::required("feature"),
                    VariableSpec::with_default("type", "generic"),
                ],
            },
            "Add a {{type}} screen named {{name}} to the {{feature}} feature. \
             Run: fly add screen {{name}} --feature {{feature}} --type {{type}} \
             --with-viewmodel=true --with-tests=true --output json"
                .into(),
        ),
        (
            PromptDefinition {
                id: "add_service".into(),
                title: "Add a service".into(),
                description: "Scaffold a service inside a feature module".into(),
                variables: vec![
                    VariableSpec::required("name"),
                    VariableSpec::required("feature"),
                    VariableSpec::with_default("type", "api"),
                ],
            },
            "Add a {{type}} service named {{name}} to the {{feature}} feature. \
             Run: fly add service {{name}} --feature {{feature}} --type {{type}} \
             --with-tests=true --with-mocks=true --output json"
                .into(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ids_are_unique() {
        let prompts = scaffolding_prompts();
        let mut ids: Vec<&str> = prompts.iter().map(|(d, _)| d.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), prompts.len());
    }

    #[test]
    fn every_template_placeholder_has_a_variable_spec() {
        for (definition, template) in scaffolding_prompts() {
            for spec in &definition.variables {
                assert!(
                    template.contains(&format!("{{{{{}}}}}", spec.name)),
                    "prompt '{}' never uses variable '{}'",
                    definition.id,
                    spec.name
                );
            }
        }
    }
}
