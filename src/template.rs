use crate::config::RelayConfig;
use anyhow::{Context, Result};
use minijinja::{context, Environment};

const TEMPLATE_NAME: &str = "relay_instructions.txt";

const DEFAULT_TEMPLATE: &str = "\
A new webhook event was delivered by {{ integration_provider }}.

Please do the following:
1. Check out the branch `{{ branch_name }}` (create it if it does not exist).
2. Append the event payload below to the file `{{ file_name }}`, creating the file if needed.
3. Commit the change with a short message describing the event and push the branch.

Event payload:
{{ raw_payload }}
";

/// Compiled instruction template plus the fixed inputs that go with it.
pub struct InstructionTemplate {
    env: Environment<'static>,
    integration_provider: String,
    branch_name: String,
    file_name: String,
}

impl InstructionTemplate {
    /// Build from relay settings, reading `template_path` when one is set.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let source = match &config.template_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read template {}", path.display()))?,
            None => DEFAULT_TEMPLATE.to_string(),
        };
        Self::new(
            source,
            &config.integration_provider,
            &config.branch_name,
            &config.file_name,
        )
    }

    pub fn new(
        source: String,
        integration_provider: &str,
        branch_name: &str,
        file_name: &str,
    ) -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template_owned(TEMPLATE_NAME, source)
            .context("failed to compile relay template")?;

        Ok(Self {
            env,
            integration_provider: integration_provider.to_string(),
            branch_name: branch_name.to_string(),
            file_name: file_name.to_string(),
        })
    }

    pub fn render(&self, raw_payload: &str) -> Result<String, minijinja::Error> {
        self.env.get_template(TEMPLATE_NAME)?.render(context! {
            integration_provider => self.integration_provider,
            branch_name => self.branch_name,
            file_name => self.file_name,
            raw_payload => raw_payload,
        })
    }
}
