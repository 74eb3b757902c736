use super::error::AgentBuildError;
use crate::client::ToolRegistryClient;
use crate::tool::ToolDescriptor;
use std::sync::Arc;
use std::time::Duration;
use toolbridge_llm::chat::Tool;
use toolbridge_llm::LLMProvider;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an AI assistant for Tool Calling.

Before you help a user, you need to work with tools to interact with Our Database
";

/// Static configuration of an agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    /// Bound on a single completion request.
    pub completion_timeout: Duration,
    /// Completion requests allowed within one turn.
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Agent".to_string(),
            description: "An agent that can work with Our Database software.".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            completion_timeout: Duration::from_secs(120),
            max_iterations: 10,
        }
    }
}

/// A chat agent bound to a fixed set of discovered tools.
///
/// The tool set is closed: the agent only dispatches calls whose names were
/// returned by discovery.
pub struct Agent {
    pub(crate) config: AgentConfig,
    pub(crate) llm: Arc<dyn LLMProvider>,
    pub(crate) tools: Vec<ToolDescriptor>,
    pub(crate) registry: Arc<dyn ToolRegistryClient>,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        tools: Vec<ToolDescriptor>,
        registry: Arc<dyn ToolRegistryClient>,
        config: AgentConfig,
    ) -> Self {
        Self {
            config,
            llm,
            tools,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub(crate) fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    pub(crate) fn tool_schemas(&self) -> Vec<Tool> {
        self.tools.iter().map(Tool::from).collect()
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

/// Fluent construction of an [`Agent`].
///
/// Unless tools are supplied with [`AgentBuilder::with_tools`], `build` asks
/// the registry for its tool set first, and a discovery failure aborts
/// construction.
#[derive(Default)]
pub struct AgentBuilder {
    config: AgentConfig,
    llm: Option<Arc<dyn LLMProvider>>,
    registry: Option<Arc<dyn ToolRegistryClient>>,
    tools: Option<Vec<ToolDescriptor>>,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: AgentConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Starts from a registry whose tools will be discovered on `build`.
    pub fn discover(registry: Arc<dyn ToolRegistryClient>) -> Self {
        Self::new().with_registry(registry)
    }

    pub fn with_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn ToolRegistryClient>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses a known tool set instead of discovering one.
    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = description.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn completion_timeout(mut self, timeout: Duration) -> Self {
        self.config.completion_timeout = timeout;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub async fn build(self) -> Result<Arc<Agent>, AgentBuildError> {
        let llm = self.llm.ok_or(AgentBuildError::MissingLlm)?;
        let registry = self.registry.ok_or(AgentBuildError::MissingRegistry)?;
        let tools = match self.tools {
            Some(tools) => tools,
            None => registry.discover().await?,
        };

        log::info!(
            "Agent '{}' ready with tools [{}]",
            self.config.name,
            tools
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Arc::new(Agent::new(llm, tools, registry, self.config)))
    }
}
