use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use toolbridge_core::tool::{ToolDescriptor, ToolInvocationRequest, ToolInvocationResult};
use toolbridge_core::{client::ToolRegistryClient, ClientError};

type Handler = Box<dyn Fn(&Map<String, Value>) -> String + Send + Sync>;

/// In-process tool registry with canned behaviour.
#[derive(Default)]
pub struct MockToolRegistry {
    tools: Vec<ToolDescriptor>,
    handlers: HashMap<String, Handler>,
    remote_failures: HashMap<String, String>,
    transport_failures: HashMap<String, ClientError>,
    discover_error: Option<ClientError>,
    delay: Duration,
    invocations: Mutex<Vec<ToolInvocationRequest>>,
    discover_calls: AtomicUsize,
}

impl MockToolRegistry {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }

    /// The `read_data` / `add_data` pair served by the reference host.
    pub fn reference() -> Self {
        Self::new(vec![
            ToolDescriptor::new(
                "read_data",
                "Simulates reading data from a table.",
                json!({"type": "object", "properties": {}}),
            ),
            ToolDescriptor::new(
                "add_data",
                "Simulates adding data to a table.",
                json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"]
                }),
            ),
        ])
        .with_output("read_data", "Hello, there! I'm reading data from the table.")
        .with_handler("add_data", |args| {
            let message = args.get("message").and_then(Value::as_str).unwrap_or_default();
            format!("Data successfully added: {message}")
        })
    }

    pub fn with_output(self, tool: &str, output: impl Into<String>) -> Self {
        let output = output.into();
        self.with_handler(tool, move |_| output.clone())
    }

    pub fn with_handler<F>(mut self, tool: &str, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> String + Send + Sync + 'static,
    {
        self.handlers.insert(tool.to_string(), Box::new(handler));
        self
    }

    /// The host reports an error for this tool.
    pub fn with_remote_failure(mut self, tool: &str, message: impl Into<String>) -> Self {
        self.remote_failures.insert(tool.to_string(), message.into());
        self
    }

    /// Calls to this tool never reach the host.
    pub fn with_transport_failure(mut self, tool: &str, error: ClientError) -> Self {
        self.transport_failures.insert(tool.to_string(), error);
        self
    }

    pub fn with_discover_error(mut self, error: ClientError) -> Self {
        self.discover_error = Some(error);
        self
    }

    /// Every invocation waits this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn invocations(&self) -> Vec<ToolInvocationRequest> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn discover_count(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolRegistryClient for MockToolRegistry {
    async fn discover(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        match &self.discover_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.tools.clone()),
        }
    }

    async fn invoke(
        &self,
        request: ToolInvocationRequest,
    ) -> Result<ToolInvocationResult, ClientError> {
        self.invocations.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(error) = self.transport_failures.get(&request.tool_name) {
            return Err(error.clone());
        }
        if let Some(message) = self.remote_failures.get(&request.tool_name) {
            return Ok(ToolInvocationResult::failure(&request, message.clone()));
        }
        if !self.tools.iter().any(|t| t.name == request.tool_name) {
            return Ok(ToolInvocationResult::failure(
                &request,
                format!("Unknown tool: {}", request.tool_name),
            ));
        }

        let output = match self.handlers.get(&request.tool_name) {
            Some(handler) => handler(&request.arguments),
            None => format!("{} ok", request.tool_name),
        };
        Ok(ToolInvocationResult::success(&request, output))
    }
}
