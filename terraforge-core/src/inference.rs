//! # Remote Inference Client
//!
//! Turns one of the three Terraform operations into a single completion
//! call and hands back text. The prompt templates and the sampling policy
//! (low temperature for code, slightly higher for analysis) live here and
//! nowhere else.
//!
//! Provider failures never escape: they come back as
//! [`InferenceOutcome::Failure`], whose text carries the `"Error"` marker the
//! user sees in place of output.

use crate::error::{ErrorKind, Result};
use crate::mode::OperationMode;
use crate::provider::{ChatMessage, CompletionRequest, LlmProvider};
use tracing::{debug, error};

/// Persona shared by every operation.
pub const BASE_SYSTEM_INSTRUCTION: &str = "You are TerraForge, an expert Senior DevOps Engineer and Terraform Specialist.
Your goal is to assist users in creating, editing, and analyzing Terraform Infrastructure as Code (IaC).
Always produce valid, production-ready HCL code.
When explaining, use Markdown.
When writing code, wrap it in ```hcl blocks.
Be concise but thorough. Focus on AWS, Azure, and GCP providers primarily unless specified otherwise.";

const GENERATE_TASK: &str = "Task: Generate Terraform code based on the user's natural language request.
Include comments explaining complex resources.
Assume a standard provider configuration if not specified.";

const EDIT_TASK: &str = "Task: Modify the provided Terraform code according to the user's instructions.
Return the full, valid, modified HCL code. Do not skip sections unless explicitly asked to return a diff.";

const ANALYZE_TASK: &str = "Task: Analyze the provided Terraform code.
Provide a report covering:
1. Security Vulnerabilities (Critical/High/Medium/Low)
2. Best Practices Deviations (Naming, Structure, Modules)
3. Potential Cost Implications (High level)
4. Logic Errors
Format the output as a clean Markdown report.";

/// Temperature for generate and edit: favour deterministic code.
pub const CODE_TEMPERATURE: f32 = 0.2;

/// Temperature for analyze: a little more room for broader coverage.
pub const ANALYSIS_TEMPERATURE: f32 = 0.4;

/// Every failure text starts with this.
pub const ERROR_MARKER: &str = "Error";

pub const NO_RESPONSE_PLACEHOLDER: &str = "No response generated.";
pub const NO_ANALYSIS_PLACEHOLDER: &str = "No analysis generated.";

/// The three operations that reach the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceKind {
    Generate,
    Edit,
    Analyze,
}

impl InferenceKind {
    pub fn mode(&self) -> OperationMode {
        match self {
            InferenceKind::Generate => OperationMode::Generate,
            InferenceKind::Edit => OperationMode::Edit,
            InferenceKind::Analyze => OperationMode::Analyze,
        }
    }

    pub fn system_instruction(&self) -> String {
        let task = match self {
            InferenceKind::Generate => GENERATE_TASK,
            InferenceKind::Edit => EDIT_TASK,
            InferenceKind::Analyze => ANALYZE_TASK,
        };
        format!("{}\n\n{}", BASE_SYSTEM_INSTRUCTION, task)
    }

    pub fn temperature(&self) -> f32 {
        match self {
            InferenceKind::Generate | InferenceKind::Edit => CODE_TEMPERATURE,
            InferenceKind::Analyze => ANALYSIS_TEMPERATURE,
        }
    }

    /// Text returned when the service answers with nothing.
    pub fn placeholder(&self) -> &'static str {
        match self {
            InferenceKind::Generate | InferenceKind::Edit => NO_RESPONSE_PLACEHOLDER,
            InferenceKind::Analyze => NO_ANALYSIS_PLACEHOLDER,
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            InferenceKind::Generate => "Error generating Terraform code",
            InferenceKind::Edit => "Error editing Terraform code",
            InferenceKind::Analyze => "Error analyzing Terraform code",
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            InferenceKind::Generate => "inference::generate",
            InferenceKind::Edit => "inference::edit",
            InferenceKind::Analyze => "inference::analyze",
        }
    }
}

/// User content for an edit request.
pub fn edit_content(current_code: &str, instructions: &str) -> String {
    format!(
        "Current Code:\n```hcl\n{}\n```\n\nInstructions: {}",
        current_code, instructions
    )
}

/// User content for an analyze request.
pub fn analyze_content(code: &str) -> String {
    format!("Analyze this Terraform configuration:\n```hcl\n{}\n```", code)
}

/// Build the full request for an operation.
pub fn build_request(kind: InferenceKind, model: &str, content: String) -> CompletionRequest {
    CompletionRequest::new(vec![
        ChatMessage::system(kind.system_instruction()),
        ChatMessage::user(content),
    ])
    .with_model(model)
    .with_temperature(kind.temperature())
}

/// Result of one operation as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    Success(String),
    /// `message` is user-facing and starts with [`ERROR_MARKER`]
    Failure { kind: ErrorKind, message: String },
}

impl InferenceOutcome {
    /// Text to show as output, for either variant.
    pub fn text(&self) -> &str {
        match self {
            InferenceOutcome::Success(text) => text,
            InferenceOutcome::Failure { message, .. } => message,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            InferenceOutcome::Success(text) => text,
            InferenceOutcome::Failure { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InferenceOutcome::Success(_))
    }
}

/// The seam the session controller calls through.
///
/// `Ok` covers both success and expected failures ([`InferenceOutcome`]);
/// `Err` is reserved for anything the implementation could not turn into an
/// outcome.
#[allow(async_fn_in_trait)]
pub trait Inference {
    /// Model label recorded with history entries
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<InferenceOutcome>;

    async fn edit(&self, current_code: &str, instructions: &str) -> Result<InferenceOutcome>;

    async fn analyze(&self, code: &str) -> Result<InferenceOutcome>;
}

/// [`Inference`] backed by an [`LlmProvider`].
pub struct InferenceClient<P> {
    provider: P,
    model: String,
}

impl<P: LlmProvider> InferenceClient<P> {
    pub fn new(provider: P) -> Self {
        let model = provider.default_model().to_string();
        Self { provider, model }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn run(&self, kind: InferenceKind, content: String) -> InferenceOutcome {
        let request = build_request(kind, &self.model, content);
        debug!(
            provider = self.provider.name(),
            operation = kind.operation(),
            temperature = kind.temperature(),
            "dispatching inference"
        );

        match self.provider.complete(request).await {
            Ok(response) => match response.content {
                Some(text) if !text.is_empty() => InferenceOutcome::Success(text),
                _ => InferenceOutcome::Success(kind.placeholder().to_string()),
            },
            Err(provider_err) => {
                let message = format!("{}: {}", kind.failure_prefix(), provider_err);
                let err = provider_err
                    .into_error(kind.operation())
                    .with_context("model", self.model.clone());
                error!(error = %err, "inference failed");
                InferenceOutcome::Failure {
                    kind: err.kind(),
                    message,
                }
            }
        }
    }
}

impl<P: LlmProvider> Inference for InferenceClient<P> {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<InferenceOutcome> {
        Ok(self.run(InferenceKind::Generate, prompt.to_string()).await)
    }

    async fn edit(&self, current_code: &str, instructions: &str) -> Result<InferenceOutcome> {
        Ok(self
            .run(InferenceKind::Edit, edit_content(current_code, instructions))
            .await)
    }

    async fn analyze(&self, code: &str) -> Result<InferenceOutcome> {
        Ok(self.run(InferenceKind::Analyze, analyze_content(code)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::provider::{ProviderError, Role};

    #[test]
    fn test_templates_share_persona() {
        for kind in [InferenceKind::Generate, InferenceKind::Edit, InferenceKind::Analyze] {
            assert!(kind.system_instruction().starts_with(BASE_SYSTEM_INSTRUCTION));
        }
        assert!(InferenceKind::Edit
            .system_instruction()
            .contains("Do not skip sections unless explicitly asked to return a diff"));
        let analyze = InferenceKind::Analyze.system_instruction();
        for section in ["Security Vulnerabilities", "Best Practices", "Cost Implications", "Logic Errors"] {
            assert!(analyze.contains(section), "missing {section}");
        }
    }

    #[test]
    fn test_temperature_policy() {
        assert_eq!(InferenceKind::Generate.temperature(), CODE_TEMPERATURE);
        assert_eq!(InferenceKind::Edit.temperature(), CODE_TEMPERATURE);
        assert!(InferenceKind::Analyze.temperature() > CODE_TEMPERATURE);
    }

    #[test]
    fn test_edit_content_fences_code() {
        let content = edit_content("resource \"a\" \"b\" {}", "add tags");
        assert_eq!(
            content,
            "Current Code:\n```hcl\nresource \"a\" \"b\" {}\n```\n\nInstructions: add tags"
        );
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_verbatim() {
        let client = InferenceClient::new(MockProvider::replying(Some("resource \"aws_s3_bucket\" \"b\" {}")));

        let outcome = client.generate("Create an S3 bucket").await.unwrap();
        assert_eq!(outcome, InferenceOutcome::Success("resource \"aws_s3_bucket\" \"b\" {}".into()));

        let requests = client.provider().requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.temperature, Some(CODE_TEMPERATURE));
        assert_eq!(request.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, InferenceKind::Generate.system_instruction());
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, "Create an S3 bucket");
    }

    #[tokio::test]
    async fn test_analyze_uses_analysis_temperature() {
        let client = InferenceClient::new(MockProvider::replying(Some("## Report"))).with_model("gemini-custom");

        client.analyze("variable \"x\" {}").await.unwrap();

        let request = &client.provider().requests()[0];
        assert_eq!(request.temperature, Some(ANALYSIS_TEMPERATURE));
        assert_eq!(request.model.as_deref(), Some("gemini-custom"));
        assert_eq!(request.messages[1].content, analyze_content("variable \"x\" {}"));
        assert_eq!(client.model(), "gemini-custom");
    }

    #[tokio::test]
    async fn test_empty_payload_yields_placeholder() {
        let client = InferenceClient::new(MockProvider::replying(None));
        let outcome = client.edit("code", "do it").await.unwrap();
        assert_eq!(outcome, InferenceOutcome::Success(NO_RESPONSE_PLACEHOLDER.into()));

        let client = InferenceClient::new(MockProvider::replying(Some("")));
        let outcome = client.analyze("code").await.unwrap();
        assert_eq!(outcome, InferenceOutcome::Success(NO_ANALYSIS_PLACEHOLDER.into()));
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_outcome() {
        let client = InferenceClient::new(MockProvider::failing(ProviderError::Network(
            "connection reset".into(),
        )));

        let outcome = client.generate("Create a VPC").await.unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.text().starts_with(ERROR_MARKER));
        assert_eq!(
            outcome,
            InferenceOutcome::Failure {
                kind: ErrorKind::NetworkFailed,
                message: "Error generating Terraform code: Network error: connection reset".into(),
            }
        );
    }

    #[test]
    fn test_success_may_start_with_error_marker() {
        // legitimate content is never mistaken for a failure
        let outcome = InferenceOutcome::Success("Error handling is configured below.".into());
        assert!(outcome.is_success());
        assert_eq!(outcome.into_text(), "Error handling is configured below.");
    }

    #[test]
    fn test_edit_failure_prefix_in_sync_context() {
        let client = InferenceClient::new(MockProvider::failing(ProviderError::AuthenticationFailed));
        let outcome = tokio_test::block_on(client.edit("code", "rename")).unwrap();
        assert_eq!(outcome.text(), "Error editing Terraform code: Authentication failed");
    }
}
