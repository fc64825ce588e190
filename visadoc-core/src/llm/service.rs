use crate::config::{PromptBudget, PromptBudgets, ServiceConfig};
use crate::error::{Error, Result};
use crate::llm::output::{interpret, ModelOutput};
use crate::llm::{build_provider, prompts, LlmProvider, LlmRequest, LlmResponse};
use crate::scoring::analysis_confidence;
use crate::types::{DocumentAnalysis, FaqEntry, FieldGuidance, ParsedDocument};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const FAQ_FALLBACK_QUESTION: &str = "Error parsing FAQ";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on a single provider call
    pub call_timeout: Duration,
    pub budgets: PromptBudgets,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            budgets: PromptBudgets::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_service_config(config: &ServiceConfig) -> Self {
        Self {
            call_timeout: config.provider.timeout(),
            budgets: config.prompts.clone(),
        }
    }
}

/// What to do with a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    Comprehensive { questions: Vec<String> },
    Summary,
    QuestionAnswering { questions: Vec<String> },
    Translate { target_language: String },
    Simplify,
    Faq,
}

impl AnalysisMode {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisMode::Comprehensive { .. } => "comprehensive",
            AnalysisMode::Summary => "summary",
            AnalysisMode::QuestionAnswering { .. } => "question_answering",
            AnalysisMode::Translate { .. } => "translate",
            AnalysisMode::Simplify => "simplify",
            AnalysisMode::Faq => "faq",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Comprehensive(DocumentAnalysis),
    Summary(String),
    QuestionAnswering(BTreeMap<String, String>),
    Translation {
        target_language: String,
        text: String,
    },
    Simplified(String),
    Faq(Vec<FaqEntry>),
}

/// Builds prompts, calls the provider, and interprets the replies.
///
/// Every call is bounded by `call_timeout` and aborts with
/// [`Error::Cancelled`] once either the service token or the per-analysis
/// token is cancelled. Provider failures propagate unchanged; malformed JSON
/// replies are recovered locally.
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, config: OrchestratorConfig) -> Self {
        Self {
            provider,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Build the configured provider and wrap it.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let provider = build_provider(&config.provider)?;
        Ok(Self::new(provider, OrchestratorConfig::from_service_config(config)))
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Token that cancels every call made through this service.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn summarize(&self, doc: &ParsedDocument) -> Result<String> {
        self.summary_step(doc, &self.cancel).await
    }

    /// Key facts as a JSON object, or `{"raw_response": ...}` when the reply
    /// is not one.
    pub async fn extract_key_info(&self, doc: &ParsedDocument) -> Result<Map<String, Value>> {
        self.key_info_step(doc, &self.cancel).await
    }

    /// One guidance entry per form field, in document order.
    pub async fn analyze_fields(&self, doc: &ParsedDocument) -> Result<Vec<FieldGuidance>> {
        self.fields_step(doc, &self.cancel).await
    }

    pub async fn recommend(&self, doc: &ParsedDocument) -> Result<Vec<String>> {
        self.recommendations_step(doc, &self.cancel).await
    }

    pub async fn answer(&self, doc: &ParsedDocument, question: &str) -> Result<String> {
        self.answer_step(doc, question, &self.cancel).await
    }

    pub async fn translate(&self, doc: &ParsedDocument, target_language: &str) -> Result<String> {
        self.translate_step(doc, target_language, &self.cancel).await
    }

    pub async fn simplify(&self, doc: &ParsedDocument) -> Result<String> {
        self.simplify_step(doc, &self.cancel).await
    }

    pub async fn generate_faq(&self, doc: &ParsedDocument) -> Result<Vec<FaqEntry>> {
        self.faq_step(doc, &self.cancel).await
    }

    /// Full analysis: the four independent steps run concurrently, then
    /// questions are answered in order. Repeated questions are answered once.
    ///
    /// The first step to fail ends the analysis. Sibling calls still in flight
    /// are dropped and their results discarded, so no partial analysis is
    /// returned.
    pub async fn analyze_comprehensive(
        &self,
        doc: &ParsedDocument,
        questions: &[String],
        cancel: &CancellationToken,
    ) -> Result<DocumentAnalysis> {
        let started = Instant::now();

        let (summary, key_information, form_fields_analysis, recommendations) = tokio::try_join!(
            self.summary_step(doc, cancel),
            self.key_info_step(doc, cancel),
            self.fields_step(doc, cancel),
            self.recommendations_step(doc, cancel),
        )?;

        let mut questions_answered = BTreeMap::new();
        for question in questions {
            if questions_answered.contains_key(question) {
                continue;
            }
            let answer = self.answer_step(doc, question, cancel).await?;
            questions_answered.insert(question.clone(), answer);
        }

        let confidence_score = analysis_confidence(doc, &summary, key_information.len());

        tracing::info!(
            document_type = %doc.document_type,
            fields = form_fields_analysis.len(),
            questions = questions_answered.len(),
            confidence = confidence_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "comprehensive analysis complete"
        );

        Ok(DocumentAnalysis {
            summary,
            key_information,
            form_fields_analysis,
            recommendations,
            questions_answered,
            confidence_score,
        })
    }

    pub async fn run(
        &self,
        doc: &ParsedDocument,
        mode: &AnalysisMode,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome> {
        tracing::debug!(mode = mode.name(), "running analysis");
        let outcome = match mode {
            AnalysisMode::Comprehensive { questions } => {
                AnalysisOutcome::Comprehensive(self.analyze_comprehensive(doc, questions, cancel).await?)
            }
            AnalysisMode::Summary => AnalysisOutcome::Summary(self.summary_step(doc, cancel).await?),
            AnalysisMode::QuestionAnswering { questions } => {
                let mut answers = BTreeMap::new();
                for question in questions {
                    if answers.contains_key(question) {
                        continue;
                    }
                    let answer = self.answer_step(doc, question, cancel).await?;
                    answers.insert(question.clone(), answer);
                }
                AnalysisOutcome::QuestionAnswering(answers)
            }
            AnalysisMode::Translate { target_language } => AnalysisOutcome::Translation {
                target_language: target_language.clone(),
                text: self.translate_step(doc, target_language, cancel).await?,
            },
            AnalysisMode::Simplify => AnalysisOutcome::Simplified(self.simplify_step(doc, cancel).await?),
            AnalysisMode::Faq => AnalysisOutcome::Faq(self.faq_step(doc, cancel).await?),
        };
        Ok(outcome)
    }

    async fn summary_step(&self, doc: &ParsedDocument, cancel: &CancellationToken) -> Result<String> {
        let budget = self.config.budgets.summary;
        let prompt = prompts::summary(doc, budget.input_chars);
        Ok(self.call("summary", prompt, budget, cancel).await?.content)
    }

    async fn key_info_step(
        &self,
        doc: &ParsedDocument,
        cancel: &CancellationToken,
    ) -> Result<Map<String, Value>> {
        let budget = self.config.budgets.key_info;
        let prompt = prompts::key_information(doc, budget.input_chars);
        let response = self.call("key_info", prompt, budget, cancel).await?;

        Ok(match interpret::<Map<String, Value>>(&response.content) {
            ModelOutput::Structured(map) => map,
            ModelOutput::Unstructured(raw) => {
                let mut map = Map::new();
                map.insert("raw_response".to_string(), Value::String(raw));
                map
            }
        })
    }

    async fn fields_step(
        &self,
        doc: &ParsedDocument,
        cancel: &CancellationToken,
    ) -> Result<Vec<FieldGuidance>> {
        let budget = self.config.budgets.field_guidance;
        let mut guidance = Vec::with_capacity(doc.form_fields.len());
        for field in &doc.form_fields {
            let prompt = prompts::field_guidance(doc, field);
            let response = self.call("field_guidance", prompt, budget, cancel).await?;
            guidance.push(FieldGuidance {
                field_name: field.field_name.clone(),
                field_type: field.field_type.clone(),
                guidance: response.content,
                page_number: field.page_number,
            });
        }
        Ok(guidance)
    }

    async fn recommendations_step(
        &self,
        doc: &ParsedDocument,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let budget = self.config.budgets.recommendations;
        let prompt = prompts::recommendations(doc, budget.input_chars);
        let response = self.call("recommendations", prompt, budget, cancel).await?;
        Ok(response.content.split('\n').map(str::to_string).collect())
    }

    async fn answer_step(
        &self,
        doc: &ParsedDocument,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let budget = self.config.budgets.answer;
        let prompt = prompts::answer(doc, question, budget.input_chars);
        Ok(self.call("answer", prompt, budget, cancel).await?.content)
    }

    async fn translate_step(
        &self,
        doc: &ParsedDocument,
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let budget = self.config.budgets.translate;
        let prompt = prompts::translate(doc, target_language, budget.input_chars);
        Ok(self.call("translate", prompt, budget, cancel).await?.content)
    }

    async fn simplify_step(&self, doc: &ParsedDocument, cancel: &CancellationToken) -> Result<String> {
        let budget = self.config.budgets.simplify;
        let prompt = prompts::simplify(doc, budget.input_chars);
        Ok(self.call("simplify", prompt, budget, cancel).await?.content)
    }

    async fn faq_step(&self, doc: &ParsedDocument, cancel: &CancellationToken) -> Result<Vec<FaqEntry>> {
        let budget = self.config.budgets.faq;
        let prompt = prompts::faq(doc, budget.input_chars);
        let response = self.call("faq", prompt, budget, cancel).await?;

        Ok(match interpret::<Vec<FaqEntry>>(&response.content) {
            ModelOutput::Structured(entries) => entries,
            ModelOutput::Unstructured(raw) => vec![FaqEntry {
                question: FAQ_FALLBACK_QUESTION.to_string(),
                answer: raw,
            }],
        })
    }

    async fn call(
        &self,
        step: &'static str,
        prompt: String,
        budget: PromptBudget,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse> {
        let request = LlmRequest::new(prompt, budget.max_tokens);
        let timeout = self.config.call_timeout;

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = cancel.cancelled() => Err(Error::Cancelled),
            outcome = tokio::time::timeout(timeout, self.provider.complete(&request)) => match outcome {
                Ok(result) => result,
                Err(_) => Err(Error::ProviderTimeout {
                    provider: self.provider.kind().to_string(),
                    timeout,
                }),
            },
        };

        match &result {
            Ok(response) => tracing::debug!(
                step,
                provider = %response.provider,
                tokens = response.tokens_used,
                ms = response.processing_time_ms,
                "llm call complete"
            ),
            Err(e) => tracing::warn!(step, error = %e, "llm call failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ProviderKind, PLACEHOLDER_CALL_CONFIDENCE};
    use crate::types::{BoundingBox, DocumentMetadata, DocumentType, FormField};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed string and records every prompt.
    struct FixedProvider {
        reply: String,
        prompts: Mutex<Vec<LlmRequest>>,
    }

    impl FixedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            self.prompts.lock().unwrap().push(request.clone());
            Ok(LlmResponse {
                content: self.reply.clone(),
                provider: ProviderKind::Local,
                model: "fixed".to_string(),
                tokens_used: 1,
                processing_time_ms: 0,
                confidence: PLACEHOLDER_CALL_CONFIDENCE,
            })
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Local
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    fn field(name: &str, page: u32) -> FormField {
        FormField {
            field_name: name.to_string(),
            field_type: "Text".to_string(),
            field_value: String::new(),
            coordinates: BoundingBox::EMPTY,
            page_number: page,
        }
    }

    fn document() -> ParsedDocument {
        ParsedDocument {
            metadata: DocumentMetadata::default(),
            full_text: "Form I-765 Application for Employment Authorization".to_string(),
            pages_text: vec![],
            form_fields: vec![field("family_name", 1), field("a_number", 2)],
            tables: vec![],
            images_info: vec![],
            document_type: DocumentType::I765,
            confidence_score: 0.8,
        }
    }

    #[tokio::test]
    async fn test_key_info_fallback_wraps_raw_text() {
        let provider = FixedProvider::new("Form number: I-765");
        let service = LlmService::new(provider, OrchestratorConfig::default());
        let map = service.extract_key_info(&document()).await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["raw_response"], "Form number: I-765");
    }

    #[tokio::test]
    async fn test_recommendations_split_on_newlines() {
        let provider = FixedProvider::new("1. Gather photos\n\n2. Pay fee");
        let service = LlmService::new(provider, OrchestratorConfig::default());
        let recs = service.recommend(&document()).await.unwrap();
        assert_eq!(recs, vec!["1. Gather photos", "", "2. Pay fee"]);
    }

    #[tokio::test]
    async fn test_field_guidance_per_field_with_budget() {
        let provider = FixedProvider::new("Enter as shown on passport.");
        let service = LlmService::new(provider.clone(), OrchestratorConfig::default());
        let guidance = service.analyze_fields(&document()).await.unwrap();

        assert_eq!(guidance.len(), 2);
        assert_eq!(guidance[1].field_name, "a_number");
        assert_eq!(guidance[1].page_number, 2);
        let requests = provider.prompts.lock().unwrap();
        assert!(requests.iter().all(|r| r.max_tokens == 300));
    }

    #[tokio::test]
    async fn test_faq_fallback_entry() {
        let provider = FixedProvider::new("I could not produce JSON.");
        let service = LlmService::new(provider, OrchestratorConfig::default());
        let faq = service.generate_faq(&document()).await.unwrap();
        assert_eq!(
            faq,
            vec![FaqEntry {
                question: "Error parsing FAQ".to_string(),
                answer: "I could not produce JSON.".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_cancelled_service_makes_no_calls() {
        let provider = FixedProvider::new("unused");
        let service = LlmService::new(provider.clone(), OrchestratorConfig::default());
        service.cancel();

        let err = service.summarize(&document()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Cancelled);
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_translate_keeps_language() {
        let provider = FixedProvider::new("Formulario I-765");
        let service = LlmService::new(provider, OrchestratorConfig::default());
        let mode = AnalysisMode::Translate {
            target_language: "Spanish".to_string(),
        };
        let outcome = service
            .run(&document(), &mode, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AnalysisOutcome::Translation {
                target_language: "Spanish".to_string(),
                text: "Formulario I-765".to_string(),
            }
        );
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(AnalysisOutcome::Summary("ok".to_string())).unwrap();
        assert_eq!(json["type"], "summary");
        assert_eq!(json["result"], "ok");
    }
}
