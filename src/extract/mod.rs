//! Extraction pipeline.
//!
//! Turns a document image into a validated invoice record:
//! resolve image bytes → base64-encode → invoke the vision model with a
//! schema-constrained request → construct [`InvoiceData`] from the payload →
//! score completeness. The pipeline never lets a failure escape its
//! boundary: every outcome, success or failure, is an [`ExtractionResult`]
//! carrying the elapsed processing time.
//!
//! Consistency checking ([`check_consistency`](crate::core::check_consistency))
//! and persistence stay with the caller, so a validation or storage failure
//! cannot retroactively mark a completed extraction as failed.

mod openai;
mod source;

pub use openai::{ModelError, OpenAiVision, VisionModel, VisionRequest};
pub use source::{DirectorySource, ImageFile, ImageSource, ImageSourceError};

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::Serialize;

use crate::core::{
    confidence_score, invoice_json_schema, ExtractError, ExtractionResult, InvoiceData,
    InvoicePayload,
};

const SYSTEM_PROMPT: &str = "\
You are an expert invoice data extraction system. Analyze the provided \
invoice image and extract all relevant structured data with high accuracy.

Pay close attention to:
- Invoice numbers and dates (convert dates to ISO 8601 format)
- Customer and billing information (separate billing and shipping addresses)
- Individual line items with item numbers, descriptions, quantities, unit prices, and totals
- Tax calculations and totals (ensure mathematical accuracy)
- Any additional terms, references, or metadata

Requirements:
- Ensure all monetary values are accurate and properly calculated
- Validate that line item totals = quantity x unit price
- Validate that subtotal = sum of all line item totals
- Validate that tax = subtotal x tax_rate
- Validate that total = subtotal + tax
- Use consistent date formats (ISO 8601)
- Extract complete addresses with all available components
- If billing and shipping addresses are the same, duplicate the information

If any information is unclear or missing, make reasonable assumptions based \
on typical invoice structures.";

const USER_PROMPT: &str = "Please extract all structured data from this \
invoice image. Pay special attention to line items, totals, and addresses.";

/// Explicit pipeline configuration. Nothing in the pipeline reads the
/// environment; [`ExtractorConfig::from_env`] exists for callers that want
/// the conventional `OPENAI_*` variables resolved at the edge.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub api_key: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Per-attempt timeout for the model call.
    pub timeout: Duration,
    /// Total attempts for transient failures (minimum 1).
    pub retry_budget: u32,
}

impl ExtractorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-4o-2024-11-20".to_string(),
            max_output_tokens: 4000,
            temperature: 0.1,
            timeout: Duration::from_secs(60),
            retry_budget: 3,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_budget(mut self, attempts: u32) -> Self {
        self.retry_budget = attempts;
        self
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_MAX_TOKENS`,
    /// `OPENAI_TEMPERATURE` from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ExtractError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ExtractError::InvalidInput("OPENAI_API_KEY is not set".into()))?;
        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        if let Ok(tokens) = std::env::var("OPENAI_MAX_TOKENS") {
            if let Ok(tokens) = tokens.parse() {
                config.max_output_tokens = tokens;
            }
        }
        if let Ok(temp) = std::env::var("OPENAI_TEMPERATURE") {
            if let Ok(temp) = temp.parse() {
                config.temperature = temp;
            }
        }
        Ok(config)
    }
}

/// MIME type from a file extension; unknown extensions default to JPEG,
/// which the model treats as a generic raster.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => "image/jpeg",
    }
}

/// Per-batch outcome: per-document results in input order plus a summary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<ExtractionResult>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
}

/// The extraction service. Stateless between requests: concurrent
/// extractions of different documents share nothing mutable.
pub struct Extractor<M: VisionModel> {
    model: M,
    config: ExtractorConfig,
}

impl Extractor<OpenAiVision> {
    /// Extractor backed by the OpenAI vision client.
    pub fn openai(config: ExtractorConfig) -> Result<Self, ExtractError> {
        let model = OpenAiVision::new(&config)?;
        Ok(Self::with_model(model, config))
    }
}

impl<M: VisionModel> Extractor<M> {
    /// Extractor over any [`VisionModel`], e.g. a mock in tests.
    pub fn with_model(model: M, config: ExtractorConfig) -> Self {
        Self { model, config }
    }

    /// The underlying model collaborator.
    pub fn model_ref(&self) -> &M {
        &self.model
    }

    /// Extract one document. Always returns a result: any failure is
    /// captured as `success = false` with a message and elapsed time.
    pub async fn extract(&self, source: &dyn ImageSource, document_id: &str) -> ExtractionResult {
        let started = Instant::now();
        let extraction_id = format!("extract_{document_id}_{}", Utc::now().timestamp());
        tracing::info!(%document_id, %extraction_id, "starting extraction");

        match self.run(source, document_id).await {
            Ok((extracted, score)) => {
                let elapsed = started.elapsed().as_secs_f64();
                tracing::info!(
                    %document_id,
                    confidence = score,
                    elapsed_secs = elapsed,
                    "extraction succeeded"
                );
                ExtractionResult::succeeded(document_id, extraction_id, extracted, score, elapsed)
            }
            Err(err) => {
                let elapsed = started.elapsed().as_secs_f64();
                let message = format!("Failed to extract invoice data: {err}");
                tracing::warn!(%document_id, error = %err, elapsed_secs = elapsed, "extraction failed");
                ExtractionResult::failed(document_id, extraction_id, message, elapsed)
            }
        }
    }

    async fn run(
        &self,
        source: &dyn ImageSource,
        document_id: &str,
    ) -> Result<(serde_json::Value, f64), ExtractError> {
        // NotFound and read failures are both caller-visible input problems;
        // the ImageSourceError messages keep them distinguishable.
        let image = source
            .resolve(document_id)
            .map_err(|e| ExtractError::InvalidInput(e.to_string()))?;

        let request = VisionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user_text: USER_PROMPT.to_string(),
            image_base64: BASE64.encode(&image.bytes),
            mime_type: mime_for_extension(&image.extension).to_string(),
            detail: "high".to_string(),
            schema: invoice_json_schema(),
            max_output_tokens: self.config.max_output_tokens,
            temperature: self.config.temperature,
        };

        let value = self.model.extract(&request).await.map_err(|e| match e {
            ModelError::Empty | ModelError::Parse(_) => ExtractError::Parse(e.to_string()),
            other => ExtractError::ModelInvocation(other.to_string()),
        })?;

        let payload = InvoicePayload::from_value(&value)
            .map_err(|e| ExtractError::Parse(format!("payload did not match schema: {e}")))?;

        // Construction failure is a pipeline failure, not silently swallowed.
        let mut invoice = InvoiceData::from_payload(payload)?;
        let score = confidence_score(&invoice);
        invoice.extraction_confidence = Some(score);

        Ok((invoice.to_api_json(), score))
    }

    /// Extract a sequence of documents independently. One document's failure
    /// never aborts or contaminates the others; results keep input order.
    pub async fn extract_batch(
        &self,
        source: &dyn ImageSource,
        document_ids: &[String],
    ) -> BatchOutcome {
        let mut results = Vec::with_capacity(document_ids.len());
        for document_id in document_ids {
            results.push(self.extract(source, document_id).await);
        }
        let successful = results.iter().filter(|r| r.success).count();
        let summary = BatchSummary {
            total_processed: results.len(),
            successful,
            failed: results.len() - successful,
        };
        tracing::info!(
            total = summary.total_processed,
            successful = summary.successful,
            failed = summary.failed,
            "batch extraction finished"
        );
        BatchOutcome { results, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_mapping() {
        assert_eq!(mime_for_extension("jpg"), "image/jpeg");
        assert_eq!(mime_for_extension("JPEG"), "image/jpeg");
        assert_eq!(mime_for_extension("png"), "image/png");
        assert_eq!(mime_for_extension("pdf"), "application/pdf");
        assert_eq!(mime_for_extension("tiff"), "image/jpeg");
        assert_eq!(mime_for_extension(""), "image/jpeg");
    }

    #[test]
    fn config_defaults() {
        let config = ExtractorConfig::new("sk-test");
        assert_eq!(config.model, "gpt-4o-2024-11-20");
        assert_eq!(config.max_output_tokens, 4000);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.retry_budget, 3);
    }

    #[test]
    fn config_builder_chain() {
        let config = ExtractorConfig::new("sk-test")
            .model("gpt-4o-mini")
            .max_output_tokens(2000)
            .temperature(0.0)
            .timeout(Duration::from_secs(10))
            .retry_budget(1);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_output_tokens, 2000);
        assert_eq!(config.retry_budget, 1);
    }
}
