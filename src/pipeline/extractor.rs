//! Receipt extraction: turns a staged receipt image into structured
//! transaction fields via one multimodal Gemini call.
//!
//! The model is asked for a strict JSON object; real replies still arrive
//! wrapped in markdown fences or with fields of the wrong type, so the raw
//! text is normalized and each field is read leniently. A field the model
//! got wrong becomes absent instead of failing the whole extraction.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use chrono::NaiveDate;
use thiserror::Error;

use super::gemini::{GeminiError, VisionClient};
use crate::models::TransactionKind;

/// Fixed confidence attached to every successful extraction. Gemini does not
/// expose a per-reply confidence score; this is a documented placeholder, not
/// a computed metric.
pub const RECEIPT_CONFIDENCE: f32 = 0.95;

/// Instruction prompt sent with every receipt image. Asks for bare JSON and
/// a `null` reply for illegible images.
pub const RECEIPT_PROMPT: &str = "\
Você é um assistente financeiro especializado em ler comprovantes, notas fiscais e recibos bancários.
Analise esta imagem e extraia as seguintes informações em formato JSON estrito:

1. \"valor\": O valor total da transação (número, exemplo: 25.50).
2. \"descricao\": Uma descrição curta e clara do que foi gasto ou recebido (ex: \"Almoço Restaurante X\", \"Uber\", \"Salário\").
3. \"tipo\": \"receita\" se for dinheiro entrando (depósito, pix recebido, salário) ou \"despesa\" se for dinheiro saindo (compra, pagamento, transferência enviada).
4. \"data\": A data da transação no formato YYYY-MM-DD (se não encontrar, use a data de hoje).
5. \"categoria_sugerida\": Uma categoria sugerida para este gasto (ex: Alimentação, Transporte, Saúde, Moradia, Salário, Lazer, Outros).

Se não conseguir identificar algum campo, tente inferir pelo contexto. Se a imagem não for um comprovante legível, retorne null no JSON.

IMPORTANTE: Retorne APENAS o JSON puro, sem crases ```json ou texto adicional.";

#[derive(Error, Debug)]
pub enum ExtractError {
    /// Deployment problem: no credential configured. Fatal and operator
    /// facing, unlike a bad model reply.
    #[error("extrator não configurado: {0}")]
    Misconfigured(String),

    #[error("falha ao ler imagem enviada: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or empty model output. The user can retry with a clearer
    /// photo.
    #[error("não foi possível extrair dados da imagem: {0}")]
    ExtractionFailed(String),
}

impl From<GeminiError> for ExtractError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::MissingApiKey => ExtractError::Misconfigured(err.to_string()),
            other => ExtractError::ExtractionFailed(other.to_string()),
        }
    }
}

/// Structured fields read from one receipt image. Produced once per pipeline
/// run, immutable, never persisted directly.
#[derive(Debug, Clone)]
pub struct ExtractedReceipt {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub kind: Option<TransactionKind>,
    pub occurred_on: Option<NaiveDate>,
    pub suggested_category: Option<String>,
    pub confidence: f32,
    /// Human-readable record of what the model returned, echoed to the
    /// frontend as `texto`.
    pub raw_text: String,
}

/// Seam for the whole extraction step, so tests can swap in a fake.
pub trait ReceiptExtractor: Send + Sync {
    fn extract(&self, image_path: &Path) -> Result<ExtractedReceipt, ExtractError>;
}

// ──────────────────────────────────────────────
// GeminiExtractor
// ──────────────────────────────────────────────

pub struct GeminiExtractor {
    client: Arc<dyn VisionClient>,
}

impl GeminiExtractor {
    pub fn new(client: Arc<dyn VisionClient>) -> Self {
        Self { client }
    }
}

impl ReceiptExtractor for GeminiExtractor {
    fn extract(&self, image_path: &Path) -> Result<ExtractedReceipt, ExtractError> {
        let _span = tracing::info_span!(
            "receipt_extract",
            image = %image_path.display(),
        )
        .entered();
        let start = std::time::Instant::now();

        let bytes = std::fs::read(image_path)?;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let mime_type = mime_for_extension(image_path);

        let raw_reply = self
            .client
            .generate_with_image(RECEIPT_PROMPT, mime_type, &image_base64)?;

        let receipt = parse_model_reply(&raw_reply)?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            amount = ?receipt.amount,
            kind = ?receipt.kind,
            "receipt extraction complete"
        );

        Ok(receipt)
    }
}

/// Fixed extension → MIME mapping for the image payload. Anything unknown is
/// submitted as JPEG.
pub fn mime_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => "image/jpeg",
    }
}

/// Strip markdown code-fence markers the model adds despite instructions.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Normalize and parse the model's text reply into an [`ExtractedReceipt`].
pub fn parse_model_reply(raw_reply: &str) -> Result<ExtractedReceipt, ExtractError> {
    let clean = strip_code_fences(raw_reply);

    let value: serde_json::Value = serde_json::from_str(&clean)
        .map_err(|e| ExtractError::ExtractionFailed(format!("resposta não é JSON válido: {e}")))?;

    if value.is_null() {
        return Err(ExtractError::ExtractionFailed(
            "o modelo não reconheceu um comprovante legível".into(),
        ));
    }
    let fields = value.as_object().ok_or_else(|| {
        ExtractError::ExtractionFailed("resposta JSON não é um objeto".into())
    })?;

    let amount = field_f64(fields, "valor");
    let description = field_str(fields, "descricao");
    let kind = field_str(fields, "tipo")
        .as_deref()
        .and_then(TransactionKind::parse_lenient);
    let occurred_on = field_str(fields, "data")
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    let suggested_category = field_str(fields, "categoria_sugerida");

    let pretty = serde_json::to_string_pretty(&value).unwrap_or(clean);

    Ok(ExtractedReceipt {
        amount,
        description,
        kind,
        occurred_on,
        suggested_category,
        confidence: RECEIPT_CONFIDENCE,
        raw_text: format!("Processado via Gemini AI\n{pretty}"),
    })
}

/// Lenient numeric read: accepts a JSON number or a numeric string
/// ("25.50", "25,50").
fn field_f64(fields: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<f64> {
    match fields.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn field_str(fields: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ──────────────────────────────────────────────
// MockExtractor (testing)
// ──────────────────────────────────────────────

/// Fake extractor with a configured outcome, for orchestrator and endpoint
/// tests.
pub struct MockExtractor {
    reply: MockReply,
}

enum MockReply {
    Receipt(ExtractedReceipt),
    Failure(String),
    Misconfigured,
}

impl MockExtractor {
    pub fn returning(receipt: ExtractedReceipt) -> Self {
        Self {
            reply: MockReply::Receipt(receipt),
        }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            reply: MockReply::Failure(detail.to_string()),
        }
    }

    pub fn misconfigured() -> Self {
        Self {
            reply: MockReply::Misconfigured,
        }
    }
}

impl ReceiptExtractor for MockExtractor {
    fn extract(&self, _image_path: &Path) -> Result<ExtractedReceipt, ExtractError> {
        match &self.reply {
            MockReply::Receipt(receipt) => Ok(receipt.clone()),
            MockReply::Failure(detail) => Err(ExtractError::ExtractionFailed(detail.clone())),
            MockReply::Misconfigured => Err(ExtractError::Misconfigured(
                GeminiError::MissingApiKey.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::gemini::MockVisionClient;

    fn extract_from(reply: &str) -> Result<ExtractedReceipt, ExtractError> {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("nota.jpg");
        std::fs::write(&image, b"fake-jpeg").unwrap();

        let client = Arc::new(MockVisionClient::new(reply));
        GeminiExtractor::new(client).extract(&image)
    }

    // ── strip_code_fences ──

    #[test]
    fn strips_json_fences() {
        let fenced = "```json\n{\"valor\": 10}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"valor\": 10}");
    }

    #[test]
    fn strips_bare_fences() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn unfenced_reply_is_only_trimmed() {
        assert_eq!(strip_code_fences("  {\"valor\": 1} \n"), "{\"valor\": 1}");
    }

    // ── mime_for_extension ──

    #[test]
    fn mime_mapping_is_fixed() {
        assert_eq!(mime_for_extension(Path::new("a.png")), "image/png");
        assert_eq!(mime_for_extension(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for_extension(Path::new("a.heic")), "image/heic");
        assert_eq!(mime_for_extension(Path::new("a.heif")), "image/heif");
        assert_eq!(mime_for_extension(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_for_extension(Path::new("a.xyz")), "image/jpeg");
        assert_eq!(mime_for_extension(Path::new("a")), "image/jpeg");
    }

    // ── parse_model_reply ──

    #[test]
    fn parses_complete_reply() {
        let receipt = extract_from(
            r#"{"valor": 25.50, "descricao": "Almoço Restaurante X", "tipo": "despesa",
                "data": "2025-03-10", "categoria_sugerida": "Alimentação"}"#,
        )
        .unwrap();

        assert_eq!(receipt.amount, Some(25.50));
        assert_eq!(receipt.description.as_deref(), Some("Almoço Restaurante X"));
        assert_eq!(receipt.kind, Some(TransactionKind::Expense));
        assert_eq!(
            receipt.occurred_on,
            Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
        assert_eq!(receipt.suggested_category.as_deref(), Some("Alimentação"));
        assert_eq!(receipt.confidence, RECEIPT_CONFIDENCE);
        assert!(receipt.raw_text.starts_with("Processado via Gemini AI"));
    }

    #[test]
    fn parses_reply_wrapped_in_fences() {
        let receipt = extract_from(
            "```json\n{\"valor\": 12.0, \"tipo\": \"receita\"}\n```",
        )
        .unwrap();
        assert_eq!(receipt.amount, Some(12.0));
        assert_eq!(receipt.kind, Some(TransactionKind::Income));
    }

    #[test]
    fn null_reply_is_extraction_failure() {
        let err = extract_from("null").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[test]
    fn malformed_json_is_extraction_failure() {
        let err = extract_from("desculpe, não consigo ler esta imagem").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[test]
    fn non_object_json_is_extraction_failure() {
        let err = extract_from("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[test]
    fn wrong_typed_fields_become_absent() {
        let receipt = extract_from(
            r#"{"valor": "n/a", "descricao": 42, "tipo": "transferencia", "data": "10/03/2025"}"#,
        )
        .unwrap();
        assert_eq!(receipt.amount, None);
        assert_eq!(receipt.description, None);
        assert_eq!(receipt.kind, None);
        assert_eq!(receipt.occurred_on, None);
    }

    #[test]
    fn numeric_string_amount_is_accepted() {
        let receipt = extract_from(r#"{"valor": "25,50", "tipo": "despesa"}"#).unwrap();
        assert_eq!(receipt.amount, Some(25.50));
    }

    #[test]
    fn empty_strings_become_absent() {
        let receipt = extract_from(r#"{"valor": 5.0, "descricao": "", "categoria_sugerida": " "}"#)
            .unwrap();
        assert_eq!(receipt.description, None);
        assert_eq!(receipt.suggested_category, None);
    }

    // ── error taxonomy ──

    #[test]
    fn missing_credential_maps_to_misconfigured() {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("nota.jpg");
        std::fs::write(&image, b"fake-jpeg").unwrap();

        let client = Arc::new(MockVisionClient::failing(|| GeminiError::MissingApiKey));
        let err = GeminiExtractor::new(client).extract(&image).unwrap_err();
        assert!(matches!(err, ExtractError::Misconfigured(_)));
    }

    #[test]
    fn api_error_maps_to_extraction_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("nota.jpg");
        std::fs::write(&image, b"fake-jpeg").unwrap();

        let client = Arc::new(MockVisionClient::failing(|| GeminiError::Api {
            status: 500,
            body: "internal".into(),
        }));
        let err = GeminiExtractor::new(client).extract(&image).unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let client = Arc::new(MockVisionClient::new("{}"));
        let err = GeminiExtractor::new(client)
            .extract(Path::new("/nonexistent/nota.jpg"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    // ── prompt contract ──

    #[test]
    fn prompt_names_all_five_fields() {
        for field in ["valor", "descricao", "tipo", "data", "categoria_sugerida"] {
            assert!(RECEIPT_PROMPT.contains(field), "prompt missing {field}");
        }
        assert!(RECEIPT_PROMPT.contains("retorne null"));
    }
}
