//! Wireframe generation with timeout, cancellation and retries
//!
//! Retry policy: transient failures (timeout, model or network errors) get
//! up to `max_retries` extra attempts with exponential backoff and jitter.
//! A structurally invalid document is a semantic failure and is surfaced
//! immediately.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use wireframe_core::WireframeNode;

use crate::backend::LlmBackend;
use crate::LlmError;

/// Retry and deadline policy for one generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Per-call deadline.
    pub timeout: Duration,
    /// Extra attempts after the first.
    pub max_retries: u32,
    /// Initial backoff; doubles each retry.
    pub backoff_base: Duration,
    /// Relative jitter applied to each backoff sleep (0.2 = +/-20%).
    pub jitter: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3_000),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            jitter: 0.2,
        }
    }
}

/// Stateless adapter turning prompts into validated wireframe documents.
pub struct WireframeGenerator {
    backend: Arc<dyn LlmBackend>,
    config: GeneratorConfig,
}

impl WireframeGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>, config: GeneratorConfig) -> Self {
        Self { backend, config }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Submit a prompt and return the parsed, validated document.
    pub async fn generate(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<WireframeNode, LlmError> {
        let mut backoff = self.config.backoff_base;
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let sleep = jittered(backoff, self.config.jitter);
                tracing::warn!(
                    attempt,
                    max_retries = self.config.max_retries,
                    backoff_ms = sleep.as_millis() as u64,
                    "model call failed, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                    _ = tokio::time::sleep(sleep) => {}
                }
                backoff *= 2;
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                result = tokio::time::timeout(self.config.timeout, self.backend.complete(prompt)) => {
                    match result {
                        Err(_) => Err(LlmError::Timeout),
                        Ok(inner) => inner,
                    }
                }
            };

            match outcome {
                Ok(raw) => return parse_and_validate(&raw),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Model("retries exhausted".to_string())))
    }
}

/// Parse the raw payload into a validated document.
///
/// Tolerates a fenced code block around the JSON; everything else about the
/// structure is strict.
fn parse_and_validate(raw: &str) -> Result<WireframeNode, LlmError> {
    let payload = strip_code_fence(raw);

    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| LlmError::InvalidOutput(format!("not valid JSON: {}", e)))?;

    let node = WireframeNode::from_document(value)
        .map_err(|e| LlmError::InvalidOutput(format!("not a wireframe document: {}", e)))?;

    node.validate()
        .map_err(|e| LlmError::InvalidOutput(e.to_string()))?;

    Ok(node)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn jittered(base: Duration, jitter: f64) -> Duration {
    let factor = 1.0 + rand::thread_rng().gen_range(-jitter..=jitter);
    base.mul_f64(factor.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend returning a scripted sequence of outcomes.
    struct ScriptedBackend {
        script: Mutex<Vec<Result<String, LlmError>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut script = self.script.lock();
            if script.is_empty() {
                Err(LlmError::Model("script exhausted".to_string()))
            } else {
                script.remove(0)
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn valid_doc() -> String {
        r#"{"type":"frame","componentName":"Root","children":[{"type":"button","componentName":"Cta"}]}"#
            .to_string()
    }

    fn generator(backend: ScriptedBackend) -> (WireframeGenerator, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let generator = WireframeGenerator::new(backend.clone(), GeneratorConfig::default());
        (generator, backend)
    }

    #[tokio::test]
    async fn test_generate_parses_valid_document() {
        let (generator, _) = generator(ScriptedBackend::new(vec![Ok(valid_doc())]));
        let node = generator
            .generate("login form", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(node.component_name, "Root");
        assert_eq!(node.children.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_strips_markdown_fences() {
        let fenced = format!("```json\n{}\n```", valid_doc());
        let (generator, _) = generator(ScriptedBackend::new(vec![Ok(fenced)]));
        let node = generator
            .generate("login form", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(node.component_name, "Root");
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_errors_are_retried() {
        let (generator, backend) = generator(ScriptedBackend::new(vec![
            Err(LlmError::Model("500".to_string())),
            Err(LlmError::Model("500".to_string())),
            Ok(valid_doc()),
        ]));

        let node = generator
            .generate("login form", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(node.component_name, "Root");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let (generator, backend) = generator(ScriptedBackend::new(vec![
            Err(LlmError::Model("500".to_string())),
            Err(LlmError::Model("500".to_string())),
            Err(LlmError::Model("500".to_string())),
            Ok(valid_doc()),
        ]));

        let err = generator
            .generate("login form", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Model(_)));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_invalid_output_is_not_retried() {
        let (generator, backend) = generator(ScriptedBackend::new(vec![
            Ok("this is not json".to_string()),
            Ok(valid_doc()),
        ]));

        let err = generator
            .generate("login form", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidOutput(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_node_type_is_invalid_output() {
        let doc = r#"{"type":"spaceship","componentName":"Root"}"#.to_string();
        let (generator, _) = generator(ScriptedBackend::new(vec![Ok(doc)]));
        let err = generator
            .generate("login form", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidOutput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out_and_retries() {
        let backend = ScriptedBackend::new(vec![Ok(valid_doc()), Ok(valid_doc())])
            .with_delay(Duration::from_secs(10));
        let (generator, backend) = generator(backend);

        let err = generator
            .generate("login form", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let backend = ScriptedBackend::new(vec![Ok(valid_doc())])
            .with_delay(Duration::from_millis(200));
        let (generator, _) = generator(backend);

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        let err = generator.generate("login form", &cancel).await.unwrap_err();
        assert!(matches!(err, LlmError::Cancelled));
    }
}
