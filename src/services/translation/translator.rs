// Batch translator
//
// Never fails. Without a configured client strings come back prefixed with "[MOCK] ";
// on any service or parse failure they come back prefixed with "[ERR] ".

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::chat_client::{ChatCompletion, OpenAiChatClient};
use crate::core::config::TranslationConfig;
use crate::core::errors::{TranslationError, TranslationResult};
use crate::core::types::Translation;
use crate::utils::Metrics;

#[derive(Clone)]
pub struct Translator {
    client: Option<Arc<dyn ChatCompletion>>,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl Translator {
    pub fn new(client: Option<Arc<dyn ChatCompletion>>, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            metrics: None,
        }
    }

    /// Mock translator when no API key is set, or when the HTTP client can't be built.
    pub fn from_config(config: &TranslationConfig) -> Self {
        let client = config.api_key.as_ref().and_then(|key| {
            match OpenAiChatClient::new(key.clone(), config) {
                Ok(c) => {
                    info!("Translation via {} ({})", c.endpoint(), config.model);
                    Some(Arc::new(c) as Arc<dyn ChatCompletion>)
                }
                Err(e) => {
                    error!("Could not create translation client, using mock mode: {}", e);
                    None
                }
            }
        });
        if config.api_key.is_none() {
            warn!("No translation API key configured, translations will be mocked");
        }
        Self::new(client, Duration::from_secs(config.timeout_seconds))
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_mock(&self) -> bool {
        self.client.is_none()
    }

    /// Translate a batch in one request.
    ///
    /// An empty batch returns an empty result without calling the service. The output
    /// length is only guaranteed to match the input for mock and failed results.
    #[instrument(skip(self, strings), fields(count = strings.len(), target_lang = %target_lang))]
    pub async fn translate(&self, strings: &[String], target_lang: &str) -> Translation {
        let Some(client) = self.client.as_ref() else {
            return self.finish(Translation::mock(strings), Instant::now());
        };
        if strings.is_empty() {
            return Translation::translated(Vec::new());
        }

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, request(client.as_ref(), strings, target_lang)).await {
            Ok(Ok(texts)) => {
                if texts.len() != strings.len() {
                    warn!(
                        "Service returned {} translations for {} strings",
                        texts.len(),
                        strings.len()
                    );
                }
                Translation::translated(texts)
            }
            Ok(Err(e)) => {
                error!("Translation failed: {}", e);
                Translation::failed(strings)
            }
            Err(_) => {
                error!("{}", TranslationError::Timeout(self.timeout.as_secs()));
                Translation::failed(strings)
            }
        };

        self.finish(result, start)
    }

    fn finish(&self, result: Translation, start: Instant) -> Translation {
        if let Some(ref m) = self.metrics {
            m.record_translation(result.status, start.elapsed());
        }
        result
    }
}

async fn request(client: &dyn ChatCompletion, strings: &[String], target_lang: &str) -> TranslationResult<Vec<String>> {
    let user = serde_json::to_string(strings).map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;
    let reply = client.complete(&system_prompt(target_lang), &user).await?;
    debug!("Raw translation reply: {}", reply);
    parse_reply(&reply)
}

pub fn system_prompt(target_lang: &str) -> String {
    format!(
        "You are a professional comic book translator translating from English to {target_lang}. \
         Tone: Gritty, noir, natural dialogue. \
         IMPORTANT: Return ONLY a raw JSON array of strings. No markdown formatting. \
         Maintain the exact same number of elements as the input list."
    )
}

/// Strip ``` / ```json fences and parse a JSON array of strings.
pub fn parse_reply(reply: &str) -> TranslationResult<Vec<String>> {
    let cleaned = reply.replace("```json", "").replace("```", "");
    serde_json::from_str::<Vec<String>>(cleaned.trim())
        .map_err(|e| TranslationError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::types::TranslationStatus;
    use futures::future::BoxFuture;
    use parking_lot::Mutex;

    /// Chat client that answers with a canned reply and counts calls.
    pub(crate) struct CannedChat {
        reply: Option<String>,
        delay: Duration,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl CannedChat {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn slow(reply: &str, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::replying(reply)
            }
        }
    }

    impl ChatCompletion for CannedChat {
        fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BoxFuture<'a, TranslationResult<String>> {
            Box::pin(async move {
                self.calls.lock().push((system.to_string(), user.to_string()));
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.reply.clone().ok_or(TranslationError::Status {
                    status: 500,
                    body: "upstream exploded".into(),
                })
            })
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn with_client(chat: Arc<CannedChat>) -> Translator {
        Translator::new(Some(chat), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_mock_mode_prefixes_every_string() {
        let translator = Translator::from_config(&TranslationConfig::default());
        assert!(translator.is_mock());

        let result = translator.translate(&strings(&["Hi", "Bye"]), "Spanish").await;
        assert_eq!(result.status, TranslationStatus::Mock);
        assert_eq!(result.texts, vec!["[MOCK] Hi", "[MOCK] Bye"]);
    }

    #[tokio::test]
    async fn test_mock_mode_empty_batch() {
        let translator = Translator::new(None, Duration::from_secs(1));
        let result = translator.translate(&[], "Spanish").await;
        assert!(result.texts.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_service() {
        let chat = Arc::new(CannedChat::replying("[]"));
        let translator = with_client(chat.clone());

        let result = translator.translate(&[], "Spanish").await;
        assert_eq!(result.status, TranslationStatus::Translated);
        assert!(result.texts.is_empty());
        assert!(chat.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_service_error_marks_every_string() {
        let translator = with_client(Arc::new(CannedChat::failing()));
        let result = translator.translate(&strings(&["Hi"]), "Spanish").await;
        assert_eq!(result.status, TranslationStatus::Failed);
        assert_eq!(result.texts, vec!["[ERR] Hi"]);
    }

    #[tokio::test]
    async fn test_fenced_reply_is_parsed() {
        let chat = Arc::new(CannedChat::replying("```json\n[\"Hola\", \"Adiós\"]\n```"));
        let translator = with_client(chat.clone());

        let result = translator.translate(&strings(&["Hello", "Goodbye"]), "Spanish").await;
        assert_eq!(result.status, TranslationStatus::Translated);
        assert_eq!(result.texts, vec!["Hola", "Adiós"]);

        let calls = chat.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("from English to Spanish"));
        assert_eq!(calls[0].1, r#"["Hello","Goodbye"]"#);
    }

    #[tokio::test]
    async fn test_non_array_reply_is_a_failure() {
        let translator = with_client(Arc::new(CannedChat::replying(r#"{"translations": ["Hola"]}"#)));
        let result = translator.translate(&strings(&["Hello", "Bye"]), "Spanish").await;
        assert_eq!(result.status, TranslationStatus::Failed);
        assert_eq!(result.texts, vec!["[ERR] Hello", "[ERR] Bye"]);
    }

    #[tokio::test]
    async fn test_short_reply_is_returned_as_is() {
        let translator = with_client(Arc::new(CannedChat::replying(r#"["HOLA"]"#)));
        let result = translator.translate(&strings(&["HELLO", "WORLD"]), "Spanish").await;
        assert_eq!(result.status, TranslationStatus::Translated);
        assert_eq!(result.texts, vec!["HOLA"]);
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let chat = Arc::new(CannedChat::slow(r#"["late"]"#, Duration::from_millis(500)));
        let translator = Translator::new(Some(chat), Duration::from_millis(20));
        let result = translator.translate(&strings(&["Hurry"]), "French").await;
        assert_eq!(result.texts, vec!["[ERR] Hurry"]);
    }

    #[tokio::test]
    async fn test_metrics_count_by_status() {
        let metrics = Metrics::new();
        let ok = with_client(Arc::new(CannedChat::replying(r#"["Hola"]"#))).with_metrics(metrics.clone());
        let mock = Translator::new(None, Duration::from_secs(1)).with_metrics(metrics.clone());

        ok.translate(&strings(&["Hello"]), "Spanish").await;
        mock.translate(&strings(&["Hello"]), "Spanish").await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.translations_ok, 1);
        assert_eq!(snapshot.translations_mock, 1);
        assert_eq!(snapshot.translations_failed, 0);
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_reply("  [\"a\"]  ").unwrap(), vec!["a"]);
        assert_eq!(parse_reply("```\n[]\n```").unwrap(), Vec::<String>::new());
        assert!(parse_reply("Sure! Here you go").is_err());
        assert!(parse_reply("[1, 2]").is_err());
    }
}
