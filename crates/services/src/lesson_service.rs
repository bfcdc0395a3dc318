use std::env;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use tale_core::model::{
    Lesson, LessonRequest, QuizQuestion, RawQuizQuestion, Story, VocabularyEntry,
};

use crate::error::LessonServiceError;

#[derive(Clone, Debug)]
pub struct LessonServiceConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl LessonServiceConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("TALE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("TALE_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("TALE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Generates a lesson (story, quiz, vocabulary) from the remote content
/// service, with bounded retry, and sanitizes the payload at this boundary.
#[derive(Clone)]
pub struct LessonService {
    client: Client,
    config: Option<LessonServiceConfig>,
    max_attempts: u32,
    backoff: Duration,
}

impl LessonService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(LessonServiceConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<LessonServiceConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Request a generated lesson for the given parameters.
    ///
    /// Transient failures (timeouts, 5xx, 429) are retried with jittered
    /// backoff up to the attempt limit; everything else fails fast.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError` when the service is disabled, the
    /// request keeps failing, or the payload cannot be read as a lesson.
    pub async fn generate(&self, request: &LessonRequest) -> Result<Lesson, LessonServiceError> {
        let config = self
            .config
            .as_ref()
            .ok_or(LessonServiceError::Disabled)?;

        let prompt = build_prompt(request);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request_completion(config, &prompt).await {
                Ok(content) => return parse_lesson(&content, request),
                Err(err) if attempt < self.max_attempts && err.is_retryable() => {
                    let delay = self.retry_delay(attempt);
                    log::warn!(
                        "lesson generation attempt {attempt} failed ({err}), retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_completion(
        &self,
        config: &LessonServiceConfig,
        prompt: &str,
    ) -> Result<String, LessonServiceError> {
        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LessonServiceError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LessonServiceError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }

    /// Exponential backoff with a little jitter so retries do not align.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter = rand::rng().random_range(0..=self.backoff.as_millis() as u64 / 2);
        base + Duration::from_millis(jitter)
    }
}

//
// ─── WIRE SHAPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLessonPayload {
    #[serde(default)]
    story: String,
    #[serde(default)]
    quiz: Vec<RawQuizQuestion>,
    #[serde(default)]
    vocabulary: Vec<RawVocabularyEntry>,
}

#[derive(Debug, Deserialize)]
struct RawVocabularyEntry {
    #[serde(default)]
    word: String,
    #[serde(default)]
    definition: String,
}

//
// ─── PAYLOAD HANDLING ──────────────────────────────────────────────────────────
//

fn build_prompt(request: &LessonRequest) -> String {
    format!(
        "Write a {level} language-learning story about {topic}, roughly {words} words long. \
         Then write {questions} multiple-choice comprehension questions with exactly four \
         options each and the correct answer, and a vocabulary list of {vocab} notable words \
         with short definitions. Respond with JSON only, shaped as \
         {{\"story\": string, \"quiz\": [{{\"question\": string, \"options\": [string], \
         \"correctAnswer\": string}}], \"vocabulary\": [{{\"word\": string, \
         \"definition\": string}}]}}.",
        level = request.level().as_str(),
        topic = request.topic(),
        words = request.word_count(),
        questions = request.question_count(),
        vocab = request.vocabulary_count(),
    )
}

/// Turn raw completion text into a sanitized lesson.
///
/// Malformed quiz items degrade through normalization rather than failing
/// the lesson; only an unreadable payload or an empty story is fatal.
fn parse_lesson(content: &str, request: &LessonRequest) -> Result<Lesson, LessonServiceError> {
    let payload: RawLessonPayload = serde_json::from_str(strip_code_fences(content))?;

    let story = Story::new(payload.story)?;
    let quiz: Vec<QuizQuestion> = payload
        .quiz
        .iter()
        .take(request.question_count() as usize)
        .map(QuizQuestion::normalize)
        .collect();
    let vocabulary: Vec<VocabularyEntry> = payload
        .vocabulary
        .into_iter()
        .map(|entry| VocabularyEntry::new(entry.word, entry.definition))
        .filter(VocabularyEntry::is_usable)
        .take(request.vocabulary_count() as usize)
        .collect();

    Ok(Lesson::new(story, quiz, vocabulary))
}

/// Models often wrap JSON in Markdown fences; look through them.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

//
// ─── OFFLINE SAMPLE ────────────────────────────────────────────────────────────
//

/// A deterministic built-in lesson used when generation is not configured,
/// so the application works offline.
#[must_use]
pub fn sample_lesson(request: &LessonRequest) -> Lesson {
    let story = Story::new(
        "Mara lived beside a small harbor. Every morning, she watched the fishing boats \
         leave before sunrise. One day, an old sailor gave her a brass compass. He said \
         the needle pointed to whatever the holder missed most. Mara laughed, but the \
         needle swung away from the sea and toward the hills. That evening she packed \
         bread, cheese, and the compass. She followed the needle past the olive grove, \
         up a narrow path, and found the house where her grandmother was born. The door \
         was open. Inside, someone had kept the kettle warm for her.",
    )
    .expect("built-in sample story is not empty");

    let quiz = [
        RawQuizQuestion {
            question: "What did the old sailor give Mara?".into(),
            options: vec![
                "A) A brass compass".into(),
                "B) A fishing net".into(),
                "C) A map of the hills".into(),
                "D) A warm kettle".into(),
            ],
            correct_answer: Some("A".into()),
            correct_index: None,
        },
        RawQuizQuestion {
            question: "Where did the needle point?".into(),
            options: vec![
                "A) Toward the sea".into(),
                "B) Toward the hills".into(),
                "C) Toward the harbor".into(),
                "D) Toward the boats".into(),
            ],
            correct_answer: Some("B".into()),
            correct_index: None,
        },
        RawQuizQuestion {
            question: "What did Mara find at the end of the path?".into(),
            options: vec![
                "A) An empty ruin".into(),
                "B) A fishing boat".into(),
                "C) Her grandmother's birthplace".into(),
                "D) An olive press".into(),
            ],
            correct_answer: Some("C".into()),
            correct_index: None,
        },
    ];
    let quiz: Vec<QuizQuestion> = quiz
        .iter()
        .take(request.question_count() as usize)
        .map(QuizQuestion::normalize)
        .collect();

    let vocabulary: Vec<VocabularyEntry> = [
        VocabularyEntry::new("harbor", "a sheltered place where boats dock"),
        VocabularyEntry::new("compass", "an instrument whose needle shows direction"),
        VocabularyEntry::new("grove", "a small group of trees"),
        VocabularyEntry::new("kettle", "a pot for boiling water"),
    ]
    .into_iter()
    .take(request.vocabulary_count() as usize)
    .collect();

    Lesson::new(story, quiz, vocabulary)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
