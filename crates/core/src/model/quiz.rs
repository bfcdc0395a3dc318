use serde::Deserialize;

//
// ─── RAW PAYLOAD SHAPE ─────────────────────────────────────────────────────────
//

/// A quiz question as the content service returned it.
///
/// Generated answer keys arrive in several shapes: a numeric option index, a
/// bare letter (`"B"`), a lettered option (`"B) London"`), or the option text
/// itself, with or without label prefixes on the options. `QuizQuestion::normalize`
/// reconciles all of them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuizQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, alias = "answer", alias = "correctAnswer")]
    pub correct_answer: Option<String>,
    #[serde(default, alias = "answerIndex", alias = "correctIndex")]
    pub correct_index: Option<usize>,
}

//
// ─── NORMALIZED QUESTION ───────────────────────────────────────────────────────
//

/// A multiple-choice question in canonical form.
///
/// Invariant: `correct_answer` is the verbatim text of one of `options`
/// whenever `options` is non-empty (and the empty string otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
}

impl QuizQuestion {
    /// Reconcile a raw question into canonical form.
    ///
    /// Option labels (`A) `, `b. `, `C: `, `D- `) are stripped from every
    /// option, then the answer key is resolved in priority order:
    ///
    /// 1. an explicit numeric index that resolves to a non-empty option;
    /// 2. a single-letter A–D answer mapped to an index (out of range falls
    ///    back to option 0);
    /// 3. a case-insensitive exact match of the label-stripped answer text,
    ///    then a substring match, then option 0.
    ///
    /// Total for any input: with no options at all, `correct_answer`
    /// degrades to the empty string.
    #[must_use]
    pub fn normalize(raw: &RawQuizQuestion) -> Self {
        let question = raw.question.trim().to_string();
        let options: Vec<String> = raw
            .options
            .iter()
            .map(|option| strip_option_label(option).to_string())
            .collect();

        let correct_answer = resolve_answer(&options, raw);
        Self {
            question,
            options,
            correct_answer,
        }
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Whether the given answer text matches the answer key.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        !self.correct_answer.is_empty() && answer.trim() == self.correct_answer
    }
}

fn resolve_answer(options: &[String], raw: &RawQuizQuestion) -> String {
    let Some(first_option) = options.first() else {
        return String::new();
    };

    if let Some(index) = raw.correct_index {
        if let Some(text) = options.get(index).filter(|text| !text.is_empty()) {
            return text.clone();
        }
    }

    let raw_answer = raw.correct_answer.as_deref().unwrap_or("").trim();

    if let Some(index) = label_letter_index(raw_answer) {
        return options.get(index).unwrap_or(first_option).clone();
    }

    let stripped = strip_option_label(raw_answer);
    if !stripped.is_empty() {
        let lowered = stripped.to_lowercase();
        if let Some(exact) = options.iter().find(|option| option.to_lowercase() == lowered) {
            return exact.clone();
        }
        if let Some(containing) = options
            .iter()
            .find(|option| option.to_lowercase().contains(&lowered))
        {
            return containing.clone();
        }
    }

    first_option.clone()
}

/// Strip a leading multiple-choice label such as `"A) "`, `"b. "`, `"C:"`,
/// or `"D- "` (case-insensitive). Anything else is returned unchanged, so
/// ordinary words starting with A–D are safe.
fn strip_option_label(text: &str) -> &str {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let (Some(letter), delimiter) = (chars.next(), chars.next()) else {
        return trimmed;
    };
    if !matches!(letter.to_ascii_uppercase(), 'A'..='D') {
        return trimmed;
    }
    match delimiter {
        Some(')' | '.' | ':' | '-') => {
            let rest = chars.as_str();
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    }
}

/// Map an answer that is only a letter label (`"B"`, `"c)"`, `"D. Berlin"`)
/// to its zero-based option index.
fn label_letter_index(raw_answer: &str) -> Option<usize> {
    let trimmed = raw_answer.trim();
    let mut chars = trimmed.chars();
    let index = match chars.next()?.to_ascii_uppercase() {
        'A' => 0,
        'B' => 1,
        'C' => 2,
        'D' => 3,
        _ => return None,
    };
    match chars.next() {
        None => Some(index),
        Some(')' | '.' | ':' | '-') => Some(index),
        Some(_) => None,
    }
}
