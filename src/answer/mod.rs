//! Contract for the language-model collaborator that answers custom questions.

pub mod openai;

use async_trait::async_trait;

use crate::surface::SelectOption;

pub use openai::OpenAiAnswerProvider;

/// Source of answers for questions the engine cannot fill deterministically.
///
/// Implementations absorb their own failures: a provider that cannot answer
/// returns `None` (or an empty search term) and the caller skips the field.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Free-text answer for a text or textarea question.
    async fn text_answer(&self, question: &str, job_context: &str) -> Option<String>;

    /// The `value` of the best option for a choice question.
    async fn best_option(
        &self,
        question: &str,
        options: &[SelectOption],
        job_context: &str,
    ) -> Option<String>;

    /// A short term to type into a searchable picker.
    async fn short_search_term(&self, question: &str, job_context: &str) -> String;
}

/// First few words of the question, used when no provider term is available.
pub fn fallback_search_term(question: &str) -> String {
    question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip markdown fences and wrapping quotes from a model reply.
pub fn clean_reply(raw: &str) -> String {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text).trim();
    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_cleanup() {
        assert_eq!(clean_reply("```json\n\"Yes\"\n```"), "Yes");
        assert_eq!(clean_reply("  Berlin  "), "Berlin");
        assert_eq!(clean_reply("```\nremote\n```"), "remote");
    }

    #[test]
    fn fallback_term_uses_leading_words() {
        assert_eq!(
            fallback_search_term("Which country do you live in?"),
            "Which country do"
        );
        assert_eq!(fallback_search_term(""), "");
    }
}
