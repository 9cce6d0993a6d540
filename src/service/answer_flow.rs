use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt};
use futures_util::FutureExt;
use tracing::{debug, error, info};

use crate::agent::{ConversationHistory, LlmClient};
use crate::crawler::PageSource;
use crate::models::{AnswerRequest, AnswerResult};
use crate::service::prompt::build_prompt;

/// Context label handed to the LLM client. The page text itself travels inside
/// the prompt, so the client's context guard only ever sees this constant.
pub const PAGE_CONTEXT_LABEL: &str = "the page content";

/// Extract → assemble → generate, with every failure folded into the answer text.
#[derive(Clone)]
pub struct AnswerFlow {
    crawler: Arc<dyn PageSource>,
    llm: LlmClient,
}

impl AnswerFlow {
    pub fn new(crawler: Arc<dyn PageSource>, llm: LlmClient) -> Self {
        Self { crawler, llm }
    }

    /// Answers one question about a page. Never fails: validation errors,
    /// upstream errors and panics all come back as `Error: ...` answers.
    pub async fn answer_question(
        &self,
        request: AnswerRequest,
        history: &mut ConversationHistory,
    ) -> AnswerResult {
        if let Err(e) = request.validate() {
            info!("Rejected answer request: {e}");
            return AnswerResult::new(format!("Error: {e}"));
        }

        match AssertUnwindSafe(self.run(&request, history)).catch_unwind().await {
            Ok(answer) => AnswerResult::new(answer),
            Err(panic) => AnswerResult::new(panic_answer(&request, panic.as_ref())),
        }
    }

    /// Streaming counterpart of [`AnswerFlow::answer_question`].
    pub async fn stream_answer<'h>(
        &self,
        request: AnswerRequest,
        history: &'h mut ConversationHistory,
    ) -> BoxStream<'h, String> {
        if let Err(e) = request.validate() {
            info!("Rejected answer request: {e}");
            return stream::once(async move { format!("Error: {e}") }).boxed();
        }
        match AssertUnwindSafe(self.assemble(&request)).catch_unwind().await {
            Ok(prompt) => self.llm.stream(&prompt, PAGE_CONTEXT_LABEL, history),
            Err(panic) => {
                let answer = panic_answer(&request, panic.as_ref());
                stream::once(async move { answer }).boxed()
            }
        }
    }

    async fn run(&self, request: &AnswerRequest, history: &mut ConversationHistory) -> String {
        let prompt = self.assemble(request).await;
        self.llm.generate(&prompt, PAGE_CONTEXT_LABEL, history).await
    }

    async fn assemble(&self, request: &AnswerRequest) -> String {
        let content = self.crawler.extract(&request.url).await;
        if content.is_unreachable() {
            debug!("{} unreachable, falling back to general knowledge", request.url);
        }
        build_prompt(&request.url, &request.question, &content)
    }
}

fn panic_answer(request: &AnswerRequest, panic: &(dyn Any + Send)) -> String {
    let answer = match panic_message(panic) {
        Some(message) => format!("Error: {message}"),
        None => "Unknown error occurred.".to_string(),
    };
    error!("Answer flow for {} failed: {answer}", request.url);
    answer
}

fn panic_message(panic: &(dyn Any + Send)) -> Option<&str> {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageContent;
    use crate::test_support::{PanickingPage, ScriptedModel, StaticPage};

    fn flow_with(page: Arc<dyn PageSource>, model: Arc<ScriptedModel>) -> AnswerFlow {
        AnswerFlow::new(page, LlmClient::new(model))
    }

    #[tokio::test]
    async fn answers_from_page_content() {
        let page = StaticPage::text("Example Domain illustrative page");
        let model = ScriptedModel::replying(&["It is an ", "example page."]);
        let flow = flow_with(page.clone(), model.clone());
        let mut history = ConversationHistory::new();

        let result = flow
            .answer_question(
                AnswerRequest::new("https://example.com", "What is this page about?"),
                &mut history,
            )
            .await;

        assert_eq!(result.answer, "It is an example page.");
        assert_eq!(page.lookups(), 1);
        let sent = &model.prompts()[0];
        assert!(sent.contains("Context: the page content"));
        assert!(sent.contains("Example Domain illustrative page"));
        assert!(sent.contains("Q: What is this page about?"));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_extraction() {
        let page = StaticPage::text("unused");
        let model = ScriptedModel::replying(&["unused"]);
        let flow = flow_with(page.clone(), model.clone());

        let result = flow
            .answer_question(AnswerRequest::new("https://example.com", ""), &mut ConversationHistory::new())
            .await;

        assert_eq!(
            result.answer,
            "Error: Invalid input. question: String must contain at least 1 character(s)"
        );
        assert_eq!(page.lookups(), 0);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn every_invalid_field_is_listed() {
        let page = StaticPage::text("unused");
        let flow = flow_with(page.clone(), ScriptedModel::replying(&[]));

        let result = flow
            .answer_question(AnswerRequest::new("not a url", ""), &mut ConversationHistory::new())
            .await;

        assert!(result.answer.starts_with("Error: Invalid input."));
        assert!(result.answer.contains("url: Invalid url"));
        assert!(result.answer.contains("question: String must contain at least 1 character(s)"));
        assert_eq!(page.lookups(), 0);
    }

    #[tokio::test]
    async fn unreachable_page_asks_for_general_knowledge() {
        let page = StaticPage::new(PageContent::Unreachable {
            url: "https://down.example".into(),
            reason: "timed out".into(),
        });
        let model = ScriptedModel::replying(&["General answer"]);
        let flow = flow_with(page, model.clone());
        let mut history = ConversationHistory::new();

        for _ in 0..2 {
            let result = flow
                .answer_question(AnswerRequest::new("https://down.example", "Who?"), &mut history)
                .await;
            assert_eq!(result.answer, "General answer");
        }
        for prompt in model.prompts() {
            assert!(prompt.contains("Please answer the following question using general knowledge"));
        }
    }

    // Known quirk: the bypass guard inspects the assembled prompt, which embeds the
    // page text, so an innocent page mentioning a keyword is refused.
    #[tokio::test]
    async fn page_text_with_keyword_trips_bypass_guard() {
        let page = StaticPage::text("Opening hours: closed outside of term time");
        let model = ScriptedModel::replying(&["unused"]);
        let flow = flow_with(page, model.clone());

        let result = flow
            .answer_question(AnswerRequest::new("https://example.com", "When open?"), &mut ConversationHistory::new())
            .await;

        assert!(result.answer.starts_with("Error: Prompt attempts to bypass context."));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_is_in_band() {
        let flow = flow_with(StaticPage::text("text"), ScriptedModel::failing_after(&[]));
        let result = flow
            .answer_question(AnswerRequest::new("https://example.com", "q"), &mut ConversationHistory::new())
            .await;
        assert_eq!(result.answer, "Error: Failed to stream content from Gemini.");
    }

    #[tokio::test]
    async fn panics_are_reported_as_answers() {
        let flow = flow_with(Arc::new(PanickingPage), ScriptedModel::replying(&[]));
        let result = flow
            .answer_question(AnswerRequest::new("https://example.com", "q"), &mut ConversationHistory::new())
            .await;
        assert_eq!(result.answer, "Error: crawler exploded");
    }

    #[tokio::test]
    async fn stream_answer_reports_panics_as_a_chunk() {
        let model = ScriptedModel::replying(&["unused"]);
        let flow = flow_with(Arc::new(PanickingPage), model.clone());
        let mut history = ConversationHistory::new();
        let chunks: Vec<String> = flow
            .stream_answer(AnswerRequest::new("https://example.com", "q"), &mut history)
            .await
            .collect()
            .await;
        assert_eq!(chunks, vec!["Error: crawler exploded".to_string()]);
        assert_eq!(model.calls(), 0);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn stream_answer_yields_chunks() {
        let flow = flow_with(StaticPage::text("text"), ScriptedModel::replying(&["a", "b"]));
        let mut history = ConversationHistory::new();
        let chunks: Vec<String> = flow
            .stream_answer(AnswerRequest::new("https://example.com", "q"), &mut history)
            .await
            .collect()
            .await;
        assert_eq!(chunks, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(history.len(), 1);

        let chunks: Vec<String> = flow
            .stream_answer(AnswerRequest::new("", "q"), &mut history)
            .await
            .collect()
            .await;
        assert_eq!(chunks, vec!["Error: Invalid input. url: Invalid url".to_string()]);
    }
}
