use crate::crawler::PageContent;

/// Page text beyond this many characters is cut off before it reaches the model.
pub const MAX_CONTENT_CHARS: usize = 4000;
const ELLIPSIS: &str = "...";

/// Hard cutoff at [`MAX_CONTENT_CHARS`] characters, marked with an ellipsis.
pub fn truncate_content(text: &str) -> String {
    match text.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Assembles the instruction sent to the LLM client for one question about `url`.
pub fn build_prompt(url: &str, question: &str, content: &PageContent) -> String {
    match content {
        PageContent::Unreachable { .. } => format!(
            "The webpage at {url} could not be retrieved: {content}\n\n\
             Please answer the following question using general knowledge:\n\n\
             Q: {question}"
        ),
        _ => {
            let summary = truncate_content(&content.to_string());
            format!(
                "You are an assistant helping users with questions about this webpage: {url}\n\n\
                 Webpage Content:\n\
                 {summary}\n\n\
                 Now answer the user's question clearly and concisely.\n\n\
                 Q: {question}"
            )
        }
    }
}
