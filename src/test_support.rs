//! In-memory stand-ins for the network-facing traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;

use crate::agent::{ChunkStream, GenerativeModel};
use crate::crawler::{PageContent, PageSource};
use crate::errors::LlmError;

/// Replays a fixed list of chunks for every request, optionally failing at the end.
pub struct ScriptedModel {
    chunks: Vec<String>,
    fail_at_end: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_at_end: false,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_after(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail_at_end: true,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl GenerativeModel for ScriptedModel {
    fn stream_generate(&self, prompt: String) -> ChunkStream {
        self.prompts.lock().push(prompt);
        let mut items: Vec<Result<String, LlmError>> = self.chunks.iter().cloned().map(Ok).collect();
        if self.fail_at_end {
            items.push(Err(LlmError::StreamInterrupted("scripted failure".into())));
        }
        stream::iter(items).boxed()
    }
}

/// Serves the same extraction result for every url and counts lookups.
pub struct StaticPage {
    content: PageContent,
    lookups: AtomicUsize,
}

impl StaticPage {
    pub fn new(content: PageContent) -> Arc<Self> {
        Arc::new(Self { content, lookups: AtomicUsize::new(0) })
    }

    pub fn text(text: &str) -> Arc<Self> {
        Self::new(PageContent::Text(text.to_string()))
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for StaticPage {
    async fn extract(&self, _url: &str) -> PageContent {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.content.clone()
    }
}

/// A page source that blows up, for exercising the flow's last-resort handler.
pub struct PanickingPage;

#[async_trait]
impl PageSource for PanickingPage {
    async fn extract(&self, _url: &str) -> PageContent {
        panic!("crawler exploded")
    }
}
