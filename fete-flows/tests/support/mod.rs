#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fete_adapters::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
};

enum Reply {
    Text(String),
    Error(fn() -> BackendError),
}

/// Backend double that returns a fixed reply and records every prompt.
pub struct RecordingBackend {
    metadata: BackendMetadata,
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl RecordingBackend {
    fn with_reply(reply: Reply) -> Self {
        Self {
            metadata: BackendMetadata::new("recording", "stub-1"),
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::with_reply(Reply::Text(text.into())))
    }

    pub fn replying_json(value: &serde_json::Value) -> Arc<Self> {
        Self::replying(value.to_string())
    }

    pub fn slow(text: impl Into<String>, delay: Duration) -> Arc<Self> {
        let mut backend = Self::with_reply(Reply::Text(text.into()));
        backend.delay = Some(delay);
        Arc::new(backend)
    }

    pub fn failing(error: fn() -> BackendError) -> Arc<Self> {
        Arc::new(Self::with_reply(Reply::Error(error)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for RecordingBackend {
    fn metadata(&self) -> &BackendMetadata {
        &self.metadata
    }

    async fn generate(&self, request: GenerationRequest) -> BackendResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt().to_owned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Error(make) => Err(make()),
        }
    }
}
