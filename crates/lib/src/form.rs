//! Prompt form state: one text input, one response region, one error region.
//!
//! The UI calls [`PromptForm::submit`] when the user presses Generate, runs the returned prompt
//! against a [`TextGenerator`] however it likes (inline, or on a worker thread), then hands the
//! outcome to [`PromptForm::finish`].

use crate::llm::TextGenerator;

const NO_TEXT_MESSAGE: &str = "the model returned no text";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormPhase {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct PromptForm {
    /// Bound to the text input.
    pub input: String,
    response: Option<String>,
    error: Option<String>,
    phase: FormPhase,
}

impl PromptForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Input and button are disabled while a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == FormPhase::Loading
    }

    /// Begin a request. Returns the raw prompt to send, or None when the input is blank or a
    /// request is already running (nothing is cleared in that case).
    pub fn submit(&mut self) -> Option<String> {
        if self.is_loading() || self.input.trim().is_empty() {
            return None;
        }
        self.response = None;
        self.error = None;
        self.phase = FormPhase::Loading;
        Some(self.input.clone())
    }

    /// Record the outcome of the request started by `submit`.
    pub fn finish<E: std::fmt::Display>(&mut self, result: Result<Option<String>, E>) {
        match result {
            Ok(Some(text)) => {
                self.response = Some(text);
                self.error = None;
                self.phase = FormPhase::Success;
            }
            Ok(None) => self.fail(NO_TEXT_MESSAGE),
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// Show `message` in the error region and re-enable the input.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.response = None;
        self.error = Some(message.into());
        self.phase = FormPhase::Error;
    }

    /// Submit and wait for the generator inline. Returns false when nothing was sent.
    pub async fn run<G: TextGenerator + ?Sized>(&mut self, generator: &G) -> bool {
        let Some(prompt) = self.submit() else {
            return false;
        };
        let result = generator.generate(&prompt).await;
        self.finish(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerateError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        calls: AtomicUsize,
        reply: fn() -> Result<Option<String>, GenerateError>,
    }

    impl Scripted {
        fn new(reply: fn() -> Result<Option<String>, GenerateError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<Option<String>, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn api_error() -> GenerateError {
        GenerateError::Api {
            status: 500,
            body: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn blank_input_makes_no_call() {
        let generator = Scripted::new(|| Ok(Some("never".to_string())));
        let mut form = PromptForm::new();
        for input in ["", "   ", "\n\t "] {
            form.input = input.to_string();
            assert!(!form.run(&generator).await);
        }
        assert_eq!(generator.calls(), 0);
        assert_eq!(form.phase(), FormPhase::Idle);
    }

    #[tokio::test]
    async fn success_fills_response_and_clears_error() {
        let generator = Scripted::new(|| Ok(Some("a poem".to_string())));
        let mut form = PromptForm::new();
        form.finish(Err(api_error()));
        assert!(form.error().is_some());

        form.input = "write a poem".to_string();
        assert!(form.run(&generator).await);
        assert_eq!(generator.calls(), 1);
        assert_eq!(form.response(), Some("a poem"));
        assert_eq!(form.error(), None);
        assert_eq!(form.phase(), FormPhase::Success);
        assert_eq!(form.input, "write a poem");
    }

    #[tokio::test]
    async fn failure_fills_error_and_clears_response() {
        let generator = Scripted::new(|| Err(api_error()));
        let mut form = PromptForm::new();
        form.finish(Ok::<_, GenerateError>(Some("old".to_string())));

        form.input = "hello".to_string();
        assert!(form.run(&generator).await);
        assert_eq!(form.response(), None);
        assert!(form.error().unwrap().contains("500"));
        assert_eq!(form.phase(), FormPhase::Error);
    }

    #[test]
    fn submit_clears_previous_output_and_disables_input() {
        let mut form = PromptForm::new();
        form.finish(Ok::<_, GenerateError>(Some("previous".to_string())));
        form.input = "  raw prompt ".to_string();

        assert_eq!(form.submit().as_deref(), Some("  raw prompt "));
        assert!(form.is_loading());
        assert_eq!(form.response(), None);
        assert_eq!(form.error(), None);

        // A second press while loading does nothing.
        assert_eq!(form.submit(), None);
    }

    #[test]
    fn empty_answer_is_reported_as_error() {
        let mut form = PromptForm::new();
        form.input = "x".to_string();
        form.submit();
        form.finish(Ok::<_, GenerateError>(None));
        assert_eq!(form.error(), Some(NO_TEXT_MESSAGE));
        assert_eq!(form.response(), None);
        assert!(!form.is_loading());
    }
}
