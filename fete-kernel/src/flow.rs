//! Typed generation flows: validate, render, generate, validate again.

use std::marker::PhantomData;
use std::sync::Arc;

use fete_adapters::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
    OutputFormat, parse_structured,
};
use fete_primitives::{FlowName, InvocationId};
use fete_prompts::{
    PromptTemplate, Schematic, TemplateSource, Validated, validate_input, validate_output,
    validate_value,
};
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{FlowError, FlowResult};
use crate::lifecycle::{FlowEvent, Lifecycle};
use crate::observer::{FlowObserver, Transition};

const OUTPUT_INSTRUCTION: &str =
    "Output should be in JSON format and conform to the following schema:";

/// Static description of a flow: its name, prompt template and generation options.
///
/// The template is compiled against the input schema, so a slot that names an
/// undeclared field is rejected here rather than at invocation time.
#[derive(Debug)]
pub struct FlowDefinition<I, O> {
    name: FlowName,
    template: PromptTemplate,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I: Schematic, O: Schematic> FlowDefinition<I, O> {
    /// Creates a definition from a flow name and template text.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Definition`] for an invalid name and
    /// [`FlowError::Template`] when the template is malformed or references a
    /// field the input schema does not declare.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> FlowResult<Self> {
        let name = FlowName::new(name)?;
        let template = PromptTemplate::compile(template, &I::schema().field_names())?;

        Ok(Self {
            name,
            template,
            temperature: None,
            max_output_tokens: None,
            _types: PhantomData,
        })
    }

    /// Sets the sampling temperature sent with every request.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Caps the output length of every request.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Returns the flow name.
    #[must_use]
    pub fn name(&self) -> &FlowName {
        &self.name
    }

    /// Returns the compiled template.
    #[must_use]
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Validates `input` and renders the full prompt, output instruction included.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Validation`] for invalid input and
    /// [`FlowError::Template`] if a slot cannot be filled.
    pub fn render_prompt(&self, input: &I) -> FlowResult<String> {
        let validated = validate_input(input)?;
        self.render(&validated)
    }

    fn render<S: TemplateSource + ?Sized>(&self, values: &S) -> FlowResult<String> {
        let body = self.template.render(values)?;
        Ok(format!(
            "{body}\n\n{OUTPUT_INSTRUCTION}\n{:#}",
            O::schema().json_schema()
        ))
    }

    fn request(&self, prompt: String) -> BackendResult<GenerationRequest> {
        let mut request = GenerationRequest::new(prompt)?.with_output_format(OutputFormat::Json);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(tokens) = self.max_output_tokens {
            request = request.with_max_output_tokens(tokens);
        }
        Ok(request)
    }
}

/// A flow bound to a generation backend.
///
/// Flows hold no per-call state: concurrent invocations share only the
/// definition and backend handle.
pub struct Flow<I, O> {
    definition: Arc<FlowDefinition<I, O>>,
    backend: Arc<dyn GenerationBackend>,
    observer: Option<Arc<dyn FlowObserver>>,
}

impl<I, O> Clone for Flow<I, O> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            backend: Arc::clone(&self.backend),
            observer: self.observer.clone(),
        }
    }
}

impl<I, O> std::fmt::Debug for Flow<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.definition.name)
            .field("backend", self.backend.metadata())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl<I: Schematic, O: Schematic> Flow<I, O> {
    /// Binds `definition` to `backend`.
    #[must_use]
    pub fn new(definition: FlowDefinition<I, O>, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            definition: Arc::new(definition),
            backend,
            observer: None,
        }
    }

    /// Attaches an observer notified of every state change.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FlowObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the flow name.
    #[must_use]
    pub fn name(&self) -> &FlowName {
        &self.definition.name
    }

    /// Returns metadata of the bound backend.
    #[must_use]
    pub fn metadata(&self) -> &BackendMetadata {
        self.backend.metadata()
    }

    /// Validates `input` and renders the prompt that [`Flow::run`] would send.
    ///
    /// Makes no backend call. Rendering the same input twice yields identical text.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Validation`] for invalid input and
    /// [`FlowError::Template`] if a slot cannot be filled.
    pub fn render_prompt(&self, input: &I) -> FlowResult<String> {
        self.definition.render_prompt(input)
    }

    /// Runs the flow for a typed request.
    ///
    /// Exactly one backend call is made when the input is valid, and none
    /// otherwise. There are no retries; the output is returned only if it
    /// conforms to the response schema.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Validation`] for invalid input or non-conforming
    /// output, [`FlowError::Backend`] when generation fails or the model text
    /// is not a JSON object, and [`FlowError::Template`] on rendering failures.
    pub async fn run(&self, input: &I) -> FlowResult<O> {
        let invocation = InvocationId::random();
        let span = info_span!("flow.run", flow = %self.name(), %invocation);
        async move {
            let mut run = self.start(invocation);
            run.step(FlowEvent::Start)?;
            let validated = run.check(validate_input(input).map_err(FlowError::from))?;
            self.execute(&mut run, validated).await
        }
        .instrument(span)
        .await
    }

    /// Runs the flow for untyped request data, such as a submitted form.
    ///
    /// # Errors
    ///
    /// Same as [`Flow::run`].
    pub async fn run_value(&self, input: Value) -> FlowResult<O> {
        let invocation = InvocationId::random();
        let span = info_span!("flow.run", flow = %self.name(), %invocation);
        async move {
            let mut run = self.start(invocation);
            run.step(FlowEvent::Start)?;
            let validated = run.check(validate_value::<I>(input).map_err(FlowError::from))?;
            self.execute(&mut run, validated).await
        }
        .instrument(span)
        .await
    }

    fn start(&self, invocation: InvocationId) -> Run<'_> {
        Run {
            lifecycle: Lifecycle::new(invocation),
            flow: &self.definition.name,
            observer: self.observer.as_deref(),
        }
    }

    async fn execute(&self, run: &mut Run<'_>, validated: Validated<I>) -> FlowResult<O> {
        run.step(FlowEvent::InputAccepted)?;

        let prompt = run.check(self.definition.render(&validated))?;
        debug!(prompt_len = prompt.len(), "prompt rendered");
        run.step(FlowEvent::PromptRendered)?;

        let request = run.check(
            self.definition
                .request(prompt)
                .map_err(|source| self.backend_error(source)),
        )?;
        let text = run.check(
            self.backend
                .generate(request)
                .await
                .map_err(|source| self.backend_error(source)),
        )?;
        run.step(FlowEvent::BackendResponded)?;

        let structured =
            run.check(parse_structured(&text).map_err(|source| self.backend_error(source)))?;
        let output = run.check(validate_output::<O>(structured).map_err(FlowError::from))?;
        run.step(FlowEvent::OutputAccepted)?;

        info!(backend = %self.backend.metadata(), "flow completed");
        Ok(output)
    }

    fn backend_error(&self, source: BackendError) -> FlowError {
        let metadata = self.backend.metadata();
        FlowError::Backend {
            provider: metadata.provider(),
            model: metadata.model().to_owned(),
            source,
        }
    }
}

struct Run<'a> {
    lifecycle: Lifecycle,
    flow: &'a FlowName,
    observer: Option<&'a dyn FlowObserver>,
}

impl Run<'_> {
    fn advance(&mut self, event: FlowEvent) -> FlowResult<()> {
        let from = self.lifecycle.state();
        let to = self.lifecycle.transition(event)?;
        if let Some(observer) = self.observer {
            observer.on_transition(&Transition {
                invocation: self.lifecycle.invocation(),
                flow: self.flow.clone(),
                from,
                to,
            });
        }
        Ok(())
    }

    fn step(&mut self, event: FlowEvent) -> FlowResult<()> {
        let result = self.advance(event);
        self.check(result)
    }

    fn check<T>(&mut self, result: FlowResult<T>) -> FlowResult<T> {
        result.map_err(|err| {
            warn!(state = ?self.lifecycle.state(), error = %err, "flow invocation failed");
            if !self.lifecycle.state().is_terminal() {
                if let Err(fail) = self.advance(FlowEvent::Fail) {
                    debug!(error = %fail, "could not record failed state");
                }
            }
            err
        })
    }
}
