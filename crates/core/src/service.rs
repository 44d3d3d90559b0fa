//! Request-level entry point shared by the REST and CLI surfaces.
//!
//! [`GeneratorService`] owns the configuration, value provider and optional enhancer, and
//! turns a [`GenerationRequest`] into one of the three output encodings.

use crate::builder::{BuildOptions, MessageBuilder};
use crate::config::CoreConfig;
use crate::encode::{EnvelopeEncoder, LinearEncoder, NestedEncoder, StructuredRecord};
use crate::enhance::{EnhancementHook, Enhancer};
use crate::model::Message;
use crate::provider::{IrishValueProvider, ValueProvider};
use crate::registry::{self, MessageTypeDefinition};
use crate::{GenerationError, GenerationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Output encoding requested by a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Linear,
    Nested,
    Structured,
}

impl FromStr for OutputFormat {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "hl7" | "er7" | "pipe" => Ok(Self::Linear),
            "nested" | "xml" => Ok(Self::Nested),
            "structured" | "json" => Ok(Self::Structured),
            other => Err(GenerationError::InvalidInput(format!(
                "unknown output format '{other}', expected linear, nested or structured"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linear => "linear",
            Self::Nested => "nested",
            Self::Structured => "structured",
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// `None` picks a type uniformly at random.
    pub type_id: Option<u32>,
    pub format: OutputFormat,
    pub options: BuildOptions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutput {
    Text(String),
    Structured(StructuredRecord),
}

impl GenerationOutput {
    /// The output as a single string; structured records become JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Encoding`] if the record cannot be serialised.
    pub fn into_text(self) -> GenerationResult<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Structured(record) => record.to_json(),
        }
    }
}

/// A generated output together with the type it was built as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generated {
    pub definition: &'static MessageTypeDefinition,
    pub output: GenerationOutput,
}

#[derive(Clone)]
pub struct GeneratorService {
    config: Arc<CoreConfig>,
    provider: Arc<dyn ValueProvider>,
    enhancer: Option<Enhancer>,
}

impl fmt::Debug for GeneratorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorService")
            .field("config", &self.config)
            .field("enhancer", &self.enhancer)
            .finish_non_exhaustive()
    }
}

impl GeneratorService {
    /// Service backed by the Irish value tables and no enhancement hook.
    pub fn new(config: CoreConfig) -> Self {
        Self::with_provider(config, Arc::new(IrishValueProvider::new()))
    }

    pub fn with_provider(config: CoreConfig, provider: Arc<dyn ValueProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            enhancer: None,
        }
    }

    /// Installs `hook` with the configured enhancement budget.
    pub fn with_enhancement_hook(mut self, hook: Arc<dyn EnhancementHook>) -> Self {
        self.enhancer = Some(Enhancer::new(hook, self.config.enhancement_timeout()));
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn has_enhancement_hook(&self) -> bool {
        self.enhancer.is_some()
    }

    pub fn message_types(&self) -> &'static [MessageTypeDefinition] {
        registry::definitions()
    }

    /// Builds the canonical message for `type_id`.
    ///
    /// # Errors
    ///
    /// See [`MessageBuilder::build`].
    pub fn build(&self, type_id: u32, options: &BuildOptions) -> GenerationResult<Message> {
        let builder = MessageBuilder::new(&self.config, self.provider.as_ref());
        let builder = match &self.enhancer {
            Some(enhancer) => builder.with_enhancer(enhancer),
            None => builder,
        };
        builder.build(type_id, options)
    }

    /// Builds and encodes one message.
    ///
    /// # Errors
    ///
    /// Client errors ([`GenerationError::UnknownType`], [`GenerationError::InvalidInput`])
    /// for bad requests; [`GenerationError::Grammar`] or [`GenerationError::Encoding`] when
    /// a generated value cannot be carried.
    pub fn generate(&self, request: &GenerationRequest) -> GenerationResult<Generated> {
        let type_id = match request.type_id {
            Some(id) => id,
            None => registry::random_type_id(&mut request.options.rng()),
        };
        let definition = registry::lookup(type_id)?;
        let message = self.build(type_id, &request.options)?;

        let output = match request.format {
            OutputFormat::Linear => GenerationOutput::Text(LinearEncoder::new().encode(&message)?),
            OutputFormat::Nested => {
                GenerationOutput::Text(NestedEncoder::pretty().encode(&message)?)
            }
            OutputFormat::Structured => {
                GenerationOutput::Structured(EnvelopeEncoder::new().encode(&message, definition)?)
            }
        };

        tracing::info!(
            type_id,
            label = definition.label,
            format = %request.format,
            enhance = request.options.enhance,
            "generated message"
        );
        Ok(Generated { definition, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COMPONENT_SEPARATOR, FIELD_SEPARATOR, SEGMENT_TERMINATOR};
    use crate::enhance::{EnhancementRequest, EnhancementUnavailable};
    use crate::provider::{DemographicConstraints, Sex};
    use std::time::Duration;

    fn service() -> GeneratorService {
        GeneratorService::new(CoreConfig::default())
    }

    fn text(generated: Generated) -> String {
        match generated.output {
            GenerationOutput::Text(text) => text,
            other => panic!("expected text output, got {other:?}"),
        }
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("linear".parse::<OutputFormat>().ok(), Some(OutputFormat::Linear));
        assert_eq!("HL7".parse::<OutputFormat>().ok(), Some(OutputFormat::Linear));
        assert_eq!("XML".parse::<OutputFormat>().ok(), Some(OutputFormat::Nested));
        assert_eq!(" json ".parse::<OutputFormat>().ok(), Some(OutputFormat::Structured));
        assert!(matches!(
            "csv".parse::<OutputFormat>(),
            Err(GenerationError::InvalidInput(_))
        ));
    }

    #[test]
    fn lab_result_for_given_patient() {
        let request = GenerationRequest {
            type_id: Some(10),
            format: OutputFormat::Linear,
            options: BuildOptions {
                seed: Some(7),
                demographics: DemographicConstraints {
                    sex: Some(Sex::Male),
                    age: Some(49),
                },
                ..BuildOptions::default()
            },
        };
        let output = text(service().generate(&request).expect("generates"));
        let lines: Vec<&str> = output.split(SEGMENT_TERMINATOR).collect();
        assert!(lines[0].starts_with("MSH"));
        let msh9 = lines[0].split(FIELD_SEPARATOR).nth(8).expect("MSH.9");
        assert_eq!(msh9.split(COMPONENT_SEPARATOR).collect::<Vec<_>>(), ["ORU", "R01"]);

        let pids: Vec<&&str> = lines.iter().filter(|l| l.starts_with("PID|")).collect();
        assert_eq!(pids.len(), 1);
        let name = pids[0].split(FIELD_SEPARATOR).nth(5).expect("PID.5");
        assert!(name.split(COMPONENT_SEPARATOR).any(|part| !part.is_empty()));
    }

    #[test]
    fn structured_acknowledgement() {
        let request = GenerationRequest {
            type_id: Some(13),
            format: OutputFormat::Structured,
            options: BuildOptions::default(),
        };
        let generated = service().generate(&request).expect("generates");
        assert_eq!(generated.definition.id, 13);
        match generated.output {
            GenerationOutput::Structured(record) => {
                assert_eq!(record.message_type_label, "Acknowledgement");
                assert_eq!(record.hl7_grammar_family, "ACK");
            }
            other => panic!("expected structured output, got {other:?}"),
        }
    }

    #[test]
    fn random_type_is_deterministic_under_seed() {
        let request = GenerationRequest {
            type_id: None,
            format: OutputFormat::Nested,
            options: BuildOptions {
                seed: Some(31337),
                reference_time: chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
                    .and_then(|d| d.and_hms_opt(12, 0, 0)),
                ..BuildOptions::default()
            },
        };
        let a = service().generate(&request).expect("generates");
        let b = service().generate(&request).expect("generates");
        assert_eq!(a.definition.id, b.definition.id);
        assert_eq!(a.output, b.output);
        assert!(text(a).starts_with(&format!("<{}>", b.definition.family.tag())));
    }

    #[test]
    fn unknown_type_is_a_client_error() {
        let request = GenerationRequest {
            type_id: Some(32),
            ..GenerationRequest::default()
        };
        let err = service().generate(&request).expect_err("unknown type");
        assert!(matches!(err, GenerationError::UnknownType(32)));
        assert!(err.is_client_error());
    }

    struct Unreachable;

    impl EnhancementHook for Unreachable {
        fn enhance(
            &self,
            _request: &EnhancementRequest,
            _timeout: Duration,
        ) -> Result<String, EnhancementUnavailable> {
            Err(EnhancementUnavailable::Transport("connection refused".into()))
        }
    }

    #[test]
    fn failing_hook_still_generates() {
        let service = GeneratorService::new(
            CoreConfig::default()
                .with_enhancement_timeout(Duration::from_millis(200))
                .expect("valid timeout"),
        )
        .with_enhancement_hook(Arc::new(Unreachable));
        assert!(service.has_enhancement_hook());

        let options = BuildOptions {
            seed: Some(3),
            reference_time: chrono::NaiveDate::from_ymd_opt(2025, 2, 2)
                .and_then(|d| d.and_hms_opt(9, 0, 0)),
            ..BuildOptions::default()
        };
        let plain = service.build(10, &options).expect("builds");
        let enhanced = service
            .build(10, &BuildOptions { enhance: true, ..options })
            .expect("builds despite hook failure");
        assert_eq!(plain, enhanced);
    }
}
