//! Message construction.
//!
//! [`MessageBuilder`] walks a grammar template, asks the value provider for every declared
//! field, checks each value against the declared shape and assembles an immutable
//! [`Message`].

use crate::config::CoreConfig;
use crate::constants::{
    ENCODING_CHARACTERS, FIELD_SEPARATOR, HEADER_MAX_POSITION, HEADER_TAG,
    PROCESSING_ID_PRODUCTION,
};
use crate::enhance::{ClinicalSummary, EnhanceableField, Enhancer, EnhancementRequest};
use crate::model::{BodyNode, Component, FieldValue, Message, Scalar, Segment, SegmentGroup};
use crate::provider::{
    ClinicalContext, Constraints, ContextRequest, DemographicConstraints, ValueProvider,
};
use crate::registry::{
    self, FieldDefinition, FieldShape, MessageTypeDefinition, SegmentDefinition, TemplateNode,
};
use crate::validation;
use crate::{GenerationError, GenerationResult};
use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Instant;

/// Per-request build options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Same seed and same reference time give an identical message.
    pub seed: Option<u64>,
    pub demographics: DemographicConstraints,
    /// Route enhance-eligible fields through the hook, if one is installed.
    pub enhance: bool,
    /// Defaults to the local clock.
    pub reference_time: Option<NaiveDateTime>,
}

impl BuildOptions {
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidInput`] for out-of-range demographics.
    pub fn validate(&self) -> GenerationResult<()> {
        self.demographics.validate()
    }

    /// RNG for one request, seeded when a seed was given.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Builds messages from registry templates and a value provider.
pub struct MessageBuilder<'a> {
    config: &'a CoreConfig,
    provider: &'a dyn ValueProvider,
    enhancer: Option<&'a Enhancer>,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(config: &'a CoreConfig, provider: &'a dyn ValueProvider) -> Self {
        Self {
            config,
            provider,
            enhancer: None,
        }
    }

    pub fn with_enhancer(mut self, enhancer: &'a Enhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Builds one message of type `type_id`.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::UnknownType`] if `type_id` is not in the registry.
    /// - [`GenerationError::InvalidInput`] if the options are out of range.
    /// - [`GenerationError::Grammar`] if the provider returns a value that does not fit the
    ///   declared field shape.
    pub fn build(&self, type_id: u32, options: &BuildOptions) -> GenerationResult<Message> {
        let definition = registry::lookup(type_id)?;
        options.validate()?;

        let mut rng = options.rng();
        let reference_time = options
            .reference_time
            .unwrap_or_else(|| Local::now().naive_local());

        let context = self.provider.context(
            &ContextRequest {
                definition,
                demographics: options.demographics,
                reference_time,
            },
            &mut rng,
        );

        let header = self.header(definition, &context, &mut rng)?;

        let enhancer = self.enhancer.filter(|_| options.enhance);
        let mut walk = TemplateWalk {
            provider: self.provider,
            enhancer: enhancer.map(|e| (e, Instant::now() + e.budget())),
            context: &context,
            rng: &mut rng,
            occurrences: HashMap::new(),
        };
        let body = walk.nodes(definition.template())?;

        let message = Message::new(
            definition.id,
            definition.family,
            header,
            body,
            context.facility.clone(),
        )?;
        validation::validate_structure(&message, definition)?;

        tracing::debug!(
            type_id,
            family = %definition.family,
            segments = message.body_segments().len(),
            "built message"
        );
        Ok(message)
    }

    fn header(
        &self,
        definition: &MessageTypeDefinition,
        context: &ClinicalContext,
        rng: &mut StdRng,
    ) -> GenerationResult<Segment> {
        let reference = context.reference_time;
        let (code, trigger) = definition.family.message_code();
        let message_type = match trigger {
            Some(trigger) => FieldValue::components([code, trigger]),
            None => FieldValue::text(code),
        };
        let control_id = format!(
            "{}{}",
            reference.format("%Y%m%d%H%M"),
            rng.gen_range(1000..=9999)
        );

        let mut header = Segment::new(HEADER_TAG, HEADER_MAX_POSITION);
        let fields = [
            (1, FieldValue::text(FIELD_SEPARATOR.to_string())),
            (2, FieldValue::text(ENCODING_CHARACTERS)),
            (
                3,
                FieldValue::text(format!(
                    "{}{}",
                    self.config.sending_application_prefix(),
                    definition.id
                )),
            ),
            (4, FieldValue::text(context.facility.hipe_code.clone())),
            (5, FieldValue::text(self.config.receiving_application())),
            (6, FieldValue::text(self.config.receiving_facility())),
            (7, FieldValue::Scalar(Scalar::DateTime(reference))),
            (9, message_type),
            (10, FieldValue::text(control_id)),
            (11, FieldValue::text(PROCESSING_ID_PRODUCTION)),
            (12, FieldValue::text(self.config.hl7_version())),
        ];
        for (position, value) in fields {
            header.push_value(position, value)?;
        }
        Ok(header)
    }
}

/// State for one pass over a template.
struct TemplateWalk<'a, 'r> {
    provider: &'a dyn ValueProvider,
    /// Hook plus the one deadline every enhanced field of this message shares.
    enhancer: Option<(&'a Enhancer, Instant)>,
    context: &'a ClinicalContext,
    rng: &'r mut StdRng,
    /// Segments emitted so far, per tag.
    occurrences: HashMap<&'static str, u32>,
}

impl TemplateWalk<'_, '_> {
    fn nodes(&mut self, template: &'static [TemplateNode]) -> GenerationResult<Vec<BodyNode>> {
        let mut out = Vec::new();
        for node in template {
            let cardinality = node.cardinality();
            let count = self.rng.gen_range(cardinality.min..=cardinality.max);
            for _ in 0..count {
                match node {
                    TemplateNode::Segment { definition, .. } => {
                        out.push(BodyNode::Segment(self.segment(definition)?));
                    }
                    TemplateNode::Group(group) => {
                        let children = self.nodes(group.children)?;
                        out.push(BodyNode::Group(SegmentGroup::new(group.name, children)));
                    }
                }
            }
        }
        Ok(out)
    }

    fn segment(&mut self, definition: &'static SegmentDefinition) -> GenerationResult<Segment> {
        let occurrence = {
            let counter = self.occurrences.entry(definition.tag).or_insert(0);
            *counter += 1;
            *counter
        };
        let constraints = Constraints {
            context: self.context,
            occurrence,
        };

        let mut segment = Segment::new(definition.tag, definition.max_position);
        for field in definition.fields {
            for kind in field.kinds() {
                let value = self.provider.provide(kind, &constraints, &mut *self.rng);
                let value = conform(definition.tag, field, value)?;
                let value = self.maybe_enhance(field, value);
                segment.push_value(field.position, value)?;
            }
        }
        Ok(segment)
    }

    fn maybe_enhance(&self, field: &FieldDefinition, value: FieldValue) -> FieldValue {
        let Some((enhancer, deadline)) = self.enhancer.filter(|_| field.enhance) else {
            return value;
        };
        let Some(target) = EnhanceableField::classify(field.kind, self.context.profile) else {
            return value;
        };
        match value {
            FieldValue::Scalar(Scalar::Text(draft)) if !draft.is_empty() => {
                let request = EnhancementRequest {
                    field: target,
                    summary: ClinicalSummary::from(self.context),
                    draft,
                };
                let text = enhancer.enhance_or_draft_until(request, deadline);
                FieldValue::text(text)
            }
            other => other,
        }
    }
}

/// Checks a provider value against the declared shape and pads composites to full width.
fn conform(tag: &str, field: &FieldDefinition, value: FieldValue) -> GenerationResult<FieldValue> {
    match (field.shape, value) {
        (_, FieldValue::Empty) => Ok(FieldValue::Empty),
        (FieldShape::Scalar, value @ FieldValue::Scalar(_)) => Ok(value),
        (FieldShape::Scalar, FieldValue::Components(_)) => Err(GenerationError::Grammar(format!(
            "{tag}.{} is scalar but the provider returned a composite for {:?}",
            field.position, field.kind
        ))),
        (FieldShape::Composite { width }, FieldValue::Scalar(scalar)) => {
            Ok(pad(vec![Component::Scalar(scalar)], width))
        }
        (FieldShape::Composite { width }, FieldValue::Components(components)) => {
            if components.len() > width {
                return Err(GenerationError::Grammar(format!(
                    "{tag}.{} allows {width} components, provider returned {} for {:?}",
                    field.position,
                    components.len(),
                    field.kind
                )));
            }
            Ok(pad(components, width))
        }
    }
}

fn pad(mut components: Vec<Component>, width: usize) -> FieldValue {
    components.resize(width, Component::Empty);
    FieldValue::Components(components)
}
