//! Canonical message tree.
//!
//! Every wire encoding is derived from the types in this module. A [`Message`] is built once
//! by the builder and never mutated afterwards.
//!
//! Nesting is bounded by construction: a [`FieldValue`] holds [`Component`]s, a component
//! holds [`SubComponent`]s, and a sub-component can only hold a [`Scalar`]. Repetition lives
//! one level up on [`Field`], so it never adds depth.

use crate::constants::HEADER_TAG;
use crate::registry::GrammarFamily;
use crate::{GenerationError, GenerationResult};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Atomic value carried by a field, component or sub-component.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    /// Fixed-point rendering with `scale` fractional digits.
    Decimal { value: f64, scale: u8 },
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Renders the scalar in its HL7 lexical form.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal { value, scale } => format!("{:.*}", usize::from(*scale), value),
            Self::Date(date) => date.format("%Y%m%d").to_string(),
            Self::DateTime(ts) => ts.format("%Y%m%d%H%M%S").to_string(),
        }
    }

    /// Only blank text counts as empty; numbers and dates always carry a value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One sub-component slot. `None` is an explicit empty slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubComponent(pub Option<Scalar>);

impl SubComponent {
    pub fn text(value: impl Into<String>) -> Self {
        Self(Some(Scalar::text(value)))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_ref().map_or(true, Scalar::is_empty)
    }
}

/// One component slot of a composite field.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Component {
    #[default]
    Empty,
    Scalar(Scalar),
    SubComponents(Vec<SubComponent>),
}

impl Component {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::text(value))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Scalar(scalar) => scalar.is_empty(),
            Self::SubComponents(subs) => subs.iter().all(SubComponent::is_empty),
        }
    }
}

/// The value of a single field repetition.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Empty,
    Scalar(Scalar),
    Components(Vec<Component>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::text(value))
    }

    /// Composite value from plain text components; blank strings become empty components.
    pub fn components<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Components(
            values
                .into_iter()
                .map(|v| {
                    let v = v.into();
                    if v.is_empty() {
                        Component::Empty
                    } else {
                        Component::text(v)
                    }
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Scalar(scalar) => scalar.is_empty(),
            Self::Components(components) => components.iter().all(Component::is_empty),
        }
    }

    /// Returns the text of a scalar value, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns the component at `index` (1-based).
    pub fn component(&self, index: usize) -> Option<&Component> {
        match self {
            Self::Components(components) => index.checked_sub(1).and_then(|i| components.get(i)),
            _ => None,
        }
    }
}

/// One positional slot in a segment. Holds zero or more repetitions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Field {
    repetitions: Vec<FieldValue>,
}

impl Field {
    pub fn new(value: FieldValue) -> Self {
        Self {
            repetitions: vec![value],
        }
    }

    pub fn repetitions(&self) -> &[FieldValue] {
        &self.repetitions
    }

    /// First repetition, or `None` when the slot was never populated.
    pub fn first(&self) -> Option<&FieldValue> {
        self.repetitions.first()
    }

    pub fn is_empty(&self) -> bool {
        self.repetitions.iter().all(FieldValue::is_empty)
    }

    fn push(&mut self, value: FieldValue) {
        self.repetitions.push(value);
    }
}

/// A tagged, positional record.
///
/// Slots `1..=max_position` always exist, so encoders can reproduce delimiter counts without
/// consulting the grammar.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    tag: String,
    fields: Vec<Field>,
}

impl Segment {
    /// Creates a segment with `max_position` empty slots.
    pub fn new(tag: impl Into<String>, max_position: usize) -> Self {
        Self {
            tag: tag.into(),
            fields: vec![Field::default(); max_position],
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn max_position(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field at `position` (1-based).
    pub fn field(&self, position: usize) -> Option<&Field> {
        position.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Returns the first repetition at `position`, treating unpopulated slots as empty.
    pub fn value(&self, position: usize) -> Option<&FieldValue> {
        self.field(position).and_then(Field::first)
    }

    /// Appends a repetition at `position` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Grammar`] if `position` is outside `1..=max_position`.
    pub fn push_value(&mut self, position: usize, value: FieldValue) -> GenerationResult<()> {
        let max = self.fields.len();
        let slot = position
            .checked_sub(1)
            .and_then(|i| self.fields.get_mut(i))
            .ok_or_else(|| {
                GenerationError::Grammar(format!(
                    "{} has no field position {position} (maximum {max})",
                    self.tag
                ))
            })?;
        slot.push(value);
        Ok(())
    }
}

/// A named repetition unit of the message body.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentGroup {
    name: String,
    children: Vec<BodyNode>,
}

impl SegmentGroup {
    pub fn new(name: impl Into<String>, children: Vec<BodyNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[BodyNode] {
        &self.children
    }
}

/// An entry of the message body.
#[derive(Clone, Debug, PartialEq)]
pub enum BodyNode {
    Segment(Segment),
    Group(SegmentGroup),
}

impl BodyNode {
    fn collect_segments<'a>(&'a self, out: &mut Vec<&'a Segment>) {
        match self {
            Self::Segment(segment) => out.push(segment),
            Self::Group(group) => {
                for child in &group.children {
                    child.collect_segments(out);
                }
            }
        }
    }
}

/// The facility a message claims to come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendingFacility {
    pub name: String,
    pub hipe_code: String,
    pub doh_code: String,
}

/// A generated message: one header plus the grammar-ordered body.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    type_id: u32,
    family: GrammarFamily,
    header: Segment,
    body: Vec<BodyNode>,
    facility: SendingFacility,
}

impl Message {
    /// Assembles a message.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Grammar`] if `header` is not an MSH segment.
    pub fn new(
        type_id: u32,
        family: GrammarFamily,
        header: Segment,
        body: Vec<BodyNode>,
        facility: SendingFacility,
    ) -> GenerationResult<Self> {
        if header.tag() != HEADER_TAG {
            return Err(GenerationError::Grammar(format!(
                "message header must be {HEADER_TAG}, got {}",
                header.tag()
            )));
        }
        Ok(Self {
            type_id,
            family,
            header,
            body,
            facility,
        })
    }

    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    pub fn family(&self) -> GrammarFamily {
        self.family
    }

    pub fn header(&self) -> &Segment {
        &self.header
    }

    pub fn body(&self) -> &[BodyNode] {
        &self.body
    }

    pub fn facility(&self) -> &SendingFacility {
        &self.facility
    }

    /// Body segments in document order, groups flattened.
    pub fn body_segments(&self) -> Vec<&Segment> {
        let mut out = Vec::new();
        for node in &self.body {
            node.collect_segments(&mut out);
        }
        out
    }

    /// All segments with `tag`, including the header.
    pub fn segments_with_tag(&self, tag: &str) -> Vec<&Segment> {
        std::iter::once(&self.header)
            .chain(self.body_segments())
            .filter(|s| s.tag() == tag)
            .collect()
    }
}
