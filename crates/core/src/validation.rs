//! Structural validation of built messages against their grammar template.

use crate::constants::{HEADER_MAX_POSITION, HEADER_TAG};
use crate::model::{BodyNode, Message};
use crate::registry::{MessageTypeDefinition, TemplateNode};
use crate::{GenerationError, GenerationResult};

/// Checks that `message` follows the template of `definition`.
///
/// Verifies the header shape, segment order, group nesting, occurrence counts and that every
/// segment carries exactly its declared number of field slots.
///
/// # Errors
///
/// Returns [`GenerationError::Grammar`] describing the first deviation found.
pub fn validate_structure(
    message: &Message,
    definition: &MessageTypeDefinition,
) -> GenerationResult<()> {
    if message.type_id() != definition.id || message.family() != definition.family {
        return Err(GenerationError::Grammar(format!(
            "message is type {} ({}) but was checked against type {} ({})",
            message.type_id(),
            message.family(),
            definition.id,
            definition.family
        )));
    }

    let header = message.header();
    if header.tag() != HEADER_TAG || header.max_position() != HEADER_MAX_POSITION {
        return Err(GenerationError::Grammar(format!(
            "header must be {HEADER_TAG} with {HEADER_MAX_POSITION} fields, got {} with {}",
            header.tag(),
            header.max_position()
        )));
    }

    let rest = match_nodes(definition.template(), message.body(), definition.family.tag())?;
    if let Some(extra) = rest.first() {
        return Err(GenerationError::Grammar(format!(
            "unexpected {} after the end of the {} template",
            describe(extra),
            definition.family
        )));
    }
    Ok(())
}

fn describe(node: &BodyNode) -> String {
    match node {
        BodyNode::Segment(segment) => format!("segment {}", segment.tag()),
        BodyNode::Group(group) => format!("group {}", group.name()),
    }
}

/// Consumes the prefix of `nodes` that matches `template` and returns what is left.
fn match_nodes<'m>(
    template: &[TemplateNode],
    mut nodes: &'m [BodyNode],
    scope: &str,
) -> GenerationResult<&'m [BodyNode]> {
    for expected in template {
        let mut count = 0;
        while let Some((node, rest)) = nodes.split_first() {
            match (expected, node) {
                (TemplateNode::Segment { definition, .. }, BodyNode::Segment(segment))
                    if segment.tag() == definition.tag =>
                {
                    if segment.max_position() != definition.max_position {
                        return Err(GenerationError::Grammar(format!(
                            "{} in {scope} has {} fields, expected {}",
                            segment.tag(),
                            segment.max_position(),
                            definition.max_position
                        )));
                    }
                }
                (TemplateNode::Group(group_def), BodyNode::Group(group))
                    if group.name() == group_def.name =>
                {
                    let inner = format!("{scope}.{}", group_def.name);
                    let left = match_nodes(group_def.children, group.children(), &inner)?;
                    if let Some(extra) = left.first() {
                        return Err(GenerationError::Grammar(format!(
                            "unexpected {} inside {inner}",
                            describe(extra)
                        )));
                    }
                }
                _ => break,
            }
            count += 1;
            nodes = rest;
        }

        let cardinality = expected.cardinality();
        if !cardinality.contains(count) {
            let name = match expected {
                TemplateNode::Segment { definition, .. } => definition.tag,
                TemplateNode::Group(group) => group.name,
            };
            return Err(GenerationError::Grammar(format!(
                "{name} occurs {count} times in {scope}, expected {}..={}",
                cardinality.min, cardinality.max
            )));
        }
    }
    Ok(nodes)
}
