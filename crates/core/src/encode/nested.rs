//! Nested tagged-element encoding in the HL7 v2 XML style.

use crate::model::{BodyNode, Component, FieldValue, Message, Scalar, Segment, SubComponent};
use crate::{GenerationError, GenerationResult};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

const PRETTY_INDENT: usize = 2;

/// Writes a [`Message`] as nested elements. Empty values produce no element at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NestedEncoder {
    indent: Option<usize>,
}

impl NestedEncoder {
    /// Compact output with no whitespace between elements.
    pub fn new() -> Self {
        Self { indent: None }
    }

    /// Output indented by two spaces per level.
    pub fn pretty() -> Self {
        Self {
            indent: Some(PRETTY_INDENT),
        }
    }

    /// # Errors
    ///
    /// Returns [`GenerationError::Encoding`] if a value holds a character XML 1.0 cannot
    /// represent.
    pub fn encode(&self, message: &Message) -> GenerationResult<String> {
        let cursor = Cursor::new(Vec::new());
        let mut writer = match self.indent {
            Some(size) => Writer::new_with_indent(cursor, b' ', size),
            None => Writer::new(cursor),
        };

        let family = message.family().tag();
        start(&mut writer, family)?;
        write_segment(&mut writer, message.header())?;
        for node in message.body() {
            write_node(&mut writer, family, node)?;
        }
        end(&mut writer, family)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| GenerationError::Encoding(format!("nested output is not UTF-8: {e}")))
    }
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn start(writer: &mut XmlWriter, name: &str) -> GenerationResult<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn end(writer: &mut XmlWriter, name: &str) -> GenerationResult<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn leaf(writer: &mut XmlWriter, name: &str, scalar: &Scalar) -> GenerationResult<()> {
    let text = scalar.render();
    check_xml_chars(&text)?;
    start(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    end(writer, name)
}

fn write_node(writer: &mut XmlWriter, family: &str, node: &BodyNode) -> GenerationResult<()> {
    match node {
        BodyNode::Segment(segment) => write_segment(writer, segment),
        BodyNode::Group(group) => {
            let name = format!("{family}.{}", group.name());
            start(writer, &name)?;
            for child in group.children() {
                write_node(writer, family, child)?;
            }
            end(writer, &name)
        }
    }
}

fn write_segment(writer: &mut XmlWriter, segment: &Segment) -> GenerationResult<()> {
    start(writer, segment.tag())?;
    for (index, field) in segment.fields().iter().enumerate() {
        let name = format!("{}.{}", segment.tag(), index + 1);
        for value in field.repetitions() {
            write_value(writer, &name, value)?;
        }
    }
    end(writer, segment.tag())
}

fn write_value(writer: &mut XmlWriter, name: &str, value: &FieldValue) -> GenerationResult<()> {
    if value.is_empty() {
        return Ok(());
    }
    match value {
        FieldValue::Empty => Ok(()),
        FieldValue::Scalar(scalar) => leaf(writer, name, scalar),
        FieldValue::Components(components) => {
            start(writer, name)?;
            for (index, component) in components.iter().enumerate() {
                write_component(writer, &format!("{name}.{}", index + 1), component)?;
            }
            end(writer, name)
        }
    }
}

fn write_component(
    writer: &mut XmlWriter,
    name: &str,
    component: &Component,
) -> GenerationResult<()> {
    if component.is_empty() {
        return Ok(());
    }
    match component {
        Component::Empty => Ok(()),
        Component::Scalar(scalar) => leaf(writer, name, scalar),
        Component::SubComponents(subs) => {
            start(writer, name)?;
            for (index, sub) in subs.iter().enumerate() {
                if let SubComponent(Some(scalar)) = sub {
                    if !scalar.is_empty() {
                        leaf(writer, &format!("{name}.{}", index + 1), scalar)?;
                    }
                }
            }
            end(writer, name)
        }
    }
}

/// XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn check_xml_chars(text: &str) -> GenerationResult<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(GenerationError::Encoding(format!(
            "character U+{:04X} is not allowed in XML",
            u32::from(c)
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, MessageBuilder};
    use crate::config::CoreConfig;
    use crate::model::{SegmentGroup, SendingFacility};
    use crate::provider::IrishValueProvider;
    use crate::registry::GrammarFamily;
    use chrono::NaiveDate;
    use quick_xml::Reader;

    fn facility() -> SendingFacility {
        SendingFacility {
            name: "ST JAMES'S HOSPITAL".into(),
            hipe_code: "908".into(),
            doh_code: "908".into(),
        }
    }

    fn patient() -> Segment {
        let mut pid = Segment::new("PID", 30);
        pid.push_value(1, FieldValue::Scalar(Scalar::Integer(1)))
            .expect("in range");
        pid.push_value(3, FieldValue::components(["M123456", "", "", "MRN"]))
            .expect("in range");
        pid.push_value(3, FieldValue::components(["IE123456789", "", "", "IHI"]))
            .expect("in range");
        pid.push_value(5, FieldValue::components(["O'Brien", "Aoife"]))
            .expect("in range");
        pid.push_value(6, FieldValue::components(["", ""]))
            .expect("in range");
        pid
    }

    fn siu(pid: Segment) -> Message {
        Message::new(
            8,
            GrammarFamily::SiuS12,
            Segment::new("MSH", 12),
            vec![
                BodyNode::Segment(Segment::new("SCH", 11)),
                BodyNode::Group(SegmentGroup::new("PATIENT", vec![BodyNode::Segment(pid)])),
            ],
            facility(),
        )
        .expect("valid message")
    }

    fn generated(type_id: u32) -> Message {
        let config = CoreConfig::default();
        let provider = IrishValueProvider::new();
        let options = BuildOptions {
            seed: Some(u64::from(type_id)),
            reference_time: NaiveDate::from_ymd_opt(2025, 3, 4)
                .and_then(|d| d.and_hms_opt(8, 30, 0)),
            ..BuildOptions::default()
        };
        MessageBuilder::new(&config, &provider)
            .build(type_id, &options)
            .expect("message builds")
    }

    /// Text-bearing elements as `(name, text)` pairs, in document order.
    fn leaves(xml: &str) -> Vec<(String, String)> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut stack: Vec<String> = Vec::new();
        let mut leaves = Vec::new();
        loop {
            match reader.read_event().expect("well-formed XML") {
                Event::Start(e) => {
                    stack.push(String::from_utf8(e.name().as_ref().to_vec()).expect("utf-8"));
                }
                Event::Text(t) => {
                    let name = stack.last().expect("text inside element").clone();
                    leaves.push((name, t.unescape().expect("valid escape").into_owned()));
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }
        leaves
    }

    #[test]
    fn compact_layout_omits_empty_values() {
        let xml = NestedEncoder::new().encode(&siu(patient())).expect("encodes");
        assert_eq!(
            xml,
            "<SIU_S12><MSH></MSH><SCH></SCH><SIU_S12.PATIENT><PID>\
             <PID.1>1</PID.1>\
             <PID.3><PID.3.1>M123456</PID.3.1><PID.3.4>MRN</PID.3.4></PID.3>\
             <PID.3><PID.3.1>IE123456789</PID.3.1><PID.3.4>IHI</PID.3.4></PID.3>\
             <PID.5><PID.5.1>O&apos;Brien</PID.5.1><PID.5.2>Aoife</PID.5.2></PID.5>\
             </PID></SIU_S12.PATIENT></SIU_S12>"
        );
    }

    #[test]
    fn pretty_output_carries_the_same_values() {
        let message = siu(patient());
        let compact = NestedEncoder::new().encode(&message).expect("encodes");
        let pretty = NestedEncoder::pretty().encode(&message).expect("encodes");
        assert!(pretty.contains("\n  <MSH"));
        assert!(!pretty.starts_with("<?xml"));
        assert_eq!(leaves(&compact), leaves(&pretty));
    }

    #[test]
    fn generated_messages_have_no_empty_field_elements() {
        for id in 1..=31 {
            let message = generated(id);
            let xml = NestedEncoder::new().encode(&message).expect("encodes");
            assert!(xml.starts_with(&format!("<{}>", message.family().tag())));

            let leaves = leaves(&xml);
            assert!(leaves.iter().all(|(_, text)| !text.is_empty()), "type {id}");

            let segments: Vec<&Segment> = std::iter::once(message.header())
                .chain(message.body_segments())
                .collect();
            let expected: usize = segments
                .iter()
                .flat_map(|s| s.fields())
                .flat_map(|f| f.repetitions())
                .map(|v| match v {
                    FieldValue::Empty => 0,
                    FieldValue::Scalar(s) => usize::from(!s.is_empty()),
                    FieldValue::Components(cs) => cs
                        .iter()
                        .map(|c| match c {
                            Component::Empty => 0,
                            Component::Scalar(s) => usize::from(!s.is_empty()),
                            Component::SubComponents(subs) => {
                                subs.iter().filter(|s| !s.is_empty()).count()
                            }
                        })
                        .sum(),
                })
                .sum();
            assert_eq!(leaves.len(), expected, "type {id}");
        }
    }

    #[test]
    fn leaf_values_match_the_tree() {
        let message = generated(10);
        let xml = NestedEncoder::new().encode(&message).expect("encodes");
        let leaves = leaves(&xml);
        let pid = message.segments_with_tag("PID")[0];
        let mrn = match pid.value(3).and_then(|v| v.component(1)) {
            Some(Component::Scalar(s)) => s.render(),
            other => panic!("expected MRN component, got {other:?}"),
        };
        assert!(leaves.contains(&("PID.3.1".to_string(), mrn)));
        assert!(leaves.contains(&("MSH.1".to_string(), "|".to_string())));
        assert!(leaves.contains(&("MSH.9.1".to_string(), "ORU".to_string())));
    }

    #[test]
    fn encoding_twice_is_identical() {
        let message = generated(3);
        let encoder = NestedEncoder::pretty();
        assert_eq!(
            encoder.encode(&message).expect("encodes"),
            encoder.encode(&message).expect("encodes")
        );
    }

    #[test]
    fn rejects_characters_outside_xml() {
        let mut pid = Segment::new("PID", 30);
        pid.push_value(5, FieldValue::text("bad\u{1}name"))
            .expect("in range");
        match NestedEncoder::new().encode(&siu(pid)) {
            Err(GenerationError::Encoding(msg)) => assert!(msg.contains("U+0001"), "{msg}"),
            other => panic!("expected Encoding error, got {other:?}"),
        }
    }
}
