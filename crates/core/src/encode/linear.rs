//! Pipe-delimited HL7 v2 encoding (ER7).

use crate::constants::{
    COMPONENT_SEPARATOR, ENCODING_CHARACTERS, ESCAPE_CHARACTER, FIELD_SEPARATOR,
    REPETITION_SEPARATOR, SEGMENT_TERMINATOR, SUBCOMPONENT_SEPARATOR,
};
use crate::model::{Component, Field, FieldValue, Message, Scalar, Segment, SubComponent};
use crate::{GenerationError, GenerationResult};

/// Writes messages as `\r`-separated segments with `|^~\&` delimiters.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearEncoder;

impl LinearEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encodes `message`. Every field slot is written, so positions can be recovered by
    /// counting separators.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Encoding`] if a value contains a control character that
    /// has no escape sequence.
    pub fn encode(&self, message: &Message) -> GenerationResult<String> {
        let mut segments = Vec::with_capacity(message.body_segments().len() + 1);
        segments.push(self.header(message.header())?);
        for segment in message.body_segments() {
            segments.push(self.segment(segment)?);
        }
        Ok(segments.join(&SEGMENT_TERMINATOR.to_string()))
    }

    /// MSH.1 is the field separator itself and MSH.2 is written unescaped.
    fn header(&self, header: &Segment) -> GenerationResult<String> {
        let mut out = format!("{}{FIELD_SEPARATOR}{ENCODING_CHARACTERS}", header.tag());
        for field in header.fields().iter().skip(2) {
            out.push(FIELD_SEPARATOR);
            out.push_str(&self.field(field)?);
        }
        Ok(out)
    }

    fn segment(&self, segment: &Segment) -> GenerationResult<String> {
        let mut out = segment.tag().to_string();
        for field in segment.fields() {
            out.push(FIELD_SEPARATOR);
            out.push_str(&self.field(field)?);
        }
        Ok(out)
    }

    fn field(&self, field: &Field) -> GenerationResult<String> {
        let repetitions = field
            .repetitions()
            .iter()
            .map(|value| self.value(value))
            .collect::<GenerationResult<Vec<_>>>()?;
        Ok(repetitions.join(&REPETITION_SEPARATOR.to_string()))
    }

    fn value(&self, value: &FieldValue) -> GenerationResult<String> {
        match value {
            FieldValue::Empty => Ok(String::new()),
            FieldValue::Scalar(scalar) => scalar_text(scalar),
            FieldValue::Components(components) => {
                let parts = components
                    .iter()
                    .map(|c| self.component(c))
                    .collect::<GenerationResult<Vec<_>>>()?;
                Ok(parts.join(&COMPONENT_SEPARATOR.to_string()))
            }
        }
    }

    fn component(&self, component: &Component) -> GenerationResult<String> {
        match component {
            Component::Empty => Ok(String::new()),
            Component::Scalar(scalar) => scalar_text(scalar),
            Component::SubComponents(subs) => {
                let parts = subs
                    .iter()
                    .map(|SubComponent(scalar)| {
                        scalar.as_ref().map_or(Ok(String::new()), scalar_text)
                    })
                    .collect::<GenerationResult<Vec<_>>>()?;
                Ok(parts.join(&SUBCOMPONENT_SEPARATOR.to_string()))
            }
        }
    }

    /// Escapes delimiter characters and line breaks.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Encoding`] for any other control character.
    pub fn escape(text: &str) -> GenerationResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                ESCAPE_CHARACTER => out.push_str("\\E\\"),
                FIELD_SEPARATOR => out.push_str("\\F\\"),
                COMPONENT_SEPARATOR => out.push_str("\\S\\"),
                SUBCOMPONENT_SEPARATOR => out.push_str("\\T\\"),
                REPETITION_SEPARATOR => out.push_str("\\R\\"),
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push_str("\\.br\\");
                }
                '\n' => out.push_str("\\.br\\"),
                c if c.is_control() => {
                    return Err(GenerationError::Encoding(format!(
                        "control character U+{:04X} cannot be escaped",
                        u32::from(c)
                    )))
                }
                c => out.push(c),
            }
        }
        Ok(out)
    }

    /// Reverses [`LinearEncoder::escape`]. Unknown escape sequences are kept verbatim.
    pub fn unescape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(ESCAPE_CHARACTER) {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find(ESCAPE_CHARACTER) else {
                out.push_str(&rest[start..]);
                return out;
            };
            match &after[..end] {
                "E" => out.push(ESCAPE_CHARACTER),
                "F" => out.push(FIELD_SEPARATOR),
                "S" => out.push(COMPONENT_SEPARATOR),
                "T" => out.push(SUBCOMPONENT_SEPARATOR),
                "R" => out.push(REPETITION_SEPARATOR),
                ".br" => out.push('\n'),
                other => {
                    out.push(ESCAPE_CHARACTER);
                    out.push_str(other);
                    out.push(ESCAPE_CHARACTER);
                }
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

fn scalar_text(scalar: &Scalar) -> GenerationResult<String> {
    match scalar {
        Scalar::Text(text) => LinearEncoder::escape(text),
        other => Ok(other.render()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, MessageBuilder};
    use crate::config::CoreConfig;
    use crate::model::{BodyNode, SendingFacility};
    use crate::provider::{DemographicConstraints, IrishValueProvider, Sex};
    use crate::registry::GrammarFamily;
    use chrono::NaiveDate;

    fn options(seed: u64) -> BuildOptions {
        BuildOptions {
            seed: Some(seed),
            reference_time: NaiveDate::from_ymd_opt(2025, 1, 20)
                .and_then(|d| d.and_hms_opt(16, 45, 12)),
            ..BuildOptions::default()
        }
    }

    fn build(type_id: u32, opts: &BuildOptions) -> Message {
        let config = CoreConfig::default();
        let provider = IrishValueProvider::new();
        MessageBuilder::new(&config, &provider)
            .build(type_id, opts)
            .expect("message builds")
    }

    /// Text tree of a value as the linear encoding would carry it, unescaped.
    fn expected_tree(value: &FieldValue) -> Vec<Vec<String>> {
        match value {
            FieldValue::Empty => vec![vec![String::new()]],
            FieldValue::Scalar(s) => vec![vec![s.render()]],
            FieldValue::Components(components) => components
                .iter()
                .map(|c| match c {
                    Component::Empty => vec![String::new()],
                    Component::Scalar(s) => vec![s.render()],
                    Component::SubComponents(subs) => subs
                        .iter()
                        .map(|SubComponent(s)| s.as_ref().map(Scalar::render).unwrap_or_default())
                        .collect(),
                })
                .collect(),
        }
    }

    fn parsed_tree(token: &str) -> Vec<Vec<String>> {
        token
            .split(COMPONENT_SEPARATOR)
            .map(|c| c.split(SUBCOMPONENT_SEPARATOR).map(LinearEncoder::unescape).collect())
            .collect()
    }

    #[test]
    fn escapes_delimiters_and_line_breaks() {
        assert_eq!(
            LinearEncoder::escape("a|b^c&d~e\\f").expect("escapable"),
            "a\\F\\b\\S\\c\\T\\d\\R\\e\\E\\f"
        );
        assert_eq!(
            LinearEncoder::escape("one\r\ntwo\nthree\rfour").expect("escapable"),
            "one\\.br\\two\\.br\\three\\.br\\four"
        );
    }

    #[test]
    fn rejects_unescapable_control_characters() {
        match LinearEncoder::escape("tab\there") {
            Err(GenerationError::Encoding(msg)) => assert!(msg.contains("U+0009"), "{msg}"),
            other => panic!("expected Encoding error, got {other:?}"),
        }
    }

    #[test]
    fn unescape_reverses_escape() {
        let original = "COOMBE WOMENS & INFANTS | x10^9/L ~ C:\\path\nnext";
        let escaped = LinearEncoder::escape(original).expect("escapable");
        assert_eq!(LinearEncoder::unescape(&escaped), original);
        assert_eq!(LinearEncoder::unescape("\\H\\bold\\N\\"), "\\H\\bold\\N\\");
        assert_eq!(LinearEncoder::unescape("dangling\\E"), "dangling\\E");
    }

    #[test]
    fn every_segment_has_declared_field_count() {
        for id in 1..=31 {
            let message = build(id, &options(u64::from(id) * 7));
            let encoded = LinearEncoder::new().encode(&message).expect("encodes");
            assert!(!encoded.ends_with(SEGMENT_TERMINATOR));

            let lines: Vec<&str> = encoded.split(SEGMENT_TERMINATOR).collect();
            let segments: Vec<&Segment> = std::iter::once(message.header())
                .chain(message.body_segments())
                .collect();
            assert_eq!(lines.len(), segments.len(), "type {id}");

            for (line, segment) in lines.iter().zip(&segments) {
                let tokens: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
                assert_eq!(tokens[0], segment.tag());
                let expected = if segment.tag() == "MSH" {
                    segment.max_position()
                } else {
                    segment.max_position() + 1
                };
                assert_eq!(tokens.len(), expected, "type {id} segment {line}");
            }
        }
    }

    #[test]
    fn reparsing_recovers_non_empty_values() {
        for id in [1, 3, 6, 8, 10, 11, 15] {
            let message = build(id, &options(99));
            let encoded = LinearEncoder::new().encode(&message).expect("encodes");
            let lines = encoded.split(SEGMENT_TERMINATOR).skip(1);
            for (line, segment) in lines.zip(message.body_segments()) {
                let tokens: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
                assert_eq!(tokens[0], segment.tag());
                for (index, field) in segment.fields().iter().enumerate() {
                    if field.is_empty() {
                        continue;
                    }
                    let reps: Vec<&str> = tokens[index + 1].split(REPETITION_SEPARATOR).collect();
                    assert_eq!(reps.len(), field.repetitions().len());
                    for (token, value) in reps.iter().zip(field.repetitions()) {
                        assert_eq!(
                            parsed_tree(token),
                            expected_tree(value),
                            "{}.{}",
                            segment.tag(),
                            index + 1
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn lab_result_for_49_year_old_male() {
        let opts = BuildOptions {
            demographics: DemographicConstraints {
                sex: Some(Sex::Male),
                age: Some(49),
            },
            ..options(2024)
        };
        let encoded = LinearEncoder::new()
            .encode(&build(10, &opts))
            .expect("encodes");
        assert!(encoded.starts_with("MSH|^~\\&|HL7SYNTGEN10|"));

        let msh: Vec<&str> = encoded
            .split(SEGMENT_TERMINATOR)
            .next()
            .expect("MSH line")
            .split(FIELD_SEPARATOR)
            .collect();
        // tokens[0] is the tag and tokens[1] is MSH.2, so MSH.n sits at n - 1.
        let message_type: Vec<&str> = msh[8].split(COMPONENT_SEPARATOR).collect();
        assert_eq!(message_type, vec!["ORU", "R01"]);

        let pids: Vec<&str> = encoded
            .split(SEGMENT_TERMINATOR)
            .filter(|l| l.starts_with("PID|"))
            .collect();
        assert_eq!(pids.len(), 1);
        let name = pids[0].split(FIELD_SEPARATOR).nth(5).expect("PID.5");
        assert!(!name.replace(COMPONENT_SEPARATOR, "").is_empty());
        assert_eq!(pids[0].split(FIELD_SEPARATOR).nth(8), Some("M"));
    }

    #[test]
    fn same_seed_gives_identical_text() {
        let a = LinearEncoder::new().encode(&build(17, &options(5))).expect("encodes");
        let b = LinearEncoder::new().encode(&build(17, &options(5))).expect("encodes");
        assert_eq!(a, b);
    }

    #[test]
    fn ack_message_type_is_scalar() {
        let message = Message::new(
            13,
            GrammarFamily::Ack,
            Segment::new("MSH", 12),
            vec![BodyNode::Segment(Segment::new("MSA", 3))],
            SendingFacility {
                name: "AMNCH".into(),
                hipe_code: "1049".into(),
                doh_code: "1049".into(),
            },
        )
        .expect("valid message");
        let encoded = LinearEncoder::new().encode(&message).expect("encodes");
        assert_eq!(encoded, "MSH|^~\\&||||||||||\rMSA|||");
    }
}
