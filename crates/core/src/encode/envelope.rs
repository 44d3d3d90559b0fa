//! Metadata-wrapped JSON record.

use super::NestedEncoder;
use crate::model::{Message, SendingFacility};
use crate::registry::MessageTypeDefinition;
use crate::{GenerationError, GenerationResult};
use serde::{Deserialize, Serialize};

/// The structured output record. Its key set is a compatibility contract for consumers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub message_type_id: u32,
    pub message_type_label: String,
    pub hl7_grammar_family: String,
    pub nested_xml_message: String,
    pub enriched_nested_xml_message: String,
    pub hospital_info: String,
}

impl StructuredRecord {
    /// Serialises the record as a JSON object.
    pub fn to_json(&self) -> GenerationResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GenerationError::Encoding(format!("structured record: {e}")))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EnvelopeEncoder;

impl EnvelopeEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Wraps both nested renderings of `message` with its type metadata.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Grammar`] if `definition` is not the message's own type, or
    /// any error raised by the nested encoder.
    pub fn encode(
        &self,
        message: &Message,
        definition: &MessageTypeDefinition,
    ) -> GenerationResult<StructuredRecord> {
        if message.type_id() != definition.id {
            return Err(GenerationError::Grammar(format!(
                "message type {} wrapped with the definition of type {}",
                message.type_id(),
                definition.id
            )));
        }

        Ok(StructuredRecord {
            message_type_id: definition.id,
            message_type_label: definition.label.to_string(),
            hl7_grammar_family: definition.family.tag().to_string(),
            nested_xml_message: NestedEncoder::new().encode(message)?,
            enriched_nested_xml_message: NestedEncoder::pretty().encode(message)?,
            hospital_info: hospital_info(message.facility()),
        })
    }
}

fn hospital_info(facility: &SendingFacility) -> String {
    format!(
        "Sent by {} (HIPE code {}, Department of Health code {})",
        facility.name, facility.hipe_code, facility.doh_code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, MessageBuilder};
    use crate::config::CoreConfig;
    use crate::provider::IrishValueProvider;
    use crate::registry;

    fn build(type_id: u32) -> Message {
        let config = CoreConfig::default();
        let provider = IrishValueProvider::new();
        MessageBuilder::new(&config, &provider)
            .build(
                type_id,
                &BuildOptions {
                    seed: Some(13),
                    ..BuildOptions::default()
                },
            )
            .expect("message builds")
    }

    #[test]
    fn acknowledgement_record() {
        let message = build(13);
        let definition = registry::lookup(13).expect("known type");
        let record = EnvelopeEncoder::new()
            .encode(&message, definition)
            .expect("encodes");
        assert_eq!(record.message_type_id, 13);
        assert_eq!(record.message_type_label, "Acknowledgement");
        assert_eq!(record.hl7_grammar_family, "ACK");
        assert!(record.nested_xml_message.starts_with("<ACK><MSH>"));
        assert!(record.enriched_nested_xml_message.contains('\n'));
        assert!(record.hospital_info.contains(&message.facility().name));
    }

    #[test]
    fn json_has_exactly_the_contract_keys() {
        let message = build(7);
        let definition = registry::lookup(7).expect("known type");
        let json = EnvelopeEncoder::new()
            .encode(&message, definition)
            .expect("encodes")
            .to_json()
            .expect("serialises");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        let mut keys: Vec<&str> = value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "enriched_nested_xml_message",
                "hl7_grammar_family",
                "hospital_info",
                "message_type_id",
                "message_type_label",
                "nested_xml_message",
            ]
        );
        assert_eq!(value["hl7_grammar_family"], "ORU_R01");
    }

    #[test]
    fn rejects_foreign_definition() {
        let message = build(13);
        let err = EnvelopeEncoder::new()
            .encode(&message, registry::lookup(10).expect("known type"))
            .expect_err("definition mismatch");
        assert!(matches!(err, GenerationError::Grammar(_)));
    }
}
