//! Message type registry.
//!
//! Maps the 31 HealthLink message type ids onto nine HL7 v2 grammar families. The table is
//! plain static data; adding a type means adding a row.

mod grammar;

pub use grammar::{
    Cardinality, FieldDefinition, FieldShape, GroupDefinition, SegmentDefinition, TemplateNode,
};

use crate::constants::{MAX_MESSAGE_TYPE_ID, MIN_MESSAGE_TYPE_ID};
use crate::{GenerationError, GenerationResult};
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// One of the nine HL7 v2 abstract message structures used by HealthLink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GrammarFamily {
    #[serde(rename = "OML_O21")]
    OmlO21,
    #[serde(rename = "ADT_A01")]
    AdtA01,
    #[serde(rename = "REF_I12")]
    RefI12,
    #[serde(rename = "ADT_A03")]
    AdtA03,
    #[serde(rename = "ORU_R01")]
    OruR01,
    #[serde(rename = "SIU_S12")]
    SiuS12,
    #[serde(rename = "ORL_O22")]
    OrlO22,
    #[serde(rename = "ACK")]
    Ack,
    #[serde(rename = "RRI_I12")]
    RriI12,
}

impl GrammarFamily {
    pub const ALL: [GrammarFamily; 9] = [
        Self::OmlO21,
        Self::AdtA01,
        Self::RefI12,
        Self::AdtA03,
        Self::OruR01,
        Self::SiuS12,
        Self::OrlO22,
        Self::Ack,
        Self::RriI12,
    ];

    /// Structure name, also used as the nested encoding's root element.
    pub fn tag(self) -> &'static str {
        match self {
            Self::OmlO21 => "OML_O21",
            Self::AdtA01 => "ADT_A01",
            Self::RefI12 => "REF_I12",
            Self::AdtA03 => "ADT_A03",
            Self::OruR01 => "ORU_R01",
            Self::SiuS12 => "SIU_S12",
            Self::OrlO22 => "ORL_O22",
            Self::Ack => "ACK",
            Self::RriI12 => "RRI_I12",
        }
    }

    /// MSH.9 message code and trigger event. `ACK` has no trigger.
    pub fn message_code(self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Ack => ("ACK", None),
            other => {
                let (code, trigger) = other.tag().split_at(3);
                (code, Some(&trigger[1..]))
            }
        }
    }

    /// Ordered body template, header excluded.
    pub fn template(self) -> &'static [TemplateNode] {
        grammar::template(self)
    }
}

impl fmt::Display for GrammarFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What kind of clinical content a message type carries.
///
/// Two types sharing a grammar family can still differ here, e.g. a radiology result and a
/// laboratory result are both `ORU_R01`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ContentProfile {
    Laboratory,
    Admission,
    Emergency,
    Referral,
    DischargeSummary,
    Death,
    Radiology,
    Appointment,
    WaitingList,
    Rejection,
    Discharge,
    Acknowledgement,
    ReferralResponse,
    Cardiology,
}

/// Static description of one message type id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTypeDefinition {
    pub id: u32,
    pub family: GrammarFamily,
    pub label: &'static str,
    pub profile: ContentProfile,
    /// Specialty code fixed by the label, e.g. a neurology referral.
    pub specialty: Option<&'static str>,
}

impl MessageTypeDefinition {
    pub fn template(&self) -> &'static [TemplateNode] {
        self.family.template()
    }
}

const fn entry(
    id: u32,
    family: GrammarFamily,
    label: &'static str,
    profile: ContentProfile,
    specialty: Option<&'static str>,
) -> MessageTypeDefinition {
    MessageTypeDefinition {
        id,
        family,
        label,
        profile,
        specialty,
    }
}

use ContentProfile as P;
use GrammarFamily as G;

#[rustfmt::skip]
static DEFINITIONS: [MessageTypeDefinition; 31] = [
    entry(1, G::OmlO21, "Laboratory Order", P::Laboratory, None),
    entry(2, G::AdtA01, "Inpatient Admission", P::Admission, None),
    entry(3, G::RefI12, "Outpatient Clinic Letter", P::Referral, None),
    entry(4, G::AdtA01, "A&E Notification", P::Emergency, None),
    entry(5, G::RefI12, "Discharge Summary", P::DischargeSummary, None),
    entry(6, G::AdtA03, "Death Notification", P::Death, None),
    entry(7, G::OruR01, "Radiology Result", P::Radiology, Some("RADIOLOGY")),
    entry(8, G::SiuS12, "OPD Appointment", P::Appointment, None),
    entry(9, G::SiuS12, "Waiting List", P::WaitingList, None),
    entry(10, G::OruR01, "Laboratory Result", P::Laboratory, Some("PATHOLOGY")),
    entry(11, G::OrlO22, "Laboratory NACK", P::Rejection, Some("PATHOLOGY")),
    entry(12, G::AdtA03, "Discharge Notification", P::Discharge, None),
    entry(13, G::Ack, "Acknowledgement", P::Acknowledgement, None),
    entry(14, G::RefI12, "Neurology Referral", P::Referral, Some("NEUROLOGY")),
    entry(15, G::RriI12, "Neurology Referral Response", P::ReferralResponse, Some("NEUROLOGY")),
    entry(16, G::RefI12, "Co-op Discharge", P::DischargeSummary, None),
    entry(17, G::OruR01, "Cardiology Result", P::Cardiology, Some("CARDIOLOGY")),
    entry(18, G::RefI12, "Oesophageal and Gastric Cancer Referral", P::Referral, Some("GASTROENTEROLOGY")),
    entry(19, G::RefI12, "A&E Letter", P::Referral, None),
    entry(20, G::RefI12, "Prostate Cancer Referral", P::Referral, Some("UROLOGY")),
    entry(21, G::RriI12, "Prostate Cancer Referral Response", P::ReferralResponse, Some("UROLOGY")),
    entry(22, G::RefI12, "Breast Cancer Referral", P::Referral, Some("ONCOLOGY")),
    entry(23, G::RriI12, "Breast Cancer Referral Response", P::ReferralResponse, Some("ONCOLOGY")),
    entry(24, G::RefI12, "Lung Cancer Referral", P::Referral, Some("ONCOLOGY")),
    entry(25, G::RriI12, "Lung Cancer Referral Response", P::ReferralResponse, Some("ONCOLOGY")),
    entry(26, G::RefI12, "Chest Pain Referral", P::Referral, Some("CARDIOLOGY")),
    entry(27, G::RriI12, "Chest Pain Referral Response", P::ReferralResponse, Some("CARDIOLOGY")),
    entry(28, G::RefI12, "MRI Request", P::Referral, Some("RADIOLOGY")),
    entry(29, G::RriI12, "MRI Request Response", P::ReferralResponse, Some("RADIOLOGY")),
    entry(30, G::RefI12, "General Referral", P::Referral, None),
    entry(31, G::RriI12, "General Referral Response", P::ReferralResponse, None),
];

/// Resolves a message type id.
///
/// # Errors
///
/// Returns [`GenerationError::UnknownType`] if `id` is outside 1..=31.
pub fn lookup(id: u32) -> GenerationResult<&'static MessageTypeDefinition> {
    if !(MIN_MESSAGE_TYPE_ID..=MAX_MESSAGE_TYPE_ID).contains(&id) {
        return Err(GenerationError::UnknownType(id));
    }
    DEFINITIONS
        .iter()
        .find(|d| d.id == id)
        .ok_or(GenerationError::UnknownType(id))
}

/// Draws a type id uniformly from the registry.
pub fn random_type_id<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(MIN_MESSAGE_TYPE_ID..=MAX_MESSAGE_TYPE_ID)
}

/// All definitions in id order.
pub fn definitions() -> &'static [MessageTypeDefinition] {
    &DEFINITIONS
}

/// Number of distinct segment definitions in a template, groups flattened.
pub fn segment_definition_count(template: &[TemplateNode]) -> usize {
    template
        .iter()
        .map(|node| match node {
            TemplateNode::Segment { .. } => 1,
            TemplateNode::Group(group) => segment_definition_count(group.children),
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn expected_count(family: GrammarFamily) -> usize {
        match family {
            GrammarFamily::OmlO21 => 5,
            GrammarFamily::AdtA01 => 3,
            GrammarFamily::RefI12 => 4,
            GrammarFamily::AdtA03 => 3,
            GrammarFamily::OruR01 => 5,
            GrammarFamily::SiuS12 => 2,
            GrammarFamily::OrlO22 => 3,
            GrammarFamily::Ack => 1,
            GrammarFamily::RriI12 => 3,
        }
    }

    #[test]
    fn every_id_resolves_with_expected_segment_count() {
        for id in 1..=31 {
            let def = lookup(id).expect("id in range should resolve");
            assert_eq!(def.id, id);
            assert_eq!(
                segment_definition_count(def.template()),
                expected_count(def.family),
                "segment count for type {id} ({})",
                def.family
            );
        }
    }

    #[test]
    fn ids_outside_range_are_unknown() {
        for id in [0, 32, 1000] {
            match lookup(id) {
                Err(GenerationError::UnknownType(got)) => assert_eq!(got, id),
                other => panic!("expected UnknownType for {id}, got {other:?}"),
            }
        }
    }

    #[test]
    fn table_is_in_id_order_without_gaps() {
        let ids: Vec<u32> = definitions().iter().map(|d| d.id).collect();
        assert_eq!(ids, (1..=31).collect::<Vec<_>>());
    }

    #[test]
    fn known_labels_and_families() {
        let ack = lookup(13).expect("ack");
        assert_eq!(ack.label, "Acknowledgement");
        assert_eq!(ack.family, GrammarFamily::Ack);

        let lab = lookup(10).expect("lab result");
        assert_eq!(lab.family.tag(), "ORU_R01");
        assert_eq!(lab.profile, ContentProfile::Laboratory);

        assert_eq!(lookup(15).expect("rri").family, GrammarFamily::RriI12);
        assert_eq!(lookup(14).expect("neuro").specialty, Some("NEUROLOGY"));
    }

    #[test]
    fn message_codes_split_family_tags() {
        assert_eq!(GrammarFamily::OruR01.message_code(), ("ORU", Some("R01")));
        assert_eq!(GrammarFamily::RriI12.message_code(), ("RRI", Some("I12")));
        assert_eq!(GrammarFamily::Ack.message_code(), ("ACK", None));
    }

    #[test]
    fn random_type_ids_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let id = random_type_id(&mut rng);
            assert!(lookup(id).is_ok(), "{id} should resolve");
        }
    }

    #[test]
    fn every_family_has_a_template() {
        for family in GrammarFamily::ALL {
            assert!(!family.template().is_empty(), "{family} template is empty");
        }
    }
}
