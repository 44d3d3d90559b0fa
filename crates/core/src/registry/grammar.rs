//! Segment definitions and body templates for the nine grammar families.

use super::GrammarFamily;
use crate::provider::ValueKind as K;

/// Allowed number of occurrences of a template node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cardinality {
    pub min: u32,
    pub max: u32,
}

impl Cardinality {
    pub const ONE: Self = Self { min: 1, max: 1 };

    pub const fn range(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// Declared shape of a field slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    /// Composite with `width` component slots.
    Composite { width: usize },
}

/// One populated position of a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDefinition {
    pub position: usize,
    pub shape: FieldShape,
    pub kind: K,
    /// Kind of a second repetition, for fields like PID.3 that carry two identifiers.
    pub repeat: Option<K>,
    /// Whether the enhancement hook may rewrite this field's text.
    pub enhance: bool,
}

impl FieldDefinition {
    const fn scalar(position: usize, kind: K) -> Self {
        Self {
            position,
            shape: FieldShape::Scalar,
            kind,
            repeat: None,
            enhance: false,
        }
    }

    const fn composite(position: usize, width: usize, kind: K) -> Self {
        Self {
            position,
            shape: FieldShape::Composite { width },
            kind,
            repeat: None,
            enhance: false,
        }
    }

    const fn then(mut self, kind: K) -> Self {
        self.repeat = Some(kind);
        self
    }

    const fn enhanced(mut self) -> Self {
        self.enhance = true;
        self
    }

    /// Kinds to request, one per repetition.
    pub fn kinds(&self) -> impl Iterator<Item = K> {
        std::iter::once(self.kind).chain(self.repeat)
    }
}

/// A segment tag with its populated fields. Unlisted positions stay empty.
#[derive(Debug, PartialEq, Eq)]
pub struct SegmentDefinition {
    pub tag: &'static str,
    pub max_position: usize,
    pub fields: &'static [FieldDefinition],
}

#[derive(Debug, PartialEq, Eq)]
pub struct GroupDefinition {
    pub name: &'static str,
    pub cardinality: Cardinality,
    pub children: &'static [TemplateNode],
}

#[derive(Debug, PartialEq, Eq)]
pub enum TemplateNode {
    Segment {
        definition: &'static SegmentDefinition,
        cardinality: Cardinality,
    },
    Group(&'static GroupDefinition),
}

impl TemplateNode {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::Segment { cardinality, .. } => *cardinality,
            Self::Group(group) => group.cardinality,
        }
    }
}

const fn one(definition: &'static SegmentDefinition) -> TemplateNode {
    TemplateNode::Segment {
        definition,
        cardinality: Cardinality::ONE,
    }
}

const fn optional(definition: &'static SegmentDefinition) -> TemplateNode {
    TemplateNode::Segment {
        definition,
        cardinality: Cardinality::range(0, 1),
    }
}

type F = FieldDefinition;

// ============================================================================
// Segments
// ============================================================================

static PID: SegmentDefinition = SegmentDefinition {
    tag: "PID",
    max_position: 30,
    fields: &[
        F::scalar(1, K::SetId),
        F::composite(3, 5, K::MedicalRecordNumber).then(K::NationalHealthIdentifier),
        F::composite(5, 7, K::PersonName),
        F::scalar(7, K::DateOfBirth),
        F::scalar(8, K::AdministrativeSex),
        F::composite(11, 6, K::PostalAddress),
        F::composite(13, 3, K::HomePhone).then(K::MobilePhone),
        F::scalar(19, K::PersonalPublicServiceNumber),
        F::scalar(29, K::DeathDateTime),
        F::scalar(30, K::DeathIndicator),
    ],
};

static EVN_A01: SegmentDefinition = SegmentDefinition {
    tag: "EVN",
    max_position: 2,
    fields: &[
        F::scalar(1, K::Literal("A01")),
        F::scalar(2, K::ReferenceDateTime),
    ],
};

static EVN_A03: SegmentDefinition = SegmentDefinition {
    tag: "EVN",
    max_position: 2,
    fields: &[
        F::scalar(1, K::Literal("A03")),
        F::scalar(2, K::ReferenceDateTime),
    ],
};

static PV1_VISIT: SegmentDefinition = SegmentDefinition {
    tag: "PV1",
    max_position: 19,
    fields: &[
        F::scalar(1, K::SetId),
        F::scalar(2, K::PatientClass),
        F::composite(3, 4, K::AssignedLocation),
        F::composite(7, 3, K::AttendingPractitioner),
        F::scalar(19, K::VisitNumber),
    ],
};

static PV1_ADMIT: SegmentDefinition = SegmentDefinition {
    tag: "PV1",
    max_position: 44,
    fields: &[
        F::scalar(1, K::SetId),
        F::scalar(2, K::PatientClass),
        F::composite(3, 4, K::AssignedLocation),
        F::composite(7, 3, K::AttendingPractitioner),
        F::scalar(19, K::VisitNumber),
        F::scalar(44, K::AdmitDateTime),
    ],
};

static PV1_DISCHARGE: SegmentDefinition = SegmentDefinition {
    tag: "PV1",
    max_position: 45,
    fields: &[
        F::scalar(1, K::SetId),
        F::scalar(2, K::PatientClass),
        F::composite(3, 4, K::AssignedLocation),
        F::composite(7, 3, K::AttendingPractitioner),
        F::scalar(19, K::VisitNumber),
        F::scalar(44, K::AdmitDateTime),
        F::scalar(45, K::DischargeDateTime),
    ],
};

static ORC: SegmentDefinition = SegmentDefinition {
    tag: "ORC",
    max_position: 21,
    fields: &[
        F::scalar(1, K::Literal("NW")),
        F::composite(2, 2, K::PlacerOrderNumber),
        F::scalar(9, K::ReferenceDateTime),
        F::composite(12, 3, K::OrderingProvider),
        F::composite(21, 3, K::FacilityIdentifier),
    ],
};

static OBR: SegmentDefinition = SegmentDefinition {
    tag: "OBR",
    max_position: 16,
    fields: &[
        F::scalar(1, K::SetId),
        F::composite(2, 2, K::PlacerOrderNumber),
        F::composite(3, 2, K::FillerOrderNumber),
        F::composite(4, 6, K::ObservationCode),
        F::scalar(7, K::ReferenceDateTime),
        F::scalar(14, K::ReferenceDateTime),
        F::composite(15, 1, K::SpecimenSource),
        F::composite(16, 3, K::OrderingProvider),
    ],
};

static OBX: SegmentDefinition = SegmentDefinition {
    tag: "OBX",
    max_position: 11,
    fields: &[
        F::scalar(1, K::SetId),
        F::scalar(2, K::Literal("TX")),
        F::composite(3, 6, K::ObservationCode),
        F::scalar(5, K::ObservationValue).enhanced(),
        F::scalar(7, K::ReferenceRange),
        F::scalar(11, K::Literal("F")),
    ],
};

static NTE: SegmentDefinition = SegmentDefinition {
    tag: "NTE",
    max_position: 3,
    fields: &[
        F::scalar(1, K::SetId),
        F::scalar(2, K::Literal("L")),
        F::scalar(3, K::ClinicalNote).enhanced(),
    ],
};

static RF1: SegmentDefinition = SegmentDefinition {
    tag: "RF1",
    max_position: 7,
    fields: &[
        F::composite(1, 3, K::ReferralStatus),
        F::composite(2, 3, K::ReferralPriority),
        F::composite(3, 3, K::ReferralType),
        F::scalar(4, K::ReferralReason).enhanced(),
        F::composite(6, 2, K::ReferralIdentifier),
        F::scalar(7, K::ReferenceDate),
    ],
};

static PRD: SegmentDefinition = SegmentDefinition {
    tag: "PRD",
    max_position: 7,
    fields: &[
        F::composite(1, 3, K::ProviderRole),
        F::composite(2, 5, K::PractitionerName),
        F::composite(3, 6, K::PracticeAddress),
        F::composite(7, 2, K::PractitionerIdentifier),
    ],
};

static SCH: SegmentDefinition = SegmentDefinition {
    tag: "SCH",
    max_position: 11,
    fields: &[
        F::composite(1, 2, K::AppointmentId),
        F::composite(7, 3, K::AppointmentReason),
        F::composite(11, 4, K::AppointmentTiming),
    ],
};

static MSA: SegmentDefinition = SegmentDefinition {
    tag: "MSA",
    max_position: 3,
    fields: &[
        F::scalar(1, K::AcknowledgementCode),
        F::scalar(2, K::AcknowledgedControlId),
        F::scalar(3, K::AcknowledgementText),
    ],
};

static ERR: SegmentDefinition = SegmentDefinition {
    tag: "ERR",
    max_position: 4,
    fields: &[
        F::composite(3, 3, K::ErrorCondition),
        F::scalar(4, K::Literal("E")),
    ],
};

// ============================================================================
// Groups
// ============================================================================

static OML_ORDER: GroupDefinition = GroupDefinition {
    name: "ORDER",
    cardinality: Cardinality::range(1, 2),
    children: &[one(&ORC), one(&OBR), optional(&NTE)],
};

static REF_PROVIDER_CONTACT: GroupDefinition = GroupDefinition {
    name: "PROVIDER_CONTACT",
    cardinality: Cardinality::range(1, 2),
    children: &[one(&PRD)],
};

static ORU_PATIENT_VISIT: GroupDefinition = GroupDefinition {
    name: "PATIENT_VISIT",
    cardinality: Cardinality::ONE,
    children: &[one(&PV1_VISIT)],
};

static ORU_PATIENT: GroupDefinition = GroupDefinition {
    name: "PATIENT",
    cardinality: Cardinality::ONE,
    children: &[one(&PID), TemplateNode::Group(&ORU_PATIENT_VISIT)],
};

static ORU_OBSERVATION: GroupDefinition = GroupDefinition {
    name: "OBSERVATION",
    cardinality: Cardinality::range(1, 3),
    children: &[one(&OBX), one(&NTE)],
};

static ORU_ORDER_OBSERVATION: GroupDefinition = GroupDefinition {
    name: "ORDER_OBSERVATION",
    cardinality: Cardinality::ONE,
    children: &[one(&OBR), TemplateNode::Group(&ORU_OBSERVATION)],
};

static ORU_PATIENT_RESULT: GroupDefinition = GroupDefinition {
    name: "PATIENT_RESULT",
    cardinality: Cardinality::ONE,
    children: &[
        TemplateNode::Group(&ORU_PATIENT),
        TemplateNode::Group(&ORU_ORDER_OBSERVATION),
    ],
};

static PATIENT: GroupDefinition = GroupDefinition {
    name: "PATIENT",
    cardinality: Cardinality::ONE,
    children: &[one(&PID)],
};

// ============================================================================
// Templates
// ============================================================================

static OML_O21: [TemplateNode; 3] = [one(&PID), one(&PV1_VISIT), TemplateNode::Group(&OML_ORDER)];
static ADT_A01: [TemplateNode; 3] = [one(&EVN_A01), one(&PID), one(&PV1_ADMIT)];
static REF_I12: [TemplateNode; 4] = [
    one(&RF1),
    TemplateNode::Group(&REF_PROVIDER_CONTACT),
    one(&PID),
    one(&NTE),
];
static ADT_A03: [TemplateNode; 3] = [one(&EVN_A03), one(&PID), one(&PV1_DISCHARGE)];
static ORU_R01: [TemplateNode; 1] = [TemplateNode::Group(&ORU_PATIENT_RESULT)];
static SIU_S12: [TemplateNode; 2] = [one(&SCH), TemplateNode::Group(&PATIENT)];
static ORL_O22: [TemplateNode; 3] = [one(&MSA), one(&ERR), TemplateNode::Group(&PATIENT)];
static ACK: [TemplateNode; 1] = [one(&MSA)];
static RRI_I12: [TemplateNode; 3] = [one(&MSA), one(&RF1), one(&PID)];

pub(super) fn template(family: GrammarFamily) -> &'static [TemplateNode] {
    match family {
        GrammarFamily::OmlO21 => &OML_O21,
        GrammarFamily::AdtA01 => &ADT_A01,
        GrammarFamily::RefI12 => &REF_I12,
        GrammarFamily::AdtA03 => &ADT_A03,
        GrammarFamily::OruR01 => &ORU_R01,
        GrammarFamily::SiuS12 => &SIU_S12,
        GrammarFamily::OrlO22 => &ORL_O22,
        GrammarFamily::Ack => &ACK,
        GrammarFamily::RriI12 => &RRI_I12,
    }
}
