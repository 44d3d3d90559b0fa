//! Value provision.
//!
//! The builder asks a [`ValueProvider`] for one [`ClinicalContext`] per message and then one
//! value per declared field. Providers are stateless; every random draw comes from the
//! per-request RNG the builder passes in, so a seed fixes the whole message.

mod irish;
mod lab;

pub use irish::IrishValueProvider;

use crate::model::{FieldValue, SendingFacility};
use crate::registry::{ContentProfile, MessageTypeDefinition};
use crate::{GenerationError, GenerationResult};
use chrono::{NaiveDate, NaiveDateTime};
use rand::RngCore;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Oldest patient age accepted as a demographic constraint.
pub const MAX_PATIENT_AGE: u8 = 110;

/// Every kind of value a grammar can ask for.
///
/// The set is closed: providers match on it exhaustively, so adding a kind is a compile
/// error in every provider until it is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Fixed text taken from the grammar, e.g. an order control code.
    Literal(&'static str),
    /// Occurrence number of the segment within the message.
    SetId,
    ReferenceDateTime,
    ReferenceDate,

    // Patient
    MedicalRecordNumber,
    NationalHealthIdentifier,
    PersonalPublicServiceNumber,
    PersonName,
    DateOfBirth,
    AdministrativeSex,
    PostalAddress,
    HomePhone,
    MobilePhone,
    DeathDateTime,
    DeathIndicator,

    // Visit
    PatientClass,
    AssignedLocation,
    AttendingPractitioner,
    VisitNumber,
    AdmitDateTime,
    DischargeDateTime,

    // Orders and observations
    PlacerOrderNumber,
    FillerOrderNumber,
    FacilityIdentifier,
    OrderingProvider,
    ObservationCode,
    SpecimenSource,
    ObservationValue,
    ReferenceRange,
    ClinicalNote,

    // Referrals
    ReferralStatus,
    ReferralPriority,
    ReferralType,
    ReferralReason,
    ReferralIdentifier,
    ProviderRole,
    PractitionerName,
    PracticeAddress,
    PractitionerIdentifier,

    // Acknowledgements
    AcknowledgementCode,
    AcknowledgedControlId,
    AcknowledgementText,
    ErrorCondition,

    // Scheduling
    AppointmentId,
    AppointmentReason,
    AppointmentTiming,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// HL7 table 0001 code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Sex {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(Self::Male),
            "f" | "female" => Ok(Self::Female),
            other => Err(GenerationError::InvalidInput(format!(
                "sex must be M or F, got '{other}'"
            ))),
        }
    }
}

/// Caller-supplied demographic constraints. Unset values are drawn by the provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DemographicConstraints {
    pub sex: Option<Sex>,
    pub age: Option<u8>,
}

impl DemographicConstraints {
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidInput`] if the age exceeds [`MAX_PATIENT_AGE`].
    pub fn validate(&self) -> GenerationResult<()> {
        match self.age {
            Some(age) if age > MAX_PATIENT_AGE => Err(GenerationError::InvalidInput(format!(
                "age must be between 0 and {MAX_PATIENT_AGE}, got {age}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Resolved demographics. `age` holds at the message reference time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Demographics {
    pub sex: Sex,
    pub age: u8,
    pub date_of_birth: NaiveDate,
}

/// Lab test, imaging examination or cardiac investigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Investigation {
    pub code: &'static str,
    pub name: &'static str,
    pub loinc: &'static str,
    pub specimen: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Specialty {
    pub code: &'static str,
    pub display: &'static str,
}

/// A chronic condition coded in ICD-10.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Condition {
    pub icd10: &'static str,
    pub name: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Practitioner {
    pub family: String,
    pub given: String,
    /// Medical Council Number.
    pub registration: String,
}

/// A general practice with its GMS code and Eircode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Practice {
    pub name: &'static str,
    pub gms_code: &'static str,
    pub street: &'static str,
    pub town: &'static str,
    pub county: &'static str,
    pub eircode: &'static str,
}

/// Input for [`ValueProvider::context`].
#[derive(Clone, Copy, Debug)]
pub struct ContextRequest<'a> {
    pub definition: &'a MessageTypeDefinition,
    pub demographics: DemographicConstraints,
    pub reference_time: NaiveDateTime,
}

/// Per-message facts shared by every field, so that PID, PV1 and OBX describe the same
/// patient, facility and investigation.
#[derive(Clone, Debug, PartialEq)]
pub struct ClinicalContext {
    pub type_id: u32,
    pub profile: ContentProfile,
    pub reference_time: NaiveDateTime,
    pub demographics: Demographics,
    pub facility: SendingFacility,
    pub specialty: Specialty,
    pub investigation: Investigation,
    pub condition: Option<Condition>,
    pub consultant: Practitioner,
    pub general_practitioner: Practitioner,
    pub practice: Practice,
    /// Base for placer order numbers; the order occurrence is added.
    pub order_number: u64,
}

/// Per-field input for [`ValueProvider::provide`].
#[derive(Clone, Copy, Debug)]
pub struct Constraints<'a> {
    pub context: &'a ClinicalContext,
    /// 1-based count of segments with this tag emitted so far, including the current one.
    pub occurrence: u32,
}

/// Source of realistic field values.
pub trait ValueProvider: Send + Sync {
    /// Resolves the facts shared by every field of one message.
    fn context(&self, request: &ContextRequest<'_>, rng: &mut dyn RngCore) -> ClinicalContext;

    /// Produces the value for one field repetition.
    ///
    /// The value must fit the field's declared shape; the builder rejects anything else.
    fn provide(
        &self,
        kind: ValueKind,
        constraints: &Constraints<'_>,
        rng: &mut dyn RngCore,
    ) -> FieldValue;
}
