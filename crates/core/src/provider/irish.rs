//! Irish healthcare value provider.
//!
//! Draws names, addresses, identifiers and clinical content from tables that mirror what
//! HealthLink traffic from Irish hospitals and GP practices looks like.

use super::lab;
use super::{
    ClinicalContext, Condition, Constraints, ContextRequest, Demographics, Investigation,
    Practice, Practitioner, Sex, Specialty, ValueKind, ValueProvider,
};
use crate::model::{Component, FieldValue, Scalar, SendingFacility, SubComponent};
use crate::registry::ContentProfile;
use chrono::{Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use rand::{Rng, RngCore};

// ============================================================================
// Reference tables
// ============================================================================

struct Hospital {
    name: &'static str,
    hipe: &'static str,
    doh: &'static str,
    county: &'static str,
}

const fn hospital(
    name: &'static str,
    hipe: &'static str,
    county: &'static str,
) -> Hospital {
    Hospital {
        name,
        hipe,
        doh: hipe,
        county,
    }
}

static HOSPITALS: &[Hospital] = &[
    hospital("ST. VINCENT'S UNIVERSITY HOSPITAL", "907", "Dublin"),
    hospital("MATER MISERICORDIAE UNIVERSITY HOSPITAL", "908", "Dublin"),
    hospital("BEAUMONT HOSPITAL", "909", "Dublin"),
    hospital("ST. JAMES'S HOSPITAL", "910", "Dublin"),
    hospital("TALLAGHT UNIVERSITY HOSPITAL", "911", "Dublin"),
    hospital("CONNOLLY HOSPITAL", "912", "Dublin"),
    hospital("CORK UNIVERSITY HOSPITAL", "913", "Cork"),
    hospital("MERCY UNIVERSITY HOSPITAL", "914", "Cork"),
    hospital("UNIVERSITY HOSPITAL GALWAY", "915", "Galway"),
    hospital("UNIVERSITY HOSPITAL LIMERICK", "916", "Limerick"),
    hospital("UNIVERSITY HOSPITAL WATERFORD", "917", "Waterford"),
    hospital("MAYO UNIVERSITY HOSPITAL", "918", "Mayo"),
    hospital("LETTERKENNY UNIVERSITY HOSPITAL", "919", "Donegal"),
    hospital("SLIGO UNIVERSITY HOSPITAL", "920", "Sligo"),
    hospital("NAAS GENERAL HOSPITAL", "921", "Kildare"),
    hospital("OUR LADY OF LOURDES HOSPITAL", "925", "Louth"),
    hospital("ROTUNDA HOSPITAL", "932", "Dublin"),
    hospital("COOMBE WOMENS & INFANTS UNIVERSITY HOSPITAL", "933", "Dublin"),
    hospital("AMNCH", "1049", "Dublin"),
];

static SPECIALTIES: &[Specialty] = &[
    Specialty { code: "CARDIOLOGY", display: "Cardiology" },
    Specialty { code: "NEUROLOGY", display: "Neurology" },
    Specialty { code: "ONCOLOGY", display: "Oncology" },
    Specialty { code: "GENERAL_SURGERY", display: "General Surgery" },
    Specialty { code: "ORTHOPAEDICS", display: "Orthopaedics" },
    Specialty { code: "GASTROENTEROLOGY", display: "Gastroenterology" },
    Specialty { code: "RESPIRATORY", display: "Respiratory Medicine" },
    Specialty { code: "ENDOCRINOLOGY", display: "Endocrinology" },
    Specialty { code: "RADIOLOGY", display: "Radiology" },
    Specialty { code: "PATHOLOGY", display: "Pathology" },
    Specialty { code: "DERMATOLOGY", display: "Dermatology" },
    Specialty { code: "OPHTHALMOLOGY", display: "Ophthalmology" },
    Specialty { code: "ENT", display: "Ear, Nose and Throat" },
    Specialty { code: "UROLOGY", display: "Urology" },
    Specialty { code: "GYNAECOLOGY", display: "Gynaecology" },
];

const fn investigation(
    code: &'static str,
    name: &'static str,
    loinc: &'static str,
    specimen: &'static str,
) -> Investigation {
    Investigation {
        code,
        name,
        loinc,
        specimen,
    }
}

static LAB_TESTS: &[Investigation] = &[
    investigation("FBC", "Full Blood Count", "57782-5", "BLD"),
    investigation("U&E", "Urea and Electrolytes", "24362-6", "SER"),
    investigation("LFT", "Liver Function Tests", "24325-3", "SER"),
    investigation("TFT", "Thyroid Function Tests", "24323-8", "SER"),
    investigation("LIPIDS", "Lipid Profile", "57698-3", "SER"),
    investigation("HBA1C", "Haemoglobin A1c", "4548-4", "BLD"),
    investigation("INR", "International Normalised Ratio", "6301-6", "PLAS"),
    investigation("CRP", "C-Reactive Protein", "1988-5", "SER"),
    investigation("ESR", "Erythrocyte Sedimentation Rate", "30341-2", "BLD"),
    investigation("TROPONIN", "Troponin I", "10839-9", "SER"),
    investigation("MHH", "Hepatitis/HIV screen", "", "SER"),
    investigation("GLUCOSE", "Glucose Random", "2345-7", "PLAS"),
    investigation("TSH", "Thyroid Stimulating Hormone", "3016-3", "SER"),
    investigation("PSA", "Prostate Specific Antigen", "2857-1", "SER"),
    investigation("URINALYSIS", "Urinalysis Complete", "24357-6", "UR"),
];

static IMAGING_EXAMS: &[Investigation] = &[
    investigation("CXR", "Chest X-ray", "36643-5", ""),
    investigation("CTHEAD", "CT Head without contrast", "30799-1", ""),
    investigation("MRBRAIN", "MRI Brain", "24590-2", ""),
    investigation("USABDO", "Ultrasound Abdomen", "24558-9", ""),
    investigation("MAMMO", "Mammogram bilateral", "24606-6", ""),
];

static CARDIAC_INVESTIGATIONS: &[Investigation] = &[
    investigation("ECG", "12 lead ECG", "11524-6", ""),
    investigation("ECHO", "Transthoracic echocardiogram", "34552-0", ""),
    investigation("HOLTER", "24 hour Holter monitor", "18754-2", ""),
    investigation("ETT", "Exercise tolerance test", "18752-6", ""),
];

struct WeightedCondition {
    condition: Condition,
    prevalence: f64,
}

#[rustfmt::skip]
static CONDITIONS: &[WeightedCondition] = &[
    WeightedCondition { condition: Condition { icd10: "I10", name: "Essential Hypertension" }, prevalence: 0.25 },
    WeightedCondition { condition: Condition { icd10: "E11", name: "Type 2 Diabetes Mellitus" }, prevalence: 0.05 },
    WeightedCondition { condition: Condition { icd10: "J44", name: "Chronic Obstructive Pulmonary Disease" }, prevalence: 0.04 },
    WeightedCondition { condition: Condition { icd10: "I48", name: "Atrial Fibrillation" }, prevalence: 0.02 },
    WeightedCondition { condition: Condition { icd10: "I25", name: "Coronary Artery Disease" }, prevalence: 0.03 },
    WeightedCondition { condition: Condition { icd10: "M15", name: "Osteoarthritis" }, prevalence: 0.08 },
    WeightedCondition { condition: Condition { icd10: "F32", name: "Depression" }, prevalence: 0.06 },
    WeightedCondition { condition: Condition { icd10: "E78", name: "Hyperlipidaemia" }, prevalence: 0.15 },
];

#[rustfmt::skip]
static PRACTICES: &[Practice] = &[
    Practice { name: "Temple Street Medical Centre", gms_code: "12345", street: "Temple Street", town: "Dublin 1", county: "Dublin", eircode: "D01 R2P4" },
    Practice { name: "Grafton Street Family Practice", gms_code: "12346", street: "Grafton Street", town: "Dublin 2", county: "Dublin", eircode: "D02 XY24" },
    Practice { name: "Blackrock Medical Centre", gms_code: "12347", street: "Main Street", town: "Blackrock", county: "Dublin", eircode: "A94 E2W8" },
    Practice { name: "Rathmines Health Clinic", gms_code: "12348", street: "Rathmines Road", town: "Dublin 6", county: "Dublin", eircode: "D06 H294" },
    Practice { name: "Clontarf Family Doctors", gms_code: "12349", street: "Clontarf Road", town: "Dublin 3", county: "Dublin", eircode: "D03 T5P9" },
    Practice { name: "Multicultural Health Centre", gms_code: "12350", street: "Dorset Street", town: "Dublin 1", county: "Dublin", eircode: "D01 K5R7" },
    Practice { name: "Parnell Street Medical Practice", gms_code: "12351", street: "Parnell Street", town: "Dublin 1", county: "Dublin", eircode: "D01 T2X9" },
    Practice { name: "Smithfield Community Health", gms_code: "12352", street: "Smithfield Square", town: "Dublin 7", county: "Dublin", eircode: "D07 P6W3" },
    Practice { name: "Blanchardstown Family Clinic", gms_code: "12353", street: "Main Street", town: "Blanchardstown", county: "Dublin", eircode: "D15 Y8N4" },
    Practice { name: "Ballymun Medical Centre", gms_code: "12354", street: "Ballymun Road", town: "Dublin 11", county: "Dublin", eircode: "D11 A5R8" },
];

struct Consultant {
    given: &'static str,
    family: &'static str,
    specialty: &'static str,
    mcn: &'static str,
}

#[rustfmt::skip]
static CONSULTANTS: &[Consultant] = &[
    Consultant { given: "Mairead", family: "O'Brien", specialty: "CARDIOLOGY", mcn: "234567.1234" },
    Consultant { given: "Padraig", family: "Murphy", specialty: "NEUROLOGY", mcn: "234568.1234" },
    Consultant { given: "Siobhan", family: "Kelly", specialty: "ONCOLOGY", mcn: "234569.1234" },
    Consultant { given: "Brendan", family: "Walsh", specialty: "ORTHOPAEDICS", mcn: "234570.1234" },
    Consultant { given: "Nuala", family: "Ryan", specialty: "GASTROENTEROLOGY", mcn: "234571.1234" },
    Consultant { given: "Ahmed", family: "Hassan", specialty: "CARDIOLOGY", mcn: "234572.1234" },
    Consultant { given: "Priya", family: "Patel", specialty: "ENDOCRINOLOGY", mcn: "234573.1234" },
    Consultant { given: "Wei", family: "Zhang", specialty: "RADIOLOGY", mcn: "234575.1234" },
    Consultant { given: "Giovanni", family: "Rossi", specialty: "GENERAL_SURGERY", mcn: "234577.1234" },
    Consultant { given: "Raj", family: "Sharma", specialty: "OPHTHALMOLOGY", mcn: "234580.1234" },
    Consultant { given: "Elena", family: "Popescu", specialty: "DERMATOLOGY", mcn: "234581.1234" },
    Consultant { given: "Conor", family: "Gallagher", specialty: "UROLOGY", mcn: "234582.1234" },
    Consultant { given: "Aoife", family: "Byrne", specialty: "RESPIRATORY", mcn: "234583.1234" },
    Consultant { given: "Katarzyna", family: "Nowak", specialty: "PATHOLOGY", mcn: "234584.1234" },
];

static MALE_NAMES: &[&str] = &[
    "Sean", "Patrick", "Michael", "John", "Brian", "Kevin", "Cian", "Oisin", "Darragh", "Conor",
    "Mohammed", "Ali", "Omar", "Andrei", "Mihai", "Piotr", "Jakub", "Tomasz", "Carlos", "Miguel",
    "Marco", "Luca", "Thomas", "Samuel", "Emmanuel", "Raj", "Arjun", "Vikram", "Wei", "Jun",
];

static FEMALE_NAMES: &[&str] = &[
    "Mary", "Patricia", "Catherine", "Margaret", "Sarah", "Emma", "Niamh", "Aoife", "Siobhan",
    "Claire", "Fatima", "Aisha", "Layla", "Maria", "Ioana", "Anna", "Katarzyna", "Magdalena",
    "Carmen", "Sofia", "Giulia", "Chiara", "Petra", "Grace", "Faith", "Priya", "Kavya", "Meera",
    "Mei", "Ling",
];

static SURNAMES: &[&str] = &[
    "Murphy", "Kelly", "O'Sullivan", "Walsh", "Smith", "O'Brien", "Byrne", "Ryan", "O'Connor",
    "O'Neill", "Dunne", "McCarthy", "Gallagher", "O'Doherty", "Kennedy", "Lynch", "Murray",
    "Quinn", "Moore", "McLoughlin", "Hassan", "Khan", "Hussain", "Popescu", "Ionescu", "Kowalski",
    "Nowak", "Wojcik", "Garcia", "Rodriguez", "Rossi", "Romano", "Mueller", "Schmidt", "Patel",
    "Singh", "Kumar", "Wang", "Zhang", "Chen", "Silva", "Santos", "Andersson", "Johnson", "Brown",
];

static STREETS: &[&str] = &[
    "Grafton Street", "O'Connell Street", "Dame Street", "Parnell Street", "Capel Street",
    "Moore Street", "Stoneybatter", "Drumcondra Road", "Glasnevin Avenue", "Rathmines Road",
    "Patrick Street", "Grand Parade", "Shop Street", "Quay Street", "Henry Street",
    "William Street", "Castletroy Park", "Salthill Road", "Douglas Road", "Main Street",
];

static TOWNS: &[&str] = &[
    "Dublin", "Swords", "Tallaght", "Lucan", "Balbriggan", "Cork", "Ballincollig", "Galway",
    "Limerick", "Waterford", "Kilkenny", "Ennis", "Tralee", "Castlebar", "Letterkenny", "Wexford",
    "Clonmel", "Sligo", "Naas", "Drogheda",
];

static COUNTIES: &[&str] = &[
    "Dublin", "Cork", "Galway", "Limerick", "Waterford", "Kilkenny", "Clare", "Kerry", "Mayo",
    "Donegal", "Wexford", "Tipperary", "Sligo", "Kildare", "Louth",
];

static EIRCODE_ROUTING_KEYS: &[&str] = &[
    "D01", "D02", "D03", "D04", "D05", "D06", "D07", "D08", "T12", "T23", "A94", "H91", "V92",
    "P85", "Y35", "F91", "N91",
];

/// Characters used in the unique identifier part of an Eircode.
const EIRCODE_CHARACTERS: &[u8] = b"ACDEFHKNPRTVWXY0123456789";

static WARDS: &[&str] = &[
    "ST BRIGID'S WARD", "MEDICAL 1", "MEDICAL 2", "SURGICAL 1", "CARDIAC CARE UNIT",
    "ST PATRICK'S WARD", "ACUTE MEDICAL UNIT",
];

/// Rejection reason, ERR.3 code and ERR.3 text for laboratory NACKs.
static REJECTIONS: &[(&str, &str, &str)] = &[
    ("Specimen rejected: haemolysed sample", "207", "Application internal error"),
    ("Specimen rejected: insufficient volume", "207", "Application internal error"),
    ("Specimen rejected: unlabelled tube", "101", "Required field missing"),
    ("Order rejected: unknown test code", "103", "Table value not found"),
];

// ============================================================================
// Fallback narratives
// ============================================================================

#[rustfmt::skip]
fn radiology_report(code: &str) -> &'static str {
    match code {
        "CXR" => "CHEST X-RAY: Heart size normal. Lung fields clear. No acute abnormality.",
        "CTHEAD" => "CT HEAD: No intracranial haemorrhage or mass effect. No acute abnormality detected.",
        "MRBRAIN" => "MRI BRAIN: No significant abnormality identified. Age-appropriate appearances.",
        "USABDO" => "ULTRASOUND ABDOMEN: Normal sonographic appearances of liver, gallbladder and kidneys.",
        "MAMMO" => "MAMMOGRAM: No suspicious mass or microcalcification. BI-RADS 1.",
        _ => "IMAGING: Normal study within expected parameters for patient age.",
    }
}

#[rustfmt::skip]
fn cardiology_report(code: &str) -> &'static str {
    match code {
        "ECG" => "ECG: Sinus rhythm, rate 72 bpm. Normal axis. No acute ST changes.",
        "ECHO" => "ECHO: Normal left ventricular size and function, EF 60%. No significant valvular disease.",
        "HOLTER" => "HOLTER: Predominantly sinus rhythm. Occasional ventricular ectopics. No sustained arrhythmia.",
        "ETT" => "EXERCISE TEST: Good exercise tolerance. No ischaemic changes at peak exercise.",
        _ => "CARDIOLOGY: Study within normal limits.",
    }
}

fn referral_reason(specialty: &str) -> &'static str {
    match specialty {
        "CARDIOLOGY" => "Chest pain and abnormal ECG findings requiring specialist assessment",
        "NEUROLOGY" => "Neurological symptoms requiring specialist evaluation",
        "ONCOLOGY" => "Abnormal screening results requiring urgent specialist review",
        "ORTHOPAEDICS" => "Joint pain and mobility issues requiring orthopaedic assessment",
        "GASTROENTEROLOGY" => "Gastrointestinal symptoms requiring specialist investigation",
        "RESPIRATORY" => "Respiratory symptoms and abnormal chest imaging",
        "ENDOCRINOLOGY" => "Diabetes management and endocrine disorder assessment",
        "RADIOLOGY" => "Clinical indication for advanced imaging studies",
        "DERMATOLOGY" => "Skin lesion requiring dermatological evaluation",
        "OPHTHALMOLOGY" => "Visual symptoms requiring ophthalmological assessment",
        "ENT" => "ENT symptoms requiring specialist evaluation",
        "UROLOGY" => "Urological symptoms requiring specialist assessment",
        "GYNAECOLOGY" => "Gynaecological symptoms requiring specialist evaluation",
        _ => "Clinical assessment required",
    }
}

#[rustfmt::skip]
fn clinical_note(profile: ContentProfile) -> &'static str {
    match profile {
        ContentProfile::DischargeSummary | ContentProfile::Discharge => {
            "Patient admitted for assessment. Treatment provided as indicated. Discharged in stable condition with follow-up arranged with GP."
        }
        ContentProfile::Laboratory => {
            "Sample received and processed. Results to be reviewed by requesting clinician."
        }
        ContentProfile::Radiology => "Report verified by consultant radiologist.",
        ContentProfile::Cardiology => "Report verified by consultant cardiologist.",
        ContentProfile::Admission | ContentProfile::Emergency => {
            "Patient admitted for further assessment and management."
        }
        ContentProfile::Appointment | ContentProfile::WaitingList => {
            "Routine follow-up appointment scheduled."
        }
        _ => "Clinical assessment completed. Management plan discussed.",
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Stateless provider backed by Irish reference tables.
#[derive(Clone, Copy, Debug, Default)]
pub struct IrishValueProvider;

impl IrishValueProvider {
    pub fn new() -> Self {
        Self
    }
}

fn pick<'a, T>(items: &'a [T], rng: &mut dyn RngCore) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn digits(rng: &mut dyn RngCore, count: u32) -> String {
    let low = 10u64.pow(count - 1);
    let high = 10u64.pow(count) - 1;
    rng.gen_range(low..=high).to_string()
}

fn eircode(rng: &mut dyn RngCore) -> String {
    let routing = pick(EIRCODE_ROUTING_KEYS, rng);
    let unique: String = (0..4)
        .map(|i| {
            // The unique identifier starts with a letter.
            let pool = if i == 0 { &EIRCODE_CHARACTERS[..15] } else { EIRCODE_CHARACTERS };
            char::from(*pick(pool, rng))
        })
        .collect();
    format!("{routing} {unique}")
}

/// Date of birth that makes the patient exactly `age` years old on `reference`.
fn date_of_birth(reference: NaiveDate, age: u8, rng: &mut dyn RngCore) -> NaiveDate {
    let birthday = reference
        .checked_sub_months(Months::new(u32::from(age) * 12))
        .unwrap_or(reference);
    let offset = Duration::days(rng.gen_range(0..=364));
    birthday.checked_sub_signed(offset).unwrap_or(birthday)
}

fn default_sex(type_id: u32, rng: &mut dyn RngCore) -> Sex {
    match type_id {
        20 | 21 => Sex::Male,
        22 | 23 => Sex::Female,
        _ if rng.gen_bool(0.5) => Sex::Male,
        _ => Sex::Female,
    }
}

fn minutes_before(
    time: NaiveDateTime,
    rng: &mut dyn RngCore,
    min: i64,
    max: i64,
) -> NaiveDateTime {
    time - Duration::minutes(rng.gen_range(min..=max))
}

/// Appointment slot on a quarter hour between 09:00 and 17:45.
fn appointment_slot(
    reference: NaiveDate,
    days: (i64, i64),
    rng: &mut dyn RngCore,
) -> NaiveDateTime {
    let date = reference + Duration::days(rng.gen_range(days.0..=days.1));
    let hour = rng.gen_range(9..=17);
    let minute = *pick(&[0, 15, 30, 45], rng);
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time)
}

fn facility_letters(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphabetic)
        .take(4)
        .collect::<String>()
        .to_ascii_uppercase()
}

fn practitioner_components(practitioner: &Practitioner) -> FieldValue {
    FieldValue::components([
        practitioner.registration.clone(),
        practitioner.family.to_uppercase(),
        practitioner.given.clone(),
    ])
}

fn coded(code: &str, text: &str, system: &str) -> FieldValue {
    FieldValue::components([code, text, system])
}

impl IrishValueProvider {
    fn consultant(specialty: &str, rng: &mut dyn RngCore) -> Practitioner {
        let matching: Vec<&Consultant> = CONSULTANTS
            .iter()
            .filter(|c| c.specialty == specialty)
            .collect();
        let chosen = if matching.is_empty() {
            pick(CONSULTANTS, rng)
        } else {
            *pick(&matching, rng)
        };
        Practitioner {
            family: chosen.family.into(),
            given: chosen.given.into(),
            registration: chosen.mcn.into(),
        }
    }

    fn general_practitioner(rng: &mut dyn RngCore) -> Practitioner {
        let given = if rng.gen_bool(0.5) {
            pick(MALE_NAMES, rng)
        } else {
            pick(FEMALE_NAMES, rng)
        };
        let family = pick(SURNAMES, rng);
        let registration = format!(
            "{}.{}",
            rng.gen_range(10_000..=999_999),
            rng.gen_range(1_000..=9_999)
        );
        Practitioner {
            family: (*family).into(),
            given: (*given).into(),
            registration,
        }
    }

    fn investigation(
        profile: ContentProfile,
        specialty: &str,
        rng: &mut dyn RngCore,
    ) -> Investigation {
        match profile {
            ContentProfile::Radiology => *pick(IMAGING_EXAMS, rng),
            ContentProfile::Cardiology => *pick(CARDIAC_INVESTIGATIONS, rng),
            _ if specialty == "UROLOGY" => LAB_TESTS
                .iter()
                .find(|t| t.code == "PSA")
                .copied()
                .unwrap_or_else(|| *pick(LAB_TESTS, rng)),
            _ => *pick(LAB_TESTS, rng),
        }
    }

    fn condition(rng: &mut dyn RngCore) -> Option<Condition> {
        let candidate = pick(CONDITIONS, rng);
        rng.gen_bool(candidate.prevalence)
            .then_some(candidate.condition)
    }

    fn person_name(demographics: &Demographics, rng: &mut dyn RngCore) -> FieldValue {
        let (given, prefix) = match demographics.sex {
            Sex::Male => (pick(MALE_NAMES, rng), "MR"),
            Sex::Female => (pick(FEMALE_NAMES, rng), "MS"),
        };
        let family = pick(SURNAMES, rng);
        FieldValue::Components(vec![
            Component::SubComponents(vec![SubComponent::text(family.to_uppercase())]),
            Component::text(given.to_uppercase()),
            Component::Empty,
            Component::Empty,
            Component::text(prefix),
        ])
    }

    fn postal_address(rng: &mut dyn RngCore) -> FieldValue {
        let street = format!("{} {}", rng.gen_range(1..=250), pick(STREETS, rng));
        FieldValue::Components(vec![
            Component::SubComponents(vec![SubComponent::text(street)]),
            Component::Empty,
            Component::text(*pick(TOWNS, rng)),
            Component::text(*pick(COUNTIES, rng)),
            Component::text(eircode(rng)),
            Component::text("IRL"),
        ])
    }

    fn assigned_location(context: &ClinicalContext, rng: &mut dyn RngCore) -> FieldValue {
        let ward = match context.profile {
            ContentProfile::Emergency => "ED",
            _ => pick(WARDS, rng),
        };
        FieldValue::Components(vec![
            Component::text(ward),
            Component::text(rng.gen_range(1..=30).to_string()),
            Component::text(pick(&["A", "B", "C", "D"], rng).to_string()),
            Component::SubComponents(vec![
                SubComponent::text(context.facility.hipe_code.clone()),
                SubComponent::text(context.facility.name.clone()),
            ]),
        ])
    }

    fn observation_value(context: &ClinicalContext, rng: &mut dyn RngCore) -> String {
        let code = context.investigation.code;
        match context.profile {
            ContentProfile::Radiology => radiology_report(code).into(),
            ContentProfile::Cardiology => cardiology_report(code).into(),
            _ => lab::result_text(code, &context.demographics, rng)
                .unwrap_or_else(|| format!("{}: result to follow", context.investigation.name)),
        }
    }

    fn practitioner_for_role(context: &ClinicalContext, occurrence: u32) -> &Practitioner {
        if occurrence <= 1 {
            &context.general_practitioner
        } else {
            &context.consultant
        }
    }

    fn rejection(context: &ClinicalContext) -> &'static (&'static str, &'static str, &'static str) {
        &REJECTIONS[(context.order_number % REJECTIONS.len() as u64) as usize]
    }
}

impl ValueProvider for IrishValueProvider {
    fn context(&self, request: &ContextRequest<'_>, rng: &mut dyn RngCore) -> ClinicalContext {
        let definition = request.definition;
        let reference_time = request.reference_time;

        let sex = match request.demographics.sex {
            Some(sex) => sex,
            None => default_sex(definition.id, rng),
        };
        let age = match request.demographics.age {
            Some(age) => age,
            None => rng.gen_range(18..=90),
        };
        let demographics = Demographics {
            sex,
            age,
            date_of_birth: date_of_birth(reference_time.date(), age, rng),
        };

        let hospital = pick(HOSPITALS, rng);
        let facility = SendingFacility {
            name: hospital.name.into(),
            hipe_code: hospital.hipe.into(),
            doh_code: hospital.doh.into(),
        };

        let specialty = definition
            .specialty
            .and_then(|code| SPECIALTIES.iter().find(|s| s.code == code))
            .copied()
            .unwrap_or_else(|| *pick(SPECIALTIES, rng));

        let investigation = Self::investigation(definition.profile, specialty.code, rng);
        let condition = Self::condition(rng);
        let consultant = Self::consultant(specialty.code, rng);
        let general_practitioner = Self::general_practitioner(rng);
        let practice = *pick(PRACTICES, rng);

        ClinicalContext {
            type_id: definition.id,
            profile: definition.profile,
            reference_time,
            demographics,
            facility,
            specialty,
            investigation,
            condition,
            consultant,
            general_practitioner,
            practice,
            order_number: rng.gen_range(1_000_000_000..=9_999_999_000),
        }
    }

    fn provide(
        &self,
        kind: ValueKind,
        constraints: &Constraints<'_>,
        rng: &mut dyn RngCore,
    ) -> FieldValue {
        let context = constraints.context;
        let occurrence = constraints.occurrence;
        let reference = context.reference_time;
        let profile = context.profile;

        match kind {
            ValueKind::Literal(text) => FieldValue::text(text),
            ValueKind::SetId => FieldValue::Scalar(Scalar::Integer(i64::from(occurrence))),
            ValueKind::ReferenceDateTime => FieldValue::Scalar(Scalar::DateTime(reference)),
            ValueKind::ReferenceDate => FieldValue::Scalar(Scalar::Date(reference.date())),

            ValueKind::MedicalRecordNumber => {
                let prefix = pick(&["M", "P", "H"], rng);
                FieldValue::Components(vec![
                    Component::text(format!("{prefix}{}", rng.gen_range(1..=999_999))),
                    Component::Empty,
                    Component::Empty,
                    Component::SubComponents(vec![
                        SubComponent::text(context.facility.hipe_code.clone()),
                        SubComponent::text(context.facility.name.clone()),
                    ]),
                    Component::text("MR"),
                ])
            }
            ValueKind::NationalHealthIdentifier => FieldValue::Components(vec![
                Component::text(format!("IE{}{}", digits(rng, 6), digits(rng, 3))),
                Component::Empty,
                Component::Empty,
                Component::SubComponents(vec![SubComponent::text("HSE")]),
                Component::text("NH"),
            ]),
            ValueKind::PersonalPublicServiceNumber => {
                let letter = char::from(rng.gen_range(b'A'..=b'W'));
                FieldValue::text(format!("{}{letter}", digits(rng, 7)))
            }
            ValueKind::PersonName => Self::person_name(&context.demographics, rng),
            ValueKind::DateOfBirth => {
                FieldValue::Scalar(Scalar::Date(context.demographics.date_of_birth))
            }
            ValueKind::AdministrativeSex => FieldValue::text(context.demographics.sex.code()),
            ValueKind::PostalAddress => Self::postal_address(rng),
            ValueKind::HomePhone => FieldValue::components([
                format!(
                    "0{} {}{}",
                    rng.gen_range(21..=99),
                    rng.gen_range(400..=999),
                    rng.gen_range(1000..=9999)
                ),
                "PRN".into(),
                "PH".into(),
            ]),
            ValueKind::MobilePhone => FieldValue::components([
                format!(
                    "08{} {}{}",
                    pick(&[3, 5, 6, 7, 9], rng),
                    rng.gen_range(100..=999),
                    rng.gen_range(1000..=9999)
                ),
                "PRN".into(),
                "CP".into(),
            ]),
            ValueKind::DeathDateTime => match profile {
                ContentProfile::Death => {
                    FieldValue::Scalar(Scalar::DateTime(minutes_before(reference, rng, 30, 600)))
                }
                _ => FieldValue::Empty,
            },
            ValueKind::DeathIndicator => match profile {
                ContentProfile::Death => FieldValue::text("Y"),
                _ => FieldValue::Empty,
            },

            ValueKind::PatientClass => FieldValue::text(match profile {
                ContentProfile::Emergency => "E",
                ContentProfile::Admission | ContentProfile::Discharge | ContentProfile::Death => {
                    "I"
                }
                _ => "O",
            }),
            ValueKind::AssignedLocation => Self::assigned_location(context, rng),
            ValueKind::AttendingPractitioner => practitioner_components(&context.consultant),
            ValueKind::VisitNumber => FieldValue::text(format!("V{}", digits(rng, 7))),
            ValueKind::AdmitDateTime => {
                let admitted = match profile {
                    ContentProfile::Admission | ContentProfile::Emergency => {
                        minutes_before(reference, rng, 0, 120)
                    }
                    _ => reference - Duration::hours(rng.gen_range(24..=14 * 24)),
                };
                FieldValue::Scalar(Scalar::DateTime(admitted))
            }
            ValueKind::DischargeDateTime => match profile {
                ContentProfile::Discharge => {
                    FieldValue::Scalar(Scalar::DateTime(minutes_before(reference, rng, 0, 120)))
                }
                _ => FieldValue::Empty,
            },

            ValueKind::PlacerOrderNumber => FieldValue::components([
                format!(
                    "{:010}{}",
                    context.order_number + u64::from(occurrence),
                    facility_letters(&context.facility.name)
                ),
                context.facility.hipe_code.clone(),
            ]),
            ValueKind::FillerOrderNumber => FieldValue::components([
                format!(
                    "JS{}{}",
                    digits(rng, 6),
                    pick(&["A", "B", "C", "D"], rng)
                ),
                "LAB".to_string(),
            ]),
            ValueKind::FacilityIdentifier => FieldValue::components([
                context.facility.name.clone(),
                "L".into(),
                context.facility.hipe_code.clone(),
            ]),
            ValueKind::OrderingProvider => practitioner_components(&context.general_practitioner),
            ValueKind::ObservationCode => {
                let test = context.investigation;
                if test.loinc.is_empty() {
                    FieldValue::components([test.code, test.name, "L"])
                } else {
                    FieldValue::components([
                        test.code, test.name, "L", test.loinc, test.name, "LN",
                    ])
                }
            }
            ValueKind::SpecimenSource => {
                let code = context.investigation.specimen;
                let name = match code {
                    "BLD" => "Whole blood",
                    "SER" => "Serum",
                    "PLAS" => "Plasma",
                    "UR" => "Urine",
                    _ => return FieldValue::Empty,
                };
                FieldValue::Components(vec![Component::SubComponents(vec![
                    SubComponent::text(code),
                    SubComponent::text(name),
                    SubComponent::text("HL70070"),
                ])])
            }
            ValueKind::ObservationValue => FieldValue::text(Self::observation_value(context, rng)),
            ValueKind::ReferenceRange => match profile {
                ContentProfile::Laboratory => {
                    lab::reference_range(context.investigation.code, &context.demographics)
                        .map_or(FieldValue::Empty, FieldValue::text)
                }
                _ => FieldValue::Empty,
            },
            ValueKind::ClinicalNote => FieldValue::text(match context.condition {
                Some(condition) => format!(
                    "{} Background of {} ({}).",
                    clinical_note(profile),
                    condition.name,
                    condition.icd10
                ),
                None => clinical_note(profile).to_string(),
            }),

            ValueKind::ReferralStatus => match profile {
                ContentProfile::ReferralResponse => coded("A", "Accepted", "HL70283"),
                _ => coded("P", "Pending", "HL70283"),
            },
            ValueKind::ReferralPriority => match context.type_id {
                18 | 20 | 22 | 24 | 26 => coded("A", "ASAP", "HL70280"),
                _ if rng.gen_bool(0.2) => coded("S", "Urgent", "HL70280"),
                _ => coded("R", "Routine", "HL70280"),
            },
            ValueKind::ReferralType => {
                coded(context.specialty.code, context.specialty.display, "L")
            }
            ValueKind::ReferralReason => {
                let reason = referral_reason(context.specialty.code);
                FieldValue::text(match context.condition {
                    Some(condition) => format!("{reason}. Known {}.", condition.name),
                    None => reason.to_string(),
                })
            }
            ValueKind::ReferralIdentifier => FieldValue::components([
                format!(
                    "REF{}{}{}",
                    reference.format("%Y%m%d"),
                    digits(rng, 6),
                    digits(rng, 6)
                ),
                context.facility.hipe_code.clone(),
            ]),
            ValueKind::ProviderRole => {
                if occurrence <= 1 {
                    coded("RP", "Referring Provider", "HL70286")
                } else {
                    coded("CP", "Consulting Provider", "HL70286")
                }
            }
            ValueKind::PractitionerName => {
                let practitioner = Self::practitioner_for_role(context, occurrence);
                FieldValue::Components(vec![
                    Component::SubComponents(vec![SubComponent::text(
                        practitioner.family.to_uppercase(),
                    )]),
                    Component::text(practitioner.given.clone()),
                    Component::Empty,
                    Component::Empty,
                    Component::text("Dr"),
                ])
            }
            ValueKind::PracticeAddress => {
                if occurrence <= 1 {
                    let practice = context.practice;
                    FieldValue::Components(vec![
                        Component::SubComponents(vec![
                            SubComponent::text(practice.street),
                            SubComponent::text(practice.name),
                        ]),
                        Component::Empty,
                        Component::text(practice.town),
                        Component::text(practice.county),
                        Component::text(practice.eircode),
                        Component::text("IRL"),
                    ])
                } else {
                    let county = HOSPITALS
                        .iter()
                        .find(|h| h.hipe == context.facility.hipe_code)
                        .map_or("", |h| h.county);
                    FieldValue::Components(vec![
                        Component::SubComponents(vec![SubComponent::text(
                            context.facility.name.clone(),
                        )]),
                        Component::Empty,
                        Component::Empty,
                        Component::text(county),
                        Component::Empty,
                        Component::text("IRL"),
                    ])
                }
            }
            ValueKind::PractitionerIdentifier => {
                if occurrence <= 1 {
                    FieldValue::components([
                        context.general_practitioner.registration.clone(),
                        format!("MCN.HLPracticeID.{}", context.practice.gms_code),
                    ])
                } else {
                    FieldValue::components([
                        context.consultant.registration.clone(),
                        "MCN".to_string(),
                    ])
                }
            }

            ValueKind::AcknowledgementCode => FieldValue::text(match profile {
                ContentProfile::Rejection => "AR",
                _ => "AA",
            }),
            ValueKind::AcknowledgedControlId => FieldValue::text(format!(
                "{}{}",
                (reference - Duration::minutes(rng.gen_range(1..=30))).format("%Y%m%d%H%M"),
                rng.gen_range(1000..=9999)
            )),
            ValueKind::AcknowledgementText => FieldValue::text(match profile {
                ContentProfile::Rejection => Self::rejection(context).0,
                ContentProfile::ReferralResponse => "Referral received and accepted",
                _ => "Message accepted",
            }),
            ValueKind::ErrorCondition => {
                let (_, code, text) = Self::rejection(context);
                coded(code, text, "HL70357")
            }

            ValueKind::AppointmentId => FieldValue::components([
                format!("APT{}", digits(rng, 6)),
                context.facility.hipe_code.clone(),
            ]),
            ValueKind::AppointmentReason => match profile {
                ContentProfile::WaitingList => coded("WL", "Waiting list", "L"),
                _ if rng.gen_bool(0.7) => coded("NEW", "New appointment", "L"),
                _ => coded("RTN", "Return appointment", "L"),
            },
            ValueKind::AppointmentTiming => {
                let window = match profile {
                    ContentProfile::WaitingList => (60, 365),
                    _ => (1, 60),
                };
                let start = appointment_slot(reference.date(), window, rng);
                FieldValue::Components(vec![
                    Component::Scalar(Scalar::Integer(1)),
                    Component::Empty,
                    Component::text(format!("M{}", pick(&[15, 20, 30], rng))),
                    Component::Scalar(Scalar::DateTime(start)),
                ])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DemographicConstraints;
    use crate::registry;
    use chrono::Datelike;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reference_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .expect("valid reference time")
    }

    fn context_for(
        type_id: u32,
        demographics: DemographicConstraints,
        seed: u64,
    ) -> ClinicalContext {
        let definition = registry::lookup(type_id).expect("known type");
        let mut rng = StdRng::seed_from_u64(seed);
        IrishValueProvider::new().context(
            &ContextRequest {
                definition,
                demographics,
                reference_time: reference_time(),
            },
            &mut rng,
        )
    }

    fn age_on(dob: NaiveDate, on: NaiveDate) -> i32 {
        let mut age = on.year() - dob.year();
        if (on.month(), on.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age
    }

    #[test]
    fn context_honours_demographic_constraints() {
        let constraints = DemographicConstraints {
            sex: Some(Sex::Male),
            age: Some(49),
        };
        for seed in 0..50 {
            let context = context_for(10, constraints, seed);
            assert_eq!(context.demographics.sex, Sex::Male);
            assert_eq!(context.demographics.age, 49);
            assert_eq!(
                age_on(context.demographics.date_of_birth, reference_time().date()),
                49,
                "dob {} for seed {seed}",
                context.demographics.date_of_birth
            );
        }
    }

    #[test]
    fn pinned_specialty_follows_type() {
        let context = context_for(14, DemographicConstraints::default(), 1);
        assert_eq!(context.specialty.code, "NEUROLOGY");
        assert_eq!(context.consultant.family, "Murphy");

        let prostate = context_for(20, DemographicConstraints::default(), 1);
        assert_eq!(prostate.demographics.sex, Sex::Male);
        assert_eq!(prostate.investigation.code, "PSA");
    }

    #[test]
    fn radiology_context_uses_imaging_exams() {
        let context = context_for(7, DemographicConstraints::default(), 5);
        assert!(IMAGING_EXAMS.contains(&context.investigation));
    }

    #[test]
    fn identifiers_follow_irish_formats() {
        let context = context_for(2, DemographicConstraints::default(), 9);
        let provider = IrishValueProvider::new();
        let mut rng = StdRng::seed_from_u64(9);
        let constraints = Constraints {
            context: &context,
            occurrence: 1,
        };

        let nhi = provider.provide(ValueKind::NationalHealthIdentifier, &constraints, &mut rng);
        let Some(Component::Scalar(Scalar::Text(id))) = nhi.component(1) else {
            panic!("expected identifier component, got {nhi:?}");
        };
        assert!(id.starts_with("IE"));
        assert_eq!(id.len(), 11);
        assert!(id[2..].chars().all(|c| c.is_ascii_digit()));

        let pps = provider.provide(ValueKind::PersonalPublicServiceNumber, &constraints, &mut rng);
        let pps = pps.as_text().expect("PPS is scalar text");
        assert_eq!(pps.len(), 8);
        assert!(pps[..7].chars().all(|c| c.is_ascii_digit()));
        assert!(pps[7..].chars().all(|c| c.is_ascii_uppercase()));

        let address = provider.provide(ValueKind::PostalAddress, &constraints, &mut rng);
        let Some(Component::Scalar(Scalar::Text(code))) = address.component(5) else {
            panic!("expected eircode component, got {address:?}");
        };
        assert_eq!(code.len(), 8);
        assert_eq!(&code[3..4], " ");
    }

    #[test]
    fn death_fields_only_populated_for_death_notifications() {
        let provider = IrishValueProvider::new();
        let mut rng = StdRng::seed_from_u64(4);

        let death = context_for(6, DemographicConstraints::default(), 4);
        let constraints = Constraints {
            context: &death,
            occurrence: 1,
        };
        assert_eq!(
            provider.provide(ValueKind::DeathIndicator, &constraints, &mut rng),
            FieldValue::text("Y")
        );
        assert!(!provider
            .provide(ValueKind::DeathDateTime, &constraints, &mut rng)
            .is_empty());

        let discharge = context_for(12, DemographicConstraints::default(), 4);
        let constraints = Constraints {
            context: &discharge,
            occurrence: 1,
        };
        assert!(provider
            .provide(ValueKind::DeathIndicator, &constraints, &mut rng)
            .is_empty());
    }

    #[test]
    fn provider_roles_differ_by_occurrence() {
        let provider = IrishValueProvider::new();
        let context = context_for(3, DemographicConstraints::default(), 2);
        let mut rng = StdRng::seed_from_u64(2);
        let first = provider.provide(
            ValueKind::ProviderRole,
            &Constraints {
                context: &context,
                occurrence: 1,
            },
            &mut rng,
        );
        let second = provider.provide(
            ValueKind::ProviderRole,
            &Constraints {
                context: &context,
                occurrence: 2,
            },
            &mut rng,
        );
        assert_eq!(first.component(1), Some(&Component::text("RP")));
        assert_eq!(second.component(1), Some(&Component::text("CP")));
    }

    #[test]
    fn nack_text_and_error_code_agree() {
        let provider = IrishValueProvider::new();
        let context = context_for(11, DemographicConstraints::default(), 8);
        let mut rng = StdRng::seed_from_u64(8);
        let constraints = Constraints {
            context: &context,
            occurrence: 1,
        };
        let text = provider.provide(ValueKind::AcknowledgementText, &constraints, &mut rng);
        let error = provider.provide(ValueKind::ErrorCondition, &constraints, &mut rng);
        let (reason, code, _) = IrishValueProvider::rejection(&context);
        assert_eq!(text.as_text(), Some(*reason));
        assert_eq!(error.component(1), Some(&Component::text(*code)));
        assert_eq!(
            provider
                .provide(ValueKind::AcknowledgementCode, &constraints, &mut rng)
                .as_text(),
            Some("AR")
        );
    }
}
