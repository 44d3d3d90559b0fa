//! Chat-completion client.

use crate::config::AzureOpenAiConfig;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use syntgen_core::enhance::{ClinicalSummary, EnhanceableField};
use syntgen_core::{EnhancementHook, EnhancementRequest, EnhancementUnavailable};

const TEMPERATURE: f32 = 0.7;

const LANGUAGE_RULE: &str =
    "IMPORTANT: Always respond in English language only, never in Irish Gaelic. \
     Return only the requested text with no preamble or markdown.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Enhancement hook backed by an Azure OpenAI chat deployment.
#[derive(Clone, Debug)]
pub struct AzureOpenAiHook {
    config: AzureOpenAiConfig,
}

impl AzureOpenAiHook {
    pub fn new(config: AzureOpenAiConfig) -> Self {
        Self { config }
    }
}

impl EnhancementHook for AzureOpenAiHook {
    fn enhance(
        &self,
        request: &EnhancementRequest,
        timeout: Duration,
    ) -> Result<String, EnhancementUnavailable> {
        let system = system_prompt(request.field);
        let user = user_prompt(request);
        let body = ChatRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            max_tokens: max_tokens(request.field),
            temperature: TEMPERATURE,
        };

        // Blocking client; must not be built on an async runtime thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnhancementUnavailable::Transport(e.to_string()))?;

        let response = client
            .post(self.config.completions_url())
            .header("api-key", self.config.api_key())
            .json(&body)
            .send()
            .map_err(send_error)?;

        if let Some(err) = status_error(response.status()) {
            return Err(err);
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| EnhancementUnavailable::Malformed(e.to_string()))?;
        tracing::debug!(
            field = request.field.describe(),
            deployment = self.config.deployment(),
            "azure openai responded"
        );
        first_content(parsed)
    }
}

fn send_error(err: reqwest::Error) -> EnhancementUnavailable {
    if err.is_timeout() {
        EnhancementUnavailable::Timeout
    } else {
        EnhancementUnavailable::Transport(err.to_string())
    }
}

fn status_error(status: StatusCode) -> Option<EnhancementUnavailable> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(EnhancementUnavailable::Unauthorised)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            Some(EnhancementUnavailable::Timeout)
        }
        s if s.is_success() => None,
        s => Some(EnhancementUnavailable::Transport(format!("HTTP {s}"))),
    }
}

fn first_content(response: ChatResponse) -> Result<String, EnhancementUnavailable> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| EnhancementUnavailable::Malformed("response carried no content".into()))
}

fn max_tokens(field: EnhanceableField) -> u32 {
    match field {
        EnhanceableField::LabResult => 80,
        EnhanceableField::ClinicalNote => 150,
        EnhanceableField::ReferralReason | EnhanceableField::DischargeSummary => 200,
        EnhanceableField::RadiologyReport | EnhanceableField::CardiologyReport => 250,
    }
}

fn system_prompt(field: EnhanceableField) -> String {
    let role = match field {
        EnhanceableField::LabResult => {
            "You are a medical laboratory system generating realistic Irish lab values. \
             Keep every analyte, unit and flag from the draft."
        }
        EnhanceableField::RadiologyReport => {
            "You are a radiologist generating medical reports for Irish healthcare."
        }
        EnhanceableField::CardiologyReport => {
            "You are a cardiologist generating investigation reports for Irish healthcare."
        }
        EnhanceableField::ReferralReason => {
            "You are a medical professional generating clinical content for Irish healthcare, \
             writing as a GP referring a patient to a consultant."
        }
        EnhanceableField::DischargeSummary => {
            "You are a healthcare professional generating discharge summaries \
             for Irish hospitals."
        }
        EnhanceableField::ClinicalNote => {
            "You are a healthcare professional generating clinical documentation \
             for Irish healthcare."
        }
    };
    format!("{role} {LANGUAGE_RULE}")
}

fn user_prompt(request: &EnhancementRequest) -> String {
    let ClinicalSummary {
        age,
        sex,
        specialty,
        investigation,
        investigation_code,
        condition,
    } = &request.summary;

    let mut prompt = format!(
        "Rewrite this {} as realistic clinical text.\n\
         Patient: {age} year old {sex}.\n\
         Specialty: {specialty}.\n\
         Investigation: {investigation} ({investigation_code}).\n",
        request.field.describe()
    );
    if let Some(condition) = condition {
        prompt.push_str(&format!("Known condition: {condition}.\n"));
    }
    prompt.push_str(&format!("Draft: {}", request.draft));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(field: EnhanceableField) -> EnhancementRequest {
        EnhancementRequest {
            field,
            summary: ClinicalSummary {
                age: 67,
                sex: "Male",
                specialty: "Urology",
                investigation: "Prostate Specific Antigen",
                investigation_code: "PSA",
                condition: Some("Hypertension"),
            },
            draft: "PSA: 6.10 ug/L (H)".into(),
        }
    }

    #[test]
    fn prompts_carry_patient_context() {
        let prompt = user_prompt(&request(EnhanceableField::LabResult));
        assert!(prompt.contains("laboratory result"));
        assert!(prompt.contains("67 year old Male"));
        assert!(prompt.contains("Prostate Specific Antigen (PSA)"));
        assert!(prompt.contains("Known condition: Hypertension."));
        assert!(prompt.ends_with("Draft: PSA: 6.10 ug/L (H)"));
    }

    #[test]
    fn every_system_prompt_pins_english() {
        for field in [
            EnhanceableField::LabResult,
            EnhanceableField::RadiologyReport,
            EnhanceableField::CardiologyReport,
            EnhanceableField::ReferralReason,
            EnhanceableField::DischargeSummary,
            EnhanceableField::ClinicalNote,
        ] {
            let prompt = system_prompt(field);
            assert!(prompt.contains("Irish"), "{field:?}");
            assert!(prompt.contains("English language only"), "{field:?}");
        }
    }

    #[test]
    fn request_body_shape() {
        let system = system_prompt(EnhanceableField::ClinicalNote);
        let body = ChatRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: "hello",
                },
            ],
            max_tokens: max_tokens(EnhanceableField::ClinicalNote),
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_value(&body).expect("serialises");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["max_tokens"], 150);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED),
            Some(EnhancementUnavailable::Unauthorised)
        );
        assert_eq!(
            status_error(StatusCode::FORBIDDEN),
            Some(EnhancementUnavailable::Unauthorised)
        );
        assert_eq!(
            status_error(StatusCode::GATEWAY_TIMEOUT),
            Some(EnhancementUnavailable::Timeout)
        );
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS),
            Some(EnhancementUnavailable::Transport(_))
        ));
        assert_eq!(status_error(StatusCode::OK), None);
    }

    #[test]
    fn extracts_first_choice() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Mildly raised PSA."}}]}"#,
        )
        .expect("valid response");
        assert_eq!(first_content(parsed).expect("content"), "Mildly raised PSA.");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("valid");
        assert!(matches!(
            first_content(empty),
            Err(EnhancementUnavailable::Malformed(_))
        ));

        let filtered: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).expect("valid");
        assert!(first_content(filtered).is_err());
    }
}
