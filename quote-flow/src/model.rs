use serde::{Deserialize, Serialize};

/// Vendor gender codes: 1 = male, 2 = female, 3 = unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl TryFrom<u8> for Gender {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Male),
            2 => Ok(Self::Female),
            3 => Ok(Self::Unknown),
            other => Err(format!("unknown gender code {other}, expected 1, 2 or 3")),
        }
    }
}

impl From<Gender> for u8 {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => 1,
            Gender::Female => 2,
            Gender::Unknown => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthClass {
    Excellent,
    Great,
    Good,
    Average,
}

impl HealthClass {
    pub const ALL: [HealthClass; 4] = [Self::Excellent, Self::Great, Self::Good, Self::Average];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Average => "Average",
        }
    }
}

/// Premium payments per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PaymentFrequency {
    Annual,
    #[default]
    Monthly,
}

impl TryFrom<u8> for PaymentFrequency {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Annual),
            12 => Ok(Self::Monthly),
            other => Err(format!("unknown payment frequency {other}, expected 1 or 12")),
        }
    }
}

impl From<PaymentFrequency> for u8 {
    fn from(frequency: PaymentFrequency) -> Self {
        match frequency {
            PaymentFrequency::Annual => 1,
            PaymentFrequency::Monthly => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Height {
    pub feet: i32,
    pub inches: i32,
}

/// A rider as sent on the wire. The label is kept as text so that unknown
/// rider types surface as validation errors rather than parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    #[serde(rename = "rider")]
    pub label: String,
    pub rider_face_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub face_amount: u64,
    pub benefit_period: u32,
    #[serde(rename = "flagTobaccoUse", alias = "tobaccoUse")]
    pub tobacco_use: bool,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_class: Option<HealthClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Height>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_in_lbs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub riders: Vec<Rider>,
    #[serde(rename = "paymentFreq", default)]
    pub payment_frequency: PaymentFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "phoneNum", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl QuoteRequest {
    /// Strips everything but digits from the phone number, if any.
    pub fn normalize_phone(&mut self) {
        if let Some(phone) = self.phone.as_mut() {
            *phone = digits_only(phone);
        }
    }
}

pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedRider {
    pub rider_value: String,
    pub rider_label: String,
    pub rider_quote_amount: f64,
    pub face_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteHint {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedQuote {
    pub quote_response_id: String,
    pub quote_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_save_when_selecting_annual: Option<f64>,
    pub face_amount: f64,
    pub benefit_period: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_period_unit: Option<String>,
    pub payment_frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_medical_required: Option<bool>,
    #[serde(default)]
    pub selected_riders: Vec<SelectedRider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<QuoteHint>,
}

/// Successful quote payload returned by the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteOffer {
    pub product_name: String,
    pub selected_quote: SelectedQuote,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartApplicationRequest {
    #[serde(default)]
    pub quote_response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl StartApplicationRequest {
    pub fn normalize_phone(&mut self) {
        if let Some(phone) = self.phone_number.as_mut() {
            *phone = digits_only(phone);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationLinks {
    pub agent_link: String,
    pub e_app_agent_link: String,
    pub applicant_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_vendor_wire_format() {
        let request: QuoteRequest = serde_json::from_value(json!({
            "faceAmount": 500000,
            "benefitPeriod": 20,
            "flagTobaccoUse": false,
            "gender": 2,
            "stateCode": "AZ",
            "healthClass": "Great",
            "age": 35,
            "riders": [{ "rider": "ADB Rider", "riderFaceAmount": 100000 }],
            "paymentFreq": 1
        }))
        .unwrap();

        assert_eq!(request.gender, Gender::Female);
        assert_eq!(request.health_class, Some(HealthClass::Great));
        assert_eq!(request.payment_frequency, PaymentFrequency::Annual);
        assert_eq!(request.riders[0].label, "ADB Rider");
        assert!(!request.tobacco_use);
    }

    #[test]
    fn payment_frequency_defaults_to_monthly() {
        let request: QuoteRequest = serde_json::from_value(json!({
            "faceAmount": 100000,
            "benefitPeriod": 10,
            "tobaccoUse": true,
            "gender": 1,
            "zipCode": "85001"
        }))
        .unwrap();

        assert_eq!(request.payment_frequency, PaymentFrequency::Monthly);
        assert!(request.tobacco_use);
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["paymentFreq"], 12);
        assert_eq!(wire["flagTobaccoUse"], true);
        assert!(wire.get("riders").is_none());
    }

    #[test]
    fn rejects_unknown_codes() {
        let result = serde_json::from_value::<QuoteRequest>(json!({
            "faceAmount": 100000,
            "benefitPeriod": 10,
            "flagTobaccoUse": false,
            "gender": 7
        }));
        assert!(result.is_err());
        assert!(serde_json::from_value::<PaymentFrequency>(json!(4)).is_err());
    }

    #[test]
    fn normalizes_phone_digits() {
        let mut request = StartApplicationRequest {
            quote_response_id: Some("q-1".to_string()),
            phone_number: Some("(555) 123-4567".to_string()),
            ..Default::default()
        };
        request.normalize_phone();
        assert_eq!(request.phone_number.as_deref(), Some("5551234567"));
    }

    #[test]
    fn application_links_use_vendor_names() {
        let links: ApplicationLinks = serde_json::from_value(json!({
            "agentLink": "https://a",
            "eAppAgentLink": "https://e",
            "applicantLink": "https://p"
        }))
        .unwrap();
        assert_eq!(links.e_app_agent_link, "https://e");
    }
}
