//! Rule checks for quote and start-application requests.
//!
//! Every check runs independently and errors accumulate, so a caller sees all
//! violations of a request at once.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;

use crate::error::{QuoteFlowError, ValidationError, ValidationFailure};
use crate::model::{Height, QuoteRequest, Rider, StartApplicationRequest, digits_only};
use crate::rules::{self, MAX_AGE, MIN_AGE, MIN_FACE_AMOUNT, RiderKind};

static ZIP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("zip code pattern compiles"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates against today's date (UTC).
pub fn validate_quote_request(request: &QuoteRequest) -> Result<(), ValidationFailure> {
    validate_quote_request_on(request, Utc::now().date_naive())
}

pub fn validate_quote_request_on(
    request: &QuoteRequest,
    today: NaiveDate,
) -> Result<(), ValidationFailure> {
    into_result(check_quote_request(request, today))
}

/// Runs every quote rule and returns all violations found.
pub fn check_quote_request(request: &QuoteRequest, today: NaiveDate) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let derived_age = check_age(request, today, &mut errors);
    let limit_age = request
        .age
        .or_else(|| derived_age.and_then(|age| u32::try_from(age).ok()));

    if let Some(age) = limit_age {
        check_face_amount(request.face_amount, age, &mut errors);
        check_benefit_period(request.benefit_period, age, request.tobacco_use, &mut errors);
    }

    check_riders(&request.riders, request.face_amount, &mut errors);
    check_location(
        present(&request.state_code),
        present(&request.zip_code),
        &mut errors,
    );

    if let Some(phone) = present(&request.phone) {
        check_phone("phoneNum", phone, &mut errors);
    }
    if let Some(email) = present(&request.email) {
        check_email(email, &mut errors);
    }

    check_height_weight(request.height, request.weight_in_lbs, &mut errors);

    errors
}

/// Checks a start-application request. A missing quote id is a structural
/// problem and is reported before any field rule runs.
pub fn validate_start_application(
    request: &StartApplicationRequest,
) -> Result<(), QuoteFlowError> {
    if present(&request.quote_response_id).is_none() {
        return Err(QuoteFlowError::Malformed(
            "Quote response ID is required".to_string(),
        ));
    }

    let mut errors = Vec::new();
    if let Some(phone) = present(&request.phone_number) {
        check_phone("phoneNumber", phone, &mut errors);
    }
    if let Some(email) = present(&request.email) {
        check_email(email, &mut errors);
    }
    into_result(errors).map_err(QuoteFlowError::from)
}

/// Whole years elapsed since `birth`, counting the current year only once
/// the birthday has been reached.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

pub fn parse_date_of_birth(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), ValidationFailure> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { errors })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Returns the age derived from the date of birth, when one parses.
fn check_age(
    request: &QuoteRequest,
    today: NaiveDate,
    errors: &mut Vec<ValidationError>,
) -> Option<i32> {
    let date_of_birth = present(&request.date_of_birth);

    if request.age.is_none() && date_of_birth.is_none() {
        errors.push(ValidationError::new(
            "age",
            "Either age or dateOfBirth must be provided",
        ));
        return None;
    }

    if let Some(age) = request.age {
        if !rules::is_supported_age(age) {
            errors.push(ValidationError::new(
                "age",
                format!("Age must be between {MIN_AGE} and {MAX_AGE}"),
            ));
        }
    }

    let text = date_of_birth?;
    let Some(birth) = parse_date_of_birth(text) else {
        errors.push(ValidationError::new(
            "dateOfBirth",
            "Date of birth must be a valid date in YYYY-MM-DD format",
        ));
        return None;
    };

    let derived = age_on(birth, today);
    let in_range = u32::try_from(derived)
        .map(rules::is_supported_age)
        .unwrap_or(false);
    if !in_range {
        errors.push(ValidationError::new(
            "dateOfBirth",
            format!(
                "Age calculated from date of birth must be between {MIN_AGE} and {MAX_AGE}"
            ),
        ));
    }
    Some(derived)
}

fn check_face_amount(face_amount: u64, age: u32, errors: &mut Vec<ValidationError>) {
    match rules::face_amount_ceiling(age) {
        Some(ceiling) if (MIN_FACE_AMOUNT..=ceiling).contains(&face_amount) => {}
        Some(ceiling) => errors.push(ValidationError::new(
            "faceAmount",
            format!(
                "Face amount must be between {MIN_FACE_AMOUNT} and {ceiling} for age {age}"
            ),
        )),
        None => errors.push(ValidationError::new(
            "faceAmount",
            format!("No face amount is available for age {age}"),
        )),
    }
}

fn check_benefit_period(
    benefit_period: u32,
    age: u32,
    tobacco_use: bool,
    errors: &mut Vec<ValidationError>,
) {
    let allowed = rules::allowed_benefit_periods(age, tobacco_use);
    if allowed.contains(&benefit_period) {
        return;
    }

    let available = if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    errors.push(ValidationError::new(
        "benefitPeriod",
        format!(
            "Invalid benefit period for age {age}{}. Available periods: {available}",
            if tobacco_use { " with tobacco use" } else { "" }
        ),
    ));
}

fn check_riders(riders: &[Rider], face_amount: u64, errors: &mut Vec<ValidationError>) {
    for (index, rider) in riders.iter().enumerate() {
        match RiderKind::from_label(&rider.label) {
            Some(kind) => {
                let (min, max) = kind.bounds();
                if !(min..=max).contains(&rider.rider_face_amount) {
                    errors.push(ValidationError::new(
                        format!("riders[{index}].riderFaceAmount"),
                        format!("{} amount must be between {min} and {max}", kind.label()),
                    ));
                }
            }
            None => errors.push(ValidationError::new(
                format!("riders[{index}].rider"),
                format!(
                    "Unsupported rider type '{}'. Available riders: {}, {}",
                    rider.label,
                    rules::ADB_RIDER_LABEL,
                    rules::CHILD_RIDER_LABEL
                ),
            )),
        }

        if rider.rider_face_amount > face_amount {
            errors.push(ValidationError::new(
                format!("riders[{index}].riderFaceAmount"),
                "Rider face amount cannot be greater than policy face amount",
            ));
        }
    }
}

fn check_location(
    state_code: Option<&str>,
    zip_code: Option<&str>,
    errors: &mut Vec<ValidationError>,
) {
    if state_code.is_none() && zip_code.is_none() {
        errors.push(ValidationError::new(
            "location",
            "Either stateCode or zipCode must be provided",
        ));
    }

    if let Some(code) = state_code {
        if !rules::is_state_code_format(code) {
            errors.push(ValidationError::new(
                "stateCode",
                "State code must be a valid 2-letter US state code",
            ));
        } else if rules::is_excluded_state(code) {
            errors.push(ValidationError::new(
                "stateCode",
                format!("Product not available in {code}"),
            ));
        }
    }

    if let Some(zip) = zip_code {
        if !ZIP_CODE.is_match(zip) {
            errors.push(ValidationError::new(
                "zipCode",
                "ZIP code must be in valid US format (12345 or 12345-6789)",
            ));
        }
    }
}

fn check_phone(field: &str, phone: &str, errors: &mut Vec<ValidationError>) {
    if digits_only(phone).len() != 10 {
        errors.push(ValidationError::new(field, "Phone number must be 10 digits"));
    }
}

fn check_email(email: &str, errors: &mut Vec<ValidationError>) {
    if !EMAIL.is_match(email) {
        errors.push(ValidationError::new("email", "Invalid email format"));
    }
}

fn check_height_weight(
    height: Option<Height>,
    weight_in_lbs: Option<u32>,
    errors: &mut Vec<ValidationError>,
) {
    if height.is_some() != weight_in_lbs.is_some() {
        errors.push(ValidationError::new(
            "height_weight",
            "Both height and weight must be provided together",
        ));
    }

    if let Some(height) = height {
        if !(4..=7).contains(&height.feet) {
            errors.push(ValidationError::new(
                "height.feet",
                "Height in feet must be between 4 and 7",
            ));
        }
        if !(0..=11).contains(&height.inches) {
            errors.push(ValidationError::new(
                "height.inches",
                "Height in inches must be between 0 and 11",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gender, HealthClass, PaymentFrequency};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn base_request() -> QuoteRequest {
        QuoteRequest {
            face_amount: 500_000,
            benefit_period: 20,
            tobacco_use: false,
            gender: Gender::Male,
            state_code: Some("AZ".to_string()),
            zip_code: None,
            rate_class: None,
            health_class: Some(HealthClass::Excellent),
            height: None,
            weight_in_lbs: None,
            age: Some(35),
            date_of_birth: None,
            riders: Vec::new(),
            payment_frequency: PaymentFrequency::Monthly,
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
        }
    }

    fn fields(request: &QuoteRequest) -> Vec<String> {
        check_quote_request(request, today())
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert_eq!(validate_quote_request_on(&base_request(), today()), Ok(()));
    }

    #[test]
    fn revalidation_is_stable() {
        let request = base_request();
        let first = validate_quote_request_on(&request, today());
        let second = validate_quote_request_on(&request, today());
        assert_eq!(first, second);
        assert!(second.is_ok());
    }

    #[test]
    fn face_amount_follows_age_ceiling() {
        let mut request = base_request();
        request.age = Some(59);
        request.face_amount = 600_000;
        assert!(fields(&request).is_empty());

        request.face_amount = 700_000;
        assert_eq!(fields(&request), vec!["faceAmount"]);

        request.age = Some(55);
        request.face_amount = 1_000_000;
        assert!(fields(&request).is_empty());

        request.face_amount = 49_999;
        assert_eq!(fields(&request), vec!["faceAmount"]);

        request.face_amount = 50_000;
        assert!(fields(&request).is_empty());
    }

    #[test]
    fn face_amount_is_accepted_exactly_within_bounds_for_every_age() {
        for age in MIN_AGE..=MAX_AGE {
            let ceiling = rules::face_amount_ceiling(age).unwrap();
            let mut request = base_request();
            request.age = Some(age);
            request.benefit_period = 10;
            for (amount, ok) in [
                (MIN_FACE_AMOUNT - 1, false),
                (MIN_FACE_AMOUNT, true),
                (ceiling, true),
                (ceiling + 1, false),
            ] {
                request.face_amount = amount;
                let has_error = fields(&request).contains(&"faceAmount".to_string());
                assert_eq!(!has_error, ok, "age {age} amount {amount}");
            }
        }
    }

    #[test]
    fn benefit_period_depends_on_tobacco_use() {
        let mut request = base_request();
        request.age = Some(48);
        request.benefit_period = 30;
        request.tobacco_use = true;
        assert_eq!(fields(&request), vec!["benefitPeriod"]);

        request.tobacco_use = false;
        assert!(fields(&request).is_empty());

        request.age = Some(52);
        assert_eq!(fields(&request), vec!["benefitPeriod"]);

        request.benefit_period = 15;
        request.age = Some(30);
        assert_eq!(fields(&request), vec!["benefitPeriod"]);
    }

    #[test]
    fn out_of_range_age_reports_every_affected_rule() {
        let mut request = base_request();
        request.age = Some(65);
        let errors = fields(&request);
        assert_eq!(errors, vec!["age", "faceAmount", "benefitPeriod"]);
    }

    #[test]
    fn missing_age_and_date_of_birth() {
        let mut request = base_request();
        request.age = None;
        assert_eq!(fields(&request), vec!["age"]);
    }

    #[test]
    fn derives_age_from_date_of_birth() {
        let mut request = base_request();
        request.age = None;
        // turns 56 tomorrow, so still 55 and allowed a million
        request.date_of_birth = Some("1968-06-16".to_string());
        request.face_amount = 1_000_000;
        assert!(fields(&request).is_empty());

        request.date_of_birth = Some("1968-06-15".to_string());
        assert_eq!(fields(&request), vec!["faceAmount"]);
    }

    #[test]
    fn explicit_age_drives_limits_but_date_of_birth_is_still_checked() {
        let mut request = base_request();
        request.age = Some(35);
        request.date_of_birth = Some("1950-01-01".to_string());
        assert_eq!(fields(&request), vec!["dateOfBirth"]);
    }

    #[test]
    fn unparseable_date_of_birth() {
        let mut request = base_request();
        request.age = None;
        request.date_of_birth = Some("15/06/1990".to_string());
        assert_eq!(fields(&request), vec!["dateOfBirth"]);
    }

    #[test]
    fn age_counts_birthday_only_once_reached() {
        let birth = NaiveDate::from_ymd_opt(1990, 12, 31).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 12, 30).unwrap()), 33);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()), 34);
        let leap = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
        assert_eq!(age_on(leap, NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()), 22);
        assert_eq!(age_on(leap, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()), 23);
    }

    #[test]
    fn riders_are_checked_independently() {
        let mut request = base_request();
        request.face_amount = 1_000_000;
        request.riders = vec![
            Rider {
                label: "ADB Rider".to_string(),
                rider_face_amount: 260_000,
            },
            Rider {
                label: "Dependent Child Rider".to_string(),
                rider_face_amount: 10_000,
            },
            Rider {
                label: "Waiver of Premium".to_string(),
                rider_face_amount: 10_000,
            },
        ];
        assert_eq!(
            fields(&request),
            vec!["riders[0].riderFaceAmount", "riders[2].rider"]
        );
    }

    #[test]
    fn rider_cannot_exceed_face_amount() {
        let mut request = base_request();
        request.face_amount = 50_000;
        request.riders = vec![Rider {
            label: "ADB Rider".to_string(),
            rider_face_amount: 100_000,
        }];
        let errors = check_quote_request(&request, today());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Rider face amount cannot be greater than policy face amount"
        );
    }

    #[test]
    fn location_rules() {
        let mut request = base_request();
        request.state_code = None;
        assert_eq!(fields(&request), vec!["location"]);

        request.zip_code = Some("85001-1234".to_string());
        assert!(fields(&request).is_empty());

        request.zip_code = Some("8500".to_string());
        assert_eq!(fields(&request), vec!["zipCode"]);

        request.zip_code = None;
        request.state_code = Some("NY".to_string());
        assert_eq!(fields(&request), vec!["stateCode"]);

        request.state_code = Some("az".to_string());
        assert_eq!(fields(&request), vec!["stateCode"]);
    }

    #[test]
    fn phone_is_compared_by_digits() {
        let mut formatted = base_request();
        formatted.phone = Some("(555) 123-4567".to_string());
        let mut plain = base_request();
        plain.phone = Some("5551234567".to_string());
        assert_eq!(
            check_quote_request(&formatted, today()),
            check_quote_request(&plain, today())
        );
        assert!(fields(&formatted).is_empty());

        formatted.phone = Some("555-1234".to_string());
        assert_eq!(fields(&formatted), vec!["phoneNum"]);
    }

    #[test]
    fn email_format() {
        let mut request = base_request();
        request.email = Some("jane@example.com".to_string());
        assert!(fields(&request).is_empty());
        request.email = Some("jane@@example.com".to_string());
        assert_eq!(fields(&request), vec!["email"]);
        request.email = Some("jane example@x.com".to_string());
        assert_eq!(fields(&request), vec!["email"]);
    }

    #[test]
    fn height_and_weight_go_together() {
        let mut request = base_request();
        request.height = Some(Height { feet: 5, inches: 11 });
        assert_eq!(fields(&request), vec!["height_weight"]);

        request.weight_in_lbs = Some(180);
        assert!(fields(&request).is_empty());

        request.height = Some(Height { feet: 8, inches: 12 });
        assert_eq!(fields(&request), vec!["height.feet", "height.inches"]);

        request.height = None;
        assert_eq!(fields(&request), vec!["height_weight"]);
    }

    #[test]
    fn errors_accumulate_across_rules() {
        let mut request = base_request();
        request.face_amount = 10;
        request.benefit_period = 25;
        request.state_code = Some("WY".to_string());
        request.email = Some("nope".to_string());
        let failure = validate_quote_request_on(&request, today()).unwrap_err();
        assert_eq!(failure.errors.len(), 4);
        assert!(failure.has_field("faceAmount"));
        assert!(failure.has_field("benefitPeriod"));
        assert!(failure.has_field("stateCode"));
        assert!(failure.has_field("email"));
    }

    #[test]
    fn start_application_requires_quote_id() {
        let request = StartApplicationRequest::default();
        assert!(matches!(
            validate_start_application(&request),
            Err(QuoteFlowError::Malformed(_))
        ));

        let blank = StartApplicationRequest {
            quote_response_id: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_start_application(&blank),
            Err(QuoteFlowError::Malformed(_))
        ));
    }

    #[test]
    fn start_application_checks_contact_fields() {
        let request = StartApplicationRequest {
            quote_response_id: Some("q-1".to_string()),
            email: Some("bad".to_string()),
            phone_number: Some("123".to_string()),
            ..Default::default()
        };
        match validate_start_application(&request) {
            Err(QuoteFlowError::Validation(failure)) => {
                assert!(failure.has_field("email"));
                assert!(failure.has_field("phoneNumber"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let ok = StartApplicationRequest {
            quote_response_id: Some("q-1".to_string()),
            phone_number: Some("(555) 123-4567".to_string()),
            ..Default::default()
        };
        assert!(validate_start_application(&ok).is_ok());
    }
}
