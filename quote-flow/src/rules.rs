//! Product rule tables for the instant-issue term product.
//!
//! All bounds are inclusive. Amounts are whole dollars.

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 60;

pub const MIN_FACE_AMOUNT: u64 = 50_000;

/// Face-amount ceiling per age band, checked in order.
const FACE_AMOUNT_CEILINGS: &[(u32, u64)] = &[
    (55, 1_000_000),
    (56, 900_000),
    (57, 800_000),
    (58, 700_000),
    (59, 600_000),
    (60, 500_000),
];

pub const ADB_RIDER_LABEL: &str = "ADB Rider";
pub const CHILD_RIDER_LABEL: &str = "Dependent Child Rider";

pub const ADB_RIDER_BOUNDS: (u64, u64) = (25_000, 250_000);
pub const CHILD_RIDER_BOUNDS: (u64, u64) = (5_000, 25_000);

/// States where the product is not sold.
pub const EXCLUDED_STATES: &[&str] = &["NY", "WY"];

/// Supported rider kinds. Anything else on the wire is rejected by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiderKind {
    AccidentalDeath,
    DependentChild,
}

impl RiderKind {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            ADB_RIDER_LABEL => Some(Self::AccidentalDeath),
            CHILD_RIDER_LABEL => Some(Self::DependentChild),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AccidentalDeath => ADB_RIDER_LABEL,
            Self::DependentChild => CHILD_RIDER_LABEL,
        }
    }

    pub fn bounds(self) -> (u64, u64) {
        match self {
            Self::AccidentalDeath => ADB_RIDER_BOUNDS,
            Self::DependentChild => CHILD_RIDER_BOUNDS,
        }
    }
}

pub fn is_supported_age(age: u32) -> bool {
    (MIN_AGE..=MAX_AGE).contains(&age)
}

/// Maximum face amount for `age`, or `None` when the age is not quotable.
pub fn face_amount_ceiling(age: u32) -> Option<u64> {
    if !is_supported_age(age) {
        return None;
    }
    FACE_AMOUNT_CEILINGS
        .iter()
        .find(|(max_age, _)| age <= *max_age)
        .map(|(_, ceiling)| *ceiling)
}

/// Term lengths (years) that may be quoted for the given age and tobacco status.
pub fn allowed_benefit_periods(age: u32, tobacco_use: bool) -> &'static [u32] {
    match age {
        a if !is_supported_age(a) => &[],
        a if a <= 45 => &[10, 20, 30],
        a if a <= 50 && !tobacco_use => &[10, 20, 30],
        _ => &[10, 20],
    }
}

pub fn is_excluded_state(code: &str) -> bool {
    EXCLUDED_STATES.contains(&code)
}

/// Two uppercase ASCII letters.
pub fn is_state_code_format(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

pub fn is_eligible_state(code: &str) -> bool {
    is_state_code_format(code) && !is_excluded_state(code)
}
