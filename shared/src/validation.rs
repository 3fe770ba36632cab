use crate::locale;

/// Snapshot of an input's constraint-validation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityFlags {
    pub value_missing: bool,
    pub type_mismatch: bool,
    pub range_underflow: bool,
    pub range_overflow: bool,
    pub step_mismatch: bool,
    pub too_short: bool,
    pub too_long: bool,
    pub bad_input: bool,
    pub pattern_mismatch: bool,
    pub custom_error: bool,
}

impl ValidityFlags {
    pub fn is_valid(&self) -> bool {
        *self == Self::default()
    }
}

/// The declared bounds that violation messages quote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Constraints {
    pub min: String,
    pub max: String,
    pub min_length: i32,
    pub max_length: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Required,
    TypeMismatch,
    RangeUnderflow { min: String },
    RangeOverflow { max: String },
    StepMismatch,
    TooShort { min_length: i32 },
    TooLong { max_length: i32 },
    /// Anything else, carrying the browser's own message.
    Other(String),
}

impl Violation {
    /// The first violation in reporting order, or `None` for a valid input.
    pub fn classify(
        flags: &ValidityFlags,
        constraints: &Constraints,
        browser_message: &str,
    ) -> Option<Self> {
        if flags.is_valid() {
            return None;
        }
        let violation = if flags.value_missing {
            Self::Required
        } else if flags.type_mismatch {
            Self::TypeMismatch
        } else if flags.range_underflow {
            Self::RangeUnderflow {
                min: constraints.min.clone(),
            }
        } else if flags.range_overflow {
            Self::RangeOverflow {
                max: constraints.max.clone(),
            }
        } else if flags.step_mismatch {
            Self::StepMismatch
        } else if flags.too_short {
            Self::TooShort {
                min_length: constraints.min_length,
            }
        } else if flags.too_long {
            Self::TooLong {
                max_length: constraints.max_length,
            }
        } else {
            Self::Other(browser_message.to_string())
        };
        Some(violation)
    }

    pub fn message(&self) -> String {
        match self {
            Self::Required => locale::FIELD_REQUIRED.into(),
            Self::TypeMismatch => locale::FIELD_TYPE_MISMATCH.into(),
            Self::RangeUnderflow { min } => locale::field_range_underflow(min),
            Self::RangeOverflow { max } => locale::field_range_overflow(max),
            Self::StepMismatch => locale::FIELD_STEP_MISMATCH.into(),
            Self::TooShort { min_length } => locale::field_too_short(*min_length),
            Self::TooLong { max_length } => locale::field_too_long(*max_length),
            Self::Other(message) => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints() -> Constraints {
        Constraints {
            min: "0".into(),
            max: "200".into(),
            min_length: 2,
            max_length: 50,
        }
    }

    #[test]
    fn valid_input_has_no_violation() {
        assert_eq!(
            Violation::classify(&ValidityFlags::default(), &constraints(), ""),
            None
        );
    }

    #[test]
    fn required_wins_over_other_flags() {
        let flags = ValidityFlags {
            value_missing: true,
            range_underflow: true,
            ..ValidityFlags::default()
        };
        let violation = Violation::classify(&flags, &constraints(), "").unwrap();
        assert_eq!(violation, Violation::Required);
        assert_eq!(violation.message(), locale::FIELD_REQUIRED);
    }

    #[test]
    fn range_messages_quote_the_bound() {
        let under = ValidityFlags {
            range_underflow: true,
            ..ValidityFlags::default()
        };
        assert_eq!(
            Violation::classify(&under, &constraints(), "")
                .unwrap()
                .message(),
            "數值不能小於 0"
        );
        let over = ValidityFlags {
            range_overflow: true,
            ..ValidityFlags::default()
        };
        assert_eq!(
            Violation::classify(&over, &constraints(), "")
                .unwrap()
                .message(),
            "數值不能大於 200"
        );
    }

    #[test]
    fn length_messages_quote_the_limit() {
        let short = ValidityFlags {
            too_short: true,
            ..ValidityFlags::default()
        };
        assert_eq!(
            Violation::classify(&short, &constraints(), "")
                .unwrap()
                .message(),
            "內容太短 (最少 2 字)"
        );
    }

    #[test]
    fn unknown_violation_falls_back_to_browser_message() {
        let flags = ValidityFlags {
            pattern_mismatch: true,
            ..ValidityFlags::default()
        };
        let violation = Violation::classify(&flags, &constraints(), "Match the format").unwrap();
        assert_eq!(violation.message(), "Match the format");
    }
}
