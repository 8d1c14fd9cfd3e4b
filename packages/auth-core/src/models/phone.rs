use std::fmt;

use crate::error::FlowError;

/// Fixed dialing prefix: `+` followed by 1-3 digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(raw: &str) -> Result<CountryCode, FlowError> {
        let digits = match raw.strip_prefix('+') {
            Some(rest) => rest,
            None => {
                return Err(FlowError::InvalidInput(
                    "country code must start with '+'".to_string(),
                ))
            }
        };
        if digits.is_empty() || digits.len() > 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FlowError::InvalidInput(
                "country code must be '+' followed by 1-3 digits".to_string(),
            ));
        }
        Ok(CountryCode(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        CountryCode("+91".to_string())
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated subscriber number: exactly 10 local digits plus the fixed
/// country-code prefix. No normalization of spaces or leading zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    local: String,
    e164: String,
}

impl PhoneNumber {
    pub fn parse(local_digits: &str, country: &CountryCode) -> Result<PhoneNumber, FlowError> {
        if local_digits.len() != 10 || !local_digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FlowError::InvalidInput(
                "enter a 10-digit phone number".to_string(),
            ));
        }
        Ok(PhoneNumber {
            local: local_digits.to_string(),
            e164: format!("{}{}", country, local_digits),
        })
    }

    /// The number in international form, as sent to the provider.
    pub fn e164(&self) -> &str {
        &self.e164
    }

    /// The 10 digits as the user typed them.
    pub fn local(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.e164)
    }
}
