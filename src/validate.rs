use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CrmError, Result};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
}

pub const PHONE_MIN_LEN: usize = 7;
pub const PHONE_MAX_LEN: usize = 11;
/// Width of the VARCHAR columns on `clients`.
pub const TEXT_MAX_LEN: usize = 40;

/// Returns true when the whole string looks like `local@domain.tld`.
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Returns true when the string is 7 to 11 ASCII digits.
pub fn validate_phone(phone: &str) -> bool {
    (PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&phone.len())
        && phone.bytes().all(|b| b.is_ascii_digit())
}

fn fits_column(value: &str) -> bool {
    value.chars().count() <= TEXT_MAX_LEN
}

/// Pattern match plus the storage width, so an over-long address is
/// rejected here instead of by the database.
pub fn check_email(email: &str) -> Result<()> {
    if validate_email(email) && fits_column(email) {
        Ok(())
    } else {
        Err(CrmError::InvalidEmail(email.to_string()))
    }
}

pub fn check_name(field: &'static str, value: &str) -> Result<()> {
    if !value.is_empty() && fits_column(value) {
        Ok(())
    } else {
        Err(CrmError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

pub fn check_phone(phone: &str) -> Result<()> {
    if validate_phone(phone) {
        Ok(())
    } else {
        Err(CrmError::InvalidPhone(phone.to_string()))
    }
}

pub fn check_phones<S: AsRef<str>>(phones: &[S]) -> Result<()> {
    phones.iter().try_for_each(|phone| check_phone(phone.as_ref()))
}
