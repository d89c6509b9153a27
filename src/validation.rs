//! Local form checks run before anything is sent.
//!
//! Each form reports every failing field at once, keyed by field name, with
//! the message shown under that field.
use crate::bidding::model::{Condition, NewListing};
use crate::error::MarketError;
use crate::session::{LoginRequest, RegisterRequest};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

// region:    --- Field Errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<FieldErrors> for MarketError {
    fn from(errors: FieldErrors) -> Self {
        let message = errors
            .iter()
            .map(|(_, message)| message)
            .collect::<Vec<_>>()
            .join("\n");
        MarketError::Validation(message)
    }
}
// endregion: --- Field Errors

// region:    --- Rules
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}

fn min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}
// endregion: --- Rules

// region:    --- Forms
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if !is_valid_email(self.email.trim()) {
            errors.add("email", "Invalid email address");
        }
        if !min_chars(&self.password, 6) {
            errors.add("password", "Password must be at least 6 characters");
        }
        errors.into_result()
    }

    pub fn into_request(self) -> Result<LoginRequest, FieldErrors> {
        self.validate()?;
        Ok(LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub campus: String,
    pub phone: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if !min_chars(self.name.trim(), 2) {
            errors.add("name", "Name must be at least 2 characters");
        }
        if !is_valid_email(self.email.trim()) {
            errors.add("email", "Invalid email address");
        }
        if !min_chars(self.campus.trim(), 2) {
            errors.add("campus", "Campus name is required");
        }
        if !min_chars(&self.password, 6) {
            errors.add("password", "Password must be at least 6 characters");
        }
        if self.password != self.confirm_password {
            errors.add("confirmpassword", "Passwords don't match");
        }
        errors.into_result()
    }

    pub fn into_request(self) -> Result<RegisterRequest, FieldErrors> {
        self.validate()?;
        Ok(RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            campus: self.campus.trim().to_string(),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            password: self.password,
            confirmpassword: self.confirm_password,
        })
    }
}

/// Listing form as filled in; the price is still raw text.
#[derive(Debug, Clone, Default)]
pub struct ListingForm {
    pub title: String,
    pub description: String,
    pub campus: String,
    pub category: String,
    pub condition: Option<String>,
    pub starting_price: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub images: Vec<PathBuf>,
}

impl ListingForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        self.checked().map(|_| ())
    }

    /// Builds the listing for `seller_id` once every field passes.
    pub fn into_listing(self, seller_id: &str) -> Result<NewListing, FieldErrors> {
        let (condition, starting_price, start_time, end_time) = self.checked()?;
        Ok(NewListing {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            condition,
            starting_price,
            start_time,
            end_time,
            seller: seller_id.to_string(),
            campus: self.campus.trim().to_string(),
            images: self.images,
        })
    }

    #[allow(clippy::type_complexity)]
    fn checked(
        &self,
    ) -> Result<(Condition, f64, DateTime<Utc>, DateTime<Utc>), FieldErrors> {
        let mut errors = FieldErrors::default();
        if !min_chars(self.title.trim(), 3) {
            errors.add("title", "Title must be at least 3 characters");
        }
        if !min_chars(self.campus.trim(), 3) {
            errors.add("campus", "Campus is required");
        }
        if !min_chars(self.description.trim(), 10) {
            errors.add("description", "Description must be at least 10 characters");
        }
        if self.category.trim().is_empty() {
            errors.add("category", "Please select a category");
        }

        let condition = self.condition.as_deref().and_then(Condition::parse);
        if condition.is_none() {
            errors.add("condition", "Please select a condition");
        }

        let starting_price = self
            .starting_price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0);
        if starting_price.is_none() {
            errors.add("startingprice", "Starting price must be greater than 0");
        }

        if self.start_time.is_none() {
            errors.add("startdate", "Start date is required");
        }
        if self.end_time.is_none() {
            errors.add("enddate", "End date is required");
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end <= start {
                errors.add("enddate", "End date must be after the start date");
            }
        }

        if self.images.is_empty() {
            errors.add("images", "Please add at least one image");
        }

        match (condition, starting_price, self.start_time, self.end_time) {
            (Some(condition), Some(price), Some(start), Some(end)) if errors.is_empty() => {
                Ok((condition, price, start, end))
            }
            _ => Err(errors),
        }
    }
}
// endregion: --- Forms
