//! Account form handling
//!
//! The session itself is a server-side cookie; the client only ever holds the
//! credentials long enough to post them. Shape checks here run before any
//! network call.

use serde::{Deserialize, Serialize};

use crate::error::{LensError, Result};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Username/password pair posted to `user/login/`
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must be filled in
    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(LensError::Validation(
                "Please enter both username and password.".into(),
            ));
        }
        Ok(())
    }
}

/// Sign-up form as the user filled it in
#[derive(Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub password: String,
    #[serde(alias = "confirmPassword")]
    pub confirm_password: String,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Body posted to `user/register/`
#[derive(Clone, Serialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub password: String,
}

impl RegistrationForm {
    /// First failing check wins, in the order the form shows the fields
    pub fn validate(&self) -> Result<()> {
        if !self.email.contains('@') {
            return Err(LensError::Validation("Please enter a valid email address".into()));
        }
        if self.username.chars().count() < MIN_USERNAME_LEN {
            return Err(LensError::Validation(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters long"
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(LensError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        if self.password != self.confirm_password {
            return Err(LensError::Validation("Passwords do not match".into()));
        }
        Ok(())
    }

    /// Validated request body; the confirmation never leaves the client
    pub fn to_request(&self) -> Result<RegistrationRequest> {
        self.validate()?;
        let phone = self.phone_number.trim();
        Ok(RegistrationRequest {
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: (!phone.is_empty()).then(|| phone.to_string()),
            password: self.password.clone(),
        })
    }

    /// Credentials for the automatic login after sign-up
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

/// Flatten a field-error body (`{"email": ["taken"], "error": "..."}`) into
/// one `field: msg, msg` line per field.
pub fn flatten_field_errors(body: &serde_json::Value) -> Option<String> {
    let fields = body.as_object()?;
    let lines: Vec<String> = fields
        .iter()
        .map(|(field, messages)| {
            let joined = match messages {
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", "),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{field}: {joined}")
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}
