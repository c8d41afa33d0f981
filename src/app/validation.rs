use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Password,
    Title,
    Content,
    General,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum AuthMode {
    #[default]
    #[strum(serialize = "login")]
    Login,
    #[strum(serialize = "signup")]
    Signup,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        }
    }

    pub fn is_signup(self) -> bool {
        matches!(self, AuthMode::Signup)
    }
}

/// Per-field messages in the order they were raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: IndexMap<Field, String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.entries.contains_key(&field)
    }

    pub fn general(&self) -> Option<&str> {
        self.get(Field::General)
    }

    pub fn set(&mut self, field: Field, message: impl Into<String>) {
        self.entries.insert(field, message.into());
    }

    pub fn remove(&mut self, field: Field) {
        self.entries.shift_remove(&field);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn general_only(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.set(Field::General, message);
        errors
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.entries.iter().map(|(field, msg)| (*field, msg.as_str()))
    }
}

pub const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email pattern"));

pub fn is_plausible_email(input: &str) -> bool {
    EMAIL_PATTERN.is_match(input)
}

pub fn validate_auth(mode: AuthMode, name: &str, email: &str, password: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    if email.is_empty() {
        errors.set(Field::Email, "Email is required");
    } else if !is_plausible_email(email) {
        errors.set(Field::Email, "Email is invalid");
    }

    if password.is_empty() {
        errors.set(Field::Password, "Password is required");
    }
    if mode.is_signup() && name.is_empty() {
        errors.set(Field::Name, "Name is required");
    }
    // the length rule replaces "required" when both apply
    if mode.is_signup() && password.chars().count() < MIN_PASSWORD_CHARS {
        errors.set(
            Field::Password,
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters"),
        );
    }
    errors
}

pub fn validate_note(title: &str, content: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    if title.trim().is_empty() {
        errors.set(Field::Title, "Title is required");
    }
    if content.trim().is_empty() {
        errors.set(Field::Content, "Content is required");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_emails_without_user_domain_and_tld() {
        for email in ["plain", "a@b", "@b.com", "a@.com", "a b@c d", "a@b."] {
            let errors = validate_auth(AuthMode::Login, "", email, "secret1");
            assert_eq!(
                errors.get(Field::Email),
                Some("Email is invalid"),
                "expected {email:?} to be rejected"
            );
        }
    }

    #[test]
    fn accepts_simple_email_shape() {
        let errors = validate_auth(AuthMode::Login, "", "a@b.com", "x");
        assert!(errors.is_empty(), "got {errors:?}");
    }

    #[test]
    fn missing_email_is_required_not_invalid() {
        let errors = validate_auth(AuthMode::Login, "", "", "secret1");
        assert_eq!(errors.get(Field::Email), Some("Email is required"));
    }

    #[test]
    fn login_does_not_enforce_password_length_or_name() {
        let errors = validate_auth(AuthMode::Login, "", "a@b.com", "abc");
        assert!(errors.is_empty());
    }

    #[test]
    fn signup_password_length_boundary() {
        for password in ["", "a", "abcde", "ünïcö"] {
            let errors = validate_auth(AuthMode::Signup, "Ann", "a@b.com", password);
            assert_eq!(
                errors.get(Field::Password),
                Some("Password must be at least 6 characters"),
                "password {password:?}"
            );
        }
        for password in ["abcdef", "secret1", "ünïcöd"] {
            let errors = validate_auth(AuthMode::Signup, "Ann", "a@b.com", password);
            assert!(!errors.contains(Field::Password), "password {password:?}");
        }
    }

    #[test]
    fn signup_requires_name() {
        let errors = validate_auth(AuthMode::Signup, "", "a@b.com", "secret1");
        assert_eq!(errors.get(Field::Name), Some("Name is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn note_fields_must_have_visible_text() {
        let errors = validate_note("  ", "\n\t");
        assert_eq!(errors.get(Field::Title), Some("Title is required"));
        assert_eq!(errors.get(Field::Content), Some("Content is required"));

        assert!(validate_note(" Title ", "body").is_empty());
    }

    #[test]
    fn field_names_render_lowercase() {
        assert_eq!(Field::General.as_ref(), "general");
        assert_eq!(Field::Email.to_string(), "email");
        assert_eq!("password".parse::<Field>().ok(), Some(Field::Password));
        assert_eq!(AuthMode::Signup.to_string(), "signup");
    }
}
