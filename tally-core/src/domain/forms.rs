//! Touched/error form state shared by the auth screens
//!
//! Errors are tracked per field but only surfaced once the field has been
//! touched (blurred, or the form submitted). Editing a touched field
//! re-validates that field alone.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;

use super::result::Error;
use super::validation::{
    validate_confirm_password, validate_email, validate_full_name, validate_login_password,
    validate_new_password,
};

/// Form-level message shown when submission is blocked
pub const FIX_ERRORS_MESSAGE: &str = "Please fix the errors above";

/// Field set and rules of one form
pub trait FormSchema: Default + Clone {
    type Field: Copy + Ord + Hash + fmt::Debug + 'static;

    /// Every field, in display order
    fn fields() -> &'static [Self::Field];

    fn label(field: Self::Field) -> &'static str;

    /// Whether input for the field should be masked
    fn is_secret(_field: Self::Field) -> bool {
        false
    }

    fn value(&self, field: Self::Field) -> &str;

    fn set(&mut self, field: Self::Field, value: String);

    /// Validate one field against the current values
    fn validate(&self, field: Self::Field) -> Option<String>;
}

/// Submission failure: the form message plus each field's error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormError<F> {
    pub message: String,
    pub fields: Vec<(F, String)>,
}

impl<F> fmt::Display for FormError<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (_, err) in &self.fields {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}

impl<F> From<FormError<F>> for Error {
    fn from(e: FormError<F>) -> Self {
        let details: Vec<String> = e.fields.into_iter().map(|(_, msg)| msg).collect();
        Error::Validation(format!("{}: {}", e.message, details.join("; ")))
    }
}

/// Form state machine
#[derive(Debug, Clone, Default)]
pub struct Form<S: FormSchema> {
    values: S,
    touched: BTreeSet<S::Field>,
    errors: BTreeMap<S::Field, String>,
}

impl<S: FormSchema> Form<S> {
    pub fn new() -> Self {
        Self {
            values: S::default(),
            touched: BTreeSet::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn values(&self) -> &S {
        &self.values
    }

    pub fn value(&self, field: S::Field) -> &str {
        self.values.value(field)
    }

    /// Store a value; re-validate it only if the field was already touched
    pub fn change(&mut self, field: S::Field, value: impl Into<String>) {
        self.values.set(field, value.into());
        if self.touched.contains(&field) {
            self.revalidate(field);
        }
    }

    /// Mark the field touched and validate it
    pub fn blur(&mut self, field: S::Field) {
        self.touched.insert(field);
        self.revalidate(field);
    }

    /// Touch and validate every field
    pub fn submit(&mut self) -> std::result::Result<S, FormError<S::Field>> {
        for field in S::fields() {
            self.touched.insert(*field);
            self.revalidate(*field);
        }

        if self.errors.is_empty() {
            return Ok(self.values.clone());
        }

        let fields = S::fields()
            .iter()
            .filter_map(|f| self.errors.get(f).map(|e| (*f, e.clone())))
            .collect();
        Err(FormError {
            message: FIX_ERRORS_MESSAGE.to_string(),
            fields,
        })
    }

    pub fn is_touched(&self, field: S::Field) -> bool {
        self.touched.contains(&field)
    }

    /// The error to display for a field, hidden until it is touched
    pub fn visible_error(&self, field: S::Field) -> Option<&str> {
        if !self.touched.contains(&field) {
            return None;
        }
        self.errors.get(&field).map(String::as_str)
    }

    fn revalidate(&mut self, field: S::Field) {
        match self.values.validate(field) {
            Some(err) => {
                self.errors.insert(field, err);
            }
            None => {
                self.errors.remove(&field);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl FormSchema for LoginForm {
    type Field = LoginField;

    fn is_secret(field: LoginField) -> bool {
        matches!(field, LoginField::Password)
    }

    fn fields() -> &'static [LoginField] {
        &[LoginField::Email, LoginField::Password]
    }

    fn label(field: LoginField) -> &'static str {
        match field {
            LoginField::Email => "Email",
            LoginField::Password => "Password",
        }
    }

    fn value(&self, field: LoginField) -> &str {
        match field {
            LoginField::Email => &self.email,
            LoginField::Password => &self.password,
        }
    }

    fn set(&mut self, field: LoginField, value: String) {
        match field {
            LoginField::Email => self.email = value,
            LoginField::Password => self.password = value,
        }
    }

    fn validate(&self, field: LoginField) -> Option<String> {
        match field {
            LoginField::Email => validate_email(&self.email),
            LoginField::Password => validate_login_password(&self.password),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignUpField {
    FullName,
    Email,
    Password,
    ConfirmPassword,
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl FormSchema for SignUpForm {
    type Field = SignUpField;

    fn is_secret(field: SignUpField) -> bool {
        matches!(field, SignUpField::Password | SignUpField::ConfirmPassword)
    }

    fn fields() -> &'static [SignUpField] {
        &[
            SignUpField::FullName,
            SignUpField::Email,
            SignUpField::Password,
            SignUpField::ConfirmPassword,
        ]
    }

    fn label(field: SignUpField) -> &'static str {
        match field {
            SignUpField::FullName => "Full name",
            SignUpField::Email => "Email",
            SignUpField::Password => "Password",
            SignUpField::ConfirmPassword => "Confirm password",
        }
    }

    fn value(&self, field: SignUpField) -> &str {
        match field {
            SignUpField::FullName => &self.full_name,
            SignUpField::Email => &self.email,
            SignUpField::Password => &self.password,
            SignUpField::ConfirmPassword => &self.confirm_password,
        }
    }

    fn set(&mut self, field: SignUpField, value: String) {
        match field {
            SignUpField::FullName => self.full_name = value,
            SignUpField::Email => self.email = value,
            SignUpField::Password => self.password = value,
            SignUpField::ConfirmPassword => self.confirm_password = value,
        }
    }

    fn validate(&self, field: SignUpField) -> Option<String> {
        match field {
            SignUpField::FullName => validate_full_name(&self.full_name),
            SignUpField::Email => validate_email(&self.email),
            SignUpField::Password => validate_new_password(&self.password),
            SignUpField::ConfirmPassword => {
                validate_confirm_password(&self.confirm_password, &self.password)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResetPasswordField {
    Password,
    ConfirmPassword,
}

#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

impl FormSchema for ResetPasswordForm {
    type Field = ResetPasswordField;

    fn is_secret(_field: ResetPasswordField) -> bool {
        true
    }

    fn fields() -> &'static [ResetPasswordField] {
        &[ResetPasswordField::Password, ResetPasswordField::ConfirmPassword]
    }

    fn label(field: ResetPasswordField) -> &'static str {
        match field {
            ResetPasswordField::Password => "New password",
            ResetPasswordField::ConfirmPassword => "Confirm password",
        }
    }

    fn value(&self, field: ResetPasswordField) -> &str {
        match field {
            ResetPasswordField::Password => &self.password,
            ResetPasswordField::ConfirmPassword => &self.confirm_password,
        }
    }

    fn set(&mut self, field: ResetPasswordField, value: String) {
        match field {
            ResetPasswordField::Password => self.password = value,
            ResetPasswordField::ConfirmPassword => self.confirm_password = value,
        }
    }

    fn validate(&self, field: ResetPasswordField) -> Option<String> {
        match field {
            ResetPasswordField::Password => validate_new_password(&self.password),
            ResetPasswordField::ConfirmPassword => {
                validate_confirm_password(&self.confirm_password, &self.password)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ForgotPasswordField {
    Email,
}

#[derive(Debug, Clone, Default)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl FormSchema for ForgotPasswordForm {
    type Field = ForgotPasswordField;

    fn fields() -> &'static [ForgotPasswordField] {
        &[ForgotPasswordField::Email]
    }

    fn label(_field: ForgotPasswordField) -> &'static str {
        "Email"
    }

    fn value(&self, _field: ForgotPasswordField) -> &str {
        &self.email
    }

    fn set(&mut self, _field: ForgotPasswordField, value: String) {
        self.email = value;
    }

    fn validate(&self, _field: ForgotPasswordField) -> Option<String> {
        validate_email(&self.email)
    }
}
