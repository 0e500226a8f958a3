//! Field-level validation errors
//!
//! Errors are data, not `Err`s: validation collects every violation into an
//! [`ErrorList`] so a caller sees all of them in one response.

use std::fmt;

/// Dotted path to a field, e.g. `credentials.username`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![root.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    TooShort,
    TooLong,
    RegexMismatch,
    /// The rule itself is broken (e.g. a malformed pattern)
    InternalValidationError,
    ExtraFieldDisallowed,
    SensitiveFieldViolation,
    InvalidValueSource,
    RequiredFieldMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: FieldPath,
    pub kind: FieldErrorKind,
    /// Offending value, already rendered (literals quoted)
    pub value: String,
    pub detail: String,
}

impl FieldError {
    pub fn new(path: &FieldPath, kind: FieldErrorKind, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            kind,
            value: value.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldErrorKind::InternalValidationError => {
                write!(f, "{}: Internal error: {}", self.path, self.detail)
            }
            FieldErrorKind::RequiredFieldMissing => {
                write!(f, "{}: Required value: {}", self.path, self.detail)
            }
            _ => write!(f, "{}: Invalid value: {}: {}", self.path, self.value, self.detail),
        }
    }
}

impl std::error::Error for FieldError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn append(&mut self, mut other: ErrorList) {
        self.0.append(&mut other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn kinds(&self) -> Vec<FieldErrorKind> {
        self.0.iter().map(|e| e.kind).collect()
    }

    /// One message for the whole list: a single error verbatim, several as `[e1, e2]`
    pub fn to_aggregate(&self) -> Option<String> {
        match self.0.as_slice() {
            [] => None,
            [single] => Some(single.to_string()),
            many => {
                let joined: Vec<String> = many.iter().map(ToString::to_string).collect();
                Some(format!("[{}]", joined.join(", ")))
            }
        }
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<FieldError> for ErrorList {
    fn from_iter<T: IntoIterator<Item = FieldError>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = FieldPath::new("credentials").child("username");
        assert_eq!(path.to_string(), "credentials.username");
    }

    #[test]
    fn test_error_formats() {
        let path = FieldPath::new("test");
        let invalid = FieldError::new(&path, FieldErrorKind::TooShort, "\"12\"", "Value below MinLength");
        assert_eq!(invalid.to_string(), "test: Invalid value: \"12\": Value below MinLength");

        let internal = FieldError::new(&path, FieldErrorKind::InternalValidationError, "", "bad pattern");
        assert_eq!(internal.to_string(), "test: Internal error: bad pattern");

        let required = FieldError::new(&path, FieldErrorKind::RequiredFieldMissing, "", "field is required");
        assert_eq!(required.to_string(), "test: Required value: field is required");
    }

    #[test]
    fn test_aggregate() {
        let path = FieldPath::new("a");
        let mut list = ErrorList::new();
        assert_eq!(list.to_aggregate(), None);

        list.push(FieldError::new(&path, FieldErrorKind::TooLong, "\"x\"", "one"));
        assert_eq!(list.to_aggregate().unwrap(), "a: Invalid value: \"x\": one");

        list.push(FieldError::new(&path, FieldErrorKind::RegexMismatch, "\"x\"", "two"));
        assert_eq!(
            list.to_aggregate().unwrap(),
            "[a: Invalid value: \"x\": one, a: Invalid value: \"x\": two]"
        );
    }
}
