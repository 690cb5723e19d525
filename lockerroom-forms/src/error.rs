//! Form authoring errors.
//!
//! Every variant that concerns one field carries that field's position, and
//! option-level variants also carry the option's position, so an editor can
//! highlight the exact input.

use lockerroom_core::{FieldError, LockerRoomError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormError {
    #[error("Template title is required")]
    EmptyTitle,

    #[error("Template must have at least one field")]
    NoFields,

    #[error("Field {field_index} needs a label")]
    EmptyLabel { field_index: usize },

    #[error("Field {field_index} ({label}) needs at least one option")]
    MissingOptions { field_index: usize, label: String },

    #[error("Option {option_index} of field {field_index} is empty")]
    EmptyOption {
        field_index: usize,
        option_index: usize,
    },

    #[error("Option {option_index} of field {field_index} repeats \"{option}\"")]
    DuplicateOption {
        field_index: usize,
        option_index: usize,
        option: String,
    },

    #[error("Field {field_index} has rating range {min}..={max}; min must be below max")]
    InvalidRatingRange { field_index: usize, min: u8, max: u8 },

    #[error("Field {field_index} has numeric range {min}..={max}; bounds must be finite and min must not exceed max")]
    InvalidNumericRange {
        field_index: usize,
        min: f64,
        max: f64,
    },

    #[error("Field {field_index} allows {max_selections} selections out of {options} options")]
    InvalidSelectionLimit {
        field_index: usize,
        max_selections: u32,
        options: usize,
    },

    #[error("Field {field_index} has order index {order_index}")]
    OrderMismatch { field_index: usize, order_index: u32 },

    #[error("Field {field_index} reuses the id of field {first_index}")]
    DuplicateFieldId {
        field_index: usize,
        first_index: usize,
    },

    #[error("Field {field_index} is not a choice field")]
    NotAChoiceField { field_index: usize },

    #[error("Index {index} is out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

impl FormError {
    /// Input path the error belongs to, e.g. `fields.2.options.0`.
    pub fn path(&self) -> String {
        match self {
            Self::EmptyTitle => "title".to_string(),
            Self::NoFields => "fields".to_string(),
            Self::EmptyOption {
                field_index,
                option_index,
            }
            | Self::DuplicateOption {
                field_index,
                option_index,
                ..
            } => format!("fields.{field_index}.options.{option_index}"),
            Self::MissingOptions { field_index, .. }
            | Self::InvalidSelectionLimit { field_index, .. } => {
                format!("fields.{field_index}.options")
            }
            Self::EmptyLabel { field_index } => format!("fields.{field_index}.label"),
            Self::InvalidRatingRange { field_index, .. }
            | Self::InvalidNumericRange { field_index, .. }
            | Self::OrderMismatch { field_index, .. }
            | Self::DuplicateFieldId { field_index, .. }
            | Self::NotAChoiceField { field_index } => format!("fields.{field_index}"),
            Self::IndexOutOfBounds { .. } => "fields".to_string(),
        }
    }

    pub fn field_index(&self) -> Option<usize> {
        match self {
            Self::EmptyLabel { field_index }
            | Self::MissingOptions { field_index, .. }
            | Self::EmptyOption { field_index, .. }
            | Self::DuplicateOption { field_index, .. }
            | Self::InvalidRatingRange { field_index, .. }
            | Self::InvalidNumericRange { field_index, .. }
            | Self::InvalidSelectionLimit { field_index, .. }
            | Self::OrderMismatch { field_index, .. }
            | Self::DuplicateFieldId { field_index, .. }
            | Self::NotAChoiceField { field_index } => Some(*field_index),
            Self::EmptyTitle | Self::NoFields | Self::IndexOutOfBounds { .. } => None,
        }
    }

    pub fn to_field_error(&self) -> FieldError {
        FieldError::new(self.path(), self.to_string())
    }
}

/// Every problem found in one validation pass.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Template has {} problem(s)", .0.len())]
pub struct FormErrors(pub Vec<FormError>);

impl FormErrors {
    pub fn errors(&self) -> &[FormError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Errors attached to the field at `field_index`.
    pub fn for_field(&self, field_index: usize) -> impl Iterator<Item = &FormError> {
        self.0
            .iter()
            .filter(move |err| err.field_index() == Some(field_index))
    }
}

impl From<FormError> for FormErrors {
    fn from(err: FormError) -> Self {
        Self(vec![err])
    }
}

impl From<FormErrors> for LockerRoomError {
    fn from(errors: FormErrors) -> Self {
        let message = match errors.0.as_slice() {
            [only] => only.to_string(),
            _ => errors.to_string(),
        };
        LockerRoomError::validation(
            message,
            errors.0.iter().map(FormError::to_field_error).collect(),
        )
    }
}

/// Where a server-reported field error points inside a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLocation {
    pub field_index: usize,
    pub option_index: Option<usize>,
}

/// Parse a `fields.<i>[.options.<j>]` path, as used by both this crate and
/// the API's validation responses.
pub fn locate(error: &FieldError) -> Option<FieldLocation> {
    let mut parts = error.field.split(['.', '[', ']']).filter(|p| !p.is_empty());
    if parts.next()? != "fields" {
        return None;
    }
    let field_index = parts.next()?.parse().ok()?;
    let option_index = match (parts.next(), parts.next()) {
        (Some("options"), Some(index)) => index.parse().ok(),
        _ => None,
    };
    Some(FieldLocation {
        field_index,
        option_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_indexed() {
        let err = FormError::EmptyOption {
            field_index: 2,
            option_index: 0,
        };
        assert_eq!(err.path(), "fields.2.options.0");
        assert_eq!(err.field_index(), Some(2));
        assert_eq!(FormError::EmptyTitle.path(), "title");
    }

    #[test]
    fn test_locate_accepts_both_notations() {
        let dotted = FieldError::new("fields.3.options.1", "blank");
        assert_eq!(
            locate(&dotted),
            Some(FieldLocation {
                field_index: 3,
                option_index: Some(1)
            })
        );

        let bracketed = FieldError::new("fields[4].label", "required");
        assert_eq!(
            locate(&bracketed),
            Some(FieldLocation {
                field_index: 4,
                option_index: None
            })
        );

        assert_eq!(locate(&FieldError::new("title", "required")), None);
    }

    #[test]
    fn test_into_validation_error_keeps_every_field() {
        let errors = FormErrors(vec![
            FormError::EmptyTitle,
            FormError::MissingOptions {
                field_index: 1,
                label: "Position".to_string(),
            },
        ]);
        let err: LockerRoomError = errors.into();
        let fields = err.field_errors();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].field, "fields.1.options");
        assert!(fields[1].message.contains("Position"));
    }
}
