//! Save-time template validation.

use std::collections::{HashMap, HashSet};

use lockerroom_core::{FieldId, FieldKind, FormField};

use crate::error::{FormError, FormErrors};

/// Check a template before it is sent to the server. Collects every problem
/// rather than stopping at the first.
pub fn validate_template(title: &str, fields: &[FormField]) -> Result<(), FormErrors> {
    let mut errors = Vec::new();

    if title.trim().is_empty() {
        errors.push(FormError::EmptyTitle);
    }
    if fields.is_empty() {
        errors.push(FormError::NoFields);
    }

    let mut seen_ids: HashMap<FieldId, usize> = HashMap::new();
    for (field_index, field) in fields.iter().enumerate() {
        if field.order_index as usize != field_index {
            errors.push(FormError::OrderMismatch {
                field_index,
                order_index: field.order_index,
            });
        }
        if let Some(&first_index) = seen_ids.get(&field.id) {
            errors.push(FormError::DuplicateFieldId {
                field_index,
                first_index,
            });
        } else {
            seen_ids.insert(field.id, field_index);
        }
        validate_field(field_index, field, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(problems = errors.len(), "Template failed validation");
        Err(FormErrors(errors))
    }
}

/// Problems with a single field, in the order an editor would show them.
pub fn validate_field(field_index: usize, field: &FormField, errors: &mut Vec<FormError>) {
    if field.label.trim().is_empty() {
        errors.push(FormError::EmptyLabel { field_index });
    }

    match &field.kind {
        FieldKind::Rating { min, max } if min >= max => {
            errors.push(FormError::InvalidRatingRange {
                field_index,
                min: *min,
                max: *max,
            });
        }
        FieldKind::Numeric { min, max } => {
            let finite = min.map_or(true, f64::is_finite) && max.map_or(true, f64::is_finite);
            let ordered = match (min, max) {
                (Some(min), Some(max)) => min <= max,
                _ => true,
            };
            if !finite || !ordered {
                errors.push(FormError::InvalidNumericRange {
                    field_index,
                    min: min.unwrap_or(f64::NEG_INFINITY),
                    max: max.unwrap_or(f64::INFINITY),
                });
            }
        }
        _ => {}
    }

    let Some(options) = field.kind.options() else {
        return;
    };
    if options.is_empty() {
        errors.push(FormError::MissingOptions {
            field_index,
            label: field.label.clone(),
        });
        return;
    }

    let mut seen = HashSet::new();
    for (option_index, option) in options.iter().enumerate() {
        let normalized = option.trim().to_lowercase();
        if normalized.is_empty() {
            errors.push(FormError::EmptyOption {
                field_index,
                option_index,
            });
        } else if !seen.insert(normalized) {
            errors.push(FormError::DuplicateOption {
                field_index,
                option_index,
                option: option.clone(),
            });
        }
    }

    if let FieldKind::MultiChoice {
        max_selections: Some(limit),
        ..
    } = &field.kind
    {
        if *limit == 0 || *limit as usize > options.len() {
            errors.push(FormError::InvalidSelectionLimit {
                field_index,
                max_selections: *limit,
                options: options.len(),
            });
        }
    }
}
