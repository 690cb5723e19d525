//! Checking a filled-in evaluation against its template.

use std::collections::HashMap;

use lockerroom_core::{
    AnswerValue, EvaluationTemplate, FieldAnswer, FieldError, FieldId, FieldKind, FormField,
    LockerRoomError, LockerRoomResult,
};

/// Validate `answers` against `template`. Field errors are keyed by field
/// id so they can be mapped back onto the inputs that produced them.
pub fn validate_answers(
    template: &EvaluationTemplate,
    answers: &[FieldAnswer],
) -> LockerRoomResult<()> {
    let fields: HashMap<FieldId, &FormField> =
        template.fields.iter().map(|f| (f.id, f)).collect();
    let mut answered: HashMap<FieldId, &AnswerValue> = HashMap::new();
    let mut errors = Vec::new();

    for answer in answers {
        let key = answer.field_id.to_string();
        let Some(field) = fields.get(&answer.field_id) else {
            errors.push(FieldError::new(key, "Answer does not match any field"));
            continue;
        };
        if answered.insert(answer.field_id, &answer.value).is_some() {
            errors.push(FieldError::new(key, format!("{} is answered twice", field.label)));
            continue;
        }
        if let Some(message) = check_value(field, &answer.value) {
            errors.push(FieldError::new(key, message));
        }
    }

    let mut ordered: Vec<&FormField> = template.fields.iter().collect();
    ordered.sort_by_key(|f| f.order_index);
    for field in ordered {
        if field.required && answered.get(&field.id).map_or(true, |v| is_blank(v)) {
            errors.push(FieldError::new(
                field.id.to_string(),
                format!("{} is required", field.label),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let message = if errors.len() == 1 {
            errors[0].message.clone()
        } else {
            format!("{} answers need attention", errors.len())
        };
        Err(LockerRoomError::validation(message, errors))
    }
}

fn is_blank(value: &AnswerValue) -> bool {
    match value {
        AnswerValue::Text(text) | AnswerValue::Choice(text) => text.trim().is_empty(),
        AnswerValue::Choices(choices) => choices.is_empty(),
        AnswerValue::Rating(_) | AnswerValue::Number(_) | AnswerValue::Date(_) => false,
    }
}

/// Type and range check for one answer. `None` means the value is fine.
fn check_value(field: &FormField, value: &AnswerValue) -> Option<String> {
    let label = &field.label;
    match (&field.kind, value) {
        (FieldKind::Text { max_length, .. }, AnswerValue::Text(text)) => match max_length {
            Some(limit) if text.chars().count() > *limit as usize => {
                Some(format!("{label} must be at most {limit} characters"))
            }
            _ => None,
        },
        (FieldKind::Rating { min, max }, AnswerValue::Rating(rating)) => {
            (rating < min || rating > max)
                .then(|| format!("{label} must be between {min} and {max}"))
        }
        (
            FieldKind::SingleChoice { options } | FieldKind::Dropdown { options },
            AnswerValue::Choice(choice),
        ) => (!choice.is_empty() && !options.contains(choice))
            .then(|| format!("\"{choice}\" is not an option for {label}")),
        (
            FieldKind::MultiChoice {
                options,
                max_selections,
            },
            AnswerValue::Choices(choices),
        ) => {
            if let Some(bad) = choices.iter().find(|c| !options.contains(c)) {
                return Some(format!("\"{bad}\" is not an option for {label}"));
            }
            let mut unique = choices.clone();
            unique.sort();
            unique.dedup();
            if unique.len() != choices.len() {
                return Some(format!("{label} has a repeated selection"));
            }
            match max_selections {
                Some(limit) if choices.len() > *limit as usize => {
                    Some(format!("{label} allows at most {limit} selections"))
                }
                _ => None,
            }
        }
        (FieldKind::Numeric { min, max }, AnswerValue::Number(number)) => {
            if !number.is_finite() {
                return Some(format!("{label} must be a number"));
            }
            match (min, max) {
                (Some(min), _) if number < min => Some(format!("{label} must be at least {min}")),
                (_, Some(max)) if number > max => Some(format!("{label} must be at most {max}")),
                _ => None,
            }
        }
        (FieldKind::Date, AnswerValue::Date(_)) => None,
        (kind, _) => Some(format!("{label} expects a {} answer", kind.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lockerroom_core::{ChoiceOptions, EntityIdType, TemplateId, UserId};

    fn template() -> EvaluationTemplate {
        let field = |order_index: u32, label: &str, required: bool, kind: FieldKind| FormField {
            id: FieldId::now_v7(),
            order_index,
            label: label.to_string(),
            required,
            help_text: None,
            kind,
        };
        EvaluationTemplate {
            id: TemplateId::now_v7(),
            title: "Tryout".to_string(),
            description: None,
            school_id: None,
            fields: vec![
                field(0, "Speed", true, FieldKind::rating(5)),
                field(
                    1,
                    "Position",
                    true,
                    FieldKind::dropdown(ChoiceOptions::from(&["Guard", "Forward"][..])),
                ),
                field(
                    2,
                    "Skills",
                    false,
                    FieldKind::MultiChoice {
                        options: ChoiceOptions::from(&["Pass", "Shoot", "Defend"][..]),
                        max_selections: Some(2),
                    },
                ),
                field(
                    3,
                    "Vertical",
                    false,
                    FieldKind::Numeric {
                        min: Some(0.0),
                        max: Some(60.0),
                    },
                ),
                field(4, "Tested on", false, FieldKind::Date),
            ],
            created_by: UserId::now_v7(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn answer(template: &EvaluationTemplate, index: usize, value: AnswerValue) -> FieldAnswer {
        FieldAnswer {
            field_id: template.fields[index].id,
            value,
        }
    }

    #[test]
    fn test_complete_answers_pass() {
        let t = template();
        let answers = vec![
            answer(&t, 0, AnswerValue::Rating(4)),
            answer(&t, 1, AnswerValue::Choice("Guard".to_string())),
            answer(&t, 2, AnswerValue::Choices(vec!["Pass".to_string()])),
            answer(&t, 3, AnswerValue::Number(31.5)),
            answer(
                &t,
                4,
                AnswerValue::Date(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()),
            ),
        ];
        assert!(validate_answers(&t, &answers).is_ok());
    }

    #[test]
    fn test_missing_required_answer() {
        let t = template();
        let answers = vec![answer(&t, 0, AnswerValue::Rating(3))];
        let err = validate_answers(&t, &answers).unwrap_err();
        let fields = err.field_errors();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, t.fields[1].id.to_string());
        assert_eq!(fields[0].message, "Position is required");
    }

    #[test]
    fn test_out_of_range_and_wrong_type() {
        let t = template();
        let answers = vec![
            answer(&t, 0, AnswerValue::Rating(9)),
            answer(&t, 1, AnswerValue::Number(1.0)),
        ];
        let err = validate_answers(&t, &answers).unwrap_err();
        let messages: Vec<&str> = err.field_errors().iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"Speed must be between 1 and 5"));
        assert!(messages.contains(&"Position expects a dropdown answer"));
    }

    #[test]
    fn test_multi_choice_limits() {
        let t = template();
        let too_many = vec![
            answer(&t, 0, AnswerValue::Rating(3)),
            answer(&t, 1, AnswerValue::Choice("Guard".to_string())),
            answer(
                &t,
                2,
                AnswerValue::Choices(vec![
                    "Pass".to_string(),
                    "Shoot".to_string(),
                    "Defend".to_string(),
                ]),
            ),
        ];
        let err = validate_answers(&t, &too_many).unwrap_err();
        assert_eq!(err.field_errors()[0].message, "Skills allows at most 2 selections");
    }

    #[test]
    fn test_unknown_and_duplicate_answers() {
        let t = template();
        let answers = vec![
            answer(&t, 0, AnswerValue::Rating(3)),
            answer(&t, 0, AnswerValue::Rating(4)),
            answer(&t, 1, AnswerValue::Choice("Guard".to_string())),
            FieldAnswer {
                field_id: FieldId::now_v7(),
                value: AnswerValue::Text("?".to_string()),
            },
        ];
        let err = validate_answers(&t, &answers).unwrap_err();
        assert_eq!(err.field_errors().len(), 2);
    }
}
