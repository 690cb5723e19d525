//! Evaluation template and answer types.
//!
//! These are the wire shapes. Authoring rules (ordering, renumbering,
//! save-time validation) live in `lockerroom-forms`.

use crate::identity::{EvaluationId, FieldId, SchoolId, TemplateId, Timestamp, UserId};
use crate::options::ChoiceOptions;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Field type plus its type-specific settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field_type", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
        #[serde(default)]
        multiline: bool,
    },
    Rating {
        min: u8,
        max: u8,
    },
    SingleChoice {
        #[serde(default)]
        options: ChoiceOptions,
    },
    MultiChoice {
        #[serde(default)]
        options: ChoiceOptions,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_selections: Option<u32>,
    },
    Dropdown {
        #[serde(default)]
        options: ChoiceOptions,
    },
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Date,
}

impl FieldKind {
    pub fn text() -> Self {
        Self::Text {
            max_length: None,
            multiline: false,
        }
    }

    pub fn rating(max: u8) -> Self {
        Self::Rating { min: 1, max }
    }

    pub fn dropdown(options: ChoiceOptions) -> Self {
        Self::Dropdown { options }
    }

    pub fn single_choice(options: ChoiceOptions) -> Self {
        Self::SingleChoice { options }
    }

    pub fn multi_choice(options: ChoiceOptions) -> Self {
        Self::MultiChoice {
            options,
            max_selections: None,
        }
    }

    pub fn numeric() -> Self {
        Self::Numeric {
            min: None,
            max: None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Rating { .. } => "rating",
            Self::SingleChoice { .. } => "single_choice",
            Self::MultiChoice { .. } => "multi_choice",
            Self::Dropdown { .. } => "dropdown",
            Self::Numeric { .. } => "numeric",
            Self::Date => "date",
        }
    }

    /// Choice-type fields must carry at least one option when saved.
    pub fn is_choice(&self) -> bool {
        self.options().is_some()
    }

    pub fn options(&self) -> Option<&ChoiceOptions> {
        match self {
            Self::SingleChoice { options }
            | Self::MultiChoice { options, .. }
            | Self::Dropdown { options } => Some(options),
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut ChoiceOptions> {
        match self {
            Self::SingleChoice { options }
            | Self::MultiChoice { options, .. }
            | Self::Dropdown { options } => Some(options),
            _ => None,
        }
    }
}

/// One field of an evaluation template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: FieldId,
    pub order_index: u32,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTemplate {
    pub id: TemplateId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub school_id: Option<SchoolId>,
    pub fields: Vec<FormField>,
    pub created_by: UserId,
    pub updated_at: Timestamp,
}

/// Payload for creating or replacing a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<FormField>,
}

/// A single answer value, typed by the field it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Rating(u8),
    Choice(String),
    Choices(Vec<String>),
    Number(f64),
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAnswer {
    pub field_id: FieldId,
    pub value: AnswerValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSubmission {
    pub id: EvaluationId,
    pub template_id: TemplateId,
    pub student_id: UserId,
    pub evaluator_id: UserId,
    pub answers: Vec<FieldAnswer>,
    pub submitted_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvaluation {
    pub template_id: TemplateId,
    pub student_id: UserId,
    pub answers: Vec<FieldAnswer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;

    #[test]
    fn test_field_round_trips_flat_shape() {
        let field = FormField {
            id: FieldId::now_v7(),
            order_index: 0,
            label: "Position".to_string(),
            required: true,
            help_text: None,
            kind: FieldKind::dropdown(ChoiceOptions::from(&["Guard", "Center"][..])),
        };
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["field_type"], "dropdown");
        assert_eq!(json["options"][1], "Center");

        let back: FormField = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_field_accepts_string_encoded_options() {
        let id = FieldId::now_v7();
        let json = serde_json::json!({
            "id": id,
            "order_index": 2,
            "label": "Dominant hand",
            "field_type": "single_choice",
            "options": "[\"Left\",\"Right\"]"
        });
        let field: FormField = serde_json::from_value(json).unwrap();
        assert_eq!(field.kind.options().map(|o| o.len()), Some(2));
        assert!(!field.required);
    }

    #[test]
    fn test_choice_classification() {
        assert!(FieldKind::dropdown(ChoiceOptions::default()).is_choice());
        assert!(FieldKind::multi_choice(ChoiceOptions::default()).is_choice());
        assert!(!FieldKind::text().is_choice());
        assert!(!FieldKind::Date.is_choice());
        assert_eq!(FieldKind::rating(5).type_name(), "rating");
    }

    #[test]
    fn test_answer_value_tagging() {
        let answer = AnswerValue::Rating(4);
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json, serde_json::json!({"type": "rating", "value": 4}));
    }
}
