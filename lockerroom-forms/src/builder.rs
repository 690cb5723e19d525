//! Evaluation template builder.
//!
//! The builder owns an ordered list of fields. Position in the list and
//! `order_index` always agree, and indices are contiguous from zero: every
//! edit that changes order renumbers before returning. Field ids never
//! change once assigned.

use lockerroom_core::{
    EntityIdType, EvaluationTemplate, FieldId, FieldKind, FormField, TemplateDraft,
};

use crate::error::{FormError, FormErrors};
use crate::validation::validate_template;

#[derive(Debug, Clone, PartialEq)]
pub struct FormBuilder {
    title: String,
    description: Option<String>,
    fields: Vec<FormField>,
}

impl Default for FormBuilder {
    fn default() -> Self {
        Self::new("")
    }
}

impl FormBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Start editing an existing template. Fields are put in `order_index`
    /// order and renumbered, so gaps or duplicates from the server are
    /// normalized away.
    pub fn from_template(template: &EvaluationTemplate) -> Self {
        let mut fields = template.fields.clone();
        fields.sort_by_key(|field| field.order_index);
        let mut builder = Self {
            title: template.title.clone(),
            description: template.description.clone(),
            fields,
        };
        builder.renumber();
        builder
    }

    // ------------------------------------------------------------------------
    // Template metadata
    // ------------------------------------------------------------------------

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description.filter(|d| !d.trim().is_empty());
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&FormField> {
        self.fields.get(index)
    }

    pub fn position(&self, id: FieldId) -> Option<usize> {
        self.fields.iter().position(|field| field.id == id)
    }

    // ------------------------------------------------------------------------
    // Adding and removing fields
    // ------------------------------------------------------------------------

    /// Append a field and return its id.
    pub fn add_field(&mut self, label: impl Into<String>, kind: FieldKind) -> FieldId {
        let field = new_field(self.fields.len(), label.into(), kind);
        let id = field.id;
        self.fields.push(field);
        id
    }

    /// Insert a field at `index`, shifting later fields down.
    pub fn insert_field(
        &mut self,
        index: usize,
        label: impl Into<String>,
        kind: FieldKind,
    ) -> Result<FieldId, FormError> {
        if index > self.fields.len() {
            return Err(self.out_of_bounds(index));
        }
        let field = new_field(index, label.into(), kind);
        let id = field.id;
        self.fields.insert(index, field);
        self.renumber();
        Ok(id)
    }

    /// Remove the field at `index`. Later fields move up by one.
    pub fn remove_field(&mut self, index: usize) -> Result<FormField, FormError> {
        if index >= self.fields.len() {
            return Err(self.out_of_bounds(index));
        }
        let removed = self.fields.remove(index);
        self.renumber();
        Ok(removed)
    }

    pub fn remove_by_id(&mut self, id: FieldId) -> Option<FormField> {
        let index = self.position(id)?;
        self.remove_field(index).ok()
    }

    // ------------------------------------------------------------------------
    // Reordering
    // ------------------------------------------------------------------------

    /// Move the field at `index` one place earlier. Returns false if it is
    /// already first.
    pub fn move_up(&mut self, index: usize) -> Result<bool, FormError> {
        if index >= self.fields.len() {
            return Err(self.out_of_bounds(index));
        }
        if index == 0 {
            return Ok(false);
        }
        self.swap(index - 1, index)?;
        Ok(true)
    }

    /// Move the field at `index` one place later. Returns false if it is
    /// already last.
    pub fn move_down(&mut self, index: usize) -> Result<bool, FormError> {
        if index >= self.fields.len() {
            return Err(self.out_of_bounds(index));
        }
        if index + 1 == self.fields.len() {
            return Ok(false);
        }
        self.swap(index, index + 1)?;
        Ok(true)
    }

    /// Exchange the positions of two fields. Their ids stay with them; their
    /// order indices are exchanged.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), FormError> {
        let len = self.fields.len();
        for index in [a, b] {
            if index >= len {
                return Err(self.out_of_bounds(index));
            }
        }
        self.fields.swap(a, b);
        self.renumber();
        Ok(())
    }

    /// Move a field from `from` to `to`, shifting the fields in between.
    pub fn move_field(&mut self, from: usize, to: usize) -> Result<(), FormError> {
        let len = self.fields.len();
        for index in [from, to] {
            if index >= len {
                return Err(self.out_of_bounds(index));
            }
        }
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        self.renumber();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Field settings
    // ------------------------------------------------------------------------

    pub fn set_label(&mut self, index: usize, label: impl Into<String>) -> Result<(), FormError> {
        self.field_mut(index)?.label = label.into();
        Ok(())
    }

    pub fn set_required(&mut self, index: usize, required: bool) -> Result<(), FormError> {
        self.field_mut(index)?.required = required;
        Ok(())
    }

    pub fn set_help_text(&mut self, index: usize, help: Option<String>) -> Result<(), FormError> {
        self.field_mut(index)?.help_text = help.filter(|h| !h.trim().is_empty());
        Ok(())
    }

    /// Change a field's type. Switching between choice types keeps the
    /// options already entered.
    pub fn set_kind(&mut self, index: usize, mut kind: FieldKind) -> Result<(), FormError> {
        let field = self.field_mut(index)?;
        if let (Some(existing), Some(target)) = (field.kind.options(), kind.options_mut()) {
            if target.is_empty() {
                *target = existing.clone();
            }
        }
        field.kind = kind;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------------

    /// Append an option to a choice field and return its position.
    pub fn add_option(
        &mut self,
        field_index: usize,
        option: impl Into<String>,
    ) -> Result<usize, FormError> {
        let options = self.options_mut(field_index)?;
        options.push(option);
        Ok(options.len() - 1)
    }

    pub fn update_option(
        &mut self,
        field_index: usize,
        option_index: usize,
        option: impl Into<String>,
    ) -> Result<(), FormError> {
        let options = self.options_mut(field_index)?;
        let len = options.len();
        let slot = options
            .get_mut(option_index)
            .ok_or(FormError::IndexOutOfBounds {
                index: option_index,
                len,
            })?;
        *slot = option.into();
        Ok(())
    }

    pub fn remove_option(
        &mut self,
        field_index: usize,
        option_index: usize,
    ) -> Result<String, FormError> {
        let options = self.options_mut(field_index)?;
        let len = options.len();
        options
            .remove(option_index)
            .ok_or(FormError::IndexOutOfBounds {
                index: option_index,
                len,
            })
    }

    // ------------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------------

    pub fn validate(&self) -> Result<(), FormErrors> {
        validate_template(&self.title, &self.fields)
    }

    /// Validated payload for create/replace.
    pub fn to_draft(&self) -> Result<TemplateDraft, FormErrors> {
        self.validate()?;
        Ok(TemplateDraft {
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            fields: self
                .fields
                .iter()
                .cloned()
                .map(|mut field| {
                    field.label = field.label.trim().to_string();
                    if let Some(options) = field.kind.options_mut() {
                        let trimmed: Vec<String> =
                            options.iter().map(|o| o.trim().to_string()).collect();
                        *options = trimmed.into();
                    }
                    field
                })
                .collect(),
        })
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn renumber(&mut self) {
        for (index, field) in self.fields.iter_mut().enumerate() {
            field.order_index = index as u32;
        }
    }

    fn field_mut(&mut self, index: usize) -> Result<&mut FormField, FormError> {
        let len = self.fields.len();
        self.fields
            .get_mut(index)
            .ok_or(FormError::IndexOutOfBounds { index, len })
    }

    fn options_mut(
        &mut self,
        field_index: usize,
    ) -> Result<&mut lockerroom_core::ChoiceOptions, FormError> {
        self.field_mut(field_index)?
            .kind
            .options_mut()
            .ok_or(FormError::NotAChoiceField { field_index })
    }

    fn out_of_bounds(&self, index: usize) -> FormError {
        FormError::IndexOutOfBounds {
            index,
            len: self.fields.len(),
        }
    }
}

fn new_field(order_index: usize, label: String, kind: FieldKind) -> FormField {
    FormField {
        id: FieldId::now_v7(),
        order_index: order_index as u32,
        label,
        required: false,
        help_text: None,
        kind,
    }
}
