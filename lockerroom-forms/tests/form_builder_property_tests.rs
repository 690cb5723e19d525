//! Property-Based Tests for the Form Builder
//!
//! Property: after any sequence of edits, field `i` has `order_index == i`
//! and no two fields share an id.

use lockerroom_core::{ChoiceOptions, FieldId, FieldKind};
use lockerroom_forms::{FormBuilder, FormError};
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// GENERATORS
// ============================================================================

fn arb_kind() -> impl Strategy<Value = FieldKind> {
    prop_oneof![
        Just(FieldKind::text()),
        (2u8..=10).prop_map(FieldKind::rating),
        Just(FieldKind::numeric()),
        Just(FieldKind::Date),
        Just(FieldKind::dropdown(ChoiceOptions::from(&["Yes", "No"][..]))),
        Just(FieldKind::single_choice(ChoiceOptions::from(&["A", "B", "C"][..]))),
    ]
}

fn arb_builder() -> impl Strategy<Value = FormBuilder> {
    prop::collection::vec(("[A-Z][a-z]{2,8}", arb_kind()), 1..12).prop_map(|fields| {
        let mut builder = FormBuilder::new("Combine");
        for (label, kind) in fields {
            builder.add_field(label, kind);
        }
        builder
    })
}

#[derive(Debug, Clone)]
enum Edit {
    Add(String),
    Insert(usize, String),
    Remove(usize),
    MoveUp(usize),
    MoveDown(usize),
    Move(usize, usize),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(Edit::Add),
        (0usize..16, "[a-z]{1,6}").prop_map(|(i, l)| Edit::Insert(i, l)),
        (0usize..16).prop_map(Edit::Remove),
        (0usize..16).prop_map(Edit::MoveUp),
        (0usize..16).prop_map(Edit::MoveDown),
        (0usize..16, 0usize..16).prop_map(|(a, b)| Edit::Move(a, b)),
    ]
}

fn apply(builder: &mut FormBuilder, edit: Edit) {
    // Out-of-range edits are rejected without changing anything.
    let before = builder.fields().to_vec();
    let rejected = match edit {
        Edit::Add(label) => {
            builder.add_field(label, FieldKind::text());
            false
        }
        Edit::Insert(i, label) => builder.insert_field(i, label, FieldKind::text()).is_err(),
        Edit::Remove(i) => builder.remove_field(i).is_err(),
        Edit::MoveUp(i) => builder.move_up(i).is_err(),
        Edit::MoveDown(i) => builder.move_down(i).is_err(),
        Edit::Move(a, b) => builder.move_field(a, b).is_err(),
    };
    if rejected {
        assert_eq!(builder.fields(), before.as_slice());
    }
}

fn assert_contiguous(builder: &FormBuilder) {
    let mut ids = HashSet::new();
    for (position, field) in builder.fields().iter().enumerate() {
        assert_eq!(field.order_index as usize, position);
        assert!(ids.insert(field.id), "duplicate field id {}", field.id);
    }
}

fn ids(builder: &FormBuilder) -> Vec<FieldId> {
    builder.fields().iter().map(|f| f.id).collect()
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Moving a field up and then back down restores the original order.
    #[test]
    fn prop_move_up_then_down_restores(builder in arb_builder(), pick in any::<prop::sample::Index>()) {
        let mut builder = builder;
        let original = builder.fields().to_vec();
        let index = pick.index(builder.len());

        let moved = builder.move_up(index).unwrap();
        prop_assert_eq!(moved, index > 0);
        assert_contiguous(&builder);
        if moved {
            prop_assert_eq!(builder.fields()[index - 1].id, original[index].id);
            builder.move_down(index - 1).unwrap();
        }
        prop_assert_eq!(builder.fields(), original.as_slice());
    }

    /// Deleting any field leaves the rest contiguous and in their old
    /// relative order.
    #[test]
    fn prop_remove_renumbers(builder in arb_builder(), pick in any::<prop::sample::Index>()) {
        let mut builder = builder;
        let mut expected = ids(&builder);
        let index = pick.index(builder.len());

        let removed = builder.remove_field(index).unwrap();
        prop_assert_eq!(removed.id, expected.remove(index));
        prop_assert_eq!(ids(&builder), expected);
        assert_contiguous(&builder);
    }

    /// Arbitrary edit sequences never break the ordering invariant.
    #[test]
    fn prop_edits_keep_indices_contiguous(
        builder in arb_builder(),
        edits in prop::collection::vec(arb_edit(), 0..40),
    ) {
        let mut builder = builder;
        for edit in edits {
            apply(&mut builder, edit);
            assert_contiguous(&builder);
        }
    }

    /// A choice field with no options blocks saving and names the field.
    #[test]
    fn prop_empty_dropdown_is_rejected(builder in arb_builder(), label in "[A-Z][a-z]{2,8}") {
        let mut builder = builder;
        builder.add_field(label.clone(), FieldKind::dropdown(ChoiceOptions::default()));
        let index = builder.len() - 1;

        let errors = builder.to_draft().unwrap_err();
        prop_assert_eq!(
            errors.errors(),
            &[FormError::MissingOptions { field_index: index, label }][..]
        );
    }
}
