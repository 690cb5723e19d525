//! LockerRoom Forms - Evaluation Template Authoring
//!
//! [`FormBuilder`] edits an ordered list of fields. After every edit the
//! field at position `i` has `order_index == i`, so indices are always
//! contiguous from zero and field ids never move between positions.
//!
//! ```text
//! FormBuilder (edit: add / insert / move / remove / options)
//!     ↓
//! validate_template (collects every problem, indexed by field/option)
//!     ↓
//! TemplateDraft (trimmed payload for the API)
//! ```
//!
//! Submitted answers are checked separately with [`validate_answers`].

pub mod builder;
pub mod error;
pub mod response;
pub mod validation;

pub use builder::FormBuilder;
pub use error::{locate, FieldLocation, FormError, FormErrors};
pub use response::validate_answers;
pub use validation::{validate_field, validate_template};
