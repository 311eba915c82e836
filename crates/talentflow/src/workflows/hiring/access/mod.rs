//! Caller capability resolution and the side/visibility policy derived from it.

mod context;
mod resolver;
pub mod visibility;

pub use context::{AccessContext, Role};
pub use resolver::AccessResolver;
pub use visibility::{
    allowed_creator_types, allowed_visibilities, sides_for, validate_note_author,
    visible_classes, ApplicationSides, AuthorshipViolation,
};
