pub mod attribute_editor;

pub use attribute_editor::{character_value, numeric_value, AttributeTable};
