use serde::{Deserialize, Serialize};
use thiserror::Error;

const SLOT_PREFIX: &str = "slot";
const LABEL_PREFIX: &str = "furniture:";

/// A placeholder inside a room, parsed from a node name such as
/// `slot_chair_01`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotDescriptor {
    /// The node name as authored.
    pub name: String,
    /// First segment after `slot_`; never empty.
    pub category: String,
}

/// Why a `slot_`-looking name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotNameError {
    /// Nothing after the prefix, as in `slot` or `slotchair`.
    #[error("no category segment")]
    MissingCategory,
    /// The segment after `slot_` is blank, as in `slot_` or `slot__x`.
    #[error("empty category")]
    EmptyCategory,
}

impl SlotDescriptor {
    /// Parse `slot_<category>[_<suffix>]*`; the `slot` prefix is matched
    /// without regard to case.
    pub fn parse(name: &str) -> Result<Self, SlotNameError> {
        let mut parts = name.split('_');
        let head = parts.next().unwrap_or_default();
        if !head.eq_ignore_ascii_case(SLOT_PREFIX) {
            return Err(SlotNameError::MissingCategory);
        }
        let category = parts.next().ok_or(SlotNameError::MissingCategory)?.trim();
        if category.is_empty() {
            return Err(SlotNameError::EmptyCategory);
        }
        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
        })
    }

    /// Whether `name` is meant to be a slot marker at all.
    ///
    /// Any name starting with `slot`, in any case, counts. Names such as
    /// `slotchair`, `slots` or `Slotted_rail` are therefore reported as
    /// malformed slots instead of being skipped silently.
    pub fn is_marker(name: &str) -> bool {
        name.get(..SLOT_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(SLOT_PREFIX))
    }

    /// Label whose assets may fill this slot.
    pub fn label(&self) -> String {
        format!("{}{}", LABEL_PREFIX, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_ignored() {
        let slot = SlotDescriptor::parse("slot_chair_01").expect("parse");
        assert_eq!(slot.category, "chair");
        assert_eq!(slot.label(), "furniture:chair");
    }

    #[test]
    fn bare_category() {
        assert_eq!(SlotDescriptor::parse("slot_table").expect("parse").category, "table");
    }

    #[test]
    fn prefix_is_case_insensitive() {
        assert_eq!(SlotDescriptor::parse("SLOT_Lamp_a").expect("parse").category, "Lamp");
    }

    #[test]
    fn malformed_names_are_rejected() {
        assert_eq!(SlotDescriptor::parse("slotchair"), Err(SlotNameError::MissingCategory));
        assert_eq!(SlotDescriptor::parse("slot"), Err(SlotNameError::MissingCategory));
        assert_eq!(SlotDescriptor::parse("slot_"), Err(SlotNameError::EmptyCategory));
        assert_eq!(SlotDescriptor::parse("slot__01"), Err(SlotNameError::EmptyCategory));
    }

    #[test]
    fn marker_detection() {
        assert!(SlotDescriptor::is_marker("Slotchair"));
        assert!(SlotDescriptor::is_marker("slot_"));
        assert!(SlotDescriptor::is_marker("slots"));
        assert!(SlotDescriptor::parse("Slotted_rail").is_err());
        assert!(!SlotDescriptor::is_marker("floor"));
    }
}
