//! Source entity: `{ id, name }`, fixed cardinality 8 (spec.md §3).

use super::field::{Assignment, Field};
use super::identifier::{Identifier, IdentifierRange};
use crate::error::Result;

pub struct SourceRange;
impl IdentifierRange for SourceRange {
    const MAX: u8 = 8;
}

#[derive(Debug, Clone)]
pub struct Source {
    id: Identifier,
    name: Field<String>,
}

impl Source {
    pub(crate) fn new(id: Identifier) -> Self {
        Source {
            id,
            name: Field::new(),
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn name(&self) -> Result<&str> {
        self.name.get().map(String::as_str)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<Assignment> {
        self.name.set(name.into())
    }
}

/// The fixed collection of 8 sources, created at model construction and
/// never destroyed (spec.md §3).
#[derive(Debug, Clone)]
pub struct Sources {
    entries: Vec<Source>,
}

impl Sources {
    pub(crate) fn new() -> Self {
        Sources {
            entries: (SourceRange::MIN..=SourceRange::MAX)
                .map(|raw| Source::new(Identifier::new(raw)))
                .collect(),
        }
    }

    pub fn validate_identifier(&self, id: Identifier) -> Result<()> {
        SourceRange::validate_identifier(id)
    }

    pub fn get(&self, id: Identifier) -> Result<&Source> {
        self.validate_identifier(id)?;
        Ok(&self.entries[(id.get() - SourceRange::MIN) as usize])
    }

    pub fn get_mut(&mut self, id: Identifier) -> Result<&mut Source> {
        self.validate_identifier(id)?;
        Ok(&mut self.entries[(id.get() - SourceRange::MIN) as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.entries.iter()
    }
}
