//! Favorite entity: `{ id, name }` (spec.md §3).

use super::field::{Assignment, Field};
use super::identifier::{Identifier, IdentifierRange};
use crate::error::Result;

pub struct FavoriteRange;
impl IdentifierRange for FavoriteRange {
    const MAX: u8 = 8;
}

#[derive(Debug, Clone)]
pub struct Favorite {
    id: Identifier,
    name: Field<String>,
}

impl Favorite {
    pub(crate) fn new(id: Identifier) -> Self {
        Favorite {
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

#[derive(Debug, Clone)]
pub struct Favorites {
    entries: Vec<Favorite>,
}

impl Favorites {
    pub(crate) fn new() -> Self {
        Favorites {
            entries: (FavoriteRange::MIN..=FavoriteRange::MAX)
                .map(|raw| Favorite::new(Identifier::new(raw)))
                .collect(),
        }
    }

    pub fn validate_identifier(&self, id: Identifier) -> Result<()> {
        FavoriteRange::validate_identifier(id)
    }

    pub fn get(&self, id: Identifier) -> Result<&Favorite> {
        self.validate_identifier(id)?;
        Ok(&self.entries[(id.get() - FavoriteRange::MIN) as usize])
    }

    pub fn get_mut(&mut self, id: Identifier) -> Result<&mut Favorite> {
        self.validate_identifier(id)?;
        Ok(&mut self.entries[(id.get() - FavoriteRange::MIN) as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Favorite> {
        self.entries.iter()
    }
}
