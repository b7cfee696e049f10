use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Entities;

/// Entity type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Date,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Person,
        EntityType::Organization,
        EntityType::Location,
        EntityType::Date,
    ];
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Person => write!(f, "PERSON"),
            EntityType::Organization => write!(f, "ORGANIZATION"),
            EntityType::Location => write!(f, "LOCATION"),
            EntityType::Date => write!(f, "DATE"),
        }
    }
}

impl TryFrom<&str> for EntityType {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "PERSON" | "PERSONS" => Ok(EntityType::Person),
            "ORGANIZATION" | "ORGANIZATIONS" => Ok(EntityType::Organization),
            "LOCATION" | "LOCATIONS" => Ok(EntityType::Location),
            "DATE" | "DATES" => Ok(EntityType::Date),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

impl Entities {
    pub fn of_type(&self, entity_type: EntityType) -> &[String] {
        match entity_type {
            EntityType::Person => &self.persons,
            EntityType::Organization => &self.organizations,
            EntityType::Location => &self.locations,
            EntityType::Date => &self.dates,
        }
    }

    /// Flattens the groups into `(type, name)` pairs, one row per mention.
    pub fn rows(&self) -> Vec<(EntityType, &str)> {
        EntityType::ALL
            .iter()
            .flat_map(|t| self.of_type(*t).iter().map(move |name| (*t, name.as_str())))
            .collect()
    }
}
