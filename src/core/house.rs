//! Houses (player factions) and the house types ("countries") behind them

use crate::core::{DocEntity, EntityId};
use serde::{Deserialize, Serialize};

/// A player-like faction instance
///
/// Other entities refer to a house by `name`, not by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    pub id: EntityId,

    /// Unique name, also the cross-reference key
    pub name: String,

    /// Allied house names; the house itself is always the first element
    pub alliances: Vec<String>,

    pub color: String,
    pub credits: i32,
    pub tech_level: u8,

    /// Backing country
    pub house_type: Option<EntityId>,
}

impl House {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        let name = name.into();
        House {
            id,
            alliances: vec![name.clone()],
            name,
            color: "Grey".to_string(),
            credits: 0,
            tech_level: 10,
            house_type: None,
        }
    }

    pub fn with_house_type(mut self, house_type: EntityId) -> Self {
        self.house_type = Some(house_type);
        self
    }

    /// Alliance list in its INI form (`Self,Ally1,Ally2`)
    pub fn alliances_string(&self) -> String {
        self.alliances.join(",")
    }

    /// Replace alliances from the INI form, keeping self first
    pub fn set_alliances_from_str(&mut self, s: &str) {
        let mut list = vec![self.name.clone()];
        list.extend(
            s.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty() && *n != self.name)
                .map(str::to_string),
        );
        self.alliances = list;
    }

    pub fn is_allied_with(&self, other: &str) -> bool {
        self.alliances.iter().any(|a| a == other)
    }
}

impl DocEntity for House {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The country a house is built on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseType {
    pub id: EntityId,
    pub name: String,
    /// Side index (0 = Allied, 1 = Soviet, 2 = Yuri in the stock rules)
    pub side: u8,
    pub color: String,
}

impl HouseType {
    pub fn new(id: EntityId, name: impl Into<String>, side: u8) -> Self {
        HouseType {
            id,
            name: name.into(),
            side,
            color: "Grey".to_string(),
        }
    }
}

impl DocEntity for HouseType {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_house_allies_itself() {
        let house = House::new(EntityId::new(1), "Americans");
        assert_eq!(house.alliances, vec!["Americans".to_string()]);
        assert!(house.is_allied_with("Americans"));
    }

    #[test]
    fn test_alliance_parsing_keeps_self_first() {
        let mut house = House::new(EntityId::new(1), "Americans");
        house.set_alliances_from_str("British, Americans,,French");
        assert_eq!(house.alliances_string(), "Americans,British,French");
    }
}
