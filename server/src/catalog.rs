//! Read-only unit and item catalog, plus the decks players can queue with.
//!
//! A catalog is loaded once at startup (built in, or from a JSON document) and
//! shared between rooms behind an `Arc`. Nothing mutates it during a match.

use crate::entity::UnitStats;
use log::warn;
use serde::Deserialize;
use shared::{CardDefinition, MAX_DECK_SIZE};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

// Lower bounds applied after equipment modifiers. Balance values, see DESIGN.md.
pub const MIN_HP: f32 = 1.0;
pub const MIN_ATTACK_SPEED: f32 = 0.1;
pub const MIN_MOVE_SPEED: f32 = 0.5;
pub const MIN_RANGE: f32 = 0.5;
pub const MIN_DAMAGE: f32 = 0.0;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// Base stats for a unit kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTemplate {
    pub id: String,
    pub cost: f32,
    pub hp: f32,
    pub damage: f32,
    pub attack_speed: f32,
    pub range: f32,
    pub aggro_range: f32,
    pub move_speed: f32,
    pub radius: f32,
}

/// Additive stat changes granted by an item.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatModifiers {
    pub hp: f32,
    pub damage: f32,
    pub attack_speed: f32,
    pub range: f32,
    pub move_speed: f32,
}

impl StatModifiers {
    fn add(&self, other: &StatModifiers) -> StatModifiers {
        StatModifiers {
            hp: self.hp + other.hp,
            damage: self.damage + other.damage,
            attack_speed: self.attack_speed + other.attack_speed,
            range: self.range + other.range,
            move_speed: self.move_speed + other.move_speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    pub id: String,
    /// Extra mana the item adds to a card's cost.
    pub weight: f32,
    #[serde(default)]
    pub modifiers: StatModifiers,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Deck {
    pub id: String,
    pub cards: Vec<CardDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    units: Vec<UnitTemplate>,
    #[serde(default)]
    items: Vec<ItemTemplate>,
    decks: Vec<Deck>,
    default_deck: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    units: HashMap<String, UnitTemplate>,
    items: HashMap<String, ItemTemplate>,
    decks: Vec<Deck>,
    default_deck: String,
}

impl Catalog {
    /// Parses and validates a JSON catalog document.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        let units: HashMap<String, UnitTemplate> = document
            .units
            .into_iter()
            .map(|unit| (unit.id.clone(), unit))
            .collect();
        let items: HashMap<String, ItemTemplate> = document
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        for deck in &document.decks {
            if deck.cards.is_empty() || deck.cards.len() > MAX_DECK_SIZE {
                return Err(CatalogError::Invalid(format!(
                    "deck '{}' has {} cards, expected 1 to {}",
                    deck.id,
                    deck.cards.len(),
                    MAX_DECK_SIZE
                )));
            }
            for card in &deck.cards {
                if !units.contains_key(&card.unit_id) {
                    return Err(CatalogError::Invalid(format!(
                        "deck '{}' references unknown unit '{}'",
                        deck.id, card.unit_id
                    )));
                }
            }
        }

        if !document.decks.iter().any(|d| d.id == document.default_deck) {
            return Err(CatalogError::Invalid(format!(
                "default deck '{}' is not defined",
                document.default_deck
            )));
        }

        Ok(Catalog {
            units,
            items,
            decks: document.decks,
            default_deck: document.default_deck,
        })
    }

    /// The catalog shipped with the server.
    pub fn builtin() -> Self {
        let unit = |id: &str, cost, hp, damage, attack_speed, range, aggro_range, move_speed, radius| {
            UnitTemplate {
                id: id.to_string(),
                cost,
                hp,
                damage,
                attack_speed,
                range,
                aggro_range,
                move_speed,
                radius,
            }
        };
        let item = |id: &str, weight, modifiers| ItemTemplate {
            id: id.to_string(),
            weight,
            modifiers,
        };

        let units = vec![
            unit("knight", 3.0, 600.0, 75.0, 0.9, 0.5, 5.5, 1.5, 0.5),
            unit("archer", 3.0, 250.0, 50.0, 1.1, 5.0, 6.5, 1.5, 0.4),
            unit("giant", 5.0, 2000.0, 120.0, 0.67, 0.5, 1.0, 1.0, 0.8),
            unit("goblin", 2.0, 160.0, 50.0, 1.5, 0.5, 5.5, 2.5, 0.35),
            unit("musketeer", 4.0, 340.0, 100.0, 0.9, 6.0, 6.5, 1.5, 0.45),
            unit("mini_pekka", 4.0, 700.0, 325.0, 0.55, 0.5, 5.5, 2.0, 0.5),
            unit("skeleton", 1.0, 70.0, 40.0, 1.0, 0.5, 5.0, 2.5, 0.3),
            unit("valkyrie", 4.0, 1100.0, 120.0, 0.7, 0.5, 5.5, 1.5, 0.55),
        ];

        let items = vec![
            item(
                "iron_helm",
                1.0,
                StatModifiers {
                    hp: 150.0,
                    move_speed: -0.2,
                    ..StatModifiers::default()
                },
            ),
            item(
                "swift_boots",
                1.0,
                StatModifiers {
                    move_speed: 0.5,
                    ..StatModifiers::default()
                },
            ),
            item(
                "war_axe",
                2.0,
                StatModifiers {
                    damage: 40.0,
                    attack_speed: -0.1,
                    ..StatModifiers::default()
                },
            ),
            item(
                "long_bow",
                1.0,
                StatModifiers {
                    range: 1.5,
                    ..StatModifiers::default()
                },
            ),
            item(
                "berserker_charm",
                2.0,
                StatModifiers {
                    hp: -100.0,
                    attack_speed: 0.4,
                    ..StatModifiers::default()
                },
            ),
        ];

        let decks = vec![
            Deck {
                id: "starter".to_string(),
                cards: vec![
                    CardDefinition::new("knight", &[]),
                    CardDefinition::new("archer", &[]),
                    CardDefinition::new("giant", &[]),
                    CardDefinition::new("goblin", &[]),
                    CardDefinition::new("musketeer", &[]),
                    CardDefinition::new("mini_pekka", &[]),
                    CardDefinition::new("skeleton", &[]),
                    CardDefinition::new("valkyrie", &[]),
                ],
            },
            Deck {
                id: "armored".to_string(),
                cards: vec![
                    CardDefinition::new("knight", &["iron_helm"]),
                    CardDefinition::new("archer", &["long_bow"]),
                    CardDefinition::new("giant", &[]),
                    CardDefinition::new("goblin", &["swift_boots"]),
                    CardDefinition::new("musketeer", &[]),
                    CardDefinition::new("mini_pekka", &["war_axe"]),
                    CardDefinition::new("skeleton", &[]),
                    CardDefinition::new("valkyrie", &["berserker_charm"]),
                ],
            },
        ];

        Catalog {
            units: units.into_iter().map(|u| (u.id.clone(), u)).collect(),
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            decks,
            default_deck: "starter".to_string(),
        }
    }

    pub fn unit(&self, unit_id: &str) -> Option<&UnitTemplate> {
        self.units.get(unit_id)
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemTemplate> {
        self.items.get(item_id)
    }

    /// Looks up a deck by id, or the default deck when no id is given.
    pub fn deck(&self, deck_id: Option<&str>) -> Option<&Deck> {
        let wanted = deck_id.unwrap_or(&self.default_deck);
        self.decks.iter().find(|deck| deck.id == wanted)
    }

    pub fn default_deck(&self) -> &[CardDefinition] {
        self.deck(None).map(|deck| deck.cards.as_slice()).unwrap_or(&[])
    }

    fn equipped_items<'a>(&'a self, equipment: &'a [String]) -> impl Iterator<Item = &'a ItemTemplate> + 'a {
        equipment.iter().filter_map(move |item_id| {
            let item = self.items.get(item_id);
            if item.is_none() {
                warn!("Ignoring unknown item '{}'", item_id);
            }
            item
        })
    }

    /// Base cost plus the weight of every known equipped item.
    pub fn card_cost(&self, template: &UnitTemplate, equipment: &[String]) -> f32 {
        template.cost
            + self
                .equipped_items(equipment)
                .map(|item| item.weight)
                .sum::<f32>()
    }

    /// Sums item modifiers onto the base stats and applies the stat floors.
    pub fn build_stats(&self, template: &UnitTemplate, equipment: &[String]) -> UnitStats {
        let modifiers = self
            .equipped_items(equipment)
            .fold(StatModifiers::default(), |acc, item| acc.add(&item.modifiers));

        let max_hp = (template.hp + modifiers.hp).max(MIN_HP);

        UnitStats {
            current_hp: max_hp,
            max_hp,
            damage: (template.damage + modifiers.damage).max(MIN_DAMAGE),
            attack_speed: (template.attack_speed + modifiers.attack_speed).max(MIN_ATTACK_SPEED),
            range: (template.range + modifiers.range).max(MIN_RANGE),
            aggro_range: template.aggro_range,
            move_speed: (template.move_speed + modifiers.move_speed).max(MIN_MOVE_SPEED),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
