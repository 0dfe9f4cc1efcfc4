//! Event records as they move through the pipeline.
//!
//! [`RawEvent`] is the row discovered by the listing scrape and, after
//! deduplication and detail merging, the record handed to the flattener.
//! [`FlattenedEvent`] is the normalized record that gets persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One event row, before or after deduplication and detail merging.
///
/// Wire names follow the scraper output (`eventID`, `eventType`); `id` and
/// `type` are accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "eventID", alias = "id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "eventType",
        alias = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(flatten)]
    pub details: EventDetails,
}

/// A deduplicated event has the same shape as a raw one; only the id set
/// is unique.
pub type DeduplicatedEvent = RawEvent;

impl RawEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn has_start(&self) -> bool {
        self.start.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Returns a copy of this record with every key of `data` written over
    /// it. Arrays and objects replace the existing value wholesale. The id
    /// never changes; `id` and `eventID` keys in `data` are dropped.
    ///
    /// # Errors
    ///
    /// Fails if the overlaid object no longer forms a valid record, e.g. a
    /// detail payload that sets `start` to a number.
    pub fn overlay(&self, data: &Map<String, Value>) -> serde_json::Result<RawEvent> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (key, value) in data {
            match key.as_str() {
                // the id is what the document was matched on
                "id" | "eventID" => {}
                "type" => {
                    fields.insert("eventType".to_string(), value.clone());
                }
                _ => {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }

        serde_json::from_value(Value::Object(fields))
    }
}

/// Every field a detail scraper is known to produce, plus the consolidated
/// keys of an already flattened record.
///
/// Values stay loosely typed: each producer shapes its payload differently
/// and the flattener only needs to move them into buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    // pokemon sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawns: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incense_encounters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costumed_pokemon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon_debuts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pokemon_debuts: Option<Value>,

    // raids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bosses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternation_pattern: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_attacks: Option<Value>,

    // go battle league
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leagues: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_attack: Option<Value>,

    // team go rocket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_pokemon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaders: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub giovanni: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grunts: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eggs: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_disclaimers: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lure_module_bonus: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_bonuses: Option<Value>,

    // research
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_research_tasks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialresearch: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timed_research: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_breakthrough: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masterwork_research: Option<Value>,

    // tickets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticketed_research: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_add_ons: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokestop_showcases: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shinies: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shiny_debuts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photobomb: Option<Value>,

    // seasons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_days: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_battle_league: Option<Value>,

    // go pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_pass: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_tasks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_pokemon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_bonuses: Option<Value>,

    // go tour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habitats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whats_new: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_sections: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_battles: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mondays: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_shiny: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<Value>,

    // consolidated keys of an already flattened record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pokemon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raids: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raid_alternation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raid_featured_attacks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battle: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rocket: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewards: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showcases: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Value>,

    // generic page flags, superseded by computed flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_spawns: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_field_research_tasks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_raids: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_eggs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_shiny: Option<Value>,

    /// Keys no known producer emits. Carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A supplementary payload scraped from one event's detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl DetailDocument {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data,
        }
    }

    pub fn detail_kind(&self) -> DetailKind {
        DetailKind::from_tag(&self.kind)
    }
}

/// The detail scrapers whose output is merged onto events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailKind {
    Generic,
    ResearchBreakthrough,
    SpotlightHour,
    CommunityDay,
    RaidBattles,
    RaidHour,
    RaidDay,
    TeamGoRocket,
    GoRocketTakeover,
    GoBattleLeague,
    Season,
    GoTour,
    TimedResearch,
    SpecialResearch,
    MaxBattles,
    MaxMondays,
    GoPass,
    PokestopShowcase,
    Research,
    Event,
    PromoCodes,
    Other(String),
}

impl DetailKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "generic" => Self::Generic,
            "research-breakthrough" => Self::ResearchBreakthrough,
            "pokemon-spotlight-hour" => Self::SpotlightHour,
            "community-day" => Self::CommunityDay,
            "raid-battles" => Self::RaidBattles,
            "raid-hour" => Self::RaidHour,
            "raid-day" => Self::RaidDay,
            "team-go-rocket" => Self::TeamGoRocket,
            "go-rocket-takeover" => Self::GoRocketTakeover,
            "go-battle-league" => Self::GoBattleLeague,
            "season" => Self::Season,
            "pokemon-go-tour" => Self::GoTour,
            "timed-research" => Self::TimedResearch,
            "special-research" => Self::SpecialResearch,
            "max-battles" => Self::MaxBattles,
            "max-mondays" => Self::MaxMondays,
            "go-pass" => Self::GoPass,
            "pokestop-showcase" => Self::PokestopShowcase,
            "research" => Self::Research,
            "event" => Self::Event,
            "promo-codes" => Self::PromoCodes,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// Where a flattened Pokémon entry was listed on the event page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PokemonSource {
    Spawn,
    Featured,
    Incense,
    Costumed,
    Debut,
    MaxDebut,
}

/// One Pokémon in the `pokemon` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonEntry {
    pub name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
    pub source: PokemonSource,
}

impl PokemonEntry {
    /// Builds an entry from a scraped Pokémon object, tagging it with
    /// `source`. Returns `None` for anything without a non-empty `name`.
    pub fn tagged(value: &Value, source: PokemonSource) -> Option<Self> {
        let mut attributes = value.as_object()?.clone();
        let name = match attributes.shift_remove("name") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return None,
        };
        attributes.shift_remove("source");

        Some(Self {
            name,
            attributes,
            source,
        })
    }

    /// Reads an entry that was already flattened (carries its own `source`).
    pub fn parse(value: &Value) -> Option<Self> {
        serde_json::from_value::<Self>(value.clone())
            .ok()
            .filter(|p| !p.name.is_empty())
    }
}

/// Content presence summary, derived from the flattened buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFlags {
    pub has_spawns: bool,
    pub has_field_research_tasks: bool,
    pub has_bonuses: bool,
    pub has_raids: bool,
    pub has_eggs: bool,
    pub has_shiny: bool,
    pub has_showcases: bool,
    pub has_rocket: bool,
    pub has_battle: bool,
    pub has_research: bool,
    pub has_rewards: bool,
}

impl EventFlags {
    pub fn any(&self) -> bool {
        self.has_spawns
            || self.has_field_research_tasks
            || self.has_bonuses
            || self.has_raids
            || self.has_eggs
            || self.has_shiny
            || self.has_showcases
            || self.has_rocket
            || self.has_battle
            || self.has_research
            || self.has_rewards
    }
}

/// The persisted, normalized event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlattenedEvent {
    #[serde(rename = "eventID")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "eventType", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(flatten)]
    pub content: EventContent,
}

impl FlattenedEvent {
    /// Reads this event back as a raw record, the way the next run sees
    /// the previous run's output.
    pub fn to_raw(&self) -> serde_json::Result<RawEvent> {
        RawEvent::from_value(serde_json::to_value(self)?)
    }
}

/// Normalized content buckets. Every bucket is omitted when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pokemon: Vec<PokemonEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raids: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raid_alternation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raid_featured_attacks: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub battle: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub rocket: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eggs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_disclaimers: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lure_module_bonus: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub research: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub rewards: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showcases: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shinies: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shiny_debuts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photobomb: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_days: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_battle_league: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_pass: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_tasks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_pokemon: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_bonuses: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habitats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whats_new: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_sections: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_battles: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mondays: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_shiny: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<EventFlags>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
