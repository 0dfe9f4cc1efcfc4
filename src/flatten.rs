//! Projects the many scraper-specific fields of an event into a fixed set
//! of content buckets.
//!
//! Flattening is idempotent: the output read back as a [`RawEvent`] and
//! flattened again yields the same record. The previous run's output is the
//! next run's base input, so this matters for every run, not just tests.

use serde_json::{Map, Value};
use tracing::debug;

use crate::model::{
    EventContent, EventDetails, EventFlags, FlattenedEvent, PokemonEntry, PokemonSource, RawEvent,
};
use crate::stats::RunStats;

/// Display labels for the keyed `tiers` form, in output order.
const TIER_LABELS: [(&str, &str); 4] = [
    ("mega", "Mega"),
    ("fiveStar", "5-Star"),
    ("threeStar", "3-Star"),
    ("oneStar", "1-Star"),
];

/// Flattens every record, counting how many were already flat.
pub fn flatten_all(events: &[RawEvent], stats: &mut RunStats) -> Vec<FlattenedEvent> {
    events
        .iter()
        .map(|event| {
            if is_flattened(&event.details) {
                stats.already_flattened += 1;
            }
            stats.flattened += 1;
            flatten(event)
        })
        .collect()
}

/// Flattens one event. Never fails: a record with no recognized content
/// flattens to its envelope.
pub fn flatten(event: &RawEvent) -> FlattenedEvent {
    let details = &event.details;

    let mut content = if is_flattened(details) {
        debug!(event_id = %event.id, "Event already flattened, carrying buckets");
        carried_buckets(details)
    } else {
        projected_buckets(details)
    };
    pass_through(details, &mut content);
    content.flags = Some(compute_flags(&content)).filter(EventFlags::any);

    FlattenedEvent {
        id: event.id.clone(),
        name: event.name.clone(),
        event_type: event.event_type.clone(),
        heading: event.heading.clone(),
        image: event.image.clone(),
        start: event.start.clone(),
        end: event.end.clone(),
        content,
    }
}

/// True when the record carries at least one consolidated bucket and none
/// of the raw keys those buckets are built from.
pub fn is_flattened(details: &EventDetails) -> bool {
    let consolidated = [
        &details.pokemon,
        &details.raids,
        &details.battle,
        &details.rocket,
        &details.research,
        &details.rewards,
    ];
    let raw = [
        &details.spawns,
        &details.featured,
        &details.incense_encounters,
        &details.costumed_pokemon,
        &details.pokemon_debuts,
        &details.max_pokemon_debuts,
        &details.bosses,
        &details.tiers,
    ];

    consolidated.iter().any(|v| v.is_some()) && raw.iter().all(|v| v.is_none())
}

/// Scraper truthiness: null, false, 0, "", [] and {} are empty.
pub fn present(value: &Option<Value>) -> bool {
    value.as_ref().is_some_and(truthy)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn non_empty(value: &Option<Value>) -> Option<Value> {
    if present(value) { value.clone() } else { None }
}

/// Eggs come either as a list or as a map of distance to list. Either shape
/// is kept as-is if it holds at least one egg.
pub fn eggs_bucket(eggs: &Option<Value>) -> Option<Value> {
    let has_eggs = match eggs.as_ref()? {
        Value::Array(list) => !list.is_empty(),
        Value::Object(by_distance) => by_distance
            .values()
            .any(|v| v.as_array().is_some_and(|a| !a.is_empty())),
        _ => false,
    };
    has_eggs.then(|| eggs.clone()).flatten()
}

/// Display label for a key of the keyed `tiers` form.
pub fn tier_label(key: &str) -> &str {
    TIER_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(key, |(_, label)| *label)
}

/// Derives the content flags from the flattened buckets.
pub fn compute_flags(content: &EventContent) -> EventFlags {
    let research_field = content
        .research
        .get("field")
        .is_some_and(|v| v.as_array().is_some_and(|a| !a.is_empty()));

    EventFlags {
        has_spawns: content
            .pokemon
            .iter()
            .any(|p| p.source == PokemonSource::Spawn),
        has_field_research_tasks: research_field,
        has_bonuses: present(&content.bonuses),
        has_raids: !content.raids.is_empty(),
        has_eggs: eggs_bucket(&content.eggs).is_some(),
        has_shiny: present(&content.shinies),
        has_showcases: present(&content.showcases),
        has_rocket: !content.rocket.is_empty(),
        has_battle: !content.battle.is_empty(),
        has_research: !content.research.is_empty(),
        has_rewards: !content.rewards.is_empty(),
    }
}

fn carried_buckets(d: &EventDetails) -> EventContent {
    EventContent {
        pokemon: carry_pokemon(&d.pokemon),
        raids: carry_list(&d.raids),
        battle: carry_object(&d.battle),
        rocket: carry_object(&d.rocket),
        research: carry_object(&d.research),
        rewards: carry_object(&d.rewards),
        ..Default::default()
    }
}

/// Rebuilds each bucket from raw keys when any of its raw keys is present,
/// otherwise carries the consolidated bucket found on the input.
fn projected_buckets(d: &EventDetails) -> EventContent {
    let pokemon_sources = [
        (&d.spawns, PokemonSource::Spawn),
        (&d.featured, PokemonSource::Featured),
        (&d.incense_encounters, PokemonSource::Incense),
        (&d.costumed_pokemon, PokemonSource::Costumed),
        (&d.pokemon_debuts, PokemonSource::Debut),
        (&d.max_pokemon_debuts, PokemonSource::MaxDebut),
    ];
    let pokemon = if pokemon_sources.iter().any(|(v, _)| v.is_some()) {
        collect_pokemon(&pokemon_sources)
    } else {
        carry_pokemon(&d.pokemon)
    };

    let raids = if d.bosses.is_some() || d.tiers.is_some() {
        collect_raids(&d.bosses, &d.tiers)
    } else {
        carry_list(&d.raids)
    };

    let battle = bucket(
        &d.battle,
        &[("leagues", &d.leagues), ("featuredAttack", &d.featured_attack)],
    );
    let rocket = bucket(
        &d.rocket,
        &[
            ("shadows", &d.shadow_pokemon),
            ("leaders", &d.leaders),
            ("giovanni", &d.giovanni),
            ("grunts", &d.grunts),
        ],
    );
    let research = bucket(
        &d.research,
        &[
            ("field", &d.field_research_tasks),
            ("special", &d.specialresearch),
            ("timed", &d.timed_research),
            ("breakthrough", &d.research_breakthrough),
            ("masterwork", &d.masterwork_research),
        ],
    );
    let rewards = bucket(
        &d.rewards,
        &[
            ("ticketedResearch", &d.ticketed_research),
            ("ticketBonuses", &d.ticket_bonuses),
            ("ticketPrice", &d.ticket_price),
            ("ticketAddOns", &d.ticket_add_ons),
        ],
    );

    EventContent {
        pokemon,
        raids,
        battle,
        rocket,
        research,
        rewards,
        ..Default::default()
    }
}

/// Fields copied under the same or a renamed key, on both paths.
fn pass_through(d: &EventDetails, content: &mut EventContent) {
    macro_rules! keep {
        ($field:ident) => {
            content.$field = non_empty(&d.$field);
        };
        ($field:ident, $raw:ident) => {
            content.$field = non_empty(&d.$raw).or_else(|| non_empty(&d.$field));
        };
    }

    keep!(raid_alternation, alternation_pattern);
    keep!(raid_featured_attacks, featured_attacks);
    keep!(showcases, pokestop_showcases);

    keep!(bonuses);
    keep!(bonus_disclaimers);
    keep!(lure_module_bonus);
    keep!(exclusive_bonuses);
    keep!(shinies);
    keep!(shiny_debuts);
    keep!(photobomb);
    keep!(community_days);
    keep!(features);
    keep!(go_battle_league);
    keep!(go_pass);
    keep!(pricing);
    keep!(point_tasks);
    keep!(ranks);
    keep!(featured_pokemon);
    keep!(milestone_bonuses);
    keep!(event_info);
    keep!(habitats);
    keep!(whats_new);
    keep!(sales);
    keep!(custom_sections);
    keep!(max_battles);
    keep!(max_mondays);
    keep!(description);
    keep!(bonus);

    content.eggs = eggs_bucket(&d.eggs);
    content.can_be_shiny = d.can_be_shiny.clone().filter(|v| !v.is_null());
    content.extra = d.extra.clone();
}

fn collect_pokemon(sources: &[(&Option<Value>, PokemonSource)]) -> Vec<PokemonEntry> {
    sources
        .iter()
        .filter_map(|&(value, source)| Some((value.as_ref()?.as_array()?, source)))
        .flat_map(|(list, source)| {
            list.iter()
                .filter_map(move |entry| PokemonEntry::tagged(entry, source))
        })
        .collect()
}

fn collect_raids(bosses: &Option<Value>, tiers: &Option<Value>) -> Vec<Value> {
    let mut raids = carry_list(bosses);

    match tiers {
        Some(Value::Array(groups)) => {
            for group in groups {
                let label = group
                    .get("tier")
                    .filter(|t| !t.is_null())
                    .or_else(|| group.get("name"))
                    .filter(|t| !t.is_null())
                    .cloned();
                if let Some(Value::Array(members)) = group.get("pokemon") {
                    raids.extend(members.iter().map(|p| with_tier(p, label.clone())));
                }
            }
        }
        Some(Value::Object(by_tier)) => {
            let mut order: Vec<&str> = TIER_LABELS.iter().map(|(key, _)| *key).collect();
            order.extend(
                by_tier
                    .keys()
                    .map(String::as_str)
                    .filter(|k| !TIER_LABELS.iter().any(|(key, _)| key == k)),
            );

            for key in order {
                if let Some(Value::Array(members)) = by_tier.get(key) {
                    let label = Some(Value::String(tier_label(key).to_string()));
                    raids.extend(members.iter().map(|p| with_tier(p, label.clone())));
                }
            }
        }
        _ => {}
    }

    raids
}

fn with_tier(pokemon: &Value, tier: Option<Value>) -> Value {
    match (pokemon, tier) {
        (Value::Object(fields), Some(tier)) => {
            let mut fields = fields.clone();
            fields.insert("tier".to_string(), tier);
            Value::Object(fields)
        }
        (other, _) => other.clone(),
    }
}

/// Object bucket: rebuilt from the raw keys if any is present, otherwise
/// the consolidated object is carried.
fn bucket(existing: &Option<Value>, raw: &[(&str, &Option<Value>)]) -> Map<String, Value> {
    if raw.iter().all(|(_, v)| v.is_none()) {
        return carry_object(existing);
    }

    raw.iter()
        .filter_map(|(key, value)| Some((key.to_string(), non_empty(value)?)))
        .collect()
}

fn carry_pokemon(value: &Option<Value>) -> Vec<PokemonEntry> {
    match value {
        Some(Value::Array(list)) => list.iter().filter_map(PokemonEntry::parse).collect(),
        _ => Vec::new(),
    }
}

fn carry_list(value: &Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(list)) => list.clone(),
        _ => Vec::new(),
    }
}

fn carry_object(value: &Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(_, v)| truthy(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawEvent {
        RawEvent::from_value(value).unwrap()
    }

    fn envelope() -> Value {
        json!({
            "eventID": "cd-2023",
            "name": "Community Day",
            "eventType": "community-day",
            "heading": "Community Day",
            "image": "https://cdn.leekduck.com/assets/img/events/cd.jpg",
            "start": "2023-01-01T11:00:00.000",
            "end": "2023-01-01T17:00:00.000"
        })
    }

    fn with(mut base: Value, extra: Value) -> Value {
        let fields = base.as_object_mut().unwrap();
        for (k, v) in extra.as_object().unwrap() {
            fields.insert(k.clone(), v.clone());
        }
        base
    }

    #[test]
    fn test_envelope_only() {
        let flat = flatten(&raw(envelope()));
        let value = serde_json::to_value(&flat).unwrap();

        assert_eq!(value, envelope());
    }

    #[test]
    fn test_null_dates_still_serialized() {
        let flat = flatten(&RawEvent::new("e1"));
        let value = serde_json::to_value(&flat).unwrap();

        assert_eq!(value, json!({"eventID": "e1", "start": null, "end": null}));
    }

    #[test]
    fn test_pokemon_without_name_filtered() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "spawns": [{"name": "Pikachu"}, {}]
        })));

        assert_eq!(flat.content.pokemon.len(), 1);
        assert_eq!(flat.content.pokemon[0].name, "Pikachu");
        assert_eq!(flat.content.pokemon[0].source, PokemonSource::Spawn);
        assert!(flat.content.flags.unwrap().has_spawns);
    }

    #[test]
    fn test_pokemon_sources_tagged() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "featured": [{"name": "Eevee"}],
            "incenseEncounters": [{"name": "Zubat"}],
            "costumedPokemon": [{"name": "Pikachu", "canBeShiny": true}],
            "pokemonDebuts": [{"name": "Sprigatito"}],
            "maxPokemonDebuts": [{"name": "Gengar"}]
        })));

        let sources: Vec<_> = flat.content.pokemon.iter().map(|p| p.source).collect();
        assert_eq!(
            sources,
            vec![
                PokemonSource::Featured,
                PokemonSource::Incense,
                PokemonSource::Costumed,
                PokemonSource::Debut,
                PokemonSource::MaxDebut,
            ]
        );
        assert_eq!(
            flat.content.pokemon[2].attributes.get("canBeShiny"),
            Some(&json!(true))
        );
    }

    #[test]
    fn test_tiers_both_forms_agree() {
        let keyed = flatten(&raw(json!({
            "eventID": "e1",
            "tiers": {"fiveStar": [{"name": "Mewtwo"}]}
        })));
        let grouped = flatten(&raw(json!({
            "eventID": "e1",
            "tiers": [{"tier": "5-Star", "pokemon": [{"name": "Mewtwo"}]}]
        })));

        assert_eq!(keyed.content.raids, vec![json!({"name": "Mewtwo", "tier": "5-Star"})]);
        assert_eq!(keyed.content.raids, grouped.content.raids);
    }

    #[test]
    fn test_keyed_tiers_fixed_order() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "bosses": [{"name": "Rayquaza"}],
            "tiers": {
                "oneStar": [{"name": "Klink"}],
                "shadow": [{"name": "Shadow Raikou"}],
                "mega": [{"name": "Mega Gengar"}]
            }
        })));

        assert_eq!(
            flat.content.raids,
            vec![
                json!({"name": "Rayquaza"}),
                json!({"name": "Mega Gengar", "tier": "Mega"}),
                json!({"name": "Klink", "tier": "1-Star"}),
                json!({"name": "Shadow Raikou", "tier": "shadow"}),
            ]
        );
    }

    #[test]
    fn test_grouped_tiers_fall_back_to_name() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "tiers": [{"name": "Mega", "pokemon": [{"name": "Mega Lopunny"}]}]
        })));

        assert_eq!(
            flat.content.raids,
            vec![json!({"name": "Mega Lopunny", "tier": "Mega"})]
        );
    }

    #[test]
    fn test_object_buckets() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "leagues": [{"name": "Great League"}],
            "shadowPokemon": [{"name": "Shadow Ralts"}],
            "giovanni": {"name": "Giovanni"},
            "grunts": [],
            "fieldResearchTasks": [{"task": "Catch 5"}],
            "researchBreakthrough": {"reward": "Mewtwo"},
            "ticketPrice": "$5"
        })));
        let c = &flat.content;

        assert_eq!(c.battle.get("leagues"), Some(&json!([{"name": "Great League"}])));
        assert_eq!(c.rocket.get("shadows"), Some(&json!([{"name": "Shadow Ralts"}])));
        assert!(c.rocket.get("grunts").is_none());
        assert!(c.research.contains_key("field"));
        assert!(c.research.contains_key("breakthrough"));
        assert_eq!(c.rewards.get("ticketPrice"), Some(&json!("$5")));

        let flags = c.flags.unwrap();
        assert!(flags.has_battle && flags.has_rocket && flags.has_research && flags.has_rewards);
        assert!(flags.has_field_research_tasks);
        assert!(!flags.has_raids);
    }

    #[test]
    fn test_eggs_shapes() {
        assert!(eggs_bucket(&Some(json!([]))).is_none());
        assert!(eggs_bucket(&Some(json!({"2 km": [], "5 km": []}))).is_none());
        assert!(eggs_bucket(&Some(json!("none"))).is_none());

        let by_distance = json!({"2 km": [], "5 km": [{"name": "Togepi"}]});
        assert_eq!(eggs_bucket(&Some(by_distance.clone())), Some(by_distance));
        assert_eq!(
            eggs_bucket(&Some(json!([{"name": "Riolu"}]))),
            Some(json!([{"name": "Riolu"}]))
        );
    }

    #[test]
    fn test_empty_values_omitted() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "bonuses": [],
            "description": "",
            "customSections": {},
            "pricing": null,
            "spawns": []
        })));
        let value = serde_json::to_value(&flat).unwrap();

        assert_eq!(value, json!({"eventID": "e1", "start": null, "end": null}));
    }

    #[test]
    fn test_renamed_pass_through() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "pokestopShowcases": [{"name": "Bulbasaur"}],
            "alternationPattern": "Every 30 minutes",
            "featuredAttacks": ["Hydro Cannon"]
        })));
        let value = serde_json::to_value(&flat).unwrap();

        assert_eq!(value["showcases"], json!([{"name": "Bulbasaur"}]));
        assert_eq!(value["raidAlternation"], json!("Every 30 minutes"));
        assert_eq!(value["raidFeaturedAttacks"], json!(["Hydro Cannon"]));
        assert!(value.get("pokestopShowcases").is_none());
        assert!(flat.content.flags.unwrap().has_showcases);
    }

    #[test]
    fn test_can_be_shiny_kept_when_false() {
        let flat = flatten(&raw(json!({"eventID": "e1", "canBeShiny": false})));
        assert_eq!(flat.content.can_be_shiny, Some(json!(false)));
    }

    #[test]
    fn test_generic_flags_superseded() {
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "hasSpawns": true,
            "hasBonuses": true
        })));
        let value = serde_json::to_value(&flat).unwrap();

        assert!(value.get("hasSpawns").is_none());
        assert!(value.get("flags").is_none());
    }

    #[test]
    fn test_extra_keys_carried() {
        let flat = flatten(&raw(json!({"eventID": "e1", "promoCodes": ["ABC123"]})));
        let value = serde_json::to_value(&flat).unwrap();

        assert_eq!(value["promoCodes"], json!(["ABC123"]));
    }

    #[test]
    fn test_is_flattened() {
        let flat = raw(json!({"eventID": "e1", "pokemon": [], "raids": []}));
        let mixed = raw(json!({"eventID": "e1", "pokemon": [], "spawns": []}));
        let bare = raw(json!({"eventID": "e1", "bonuses": ["x"]}));

        assert!(is_flattened(&flat.details));
        assert!(!is_flattened(&mixed.details));
        assert!(!is_flattened(&bare.details));
    }

    #[test]
    fn test_raw_keys_win_over_consolidated() {
        // a re-merged previous output carries both forms
        let flat = flatten(&raw(json!({
            "eventID": "e1",
            "pokemon": [{"name": "Old", "source": "spawn"}],
            "spawns": [{"name": "New"}],
            "raids": [{"name": "Kept"}]
        })));

        let names: Vec<_> = flat.content.pokemon.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["New"]);
        assert_eq!(flat.content.raids, vec![json!({"name": "Kept"})]);
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let event = raw(with(
            envelope(),
            json!({
                "spawns": [{"name": "Pikachu", "canBeShiny": true}, {}],
                "featured": [{"name": "Eevee"}],
                "bosses": [{"name": "Kyogre"}],
                "tiers": {"mega": [{"name": "Mega Gyarados"}]},
                "leagues": ["Great League"],
                "grunts": [{"type": "Water"}],
                "eggs": {"2 km": [{"name": "Togepi"}]},
                "bonuses": [{"text": "2x Stardust"}],
                "fieldResearchTasks": [{"task": "Catch 10"}],
                "ticketBonuses": ["1/4 hatch distance"],
                "pokestopShowcases": [{"name": "Pikachu"}],
                "shinies": [{"name": "Pikachu"}],
                "canBeShiny": true,
                "hasBonuses": true,
                "promoCodes": ["ABC"]
            }),
        ));

        let once = flatten(&event);
        let twice = flatten(&once.to_raw().unwrap());

        assert_eq!(once, twice);
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn test_flatten_all_counts() {
        let mut stats = RunStats::default();
        let events = vec![
            raw(json!({"eventID": "a", "spawns": [{"name": "Pikachu"}]})),
            raw(json!({"eventID": "b", "pokemon": [{"name": "Pikachu", "source": "spawn"}]})),
        ];

        let flat = flatten_all(&events, &mut stats);

        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].content.pokemon, flat[1].content.pokemon);
        assert_eq!(stats.flattened, 2);
        assert_eq!(stats.already_flattened, 1);
    }

    #[test]
    fn test_tier_label() {
        assert_eq!(tier_label("fiveStar"), "5-Star");
        assert_eq!(tier_label("elite"), "elite");
    }
}
