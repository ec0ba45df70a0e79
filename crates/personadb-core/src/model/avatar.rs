use crate::{
    bus::Topic,
    model::{EntityKind, lenient},
    normalize::{self, FieldComparison},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

///
/// Avatar
///
/// A target-audience persona scoped to one product. `product_id` is a
/// non-enforced pointer: it may be absent or dangling during transient
/// states and is reconciled by the integrity layer, not at write time.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Avatar {
    pub id: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "lenient::string_or_joined")]
    pub age: String,
    pub gender: String,
    pub personality: String,
    #[serde(deserialize_with = "lenient::string_or_list")]
    pub interests: Vec<String>,
    pub background: String,
    pub goals: String,
    #[serde(deserialize_with = "lenient::string_or_list")]
    pub pain_points: Vec<String>,
    #[serde(deserialize_with = "lenient::string_or_list")]
    pub objections: Vec<String>,
    #[serde(deserialize_with = "lenient::string_or_list")]
    pub dream_outcome: Vec<String>,
    pub preferences: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
    pub product_id: Option<String>,
}

impl EntityKind for Avatar {
    const ENTITY_NAME: &'static str = "avatar";
    const COLLECTION_KEY: &'static str = "avatars";
    const TOPIC: Topic = Topic::AvatarsUpdated;
    const CORE_FIELDS: &'static [&'static str] = &[
        "name",
        "age",
        "gender",
        "personality",
        "interests",
        "background",
        "goals",
        "painPoints",
        "objections",
        "dreamOutcome",
        "preferences",
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    fn ensure_id(&mut self) {
        if self.id().is_none() {
            self.id = Some(Ulid::new().to_string());
        }
    }

    fn ensure_created_at(&mut self) {
        if self.created_at.is_none() {
            self.created_at = Some(Utc::now());
        }
    }

    fn preserve_immutable(&mut self, stored: &Self) {
        self.id.clone_from(&stored.id);
        self.created_at = stored.created_at;
    }

    // Scope first: avatars under different products are never duplicates,
    // even when every core field matches. An unattached avatar only
    // collides with other unattached avatars.
    fn is_duplicate_of(&self, other: &Self) -> bool {
        self.product_id == other.product_id && self.compare_core_fields(other).is_match()
    }

    fn compare_core_fields(&self, other: &Self) -> FieldComparison {
        let mut cmp = FieldComparison::default();
        cmp.record("name", normalize::text_eq(&self.name, &other.name));
        cmp.record("age", normalize::text_eq(&self.age, &other.age));
        cmp.record("gender", normalize::text_eq(&self.gender, &other.gender));
        cmp.record(
            "personality",
            normalize::text_eq(&self.personality, &other.personality),
        );
        cmp.record(
            "interests",
            normalize::list_eq(&self.interests, &other.interests),
        );
        cmp.record(
            "background",
            normalize::text_eq(&self.background, &other.background),
        );
        cmp.record("goals", normalize::text_eq(&self.goals, &other.goals));
        cmp.record(
            "painPoints",
            normalize::list_eq(&self.pain_points, &other.pain_points),
        );
        cmp.record(
            "objections",
            normalize::list_eq(&self.objections, &other.objections),
        );
        cmp.record(
            "dreamOutcome",
            normalize::list_eq(&self.dream_outcome, &other.dream_outcome),
        );
        cmp.record(
            "preferences",
            normalize::map_eq(&self.preferences, &other.preferences),
        );
        cmp
    }
}
