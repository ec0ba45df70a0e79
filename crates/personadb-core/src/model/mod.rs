mod avatar;
mod product;

pub use avatar::Avatar;
pub use product::Product;

use crate::{bus::Topic, normalize::FieldComparison};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;

///
/// EntityKind
///
/// Contract every persisted record type satisfies. Code touching storage
/// or the bus is generic over this, never over a concrete entity.
///

pub trait EntityKind: Clone + Debug + PartialEq + Serialize + DeserializeOwned {
    /// Stable singular name, used in logs and diagnostics.
    const ENTITY_NAME: &'static str;

    /// Storage key of the collection this entity lives in.
    const COLLECTION_KEY: &'static str;

    /// Bus topic emitted when this collection changes.
    const TOPIC: Topic;

    /// Fields participating in core-field comparison, in wire spelling.
    const CORE_FIELDS: &'static [&'static str];

    /// The record's id, when it has a usable one.
    fn id(&self) -> Option<&str>;

    /// Assign an id when none is present.
    fn ensure_id(&mut self);

    /// Stamp the creation timestamp when unset.
    fn ensure_created_at(&mut self);

    /// Carry the immutable fields (id, creation timestamp) over from the
    /// stored record during an update.
    fn preserve_immutable(&mut self, stored: &Self);

    /// Structural duplicate test, including the entity's scope rule.
    fn is_duplicate_of(&self, other: &Self) -> bool;

    /// Field-by-field core comparison, for diagnostics and tests.
    fn compare_core_fields(&self, other: &Self) -> FieldComparison;
}

/// First structural duplicate of `candidate` in `collection`, honoring
/// the entity's scope rule. `None` means the insert may proceed.
#[must_use]
pub fn find_duplicate<'a, E: EntityKind>(candidate: &E, collection: &'a [E]) -> Option<&'a E> {
    collection
        .iter()
        .find(|existing| candidate.is_duplicate_of(existing))
}

pub(crate) mod lenient {
    //! Accept every producer variant of the same semantic value.
    //!
    //! Upstream workflows serialize the same field as `"a, b"` in one run
    //! and `["a", "b"]` in the next; prices arrive as numbers or decimal
    //! strings. Intake converges them to one typed representation so the
    //! comparison layer never sees the difference.

    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        List(Vec<String>),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    /// List field: a JSON array, or one comma-separated string.
    pub fn string_or_list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<StringOrList>::deserialize(de)? {
            None => Vec::new(),
            Some(StringOrList::List(items)) => items,
            Some(StringOrList::Text(text)) => split_tokens(&text),
        })
    }

    /// Text field that some producers serialize as a token list.
    pub fn string_or_joined<'de, D>(de: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<StringOrList>::deserialize(de)? {
            None => String::new(),
            Some(StringOrList::Text(text)) => text,
            Some(StringOrList::List(items)) => items.join(", "),
        })
    }

    /// Numeric field that some producers serialize as a decimal string.
    /// Unparseable text degrades to zero rather than failing the record.
    pub fn number_or_string<'de, D>(de: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<NumberOrText>::deserialize(de)? {
            None => 0.0,
            Some(NumberOrText::Number(value)) => value,
            Some(NumberOrText::Text(text)) => text.trim().parse().unwrap_or(0.0),
        })
    }

    fn split_tokens(text: &str) -> Vec<String> {
        text.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}
