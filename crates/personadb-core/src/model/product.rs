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
/// Product
///
/// A sellable item, entered by hand or merged from a webhook payload.
/// `image_url` doubles as the product's canonical external identity, so
/// either a name collision or an image collision marks a duplicate.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "lenient::number_or_string")]
    pub price: f64,
    pub currency: String,
    pub image_url: String,
    pub category: String,
    pub brand: String,
    #[serde(deserialize_with = "lenient::string_or_list")]
    pub features: Vec<String>,
    pub specifications: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl EntityKind for Product {
    const ENTITY_NAME: &'static str = "product";
    const COLLECTION_KEY: &'static str = "products";
    const TOPIC: Topic = Topic::ProductsUpdated;
    const CORE_FIELDS: &'static [&'static str] = &[
        "name",
        "description",
        "price",
        "currency",
        "imageUrl",
        "category",
        "brand",
        "features",
        "specifications",
    ];

    fn id(&self) -> Option<&str> {
        if self.id.is_empty() {
            None
        } else {
            Some(&self.id)
        }
    }

    fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = Ulid::new().to_string();
        }
    }

    fn ensure_created_at(&mut self) {
        if self.created_at.is_none() {
            self.created_at = Some(Utc::now());
        }
    }

    fn preserve_immutable(&mut self, stored: &Self) {
        self.id = stored.id.clone();
        self.created_at = stored.created_at;
    }

    // Either match alone rejects an insert. Blank fields never collide;
    // a half-filled webhook record must not shadow every other one.
    fn is_duplicate_of(&self, other: &Self) -> bool {
        let name_hit =
            !self.name.trim().is_empty() && normalize::text_eq(&self.name, &other.name);
        let image_hit = !self.image_url.trim().is_empty()
            && normalize::text_eq(&self.image_url, &other.image_url);

        name_hit || image_hit
    }

    fn compare_core_fields(&self, other: &Self) -> FieldComparison {
        let mut cmp = FieldComparison::default();
        cmp.record("name", normalize::text_eq(&self.name, &other.name));
        cmp.record(
            "description",
            normalize::text_eq(&self.description, &other.description),
        );
        cmp.record("price", (self.price - other.price).abs() < f64::EPSILON);
        cmp.record("currency", normalize::text_eq(&self.currency, &other.currency));
        cmp.record(
            "imageUrl",
            normalize::text_eq(&self.image_url, &other.image_url),
        );
        cmp.record("category", normalize::text_eq(&self.category, &other.category));
        cmp.record("brand", normalize::text_eq(&self.brand, &other.brand));
        cmp.record("features", normalize::list_eq(&self.features, &other.features));
        cmp.record(
            "specifications",
            normalize::map_eq(&self.specifications, &other.specifications),
        );
        cmp
    }
}
