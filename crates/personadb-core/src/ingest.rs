use crate::{
    db::Db,
    error::Error,
    model::{Avatar, Product, find_duplicate},
    serialize::deserialize,
};
use serde::Deserialize;
use tracing::debug;

///
/// WebhookPayload
///
/// The interesting part of a workflow response: optionally a
/// product-shaped and/or avatar-shaped object. Everything else in the
/// response is the producer's business and is ignored.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WebhookPayload {
    pub product: Option<Product>,
    pub avatar: Option<Avatar>,
}

impl WebhookPayload {
    /// Decode a raw response body.
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        Ok(deserialize(bytes)?)
    }
}

///
/// IngestOutcome
///
/// What one payload merge actually inserted. `false` means the record was
/// a duplicate and the stored one was reused.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IngestOutcome {
    pub product_created: bool,
    pub avatar_created: bool,
}

/// Merge a webhook payload into the store: product first, then avatar.
///
/// An avatar arriving without a `product_id` is pinned to the payload's
/// product — the stored duplicate when the insert was rejected — before
/// its own duplicate check runs. This is the auto-fill path: an inferred
/// persona rides along with a scraped product and belongs to it.
pub fn ingest(db: &Db, payload: WebhookPayload) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();

    let mut anchor: Option<String> = None;
    if let Some(product) = payload.product {
        outcome.product_created = db.create(product.clone());
        anchor = stored_id_for(db, &product);
        debug!(
            created = outcome.product_created,
            anchor = anchor.as_deref().unwrap_or_default(),
            "webhook product merged"
        );
    }

    if let Some(mut avatar) = payload.avatar {
        if avatar.product_id.is_none() {
            avatar.product_id = anchor;
        }
        outcome.avatar_created = db.create(avatar);
    }

    outcome
}

// The id the stored record actually carries: the candidate's own when the
// insert went through, the pre-existing duplicate's otherwise.
fn stored_id_for(db: &Db, candidate: &Product) -> Option<String> {
    let products = db.list::<Product>();
    find_duplicate(candidate, &products).map(|stored| stored.id.clone())
}
