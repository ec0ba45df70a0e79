use crate::{
    model::{Avatar, Product},
    normalize::norm_text,
};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

///
/// IntegrityReport
///
/// Output of the advisory one-pass scan. `is_valid` is true iff both
/// violation lists are empty. Advisory only: a transiently invalid state
/// is part of normal operation, since writers create avatars before or
/// without knowledge of their product.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub orphaned_avatars: Vec<Avatar>,
    pub products_without_avatars: Vec<Product>,
    pub is_valid: bool,
}

/// One pass over both collections: avatars whose non-empty `product_id`
/// resolves to no product, and products no avatar points to.
#[must_use]
pub fn validate(products: &[Product], avatars: &[Avatar]) -> IntegrityReport {
    let product_ids: BTreeSet<&str> = products.iter().map(|p| p.id.as_str()).collect();

    let mut referenced: BTreeSet<&str> = BTreeSet::new();
    let mut orphaned_avatars = Vec::new();

    for avatar in avatars {
        match avatar.product_id.as_deref() {
            Some(product_id) if product_ids.contains(product_id) => {
                referenced.insert(product_id);
            }
            Some(_) => orphaned_avatars.push(avatar.clone()),
            None => {}
        }
    }

    let products_without_avatars: Vec<Product> = products
        .iter()
        .filter(|product| !referenced.contains(product.id.as_str()))
        .cloned()
        .collect();

    let is_valid = orphaned_avatars.is_empty() && products_without_avatars.is_empty();

    IntegrityReport {
        orphaned_avatars,
        products_without_avatars,
        is_valid,
    }
}

/// Reattach avatars whose `product_id` is absent or dangling. Returns the
/// number of reassignments; pure over the slices, persistence is the
/// caller's business.
///
/// Name similarity wins: one normalized name containing the other. When
/// nothing is similar and at least one product exists, the first product
/// is assigned as a last resort. Every reassignment is logged — the
/// fallback is low-confidence and deliberately loud.
pub fn repair(products: &[Product], avatars: &mut [Avatar]) -> usize {
    if products.is_empty() {
        return 0;
    }

    let product_ids: BTreeSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
    let mut repaired = 0;

    for avatar in avatars.iter_mut() {
        let anchored = avatar
            .product_id
            .as_deref()
            .is_some_and(|id| product_ids.contains(id));
        if anchored {
            continue;
        }

        let avatar_name = norm_text(&avatar.name);
        let matched = products.iter().find(|product| {
            let product_name = norm_text(&product.name);
            !product_name.is_empty()
                && !avatar_name.is_empty()
                && (avatar_name.contains(&product_name) || product_name.contains(&avatar_name))
        });

        let (target, confidence) = match matched {
            Some(product) => (product, "name-similarity"),
            None => (&products[0], "first-product fallback"),
        };

        warn!(
            avatar = avatar.name.as_str(),
            product = target.name.as_str(),
            confidence,
            "reassigned unanchored avatar"
        );
        avatar.product_id = Some(target.id.clone());
        repaired += 1;
    }

    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            ..Product::default()
        }
    }

    fn avatar(name: &str, product_id: Option<&str>) -> Avatar {
        Avatar {
            id: Some(format!("A-{name}")),
            name: name.to_string(),
            product_id: product_id.map(str::to_string),
            ..Avatar::default()
        }
    }

    #[test]
    fn dangling_pointer_is_an_orphan_but_absent_pointer_is_not() {
        let products = vec![product("P1", "SmartBottle")];
        let avatars = vec![
            avatar("Dangling", Some("P404")),
            avatar("Unattached", None),
            avatar("Anchored", Some("P1")),
        ];

        let report = validate(&products, &avatars);
        assert_eq!(report.orphaned_avatars.len(), 1);
        assert_eq!(report.orphaned_avatars[0].name, "Dangling");
        assert!(report.products_without_avatars.is_empty());
        assert!(!report.is_valid);
    }

    #[test]
    fn unreferenced_products_are_reported() {
        let products = vec![product("P1", "SmartBottle"), product("P2", "Desk Mat")];
        let avatars = vec![avatar("Fan", Some("P1"))];

        let report = validate(&products, &avatars);
        assert_eq!(report.products_without_avatars.len(), 1);
        assert_eq!(report.products_without_avatars[0].id, "P2");
        assert!(!report.is_valid);
    }

    #[test]
    fn fully_linked_collections_are_valid() {
        let products = vec![product("P1", "SmartBottle")];
        let avatars = vec![avatar("Fan", Some("P1"))];

        let report = validate(&products, &avatars);
        assert!(report.is_valid);
        assert!(report.orphaned_avatars.is_empty());
        assert!(report.products_without_avatars.is_empty());
    }

    #[test]
    fn repair_prefers_name_similarity() {
        let products = vec![product("P1", "Desk Mat"), product("P2", "SmartBottle")];
        let mut avatars = vec![avatar("SmartBottle Fan", None)];

        assert_eq!(repair(&products, &mut avatars), 1);
        assert_eq!(avatars[0].product_id.as_deref(), Some("P2"));
    }

    #[test]
    fn repair_similarity_works_in_both_directions() {
        let products = vec![product("P1", "SmartBottle Pro Max")];
        let mut avatars = vec![avatar("smartbottle", Some("P404"))];

        assert_eq!(repair(&products, &mut avatars), 1);
        assert_eq!(avatars[0].product_id.as_deref(), Some("P1"));
    }

    #[test]
    fn repair_falls_back_to_first_product() {
        let products = vec![product("P1", "Desk Mat"), product("P2", "SmartBottle")];
        let mut avatars = vec![avatar("Totally Unrelated", None)];

        assert_eq!(repair(&products, &mut avatars), 1);
        assert_eq!(avatars[0].product_id.as_deref(), Some("P1"));
    }

    #[test]
    fn repair_without_products_does_nothing() {
        let mut avatars = vec![avatar("Stray", None)];

        assert_eq!(repair(&[], &mut avatars), 0);
        assert!(avatars[0].product_id.is_none());
    }

    #[test]
    fn repair_leaves_anchored_avatars_alone() {
        let products = vec![product("P1", "SmartBottle"), product("P2", "Desk Mat")];
        let mut avatars = vec![avatar("Desk Mat Fan", Some("P1"))];

        assert_eq!(repair(&products, &mut avatars), 0);
        assert_eq!(avatars[0].product_id.as_deref(), Some("P1"));
    }

    #[test]
    fn repair_then_validate_converges() {
        let products = vec![product("P1", "SmartBottle")];
        let mut avatars = vec![avatar("SmartBottle Fan", None)];

        repair(&products, &mut avatars);
        let report = validate(&products, &avatars);

        assert!(report.orphaned_avatars.is_empty());
        assert!(report.is_valid);
    }
}
