//! Co-occurrence analysis over order history.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::product::{Product, ProductId};

use super::store::RecommendationStore;
use super::types::{CoOccurrenceOptions, RecommendationResult};
use super::EngineResult;

/// Finds products frequently appearing in the same orders as a seed
/// product. Foundational primitive behind every order-derived strategy.
///
/// Confidence is `co_occurrence_count / orders_containing_seed` — a
/// directional lift toward the seed, not a symmetric similarity. Candidates
/// whose count does not strictly exceed the configured threshold are
/// dropped before confidence is considered.
pub struct CoOccurrenceAnalyzer<'a, S> {
    store: &'a S,
}

impl<'a, S: RecommendationStore> CoOccurrenceAnalyzer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Compute scored co-occurrence candidates for `seed`.
    ///
    /// Read-only. Every no-signal condition (unknown or inactive seed, no
    /// orders, nothing above the thresholds) answers with an empty list so
    /// the caller can pick a fallback.
    pub async fn compute(
        &self,
        seed: &ProductId,
        options: &CoOccurrenceOptions,
    ) -> EngineResult<Vec<RecommendationResult>> {
        options.validate()?;

        let Some(seed_product) = self.store.find_product_by_id(seed).await? else {
            return Ok(Vec::new());
        };
        if !seed_product.active {
            return Ok(Vec::new());
        }

        let order_ids = self.store.find_order_ids_containing_product(seed).await?;
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let seed_order_total = order_ids.len() as f64;

        let counts = self
            .store
            .count_co_occurring_products(
                &order_ids,
                seed,
                options.min_co_occurrence,
                options.max_candidates,
            )
            .await?;

        let mut candidates: Vec<(ProductId, f64)> = counts
            .into_iter()
            .map(|row| (row.product_id, row.count as f64 / seed_order_total))
            .filter(|(_, confidence)| *confidence >= options.min_confidence)
            .collect();
        candidates.sort_by(|a, b| rank_order(a, b));
        candidates.truncate(options.max_candidates);

        // Survivors that no longer resolve to an active product drop out
        // silently; the list may end up shorter than max_candidates.
        let ids: Vec<ProductId> = candidates.iter().map(|(id, _)| id.clone()).collect();
        let resolved = self.store.find_products_by_ids(&ids, true).await?;
        let by_id: HashMap<&str, &Product> =
            resolved.iter().map(|p| (p.id.0.as_str(), p)).collect();

        Ok(candidates
            .iter()
            .filter_map(|(id, confidence)| {
                by_id
                    .get(id.0.as_str())
                    .map(|product| RecommendationResult::from_product(product, *confidence))
            })
            .collect())
    }
}

/// Score descending, product id ascending on ties, so ranking never depends
/// on store iteration order.
pub(super) fn rank_order(a: &(ProductId, f64), b: &(ProductId, f64)) -> Ordering {
    b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0 .0.cmp(&b.0 .0))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::domain::order::{Order, OrderId, UserId};
    use crate::domain::product::{Product, ProductId};
    use crate::recommend::{CoOccurrenceOptions, InMemoryRecommendationStore};

    use super::CoOccurrenceAnalyzer;

    fn product(id: &str, active: bool) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            name: format!("Product {id}"),
            image: None,
            price: Decimal::new(1250, 2),
            category: Some("Energy".to_owned()),
            stock: 10,
            active,
            created_at: Utc::now() - Duration::days(30),
        }
    }

    fn seed_order(store: &InMemoryRecommendationStore, id: &str, product_ids: &[&str]) {
        let ids: Vec<ProductId> = product_ids.iter().map(|p| ProductId((*p).to_owned())).collect();
        store.add_order(
            Order {
                id: OrderId(id.to_owned()),
                user_id: UserId("user-1".to_owned()),
                created_at: Utc::now(),
            },
            &ids,
        );
    }

    fn store_with_products(ids: &[&str]) -> InMemoryRecommendationStore {
        let store = InMemoryRecommendationStore::new();
        for id in ids {
            store.add_product(product(id, true));
        }
        store
    }

    #[tokio::test]
    async fn constant_companion_scores_full_confidence() {
        let store = store_with_products(&["p1", "p2"]);
        for n in 0..5 {
            seed_order(&store, &format!("o{n}"), &["p1", "p2"]);
        }

        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &CoOccurrenceOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.0, "p2");
        assert!((results[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn count_equal_to_threshold_is_excluded() {
        let store = store_with_products(&["p1", "p2"]);
        // p2 co-occurs exactly twice; with min_co_occurrence=2 the strict
        // comparison must drop it.
        seed_order(&store, "o1", &["p1", "p2"]);
        seed_order(&store, "o2", &["p1", "p2"]);
        seed_order(&store, "o3", &["p1"]);

        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &CoOccurrenceOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());

        let relaxed = CoOccurrenceOptions { min_co_occurrence: 1, ..Default::default() };
        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &relaxed)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn low_confidence_candidate_is_excluded() {
        let store = store_with_products(&["p1", "p3"]);
        seed_order(&store, "o0", &["p1", "p3"]);
        for n in 1..10 {
            seed_order(&store, &format!("o{n}"), &["p1"]);
        }

        // confidence 1/10 = 0.1 < 0.2 floor
        let options = CoOccurrenceOptions {
            min_co_occurrence: 0,
            min_confidence: 0.2,
            ..Default::default()
        };
        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &options)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unknown_or_inactive_seed_yields_no_signal() {
        let store = store_with_products(&["p1"]);
        store.add_product(product("ghost", false));
        seed_order(&store, "o1", &["p1", "ghost"]);

        let analyzer = CoOccurrenceAnalyzer::new(&store);
        let options = CoOccurrenceOptions::default();
        assert!(analyzer
            .compute(&ProductId("missing".to_owned()), &options)
            .await
            .unwrap()
            .is_empty());
        assert!(analyzer
            .compute(&ProductId("ghost".to_owned()), &options)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn seed_without_orders_yields_no_signal() {
        let store = store_with_products(&["p1"]);
        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &CoOccurrenceOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn deactivated_candidate_drops_silently() {
        let store = store_with_products(&["p1", "p2"]);
        store.add_product(product("retired", false));
        for n in 0..4 {
            seed_order(&store, &format!("o{n}"), &["p1", "p2", "retired"]);
        }

        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &CoOccurrenceOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.0, "p2");
    }

    #[tokio::test]
    async fn results_rank_by_confidence_and_respect_the_cap() {
        let store = store_with_products(&["p1", "often", "sometimes"]);
        for n in 0..6 {
            let mut cart = vec!["p1", "often"];
            if n < 3 {
                cart.push("sometimes");
            }
            seed_order(&store, &format!("o{n}"), &cart);
        }

        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &CoOccurrenceOptions::default())
            .await
            .unwrap();
        assert_eq!(
            results.iter().map(|r| r.id.0.as_str()).collect::<Vec<_>>(),
            vec!["often", "sometimes"]
        );
        assert!(results.windows(2).all(|pair| pair[0].score >= pair[1].score));
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));

        let capped = CoOccurrenceOptions { max_candidates: 1, ..Default::default() };
        let results = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &capped)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.0, "often");
    }

    #[tokio::test]
    async fn out_of_range_options_are_rejected() {
        let store = store_with_products(&["p1"]);
        let options = CoOccurrenceOptions { min_confidence: -0.5, ..Default::default() };
        let err = CoOccurrenceAnalyzer::new(&store)
            .compute(&ProductId("p1".to_owned()), &options)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("min_confidence"));
    }
}
