//! Recommendation strategies and their fallback chains.

use std::collections::{HashMap, HashSet};

use crate::domain::order::UserId;
use crate::domain::product::{Product, ProductId};

use super::analyzer::{rank_order, CoOccurrenceAnalyzer};
use super::store::RecommendationStore;
use super::types::{
    CartOptions, CategoryOptions, CoOccurrenceOptions, FrequentlyBoughtTogetherOptions,
    PersonalizedOptions, RecommendationResult,
};
use super::{EngineResult, CATEGORY_BASED_SCORE, CATEGORY_FALLBACK_CAP, COLD_CATALOG_SCORE};

/// Entry point for all recommendation strategies.
///
/// Stateless apart from the injected store: every call re-derives its
/// answer from current storage, and a strategy that runs out of signal
/// degrades through its fallback chain instead of failing. All strategies
/// answer with an empty list — never an error — when even the last
/// fallback has nothing to offer.
pub struct RecommendationEngine<S> {
    store: S,
}

impl<S: RecommendationStore> RecommendationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Products frequently bought together with `product_id`.
    ///
    /// Unknown or inactive product → empty. A product that was never
    /// ordered falls back to its category, capped at
    /// `min(max_results, 5)`, with the product itself excluded. Otherwise
    /// the co-occurrence analyzer's output is returned unmodified.
    pub async fn frequently_bought_together(
        &self,
        product_id: &ProductId,
        options: FrequentlyBoughtTogetherOptions,
    ) -> EngineResult<Vec<RecommendationResult>> {
        options.validate()?;

        let Some(product) = self.store.find_product_by_id(product_id).await? else {
            return Ok(Vec::new());
        };
        if !product.active {
            return Ok(Vec::new());
        }

        let order_ids = self.store.find_order_ids_containing_product(product_id).await?;
        if order_ids.is_empty() {
            let category = product.category.as_deref().unwrap_or("");
            let fallback = CategoryOptions::new()
                .with_limit(options.max_results.min(CATEGORY_FALLBACK_CAP))
                .with_exclusions(vec![product_id.clone()]);
            return self.category_based(category, fallback).await;
        }

        let analyzer_options = CoOccurrenceOptions {
            min_co_occurrence: options.min_co_occurrence,
            min_confidence: options.min_confidence,
            max_candidates: options.max_results,
        };
        CoOccurrenceAnalyzer::new(&self.store).compute(product_id, &analyzer_options).await
    }

    /// Recommendations for a user, derived from their purchase history.
    ///
    /// Candidates recommended by many of the user's purchases accumulate a
    /// higher summed score; that sum is the personalization signal. Users
    /// without history fall back to popularity.
    pub async fn personalized(
        &self,
        user_id: &UserId,
        options: PersonalizedOptions,
    ) -> EngineResult<Vec<RecommendationResult>> {
        options.validate()?;

        let order_ids = self.store.find_order_ids_for_user(user_id).await?;
        if order_ids.is_empty() {
            return self.popular(options.limit, &options.exclude_product_ids).await;
        }

        let mut purchased: Vec<ProductId> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for id in self.store.find_product_ids_in_orders(&order_ids).await? {
            if seen.insert(id.0.clone()) {
                purchased.push(id);
            }
        }
        if purchased.is_empty() {
            return self.popular(options.limit, &options.exclude_product_ids).await;
        }

        let skip: HashSet<&str> = purchased
            .iter()
            .chain(options.exclude_product_ids.iter())
            .map(|id| id.0.as_str())
            .collect();

        let mut scores: HashMap<ProductId, f64> = HashMap::new();
        for seed in &purchased {
            let fbt_options = FrequentlyBoughtTogetherOptions::default()
                .with_min_confidence(options.min_score);
            for candidate in self.frequently_bought_together(seed, fbt_options).await? {
                if skip.contains(candidate.id.0.as_str()) {
                    continue;
                }
                *scores.entry(candidate.id).or_insert(0.0) += candidate.score;
            }
        }

        if scores.is_empty() {
            return self.popular(options.limit, &options.exclude_product_ids).await;
        }
        self.rank_accumulated(scores, options.limit).await
    }

    /// Alias entry point for order-history recommendations.
    ///
    /// Currently identical to [`personalized`]; kept as a separate named
    /// operation so the two can diverge without an API change.
    ///
    /// [`personalized`]: Self::personalized
    pub async fn order_history(
        &self,
        user_id: &UserId,
        options: PersonalizedOptions,
    ) -> EngineResult<Vec<RecommendationResult>> {
        self.personalized(user_id, options).await
    }

    /// Newest active products in a category, fixed score 0.5.
    pub async fn category_based(
        &self,
        category: &str,
        options: CategoryOptions,
    ) -> EngineResult<Vec<RecommendationResult>> {
        options.validate()?;

        if category.trim().is_empty() {
            return self.popular(options.limit, &options.exclude_product_ids).await;
        }

        let products = self
            .store
            .find_products_by_category(category, &options.exclude_product_ids, options.limit)
            .await?;
        Ok(products
            .iter()
            .map(|product| RecommendationResult::from_product(product, CATEGORY_BASED_SCORE))
            .collect())
    }

    /// Recommendations for the current cart contents.
    ///
    /// Accumulates frequently-bought-together signal across every cart
    /// item, exactly as [`personalized`] does across purchases. An empty
    /// cart, or a cart with no signal, falls back to popularity.
    ///
    /// [`personalized`]: Self::personalized
    pub async fn cart_based(
        &self,
        cart_product_ids: &[ProductId],
        options: CartOptions,
    ) -> EngineResult<Vec<RecommendationResult>> {
        options.validate()?;

        if cart_product_ids.is_empty() {
            return self.popular(options.limit, &options.exclude_product_ids).await;
        }

        let skip: HashSet<&str> = cart_product_ids
            .iter()
            .chain(options.exclude_product_ids.iter())
            .map(|id| id.0.as_str())
            .collect();

        let mut scores: HashMap<ProductId, f64> = HashMap::new();
        for seed in cart_product_ids {
            let candidates = self
                .frequently_bought_together(seed, FrequentlyBoughtTogetherOptions::default())
                .await?;
            for candidate in candidates {
                if skip.contains(candidate.id.0.as_str()) {
                    continue;
                }
                *scores.entry(candidate.id).or_insert(0.0) += candidate.score;
            }
        }

        if scores.is_empty() {
            let mut exclude = cart_product_ids.to_vec();
            exclude.extend(options.exclude_product_ids.iter().cloned());
            return self.popular(options.limit, &exclude).await;
        }
        self.rank_accumulated(scores, options.limit).await
    }

    /// Global popularity fallback shared by the strategies.
    ///
    /// Scores are normalized against the highest count observed before
    /// exclusions are applied, so excluding the top product does not
    /// inflate the rest. A store with no order data at all answers with
    /// the newest active products at a fixed low score.
    pub(super) async fn popular(
        &self,
        limit: usize,
        exclude: &[ProductId],
    ) -> EngineResult<Vec<RecommendationResult>> {
        let pool =
            self.store.count_product_occurrences_globally(limit + exclude.len()).await?;
        if pool.is_empty() {
            let recent = self.store.find_recent_active_products(exclude, limit).await?;
            return Ok(recent
                .iter()
                .map(|product| RecommendationResult::from_product(product, COLD_CATALOG_SCORE))
                .collect());
        }

        let max_count = pool.iter().map(|row| row.count).max().unwrap_or(1).max(1) as f64;
        let excluded: HashSet<&str> = exclude.iter().map(|id| id.0.as_str()).collect();
        let mut ranked: Vec<(ProductId, f64)> = pool
            .into_iter()
            .filter(|row| !excluded.contains(row.product_id.0.as_str()))
            .map(|row| (row.product_id, row.count as f64 / max_count))
            .collect();
        ranked.truncate(limit);

        self.resolve_ranked(&ranked).await
    }

    /// Turn an accumulated score map into the final result list: rank,
    /// truncate, resolve, cap at 1.0, and re-sort so resolution order can
    /// never change the ranking.
    async fn rank_accumulated(
        &self,
        scores: HashMap<ProductId, f64>,
        limit: usize,
    ) -> EngineResult<Vec<RecommendationResult>> {
        let mut ranked: Vec<(ProductId, f64)> =
            scores.into_iter().map(|(id, score)| (id, score.min(1.0))).collect();
        ranked.sort_by(rank_order);
        ranked.truncate(limit);

        let mut results = self.resolve_ranked(&ranked).await?;
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(results)
    }

    async fn resolve_ranked(
        &self,
        ranked: &[(ProductId, f64)],
    ) -> EngineResult<Vec<RecommendationResult>> {
        let ids: Vec<ProductId> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let resolved = self.store.find_products_by_ids(&ids, true).await?;
        let by_id: HashMap<&str, &Product> =
            resolved.iter().map(|p| (p.id.0.as_str(), p)).collect();
        Ok(ranked
            .iter()
            .filter_map(|(id, score)| {
                by_id
                    .get(id.0.as_str())
                    .map(|product| RecommendationResult::from_product(product, *score))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::domain::order::{Order, OrderId, UserId};
    use crate::domain::product::{Product, ProductId};
    use crate::recommend::{
        CartOptions, CategoryOptions, FrequentlyBoughtTogetherOptions,
        InMemoryRecommendationStore, PersonalizedOptions,
    };

    use super::RecommendationEngine;

    fn pid(id: &str) -> ProductId {
        ProductId(id.to_owned())
    }

    fn product(id: &str, category: Option<&str>, active: bool, age_days: i64) -> Product {
        Product {
            id: pid(id),
            name: format!("Product {id}"),
            image: None,
            price: Decimal::new(4200, 2),
            category: category.map(str::to_owned),
            stock: 5,
            active,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn seed_order(store: &InMemoryRecommendationStore, id: &str, user: &str, products: &[&str]) {
        let ids: Vec<ProductId> = products.iter().map(|p| pid(p)).collect();
        store.add_order(
            Order {
                id: OrderId(id.to_owned()),
                user_id: UserId(user.to_owned()),
                created_at: Utc::now(),
            },
            &ids,
        );
    }

    /// Catalog with two-product co-purchase signal: `anchor` was ordered
    /// five times, always with `companion`.
    fn co_purchase_store() -> InMemoryRecommendationStore {
        let store = InMemoryRecommendationStore::new();
        store.add_product(product("anchor", Some("Energy"), true, 10));
        store.add_product(product("companion", Some("Energy"), true, 20));
        for n in 0..5 {
            seed_order(&store, &format!("o{n}"), &format!("buyer-{n}"), &["anchor", "companion"]);
        }
        store
    }

    #[tokio::test]
    async fn bought_together_returns_the_analyzer_output() {
        let engine = RecommendationEngine::new(co_purchase_store());
        let results = engine
            .frequently_bought_together(&pid("anchor"), FrequentlyBoughtTogetherOptions::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.0, "companion");
        assert!((results[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn bought_together_never_returns_the_seed() {
        let engine = RecommendationEngine::new(co_purchase_store());
        for seed in ["anchor", "companion"] {
            let results = engine
                .frequently_bought_together(&pid(seed), FrequentlyBoughtTogetherOptions::default())
                .await
                .unwrap();
            assert!(results.iter().all(|r| r.id.0 != seed));
        }
    }

    #[tokio::test]
    async fn unordered_product_falls_back_to_its_category() {
        let store = co_purchase_store();
        store.add_product(product("newcomer", Some("Energy"), true, 1));
        let engine = RecommendationEngine::new(store);

        let results = engine
            .frequently_bought_together(
                &pid("newcomer"),
                FrequentlyBoughtTogetherOptions::default().with_max_results(20),
            )
            .await
            .unwrap();

        // category fallback: newest Energy products except the seed, 0.5 each
        assert_eq!(
            results.iter().map(|r| r.id.0.as_str()).collect::<Vec<_>>(),
            vec!["anchor", "companion"]
        );
        assert!(results.iter().all(|r| (r.score - 0.5).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn category_fallback_is_capped_at_five() {
        let store = InMemoryRecommendationStore::new();
        store.add_product(product("seed", Some("Garden"), true, 0));
        for n in 0..8 {
            store.add_product(product(&format!("g{n}"), Some("Garden"), true, n + 1));
        }
        let engine = RecommendationEngine::new(store);

        let results = engine
            .frequently_bought_together(
                &pid("seed"),
                FrequentlyBoughtTogetherOptions::default().with_max_results(20),
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 5);

        let tight = engine
            .frequently_bought_together(
                &pid("seed"),
                FrequentlyBoughtTogetherOptions::default().with_max_results(3),
            )
            .await
            .unwrap();
        assert_eq!(tight.len(), 3);
    }

    #[tokio::test]
    async fn category_strategy_skips_inactive_and_orders_by_recency() {
        let store = InMemoryRecommendationStore::new();
        store.add_product(product("e-new", Some("Energy"), true, 1));
        store.add_product(product("e-mid", Some("Energy"), true, 5));
        store.add_product(product("e-old", Some("Energy"), true, 9));
        store.add_product(product("e-retired", Some("Energy"), false, 2));
        let engine = RecommendationEngine::new(store);

        let results = engine
            .category_based("Energy", CategoryOptions::new().with_limit(10))
            .await
            .unwrap();
        assert_eq!(
            results.iter().map(|r| r.id.0.as_str()).collect::<Vec<_>>(),
            vec!["e-new", "e-mid", "e-old"]
        );
        assert!(results.iter().all(|r| (r.score - 0.5).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn empty_category_falls_back_to_popularity() {
        let store = co_purchase_store();
        let engine = RecommendationEngine::new(store);

        let via_category =
            engine.category_based("", CategoryOptions::new().with_limit(5)).await.unwrap();
        let via_popular = engine.popular(5, &[]).await.unwrap();
        assert_eq!(via_category, via_popular);
        assert!(!via_category.is_empty());
    }

    #[tokio::test]
    async fn personalized_without_history_matches_popularity_exactly() {
        let store = co_purchase_store();
        let engine = RecommendationEngine::new(store);
        let exclude = vec![pid("companion")];

        let personalized = engine
            .personalized(
                &UserId("stranger".to_owned()),
                PersonalizedOptions::new().with_limit(5).with_exclusions(exclude.clone()),
            )
            .await
            .unwrap();
        let popular = engine.popular(5, &exclude).await.unwrap();
        assert_eq!(personalized, popular);
    }

    #[tokio::test]
    async fn personalized_accumulates_across_purchases_and_skips_owned() {
        let store = InMemoryRecommendationStore::new();
        for id in ["s1", "s2", "hit", "owned"] {
            store.add_product(product(id, Some("Audio"), true, 3));
        }
        // "hit" rides along with both of the user's past purchases.
        for n in 0..4 {
            seed_order(&store, &format!("a{n}"), &format!("x{n}"), &["s1", "hit"]);
            seed_order(&store, &format!("b{n}"), &format!("y{n}"), &["s2", "hit"]);
            seed_order(&store, &format!("c{n}"), &format!("z{n}"), &["s1", "owned"]);
        }
        seed_order(&store, "mine-1", "me", &["s1", "s2"]);
        seed_order(&store, "mine-2", "me", &["owned"]);
        let engine = RecommendationEngine::new(store);

        let results = engine
            .personalized(&UserId("me".to_owned()), PersonalizedOptions::new())
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.id.0.as_str()).collect();
        assert!(ids.contains(&"hit"));
        // already-purchased products never come back
        assert!(!ids.contains(&"owned"));
        assert!(!ids.contains(&"s1"));
        assert!(!ids.contains(&"s2"));
        // both seeds contribute, sum exceeds 1.0 and is capped
        assert!((results[0].score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn order_history_alias_matches_personalized() {
        let engine = RecommendationEngine::new(co_purchase_store());
        let user = UserId("buyer-0".to_owned());
        let via_alias =
            engine.order_history(&user, PersonalizedOptions::new()).await.unwrap();
        let via_personalized =
            engine.personalized(&user, PersonalizedOptions::new()).await.unwrap();
        assert_eq!(via_alias, via_personalized);
    }

    #[tokio::test]
    async fn cart_accumulation_is_order_independent() {
        let store = InMemoryRecommendationStore::new();
        for id in ["s1", "s2", "hit", "also"] {
            store.add_product(product(id, Some("Audio"), true, 3));
        }
        for n in 0..4 {
            let mut cart = vec!["s1", "hit"];
            if n < 3 {
                cart.push("also");
            }
            seed_order(&store, &format!("a{n}"), &format!("x{n}"), &cart);
            seed_order(&store, &format!("b{n}"), &format!("y{n}"), &["s2", "hit"]);
        }
        let engine = RecommendationEngine::new(store);

        let forward = engine
            .cart_based(&[pid("s1"), pid("s2")], CartOptions::new())
            .await
            .unwrap();
        let reversed = engine
            .cart_based(&[pid("s2"), pid("s1")], CartOptions::new())
            .await
            .unwrap();
        assert_eq!(forward, reversed);
        assert!(!forward.is_empty());
        // multi-seed candidate outranks the single-seed one
        assert_eq!(forward[0].id.0, "hit");
        assert!(forward.iter().all(|r| r.score <= 1.0));
    }

    #[tokio::test]
    async fn cart_skips_cart_contents_and_exclusions() {
        let store = InMemoryRecommendationStore::new();
        for id in ["s1", "hit", "vetoed"] {
            store.add_product(product(id, Some("Audio"), true, 3));
        }
        for n in 0..4 {
            seed_order(&store, &format!("a{n}"), &format!("x{n}"), &["s1", "hit", "vetoed"]);
        }
        let engine = RecommendationEngine::new(store);

        let results = engine
            .cart_based(
                &[pid("s1")],
                CartOptions::new().with_exclusions(vec![pid("vetoed")]),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.0.as_str()).collect();
        assert_eq!(ids, vec!["hit"]);
    }

    #[tokio::test]
    async fn empty_cart_matches_popularity_exactly() {
        let engine = RecommendationEngine::new(co_purchase_store());
        let via_cart =
            engine.cart_based(&[], CartOptions::new().with_limit(5)).await.unwrap();
        let via_popular = engine.popular(5, &[]).await.unwrap();
        assert_eq!(via_cart, via_popular);
    }

    #[tokio::test]
    async fn popularity_normalizes_before_exclusion() {
        let store = InMemoryRecommendationStore::new();
        store.add_product(product("top", None, true, 1));
        store.add_product(product("second", None, true, 2));
        for n in 0..10 {
            let mut cart = vec!["top"];
            if n < 6 {
                cart.push("second");
            }
            seed_order(&store, &format!("o{n}"), &format!("u{n}"), &cart);
        }
        let engine = RecommendationEngine::new(store);

        let results = engine.popular(5, &[pid("top")]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.0, "second");
        // still normalized against top's pre-exclusion count of 10
        assert!((results[0].score - 0.6).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn cold_catalog_falls_back_to_recent_actives_at_low_score() {
        let store = InMemoryRecommendationStore::new();
        store.add_product(product("fresh", None, true, 1));
        store.add_product(product("stale", None, true, 30));
        store.add_product(product("hidden", None, false, 0));
        let engine = RecommendationEngine::new(store);

        let results = engine
            .cart_based(&[], CartOptions::new().with_limit(5))
            .await
            .unwrap();
        assert_eq!(
            results.iter().map(|r| r.id.0.as_str()).collect::<Vec<_>>(),
            vec!["fresh", "stale"]
        );
        assert!(results.iter().all(|r| (r.score - 0.3).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn exclusions_never_leak_into_any_strategy() {
        let store = co_purchase_store();
        let engine = RecommendationEngine::new(store);
        let exclude = vec![pid("companion")];

        let fbt = engine
            .frequently_bought_together(&pid("anchor"), FrequentlyBoughtTogetherOptions::default())
            .await
            .unwrap();
        // companion is the only signal; excluding it empties every chain
        let personalized = engine
            .personalized(
                &UserId("stranger".to_owned()),
                PersonalizedOptions::new().with_exclusions(exclude.clone()),
            )
            .await
            .unwrap();
        let category = engine
            .category_based("Energy", CategoryOptions::new().with_exclusions(exclude.clone()))
            .await
            .unwrap();
        let cart = engine
            .cart_based(&[pid("anchor")], CartOptions::new().with_exclusions(exclude.clone()))
            .await
            .unwrap();

        assert!(fbt.iter().any(|r| r.id.0 == "companion"));
        for results in [personalized, category, cart] {
            assert!(results.iter().all(|r| r.id.0 != "companion"));
        }
    }

    #[tokio::test]
    async fn every_reported_score_stays_within_unit_interval() {
        let engine = RecommendationEngine::new(co_purchase_store());
        let all = [
            engine
                .frequently_bought_together(
                    &pid("anchor"),
                    FrequentlyBoughtTogetherOptions::default(),
                )
                .await
                .unwrap(),
            engine
                .personalized(&UserId("buyer-0".to_owned()), PersonalizedOptions::new())
                .await
                .unwrap(),
            engine.category_based("Energy", CategoryOptions::new()).await.unwrap(),
            engine.cart_based(&[pid("anchor")], CartOptions::new()).await.unwrap(),
        ];
        for results in all {
            assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
        }
    }
}
