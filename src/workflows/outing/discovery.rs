use serde::Serialize;

use super::domain::{Difficulty, RouteDraft};
use super::store::{OutingStore, RouteFilter, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("route source unreachable: {0}")]
    Transport(String),
    #[error("route source returned an unusable page: {0}")]
    Parse(String),
}

/// Capability interface for discovering candidate routes around a location.
pub trait RouteDiscovery: Send + Sync {
    fn fetch_routes(
        &self,
        location: &str,
        filter: &RouteFilter,
    ) -> Result<Vec<RouteDraft>, DiscoveryError>;
}

/// Fetch through the gateway, degrading to the built-in catalog when the
/// source fails. Never raises to the caller.
pub fn fetch_or_fallback(
    gateway: &dyn RouteDiscovery,
    location: &str,
    filter: &RouteFilter,
) -> Vec<RouteDraft> {
    match gateway.fetch_routes(location, filter) {
        Ok(routes) => routes,
        Err(err) => {
            tracing::warn!(%location, %err, "route discovery degraded to built-in catalog");
            catalog_routes(location)
                .into_iter()
                .filter(|route| {
                    route.distance_km <= filter.max_distance_km
                        && route.elevation_m <= filter.max_elevation_m
                        && route.duration_hours <= filter.max_duration_hours
                })
                .collect()
        }
    }
}

/// Discovery backed purely by the built-in catalog; the default gateway
/// when no scraper is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogDiscovery;

impl RouteDiscovery for CatalogDiscovery {
    fn fetch_routes(
        &self,
        location: &str,
        filter: &RouteFilter,
    ) -> Result<Vec<RouteDraft>, DiscoveryError> {
        Ok(catalog_routes(location)
            .into_iter()
            .filter(|route| {
                route.distance_km <= filter.max_distance_km
                    && route.elevation_m <= filter.max_elevation_m
                    && route.duration_hours <= filter.max_duration_hours
            })
            .collect())
    }
}

/// Outcome of a catalog seeding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Load the built-in catalog into the store, deduplicating by exact name
/// within the same location.
pub fn seed_catalog(store: &dyn OutingStore) -> Result<SeedReport, StoreError> {
    let drafts: Vec<RouteDraft> = ["苏州", "上海"]
        .into_iter()
        .flat_map(catalog_routes)
        .collect();
    let total = drafts.len();
    let mut inserted = 0;
    let mut skipped = 0;

    for draft in drafts {
        // Dedup must see every stored route, including ones outside the
        // default day-trip thresholds.
        let filter = RouteFilter {
            location: Some(draft.location.clone()),
            max_distance_km: f64::MAX,
            max_elevation_m: f64::MAX,
            max_duration_hours: f64::MAX,
        };
        let existing = store.list_routes(&filter, 100, 0)?;
        if existing.iter().any(|route| route.name == draft.name) {
            skipped += 1;
        } else {
            store.insert_route(draft)?;
            inserted += 1;
        }
    }

    Ok(SeedReport {
        inserted,
        skipped,
        total,
    })
}

fn entry(
    name: &str,
    distance_km: f64,
    elevation_m: f64,
    duration_hours: f64,
    hot_score: f64,
    tags: &str,
    description: &str,
    location: &str,
) -> RouteDraft {
    RouteDraft {
        name: name.to_string(),
        distance_km,
        elevation_m,
        duration_hours,
        difficulty: Difficulty::Beginner,
        hot_score,
        tags: tags.to_string(),
        cover_url: String::new(),
        description: description.to_string(),
        location: location.to_string(),
        source_url: String::new(),
    }
}

/// Curated light-hike routes per home location. Every entry fits the
/// day-trip thresholds in [`RouteFilter::default`].
pub fn catalog_routes(location: &str) -> Vec<RouteDraft> {
    match location {
        "苏州" => vec![
            entry(
                "东山环线·碧螺春茶园之旅",
                12.5,
                650.0,
                5.5,
                9.2,
                "风景,茶文化,轻松",
                "穿越东山茶园，欣赏太湖美景，感受茶文化",
                "苏州东山",
            ),
            entry(
                "西山缥缈峰轻徒步",
                14.0,
                780.0,
                6.0,
                8.9,
                "山景,太湖,观景",
                "登顶缥缈峰，俯瞰太湖全景",
                "苏州西山",
            ),
            entry(
                "上方山森林徒步",
                8.5,
                350.0,
                4.0,
                8.7,
                "森林,亲子,轻松",
                "漫步森林氧吧，适合家庭出游",
                "苏州上方山",
            ),
            entry(
                "灵岩山古寺徒步",
                10.0,
                450.0,
                4.5,
                8.5,
                "古迹,山景,文化",
                "探访千年古寺，登高望远",
                "苏州灵岩山",
            ),
            entry(
                "天平山红叶徒步",
                9.5,
                400.0,
                4.2,
                8.3,
                "红叶,风景,秋季",
                "秋季赏红叶绝佳去处",
                "苏州天平山",
            ),
            entry(
                "旺山生态徒步",
                11.0,
                500.0,
                5.0,
                8.1,
                "生态,乡村,轻松",
                "走进美丽乡村，体验田园风光",
                "苏州旺山",
            ),
            entry(
                "虞山古道徒步",
                13.5,
                720.0,
                5.8,
                7.9,
                "古道,山景,历史",
                "行走在千年古道上，感受历史沧桑",
                "苏州常熟虞山",
            ),
            entry(
                "同里湖畔徒步",
                7.0,
                200.0,
                3.5,
                7.7,
                "水乡,古镇,轻松",
                "漫步同里湖畔，欣赏水乡风光",
                "苏州同里",
            ),
            entry(
                "穹窿山轻徒步",
                14.5,
                790.0,
                6.0,
                7.5,
                "山景,森林,挑战",
                "苏州最高峰，视野开阔",
                "苏州穹窿山",
            ),
        ],
        "上海" => vec![
            entry(
                "佘山国家森林公园",
                8.0,
                300.0,
                4.0,
                9.0,
                "森林,轻松,亲子",
                "上海近郊徒步首选，适合全家",
                "上海松江佘山",
            ),
            entry(
                "辰山植物园徒步",
                6.5,
                150.0,
                3.0,
                8.8,
                "植物园,风景,轻松",
                "漫步植物园，欣赏奇花异草",
                "上海松江辰山",
            ),
            entry(
                "滨江森林公园徒步",
                10.0,
                200.0,
                4.5,
                8.6,
                "江景,森林,轻松",
                "沿江徒步，感受江风拂面",
                "上海浦东滨江",
            ),
            entry(
                "东平国家森林公园",
                12.0,
                250.0,
                5.0,
                8.4,
                "森林,生态,崇明",
                "崇明岛最大森林公园，天然氧吧",
                "上海崇明东平",
            ),
            entry(
                "滴水湖环湖徒步",
                21.0,
                100.0,
                5.5,
                8.2,
                "湖景,环湖,轻松",
                "环滴水湖一周，欣赏湖光山色",
                "上海临港滴水湖",
            ),
            entry(
                "顾村公园徒步",
                7.5,
                180.0,
                3.5,
                8.0,
                "公园,樱花,轻松",
                "春季赏樱胜地",
                "上海宝山顾村",
            ),
        ],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::outing::store::MemoryStore;

    struct FailingDiscovery;

    impl RouteDiscovery for FailingDiscovery {
        fn fetch_routes(
            &self,
            _location: &str,
            _filter: &RouteFilter,
        ) -> Result<Vec<RouteDraft>, DiscoveryError> {
            Err(DiscoveryError::Transport("connection reset".to_string()))
        }
    }

    #[test]
    fn failed_discovery_degrades_to_the_catalog() {
        let routes = fetch_or_fallback(&FailingDiscovery, "苏州", &RouteFilter::default());
        assert_eq!(routes.len(), 9);
        assert!(routes.iter().any(|r| r.name.contains("东山环线")));
    }

    #[test]
    fn unknown_locations_have_no_catalog_entries() {
        let routes = fetch_or_fallback(&FailingDiscovery, "南京", &RouteFilter::default());
        assert!(routes.is_empty());
    }

    #[test]
    fn catalog_discovery_honors_the_filter_limits() {
        let routes = CatalogDiscovery
            .fetch_routes("上海", &RouteFilter::default())
            .expect("catalog always answers");

        // The 21km lake loop sits outside the day-trip thresholds.
        assert_eq!(routes.len(), 5);
        assert!(routes.iter().all(|r| r.distance_km <= 15.0));
    }

    #[test]
    fn seeding_twice_skips_every_duplicate() {
        let store = MemoryStore::new();

        let first = seed_catalog(&store).expect("first seeding pass");
        assert_eq!(first.inserted, 15);
        assert_eq!(first.skipped, 0);
        assert_eq!(first.total, 15);

        let second = seed_catalog(&store).expect("second seeding pass");
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 15);
    }
}
