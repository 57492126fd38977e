use crate::gui_bridge::model::FeedCatalog;
use civiccore::feed_interface::Feed;
use log::{info, warn};
use rand::Rng;
use serde_json::json;
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};
use warp::{http::StatusCode, Filter, Rejection, Reply};

pub type SharedCatalog = Arc<RwLock<FeedCatalog>>;

fn read(catalog: &SharedCatalog) -> RwLockReadGuard<'_, FeedCatalog> {
    catalog.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(catalog: &SharedCatalog) -> RwLockWriteGuard<'_, FeedCatalog> {
    catalog
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn error_reply(status: StatusCode, message: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
}

/// HTTP face of the simulator: serves feed snapshots the way the
/// operations-center API would, including latency and injected failures.
pub struct FeedBridge {
    catalog: SharedCatalog,
}

impl FeedBridge {
    pub fn new(catalog: FeedCatalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }

    pub fn catalog(&self) -> SharedCatalog {
        Arc::clone(&self.catalog)
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let catalog = self.catalog();
        let catalog_filter = warp::any().map(move || catalog.clone());

        let list_route = warp::path!("feeds")
            .and(warp::get())
            .and(catalog_filter.clone())
            .map(|catalog: SharedCatalog| {
                let catalog = read(&catalog);
                let feeds: Vec<_> = Feed::ALL
                    .iter()
                    .map(|feed| {
                        json!({
                            "id": feed.id(),
                            "title": feed.title(),
                            "revision": catalog.revision(*feed),
                        })
                    })
                    .collect();
                warp::reply::with_status(warp::reply::json(&feeds), StatusCode::OK)
            });

        let feed_route = warp::path!("feeds" / String)
            .and(warp::get())
            .and(catalog_filter.clone())
            .and_then(serve_feed);

        let regenerate_route = warp::path!("feeds" / String / "regenerate")
            .and(warp::post())
            .and(catalog_filter)
            .map(|feed_id: String, catalog: SharedCatalog| {
                let feed = match feed_id.parse::<Feed>() {
                    Ok(feed) => feed,
                    Err(err) => return error_reply(StatusCode::NOT_FOUND, err.to_string()),
                };
                let mut catalog = write(&catalog);
                match catalog
                    .regenerate(feed)
                    .map(|snapshot| snapshot.records.len())
                {
                    Ok(count) => {
                        let revision = catalog.revision(feed);
                        info!(
                            "[bridge] regenerated {} -> revision {} ({} records)",
                            feed, revision, count
                        );
                        warp::reply::with_status(
                            warp::reply::json(&json!({ "feed": feed.id(), "revision": revision })),
                            StatusCode::OK,
                        )
                    }
                    Err(err) => {
                        warn!("[bridge] regenerate {} failed: {:#}", feed, err);
                        error_reply(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                    }
                }
            });

        list_route
            .or(feed_route)
            .unify()
            .or(regenerate_route)
            .unify()
            .with(warp::log("feed_simulator::bridge"))
    }

    pub async fn serve(self, address: SocketAddr) {
        info!("[bridge] serving feeds on http://{}", address);
        warp::serve(self.routes()).run(address).await;
    }
}

/// Latency plus or minus up to `jitter_ms`, floored at zero.
fn sample_delay<R: Rng>(rng: &mut R, latency_ms: u64, jitter_ms: u64) -> Duration {
    if jitter_ms == 0 {
        return Duration::from_millis(latency_ms);
    }
    let offset = rng.gen_range(0..=jitter_ms);
    let millis = if rng.gen_bool(0.5) {
        latency_ms.saturating_add(offset)
    } else {
        latency_ms.saturating_sub(offset)
    };
    Duration::from_millis(millis)
}

async fn serve_feed(
    feed_id: String,
    catalog: SharedCatalog,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let feed = match feed_id.parse::<Feed>() {
        Ok(feed) => feed,
        Err(err) => return Ok(error_reply(StatusCode::NOT_FOUND, err.to_string())),
    };

    let (delay, fail) = {
        let config = read(&catalog).config().clone();
        let mut rng = rand::thread_rng();
        (
            sample_delay(&mut rng, config.latency_ms, config.jitter_ms),
            rng.gen_bool(config.failure_rate.clamp(0.0, 1.0)),
        )
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if fail {
        warn!("[bridge] injecting failure for {}", feed);
        return Ok(error_reply(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("feed {} temporarily unavailable", feed),
        ));
    }

    let catalog = read(&catalog);
    match catalog.snapshot(feed) {
        Some(snapshot) => Ok(warp::reply::with_status(
            warp::reply::json(snapshot),
            StatusCode::OK,
        )),
        None => Ok(error_reply(
            StatusCode::NOT_FOUND,
            format!("feed {} has no snapshot", feed),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::SimulatorConfig;
    use civiccore::feed_interface::{decode_feed_body, FeedResponse};
    use rand::{rngs::StdRng, SeedableRng};

    fn quiet_config() -> SimulatorConfig {
        SimulatorConfig {
            latency_ms: 0,
            jitter_ms: 0,
            records_per_feed: 4,
            ..Default::default()
        }
    }

    fn bridge(config: SimulatorConfig) -> FeedBridge {
        FeedBridge::new(FeedCatalog::build(config).unwrap())
    }

    #[test]
    fn delay_spreads_both_sides_of_latency() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<u64> = (0..400)
            .map(|_| sample_delay(&mut rng, 100, 50).as_millis() as u64)
            .collect();
        assert!(samples.iter().all(|ms| (50..=150).contains(ms)));
        assert!(samples.iter().any(|ms| *ms < 100));
        assert!(samples.iter().any(|ms| *ms > 100));
    }

    #[test]
    fn delay_saturates_on_extreme_settings() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let high = sample_delay(&mut rng, u64::MAX, u64::MAX);
            assert!(high.as_millis() <= u64::MAX as u128);
            let low = sample_delay(&mut rng, 10, 1_000);
            assert!(low.as_millis() <= 1_010);
        }
        assert_eq!(sample_delay(&mut rng, 25, 0), Duration::from_millis(25));
    }

    #[tokio::test]
    async fn known_feed_serves_decodable_snapshot() {
        let routes = bridge(quiet_config()).routes();
        let response = warp::test::request()
            .method("GET")
            .path("/feeds/sirens")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let records = decode_feed_body("sirens", response.body()).unwrap();
        assert_eq!(records.len(), 4);
    }

    #[tokio::test]
    async fn unknown_feed_is_not_found() {
        let routes = bridge(quiet_config()).routes();
        let response = warp::test::request()
            .method("GET")
            .path("/feeds/volcanoes")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failure_injection_answers_503() {
        let config = SimulatorConfig {
            failure_rate: 1.0,
            ..quiet_config()
        };
        let routes = bridge(config).routes();
        let response = warp::test::request()
            .method("GET")
            .path("/feeds/beaches")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn regenerate_advances_revision() {
        let bridge = bridge(quiet_config());
        let routes = bridge.routes();
        let response = warp::test::request()
            .method("POST")
            .path("/feeds/traffic/regenerate")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read(&bridge.catalog()).revision(Feed::Traffic), 1);

        let response = warp::test::request()
            .method("GET")
            .path("/feeds/traffic")
            .reply(&routes)
            .await;
        let body: FeedResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.feed, "traffic");
    }

    #[tokio::test]
    async fn feed_list_names_every_feed() {
        let routes = bridge(quiet_config()).routes();
        let response = warp::test::request()
            .method("GET")
            .path("/feeds")
            .reply(&routes)
            .await;
        let listed: Vec<serde_json::Value> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(listed.len(), Feed::ALL.len());
    }
}
