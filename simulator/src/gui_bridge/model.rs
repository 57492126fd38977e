use crate::generator::profile::build_feed_response;
use crate::workflow::config::SimulatorConfig;
use civiccore::feed_interface::{Feed, FeedResponse};
use std::collections::BTreeMap;

/// Current snapshot of every feed served by the bridge.
#[derive(Debug, Clone)]
pub struct FeedCatalog {
    config: SimulatorConfig,
    revisions: BTreeMap<Feed, u64>,
    snapshots: BTreeMap<Feed, FeedResponse>,
}

impl FeedCatalog {
    pub fn build(config: SimulatorConfig) -> anyhow::Result<Self> {
        let mut catalog = Self {
            config,
            revisions: BTreeMap::new(),
            snapshots: BTreeMap::new(),
        };
        for feed in Feed::ALL {
            catalog.rebuild(feed, 0)?;
        }
        Ok(catalog)
    }

    fn rebuild(&mut self, feed: Feed, revision: u64) -> anyhow::Result<()> {
        let response = build_feed_response(feed, &self.config.to_generator_config(revision))?;
        self.revisions.insert(feed, revision);
        self.snapshots.insert(feed, response);
        Ok(())
    }

    pub fn snapshot(&self, feed: Feed) -> Option<&FeedResponse> {
        self.snapshots.get(&feed)
    }

    pub fn revision(&self, feed: Feed) -> u64 {
        self.revisions.get(&feed).copied().unwrap_or(0)
    }

    /// Advances the feed to its next revision, churning statuses.
    pub fn regenerate(&mut self, feed: Feed) -> anyhow::Result<&FeedResponse> {
        let next = self.revision(feed) + 1;
        self.rebuild(feed, next)?;
        self.snapshots
            .get(&feed)
            .ok_or_else(|| anyhow::anyhow!("feed {} missing after rebuild", feed))
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}
