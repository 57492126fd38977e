use crate::generator::template::{template_for, CITY_CENTER};
use anyhow::Context;
use civiccore::feed_interface::{Feed, FeedResponse, WireRecord};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Configuration for generating one synthetic feed snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub records: usize,
    pub seed: u64,
    /// Spread of generated positions around the city center, in degrees.
    pub spread_deg: f64,
    /// Fraction of records published without an id (identity-by-fields).
    pub anonymous_ratio: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            records: 12,
            seed: 0,
            spread_deg: 0.18,
            anonymous_ratio: 0.0,
        }
    }
}

impl GeneratorConfig {
    fn normalized_spread(&self) -> f64 {
        self.spread_deg.clamp(0.0, 1.0)
    }
}

fn pick_weighted(rng: &mut StdRng, weights: &[u32]) -> usize {
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return 0;
    }
    let mut roll = rng.gen_range(0..total);
    for (index, &weight) in weights.iter().enumerate() {
        if roll < weight {
            return index;
        }
        roll -= weight;
    }
    weights.len() - 1
}

fn unix_timestamp() -> anyhow::Result<String> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?;
    Ok(elapsed.as_secs().to_string())
}

/// Builds a deterministic snapshot of `feed` for the given seed.
pub fn build_feed_response(feed: Feed, config: &GeneratorConfig) -> anyhow::Result<FeedResponse> {
    let template = template_for(feed);
    let mut rng = StdRng::seed_from_u64(config.seed ^ (feed as u64).wrapping_mul(0x9E37_79B9));
    let spread = config.normalized_spread();
    let mut records = Vec::with_capacity(config.records);

    for index in 0..config.records {
        let base = template.names[index % template.names.len()];
        let name = if template.names.len() > index {
            base.to_string()
        } else {
            format!("{} {}", base, index + 1)
        };
        let status = template.statuses[pick_weighted(&mut rng, template.weights)];

        let (latitude, longitude) = if template.positioned {
            let lat = CITY_CENTER.0 + rng.gen_range(-spread..=spread);
            let lon = CITY_CENTER.1 + rng.gen_range(-spread..=spread);
            (Some(lat), Some(lon))
        } else {
            (None, None)
        };

        let mut fields = BTreeMap::new();
        if let Some((field, values)) = template.extra_field {
            let value = values[rng.gen_range(0..values.len())];
            fields.insert(field.to_string(), value.to_string());
        }

        let anonymous = rng.gen_bool(config.anonymous_ratio.clamp(0.0, 1.0));
        records.push(WireRecord {
            id: (!anonymous).then(|| format!("{}{}", template.prefix, index + 1)),
            name,
            status: status.to_string(),
            category: None,
            latitude,
            longitude,
            fields,
        });
    }

    Ok(FeedResponse {
        feed: feed.id().to_string(),
        generated_at: Some(unix_timestamp()?),
        records,
    })
}
