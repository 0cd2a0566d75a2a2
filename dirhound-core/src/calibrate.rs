// Soft-404 calibration against paths that cannot exist

use crate::filter::Baseline;
use crate::target::build_probe_url;
use dirhound_scanner::Prober;
use futures::future::join_all;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

const CALIBRATION_PATTERNS: [&str; 3] = [
    "dirhound_{}_calibration",
    "nonexistent_{}_page",
    "random_{}_test_path",
];

/// Baselines gathered before phase 1
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    pub baselines: Vec<Baseline>,
}

impl Calibration {
    pub fn samples(&self) -> usize {
        self.baselines.len()
    }

    /// Most frequent sampled size
    pub fn common_size(&self) -> Option<u64> {
        most_common(self.baselines.iter().map(|b| b.size))
    }

    /// Most frequent sampled body hash
    pub fn common_hash(&self) -> Option<String> {
        most_common(self.baselines.iter().map(|b| b.body_hash.clone()))
    }
}

/// Synthetic, timestamp-salted paths under `base_url`.
pub fn calibration_urls(base_url: &str) -> Vec<String> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    CALIBRATION_PATTERNS
        .iter()
        .enumerate()
        .map(|(i, pattern)| {
            let word = pattern.replace("{}", &(nanos + i as u128).to_string());
            build_probe_url(base_url, &word)
                .unwrap_or_else(|_| format!("{}/{}", base_url.trim_end_matches('/'), word))
        })
        .collect()
}

/// Probe every calibration path concurrently. Failed probes are skipped; an
/// empty result disables baseline filtering for the scan.
pub async fn calibrate(prober: &Prober, base_url: &str) -> Calibration {
    let urls = calibration_urls(base_url);
    let probes = urls.iter().map(|url| prober.get_with_body(url));
    let results = join_all(probes).await;

    let baselines: Vec<Baseline> = results
        .into_iter()
        .filter_map(|result| {
            if result.is_error() || result.status_code == 0 {
                debug!("Calibration probe {} failed: {:?}", result.url, result.error);
                return None;
            }
            Some(Baseline {
                body_hash: result.body_hash,
                size: result.size.unwrap_or(0),
            })
        })
        .collect();

    info!(
        "Calibration sampled {}/{} not-found responses",
        baselines.len(),
        urls.len()
    );

    Calibration { baselines }
}

fn most_common<T, I>(values: I) -> Option<T>
where
    T: std::hash::Hash + Eq + Clone + Ord,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    // Ties resolve to the smallest value so the report is deterministic.
    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(value, _)| value)
}
