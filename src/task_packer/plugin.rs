//! Filter/score plugins for node-profile candidate selection, generalizing
//! the teacher's `core/scheduler/plugin.rs` `Fit`/`LeastAllocatedResources`
//! registry from `Node`/`Pod` to `NodeProfile`/`Resources`.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::common::Resources;
use crate::model::NodeProfile;

pub enum PluginType {
    FilterPlugin(Box<dyn FilterPlugin>),
    ScorePlugin(Box<dyn ScorePlugin>),
}

lazy_static! {
    pub static ref PLUGIN_REGISTRY: HashMap<&'static str, PluginType> = {
        HashMap::from([
            ("Fit", PluginType::FilterPlugin(Box::new(Fit {}))),
            (
                "TightestMemoryFit",
                PluginType::ScorePlugin(Box::new(TightestMemoryFit {})),
            ),
        ])
    };
}

pub trait FilterPlugin: Send + Sync {
    fn filter<'a>(&self, requests: &Resources, profiles: Vec<&'a NodeProfile>) -> Vec<&'a NodeProfile>;
}

pub trait ScorePlugin: Send + Sync {
    fn score(&self, requests: &Resources, profile: &NodeProfile) -> f64;
}

/// Keeps only profiles with enough available CPU and memory for the request
/// (§4.C BFD: `N' = {n : n.cpuAvailable >= c && n.memoryAvailable >= m}`).
pub struct Fit {}
impl FilterPlugin for Fit {
    fn filter<'a>(&self, requests: &Resources, profiles: Vec<&'a NodeProfile>) -> Vec<&'a NodeProfile> {
        profiles
            .into_iter()
            .filter(|p| {
                requests.cpu_millicores <= p.spec.cpu_available
                    && requests.memory_mib <= p.spec.memory_available
            })
            .collect()
    }
}

/// Higher score for less leftover memory after placement: Best-Fit Decreasing
/// picks the node with the tightest memory fit (§4.C). Expressed as a score
/// so selection reduces to "max score wins", matching the scorer shape the
/// teacher's plugin trait already uses.
pub struct TightestMemoryFit {}
impl ScorePlugin for TightestMemoryFit {
    fn score(&self, _requests: &Resources, profile: &NodeProfile) -> f64 {
        -(profile.spec.memory_available as f64)
    }
}

fn filter_plugin(name: &str) -> &'static dyn FilterPlugin {
    match PLUGIN_REGISTRY.get(name) {
        Some(PluginType::FilterPlugin(plugin)) => plugin.as_ref(),
        _ => panic!("{name:?} is not a registered filter plugin"),
    }
}

fn score_plugin(name: &str) -> &'static dyn ScorePlugin {
    match PLUGIN_REGISTRY.get(name) {
        Some(PluginType::ScorePlugin(plugin)) => plugin.as_ref(),
        _ => panic!("{name:?} is not a registered score plugin"),
    }
}

/// Filters `profiles` through the `"Fit"` plugin, then scores every survivor
/// through `"TightestMemoryFit"` and returns the highest-scoring one,
/// tie-broken by `profiles`' own insertion order (first max wins) — the
/// filter-then-score flow the teacher's `PLUGIN_REGISTRY` is built for,
/// rather than a bespoke sort (§4.C BFD).
pub fn best_fit<'a>(requests: &Resources, profiles: Vec<&'a NodeProfile>) -> Option<&'a NodeProfile> {
    let fit = filter_plugin("Fit");
    let scorer = score_plugin("TightestMemoryFit");

    let candidates = fit.filter(requests, profiles);
    let mut best: Option<(&'a NodeProfile, f64)> = None;
    for candidate in candidates {
        let score = scorer.score(requests, candidate);
        match &best {
            Some((_, best_score)) if score <= *best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(profile, _)| profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node_profile::NodeProfileSpec;
    use crate::model::PoolTag;

    fn profile(name: &str, cpu_av: u32, mem_av: u64) -> NodeProfile {
        NodeProfile::new(
            name,
            NodeProfileSpec {
                instance_name: name.to_string(),
                instance_type: "e2-standard-2".to_string(),
                pool_tag: PoolTag::LongRunning,
                cpu_capacity: cpu_av,
                memory_capacity: mem_av,
                cpu_available: cpu_av,
                memory_available: mem_av,
                runtime: 0,
            },
        )
    }

    #[test]
    fn fit_drops_insufficient_profiles() {
        let a = profile("a", 4000, 8000);
        let b = profile("b", 500, 1000);
        let fit = Fit {};
        let kept = fit.filter(&Resources::new(1000, 2000), vec![&a, &b]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].metadata.name, "a");
    }

    #[test]
    fn tightest_memory_fit_prefers_smaller_leftover() {
        let roomy = profile("roomy", 4000, 8000);
        let tight = profile("tight", 4000, 4000);
        let scorer = TightestMemoryFit {};
        let requests = Resources::new(1000, 2000);
        assert!(scorer.score(&requests, &tight) > scorer.score(&requests, &roomy));
    }

    #[test]
    fn best_fit_filters_then_picks_highest_scoring_survivor() {
        let too_small = profile("too-small", 500, 1000);
        let roomy = profile("roomy", 4000, 8000);
        let tight = profile("tight", 4000, 4000);
        let requests = Resources::new(1000, 2000);

        let picked = best_fit(&requests, vec![&too_small, &roomy, &tight]).unwrap();
        assert_eq!(picked.metadata.name, "tight");
    }

    #[test]
    fn best_fit_ties_keep_first_by_insertion_order() {
        let a = profile("a", 4000, 4000);
        let b = profile("b", 4000, 4000);
        let requests = Resources::new(1000, 2000);

        let picked = best_fit(&requests, vec![&a, &b]).unwrap();
        assert_eq!(picked.metadata.name, "a");
    }
}
