//! Best-Fit Decreasing placement (§4.C): plain BFD for long-running tasks,
//! Time-Bin BFD for batch tasks.

use std::collections::BTreeMap;

use super::plugin;
use crate::common::Resources;
use crate::model::NodeProfile;

/// Filters to profiles with sufficient headroom, then returns the one with
/// the least leftover memory (tightest fit), tie-broken by insertion order
/// of `profiles`, via the `Fit`/`TightestMemoryFit` plugin pair (§4.C).
pub fn select_bfd<'a>(requests: &Resources, profiles: &'a [NodeProfile]) -> Option<&'a NodeProfile> {
    plugin::best_fit(requests, profiles.iter().collect())
}

/// Time-Bin BFD (§4.C): groups candidates by `node_bin = floor(runtime / S)`,
/// searches the task's own bin first, then bins strictly greater than
/// `task_bin` ascending, then bins strictly less than `task_bin` descending;
/// BFD is applied within each bin.
pub fn select_time_bin_bfd<'a>(
    requests: &Resources,
    task_runtime_secs: u64,
    scaling_cycle_secs: u64,
    profiles: &'a [NodeProfile],
) -> Option<&'a NodeProfile> {
    if scaling_cycle_secs == 0 {
        return select_bfd(requests, profiles);
    }

    let task_bin = task_runtime_secs / scaling_cycle_secs;

    let mut by_bin: BTreeMap<u64, Vec<&'a NodeProfile>> = BTreeMap::new();
    for profile in profiles {
        let node_bin = profile.spec.runtime / scaling_cycle_secs;
        by_bin.entry(node_bin).or_default().push(profile);
    }

    let mut ordered_bins: Vec<u64> = Vec::with_capacity(by_bin.len());
    if by_bin.contains_key(&task_bin) {
        ordered_bins.push(task_bin);
    }
    ordered_bins.extend(by_bin.range((task_bin + 1)..).map(|(bin, _)| *bin));
    ordered_bins.extend(by_bin.range(..task_bin).rev().map(|(bin, _)| *bin));

    for bin in ordered_bins {
        let bin_profiles = by_bin[&bin].clone();
        if let Some(best) = plugin::best_fit(requests, bin_profiles) {
            return Some(best);
        }
    }
    None
}
