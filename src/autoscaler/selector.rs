//! Greedy cost-aware flavor selector (§4.D step 4).
//!
//! Grounded in `original_source/src/autoscaler/autoscaler.py`'s scoring loop
//! and the teacher's `KubeClusterAutoscaler::try_find_fitting_template`
//! (iterative candidate scoring against a remaining-demand accumulator).

use crate::model::VmFlavor;

/// `score(f) = (0.5 * min(remaining_cpu, f.cpu)/f.cpu + 0.5 * min(remaining_mem, f.memGiB)/f.memGiB) / f.price`
fn score(flavor: &VmFlavor, remaining_cpu: f64, remaining_mem_gib: f64) -> f64 {
    let cpu_term = 0.5 * remaining_cpu.min(flavor.cpu_cores) / flavor.cpu_cores;
    let mem_term = 0.5 * remaining_mem_gib.min(flavor.memory_gib) / flavor.memory_gib;
    (cpu_term + mem_term) / flavor.hourly_price
}

/// Repeatedly picks the flavor maximizing `score` against the current
/// remaining demand, subtracts its capacity, until both totals are `<= 0`.
/// Returns the ordered list of picks (by name); empty if demand is already
/// non-positive on entry.
pub fn select_flavors<'a>(
    flavors: &'a [VmFlavor],
    mut remaining_cpu: f64,
    mut remaining_mem_gib: f64,
) -> Vec<&'a VmFlavor> {
    let mut picks = Vec::new();
    // A flavor catalog is validated non-empty and positive-priced at startup
    // (`validate_flavor_catalog`); an empty slice here only arises from a
    // misuse of this function and simply yields no picks.
    while (remaining_cpu > 0.0 || remaining_mem_gib > 0.0) && !flavors.is_empty() {
        let best = flavors
            .iter()
            .max_by(|a, b| {
                score(a, remaining_cpu, remaining_mem_gib)
                    .partial_cmp(&score(b, remaining_cpu, remaining_mem_gib))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("flavors is non-empty");
        picks.push(best);
        remaining_cpu -= best.cpu_cores;
        remaining_mem_gib -= best.memory_gib;
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flavor(name: &str, cpu: f64, mem: f64, price: f64) -> VmFlavor {
        VmFlavor {
            name: name.to_string(),
            cpu_cores: cpu,
            memory_gib: mem,
            hourly_price: price,
        }
    }

    // Scenario 4: flavors {e2-micro:(2,1,0.006), e2-std-2:(2,8,0.0686)},
    // unmet demand (4 cpu, 16 GiB). Expected picks [e2-std-2, e2-std-2].
    #[test]
    fn greedy_selection_matches_reference_scenario() {
        let flavors = vec![
            flavor("e2-micro", 2.0, 1.0, 0.006),
            flavor("e2-standard-2", 2.0, 8.0, 0.0686),
        ];
        let picks = select_flavors(&flavors, 4.0, 16.0);
        let names: Vec<&str> = picks.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["e2-standard-2", "e2-standard-2"]);
    }

    #[test]
    fn non_positive_demand_yields_no_picks() {
        let flavors = vec![flavor("e2-micro", 2.0, 1.0, 0.006)];
        assert!(select_flavors(&flavors, 0.0, 0.0).is_empty());
        assert!(select_flavors(&flavors, -1.0, -1.0).is_empty());
    }
}
