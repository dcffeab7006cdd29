use crate::domain::{Partition, RunRecord};
use crate::keywords::KeywordSet;

pub const EXCLUDED: &str = "excluded";
pub const INCLUDED: &str = "included";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub excluded: Partition,
    pub included: Partition,
}

pub fn filter_samples(runs: Vec<RunRecord>, fields: &[usize], blacklist: &KeywordSet) -> FilterOutcome {
    let mut excluded = Partition::new(EXCLUDED);
    let mut included = Partition::new(INCLUDED);
    for run in runs {
        if blacklist.find_in(&run, fields).is_some() {
            excluded.push(run);
        } else {
            included.push(run);
        }
    }
    FilterOutcome { excluded, included }
}
