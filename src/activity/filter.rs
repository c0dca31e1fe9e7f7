use std::num::NonZeroUsize;

use itertools::Itertools;

use super::ActivityRecord;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum SearchType {
    #[default]
    All,
    SearchesOnly,
    VisitedOnly,
}
impl SearchType {
    pub fn accepts(self, record: &ActivityRecord) -> bool {
        match self {
            Self::All => true,
            Self::SearchesOnly => record.search_query().is_some(),
            Self::VisitedOnly => record.site_title().is_some(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Limit {
    /// The first `n` entries, i.e. the latest ones in an export.
    Head(NonZeroUsize),
    /// The last `n` entries, i.e. the oldest ones.
    Tail(NonZeroUsize),
    /// Every `n`-th entry starting from the first.
    Every(NonZeroUsize),
}
impl Limit {
    pub fn apply<T>(self, items: Vec<T>) -> Vec<T> {
        match self {
            Self::Head(n) => items.into_iter().take(n.get()).collect(),
            Self::Tail(n) => {
                let skip = items.len().saturating_sub(n.get());
                items.into_iter().skip(skip).collect()
            }
            Self::Every(n) => items.into_iter().step_by(n.get()).collect(),
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Filter {
    pub search_type: SearchType,
    pub limit: Option<Limit>,
}
impl Filter {
    /// Type filter first, then the limit.
    pub fn apply(&self, records: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
        let records = records
            .into_iter()
            .filter(|record| self.search_type.accepts(record))
            .collect_vec();
        match self.limit {
            Some(limit) => limit.apply(records),
            None => records,
        }
    }
}
