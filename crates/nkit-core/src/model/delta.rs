use std::collections::BTreeSet;

use super::category::MembershipIndex;

/// Desired tag state of one record relative to its current tags.
///
/// Tags are compared as sets; order and duplicates never matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDelta {
    /// Tags currently on the record, as read.
    pub current: Vec<String>,
    /// Current tags that are not category names.
    pub preserved: Vec<String>,
    /// Categories the member belongs to.
    pub target: Vec<String>,
    /// `preserved ∪ target`, in that order, without duplicates.
    pub resulting: Vec<String>,
}

impl TagDelta {
    #[must_use]
    pub fn compute(current: Vec<String>, member: &str, index: &MembershipIndex) -> Self {
        let preserved: Vec<String> = dedup(current.iter().filter(|t| !index.is_category(t)));
        let target: Vec<String> = index.categories_of(member).to_vec();
        let resulting = dedup(preserved.iter().chain(target.iter()));
        Self {
            current,
            preserved,
            target,
            resulting,
        }
    }

    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.current_set() == self.resulting_set()
    }

    /// Tags the write introduces.
    #[must_use]
    pub fn added(&self) -> BTreeSet<&str> {
        let current = self.current_set();
        self.resulting_set()
            .into_iter()
            .filter(|t| !current.contains(t))
            .collect()
    }

    /// Tags the write drops.
    #[must_use]
    pub fn removed(&self) -> BTreeSet<&str> {
        let resulting = self.resulting_set();
        self.current_set()
            .into_iter()
            .filter(|t| !resulting.contains(t))
            .collect()
    }

    fn current_set(&self) -> BTreeSet<&str> {
        self.current.iter().map(String::as_str).collect()
    }

    fn resulting_set(&self) -> BTreeSet<&str> {
        self.resulting.iter().map(String::as_str).collect()
    }
}

fn dedup<'a>(tags: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: BTreeSet<&'a str> = BTreeSet::new();
    let mut out = Vec::new();
    for tag in tags {
        if seen.insert(tag.as_str()) {
            out.push(tag.clone());
        }
    }
    out
}
