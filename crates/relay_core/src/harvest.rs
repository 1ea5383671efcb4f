use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Deduplicated contact names plus the consecutive no-growth counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestAccumulator {
    names: BTreeSet<String>,
    no_growth: u32,
}

impl HarvestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions one screen's names into the set and returns how many were new.
    ///
    /// The no-growth counter increments when nothing was added and resets otherwise.
    pub fn absorb<I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.names.len();
        self.names.extend(names);
        let added = self.names.len() - before;
        if added == 0 {
            self.no_growth += 1;
        } else {
            self.no_growth = 0;
        }
        added
    }

    pub fn no_growth(&self) -> u32 {
        self.no_growth
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn into_sorted(self) -> Vec<String> {
        let mut names: Vec<String> = self.names.into_iter().collect();
        sort_contacts(&mut names);
        names
    }
}

fn starts_alphabetic(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_alphabetic)
}

/// Display order of the target app's contact list: names starting with a letter
/// first, then case-insensitive lexicographic order.
///
/// Names equal ignoring case fall back to ordinal order so the result is total.
pub fn contact_order(a: &str, b: &str) -> Ordering {
    match (starts_alphabetic(a), starts_alphabetic(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => {
            let folded_a = a.chars().flat_map(char::to_lowercase);
            let folded_b = b.chars().flat_map(char::to_lowercase);
            folded_a.cmp(folded_b).then_with(|| a.cmp(b))
        }
    }
}

pub fn sort_contacts(names: &mut [String]) {
    names.sort_by(|a, b| contact_order(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_before_symbols_and_digits() {
        let mut names: Vec<String> = ["#tag", "bob", "9lives", "Alice", "张三", "_x"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_contacts(&mut names);
        assert_eq!(names, vec!["Alice", "bob", "张三", "#tag", "9lives", "_x"]);
    }

    #[test]
    fn case_insensitive_with_ordinal_tiebreak() {
        assert_eq!(contact_order("alice", "Bob"), Ordering::Less);
        assert_eq!(contact_order("ALICE", "alice"), Ordering::Less);
        assert_eq!(contact_order("", "a"), Ordering::Greater);
    }

    #[test]
    fn no_growth_resets_on_new_names() {
        let mut acc = HarvestAccumulator::new();
        assert_eq!(acc.absorb(vec!["a".to_string(), "b".to_string()]), 2);
        assert_eq!(acc.absorb(vec!["a".to_string()]), 0);
        assert_eq!(acc.absorb(Vec::new()), 0);
        assert_eq!(acc.no_growth(), 2);
        assert_eq!(acc.absorb(vec!["c".to_string()]), 1);
        assert_eq!(acc.no_growth(), 0);
        assert_eq!(acc.len(), 3);
    }
}
