//! Derived views over collections: scoped queries and tree projections.
//!
//! Views borrow the collection and never mutate it. A `Query` can be
//! iterated any number of times; each pass re-filters (and re-sorts, when
//! ordered) from the current records.

use crate::id::EntityId;
use crate::record::{Record, Timestamped};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::warn;

type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + 'a>;
type Comparator<'a, T> = Box<dyn Fn(&T, &T) -> Ordering + 'a>;

/// A filtered, optionally ordered view of one collection.
pub struct Query<'a, T> {
    records: &'a [T],
    scope: Option<&'a EntityId>,
    filters: Vec<Predicate<'a, T>>,
    order: Option<Comparator<'a, T>>,
}

impl<'a, T: Record> Query<'a, T> {
    /// View `records` as seen from `scope`.
    ///
    /// Scoped records are visible only when their scope equals `scope`; with
    /// no scope selected none are. Unscoped records are always visible.
    pub fn new(records: &'a [T], scope: Option<&'a EntityId>) -> Self {
        Self {
            records,
            scope,
            filters: Vec::new(),
            order: None,
        }
    }

    /// Keep only records matching `predicate`.
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + 'a) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Case-insensitive text search over the record's search fields.
    /// A blank query matches everything.
    pub fn search(self, query: &str) -> Self {
        let query = query.trim().to_string();
        if query.is_empty() {
            return self;
        }
        self.filter(move |r| r.matches_text(&query))
    }

    /// Exact match on the categorical field. A blank kind matches everything.
    pub fn of_kind(self, kind: &str) -> Self {
        let kind = kind.trim().to_string();
        if kind.is_empty() {
            return self;
        }
        self.filter(move |r| r.category() == Some(kind.as_str()))
    }

    /// Order results with `comparator`. Equal records keep insertion order.
    pub fn order_by(mut self, comparator: impl Fn(&T, &T) -> Ordering + 'a) -> Self {
        self.order = Some(Box::new(comparator));
        self
    }

    /// Order by `key`, largest first.
    pub fn newest_first_by<K: Ord>(self, key: impl Fn(&T) -> K + 'a) -> Self {
        self.order_by(move |a, b| key(b).cmp(&key(a)))
    }

    fn visible(&self, record: &T) -> bool {
        if T::SCOPED {
            match (self.scope, record.scope()) {
                (Some(current), Some(owner)) if current == owner => {}
                _ => return false,
            }
        }
        self.filters.iter().all(|keep| keep(record))
    }

    /// Iterate the matching records.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &'a T> + '_> {
        let records = self.records;
        let matching = records.iter().filter(move |r| self.visible(r));
        match &self.order {
            None => Box::new(matching),
            Some(compare) => {
                let mut sorted: Vec<&'a T> = matching.collect();
                sorted.sort_by(|a, b| compare(*a, *b));
                Box::new(sorted.into_iter())
            }
        }
    }

    /// Collect the matching records.
    pub fn to_vec(&self) -> Vec<&'a T> {
        self.iter().collect()
    }

    pub fn first(&self) -> Option<&'a T> {
        self.iter().next()
    }

    pub fn count(&self) -> usize {
        self.records.iter().filter(|r| self.visible(r)).count()
    }
}

impl<'a, T: Record + Timestamped> Query<'a, T> {
    /// Order by timestamp, newest first.
    pub fn newest_first(self) -> Self {
        self.newest_first_by(|r| r.timestamp())
    }
}

// ============================================================================
// Tree projection
// ============================================================================

/// A record with its children.
///
/// Trees can be as deep as the parent chains in the data, so nothing here
/// recurses per level, including drop.
#[derive(Debug)]
pub struct TreeNode<'a, T> {
    pub record: &'a T,
    pub children: Vec<TreeNode<'a, T>>,
}

impl<T> Drop for TreeNode<'_, T> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A rooted forest built from parent links.
#[derive(Debug)]
pub struct Forest<'a, T> {
    pub roots: Vec<TreeNode<'a, T>>,
    /// Records whose parent link was cut to break a cycle.
    pub cycles: Vec<EntityId>,
}

impl<'a, T> Forest<'a, T> {
    /// Depth-first listing as `(depth, record)`, roots at depth 0.
    pub fn flatten(&self) -> Vec<(usize, &'a T)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &TreeNode<'a, T>)> =
            self.roots.iter().rev().map(|root| (0, root)).collect();
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, node.record));
            stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        }
        out
    }

    /// Total number of records in the forest.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&TreeNode<'a, T>> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Group `records` under their parents.
///
/// Records with no parent, or whose parent is not among `records`, become
/// roots. Every record appears exactly once. Records caught in a parent
/// cycle are still placed: one member of each cycle is promoted to a root
/// and listed in `Forest::cycles`.
pub fn build_forest<'a, T, F>(records: &[&'a T], parent_of: F) -> Forest<'a, T>
where
    T: Record,
    F: Fn(&T) -> Option<&EntityId>,
{
    let index: HashMap<&EntityId, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id(), i))
        .collect();

    let parents: Vec<Option<usize>> = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            parent_of(*r)
                .and_then(|p| index.get(p).copied())
                .filter(|&p| p != i)
        })
        .collect();

    let mut children = vec![Vec::new(); records.len()];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(child);
        }
    }

    let mut visited = vec![false; records.len()];
    let mut roots = Vec::new();
    for (i, parent) in parents.iter().enumerate() {
        if parent.is_none() {
            roots.push(grow(i, records, &children, &mut visited));
        }
    }

    // Anything left unvisited hangs off a cycle.
    let mut cycles = Vec::new();
    for start in 0..records.len() {
        if visited[start] {
            continue;
        }
        let mut seen = HashSet::new();
        let mut at = start;
        while seen.insert(at) {
            match parents[at] {
                Some(parent) => at = parent,
                None => break,
            }
        }
        let cut = records[at].id();
        let collection = T::COLLECTION;
        warn!(%collection, id = %cut, "Parent cycle detected, promoting to root");
        cycles.push(cut.clone());
        roots.push(grow(at, records, &children, &mut visited));
    }

    Forest { roots, cycles }
}

/// Build the subtree under `root` from the unvisited records below it.
///
/// Walks pre-order with an explicit stack, then assembles nodes in reverse
/// so every child is finished before its parent.
fn grow<'a, T>(
    root: usize,
    records: &[&'a T],
    children: &[Vec<usize>],
    visited: &mut [bool],
) -> TreeNode<'a, T> {
    let mut order = Vec::new();
    let mut placed: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut stack = vec![root];
    visited[root] = true;

    while let Some(i) = stack.pop() {
        order.push(i);
        let fresh: Vec<usize> = children[i]
            .iter()
            .copied()
            .filter(|&child| !visited[child])
            .collect();
        for &child in &fresh {
            visited[child] = true;
        }
        stack.extend(fresh.iter().rev());
        placed.insert(i, fresh);
    }

    let mut built: HashMap<usize, TreeNode<'a, T>> = HashMap::new();
    for &i in order.iter().rev() {
        let kids = placed
            .remove(&i)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|child| built.remove(&child))
            .collect();
        built.insert(
            i,
            TreeNode {
                record: records[i],
                children: kids,
            },
        );
    }

    built.remove(&root).unwrap_or_else(|| TreeNode {
        record: records[root],
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Campaign, Location};
    use chrono::NaiveDate;

    fn location(id: &str, name: &str, parent: Option<&str>, scope: &str) -> Location {
        Location {
            id: EntityId::from(id),
            name: name.to_string(),
            kind: "City".to_string(),
            parent: parent.map(EntityId::from),
            description: String::new(),
            tags: Vec::new(),
            campaign_id: EntityId::from(scope),
        }
    }

    fn names<'a>(records: impl IntoIterator<Item = &'a Location>) -> Vec<&'a str> {
        records.into_iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_query_scopes_records() {
        let records = vec![
            location("l1", "Neverwinter", None, "c1"),
            location("l2", "Waterdeep", None, "c2"),
        ];
        let scope = EntityId::from("c1");
        assert_eq!(names(Query::new(&records, Some(&scope)).iter()), vec!["Neverwinter"]);
        assert_eq!(Query::new(&records, None).count(), 0);
    }

    #[test]
    fn test_unscoped_records_always_visible() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let campaigns = vec![Campaign {
            id: EntityId::from("c1"),
            name: "Phandelver".to_string(),
            description: String::new(),
            created: Some(date),
            last_modified: Some(date),
        }];
        assert_eq!(Query::new(&campaigns, None).count(), 1);
    }

    #[test]
    fn test_search_and_kind_filters() {
        let mut records = vec![
            location("l1", "Dragon Lords", None, "c1"),
            location("l2", "Peacekeepers", None, "c1"),
        ];
        records[1].kind = "Guild".to_string();
        let scope = EntityId::from("c1");

        let found = Query::new(&records, Some(&scope)).search("DRAG");
        assert_eq!(names(found.iter()), vec!["Dragon Lords"]);

        let guilds = Query::new(&records, Some(&scope)).of_kind("Guild");
        assert_eq!(names(guilds.iter()), vec!["Peacekeepers"]);

        let everything = Query::new(&records, Some(&scope)).search("  ").of_kind("");
        assert_eq!(everything.count(), 2);
    }

    #[test]
    fn test_ordering_is_stable_and_restartable() {
        let records = vec![
            location("l1", "B", None, "c1"),
            location("l2", "A", None, "c1"),
            location("l3", "B", None, "c1"),
        ];
        let scope = EntityId::from("c1");
        let query = Query::new(&records, Some(&scope)).order_by(|a, b| a.name.cmp(&b.name));

        let first: Vec<_> = query.iter().map(|r| r.id.as_str()).collect();
        let second: Vec<_> = query.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(first, vec!["l2", "l1", "l3"]);
        assert_eq!(first, second);
        // The collection itself is untouched
        assert_eq!(records[0].id.as_str(), "l1");
    }

    #[test]
    fn test_forest_nests_children() {
        let records = vec![
            location("l1", "Neverwinter", Some("l2"), "c1"),
            location("l2", "Sword Coast", None, "c1"),
            location("l3", "Moonstone Mask", Some("l1"), "c1"),
        ];
        let refs: Vec<_> = records.iter().collect();
        let forest = build_forest(&refs, |l| l.parent.as_ref());

        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.roots[0].record.name, "Sword Coast");
        let flat: Vec<_> = forest
            .flatten()
            .into_iter()
            .map(|(depth, l)| (depth, l.name.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![(0, "Sword Coast"), (1, "Neverwinter"), (2, "Moonstone Mask")]
        );
        assert!(forest.cycles.is_empty());
    }

    #[test]
    fn test_forest_promotes_orphans() {
        let records = vec![location("l1", "Dock Ward", Some("gone"), "c1")];
        let refs: Vec<_> = records.iter().collect();
        let forest = build_forest(&refs, |l| l.parent.as_ref());
        assert_eq!(forest.roots.len(), 1);
        assert!(forest.cycles.is_empty());
    }

    #[test]
    fn test_forest_breaks_cycles() {
        let records = vec![
            location("l0", "Hanging Tail", Some("l2"), "c1"),
            location("l1", "A", Some("l2"), "c1"),
            location("l2", "B", Some("l1"), "c1"),
            location("l3", "Root", None, "c1"),
        ];
        let refs: Vec<_> = records.iter().collect();
        let forest = build_forest(&refs, |l| l.parent.as_ref());

        // Every record placed exactly once
        assert_eq!(forest.len(), 4);
        let mut ids: Vec<_> = forest.flatten().into_iter().map(|(_, l)| l.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["l0", "l1", "l2", "l3"]);

        // The tail is never mistaken for a cycle member
        assert_eq!(forest.cycles.len(), 1);
        assert_ne!(forest.cycles[0], EntityId::from("l0"));
    }

    #[test]
    fn test_forest_keeps_sibling_order() {
        let records = vec![
            location("l1", "Sword Coast", None, "c1"),
            location("l2", "Neverwinter", Some("l1"), "c1"),
            location("l3", "Phandalin", Some("l1"), "c1"),
            location("l4", "Dock Ward", Some("l2"), "c1"),
        ];
        let refs: Vec<_> = records.iter().collect();
        let forest = build_forest(&refs, |l| l.parent.as_ref());
        let flat: Vec<_> = forest
            .flatten()
            .into_iter()
            .map(|(depth, l)| (depth, l.name.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![
                (0, "Sword Coast"),
                (1, "Neverwinter"),
                (2, "Dock Ward"),
                (1, "Phandalin")
            ]
        );
    }

    #[test]
    fn test_forest_handles_deep_chains() {
        const DEPTH: usize = 50_000;
        let ids: Vec<String> = (0..DEPTH).map(|i| format!("l{i}")).collect();
        let records: Vec<Location> = (0..DEPTH)
            .map(|i| {
                let parent = i.checked_sub(1).map(|p| ids[p].as_str());
                location(&ids[i], &ids[i], parent, "c1")
            })
            .collect();
        let refs: Vec<_> = records.iter().collect();

        let forest = build_forest(&refs, |l| l.parent.as_ref());
        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.len(), DEPTH);
        let flat = forest.flatten();
        assert_eq!(flat.last().map(|(depth, _)| *depth), Some(DEPTH - 1));
        drop(forest);

        // Close the chain into one long cycle
        let mut looped = records.clone();
        looped[0].parent = Some(EntityId::from(ids[DEPTH - 1].as_str()));
        let refs: Vec<_> = looped.iter().collect();
        let forest = build_forest(&refs, |l| l.parent.as_ref());
        assert_eq!(forest.cycles.len(), 1);
        assert_eq!(forest.len(), DEPTH);
    }

    #[test]
    fn test_forest_ignores_self_parent() {
        let records = vec![location("l1", "Loop", Some("l1"), "c1")];
        let refs: Vec<_> = records.iter().collect();
        let forest = build_forest(&refs, |l| l.parent.as_ref());
        assert_eq!(forest.roots.len(), 1);
        assert!(forest.cycles.is_empty());
    }
}
