use async_trait::async_trait;
use proptest::prelude::*;
use sea_orm::{DatabaseTransaction, EntityTrait, QueryOrder};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::TreeEngine;
use crate::clients::{ClientStore, NewClient};
use crate::db::init_memory_database;
use crate::entity::client::Gender;
use crate::entity::{client_department, department};
use crate::error::{AppError, AppResult};
use crate::sequence::SequenceGenerator;

async fn engine(max_depth: i32) -> TreeEngine {
    let db = init_memory_database().await.unwrap();
    TreeEngine::new(db, max_depth)
}

async fn all_rows(engine: &TreeEngine) -> Vec<department::Model> {
    department::Entity::find()
        .order_by_asc(department::Column::TreeId)
        .order_by_asc(department::Column::Lft)
        .all(engine.db())
        .await
        .unwrap()
}

async fn client(engine: &TreeEngine, username: &str, phone: &str) -> i64 {
    let store = ClientStore::new(engine.db().clone());
    store
        .create(NewClient {
            username: username.to_string(),
            phone: phone.to_string(),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            middle_name: String::new(),
            client_type: None,
            gender: Gender::Unknown,
            timezone: "UTC".to_string(),
            is_active: true,
        })
        .await
        .unwrap()
        .id
}

fn names(models: &[department::Model]) -> Vec<&str> {
    models.iter().map(|m| m.name.as_str()).collect()
}

/// Check every nested-set invariant against the parent pointers
fn check_invariants(rows: &[department::Model]) {
    let by_id: HashMap<i64, &department::Model> = rows.iter().map(|r| (r.id, r)).collect();
    let mut trees: HashMap<i32, Vec<&department::Model>> = HashMap::new();
    for row in rows {
        trees.entry(row.tree_id).or_default().push(row);
    }

    for (tree_id, nodes) in &trees {
        let mut bounds: Vec<i32> = nodes.iter().flat_map(|n| [n.lft, n.rgt]).collect();
        bounds.sort_unstable();
        let expected: Vec<i32> = (1..=2 * nodes.len() as i32).collect();
        assert_eq!(bounds, expected, "bounds of tree {} are not dense", tree_id);

        let roots: Vec<_> = nodes.iter().filter(|n| n.parent_id.is_none()).collect();
        assert_eq!(roots.len(), 1, "tree {} must have exactly one root", tree_id);
        assert_eq!(roots[0].lft, 1);
        assert_eq!(roots[0].level, 0);

        for node in nodes {
            assert!(node.lft < node.rgt, "node {} has inverted bounds", node.id);

            // The tightest enclosing node is the parent
            let enclosing = nodes
                .iter()
                .filter(|o| o.id != node.id && o.lft < node.lft && node.rgt < o.rgt)
                .max_by_key(|o| o.lft)
                .map(|o| o.id);
            assert_eq!(enclosing, node.parent_id, "node {} has the wrong parent", node.id);

            if let Some(parent_id) = node.parent_id {
                let parent = by_id[&parent_id];
                assert_eq!(parent.tree_id, node.tree_id);
                assert_eq!(node.level, parent.level + 1, "node {} has the wrong level", node.id);
            }
        }

        // Siblings are in name order along their bounds
        let mut by_parent: HashMap<Option<i64>, Vec<&department::Model>> = HashMap::new();
        for node in nodes {
            by_parent.entry(node.parent_id).or_default().push(node);
        }
        for siblings in by_parent.values_mut() {
            siblings.sort_by_key(|s| s.lft);
            assert!(siblings.windows(2).all(|w| w[0].name <= w[1].name));
        }
    }
}

/// Descendants by walking parent pointers
fn naive_descendants(rows: &[department::Model], id: i64) -> BTreeSet<i64> {
    let mut out = BTreeSet::new();
    let mut pending = vec![id];
    while let Some(current) = pending.pop() {
        for row in rows.iter().filter(|r| r.parent_id == Some(current)) {
            out.insert(row.id);
            pending.push(row.id);
        }
    }
    out
}

async fn check_engine(engine: &TreeEngine) {
    let rows = all_rows(engine).await;
    check_invariants(&rows);

    for row in &rows {
        let scanned: BTreeSet<i64> =
            engine.descendants(row.id).await.unwrap().iter().map(|d| d.id).collect();
        assert_eq!(scanned, naive_descendants(&rows, row.id), "descendants of {}", row.id);
    }

    let roots = engine.roots().await.unwrap();
    let forest = engine.cached_forest().await.unwrap();
    assert_eq!(forest.len(), roots.len());
    for (tree, root) in forest.iter().zip(&roots) {
        let mut expected = vec![root.id];
        expected.extend(engine.descendants(root.id).await.unwrap().iter().map(|d| d.id));
        assert_eq!(tree.flatten_ids(), expected);
    }
}

#[tokio::test]
async fn test_department_scenario() {
    let engine = engine(2).await;
    let hq = engine.insert("HQ", None).await.unwrap();
    let sales = engine.insert("Sales", Some(hq.id)).await.unwrap();
    let eu = engine.insert("EU", Some(sales.id)).await.unwrap();

    assert_eq!((hq.level, sales.level, eu.level), (0, 1, 2));
    assert_eq!((hq.id, sales.id, eu.id), (103, 203, 303));

    let team = engine.insert("Team", Some(eu.id)).await;
    assert!(matches!(team, Err(AppError::DepthExceeded { level: 3, max: 2 })));

    let ancestors = engine.ancestors(eu.id).await.unwrap();
    assert_eq!(names(&ancestors), vec!["HQ", "Sales"]);

    let a = client(&engine, "a", "+10000000001").await;
    let b = client(&engine, "b", "+10000000002").await;
    let c = client(&engine, "c", "+10000000003").await;
    engine.add_member(a, hq.id).await.unwrap();
    engine.add_member(b, sales.id).await.unwrap();
    engine.add_member(c, eu.id).await.unwrap();

    assert_eq!(engine.member_count(hq.id).await.unwrap(), 3);
    assert_eq!(engine.member_count(sales.id).await.unwrap(), 2);
    assert_eq!(engine.member_count(eu.id).await.unwrap(), 1);

    check_engine(&engine).await;
}

#[tokio::test]
async fn test_depth_boundaries() {
    let engine = engine(2).await;
    let root = engine.insert("root", None).await.unwrap();
    let one = engine.insert("one", Some(root.id)).await.unwrap();

    // parent at MAX_TREE_DEPTH - 1
    let two = engine.insert("two", Some(one.id)).await.unwrap();
    assert_eq!(two.level, 2);

    // parent at MAX_TREE_DEPTH
    let three = engine.insert("three", Some(two.id)).await;
    assert!(matches!(three, Err(AppError::DepthExceeded { .. })));
    assert_eq!(all_rows(&engine).await.len(), 3);
}

#[tokio::test]
async fn test_zero_depth_allows_roots_only() {
    let engine = engine(0).await;
    let root = engine.insert("root", None).await.unwrap();
    let child = engine.insert("child", Some(root.id)).await;
    assert!(matches!(child, Err(AppError::DepthExceeded { level: 1, max: 0 })));
}

#[tokio::test]
async fn test_insert_validation() {
    let engine = engine(5).await;
    assert!(matches!(engine.insert("  ", None).await, Err(AppError::Validation(_))));
    assert!(matches!(
        engine.insert(&"x".repeat(101), None).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(engine.insert("orphan", Some(999)).await, Err(AppError::NotFound(_))));

    let trimmed = engine.insert("  Ops  ", None).await.unwrap();
    assert_eq!(trimmed.name, "Ops");
}

#[tokio::test]
async fn test_siblings_ordered_by_name() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let first_b = engine.insert("b", Some(root.id)).await.unwrap();
    engine.insert("d", Some(root.id)).await.unwrap();
    engine.insert("a", Some(root.id)).await.unwrap();
    let second_b = engine.insert("b", Some(root.id)).await.unwrap();
    engine.insert("c", Some(root.id)).await.unwrap();

    let children = engine.children(root.id).await.unwrap();
    assert_eq!(names(&children), vec!["a", "b", "b", "c", "d"]);
    // Equal names keep insertion order
    assert_eq!(children[1].id, first_b.id);
    assert_eq!(children[2].id, second_b.id);

    let root = engine.get(root.id).await.unwrap();
    assert_eq!((root.lft, root.rgt), (1, 12));
    check_engine(&engine).await;
}

#[tokio::test]
async fn test_insert_shifts_following_bounds() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let b = engine.insert("b", Some(root.id)).await.unwrap();
    let c = engine.insert("c", Some(root.id)).await.unwrap();
    assert_eq!((b.lft, b.rgt, c.lft, c.rgt), (2, 3, 4, 5));

    let a = engine.insert("a", Some(root.id)).await.unwrap();
    assert_eq!((a.lft, a.rgt), (2, 3));
    let b = engine.get(b.id).await.unwrap();
    let c = engine.get(c.id).await.unwrap();
    assert_eq!((b.lft, b.rgt, c.lft, c.rgt), (4, 5, 6, 7));
    assert_eq!(engine.get(root.id).await.unwrap().rgt, 8);
}

#[tokio::test]
async fn test_roots_are_separate_trees() {
    let engine = engine(5).await;
    let zeta = engine.insert("Zeta", None).await.unwrap();
    let alpha = engine.insert("Alpha", None).await.unwrap();
    assert_ne!(zeta.tree_id, alpha.tree_id);
    assert_eq!((alpha.lft, alpha.rgt), (1, 2));

    let roots = engine.roots().await.unwrap();
    assert_eq!(names(&roots), vec!["Alpha", "Zeta"]);
    assert!(engine.ancestors(alpha.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_move_within_tree() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let a = engine.insert("a", Some(root.id)).await.unwrap();
    let b = engine.insert("b", Some(root.id)).await.unwrap();
    let a1 = engine.insert("a1", Some(a.id)).await.unwrap();
    engine.insert("a2", Some(a1.id)).await.unwrap();

    let moved = engine.move_node(a1.id, Some(b.id)).await.unwrap();
    assert_eq!(moved.parent_id, Some(b.id));
    assert_eq!(moved.level, 2);

    let ancestors = engine.ancestors(a1.id).await.unwrap();
    assert_eq!(names(&ancestors), vec!["root", "b"]);
    assert!(engine.descendants(a.id).await.unwrap().is_empty());
    assert_eq!(names(&engine.descendants(b.id).await.unwrap()), vec!["a1", "a2"]);
    check_engine(&engine).await;
}

#[tokio::test]
async fn test_move_across_trees_and_to_root() {
    let engine = engine(5).await;
    let left = engine.insert("left", None).await.unwrap();
    let right = engine.insert("right", None).await.unwrap();
    let x = engine.insert("x", Some(left.id)).await.unwrap();
    let y = engine.insert("y", Some(x.id)).await.unwrap();
    engine.insert("m", Some(right.id)).await.unwrap();

    let moved = engine.move_node(x.id, Some(right.id)).await.unwrap();
    assert_eq!(moved.tree_id, right.tree_id);
    assert_eq!(names(&engine.children(right.id).await.unwrap()), vec!["m", "x"]);
    assert_eq!(engine.get(left.id).await.unwrap().rgt, 2);
    check_engine(&engine).await;

    let root = engine.move_node(x.id, None).await.unwrap();
    assert!(root.is_root());
    assert_eq!((root.lft, root.rgt, root.level), (1, 4, 0));
    assert_eq!(engine.get(y.id).await.unwrap().level, 1);
    assert_eq!(names(&engine.roots().await.unwrap()), vec!["left", "right", "x"]);
    check_engine(&engine).await;

    // A root moved under another tree disappears as a tree
    engine.move_node(left.id, Some(y.id)).await.unwrap();
    assert_eq!(names(&engine.roots().await.unwrap()), vec!["right", "x"]);
    assert_eq!(names(&engine.ancestors(left.id).await.unwrap()), vec!["x", "y"]);
    check_engine(&engine).await;
}

#[tokio::test]
async fn test_move_cycle_leaves_tree_unchanged() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let a = engine.insert("a", Some(root.id)).await.unwrap();
    let b = engine.insert("b", Some(a.id)).await.unwrap();
    let before = all_rows(&engine).await;

    let under_descendant = engine.move_node(a.id, Some(b.id)).await;
    assert!(matches!(under_descendant, Err(AppError::CycleDetected(_))));
    let under_self = engine.move_node(a.id, Some(a.id)).await;
    assert!(matches!(under_self, Err(AppError::CycleDetected(_))));

    assert_eq!(all_rows(&engine).await, before);
}

#[tokio::test]
async fn test_move_depth_counts_whole_subtree() {
    let engine = engine(2).await;
    let left = engine.insert("left", None).await.unwrap();
    let right = engine.insert("right", None).await.unwrap();
    let r1 = engine.insert("r1", Some(right.id)).await.unwrap();
    let a = engine.insert("a", Some(left.id)).await.unwrap();
    engine.insert("a1", Some(a.id)).await.unwrap();
    let before = all_rows(&engine).await;

    // a (height 1) under r1 would put a1 at level 3
    let result = engine.move_node(a.id, Some(r1.id)).await;
    assert!(matches!(result, Err(AppError::DepthExceeded { level: 3, max: 2 })));
    assert_eq!(all_rows(&engine).await, before);

    engine.move_node(a.id, Some(right.id)).await.unwrap();
    check_engine(&engine).await;
}

#[tokio::test]
async fn test_move_missing_nodes() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    assert!(matches!(engine.move_node(999, None).await, Err(AppError::NotFound(_))));
    assert!(matches!(engine.move_node(root.id, Some(999)).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_rename_repositions() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let a = engine.insert("a", Some(root.id)).await.unwrap();
    engine.insert("b", Some(root.id)).await.unwrap();
    engine.insert("c", Some(root.id)).await.unwrap();
    engine.insert("a-child", Some(a.id)).await.unwrap();

    let renamed = engine.rename(a.id, "z").await.unwrap();
    assert_eq!(renamed.name, "z");
    assert_eq!(names(&engine.children(root.id).await.unwrap()), vec!["b", "c", "z"]);
    assert_eq!(names(&engine.descendants(a.id).await.unwrap()), vec!["a-child"]);
    check_engine(&engine).await;

    assert!(matches!(engine.rename(a.id, "").await, Err(AppError::Validation(_))));
    assert!(matches!(engine.rename(999, "x").await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_cascades_subtree_and_memberships() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let a = engine.insert("a", Some(root.id)).await.unwrap();
    let a1 = engine.insert("a1", Some(a.id)).await.unwrap();
    let b = engine.insert("b", Some(root.id)).await.unwrap();

    let x = client(&engine, "x", "+10000000001").await;
    let y = client(&engine, "y", "+10000000002").await;
    engine.add_member(x, a.id).await.unwrap();
    engine.add_member(y, a1.id).await.unwrap();
    engine.add_member(y, b.id).await.unwrap();

    let removed = engine.delete(a.id).await.unwrap();
    assert_eq!(removed, vec![a.id, a1.id]);

    assert!(matches!(engine.get(a1.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(engine.member_count(a.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(engine.delete(a.id).await, Err(AppError::NotFound(_))));

    let memberships = client_department::Entity::find().all(engine.db()).await.unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].department_id, b.id);

    let root = engine.get(root.id).await.unwrap();
    assert_eq!((root.lft, root.rgt), (1, 4));
    check_engine(&engine).await;

    engine.delete(root.id).await.unwrap();
    assert!(engine.cached_forest().await.unwrap().is_empty());
    assert!(client_department::Entity::find().all(engine.db()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_member_count_deduplicates_clients() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let a = engine.insert("a", Some(root.id)).await.unwrap();
    let b = engine.insert("b", Some(root.id)).await.unwrap();
    let other = engine.insert("other", None).await.unwrap();

    let x = client(&engine, "x", "+10000000001").await;
    let y = client(&engine, "y", "+10000000002").await;
    engine.add_member(x, root.id).await.unwrap();
    engine.add_member(x, a.id).await.unwrap();
    engine.add_member(x, b.id).await.unwrap();
    engine.add_member(y, other.id).await.unwrap();

    assert_eq!(engine.member_count(root.id).await.unwrap(), 1);
    assert_eq!(engine.member_count(other.id).await.unwrap(), 1);
    assert!(matches!(engine.member_count(999).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_membership_management() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let x = client(&engine, "x", "+10000000001").await;

    let first = engine.add_member(x, root.id).await.unwrap();
    let again = engine.add_member(x, root.id).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(first.created_at, again.created_at);
    assert_eq!(engine.members(root.id).await.unwrap(), vec![x]);

    assert!(matches!(engine.add_member(999, root.id).await, Err(AppError::NotFound(_))));
    assert!(matches!(engine.add_member(x, 999).await, Err(AppError::NotFound(_))));

    engine.remove_member(x, root.id).await.unwrap();
    assert!(engine.members(root.id).await.unwrap().is_empty());
    assert!(matches!(engine.remove_member(x, root.id).await, Err(AppError::NotFound(_))));
}

/// Hands out a value whose suffixed id cannot fit an i64
struct ExhaustedSequence;

#[async_trait]
impl SequenceGenerator for ExhaustedSequence {
    async fn next_value(&self, _txn: &DatabaseTransaction, _name: &str) -> AppResult<i64> {
        Ok(i64::MAX)
    }
}

#[tokio::test]
async fn test_sequence_exhaustion_leaves_tree_unchanged() {
    let db = init_memory_database().await.unwrap();
    let engine = TreeEngine::new(db.clone(), 5);
    let root = engine.insert("root", None).await.unwrap();
    engine.insert("a", Some(root.id)).await.unwrap();
    let before = all_rows(&engine).await;

    let exhausted = TreeEngine::with_sequence(db, 5, Arc::new(ExhaustedSequence));
    let child = exhausted.insert("b", Some(root.id)).await;
    assert!(matches!(child, Err(AppError::SequenceExhausted(_))));
    let new_root = exhausted.insert("other", None).await;
    assert!(matches!(new_root, Err(AppError::SequenceExhausted(_))));

    assert_eq!(all_rows(&engine).await, before);
}

#[tokio::test]
async fn test_concurrent_inserts_keep_tree_valid() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = engine.clone();
        let parent = if i % 4 == 0 { None } else { Some(root.id) };
        handles.push(tokio::spawn(async move {
            engine.insert(&format!("n{:02}", i), parent).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(all_rows(&engine).await.len(), 17);
    assert_eq!(engine.children(root.id).await.unwrap().len(), 12);
    check_engine(&engine).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_inserts_see_one_version_of_the_tree() {
    let engine = engine(5).await;
    let root = engine.insert("root", None).await.unwrap();
    let m = engine.insert("m", Some(root.id)).await.unwrap();
    let m1 = engine.insert("m1", Some(m.id)).await.unwrap();
    let x = client(&engine, "x", "+10000000001").await;
    engine.add_member(x, m1.id).await.unwrap();

    for i in 0..150 {
        // Sorts before "m", so every insert shifts the bounds of m and m1
        let writer = {
            let engine = engine.clone();
            let root_id = root.id;
            tokio::spawn(async move {
                engine.insert(&format!("a{:04}", i), Some(root_id)).await.unwrap();
            })
        };

        let (descendants, ancestors, count) = tokio::join!(
            engine.descendants(m.id),
            engine.ancestors(m1.id),
            engine.member_count(m.id)
        );
        let descendants: Vec<i64> = descendants.unwrap().iter().map(|d| d.id).collect();
        let ancestors: Vec<i64> = ancestors.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(descendants, vec![m1.id], "descendants at iteration {}", i);
        assert_eq!(ancestors, vec![root.id, m.id], "ancestors at iteration {}", i);
        assert_eq!(count.unwrap(), 1, "member count at iteration {}", i);

        writer.await.unwrap();
    }

    assert_eq!(engine.children(root.id).await.unwrap().len(), 151);
    check_engine(&engine).await;
}

#[derive(Debug, Clone)]
enum Op {
    Insert { parent: Option<usize>, name: usize },
    Move { node: usize, parent: Option<usize> },
    Delete { node: usize },
    Rename { node: usize, name: usize },
}

const NAMES: [&str; 4] = ["alpha", "beta", "beta", "gamma"];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (proptest::option::of(0usize..32), 0usize..NAMES.len())
            .prop_map(|(parent, name)| Op::Insert { parent, name }),
        2 => (0usize..32, proptest::option::of(0usize..32))
            .prop_map(|(node, parent)| Op::Move { node, parent }),
        1 => (0usize..32).prop_map(|node| Op::Delete { node }),
        1 => (0usize..32, 0usize..NAMES.len()).prop_map(|(node, name)| Op::Rename { node, name }),
    ]
}

async fn apply(engine: &TreeEngine, op: &Op) {
    let ids: Vec<i64> = all_rows(engine).await.iter().map(|r| r.id).collect();
    let pick = |i: usize| ids.get(i % ids.len().max(1)).copied();

    let result = match op {
        Op::Insert { parent, name } => {
            let parent = parent.and_then(pick);
            engine.insert(NAMES[*name], parent).await.map(|_| ())
        }
        Op::Move { node, parent } => match pick(*node) {
            Some(node) => engine.move_node(node, parent.and_then(pick)).await.map(|_| ()),
            None => Ok(()),
        },
        Op::Delete { node } => match pick(*node) {
            Some(node) => engine.delete(node).await.map(|_| ()),
            None => Ok(()),
        },
        Op::Rename { node, name } => match pick(*node) {
            Some(node) => engine.rename(node, NAMES[*name]).await.map(|_| ()),
            None => Ok(()),
        },
    };

    match result {
        Ok(()) | Err(AppError::DepthExceeded { .. }) | Err(AppError::CycleDetected(_)) => {}
        Err(e) => panic!("{:?} failed: {}", op, e),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_random_mutations_keep_nested_sets_valid(ops in proptest::collection::vec(op_strategy(), 1..24)) {
        tokio_test::block_on(async {
            let engine = engine(3).await;
            for op in &ops {
                apply(&engine, op).await;
                check_engine(&engine).await;
            }
        });
    }
}
