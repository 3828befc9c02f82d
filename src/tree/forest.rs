//! Forest reconstruction from one ordered read

use crate::entity::department::{self, DepartmentTree};

/// Rebuild nested trees from rows ordered by `(tree_id, lft)`.
///
/// Runs in O(n): a stack holds the chain of open ancestors, and a row closes
/// every open node whose right bound it has passed. Trees come back in
/// `tree_id` order, children in `lft` order.
pub fn build_forest<I>(rows: I) -> Vec<DepartmentTree>
where
    I: IntoIterator<Item = department::Model>,
{
    let mut roots = Vec::new();
    let mut open: Vec<(i32, i32, DepartmentTree)> = Vec::new();

    for row in rows {
        while open
            .last()
            .is_some_and(|(tree_id, rgt, _)| *tree_id != row.tree_id || row.lft > *rgt)
        {
            if let Some((_, _, done)) = open.pop() {
                attach(&mut open, &mut roots, done);
            }
        }
        open.push((row.tree_id, row.rgt, row.into()));
    }

    while let Some((_, _, done)) = open.pop() {
        attach(&mut open, &mut roots, done);
    }

    roots
}

fn attach(
    open: &mut [(i32, i32, DepartmentTree)],
    roots: &mut Vec<DepartmentTree>,
    node: DepartmentTree,
) {
    match open.last_mut() {
        Some((_, _, parent)) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Order roots by name; equal names keep their tree order
pub fn sort_roots(roots: &mut [DepartmentTree]) {
    roots.sort_by(|a, b| a.name.cmp(&b.name));
}
