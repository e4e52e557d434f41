//! Foreign-key-aware topological ordering of tables (spec §4.4).

use sql_schema_describer::{ForeignKeySchema, TableSchema};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The result of sorting: tables in a dependency-safe order, plus the set
/// of foreign keys that could not be honored because they close a cycle.
/// The orchestrator defers exactly those edges to the foreign-key phase.
pub struct SortedTables {
    pub tables: Vec<TableSchema>,
    pub deferred_foreign_keys: Vec<ForeignKeySchema>,
}

/// Orders `tables` so that, for every foreign key not part of a cycle, the
/// referenced table appears before the referencing one. Ties (including all
/// cycle members) are broken lexicographically by qualified name. Adding
/// tables in any input order yields the same result modulo cycle-member
/// tie-breaks (spec §8).
pub fn sort(tables: Vec<TableSchema>) -> SortedTables {
    let index_by_name: BTreeMap<String, usize> = tables.iter().enumerate().map(|(i, t)| (t.qualified_name(), i)).collect();

    // edge a -> b meaning "a depends on b" (b must come first).
    let mut dependents_of: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new(); // b -> {a}
    let mut remaining_deps: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new(); // a -> {b}

    for (i, _) in tables.iter().enumerate() {
        remaining_deps.entry(i).or_default();
    }

    for (i, table) in tables.iter().enumerate() {
        for (ref_schema, ref_table) in table.referenced_tables() {
            let qualified = format!("{ref_schema}.{ref_table}");
            if let Some(&j) = index_by_name.get(&qualified) {
                if j != i {
                    remaining_deps.entry(i).or_default().insert(j);
                    dependents_of.entry(j).or_default().insert(i);
                }
            }
        }
    }

    let mut ready: BTreeSet<String> = tables
        .iter()
        .enumerate()
        .filter(|(i, _)| remaining_deps.get(i).map(|d| d.is_empty()).unwrap_or(true))
        .map(|(_, t)| t.qualified_name())
        .collect();

    let mut ordered_indices: Vec<usize> = Vec::with_capacity(tables.len());
    let mut visited: BTreeSet<usize> = BTreeSet::new();

    while let Some(name) = ready.iter().next().cloned() {
        ready.remove(&name);
        let i = index_by_name[&name];
        if !visited.insert(i) {
            continue;
        }
        ordered_indices.push(i);

        if let Some(dependents) = dependents_of.get(&i) {
            for &dependent in dependents {
                if let Some(deps) = remaining_deps.get_mut(&dependent) {
                    deps.remove(&i);
                    if deps.is_empty() && !visited.contains(&dependent) {
                        ready.insert(tables[dependent].qualified_name());
                    }
                }
            }
        }
    }

    // Whatever is left participates in a cycle. Emit those after all
    // non-cycle tables, in lexicographic order, and surface their
    // unresolved edges as deferred foreign keys.
    let mut cycle_indices: Vec<usize> = (0..tables.len()).filter(|i| !visited.contains(i)).collect();
    cycle_indices.sort_by_key(|&i| tables[i].qualified_name());

    let cycle_set: BTreeSet<usize> = cycle_indices.iter().copied().collect();
    let mut deferred_foreign_keys = Vec::new();
    for &i in &cycle_indices {
        for fk in &tables[i].foreign_keys {
            let qualified = format!("{}.{}", fk.referenced_schema, fk.referenced_table);
            if let Some(&j) = index_by_name.get(&qualified) {
                if cycle_set.contains(&j) {
                    deferred_foreign_keys.push(fk.clone());
                }
            }
        }
    }

    ordered_indices.extend(cycle_indices);

    let mut remaining: VecDeque<Option<TableSchema>> = tables.into_iter().map(Some).collect();
    let sorted_tables = ordered_indices.into_iter().map(|i| remaining[i].take().expect("each index visited once")).collect();

    SortedTables {
        tables: sorted_tables,
        deferred_foreign_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sql_schema_describer::ColumnSchema;

    fn table(schema: &str, name: &str, fks: Vec<ForeignKeySchema>) -> TableSchema {
        TableSchema::new(schema, name, vec![ColumnSchema::new("id", "int", false)]).foreign_keys(fks)
    }

    fn positions(sorted: &SortedTables) -> BTreeMap<String, usize> {
        sorted.tables.iter().enumerate().map(|(i, t)| (t.qualified_name(), i)).collect()
    }

    #[test]
    fn orders_referenced_table_before_referencing_table() {
        let orders = table("public", "orders", vec![]);
        let items = table("public", "order_items", vec![ForeignKeySchema::new("fk", "order_id", "public", "orders", "id")]);

        let sorted = sort(vec![items, orders]);
        let pos = positions(&sorted);
        assert!(pos["public.orders"] < pos["public.order_items"]);
        assert!(sorted.deferred_foreign_keys.is_empty());
    }

    #[test]
    fn order_is_independent_of_input_order_modulo_cycles() {
        let orders = table("public", "orders", vec![]);
        let items = table("public", "order_items", vec![ForeignKeySchema::new("fk", "order_id", "public", "orders", "id")]);

        let sorted_a = sort(vec![items.clone(), orders.clone()]);
        let sorted_b = sort(vec![orders, items]);

        let names_a: Vec<String> = sorted_a.tables.iter().map(|t| t.qualified_name()).collect();
        let names_b: Vec<String> = sorted_b.tables.iter().map(|t| t.qualified_name()).collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn detects_cycle_and_defers_its_edges_without_failing() {
        let a = table("public", "a", vec![ForeignKeySchema::new("fk_a", "b_id", "public", "b", "id")]);
        let b = table("public", "b", vec![ForeignKeySchema::new("fk_b", "a_id", "public", "a", "id")]);

        let sorted = sort(vec![a, b]);
        assert_eq!(sorted.tables.len(), 2);
        let names: Vec<String> = sorted.tables.iter().map(|t| t.qualified_name()).collect();
        assert_eq!(names, vec!["public.a".to_string(), "public.b".to_string()], "cycle members ordered lexicographically");
        assert_eq!(sorted.deferred_foreign_keys.len(), 2);
    }

    #[test]
    fn self_reference_is_not_treated_as_a_cycle() {
        let nodes = table("public", "nodes", vec![ForeignKeySchema::new("fk_parent", "parent_id", "public", "nodes", "id")]);
        let sorted = sort(vec![nodes]);
        assert_eq!(sorted.tables.len(), 1);
        assert!(sorted.deferred_foreign_keys.is_empty());
    }
}
