use serde::{Deserialize, Serialize};

/// A single-column foreign key edge.
///
/// Multi-column foreign keys are represented as repeated entries sharing the
/// same `constraint_name`; callers that render DDL must group by
/// `constraint_name` before emitting a single `FOREIGN KEY (...) REFERENCES
/// ...` clause. Tests must not assume any particular ordering across entries
/// that belong to *different* constraint names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    pub constraint_name: String,
    pub column: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKeySchema {
    pub fn new(
        constraint_name: impl Into<String>,
        column: impl Into<String>,
        referenced_schema: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        ForeignKeySchema {
            constraint_name: constraint_name.into(),
            column: column.into(),
            referenced_schema: referenced_schema.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }
}

/// Groups single-column [`ForeignKeySchema`] entries that share a
/// `constraint_name` into one logical (possibly multi-column) foreign key.
/// Preserves the first-seen order of both groups and columns within a group.
pub fn group_by_constraint(entries: &[ForeignKeySchema]) -> Vec<(&str, Vec<&ForeignKeySchema>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: std::collections::HashMap<&str, Vec<&ForeignKeySchema>> = std::collections::HashMap::new();

    for fk in entries {
        let key = fk.constraint_name.as_str();
        if !groups.contains_key(key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(fk);
    }

    order.into_iter().map(|name| (name, groups.remove(name).unwrap())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_multi_column_keys_by_constraint_name() {
        let entries = vec![
            ForeignKeySchema::new("fk_order_items", "order_id", "public", "orders", "id"),
            ForeignKeySchema::new("fk_order_items", "tenant_id", "public", "orders", "tenant_id"),
            ForeignKeySchema::new("fk_order_items_product", "product_id", "public", "products", "id"),
        ];

        let grouped = group_by_constraint(&entries);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "fk_order_items");
        assert_eq!(grouped[0].1.len(), 2);
        assert_eq!(grouped[1].0, "fk_order_items_product");
        assert_eq!(grouped[1].1.len(), 1);
    }
}
