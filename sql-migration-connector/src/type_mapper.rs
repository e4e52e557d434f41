//! Table-driven, many-to-many type mapping between vendors (spec §4.2).
//!
//! `map_type` is total: every `(source type, target vendor)` pair returns a
//! non-empty string, falling back to the target's generic text type for
//! anything unrecognized.

use migration_connector::Vendor;
use sql_schema_describer::{ColumnSchema, UNBOUNDED_LENGTH};

/// Maps `column`'s source type to a target SQL type string.
pub fn map_type(column: &ColumnSchema, target: Vendor) -> String {
    let normalized = column.source_type.to_ascii_lowercase();

    if let Some(mapped) = map_numeric(&normalized, column, target) {
        return mapped;
    }
    if let Some(mapped) = map_string(&normalized, column, target) {
        return mapped;
    }
    if let Some(mapped) = map_boolean(&normalized, target) {
        return mapped.to_string();
    }
    if let Some(mapped) = map_uuid(&normalized, target) {
        return mapped.to_string();
    }
    if let Some(mapped) = map_binary(&normalized, target) {
        return mapped.to_string();
    }
    if let Some(mapped) = map_datetime(&normalized, target) {
        return mapped.to_string();
    }

    fallback_text_type(target).to_string()
}

fn map_numeric(normalized: &str, column: &ColumnSchema, target: Vendor) -> Option<String> {
    let is_oracle_number = normalized == "number";
    let is_generic_numeric = matches!(normalized, "numeric" | "decimal");

    if is_oracle_number {
        return Some(match column.numeric_scale {
            Some(scale) if scale > 0 => format!("NUMERIC({},{})", column.numeric_precision.unwrap_or(38), scale),
            _ => narrowest_integer_type(column.numeric_precision.unwrap_or(10), target),
        });
    }

    if is_generic_numeric {
        let precision = column.numeric_precision.unwrap_or(18);
        let scale = column.numeric_scale.unwrap_or(0);
        return Some(match target {
            Vendor::Oracle if scale == 0 => format!("NUMBER({precision})"),
            Vendor::Oracle => format!("NUMBER({precision},{scale})"),
            _ => format!("NUMERIC({precision},{scale})"),
        });
    }

    match normalized {
        "int" | "integer" | "int4" => Some(match target {
            Vendor::Oracle => "NUMBER(10)".to_string(),
            _ => "INT".to_string(),
        }),
        "bigint" | "int8" => Some(match target {
            Vendor::Oracle => "NUMBER(19)".to_string(),
            _ => "BIGINT".to_string(),
        }),
        "smallint" | "int2" | "tinyint" => Some(match target {
            Vendor::Oracle => "NUMBER(5)".to_string(),
            _ => "SMALLINT".to_string(),
        }),
        "float" | "float8" | "double precision" | "double" | "binary_double" => Some(match target {
            Vendor::Oracle => "BINARY_DOUBLE".to_string(),
            _ => "DOUBLE PRECISION".to_string(),
        }),
        "real" | "float4" | "binary_float" => Some(match target {
            Vendor::Oracle => "BINARY_FLOAT".to_string(),
            _ => "REAL".to_string(),
        }),
        _ => None,
    }
}

fn narrowest_integer_type(precision: u32, target: Vendor) -> String {
    let sqlserver_mysql_postgres = match precision {
        p if p <= 4 => "SMALLINT",
        p if p <= 9 => "INT",
        _ => "BIGINT",
    };
    match target {
        Vendor::Oracle => format!("NUMBER({precision})"),
        _ => sqlserver_mysql_postgres.to_string(),
    }
}

fn map_string(normalized: &str, column: &ColumnSchema, target: Vendor) -> Option<String> {
    let is_char_like = matches!(normalized, "varchar" | "nvarchar" | "char" | "nchar" | "character varying" | "character" | "varchar2" | "nvarchar2" | "string" | "text" | "clob" | "nclob" | "ntext" | "longtext" | "mediumtext");

    if !is_char_like {
        return None;
    }

    let unbounded = column.max_length == Some(UNBOUNDED_LENGTH) || matches!(normalized, "text" | "clob" | "nclob" | "ntext" | "longtext" | "mediumtext");

    if unbounded {
        return Some(match target {
            Vendor::SqlServer => "NVARCHAR(MAX)".to_string(),
            Vendor::Postgres => "TEXT".to_string(),
            Vendor::MySql => "LONGTEXT".to_string(),
            Vendor::Oracle => "CLOB".to_string(),
        });
    }

    let length = column.max_length.filter(|&l| l > 0).unwrap_or(255);
    Some(match target {
        Vendor::SqlServer => format!("NVARCHAR({length})"),
        Vendor::Postgres => format!("VARCHAR({length})"),
        Vendor::MySql => format!("VARCHAR({length})"),
        Vendor::Oracle => format!("VARCHAR2({length})"),
    })
}

fn map_boolean(normalized: &str, target: Vendor) -> Option<&'static str> {
    if !matches!(normalized, "bit" | "boolean" | "bool" | "tinyint(1)") {
        return None;
    }
    Some(match target {
        Vendor::SqlServer => "BIT",
        Vendor::Postgres => "BOOLEAN",
        Vendor::MySql => "TINYINT(1)",
        Vendor::Oracle => "NUMBER(3)",
    })
}

fn map_uuid(normalized: &str, target: Vendor) -> Option<&'static str> {
    if !matches!(normalized, "uniqueidentifier" | "uuid" | "raw(16)") {
        return None;
    }
    Some(match target {
        Vendor::SqlServer => "UNIQUEIDENTIFIER",
        Vendor::Postgres => "UUID",
        Vendor::MySql => "CHAR(36)",
        Vendor::Oracle => "RAW(16)",
    })
}

fn map_binary(normalized: &str, target: Vendor) -> Option<&'static str> {
    if !matches!(normalized, "varbinary" | "image" | "binary" | "bytea" | "blob" | "longblob" | "raw") {
        return None;
    }
    Some(match target {
        Vendor::SqlServer => "VARBINARY(MAX)",
        Vendor::Postgres => "BYTEA",
        Vendor::MySql => "LONGBLOB",
        Vendor::Oracle => "BLOB",
    })
}

fn map_datetime(normalized: &str, target: Vendor) -> Option<&'static str> {
    if !matches!(normalized, "datetime" | "datetime2" | "timestamp" | "timestamptz" | "timestamp with time zone" | "timestamp without time zone" | "date") {
        return None;
    }
    if normalized == "date" {
        return Some("DATE");
    }
    Some(match target {
        Vendor::SqlServer => "DATETIME2",
        Vendor::Postgres => "TIMESTAMP",
        Vendor::MySql => "DATETIME",
        Vendor::Oracle => "TIMESTAMP",
    })
}

fn fallback_text_type(target: Vendor) -> &'static str {
    match target {
        Vendor::SqlServer => "NVARCHAR(MAX)",
        Vendor::Postgres => "TEXT",
        Vendor::MySql => "LONGTEXT",
        Vendor::Oracle => "CLOB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sql_schema_describer::ColumnSchema;

    fn column(source_type: &str) -> ColumnSchema {
        ColumnSchema::new("col", source_type, true)
    }

    #[test]
    fn oracle_number_with_scale_becomes_numeric() {
        let col = column("NUMBER").precision_scale(10, 2);
        assert_eq!(map_type(&col, Vendor::Postgres), "NUMERIC(10,2)");
    }

    #[test]
    fn oracle_number_without_scale_becomes_narrowest_integer() {
        let col = column("NUMBER").precision_scale(4, 0);
        assert_eq!(map_type(&col, Vendor::Postgres), "SMALLINT");
        let col = column("NUMBER").precision_scale(9, 0);
        assert_eq!(map_type(&col, Vendor::Postgres), "INT");
        let col = column("NUMBER").precision_scale(18, 0);
        assert_eq!(map_type(&col, Vendor::Postgres), "BIGINT");
    }

    #[test]
    fn unbounded_string_maps_to_targets_unbounded_text_type() {
        let col = column("varchar").max_length(UNBOUNDED_LENGTH);
        assert_eq!(map_type(&col, Vendor::SqlServer), "NVARCHAR(MAX)");
        assert_eq!(map_type(&col, Vendor::Postgres), "TEXT");
        assert_eq!(map_type(&col, Vendor::MySql), "LONGTEXT");
        assert_eq!(map_type(&col, Vendor::Oracle), "CLOB");
    }

    #[test]
    fn booleans_map_across_all_vendors() {
        assert_eq!(map_type(&column("bit"), Vendor::Postgres), "BOOLEAN");
        assert_eq!(map_type(&column("boolean"), Vendor::MySql), "TINYINT(1)");
        assert_eq!(map_type(&column("boolean"), Vendor::Oracle), "NUMBER(3)");
        assert_eq!(map_type(&column("boolean"), Vendor::SqlServer), "BIT");
    }

    #[test]
    fn uuid_maps_across_all_vendors() {
        assert_eq!(map_type(&column("uniqueidentifier"), Vendor::Postgres), "UUID");
        assert_eq!(map_type(&column("uuid"), Vendor::MySql), "CHAR(36)");
        assert_eq!(map_type(&column("uuid"), Vendor::Oracle), "RAW(16)");
    }

    #[test]
    fn unknown_type_falls_back_to_generic_text() {
        assert_eq!(map_type(&column("geography"), Vendor::Postgres), "TEXT");
    }

    #[test]
    fn every_mapping_is_non_empty_for_every_target() {
        let source_types = ["int", "bigint", "varchar", "text", "bit", "uuid", "bytea", "datetime", "NUMBER", "unknown_type"];
        for source_type in source_types {
            for target in [Vendor::SqlServer, Vendor::Postgres, Vendor::MySql, Vendor::Oracle] {
                let col = column(source_type).precision_scale(10, 2).max_length(255);
                assert!(!map_type(&col, target).is_empty());
            }
        }
    }

    #[test]
    fn round_trip_through_postgres_keeps_integers_as_integers() {
        let original = column("int");
        let pg_type = map_type(&original, Vendor::Postgres);
        let intermediate = column(&pg_type.to_lowercase());
        let back_to_sqlserver = map_type(&intermediate, Vendor::SqlServer);
        assert_eq!(back_to_sqlserver, "INT");
    }
}
