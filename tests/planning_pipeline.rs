//! Planning Pipeline Tests
//!
//! End-to-end: Arrow directory -> catalog -> bind -> optimise -> encode.
//! - Encoded plans are deterministic
//! - Column pruning reaches the scans
//! - Rejections carry stable codes

mod common;

use aethra_planner::catalog::Catalog;
use aethra_planner::encoder::encode;
use aethra_planner::optimizer::{default_program, HepPlanner};
use aethra_planner::planner::{explain, QueryPlanner};

use common::sales_database;

fn plan_and_encode(dir: &std::path::Path, sql: &str) -> (String, String) {
    let catalog = Catalog::from_directory(dir, false).unwrap();
    let optimizer = HepPlanner::new(default_program(), 1000);
    let plan = QueryPlanner::new(&catalog, &optimizer).plan(sql).unwrap();
    (explain(&plan), encode(&plan).unwrap())
}

// =============================================================================
// Optimised Plans
// =============================================================================

#[test]
fn test_join_with_filter() {
    let dir = sales_database();
    let (explain, encoded) = plan_and_encode(
        dir.path(),
        "SELECT c_name, o_total FROM orders JOIN customer ON o_custkey = c_id \
         WHERE o_total > 10",
    );

    assert_eq!(
        explain,
        "LogicalProject(c_name=[$3], o_total=[$1])\n  \
         LogicalJoin(condition=[=($0, $2)], joinType=[inner])\n    \
         LogicalFilter(condition=[>($1, 10)])\n      \
         LogicalArrowTableScan(table=[[orders]], projects=[[1, 2]])\n    \
         LogicalArrowTableScan(table=[[customer]], projects=[[0, 1]])\n"
    );
    assert_eq!(
        encoded,
        "S;orders;true;1,2\nF;0;>($1, 10)\nS;customer;true;0,1\nJ;1;2;0;2\nP;3;[$3, $1]\n"
    );
}

#[test]
fn test_grouped_average() {
    let dir = sales_database();
    let (_, encoded) = plan_and_encode(
        dir.path(),
        "SELECT c_nation, AVG(c_id) FROM customer GROUP BY c_nation",
    );
    assert_eq!(
        encoded,
        "S;customer;true;2,0\nA;0;0;SUM($1),COUNT($1)\nP;1;[$0, CAST(/($1, $2)):INTEGER]\n"
    );
}

/// A global COUNT(*) reads only the columns its WHERE clause needs.
#[test]
fn test_global_count_star_with_filter() {
    let dir = sales_database();
    let (_, encoded) = plan_and_encode(
        dir.path(),
        "SELECT COUNT(*) FROM orders WHERE o_total > 10",
    );
    assert_eq!(
        encoded,
        "S;orders;true;2\nF;0;>($0, 10)\nP;1;[0]\nA;2;;COUNT()\n"
    );
}

#[test]
fn test_where_true_is_dropped() {
    let dir = sales_database();
    let (_, encoded) = plan_and_encode(dir.path(), "SELECT o_id FROM orders WHERE TRUE");
    assert_eq!(encoded, "S;orders;true;0\n");
}

#[test]
fn test_date_literal_is_normalised() {
    let dir = sales_database();
    let (_, encoded) = plan_and_encode(
        dir.path(),
        "SELECT o_id FROM orders WHERE o_date >= DATE '1998-2-1'",
    );
    assert_eq!(encoded, "S;orders;true;0,3\nF;0;>=($1, 1998-02-01)\nP;1;[$0]\n");
}

#[test]
fn test_table_names_are_case_insensitive() {
    let dir = sales_database();
    let (_, encoded) = plan_and_encode(dir.path(), "SELECT C_NAME FROM Customer");
    assert_eq!(encoded, "S;customer;true;1\n");
}

/// Planning the same query twice yields byte-identical output.
#[test]
fn test_plans_are_deterministic() {
    let dir = sales_database();
    let sql = "SELECT o_id, c_name FROM orders JOIN customer ON o_custkey = c_id \
               WHERE c_nation = 3 AND o_id > 100";

    let first = plan_and_encode(dir.path(), sql);
    for _ in 0..5 {
        assert_eq!(plan_and_encode(dir.path(), sql), first);
    }
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_binding_errors() {
    let dir = sales_database();
    let catalog = Catalog::from_directory(dir.path(), false).unwrap();
    let optimizer = HepPlanner::new(default_program(), 1000);
    let planner = QueryPlanner::new(&catalog, &optimizer);

    let cases = [
        ("SELEC c_name FROM customer", "AETHRA_QUERY_PARSE"),
        ("SELECT c_name FROM nation", "AETHRA_QUERY_UNKNOWN_TABLE"),
        ("SELECT c_phone FROM customer", "AETHRA_QUERY_UNKNOWN_COLUMN"),
        ("SELECT c_name, SUM(c_id) FROM customer", "AETHRA_QUERY_NOT_GROUPED"),
        ("SELECT o_id FROM orders WHERE o_date = DATE '1998-02-29'", "AETHRA_QUERY_INVALID"),
        (
            "SELECT o_id FROM orders WHERE o_total > 1234567890123456789012345678901234567890.5",
            "AETHRA_QUERY_INVALID",
        ),
    ];

    for (sql, code) in cases {
        let err = planner.plan(sql).unwrap_err();
        assert_eq!(err.code().code(), code, "query: {}", sql);
    }
}

#[test]
fn test_outer_join_plans_but_does_not_encode() {
    let dir = sales_database();
    let catalog = Catalog::from_directory(dir.path(), false).unwrap();
    let optimizer = HepPlanner::new(default_program(), 1000);
    let plan = QueryPlanner::new(&catalog, &optimizer)
        .plan("SELECT o_id, c_name FROM orders LEFT JOIN customer ON o_custkey = c_id")
        .unwrap();

    assert!(explain(&plan).contains("joinType=[left]"));
    let err = encode(&plan).unwrap_err();
    assert_eq!(err.code().code(), "AETHRA_ENCODE_UNSUPPORTED");
}
