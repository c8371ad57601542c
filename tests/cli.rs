use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn sql_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp file");
    file
}

fn compiler() -> Command {
    Command::cargo_bin("rs-sql-ir").expect("binary should build")
}

#[test]
fn test_full_report() {
    let input = sql_file("SELECT name, age FROM users WHERE age > 18;\n");
    compiler()
        .arg(input.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Lexical analysis ==="))
        .stdout(predicate::str::contains(
            "Token: { Type: KEYWORD, Value: 'SELECT', Line: 1, Column: 1 }",
        ))
        .stdout(predicate::str::contains("Syntax analysis completed successfully"))
        .stdout(predicate::str::contains("T3 = age > 18"))
        .stdout(predicate::str::contains("RETURN T4"));
}

#[test]
fn test_emit_ir_only() {
    let input =
        sql_file("SELECT COUNT(id) AS cnt FROM orders GROUP BY status HAVING COUNT(id) > 5;");
    compiler()
        .arg(input.path())
        .args(["--emit", "ir"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("T0 = PROJECT _"))
        .stdout(predicate::str::contains("T6 = HAVING T4 T5 (COUNT(id) > 5)"))
        .stdout(predicate::str::contains("Token:").not());
}

#[test]
fn test_emit_tokens_only() {
    let input = sql_file("SELECT a FROM t; -- done");
    compiler()
        .arg(input.path())
        .args(["--emit", "tokens"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Type: COMMENT, Value: ' done'"))
        .stdout(predicate::str::contains("RETURN").not());
}

#[test]
fn test_missing_file() {
    compiler()
        .arg("/definitely/not/here.sql")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: cannot read '/definitely/not/here.sql'"));
}

#[test]
fn test_lexical_error_exits_nonzero() {
    let input = sql_file("SELECT a FROM t WHERE a = #;");
    compiler()
        .arg(input.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Compilation stopped by lexical errors"))
        .stderr(predicate::str::contains(
            "error: lexical error at line 1, column 27: Invalid character",
        ));
}

#[test]
fn test_syntax_error_exits_nonzero() {
    let input = sql_file("SELECT name users;");
    compiler()
        .arg(input.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected FROM keyword"));
}

#[test]
fn test_semicolon_policy() {
    let input = sql_file("SELECT a FROM t");
    compiler()
        .arg(input.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected semicolon"));

    compiler()
        .arg(input.path())
        .args(["--semicolon", "optional"])
        .assert()
        .success();
}

#[test]
fn test_schema_checks() {
    let schema = sql_file("users(id INT, name VARCHAR, age INT);");
    let good = sql_file("SELECT name FROM users WHERE age > 21;");
    compiler()
        .arg(good.path())
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Semantic analysis completed successfully"));

    let bad = sql_file("SELECT email FROM users WHERE age = 'x';");
    compiler()
        .arg(bad.path())
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Column not found: email"))
        .stderr(predicate::str::contains("Type mismatch: age is INT"));
}

#[test]
fn test_invalid_schema() {
    let schema = sql_file("users id INT);");
    let input = sql_file("SELECT a FROM t;");
    compiler()
        .arg(input.path())
        .arg("--schema")
        .arg(schema.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid schema at line 1, column 7"));
}

#[test]
fn test_having_without_group_by_warns() {
    let input = sql_file("SELECT a FROM t HAVING COUNT(a) > 1;");
    compiler()
        .arg(input.path())
        .args(["--emit", "ir"])
        .assert()
        .success()
        .stdout(predicate::str::contains("statement left incomplete"))
        .stdout(predicate::str::contains("RETURN").not());
}
