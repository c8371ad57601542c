use rs_sql_ir::diagnostics::MAX_LEXEME_LEN;
use rs_sql_ir::ir::{self, Opcode, Operand};
use rs_sql_ir::lexer::tokenize;
use rs_sql_ir::parser::Validator;
use rs_sql_ir::stream::TokenStream;
use rs_sql_ir::token::{Keyword, TokenKind};
use rs_sql_ir::{CompileOptions, EmitMode, SemicolonPolicy, compile_sql};

fn stream(sql: &str) -> TokenStream {
    TokenStream::from_source(sql).expect("input should scan")
}

#[test]
fn test_tokenizes_simple_select() {
    let tokens = tokenize("SELECT a, b FROM t;");
    let shape: Vec<(TokenKind, &str)> =
        tokens.iter().map(|t| (t.kind, t.lexeme.as_str())).collect();
    assert_eq!(
        shape,
        vec![
            (TokenKind::Keyword(Keyword::Select), "SELECT"),
            (TokenKind::Identifier, "a"),
            (TokenKind::Delimiter, ","),
            (TokenKind::Identifier, "b"),
            (TokenKind::Keyword(Keyword::From), "FROM"),
            (TokenKind::Identifier, "t"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::EndOfInput, "EOF"),
        ]
    );
}

#[test]
fn test_unterminated_string_halts() {
    let tokens = tokenize("SELECT 'abc");
    assert_eq!(tokens.len(), 2);
    assert!(matches!(tokens[1].kind, TokenKind::Error(_)));
    assert_eq!(tokens[1].column, 8);
}

#[test]
fn test_overlong_string_keeps_output_bounded() {
    let sql = format!("SELECT a FROM t WHERE a = '{}", "y".repeat(10_000));
    let compilation = compile_sql(&sql, &CompileOptions::default());
    let diagnostic = compilation.lexical.get().expect("scan should fail");
    assert_eq!(diagnostic.message, "Token exceeds maximum length");
    assert!(compilation.scanned.iter().all(|t| t.lexeme.len() <= MAX_LEXEME_LEN));
    let report = compilation.render_report(EmitMode::All);
    assert!(report.len() < 2_000, "report grew to {} bytes", report.len());
}

#[test]
fn test_valid_inputs_consume_whole_buffer() {
    for sql in [
        "SELECT * FROM t;",
        "SELECT DISTINCT a, b AS bee FROM t;",
        "SELECT COUNT(*) FROM t;",
        "SELECT u.name FROM users JOIN orders ON users.id = orders.user_id;",
        "SELECT a FROM t WHERE a > 1 AND b BETWEEN 2 AND 3 OR c = 'x';",
        "SELECT a, SUM(b) AS s FROM t GROUP BY a HAVING SUM(b) >= 10 ORDER BY a DESC, s;",
        "SELECT a FROM t; SELECT b FROM u;",
    ] {
        let tokens = stream(sql);
        let mut validator = Validator::new(&tokens, SemicolonPolicy::Required);
        assert!(validator.validate().is_ok(), "rejected: {sql}");
        assert_eq!(validator.cursor(), tokens.len(), "cursor short for: {sql}");
    }
}

#[test]
fn test_errors_cite_violating_token() {
    let cases = [
        ("SELECT a t;", "Expected FROM keyword", "t"),
        ("SELECT a FROM t GROUP a;", "Expected BY after GROUP", "a"),
        ("SELECT a FROM t ORDER a;", "Expected BY after ORDER", "a"),
        ("SELECT a FROM t", "Expected semicolon", "EOF"),
    ];
    for (sql, message, lexeme) in cases {
        let tokens = stream(sql);
        let diagnostic = Validator::new(&tokens, SemicolonPolicy::Required)
            .validate()
            .expect_err(sql);
        assert_eq!(diagnostic.message, message, "for: {sql}");

        let violating = tokens
            .iter()
            .find(|t| t.line == diagnostic.line && t.column == diagnostic.column)
            .expect("diagnostic should point at a token");
        assert_eq!(violating.lexeme, lexeme, "for: {sql}");
    }
}

#[test]
fn test_generation_is_idempotent() {
    let tokens = stream(
        "SELECT a, COUNT(b) AS n FROM t JOIN u ON t.id = u.id WHERE a > 1 GROUP BY a ORDER BY n;",
    );
    let render = |programs: Vec<ir::Program>| {
        programs.iter().map(ToString::to_string).collect::<String>()
    };
    assert_eq!(render(ir::generate(&tokens)), render(ir::generate(&tokens)));
}

#[test]
fn test_definition_before_use() {
    for sql in [
        "SELECT a, COUNT(b) AS n, MAX(c) FROM t JOIN u ON t.id = u.id AND t.k > 3 \
         WHERE a BETWEEN 1 AND 9 OR b <> 'z' GROUP BY a HAVING COUNT(b) > 2 ORDER BY a;",
        "SELECT a FROM t HAVING a > 1; SELECT b FROM u WHERE b = 1;",
        "SELECT FROM WHERE GROUP BY HAVING ORDER BY ;",
    ] {
        for program in ir::generate(&stream(sql)) {
            assert_eq!(program.check_definitions(), Ok(()), "undefined temp in: {sql}");
        }
    }
}

#[test]
fn test_group_by_having_end_to_end() {
    let tokens =
        stream("SELECT COUNT(id) AS cnt FROM orders GROUP BY status HAVING COUNT(id) > 5;");
    let programs = ir::generate(&tokens);
    assert_eq!(programs.len(), 1);
    let program = &programs[0];

    let aggregates: Vec<_> = program.iter().filter(|i| i.opcode == Opcode::Aggregate).collect();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].operator.as_deref(), Some("COUNT"));
    assert_eq!(aggregates[0].operand1, Some(Operand::text("id")));

    let group = program.iter().find(|i| i.opcode == Opcode::GroupBy).expect("GROUP_BY");
    assert_eq!(group.operand2, Some(Operand::text("status")));

    let having = program.iter().find(|i| i.opcode == Opcode::Having).expect("HAVING");
    assert_eq!(having.operand1, group.result.map(Operand::from));
    assert_eq!(having.operand2, aggregates[0].result.map(Operand::from));

    assert_eq!(program.instructions.last().map(|i| i.opcode), Some(Opcode::Return));
    assert_eq!(program.result(), having.result);
}

#[test]
fn test_between_lowering() {
    let tokens = stream("SELECT name FROM users WHERE age BETWEEN 18 AND 30;");
    let program = &ir::generate(&tokens)[0];
    let ops: Vec<Opcode> = program.iter().map(|i| i.opcode).collect();
    assert_eq!(
        ops,
        vec![
            Opcode::Project,
            Opcode::Select,
            Opcode::From,
            Opcode::Arithmetic,
            Opcode::Between,
            Opcode::Conditions,
            Opcode::Return,
        ]
    );
    assert_eq!(program.instructions[3].to_string(), "T3 = 18 AND 30");
    assert_eq!(program.instructions[4].to_string(), "T4 = BETWEEN age T3");
}

#[test]
fn test_having_without_group_by_keeps_partial_output() {
    let compilation = compile_sql(
        "SELECT a FROM t HAVING COUNT(a) > 1;",
        &CompileOptions::default(),
    );
    assert!(compilation.is_success());
    let program = &compilation.programs[0];
    assert!(program.aborted.is_some());
    assert_eq!(program.len(), 3);
    assert_eq!(program.result(), None);
}
