#[cfg(test)]
mod parser_tests {
    use rox::ast_printer::AstPrinter;
    use rox::error::Diagnostics;
    use rox::expr::{Expr, NodeIds};
    use rox::parser::Parser;
    use rox::scanner::scan_tokens;
    use rox::stmt::Stmt;

    fn parse(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let (tokens, scan_errors) = scan_tokens(source.as_bytes());
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(scan_errors);

        let mut ids = NodeIds::new();
        let statements = Parser::new(&tokens, &mut ids).parse(&mut diagnostics);

        (statements, diagnostics)
    }

    /// Parse `source`, which must be error free, and print every statement.
    fn printed(source: &str) -> Vec<String> {
        let (statements, diagnostics) = parse(source);

        let messages: Vec<String> = diagnostics.iter().map(|e| e.to_string()).collect();
        assert!(messages.is_empty(), "unexpected errors: {:?}", messages);

        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    fn error_messages(source: &str) -> Vec<String> {
        let (_, diagnostics) = parse(source);
        diagnostics.errors().iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_parser_01_precedence() {
        assert_eq!(
            printed("1 + 2 * 3 - 4 / 2;"),
            ["(; (- (+ 1.0 (* 2.0 3.0)) (/ 4.0 2.0)))"]
        );
        assert_eq!(
            printed("!true == false or 1 < 2 and nil;"),
            ["(; (or (== (! true) false) (and (< 1.0 2.0) nil)))"]
        );
        assert_eq!(printed("-(1 + 2);"), ["(; (- (group (+ 1.0 2.0))))"]);
    }

    #[test]
    fn test_parser_02_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 3;"), ["(; (= a (= b 3.0)))"]);
        assert_eq!(printed("a.b.c = 1;"), ["(; (.= (. a b) c 1.0))"]);
    }

    #[test]
    fn test_parser_03_ternary_binds_above_assignment() {
        assert_eq!(printed("a ? 1 : 2;"), ["(; (?: a 1.0 2.0))"]);
        assert_eq!(
            printed("x = c ? 1 : 2;"),
            ["(; (?: (= x c) 1.0 2.0))"]
        );
        assert_eq!(
            printed("var y = a == b ? \"yes\" : \"no\";"),
            ["(var y (?: (== a b) yes no))"]
        );
    }

    #[test]
    fn test_parser_04_invalid_assignment_target() {
        let errors = error_messages("1 = 2; print 3;");
        assert_eq!(
            errors,
            ["[line 1] Error at '=': Invalid assignment target."]
        );

        // the statement after still parses
        let (statements, _) = parse("1 = 2; print 3;");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parser_05_call_and_property_chains() {
        assert_eq!(printed("a.b(c).d;"), ["(; (. (call (. a b) c) d))"]);
        assert_eq!(printed("f(1)(2, 3);"), ["(; (call (call f 1.0) 2.0 3.0))"]);
    }

    #[test]
    fn test_parser_06_increment_sugar() {
        assert_eq!(printed("i++;"), ["(; (= i (+ i 1.0)))"]);
        assert_eq!(printed("i--;"), ["(; (= i (- i 1.0)))"]);
    }

    #[test]
    fn test_parser_07_for_is_desugared_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i++) print i;"),
            ["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
        assert_eq!(
            printed("for (;;) break;"),
            ["(while true (break))"]
        );
    }

    #[test]
    fn test_parser_08_arrays_and_subscripts() {
        assert_eq!(
            printed("var a = [1, -2, \"x\", nil]; var e = [];"),
            ["(var a [1.0, -2.0, x, nil])", "(var e [])"]
        );
        assert_eq!(printed("a[i + 1];"), ["(; (index a (+ i 1.0)))"]);
    }

    #[test]
    fn test_parser_09_array_elements_must_be_literals() {
        let errors = error_messages("var a = [x];");
        assert_eq!(errors, ["[line 1] Error at 'x': Expect literal value."]);
    }

    #[test]
    fn test_parser_10_classes() {
        assert_eq!(
            printed("class B < A { init(x) { this.x = x; } area { return 1; } }"),
            ["(class B < A (method init(x) (block (; (.= this x x)))) (method area() (block (return 1.0))))"]
        );
    }

    #[test]
    fn test_parser_11_functions() {
        assert_eq!(
            printed("fun add(a, b) { return a + b; }"),
            ["(fun add(a b) (block (return (+ a b))))"]
        );
        assert_eq!(
            printed("var f = fun (a) { return a; };"),
            ["(var f (lambda anonymous(a) (block (return a))))"]
        );
    }

    #[test]
    fn test_parser_12_print_global_and_use() {
        assert_eq!(printed("print 1, \"a\", nil;"), ["(print 1.0 a nil)"]);
        assert_eq!(printed("global x;"), ["(; (global x))"]);
        assert_eq!(printed("use std::math::max;"), ["(use std::math::max)"]);
    }

    #[test]
    fn test_parser_13_panic_mode_recovery() {
        let source = "var = 1;\nprint 2;\nvar x 3;\nprint 4;";
        let (statements, diagnostics) = parse(source);

        assert_eq!(diagnostics.errors().len(), 2);
        assert_eq!(
            diagnostics.errors()[0].to_string(),
            "[line 1] Error at '=': Expect variable name."
        );
        assert_eq!(
            diagnostics.errors()[1].to_string(),
            "[line 3] Error at '3': Expect ';' after variable declaration."
        );

        let printed: Vec<String> = statements.iter().map(AstPrinter::print_stmt).collect();
        assert_eq!(printed, ["(print 2.0)", "(print 4.0)"]);
    }

    #[test]
    fn test_parser_14_error_at_end() {
        assert_eq!(
            error_messages("print 1"),
            ["[line 1] Error at end: Expect ';' after value."]
        );
        assert_eq!(
            error_messages("(1 + 2;"),
            ["[line 1] Error at ';': Expect ')' after expression."]
        );
    }

    #[test]
    fn test_parser_15_identical_references_get_distinct_ids() {
        let (statements, _) = parse("a; a;");

        let ids: Vec<_> = statements
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable { id, .. }) => Some(*id),
                _ => None,
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_parser_16_deep_nesting() {
        let depth = 3000;

        let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));
        let tree = printed(&source);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].matches("(group").count(), depth);

        let source = format!("print {}true;", "!".repeat(depth));
        assert_eq!(printed(&source)[0].matches("(!").count(), depth);

        let source = format!("{}print 1;{}", "{".repeat(depth), "}".repeat(depth));
        let tree = printed(&source);
        assert_eq!(tree[0].matches("(block").count(), depth);
        assert!(tree[0].contains("(print 1.0)"));
    }
}
