#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rox::error::{Diagnostics, EXIT_RUNTIME, EXIT_STATIC};
    use rox::session::Session;
    use rox::value::{Arity, NativeFunction, Value};

    /// `Write` sink whose contents stay readable after the session owns it.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn take(&self) -> String {
            let bytes: Vec<u8> = std::mem::take(&mut *self.0.borrow_mut());
            String::from_utf8(bytes).expect("output is UTF-8")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Session, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Session::with_output(buffer.clone()), buffer)
    }

    /// Run `source` in a fresh session; returns printed output and diagnostics.
    fn run(source: &str) -> (String, Diagnostics) {
        let (mut session, buffer) = session();
        let diagnostics = session.run(source.as_bytes());
        (buffer.take(), diagnostics)
    }

    /// Run `source`, which must not fail, and return what it printed.
    fn output(source: &str) -> String {
        let (out, diagnostics) = run(source);
        let errors: Vec<String> = diagnostics.errors().iter().map(|e| e.to_string()).collect();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        out
    }

    /// Run `source`, which must fail at run time, and return the message.
    fn runtime_error(source: &str) -> String {
        let (_, diagnostics) = run(source);
        assert_eq!(diagnostics.exit_code(), EXIT_RUNTIME, "{:?}", diagnostics);
        diagnostics.errors()[0].to_string()
    }

    #[test]
    fn test_interpreter_01_arithmetic() {
        assert_eq!(output("print 2 * 3 + 1;"), "7\n");
        assert_eq!(output("print 7 / 2;"), "3.5\n");
        assert_eq!(output("print 1 - 5;"), "-4\n");
        assert_eq!(output("print (1 + 2) * 3;"), "9\n");
        assert_eq!(output("print 10 / 4 - 0.5;"), "2\n");
        assert_eq!(output("print 1 / 0;"), "inf\n");
        assert_eq!(output("print -(3);"), "-3\n");
    }

    #[test]
    fn test_interpreter_02_string_concatenation() {
        assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(output("print \"x\" + 1;"), "x1\n");
        assert_eq!(output("print \"x\" + 2.5;"), "x2.5\n");
        assert_eq!(
            runtime_error("print 1 + \"x\";"),
            "[line 1] Runtime error: Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn test_interpreter_03_type_errors() {
        assert_eq!(
            runtime_error("print -\"a\";"),
            "[line 1] Runtime error: Operand must be a number."
        );
        assert_eq!(
            runtime_error("print 1 < \"a\";"),
            "[line 1] Runtime error: Operands must be numbers."
        );
    }

    #[test]
    fn test_interpreter_04_equality_and_truthiness() {
        assert_eq!(output("print nil == nil;"), "true\n");
        assert_eq!(output("print nil == 0;"), "false\n");
        assert_eq!(output("print \"a\" == \"a\";"), "true\n");
        assert_eq!(output("print \"1\" == 1;"), "false\n");
        assert_eq!(output("print 1 != 2;"), "true\n");
        assert_eq!(output("print [1, 2] == [1, 2];"), "true\n");
        assert_eq!(output("print !nil, !0, !\"\", !false;"), "true false false true\n");
    }

    #[test]
    fn test_interpreter_05_logical_and_ternary() {
        assert_eq!(output("print nil or \"x\";"), "x\n");
        assert_eq!(output("print false and 1;"), "false\n");
        assert_eq!(output("print 1 and 2;"), "2\n");
        assert_eq!(output("print true ? 1 : 2;"), "1\n");

        // only the chosen branch runs
        let source = "var n = 0;
            fun bump() { n = n + 1; return n; }
            print false ? bump() : 0;
            print true or bump();
            print n;";
        assert_eq!(output(source), "0\ntrue\n0\n");
    }

    #[test]
    fn test_interpreter_06_block_scoping() {
        assert_eq!(
            output("var x = 1; { var x = 2; print x; } print x;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_interpreter_07_resolution_is_static() {
        let source = "var a = \"global\";
            {
                fun show() { print a; }
                show();
                var a = \"block\";
                show();
                print a;
            }";

        assert_eq!(output(source), "global\nglobal\nblock\n");
    }

    #[test]
    fn test_interpreter_08_closures_outlive_their_call() {
        let source = "fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var counter = makeCounter();
            print counter();
            print counter();
            var other = makeCounter();
            print other();";

        assert_eq!(output(source), "1\n2\n1\n");
    }

    #[test]
    fn test_interpreter_09_anonymous_functions() {
        assert_eq!(
            output("var add = fun (a, b) { return a + b; }; print add(2, 3);"),
            "5\n"
        );
        assert_eq!(
            output("fun scale() { var k = 3; return fun (x) { return x * k; }; } print scale()(4);"),
            "12\n"
        );
    }

    #[test]
    fn test_interpreter_10_inherited_initializer() {
        let source = "class A { init() { this.v = 1; } }
            class B < A {}
            var b = B();
            print b.v;";

        assert_eq!(output(source), "1\n");
    }

    #[test]
    fn test_interpreter_11_methods_and_inheritance() {
        let source = "class A { greet() { return \"hi \" + this.name; } }
            class B < A { init(n) { this.name = n; } }
            print B(\"bo\").greet();";
        assert_eq!(output(source), "hi bo\n");

        let source = "class Sq { init(s) { this.s = s; } area { return this.s * this.s; } }
            print Sq(3).area();";
        assert_eq!(output(source), "9\n");

        let source = "class A { name() { return \"A\"; } }
            class B < A { name() { return \"B\"; } }
            print A().name(), B().name();";
        assert_eq!(output(source), "A B\n");
    }

    #[test]
    fn test_interpreter_12_initializer_returns_instance() {
        let source = "class P { init() { this.x = 1; } }
            var p = P();
            print p.init() == p;";

        assert_eq!(output(source), "true\n");
    }

    #[test]
    fn test_interpreter_13_methods_are_rebound_onto_instances() {
        // the method copied in after init replaces the field of the same name
        let source = "class C { init() { this.m = 1; } m() { return 2; } }
            print C().m();";
        assert_eq!(output(source), "2\n");

        // a field assigned later shadows the copied method
        let source = "class D { m() { return 1; } }
            var d = D();
            d.m = 5;
            print d.m;";
        assert_eq!(output(source), "5\n");
    }

    #[test]
    fn test_interpreter_14_stringification() {
        let source = "class A {}
            fun f() {}
            print A, A(), f, clock, nil, [1, 2.5, \"x\"];";

        assert_eq!(
            output(source),
            "<class A> <A instance> <fn f> <native fn clock> nil [1, 2.5, x]\n"
        );
    }

    #[test]
    fn test_interpreter_15_break_leaves_innermost_loop() {
        let source = "var i = 0;
            while (i < 3) {
                var j = 0;
                while (true) {
                    if (j == 2) { break; }
                    j = j + 1;
                }
                print i, j;
                i = i + 1;
            }";

        assert_eq!(output(source), "0 2\n1 2\n2 2\n");
    }

    #[test]
    fn test_interpreter_16_return_leaves_innermost_call() {
        let source = "fun find() {
                var i = 0;
                while (true) {
                    { if (i == 3) { return i; } }
                    i = i + 1;
                }
            }
            fun outer() { var r = find(); return r + 10; }
            print outer();";

        assert_eq!(output(source), "13\n");
    }

    #[test]
    fn test_interpreter_17_for_loops_and_increment() {
        assert_eq!(
            output("for (var i = 0; i < 3; i++) print i;"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output("for (var i = 0; ; i++) { if (i == 2) break; print i; }"),
            "0\n1\n"
        );
        assert_eq!(output("var i = 1; i++; i++; print i;"), "3\n");
    }

    #[test]
    fn test_interpreter_18_arity_mismatch() {
        assert_eq!(
            runtime_error("fun f(a, b) { return a; } f(1);"),
            "[line 1] Runtime error: Expected 2 arguments but got 1."
        );
        assert_eq!(
            runtime_error("fun f(a, b) { return a; } f(1, 2, 3);"),
            "[line 1] Runtime error: Expected 2 arguments but got 3."
        );
        assert_eq!(
            runtime_error("class P { init(x) { this.x = x; } } P();"),
            "[line 1] Runtime error: Expected 1 arguments but got 0."
        );
    }

    #[test]
    fn test_interpreter_19_variadic_native() {
        fn count(_: &mut rox::interpreter::Interpreter, args: &[Value]) -> Result<Value, String> {
            Ok(Value::Number(args.len() as f64))
        }

        let (mut session, buffer) = session();
        session.interpreter().globals().borrow_mut().define(
            "count",
            Value::Native(NativeFunction {
                name: "count",
                arity: Arity::Variadic,
                func: count,
            }),
        );

        let diagnostics = session.run(b"print count(); print count(1, 2, 3);");
        assert!(!diagnostics.has_errors());
        assert_eq!(buffer.take(), "0\n3\n");
    }

    #[test]
    fn test_interpreter_20_arrays_and_subscripts() {
        assert_eq!(
            output("var a = [10, 20, 30]; print a[0], a[1 + 1], a[1.9];"),
            "10 30 20\n"
        );
        assert_eq!(
            runtime_error("var a = [1]; print a[1];"),
            "[line 1] Runtime error: Index 1 out of bounds for array of length 1."
        );
        assert_eq!(
            runtime_error("var a = [1]; print a[-1];"),
            "[line 1] Runtime error: Index -1 out of bounds for array of length 1."
        );
        assert_eq!(
            runtime_error("var s = 1; print s[0];"),
            "[line 1] Runtime error: 's' is not an array."
        );
        assert_eq!(
            runtime_error("var a = [1]; print a[\"x\"];"),
            "[line 1] Runtime error: Index must be a number."
        );
    }

    #[test]
    fn test_interpreter_21_runtime_error_messages() {
        assert_eq!(
            runtime_error("print nope;"),
            "[line 1] Runtime error: Undefined variable 'nope'."
        );
        assert_eq!(
            runtime_error("nope = 1;"),
            "[line 1] Runtime error: Undefined variable 'nope'."
        );
        assert_eq!(
            runtime_error("class A {} print A().x;"),
            "[line 1] Runtime error: Undefined property 'x'."
        );
        assert_eq!(
            runtime_error("var n = 1; print n.x;"),
            "[line 1] Runtime error: Only instances have properties."
        );
        assert_eq!(
            runtime_error("var n = 1; n.x = 2;"),
            "[line 1] Runtime error: Only instances have fields."
        );
        assert_eq!(
            runtime_error("\"s\"();"),
            "[line 1] Runtime error: Can only call functions and classes."
        );
        assert_eq!(
            runtime_error("var NotClass = 1; class B < NotClass {}"),
            "[line 1] Runtime error: Superclass must be a class."
        );
    }

    #[test]
    fn test_interpreter_22_runtime_error_stops_program() {
        let (out, diagnostics) = run("print 1;\nprint nope;\nprint 2;");

        assert_eq!(out, "1\n");
        assert_eq!(diagnostics.exit_code(), EXIT_RUNTIME);
        assert_eq!(
            diagnostics.errors()[0].to_string(),
            "[line 2] Runtime error: Undefined variable 'nope'."
        );
    }

    #[test]
    fn test_interpreter_23_static_errors_block_execution() {
        let (out, diagnostics) = run("print 1; return 2;");
        assert_eq!(out, "");
        assert_eq!(diagnostics.exit_code(), EXIT_STATIC);

        let (out, diagnostics) = run("print 1; print ;");
        assert_eq!(out, "");
        assert_eq!(diagnostics.exit_code(), EXIT_STATIC);

        // warnings do not
        let (out, diagnostics) = run("{ var unused = 1; } print 3;");
        assert_eq!(out, "3\n");
        assert_eq!(diagnostics.exit_code(), 0);
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_interpreter_24_global_reads_root_frame() {
        let source = "var x = \"global\";
            { var x = \"local\"; print global x; print x; }";

        assert_eq!(output(source), "global\nlocal\n");
    }

    #[test]
    fn test_interpreter_25_use_library() {
        assert_eq!(output("use std::math::max; print max(1, 5);"), "5\n");

        let (out, diagnostics) = run("use std::nope::thing; print 1;");
        assert_eq!(out, "1\n");
        assert_eq!(diagnostics.exit_code(), 0);
        assert_eq!(
            diagnostics.warnings()[0].to_string(),
            "[line 1] Warning: Could not find library 'std::nope::thing'."
        );
    }

    #[test]
    fn test_interpreter_26_string_library() {
        let source = "print len(\"abc\"), len([1, 2]);
            print substr(\"hello\", 1, 3);
            print concat(\"ab\", \"cd\");
            print split(\"a,b,c\", \",\");
            print replace(\"aXbX\", \"X\", \"-\");
            print min(4, 2);";

        assert_eq!(output(source), "3 2\nel\nabcd\n[a, b, c]\na-b-\n2\n");

        assert!(runtime_error("print substr(\"abc\", 2, 9);").contains("out of bounds"));
        assert!(runtime_error("print max(\"a\", 1);").contains("must be a number"));
    }

    #[test]
    fn test_interpreter_27_session_keeps_state_between_runs() {
        let (mut session, buffer) = session();

        assert!(!session
            .run(b"fun mk() { var v = 5; fun g() { return v; } return g; } var g = mk();")
            .has_errors());

        // a failing line does not end the session
        assert_eq!(session.run(b"print nope;").exit_code(), EXIT_RUNTIME);
        assert_eq!(session.run(b"print ;").exit_code(), EXIT_STATIC);

        assert!(!session.run(b"print g();").has_errors());
        assert_eq!(buffer.take(), "5\n");
    }

    #[test]
    fn test_interpreter_28_recursion() {
        assert_eq!(
            output("fun fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } print fib(15);"),
            "610\n"
        );
        assert_eq!(
            output("fun down(n) { if (n == 0) return 0; return down(n - 1); } print down(1500);"),
            "0\n"
        );
    }

    #[test]
    fn test_interpreter_29_runaway_recursion_is_an_error() {
        assert_eq!(
            runtime_error("fun r(n) { return r(n + 1); } r(0);"),
            "[line 1] Runtime error: Too many nested environments; possible infinite recursion."
        );

        // the session is usable afterwards
        let (mut session, buffer) = session();
        session.run(b"fun r() { return r(); } r();");
        assert!(!session.run(b"print 1;").has_errors());
        assert_eq!(buffer.take(), "1\n");
    }

    #[test]
    fn test_interpreter_30_non_integral_and_non_finite_indices() {
        // truncation toward zero: -0.5 reads element 0
        assert_eq!(output("var a = [7, 8]; print a[-0.5], a[1.99];"), "7 8\n");

        assert_eq!(
            runtime_error("var a = [7, 8]; print a[-1.5];"),
            "[line 1] Runtime error: Index -1 out of bounds for array of length 2."
        );
        assert_eq!(
            runtime_error("var a = []; print a[0/0];"),
            "[line 1] Runtime error: Index NaN out of bounds for array of length 0."
        );
        assert_eq!(
            runtime_error("var a = [7, 8]; print a[0/0];"),
            "[line 1] Runtime error: Index NaN out of bounds for array of length 2."
        );
        assert_eq!(
            runtime_error("var a = [7, 8]; print a[1/0];"),
            "[line 1] Runtime error: Index inf out of bounds for array of length 2."
        );
        assert_eq!(
            runtime_error("var a = [7, 8]; print a[-1/0];"),
            "[line 1] Runtime error: Index -inf out of bounds for array of length 2."
        );
    }

    #[test]
    fn test_interpreter_31_deeply_nested_programs() {
        let depth = 2000;

        let source = format!("print {}1 + 2{};", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(output(&source), "3\n");

        let source = format!(
            "var x = 0; {}x = x + 1;{} print x;",
            "{".repeat(depth),
            "}".repeat(depth)
        );
        assert_eq!(output(&source), "1\n");

        let source = format!(
            "{{ var a = \"deep\"; {}print a;{} }}",
            "{".repeat(depth),
            "}".repeat(depth)
        );
        assert_eq!(output(&source), "deep\n");
    }

    #[test]
    fn test_interpreter_32_variadic_math_library() {
        assert_eq!(
            output("print max(1, 5, 3), min(4), min(2, -1, 9, 0);"),
            "5 4 -1\n"
        );
        assert_eq!(
            runtime_error("print max();"),
            "[line 1] Runtime error: Missing argument 1 of 'max'."
        );
        assert!(runtime_error("print min(1, 2, \"x\");").contains("Argument 3 of 'min'"));
    }
}
