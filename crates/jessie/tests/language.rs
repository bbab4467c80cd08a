//! Language semantics: scoping, calls, objects, statements, and errors.

use jessie::{CollectStringPrint, Interpreter, RuntimeErrorKind, ScriptValue};

fn run(code: &str) -> String {
    let interp = Interpreter::new(code).unwrap_or_else(|err| panic!("parse failed: {err}"));
    let mut print = CollectStringPrint::default();
    interp.run(&mut print).unwrap_or_else(|err| panic!("run failed: {err}"));
    print.into_output()
}

fn run_value(code: &str) -> ScriptValue {
    let interp = Interpreter::new(code).unwrap_or_else(|err| panic!("parse failed: {err}"));
    let mut print = CollectStringPrint::default();
    interp
        .run(&mut print)
        .unwrap_or_else(|err| panic!("run failed: {err}"))
}

fn run_err(code: &str) -> jessie::RuntimeError {
    let interp = Interpreter::new(code).unwrap_or_else(|err| panic!("parse failed: {err}"));
    let mut print = CollectStringPrint::default();
    interp.run(&mut print).expect_err("expected a runtime error")
}

// --- literals and operators ----------------------------------------------

#[test]
fn literal_results() {
    assert_eq!(run_value("42;"), ScriptValue::Int(42));
    assert_eq!(run_value("2.5;"), ScriptValue::Float(2.5));
    assert_eq!(run_value("true;"), ScriptValue::Bool(true));
    assert_eq!(run_value("null;"), ScriptValue::Null);
    assert_eq!(run_value("undefined;"), ScriptValue::Undefined);
    assert_eq!(run_value(r#""hi";"#), ScriptValue::String("hi".to_owned()));
}

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(run_value("1 + 2 * 3;"), ScriptValue::Int(7));
    assert_eq!(run_value("(1 + 2) * 3;"), ScriptValue::Int(9));
    assert_eq!(run_value("10 % 4;"), ScriptValue::Int(2));
    assert_eq!(run_value("7 / 2;"), ScriptValue::Int(3));
    assert_eq!(run_value("7.0 / 2;"), ScriptValue::Float(3.5));
    assert_eq!(run_value("-(3 + 4);"), ScriptValue::Int(-7));
}

#[test]
fn string_concatenation() {
    assert_eq!(run_value(r#""a" + "b";"#), ScriptValue::String("ab".to_owned()));
    assert_eq!(run_value(r#""n=" + 3;"#), ScriptValue::String("n=3".to_owned()));
    assert_eq!(run("var s = \"x\"; s += \"y\"; print(s);"), "xy\n");
}

#[test]
fn comparisons() {
    assert_eq!(run_value("1 < 2;"), ScriptValue::Bool(true));
    assert_eq!(run_value("2 <= 2;"), ScriptValue::Bool(true));
    assert_eq!(run_value("3 > 4;"), ScriptValue::Bool(false));
    assert_eq!(run_value("1 == 1.0;"), ScriptValue::Bool(true));
    assert_eq!(run_value("1 != 2;"), ScriptValue::Bool(true));
    assert_eq!(run_value(r#""abc" == "abc";"#), ScriptValue::Bool(true));
    assert_eq!(run_value(r#""a" < "b";"#), ScriptValue::Bool(true));
    assert_eq!(run_value("null == undefined;"), ScriptValue::Bool(false));
}

#[test]
fn logical_result_is_always_boolean() {
    assert_eq!(run_value("1 && 2;"), ScriptValue::Bool(true));
    assert_eq!(run_value("0 || 3;"), ScriptValue::Bool(true));
    assert_eq!(run_value("0 || 0;"), ScriptValue::Bool(false));
    assert_eq!(run_value("!0;"), ScriptValue::Bool(true));
    assert_eq!(run_value(r#"!"";"#), ScriptValue::Bool(true));
}

#[test]
fn compound_assignment() {
    assert_eq!(run("var x = 10; x += 5; print(x); x *= 2; print(x); x %= 7; print(x);"), "15\n30\n2\n");
}

// --- variables and scope --------------------------------------------------

#[test]
fn var_declares_in_current_frame() {
    let out = run(r#"
        var x = 1;
        function f() { var x = 2; return x; }
        print(f());
        print(x);
    "#);
    assert_eq!(out, "2\n1\n");
}

#[test]
fn assignment_to_unknown_name_declares_globally() {
    let out = run(r#"
        function a() { shared = 42; }
        function b() { return shared; }
        a();
        print(b());
        print(shared);
    "#);
    assert_eq!(out, "42\n42\n");
}

#[test]
fn undeclared_read_is_an_error() {
    let err = run_err("print(nope);");
    assert_eq!(err.kind(), RuntimeErrorKind::VariableNotFound);
    assert_eq!(err.line(), 1);
}

#[test]
fn functions_see_their_definition_scope_not_their_caller() {
    let out = run(r#"
        var x = "global";
        function show() { return x; }
        function wrapper() { var x = "local"; return show(); }
        print(wrapper());
    "#);
    assert_eq!(out, "global\n");
}

// --- functions and calls ---------------------------------------------------

#[test]
fn missing_arguments_bind_null() {
    let out = run(r#"
        function f(a, b) { return b == null; }
        print(f(1));
    "#);
    assert_eq!(out, "true\n");
}

#[test]
fn arguments_binding() {
    let out = run(r#"
        function f(a) { return arguments.length; }
        print(f(1, 2, 3));
        function g() { return arguments[1]; }
        print(g(10, 20));
    "#);
    assert_eq!(out, "3\n20\n");
}

#[test]
fn this_is_the_receiver_in_method_calls() {
    let out = run(r#"
        var o = { m: function () { return this; } };
        print(o.m() == o);
    "#);
    assert_eq!(out, "true\n");
}

#[test]
fn this_is_a_fresh_object_per_plain_call() {
    let out = run(r#"
        function h() { return this; }
        var r1 = h();
        var r2 = h();
        print(r1 == r1);
        print(r1 == r2);
    "#);
    assert_eq!(out, "true\nfalse\n");
}

#[test]
fn this_writes_are_visible_on_the_receiver() {
    let out = run(r#"
        var o = { set: function (v) { this.stored = v; } };
        o.set(7);
        print(o.stored);
    "#);
    assert_eq!(out, "7\n");
}

#[test]
fn functions_are_first_class() {
    let out = run(r#"
        var twice = function (f, x) { return f(f(x)); };
        function inc(n) { return n + 1; }
        print(twice(inc, 5));
    "#);
    assert_eq!(out, "7\n");
}

#[test]
fn named_function_expression_binds_and_evaluates() {
    let out = run(r#"
        var f = function g(n) { if (n <= 1) { return 1; } return n * g(n - 1); };
        print(f(5));
    "#);
    assert_eq!(out, "120\n");
}

#[test]
fn falling_off_the_end_returns_null() {
    assert_eq!(run("function f() { } print(f() == null);"), "true\n");
}

#[test]
fn call_errors() {
    assert_eq!(run_err("missing();").kind(), RuntimeErrorKind::FunctionNotFound);
    assert_eq!(run_err("var x = 3; x();").kind(), RuntimeErrorKind::NotAFunction);
    assert_eq!(run_err("(1 + 2)();").kind(), RuntimeErrorKind::NotAFunction);
}

#[test]
fn break_must_stay_inside_a_loop() {
    let err = run_err("function f() { break; } f();");
    assert_eq!(err.kind(), RuntimeErrorKind::ContinueReturnBreakCanNotBeInThisScope);
    let err = run_err("break;");
    assert_eq!(err.kind(), RuntimeErrorKind::ContinueReturnBreakCanNotBeInThisScope);
}

// --- arrays -----------------------------------------------------------------

#[test]
fn array_indexing() {
    assert_eq!(run("var a = [1, 2, 3]; print(a[0]); print(a[2]);"), "1\n3\n");
    assert_eq!(run("var a = [1]; a[0] = 9; print(a[0]);"), "9\n");
}

#[test]
fn array_index_errors() {
    assert_eq!(run_err("var a = [1]; a[1];").kind(), RuntimeErrorKind::IndexOutRange);
    assert_eq!(run_err("var a = [1]; a[-1];").kind(), RuntimeErrorKind::IndexOutRange);
    assert_eq!(run_err("var a = [1]; a[\"x\"];").kind(), RuntimeErrorKind::IndexHasWrongType);
    assert_eq!(run_err("var a = [1]; a.size;").kind(), RuntimeErrorKind::FieldNotDefined);
    assert_eq!(run_err("var a = [1]; a.shift();").kind(), RuntimeErrorKind::MethodNotFound);
}

#[test]
fn pop_of_empty_array_returns_null() {
    assert_eq!(run("var a = []; print(a.pop() == null); print(a.length);"), "true\n0\n");
}

#[test]
fn push_pop_round_trip_preserves_length() {
    let out = run(r#"
        var a = [1, 2, 3];
        a.push("v");
        print(a.pop());
        print(a.length);
    "#);
    assert_eq!(out, "v\n3\n");
}

#[test]
fn new_array_is_an_array_literal() {
    assert_eq!(run("var a = new Array(5, 6); print(a[1]); print(a.length);"), "6\n2\n");
}

#[test]
fn nested_arrays() {
    assert_eq!(run("var a = [[1, 2], [3]]; print(a[0][1]); print(a[1][0]);"), "2\n3\n");
}

// --- objects ----------------------------------------------------------------

#[test]
fn object_literal_and_field_access() {
    let out = run(r#"
        var o = { a: 1, "b c": 2 };
        print(o.a);
        print(o["b c"]);
        o.a = 10;
        o.fresh = 3;
        print(o.a);
        print(o.fresh);
    "#);
    assert_eq!(out, "1\n2\n10\n3\n");
}

#[test]
fn object_methods_dispatch_through_the_prototype_chain() {
    let out = run(r#"
        var base = { describe: function () { return this.name; } };
        var o = { name: "derived" };
        setPrototype(o, base);
        print(o.describe());
    "#);
    assert_eq!(out, "derived\n");
}

#[test]
fn object_errors() {
    assert_eq!(run_err("var o = {}; o.missing;").kind(), RuntimeErrorKind::FieldNotDefined);
    assert_eq!(run_err("var o = {}; o[1] = 2;").kind(), RuntimeErrorKind::IndexHasWrongType);
    assert_eq!(run_err("var x = 1; x.y;").kind(), RuntimeErrorKind::CannotIndexThisType);
    assert_eq!(run_err("var x = 1; x.m();").kind(), RuntimeErrorKind::IsNotAnObject);
    assert_eq!(run_err("new Foo();").kind(), RuntimeErrorKind::UnknownNewType);
    assert_eq!(run_err("1 = 2;").kind(), RuntimeErrorKind::CanNotUseThisAsLeftValue);
}

#[test]
fn computed_keys_use_the_full_string() {
    let out = run(r#"
        var key = "long key name";
        var o = {};
        o[key] = 1;
        print(o["long key name"]);
    "#);
    assert_eq!(out, "1\n");
}

#[test]
fn methods_defined_inline_close_over_the_literal_scope() {
    let out = run(r#"
        function build(step) {
            return { bump: function (n) { return n + step; } };
        }
        var counter = build(10);
        print(counter.bump(5));
    "#);
    assert_eq!(out, "15\n");
}

// --- statements -------------------------------------------------------------

#[test]
fn while_loop_with_break_and_continue() {
    let out = run(r#"
        var sum = 0;
        var i = 0;
        while (true) {
            i = i + 1;
            if (i > 10) { break; }
            if (i % 2 == 0) { continue; }
            sum = sum + i;
        }
        print(sum);
    "#);
    assert_eq!(out, "25\n");
}

#[test]
fn for_loop() {
    let out = run(r#"
        var total = 0;
        for (var i = 0; i < 5; i++) { total += i; }
        print(total);
    "#);
    assert_eq!(out, "10\n");
}

#[test]
fn for_loop_continue_still_runs_the_post_clause() {
    let out = run(r#"
        var hits = 0;
        for (var i = 0; i < 6; i++) {
            if (i % 2 == 0) { continue; }
            hits = hits + 1;
        }
        print(hits);
    "#);
    assert_eq!(out, "3\n");
}

#[test]
fn return_unwinds_nested_blocks_and_loops() {
    let out = run(r#"
        function find(limit) {
            for (var i = 0; i < limit; i++) {
                if (i * i > 10) { return i; }
            }
            return -1;
        }
        print(find(100));
        print(find(3));
    "#);
    assert_eq!(out, "4\n-1\n");
}

#[test]
fn if_else_chains() {
    let out = run(r#"
        function grade(n) {
            if (n >= 90) { return "a"; }
            else if (n >= 80) { return "b"; }
            else { return "c"; }
        }
        print(grade(95));
        print(grade(85));
        print(grade(10));
    "#);
    assert_eq!(out, "a\nb\nc\n");
}

// --- results through the public API ----------------------------------------

#[test]
fn structured_result_conversion() {
    let value = run_value(r#"var o = { a: [1, 2], b: "s" }; o;"#);
    assert_eq!(
        value,
        ScriptValue::Object(vec![
            (
                "a".to_owned(),
                ScriptValue::Array(vec![ScriptValue::Int(1), ScriptValue::Int(2)])
            ),
            ("b".to_owned(), ScriptValue::String("s".to_owned())),
        ])
    );
}

#[test]
fn module_result_is_the_last_expression_value() {
    assert_eq!(run_value("var x = 1;"), ScriptValue::Int(1));
    assert_eq!(run_value("function f() { }"), ScriptValue::Null);
}

#[test]
fn parse_errors_report_lines() {
    let err = Interpreter::new("var x = ;\n").unwrap_err();
    assert_eq!(err.line(), 1);
    let err = Interpreter::new("1 + 2;\nvar = 3;\n").unwrap_err();
    assert_eq!(err.line(), 2);
}

#[test]
fn runtime_errors_report_lines() {
    let err = run_err("1 + 2;\nprint(ghost);\n");
    assert_eq!(err.kind(), RuntimeErrorKind::VariableNotFound);
    assert_eq!(err.line(), 2);
    assert!(err.to_string().contains("VARIABLE_NOT_FOUND"));
}
