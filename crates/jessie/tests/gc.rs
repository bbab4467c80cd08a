//! Garbage collection behavior observable through running programs.
//!
//! The collector triggers at assignment safepoints once allocation pressure
//! crosses the heap threshold, so loops that churn through temporary heap
//! values force several collections. These tests pass only if reachable
//! values (globals, closure state, container children) survive every one of
//! them.

use jessie::{CollectStringPrint, Interpreter};

fn run(code: &str) -> String {
    let interp = Interpreter::new(code).unwrap_or_else(|err| panic!("parse failed: {err}"));
    let mut print = CollectStringPrint::default();
    interp.run(&mut print).unwrap_or_else(|err| panic!("run failed: {err}"));
    print.into_output()
}

#[test]
fn reachable_values_survive_collection_pressure() {
    let out = run(r#"
        var keep = ["first", "second"];
        var junk = null;
        var i = 0;
        while (i < 5000) {
            junk = [i, "temporary"];
            i = i + 1;
        }
        print(keep[0]);
        print(keep[1]);
        print(keep.length);
        print(junk[0]);
    "#);
    assert_eq!(out, "first\nsecond\n2\n4999\n");
}

#[test]
fn closure_state_survives_collection_pressure() {
    let out = run(r#"
        function make() {
            var count = 0;
            return function () { count = count + 1; return count; };
        }
        var tick = make();
        tick();
        var junk = null;
        var i = 0;
        while (i < 5000) {
            junk = ["garbage", i];
            i = i + 1;
        }
        print(tick());
    "#);
    assert_eq!(out, "2\n");
}

#[test]
fn object_graphs_survive_collection_pressure() {
    let out = run(r#"
        var root = { child: { leaf: "alive" }, items: [1, 2, 3] };
        var base = { shared: "proto" };
        setPrototype(root.child, base);
        var i = 0;
        var junk = null;
        while (i < 5000) {
            junk = { wrap: [i, { deep: i }] };
            i = i + 1;
        }
        print(root.child.leaf);
        print(root.child.shared);
        print(root.items[2]);
    "#);
    assert_eq!(out, "alive\nproto\n3\n");
}

#[test]
fn heap_strings_survive_while_garbage_is_reclaimed() {
    let out = run(r#"
        var word = "";
        var junk = null;
        for (var i = 0; i < 5000; i++) {
            junk = [i];
            if (i % 1000 == 0) { word = word + "x"; }
        }
        print(word == "xxxxx");
        print(word);
    "#);
    assert_eq!(out, "true\nxxxxx\n");
}
