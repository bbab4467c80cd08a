//! The `print` builtin.

use ahash::AHashSet;

use crate::error::EvalResult;
use crate::heap::Heap;
use crate::intern::Interns;
use crate::io::PrintWriter;
use crate::value::Value;

/// Writes each argument's display form, space separated, then a newline.
/// Returns NULL.
pub(crate) fn call(args: &[Value], heap: &Heap, interns: &Interns, print: &mut impl PrintWriter) -> EvalResult<Value> {
    let mut line = String::new();
    let mut seen = AHashSet::new();
    for (index, value) in args.iter().enumerate() {
        if index > 0 {
            line.push(' ');
        }
        value
            .write_display(&mut line, heap, interns, &mut seen)
            .expect("formatting into a String cannot fail");
        seen.clear();
    }
    line.push('\n');
    print.write(&line);
    Ok(Value::Null)
}
