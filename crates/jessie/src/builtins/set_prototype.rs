//! The `setPrototype` builtin, this runtime's prototype-linking primitive.

use crate::error::{EvalResult, RunError, RuntimeErrorKind};
use crate::heap::{Heap, HeapData};
use crate::value::Value;

/// `setPrototype(obj, proto)` links `proto` as the prototype of `obj` and
/// returns `obj`. Passing NULL as `proto` clears the link.
pub(crate) fn call(args: &[Value], heap: &mut Heap, line: u32) -> EvalResult<Value> {
    let (target, proto) = match args {
        [target, proto] => (*target, *proto),
        _ => {
            return Err(RunError::new(
                RuntimeErrorKind::IsNotAnObject,
                "setPrototype takes an object and a prototype",
                line,
            ))
        }
    };
    let Value::Object(target_id) = target else {
        return Err(RunError::new(
            RuntimeErrorKind::IsNotAnObject,
            format!("cannot set a prototype on a {}", target.type_str()),
            line,
        ));
    };
    let link = match proto {
        Value::Object(proto_id) => Some(proto_id),
        Value::Null => None,
        other => {
            return Err(RunError::new(
                RuntimeErrorKind::IsNotAnObject,
                format!("a {} cannot be used as a prototype", other.type_str()),
                line,
            ))
        }
    };
    let HeapData::Object(object) = heap.get_mut(target_id) else {
        unreachable!("object value pointing at non-object heap data");
    };
    object.prototype = link;
    Ok(target)
}
