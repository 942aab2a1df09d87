use eval_js::{ops, EvalError, EvalOptions, Evaluator, RecordingConsole, Scope, Value};
use std::rc::Rc;

fn recording_evaluator() -> (Evaluator, RecordingConsole) {
  let console = RecordingConsole::new();
  let evaluator = Evaluator::new(EvalOptions {
    console: Rc::new(console.clone()),
    ..EvalOptions::default()
  });
  (evaluator, console)
}

fn log(scope: &Scope, name: &str) -> Result<(), EvalError> {
  let value = scope.reference(name);
  let Value::Object(console) = scope.reference("console") else {
    panic!("console is not an object");
  };
  console.invoke("log", &[value])?;
  Ok(())
}

#[test]
fn nested_functions_see_every_enclosing_binding() -> Result<(), EvalError> {
  let (evaluator, console) = recording_evaluator();
  evaluator.evaluate(|scope| {
    scope.declare("a", Value::from(1));

    scope.function_declaration("outer", &["b"], |scope, _args| {
      scope.declare("c", Value::from(3));

      scope.function_declaration("inner", &["d"], |scope, _args| {
        scope.declare("e", Value::from(5));
        for name in ["a", "b", "c", "d", "e"] {
          log(scope, name)?;
        }
        Ok(Value::Undefined)
      })?;

      scope.call("inner", &[Value::from(4)])
    })?;

    scope.call("outer", &[Value::from(2)])
  })?;

  assert_eq!(console.lines(), vec!["1", "2", "3", "4", "5"]);
  Ok(())
}

#[test]
fn returned_closure_keeps_its_invocation_bindings() -> Result<(), EvalError> {
  let (evaluator, _) = recording_evaluator();
  let (add_two, add_ten) = evaluator.evaluate(|scope| {
    let make_adder = scope.function(&["b"], |scope, _args| {
      let inner = scope.function(&["x"], |scope, _args| {
        Ok(ops::add(&scope.reference("x"), &scope.reference("b")))
      });
      Ok(Value::Function(inner))
    });
    let add_two = make_adder.call(Value::Undefined, &[Value::from(2)])?;
    let add_ten = make_adder.call(Value::Undefined, &[Value::from(10)])?;
    Ok(Value::from(vec![add_two, add_ten]))
  })
  .map(|pair| {
    let Value::Array(pair) = pair else {
      panic!("expected an array");
    };
    (pair.get(0).unwrap(), pair.get(1).unwrap())
  })?;

  // Called after the evaluation that created them has finished.
  let Value::Function(add_two) = add_two else {
    panic!("expected a function");
  };
  let Value::Function(add_ten) = add_ten else {
    panic!("expected a function");
  };
  assert_eq!(add_two.call(Value::Undefined, &[Value::from(1)])?, Value::from(3));
  assert_eq!(add_ten.call(Value::Undefined, &[Value::from(1)])?, Value::from(11));
  assert_eq!(add_two.call(Value::Undefined, &[Value::from(5)])?, Value::from(7));
  Ok(())
}

#[test]
fn closure_mutates_captured_binding() -> Result<(), EvalError> {
  let (evaluator, _) = recording_evaluator();
  let result = evaluator.evaluate(|scope| {
    let make_counter = scope.function(&[], |scope, _args| {
      scope.declare("count", Value::from(0));
      let increment = scope.function(&[], |scope, _args| {
        let next = ops::add(&scope.reference("count"), &Value::from(1));
        scope.assign("count", next.clone());
        Ok(next)
      });
      Ok(Value::Function(increment))
    });

    let Value::Function(first) = make_counter.call(Value::Undefined, &[])? else {
      panic!("expected a function");
    };
    let Value::Function(second) = make_counter.call(Value::Undefined, &[])? else {
      panic!("expected a function");
    };
    first.call(Value::Undefined, &[])?;
    first.call(Value::Undefined, &[])?;
    second.call(Value::Undefined, &[])?;
    let firsts = first.call(Value::Undefined, &[])?;
    let seconds = second.call(Value::Undefined, &[])?;
    Ok(Value::from(vec![firsts, seconds]))
  })?;

  assert_eq!(result, Value::from(vec![Value::from(3), Value::from(2)]));
  Ok(())
}

#[test]
fn local_variables_are_reassignable() -> Result<(), EvalError> {
  let (evaluator, console) = recording_evaluator();
  evaluator.evaluate(|scope| {
    scope.declare("a", Value::from(1));
    scope.declare("b", Value::from(2));
    log(scope, "a")?;
    log(scope, "b")?;

    scope.assign("a", ops::add(&scope.reference("a"), &Value::from(1)));
    scope.assign("b", ops::add(&scope.reference("a"), &scope.reference("b")));
    log(scope, "a")?;
    log(scope, "b")?;

    // Locals are not global object properties.
    assert!(!scope.global_object().has_own("a"));
    Ok(Value::Undefined)
  })?;

  assert_eq!(console.lines(), vec!["1", "2", "2", "4"]);
  Ok(())
}

#[test]
fn functions_return_values() -> Result<(), EvalError> {
  let (evaluator, console) = recording_evaluator();
  evaluator.evaluate(|scope| {
    scope.function_declaration("identity", &["x"], |scope, _args| Ok(scope.reference("x")))?;
    scope.function_declaration("square", &["x"], |scope, _args| {
      let x = scope.reference("x");
      Ok(ops::mul(&x, &x))
    })?;
    let greet = scope.function(&["msg"], |scope, _args| {
      let line = ops::add(&Value::from("a: "), &scope.reference("msg"));
      let Value::Object(console) = scope.reference("console") else {
        panic!("console is not an object");
      };
      console.invoke("log", &[line])
    });
    scope.declare("greet", Value::Function(greet));

    let Value::Object(console) = scope.reference("console") else {
      panic!("console is not an object");
    };
    let identity = scope.call("identity", &[Value::from("Hello world!")])?;
    console.invoke("log", &[identity])?;
    let square = scope.call("square", &[Value::from(2)])?;
    console.invoke("log", &[square])?;
    scope.call("greet", &[Value::from("hello")])?;
    Ok(Value::Undefined)
  })?;

  assert_eq!(console.lines(), vec!["Hello world!", "4", "a: hello"]);
  Ok(())
}
