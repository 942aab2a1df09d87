use eval_js::{EvalError, EvalOptions, Evaluator, Function, Object, RecordingConsole, Scope, Value};
use std::rc::Rc;

fn recording_evaluator() -> (Evaluator, RecordingConsole) {
  let console = RecordingConsole::new();
  let evaluator = Evaluator::new(EvalOptions {
    console: Rc::new(console.clone()),
    ..EvalOptions::default()
  });
  (evaluator, console)
}

fn log(scope: &Scope, value: Value) -> Result<(), EvalError> {
  let console = scope.reference("console");
  let Value::Object(console) = console else {
    panic!("console is not an object");
  };
  console.invoke("log", &[value])?;
  Ok(())
}

fn returns_this(scope: &Scope) -> Function {
  scope.function(&[], |scope, _args| Ok(scope.this_value()))
}

#[test]
fn call_and_apply_use_the_supplied_receiver() -> Result<(), EvalError> {
  let (evaluator, _) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let f = returns_this(scope);
    let x = Value::Object(Object::new());

    assert_eq!(f.call(x.clone(), &[])?, x);
    assert_eq!(f.apply(x.clone(), &Value::from(Vec::new()))?, x);
    assert_eq!(f.apply(x.clone(), &Value::Undefined)?, x);
    Ok(Value::Undefined)
  })?;
  Ok(())
}

#[test]
fn bound_receiver_wins_over_call_receiver() -> Result<(), EvalError> {
  let (evaluator, _) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let f = returns_this(scope);
    let x = Value::Object(Object::new());
    let y = Value::Object(Object::new());
    let z = Value::Object(Object::new());

    let g = f.bind(x.clone());
    assert!(g.is_bound());
    assert_eq!(g.call(y.clone(), &[])?, x);
    assert_eq!(g.apply(y, &Value::from(Vec::new()))?, x);

    let rebound = g.bind(z);
    assert!(rebound.same_instance(&g));
    assert_eq!(rebound.call(Value::Undefined, &[])?, x);

    // Binding creates a new function; the unbound one keeps a free receiver.
    assert!(!g.same_instance(&f));
    assert!(!f.is_bound());
    Ok(Value::Undefined)
  })?;
  Ok(())
}

#[test]
fn bare_call_uses_current_receiver() -> Result<(), EvalError> {
  let (evaluator, console) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let this_check = scope.function(&["expected"], |scope, _args| {
      let same = scope.this_value() == scope.reference("expected");
      log(scope, Value::Bool(same))?;
      Ok(Value::Undefined)
    });
    scope.declare("thisCheck", Value::Function(this_check.clone()));

    let this = scope.this_value();
    let abc = Value::from("abc");
    scope.call("thisCheck", &[this.clone()])?;
    scope.call("thisCheck", &[abc.clone()])?;

    this_check.call(this.clone(), &[this.clone()])?;
    this_check.call(this.clone(), &[abc.clone()])?;
    this_check.call(abc.clone(), &[abc.clone()])?;
    this_check.call(abc.clone(), &[this.clone()])?;
    Ok(Value::Undefined)
  })?;

  let expected: Vec<Value> = [true, false, true, false, true, false]
    .into_iter()
    .map(Value::Bool)
    .collect();
  assert_eq!(console.messages(), expected);
  Ok(())
}

#[test]
fn bound_function_called_by_name() -> Result<(), EvalError> {
  let (evaluator, console) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let this_check = scope.function(&["expected"], |scope, _args| {
      let same = scope.this_value() == scope.reference("expected");
      log(scope, Value::Bool(same))?;
      Ok(Value::Undefined)
    });
    scope.declare("thisCheck", Value::Function(this_check));

    let Value::Function(unbound) = scope.reference("thisCheck") else {
      panic!("thisCheck is not a function");
    };
    scope.assign("thisCheck", Value::Function(unbound.bind(Value::from("abc"))));

    let this = scope.this_value();
    scope.call("thisCheck", &[this.clone()])?;
    scope.call("thisCheck", &[Value::from("abc")])?;
    Ok(Value::Undefined)
  })?;

  assert_eq!(console.messages(), vec![Value::Bool(false), Value::Bool(true)]);
  Ok(())
}

#[test]
fn array_receiver_compares_with_arguments_by_content() -> Result<(), EvalError> {
  let (evaluator, console) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let args_check = scope.function(&[], |scope, _args| {
      let equal = scope.this_value() == scope.reference("arguments");
      log(scope, Value::Bool(equal))?;
      Ok(Value::Undefined)
    });

    let receiver = || Value::from(vec![Value::from(1), Value::from(2), Value::from(3)]);
    let one_two_three = [Value::from(1), Value::from(2), Value::from(3)];
    let four_five_six = [Value::from(4), Value::from(5), Value::from(6)];

    args_check.call(receiver(), &one_two_three)?;
    args_check.call(receiver(), &four_five_six)?;
    args_check.call(receiver(), &[receiver()])?;
    args_check.apply(receiver(), &Value::from(one_two_three.to_vec()))?;
    args_check.apply(receiver(), &Value::from(four_five_six.to_vec()))?;

    let bound = args_check.bind(receiver());
    bound.call(Value::from("abc"), &one_two_three)?;
    bound.apply(Value::from("abc"), &Value::from(four_five_six.to_vec()))?;
    Ok(Value::Undefined)
  })?;

  let expected: Vec<Value> = [true, false, false, true, false, true, false]
    .into_iter()
    .map(Value::Bool)
    .collect();
  assert_eq!(console.messages(), expected);
  Ok(())
}

#[test]
fn undefined_receiver_becomes_global_object() -> Result<(), EvalError> {
  let (evaluator, _) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let f = returns_this(scope);
    let global = Value::Object(scope.global_object());
    assert_eq!(f.call(Value::Undefined, &[])?, global);
    assert_eq!(f.call(Value::Null, &[])?, global);
    Ok(Value::Undefined)
  })?;
  Ok(())
}

#[test]
fn apply_rejects_non_array_argument_lists() {
  let (evaluator, _) = recording_evaluator();
  let result = evaluator.evaluate(|scope| {
    let f = returns_this(scope);
    f.apply(Value::Undefined, &Value::from("not a list"))
  });
  assert!(matches!(result, Err(EvalError::TypeError(_))));
}

#[test]
fn functions_are_compared_by_identity() -> Result<(), EvalError> {
  let (evaluator, _) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let make = || scope.function(&["x"], |scope, _args| Ok(scope.reference("x")));
    let a = make();
    let b = make();
    assert_ne!(Value::Function(a.clone()), Value::Function(b));
    assert_eq!(Value::Function(a.clone()), Value::Function(a));
    Ok(Value::Undefined)
  })?;
  Ok(())
}

#[test]
fn name_and_length_properties() -> Result<(), EvalError> {
  let (evaluator, _) = recording_evaluator();
  evaluator.evaluate(|scope| {
    let declared = scope.function_declaration("add", &["a", "b"], |_scope, _args| Ok(Value::Undefined))?;
    assert_eq!(declared.get("name"), Value::from("add"));
    assert_eq!(declared.get("length"), Value::Number(2.0));

    let anonymous = Value::Function(scope.function(&[], |_scope, _args| Ok(Value::Undefined)));
    assert_eq!(anonymous.get("name"), Value::from(""));
    assert_eq!(anonymous.get("length"), Value::Number(0.0));
    Ok(Value::Undefined)
  })?;
  Ok(())
}
