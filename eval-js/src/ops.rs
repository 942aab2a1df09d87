//! Operators and abstract operations used by function bodies.
//!
//! Only the value types of this crate are covered and coercions are kept to the primitive cases;
//! objects convert to `"[object Object]"` / `NaN`.

use crate::error::EvalError;
use crate::value::Value;

/// Strict equality (`===`).
///
/// Arrays compare element-wise; objects, functions and host objects compare by identity.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Undefined, Value::Undefined) => true,
    (Value::Null, Value::Null) => true,
    (Value::Bool(x), Value::Bool(y)) => x == y,
    (Value::Number(x), Value::Number(y)) => x == y,
    (Value::String(x), Value::String(y)) => x == y,
    (Value::Array(x), Value::Array(y)) => x == y,
    (Value::Object(x), Value::Object(y)) => x.same_instance(y),
    (Value::Function(x), Value::Function(y)) => x.same_instance(y),
    (Value::Identifier(x), Value::Identifier(y)) => x == y,
    (Value::Host(x), Value::Host(y)) => x.same_instance(y),
    _ => false,
  }
}

/// Abstract equality (`==`): strict equality plus `null == undefined` and primitive coercions.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
    (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
    (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
      to_number(a) == to_number(b)
    }
    (Value::Bool(_), _) => loose_equals(&Value::Number(to_number(a)), b),
    (_, Value::Bool(_)) => loose_equals(a, &Value::Number(to_number(b))),
    _ => strict_equals(a, b),
  }
}

/// `ToNumber`.
pub fn to_number(value: &Value) -> f64 {
  match value {
    Value::Undefined => f64::NAN,
    Value::Null => 0.0,
    Value::Bool(b) => {
      if *b {
        1.0
      } else {
        0.0
      }
    }
    Value::Number(n) => *n,
    Value::String(s) => string_to_number(s),
    Value::Array(array) => string_to_number(&Value::Array(array.clone()).to_string()),
    _ => f64::NAN,
  }
}

/// `ToBoolean`.
pub fn to_boolean(value: &Value) -> bool {
  match value {
    Value::Undefined | Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => !(n.is_nan() || *n == 0.0),
    Value::String(s) => !s.is_empty(),
    _ => true,
  }
}

/// The `typeof` operator.
pub fn type_of(value: &Value) -> &'static str {
  match value {
    Value::Undefined | Value::Identifier(_) => "undefined",
    Value::Null => "object",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Function(_) => "function",
    Value::Array(_) | Value::Object(_) | Value::Host(_) => "object",
  }
}

/// The `+` operator: string concatenation if either operand is (or converts to) a string,
/// otherwise numeric addition.
pub fn add(a: &Value, b: &Value) -> Value {
  let is_stringish = |v: &Value| {
    matches!(
      v,
      Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Host(_)
    )
  };
  if is_stringish(a) || is_stringish(b) {
    return Value::from(format!("{a}{b}"));
  }
  Value::Number(to_number(a) + to_number(b))
}

pub fn sub(a: &Value, b: &Value) -> Value {
  Value::Number(to_number(a) - to_number(b))
}

pub fn mul(a: &Value, b: &Value) -> Value {
  Value::Number(to_number(a) * to_number(b))
}

pub fn div(a: &Value, b: &Value) -> Value {
  Value::Number(to_number(a) / to_number(b))
}

/// Coerces an `arguments`-style value into an argument list.
pub fn to_argument_list(value: &Value) -> Result<Vec<Value>, EvalError> {
  match value {
    Value::Array(array) => Ok(array.to_vec()),
    Value::Undefined | Value::Null => Ok(Vec::new()),
    _ => Err(EvalError::TypeError("argument list must be an array")),
  }
}

/// `Number::prototype.toString()` with radix 10.
///
/// Uses the shortest round-tripping digits, switching to exponent form for values of 1e21 and
/// above or below 1e-6.
pub(crate) fn number_to_string(n: f64) -> String {
  if n.is_nan() {
    return "NaN".to_string();
  }
  if n == 0.0 {
    // Covers -0.
    return "0".to_string();
  }
  if n < 0.0 {
    return format!("-{}", number_to_string(-n));
  }
  if n.is_infinite() {
    return "Infinity".to_string();
  }

  // `{:e}` yields the shortest digits as `d[.ddd]e<exp>`.
  let scientific = format!("{n:e}");
  let (mantissa, exponent) = scientific
    .split_once('e')
    .unwrap_or((scientific.as_str(), "0"));
  let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
  let k = digits.len() as i32;
  // Position of the decimal point relative to the start of `digits`.
  let point = exponent.parse::<i32>().unwrap_or(0) + 1;

  if k <= point && point <= 21 {
    format!("{digits}{}", "0".repeat((point - k) as usize))
  } else if 0 < point && point <= 21 {
    let (int, frac) = digits.split_at(point as usize);
    format!("{int}.{frac}")
  } else if -6 < point && point <= 0 {
    format!("0.{}{digits}", "0".repeat((-point) as usize))
  } else {
    let exp = point - 1;
    let sign = if exp >= 0 { '+' } else { '-' };
    let (first, rest) = digits.split_at(1);
    if rest.is_empty() {
      format!("{first}e{sign}{}", exp.abs())
    } else {
      format!("{first}.{rest}e{sign}{}", exp.abs())
    }
  }
}

fn string_to_number(s: &str) -> f64 {
  let trimmed = s.trim();
  if trimmed.is_empty() {
    return 0.0;
  }
  match trimmed {
    "Infinity" | "+Infinity" => return f64::INFINITY,
    "-Infinity" => return f64::NEG_INFINITY,
    _ => {}
  }
  let rest = trimmed
    .strip_prefix('+')
    .or_else(|| trimmed.strip_prefix('-'))
    .unwrap_or(trimmed);
  // Rust also accepts "inf"/"nan" spellings that JavaScript does not.
  if rest.eq_ignore_ascii_case("inf")
    || rest.eq_ignore_ascii_case("infinity")
    || rest.eq_ignore_ascii_case("nan")
  {
    return f64::NAN;
  }
  if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
    return u64::from_str_radix(hex, 16)
      .map(|n| n as f64)
      .unwrap_or(f64::NAN);
  }
  trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn number_formatting() {
    assert_eq!(number_to_string(4.0), "4");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(0.5), "0.5");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    assert_eq!(number_to_string(100.0), "100");
    assert_eq!(number_to_string(-1.25), "-1.25");
  }

  #[test]
  fn number_formatting_switches_to_exponent_form() {
    assert_eq!(number_to_string(1e21), "1e+21");
    assert_eq!(number_to_string(-1e21), "-1e+21");
    assert_eq!(number_to_string(1.5e300), "1.5e+300");
    assert_eq!(number_to_string(123456789012345680000.0), "123456789012345680000");
    assert_eq!(number_to_string(1e-7), "1e-7");
    assert_eq!(number_to_string(1.5e-7), "1.5e-7");
    assert_eq!(number_to_string(0.000001), "0.000001");
    assert_eq!(number_to_string(0.00000123), "0.00000123");
    assert_eq!(number_to_string(f64::MIN_POSITIVE), "2.2250738585072014e-308");
  }

  #[test]
  fn string_conversion() {
    assert_eq!(string_to_number("  42 "), 42.0);
    assert_eq!(string_to_number(""), 0.0);
    assert_eq!(string_to_number("0x1f"), 31.0);
    assert!(string_to_number("inf").is_nan());
    assert!(string_to_number("abc").is_nan());
  }
}
