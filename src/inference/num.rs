use serde_json::Number;

use crate::ir::Primitive;

/// Integer literals become `int`; anything with a fraction or exponent is
/// `double`. Integers outside the signed 64-bit range also go to `double`,
/// which is what a Dart runtime decodes them as.
pub fn classify(n: &Number) -> Primitive {
    if n.is_i64() {
        Primitive::Int
    } else {
        // u64 above i64::MAX, or a float literal
        Primitive::Double
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: serde_json::Value) -> Number {
        match v {
            serde_json::Value::Number(n) => n,
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn ints_and_doubles() {
        assert_eq!(classify(&num(json!(1))), Primitive::Int);
        assert_eq!(classify(&num(json!(-7))), Primitive::Int);
        assert_eq!(classify(&num(json!(1.5))), Primitive::Double);
        assert_eq!(classify(&num(json!(u64::MAX))), Primitive::Double);
    }

    #[test]
    fn fractional_literal_is_double_even_when_whole() {
        let n: Number = serde_json::from_str("1.0").unwrap();
        assert_eq!(classify(&n), Primitive::Double);
        let e: Number = serde_json::from_str("1e3").unwrap();
        assert_eq!(classify(&e), Primitive::Double);
    }
}
