use super::{BindError, Bindable};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Optional input of an action dispatch.
///
/// Map-shaped and struct-shaped payloads both end up as a JSON object; a
/// struct goes through its `Serialize` impl, so its keys are its serialized
/// field names.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(Value);

impl Payload {
    pub fn map(map: Map<String, Value>) -> Self {
        Payload(Value::Object(map))
    }

    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Set every matching field of `target`.
    ///
    /// Keys match a field name case-insensitively or the field's alias. Keys
    /// with no matching field and values whose type does not fit the field
    /// are skipped. A `null` payload is the same as no payload.
    pub fn apply<T: Bindable>(self, target: &mut T) -> Result<(), BindError> {
        let map = match self.0 {
            Value::Object(map) => map,
            Value::Null => return Ok(()),
            other => return Err(BindError::NotAnObject(kind(&other).to_string())),
        };

        for (key, value) in map {
            let Some(field) = T::payload_fields().iter().find(|f| f.matches(&key)) else {
                tracing::trace!(key = %key, "payload key has no matching field");
                continue;
            };
            if let Err(e) = target.set_value(field.name, value) {
                tracing::debug!(field = field.name, error = %e, "skipping incompatible payload value");
            }
        }
        Ok(())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload(value)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Payload::map(map)
    }
}

impl From<HashMap<String, Value>> for Payload {
    fn from(map: HashMap<String, Value>) -> Self {
        Payload::map(map.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::PayloadField;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Checkout {
        order_id: String,
        quantity: u32,
    }

    impl Bindable for Checkout {
        fn payload_fields() -> &'static [PayloadField] {
            const FIELDS: &[PayloadField] = &[
                PayloadField {
                    name: "order_id",
                    alias: Some("orderId"),
                },
                PayloadField {
                    name: "quantity",
                    alias: None,
                },
            ];
            FIELDS
        }

        fn set_value(&mut self, field: &str, value: Value) -> Result<(), serde_json::Error> {
            match field {
                "order_id" => self.order_id = serde_json::from_value(value)?,
                "quantity" => self.quantity = serde_json::from_value(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn test_map_payload_matches_case_insensitively() {
        let mut target = Checkout::default();
        Payload::from(json!({ "ORDER_ID": "ORD-1", "Quantity": 2 }))
            .apply(&mut target)
            .unwrap();
        assert_eq!(target.order_id, "ORD-1");
        assert_eq!(target.quantity, 2);
    }

    #[test]
    fn test_alias_and_unknown_keys() {
        let mut target = Checkout::default();
        Payload::from(json!({ "orderId": "ORD-2", "coupon": "FREE" }))
            .apply(&mut target)
            .unwrap();
        assert_eq!(target.order_id, "ORD-2");
    }

    #[test]
    fn test_incompatible_value_is_skipped() {
        let mut target = Checkout {
            quantity: 5,
            ..Default::default()
        };
        Payload::from(json!({ "quantity": "lots", "order_id": "ORD-3" }))
            .apply(&mut target)
            .unwrap();
        assert_eq!(target.quantity, 5);
        assert_eq!(target.order_id, "ORD-3");
    }

    #[test]
    fn test_struct_payload_uses_serialized_names() {
        #[derive(Serialize)]
        struct Input {
            #[serde(rename = "orderId")]
            id: &'static str,
        }

        let mut target = Checkout::default();
        Payload::from_serialize(&Input { id: "ORD-4" })
            .unwrap()
            .apply(&mut target)
            .unwrap();
        assert_eq!(target.order_id, "ORD-4");
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = Payload::from(json!([1, 2]))
            .apply(&mut Checkout::default())
            .unwrap_err();
        assert_eq!(err, BindError::NotAnObject("an array".into()));
        assert!(Payload::from(Value::Null).apply(&mut Checkout::default()).is_ok());
    }
}
