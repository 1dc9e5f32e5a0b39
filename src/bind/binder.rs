use super::{BindError, Bindable};

/// Lookup function for one binding source: key in, value out.
pub type Lookup<'a> = Box<dyn Fn(&str) -> Option<String> + Send + Sync + 'a>;

/// Populates [`Bindable`] fields from named sources.
///
/// Sources are tried in the order they were added. For each field only the
/// sources it declares are consulted, and the first one producing a
/// non-empty string wins. An empty string is indistinguishable from a missing
/// value. When no source produces a value the field's default applies; with
/// no default the field keeps whatever the prototype held.
///
/// # Example
/// ```
/// use modrouter::bind::Binder;
///
/// let mut binder = Binder::new();
/// binder.add_source("query", |key| (key == "times").then(|| "3".to_string()));
/// ```
#[derive(Default)]
pub struct Binder<'a> {
    sources: Vec<(String, Lookup<'a>)>,
}

impl<'a> Binder<'a> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Register a source under `tag`. Re-registering a tag replaces its
    /// lookup but keeps its original position.
    pub fn add_source<F>(&mut self, tag: impl Into<String>, lookup: F) -> &mut Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'a,
    {
        let tag = tag.into();
        let lookup: Lookup<'a> = Box::new(lookup);
        match self.sources.iter_mut().find(|(existing, _)| *existing == tag) {
            Some(slot) => slot.1 = lookup,
            None => self.sources.push((tag, lookup)),
        }
        self
    }

    /// Tags in priority order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(tag, _)| tag.as_str())
    }

    /// Bind every declared field of `target`.
    ///
    /// Stops at the first coercion failure; fields bound before it stay set.
    pub fn bind<T: Bindable>(&self, target: &mut T) -> Result<(), BindError> {
        for spec in T::fields() {
            let value = self
                .sources
                .iter()
                .filter_map(|(tag, lookup)| spec.key_for(tag).map(|key| lookup(key)))
                .flatten()
                .find(|value| !value.is_empty())
                .or_else(|| spec.default.map(str::to_string));

            if let Some(raw) = value {
                target.set_field(spec.name, &raw)?;
            }
        }
        Ok(())
    }

    /// Decode a JSON document into the target's body field, if it has one.
    pub fn bind_json<T: Bindable>(&self, target: &mut T, data: &[u8]) -> Result<(), BindError> {
        if T::body_field().is_none() {
            return Ok(());
        }
        target.bind_body(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{FieldSpec, FromParam, Source};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Body {
        name: String,
    }

    #[derive(Debug, Default)]
    struct Target {
        times: i64,
        label: String,
        verbose: bool,
        untouched: u32,
        body: Body,
    }

    impl Bindable for Target {
        fn fields() -> &'static [FieldSpec] {
            const FIELDS: &[FieldSpec] = &[
                FieldSpec {
                    name: "times",
                    sources: &[
                        Source { tag: "a", key: "times" },
                        Source { tag: "b", key: "times" },
                    ],
                    default: Some("9"),
                },
                FieldSpec {
                    name: "label",
                    sources: &[Source { tag: "a", key: "label" }],
                    default: None,
                },
                FieldSpec {
                    name: "verbose",
                    sources: &[Source { tag: "b", key: "verbose" }],
                    default: None,
                },
                FieldSpec {
                    name: "untouched",
                    sources: &[Source { tag: "a", key: "untouched" }],
                    default: None,
                },
            ];
            FIELDS
        }

        fn set_field(&mut self, field: &str, raw: &str) -> Result<(), BindError> {
            match field {
                "times" => {
                    self.times =
                        i64::from_param(raw).map_err(|e| BindError::invalid(field, raw, e))?
                }
                "label" => {
                    self.label =
                        String::from_param(raw).map_err(|e| BindError::invalid(field, raw, e))?
                }
                "verbose" => {
                    self.verbose =
                        bool::from_param(raw).map_err(|e| BindError::invalid(field, raw, e))?
                }
                "untouched" => {
                    self.untouched =
                        u32::from_param(raw).map_err(|e| BindError::invalid(field, raw, e))?
                }
                _ => return Err(BindError::UnknownField(field.to_string())),
            }
            Ok(())
        }

        fn body_field() -> Option<&'static str> {
            Some("body")
        }

        fn bind_body(&mut self, data: &[u8]) -> Result<(), BindError> {
            self.body = serde_json::from_slice(data).map_err(|e| BindError::Body(e.to_string()))?;
            Ok(())
        }
    }

    type Pairs = &'static [(&'static str, &'static str)];

    fn lookup(pairs: Pairs) -> impl Fn(&str) -> Option<String> + Send + Sync {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    fn binder(a: Pairs, b: Pairs) -> Binder<'static> {
        let mut binder = Binder::new();
        binder.add_source("a", lookup(a));
        binder.add_source("b", lookup(b));
        binder
    }

    #[test]
    fn test_first_non_empty_source_wins() {
        let mut target = Target::default();
        binder(&[("times", "")], &[("times", "7")])
            .bind(&mut target)
            .unwrap();
        assert_eq!(target.times, 7);
    }

    #[test]
    fn test_default_applies_when_all_sources_empty() {
        let mut target = Target::default();
        binder(&[("times", "")], &[("times", "")])
            .bind(&mut target)
            .unwrap();
        assert_eq!(target.times, 9);
    }

    #[test]
    fn test_no_value_and_no_default_keeps_prototype_value() {
        let mut target = Target {
            untouched: 42,
            label: "proto".into(),
            ..Default::default()
        };
        binder(&[], &[]).bind(&mut target).unwrap();
        assert_eq!(target.untouched, 42);
        assert_eq!(target.label, "proto");
    }

    #[test]
    fn test_source_order_is_registration_order() {
        let mut target = Target::default();
        binder(&[("times", "1")], &[("times", "2")])
            .bind(&mut target)
            .unwrap();
        assert_eq!(target.times, 1);
    }

    #[test]
    fn test_field_only_consults_declared_sources() {
        let mut target = Target::default();
        // "verbose" is only declared for source b.
        binder(&[("verbose", "true")], &[]).bind(&mut target).unwrap();
        assert!(!target.verbose);
    }

    #[test]
    fn test_parse_failure_identifies_field_and_stops() {
        let mut target = Target::default();
        let err = binder(&[("times", "abc"), ("label", "x")], &[])
            .bind(&mut target)
            .unwrap_err();
        assert_eq!(err.field(), Some("times"));
        assert!(err.to_string().contains("times"));
        // Fields after the failing one were not processed.
        assert_eq!(target.label, "");
    }

    #[test]
    fn test_readding_a_source_replaces_in_place() {
        let mut b = binder(&[("times", "1")], &[("times", "2")]);
        b.add_source("a", |_: &str| None);
        assert_eq!(b.tags().collect::<Vec<_>>(), vec!["a", "b"]);

        let mut target = Target::default();
        b.bind(&mut target).unwrap();
        assert_eq!(target.times, 2);
    }

    #[test]
    fn test_bind_json_decodes_body_field() {
        let mut target = Target::default();
        Binder::new()
            .bind_json(&mut target, br#"{"name":"ada","extra":true}"#)
            .unwrap();
        assert_eq!(target.body.name, "ada");
    }

    #[test]
    fn test_bind_json_without_body_field_is_noop() {
        struct Plain;
        impl Bindable for Plain {}

        assert!(Binder::new().bind_json(&mut Plain, b"not json").is_ok());
    }
}
