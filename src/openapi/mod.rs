//! OpenAPI 3 description of HTTP endpoints.
//!
//! Built from each endpoint's declared method and path. Endpoints
//! implementing [`OpenApiMeta`] contribute a summary, parameters and
//! responses; the others get their parameters from their bound fields.

use crate::bind::Bindable;
use crate::handler::Endpoint;
use serde::Serialize;
use std::collections::BTreeMap;

pub const OPENAPI_VERSION: &str = "3.0.3";

/// Documentation an endpoint provides about itself.
pub trait OpenApiMeta {
    fn openapi_meta() -> Operation;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub openapi: String,
    pub info: Info,
    pub paths: BTreeMap<String, PathItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Info {
    pub title: String,
    pub version: String,
}

/// Lower-case method -> operation.
pub type PathItem = BTreeMap<String, Operation>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    pub responses: BTreeMap<String, Response>,
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn response(mut self, code: u16, description: impl Into<String>) -> Self {
        self.responses.insert(
            code.to_string(),
            Response {
                description: description.into(),
            },
        );
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Schema,
}

impl Parameter {
    /// A parameter read from `location` (`query`, `path`, `header`, ...).
    /// Path parameters are always required.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            name: name.into(),
            required: location == "path",
            location,
            schema: Schema::default(),
        }
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, "query")
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, "path")
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, "header")
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
}

impl Schema {
    pub fn of(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            minimum: None,
        }
    }

    pub fn integer() -> Self {
        Self::of("integer")
    }

    pub fn string() -> Self {
        Self::of("string")
    }

    pub fn boolean() -> Self {
        Self::of("boolean")
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub description: String,
}

/// Collects endpoints into a [`Document`].
///
/// # Example
/// ```
/// use modrouter::prelude::*;
/// use modrouter::openapi::{DocumentBuilder, OpenApiMeta, Operation};
///
/// #[derive(Clone, Default, Endpoint)]
/// struct Ping {
///     #[route(method = "GET", path = "/ping")]
///     meta: Pattern,
/// }
///
/// #[async_trait]
/// impl Handler for Ping {
///     async fn handle(&mut self, _ctx: &mut Context) -> HandlerResult {
///         reply("pong")
///     }
/// }
///
/// impl OpenApiMeta for Ping {
///     fn openapi_meta() -> Operation {
///         Operation::new().summary("Ping").response(200, "pong")
///     }
/// }
///
/// let doc = DocumentBuilder::new("demo", "1.0").documented::<Ping>().build();
/// assert_eq!(doc.paths["/ping"]["get"].summary.as_deref(), Some("Ping"));
/// ```
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            document: Document {
                openapi: OPENAPI_VERSION.to_string(),
                info: Info {
                    title: title.into(),
                    version: version.into(),
                },
                paths: BTreeMap::new(),
            },
        }
    }

    /// Add `T` with parameters taken from its bound fields. Skipped when `T`
    /// declares no HTTP route.
    pub fn endpoint<T: Endpoint>(self) -> Self {
        let operation = Operation {
            parameters: inferred_parameters::<T>(),
            ..Operation::default()
        };
        self.operation::<T>(operation)
    }

    /// Add `T` described by its own [`OpenApiMeta`].
    pub fn documented<T: Endpoint + OpenApiMeta>(self) -> Self {
        self.operation::<T>(T::openapi_meta())
    }

    fn operation<T: Endpoint>(mut self, mut operation: Operation) -> Self {
        let descriptor = T::descriptor();
        let (Some(method), Some(path)) = (descriptor.method, descriptor.path) else {
            return self;
        };
        if !descriptor.is_http() {
            return self;
        }
        if operation.responses.is_empty() {
            operation = operation.response(200, "OK");
        }
        self.document
            .paths
            .entry(path.to_string())
            .or_default()
            .insert(method.to_ascii_lowercase(), operation);
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}

fn inferred_parameters<T: Bindable>() -> Vec<Parameter> {
    T::fields()
        .iter()
        .flat_map(|field| {
            field
                .sources
                .iter()
                .filter(|source| matches!(source.tag, "query" | "path" | "header"))
                .map(|source| Parameter::new(source.key, source.tag))
        })
        .collect()
}

impl Document {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
