/// Static routing declaration of an endpoint type.
///
/// `method`/`path` make it an HTTP route, `action` (with optional `keys`)
/// makes it a dispatchable action. A descriptor may declare both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub type_name: &'static str,
    pub method: Option<&'static str>,
    pub path: Option<&'static str>,
    pub action: Option<&'static str>,
    pub keys: Option<&'static str>,
}

impl Descriptor {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            method: None,
            path: None,
            action: None,
            keys: None,
        }
    }

    pub fn with_route(mut self, method: &'static str, path: &'static str) -> Self {
        self.method = Some(method);
        self.path = Some(path);
        self
    }

    pub fn with_action(mut self, name: &'static str) -> Self {
        self.action = Some(name);
        self
    }

    pub fn with_keys(mut self, keys: &'static str) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Both method and path are declared and non-empty.
    pub fn is_http(&self) -> bool {
        matches!((self.method, self.path), (Some(m), Some(p)) if !m.is_empty() && !p.is_empty())
    }

    /// An action name is declared and non-empty.
    pub fn is_action(&self) -> bool {
        self.action.is_some_and(|name| !name.is_empty())
    }

    /// Key binding, treating an empty declaration as none.
    pub fn key_binding(&self) -> Option<&'static str> {
        self.keys.filter(|keys| !keys.is_empty())
    }

    /// Short type name, without the module path.
    pub fn short_name(&self) -> &'static str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.type_name)
    }
}
