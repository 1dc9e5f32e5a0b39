use proc_macro::TokenStream;

mod endpoint;

/// Derive macro turning a struct into a registrable endpoint
///
/// Implements `Endpoint`, `Inject` and `Bindable` from attributes on the
/// struct's named fields. The struct must also implement `Handler` and
/// `Clone`.
///
/// Routing attributes go on the `Pattern` marker field:
/// - `#[route(method = "GET", path = "/users/{id}")]`
/// - `#[action(name = "file.save", keys = "ctrl+s")]`
///
/// Field attributes:
/// - `#[inject]` / `#[inject(name = "UserStore")]`: filled from the container.
///   The field must be `Option<Arc<T>>` or `Arc<T>`
/// - `#[bind(query = "times", header = "X-Times", default = "1")]`: bound from
///   the listed sources; the field type must implement `FromParam`
/// - `#[bind(body)]`: receives the decoded JSON request body
/// - `#[bind(json = "alias")]`: extra key accepted in action payloads
/// - `#[bind(skip)]`: never set from a payload
///
/// Every field that is not the marker, an `#[inject]` slot or skipped can be
/// set from an action payload and must implement `Deserialize`.
///
/// # Example
/// ```ignore
/// use modrouter::prelude::*;
///
/// #[derive(Clone, Default, Endpoint)]
/// struct GetUser {
///     #[route(method = "GET", path = "/users/{id}")]
///     meta: Pattern,
///     #[bind(path = "id")]
///     id: u64,
///     #[inject(name = "UserStore")]
///     store: Option<Arc<dyn UserStore>>,
/// }
/// ```
#[proc_macro_derive(Endpoint, attributes(route, action, bind, inject))]
pub fn derive_endpoint(input: TokenStream) -> TokenStream {
    endpoint::derive_endpoint(input)
}
