use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParamError(String);

/// Textual coercion of a bound value into a field's scalar type.
///
/// Implemented for `String`, every integer width, `bool`, `f32`, `f64`, and
/// `Option<T>` of those. A field whose type has no implementation is rejected
/// when the endpoint is compiled.
pub trait FromParam: Sized {
    fn from_param(raw: &str) -> Result<Self, ParamError>;
}

impl FromParam for String {
    fn from_param(raw: &str) -> Result<Self, ParamError> {
        Ok(raw.to_string())
    }
}

/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
impl FromParam for bool {
    fn from_param(raw: &str) -> Result<Self, ParamError> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(ParamError(format!("invalid boolean {raw:?}"))),
        }
    }
}

impl<T: FromParam> FromParam for Option<T> {
    fn from_param(raw: &str) -> Result<Self, ParamError> {
        T::from_param(raw).map(Some)
    }
}

macro_rules! from_str_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromParam for $ty {
                fn from_param(raw: &str) -> Result<Self, ParamError> {
                    raw.parse::<$ty>().map_err(|e| ParamError(e.to_string()))
                }
            }
        )*
    };
}

from_str_param!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);
