use std::{
    any::{type_name, Any as DynAny, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock, RwLock},
};

use thiserror::Error;

use crate::basic_types::FromString;

/// Marker used as the declared type of ports that accept any entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyTypeAllowed;

#[derive(Error, Debug)]
pub enum CastError {
    #[error("cannot cast a value of type [{from}] into [{to}]")]
    TypeMismatch { from: String, to: String },
    #[error("value [{value}] is out of range for [{to}]")]
    OutOfRange { value: String, to: String },
    #[error("string [{value}] failed to parse into [{to}]")]
    ParseError { value: String, to: String },
    #[error("no string converter registered for [{to}]")]
    MissingConverter { to: String },
    #[error("value is empty")]
    Empty,
}

/// The original (pre-widening) type of a value, preserved across storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredType {
    id: TypeId,
    name: &'static str,
}

impl DeclaredType {
    pub fn of<T: 'static>() -> DeclaredType {
        DeclaredType {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Internal storage buckets. Every integral type is widened to `i64`/`u64`,
/// floats to `f64`; everything that isn't one of the interchangeable shapes
/// is stored as-is behind an `Arc`.
#[derive(Clone)]
pub enum AnyValue {
    Empty,
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Custom(Arc<dyn DynAny + Send + Sync>),
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Uint(v) => write!(f, "Uint({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A type-erased value that remembers the type it was constructed from.
///
/// The stored representation widens numerics into a small set of buckets
/// (see [`AnyValue`]) while [`DeclaredType`] keeps the original identity, so
/// a value written as `u8` can be read back as `u8` even though it travels
/// as `u64`.
#[derive(Clone)]
pub struct Any {
    value: AnyValue,
    declared: DeclaredType,
}

impl fmt::Debug for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Any({:?} as {})", self.value, self.declared.name)
    }
}

// =========================
// JSON converters
// =========================

pub type FromJsonConverter = Arc<dyn Fn(&serde_json::Value) -> Result<Any, CastError> + Send + Sync>;

fn json_converters() -> &'static RwLock<HashMap<TypeId, FromJsonConverter>> {
    static REGISTRY: OnceLock<RwLock<HashMap<TypeId, FromJsonConverter>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register the JSON representation of a custom type, process wide.
///
/// Afterwards, any string of the form `json:{...}` casts into `T` wherever
/// a raw string would be parsed (ports, blackboard reads, `try_cast`).
/// Types that were never registered fail at the point of the read, not at
/// registration.
pub fn register_json_converter<T>()
where
    T: serde::de::DeserializeOwned + Send + Sync + 'static,
{
    let convert: FromJsonConverter = Arc::new(|value: &serde_json::Value| {
        serde_json::from_value::<T>(value.clone())
            .map(Any::new)
            .map_err(|_| CastError::ParseError {
                value: value.to_string(),
                to: type_name::<T>().to_string(),
            })
    });
    json_converters()
        .write()
        .unwrap()
        .insert(TypeId::of::<T>(), convert);
}

/// Move `value` into `U` when `T` and `U` are the same type, without
/// requiring trait bounds. Compiles to a no-op after monomorphisation.
fn reinterpret<T: 'static, U: 'static>(value: T) -> Result<U, T> {
    if TypeId::of::<T>() == TypeId::of::<U>() {
        let boxed: Box<dyn DynAny> = Box::new(value);
        match boxed.downcast::<U>() {
            Ok(v) => Ok(*v),
            Err(_) => unreachable!(),
        }
    } else {
        Err(value)
    }
}

impl Any {
    pub fn empty() -> Any {
        Any {
            value: AnyValue::Empty,
            declared: DeclaredType::of::<()>(),
        }
    }

    pub fn new<T: Send + Sync + 'static>(value: T) -> Any {
        let declared = DeclaredType::of::<T>();

        macro_rules! widen {
            ($value:ident, $t:ty, $ctor:expr) => {
                let $value = match reinterpret::<T, $t>($value) {
                    Ok(v) => {
                        return Any {
                            value: $ctor(v),
                            declared,
                        }
                    }
                    Err(v) => v,
                };
            };
        }

        widen!(value, i8, |v| AnyValue::Int(v as i64));
        widen!(value, i16, |v| AnyValue::Int(v as i64));
        widen!(value, i32, |v| AnyValue::Int(v as i64));
        widen!(value, i64, AnyValue::Int);
        widen!(value, isize, |v| AnyValue::Int(v as i64));
        widen!(value, u8, |v| AnyValue::Uint(v as u64));
        widen!(value, u16, |v| AnyValue::Uint(v as u64));
        widen!(value, u32, |v| AnyValue::Uint(v as u64));
        widen!(value, u64, AnyValue::Uint);
        widen!(value, usize, |v| AnyValue::Uint(v as u64));
        widen!(value, f32, |v| AnyValue::Float(v as f64));
        widen!(value, f64, AnyValue::Float);
        widen!(value, bool, AnyValue::Bool);
        widen!(value, String, AnyValue::Str);

        // &str values are stored as String and keep String as their declared
        // type, so string entries stay interchangeable regardless of how
        // they were written.
        let value = match reinterpret::<T, &'static str>(value) {
            Ok(v) => {
                return Any {
                    value: AnyValue::Str(v.to_string()),
                    declared: DeclaredType::of::<String>(),
                }
            }
            Err(v) => v,
        };

        // Wrapping an Any in an Any keeps the inner one
        let value = match reinterpret::<T, Any>(value) {
            Ok(v) => return v,
            Err(v) => v,
        };

        Any {
            value: AnyValue::Custom(Arc::new(value)),
            declared,
        }
    }

    pub(crate) fn from_parts(value: AnyValue, declared: DeclaredType) -> Any {
        Any { value, declared }
    }

    pub fn value(&self) -> &AnyValue {
        &self.value
    }

    pub fn declared(&self) -> DeclaredType {
        self.declared
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.value, AnyValue::Empty)
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self.value,
            AnyValue::Int(_) | AnyValue::Uint(_) | AnyValue::Float(_)
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(self.value, AnyValue::Str(_))
    }

    fn mismatch(&self, to: &str) -> CastError {
        CastError::TypeMismatch {
            from: self.declared.name.to_string(),
            to: to.to_string(),
        }
    }

    /// Widened signed view. Floats are accepted only when integral and in
    /// range; strings are not parsed here.
    pub fn to_i64(&self) -> Result<i64, CastError> {
        match &self.value {
            AnyValue::Int(v) => Ok(*v),
            AnyValue::Uint(v) => i64::try_from(*v).map_err(|_| CastError::OutOfRange {
                value: v.to_string(),
                to: "i64".to_string(),
            }),
            AnyValue::Bool(v) => Ok(*v as i64),
            AnyValue::Float(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Ok(*v as i64)
                } else {
                    Err(CastError::OutOfRange {
                        value: v.to_string(),
                        to: "i64".to_string(),
                    })
                }
            }
            AnyValue::Empty => Err(CastError::Empty),
            _ => Err(self.mismatch("i64")),
        }
    }

    pub fn to_u64(&self) -> Result<u64, CastError> {
        match &self.value {
            AnyValue::Uint(v) => Ok(*v),
            AnyValue::Int(v) => u64::try_from(*v).map_err(|_| CastError::OutOfRange {
                value: v.to_string(),
                to: "u64".to_string(),
            }),
            AnyValue::Bool(v) => Ok(*v as u64),
            AnyValue::Float(v) => {
                if v.fract() == 0.0 && *v >= 0.0 && *v <= u64::MAX as f64 {
                    Ok(*v as u64)
                } else {
                    Err(CastError::OutOfRange {
                        value: v.to_string(),
                        to: "u64".to_string(),
                    })
                }
            }
            AnyValue::Empty => Err(CastError::Empty),
            _ => Err(self.mismatch("u64")),
        }
    }

    pub fn to_f64(&self) -> Result<f64, CastError> {
        match &self.value {
            AnyValue::Float(v) => Ok(*v),
            AnyValue::Int(v) => Ok(*v as f64),
            AnyValue::Uint(v) => Ok(*v as f64),
            AnyValue::Bool(v) => Ok(*v as u8 as f64),
            AnyValue::Empty => Err(CastError::Empty),
            _ => Err(self.mismatch("f64")),
        }
    }

    pub fn to_bool(&self) -> Result<bool, CastError> {
        match &self.value {
            AnyValue::Bool(v) => Ok(*v),
            AnyValue::Int(0) | AnyValue::Uint(0) => Ok(false),
            AnyValue::Int(1) | AnyValue::Uint(1) => Ok(true),
            AnyValue::Empty => Err(CastError::Empty),
            _ => Err(self.mismatch("bool")),
        }
    }

    /// Format the stored value as a string. Fails for empty and custom
    /// values.
    pub fn to_display_string(&self) -> Result<String, CastError> {
        match &self.value {
            AnyValue::Str(s) => Ok(s.clone()),
            AnyValue::Int(v) => Ok(v.to_string()),
            AnyValue::Uint(v) => Ok(v.to_string()),
            AnyValue::Float(v) => Ok(v.to_string()),
            AnyValue::Bool(v) => Ok(v.to_string()),
            AnyValue::Empty => Err(CastError::Empty),
            AnyValue::Custom(_) => Err(self.mismatch("String")),
        }
    }

    /// Convert into `T`.
    ///
    /// Resolution order: identity (including custom downcast and narrowing
    /// back to the declared type), checked numeric conversions, string
    /// parsing into numerics, numeric formatting into `String`. Casting a
    /// string into `bool` is rejected; use a port converter for that.
    pub fn try_cast<T: Clone + Send + Sync + 'static>(&self) -> Result<T, CastError> {
        let target = TypeId::of::<T>();

        if let AnyValue::Custom(v) = &self.value {
            return match v.downcast_ref::<T>() {
                Some(r) => Ok(r.clone()),
                None => Err(self.mismatch(type_name::<T>())),
            };
        }

        if target == TypeId::of::<Any>() {
            if let Ok(v) = reinterpret::<Any, T>(self.clone()) {
                return Ok(v);
            }
        }

        if target == TypeId::of::<String>() {
            let s = self.to_display_string()?;
            if let Ok(v) = reinterpret::<String, T>(s) {
                return Ok(v);
            }
        }

        if target == TypeId::of::<bool>() {
            let b = self.to_bool()?;
            if let Ok(v) = reinterpret::<bool, T>(b) {
                return Ok(v);
            }
        }

        macro_rules! cast_signed {
            ($t:ty) => {
                if target == TypeId::of::<$t>() {
                    let narrow: $t = match &self.value {
                        AnyValue::Str(s) => {
                            s.trim().parse::<$t>().map_err(|_| CastError::ParseError {
                                value: s.clone(),
                                to: stringify!($t).to_string(),
                            })?
                        }
                        _ => {
                            let wide = self.to_i64()?;
                            <$t>::try_from(wide).map_err(|_| CastError::OutOfRange {
                                value: wide.to_string(),
                                to: stringify!($t).to_string(),
                            })?
                        }
                    };
                    if let Ok(v) = reinterpret::<$t, T>(narrow) {
                        return Ok(v);
                    }
                }
            };
        }

        macro_rules! cast_unsigned {
            ($t:ty) => {
                if target == TypeId::of::<$t>() {
                    let narrow: $t = match &self.value {
                        AnyValue::Str(s) => {
                            s.trim().parse::<$t>().map_err(|_| CastError::ParseError {
                                value: s.clone(),
                                to: stringify!($t).to_string(),
                            })?
                        }
                        _ => {
                            let wide = self.to_u64()?;
                            <$t>::try_from(wide).map_err(|_| CastError::OutOfRange {
                                value: wide.to_string(),
                                to: stringify!($t).to_string(),
                            })?
                        }
                    };
                    if let Ok(v) = reinterpret::<$t, T>(narrow) {
                        return Ok(v);
                    }
                }
            };
        }

        cast_signed!(i8);
        cast_signed!(i16);
        cast_signed!(i32);
        cast_signed!(i64);
        cast_signed!(isize);
        cast_unsigned!(u8);
        cast_unsigned!(u16);
        cast_unsigned!(u32);
        cast_unsigned!(u64);
        cast_unsigned!(usize);

        if target == TypeId::of::<f64>() {
            let wide = match &self.value {
                AnyValue::Str(s) => s.trim().parse::<f64>().map_err(|_| CastError::ParseError {
                    value: s.clone(),
                    to: "f64".to_string(),
                })?,
                _ => self.to_f64()?,
            };
            if let Ok(v) = reinterpret::<f64, T>(wide) {
                return Ok(v);
            }
        }

        if target == TypeId::of::<f32>() {
            let wide = match &self.value {
                AnyValue::Str(s) => s.trim().parse::<f64>().map_err(|_| CastError::ParseError {
                    value: s.clone(),
                    to: "f32".to_string(),
                })?,
                _ => self.to_f64()?,
            };
            if !float_fits_f32(wide) {
                return Err(CastError::OutOfRange {
                    value: wide.to_string(),
                    to: "f32".to_string(),
                });
            }
            if let Ok(v) = reinterpret::<f32, T>(wide as f32) {
                return Ok(v);
            }
        }

        // Last resort: a `json:{...}` string builds a custom type through
        // its registered JSON converter
        if let AnyValue::Str(raw) = &self.value {
            if let Some(json_text) = raw.strip_prefix("json:") {
                let convert = json_converters().read().unwrap().get(&target).cloned();
                if let Some(convert) = convert {
                    let json = serde_json::from_str::<serde_json::Value>(json_text).map_err(
                        |_| CastError::ParseError {
                            value: raw.clone(),
                            to: type_name::<T>().to_string(),
                        },
                    )?;
                    return convert(&json)?.try_cast::<T>();
                }
            }
        }

        Err(self.mismatch(type_name::<T>()))
    }

    /// Rebucket this value so it matches `declared`, checking ranges. This
    /// is the write-side compatibility rule of the blackboard: numerics
    /// convert between widths when lossless, everything else must match the
    /// declared type exactly.
    pub(crate) fn converted_for(&self, declared: DeclaredType) -> Result<AnyValue, CastError> {
        let id = declared.id;

        macro_rules! narrow_signed {
            ($t:ty) => {
                if id == TypeId::of::<$t>() {
                    let wide = self.to_i64()?;
                    return <$t>::try_from(wide)
                        .map(|v| AnyValue::Int(v as i64))
                        .map_err(|_| CastError::OutOfRange {
                            value: wide.to_string(),
                            to: stringify!($t).to_string(),
                        });
                }
            };
        }
        macro_rules! narrow_unsigned {
            ($t:ty) => {
                if id == TypeId::of::<$t>() {
                    let wide = self.to_u64()?;
                    return <$t>::try_from(wide)
                        .map(|v| AnyValue::Uint(v as u64))
                        .map_err(|_| CastError::OutOfRange {
                            value: wide.to_string(),
                            to: stringify!($t).to_string(),
                        });
                }
            };
        }

        narrow_signed!(i8);
        narrow_signed!(i16);
        narrow_signed!(i32);
        narrow_signed!(i64);
        narrow_signed!(isize);
        narrow_unsigned!(u8);
        narrow_unsigned!(u16);
        narrow_unsigned!(u32);
        narrow_unsigned!(u64);
        narrow_unsigned!(usize);

        if id == TypeId::of::<f64>() {
            return Ok(AnyValue::Float(self.to_f64()?));
        }
        if id == TypeId::of::<f32>() {
            let wide = self.to_f64()?;
            if !float_fits_f32(wide) {
                return Err(CastError::OutOfRange {
                    value: wide.to_string(),
                    to: "f32".to_string(),
                });
            }
            return Ok(AnyValue::Float(wide));
        }
        if id == TypeId::of::<bool>() {
            return Ok(AnyValue::Bool(self.to_bool()?));
        }
        if id == TypeId::of::<String>() {
            return match &self.value {
                AnyValue::Str(s) => Ok(AnyValue::Str(s.clone())),
                _ => Err(self.mismatch("String")),
            };
        }

        // Custom target: types must match exactly
        if self.declared.id == id {
            Ok(self.value.clone())
        } else {
            Err(self.mismatch(declared.name))
        }
    }

    /// True when converting this value to `declared` loses nothing.
    pub fn is_casting_safe(&self, declared: DeclaredType) -> bool {
        self.converted_for(declared).is_ok()
    }

    /// Copy this value into `dst`, preserving `dst`'s internal category and
    /// declared type. An empty `dst` takes the value (and type) wholesale.
    pub fn copy_into(&self, dst: &mut Any) -> Result<(), CastError> {
        if dst.is_empty() {
            *dst = self.clone();
            return Ok(());
        }
        dst.value = self.converted_for(dst.declared)?;
        Ok(())
    }
}

fn float_fits_f32(v: f64) -> bool {
    if !v.is_finite() {
        return true;
    }
    let narrowed = v as f32;
    if !narrowed.is_finite() {
        return false;
    }
    let back = narrowed as f64;
    back == v || (back - v).abs() <= f32::EPSILON as f64 * v.abs()
}

// ===========================
// TypeInfo
// ===========================

pub type StringConverter = Arc<dyn Fn(&str) -> Result<Any, CastError> + Send + Sync>;

/// Declared type of a port or blackboard entry, plus the converter used to
/// parse raw strings into it.
#[derive(Clone)]
pub struct TypeInfo {
    declared: DeclaredType,
    converter: Option<StringConverter>,
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo({})", self.declared.name)
    }
}

impl TypeInfo {
    /// Type info with a converter built from the type's `FromString`.
    pub fn create<T>() -> TypeInfo
    where
        T: Clone + Send + Sync + FromString + 'static,
    {
        TypeInfo {
            declared: DeclaredType::of::<T>(),
            converter: Some(Arc::new(|s: &str| {
                T::from_string(s)
                    .map(Any::new)
                    .map_err(|_| CastError::ParseError {
                        value: s.to_string(),
                        to: type_name::<T>().to_string(),
                    })
            })),
        }
    }

    /// Type info for types that cannot be parsed from a string.
    pub fn create_unparsed<T: Send + Sync + 'static>() -> TypeInfo {
        TypeInfo {
            declared: DeclaredType::of::<T>(),
            converter: None,
        }
    }

    pub fn any_allowed() -> TypeInfo {
        TypeInfo {
            declared: DeclaredType::of::<AnyTypeAllowed>(),
            converter: None,
        }
    }

    pub(crate) fn from_declared(declared: DeclaredType) -> TypeInfo {
        TypeInfo {
            declared,
            converter: None,
        }
    }

    pub fn declared(&self) -> DeclaredType {
        self.declared
    }

    pub fn type_id(&self) -> TypeId {
        self.declared.id
    }

    pub fn type_name(&self) -> &'static str {
        self.declared.name
    }

    /// A type is strongly typed unless it allows anything.
    pub fn is_strongly_typed(&self) -> bool {
        self.declared.id != TypeId::of::<AnyTypeAllowed>() && self.declared.id != TypeId::of::<Any>()
    }

    pub fn converter(&self) -> Option<&StringConverter> {
        self.converter.as_ref()
    }

    pub fn parse(&self, raw: &str) -> Result<Any, CastError> {
        match &self.converter {
            Some(convert) => convert(raw),
            None => Err(CastError::MissingConverter {
                to: self.declared.name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_preserves_declared_type() {
        let any = Any::new(42u8);
        assert!(matches!(any.value(), AnyValue::Uint(42)));
        assert_eq!(any.declared().id(), TypeId::of::<u8>());
        assert_eq!(any.try_cast::<u8>().unwrap(), 42u8);
        assert_eq!(any.try_cast::<u32>().unwrap(), 42u32);
        assert_eq!(any.try_cast::<i64>().unwrap(), 42i64);
    }

    #[test]
    fn numeric_range_checks() {
        let any = Any::new(300i64);
        assert!(any.try_cast::<u8>().is_err());
        assert!(any.try_cast::<u16>().is_ok());

        let negative = Any::new(-1i32);
        assert!(negative.try_cast::<u64>().is_err());
    }

    #[test]
    fn float_conversions() {
        let whole = Any::new(2.0f64);
        assert_eq!(whole.try_cast::<i32>().unwrap(), 2);

        let fractional = Any::new(2.5f64);
        assert!(fractional.try_cast::<i32>().is_err());
        assert_eq!(fractional.try_cast::<f32>().unwrap(), 2.5f32);
    }

    #[test]
    fn string_parsing_and_formatting() {
        let text = Any::new(String::from("17"));
        assert_eq!(text.try_cast::<i32>().unwrap(), 17);
        assert!(text.try_cast::<bool>().is_err());

        let num = Any::new(99u16);
        assert_eq!(num.try_cast::<String>().unwrap(), "99");
    }

    #[test]
    fn custom_types_downcast_only() {
        #[derive(Clone, Debug, PartialEq)]
        struct Pose {
            x: f64,
            y: f64,
        }

        let any = Any::new(Pose { x: 1.0, y: 2.0 });
        assert_eq!(any.try_cast::<Pose>().unwrap(), Pose { x: 1.0, y: 2.0 });
        assert!(any.try_cast::<i64>().is_err());
        assert!(any.try_cast::<String>().is_err());
    }

    #[test]
    fn json_strings_build_registered_custom_types() {
        #[derive(Clone, Debug, PartialEq, serde::Deserialize)]
        struct Pose2D {
            x: f64,
            y: f64,
        }

        register_json_converter::<Pose2D>();

        let any = Any::new(String::from("json:{\"x\": 1.0, \"y\": 2.5}"));
        assert_eq!(
            any.try_cast::<Pose2D>().unwrap(),
            Pose2D { x: 1.0, y: 2.5 }
        );

        // Malformed JSON fails the cast, and unregistered types miss
        assert!(Any::new(String::from("json:not json"))
            .try_cast::<Pose2D>()
            .is_err());

        #[derive(Clone, Debug)]
        struct Unregistered;
        assert!(Any::new(String::from("json:{}"))
            .try_cast::<Unregistered>()
            .is_err());
    }

    #[test]
    fn copy_into_preserves_target_category() {
        let mut dst = Any::new(0u8);
        Any::new(77i64).copy_into(&mut dst).unwrap();
        assert_eq!(dst.try_cast::<u8>().unwrap(), 77);
        assert_eq!(dst.declared().id(), TypeId::of::<u8>());

        assert!(Any::new(300i64).copy_into(&mut dst).is_err());
        assert!(Any::new(String::from("x")).copy_into(&mut dst).is_err());

        let mut empty = Any::empty();
        Any::new(5i32).copy_into(&mut empty).unwrap();
        assert_eq!(empty.declared().id(), TypeId::of::<i32>());
    }
}
