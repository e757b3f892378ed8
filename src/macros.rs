/// Macro for simplifying implementation of `FromString` for any type that implements `FromStr`.
///
/// The macro-based implementation works for any type that implements `FromStr`;
/// it calls `parse()` under the hood.
#[doc(hidden)]
macro_rules! __impl_from_string {
    ( $($t:ty),* ) => {
        $(
            impl $crate::basic_types::FromString for $t
            {
                type Err = <$t as FromStr>::Err;

                fn from_string(value: impl AsRef<str>) -> Result<Self, Self::Err> {
                    value.as_ref().trim().parse()
                }
            }
        ) *
    };
}
#[doc(inline)]
pub(crate) use __impl_from_string as impl_from_string;

/// Macro for simplifying implementation of `BTToString` for any type implementing `Display`.
///
/// Also implements the trait for `Vec<T>` for each type, creating a `;` delimited string,
/// calling `bt_to_string()` on the item type.
#[doc(hidden)]
macro_rules! __impl_into_string {
    ( $($t:ty),* ) => {
        $(
            impl $crate::basic_types::BTToString for $t {
                fn bt_to_string(&self) -> String {
                    self.to_string()
                }
            }

            impl $crate::basic_types::BTToString for Vec<$t> {
                fn bt_to_string(&self) -> String {
                    self
                    .iter()
                    .map(|x| x.bt_to_string())
                    .collect::<Vec<String>>()
                    .join(";")
            }
        }
    ) *
};
}
#[doc(inline)]
pub(crate) use __impl_into_string as impl_into_string;

/// Collect `(name, PortInfo)` pairs (usually produced by [`input_port!`] and
/// [`output_port!`]) into a `PortsList`.
#[macro_export]
#[doc(hidden)]
macro_rules! __define_ports {
    ( $($tu:expr),* $(,)? ) => {
        {
            #[allow(unused_mut)]
            let mut ports = $crate::basic_types::PortsList::new();
            $(
                let (name, port_info) = $tu;
                ports.insert(String::from(name), port_info);
            )*

            ports
        }
    };
}
#[doc(inline)]
pub use __define_ports as define_ports;

/// Declare an input port.
///
/// - `input_port!("name")`: untyped port, any entry accepted.
/// - `input_port!("name" => u32)`: strongly typed port; raw strings are
///   parsed with `u32::from_string`.
/// - `input_port!("name" => u32, 16)`: typed port with a default value.
/// - `input_port!("name", 16)`: port typed after its default value.
#[macro_export]
#[doc(hidden)]
macro_rules! __input_port {
    ($n:tt) => {{
        use $crate::basic_types::{PortDirection, PortInfo};
        let port_info = PortInfo::new(PortDirection::Input);

        ($n, port_info)
    }};
    ($n:tt => $t:ty) => {{
        use $crate::any::TypeInfo;
        use $crate::basic_types::{PortDirection, PortInfo};
        let port_info = PortInfo::new_typed(PortDirection::Input, TypeInfo::create::<$t>());

        ($n, port_info)
    }};
    ($n:tt => $t:ty, $d:expr) => {{
        use $crate::any::TypeInfo;
        use $crate::basic_types::{PortDirection, PortInfo};
        let mut port_info = PortInfo::new_typed(PortDirection::Input, TypeInfo::create::<$t>());

        let default: $t = $d;
        port_info.set_default(default);

        ($n, port_info)
    }};
    ($n:tt, $d:expr) => {{
        use $crate::basic_types::{PortDirection, PortInfo};
        let mut port_info = PortInfo::new(PortDirection::Input);

        port_info.set_default($d);

        ($n, port_info)
    }};
}
#[doc(inline)]
pub use __input_port as input_port;

/// Declare an output port. Same forms as [`input_port!`] minus defaults for
/// the untyped variant.
#[macro_export]
#[doc(hidden)]
macro_rules! __output_port {
    ($n:tt) => {{
        use $crate::basic_types::{PortDirection, PortInfo};
        let port_info = PortInfo::new(PortDirection::Output);

        ($n, port_info)
    }};
    ($n:tt => $t:ty) => {{
        use $crate::any::TypeInfo;
        use $crate::basic_types::{PortDirection, PortInfo};
        let port_info = PortInfo::new_typed(PortDirection::Output, TypeInfo::create::<$t>());

        ($n, port_info)
    }};
}
#[doc(inline)]
pub use __output_port as output_port;
