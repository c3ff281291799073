/// Declares a 16 bit protocol code.
///
/// Codes without a variant survive decoding as `Unknown(code)` and display as the given
/// prefix followed by the number (`TYPE65280`), the generic form of RFC 3597. Known codes
/// display as their variant name with `_` turned into `-`.
#[macro_export]
macro_rules! wire_code_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident($unknown_prefix:literal) {
            $(
                $(#[$variant_attr:meta])*
                $variant:ident = $code:literal
            ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$variant_attr])*
                $variant,
            )*
            Unknown(u16),
        }

        impl $name {
            /// Numeric value as carried on the wire.
            pub const fn code(self) -> u16 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Unknown(code) => code,
                }
            }
        }

        impl From<u16> for $name {
            fn from(code: u16) -> Self {
                match code {
                    $($code => Self::$variant,)*
                    _ => Self::Unknown(code),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str(&stringify!($variant).replace('_', "-")),)*
                    Self::Unknown(code) => write!(f, "{}{}", $unknown_prefix, code),
                }
            }
        }
    };
}
