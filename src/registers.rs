//! Register maps and configuration bitfields for the supported chip variants
//!
//! Each configuration field is a small enum whose discriminant is the code
//! written into the control register. Packing into register bytes happens in
//! one place per variant (`Config::control1` / `Config::control2`).

/// Declares a register field enum together with its raw-code conversions.
macro_rules! field_codes {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Raw field code, before shifting into its register position
            pub const fn code(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $(c if c == $code => Ok($name::$variant),)+
                    other => Err(other),
                }
            }
        }
    };
}

pub mod qmc5883l;
pub mod qmc5883p;
