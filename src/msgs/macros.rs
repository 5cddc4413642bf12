/// A macro which defines an enum type with a discriminant for each
/// named protocol value, plus an `Unknown` variant carrying anything
/// else seen on the wire.
///
/// The enum is given natural `from`/`to` conversions against its wire
/// type and a `Codec` impl of the right width, selected by the `@U8` /
/// `@U16` marker.
macro_rules! enum_builder {
    (
        $(#[$comment:meta])*
        @U8
        $enum_vis:vis enum $enum_name:ident {
            $( $enum_var:ident => $enum_val:literal ),* $(,)?
        }
    ) => {
        $(#[$comment])*
        #[non_exhaustive]
        #[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
        $enum_vis enum $enum_name {
            $( $enum_var ),*
            ,Unknown(u8)
        }

        impl $enum_name {
            #[allow(dead_code)]
            $enum_vis fn to_array(self) -> [u8; 1] {
                [u8::from(self)]
            }
        }

        impl From<u8> for $enum_name {
            fn from(x: u8) -> Self {
                match x {
                    $( $enum_val => Self::$enum_var ),*
                    , x => Self::Unknown(x),
                }
            }
        }

        impl From<$enum_name> for u8 {
            fn from(value: $enum_name) -> Self {
                match value {
                    $( $enum_name::$enum_var => $enum_val ),*
                    , $enum_name::Unknown(x) => x,
                }
            }
        }

        impl<'a> crate::msgs::codec::Codec<'a> for $enum_name {
            fn encode(&self, bytes: &mut alloc::vec::Vec<u8>) {
                u8::from(*self).encode(bytes);
            }

            fn read(r: &mut crate::msgs::codec::Reader<'a>) -> Result<Self, crate::error::InvalidMessage> {
                u8::read(r).map(Self::from)
            }
        }
    };
    (
        $(#[$comment:meta])*
        @U16
        $enum_vis:vis enum $enum_name:ident {
            $( $enum_var:ident => $enum_val:literal ),* $(,)?
        }
    ) => {
        $(#[$comment])*
        #[non_exhaustive]
        #[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
        $enum_vis enum $enum_name {
            $( $enum_var ),*
            ,Unknown(u16)
        }

        impl $enum_name {
            #[allow(dead_code)]
            $enum_vis fn to_array(self) -> [u8; 2] {
                u16::from(self).to_be_bytes()
            }
        }

        impl From<u16> for $enum_name {
            fn from(x: u16) -> Self {
                match x {
                    $( $enum_val => Self::$enum_var ),*
                    , x => Self::Unknown(x),
                }
            }
        }

        impl From<$enum_name> for u16 {
            fn from(value: $enum_name) -> Self {
                match value {
                    $( $enum_name::$enum_var => $enum_val ),*
                    , $enum_name::Unknown(x) => x,
                }
            }
        }

        impl<'a> crate::msgs::codec::Codec<'a> for $enum_name {
            fn encode(&self, bytes: &mut alloc::vec::Vec<u8>) {
                u16::from(*self).encode(bytes);
            }

            fn read(r: &mut crate::msgs::codec::Reader<'a>) -> Result<Self, crate::error::InvalidMessage> {
                u16::read(r).map(Self::from)
            }
        }
    };
}
