//! Values shared across the decoder that have meaning outside of the token stream

mod date;

pub use self::date::{Ck3Date, MAX_DATE_LEN};
