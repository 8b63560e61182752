//! The construct library: every concrete `Construct` implementation.

pub mod adapters;
pub mod aggregates;
pub mod bitfields;
pub mod checksum;
pub mod conditionals;
pub mod debug;
pub mod lazy;
pub mod primitives;
pub mod stream_ops;
pub mod strings;

pub use adapters::{Adapted, Aligned, Padded, Prefixed, Repeat, RepeatExactly};
pub use aggregates::{Computed, Contextual, Embed, Struct};
pub use bitfields::BitFields;
pub use checksum::Checksum;
pub use conditionals::{Enum, If, Raise, Switch};
pub use debug::Debug;
pub use lazy::{Lazy, LazyHandle};
pub use primitives::{Bytes, Const, Endian, Flag, Float, Integer, Padding, Pass};
pub use stream_ops::{Offset, Tell};
pub use strings::{CString, Line, PascalString, StringConstruct, TextEncoding};
