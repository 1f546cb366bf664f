pub mod dates;
pub mod filter;
pub mod recent;
pub mod record;
pub mod stats;
pub mod tags;
pub mod tools;

mod error;

pub use error::{Error, Result};
pub use filter::{CatalogSummary, Choice, Criteria};
pub use record::{Difficulty, Machine, NewMachine, Os, Platform, Record, Room, Status};
pub use stats::{
	Badge, FieldValue, HtbField, HtbRank, HtbStats, HtbStatsCamel, Snapshot, ThmField, ThmStats,
};
pub use tools::{Payload, Tool};
