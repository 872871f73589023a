//! # Driver Module
//!
//! The high-level API: typed values, the connection state machine,
//! record streaming, statements and transactions.
//!
//! ## Core Types
//!
//! - [`BoltClient`] - one connection, one actor, strict reply ordering
//! - [`Statement`] - execute/query operations with fetch-size, row-cap
//!   and timeout controls, optionally translating SQL to Cypher
//! - [`ResultSet`] - forward-only row cursor with typed getters and the
//!   was-null flag
//! - [`Value`] - the tagged value model, graph entities included
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graphbolt_driver::bolt::AuthToken;
//! use graphbolt_driver::driver::{BoltClient, Statement};
//! use indexmap::IndexMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = BoltClient::connect("localhost:7687").await?;
//! client.hello(AuthToken::basic("user", "password")).await?;
//!
//! let mut statement = Statement::new(client);
//! let mut rows = statement
//!     .execute_query("MATCH (p:Person) RETURN p.name AS name", IndexMap::new())
//!     .await?;
//! while rows.advance().await? {
//!     println!("{:?}", rows.get_string("name")?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bolt;
mod error;
mod record;
mod statement;
mod stream;
mod transaction;
mod unpacker;
mod value;

pub use bolt::{BoltClient, BoltConnection, ConnectionState, ServerReply};
pub use error::{DriverError, DriverResult};
pub use record::{coerce, Record};
pub use statement::{ColumnIndex, ResultSet, Statement};
pub use stream::{Counters, RecordStream, ResultSummary, DEFAULT_FETCH_SIZE};
pub use transaction::{Transaction, TransactionState};
pub use unpacker::{sig, ValuePacker, ValueUnpacker};
pub use value::{
    Duration, Node, OffsetTime, Path, Point, Relationship, UnsupportedValue, Value, Zone,
    ZonedDateTime,
};

/// Build a parameter map from `key => value` pairs.
#[macro_export]
macro_rules! params {
    () => {
        indexmap::IndexMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = indexmap::IndexMap::new();
        $(
            map.insert($key.into(), $crate::driver::Value::from($value));
        )+
        map
    }};
}
