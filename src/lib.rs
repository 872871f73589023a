//! # GraphBolt Driver
//!
//! A Rust driver for property-graph databases speaking the Bolt
//! protocol, with a built-in SQL to Cypher translator for
//! relational-style client code.
//!
//! ## Features
//!
//! - **Bolt protocol** - handshake/version negotiation, chunked
//!   framing, the full PackStream value codec and the per-connection
//!   request/response state machine, with request pipelining
//! - **Typed values** - graph entities, temporal and spatial types with
//!   defined coercion rules and insertion-ordered maps
//! - **Lazy results** - PULL-driven record streaming with configurable
//!   fetch size, row caps and cancellation
//! - **SQL to Cypher** - an AST-level translator with configurable
//!   name casing and table/join mappings
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use graphbolt_driver::{AuthToken, BoltClient, Statement};
//! use graphbolt_driver::params;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = BoltClient::connect("localhost:7687").await?;
//!     client.hello(AuthToken::basic("user", "password")).await?;
//!
//!     let mut statement = Statement::new(client);
//!     let mut rows = statement
//!         .execute_query(
//!             "MATCH (p:Person) WHERE p.name = $name RETURN p.name AS name",
//!             params! { "name" => "Alice" },
//!         )
//!         .await?;
//!
//!     while rows.advance().await? {
//!         println!("{:?}", rows.get_string("name")?);
//!     }
//!
//!     statement.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## SQL Translation
//!
//! ```rust
//! use graphbolt_driver::translator::{SqlTranslator, TranslatorConfig};
//! use std::sync::Arc;
//!
//! let config = TranslatorConfig::builder()
//!     .with_pretty_print(false)
//!     .with_always_escape_names(false)
//!     .build();
//! let translator = SqlTranslator::new(Arc::new(config));
//!
//! let cypher = translator.translate("SELECT p.name FROM Person p").unwrap();
//! assert_eq!(cypher, "MATCH (p:Person) RETURN p.name AS name");
//! ```
//!
//! ## Transactions
//!
//! ```rust,no_run
//! # use graphbolt_driver::{AuthToken, BoltClient, Statement};
//! # use indexmap::IndexMap;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut client = BoltClient::connect("localhost:7687").await?;
//! # client.hello(AuthToken::none()).await?;
//! let mut statement = Statement::new(client);
//! let mut tx = statement.begin().await?;
//! tx.run("CREATE (n:Node {id: 1})", IndexMap::new()).await?;
//! tx.run("CREATE (n:Node {id: 2})", IndexMap::new()).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - connection state machine, statements, values
//! - [`bolt`] - low-level wire protocol
//! - [`translator`] - SQL to Cypher translation

#![warn(missing_docs)]

pub mod bolt;
pub mod driver;
pub mod translator;

// Re-exports for convenience
pub use bolt::{AuthToken, BoltError, BoltVersion, PackStreamValue};
pub use driver::{
    BoltClient, ConnectionState, Counters, DriverError, DriverResult, Duration, Node, Path, Point,
    Record, RecordStream, Relationship, ResultSet, ResultSummary, Statement, Transaction, Value,
};
pub use translator::{SqlTranslator, TranslationError, TranslatorConfig};
