//! SQL to Cypher translation.
//!
//! [`SqlTranslator`] takes a SQL statement and produces a semantically
//! equivalent Cypher statement: SQL is parsed with the configured
//! dialect, rewritten into a Cypher AST honouring the table and join
//! mappings, and rendered under the configured case and escaping
//! policies.
//!
//! A pragma comment `/*+ NEO4J FORCE_CYPHER */` anywhere outside a
//! quoted span bypasses translation entirely; the input is returned
//! verbatim.

pub mod ast;
pub mod config;
mod render;
mod rewrite;

pub use config::{NameCase, SqlDialect, TranslatorConfig, TranslatorConfigBuilder};

use std::sync::Arc;

use sqlparser::parser::{Parser, ParserError};
use thiserror::Error;
use tracing::info;

use render::CypherRenderer;
use rewrite::SqlRewriter;

/// The force-cypher pragma.
const FORCE_CYPHER_PRAGMA: &str = "/*+ NEO4J FORCE_CYPHER */";

/// Translation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The SQL input could not be parsed
    #[error("SQL syntax error at position {position}: {message}")]
    SyntaxError {
        /// Byte offset into the input, 0 when unknown
        position: usize,
        /// Parser message
        message: String,
    },
    /// The SQL parsed but uses a construct outside the translatable
    /// subset
    #[error("untranslatable construct: {0}")]
    Untranslatable(String),
}

/// Translates SQL statements into Cypher.
pub struct SqlTranslator {
    config: Arc<TranslatorConfig>,
}

impl SqlTranslator {
    /// Create a translator over the given configuration.
    pub fn new(config: Arc<TranslatorConfig>) -> Self {
        Self { config }
    }

    /// A translator over the shared default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranslatorConfig::default_config())
    }

    /// The active configuration.
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Whether the statement carries the force-cypher pragma outside
    /// any single-, double- or backtick-quoted span.
    ///
    /// Quote spans toggle on their quote character; with unbalanced
    /// quotes the tail counts as quoted, so a pragma after a stray
    /// quote does not force.
    pub fn force_cypher(text: &str) -> bool {
        let bytes = text.as_bytes();
        let pragma = FORCE_CYPHER_PRAGMA.as_bytes();
        let mut quote: Option<u8> = None;

        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match quote {
                Some(q) => {
                    if b == q {
                        quote = None;
                    }
                }
                None => match b {
                    b'\'' | b'"' | b'`' => quote = Some(b),
                    _ => {
                        if bytes[i..].starts_with(pragma) {
                            return true;
                        }
                    }
                },
            }
            i += 1;
        }
        false
    }

    /// Translate a SQL statement into Cypher.
    ///
    /// A statement carrying the force-cypher pragma is returned exactly
    /// as given.
    pub fn translate(&self, sql: &str) -> Result<String, TranslationError> {
        if Self::force_cypher(sql) {
            return Ok(sql.to_string());
        }

        let normalised = self.normalise_named_params(sql);
        let dialect = self.config.sql_dialect().dialect();
        let statements = Parser::parse_sql(dialect.as_ref(), &normalised)
            .map_err(|e| syntax_error(&normalised, e))?;

        let statement = match statements.as_slice() {
            [single] => single,
            [] => {
                return Err(TranslationError::SyntaxError {
                    position: 0,
                    message: "empty statement".to_string(),
                })
            }
            _ => {
                return Err(TranslationError::Untranslatable(
                    "multiple statements".to_string(),
                ))
            }
        };

        let cypher_ast = SqlRewriter::new(&self.config).rewrite(statement)?;
        let cypher = CypherRenderer::new(&self.config).render(&cypher_ast);

        if self.config.diagnostic_logging() {
            info!(sql, cypher = %cypher, "translated statement");
        }
        Ok(cypher)
    }

    /// Rewrite `<prefix>name` named parameters (outside quoted spans)
    /// into the `$name` form the SQL parser understands. `?` and `$`
    /// placeholders pass through untouched.
    fn normalise_named_params(&self, sql: &str) -> String {
        let prefix = self.config.parse_named_param_prefix();
        if prefix.is_empty() || prefix == "$" || prefix == "?" {
            return sql.to_string();
        }

        let bytes = sql.as_bytes();
        let prefix_bytes = prefix.as_bytes();
        let mut out = String::with_capacity(sql.len());
        let mut quote: Option<u8> = None;
        // Verbatim text is copied in whole slices between rewrites.
        let mut segment_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            if let Some(q) = quote {
                if b == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            match b {
                b'\'' | b'"' | b'`' => {
                    quote = Some(b);
                    i += 1;
                }
                // `::` casts are not parameter prefixes.
                b':' if bytes[i..].starts_with(b"::") => {
                    i += 2;
                }
                _ if bytes[i..].starts_with(prefix_bytes) => {
                    // `::` casts and bare prefixes are untouched; a
                    // name must start with a letter or '_'.
                    let after = i + prefix_bytes.len();
                    let starts_name = bytes
                        .get(after)
                        .map(|c| c.is_ascii_alphabetic() || *c == b'_')
                        .unwrap_or(false);
                    if starts_name {
                        let name_len = bytes[after..]
                            .iter()
                            .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_')
                            .count();
                        out.push_str(&sql[segment_start..i]);
                        out.push('$');
                        out.push_str(&sql[after..after + name_len]);
                        i = after + name_len;
                        segment_start = i;
                    } else {
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }
        out.push_str(&sql[segment_start..]);
        out
    }
}

impl std::fmt::Debug for SqlTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlTranslator")
            .field("dialect", &self.config.sql_dialect())
            .finish()
    }
}

fn syntax_error(sql: &str, err: ParserError) -> TranslationError {
    let message = match &err {
        ParserError::TokenizerError(msg) | ParserError::ParserError(msg) => msg.clone(),
        ParserError::RecursionLimitExceeded => "recursion limit exceeded".to_string(),
    };
    TranslationError::SyntaxError {
        position: position_from_message(sql, &message).unwrap_or(0),
        message,
    }
}

/// Extract "Line: X, Column: Y" from a parser message and convert it to
/// a byte offset into the input.
fn position_from_message(sql: &str, message: &str) -> Option<usize> {
    let line_at = message.find("Line: ")?;
    let rest = &message[line_at + 6..];
    let line: usize = rest
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    let column_at = rest.find("Column: ")?;
    let column: usize = rest[column_at + 8..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;

    // Both are 1-based.
    let mut offset = 0;
    for (n, text) in sql.lines().enumerate() {
        if n + 1 == line {
            return Some(offset + column.saturating_sub(1));
        }
        offset += text.len() + 1;
    }
    None
}
