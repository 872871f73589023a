//! Translator configuration.
//!
//! An immutable bundle built once and shared. Besides the builder there
//! is a property-map source: keys under the `s2c.` prefix, dash-words
//! converted to camel case and dispatched to the matching setter.
//! Unrecognised keys, and unrecognised values for the enum-like
//! options, are logged at WARN and ignored.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use sqlparser::dialect::{
    AnsiDialect, Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    SQLiteDialect,
};
use tracing::warn;

/// Property key prefix recognised by [`TranslatorConfig::from_properties`].
pub const PROPERTY_PREFIX: &str = "s2c.";

/// How identifiers are canonicalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameCase {
    /// Keep identifiers as written
    #[default]
    AsIs,
    /// Upper-case identifiers
    Upper,
    /// Lower-case identifiers
    Lower,
}

impl NameCase {
    /// Parse a configuration value ("AS_IS", "UPPER", "LOWER").
    pub fn from_value(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "AS_IS" | "ASIS" => Some(NameCase::AsIs),
            "UPPER" => Some(NameCase::Upper),
            "LOWER" => Some(NameCase::Lower),
            _ => None,
        }
    }

    /// Apply the case policy to a name.
    pub fn apply(&self, name: &str) -> String {
        match self {
            NameCase::AsIs => name.to_string(),
            NameCase::Upper => name.to_uppercase(),
            NameCase::Lower => name.to_lowercase(),
        }
    }
}

/// The SQL grammar variant used for parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// Permissive catch-all grammar
    #[default]
    Generic,
    /// ANSI SQL
    Ansi,
    /// PostgreSQL
    Postgres,
    /// MySQL
    MySql,
    /// SQLite
    Sqlite,
    /// SQL Server
    MsSql,
}

impl SqlDialect {
    /// Parse a configuration value.
    pub fn from_value(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GENERIC" | "DEFAULT" => Some(SqlDialect::Generic),
            "ANSI" => Some(SqlDialect::Ansi),
            "POSTGRES" | "POSTGRESQL" => Some(SqlDialect::Postgres),
            "MYSQL" => Some(SqlDialect::MySql),
            "SQLITE" => Some(SqlDialect::Sqlite),
            "MSSQL" | "SQLSERVER" => Some(SqlDialect::MsSql),
            _ => None,
        }
    }

    /// The sqlparser dialect implementation.
    pub fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Generic => Box::new(GenericDialect {}),
            SqlDialect::Ansi => Box::new(AnsiDialect {}),
            SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySql => Box::new(MySqlDialect {}),
            SqlDialect::Sqlite => Box::new(SQLiteDialect {}),
            SqlDialect::MsSql => Box::new(MsSqlDialect {}),
        }
    }
}

/// Immutable translator settings.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    parse_name_case: NameCase,
    render_name_case: NameCase,
    diagnostic_logging: bool,
    table_to_label_mappings: HashMap<String, String>,
    join_columns_to_type_mappings: HashMap<String, String>,
    sql_dialect: SqlDialect,
    pretty_print: bool,
    always_escape_names: Option<bool>,
    parse_named_param_prefix: String,
}

impl TranslatorConfig {
    /// A builder starting from the defaults.
    pub fn builder() -> TranslatorConfigBuilder {
        TranslatorConfigBuilder::default()
    }

    /// The shared default configuration.
    pub fn default_config() -> Arc<TranslatorConfig> {
        static DEFAULT: OnceLock<Arc<TranslatorConfig>> = OnceLock::new();
        DEFAULT
            .get_or_init(|| Arc::new(TranslatorConfig::builder().build()))
            .clone()
    }

    /// Derive a configuration from a property map.
    ///
    /// Only keys under the `s2c.` prefix are considered; when none
    /// match, the shared default configuration is returned.
    pub fn from_properties(properties: &HashMap<String, String>) -> Arc<TranslatorConfig> {
        let mut builder = TranslatorConfig::builder();
        let mut customised = false;

        for (key, value) in properties {
            let Some(option) = key.strip_prefix(PROPERTY_PREFIX) else {
                continue;
            };
            let camel = dash_to_camel(option);
            match camel.as_str() {
                "parseNameCase" => match NameCase::from_value(value) {
                    Some(case) => {
                        builder = builder.with_parse_name_case(case);
                        customised = true;
                    }
                    None => warn!(%key, %value, "unknown name case, option ignored"),
                },
                "renderNameCase" => match NameCase::from_value(value) {
                    Some(case) => {
                        builder = builder.with_render_name_case(case);
                        customised = true;
                    }
                    None => warn!(%key, %value, "unknown name case, option ignored"),
                },
                "diagnosticLogging" => {
                    builder = builder.with_diagnostic_logging(parse_bool(value));
                    customised = true;
                }
                "tableToLabelMappings" => {
                    builder = builder.with_table_to_label_mappings(parse_map(value));
                    customised = true;
                }
                "joinColumnsToTypeMappings" => {
                    builder = builder.with_join_columns_to_type_mappings(parse_map(value));
                    customised = true;
                }
                "sqlDialect" => match SqlDialect::from_value(value) {
                    Some(dialect) => {
                        builder = builder.with_sql_dialect(dialect);
                        customised = true;
                    }
                    None => warn!(%key, %value, "unknown SQL dialect, option ignored"),
                },
                "prettyPrint" => {
                    builder = builder.with_pretty_print(parse_bool(value));
                    customised = true;
                }
                "alwaysEscapeNames" => {
                    builder = builder.with_always_escape_names(parse_bool(value));
                    customised = true;
                }
                "parseNamedParamPrefix" => {
                    builder = builder.with_parse_named_param_prefix(value);
                    customised = true;
                }
                _ => warn!(%key, "unknown config option"),
            }
        }

        if customised {
            Arc::new(builder.build())
        } else {
            Self::default_config()
        }
    }

    /// Case policy applied while parsing SQL identifiers.
    pub fn parse_name_case(&self) -> NameCase {
        self.parse_name_case
    }

    /// Case policy applied while rendering Cypher identifiers.
    pub fn render_name_case(&self) -> NameCase {
        self.render_name_case
    }

    /// Whether parser diagnostics are logged at INFO.
    pub fn diagnostic_logging(&self) -> bool {
        self.diagnostic_logging
    }

    /// Table-to-label mappings.
    pub fn table_to_label_mappings(&self) -> &HashMap<String, String> {
        &self.table_to_label_mappings
    }

    /// Join-columns-to-relationship-type mappings, keyed `"fk,pk"`.
    pub fn join_columns_to_type_mappings(&self) -> &HashMap<String, String> {
        &self.join_columns_to_type_mappings
    }

    /// The SQL grammar variant.
    pub fn sql_dialect(&self) -> SqlDialect {
        self.sql_dialect
    }

    /// Whether Cypher output is pretty-printed.
    pub fn pretty_print(&self) -> bool {
        self.pretty_print
    }

    /// Whether identifiers are always backtick-escaped. Unset means
    /// the inverse of pretty printing.
    pub fn always_escape_names(&self) -> bool {
        self.always_escape_names.unwrap_or(!self.pretty_print)
    }

    /// Prefix of named parameters in the SQL input.
    pub fn parse_named_param_prefix(&self) -> &str {
        &self.parse_named_param_prefix
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig::builder().build()
    }
}

/// Builder for [`TranslatorConfig`].
#[derive(Debug, Clone)]
pub struct TranslatorConfigBuilder {
    parse_name_case: NameCase,
    render_name_case: NameCase,
    diagnostic_logging: bool,
    table_to_label_mappings: HashMap<String, String>,
    join_columns_to_type_mappings: HashMap<String, String>,
    sql_dialect: SqlDialect,
    pretty_print: bool,
    always_escape_names: Option<bool>,
    parse_named_param_prefix: String,
}

impl Default for TranslatorConfigBuilder {
    fn default() -> Self {
        Self {
            parse_name_case: NameCase::AsIs,
            render_name_case: NameCase::AsIs,
            diagnostic_logging: false,
            table_to_label_mappings: HashMap::new(),
            join_columns_to_type_mappings: HashMap::new(),
            sql_dialect: SqlDialect::Generic,
            pretty_print: true,
            always_escape_names: None,
            parse_named_param_prefix: ":".to_string(),
        }
    }
}

impl TranslatorConfigBuilder {
    /// Case policy applied while parsing SQL.
    pub fn with_parse_name_case(mut self, case: NameCase) -> Self {
        self.parse_name_case = case;
        self
    }

    /// Case policy applied while rendering Cypher.
    pub fn with_render_name_case(mut self, case: NameCase) -> Self {
        self.render_name_case = case;
        self
    }

    /// Emit parser diagnostics at INFO.
    pub fn with_diagnostic_logging(mut self, enabled: bool) -> Self {
        self.diagnostic_logging = enabled;
        self
    }

    /// Replace the table-to-label mappings.
    pub fn with_table_to_label_mappings(mut self, mappings: HashMap<String, String>) -> Self {
        self.table_to_label_mappings = mappings;
        self
    }

    /// Replace the join-columns-to-type mappings.
    pub fn with_join_columns_to_type_mappings(
        mut self,
        mappings: HashMap<String, String>,
    ) -> Self {
        self.join_columns_to_type_mappings = mappings;
        self
    }

    /// Select the SQL grammar variant.
    pub fn with_sql_dialect(mut self, dialect: SqlDialect) -> Self {
        self.sql_dialect = dialect;
        self
    }

    /// Pretty-print the generated Cypher.
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// Force (or forbid) backtick escaping of identifiers.
    pub fn with_always_escape_names(mut self, escape: bool) -> Self {
        self.always_escape_names = Some(escape);
        self
    }

    /// Change the named-parameter prefix.
    pub fn with_parse_named_param_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parse_named_param_prefix = prefix.into();
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> TranslatorConfig {
        TranslatorConfig {
            parse_name_case: self.parse_name_case,
            render_name_case: self.render_name_case,
            diagnostic_logging: self.diagnostic_logging,
            table_to_label_mappings: self.table_to_label_mappings,
            join_columns_to_type_mappings: self.join_columns_to_type_mappings,
            sql_dialect: self.sql_dialect,
            pretty_print: self.pretty_print,
            always_escape_names: self.always_escape_names,
            parse_named_param_prefix: self.parse_named_param_prefix,
        }
    }
}

/// "table-to-label-mappings" -> "tableToLabelMappings".
fn dash_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Parse the `k1:v1;k2:v2` map syntax.
fn parse_map(value: &str) -> HashMap<String, String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (k, v) = entry.split_once(':')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}
