//! SQL AST to Cypher AST rewriting.
//!
//! The rewriter walks the parsed SQL statement and produces the Cypher
//! tree: tables become node patterns, inner joins become relationship
//! patterns, projections become RETURN items and predicates map
//! operator by operator. Anything outside the translatable subset is an
//! `Untranslatable` error naming the construct.

use sqlparser::ast as sql;

use super::ast::{
    BinaryOp, CreateStatement, CypherStatement, DeleteStatement, Expr, Literal, MatchQuery,
    NodePattern, PathPattern, RelPattern, ReturnItem, SortItem, UnaryOp, UpdateStatement,
};
use super::config::TranslatorConfig;
use super::TranslationError;

type Result<T> = std::result::Result<T, TranslationError>;

fn untranslatable(construct: impl Into<String>) -> TranslationError {
    TranslationError::Untranslatable(construct.into())
}

/// One table bound into the pattern scope.
#[derive(Debug, Clone)]
struct TableBinding {
    variable: String,
    table: String,
    alias: Option<String>,
}

impl TableBinding {
    fn answers_to(&self, qualifier: &str) -> bool {
        self.alias.as_deref() == Some(qualifier) || self.table == qualifier
    }
}

/// Rewrites one SQL statement into a Cypher statement.
pub struct SqlRewriter<'a> {
    config: &'a TranslatorConfig,
    scope: Vec<TableBinding>,
    positional: u32,
}

impl<'a> SqlRewriter<'a> {
    /// Create a rewriter over the given configuration.
    pub fn new(config: &'a TranslatorConfig) -> Self {
        Self {
            config,
            scope: Vec::new(),
            positional: 0,
        }
    }

    /// Rewrite a parsed statement.
    pub fn rewrite(&mut self, statement: &sql::Statement) -> Result<CypherStatement> {
        match statement {
            sql::Statement::Query(query) => self.rewrite_query(query).map(CypherStatement::Query),
            sql::Statement::Insert {
                table_name,
                columns,
                source,
                ..
            } => self
                .rewrite_insert(table_name, columns, source.as_deref())
                .map(CypherStatement::Create),
            sql::Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => self
                .rewrite_update(table, assignments, selection.as_ref())
                .map(CypherStatement::Update),
            sql::Statement::Delete {
                tables,
                from,
                using,
                selection,
                ..
            } => {
                let from_tables: &[sql::TableWithJoins] = match from {
                    sql::FromTable::WithFromKeyword(t) => t,
                    sql::FromTable::WithoutKeyword(t) => t,
                };
                self.rewrite_delete(tables, from_tables, using.is_some(), selection.as_ref())
                    .map(CypherStatement::Delete)
            }
            other => Err(untranslatable(statement_name(other))),
        }
    }

    // ------------------------------------------------------------------
    // SELECT
    // ------------------------------------------------------------------

    fn rewrite_query(&mut self, query: &sql::Query) -> Result<MatchQuery> {
        if query.with.is_some() {
            return Err(untranslatable("WITH common table expressions"));
        }
        if !query.limit_by.is_empty() {
            return Err(untranslatable("LIMIT BY"));
        }
        if query.fetch.is_some() {
            return Err(untranslatable("FETCH"));
        }

        let select = match query.body.as_ref() {
            sql::SetExpr::Select(select) => select,
            sql::SetExpr::SetOperation { .. } => {
                return Err(untranslatable("set operations (UNION/INTERSECT/EXCEPT)"))
            }
            other => return Err(untranslatable(format!("query body {other}"))),
        };

        let mut base = self.rewrite_select(select)?;

        base.order_by = query
            .order_by
            .iter()
            .map(|item| self.rewrite_order_by(item))
            .collect::<Result<Vec<_>>>()?;
        base.limit = query
            .limit
            .as_ref()
            .map(|e| self.rewrite_expr(e))
            .transpose()?;
        base.skip = query
            .offset
            .as_ref()
            .map(|offset| self.rewrite_expr(&offset.value))
            .transpose()?;

        Ok(base)
    }

    fn rewrite_select(&mut self, select: &sql::Select) -> Result<MatchQuery> {
        if select.top.is_some() {
            return Err(untranslatable("TOP"));
        }
        if select.having.is_some() {
            return Err(untranslatable("HAVING"));
        }
        match &select.group_by {
            sql::GroupByExpr::Expressions(exprs) if exprs.is_empty() => {}
            _ => return Err(untranslatable("GROUP BY")),
        }
        if !select.lateral_views.is_empty() {
            return Err(untranslatable("LATERAL VIEW"));
        }
        let distinct = match &select.distinct {
            None => false,
            Some(sql::Distinct::Distinct) => true,
            Some(sql::Distinct::On(_)) => return Err(untranslatable("DISTINCT ON")),
        };
        if select.from.is_empty() {
            return Err(untranslatable("SELECT without FROM"));
        }

        let mut patterns = Vec::with_capacity(select.from.len());
        for table_with_joins in &select.from {
            patterns.push(self.rewrite_table_with_joins(table_with_joins)?);
        }

        let where_clause = select
            .selection
            .as_ref()
            .map(|e| self.rewrite_expr(e))
            .transpose()?;

        let mut return_items = Vec::new();
        for item in &select.projection {
            self.rewrite_select_item(item, &mut return_items)?;
        }

        Ok(MatchQuery {
            patterns,
            where_clause,
            distinct,
            return_items,
            order_by: Vec::new(),
            skip: None,
            limit: None,
        })
    }

    fn rewrite_table_with_joins(&mut self, source: &sql::TableWithJoins) -> Result<PathPattern> {
        let start = self.bind_table(&source.relation)?;
        let mut path = PathPattern::node(start);
        let mut rel_count = 0usize;

        for join in &source.joins {
            let constraint = match &join.join_operator {
                sql::JoinOperator::Inner(constraint) => constraint,
                other => {
                    return Err(untranslatable(format!(
                        "join type {}",
                        join_operator_name(other)
                    )))
                }
            };
            let on = match constraint {
                sql::JoinConstraint::On(expr) => expr,
                sql::JoinConstraint::Using(_) => return Err(untranslatable("JOIN USING")),
                sql::JoinConstraint::Natural => return Err(untranslatable("NATURAL JOIN")),
                sql::JoinConstraint::None => return Err(untranslatable("JOIN without ON")),
            };

            let node = self.bind_table(&join.relation)?;
            let (fk_column, pk_column) = self.join_columns(on, &path, &node)?;

            rel_count += 1;
            let variable = if rel_count == 1 {
                "r".to_string()
            } else {
                format!("r{rel_count}")
            };
            let (rel_type, type_mapped) = self.rel_type_for(&fk_column, &pk_column);

            path.hops.push((
                RelPattern {
                    variable,
                    rel_type,
                    type_mapped,
                },
                node,
            ));
        }

        Ok(path)
    }

    /// Pull the (fk, pk) column pair out of an ON equality. The foreign
    /// key side must belong to the node the hop leaves (the last node
    /// of the path so far), the primary key side to the joined table.
    fn join_columns(
        &self,
        on: &sql::Expr,
        path: &PathPattern,
        joined: &NodePattern,
    ) -> Result<(String, String)> {
        let (left, right) = match on {
            sql::Expr::BinaryOp {
                left,
                op: sql::BinaryOperator::Eq,
                right,
            } => (left.as_ref(), right.as_ref()),
            sql::Expr::Nested(inner) => return self.join_columns(inner, path, joined),
            _ => return Err(untranslatable("JOIN ON without a single equality")),
        };

        let (left_var, left_col) = self.qualified_column(left)?;
        let (right_var, right_col) = self.qualified_column(right)?;

        let tail = path
            .node_variables()
            .last()
            .map(|v| v.to_string())
            .unwrap_or_default();

        if left_var == tail && right_var == joined.variable {
            Ok((left_col, right_col))
        } else if right_var == tail && left_var == joined.variable {
            Ok((right_col, left_col))
        } else {
            Err(untranslatable(
                "JOIN ON columns must connect the joined table to the preceding one",
            ))
        }
    }

    fn qualified_column(&self, expr: &sql::Expr) -> Result<(String, String)> {
        match expr {
            sql::Expr::CompoundIdentifier(parts) if parts.len() == 2 => {
                let qualifier = self.ident(&parts[0]);
                let column = self.ident(&parts[1]);
                let binding = self
                    .scope
                    .iter()
                    .find(|b| b.answers_to(&qualifier))
                    .ok_or_else(|| {
                        untranslatable(format!("unknown table qualifier '{qualifier}'"))
                    })?;
                Ok((binding.variable.clone(), column))
            }
            _ => Err(untranslatable("JOIN ON side is not a qualified column")),
        }
    }

    fn bind_table(&mut self, relation: &sql::TableFactor) -> Result<NodePattern> {
        match relation {
            sql::TableFactor::Table { name, alias, .. } => {
                let table = self.object_name(name)?;
                let alias = alias.as_ref().map(|a| self.ident(&a.name));
                let variable = self.derive_variable(alias.as_deref(), &table);
                self.scope.push(TableBinding {
                    variable: variable.clone(),
                    table: table.clone(),
                    alias,
                });
                let (label, label_mapped) = self.label_for(&table);
                Ok(NodePattern::new(variable, Some(label), label_mapped))
            }
            sql::TableFactor::Derived { .. } => Err(untranslatable("derived table (subquery)")),
            other => Err(untranslatable(format!("table factor {other}"))),
        }
    }

    fn rewrite_select_item(
        &mut self,
        item: &sql::SelectItem,
        out: &mut Vec<ReturnItem>,
    ) -> Result<()> {
        match item {
            sql::SelectItem::UnnamedExpr(expr) => {
                let alias = column_alias(expr).map(|ident| self.ident(ident));
                let expr = self.rewrite_expr(expr)?;
                out.push(ReturnItem { expr, alias });
            }
            sql::SelectItem::ExprWithAlias { expr, alias } => {
                let expr = self.rewrite_expr(expr)?;
                out.push(ReturnItem {
                    expr,
                    alias: Some(alias.value.clone()),
                });
            }
            sql::SelectItem::Wildcard(_) => {
                // `*` expands to every pattern variable.
                for binding in &self.scope {
                    out.push(ReturnItem {
                        expr: Expr::Variable(binding.variable.clone()),
                        alias: None,
                    });
                }
            }
            sql::SelectItem::QualifiedWildcard(name, _) => {
                let qualifier = self.object_name(name)?;
                let binding = self
                    .scope
                    .iter()
                    .find(|b| b.answers_to(&qualifier))
                    .ok_or_else(|| {
                        untranslatable(format!("unknown table qualifier '{qualifier}'"))
                    })?;
                out.push(ReturnItem {
                    expr: Expr::Variable(binding.variable.clone()),
                    alias: None,
                });
            }
        }
        Ok(())
    }

    fn rewrite_order_by(&mut self, item: &sql::OrderByExpr) -> Result<SortItem> {
        Ok(SortItem {
            expr: self.rewrite_expr(&item.expr)?,
            descending: item.asc == Some(false),
        })
    }

    // ------------------------------------------------------------------
    // INSERT / UPDATE / DELETE
    // ------------------------------------------------------------------

    fn rewrite_insert(
        &mut self,
        table_name: &sql::ObjectName,
        columns: &[sql::Ident],
        source: Option<&sql::Query>,
    ) -> Result<CreateStatement> {
        let table = self.object_name(table_name)?;
        let (label, label_mapped) = self.label_for(&table);

        if columns.is_empty() {
            return Err(untranslatable("INSERT without a column list"));
        }
        let source = source.ok_or_else(|| untranslatable("INSERT without VALUES"))?;
        let rows = match source.body.as_ref() {
            sql::SetExpr::Values(values) => &values.rows,
            _ => return Err(untranslatable("INSERT from a query")),
        };

        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != columns.len() {
                return Err(untranslatable(format!(
                    "INSERT row has {} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            let variable = self.derive_variable(None, &table);
            self.scope.push(TableBinding {
                variable: variable.clone(),
                table: table.clone(),
                alias: None,
            });

            let mut node = NodePattern::new(variable, Some(label.clone()), label_mapped);
            for (column, value) in columns.iter().zip(row) {
                node.properties
                    .push((self.ident(column), self.rewrite_expr(value)?));
            }
            nodes.push(node);
        }

        Ok(CreateStatement { nodes })
    }

    fn rewrite_update(
        &mut self,
        table: &sql::TableWithJoins,
        assignments: &[sql::Assignment],
        selection: Option<&sql::Expr>,
    ) -> Result<UpdateStatement> {
        if !table.joins.is_empty() {
            return Err(untranslatable("UPDATE with JOIN"));
        }
        let node = self.bind_table(&table.relation)?;

        let where_clause = selection.map(|e| self.rewrite_expr(e)).transpose()?;

        let mut rewritten = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let property = match assignment.id.as_slice() {
                [column] => self.ident(column),
                [qualifier, column] => {
                    let qualifier = self.ident(qualifier);
                    if !self
                        .scope
                        .iter()
                        .any(|binding| binding.answers_to(&qualifier))
                    {
                        return Err(untranslatable(format!(
                            "SET on unknown table '{qualifier}'"
                        )));
                    }
                    self.ident(column)
                }
                _ => return Err(untranslatable("SET target with more than two parts")),
            };
            rewritten.push((property, self.rewrite_expr(&assignment.value)?));
        }

        Ok(UpdateStatement {
            node,
            where_clause,
            assignments: rewritten,
        })
    }

    fn rewrite_delete(
        &mut self,
        tables: &[sql::ObjectName],
        from: &[sql::TableWithJoins],
        has_using: bool,
        selection: Option<&sql::Expr>,
    ) -> Result<DeleteStatement> {
        if !tables.is_empty() {
            return Err(untranslatable("multi-table DELETE"));
        }
        if has_using {
            return Err(untranslatable("DELETE USING"));
        }
        let [table] = from else {
            return Err(untranslatable("DELETE from several tables"));
        };
        if !table.joins.is_empty() {
            return Err(untranslatable("DELETE with JOIN"));
        }

        let node = self.bind_table(&table.relation)?;
        let where_clause = selection.map(|e| self.rewrite_expr(e)).transpose()?;

        Ok(DeleteStatement { node, where_clause })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn rewrite_expr(&mut self, expr: &sql::Expr) -> Result<Expr> {
        match expr {
            sql::Expr::Identifier(ident) => self.column(None, ident),
            sql::Expr::CompoundIdentifier(parts) if parts.len() == 2 => {
                self.column(Some(&parts[0]), &parts[1])
            }
            sql::Expr::CompoundIdentifier(_) => {
                Err(untranslatable("column reference with more than two parts"))
            }
            sql::Expr::Value(value) => self.literal(value),
            sql::Expr::Nested(inner) => self.rewrite_expr(inner),
            sql::Expr::BinaryOp { left, op, right } => {
                let op = binary_op(op)?;
                Ok(Expr::Binary {
                    left: Box::new(self.rewrite_expr(left)?),
                    op,
                    right: Box::new(self.rewrite_expr(right)?),
                })
            }
            sql::Expr::UnaryOp { op, expr } => match op {
                sql::UnaryOperator::Not => Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(self.rewrite_expr(expr)?),
                }),
                sql::UnaryOperator::Minus => Ok(Expr::Unary {
                    op: UnaryOp::Minus,
                    operand: Box::new(self.rewrite_expr(expr)?),
                }),
                sql::UnaryOperator::Plus => self.rewrite_expr(expr),
                other => Err(untranslatable(format!("unary operator {other}"))),
            },
            sql::Expr::IsNull(operand) => Ok(Expr::IsNull {
                operand: Box::new(self.rewrite_expr(operand)?),
                negated: false,
            }),
            sql::Expr::IsNotNull(operand) => Ok(Expr::IsNull {
                operand: Box::new(self.rewrite_expr(operand)?),
                negated: true,
            }),
            sql::Expr::Between {
                expr,
                negated,
                low,
                high,
            } => Ok(Expr::Between {
                operand: Box::new(self.rewrite_expr(expr)?),
                low: Box::new(self.rewrite_expr(low)?),
                high: Box::new(self.rewrite_expr(high)?),
                negated: *negated,
            }),
            sql::Expr::InList {
                expr,
                list,
                negated,
            } => Ok(Expr::In {
                operand: Box::new(self.rewrite_expr(expr)?),
                list: list
                    .iter()
                    .map(|e| self.rewrite_expr(e))
                    .collect::<Result<Vec<_>>>()?,
                negated: *negated,
            }),
            sql::Expr::InSubquery { .. } => Err(untranslatable("IN (subquery)")),
            sql::Expr::Like {
                negated,
                expr,
                pattern,
                escape_char,
                ..
            } => self.rewrite_like(expr, pattern, *negated, escape_char.is_some()),
            sql::Expr::Function(function) => self.rewrite_function(function),
            sql::Expr::Subquery(_) => Err(untranslatable("scalar subquery")),
            sql::Expr::Exists { .. } => Err(untranslatable("EXISTS")),
            sql::Expr::Case { .. } => Err(untranslatable("CASE")),
            other => Err(untranslatable(format!("expression {other}"))),
        }
    }

    /// `x LIKE 'p%'` becomes `x =~ '^p.*$'`: the pattern is converted
    /// into an anchored regex. Only literal patterns can be converted.
    fn rewrite_like(
        &mut self,
        expr: &sql::Expr,
        pattern: &sql::Expr,
        negated: bool,
        has_escape: bool,
    ) -> Result<Expr> {
        if has_escape {
            return Err(untranslatable("LIKE with ESCAPE"));
        }
        let pattern = match pattern {
            sql::Expr::Value(sql::Value::SingleQuotedString(s))
            | sql::Expr::Value(sql::Value::DoubleQuotedString(s)) => like_pattern_to_regex(s),
            _ => return Err(untranslatable("LIKE with a non-literal pattern")),
        };
        let regex = Expr::Regex {
            operand: Box::new(self.rewrite_expr(expr)?),
            pattern: Box::new(Expr::Literal(Literal::String(pattern))),
        };
        if negated {
            Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(regex),
            })
        } else {
            Ok(regex)
        }
    }

    fn rewrite_function(&mut self, function: &sql::Function) -> Result<Expr> {
        if function.distinct {
            return Err(untranslatable("DISTINCT aggregate"));
        }
        if function.over.is_some() {
            return Err(untranslatable("window function"));
        }

        let name = function
            .name
            .0
            .iter()
            .map(|ident| ident.value.clone())
            .collect::<Vec<_>>()
            .join(".");

        let mut args = Vec::with_capacity(function.args.len());
        let mut star = false;
        for arg in &function.args {
            match arg {
                sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Expr(e)) => {
                    args.push(self.rewrite_expr(e)?)
                }
                sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Wildcard) => star = true,
                _ => return Err(untranslatable(format!("argument of {name}"))),
            }
        }
        if star && !args.is_empty() {
            return Err(untranslatable(format!("mixed arguments of {name}")));
        }

        Ok(Expr::FunctionCall { name, args, star })
    }

    fn column(&mut self, qualifier: Option<&sql::Ident>, column: &sql::Ident) -> Result<Expr> {
        let name = self.ident(column);
        match qualifier {
            Some(qualifier) => {
                let qualifier = self.ident(qualifier);
                let binding = self
                    .scope
                    .iter()
                    .find(|b| b.answers_to(&qualifier))
                    .ok_or_else(|| {
                        untranslatable(format!("unknown table qualifier '{qualifier}'"))
                    })?;
                Ok(Expr::Property {
                    variable: binding.variable.clone(),
                    name,
                })
            }
            None => match self.scope.as_slice() {
                [single] => Ok(Expr::Property {
                    variable: single.variable.clone(),
                    name,
                }),
                [] => Err(untranslatable(format!(
                    "column '{name}' outside a table scope"
                ))),
                _ => Err(untranslatable(format!(
                    "unqualified column '{name}' with several tables in scope"
                ))),
            },
        }
    }

    fn literal(&mut self, value: &sql::Value) -> Result<Expr> {
        match value {
            sql::Value::Number(n, _) => Ok(Expr::Literal(Literal::Number(n.clone()))),
            sql::Value::SingleQuotedString(s) | sql::Value::DoubleQuotedString(s) => {
                Ok(Expr::Literal(Literal::String(s.clone())))
            }
            sql::Value::Boolean(b) => Ok(Expr::Literal(Literal::Boolean(*b))),
            sql::Value::Null => Ok(Expr::Literal(Literal::Null)),
            sql::Value::Placeholder(marker) => Ok(self.placeholder(marker)),
            other => Err(untranslatable(format!("literal {other}"))),
        }
    }

    /// `?` placeholders number themselves `$1, $2, ...`; named
    /// placeholders keep their name.
    fn placeholder(&mut self, marker: &str) -> Expr {
        if marker == "?" {
            self.positional += 1;
            return Expr::Parameter(self.positional.to_string());
        }
        if let Some(rest) = marker.strip_prefix('?') {
            // SQLite-style ?NNN keeps its explicit number.
            return Expr::Parameter(rest.to_string());
        }
        if let Some(rest) = marker.strip_prefix('$') {
            return Expr::Parameter(rest.to_string());
        }
        let prefix = self.config.parse_named_param_prefix();
        if let Some(rest) = marker.strip_prefix(prefix) {
            return Expr::Parameter(rest.to_string());
        }
        Expr::Parameter(marker.to_string())
    }

    // ------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------

    /// Identifier text with the parse name case applied. Quoted
    /// identifiers keep their exact spelling.
    fn ident(&self, ident: &sql::Ident) -> String {
        if ident.quote_style.is_some() {
            ident.value.clone()
        } else {
            self.config.parse_name_case().apply(&ident.value)
        }
    }

    fn object_name(&self, name: &sql::ObjectName) -> Result<String> {
        match name.0.as_slice() {
            [single] => Ok(self.ident(single)),
            _ => Err(untranslatable(format!(
                "qualified table name {name}"
            ))),
        }
    }

    /// Label for a table: the configured mapping wins, else the table
    /// name itself (re-cased later by the renderer).
    fn label_for(&self, table: &str) -> (String, bool) {
        match self.config.table_to_label_mappings().get(table) {
            Some(label) => (label.clone(), true),
            None => (table.to_string(), false),
        }
    }

    /// Relationship type for a join: the `"fk,pk"` mapping wins, else
    /// the upper-cased foreign-key column with a trailing `_ID`
    /// stripped.
    fn rel_type_for(&self, fk_column: &str, pk_column: &str) -> (String, bool) {
        let key = format!("{fk_column},{pk_column}");
        if let Some(mapped) = self.config.join_columns_to_type_mappings().get(&key) {
            return (mapped.clone(), true);
        }
        let upper = fk_column.to_uppercase();
        let derived = upper.strip_suffix("_ID").unwrap_or(&upper).to_string();
        (derived, false)
    }

    /// Pattern variable for a table: its alias when present, else the
    /// lower-cased first letter of the table name, deduplicated.
    fn derive_variable(&self, alias: Option<&str>, table: &str) -> String {
        if let Some(alias) = alias {
            return alias.to_string();
        }
        let seed: String = table
            .chars()
            .next()
            .map(|c| c.to_lowercase().to_string())
            .unwrap_or_else(|| "t".to_string());

        if !self.scope.iter().any(|b| b.variable == seed) {
            return seed;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{seed}{n}");
            if !self.scope.iter().any(|b| b.variable == candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// The column a bare projection item refers to, for its implicit alias.
fn column_alias(expr: &sql::Expr) -> Option<&sql::Ident> {
    match expr {
        sql::Expr::Identifier(ident) => Some(ident),
        sql::Expr::CompoundIdentifier(parts) => parts.last(),
        _ => None,
    }
}

fn binary_op(op: &sql::BinaryOperator) -> Result<BinaryOp> {
    Ok(match op {
        sql::BinaryOperator::Eq => BinaryOp::Eq,
        sql::BinaryOperator::NotEq => BinaryOp::NotEq,
        sql::BinaryOperator::Lt => BinaryOp::Lt,
        sql::BinaryOperator::LtEq => BinaryOp::LtEq,
        sql::BinaryOperator::Gt => BinaryOp::Gt,
        sql::BinaryOperator::GtEq => BinaryOp::GtEq,
        sql::BinaryOperator::Plus => BinaryOp::Plus,
        sql::BinaryOperator::Minus => BinaryOp::Minus,
        sql::BinaryOperator::Multiply => BinaryOp::Multiply,
        sql::BinaryOperator::Divide => BinaryOp::Divide,
        sql::BinaryOperator::Modulo => BinaryOp::Modulo,
        sql::BinaryOperator::And => BinaryOp::And,
        sql::BinaryOperator::Or => BinaryOp::Or,
        other => return Err(untranslatable(format!("operator {other}"))),
    })
}

/// Convert a LIKE pattern into an anchored regex: `%` matches any run,
/// `_` any single character, everything else literally.
fn like_pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            c if "\\.^$|?*+()[]{}".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
    }
    regex.push('$');
    regex
}

fn statement_name(statement: &sql::Statement) -> String {
    let text = statement.to_string();
    let head: String = text.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
    format!("statement {head}")
}

fn join_operator_name(op: &sql::JoinOperator) -> &'static str {
    match op {
        sql::JoinOperator::Inner(_) => "INNER",
        sql::JoinOperator::LeftOuter(_) => "LEFT OUTER",
        sql::JoinOperator::RightOuter(_) => "RIGHT OUTER",
        sql::JoinOperator::FullOuter(_) => "FULL OUTER",
        sql::JoinOperator::CrossJoin => "CROSS",
        _ => "unsupported",
    }
}
