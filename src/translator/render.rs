//! Cypher rendering.
//!
//! Turns the Cypher AST into query text, honouring the render name
//! case, escaping policy and pretty printing.

use super::ast::{
    CreateStatement, CypherStatement, DeleteStatement, Expr, Literal, MatchQuery, NodePattern,
    PathPattern, RelPattern, ReturnItem, SortItem, UnaryOp, UpdateStatement,
};
use super::config::TranslatorConfig;

/// Renders Cypher statements under one configuration.
pub struct CypherRenderer<'a> {
    config: &'a TranslatorConfig,
}

impl<'a> CypherRenderer<'a> {
    /// Create a renderer over the given configuration.
    pub fn new(config: &'a TranslatorConfig) -> Self {
        Self { config }
    }

    /// Render a complete statement.
    pub fn render(&self, statement: &CypherStatement) -> String {
        let clauses = match statement {
            CypherStatement::Query(query) => self.render_query(query),
            CypherStatement::Create(create) => self.render_create(create),
            CypherStatement::Update(update) => self.render_update(update),
            CypherStatement::Delete(delete) => self.render_delete(delete),
        };
        let separator = if self.config.pretty_print() { "\n" } else { " " };
        clauses.join(separator)
    }

    fn render_query(&self, query: &MatchQuery) -> Vec<String> {
        let mut clauses = Vec::new();

        let patterns: Vec<String> = query
            .patterns
            .iter()
            .map(|p| self.render_path(p))
            .collect();
        clauses.push(format!("MATCH {}", patterns.join(", ")));

        if let Some(ref predicate) = query.where_clause {
            clauses.push(format!("WHERE {}", self.render_expr(predicate)));
        }

        let items: Vec<String> = query
            .return_items
            .iter()
            .map(|item| self.render_return_item(item))
            .collect();
        let distinct = if query.distinct { "DISTINCT " } else { "" };
        clauses.push(format!("RETURN {distinct}{}", items.join(", ")));

        if !query.order_by.is_empty() {
            let keys: Vec<String> = query
                .order_by
                .iter()
                .map(|item| self.render_sort_item(item))
                .collect();
            clauses.push(format!("ORDER BY {}", keys.join(", ")));
        }
        if let Some(ref skip) = query.skip {
            clauses.push(format!("SKIP {}", self.render_expr(skip)));
        }
        if let Some(ref limit) = query.limit {
            clauses.push(format!("LIMIT {}", self.render_expr(limit)));
        }

        clauses
    }

    fn render_create(&self, create: &CreateStatement) -> Vec<String> {
        let nodes: Vec<String> = create
            .nodes
            .iter()
            .map(|node| self.render_node(node))
            .collect();
        vec![format!("CREATE {}", nodes.join(", "))]
    }

    fn render_update(&self, update: &UpdateStatement) -> Vec<String> {
        let mut clauses = vec![format!("MATCH {}", self.render_node(&update.node))];
        if let Some(ref predicate) = update.where_clause {
            clauses.push(format!("WHERE {}", self.render_expr(predicate)));
        }
        let assignments: Vec<String> = update
            .assignments
            .iter()
            .map(|(property, value)| {
                format!(
                    "{}.{} = {}",
                    update.node.variable,
                    self.ident(property, false),
                    self.render_expr(value)
                )
            })
            .collect();
        clauses.push(format!("SET {}", assignments.join(", ")));
        clauses
    }

    fn render_delete(&self, delete: &DeleteStatement) -> Vec<String> {
        let mut clauses = vec![format!("MATCH {}", self.render_node(&delete.node))];
        if let Some(ref predicate) = delete.where_clause {
            clauses.push(format!("WHERE {}", self.render_expr(predicate)));
        }
        clauses.push(format!("DELETE {}", delete.node.variable));
        clauses
    }

    fn render_path(&self, path: &PathPattern) -> String {
        let mut out = self.render_node(&path.start);
        for (rel, node) in &path.hops {
            out.push_str(&self.render_rel(rel));
            out.push_str(&self.render_node(node));
        }
        out
    }

    fn render_node(&self, node: &NodePattern) -> String {
        let mut inner = node.variable.clone();
        if let Some(ref label) = node.label {
            inner.push(':');
            inner.push_str(&self.ident(label, node.label_mapped));
        }
        if !node.properties.is_empty() {
            let props: Vec<String> = node
                .properties
                .iter()
                .map(|(name, value)| {
                    format!("{}: {}", self.ident(name, false), self.render_expr(value))
                })
                .collect();
            inner.push_str(&format!(" {{{}}}", props.join(", ")));
        }
        format!("({inner})")
    }

    fn render_rel(&self, rel: &RelPattern) -> String {
        format!(
            "-[{}:{}]->",
            rel.variable,
            self.ident(&rel.rel_type, rel.type_mapped)
        )
    }

    fn render_return_item(&self, item: &ReturnItem) -> String {
        match item.alias {
            Some(ref alias) => format!(
                "{} AS {}",
                self.render_expr(&item.expr),
                self.ident(alias, true)
            ),
            None => self.render_expr(&item.expr),
        }
    }

    fn render_sort_item(&self, item: &SortItem) -> String {
        if item.descending {
            format!("{} DESC", self.render_expr(&item.expr))
        } else {
            self.render_expr(&item.expr)
        }
    }

    /// Render an expression without outer parentheses.
    pub fn render_expr(&self, expr: &Expr) -> String {
        self.render_prec(expr, 0)
    }

    fn render_prec(&self, expr: &Expr, parent_prec: u8) -> String {
        match expr {
            Expr::Property { variable, name } => {
                format!("{variable}.{}", self.ident(name, false))
            }
            Expr::Variable(name) => name.clone(),
            Expr::Parameter(name) => format!("${name}"),
            Expr::Literal(literal) => render_literal(literal),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => format!("NOT ({})", self.render_prec(operand, 0)),
                UnaryOp::Minus => format!("-{}", self.render_prec(operand, u8::MAX)),
            },
            Expr::Binary { left, op, right } => {
                let prec = op.precedence();
                let text = format!(
                    "{} {} {}",
                    self.render_prec(left, prec),
                    op.as_str(),
                    self.render_prec(right, prec)
                );
                if prec < parent_prec {
                    format!("({text})")
                } else {
                    text
                }
            }
            Expr::IsNull { operand, negated } => {
                let text = format!(
                    "{} IS {}NULL",
                    self.render_prec(operand, u8::MAX),
                    if *negated { "NOT " } else { "" }
                );
                if parent_prec > 0 {
                    format!("({text})")
                } else {
                    text
                }
            }
            Expr::Regex { operand, pattern } => format!(
                "{} =~ {}",
                self.render_prec(operand, u8::MAX),
                self.render_prec(pattern, u8::MAX)
            ),
            Expr::In {
                operand,
                list,
                negated,
            } => {
                let members: Vec<String> =
                    list.iter().map(|e| self.render_prec(e, 0)).collect();
                let text = format!(
                    "{}{} IN [{}]",
                    if *negated { "NOT " } else { "" },
                    self.render_prec(operand, u8::MAX),
                    members.join(", ")
                );
                if parent_prec > 0 && *negated {
                    format!("({text})")
                } else {
                    text
                }
            }
            Expr::Between {
                operand,
                low,
                high,
                negated,
            } => {
                // Rendered as a range comparison.
                let x = self.render_prec(operand, u8::MAX);
                let text = format!(
                    "{} <= {x} AND {x} <= {}",
                    self.render_prec(low, u8::MAX),
                    self.render_prec(high, u8::MAX)
                );
                if *negated {
                    format!("NOT ({text})")
                } else if parent_prec > 2 {
                    format!("({text})")
                } else {
                    text
                }
            }
            Expr::FunctionCall { name, args, star } => {
                if *star {
                    format!("{name}(*)")
                } else {
                    let rendered: Vec<String> =
                        args.iter().map(|a| self.render_prec(a, 0)).collect();
                    format!("{name}({})", rendered.join(", "))
                }
            }
        }
    }

    /// Render an identifier: apply the render name case (unless the
    /// name came from an explicit mapping) and escape when required.
    fn ident(&self, name: &str, mapped: bool) -> String {
        let cased = if mapped {
            name.to_string()
        } else {
            self.config.render_name_case().apply(name)
        };
        if self.config.always_escape_names() || !is_plain_identifier(&cased) {
            format!("`{}`", cased.replace('`', "``"))
        } else {
            cased
        }
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "NULL".to_string(),
        Literal::Boolean(true) => "true".to_string(),
        Literal::Boolean(false) => "false".to_string(),
        Literal::Number(n) => n.clone(),
        Literal::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::ast::BinaryOp;
    use crate::translator::config::NameCase;

    fn plain_config() -> TranslatorConfig {
        TranslatorConfig::builder()
            .with_pretty_print(false)
            .with_always_escape_names(false)
            .build()
    }

    fn prop(variable: &str, name: &str) -> Expr {
        Expr::Property {
            variable: variable.into(),
            name: name.into(),
        }
    }

    #[test]
    fn render_simple_query() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        let query = MatchQuery {
            patterns: vec![PathPattern::node(NodePattern::new(
                "p",
                Some("Person".into()),
                false,
            ))],
            where_clause: None,
            distinct: false,
            return_items: vec![ReturnItem {
                expr: prop("p", "name"),
                alias: Some("name".into()),
            }],
            order_by: vec![],
            skip: None,
            limit: None,
        };

        assert_eq!(
            renderer.render(&CypherStatement::Query(query)),
            "MATCH (p:Person) RETURN p.name AS name"
        );
    }

    #[test]
    fn render_pretty_uses_newlines() {
        let config = TranslatorConfig::builder()
            .with_pretty_print(true)
            .with_always_escape_names(false)
            .build();
        let renderer = CypherRenderer::new(&config);

        let query = MatchQuery {
            patterns: vec![PathPattern::node(NodePattern::new(
                "p",
                Some("Person".into()),
                false,
            ))],
            where_clause: Some(Expr::Binary {
                left: Box::new(prop("p", "age")),
                op: BinaryOp::Gt,
                right: Box::new(Expr::Literal(Literal::Number("18".into()))),
            }),
            distinct: false,
            return_items: vec![ReturnItem {
                expr: Expr::Variable("p".into()),
                alias: None,
            }],
            order_by: vec![],
            skip: None,
            limit: None,
        };

        assert_eq!(
            renderer.render(&CypherStatement::Query(query)),
            "MATCH (p:Person)\nWHERE p.age > 18\nRETURN p"
        );
    }

    #[test]
    fn render_relationship_pattern() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        let path = PathPattern {
            start: NodePattern::new("p", Some("Person".into()), false),
            hops: vec![(
                RelPattern {
                    variable: "r".into(),
                    rel_type: "ACTED_IN".into(),
                    type_mapped: true,
                },
                NodePattern::new("m", Some("Movie".into()), false),
            )],
        };
        assert_eq!(
            renderer.render_path(&path),
            "(p:Person)-[r:ACTED_IN]->(m:Movie)"
        );
    }

    #[test]
    fn render_node_with_properties() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        let mut node = NodePattern::new("p", Some("Person".into()), false);
        node.properties
            .push(("name".into(), Expr::Literal(Literal::String("Ada".into()))));
        assert_eq!(renderer.render_node(&node), "(p:Person {name: 'Ada'})");
    }

    #[test]
    fn render_name_case_applies_to_unmapped_only() {
        let config = TranslatorConfig::builder()
            .with_pretty_print(false)
            .with_always_escape_names(false)
            .with_render_name_case(NameCase::Upper)
            .build();
        let renderer = CypherRenderer::new(&config);

        let unmapped = NodePattern::new("p", Some("Person".into()), false);
        assert_eq!(renderer.render_node(&unmapped), "(p:PERSON)");

        let mapped = NodePattern::new("p", Some("Person".into()), true);
        assert_eq!(renderer.render_node(&mapped), "(p:Person)");
    }

    #[test]
    fn escaping() {
        let config = TranslatorConfig::builder()
            .with_pretty_print(false)
            .with_always_escape_names(true)
            .build();
        let renderer = CypherRenderer::new(&config);
        let node = NodePattern::new("p", Some("Person".into()), false);
        assert_eq!(renderer.render_node(&node), "(p:`Person`)");

        // Non-identifier characters force escaping even when off.
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);
        let node = NodePattern::new("p", Some("Person Role".into()), false);
        assert_eq!(renderer.render_node(&node), "(p:`Person Role`)");
    }

    #[test]
    fn render_operators_and_parens() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        // (a + b) * c keeps its parentheses.
        let expr = Expr::Binary {
            left: Box::new(Expr::Binary {
                left: Box::new(prop("t", "a")),
                op: BinaryOp::Plus,
                right: Box::new(prop("t", "b")),
            }),
            op: BinaryOp::Multiply,
            right: Box::new(prop("t", "c")),
        };
        assert_eq!(renderer.render_expr(&expr), "(t.a + t.b) * t.c");

        // a = 1 AND b = 2 needs none.
        let expr = Expr::Binary {
            left: Box::new(Expr::Binary {
                left: Box::new(prop("t", "a")),
                op: BinaryOp::Eq,
                right: Box::new(Expr::Literal(Literal::Number("1".into()))),
            }),
            op: BinaryOp::And,
            right: Box::new(Expr::Binary {
                left: Box::new(prop("t", "b")),
                op: BinaryOp::Eq,
                right: Box::new(Expr::Literal(Literal::Number("2".into()))),
            }),
        };
        assert_eq!(renderer.render_expr(&expr), "t.a = 1 AND t.b = 2");
    }

    #[test]
    fn render_special_predicates() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        let expr = Expr::IsNull {
            operand: Box::new(prop("p", "name")),
            negated: false,
        };
        assert_eq!(renderer.render_expr(&expr), "p.name IS NULL");

        let expr = Expr::IsNull {
            operand: Box::new(prop("p", "name")),
            negated: true,
        };
        assert_eq!(renderer.render_expr(&expr), "p.name IS NOT NULL");

        let expr = Expr::Regex {
            operand: Box::new(prop("p", "name")),
            pattern: Box::new(Expr::Literal(Literal::String("^Ada.*$".into()))),
        };
        assert_eq!(renderer.render_expr(&expr), "p.name =~ '^Ada.*$'");

        let expr = Expr::In {
            operand: Box::new(prop("p", "age")),
            list: vec![
                Expr::Literal(Literal::Number("1".into())),
                Expr::Literal(Literal::Number("2".into())),
            ],
            negated: false,
        };
        assert_eq!(renderer.render_expr(&expr), "p.age IN [1, 2]");

        let expr = Expr::Between {
            operand: Box::new(prop("p", "age")),
            low: Box::new(Expr::Literal(Literal::Number("18".into()))),
            high: Box::new(Expr::Literal(Literal::Number("65".into()))),
            negated: false,
        };
        assert_eq!(renderer.render_expr(&expr), "18 <= p.age AND p.age <= 65");
    }

    #[test]
    fn render_parameters_and_literals() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        assert_eq!(renderer.render_expr(&Expr::Parameter("1".into())), "$1");
        assert_eq!(renderer.render_expr(&Expr::Parameter("name".into())), "$name");
        assert_eq!(
            renderer.render_expr(&Expr::Literal(Literal::String("O'Brien".into()))),
            "'O\\'Brien'"
        );
        assert_eq!(
            renderer.render_expr(&Expr::Literal(Literal::Null)),
            "NULL"
        );
        assert_eq!(
            renderer.render_expr(&Expr::Literal(Literal::Boolean(true))),
            "true"
        );
    }

    #[test]
    fn render_update_and_delete() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        let update = UpdateStatement {
            node: NodePattern::new("p", Some("Person".into()), false),
            where_clause: Some(Expr::Binary {
                left: Box::new(prop("p", "id")),
                op: BinaryOp::Eq,
                right: Box::new(Expr::Literal(Literal::Number("1".into()))),
            }),
            assignments: vec![("name".into(), Expr::Literal(Literal::String("Ada".into())))],
        };
        assert_eq!(
            renderer.render(&CypherStatement::Update(update)),
            "MATCH (p:Person) WHERE p.id = 1 SET p.name = 'Ada'"
        );

        let delete = DeleteStatement {
            node: NodePattern::new("p", Some("Person".into()), false),
            where_clause: None,
        };
        assert_eq!(
            renderer.render(&CypherStatement::Delete(delete)),
            "MATCH (p:Person) DELETE p"
        );
    }

    #[test]
    fn render_order_skip_limit() {
        let config = plain_config();
        let renderer = CypherRenderer::new(&config);

        let query = MatchQuery {
            patterns: vec![PathPattern::node(NodePattern::new(
                "p",
                Some("Person".into()),
                false,
            ))],
            where_clause: None,
            distinct: true,
            return_items: vec![ReturnItem {
                expr: prop("p", "name"),
                alias: Some("name".into()),
            }],
            order_by: vec![SortItem {
                expr: prop("p", "name"),
                descending: true,
            }],
            skip: Some(Expr::Literal(Literal::Number("5".into()))),
            limit: Some(Expr::Literal(Literal::Number("10".into()))),
        };

        assert_eq!(
            renderer.render(&CypherStatement::Query(query)),
            "MATCH (p:Person) RETURN DISTINCT p.name AS name ORDER BY p.name DESC SKIP 5 LIMIT 10"
        );
    }
}
