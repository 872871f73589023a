//! The Cypher AST.
//!
//! The rewriter produces this tree from parsed SQL; the renderer turns
//! it into query text. Keeping the tree explicit means translation
//! never splices SQL fragments into the output.

/// A complete Cypher statement.
#[derive(Debug, Clone, PartialEq)]
pub enum CypherStatement {
    /// MATCH ... [WHERE ...] RETURN ... [ORDER BY / SKIP / LIMIT]
    Query(MatchQuery),
    /// CREATE (v:Label {props}), ...
    Create(CreateStatement),
    /// MATCH (v:Label) [WHERE ...] SET v.p = e, ...
    Update(UpdateStatement),
    /// MATCH (v:Label) [WHERE ...] DELETE v
    Delete(DeleteStatement),
}

/// A read query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    /// Comma-separated path patterns of the MATCH clause
    pub patterns: Vec<PathPattern>,
    /// WHERE predicate
    pub where_clause: Option<Expr>,
    /// Whether RETURN carries DISTINCT
    pub distinct: bool,
    /// RETURN items
    pub return_items: Vec<ReturnItem>,
    /// ORDER BY items
    pub order_by: Vec<SortItem>,
    /// SKIP expression
    pub skip: Option<Expr>,
    /// LIMIT expression
    pub limit: Option<Expr>,
}

/// A CREATE over one or more node patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateStatement {
    /// Nodes to create
    pub nodes: Vec<NodePattern>,
}

/// An UPDATE lowered to MATCH + SET.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// The matched node
    pub node: NodePattern,
    /// WHERE predicate
    pub where_clause: Option<Expr>,
    /// Property assignments, in statement order
    pub assignments: Vec<(String, Expr)>,
}

/// A DELETE lowered to MATCH + DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// The matched node
    pub node: NodePattern,
    /// WHERE predicate
    pub where_clause: Option<Expr>,
}

/// A linear path: a start node plus zero or more relationship hops.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    /// First node of the path
    pub start: NodePattern,
    /// Each hop: a relationship and the node it reaches
    pub hops: Vec<(RelPattern, NodePattern)>,
}

impl PathPattern {
    /// A pattern of a single node.
    pub fn node(start: NodePattern) -> Self {
        Self {
            start,
            hops: Vec::new(),
        }
    }

    /// Variables of every node in the path, in order.
    pub fn node_variables(&self) -> Vec<&str> {
        let mut vars = vec![self.start.variable.as_str()];
        vars.extend(self.hops.iter().map(|(_, node)| node.variable.as_str()));
        vars
    }
}

/// A node pattern `(v:Label {props})`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    /// Pattern variable
    pub variable: String,
    /// Label, when known
    pub label: Option<String>,
    /// Whether the label came from an explicit table mapping; mapped
    /// labels are rendered exactly as configured, unmapped ones go
    /// through the render name case
    pub label_mapped: bool,
    /// Inline properties
    pub properties: Vec<(String, Expr)>,
}

impl NodePattern {
    /// A bare node pattern with a variable and label.
    pub fn new(variable: impl Into<String>, label: Option<String>, label_mapped: bool) -> Self {
        Self {
            variable: variable.into(),
            label,
            label_mapped,
            properties: Vec::new(),
        }
    }
}

/// A relationship pattern `-[r:TYPE]->`, always left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    /// Pattern variable
    pub variable: String,
    /// Relationship type
    pub rel_type: String,
    /// Whether the type came from an explicit join-column mapping
    pub type_mapped: bool,
}

/// One RETURN item.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    /// The returned expression
    pub expr: Expr,
    /// `AS` alias
    pub alias: Option<String>,
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    /// Sort key
    pub expr: Expr,
    /// Descending order
    pub descending: bool,
}

/// A scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `v.prop`
    Property {
        /// Pattern variable
        variable: String,
        /// Property name
        name: String,
    },
    /// A bare pattern variable
    Variable(String),
    /// `$name`
    Parameter(String),
    /// A literal value
    Literal(Literal),
    /// Prefix operator
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Expr>,
    },
    /// Infix operator
    Binary {
        /// Left operand
        left: Box<Expr>,
        /// The operator
        op: BinaryOp,
        /// Right operand
        right: Box<Expr>,
    },
    /// `x IS NULL` / `x IS NOT NULL`
    IsNull {
        /// The tested expression
        operand: Box<Expr>,
        /// IS NOT NULL when true
        negated: bool,
    },
    /// `x =~ pattern`
    Regex {
        /// The tested expression
        operand: Box<Expr>,
        /// The regex pattern
        pattern: Box<Expr>,
    },
    /// `x IN [..]`
    In {
        /// The tested expression
        operand: Box<Expr>,
        /// List members
        list: Vec<Expr>,
        /// NOT IN when true
        negated: bool,
    },
    /// `low <= x AND x <= high`
    Between {
        /// The tested expression
        operand: Box<Expr>,
        /// Lower bound
        low: Box<Expr>,
        /// Upper bound
        high: Box<Expr>,
        /// NOT BETWEEN when true
        negated: bool,
    },
    /// A function call
    FunctionCall {
        /// Function name
        name: String,
        /// Arguments; empty with `star` for `count(*)`
        args: Vec<Expr>,
        /// `f(*)`
        star: bool,
    },
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// NULL
    Null,
    /// TRUE / FALSE
    Boolean(bool),
    /// A numeric literal, kept as written
    Number(String),
    /// A string literal
    String(String),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical NOT
    Not,
    /// Arithmetic negation
    Minus,
}

/// Infix operators shared between the two languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
}

impl BinaryOp {
    /// Cypher spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    /// Binding strength, higher binds tighter. Used by the renderer to
    /// decide where parentheses are needed.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt
            | BinaryOp::GtEq => 3,
            BinaryOp::Plus | BinaryOp::Minus => 4,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_node_variables() {
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
        assert_eq!(path.node_variables(), ["p", "m"]);
    }

    #[test]
    fn operator_spellings() {
        assert_eq!(BinaryOp::NotEq.as_str(), "<>");
        assert_eq!(BinaryOp::And.as_str(), "AND");
    }

    #[test]
    fn precedence_ordering() {
        assert!(BinaryOp::Multiply.precedence() > BinaryOp::Plus.precedence());
        assert!(BinaryOp::Plus.precedence() > BinaryOp::Eq.precedence());
        assert!(BinaryOp::Eq.precedence() > BinaryOp::And.precedence());
        assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
    }
}
