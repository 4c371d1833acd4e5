// AST (Abstract Syntax Tree) definitions for the Lua parser

/// Source span of a node: 1-based byte offsets, both ends inclusive.
///
/// `end_pos` is the last byte of the node's last token; trailing whitespace
/// and comments never belong to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub pos: usize,
    pub end_pos: usize,
}

impl Span {
    pub fn new(pos: usize, end_pos: usize) -> Self {
        Self { pos, end_pos }
    }

    /// Single-byte span at `pos`.
    pub fn point(pos: usize) -> Self {
        Self { pos, end_pos: pos }
    }

    /// Span from the start of `first` to the end of `last`.
    pub fn between(first: Span, last: Span) -> Self {
        Self {
            pos: first.pos,
            end_pos: last.end_pos,
        }
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.pos <= other.pos && other.end_pos <= self.end_pos
    }
}

/// Numeric literal value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

/// Binary operators, loosest tier first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Logical
    Or,
    And,
    // Relational
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Bitwise
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    // String
    Concat,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
}

impl BinOp {
    /// Operator as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::Ne => "~=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::BitOr => "|",
            BinOp::BitXor => "~",
            BinOp::BitAnd => "&",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Concat => "..",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::IDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,    // not x
    Neg,    // -x
    Len,    // #x
    BitNot, // ~x
}

impl UnOp {
    /// Operator as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Not => "not",
            UnOp::Neg => "-",
            UnOp::Len => "#",
            UnOp::BitNot => "~",
        }
    }
}

/// AST nodes representing blocks, statements and expressions
///
/// Lists (`NameList`, `VarList`, `ExpList`) are nodes of their own so that
/// assignments and declarations keep one list level per side.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    // Blocks
    Block {
        stats: Vec<AstNode>,
        span: Span,
    },
    Do {
        body: Box<AstNode>,
        span: Span,
    },

    // Control flow
    If {
        /// `(condition, block)` for the `if` part and each `elseif`.
        branches: Vec<(AstNode, AstNode)>,
        else_branch: Option<Box<AstNode>>,
        span: Span,
    },
    While {
        condition: Box<AstNode>,
        body: Box<AstNode>,
        span: Span,
    },
    Repeat {
        body: Box<AstNode>,
        condition: Box<AstNode>,
        span: Span,
    },
    Fornum {
        var: Box<AstNode>,
        start: Box<AstNode>,
        limit: Box<AstNode>,
        step: Option<Box<AstNode>>,
        body: Box<AstNode>,
        span: Span,
    },
    Forin {
        names: Box<AstNode>,
        exprs: Box<AstNode>,
        body: Box<AstNode>,
        span: Span,
    },

    // Declarations and assignment
    Local {
        names: Box<AstNode>,
        /// Always an `ExpList`; empty when there is no initializer.
        exprs: Box<AstNode>,
        span: Span,
    },
    Localrec {
        names: Box<AstNode>,
        exprs: Box<AstNode>,
        span: Span,
    },
    Set {
        targets: Box<AstNode>,
        values: Box<AstNode>,
        span: Span,
    },

    // Jumps
    Label {
        name: String,
        span: Span,
    },
    Goto {
        label: String,
        span: Span,
    },
    Break {
        span: Span,
    },
    Return {
        exprs: Vec<AstNode>,
        span: Span,
    },

    // Lists
    NameList {
        names: Vec<AstNode>,
        span: Span,
    },
    VarList {
        vars: Vec<AstNode>,
        span: Span,
    },
    ExpList {
        exprs: Vec<AstNode>,
        span: Span,
    },

    // Expressions
    Id {
        name: String,
        span: Span,
    },
    StringLiteral {
        value: Vec<u8>,
        span: Span,
    },
    NumberLiteral {
        value: Number,
        span: Span,
    },
    BooleanLiteral {
        value: bool,
        span: Span,
    },
    Nil {
        span: Span,
    },
    Dots {
        span: Span,
    },
    Table {
        fields: Vec<AstNode>,
        span: Span,
    },
    Pair {
        key: Box<AstNode>,
        value: Box<AstNode>,
        span: Span,
    },
    Function {
        params: Vec<AstNode>,
        body: Box<AstNode>,
        is_method: bool,
        span: Span,
    },
    Call {
        func: Box<AstNode>,
        args: Vec<AstNode>,
        span: Span,
    },
    Invoke {
        object: Box<AstNode>,
        method: Box<AstNode>,
        args: Vec<AstNode>,
        span: Span,
    },
    Index {
        object: Box<AstNode>,
        key: Box<AstNode>,
        span: Span,
    },
    Paren {
        expr: Box<AstNode>,
        span: Span,
    },
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        span: Span,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        span: Span,
    },
}

impl AstNode {
    /// Get the source span of this node
    pub fn span(&self) -> Span {
        match self {
            AstNode::Block { span, .. }
            | AstNode::Do { span, .. }
            | AstNode::If { span, .. }
            | AstNode::While { span, .. }
            | AstNode::Repeat { span, .. }
            | AstNode::Fornum { span, .. }
            | AstNode::Forin { span, .. }
            | AstNode::Local { span, .. }
            | AstNode::Localrec { span, .. }
            | AstNode::Set { span, .. }
            | AstNode::Label { span, .. }
            | AstNode::Goto { span, .. }
            | AstNode::Break { span }
            | AstNode::Return { span, .. }
            | AstNode::NameList { span, .. }
            | AstNode::VarList { span, .. }
            | AstNode::ExpList { span, .. }
            | AstNode::Id { span, .. }
            | AstNode::StringLiteral { span, .. }
            | AstNode::NumberLiteral { span, .. }
            | AstNode::BooleanLiteral { span, .. }
            | AstNode::Nil { span }
            | AstNode::Dots { span }
            | AstNode::Table { span, .. }
            | AstNode::Pair { span, .. }
            | AstNode::Function { span, .. }
            | AstNode::Call { span, .. }
            | AstNode::Invoke { span, .. }
            | AstNode::Index { span, .. }
            | AstNode::Paren { span, .. }
            | AstNode::BinaryOp { span, .. }
            | AstNode::UnaryOp { span, .. } => *span,
        }
    }

    /// Tag name of the node, e.g. `"Block"` or `"Op"`.
    pub fn tag(&self) -> &'static str {
        match self {
            AstNode::Block { .. } => "Block",
            AstNode::Do { .. } => "Do",
            AstNode::If { .. } => "If",
            AstNode::While { .. } => "While",
            AstNode::Repeat { .. } => "Repeat",
            AstNode::Fornum { .. } => "Fornum",
            AstNode::Forin { .. } => "Forin",
            AstNode::Local { .. } => "Local",
            AstNode::Localrec { .. } => "Localrec",
            AstNode::Set { .. } => "Set",
            AstNode::Label { .. } => "Label",
            AstNode::Goto { .. } => "Goto",
            AstNode::Break { .. } => "Break",
            AstNode::Return { .. } => "Return",
            AstNode::NameList { .. } => "NameList",
            AstNode::VarList { .. } => "VarList",
            AstNode::ExpList { .. } => "ExpList",
            AstNode::Id { .. } => "Id",
            AstNode::StringLiteral { .. } => "String",
            AstNode::NumberLiteral { .. } => "Number",
            AstNode::BooleanLiteral { .. } => "Boolean",
            AstNode::Nil { .. } => "Nil",
            AstNode::Dots { .. } => "Dots",
            AstNode::Table { .. } => "Table",
            AstNode::Pair { .. } => "Pair",
            AstNode::Function { .. } => "Function",
            AstNode::Call { .. } => "Call",
            AstNode::Invoke { .. } => "Invoke",
            AstNode::Index { .. } => "Index",
            AstNode::Paren { .. } => "Paren",
            AstNode::BinaryOp { .. } | AstNode::UnaryOp { .. } => "Op",
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&AstNode> {
        match self {
            AstNode::Block { stats, .. } => stats.iter().collect(),
            AstNode::Do { body, .. } => vec![body.as_ref()],
            AstNode::If {
                branches,
                else_branch,
                ..
            } => {
                let mut children = Vec::with_capacity(branches.len() * 2 + 1);
                for (condition, block) in branches {
                    children.push(condition);
                    children.push(block);
                }
                children.extend(else_branch.as_deref());
                children
            }
            AstNode::While {
                condition, body, ..
            } => vec![condition.as_ref(), body.as_ref()],
            AstNode::Repeat {
                body, condition, ..
            } => vec![body.as_ref(), condition.as_ref()],
            AstNode::Fornum {
                var,
                start,
                limit,
                step,
                body,
                ..
            } => {
                let mut children = vec![var.as_ref(), start.as_ref(), limit.as_ref()];
                children.extend(step.as_deref());
                children.push(body.as_ref());
                children
            }
            AstNode::Forin {
                names, exprs, body, ..
            } => vec![names.as_ref(), exprs.as_ref(), body.as_ref()],
            AstNode::Local { names, exprs, .. } | AstNode::Localrec { names, exprs, .. } => {
                vec![names.as_ref(), exprs.as_ref()]
            }
            AstNode::Set {
                targets, values, ..
            } => vec![targets.as_ref(), values.as_ref()],
            AstNode::Return { exprs, .. }
            | AstNode::ExpList { exprs, .. } => exprs.iter().collect(),
            AstNode::NameList { names, .. } => names.iter().collect(),
            AstNode::VarList { vars, .. } => vars.iter().collect(),
            AstNode::Table { fields, .. } => fields.iter().collect(),
            AstNode::Pair { key, value, .. } => vec![key.as_ref(), value.as_ref()],
            AstNode::Function { params, body, .. } => {
                let mut children: Vec<&AstNode> = params.iter().collect();
                children.push(body.as_ref());
                children
            }
            AstNode::Call { func, args, .. } => {
                let mut children = vec![func.as_ref()];
                children.extend(args.iter());
                children
            }
            AstNode::Invoke {
                object,
                method,
                args,
                ..
            } => {
                let mut children = vec![object.as_ref(), method.as_ref()];
                children.extend(args.iter());
                children
            }
            AstNode::Index { object, key, .. } => vec![object.as_ref(), key.as_ref()],
            AstNode::Paren { expr, .. } => vec![expr.as_ref()],
            AstNode::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            AstNode::UnaryOp { operand, .. } => vec![operand.as_ref()],
            AstNode::Label { .. }
            | AstNode::Goto { .. }
            | AstNode::Break { .. }
            | AstNode::Id { .. }
            | AstNode::StringLiteral { .. }
            | AstNode::NumberLiteral { .. }
            | AstNode::BooleanLiteral { .. }
            | AstNode::Nil { .. }
            | AstNode::Dots { .. } => Vec::new(),
        }
    }

    /// Pre-order walk over this node and all of its descendants.
    ///
    /// Uses an explicit stack: a left-leaning operator or suffix chain is as
    /// deep as it is long.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a AstNode)) {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            visit(node);
            pending.extend(node.children().into_iter().rev());
        }
    }

    /// Operator text for `Op` nodes.
    pub fn operator(&self) -> Option<&'static str> {
        match self {
            AstNode::BinaryOp { op, .. } => Some(op.symbol()),
            AstNode::UnaryOp { op, .. } => Some(op.symbol()),
            _ => None,
        }
    }

    /// Name of an `Id` node.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            AstNode::Id { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Subtrees are released from an explicit stack instead of recursively.
impl Drop for AstNode {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

impl AstNode {
    fn is_leaf(&self) -> bool {
        matches!(
            self,
            AstNode::Label { .. }
                | AstNode::Goto { .. }
                | AstNode::Break { .. }
                | AstNode::Id { .. }
                | AstNode::StringLiteral { .. }
                | AstNode::NumberLiteral { .. }
                | AstNode::BooleanLiteral { .. }
                | AstNode::Nil { .. }
                | AstNode::Dots { .. }
        )
    }

    /// Move every child into `out`, leaving `self` without descendants.
    fn detach_children(&mut self, out: &mut Vec<AstNode>) {
        match self {
            AstNode::Block { stats: nodes, .. }
            | AstNode::Return { exprs: nodes, .. }
            | AstNode::NameList { names: nodes, .. }
            | AstNode::VarList { vars: nodes, .. }
            | AstNode::ExpList { exprs: nodes, .. }
            | AstNode::Table { fields: nodes, .. } => out.append(nodes),
            AstNode::Do { body, .. } => detach(body, out),
            AstNode::If {
                branches,
                else_branch,
                ..
            } => {
                for (condition, block) in branches.drain(..) {
                    out.push(condition);
                    out.push(block);
                }
                if let Some(block) = else_branch.take() {
                    out.push(*block);
                }
            }
            AstNode::While {
                condition, body, ..
            }
            | AstNode::Repeat {
                body, condition, ..
            } => {
                detach(condition, out);
                detach(body, out);
            }
            AstNode::Fornum {
                var,
                start,
                limit,
                step,
                body,
                ..
            } => {
                detach(var, out);
                detach(start, out);
                detach(limit, out);
                if let Some(step) = step.take() {
                    out.push(*step);
                }
                detach(body, out);
            }
            AstNode::Forin {
                names, exprs, body, ..
            } => {
                detach(names, out);
                detach(exprs, out);
                detach(body, out);
            }
            AstNode::Local { names, exprs, .. } | AstNode::Localrec { names, exprs, .. } => {
                detach(names, out);
                detach(exprs, out);
            }
            AstNode::Set {
                targets, values, ..
            } => {
                detach(targets, out);
                detach(values, out);
            }
            AstNode::Pair { key, value, .. } => {
                detach(key, out);
                detach(value, out);
            }
            AstNode::Function { params, body, .. } => {
                out.append(params);
                detach(body, out);
            }
            AstNode::Call { func, args, .. } => {
                detach(func, out);
                out.append(args);
            }
            AstNode::Invoke {
                object,
                method,
                args,
                ..
            } => {
                detach(object, out);
                detach(method, out);
                out.append(args);
            }
            AstNode::Index { object, key, .. } => {
                detach(object, out);
                detach(key, out);
            }
            AstNode::Paren { expr, .. } => detach(expr, out),
            AstNode::BinaryOp { left, right, .. } => {
                detach(left, out);
                detach(right, out);
            }
            AstNode::UnaryOp { operand, .. } => detach(operand, out),
            AstNode::Label { .. }
            | AstNode::Goto { .. }
            | AstNode::Break { .. }
            | AstNode::Id { .. }
            | AstNode::StringLiteral { .. }
            | AstNode::NumberLiteral { .. }
            | AstNode::BooleanLiteral { .. }
            | AstNode::Nil { .. }
            | AstNode::Dots { .. } => {}
        }
    }
}

/// Swap a boxed child for a leaf and queue the original.
fn detach(child: &mut AstNode, out: &mut Vec<AstNode>) {
    if child.is_leaf() {
        return;
    }
    let leaf = AstNode::Nil { span: child.span() };
    out.push(std::mem::replace(child, leaf));
}

// ===== Construction helpers =====

/// Fold an optional `op right` tail onto `left`.
///
/// With no tail the operand comes back unchanged, so a precedence tier that
/// matched a single operand adds no node of its own.
pub(crate) fn fold_binary(left: AstNode, tail: Option<(BinOp, AstNode)>) -> AstNode {
    match tail {
        None => left,
        Some((op, right)) => AstNode::BinaryOp {
            span: Span::between(left.span(), right.span()),
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

/// Apply a prefix operator whose token starts at `op_pos`.
pub(crate) fn fold_unary(op: UnOp, op_pos: usize, operand: AstNode) -> AstNode {
    AstNode::UnaryOp {
        span: Span::new(op_pos, operand.span().end_pos),
        op,
        operand: Box::new(operand),
    }
}

/// Span covering a non-empty run of nodes.
pub(crate) fn list_span(items: &[AstNode]) -> Option<Span> {
    match (items.first(), items.last()) {
        (Some(first), Some(last)) => Some(Span::between(first.span(), last.span())),
        _ => None,
    }
}
