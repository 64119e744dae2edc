#![forbid(unsafe_code)]

use std::collections::HashMap;

use miette::SourceSpan;
use thiserror::Error;

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

pub fn zero_span() -> Span {
    span(0, 0)
}

/// Index of a declaration in the model's declaration arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

/// Index of an action (statement) in the model's action arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(u32);

/// Index of a branch in the model's branch arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(u32);

/// A type as written in the model. Composite types own their parts;
/// `Reference` points at a named type declaration and must be resolved
/// before structural comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeNode {
    Void,
    Boolean,
    Integer,
    Rational,
    Decimal,
    Enumeration { literals: Vec<String> },
    Array { element: Box<TypeNode> },
    IntegerRange,
    Record { fields: Vec<FieldDecl> },
    Reference(DeclId),
}

impl TypeNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeNode::Void => "void",
            TypeNode::Boolean => "boolean",
            TypeNode::Integer => "integer",
            TypeNode::Rational => "rational",
            TypeNode::Decimal => "decimal",
            TypeNode::Enumeration { .. } => "enumeration",
            TypeNode::Array { .. } => "array",
            TypeNode::IntegerRange => "integer range",
            TypeNode::Record { .. } => "record",
            TypeNode::Reference(_) => "type reference",
        }
    }
}

/// A named slot inside a record type.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeNode,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeNode) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Variable { ty: TypeNode },
    Parameter { ty: TypeNode },
    Constant { ty: TypeNode },
    /// A procedure's declared type is its return type.
    Procedure { return_ty: TypeNode, body: ActionId },
    /// A named alias for a type node.
    Type { ty: TypeNode },
}

impl Declaration {
    pub fn declared_type(&self) -> &TypeNode {
        match &self.kind {
            DeclKind::Variable { ty }
            | DeclKind::Parameter { ty }
            | DeclKind::Constant { ty }
            | DeclKind::Type { ty } => ty,
            DeclKind::Procedure { return_ty, .. } => return_ty,
        }
    }

    /// Variables, parameters and constants carry a runtime value;
    /// procedures and type declarations do not.
    pub fn is_value(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Variable { .. } | DeclKind::Parameter { .. } | DeclKind::Constant { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectiveOp {
    And,
    Or,
    Not,
    Imply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantifierKind {
    Forall,
    Exists,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    // Literals
    BoolLit(bool),
    IntLit(i64),
    RationalLit { numerator: i64, denominator: i64 },
    DecimalLit(f64),
    EnumLit { ty: DeclId, literal: String },
    IntegerRangeLit { low: Box<Expression>, high: Box<Expression> },
    RecordLit { fields: Vec<(String, Expression)> },
    ArrayLit { elements: Vec<Expression> },

    // References. Declaration ids are non-owning cross-references.
    DirectRef(DeclId),
    FunctionAccess { function: DeclId, arguments: Vec<Expression> },
    RecordAccess { operand: Box<Expression>, field: String },
    ArrayAccess { operand: Box<Expression>, index: Box<Expression> },
    /// Indexing into an enumerable domain (array, integer range, enumeration).
    Select { operand: Box<Expression> },
    /// A reference to a type declaration used in expression position.
    TypeRef(DeclId),
    /// Host-model wrapper node; carries the host's cross-references.
    HostRef { targets: Vec<DeclId> },

    // Composites
    IfThenElse {
        condition: Box<Expression>,
        then: Box<Expression>,
        orelse: Box<Expression>,
    },
    Quantifier { kind: QuantifierKind, body: Box<Expression> },
    Comparison { op: ComparisonOp, left: Box<Expression>, right: Box<Expression> },
    Connective { op: ConnectiveOp, operands: Vec<Expression> },
    Else,
    Opaque(String),

    // Arithmetic
    UnaryPlus(Box<Expression>),
    UnaryMinus(Box<Expression>),
    Subtract { left: Box<Expression>, right: Box<Expression> },
    Divide { left: Box<Expression>, right: Box<Expression> },
    Mod { left: Box<Expression>, right: Box<Expression> },
    Div { left: Box<Expression>, right: Box<Expression> },
    Add(Vec<Expression>),
    Multiply(Vec<Expression>),
}

impl Expression {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            span: zero_span(),
            kind,
        }
    }

    pub fn at(span: Span, kind: ExprKind) -> Self {
        Self { span, kind }
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::IntLit(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::BoolLit(value))
    }

    pub fn reference(declaration: DeclId) -> Self {
        Self::new(ExprKind::DirectRef(declaration))
    }

    /// Human-readable shape of the node, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::BoolLit(_) => "boolean literal",
            ExprKind::IntLit(_) => "integer literal",
            ExprKind::RationalLit { .. } => "rational literal",
            ExprKind::DecimalLit(_) => "decimal literal",
            ExprKind::EnumLit { .. } => "enumeration literal",
            ExprKind::IntegerRangeLit { .. } => "integer range literal",
            ExprKind::RecordLit { .. } => "record literal",
            ExprKind::ArrayLit { .. } => "array literal",
            ExprKind::DirectRef(_) => "direct reference",
            ExprKind::FunctionAccess { .. } => "function access",
            ExprKind::RecordAccess { .. } => "record access",
            ExprKind::ArrayAccess { .. } => "array access",
            ExprKind::Select { .. } => "select",
            ExprKind::TypeRef(_) => "type reference",
            ExprKind::HostRef { .. } => "host cross-reference",
            ExprKind::IfThenElse { .. } => "if-then-else",
            ExprKind::Quantifier { .. } => "quantifier",
            ExprKind::Comparison { .. } => "comparison",
            ExprKind::Connective { .. } => "boolean connective",
            ExprKind::Else => "else",
            ExprKind::Opaque(_) => "opaque expression",
            ExprKind::UnaryPlus(_) => "unary plus",
            ExprKind::UnaryMinus(_) => "unary minus",
            ExprKind::Subtract { .. } => "subtract",
            ExprKind::Divide { .. } => "divide",
            ExprKind::Mod { .. } => "mod",
            ExprKind::Div { .. } => "div",
            ExprKind::Add(_) => "add",
            ExprKind::Multiply(_) => "multiply",
        }
    }

    /// Pre-order visit of this expression and every owned subexpression.
    pub fn walk(&self, f: &mut impl FnMut(&Expression)) {
        f(self);
        match &self.kind {
            ExprKind::BoolLit(_)
            | ExprKind::IntLit(_)
            | ExprKind::RationalLit { .. }
            | ExprKind::DecimalLit(_)
            | ExprKind::EnumLit { .. }
            | ExprKind::DirectRef(_)
            | ExprKind::TypeRef(_)
            | ExprKind::HostRef { .. }
            | ExprKind::Else
            | ExprKind::Opaque(_) => {}
            ExprKind::IntegerRangeLit { low, high } => {
                low.walk(f);
                high.walk(f);
            }
            ExprKind::RecordLit { fields } => {
                for (_, value) in fields {
                    value.walk(f);
                }
            }
            ExprKind::ArrayLit { elements }
            | ExprKind::Add(elements)
            | ExprKind::Multiply(elements)
            | ExprKind::Connective {
                operands: elements, ..
            } => {
                for element in elements {
                    element.walk(f);
                }
            }
            ExprKind::FunctionAccess { arguments, .. } => {
                for argument in arguments {
                    argument.walk(f);
                }
            }
            ExprKind::RecordAccess { operand, .. }
            | ExprKind::Select { operand }
            | ExprKind::UnaryPlus(operand)
            | ExprKind::UnaryMinus(operand)
            | ExprKind::Quantifier { body: operand, .. } => operand.walk(f),
            ExprKind::ArrayAccess { operand, index } => {
                operand.walk(f);
                index.walk(f);
            }
            ExprKind::IfThenElse {
                condition,
                then,
                orelse,
            } => {
                condition.walk(f);
                then.walk(f);
                orelse.walk(f);
            }
            ExprKind::Comparison { left, right, .. }
            | ExprKind::Subtract { left, right }
            | ExprKind::Divide { left, right }
            | ExprKind::Mod { left, right }
            | ExprKind::Div { left, right } => {
                left.walk(f);
                right.walk(f);
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Action {
    pub span: Span,
    pub kind: ActionKind,
}

#[derive(Clone, Debug)]
pub enum ActionKind {
    Block { actions: Vec<ActionId> },
    Assignment { lhs: Expression, rhs: Expression },
    VariableDeclaration { decl: DeclId },
    ConstantDeclaration { decl: DeclId },
    ExpressionStatement { expr: Expression },
    Return { value: Option<Expression> },
    If { branches: Vec<BranchId> },
    Choice { branches: Vec<BranchId> },
    Switch { scrutinee: Expression, branches: Vec<BranchId> },
    For { parameter: DeclId, range: Expression, body: ActionId },
    Break,
}

/// A guarded branch of an if/choice/switch statement. Branches are arena
/// entities of their own so the upward containment walk can observe them.
#[derive(Clone, Debug)]
pub struct Branch {
    pub span: Span,
    pub guard: Expression,
    pub body: ActionId,
}

/// The owner of an action in the containment tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Container {
    Procedure(DeclId),
    Branch(BranchId),
    Action(ActionId),
    Root,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("action {0:?} does not exist in this model")]
    DanglingAction(ActionId),
    #[error("branch {0:?} does not exist in this model")]
    DanglingBranch(BranchId),
    #[error("action {0:?} is owned by more than one container")]
    DoubleContainment(ActionId),
    #[error("branch {0:?} is owned by more than one statement")]
    DoubleBranchContainment(BranchId),
}

/// An immutable model snapshot: declaration/action/branch arenas plus the
/// containment index computed once at build time. Analysis only ever reads
/// from it.
#[derive(Debug)]
pub struct Model {
    decls: Vec<Declaration>,
    actions: Vec<Action>,
    branches: Vec<Branch>,
    roots: Vec<ActionId>,
    containers: HashMap<ActionId, Container>,
    branch_owners: HashMap<BranchId, ActionId>,
    indices: HashMap<ActionId, usize>,
}

impl Model {
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.0 as usize]
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id.0 as usize]
    }

    /// Top-level script actions that do not live inside a procedure.
    pub fn roots(&self) -> &[ActionId] {
        &self.roots
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId(i as u32), d))
    }

    pub fn procedures(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls()
            .filter(|(_, d)| matches!(d.kind, DeclKind::Procedure { .. }))
    }

    pub fn container_of(&self, id: ActionId) -> Container {
        self.containers.get(&id).copied().unwrap_or(Container::Root)
    }

    /// The if/choice/switch statement a branch belongs to.
    pub fn branch_owner(&self, id: BranchId) -> Option<ActionId> {
        self.branch_owners.get(&id).copied()
    }

    /// Position of an action within its containing block, where applicable.
    pub fn index_in_container(&self, id: ActionId) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    /// Variables declared by statements of `block` that textually precede
    /// `statement`, in statement order.
    pub fn preceding_variable_declarations(
        &self,
        block: ActionId,
        statement: ActionId,
    ) -> Vec<DeclId> {
        let ActionKind::Block { actions } = &self.action(block).kind else {
            return Vec::new();
        };
        let mut preceding = Vec::new();
        for &child in actions {
            if child == statement {
                break;
            }
            if let ActionKind::VariableDeclaration { decl } = &self.action(child).kind {
                preceding.push(*decl);
            }
        }
        preceding
    }
}

/// Builds a [`Model`]. Ids handed out by the builder are the only way to
/// reference nodes; `build` verifies the containment structure is a tree.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    decls: Vec<Declaration>,
    actions: Vec<Action>,
    branches: Vec<Branch>,
    roots: Vec<ActionId>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_decl(&mut self, name: &str, kind: DeclKind) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Declaration {
            name: name.to_string(),
            kind,
        });
        id
    }

    pub fn declare_variable(&mut self, name: &str, ty: TypeNode) -> DeclId {
        self.push_decl(name, DeclKind::Variable { ty })
    }

    pub fn declare_parameter(&mut self, name: &str, ty: TypeNode) -> DeclId {
        self.push_decl(name, DeclKind::Parameter { ty })
    }

    pub fn declare_constant(&mut self, name: &str, ty: TypeNode) -> DeclId {
        self.push_decl(name, DeclKind::Constant { ty })
    }

    pub fn declare_type(&mut self, name: &str, ty: TypeNode) -> DeclId {
        self.push_decl(name, DeclKind::Type { ty })
    }

    pub fn declare_procedure(&mut self, name: &str, return_ty: TypeNode, body: ActionId) -> DeclId {
        self.push_decl(name, DeclKind::Procedure { return_ty, body })
    }

    pub fn add_action(&mut self, kind: ActionKind) -> ActionId {
        self.add_action_at(zero_span(), kind)
    }

    pub fn add_action_at(&mut self, span: Span, kind: ActionKind) -> ActionId {
        let id = ActionId(self.actions.len() as u32);
        self.actions.push(Action { span, kind });
        id
    }

    pub fn add_branch(&mut self, guard: Expression, body: ActionId) -> BranchId {
        let id = BranchId(self.branches.len() as u32);
        self.branches.push(Branch {
            span: zero_span(),
            guard,
            body,
        });
        id
    }

    pub fn block(&mut self, actions: Vec<ActionId>) -> ActionId {
        self.add_action(ActionKind::Block { actions })
    }

    pub fn assignment(&mut self, lhs: Expression, rhs: Expression) -> ActionId {
        self.add_action(ActionKind::Assignment { lhs, rhs })
    }

    pub fn variable_statement(&mut self, decl: DeclId) -> ActionId {
        self.add_action(ActionKind::VariableDeclaration { decl })
    }

    pub fn return_statement(&mut self, value: Option<Expression>) -> ActionId {
        self.add_action(ActionKind::Return { value })
    }

    pub fn if_statement(&mut self, branches: Vec<BranchId>) -> ActionId {
        self.add_action(ActionKind::If { branches })
    }

    pub fn for_statement(
        &mut self,
        parameter: DeclId,
        range: Expression,
        body: ActionId,
    ) -> ActionId {
        self.add_action(ActionKind::For {
            parameter,
            range,
            body,
        })
    }

    /// Marks a top-level script action.
    pub fn mark_root(&mut self, action: ActionId) {
        self.roots.push(action);
    }

    pub fn build(self) -> Result<Model, ModelError> {
        let ModelBuilder {
            decls,
            actions,
            branches,
            roots,
        } = self;

        let mut containers: HashMap<ActionId, Container> = HashMap::new();
        let mut branch_owners: HashMap<BranchId, ActionId> = HashMap::new();
        let mut indices: HashMap<ActionId, usize> = HashMap::new();
        let mut work: Vec<(ActionId, Container, Option<usize>)> = Vec::new();

        for (i, declaration) in decls.iter().enumerate() {
            if let DeclKind::Procedure { body, .. } = &declaration.kind {
                work.push((*body, Container::Procedure(DeclId(i as u32)), None));
            }
        }
        for &root in &roots {
            work.push((root, Container::Root, None));
        }

        while let Some((id, container, index)) = work.pop() {
            let action = actions
                .get(id.0 as usize)
                .ok_or(ModelError::DanglingAction(id))?;
            if containers.insert(id, container).is_some() {
                return Err(ModelError::DoubleContainment(id));
            }
            if let Some(index) = index {
                indices.insert(id, index);
            }
            match &action.kind {
                ActionKind::Block { actions: children } => {
                    for (i, &child) in children.iter().enumerate() {
                        work.push((child, Container::Action(id), Some(i)));
                    }
                }
                ActionKind::If { branches: owned }
                | ActionKind::Choice { branches: owned }
                | ActionKind::Switch {
                    branches: owned, ..
                } => {
                    for &b in owned {
                        let branch = branches
                            .get(b.0 as usize)
                            .ok_or(ModelError::DanglingBranch(b))?;
                        if branch_owners.insert(b, id).is_some() {
                            return Err(ModelError::DoubleBranchContainment(b));
                        }
                        work.push((branch.body, Container::Branch(b), None));
                    }
                }
                ActionKind::For { body, .. } => {
                    work.push((*body, Container::Action(id), None));
                }
                _ => {}
            }
        }

        Ok(Model {
            decls,
            actions,
            branches,
            roots,
            containers,
            branch_owners,
            indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_index_records_parents_and_indices() {
        let mut builder = ModelBuilder::new();
        let v = builder.declare_variable("v", TypeNode::Integer);
        let stmt_a = builder.variable_statement(v);
        let stmt_b = builder.return_statement(None);
        let block = builder.block(vec![stmt_a, stmt_b]);
        let p = builder.declare_procedure("p", TypeNode::Void, block);
        let model = builder.build().expect("build");

        assert_eq!(model.container_of(block), Container::Procedure(p));
        assert_eq!(model.container_of(stmt_a), Container::Action(block));
        assert_eq!(model.index_in_container(stmt_a), Some(0));
        assert_eq!(model.index_in_container(stmt_b), Some(1));
    }

    #[test]
    fn branch_bodies_are_contained_via_their_branch() {
        let mut builder = ModelBuilder::new();
        let body = builder.block(vec![]);
        let branch = builder.add_branch(Expression::boolean(true), body);
        let if_stmt = builder.if_statement(vec![branch]);
        builder.mark_root(if_stmt);
        let model = builder.build().expect("build");

        assert_eq!(model.container_of(if_stmt), Container::Root);
        assert_eq!(model.container_of(body), Container::Branch(branch));
        assert_eq!(model.branch_owner(branch), Some(if_stmt));
    }

    #[test]
    fn double_containment_is_rejected() {
        let mut builder = ModelBuilder::new();
        let stmt = builder.return_statement(None);
        let block_a = builder.block(vec![stmt]);
        let block_b = builder.block(vec![stmt]);
        builder.mark_root(block_a);
        builder.mark_root(block_b);
        let err = builder.build().expect_err("duplicate owner");
        assert!(matches!(err, ModelError::DoubleContainment(_)));
    }

    #[test]
    fn preceding_variable_declarations_stop_at_the_statement() {
        let mut builder = ModelBuilder::new();
        let a = builder.declare_variable("a", TypeNode::Integer);
        let b = builder.declare_variable("b", TypeNode::Integer);
        let c = builder.declare_variable("c", TypeNode::Integer);
        let stmt_a = builder.variable_statement(a);
        let stmt_b = builder.variable_statement(b);
        let stmt_c = builder.variable_statement(c);
        let block = builder.block(vec![stmt_a, stmt_b, stmt_c]);
        builder.mark_root(block);
        let model = builder.build().expect("build");

        assert_eq!(
            model.preceding_variable_declarations(block, stmt_c),
            vec![a, b]
        );
        assert_eq!(model.preceding_variable_declarations(block, stmt_a), vec![]);
    }

    #[test]
    fn walk_visits_every_subexpression() {
        let expr = Expression::new(ExprKind::Add(vec![
            Expression::int(1),
            Expression::new(ExprKind::UnaryMinus(Box::new(Expression::int(2)))),
        ]));
        let mut seen = Vec::new();
        expr.walk(&mut |e| seen.push(e.kind_name()));
        assert_eq!(
            seen,
            vec!["add", "integer literal", "unary minus", "integer literal"]
        );
    }
}
