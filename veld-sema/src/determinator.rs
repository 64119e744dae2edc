#![forbid(unsafe_code)]

use std::collections::HashSet;

use veld_model::{DeclKind, ExprKind, Expression, Model, TypeNode};

use crate::error::ModelFault;
use crate::hierarchy::FieldPath;
use crate::lattice::ExpressionType;
use crate::util::{self, MAX_ALIAS_HOPS};

/// Maps expressions and declared types onto the semantic type lattice.
///
/// Stateless view over an immutable model; cheap to construct and to share.
/// User type errors surface as [`ExpressionType::Error`] values so that one
/// malformed subexpression never aborts inference of its siblings; only
/// invalid-model conditions are returned as [`ModelFault`].
pub struct TypeDeterminator<'m> {
    model: &'m Model,
}

impl<'m> TypeDeterminator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self { model }
    }

    /// Infers the semantic type of an expression. Total over the expression
    /// variant set: always yields a lattice value for a well-formed model.
    pub fn type_of(&self, expression: &Expression) -> Result<ExpressionType, ModelFault> {
        match &expression.kind {
            // Literals
            ExprKind::BoolLit(_) => Ok(ExpressionType::Boolean),
            ExprKind::IntLit(_) => Ok(ExpressionType::Integer),
            ExprKind::RationalLit { .. } => Ok(ExpressionType::Rational),
            ExprKind::DecimalLit(_) => Ok(ExpressionType::Decimal),
            ExprKind::EnumLit { .. } => Ok(ExpressionType::Enumeration),
            ExprKind::IntegerRangeLit { .. } => Ok(ExpressionType::IntegerRange),
            ExprKind::RecordLit { .. } => Ok(ExpressionType::Record),
            ExprKind::ArrayLit { .. } => Ok(ExpressionType::Array),

            // References
            ExprKind::DirectRef(declaration) => {
                self.transform(self.model.decl(*declaration).declared_type())
            }
            ExprKind::FunctionAccess { function, .. } => {
                self.transform(self.model.decl(*function).declared_type())
            }
            ExprKind::ArrayAccess { .. } | ExprKind::RecordAccess { .. } => {
                self.access_chain_type(expression)
            }
            ExprKind::Select { operand } => self.select_type(operand),
            // A type used in expression position has no value type.
            ExprKind::TypeRef(_) => Ok(ExpressionType::Unknown),
            ExprKind::HostRef { targets } => {
                for &target in targets {
                    let declaration = self.model.decl(target);
                    if let DeclKind::Parameter { ty } = &declaration.kind {
                        return self.transform(ty);
                    }
                }
                Ok(ExpressionType::Unknown)
            }

            // Composites
            ExprKind::IfThenElse { then, .. } => self.type_of(then),
            ExprKind::Quantifier { .. }
            | ExprKind::Comparison { .. }
            | ExprKind::Connective { .. }
            | ExprKind::Else => Ok(ExpressionType::Boolean),
            ExprKind::Opaque(_) => Ok(ExpressionType::Void),

            // Arithmetic
            ExprKind::UnaryPlus(operand) | ExprKind::UnaryMinus(operand) => {
                let operand_type = self.type_of(operand)?;
                if operand_type.is_number() {
                    Ok(operand_type)
                } else {
                    Ok(ExpressionType::Error)
                }
            }
            ExprKind::Subtract { left, right } | ExprKind::Divide { left, right } => {
                self.arithmetic_binary_type(left, right)
            }
            ExprKind::Mod { left, right } | ExprKind::Div { left, right } => {
                let result = self.arithmetic_binary_type(left, right)?;
                if result == ExpressionType::Integer {
                    Ok(result)
                } else {
                    Ok(ExpressionType::Error)
                }
            }
            ExprKind::Add(operands) | ExprKind::Multiply(operands) => {
                let mut types = HashSet::new();
                for operand in operands {
                    types.insert(self.type_of(operand)?);
                }
                Ok(Self::arithmetic_type(&types))
            }
        }
    }

    /// Maps a declared type onto the lattice, resolving aliases transitively.
    pub fn transform(&self, ty: &TypeNode) -> Result<ExpressionType, ModelFault> {
        self.transform_bounded(ty, MAX_ALIAS_HOPS)
    }

    fn transform_bounded(&self, ty: &TypeNode, hops: usize) -> Result<ExpressionType, ModelFault> {
        match ty {
            TypeNode::Void => Ok(ExpressionType::Void),
            TypeNode::Boolean => Ok(ExpressionType::Boolean),
            TypeNode::Integer => Ok(ExpressionType::Integer),
            TypeNode::Rational => Ok(ExpressionType::Rational),
            TypeNode::Decimal => Ok(ExpressionType::Decimal),
            TypeNode::Enumeration { .. } => Ok(ExpressionType::Enumeration),
            TypeNode::Array { .. } => Ok(ExpressionType::Array),
            TypeNode::IntegerRange => Ok(ExpressionType::IntegerRange),
            TypeNode::Record { .. } => Ok(ExpressionType::Record),
            TypeNode::Reference(id) => {
                if hops == 0 {
                    return Err(ModelFault::AliasDepthExceeded {
                        max: MAX_ALIAS_HOPS,
                    });
                }
                let declaration = self.model.decl(*id);
                match &declaration.kind {
                    DeclKind::Type { ty } => self.transform_bounded(ty, hops - 1),
                    _ => Err(ModelFault::NotATypeDeclaration {
                        name: declaration.name.clone(),
                    }),
                }
            }
        }
    }

    /// Shallow structural equality of a declared type against a lattice
    /// value: references are resolved, records and arrays compare by tag
    /// only, never by field or element structure.
    pub fn structurally_equal(
        &self,
        ty: &TypeNode,
        expression_type: ExpressionType,
    ) -> Result<bool, ModelFault> {
        Ok(self.transform(ty)? == expression_type)
    }

    pub fn is_boolean(&self, expression: &Expression) -> Result<bool, ModelFault> {
        Ok(self.type_of(expression)? == ExpressionType::Boolean)
    }

    pub fn is_integer(&self, expression: &Expression) -> Result<bool, ModelFault> {
        Ok(self.type_of(expression)? == ExpressionType::Integer)
    }

    pub fn is_number(&self, expression: &Expression) -> Result<bool, ModelFault> {
        Ok(self.type_of(expression)?.is_number())
    }

    /// Arithmetic promotion over a set of operand types. Widening order:
    /// integer < rational < decimal; any non-number poisons the result.
    fn arithmetic_type(types: &HashSet<ExpressionType>) -> ExpressionType {
        if types.is_empty() || types.iter().any(|t| !t.is_number()) {
            return ExpressionType::Error;
        }
        if types.contains(&ExpressionType::Decimal) {
            return ExpressionType::Decimal;
        }
        if types.contains(&ExpressionType::Rational) {
            return ExpressionType::Rational;
        }
        ExpressionType::Integer
    }

    fn arithmetic_binary_type(
        &self,
        left: &Expression,
        right: &Expression,
    ) -> Result<ExpressionType, ModelFault> {
        let mut types = HashSet::new();
        types.insert(self.type_of(left)?);
        types.insert(self.type_of(right)?);
        Ok(Self::arithmetic_type(&types))
    }

    /// Resolves a chain of nested array/record accesses.
    ///
    /// Phase one unwinds the chain down to its innermost direct reference,
    /// counting array layers and prepending record fields to a [`FieldPath`].
    /// Phase two resolves forward from the referenced declaration's type,
    /// consuming exactly the recorded depth and path.
    fn access_chain_type(&self, expression: &Expression) -> Result<ExpressionType, ModelFault> {
        let mut depth = 0usize;
        let mut path = FieldPath::new();
        let mut current = expression;
        let declaration = loop {
            match &current.kind {
                ExprKind::ArrayAccess { operand, .. } => {
                    depth += 1;
                    current = operand;
                }
                ExprKind::RecordAccess { operand, field } => {
                    path.prepend(field.clone());
                    current = operand;
                }
                ExprKind::DirectRef(declaration) => break *declaration,
                _ => {
                    return Err(ModelFault::MalformedAccessChain {
                        found: current.kind_name(),
                        span: current.span,
                    });
                }
            }
        };

        let declared = self.model.decl(declaration).declared_type();
        let mut ty = util::find_type_definition(self.model, declared)?;
        let mut next_field = 0usize;
        while depth > 0 || next_field < path.len() {
            match ty {
                TypeNode::Array { element } if depth > 0 => {
                    depth -= 1;
                    ty = util::find_type_definition(self.model, element)?;
                }
                TypeNode::Record { fields } if next_field < path.len() => {
                    // The path is read by index; the unwind phase already
                    // fixed the outer-to-inner order.
                    let name = path
                        .get(next_field)
                        .unwrap_or_default();
                    next_field += 1;
                    let field = fields.iter().find(|f| f.name == name).ok_or_else(|| {
                        ModelFault::UnknownField {
                            field: name.to_string(),
                            span: expression.span,
                        }
                    })?;
                    ty = util::find_type_definition(self.model, &field.ty)?;
                }
                _ => {
                    return Err(ModelFault::InconsistentAccessChain {
                        ty: ty.kind_name(),
                        span: expression.span,
                    });
                }
            }
        }
        self.transform(ty)
    }

    /// Select draws one element out of an enumerable domain: an array yields
    /// its element type, an integer range yields integer, an enumeration
    /// yields enumeration. Anything else is a type error reported by the
    /// selectability check.
    fn select_type(&self, operand: &Expression) -> Result<ExpressionType, ModelFault> {
        if matches!(operand.kind, ExprKind::IntegerRangeLit { .. }) {
            return Ok(ExpressionType::Integer);
        }
        let Some(declaration) = util::accessed_declaration(operand) else {
            return Ok(ExpressionType::Error);
        };
        let declared = self.model.decl(declaration).declared_type();
        match util::find_type_definition(self.model, declared)? {
            TypeNode::Array { element } => self.transform(element),
            TypeNode::IntegerRange => Ok(ExpressionType::Integer),
            TypeNode::Enumeration { .. } => Ok(ExpressionType::Enumeration),
            _ => Ok(ExpressionType::Error),
        }
    }
}
