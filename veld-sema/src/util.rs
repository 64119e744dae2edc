#![forbid(unsafe_code)]

use veld_model::{DeclId, DeclKind, ExprKind, Expression, Model, TypeNode};

use crate::error::ModelFault;

/// Upper bound on alias hops while resolving type references. Well-formed
/// models forbid alias cycles; the bound turns an accidental cycle into a
/// fault instead of unbounded recursion.
pub const MAX_ALIAS_HOPS: usize = 64;

/// The declaration ultimately accessed by a reference expression, found by
/// walking through the operands of access and select chains.
pub fn accessed_declaration(expression: &Expression) -> Option<DeclId> {
    match &expression.kind {
        ExprKind::DirectRef(declaration) => Some(*declaration),
        ExprKind::FunctionAccess { function, .. } => Some(*function),
        ExprKind::TypeRef(declaration) => Some(*declaration),
        ExprKind::RecordAccess { operand, .. }
        | ExprKind::ArrayAccess { operand, .. }
        | ExprKind::Select { operand } => accessed_declaration(operand),
        _ => None,
    }
}

/// Every value declaration (variable, parameter or constant) referenced
/// anywhere inside `expression`, in pre-order.
pub fn referred_values(model: &Model, expression: &Expression) -> Vec<DeclId> {
    let mut referred = Vec::new();
    expression.walk(&mut |e| {
        if let ExprKind::DirectRef(declaration) = &e.kind {
            if model.decl(*declaration).is_value() {
                referred.push(*declaration);
            }
        }
    });
    referred
}

/// Resolves a type node to its definition by following type references
/// transitively. The returned node is never a `Reference`.
pub fn find_type_definition<'m>(
    model: &'m Model,
    ty: &'m TypeNode,
) -> Result<&'m TypeNode, ModelFault> {
    let mut current = ty;
    for _ in 0..MAX_ALIAS_HOPS {
        match current {
            TypeNode::Reference(id) => {
                let declaration = model.decl(*id);
                match &declaration.kind {
                    DeclKind::Type { ty } => current = ty,
                    _ => {
                        return Err(ModelFault::NotATypeDeclaration {
                            name: declaration.name.clone(),
                        });
                    }
                }
            }
            definition => return Ok(definition),
        }
    }
    Err(ModelFault::AliasDepthExceeded {
        max: MAX_ALIAS_HOPS,
    })
}
