#![forbid(unsafe_code)]

use rayon::prelude::*;

use veld_model::{
    Action, ActionId, ActionKind, Container, DeclId, DeclKind, ExprKind, Expression, Model,
    TypeNode,
};

use crate::determinator::TypeDeterminator;
use crate::error::ModelFault;
use crate::findings::{Feature, Finding, NodeRef};
use crate::lattice::ExpressionType;
use crate::util;

/// Runs the semantic checks over a model and collects findings.
///
/// Each check is independent, side-effect-free apart from appending to the
/// findings collection, and re-entrant over the shared read-only model.
pub struct Validator<'m> {
    model: &'m Model,
    determinator: TypeDeterminator<'m>,
}

impl<'m> Validator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            determinator: TypeDeterminator::new(model),
        }
    }

    /// Validates every procedure body and root action, in declaration order
    /// followed by root order.
    pub fn validate(&self) -> Result<Vec<Finding>, ModelFault> {
        let mut findings = Vec::new();
        for entry in self.entry_points() {
            self.validate_action(entry, &mut findings)?;
        }
        Ok(findings)
    }

    /// Parallel variant of [`validate`](Self::validate): partitions the
    /// independent entry points across threads. Findings come back in the
    /// same order as the sequential run.
    pub fn validate_concurrently(&self) -> Result<Vec<Finding>, ModelFault> {
        let entries = self.entry_points();
        let per_entry = entries
            .into_par_iter()
            .map(|entry| {
                let mut findings = Vec::new();
                self.validate_action(entry, &mut findings)?;
                Ok(findings)
            })
            .collect::<Result<Vec<Vec<Finding>>, ModelFault>>()?;
        Ok(per_entry.into_iter().flatten().collect())
    }

    fn entry_points(&self) -> Vec<ActionId> {
        let mut entries: Vec<ActionId> = self
            .model
            .procedures()
            .filter_map(|(_, declaration)| match &declaration.kind {
                DeclKind::Procedure { body, .. } => Some(*body),
                _ => None,
            })
            .collect();
        entries.extend_from_slice(self.model.roots());
        entries
    }

    /// Runs the node-local checks on one action and recurses into its
    /// children. Findings accumulate; only invalid-model faults abort.
    pub fn validate_action(
        &self,
        id: ActionId,
        findings: &mut Vec<Finding>,
    ) -> Result<(), ModelFault> {
        let action = self.model.action(id);

        match &action.kind {
            ActionKind::Assignment { .. } => self.check_assignment(id, findings)?,
            ActionKind::VariableDeclaration { .. } => {
                self.check_variable_declaration(id, findings)
            }
            ActionKind::Return { .. } => self.check_return(id, findings)?,
            _ => {}
        }

        for expression in Self::expressions_of(action) {
            self.check_select_expressions(NodeRef::Action(id), expression, findings);
        }

        match &action.kind {
            ActionKind::Block { actions } => {
                for &child in actions {
                    self.validate_action(child, findings)?;
                }
            }
            ActionKind::If { branches }
            | ActionKind::Choice { branches }
            | ActionKind::Switch { branches, .. } => {
                for &b in branches {
                    let branch = self.model.branch(b);
                    self.check_select_expressions(NodeRef::Branch(b), &branch.guard, findings);
                    self.validate_action(branch.body, findings)?;
                }
            }
            ActionKind::For { body, .. } => self.validate_action(*body, findings)?,
            _ => {}
        }
        Ok(())
    }

    fn expressions_of(action: &Action) -> Vec<&Expression> {
        match &action.kind {
            ActionKind::Assignment { lhs, rhs } => vec![lhs, rhs],
            ActionKind::ExpressionStatement { expr } => vec![expr],
            ActionKind::Return { value } => value.iter().collect(),
            ActionKind::Switch { scrutinee, .. } => vec![scrutinee],
            ActionKind::For { range, .. } => vec![range],
            ActionKind::Block { .. }
            | ActionKind::VariableDeclaration { .. }
            | ActionKind::ConstantDeclaration { .. }
            | ActionKind::If { .. }
            | ActionKind::Choice { .. }
            | ActionKind::Break => Vec::new(),
        }
    }

    /// Assignment conformance: the target must be a single variable, and the
    /// right-hand side's inferred type must equal its declared type.
    pub fn check_assignment(
        &self,
        id: ActionId,
        findings: &mut Vec<Finding>,
    ) -> Result<(), ModelFault> {
        let ActionKind::Assignment { lhs, rhs } = &self.model.action(id).kind else {
            return Ok(());
        };
        let targets = util::referred_values(self.model, lhs);
        let Some(&target) = targets.first() else {
            return Err(ModelFault::UnresolvedAssignmentTarget { span: lhs.span });
        };
        let declaration = self.model.decl(target);
        match &declaration.kind {
            DeclKind::Variable { ty } => {
                // A type error inside the right-hand side has already been
                // surfaced at a lower level; suppress the conformance
                // finding in that case instead of reporting it twice.
                if let Ok(Some(finding)) = self.assignment_conformance(id, ty, rhs) {
                    findings.push(finding);
                }
            }
            _ => findings.push(
                Finding::error(
                    "Values can be assigned only to variables.",
                    NodeRef::Action(id),
                    lhs.span,
                )
                .with_feature(Feature::AssignmentLhs),
            ),
        }
        Ok(())
    }

    fn assignment_conformance(
        &self,
        id: ActionId,
        declared: &TypeNode,
        rhs: &Expression,
    ) -> Result<Option<Finding>, ModelFault> {
        let inferred = self.determinator.type_of(rhs)?;
        if inferred == ExpressionType::Error {
            return Ok(None);
        }
        if self.determinator.structurally_equal(declared, inferred)? {
            return Ok(None);
        }
        let declared_display = self.determinator.transform(declared)?.display();
        Ok(Some(
            Finding::error(
                format!(
                    "The type of the right hand side ({}) does not match the declared type of the variable ({}).",
                    inferred.display(),
                    declared_display
                ),
                NodeRef::Action(id),
                rhs.span,
            )
            .with_feature(Feature::AssignmentRhs),
        ))
    }

    /// Local-variable shadowing: a variable declared in a block must not
    /// reuse the name of a variable declared earlier in the same block.
    /// Enclosing blocks are intentionally not consulted; the block is the
    /// unit of scope.
    pub fn check_variable_declaration(&self, id: ActionId, findings: &mut Vec<Finding>) {
        let action = self.model.action(id);
        let ActionKind::VariableDeclaration { decl } = &action.kind else {
            return;
        };
        let Container::Action(parent) = self.model.container_of(id) else {
            return;
        };
        if !matches!(self.model.action(parent).kind, ActionKind::Block { .. }) {
            return;
        }
        let name = &self.model.decl(*decl).name;
        for preceding in self.model.preceding_variable_declarations(parent, id) {
            let previous = &self.model.decl(preceding).name;
            if previous == name {
                let mut finding = Finding::error(
                    format!(
                        "This variable cannot be named {previous} as it would shadow a previous local variable."
                    ),
                    NodeRef::Action(id),
                    action.span,
                )
                .with_feature(Feature::VariableDeclaration);
                if let Some(index) = self.model.index_in_container(id) {
                    finding = finding.with_index(index);
                }
                findings.push(finding);
            }
        }
    }

    /// Selectability: a select operand must be a value declaration, an
    /// integer range literal, or a type reference.
    pub fn check_select(
        &self,
        node: NodeRef,
        expression: &Expression,
        findings: &mut Vec<Finding>,
    ) {
        let ExprKind::Select { operand } = &expression.kind else {
            return;
        };
        if let Some(declaration) = util::accessed_declaration(operand) {
            if self.model.decl(declaration).is_value() {
                return;
            }
        }
        if matches!(
            operand.kind,
            ExprKind::IntegerRangeLit { .. } | ExprKind::TypeRef(_)
        ) {
            return;
        }
        findings.push(
            Finding::error(
                format!(
                    "The specified object is not selectable: {}.",
                    operand.kind_name()
                ),
                node,
                operand.span,
            )
            .with_feature(Feature::SelectOperand),
        );
    }

    fn check_select_expressions(
        &self,
        node: NodeRef,
        expression: &Expression,
        findings: &mut Vec<Finding>,
    ) {
        expression.walk(&mut |e| self.check_select(node, e, findings));
    }

    /// Return-type conformance: the inferred type of a return expression
    /// must equal the declared return type of the enclosing procedure. A
    /// return outside any procedure is valid and produces no finding.
    pub fn check_return(
        &self,
        id: ActionId,
        findings: &mut Vec<Finding>,
    ) -> Result<(), ModelFault> {
        let action = self.model.action(id);
        let ActionKind::Return { value } = &action.kind else {
            return Ok(());
        };
        let inferred = match value {
            Some(expression) => self.determinator.type_of(expression)?,
            None => ExpressionType::Void,
        };
        let Some(procedure) = self.containing_procedure(id)? else {
            return Ok(());
        };
        let DeclKind::Procedure { return_ty, .. } = &self.model.decl(procedure).kind else {
            return Ok(());
        };
        if !self.determinator.structurally_equal(return_ty, inferred)? {
            let declared_display = self.determinator.transform(return_ty)?.display();
            findings.push(
                Finding::error(
                    format!(
                        "The type of the return statement ({}) does not match the declared type of the procedure ({}).",
                        inferred.display(),
                        declared_display
                    ),
                    NodeRef::Action(id),
                    value.as_ref().map(|e| e.span).unwrap_or(action.span),
                )
                .with_feature(Feature::ReturnValue),
            );
        }
        Ok(())
    }

    /// Iterative upward walk over the containment chain. The states are:
    /// procedure (found), branch, block, loop, and unrooted (no enclosing
    /// procedure). A branch with no owning statement is an invalid model.
    fn containing_procedure(&self, action: ActionId) -> Result<Option<DeclId>, ModelFault> {
        let mut current = self.model.container_of(action);
        loop {
            match current {
                Container::Procedure(declaration) => return Ok(Some(declaration)),
                Container::Branch(branch) => {
                    let Some(owner) = self.model.branch_owner(branch) else {
                        return Err(ModelFault::BranchOutsideAction { branch });
                    };
                    current = self.model.container_of(owner);
                }
                Container::Action(parent) => match &self.model.action(parent).kind {
                    ActionKind::Block { .. } | ActionKind::For { .. } => {
                        current = self.model.container_of(parent);
                    }
                    _ => return Ok(None),
                },
                Container::Root => return Ok(None),
            }
        }
    }
}
