use veld_model::{ExprKind, Expression, FieldDecl, ModelBuilder, TypeNode};
use veld_sema::{ExpressionType, TypeDeterminator};

fn record(fields: Vec<FieldDecl>) -> TypeNode {
    TypeNode::Record { fields }
}

fn array_of(element: TypeNode) -> TypeNode {
    TypeNode::Array {
        element: Box::new(element),
    }
}

fn field_access(operand: Expression, field: &str) -> Expression {
    Expression::new(ExprKind::RecordAccess {
        operand: Box::new(operand),
        field: field.to_string(),
    })
}

fn index_access(operand: Expression, index: i64) -> Expression {
    Expression::new(ExprKind::ArrayAccess {
        operand: Box::new(operand),
        index: Box::new(Expression::int(index)),
    })
}

#[test]
fn record_field_holding_an_array_resolves_to_the_element_type() {
    // x: { a: array<integer> };  x.a[0] is an integer.
    let mut builder = ModelBuilder::new();
    let x = builder.declare_variable(
        "x",
        record(vec![FieldDecl::new("a", array_of(TypeNode::Integer))]),
    );
    let model = builder.build().expect("build");
    let determinator = TypeDeterminator::new(&model);

    let access = index_access(field_access(Expression::reference(x), "a"), 0);
    assert_eq!(
        determinator.type_of(&access).expect("chain"),
        ExpressionType::Integer
    );
}

#[test]
fn nested_record_fields_resolve_outer_to_inner() {
    // x: { a: { b: boolean } };  x.a.b is a boolean.
    let mut builder = ModelBuilder::new();
    let x = builder.declare_variable(
        "x",
        record(vec![FieldDecl::new(
            "a",
            record(vec![FieldDecl::new("b", TypeNode::Boolean)]),
        )]),
    );
    let model = builder.build().expect("build");
    let determinator = TypeDeterminator::new(&model);

    let access = field_access(field_access(Expression::reference(x), "a"), "b");
    assert_eq!(
        determinator.type_of(&access).expect("chain"),
        ExpressionType::Boolean
    );
}

#[test]
fn chains_resolve_through_type_aliases_at_every_layer() {
    // cell = array<integer>; row = { cells: cell }; x: row;  x.cells[2][3]
    let mut builder = ModelBuilder::new();
    let cell = builder.declare_type("cell", array_of(array_of(TypeNode::Decimal)));
    let row = builder.declare_type(
        "row",
        record(vec![FieldDecl::new("cells", TypeNode::Reference(cell))]),
    );
    let x = builder.declare_variable("x", TypeNode::Reference(row));
    let model = builder.build().expect("build");
    let determinator = TypeDeterminator::new(&model);

    let access = index_access(
        index_access(field_access(Expression::reference(x), "cells"), 2),
        3,
    );
    assert_eq!(
        determinator.type_of(&access).expect("chain"),
        ExpressionType::Decimal
    );
}

#[test]
fn deeper_indexing_than_the_type_allows_is_a_fault() {
    let mut builder = ModelBuilder::new();
    let x = builder.declare_variable("x", array_of(TypeNode::Integer));
    let model = builder.build().expect("build");
    let determinator = TypeDeterminator::new(&model);

    let access = index_access(index_access(Expression::reference(x), 0), 0);
    assert!(determinator.type_of(&access).is_err());
}

#[test]
fn unknown_field_in_a_chain_is_a_fault() {
    let mut builder = ModelBuilder::new();
    let x = builder.declare_variable(
        "x",
        record(vec![FieldDecl::new("a", TypeNode::Integer)]),
    );
    let model = builder.build().expect("build");
    let determinator = TypeDeterminator::new(&model);

    let access = field_access(Expression::reference(x), "missing");
    assert!(determinator.type_of(&access).is_err());
}
