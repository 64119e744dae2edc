use veld_model::{ModelBuilder, TypeNode};
use veld_sema::{Feature, NodeRef, Validator};

#[test]
fn redeclaring_a_name_in_the_same_block_is_reported_once() {
    let mut builder = ModelBuilder::new();
    let first = builder.declare_variable("v", TypeNode::Integer);
    let second = builder.declare_variable("v", TypeNode::Boolean);
    let stmt_first = builder.variable_statement(first);
    let stmt_second = builder.variable_statement(second);
    let block = builder.block(vec![stmt_first, stmt_second]);
    builder.mark_root(block);
    let model = builder.build().expect("build");

    let findings = Validator::new(&model).validate().expect("validate");
    assert_eq!(findings.len(), 1, "{findings:?}");
    let finding = &findings[0];
    assert!(finding.message.contains("shadow"), "{}", finding.message);
    // The finding is attached to the second declaration statement.
    assert_eq!(finding.node, NodeRef::Action(stmt_second));
    assert_eq!(finding.feature, Some(Feature::VariableDeclaration));
    assert_eq!(finding.index, Some(1));
}

#[test]
fn declaration_order_matters_not_just_membership() {
    // The first declaration statement has no preceding siblings, so only
    // the later one is flagged.
    let mut builder = ModelBuilder::new();
    let a = builder.declare_variable("x", TypeNode::Integer);
    let b = builder.declare_variable("x", TypeNode::Integer);
    let c = builder.declare_variable("x", TypeNode::Integer);
    let stmt_a = builder.variable_statement(a);
    let stmt_b = builder.variable_statement(b);
    let stmt_c = builder.variable_statement(c);
    let block = builder.block(vec![stmt_a, stmt_b, stmt_c]);
    builder.mark_root(block);
    let model = builder.build().expect("build");

    let findings = Validator::new(&model).validate().expect("validate");
    // stmt_b collides with a; stmt_c collides with both a and b.
    assert_eq!(findings.len(), 3, "{findings:?}");
    assert_eq!(findings[0].node, NodeRef::Action(stmt_b));
    assert_eq!(findings[1].node, NodeRef::Action(stmt_c));
    assert_eq!(findings[2].node, NodeRef::Action(stmt_c));
}

#[test]
fn shadowing_across_nested_blocks_is_not_checked() {
    // The block is the unit of scope: an inner block may reuse a name from
    // the enclosing one without a finding.
    let mut builder = ModelBuilder::new();
    let outer_v = builder.declare_variable("v", TypeNode::Integer);
    let inner_v = builder.declare_variable("v", TypeNode::Integer);
    let stmt_outer = builder.variable_statement(outer_v);
    let stmt_inner = builder.variable_statement(inner_v);
    let inner_block = builder.block(vec![stmt_inner]);
    let outer_block = builder.block(vec![stmt_outer, inner_block]);
    builder.mark_root(outer_block);
    let model = builder.build().expect("build");

    let findings = Validator::new(&model).validate().expect("validate");
    assert!(findings.is_empty(), "{findings:?}");
}

#[test]
fn distinct_names_in_one_block_are_fine() {
    let mut builder = ModelBuilder::new();
    let a = builder.declare_variable("a", TypeNode::Integer);
    let b = builder.declare_variable("b", TypeNode::Integer);
    let stmt_a = builder.variable_statement(a);
    let stmt_b = builder.variable_statement(b);
    let block = builder.block(vec![stmt_a, stmt_b]);
    builder.mark_root(block);
    let model = builder.build().expect("build");

    let findings = Validator::new(&model).validate().expect("validate");
    assert!(findings.is_empty(), "{findings:?}");
}
