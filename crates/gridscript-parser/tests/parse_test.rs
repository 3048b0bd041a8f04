//! End-to-end reduction tests: token sequences in, command trees out.
//!
//! Tokens are built by hand the way an embedder's keyword map would emit
//! them, so these cover the reduction table without pinning any surface
//! syntax.

use gridscript_core::{
    BinaryOp, CallMode, CommandDef, Comparison, ControlKind, DeviceAction, DeviceType, FunctionDef,
    FunctionTable, Param, Primitive, PropertyId, PropertySpec, Selector, TimeUnit, Variable,
};
use gridscript_parser::{ParseError, Parser};

fn parse(tokens: Vec<Param>) -> Result<CommandDef, ParseError> {
    Parser::new().parse(tokens, &FunctionTable::new())
}

fn num(n: f64) -> Param {
    Param::Num(n)
}

fn var(n: f64) -> Variable {
    Variable::Static(Primitive::Number(n))
}

fn piston() -> Param {
    Param::DeviceTypeTok(DeviceType::new("piston"))
}

// ============================================================================
// Primitives and simple commands
// ============================================================================

#[test]
fn test_empty_command_is_rejected() {
    assert!(matches!(parse(vec![]), Err(ParseError::EmptyCommand)));
}

#[test]
fn test_print_bare_word_is_ambiguous() {
    let cmd = parse(vec![Param::PrintTok, Param::word("hello")]).unwrap();
    assert_eq!(cmd, CommandDef::Print(Variable::Ambiguous("hello".into())));
}

#[test]
fn test_print_quoted_string_stays_literal() {
    let cmd = parse(vec![Param::PrintTok, Param::explicit_string("hello world")]).unwrap();
    assert_eq!(
        cmd,
        CommandDef::Print(Variable::Static(Primitive::String("hello world".into())))
    );
}

#[test]
fn test_numeric_word_promotes_to_number() {
    let cmd = parse(vec![Param::PrintTok, Param::word("3.5")]).unwrap();
    assert_eq!(cmd, CommandDef::Print(var(3.5)));
}

#[test]
fn test_vector_word_promotes_to_vector() {
    let cmd = parse(vec![Param::PrintTok, Param::word("1:2:3")]).unwrap();
    assert_eq!(
        cmd,
        CommandDef::Print(Variable::Static(Primitive::Vector([1.0, 2.0, 3.0])))
    );
}

#[test]
fn test_control_verb_alone_is_a_command() {
    let cmd = parse(vec![Param::ControlTok(ControlKind::Stop)]).unwrap();
    assert_eq!(cmd, CommandDef::Control(ControlKind::Stop));
}

#[test]
fn test_unrecognized_residual_reports_kinds() {
    let result = parse(vec![Param::PropertyTok(PropertyId::new("height"))]);
    assert!(matches!(result, Err(ParseError::UnrecognizedCommand(_))));
}

// ============================================================================
// Wait
// ============================================================================

#[test]
fn test_wait_with_no_duration_is_one_tick() {
    let cmd = parse(vec![Param::WaitTok]).unwrap();
    assert_eq!(
        cmd,
        CommandDef::Wait {
            duration: var(1.0),
            unit: TimeUnit::Ticks,
        }
    );
}

#[test]
fn test_wait_bare_duration_defaults_to_seconds() {
    let cmd = parse(vec![Param::WaitTok, num(2.0)]).unwrap();
    assert_eq!(
        cmd,
        CommandDef::Wait {
            duration: var(2.0),
            unit: TimeUnit::Seconds,
        }
    );
}

#[test]
fn test_wait_explicit_unit_wins() {
    let cmd = parse(vec![
        Param::WaitTok,
        num(10.0),
        Param::UnitTok(TimeUnit::Ticks),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Wait {
            duration: var(10.0),
            unit: TimeUnit::Ticks,
        }
    );
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_multiplicative_binds_tighter_than_additive() {
    // 2 + 3 * 4
    let cmd = parse(vec![
        Param::PrintTok,
        num(2.0),
        Param::Binary3Tok(BinaryOp::Add),
        num(3.0),
        Param::Binary2Tok(BinaryOp::Multiply),
        num(4.0),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Print(Variable::binary(
            BinaryOp::Add,
            var(2.0),
            Variable::binary(BinaryOp::Multiply, var(3.0), var(4.0)),
        ))
    );
}

#[test]
fn test_parentheses_regroup_operands() {
    // (2 + 3) * 4
    let cmd = parse(vec![
        Param::PrintTok,
        Param::OpenParen,
        num(2.0),
        Param::Binary3Tok(BinaryOp::Add),
        num(3.0),
        Param::CloseParen,
        Param::Binary2Tok(BinaryOp::Multiply),
        num(4.0),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Print(Variable::binary(
            BinaryOp::Multiply,
            Variable::binary(BinaryOp::Add, var(2.0), var(3.0)),
            var(4.0),
        ))
    );
}

#[test]
fn test_redundant_parentheses_change_nothing() {
    let plain = parse(vec![
        Param::PrintTok,
        num(2.0),
        Param::Binary3Tok(BinaryOp::Add),
        num(3.0),
    ])
    .unwrap();
    let grouped = parse(vec![
        Param::PrintTok,
        Param::OpenParen,
        num(2.0),
        Param::Binary3Tok(BinaryOp::Add),
        num(3.0),
        Param::CloseParen,
    ])
    .unwrap();
    assert_eq!(plain, grouped);
}

#[test]
fn test_unclosed_parenthesis_is_fatal() {
    let result = parse(vec![Param::PrintTok, Param::OpenParen, num(1.0)]);
    assert!(matches!(result, Err(ParseError::UnclosedParenthesis)));
}

#[test]
fn test_not_comparison_collapses_to_inverse() {
    // x is not > 5  ->  x <= 5
    let cmd = parse(vec![
        Param::PrintTok,
        Param::word("x"),
        Param::ComparisonTok(Comparison::Greater),
        Param::NotTok,
        num(5.0),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Print(Variable::comparison(
            Comparison::LessOrEqual,
            Variable::Ambiguous("x".into()),
            var(5.0),
        ))
    );
}

// ============================================================================
// Lists
// ============================================================================

#[test]
fn test_bare_list_literal() {
    let cmd = parse(vec![
        Param::PrintTok,
        Param::OpenBracket,
        num(1.0),
        Param::Separator,
        num(2.0),
        Param::CloseBracket,
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Print(Variable::ListIndex {
            list: Box::new(Variable::ListOf(vec![var(1.0), var(2.0)])),
            index: Box::new(Variable::ListOf(vec![])),
        })
    );
}

#[test]
fn test_named_list_index() {
    // print x[0]
    let cmd = parse(vec![
        Param::PrintTok,
        Param::word("x"),
        Param::OpenBracket,
        num(0.0),
        Param::CloseBracket,
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Print(Variable::ListIndex {
            list: Box::new(Variable::Named("x".into())),
            index: Box::new(Variable::ListOf(vec![var(0.0)])),
        })
    );
}

#[test]
fn test_unclosed_bracket_is_fatal() {
    let result = parse(vec![Param::PrintTok, Param::OpenBracket, num(1.0)]);
    assert!(matches!(result, Err(ParseError::UnclosedBracket)));
}

#[test]
fn test_empty_list_entry_is_rejected() {
    let result = parse(vec![
        Param::PrintTok,
        Param::OpenBracket,
        num(1.0),
        Param::Separator,
        Param::Separator,
        num(2.0),
        Param::CloseBracket,
    ]);
    assert!(matches!(result, Err(ParseError::InvalidListValue)));
}

// ============================================================================
// Assignment
// ============================================================================

#[test]
fn test_assign_named_variable() {
    // set x to 5
    let cmd = parse(vec![
        Param::AssignTok {
            by_reference: false,
        },
        Param::word("x"),
        num(5.0),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Assign {
            name: "x".into(),
            value: var(5.0),
            global: false,
            by_reference: false,
        }
    );
}

#[test]
fn test_assign_global() {
    let cmd = parse(vec![
        Param::AssignTok {
            by_reference: false,
        },
        Param::GlobalTok,
        Param::word("x"),
        num(5.0),
    ])
    .unwrap();
    assert!(matches!(cmd, CommandDef::Assign { global: true, .. }));
}

#[test]
fn test_assign_list_element() {
    // set x[0] to 5
    let cmd = parse(vec![
        Param::AssignTok {
            by_reference: false,
        },
        Param::word("x"),
        Param::OpenBracket,
        num(0.0),
        Param::CloseBracket,
        num(5.0),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::AssignListIndex {
            list: Variable::Named("x".into()),
            index: Variable::ListOf(vec![var(0.0)]),
            value: var(5.0),
        }
    );
}

// ============================================================================
// Selectors and device actions
// ============================================================================

#[test]
fn test_reverse_all_of_type() {
    let cmd = parse(vec![Param::ReverseTok, piston()]).unwrap();
    assert_eq!(
        cmd,
        CommandDef::Device {
            selector: Selector::All(DeviceType::new("piston")),
            action: DeviceAction::Reverse {
                property: PropertySpec::Primary,
            },
        }
    );
}

#[test]
fn test_reverse_self() {
    let cmd = parse(vec![Param::ReverseTok, Param::SelfTok]).unwrap();
    assert_eq!(
        cmd,
        CommandDef::Device {
            selector: Selector::SelfRef(None),
            action: DeviceAction::Reverse {
                property: PropertySpec::Primary,
            },
        }
    );
}

#[test]
fn test_relative_increment_with_named_property() {
    // raise the piston height by 2
    let cmd = parse(vec![
        Param::AssignTok {
            by_reference: false,
        },
        piston(),
        Param::PropertyTok(PropertyId::new("height")),
        Param::RelativeTok,
        num(2.0),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Device {
            selector: Selector::All(DeviceType::new("piston")),
            action: DeviceAction::Increment {
                property: PropertySpec::Named(PropertyId::new("height")),
                direction: None,
                amount: var(2.0),
            },
        }
    );
}

#[test]
fn test_named_selector_from_word_subtokens() {
    // "outer piston" names a piston entity
    let cmd = parse(vec![
        Param::ReverseTok,
        Param::Word {
            text: "outer piston".into(),
            subtokens: vec![Param::word("outer"), piston()],
        },
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Device {
            selector: Selector::named(
                Some(DeviceType::new("piston")),
                false,
                Variable::string("outer piston"),
            ),
            action: DeviceAction::Reverse {
                property: PropertySpec::Primary,
            },
        }
    );
}

#[test]
fn test_filtered_selector() {
    // reverse pistons with height > 5
    let cmd = parse(vec![
        Param::ReverseTok,
        piston(),
        Param::WithTok,
        Param::PropertyTok(PropertyId::new("height")),
        Param::ComparisonTok(Comparison::Greater),
        num(5.0),
    ])
    .unwrap();
    match cmd {
        CommandDef::Device {
            selector: Selector::Filtered { inner, condition },
            action: DeviceAction::Reverse { .. },
        } => {
            assert_eq!(*inner, Selector::All(DeviceType::new("piston")));
            assert_eq!(
                condition,
                gridscript_core::DeviceCondition::Compare {
                    property: Some(PropertyId::new("height")),
                    direction: None,
                    comparison: Comparison::Greater,
                    value: var(5.0),
                }
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_condition_before_body() {
    let cmd = parse(vec![
        Param::IfTok {
            always_evaluate: false,
            inverse: false,
            swap: false,
        },
        Param::Bool(true),
        Param::PrintTok,
        Param::word("yes"),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::conditional(
            Variable::boolean(true),
            CommandDef::Print(Variable::Ambiguous("yes".into())),
            CommandDef::Null,
            false,
        )
    );
}

#[test]
fn test_if_condition_after_body() {
    // print yes if true
    let cmd = parse(vec![
        Param::PrintTok,
        Param::word("yes"),
        Param::IfTok {
            always_evaluate: false,
            inverse: false,
            swap: false,
        },
        Param::Bool(true),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::conditional(
            Variable::boolean(true),
            CommandDef::Print(Variable::Ambiguous("yes".into())),
            CommandDef::Null,
            false,
        )
    );
}

#[test]
fn test_unless_swaps_branches() {
    let cmd = parse(vec![
        Param::IfTok {
            always_evaluate: false,
            inverse: false,
            swap: true,
        },
        Param::Bool(true),
        Param::PrintTok,
        Param::word("no"),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::conditional(
            Variable::boolean(true),
            CommandDef::Null,
            CommandDef::Print(Variable::Ambiguous("no".into())),
            false,
        )
    );
}

#[test]
fn test_if_else() {
    let cmd = parse(vec![
        Param::IfTok {
            always_evaluate: false,
            inverse: false,
            swap: false,
        },
        Param::Bool(true),
        Param::PrintTok,
        Param::word("a"),
        Param::ElseTok,
        Param::PrintTok,
        Param::word("b"),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::conditional(
            Variable::boolean(true),
            CommandDef::Print(Variable::Ambiguous("a".into())),
            CommandDef::Print(Variable::Ambiguous("b".into())),
            false,
        )
    );
}

#[test]
fn test_else_if_chain_folds_inner_conditional_first() {
    let cmd = parse(vec![
        Param::IfTok {
            always_evaluate: false,
            inverse: false,
            swap: false,
        },
        Param::Bool(true),
        Param::PrintTok,
        Param::word("a"),
        Param::ElseTok,
        Param::IfTok {
            always_evaluate: false,
            inverse: false,
            swap: false,
        },
        Param::Bool(false),
        Param::PrintTok,
        Param::word("b"),
        Param::ElseTok,
        Param::PrintTok,
        Param::word("c"),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::conditional(
            Variable::boolean(true),
            CommandDef::Print(Variable::Ambiguous("a".into())),
            CommandDef::conditional(
                Variable::boolean(false),
                CommandDef::Print(Variable::Ambiguous("b".into())),
                CommandDef::Print(Variable::Ambiguous("c".into())),
                false,
            ),
            false,
        )
    );
}

#[test]
fn test_iteration_wraps_command_in_counted_sequence() {
    // print a 3 times
    let cmd = parse(vec![
        Param::PrintTok,
        Param::word("a"),
        num(3.0),
        Param::IterateTok,
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Sequence {
            steps: vec![CommandDef::Print(Variable::Ambiguous("a".into()))],
            count: var(3.0),
        }
    );
}

#[test]
fn test_queue_wraps_command() {
    let cmd = parse(vec![
        Param::QueueTok { concurrent: true },
        Param::PrintTok,
        Param::word("a"),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Queue {
            command: Box::new(CommandDef::Print(Variable::Ambiguous("a".into()))),
            concurrent: true,
        }
    );
}

// ============================================================================
// Functions and messaging
// ============================================================================

#[test]
fn test_unknown_function_is_an_error() {
    let result = parse(vec![
        Param::FunctionTok(CallMode::Call),
        Param::word("missing"),
    ]);
    assert!(matches!(result, Err(ParseError::UnknownFunction(name)) if name == "missing"));
}

#[test]
fn test_function_call_binds_arguments_in_order() {
    let mut functions = FunctionTable::new();
    functions.insert(
        "move".into(),
        FunctionDef::new(
            "move",
            vec!["dx".into(), "dy".into()],
            CommandDef::Null,
        ),
    );
    let cmd = Parser::new()
        .parse(
            vec![
                Param::FunctionTok(CallMode::Call),
                Param::word("move"),
                num(1.0),
                num(2.0),
            ],
            &functions,
        )
        .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Function {
            name: "move".into(),
            mode: CallMode::Call,
            args: vec![("dx".into(), var(1.0)), ("dy".into(), var(2.0))],
        }
    );
}

#[test]
fn test_send_takes_message_then_tag() {
    let cmd = parse(vec![
        Param::SendTok,
        Param::explicit_string("hi"),
        Param::explicit_string("chat"),
    ])
    .unwrap();
    assert_eq!(
        cmd,
        CommandDef::Send {
            message: Variable::Static(Primitive::String("hi".into())),
            tag: Variable::Static(Primitive::String("chat".into())),
        }
    );
}

#[test]
fn test_listen() {
    let cmd = parse(vec![Param::ListenTok, Param::explicit_string("chat")]).unwrap();
    assert_eq!(
        cmd,
        CommandDef::Listen {
            tag: Variable::Static(Primitive::String("chat".into())),
        }
    );
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_parse_is_deterministic() {
    let tokens = || {
        vec![
            Param::AssignTok {
                by_reference: false,
            },
            Param::word("x"),
            Param::OpenBracket,
            num(0.0),
            Param::CloseBracket,
            num(5.0),
        ]
    };
    let first = parse(tokens()).unwrap();
    for _ in 0..10 {
        assert_eq!(parse(tokens()).unwrap(), first);
    }
}
