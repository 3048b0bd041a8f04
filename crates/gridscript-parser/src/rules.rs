//! The standard reduction table
//!
//! Processors are listed in binding order; a processor's rank is its index
//! here. Earlier entries get first refusal after every fold, so structural
//! groups reduce before selectors, selectors before expressions, and
//! expressions before whole commands.

use crate::engine::{ParseCx, Processor};
use crate::error::{ParseError, ParseResult};
use crate::slot::{
    multi_right, optional_either, optional_left, optional_right, required_either, required_left,
    required_right, Captures, Rule,
};
use gridscript_core::{
    BinaryOp, CommandDef, Comparison, DeviceAction, DeviceCondition, DeviceType, Direction, Param,
    ParamKind, PropertyAggregate, PropertyId, PropertySpec, Quantifier, Selector, TimeUnit,
    Variable,
};

pub fn standard_rules() -> Vec<Processor> {
    vec![
        Processor::Parenthesis,
        Processor::List,
        // A bare word is a named selector when a device type qualifies it,
        // in the window or inside the word's own subtokens. Otherwise it
        // stays a string, which later promotes to an ambiguous variable.
        Processor::Branch(vec![
            Rule::new(
                "selectorFromWord",
                ParamKind::Word,
                vec![
                    optional_right(ParamKind::DeviceType),
                    optional_right(ParamKind::Group),
                ],
                |trigger, mut c, _| {
                    let device_type = device_type(req(&mut c, 0));
                    let group = c.has(1);
                    Ok(Param::SelectorTok(Selector::named(
                        Some(device_type),
                        group,
                        Variable::string(word_text(trigger)),
                    )))
                },
            )
            .with_guard(|trigger, c| {
                if !c.has(0) {
                    if let Param::Word { subtokens, .. } = trigger {
                        if let Some(t) = subtokens
                            .iter()
                            .rfind(|p| p.kind() == ParamKind::DeviceType)
                        {
                            c.set(0, t.clone());
                        }
                        if let Some(g) = subtokens.iter().rfind(|p| p.kind() == ParamKind::Group) {
                            c.set(1, g.clone());
                        }
                    }
                }
                c.has(0)
            }),
            Rule::new("wordAsString", ParamKind::Word, vec![], |trigger, _, _| {
                Ok(Param::implicit_string(word_text(trigger)))
            }),
        ]),
        Processor::Rule(Rule::new(
            "selfSelector",
            ParamKind::SelfRef,
            vec![optional_right(ParamKind::DeviceType)],
            |_, mut c, _| {
                Ok(Param::SelectorTok(Selector::SelfRef(
                    c.take(0).map(device_type),
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "variableSelector",
            ParamKind::VarSelector,
            vec![
                optional_right(ParamKind::DeviceType),
                optional_right(ParamKind::Group),
            ],
            |trigger, mut c, _| {
                let Param::VarSelector(name) = trigger else {
                    unreachable!()
                };
                let group = c.has(1);
                Ok(Param::SelectorTok(Selector::named(
                    c.take(0).map(device_type),
                    group,
                    name,
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "allOfTypeSelector",
            ParamKind::DeviceType,
            vec![optional_right(ParamKind::Group)],
            |trigger, _, _| Ok(Param::SelectorTok(Selector::All(device_type(trigger)))),
        )),
        Processor::Rule(Rule::new(
            "indexQualifier",
            ParamKind::Index,
            vec![required_right(ParamKind::Variable)],
            |_, mut c, _| Ok(Param::IndexValueTok(variable(req(&mut c, 0)))),
        )),
        Processor::Rule(Rule::new(
            "filteredSelector",
            ParamKind::With,
            vec![
                required_left(ParamKind::Selector),
                required_right(ParamKind::DeviceCondition),
            ],
            |_, mut c, _| {
                Ok(Param::SelectorTok(Selector::filtered(
                    selector(req(&mut c, 0)),
                    condition(req(&mut c, 1)),
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "indexedSelector",
            ParamKind::IndexValue,
            vec![required_left(ParamKind::Selector)],
            |trigger, mut c, _| {
                let Param::IndexValueTok(index) = trigger else {
                    unreachable!()
                };
                Ok(Param::SelectorTok(Selector::indexed(
                    selector(req(&mut c, 0)),
                    index,
                )))
            },
        )),
        // What a bracket group means depends on its left neighbor: index
        // into a named list, a computed list, or a selector; or a bare
        // list literal when nothing claims it.
        Processor::Branch(vec![
            Rule::new(
                "namedListIndex",
                ParamKind::List,
                vec![required_left(ParamKind::Str)],
                |trigger, mut c, _| {
                    Ok(Param::ListIndexTok {
                        list: Variable::Named(text(req(&mut c, 0))),
                        index: list_value(trigger),
                    })
                },
            ),
            Rule::new(
                "variableListIndex",
                ParamKind::List,
                vec![required_left(ParamKind::Variable)],
                |trigger, mut c, _| {
                    Ok(Param::ListIndexTok {
                        list: variable(req(&mut c, 0)),
                        index: list_value(trigger),
                    })
                },
            ),
            Rule::new(
                "selectorListIndex",
                ParamKind::List,
                vec![required_left(ParamKind::Selector)],
                |trigger, mut c, _| {
                    Ok(Param::SelectorTok(Selector::indexed(
                        selector(req(&mut c, 0)),
                        list_value(trigger),
                    )))
                },
            ),
            Rule::new(
                "nestedListIndex",
                ParamKind::List,
                vec![required_left(ParamKind::ListIndex)],
                |trigger, mut c, _| {
                    Ok(Param::ListIndexTok {
                        list: list_index_variable(req(&mut c, 0)),
                        index: list_value(trigger),
                    })
                },
            ),
            Rule::new("bareList", ParamKind::List, vec![], |trigger, _, _| {
                Ok(Param::ListIndexTok {
                    list: list_value(trigger),
                    index: Variable::ListOf(Vec::new()),
                })
            }),
        ]),
        Processor::Ignore,
        Processor::Rule(Rule::new(
            "functionReference",
            ParamKind::Function,
            vec![required_right(ParamKind::Str)],
            |trigger, mut c, cx| {
                let Param::FunctionTok(mode) = trigger else {
                    unreachable!()
                };
                let name = text(req(&mut c, 0));
                match cx.functions.get(&name) {
                    Some(def) => Ok(Param::FunctionRef {
                        mode,
                        def: def.clone(),
                    }),
                    None => Err(ParseError::UnknownFunction(name)),
                }
            },
        )),
        Processor::Rule(Rule::new(
            "assignNamed",
            ParamKind::Assign,
            vec![
                optional_right(ParamKind::Global),
                required_right(ParamKind::Str),
            ],
            |trigger, mut c, _| {
                let Param::AssignTok { by_reference } = trigger else {
                    unreachable!()
                };
                let global = c.has(0);
                Ok(Param::AssignRef {
                    name: text(req(&mut c, 1)),
                    global,
                    by_reference,
                })
            },
        )),
        // assignment through an already-promoted list index expression
        Processor::Rule(
            Rule::new(
                "assignListElementVariable",
                ParamKind::Assign,
                vec![
                    required_right(ParamKind::Variable),
                    required_right(ParamKind::Variable),
                ],
                |_, mut c, _| {
                    let Variable::ListIndex { list, index } = variable(req(&mut c, 0)) else {
                        unreachable!()
                    };
                    Ok(Param::CommandRef(CommandDef::AssignListIndex {
                        list: *list,
                        index: *index,
                        value: variable(req(&mut c, 1)),
                    }))
                },
            )
            .with_guard(|_, c| {
                matches!(
                    c.single(0),
                    Some(Param::VariableTok(Variable::ListIndex { .. }))
                ) && c.has(1)
            }),
        ),
        Processor::Rule(
            Rule::new(
                "assignNamedVariable",
                ParamKind::Assign,
                vec![
                    optional_right(ParamKind::Global),
                    required_right(ParamKind::Variable),
                ],
                |trigger, mut c, _| {
                    let Param::AssignTok { by_reference } = trigger else {
                        unreachable!()
                    };
                    let global = c.has(0);
                    let Variable::Named(name) = variable(req(&mut c, 1)) else {
                        unreachable!()
                    };
                    Ok(Param::AssignRef {
                        name,
                        global,
                        by_reference,
                    })
                },
            )
            .with_guard(|_, c| {
                matches!(c.single(1), Some(Param::VariableTok(Variable::Named(_))))
            }),
        ),
        Processor::Rule(Rule::new(
            "assignListElement",
            ParamKind::Assign,
            vec![
                required_right(ParamKind::ListIndex),
                required_right(ParamKind::Variable),
            ],
            |_, mut c, _| {
                let Param::ListIndexTok { list, index } = req(&mut c, 0) else {
                    unreachable!()
                };
                Ok(Param::CommandRef(CommandDef::AssignListIndex {
                    list,
                    index,
                    value: variable(req(&mut c, 1)),
                }))
            },
        )),
        Processor::Primitive,
        // "is not <" folds to ">=", "is <" to "<"
        Processor::Rule(Rule::new(
            "comparisonInverse",
            ParamKind::Comparison,
            vec![required_either(ParamKind::Not)],
            |trigger, _, _| {
                let Param::ComparisonTok(comparison) = trigger else {
                    unreachable!()
                };
                Ok(Param::ComparisonTok(comparison.inverse()))
            },
        )),
        Processor::Rule(Rule::new(
            "comparisonChain",
            ParamKind::Comparison,
            vec![required_right(ParamKind::Comparison)],
            |_, mut c, _| Ok(Param::ComparisonTok(comparison(req(&mut c, 0)))),
        )),
        Processor::Rule(Rule::new(
            "unaryOperation",
            ParamKind::Unary,
            vec![required_right(ParamKind::Variable)],
            |trigger, mut c, _| {
                let Param::UnaryTok(op) = trigger else {
                    unreachable!()
                };
                Ok(Param::VariableTok(Variable::Unary {
                    op,
                    operand: Box::new(variable(req(&mut c, 0))),
                }))
            },
        )),
        Processor::Rule(binary_rule("binaryTier1", ParamKind::Binary1)),
        Processor::Rule(binary_rule("binaryTier2", ParamKind::Binary2)),
        Processor::Rule(binary_rule("binaryTier3", ParamKind::Binary3)),
        Processor::Rule(Rule::new(
            "andVariables",
            ParamKind::And,
            vec![
                required_left(ParamKind::Variable),
                required_right(ParamKind::Variable),
            ],
            |_, mut c, _| {
                Ok(Param::VariableTok(Variable::binary(
                    BinaryOp::And,
                    variable(req(&mut c, 0)),
                    variable(req(&mut c, 1)),
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "andConditions",
            ParamKind::And,
            vec![
                required_left(ParamKind::DeviceCondition),
                required_right(ParamKind::DeviceCondition),
            ],
            |_, mut c, _| {
                Ok(Param::DeviceConditionTok(DeviceCondition::and(
                    condition(req(&mut c, 0)),
                    condition(req(&mut c, 1)),
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "orVariables",
            ParamKind::Or,
            vec![
                required_left(ParamKind::Variable),
                required_right(ParamKind::Variable),
            ],
            |_, mut c, _| {
                Ok(Param::VariableTok(Variable::binary(
                    BinaryOp::Or,
                    variable(req(&mut c, 0)),
                    variable(req(&mut c, 1)),
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "orConditions",
            ParamKind::Or,
            vec![
                required_left(ParamKind::DeviceCondition),
                required_right(ParamKind::DeviceCondition),
            ],
            |_, mut c, _| {
                Ok(Param::DeviceConditionTok(DeviceCondition::or(
                    condition(req(&mut c, 0)),
                    condition(req(&mut c, 1)),
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "notVariable",
            ParamKind::Not,
            vec![required_right(ParamKind::Variable)],
            |_, mut c, _| {
                Ok(Param::VariableTok(Variable::not(variable(req(&mut c, 0)))))
            },
        )),
        Processor::Rule(Rule::new(
            "listAggregation",
            ParamKind::ListIndex,
            vec![required_left(ParamKind::Aggregate)],
            |trigger, mut c, _| {
                let Param::AggregateTok(aggregate) = req(&mut c, 0) else {
                    unreachable!()
                };
                Ok(Param::VariableTok(Variable::ListAggregate {
                    aggregate,
                    list: Box::new(list_index_variable(trigger)),
                }))
            },
        )),
        Processor::Rule(Rule::new(
            "variableComparison",
            ParamKind::Comparison,
            vec![
                required_left(ParamKind::Variable),
                required_right(ParamKind::Variable),
            ],
            |trigger, mut c, _| {
                let Param::ComparisonTok(comparison) = trigger else {
                    unreachable!()
                };
                Ok(Param::VariableTok(Variable::comparison(
                    comparison,
                    variable(req(&mut c, 0)),
                    variable(req(&mut c, 1)),
                )))
            },
        )),
        Processor::Rule(Rule::new(
            "listComparison",
            ParamKind::ListIndex,
            vec![
                required_right(ParamKind::Comparison),
                required_right(ParamKind::Variable),
                optional_left(ParamKind::Quantifier),
            ],
            |trigger, mut c, _| {
                let quantifier = c.take(2).map(quantifier).unwrap_or(Quantifier::All);
                Ok(Param::VariableTok(Variable::ListAggregateCondition {
                    quantifier,
                    list: Box::new(list_index_variable(trigger)),
                    comparison: comparison(req(&mut c, 0)),
                    value: Box::new(variable(req(&mut c, 1))),
                }))
            },
        )),
        // missing property defers to the handler's default at evaluation
        Processor::Rule(
            Rule::new(
                "deviceComparison",
                ParamKind::Comparison,
                vec![
                    optional_either(ParamKind::Property),
                    optional_either(ParamKind::Direction),
                    optional_right(ParamKind::Variable),
                ],
                |trigger, mut c, _| {
                    let Param::ComparisonTok(comparison) = trigger else {
                        unreachable!()
                    };
                    let value = c
                        .take(2)
                        .map(variable)
                        .unwrap_or_else(|| Variable::boolean(true));
                    Ok(Param::DeviceConditionTok(DeviceCondition::Compare {
                        property: c.take(0).map(property),
                        direction: c.take(1).map(direction),
                        comparison,
                        value,
                    }))
                },
            )
            .with_guard(|_, c| c.has(2) || c.has(0)),
        ),
        Processor::Rule(
            Rule::new(
                "propertyAggregation",
                ParamKind::Aggregate,
                vec![
                    required_either(ParamKind::Selector),
                    optional_either(ParamKind::Property),
                    optional_either(ParamKind::Direction),
                ],
                |trigger, mut c, _| {
                    let Param::AggregateTok(aggregate) = trigger else {
                        unreachable!()
                    };
                    Ok(Param::VariableTok(Variable::AggregateProperty {
                        aggregate,
                        selector: Box::new(selector(req(&mut c, 0))),
                        property: c.take(1).map(property),
                        direction: c.take(2).map(direction),
                    }))
                },
            )
            .with_guard(|_, c| c.has(0)),
        ),
        Processor::Rule(Rule::new(
            "aggregateCondition",
            ParamKind::DeviceCondition,
            vec![
                optional_left(ParamKind::Quantifier),
                required_left(ParamKind::Selector),
            ],
            |trigger, mut c, _| {
                let quantifier = c.take(0).map(quantifier).unwrap_or(Quantifier::All);
                Ok(Param::VariableTok(Variable::AggregateCondition {
                    quantifier,
                    condition: Box::new(condition(trigger)),
                    selector: Box::new(selector(req(&mut c, 1))),
                }))
            },
        )),
        Processor::Rule(Rule::new(
            "aggregateConditionAllOfType",
            ParamKind::DeviceCondition,
            vec![
                optional_left(ParamKind::Quantifier),
                required_left(ParamKind::DeviceType),
            ],
            |trigger, mut c, _| {
                let quantifier = c.take(0).map(quantifier).unwrap_or(Quantifier::All);
                Ok(Param::VariableTok(Variable::AggregateCondition {
                    quantifier,
                    condition: Box::new(condition(trigger)),
                    selector: Box::new(Selector::All(device_type(req(&mut c, 1)))),
                }))
            },
        )),
        // "any of the pistons" in selector position just selects; None
        // cannot, since a none-of set is not a set of entities
        Processor::Rule(
            Rule::new(
                "quantifiedSelector",
                ParamKind::Quantifier,
                vec![required_right(ParamKind::Selector)],
                |_, mut c, _| Ok(req(&mut c, 0)),
            )
            .with_guard(|trigger, c| {
                !matches!(trigger, Param::QuantifierTok(Quantifier::None)) && c.has(0)
            }),
        ),
        Processor::Rule(Rule::new(
            "iterationCount",
            ParamKind::Iterate,
            vec![required_left(ParamKind::Variable)],
            |_, mut c, _| Ok(Param::IterationTok(variable(req(&mut c, 0)))),
        )),
        Processor::Rule(Rule::new(
            "conditionFlag",
            ParamKind::If,
            vec![required_right(ParamKind::Variable)],
            |trigger, mut c, _| {
                let Param::IfTok {
                    always_evaluate,
                    inverse,
                    swap,
                } = trigger
                else {
                    unreachable!()
                };
                let mut condition = variable(req(&mut c, 0));
                if inverse {
                    condition = Variable::not(condition);
                }
                Ok(Param::ConditionTok {
                    condition,
                    always_evaluate,
                    swap,
                })
            },
        )),
        Processor::Rule(Rule::new(
            "transferFromLeft",
            ParamKind::Transfer,
            vec![
                required_left(ParamKind::Selector),
                required_right(ParamKind::Selector),
                required_right(ParamKind::Variable),
                optional_right(ParamKind::Variable),
            ],
            |trigger, mut c, _| {
                let Param::TransferTok { from_first } = trigger else {
                    unreachable!()
                };
                let left = selector(req(&mut c, 0));
                let right = selector(req(&mut c, 1));
                let (from, to) = if from_first { (left, right) } else { (right, left) };
                let (filter, amount) = filter_and_amount(&mut c, 2, 3);
                Ok(Param::CommandRef(CommandDef::Transfer {
                    from,
                    to,
                    filter,
                    amount,
                }))
            },
        )),
        Processor::Rule(Rule::new(
            "transferBothRight",
            ParamKind::Transfer,
            vec![
                required_right(ParamKind::Selector),
                required_right(ParamKind::Selector),
                required_right(ParamKind::Variable),
                optional_right(ParamKind::Variable),
            ],
            |_, mut c, _| {
                let from = selector(req(&mut c, 0));
                let to = selector(req(&mut c, 1));
                let (filter, amount) = filter_and_amount(&mut c, 2, 3);
                Ok(Param::CommandRef(CommandDef::Transfer {
                    from,
                    to,
                    filter,
                    amount,
                }))
            },
        )),
        Processor::Rule(Rule::new(
            "listIndexValue",
            ParamKind::ListIndex,
            vec![],
            |trigger, _, _| Ok(Param::VariableTok(list_index_variable(trigger))),
        )),
        // The widest rule in the table: a selector plus any mix of
        // assignment/relative/value/property/direction/reverse/not tokens
        // picks the device action the combination implies.
        Processor::Rule(
            Rule::new(
                "deviceAction",
                ParamKind::Selector,
                vec![
                    required_either(ParamKind::Assign),
                    required_either(ParamKind::Relative),
                    required_either(ParamKind::Variable),
                    required_either(ParamKind::Property),
                    required_either(ParamKind::Direction),
                    required_either(ParamKind::Reverse),
                    required_either(ParamKind::Not),
                ],
                |trigger, mut c, _| {
                    let target = selector(trigger);
                    let assignment = c.has(0);
                    let relative = c.has(1);
                    let value_var = c.take(2).map(variable);
                    let named = c.take(3).map(property);
                    let dir = c.take(4).map(direction);
                    let reverse = c.has(5);
                    let negate = c.has(6);

                    let property = if let Some(p) = named {
                        PropertySpec::Named(p)
                    } else if let Some(d) = dir {
                        PropertySpec::ForDirection(d)
                    } else if value_var.is_some() {
                        PropertySpec::ForValue
                    } else if negate {
                        PropertySpec::ForBoolean
                    } else {
                        PropertySpec::Primary
                    };

                    let mut value = value_var
                        .clone()
                        .unwrap_or_else(|| Variable::boolean(true));
                    if negate {
                        value = Variable::not(value);
                    }

                    let action = if reverse {
                        DeviceAction::Reverse { property }
                    } else if relative {
                        DeviceAction::Increment {
                            property,
                            direction: dir,
                            amount: value,
                        }
                    } else if value_var.is_some() && dir.is_some() {
                        DeviceAction::Set {
                            property,
                            direction: dir,
                            value,
                        }
                    } else if let (true, Some(direction)) = (assignment, dir) {
                        DeviceAction::Move {
                            property,
                            direction,
                        }
                    } else {
                        DeviceAction::Set {
                            property,
                            direction: None,
                            value,
                        }
                    };
                    Ok(Param::CommandRef(CommandDef::Device {
                        selector: target,
                        action,
                    }))
                },
            )
            .with_guard(|_, c| c.has(0) || c.has(1) || c.has(2) || c.has(5) || c.has(6)),
        ),
        // A selector next to a bare property or direction is ambiguous:
        // reading the property as a value, or nudging the device.
        Processor::Branch(vec![
            Rule::new(
                "selectorPropertyValue",
                ParamKind::Selector,
                vec![
                    required_either(ParamKind::Property),
                    optional_either(ParamKind::Direction),
                ],
                |trigger, mut c, _| {
                    Ok(Param::VariableTok(Variable::AggregateProperty {
                        aggregate: PropertyAggregate::Value,
                        selector: Box::new(selector(trigger)),
                        property: Some(property(req(&mut c, 0))),
                        direction: c.take(1).map(direction),
                    }))
                },
            ),
            Rule::new(
                "selectorImplicitAction",
                ParamKind::Selector,
                vec![
                    optional_either(ParamKind::Property),
                    optional_either(ParamKind::Direction),
                ],
                |trigger, mut c, _| {
                    let named = c.take(0).map(property);
                    let action = match c.take(1).map(direction) {
                        Some(dir) => DeviceAction::Move {
                            property: named
                                .map(PropertySpec::Named)
                                .unwrap_or(PropertySpec::ForDirection(dir)),
                            direction: dir,
                        },
                        None => DeviceAction::Set {
                            property: named.map(PropertySpec::Named).unwrap_or(PropertySpec::Primary),
                            direction: None,
                            value: Variable::boolean(true),
                        },
                    };
                    Ok(Param::CommandRef(CommandDef::Device {
                        selector: selector(trigger),
                        action,
                    }))
                },
            )
            .with_guard(|_, c| c.has(0) || c.has(1)),
        ]),
        Processor::Rule(Rule::new(
            "printCommand",
            ParamKind::Print,
            vec![required_right(ParamKind::Variable)],
            |_, mut c, _| {
                Ok(Param::CommandRef(CommandDef::Print(variable(req(
                    &mut c, 0,
                )))))
            },
        )),
        // no duration -> one tick; bare duration -> seconds
        Processor::Rule(Rule::new(
            "waitCommand",
            ParamKind::Wait,
            vec![
                optional_right(ParamKind::Variable),
                optional_right(ParamKind::Unit),
            ],
            |_, mut c, _| {
                let unit = match c.take(1) {
                    Some(Param::UnitTok(unit)) => unit,
                    Some(_) => unreachable!(),
                    None if c.has(0) => TimeUnit::Seconds,
                    None => TimeUnit::Ticks,
                };
                let duration = c
                    .take(0)
                    .map(variable)
                    .unwrap_or_else(|| Variable::number(1.0));
                Ok(Param::CommandRef(CommandDef::Wait { duration, unit }))
            },
        )),
        Processor::Rule(
            Rule::new(
                "functionCall",
                ParamKind::FunctionRef,
                vec![multi_right(ParamKind::Variable)],
                |trigger, mut c, _| {
                    let Param::FunctionRef { mode, def } = trigger else {
                        unreachable!()
                    };
                    let args = def
                        .parameters
                        .iter()
                        .cloned()
                        .zip(c.take_all(0).into_iter().map(variable))
                        .collect();
                    Ok(Param::CommandRef(CommandDef::Function {
                        name: def.name,
                        mode,
                        args,
                    }))
                },
            )
            .with_guard(|trigger, c| match trigger {
                Param::FunctionRef { def, .. } => c.count(0) == def.parameters.len(),
                _ => false,
            }),
        ),
        Processor::Rule(Rule::new(
            "variableAssignment",
            ParamKind::AssignRef,
            vec![required_right(ParamKind::Variable)],
            |trigger, mut c, _| {
                let Param::AssignRef {
                    name,
                    global,
                    by_reference,
                } = trigger
                else {
                    unreachable!()
                };
                Ok(Param::CommandRef(CommandDef::Assign {
                    name,
                    value: variable(req(&mut c, 0)),
                    global,
                    by_reference,
                }))
            },
        )),
        // the message always comes before the tag
        Processor::Rule(Rule::new(
            "sendCommand",
            ParamKind::Send,
            vec![
                required_right(ParamKind::Variable),
                required_right(ParamKind::Variable),
            ],
            |_, mut c, _| {
                Ok(Param::CommandRef(CommandDef::Send {
                    message: variable(req(&mut c, 0)),
                    tag: variable(req(&mut c, 1)),
                }))
            },
        )),
        Processor::Rule(Rule::new(
            "listenCommand",
            ParamKind::Listen,
            vec![required_right(ParamKind::Variable)],
            |_, mut c, _| {
                Ok(Param::CommandRef(CommandDef::Listen {
                    tag: variable(req(&mut c, 0)),
                }))
            },
        )),
        Processor::Rule(Rule::new(
            "controlCommand",
            ParamKind::Control,
            vec![],
            |trigger, _, _| {
                let Param::ControlTok(kind) = trigger else {
                    unreachable!()
                };
                Ok(Param::CommandRef(CommandDef::Control(kind)))
            },
        )),
        Processor::Rule(Rule::new(
            "iteratedCommand",
            ParamKind::Iteration,
            vec![required_either(ParamKind::Command)],
            |trigger, mut c, _| {
                let Param::IterationTok(count) = trigger else {
                    unreachable!()
                };
                Ok(Param::CommandRef(CommandDef::Sequence {
                    steps: vec![command(req(&mut c, 0))],
                    count,
                }))
            },
        )),
        Processor::Rule(Rule::new(
            "queuedCommand",
            ParamKind::Queue,
            vec![required_right(ParamKind::Command)],
            |trigger, mut c, _| {
                let Param::QueueTok { concurrent } = trigger else {
                    unreachable!()
                };
                Ok(Param::CommandRef(CommandDef::Queue {
                    command: Box::new(command(req(&mut c, 0))),
                    concurrent,
                }))
            },
        )),
        // An else with no second command is not reducible yet; failing
        // here lets an else-if chain fold its inner conditional first.
        Processor::Rule(
            Rule::new(
                "conditionalRight",
                ParamKind::Condition,
                vec![
                    required_right(ParamKind::Command),
                    optional_right(ParamKind::Else),
                    optional_right(ParamKind::Command),
                ],
                convert_conditional,
            )
            .with_guard(conditional_guard),
        ),
        Processor::Rule(
            Rule::new(
                "conditionalLeft",
                ParamKind::Condition,
                vec![
                    required_left(ParamKind::Command),
                    optional_right(ParamKind::Else),
                    optional_right(ParamKind::Command),
                ],
                convert_conditional,
            )
            .with_guard(conditional_guard),
        ),
    ]
}

fn binary_rule(name: &'static str, kind: ParamKind) -> Rule {
    Rule::new(
        name,
        kind,
        vec![
            required_left(ParamKind::Variable),
            required_right(ParamKind::Variable),
        ],
        |trigger, mut c, _| {
            let op = match trigger {
                Param::Binary1Tok(op) | Param::Binary2Tok(op) | Param::Binary3Tok(op) => op,
                _ => unreachable!(),
            };
            Ok(Param::VariableTok(Variable::binary(
                op,
                variable(req(&mut c, 0)),
                variable(req(&mut c, 1)),
            )))
        },
    )
}

fn conditional_guard(_: &Param, c: &mut Captures) -> bool {
    c.has(0) && (!c.has(1) || c.has(2))
}

fn convert_conditional(trigger: Param, mut c: Captures, _: &ParseCx<'_>) -> ParseResult<Param> {
    let Param::ConditionTok {
        condition,
        always_evaluate,
        swap,
    } = trigger
    else {
        unreachable!()
    };
    let mut when_met = command(req(&mut c, 0));
    let mut when_unmet = match (c.has(1), c.take(2)) {
        (true, Some(p)) => command(p),
        _ => CommandDef::Null,
    };
    if swap {
        std::mem::swap(&mut when_met, &mut when_unmet);
    }
    Ok(Param::CommandRef(CommandDef::conditional(
        condition,
        when_met,
        when_unmet,
        always_evaluate,
    )))
}

fn filter_and_amount(c: &mut Captures, first: usize, second: usize) -> (Variable, Option<Variable>) {
    let value = variable(req(c, first));
    match c.take(second).map(variable) {
        Some(filter) => (filter, Some(value)),
        None => (value, None),
    }
}

// Slot extractors. Slot kinds guarantee the variants below; a mismatch is
// a bug in the rule table.

fn req(c: &mut Captures, slot: usize) -> Param {
    match c.take(slot) {
        Some(p) => p,
        None => unreachable!("required slot is captured"),
    }
}

fn word_text(p: Param) -> String {
    match p {
        Param::Word { text, .. } => text,
        _ => unreachable!(),
    }
}

fn text(p: Param) -> String {
    match p {
        Param::Str { text, .. } => text,
        _ => unreachable!(),
    }
}

fn variable(p: Param) -> Variable {
    match p {
        Param::VariableTok(v) => v,
        _ => unreachable!(),
    }
}

fn selector(p: Param) -> Selector {
    match p {
        Param::SelectorTok(s) => s,
        _ => unreachable!(),
    }
}

fn condition(p: Param) -> DeviceCondition {
    match p {
        Param::DeviceConditionTok(c) => c,
        _ => unreachable!(),
    }
}

fn command(p: Param) -> CommandDef {
    match p {
        Param::CommandRef(c) => c,
        _ => unreachable!(),
    }
}

fn device_type(p: Param) -> DeviceType {
    match p {
        Param::DeviceTypeTok(t) => t,
        _ => unreachable!(),
    }
}

fn property(p: Param) -> PropertyId {
    match p {
        Param::PropertyTok(id) => id,
        _ => unreachable!(),
    }
}

fn direction(p: Param) -> Direction {
    match p {
        Param::DirectionTok(d) => d,
        _ => unreachable!(),
    }
}

fn comparison(p: Param) -> Comparison {
    match p {
        Param::ComparisonTok(c) => c,
        _ => unreachable!(),
    }
}

fn quantifier(p: Param) -> Quantifier {
    match p {
        Param::QuantifierTok(q) => q,
        _ => unreachable!(),
    }
}

fn list_value(p: Param) -> Variable {
    match p {
        Param::ListTok(v) => v,
        _ => unreachable!(),
    }
}

fn list_index_variable(p: Param) -> Variable {
    match p {
        Param::ListIndexTok { list, index } => Variable::ListIndex {
            list: Box::new(list),
            index: Box::new(index),
        },
        _ => unreachable!(),
    }
}
