//! The polyreach model format parser
//!
//! The parser uses the [pest](https://pest.rs/) parser generator with the
//! grammar defined in `model_format.pest`. Arithmetic expressions and STL
//! formulas are assembled with a Pratt parser; every mentioned symbol is
//! checked against the declarations, so undeclared names fail at parse
//! time with a readable message.

use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Error};
use lazy_static::lazy_static;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use polyreach_algebra::{Polynomial, Symbol};
use polyreach_engine::{
    build_model, DynamicsKind, IntegratorKind, Model, ModelData, ProblemType,
};
use polyreach_geometry::TransformMode;
use polyreach_stl::{StlFormula, TimeInterval};

use crate::ParseModel;

#[derive(Parser)]
#[grammar = "model_format.pest"]
struct PestModelParser;

lazy_static! {
    static ref EXPR_PARSER: PrattParser<Rule> = {
        // ops registered first bind weakest
        PrattParser::new()
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left))
            .op(Op::prefix(Rule::neg))
            .op(Op::postfix(Rule::pow))
    };
    static ref STL_PARSER: PrattParser<Rule> = {
        PrattParser::new()
            .op(Op::infix(Rule::until_op, Assoc::Right))
            .op(Op::infix(Rule::or_op, Assoc::Left))
            .op(Op::infix(Rule::and_op, Assoc::Left))
    };
}

/// Parser of the polyreach model format
pub struct ModelFormatParser;

impl ParseModel for ModelFormatParser {
    fn parse_model(&self, input: &str) -> Result<Model, Error> {
        let data = parse_model_data(input)?;
        Ok(build_model(data)?)
    }
}

/// Parse the raw model description without building it
pub fn parse_model_data(input: &str) -> Result<ModelData, Error> {
    let file = PestModelParser::parse(Rule::file, input)
        .map_err(|e| anyhow!("{e}"))?
        .next()
        .expect("the file rule matches exactly once");

    let statements: Vec<Pair<Rule>> = file
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .collect();

    // first pass: declarations, so laws may mention symbols declared later
    let mut variables: Vec<(Symbol, Option<(f64, f64)>)> = Vec::new();
    let mut parameters: Vec<(Symbol, Option<(f64, f64)>)> = Vec::new();
    for statement in &statements {
        match statement.as_rule() {
            Rule::var_stmt => {
                let mut inner = statement.clone().into_inner();
                let name = inner.next().expect("var name").as_str();
                let bounds = inner.next().map(parse_range).transpose()?;
                variables.push((Symbol::new(name), bounds));
            }
            Rule::param_stmt => {
                let mut inner = statement.clone().into_inner();
                let name = inner.next().expect("param name").as_str();
                let bounds = parse_range(inner.next().expect("param range"))?;
                parameters.push((Symbol::new(name), Some(bounds)));
            }
            _ => {}
        }
    }

    let variable_symbols: Vec<Symbol> = variables.iter().map(|(v, _)| v.clone()).collect();
    let mut declared: BTreeSet<Symbol> = variable_symbols.iter().cloned().collect();
    declared.extend(parameters.iter().map(|(p, _)| p.clone()));

    let mut data = ModelData::new(Vec::new());
    data.variables = variables;
    data.parameters = parameters;

    // second pass: everything referring to the declarations
    for statement in statements {
        match statement.as_rule() {
            Rule::var_stmt | Rule::param_stmt => {}

            Rule::problem_stmt => {
                let kind = statement.into_inner().next().expect("problem kind");
                data.problem = match kind.as_str() {
                    "reachability" => ProblemType::Reach,
                    "synthesis" => ProblemType::Synth,
                    other => bail!("Unknown problem kind '{other}'"),
                };
            }

            Rule::iterations_stmt => {
                let n = statement.into_inner().next().expect("iteration count");
                data.options.horizon = parse_integer(&n)?;
            }

            Rule::dynamic_stmt => {
                let mut inner = statement.into_inner();
                let target = Symbol::new(inner.next().expect("dynamic target").as_str());
                if !data.variables.iter().any(|(v, _)| *v == target) {
                    bail!("dynamic({target}) does not match a declared variable");
                }
                let law = parse_expr(inner.next().expect("dynamic law").into_inner(), &declared)?;
                data.dynamics.insert(target, law);
            }

            Rule::direction_stmt => {
                let mut inner = statement.into_inner();
                let expression =
                    parse_expr(inner.next().expect("direction").into_inner(), &declared)?;
                let (lower, upper) = parse_range(inner.next().expect("direction range"))?;
                let (coefficients, constant) = expression
                    .to_affine(&variable_symbols)
                    .map_err(|e| anyhow!("direction must be linear in the variables: {e}"))?;
                if constant != 0.0 {
                    bail!("a direction must have no constant term (put it in the bounds)");
                }
                data.directions.push((coefficients, lower, upper));
            }

            Rule::template_stmt => {
                let row: Vec<usize> = statement
                    .into_inner()
                    .map(|p| parse_integer(&p).map(|n| n as usize))
                    .collect::<Result<_, _>>()?;
                data.templates.push(row);
            }

            Rule::adaptive_stmt => {
                for p in statement.into_inner() {
                    data.adaptive.insert(parse_integer(&p)? as usize);
                }
            }

            Rule::spec_stmt => {
                let stl = statement.into_inner().next().expect("specification");
                data.specification = Some(parse_stl(stl.into_inner(), &variable_symbols)?);
            }

            Rule::assume_stmt => {
                let constraint = statement.into_inner().next().expect("assumption");
                data.assumptions
                    .push(parse_constraint(constraint, &variable_symbols)?);
            }

            Rule::invariant_stmt => {
                let constraint = statement.into_inner().next().expect("invariant");
                data.invariants
                    .push(parse_constraint(constraint, &variable_symbols)?);
            }

            Rule::option_stmt => {
                let option = statement.into_inner().next().expect("option body");
                parse_option(option, &mut data)?;
            }

            other => bail!("Unexpected statement {other:?}"),
        }
    }

    Ok(data)
}

/// Apply a single `option` statement to the model data
fn parse_option(option: Pair<Rule>, data: &mut ModelData) -> Result<(), Error> {
    match option.as_rule() {
        Rule::transformation_opt => {
            let mode = option.into_inner().next().expect("mode");
            data.options.transform_mode = match mode.as_str() {
                "OFO" => TransformMode::OneForOne,
                "AFO" => TransformMode::AllForOne,
                other => bail!("Unknown transformation mode '{other}'"),
            };
        }
        Rule::decomposition_opt => {
            let weight = option.into_inner().next().expect("weight");
            let weight = parse_number(&weight)?;
            if !(0.0..=1.0).contains(&weight) {
                bail!("the decomposition weight must lie in [0, 1]");
            }
            data.options.decomposition = Some(weight);
        }
        Rule::splits_opt => {
            let n = option.into_inner().next().expect("split count");
            data.options.max_param_splits = parse_integer(&n)?;
        }
        Rule::presplits_opt => {
            let n = option.into_inner().next().expect("presplit count");
            data.options.presplits = parse_integer(&n)?;
        }
        Rule::step_opt => {
            let step = option.into_inner().next().expect("step");
            data.options.integration_step = Some(parse_number(&step)?);
        }
        Rule::integrator_opt => {
            let kind = option.into_inner().next().expect("integrator kind");
            data.options.integrator = Some(match kind.as_str() {
                "euler" => IntegratorKind::Euler,
                "rk4" => IntegratorKind::RungeKutta4,
                other => bail!("Unknown integrator '{other}'"),
            });
        }
        Rule::compose_opt => {
            let degree = option.into_inner().next().expect("compose degree");
            let degree = parse_integer(&degree)?;
            if degree == 0 {
                bail!("the composition degree must be at least 1");
            }
            data.options.compose_degree = degree;
        }
        Rule::dynamics_opt => {
            let kind = option.into_inner().next().expect("dynamics kind");
            data.kind = match kind.as_str() {
                "discrete" => DynamicsKind::Discrete,
                "ode" => DynamicsKind::Ode,
                other => bail!("Unknown dynamics kind '{other}'"),
            };
        }
        other => bail!("Unexpected option {other:?}"),
    }
    Ok(())
}

fn parse_number(pair: &Pair<Rule>) -> Result<f64, Error> {
    pair.as_str()
        .parse::<f64>()
        .map_err(|e| anyhow!("Invalid number '{}': {e}", pair.as_str()))
}

fn parse_integer(pair: &Pair<Rule>) -> Result<u32, Error> {
    pair.as_str()
        .parse::<u32>()
        .map_err(|e| anyhow!("Invalid integer '{}': {e}", pair.as_str()))
}

fn parse_range(pair: Pair<Rule>) -> Result<(f64, f64), Error> {
    let mut inner = pair.into_inner();
    let lower = parse_number(&inner.next().expect("range lower bound"))?;
    let upper = parse_number(&inner.next().expect("range upper bound"))?;
    if lower > upper {
        bail!("Range [{lower}, {upper}] has its bounds reversed");
    }
    Ok((lower, upper))
}

/// Pratt-parse an arithmetic expression into a polynomial
fn parse_expr(pairs: Pairs<Rule>, declared: &BTreeSet<Symbol>) -> Result<Polynomial, Error> {
    EXPR_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::number => parse_number(&primary).map(Polynomial::constant),
            Rule::ident => {
                let symbol = Symbol::new(primary.as_str());
                if !declared.contains(&symbol) {
                    bail!("Unknown symbol '{symbol}'");
                }
                Ok(Polynomial::variable(symbol))
            }
            Rule::expr => parse_expr(primary.into_inner(), declared),
            rule => unreachable!("unexpected expression primary {rule:?}"),
        })
        .map_prefix(|op, value| match op.as_rule() {
            Rule::neg => Ok(-value?),
            rule => unreachable!("unexpected prefix {rule:?}"),
        })
        .map_postfix(|value, op| match op.as_rule() {
            Rule::pow => {
                let exponent =
                    parse_integer(&op.into_inner().next().expect("exponent"))?;
                Ok(value?.pow(exponent))
            }
            rule => unreachable!("unexpected postfix {rule:?}"),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::add => Ok(lhs? + rhs?),
            Rule::sub => Ok(lhs? - rhs?),
            Rule::mul => Ok(lhs? * rhs?),
            rule => unreachable!("unexpected operator {rule:?}"),
        })
        .parse(pairs)
}

/// A constraint `lhs <= rhs` as the polynomial `lhs - rhs ≤ 0`
fn parse_constraint(pair: Pair<Rule>, variables: &[Symbol]) -> Result<Polynomial, Error> {
    let declared: BTreeSet<Symbol> = variables.iter().cloned().collect();
    let mut inner = pair.into_inner();
    let lhs = parse_expr(inner.next().expect("constraint lhs").into_inner(), &declared)?;
    let rhs = parse_expr(inner.next().expect("constraint rhs").into_inner(), &declared)?;
    Ok(lhs - rhs)
}

fn parse_interval(pair: Pair<Rule>) -> Result<TimeInterval, Error> {
    let mut inner = pair.into_inner();
    let begin = parse_integer(&inner.next().expect("interval begin"))?;
    let end = parse_integer(&inner.next().expect("interval end"))?;
    Ok(TimeInterval::new(begin, end)?)
}

/// Pratt-parse an STL formula
fn parse_stl(pairs: Pairs<Rule>, variables: &[Symbol]) -> Result<StlFormula, Error> {
    STL_PARSER
        .map_primary(|primary| match primary.as_rule() {
            Rule::stl_unary => parse_stl_unary(primary, variables),
            rule => unreachable!("unexpected STL primary {rule:?}"),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::and_op => Ok(lhs? & rhs?),
            Rule::or_op => Ok(lhs? | rhs?),
            Rule::until_op => {
                let interval =
                    parse_interval(op.into_inner().next().expect("until interval"))?;
                Ok(StlFormula::until(interval, lhs?, rhs?))
            }
            rule => unreachable!("unexpected STL operator {rule:?}"),
        })
        .parse(pairs)
}

fn parse_stl_unary(pair: Pair<Rule>, variables: &[Symbol]) -> Result<StlFormula, Error> {
    let declared: BTreeSet<Symbol> = variables.iter().cloned().collect();
    let inner = pair.into_inner().next().expect("unary STL formula");
    match inner.as_rule() {
        Rule::stl_not => {
            let sub = inner.into_inner().next().expect("negated formula");
            Ok(!parse_stl_unary(sub, variables)?)
        }
        Rule::stl_paren => parse_stl(
            inner.into_inner().next().expect("formula").into_inner(),
            variables,
        ),
        Rule::always => {
            let mut parts = inner.into_inner();
            let interval = parse_interval(parts.next().expect("interval"))?;
            let sub = parse_stl(parts.next().expect("formula").into_inner(), variables)?;
            Ok(StlFormula::always(interval, sub))
        }
        Rule::eventually => {
            let mut parts = inner.into_inner();
            let interval = parse_interval(parts.next().expect("interval"))?;
            let sub = parse_stl(parts.next().expect("formula").into_inner(), variables)?;
            Ok(StlFormula::eventually(interval, sub))
        }
        Rule::stl_atom => {
            let mut parts = inner.into_inner();
            let lhs = parse_expr(parts.next().expect("atom lhs").into_inner(), &declared)?;
            let rhs = parse_expr(parts.next().expect("atom rhs").into_inner(), &declared)?;
            Ok(StlFormula::atom(lhs - rhs))
        }
        rule => unreachable!("unexpected STL node {rule:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expression() {
        let data = parse_model_data(
            "var x in [0, 1];\n\
             dynamic(x) = 2*x^2 - x + 1;\n",
        )
        .unwrap();
        let law = &data.dynamics[&Symbol::new("x")];
        assert_eq!(law.degree(&Symbol::new("x")), 2);
    }

    #[test]
    fn test_unknown_symbol_is_rejected() {
        let err = parse_model_data(
            "var x in [0, 1];\n\
             dynamic(x) = x + y;\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown symbol 'y'"));
    }

    #[test]
    fn test_dynamic_for_undeclared_variable() {
        let err = parse_model_data("dynamic(x) = 1;").unwrap_err();
        assert!(err.to_string().contains("does not match a declared variable"));
    }

    #[test]
    fn test_reversed_range() {
        let err = parse_model_data("var x in [1, 0];").unwrap_err();
        assert!(err.to_string().contains("reversed"));
    }

    #[test]
    fn test_parse_options() {
        let data = parse_model_data(
            "var x in [0, 1];\n\
             dynamic(x) = x;\n\
             option transformation AFO;\n\
             option max_param_splits 3;\n\
             option presplits 1;\n\
             option decomposition 0.5;\n\
             option integrator rk4;\n\
             option integration_step 0.1;\n\
             option dynamics ode;\n",
        )
        .unwrap();
        assert_eq!(data.options.transform_mode, TransformMode::AllForOne);
        assert_eq!(data.options.max_param_splits, 3);
        assert_eq!(data.options.presplits, 1);
        assert_eq!(data.options.decomposition, Some(0.5));
        assert_eq!(data.options.integrator, Some(IntegratorKind::RungeKutta4));
        assert_eq!(data.options.integration_step, Some(0.1));
        assert_eq!(data.kind, DynamicsKind::Ode);
    }

    #[test]
    fn test_parse_specification() {
        let data = parse_model_data(
            "var x in [0, 1];\n\
             dynamic(x) = x;\n\
             spec: G[0, 3](x - 0.5 <= 0) && F[1, 2](x <= 0);\n",
        )
        .unwrap();
        let spec = data.specification.unwrap();
        assert!(matches!(spec, StlFormula::Conjunction(..)));
        assert_eq!(spec.time_bounds().end(), 3);
    }

    #[test]
    fn test_parse_until() {
        let data = parse_model_data(
            "var x in [0, 1];\n\
             dynamic(x) = x;\n\
             spec: x - 1 <= 0 U[1, 4] x <= 0;\n",
        )
        .unwrap();
        assert!(matches!(
            data.specification.unwrap(),
            StlFormula::Until(..)
        ));
    }

    #[test]
    fn test_parse_directions_and_template() {
        let data = parse_model_data(
            "var x in [0, 1];\n\
             var y in [0, 1];\n\
             dynamic(x) = x;\n\
             dynamic(y) = y;\n\
             direction x + y in [0, 2];\n\
             template = {0, 1};\n\
             adaptive = {2};\n",
        )
        .unwrap();
        assert_eq!(data.directions, vec![(vec![1.0, 1.0], 0.0, 2.0)]);
        assert_eq!(data.templates, vec![vec![0, 1]]);
        assert!(data.adaptive.contains(&2));
    }

    #[test]
    fn test_direction_with_constant_is_rejected() {
        let err = parse_model_data(
            "var x in [0, 1];\n\
             dynamic(x) = x;\n\
             direction x + 1 in [0, 2];\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("no constant term"));
    }

    #[test]
    fn test_parse_assumption() {
        let data = parse_model_data(
            "var x in [0, 1];\n\
             dynamic(x) = x;\n\
             assume x <= 0.75;\n",
        )
        .unwrap();
        assert_eq!(data.assumptions.len(), 1);
        // x - 0.75 <= 0
        let (coeffs, constant) = data.assumptions[0]
            .to_affine(&[Symbol::new("x")])
            .unwrap();
        assert_eq!(coeffs, vec![1.0]);
        assert_eq!(constant, -0.75);
    }
}
