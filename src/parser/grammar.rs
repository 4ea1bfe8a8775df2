//! Turns a single line of source into a [`Line`] using the pest grammar in
//! `redcode.pest`. No symbol resolution happens here.

use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::Parser as _;
use pest_derive::Parser;

use crate::load_file::{AddressMode, Modifier, Opcode};

use super::expression::{BinaryOp, Expr, UnaryOp};

#[derive(Parser)]
#[grammar = "parser/redcode.pest"]
struct RedcodeParser;

#[derive(Debug, Default, PartialEq)]
pub struct Line {
    pub labels: Vec<String>,
    pub statement: Option<Statement>,
    /// Comment text after the `;`, untrimmed
    pub comment: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum Statement {
    Org(Expr),
    End(Option<Expr>),
    Equ(Expr),
    Pin(Expr),
    Instruction(RawInstruction),
}

#[derive(Debug, PartialEq)]
pub struct RawInstruction {
    pub opcode: Opcode,
    pub modifier: Option<Modifier>,
    pub operands: Vec<RawOperand>,
}

#[derive(Debug, PartialEq)]
pub struct RawOperand {
    pub mode: Option<AddressMode>,
    pub expr: Expr,
}

type Syntax<T> = Result<T, String>;

fn malformed(rule: &str) -> String {
    format!("malformed {}", rule)
}

fn next<'i>(pairs: &mut Pairs<'i, Rule>, rule: &str) -> Syntax<Pair<'i, Rule>> {
    pairs.next().ok_or_else(|| malformed(rule))
}

fn syntax_error(text: &str, err: &pest::error::Error<Rule>) -> String {
    let column = match err.line_col {
        LineColLocation::Pos((_, column)) | LineColLocation::Span((_, column), _) => column,
    };
    let rest: String = text.chars().skip(column.saturating_sub(1)).collect();
    let rest = rest.trim();
    if rest.is_empty() {
        format!("unexpected end of line at column {}", column)
    } else {
        format!("unexpected `{}` at column {}", rest, column)
    }
}

pub fn parse_line(text: &str) -> Syntax<Line> {
    let mut pairs =
        RedcodeParser::parse(Rule::line, text).map_err(|err| syntax_error(text, &err))?;
    let root = next(&mut pairs, "line")?;

    let mut line = Line::default();
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::label_list => {
                line.labels = pair
                    .into_inner()
                    .map(|label| label.as_str().to_owned())
                    .collect();
            }
            Rule::statement => {
                line.statement = Some(build_statement(next(&mut pair.into_inner(), "statement")?)?);
            }
            Rule::comment => {
                let text = pair
                    .into_inner()
                    .next()
                    .map_or_else(String::new, |text| text.as_str().to_owned());
                line.comment = Some(text);
            }
            Rule::EOI => {}
            _ => return Err(malformed("line")),
        }
    }
    Ok(line)
}

/// Parse a standalone expression, as used by `;assert`.
pub fn parse_expression(text: &str) -> Syntax<Expr> {
    let mut pairs = RedcodeParser::parse(Rule::expression_line, text)
        .map_err(|err| syntax_error(text, &err))?;
    let root = next(&mut pairs, "expression")?;
    build_expr(next(&mut root.into_inner(), "expression")?)
}

fn build_statement(pair: Pair<'_, Rule>) -> Syntax<Statement> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();
    Ok(match rule {
        Rule::org => Statement::Org(build_expr(next(&mut inner, "ORG")?)?),
        Rule::end => Statement::End(inner.next().map(build_expr).transpose()?),
        Rule::equ => Statement::Equ(build_expr(next(&mut inner, "EQU")?)?),
        Rule::pin => Statement::Pin(build_expr(next(&mut inner, "PIN")?)?),
        Rule::instruction => Statement::Instruction(build_instruction(inner)?),
        _ => return Err(malformed("statement")),
    })
}

fn build_instruction(mut inner: Pairs<'_, Rule>) -> Syntax<RawInstruction> {
    let opcode_pair = next(&mut inner, "opcode")?;
    let opcode = opcode_pair
        .as_str()
        .parse::<Opcode>()
        .map_err(|err| err.to_string())?;

    let mut modifier = None;
    let mut operands = Vec::with_capacity(2);
    for pair in inner {
        match pair.as_rule() {
            Rule::modifier => {
                modifier = Some(pair.as_str().parse::<Modifier>().map_err(|err| err.to_string())?);
            }
            Rule::operand => operands.push(build_operand(pair)?),
            _ => return Err(malformed("instruction")),
        }
    }

    Ok(RawInstruction {
        opcode,
        modifier,
        operands,
    })
}

fn build_operand(pair: Pair<'_, Rule>) -> Syntax<RawOperand> {
    let mut mode = None;
    let mut expr = None;
    for pair in pair.into_inner() {
        match pair.as_rule() {
            Rule::mode => {
                mode = pair
                    .as_str()
                    .chars()
                    .next()
                    .and_then(AddressMode::from_symbol);
            }
            Rule::expr => expr = Some(build_expr(pair)?),
            _ => return Err(malformed("operand")),
        }
    }
    Ok(RawOperand {
        mode,
        expr: expr.ok_or_else(|| malformed("operand"))?,
    })
}

fn build_expr(pair: Pair<'_, Rule>) -> Syntax<Expr> {
    match pair.as_rule() {
        Rule::expr | Rule::primary => build_expr(next(&mut pair.into_inner(), "expression")?),
        Rule::disjunction | Rule::conjunction | Rule::comparison | Rule::sum | Rule::product => {
            let mut inner = pair.into_inner();
            let mut lhs = build_expr(next(&mut inner, "expression")?)?;
            while let Some(op) = inner.next() {
                let op = BinaryOp::from_symbol(op.as_str()).ok_or_else(|| malformed("operator"))?;
                let rhs = build_expr(next(&mut inner, "expression")?)?;
                lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
            }
            Ok(lhs)
        }
        Rule::unary => {
            let mut ops = Vec::new();
            let mut operand = None;
            for pair in pair.into_inner() {
                match pair.as_rule() {
                    Rule::unary_op => ops.push(match pair.as_str() {
                        "-" => UnaryOp::Negate,
                        "!" => UnaryOp::Not,
                        _ => UnaryOp::Plus,
                    }),
                    _ => operand = Some(build_expr(pair)?),
                }
            }
            let operand = operand.ok_or_else(|| malformed("expression"))?;
            Ok(ops
                .into_iter()
                .rev()
                .fold(operand, |expr, op| Expr::Unary(op, Box::new(expr))))
        }
        Rule::number => pair
            .as_str()
            .parse::<i64>()
            .map(Expr::Number)
            .map_err(|_| format!("number `{}` is out of range", pair.as_str())),
        Rule::ident => Ok(Expr::symbol(pair.as_str())),
        _ => Err(malformed("expression")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn instruction(line: &Line) -> &RawInstruction {
        match &line.statement {
            Some(Statement::Instruction(instruction)) => instruction,
            other => panic!("expected an instruction, got {:?}", other),
        }
    }

    #[test]
    fn parse_full_instruction() {
        let line = parse_line("start: loop mov.ab #step, }target-1 ; move it").unwrap();
        assert_eq!(line.labels, vec!["start", "loop"]);
        assert_eq!(line.comment.as_deref(), Some(" move it"));

        let instruction = instruction(&line);
        assert_eq!(instruction.opcode, Opcode::Mov);
        assert_eq!(instruction.modifier, Some(Modifier::AB));
        assert_eq!(
            instruction.operands,
            vec![
                RawOperand {
                    mode: Some(AddressMode::Immediate),
                    expr: Expr::symbol("step"),
                },
                RawOperand {
                    mode: Some(AddressMode::PostIncIndirectA),
                    expr: Expr::Binary(
                        BinaryOp::Sub,
                        Box::new(Expr::symbol("target")),
                        Box::new(Expr::Number(1))
                    ),
                },
            ]
        );
    }

    #[test]
    fn labels_are_not_opcodes() {
        let line = parse_line("move  MOV 0, 1").unwrap();
        assert_eq!(line.labels, vec!["move"]);
        assert_eq!(instruction(&line).opcode, Opcode::Mov);

        let line = parse_line("DAT #0").unwrap();
        assert!(line.labels.is_empty());
        assert_eq!(instruction(&line).operands.len(), 1);
    }

    #[test]
    fn parse_directives() {
        let line = parse_line("step EQU 2*(3+1)").unwrap();
        assert_eq!(line.labels, vec!["step"]);
        assert!(matches!(line.statement, Some(Statement::Equ(_))));

        assert!(matches!(
            parse_line("  ORG start").unwrap().statement,
            Some(Statement::Org(Expr::Symbol(_)))
        ));
        assert_eq!(parse_line("end").unwrap().statement, Some(Statement::End(None)));
    }

    #[test]
    fn precedence() {
        let expr = parse_expression("1 + 2 * 3 == 7 && -4 < 0").unwrap();
        let expected = Expr::Binary(
            BinaryOp::And,
            Box::new(Expr::Binary(
                BinaryOp::Equal,
                Box::new(Expr::Binary(
                    BinaryOp::Add,
                    Box::new(Expr::Number(1)),
                    Box::new(Expr::Binary(
                        BinaryOp::Mul,
                        Box::new(Expr::Number(2)),
                        Box::new(Expr::Number(3)),
                    )),
                )),
                Box::new(Expr::Number(7)),
            )),
            Box::new(Expr::Binary(
                BinaryOp::Less,
                Box::new(Expr::Unary(UnaryOp::Negate, Box::new(Expr::Number(4)))),
                Box::new(Expr::Number(0)),
            )),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), Line::default());
        let line = parse_line(";name Imp").unwrap();
        assert_eq!(line.comment.as_deref(), Some("name Imp"));
        assert_eq!(line.statement, None);
    }

    #[test]
    fn syntax_errors() {
        let err = parse_line("mov 0, 1 2").unwrap_err();
        assert!(err.contains("column"), "{}", err);
        assert!(parse_line("mov.q 0, 1").is_err());
        assert!(parse_line("jmp (1").is_err());
    }
}
