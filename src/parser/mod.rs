//! Compiles Redcode source into a [`Warrior`].
//!
//! Parsing happens in two passes. The first pass runs every line through the
//! pest grammar, assigns addresses to labels and collects directives and
//! comment metadata. The second pass evaluates every operand expression
//! relative to the instruction it appears in, fills in default modifiers and
//! checks the result against the [`Dialect`].

use std::collections::HashMap;
use std::fmt;

use log::debug;
use maplit::hashmap;
use thiserror::Error as ThisError;

use crate::core::CoreConfig;
use crate::load_file::{
    fold, AddressMode, Dialect, Field, Instruction, Metadata, Opcode, Program, Warrior,
};

mod expression;
mod grammar;

use expression::{Expr, Scope};
use grammar::{RawInstruction, RawOperand, Statement};

/// A compile error, anchored to the (1-based) source line it occurred on.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct Error {
    pub line: usize,
    pub kind: ErrorKind,
}

impl Error {
    fn new(line: usize, kind: ErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown label `{0}`")]
    UnknownLabel(String),

    #[error("label `{0}` is already defined")]
    DuplicateLabel(String),

    #[error("EQU requires a label")]
    EquWithoutLabel,

    #[error("equate `{0}` refers to itself")]
    RecursiveEquate(String),

    #[error("division by zero in expression")]
    DivideByZero,

    #[error("{opcode} is not available in the {dialect} dialect")]
    IllegalOpcode { opcode: Opcode, dialect: Dialect },

    #[error("modifiers are not available in the {0} dialect")]
    ModifierNotAllowed(Dialect),

    #[error("illegal operands for {opcode}: {reason}")]
    IllegalOperands {
        opcode: Opcode,
        reason: &'static str,
    },

    #[error("warrior has {length} instructions; the limit is {max}")]
    TooLong { length: usize, max: u32 },

    #[error("warrior has no instructions")]
    Empty,

    #[error("start offset {0} is outside the warrior")]
    InvalidStart(i64),

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("cannot compile for a core of size 0")]
    InvalidCoreSize,
}

/// Something suspicious that did not stop compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub kind: WarningKind,
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    #[error("PIN is not supported; P-space is never shared")]
    PinIgnored,

    #[error("text after END is ignored")]
    IgnoredAfterEnd,

    #[error("start offset redefined")]
    OriginRedefined,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

/// The outcome of parsing. Warnings are reported whether or not parsing succeeded.
#[derive(Debug)]
pub enum Result {
    Ok(Warrior, Vec<Warning>),
    Err(Error, Vec<Warning>),
}

impl Result {
    /// Get the warrior, panicking with the error message if parsing failed.
    #[must_use]
    pub fn unwrap(self) -> Warrior {
        self.expect("called `unwrap` on a failed parse")
    }

    #[must_use]
    pub fn expect(self, msg: &str) -> Warrior {
        match self {
            Self::Ok(warrior, _) => warrior,
            Self::Err(err, _) => panic!("{}: {}", msg, err),
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::Ok(_, warnings) | Self::Err(_, warnings) => warnings,
        }
    }

    pub fn into_result(self) -> std::result::Result<Warrior, Error> {
        match self {
            Self::Ok(warrior, _) => Ok(warrior),
            Self::Err(err, _) => Err(err),
        }
    }
}

impl From<Result> for std::result::Result<Warrior, Error> {
    fn from(result: Result) -> Self {
        result.into_result()
    }
}

/// The simulation parameters a warrior is compiled against. They determine
/// field normalization and the values of the predefined constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub dialect: Dialect,
    pub core_size: u32,
    pub max_processes: u32,
    pub max_cycles: u32,
    pub max_length: u32,
    pub min_distance: u32,
    pub p_space_size: u32,
    pub warriors: u32,
    pub rounds: u32,
}

impl Default for Environment {
    fn default() -> Self {
        Self::for_core(&CoreConfig::default())
    }
}

impl Environment {
    /// The environment matching a core configuration, for a two warrior battle.
    #[must_use]
    pub fn for_core(config: &CoreConfig) -> Self {
        Self {
            dialect: config.dialect,
            core_size: config.core_size,
            max_processes: config.max_processes,
            max_cycles: config.max_cycles,
            max_length: config.max_warrior_length,
            min_distance: config.min_distance,
            p_space_size: config.p_space_size,
            warriors: 2,
            rounds: 1,
        }
    }

    fn constants(&self) -> HashMap<&'static str, i64> {
        hashmap! {
            "CORESIZE" => i64::from(self.core_size),
            "MAXPROCESSES" => i64::from(self.max_processes),
            "MAXCYCLES" => i64::from(self.max_cycles),
            "MAXLENGTH" => i64::from(self.max_length),
            "MINDISTANCE" => i64::from(self.min_distance),
            "PSPACESIZE" => i64::from(self.p_space_size),
            "WARRIORS" => i64::from(self.warriors),
            "ROUNDS" => i64::from(self.rounds),
            "VERSION" => self.dialect.version(),
        }
    }
}

/// Compile `source` for the given dialect and core size, with every other
/// parameter at its default.
pub fn compile(
    source: &str,
    dialect: Dialect,
    core_size: u32,
) -> std::result::Result<Warrior, Error> {
    Parser::new(Environment {
        dialect,
        core_size,
        ..Environment::default()
    })
    .parse(source)
    .into_result()
}

/// Parse with the default environment.
pub fn parse(source: &str) -> Result {
    Parser::default().parse(source)
}

#[derive(Clone, Debug, Default)]
pub struct Parser {
    environment: Environment,
}

enum Symbol {
    Address(usize),
    Equate(Expr),
}

struct Assertion {
    line: usize,
    text: String,
    expr: Expr,
}

/// Everything the first pass learns about the source.
#[derive(Default)]
struct Collected {
    instructions: Vec<(usize, RawInstruction)>,
    symbols: HashMap<String, Symbol>,
    pending_labels: Vec<(usize, String)>,
    origin: Option<(usize, Expr)>,
    assertions: Vec<Assertion>,
    metadata: Metadata,
}

impl Collected {
    fn define(&mut self, line: usize, name: String, symbol: Symbol) -> std::result::Result<(), Error> {
        if self.symbols.contains_key(&name) || name == "CURLINE" {
            return Err(Error::new(line, ErrorKind::DuplicateLabel(name)));
        }
        self.symbols.insert(name, symbol);
        Ok(())
    }

    fn define_pending(&mut self) -> std::result::Result<(), Error> {
        let address = self.instructions.len();
        for (line, name) in std::mem::take(&mut self.pending_labels) {
            self.define(line, name, Symbol::Address(address))?;
        }
        Ok(())
    }

    fn set_origin(&mut self, line: usize, expr: Expr, warnings: &mut Vec<Warning>) {
        if self.origin.is_some() {
            warnings.push(Warning {
                line,
                kind: WarningKind::OriginRedefined,
            });
        }
        self.origin = Some((line, expr));
    }

    fn comment(&mut self, line: usize, text: &str) -> std::result::Result<(), Error> {
        let text = text.trim();
        if let Some(name) = directive(text, "name") {
            self.metadata.name = Some(name.to_owned());
        } else if let Some(author) = directive(text, "author") {
            self.metadata.author = Some(author.to_owned());
        } else if let Some(strategy) = directive(text, "strategy") {
            let strategy = match self.metadata.strategy.take() {
                Some(existing) => format!("{}\n{}", existing, strategy),
                None => strategy.to_owned(),
            };
            self.metadata.strategy = Some(strategy);
        } else if let Some(condition) = directive(text, "assert") {
            let expr = grammar::parse_expression(condition)
                .map_err(|msg| Error::new(line, ErrorKind::Syntax(msg)))?;
            self.assertions.push(Assertion {
                line,
                text: condition.to_owned(),
                expr,
            });
        } else if text
            .get(..7)
            .map_or(false, |head| head.eq_ignore_ascii_case("redcode"))
        {
            self.metadata.redcode = Some(text[7..].trim().to_owned());
        }
        Ok(())
    }
}

/// Match a `;keyword rest` comment, case-insensitively.
fn directive<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    let rest = &text[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword)
        && (rest.is_empty() || rest.starts_with(char::is_whitespace))
    {
        Some(rest.trim())
    } else {
        None
    }
}

/// Evaluates expressions relative to the instruction at `current`.
struct Resolver<'a> {
    symbols: &'a HashMap<String, Symbol>,
    constants: &'a HashMap<&'static str, i64>,
    current: usize,
    expanding: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn at(&mut self, current: usize) -> &mut Self {
        self.current = current;
        self
    }
}

impl<'a> Scope for Resolver<'a> {
    fn resolve(&mut self, name: &str) -> std::result::Result<i64, ErrorKind> {
        let symbols = self.symbols;
        match symbols.get(name) {
            Some(Symbol::Address(address)) => Ok(*address as i64 - self.current as i64),
            Some(Symbol::Equate(expr)) => {
                if self.expanding.iter().any(|active| active == name) {
                    return Err(ErrorKind::RecursiveEquate(name.to_owned()));
                }
                self.expanding.push(name.to_owned());
                let value = expr.evaluate(self);
                self.expanding.pop();
                value
            }
            None if name == "CURLINE" => Ok(self.current as i64),
            None => self
                .constants
                .get(name)
                .copied()
                .ok_or_else(|| ErrorKind::UnknownLabel(name.to_owned())),
        }
    }
}

impl Parser {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn parse(&self, source: &str) -> Result {
        let mut warnings = Vec::new();
        match self.compile(source, &mut warnings) {
            Ok(warrior) => Result::Ok(warrior, warnings),
            Err(err) => Result::Err(err, warnings),
        }
    }

    fn compile(
        &self,
        source: &str,
        warnings: &mut Vec<Warning>,
    ) -> std::result::Result<Warrior, Error> {
        if self.environment.core_size == 0 {
            return Err(Error::new(0, ErrorKind::InvalidCoreSize));
        }
        let collected = Self::collect(source, warnings)?;
        self.resolve(collected)
    }

    /// First pass: lines to raw instructions and a symbol table.
    fn collect(
        source: &str,
        warnings: &mut Vec<Warning>,
    ) -> std::result::Result<Collected, Error> {
        let mut collected = Collected::default();
        let mut lines = source.lines().enumerate().map(|(i, text)| (i + 1, text));

        for (number, text) in lines.by_ref() {
            let line = grammar::parse_line(text)
                .map_err(|msg| Error::new(number, ErrorKind::Syntax(msg)))?;

            if let Some(comment) = &line.comment {
                collected.comment(number, comment)?;
            }

            let labels = line.labels.into_iter().map(|name| (number, name));
            match line.statement {
                None => collected.pending_labels.extend(labels),
                Some(Statement::Instruction(instruction)) => {
                    collected.pending_labels.extend(labels);
                    collected.define_pending()?;
                    collected.instructions.push((number, instruction));
                }
                Some(Statement::Equ(expr)) => {
                    let labels: Vec<_> = labels.collect();
                    if labels.is_empty() {
                        return Err(Error::new(number, ErrorKind::EquWithoutLabel));
                    }
                    for (line, name) in labels {
                        collected.define(line, name, Symbol::Equate(expr.clone()))?;
                    }
                }
                Some(Statement::Org(expr)) => {
                    collected.pending_labels.extend(labels);
                    collected.set_origin(number, expr, warnings);
                }
                Some(Statement::Pin(_)) => {
                    collected.pending_labels.extend(labels);
                    warnings.push(Warning {
                        line: number,
                        kind: WarningKind::PinIgnored,
                    });
                }
                Some(Statement::End(expr)) => {
                    collected.pending_labels.extend(labels);
                    if let Some(expr) = expr {
                        collected.set_origin(number, expr, warnings);
                    }
                    break;
                }
            }
        }

        let trailing = lines.find(|(_, text)| {
            let text = text.trim();
            !text.is_empty() && !text.starts_with(';')
        });
        if let Some((line, _)) = trailing {
            warnings.push(Warning {
                line,
                kind: WarningKind::IgnoredAfterEnd,
            });
        }

        collected.define_pending()?;
        Ok(collected)
    }

    /// Second pass: evaluate, normalize and validate.
    fn resolve(&self, collected: Collected) -> std::result::Result<Warrior, Error> {
        let env = &self.environment;
        let last_line = collected
            .instructions
            .last()
            .map_or(0, |(line, _)| *line);

        if collected.instructions.is_empty() {
            return Err(Error::new(last_line, ErrorKind::Empty));
        }
        if collected.instructions.len() > env.max_length as usize {
            return Err(Error::new(
                last_line,
                ErrorKind::TooLong {
                    length: collected.instructions.len(),
                    max: env.max_length,
                },
            ));
        }

        let constants = env.constants();
        let mut resolver = Resolver {
            symbols: &collected.symbols,
            constants: &constants,
            current: 0,
            expanding: Vec::new(),
        };

        let mut instructions = Vec::with_capacity(collected.instructions.len());
        for (index, (line, raw)) in collected.instructions.iter().enumerate() {
            let instruction = self
                .instruction(raw, resolver.at(index))
                .map_err(|kind| Error::new(*line, kind))?;
            instructions.push(instruction);
        }

        let origin = match &collected.origin {
            Some((line, expr)) => {
                let start = expr
                    .evaluate(resolver.at(0))
                    .map_err(|kind| Error::new(*line, kind))?;
                if start < 0 || start >= instructions.len() as i64 {
                    return Err(Error::new(*line, ErrorKind::InvalidStart(start)));
                }
                Some(start as u32)
            }
            None => None,
        };

        for assertion in &collected.assertions {
            let holds = assertion
                .expr
                .evaluate(resolver.at(0))
                .map_err(|kind| Error::new(assertion.line, kind))?;
            if holds == 0 {
                return Err(Error::new(
                    assertion.line,
                    ErrorKind::AssertionFailed(assertion.text.clone()),
                ));
            }
        }

        debug!(
            "compiled {} ({} instructions, start {})",
            collected.metadata.name.as_deref().unwrap_or("unnamed warrior"),
            instructions.len(),
            origin.unwrap_or(0),
        );

        Ok(Warrior {
            program: Program {
                instructions,
                origin,
            },
            metadata: collected.metadata,
            dialect: env.dialect,
            core_size: env.core_size,
        })
    }

    fn instruction(
        &self,
        raw: &RawInstruction,
        resolver: &mut Resolver<'_>,
    ) -> std::result::Result<Instruction, ErrorKind> {
        let env = &self.environment;
        let opcode = raw.opcode;
        if !env.dialect.allows_opcode(opcode) {
            return Err(ErrorKind::IllegalOpcode {
                opcode,
                dialect: env.dialect,
            });
        }
        if raw.modifier.is_some() && !env.dialect.allows_modifiers() {
            return Err(ErrorKind::ModifierNotAllowed(env.dialect));
        }

        // '88 data has no direct mode, so an unmarked DAT operand is immediate there.
        let default_mode = if opcode == Opcode::Dat && env.dialect == Dialect::Icws88 {
            AddressMode::Immediate
        } else {
            AddressMode::Direct
        };
        let mut field = |operand: &RawOperand| -> std::result::Result<Field, ErrorKind> {
            let value = operand.expr.evaluate(&mut *resolver)?;
            Ok(Field::new(
                operand.mode.unwrap_or(default_mode),
                fold(value, env.core_size),
            ))
        };

        let (a_field, b_field) = match (raw.operands.get(0), raw.operands.get(1)) {
            (Some(a), Some(b)) => (field(a)?, field(b)?),
            (Some(b), None) if opcode == Opcode::Dat => (Field::immediate(0), field(b)?),
            (Some(a), None) => (field(a)?, Field::direct(0)),
            _ if opcode == Opcode::Dat => (Field::immediate(0), Field::immediate(0)),
            _ => (Field::direct(0), Field::direct(0)),
        };

        env.dialect
            .check_operands(opcode, a_field.mode, b_field.mode)
            .map_err(|reason| ErrorKind::IllegalOperands { opcode, reason })?;

        let modifier = raw.modifier.unwrap_or_else(|| {
            env.dialect
                .default_modifier(opcode, a_field.mode, b_field.mode)
        });

        Ok(Instruction::new(opcode, modifier, a_field, b_field))
    }
}
