use std::fmt;

use crate::codec::{CodecError, Result};

/// Binary operators understood by field expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
	/// `==`, yields 0/1.
	Eq,
	/// `!=`, yields 0/1.
	Ne,
	/// `>=`, yields 0/1.
	Ge,
	/// `&&`, yields 0/1 from operand truthiness.
	And,
	/// `||`, yields 0/1 from operand truthiness.
	Or,
	/// `&`, bitwise on integers, yields the integer result.
	BitAnd,
	/// `|`, bitwise on integers, yields the integer result.
	BitOr,
}

impl Op {
	/// Source symbol for this operator.
	pub fn symbol(self) -> &'static str {
		match self {
			Self::Eq => "==",
			Self::Ne => "!=",
			Self::Ge => ">=",
			Self::And => "&&",
			Self::Or => "||",
			Self::BitAnd => "&",
			Self::BitOr => "|",
		}
	}

	/// Match an operator starting at `at`, preferring two-character forms.
	fn match_at(bytes: &[u8], at: usize) -> Option<(Self, usize)> {
		let two = match (bytes.get(at), bytes.get(at + 1)) {
			(Some(b'='), Some(b'=')) => Some(Self::Eq),
			(Some(b'!'), Some(b'=')) => Some(Self::Ne),
			(Some(b'>'), Some(b'=')) => Some(Self::Ge),
			(Some(b'&'), Some(b'&')) => Some(Self::And),
			(Some(b'|'), Some(b'|')) => Some(Self::Or),
			_ => None,
		};
		if let Some(op) = two {
			return Some((op, at + 2));
		}

		match bytes.get(at) {
			Some(b'&') => Some((Self::BitAnd, at + 1)),
			Some(b'|') => Some((Self::BitOr, at + 1)),
			_ => None,
		}
	}

	fn apply(self, left: Scalar, right: Scalar) -> Result<Scalar> {
		let flag = |value: bool| Ok(Scalar::Int(i64::from(value)));
		match self {
			Self::Eq => flag(self.equals(&left, &right)?),
			Self::Ne => flag(!self.equals(&left, &right)?),
			Self::Ge => flag(self.at_least(&left, &right)?),
			Self::And => flag(left.truthy() && right.truthy()),
			Self::Or => flag(left.truthy() || right.truthy()),
			Self::BitAnd | Self::BitOr => match (&left, &right) {
				(Scalar::Int(a), Scalar::Int(b)) => Ok(Scalar::Int(if self == Self::BitAnd { a & b } else { a | b })),
				_ => Err(self.type_error(&left, &right)),
			},
		}
	}

	fn equals(self, left: &Scalar, right: &Scalar) -> Result<bool> {
		match (left, right) {
			(Scalar::Int(a), Scalar::Int(b)) => Ok(a == b),
			(Scalar::Str(a), Scalar::Str(b)) => Ok(a == b),
			(Scalar::Ints(a), Scalar::Ints(b)) => Ok(a == b),
			_ => match (left.as_f64(), right.as_f64()) {
				(Some(a), Some(b)) => Ok(a == b),
				_ => Err(self.type_error(left, right)),
			},
		}
	}

	fn at_least(self, left: &Scalar, right: &Scalar) -> Result<bool> {
		match (left, right) {
			(Scalar::Int(a), Scalar::Int(b)) => Ok(a >= b),
			(Scalar::Str(a), Scalar::Str(b)) => Ok(a >= b),
			_ => match (left.as_f64(), right.as_f64()) {
				(Some(a), Some(b)) => Ok(a >= b),
				_ => Err(self.type_error(left, right)),
			},
		}
	}

	fn type_error(self, left: &Scalar, right: &Scalar) -> CodecError {
		CodecError::ExprType {
			op: self.symbol(),
			left: left.kind(),
			right: right.kind(),
		}
	}
}

/// Value produced by evaluating an expression or looking up an identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
	/// Integer, enum, bitfield or boolean value.
	Int(i64),
	/// Floating-point value.
	Float(f64),
	/// Raw string bytes.
	Str(Vec<u8>),
	/// Integer sequence, used for per-row jagged array lengths.
	Ints(Vec<i64>),
}

impl Scalar {
	/// Stable lowercase kind label.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Int(_) => "int",
			Self::Float(_) => "float",
			Self::Str(_) => "string",
			Self::Ints(_) => "int list",
		}
	}

	/// Truthiness used by `&&`, `||` and conditions.
	pub fn truthy(&self) -> bool {
		match self {
			Self::Int(value) => *value != 0,
			Self::Float(value) => *value != 0.0,
			Self::Str(value) => !value.is_empty(),
			Self::Ints(value) => !value.is_empty(),
		}
	}

	/// Return the integer payload, if any.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(value) => Some(*value),
			_ => None,
		}
	}

	fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Int(value) => Some(*value as f64),
			Self::Float(value) => Some(*value),
			_ => None,
		}
	}
}

/// Name lookup used while evaluating an expression.
pub trait EvalContext {
	/// Resolve a canonical identifier to its current value.
	fn lookup(&self, name: &str) -> Result<Scalar>;
}

/// Parsed field expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	/// Decimal integer literal.
	Int(i64),
	/// The empty string literal `""`.
	EmptyStr,
	/// Canonical identifier looked up on the context.
	Ident(Box<str>),
	/// `left OP right`.
	Binary {
		/// Operator.
		op: Op,
		/// Left operand.
		left: Box<Expr>,
		/// Right operand.
		right: Box<Expr>,
	},
}

impl Expr {
	/// Parse `text`, passing identifiers through [`canonical_name`].
	pub fn parse(text: &str) -> Result<Self> {
		Self::parse_with(text, &canonical_name)
	}

	/// Parse `text`, passing identifiers through `name_filter`.
	pub fn parse_with<F>(text: &str, name_filter: &F) -> Result<Self>
	where
		F: Fn(&str) -> String,
	{
		Parser { full: text, name_filter }.expr(text)
	}

	/// Evaluate against `ctx`.
	pub fn eval(&self, ctx: &dyn EvalContext) -> Result<Scalar> {
		match self {
			Self::Int(value) => Ok(Scalar::Int(*value)),
			Self::EmptyStr => Ok(Scalar::Str(Vec::new())),
			Self::Ident(name) => ctx.lookup(name),
			Self::Binary { op, left, right } => {
				let left = left.eval(ctx)?;
				let right = right.eval(ctx)?;
				op.apply(left, right)
			}
		}
	}

	/// Evaluate and require an integer result.
	pub fn eval_int(&self, ctx: &dyn EvalContext) -> Result<i64> {
		match self.eval(ctx)? {
			Scalar::Int(value) => Ok(value),
			other => Err(CodecError::ValueKind {
				expected: "int",
				got: other.kind(),
			}),
		}
	}

	/// Evaluate and reduce the result to its truthiness.
	pub fn eval_bool(&self, ctx: &dyn EvalContext) -> Result<bool> {
		Ok(self.eval(ctx)?.truthy())
	}

	/// Return the identifier when the expression is a bare name.
	pub fn as_ident(&self) -> Option<&str> {
		match self {
			Self::Ident(name) => Some(name),
			_ => None,
		}
	}
}

impl fmt::Display for Expr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(value) => write!(f, "{value}"),
			Self::EmptyStr => f.write_str("\"\""),
			Self::Ident(name) => f.write_str(name),
			Self::Binary { op, left, right } => {
				write_operand(f, left)?;
				write!(f, " {} ", op.symbol())?;
				write_operand(f, right)
			}
		}
	}
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr) -> fmt::Result {
	match operand {
		Expr::Binary { .. } => write!(f, "({operand})"),
		_ => write!(f, "{operand}"),
	}
}

/// Canonical field name: lower-case with whitespace runs joined by `_`.
pub fn canonical_name(label: &str) -> String {
	label.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join("_")
}

struct Parser<'t, F> {
	full: &'t str,
	name_filter: &'t F,
}

impl<F> Parser<'_, F>
where
	F: Fn(&str) -> String,
{
	fn fail(&self, reason: &'static str) -> CodecError {
		CodecError::ExprParse {
			expr: self.full.into(),
			reason,
		}
	}

	fn expr(&self, text: &str) -> Result<Expr> {
		let text = text.trim();
		if text.is_empty() {
			return Err(self.fail("empty operand"));
		}

		let bytes = text.as_bytes();
		let (left, op, op_end) = if bytes[0] == b'(' {
			let close = self.matching_bracket(text)?;
			let inner = &text[1..close];
			let mut at = close + 1;
			while at < bytes.len() && bytes[at].is_ascii_whitespace() {
				at += 1;
			}
			if at == bytes.len() {
				return self.expr(inner);
			}
			let (op, end) = Op::match_at(bytes, at).ok_or_else(|| self.fail("expected operator after bracket"))?;
			(self.expr(inner)?, op, end)
		} else {
			let mut found = None;
			for at in 0..bytes.len() {
				if matches!(bytes[at], b'(' | b')') {
					return Err(self.fail("expected operator before bracket"));
				}
				if let Some((op, end)) = Op::match_at(bytes, at) {
					found = Some((at, op, end));
					break;
				}
			}
			let Some((at, op, end)) = found else {
				return self.leaf(text);
			};
			(self.expr(&text[..at])?, op, end)
		};

		let rest = text[op_end..].trim();
		let right = if rest.starts_with('(') {
			let close = self.matching_bracket(rest)?;
			if !rest[close + 1..].trim().is_empty() {
				return Err(self.fail("unexpected trailing characters"));
			}
			self.expr(&rest[1..close])?
		} else {
			if rest.contains(['(', ')']) {
				return Err(self.fail("unexpected brackets in right operand"));
			}
			self.expr(rest)?
		};

		Ok(Expr::Binary {
			op,
			left: Box::new(left),
			right: Box::new(right),
		})
	}

	/// Index of the bracket closing the one at position 0.
	fn matching_bracket(&self, text: &str) -> Result<usize> {
		let mut depth = 0_usize;
		for (at, byte) in text.bytes().enumerate() {
			match byte {
				b'(' => depth += 1,
				b')' => {
					depth = depth.checked_sub(1).ok_or_else(|| self.fail("unbalanced brackets"))?;
					if depth == 0 {
						return Ok(at);
					}
				}
				_ => {}
			}
		}
		Err(self.fail("unbalanced brackets"))
	}

	fn leaf(&self, text: &str) -> Result<Expr> {
		if text == "\"\"" {
			return Ok(Expr::EmptyStr);
		}
		if let Ok(value) = text.parse::<i64>() {
			return Ok(Expr::Int(value));
		}

		let starts_ok = text.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
		let body_ok = text.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | ' ' | '.' | '?'));
		if !starts_ok || !body_ok {
			return Err(self.fail("invalid literal or identifier"));
		}

		Ok(Expr::Ident((self.name_filter)(text).into()))
	}
}
