//! Boolean filter expressions over stored object attributes.
//!
//! The textual form follows the vector-store filter dialect the rule synthesizer is prompted
//! with, e.g. `type in ("Car", "Truck") and type != "Tree"` or `lat > 56.9 and not city == "Riga"`.
//! An empty expression matches every record.

use std::fmt::{Display, Formatter};

use serde_json::{Map, Value};

const MAX_PREDICATE_DEPTH: usize = 8;
const MAX_PREDICATE_NODES: usize = 128;
const MAX_IN_LIST_ITEMS: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredicateError {
	/// Byte offset into the source expression.
	pub offset: usize,
	pub message: String,
}
impl PredicateError {
	fn new(offset: usize, message: impl Into<String>) -> Self {
		Self { offset, message: message.into() }
	}
}
impl Display for PredicateError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "at byte {}: {}", self.offset, self.message)
	}
}
impl std::error::Error for PredicateError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	Text,
	Number,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
	Id,
	City,
	Type,
	Lat,
	Lon,
}
impl Field {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Id => "id",
			Self::City => "city",
			Self::Type => "type",
			Self::Lat => "lat",
			Self::Lon => "lon",
		}
	}

	pub fn kind(self) -> FieldKind {
		match self {
			Self::Id | Self::City | Self::Type => FieldKind::Text,
			Self::Lat | Self::Lon => FieldKind::Number,
		}
	}

	fn parse(name: &str) -> Option<Self> {
		match name {
			"id" => Some(Self::Id),
			"city" => Some(Self::City),
			"type" => Some(Self::Type),
			"lat" => Some(Self::Lat),
			"lon" => Some(Self::Lon),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
	Eq,
	Neq,
	Lt,
	Lte,
	Gt,
	Gte,
}
impl CompareOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Eq => "==",
			Self::Neq => "!=",
			Self::Lt => "<",
			Self::Lte => "<=",
			Self::Gt => ">",
			Self::Gte => ">=",
		}
	}

	fn is_ordering(self) -> bool {
		matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
	Text(String),
	Number(f64),
}
impl Display for Literal {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Text(text) => {
				f.write_str("\"")?;

				for ch in text.chars() {
					match ch {
						'"' => f.write_str("\\\"")?,
						'\\' => f.write_str("\\\\")?,
						'\n' => f.write_str("\\n")?,
						'\t' => f.write_str("\\t")?,
						other => write!(f, "{other}")?,
					}
				}

				f.write_str("\"")
			},
			Self::Number(value) => write!(f, "{value}"),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
	All,
	And(Vec<Predicate>),
	Or(Vec<Predicate>),
	Not(Box<Predicate>),
	Compare { field: Field, op: CompareOp, value: Literal },
	In { field: Field, values: Vec<Literal>, negated: bool },
}
impl Predicate {
	pub fn parse(source: &str) -> Result<Self, PredicateError> {
		let tokens = lex(source)?;

		if tokens.is_empty() {
			return Ok(Self::All);
		}

		let mut parser = Parser { tokens, pos: 0, nodes: 0, end: source.len() };
		let predicate = parser.parse_or(1)?;

		if let Some(token) = parser.peek() {
			return Err(PredicateError::new(
				token.offset,
				format!("unexpected {} after expression.", token.kind.describe()),
			));
		}

		Ok(predicate)
	}

	pub fn negate(self) -> Self {
		match self {
			Self::Not(inner) => *inner,
			other => Self::Not(Box::new(other)),
		}
	}

	/// True when no record can satisfy the predicate regardless of store contents.
	pub fn is_unsatisfiable(&self) -> bool {
		match self {
			Self::Not(inner) => matches!(inner.as_ref(), Self::All),
			Self::And(nodes) => nodes.iter().any(Self::is_unsatisfiable),
			Self::Or(nodes) => nodes.iter().all(Self::is_unsatisfiable),
			_ => false,
		}
	}

	/// Evaluates the predicate against a metadata payload.
	///
	/// Missing or mistyped attributes never satisfy a positive condition, so `!=` and
	/// `not in` hold for them.
	pub fn matches(&self, payload: &Map<String, Value>) -> bool {
		match self {
			Self::All => true,
			Self::And(nodes) => nodes.iter().all(|node| node.matches(payload)),
			Self::Or(nodes) => nodes.iter().any(|node| node.matches(payload)),
			Self::Not(node) => !node.matches(payload),
			Self::Compare { field, op, value } => match op {
				CompareOp::Neq => !literal_equals(*field, value, payload),
				CompareOp::Eq => literal_equals(*field, value, payload),
				ordering => {
					let (Some(actual), Literal::Number(bound)) =
						(payload.get(field.as_str()).and_then(Value::as_f64), value)
					else {
						return false;
					};

					match ordering {
						CompareOp::Lt => actual < *bound,
						CompareOp::Lte => actual <= *bound,
						CompareOp::Gt => actual > *bound,
						_ => actual >= *bound,
					}
				},
			},
			Self::In { field, values, negated } => {
				let found = values.iter().any(|value| literal_equals(*field, value, payload));

				found != *negated
			},
		}
	}
}
impl Display for Predicate {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::All => f.write_str("true"),
			Self::And(nodes) => write_joined(f, nodes, " and "),
			Self::Or(nodes) => write_joined(f, nodes, " or "),
			Self::Not(node) => write!(f, "not ({node})"),
			Self::Compare { field, op, value } =>
				write!(f, "{} {} {value}", field.as_str(), op.as_str()),
			Self::In { field, values, negated } => {
				write!(f, "{} {}in (", field.as_str(), if *negated { "not " } else { "" })?;

				for (index, value) in values.iter().enumerate() {
					if index > 0 {
						f.write_str(", ")?;
					}

					write!(f, "{value}")?;
				}

				f.write_str(")")
			},
		}
	}
}

fn write_joined(f: &mut Formatter<'_>, nodes: &[Predicate], separator: &str) -> std::fmt::Result {
	for (index, node) in nodes.iter().enumerate() {
		if index > 0 {
			f.write_str(separator)?;
		}

		match node {
			Predicate::And(_) | Predicate::Or(_) => write!(f, "({node})")?,
			_ => write!(f, "{node}")?,
		}
	}

	Ok(())
}

fn literal_equals(field: Field, literal: &Literal, payload: &Map<String, Value>) -> bool {
	let Some(actual) = payload.get(field.as_str()) else {
		return false;
	};

	match literal {
		Literal::Text(expected) => actual.as_str() == Some(expected.as_str()),
		Literal::Number(expected) => actual.as_f64() == Some(*expected),
	}
}

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
	Ident(String),
	Text(String),
	Number(f64),
	Op(CompareOp),
	LParen,
	RParen,
	LBracket,
	RBracket,
	Comma,
	AndAnd,
	OrOr,
	Bang,
}
impl TokenKind {
	fn describe(&self) -> String {
		match self {
			Self::Ident(name) => format!("identifier '{name}'"),
			Self::Text(_) => "string literal".to_string(),
			Self::Number(_) => "number literal".to_string(),
			Self::Op(op) => format!("operator '{}'", op.as_str()),
			Self::LParen => "'('".to_string(),
			Self::RParen => "')'".to_string(),
			Self::LBracket => "'['".to_string(),
			Self::RBracket => "']'".to_string(),
			Self::Comma => "','".to_string(),
			Self::AndAnd => "'&&'".to_string(),
			Self::OrOr => "'||'".to_string(),
			Self::Bang => "'!'".to_string(),
		}
	}

	fn is_keyword(&self, keyword: &str) -> bool {
		matches!(self, Self::Ident(name) if name.eq_ignore_ascii_case(keyword))
	}
}

#[derive(Clone, Debug)]
struct Token {
	kind: TokenKind,
	offset: usize,
}

fn lex(source: &str) -> Result<Vec<Token>, PredicateError> {
	let bytes = source.as_bytes();
	let mut tokens = Vec::new();
	let mut pos = 0;

	while pos < bytes.len() {
		let byte = bytes[pos];
		let start = pos;

		if byte.is_ascii_whitespace() {
			pos += 1;

			continue;
		}

		let kind = match byte {
			b'(' => {
				pos += 1;

				TokenKind::LParen
			},
			b')' => {
				pos += 1;

				TokenKind::RParen
			},
			b'[' => {
				pos += 1;

				TokenKind::LBracket
			},
			b']' => {
				pos += 1;

				TokenKind::RBracket
			},
			b',' => {
				pos += 1;

				TokenKind::Comma
			},
			b'=' => {
				pos += if bytes.get(pos + 1) == Some(&b'=') { 2 } else { 1 };

				TokenKind::Op(CompareOp::Eq)
			},
			b'!' =>
				if bytes.get(pos + 1) == Some(&b'=') {
					pos += 2;

					TokenKind::Op(CompareOp::Neq)
				} else {
					pos += 1;

					TokenKind::Bang
				},
			b'<' | b'>' => {
				let inclusive = bytes.get(pos + 1) == Some(&b'=');

				pos += if inclusive { 2 } else { 1 };

				TokenKind::Op(match (byte, inclusive) {
					(b'<', false) => CompareOp::Lt,
					(b'<', true) => CompareOp::Lte,
					(_, false) => CompareOp::Gt,
					_ => CompareOp::Gte,
				})
			},
			b'&' | b'|' => {
				if bytes.get(pos + 1) != Some(&byte) {
					return Err(PredicateError::new(
						start,
						format!("expected '{0}{0}'.", byte as char),
					));
				}

				pos += 2;

				if byte == b'&' { TokenKind::AndAnd } else { TokenKind::OrOr }
			},
			b'"' | b'\'' => {
				let (text, next) = lex_string(source, start)?;

				pos = next;

				TokenKind::Text(text)
			},
			b'0'..=b'9' | b'-' | b'+' | b'.' => {
				let (value, next) = lex_number(source, start)?;

				pos = next;

				TokenKind::Number(value)
			},
			b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
				while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
				{
					pos += 1;
				}

				TokenKind::Ident(source[start..pos].to_string())
			},
			_ => {
				let ch = source[start..].chars().next().unwrap_or('?');

				return Err(PredicateError::new(start, format!("unexpected character '{ch}'.")));
			},
		};

		tokens.push(Token { kind, offset: start });
	}

	Ok(tokens)
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), PredicateError> {
	let mut chars = source[start..].char_indices();
	let Some((_, quote)) = chars.next() else {
		return Err(PredicateError::new(start, "expected string literal."));
	};
	let mut text = String::new();

	while let Some((index, ch)) = chars.next() {
		match ch {
			'\\' => {
				let Some((_, escaped)) = chars.next() else {
					break;
				};

				text.push(match escaped {
					'n' => '\n',
					't' => '\t',
					other => other,
				});
			},
			ch if ch == quote => return Ok((text, start + index + ch.len_utf8())),
			other => text.push(other),
		}
	}

	Err(PredicateError::new(start, "unterminated string literal."))
}

fn lex_number(source: &str, start: usize) -> Result<(f64, usize), PredicateError> {
	let bytes = source.as_bytes();
	let mut end = start;

	if matches!(bytes[end], b'-' | b'+') {
		end += 1;
	}

	while end < bytes.len() {
		match bytes[end] {
			b'0'..=b'9' | b'.' => end += 1,
			b'e' | b'E' => {
				end += 1;

				if end < bytes.len() && matches!(bytes[end], b'-' | b'+') {
					end += 1;
				}
			},
			_ => break,
		}
	}

	let raw = &source[start..end];
	let value: f64 = raw
		.parse()
		.map_err(|_| PredicateError::new(start, format!("invalid number literal '{raw}'.")))?;

	if !value.is_finite() {
		return Err(PredicateError::new(start, format!("number literal '{raw}' is not finite.")));
	}

	Ok((value, end))
}

struct Parser {
	tokens: Vec<Token>,
	pos: usize,
	nodes: usize,
	end: usize,
}
impl Parser {
	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.pos)
	}

	fn next(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.pos).cloned();

		if token.is_some() {
			self.pos += 1;
		}

		token
	}

	fn offset(&self) -> usize {
		self.peek().map(|token| token.offset).unwrap_or(self.end)
	}

	fn count_node(&mut self) -> Result<(), PredicateError> {
		self.nodes += 1;

		if self.nodes > MAX_PREDICATE_NODES {
			return Err(PredicateError::new(
				self.offset(),
				format!("expression exceeds node limit ({}/{MAX_PREDICATE_NODES}).", self.nodes),
			));
		}

		Ok(())
	}

	fn eat_keyword(&mut self, keyword: &str) -> bool {
		if self.peek().map(|token| token.kind.is_keyword(keyword)).unwrap_or(false) {
			self.pos += 1;

			return true;
		}

		false
	}

	fn eat(&mut self, kind: &TokenKind) -> bool {
		if self.peek().map(|token| &token.kind == kind).unwrap_or(false) {
			self.pos += 1;

			return true;
		}

		false
	}

	fn parse_or(&mut self, depth: usize) -> Result<Predicate, PredicateError> {
		let mut nodes = vec![self.parse_and(depth)?];

		while self.eat_keyword("or") || self.eat(&TokenKind::OrOr) {
			nodes.push(self.parse_and(depth)?);
		}

		if nodes.len() == 1 {
			return Ok(nodes.remove(0));
		}

		self.count_node()?;

		Ok(Predicate::Or(nodes))
	}

	fn parse_and(&mut self, depth: usize) -> Result<Predicate, PredicateError> {
		let mut nodes = vec![self.parse_unary(depth)?];

		while self.eat_keyword("and") || self.eat(&TokenKind::AndAnd) {
			nodes.push(self.parse_unary(depth)?);
		}

		if nodes.len() == 1 {
			return Ok(nodes.remove(0));
		}

		self.count_node()?;

		Ok(Predicate::And(nodes))
	}

	fn parse_unary(&mut self, depth: usize) -> Result<Predicate, PredicateError> {
		if depth > MAX_PREDICATE_DEPTH {
			return Err(PredicateError::new(
				self.offset(),
				format!("expression exceeds depth limit ({depth}/{MAX_PREDICATE_DEPTH})."),
			));
		}
		if self.eat_keyword("not") || self.eat(&TokenKind::Bang) {
			let inner = self.parse_unary(depth + 1)?;

			self.count_node()?;

			return Ok(Predicate::Not(Box::new(inner)));
		}
		if self.eat(&TokenKind::LParen) {
			let inner = self.parse_or(depth + 1)?;

			if !self.eat(&TokenKind::RParen) {
				return Err(PredicateError::new(self.offset(), "expected ')'."));
			}

			return Ok(inner);
		}
		if self.eat_keyword("true") {
			self.count_node()?;

			return Ok(Predicate::All);
		}
		if self.eat_keyword("false") {
			self.count_node()?;

			return Ok(Predicate::Not(Box::new(Predicate::All)));
		}

		self.parse_condition()
	}

	fn parse_condition(&mut self) -> Result<Predicate, PredicateError> {
		let offset = self.offset();
		let Some(Token { kind: TokenKind::Ident(name), .. }) = self.next() else {
			return Err(PredicateError::new(offset, "expected a field name."));
		};
		let field = Field::parse(&name.to_ascii_lowercase()).ok_or_else(|| {
			PredicateError::new(
				offset,
				format!("field '{name}' is not in allowlist: id, city, type, lat, lon."),
			)
		})?;

		self.count_node()?;

		let op_offset = self.offset();

		if self.eat_keyword("in") {
			let values = self.parse_list(field)?;

			return Ok(Predicate::In { field, values, negated: false });
		}
		if self.eat_keyword("not") {
			if !self.eat_keyword("in") {
				return Err(PredicateError::new(self.offset(), "expected 'in' after 'not'."));
			}

			let values = self.parse_list(field)?;

			return Ok(Predicate::In { field, values, negated: true });
		}

		let Some(Token { kind: TokenKind::Op(op), .. }) = self.next() else {
			return Err(PredicateError::new(op_offset, "expected a comparison operator."));
		};

		if op.is_ordering() && field.kind() == FieldKind::Text {
			return Err(PredicateError::new(
				op_offset,
				format!("operator '{}' requires a numeric field.", op.as_str()),
			));
		}

		let value = self.parse_literal(field)?;

		Ok(Predicate::Compare { field, op, value })
	}

	fn parse_list(&mut self, field: Field) -> Result<Vec<Literal>, PredicateError> {
		let close = if self.eat(&TokenKind::LParen) {
			TokenKind::RParen
		} else if self.eat(&TokenKind::LBracket) {
			TokenKind::RBracket
		} else {
			return Err(PredicateError::new(self.offset(), "expected '(' or '[' to open a list."));
		};
		let open_offset = self.offset();
		let mut values = Vec::new();

		if self.eat(&close) {
			return Err(PredicateError::new(open_offset, "in list must be non-empty."));
		}

		loop {
			values.push(self.parse_literal(field)?);

			if values.len() > MAX_IN_LIST_ITEMS {
				return Err(PredicateError::new(
					self.offset(),
					format!("in list exceeds maximum size ({MAX_IN_LIST_ITEMS})."),
				));
			}
			if self.eat(&TokenKind::Comma) {
				continue;
			}
			if self.eat(&close) {
				return Ok(values);
			}

			return Err(PredicateError::new(self.offset(), "expected ',' or end of list."));
		}
	}

	fn parse_literal(&mut self, field: Field) -> Result<Literal, PredicateError> {
		let offset = self.offset();
		let literal = match self.next().map(|token| token.kind) {
			Some(TokenKind::Text(text)) => Literal::Text(text),
			Some(TokenKind::Number(value)) => Literal::Number(value),
			_ => return Err(PredicateError::new(offset, "expected a string or number literal.")),
		};

		match (field.kind(), &literal) {
			(FieldKind::Text, Literal::Text(_)) | (FieldKind::Number, Literal::Number(_)) =>
				Ok(literal),
			(FieldKind::Text, _) => Err(PredicateError::new(
				offset,
				format!("field '{}' requires a string literal.", field.as_str()),
			)),
			(FieldKind::Number, _) => Err(PredicateError::new(
				offset,
				format!("field '{}' requires a number literal.", field.as_str()),
			)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lexes_operators_and_literals() {
		let tokens = lex(r#"lat>=-1.5e2 && type != 'Tr\'ee'"#).expect("lex failed");
		let kinds: Vec<TokenKind> = tokens.into_iter().map(|token| token.kind).collect();

		assert_eq!(
			kinds,
			vec![
				TokenKind::Ident("lat".to_string()),
				TokenKind::Op(CompareOp::Gte),
				TokenKind::Number(-150.0),
				TokenKind::AndAnd,
				TokenKind::Ident("type".to_string()),
				TokenKind::Op(CompareOp::Neq),
				TokenKind::Text("Tr'ee".to_string()),
			]
		);
	}

	#[test]
	fn reports_unterminated_string_offset() {
		let err = lex(r#"type == "Car"#).expect_err("Expected lex error.");

		assert_eq!(err.offset, 8);
	}
}
