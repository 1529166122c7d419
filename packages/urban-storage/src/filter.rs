//! Translation of the predicate language into Qdrant payload filters.

use qdrant_client::qdrant::{Condition, Filter, Range};

use urban_domain::predicate::{CompareOp, Literal, Predicate};

/// Builds the filter for `predicate`, or `None` when it matches every record.
pub fn to_filter(predicate: &Predicate) -> Option<Filter> {
	match predicate {
		Predicate::All => None,
		Predicate::And(nodes) => Some(Filter::must(nodes.iter().map(to_condition))),
		Predicate::Or(nodes) => Some(Filter::should(nodes.iter().map(to_condition))),
		Predicate::Not(node) => Some(Filter::must_not([to_condition(node)])),
		leaf => Some(Filter::must([to_condition(leaf)])),
	}
}

fn to_condition(predicate: &Predicate) -> Condition {
	match predicate {
		Predicate::All => Condition::from(Filter::default()),
		Predicate::And(nodes) => Condition::from(Filter::must(nodes.iter().map(to_condition))),
		Predicate::Or(nodes) => Condition::from(Filter::should(nodes.iter().map(to_condition))),
		Predicate::Not(node) => Condition::from(Filter::must_not([to_condition(node)])),
		Predicate::Compare { field, op, value } => compare(field.as_str(), *op, value),
		Predicate::In { field, values, negated } => {
			let condition = one_of(field.as_str(), values);

			if *negated { Condition::from(Filter::must_not([condition])) } else { condition }
		},
	}
}

fn compare(field: &str, op: CompareOp, value: &Literal) -> Condition {
	match (op, value) {
		(CompareOp::Eq, literal) => equals(field, literal),
		(CompareOp::Neq, literal) => Condition::from(Filter::must_not([equals(field, literal)])),
		(op, Literal::Number(number)) => {
			let number = Some(*number);
			let range = match op {
				CompareOp::Lt => Range { lt: number, ..Default::default() },
				CompareOp::Lte => Range { lte: number, ..Default::default() },
				CompareOp::Gt => Range { gt: number, ..Default::default() },
				_ => Range { gte: number, ..Default::default() },
			};

			Condition::range(field, range)
		},
		// The parser rejects ordering on text fields; a text bound degrades to equality.
		(_, literal) => equals(field, literal),
	}
}

fn equals(field: &str, literal: &Literal) -> Condition {
	match literal {
		Literal::Text(text) => Condition::matches(field, text.clone()),
		Literal::Number(number) => Condition::range(
			field,
			Range { gte: Some(*number), lte: Some(*number), ..Default::default() },
		),
	}
}

fn one_of(field: &str, values: &[Literal]) -> Condition {
	let texts = values
		.iter()
		.filter_map(|value| match value {
			Literal::Text(text) => Some(text.clone()),
			Literal::Number(_) => None,
		})
		.collect::<Vec<_>>();

	if texts.len() == values.len() {
		return Condition::matches(field, texts);
	}

	Condition::from(Filter::should(values.iter().map(|value| equals(field, value))))
}
