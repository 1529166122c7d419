use serde_json::{Map, Value};

use urban_domain::predicate::{CompareOp, Field, Literal, Predicate};

fn payload(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		other => panic!("Expected a JSON object, got {other}."),
	}
}

fn car_in_riga() -> Map<String, Value> {
	payload(serde_json::json!({
		"id": "obj-1",
		"city": "Riga",
		"type": "Car",
		"lat": 56.95,
		"lon": 24.1,
	}))
}

#[test]
fn parses_synthesizer_example() {
	let predicate = Predicate::parse(r#"type in ("Car","Truck") and type != "Tree""#)
		.expect("Expected the example expression to parse.");

	assert_eq!(
		predicate,
		Predicate::And(vec![
			Predicate::In {
				field: Field::Type,
				values: vec![
					Literal::Text("Car".to_string()),
					Literal::Text("Truck".to_string())
				],
				negated: false,
			},
			Predicate::Compare {
				field: Field::Type,
				op: CompareOp::Neq,
				value: Literal::Text("Tree".to_string()),
			},
		])
	);
	assert!(predicate.matches(&car_in_riga()));
}

#[test]
fn empty_expression_matches_everything() {
	let predicate = Predicate::parse("   ").expect("Blank expressions must parse.");

	assert_eq!(predicate, Predicate::All);
	assert!(predicate.matches(&Map::new()));
}

#[test]
fn and_binds_tighter_than_or() {
	let predicate = Predicate::parse(r#"type == "Tree" or type == "Car" and city == "Tallinn""#)
		.expect("Expected expression to parse.");

	// Car in Riga fails the right-hand conjunction and is not a Tree.
	assert!(!predicate.matches(&car_in_riga()));

	let grouped = Predicate::parse(r#"(type == "Tree" or type == "Car") and city == "Riga""#)
		.expect("Expected expression to parse.");

	assert!(grouped.matches(&car_in_riga()));
}

#[test]
fn keywords_are_case_insensitive() {
	let predicate = Predicate::parse(r#"NOT type IN ['Tree', 'Bench'] AND lat >= 50"#)
		.expect("Expected expression to parse.");

	assert!(predicate.matches(&car_in_riga()));
}

#[test]
fn numeric_ranges_compare_coordinates() {
	let inside = Predicate::parse("lat > 56.9 && lat < 57 && lon <= 24.1").expect("parse failed");
	let outside = Predicate::parse("lon < 24.1").expect("parse failed");

	assert!(inside.matches(&car_in_riga()));
	assert!(!outside.matches(&car_in_riga()));
}

#[test]
fn missing_attributes_only_satisfy_negative_conditions() {
	let record = payload(serde_json::json!({ "id": "obj-2" }));

	assert!(!Predicate::parse(r#"type == "Car""#).expect("parse failed").matches(&record));
	assert!(Predicate::parse(r#"type != "Car""#).expect("parse failed").matches(&record));
	assert!(Predicate::parse(r#"type not in ("Car")"#).expect("parse failed").matches(&record));
	assert!(!Predicate::parse("lat > 0").expect("parse failed").matches(&record));
}

#[test]
fn display_renders_a_parseable_form() {
	for source in [
		r#"type in ("Car", "Truck") and type != "Tree""#,
		r#"not (city == "Riga" or lat >= 56.5) and id not in ("a\"b", "c")"#,
		"false",
		"",
	] {
		let predicate = Predicate::parse(source).expect("parse failed");
		let rendered = predicate.to_string();
		let reparsed = Predicate::parse(&rendered)
			.unwrap_or_else(|err| panic!("Rendered form {rendered:?} failed to parse: {err}"));

		assert_eq!(reparsed, predicate, "Round trip changed {source:?} via {rendered:?}");
	}
}

#[test]
fn negation_wraps_and_unwraps() {
	let predicate = Predicate::parse(r#"type == "Car""#).expect("parse failed");
	let negated = predicate.clone().negate();

	assert!(!negated.matches(&car_in_riga()));
	assert_eq!(negated.to_string(), r#"not (type == "Car")"#);
	assert_eq!(negated.negate(), predicate);
}

#[test]
fn negated_match_all_is_unsatisfiable() {
	assert!(Predicate::All.negate().is_unsatisfiable());
	assert!(Predicate::parse("false").expect("parse failed").is_unsatisfiable());
	assert!(!Predicate::parse(r#"type == "Car""#).expect("parse failed").is_unsatisfiable());
}

#[test]
fn rejects_fields_outside_the_allowlist() {
	let err = Predicate::parse(r#"colour == "red""#).expect_err("Expected field error.");

	assert_eq!(err.offset, 0);
	assert!(err.message.contains("allowlist"), "Unexpected message: {}", err.message);
}

#[test]
fn rejects_ordering_on_text_fields() {
	let err = Predicate::parse(r#"type > "Car""#).expect_err("Expected operator error.");

	assert_eq!(err.offset, 5);
}

#[test]
fn rejects_literal_type_mismatch() {
	assert!(Predicate::parse("type == 3").is_err());
	assert!(Predicate::parse(r#"lat == "north""#).is_err());
}

#[test]
fn rejects_empty_in_list() {
	let err = Predicate::parse("type in ()").expect_err("Expected list error.");

	assert!(err.message.contains("non-empty"), "Unexpected message: {}", err.message);
}

#[test]
fn rejects_trailing_tokens() {
	assert!(Predicate::parse(r#"type == "Car" "Bus""#).is_err());
	assert!(Predicate::parse(r#"(type == "Car""#).is_err());
}

#[test]
fn rejects_excessive_nesting() {
	let source = format!("{}type == \"Car\"{}", "(".repeat(12), ")".repeat(12));
	let err = Predicate::parse(&source).expect_err("Expected depth error.");

	assert!(err.message.contains("depth limit"), "Unexpected message: {}", err.message);
}
