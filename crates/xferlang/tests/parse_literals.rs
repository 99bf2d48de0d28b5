use std::str::FromStr;

use rstest::rstest;
use rust_decimal::Decimal;
use xferlang::{DateTimeValue, Document, ElementKind, ElementType, ErrorCode, Parser, ParserOptions, Position, parse, parse_bytes};

fn root_kind(text: &str) -> ElementKind {
    let doc = parse(text).unwrap();
    doc.kind(doc.root().expect("root")).clone()
}

fn error_code(text: &str) -> ErrorCode {
    parse(text).unwrap_err().code
}

#[rstest]
#[case("\"hello\"", ElementKind::string("hello"))]
#[case("<\"hello\">", ElementKind::string("hello"))]
#[case("<\"\"say \"hi\"\"\">", ElementKind::string("say \"hi\""))]
#[case("\"\"", ElementKind::string(""))]
#[case("<\"\">", ElementKind::string(""))]
#[case("42", ElementKind::Integer(42))]
#[case("-7", ElementKind::Integer(-7))]
#[case("#42", ElementKind::Integer(42))]
#[case("#$2A", ElementKind::Integer(42))]
#[case("#%101", ElementKind::Integer(5))]
#[case("<#42#>", ElementKind::Integer(42))]
#[case("&5000000000", ElementKind::Long(5_000_000_000))]
#[case("3000000000", ElementKind::Long(3_000_000_000))]
#[case("^2.5", ElementKind::Double(2.5))]
#[case("~true", ElementKind::Boolean(true))]
#[case("~FALSE", ElementKind::Boolean(false))]
#[case("<~false~>", ElementKind::Boolean(false))]
#[case("\\$41", ElementKind::Character('A'))]
#[case("\\65", ElementKind::Character('A'))]
#[case("\\tab", ElementKind::Character('\t'))]
#[case("<\\$263A\\>", ElementKind::Character('\u{263A}'))]
#[case("?", ElementKind::Null)]
#[case("<??>", ElementKind::Null)]
#[case("<>", ElementKind::Empty)]
#[case(":name:", ElementKind::Identifier("name".into()))]
fn scalar_literals(#[case] text: &str, #[case] expected: ElementKind) {
    assert_eq!(root_kind(text), expected, "parsing {text}");
}

#[rstest]
#[case("*1.50", "1.50")]
#[case("*-0.001", "-0.001")]
#[case("<*12.5*>", "12.5")]
fn decimal_literals(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(root_kind(text), ElementKind::Decimal(Decimal::from_str(expected).unwrap()));
}

#[test]
fn date_time_literals() {
    match root_kind("@2024-01-02T03:04:05Z@") {
        ElementKind::DateTime { value: DateTimeValue::Offset(dt), .. } => {
            assert_eq!(dt.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        }
        other => panic!("expected an offset date/time, got {other:?}"),
    }
    assert!(matches!(root_kind("@2024-01-02@"), ElementKind::DateTime { value: DateTimeValue::Date(_), .. }));
    assert!(matches!(root_kind("@12:30@"), ElementKind::DateTime { value: DateTimeValue::Time(_), .. }));
    assert!(matches!(root_kind("@1.02:03:04@"), ElementKind::DateTime { value: DateTimeValue::Duration(_), .. }));
    assert!(matches!(root_kind("@-00:15:00@"), ElementKind::DateTime { value: DateTimeValue::Duration(_), .. }));
}

#[test]
fn long_double_warns_about_precision() {
    let doc = parse("^3.14159265358979323846").unwrap();
    assert!(matches!(doc.kind(doc.root().unwrap()), ElementKind::Double(_)));
    assert_eq!(doc.warnings_of_kind(xferlang::WarningKind::NumericPrecisionLoss).count(), 1);
}

#[test]
fn containers() {
    let doc = parse("{ name \"Alice\" age 30 scores [1 2 3] pair (\"a\" ~true) }").unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.keys(root), vec!["name", "age", "scores", "pair"]);
    let scores = doc.object_get(root, "scores").unwrap();
    assert_eq!(doc.semantic_count(scores), 3);
    assert_eq!(doc.kind(scores), &ElementKind::Array { element_type: Some(ElementType::Integer) });
    let pair = doc.object_get(root, "pair").unwrap();
    assert_eq!(doc.kind(pair), &ElementKind::Tuple);
    assert_eq!(doc.kind(doc.get_at(pair, 1).unwrap()), &ElementKind::Boolean(true));
}

#[test]
fn explicit_containers_and_keys() {
    let doc = parse("<{ =first name= \"Ada\" }>").unwrap();
    let root = doc.root().unwrap();
    let value = doc.object_get(root, "first name").unwrap();
    assert_eq!(doc.kind(value), &ElementKind::string("Ada"));
}

#[test]
fn empty_containers() {
    assert_eq!(root_kind("[]"), ElementKind::Array { element_type: None });
    assert_eq!(root_kind("()"), ElementKind::Tuple);
    assert_eq!(root_kind("{}"), ElementKind::Object);
}

#[test]
fn comments_are_kept_but_not_semantic() {
    let doc = parse("</ header /> [1 </ one /> 2]").unwrap();
    assert_eq!(doc.top_level().len(), 2);
    let root = doc.root().unwrap();
    assert_eq!(doc.children(root).len(), 3);
    assert_eq!(doc.semantic_count(root), 2);
}

#[rstest]
#[case("")]
#[case("   \n\t ")]
fn empty_input_has_no_root(#[case] text: &str) {
    let doc = parse(text).unwrap();
    assert!(doc.root().is_none());
    assert!(doc.top_level().is_empty());
}

#[rstest]
#[case("\"unterminated", ErrorCode::UnexpectedEnd)]
#[case("[1 2", ErrorCode::UnexpectedEnd)]
#[case("[1 2)", ErrorCode::UnbalancedDelimiter)]
#[case("]", ErrorCode::UnbalancedDelimiter)]
#[case("#abc", ErrorCode::InvalidLiteral)]
#[case("~maybe", ErrorCode::InvalidLiteral)]
#[case("@not-a-date@", ErrorCode::InvalidLiteral)]
#[case("\\nosuchchar", ErrorCode::InvalidEscape)]
#[case("\\$D800", ErrorCode::InvalidEscape)]
#[case("{ a 1 a 2 }", ErrorCode::DuplicateKey)]
#[case("[1 \"x\"]", ErrorCode::TypeMismatch)]
#[case("{ 1 }", ErrorCode::TypeMismatch)]
#[case("1 2", ErrorCode::MultipleRoots)]
#[case("{ key }", ErrorCode::UnexpectedCharacter)]
#[case("$", ErrorCode::UnexpectedCharacter)]
fn fatal_errors(#[case] text: &str, #[case] code: ErrorCode) {
    assert_eq!(error_code(text), code, "parsing {text}");
}

#[test]
fn errors_carry_positions() {
    let err = parse("{ a 1\n  a 2 }").unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateKey);
    assert_eq!(err.position, Some(Position::new(2, 3)));
    assert!(err.to_string().contains("'a'"));

    let err = parse("[1\n\"x\"]").unwrap_err();
    assert_eq!(err.position, Some(Position::new(2, 1)));
}

#[test]
fn bytes_with_bom() {
    let doc = parse_bytes(b"\xEF\xBB\xBF42").unwrap();
    assert_eq!(doc.kind(doc.root().unwrap()), &ElementKind::Integer(42));
}

#[test]
fn invalid_utf8_is_an_encoding_error() {
    let err = parse_bytes(&[b'"', 0xFF, b'"']).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidEncoding);
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = Parser::new().parse_file("/definitely/not/here.xfer").unwrap_err();
    assert_eq!(err.code, ErrorCode::Io);
}

#[rstest]
#[case(true, "\u{e9}")]
#[case(false, "e\u{301}")]
fn text_normalization(#[case] normalize: bool, #[case] expected: &str) {
    let parser = Parser::with_options(ParserOptions::builtin().with_normalization(normalize));
    let doc: Document = parser.parse("\"e\u{301}\"").unwrap();
    assert_eq!(doc.kind(doc.root().unwrap()), &ElementKind::string(expected));
}
