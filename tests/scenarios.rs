use sheetcalc::domain::{column_index_of, column_letters_of, DomainError, Spreadsheet};
use sheetcalc::infrastructure::FileRepository;
use proptest::prelude::*;
use tempfile::TempDir;

fn sheet_with(cells: &[(&str, &str)]) -> Spreadsheet {
    let mut sheet = Spreadsheet::default();
    for (reference, content) in cells {
        sheet.set_cell(reference, content).unwrap();
    }
    sheet
}

#[test]
fn test_chain_follows_its_head() {
    let mut sheet = Spreadsheet::default();
    sheet.set_cell("A1", "1").unwrap();
    for k in 2..=25 {
        sheet
            .set_cell(&format!("A{k}"), &format!("=A{}+1", k - 1))
            .unwrap();
    }
    assert_eq!(sheet.evaluate("A25").unwrap(), 25.0);

    sheet.set_cell("A1", "100").unwrap();
    assert_eq!(sheet.evaluate("A25").unwrap(), 124.0);

    sheet.set_cell("A1", "-10").unwrap();
    assert_eq!(sheet.evaluate("A25").unwrap(), 14.0);
}

#[test]
fn test_column_ranges() {
    let mut sheet = Spreadsheet::default();
    for row in 1..=6 {
        sheet.set_cell(&format!("B{row}"), &row.to_string()).unwrap();
    }
    sheet.set_cell("C1", "=SUMA(B1:B6)").unwrap();
    sheet.set_cell("C2", "=SUMA(B2:B5)").unwrap();
    sheet.set_cell("C3", "=SUMA(B1:B3)+SUMA(B4:B6)").unwrap();

    assert_eq!(sheet.evaluate("C1").unwrap(), 21.0);
    assert_eq!(sheet.evaluate("C2").unwrap(), 14.0);
    assert_eq!(sheet.evaluate("C3").unwrap(), 21.0);
}

#[test]
fn test_rectangular_range_aggregates() {
    let mut sheet = sheet_with(&[
        ("E1", "1"),
        ("F1", "2"),
        ("E2", "3"),
        ("F2", "4"),
        ("E3", "5"),
        ("F3", "6"),
        ("G1", "=SUMA(E1:F3)"),
        ("G2", "=MAX(E1:F3)"),
        ("G3", "=MIN(E1:F3)"),
        ("G4", "=PROMEDIO(E1:F3)"),
        // corners given in reverse order
        ("G5", "=SUMA(F3:E1)"),
    ]);

    assert_eq!(sheet.evaluate("G1").unwrap(), 21.0);
    assert_eq!(sheet.evaluate("G2").unwrap(), 6.0);
    assert_eq!(sheet.evaluate("G3").unwrap(), 1.0);
    assert_eq!(sheet.evaluate("G4").unwrap(), 3.5);
    assert_eq!(sheet.evaluate("G5").unwrap(), 21.0);
}

#[test]
fn test_all_empty_range() {
    let mut sheet = sheet_with(&[("I1", "=SUMA(H1:H5)"), ("I2", "=PROMEDIO(H1:H5)")]);
    assert_eq!(sheet.evaluate("I1").unwrap(), 0.0);
    assert_eq!(sheet.evaluate("I2").unwrap(), 0.0);

    for name in ["MIN", "MAX"] {
        assert_eq!(
            sheet.set_cell("I3", &format!("={name}(H1:H5)")),
            Err(DomainError::InsufficientArguments(name.to_string()))
        );
        assert_eq!(sheet.raw("I3").unwrap(), "");
    }
}

#[test]
fn test_missing_value_policies_differ() {
    let mut sheet = sheet_with(&[
        ("A1", "4"),
        ("A2", "text"),
        ("A4", "8"),
        ("B1", "=SUMA(A1:A4)"),
        ("B2", "=PROMEDIO(A1:A4)"),
        ("B3", "=PROMEDIO(A1;A2;A3;A4)"),
        ("B4", "=PROMEDIO(A1:A4;0)"),
    ]);

    assert_eq!(sheet.evaluate("B1").unwrap(), 12.0);
    assert_eq!(sheet.evaluate("B2").unwrap(), 6.0);
    assert_eq!(sheet.evaluate("B3").unwrap(), 6.0);
    assert_eq!(sheet.evaluate("B4").unwrap(), 4.0);
}

#[test]
fn test_nested_calls_inside_arithmetic() {
    let mut sheet = sheet_with(&[
        ("A1", "=MAX(1;2;3)*10+MIN(8;4;6)"),
        ("A2", "=SUMA(MAX(1;5);PROMEDIO(2;4);-1)"),
        // the call's result is read back as text, so this is 2*0-3
        ("A3", "=2*MIN(-3;1)"),
        ("A4", "=2-MIN(-3;1)"),
    ]);
    assert_eq!(sheet.evaluate("A1").unwrap(), 34.0);
    assert_eq!(sheet.evaluate("A2").unwrap(), 7.0);
    assert_eq!(sheet.evaluate("A3").unwrap(), -3.0);
    assert_eq!(sheet.evaluate("A4").unwrap(), -1.0);
}

#[test]
fn test_function_names_ignore_case() {
    let mut sheet = sheet_with(&[
        ("A1", "=min(1;2)"),
        ("A2", "=Suma(A1;3)"),
        ("A3", "=sum(A1:A2)+average(2;4)"),
    ]);
    assert_eq!(sheet.evaluate("A1").unwrap(), 1.0);
    assert_eq!(sheet.evaluate("A2").unwrap(), 4.0);
    assert_eq!(sheet.evaluate("A3").unwrap(), 8.0);
}

#[test]
fn test_non_finite_call_results_are_rejected() {
    let mut sheet = Spreadsheet::default();
    assert_eq!(
        sheet.set_cell("A1", "=SUMA(1/0)"),
        Err(DomainError::InvalidToken("Infinity".to_string()))
    );
    assert_eq!(
        sheet.set_cell("A1", "=MAX(0/0;1)"),
        Err(DomainError::InvalidToken("NaN".to_string()))
    );
    assert_eq!(sheet.raw("A1").unwrap(), "");
}

#[test]
fn test_deep_chain_of_nested_calls_stops_at_the_limit() {
    // generous stack so the limit, not the stack, is what ends the recursion
    let handle = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(|| {
            let nested = |inner: &str| format!("={}{inner}{}", "SUMA(".repeat(200), ")".repeat(200));
            let mut sheet = Spreadsheet::default();
            sheet.set_cell("A1", "1").unwrap();
            sheet.set_cell("A2", &nested("A1")).unwrap();

            let mut outcomes = Vec::new();
            for k in 3..=30 {
                outcomes.push(sheet.set_cell(&format!("A{k}"), &nested(&format!("A{}", k - 1))));
            }
            (sheet.evaluate("A2"), outcomes)
        })
        .unwrap();

    let (a2, outcomes) = handle.join().unwrap();
    assert_eq!(a2, Ok(1.0));
    // A3 fails, so every later cell points at an empty A{k-1} and succeeds
    assert_eq!(outcomes[0], Err(DomainError::ExpressionTooDeep(256)));
    assert!(outcomes[1..].iter().all(Result::is_ok));
}

#[test]
fn test_indirect_cycle_is_rejected() {
    let mut sheet = sheet_with(&[("Z1", "=Z2+1"), ("Z2", "=Z3+1")]);

    let err = sheet.set_cell("Z3", "=Z1+1").unwrap_err();
    assert!(matches!(err, DomainError::CircularDependency(_)));
    assert_eq!(sheet.raw("Z3").unwrap(), "");

    // with Z3 a plain number the chain evaluates
    sheet.set_cell("Z3", "1").unwrap();
    assert_eq!(sheet.evaluate("Z1").unwrap(), 3.0);

    // turning Z3 back into a cycle leaves the number in place
    let err = sheet.set_cell("Z3", "=Z1+1").unwrap_err();
    assert!(matches!(err, DomainError::CircularDependency(_)));
    assert_eq!(sheet.raw("Z3").unwrap(), "1");
}

#[test]
fn test_cycle_through_a_range() {
    let mut sheet = sheet_with(&[("C1", "1"), ("C2", "2")]);
    let err = sheet.set_cell("C3", "=SUMA(C1:C3)").unwrap_err();
    assert!(matches!(err, DomainError::CircularDependency(_)));
}

#[test]
fn test_multi_letter_columns() {
    let mut sheet = sheet_with(&[("AA1", "7"), ("BA1", "8"), ("BB1", "=AA1+BA1")]);
    assert_eq!(sheet.evaluate("bb1").unwrap(), 15.0);
}

#[test]
fn test_number_and_text_cells() {
    let mut sheet = sheet_with(&[("D1", "2.5e1"), ("D2", "hello"), ("D3", "=D1+D2+D4")]);
    assert_eq!(sheet.evaluate("D1").unwrap(), 25.0);
    assert_eq!(sheet.evaluate("D2").unwrap(), 0.0);
    assert_eq!(sheet.evaluate("D3").unwrap(), 25.0);
}

#[test]
fn test_error_kinds() {
    let mut sheet = Spreadsheet::default();
    let cases = [
        ("=1+", DomainError::SyntaxError),
        ("=*2", DomainError::SyntaxError),
        ("=(1+2", DomainError::MismatchedParentheses),
        ("=(1)(2)", DomainError::BadExpression),
        ("=1%2", DomainError::InvalidCharacter('%')),
        ("=FOO1X", DomainError::InvalidToken("X".to_string())),
        ("=SUMA(1;2", DomainError::UnterminatedFunctionCall("SUMA".to_string())),
        ("=A0+1", DomainError::InvalidReference("A0".to_string())),
        // a call is evaluated before the text around it is tokenized
        ("=MIN(H1:H2)+%", DomainError::InsufficientArguments("MIN".to_string())),
        ("=SUMA(1;%", DomainError::UnterminatedFunctionCall("SUMA".to_string())),
        ("=SUMA(1)+%", DomainError::InvalidCharacter('%')),
    ];

    for (formula, expected) in cases {
        assert_eq!(sheet.set_cell("A1", formula), Err(expected), "formula {formula}");
        assert_eq!(sheet.raw("A1").unwrap(), "");
    }
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.s2v");

    let sheet = sheet_with(&[
        ("B1", "1"),
        ("B2", "2"),
        ("B3", "3"),
        ("C1", "=SUMA(B1:B3;10)"),
        ("C2", "=MAX(B1;B3)"),
        ("A4", "total"),
    ]);
    FileRepository::save_spreadsheet(&sheet, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, ";1;=SUMA(B1:B3,10)\n;2;=MAX(B1,B3)\n;3;\ntotal;;\n");

    let mut loaded = FileRepository::load_spreadsheet(&path, 256).unwrap();
    assert_eq!(loaded.raw("C1").unwrap(), "=SUMA(B1:B3;10)");
    assert_eq!(loaded.evaluate("C1").unwrap(), 16.0);
    assert_eq!(loaded.evaluate("C2").unwrap(), 3.0);
    assert_eq!(loaded.raw("A4").unwrap(), "total");
}

proptest! {
    #[test]
    fn column_letters_round_trip(index in 0usize..5_000_000) {
        let letters = column_letters_of(index);
        prop_assert!(letters.chars().all(|ch| ch.is_ascii_uppercase()));
        prop_assert_eq!(column_index_of(&letters).unwrap(), index);
    }

    #[test]
    fn number_cells_evaluate_to_their_literal(value in -1.0e9f64..1.0e9) {
        let mut sheet = Spreadsheet::default();
        sheet.set_cell("A1", &value.to_string()).unwrap();
        prop_assert_eq!(sheet.evaluate("A1").unwrap(), value);
    }
}
