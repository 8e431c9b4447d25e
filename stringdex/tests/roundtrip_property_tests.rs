use proptest::prelude::*;
use std::collections::BTreeMap;
use stringdex::formats::{FormatType, StringsFormat, parse};
use stringdex::types::Pair;

fn key_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z0-9_.]{0,15}").expect("valid key regex")
}

fn value_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 _%@\\-\\.,!\\?\"'\\\\/;=\n\täöüßé日本]{0,30}")
        .expect("valid value regex")
}

fn dataset_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..12)
}

fn render(values: &BTreeMap<String, String>) -> Result<Vec<u8>, TestCaseError> {
    let format = StringsFormat {
        encoding: encoding_rs::UTF_8,
        pairs: values
            .iter()
            .map(|(key, value)| Pair::new(key.clone(), value.clone()))
            .collect(),
        warnings: Vec::new(),
    };
    let mut out = Vec::new();
    format
        .to_writer(&mut out)
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    Ok(out)
}

fn utf16le(text: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for unit in String::from_utf8_lossy(text).encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn legacy_strings_roundtrip_preserves_pairs(values in dataset_strategy()) {
        let bytes = render(&values)?;
        let decoded = parse(&bytes, None).map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(decoded.format, FormatType::Strings);
        prop_assert!(decoded.warnings.is_empty(), "warnings: {:?}", decoded.warnings);
        let actual: BTreeMap<String, String> = decoded
            .pairs
            .into_iter()
            .map(|pair| (pair.key, pair.value))
            .collect();
        prop_assert_eq!(actual, values);
    }

    #[test]
    fn utf16_encoding_does_not_change_pairs(values in dataset_strategy()) {
        let utf8 = render(&values)?;
        let from_utf8 = parse(&utf8, None).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let from_utf16 = parse(&utf16le(&utf8), None).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(from_utf8.pairs, from_utf16.pairs);
    }

    #[test]
    fn parser_never_panics_on_arbitrary_text(text in "\\PC{0,200}") {
        let _ = parse(text.as_bytes(), None);
    }
}
