//! Output Protocol
//!
//! Diff programs report their results as plain text lines such as
//! `Solution [μs]: 1234` and `min edit length 17`. The set of lines a program
//! is expected to print is a versioned [`OutputProtocol`]; the parser is the
//! only place that knows the line format.

use crate::error::RunnerError;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

/// Edit distance reported by the program
pub const MIN_EDIT_LEN: &str = "min_edit_len";
/// Time spent reading both inputs
pub const MICROS_INPUT: &str = "micros_input";
/// Time spent in precomputation
pub const MICROS_PRECOMPUTE: &str = "micros_precompute";
/// Time until the edit length was known
pub const MICROS_UNTIL_LEN: &str = "micros_until_len";
/// Time spent producing the edit script
pub const MICROS_EDIT_SCRIPT: &str = "micros_edit_script";

/// Turns a match into a field value
pub type Extractor = fn(&Captures<'_>) -> Result<u64, String>;

/// Parse the first capture group as an unsigned integer.
pub fn first_capture_u64(captures: &Captures<'_>) -> Result<u64, String> {
    let text = captures
        .get(1)
        .map(|m| m.as_str())
        .ok_or_else(|| "pattern has no capture group".to_string())?;
    text.parse::<u64>()
        .map_err(|e| format!("{:?} is not an unsigned integer: {}", text, e))
}

/// One expected output line
#[derive(Clone)]
pub struct FieldSpec {
    pub key: String,
    pub pattern: Regex,
    pub extract: Extractor,
    /// Required fields must be present; optional ones may be absent
    pub required: bool,
}

impl FieldSpec {
    /// Required field whose whole (trimmed) line matches `pattern`.
    pub fn new(key: impl Into<String>, pattern: &str) -> Result<Self, RunnerError> {
        let key = key.into();
        let pattern = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            RunnerError::InvalidConfiguration(format!("bad pattern for field {}: {}", key, e))
        })?;
        Ok(Self {
            key,
            pattern,
            extract: first_capture_u64,
            required: true,
        })
    }

    /// Mark the field optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Replace the value extractor
    pub fn with_extractor(mut self, extract: Extractor) -> Self {
        self.extract = extract;
        self
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("key", &self.key)
            .field("pattern", &self.pattern.as_str())
            .field("required", &self.required)
            .finish()
    }
}

/// Field values parsed from one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    values: BTreeMap<String, u64>,
}

impl ParsedOutput {
    /// Value of `key`, if it was printed
    pub fn get(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    /// Value of `key`, failing as a missing field otherwise
    pub fn require(&self, key: &str) -> Result<u64, RunnerError> {
        self.get(key)
            .ok_or_else(|| RunnerError::MissingFields(vec![key.to_string()]))
    }

    /// Record a value computed outside the parser
    pub fn insert(&mut self, key: impl Into<String>, value: u64) {
        self.values.insert(key.into(), value);
    }

    /// All parsed fields in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

/// A named, versioned set of expected output fields
#[derive(Debug, Clone)]
pub struct OutputProtocol {
    pub version: u32,
    pub fields: Vec<FieldSpec>,
}

impl OutputProtocol {
    /// Version 1: edit length plus per-phase timings in microseconds.
    pub fn v1() -> Result<Self, RunnerError> {
        Ok(Self {
            version: 1,
            fields: vec![
                FieldSpec::new(MIN_EDIT_LEN, r"min edit length (\d+)")?,
                FieldSpec::new(MICROS_INPUT, r"Read Input \[μs\]: (\d+)")?,
                FieldSpec::new(MICROS_PRECOMPUTE, r"Precompute \[μs\]: (\d+)")?,
                FieldSpec::new(MICROS_UNTIL_LEN, r"Solution \[μs\]: (\d+)")?,
                FieldSpec::new(MICROS_EDIT_SCRIPT, r"Edit Script \[μs\]: (\d+)")?.optional(),
            ],
        })
    }

    /// Protocol with exactly the given fields
    pub fn custom(version: u32, fields: Vec<FieldSpec>) -> Self {
        Self { version, fields }
    }

    /// Keys of all declared fields, in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    /// Parse program output.
    ///
    /// A field matched twice fails immediately. Missing required fields are
    /// reported together once every line has been scanned.
    pub fn parse(&self, raw: &str) -> Result<ParsedOutput, RunnerError> {
        let mut parsed = ParsedOutput::default();

        for line in raw.lines() {
            let line = line.trim();
            for field in &self.fields {
                let Some(captures) = field.pattern.captures(line) else {
                    continue;
                };
                if parsed.values.contains_key(&field.key) {
                    return Err(RunnerError::DuplicateField(field.key.clone()));
                }
                let value = (field.extract)(&captures).map_err(|message| {
                    RunnerError::FieldExtraction {
                        key: field.key.clone(),
                        message,
                    }
                })?;
                parsed.values.insert(field.key.clone(), value);
            }
        }

        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.required && !parsed.values.contains_key(&f.key))
            .map(|f| f.key.clone())
            .collect();
        if !missing.is_empty() {
            return Err(RunnerError::MissingFields(missing));
        }

        Ok(parsed)
    }
}

/// Edit count from `diff` normal-format output: one `<` or `>` line per
/// deleted or inserted line.
pub fn count_diff_edits(raw: &str) -> u64 {
    raw.lines()
        .filter(|line| line.starts_with('<') || line.starts_with('>'))
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "\
Read Input [μs]: 120
Precompute [μs]: 30
  Solution [μs]: 4500
min edit length 17
";

    #[test]
    fn test_parse_v1() {
        let parsed = OutputProtocol::v1().unwrap().parse(FULL).unwrap();
        assert_eq!(parsed.get(MIN_EDIT_LEN), Some(17));
        assert_eq!(parsed.get(MICROS_INPUT), Some(120));
        assert_eq!(parsed.get(MICROS_PRECOMPUTE), Some(30));
        assert_eq!(parsed.get(MICROS_UNTIL_LEN), Some(4500));
        assert_eq!(parsed.get(MICROS_EDIT_SCRIPT), None);
    }

    #[test]
    fn test_optional_field_present() {
        let raw = format!("{}Edit Script [μs]: 9\n", FULL);
        let parsed = OutputProtocol::v1().unwrap().parse(&raw).unwrap();
        assert_eq!(parsed.get(MICROS_EDIT_SCRIPT), Some(9));
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let err = OutputProtocol::v1()
            .unwrap()
            .parse("Read Input [μs]: 1\nunrelated chatter\n")
            .unwrap_err();
        match err {
            RunnerError::MissingFields(keys) => assert_eq!(
                keys,
                vec![MIN_EDIT_LEN, MICROS_PRECOMPUTE, MICROS_UNTIL_LEN]
            ),
            other => panic!("expected missing fields, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_field_fails_fast() {
        let raw = format!("{}min edit length 3\n", FULL);
        let err = OutputProtocol::v1().unwrap().parse(&raw).unwrap_err();
        assert!(matches!(err, RunnerError::DuplicateField(ref k) if k == MIN_EDIT_LEN));
    }

    #[test]
    fn test_partial_line_does_not_match() {
        let protocol =
            OutputProtocol::custom(0, vec![FieldSpec::new("len", r"min edit length (\d+)").unwrap()]);
        assert!(protocol.parse("min edit length 3 (approx)").is_err());
        assert_eq!(protocol.parse("min edit length 3").unwrap().get("len"), Some(3));
    }

    #[test]
    fn test_extraction_error_names_field() {
        let protocol = OutputProtocol::custom(
            0,
            vec![FieldSpec::new("big", r"value (\d+)").unwrap()],
        );
        let err = protocol.parse("value 99999999999999999999999").unwrap_err();
        assert!(matches!(err, RunnerError::FieldExtraction { ref key, .. } if key == "big"));
    }

    #[test]
    fn test_count_diff_edits() {
        let raw = "2c2\n< 5\n---\n> 6\n4a5\n> 7\n";
        assert_eq!(count_diff_edits(raw), 3);
        assert_eq!(count_diff_edits(""), 0);
    }
}
