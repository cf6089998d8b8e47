use std::collections::HashMap;

use anyhow::{bail, Error};

/// Mandatory fields a well-formed `.narinfo` must carry.
const REQUIRED_FIELDS: &[&str] = &["StorePath", "URL", "NarHash", "NarSize"];

/// Parsed `.narinfo` metadata: a flat `key: value` record pointing at a `.nar`.
#[derive(Debug, Clone)]
pub struct NarInfo {
    fields: HashMap<String, String>,
}

impl NarInfo {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn store_path(&self) -> &str {
        // unwrap: presence checked in parse()
        self.fields.get("StorePath").unwrap()
    }
}

/// Parse `.narinfo` key:value metadata. Rejects malformed lines and missing
/// mandatory fields.
pub fn parse(data: &[u8]) -> Result<NarInfo, Error> {
    let text =
        std::str::from_utf8(data).map_err(|_| anyhow::format_err!("narinfo: invalid utf-8"))?;

    let mut fields = HashMap::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| anyhow::format_err!("narinfo: malformed line '{line}'"))?;
        fields.insert(key.to_string(), value.trim_start().to_string());
    }

    for required in REQUIRED_FIELDS {
        if !fields.contains_key(*required) {
            bail!("narinfo: missing required field '{required}'");
        }
    }

    Ok(NarInfo { fields })
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> String {
        [
            "StorePath: /nix/store/abc-foo-1.0",
            "URL: nar/xyz.nar.xz",
            "Compression: xz",
            "NarHash: sha256:abcdef",
            "NarSize: 12345",
        ]
        .join("\n")
    }

    #[test]
    fn parses_well_formed_record() {
        let info = parse(sample().as_bytes()).unwrap();
        assert_eq!(info.store_path(), "/nix/store/abc-foo-1.0");
        assert_eq!(info.get("Compression"), Some("xz"));
    }

    #[test]
    fn rejects_missing_required_field() {
        let data = "URL: nar/xyz.nar.xz\n";
        assert!(parse(data.as_bytes()).is_err());
    }

    #[test]
    fn rejects_malformed_line() {
        let data = "StorePath /nix/store/abc\n";
        assert!(parse(data.as_bytes()).is_err());
    }
}
