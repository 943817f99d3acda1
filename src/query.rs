//! URL query decoding for the `export`, `record` and `play` start-up parameters.

/// Parsed start-up query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse `?a=b&c=d` (the leading `?` is optional).
    ///
    /// Keys and values are form-decoded (`+` is a space, `%XX` is a byte). Malformed escapes
    /// are kept literally.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                Some((k, v)) => (form_decode(k), form_decode(v)),
                None => (form_decode(part), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `true` only for the literal value `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    /// Comma-separated names for `key`; blanks are dropped and duplicates keep first position.
    pub fn names(&self, key: &str) -> Vec<String> {
        let Some(raw) = self.get(key) else {
            return Vec::new();
        };
        let mut out: Vec<String> = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        }
        out
    }

    pub fn export(&self) -> bool {
        self.flag("export")
    }

    pub fn record(&self) -> Vec<String> {
        self.names("record")
    }

    pub fn play(&self) -> Vec<String> {
        self.names("play")
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn form_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_inert() {
        let q = QueryParams::parse("");
        assert!(q.is_empty());
        assert!(!q.export());
        assert!(q.record().is_empty());
        assert!(q.play().is_empty());
    }

    #[test]
    fn export_requires_literal_true() {
        assert!(QueryParams::parse("?export=true").export());
        assert!(!QueryParams::parse("?export=1").export());
        assert!(!QueryParams::parse("?export").export());
    }

    #[test]
    fn name_lists_split_on_commas_and_drop_blanks() {
        let q = QueryParams::parse("record=mouse,&play=a, b,a");
        assert_eq!(q.record(), vec!["mouse".to_string()]);
        assert_eq!(q.play(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn first_occurrence_wins() {
        let q = QueryParams::parse("?play=x&play=y");
        assert_eq!(q.get("play"), Some("x"));
    }

    #[test]
    fn values_are_form_decoded() {
        let q = QueryParams::parse("?record=mouse%2Cangle&note=a+b&bad=%zz%4");
        assert_eq!(q.record(), vec!["mouse".to_string(), "angle".to_string()]);
        assert_eq!(q.get("note"), Some("a b"));
        assert_eq!(q.get("bad"), Some("%zz%4"));
    }
}
