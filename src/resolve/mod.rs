// src/resolve/mod.rs
//! The join resolver: site-code validation, IP cleanup, and the
//! derived-key antenna/optical join.
//!
//! Once a code passes validation nothing here fails. Missing data
//! degrades to `NotFound`, empty lists, or dash placeholders, which are
//! normal, displayable outcomes.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::schema::Row;
use crate::store::Store;

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{4}$").expect("site code pattern is valid"));
static HYPERLINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)HYPERLINK\("([^"]+)""#).expect("hyperlink pattern is valid"));
static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://").expect("url scheme pattern is valid"));
static ANT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+_)(\d{3})$").expect("antenna key pattern is valid"));

/// A validated site code: two letters and four digits, uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteCode(String);

#[derive(Debug, Error, PartialEq)]
#[error("invalid site code {0:?}: expected two letters followed by four digits")]
pub struct CodeFormatError(pub String);

impl SiteCode {
    /// Trim, uppercase, and check the `XXNNNN` shape. No lookup happens
    /// on malformed input.
    pub fn parse(raw: &str) -> Result<SiteCode, CodeFormatError> {
        let code = raw.trim().to_uppercase();
        if CODE_RE.is_match(&code) {
            Ok(SiteCode(code))
        } else {
            Err(CodeFormatError(raw.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of the sites lookup. Absence and junk cells are expected
/// results, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum IpLookup {
    Resolved { ip: String, url: String },
    /// The code has a sites row but the cell cleans down to nothing.
    Invalid { raw: String },
    NotFound,
}

/// Clean one raw IP cell: unwrap a spreadsheet `HYPERLINK(...)` formula,
/// strip surrounding quotes, keep only the first whitespace-delimited
/// token, and drop trailing `;`/`,`.
pub fn normalize_ip(raw: &str) -> String {
    let mut ip = raw.trim().to_string();
    if let Some(caps) = HYPERLINK_RE.captures(&ip) {
        ip = caps[1].to_string();
    }
    let ip = ip.trim_matches('"');
    let ip = ip.split_whitespace().next().unwrap_or("");
    ip.trim_end_matches(|c| c == ';' || c == ',').trim().to_string()
}

/// Form a navigable URL from a cleaned IP, prefixing `http://` unless a
/// scheme is already present.
pub fn to_url(ip: &str) -> String {
    if SCHEME_RE.is_match(ip) {
        ip.to_string()
    } else {
        format!("http://{}", ip)
    }
}

pub fn resolve_ip(store: &Store, code: &SiteCode) -> IpLookup {
    match store.ip(code.as_str()) {
        None => IpLookup::NotFound,
        Some(raw) => {
            let ip = normalize_ip(raw);
            if ip.is_empty() {
                IpLookup::Invalid {
                    raw: raw.to_string(),
                }
            } else {
                let url = to_url(&ip);
                IpLookup::Resolved { ip, url }
            }
        }
    }
}

/// Map a cell `x` value onto the antenna export's key format.
///
/// The cell export numbers sectors with three digits where the antenna
/// export uses two: `<prefix>_NNN` becomes `<prefix>_NN` by dropping
/// the first digit. Anything else passes through unchanged.
pub fn derive_antenna_key(x: &str) -> String {
    match ANT_KEY_RE.captures(x) {
        Some(caps) => format!("{}{}", &caps[1], &caps[2][1..]),
        None => x.to_string(),
    }
}

/// One row of the antenna/optical join, one per distinct cell `x`.
/// Grouped fields are `.`/`/`-joined distinct values; a key with no
/// antenna rows yields all-dash placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaJoinRow {
    pub x: String,
    pub antennas: String,
    pub rmod_numbers: String,
    pub rmod_types: String,
    pub sfp_capacity: String,
    pub sfp_length: String,
}

impl AntennaJoinRow {
    fn placeholder(x: String) -> AntennaJoinRow {
        AntennaJoinRow {
            x,
            antennas: "-".to_string(),
            rmod_numbers: "-".to_string(),
            rmod_types: "-".to_string(),
            sfp_capacity: "-".to_string(),
            sfp_length: "-".to_string(),
        }
    }
}

/// Distinct non-empty values in first-appearance order.
fn distinct_nonempty<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if !v.is_empty() && seen.insert(v) {
            out.push(v);
        }
    }
    out
}

/// The two-stage derived join: cell `x` values → antenna rows → optical
/// rows, emitting one output row per distinct `x` in first-seen order.
pub fn antenna_join(store: &Store, code: &SiteCode) -> Vec<AntennaJoinRow> {
    let schemas = store.schemas();
    let cells = store.cells(code.as_str());
    let xs = distinct_nonempty(cells.iter().map(|r| r.get(&schemas.lncel, "x")));

    let mut out = Vec::with_capacity(xs.len());
    for x in xs {
        let key = derive_antenna_key(x);
        let rows = store.antenna(&key);
        if rows.is_empty() {
            out.push(AntennaJoinRow::placeholder(x.to_string()));
            continue;
        }

        let ant = &schemas.ant_4g;
        let antennas = distinct_nonempty(rows.iter().map(|r| r.get(ant, "c"))).join(".");
        let rmod_numbers = distinct_nonempty(rows.iter().map(|r| r.get(ant, "d"))).join("/");
        let rmod_types = distinct_nonempty(rows.iter().map(|r| r.get(ant, "e"))).join("/");

        // Distinct port ids fan out into the optical dataset; capacities
        // and lengths union across every matched row.
        let opt = &schemas.opt_speed;
        let mut capacities: Vec<&str> = Vec::new();
        let mut lengths: Vec<&str> = Vec::new();
        let mut seen_cap = HashSet::new();
        let mut seen_len = HashSet::new();
        for port in distinct_nonempty(rows.iter().map(|r| r.get(ant, "a"))) {
            for row in store.optical(port) {
                let m = row.get(opt, "m");
                if !m.is_empty() && seen_cap.insert(m) {
                    capacities.push(m);
                }
                let h = row.get(opt, "h");
                if !h.is_empty() && seen_len.insert(h) {
                    lengths.push(h);
                }
            }
        }

        out.push(AntennaJoinRow {
            x: x.to_string(),
            antennas,
            rmod_numbers,
            rmod_types,
            sfp_capacity: capacities.join("/"),
            sfp_length: lengths.join("/"),
        });
    }
    out
}

/// Tri-state view of a 2G config row's admin column, matched as literal
/// text, never parsed as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    Up,
    Down,
    Unknown,
}

pub fn admin_state(store: &Store, row: &Row) -> AdminState {
    let schemas = store.schemas();
    match row.get(&schemas.config_2g, &schemas.admin_state_column) {
        "1" => AdminState::Up,
        "0" => AdminState::Down,
        _ => AdminState::Unknown,
    }
}

/// Everything the presentation layer needs for one code.
#[derive(Debug)]
pub struct Report<'a> {
    pub code: SiteCode,
    pub ip: IpLookup,
    pub cells: &'a [Row],
    pub config: &'a [Row],
    pub antenna: Vec<AntennaJoinRow>,
}

pub fn report<'a>(store: &'a Store, code: &SiteCode) -> Report<'a> {
    Report {
        code: code.clone(),
        ip: resolve_ip(store, code),
        cells: store.cells(code.as_str()),
        config: store.config(code.as_str()),
        antenna: antenna_join(store, code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaSet;

    #[test]
    fn site_codes_parse_case_insensitively_and_idempotently() {
        let lower = SiteCode::parse("st1216").unwrap();
        let upper = SiteCode::parse("ST1216").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_str(), "ST1216");
        assert_eq!(SiteCode::parse(lower.as_str()).unwrap(), lower);
        assert_eq!(SiteCode::parse("  st1216  ").unwrap(), lower);
    }

    #[test]
    fn malformed_codes_are_rejected() {
        for raw in ["", "S1216", "ST121", "ST12166", "121216", "STX216"] {
            assert!(SiteCode::parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn normalize_ip_unwraps_hyperlink_formulas() {
        assert_eq!(
            normalize_ip(r#"=HYPERLINK("http://10.0.0.1/","link")"#),
            "http://10.0.0.1/"
        );
        assert_eq!(
            normalize_ip(r#"=hyperlink("https://host/x")"#),
            "https://host/x"
        );
    }

    #[test]
    fn normalize_ip_keeps_first_token_and_strips_trailing_separators() {
        assert_eq!(normalize_ip("10.0.0.1 extra;"), "10.0.0.1");
        assert_eq!(normalize_ip("\"10.0.0.1\""), "10.0.0.1");
        assert_eq!(normalize_ip("10.0.0.1;,"), "10.0.0.1");
        assert_eq!(normalize_ip("   "), "");
    }

    #[test]
    fn to_url_prefixes_scheme_only_when_missing() {
        assert_eq!(to_url("10.0.0.1"), "http://10.0.0.1");
        assert_eq!(to_url("HTTPS://host/"), "HTTPS://host/");
        assert_eq!(to_url("http://host"), "http://host");
    }

    #[test]
    fn antenna_key_drops_the_first_of_three_trailing_digits() {
        assert_eq!(derive_antenna_key("ST1216_011"), "ST1216_11");
        assert_eq!(derive_antenna_key("A_B_123"), "A_B_23");
        assert_eq!(derive_antenna_key("NOTHREE_DIGITS"), "NOTHREE_DIGITS");
        assert_eq!(derive_antenna_key("ST1216_0111"), "ST1216_0111");
        assert_eq!(derive_antenna_key(""), "");
    }

    // Join fixtures: small in-memory exports wide enough for each schema.

    fn csv(delimiter: char, width: usize, rows: &[&[(usize, &str)]]) -> String {
        let sep = delimiter.to_string();
        let mut out = vec![String::new(); width].join(&sep);
        for cells in rows {
            let mut fields = vec![String::new(); width];
            for (i, v) in *cells {
                fields[*i] = v.to_string();
            }
            out.push('\n');
            out.push_str(&fields.join(&sep));
        }
        out.push('\n');
        out
    }

    fn joined_store() -> Store {
        let sites = csv(';', 19, &[&[(7, "ab1234"), (18, "10.0.0.1")]]);
        let lncel = csv(
            ';',
            27,
            &[
                &[(1, "ab1234"), (23, "Z1_011")],
                &[(1, "ab1234"), (23, "Z1_011")],
                &[(1, "ab1234"), (23, "Z2_003")],
            ],
        );
        let config_2g = csv(
            ';',
            16,
            &[
                &[(3, "ab1234"), (7, "1")],
                &[(3, "ab1234"), (7, "0")],
            ],
        );
        let ant_4g = csv(
            ';',
            5,
            &[
                &[(1, "Z1_11"), (0, "PORT-1"), (2, "ANT-A"), (3, "1"), (4, "FRGT")],
                &[(1, "Z1_11"), (0, "PORT-2"), (2, "ANT-B"), (3, "2"), (4, "FRGT")],
            ],
        );
        let opt_speed = csv(
            ';',
            26,
            &[
                &[(25, "PORT-1"), (12, "10G"), (7, "20m")],
                &[(25, "PORT-2"), (12, "10G"), (7, "40m")],
            ],
        );
        Store::from_texts(
            SchemaSet::default(),
            &sites,
            &lncel,
            &config_2g,
            &ant_4g,
            &opt_speed,
        )
    }

    #[test]
    fn join_emits_one_row_per_distinct_x_in_first_seen_order() {
        let store = joined_store();
        let code = SiteCode::parse("AB1234").unwrap();
        let rows = antenna_join(&store, &code);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].x, "Z1_011");
        assert_eq!(rows[1].x, "Z2_003");
    }

    #[test]
    fn join_groups_antenna_fields_and_unions_optical_values() {
        let store = joined_store();
        let code = SiteCode::parse("AB1234").unwrap();
        let rows = antenna_join(&store, &code);

        assert_eq!(rows[0].antennas, "ANT-A.ANT-B");
        assert_eq!(rows[0].rmod_numbers, "1/2");
        assert_eq!(rows[0].rmod_types, "FRGT");
        assert_eq!(rows[0].sfp_capacity, "10G");
        assert_eq!(rows[0].sfp_length, "20m/40m");
    }

    #[test]
    fn join_emits_dash_placeholders_for_unmatched_keys() {
        let store = joined_store();
        let code = SiteCode::parse("AB1234").unwrap();
        let rows = antenna_join(&store, &code);
        // Z2_003 derives to Z2_03, which has no antenna rows.
        assert_eq!(rows[1].antennas, "-");
        assert_eq!(rows[1].sfp_capacity, "-");
    }

    #[test]
    fn resolve_ip_forms_a_navigable_url() {
        let store = joined_store();
        let code = SiteCode::parse("AB1234").unwrap();
        assert_eq!(
            resolve_ip(&store, &code),
            IpLookup::Resolved {
                ip: "10.0.0.1".to_string(),
                url: "http://10.0.0.1".to_string(),
            }
        );
    }

    #[test]
    fn admin_state_matches_literal_text_only() {
        let store = joined_store();
        let config = store.config("AB1234");
        assert_eq!(admin_state(&store, &config[0]), AdminState::Up);
        assert_eq!(admin_state(&store, &config[1]), AdminState::Down);
        let blank = crate::schema::Row::default();
        assert_eq!(admin_state(&store, &blank), AdminState::Unknown);
    }

    #[test]
    fn absent_code_is_a_normal_empty_result() {
        let store = joined_store();
        let code = SiteCode::parse("ZZ9999").unwrap();
        let report = report(&store, &code);
        assert_eq!(report.ip, IpLookup::NotFound);
        assert!(report.cells.is_empty());
        assert!(report.config.is_empty());
        assert!(report.antenna.is_empty());
    }
}
