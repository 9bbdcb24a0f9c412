use once_cell::sync::Lazy;
use regex::Regex;

const NAME_MARKER: &str = "stats";

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

static COPY_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcopy\b").expect("copy token regex"));
static TRAILING_DUPLICATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d\)\s*$").expect("duplicate marker regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlayerIdentity {
    Named(String),
    Unknown,
}

pub fn has_spreadsheet_extension(path: &str) -> bool {
    extension_of(base_name(path)).is_some()
}

/// Recover the player name from an archive entry path or a file name.
pub fn parse_player_name(entry: &str) -> PlayerIdentity {
    let base = base_name(entry);
    let after_marker = match base.rfind(NAME_MARKER) {
        Some(idx) => &base[idx + NAME_MARKER.len()..],
        None => base,
    };
    let stem = strip_extension(after_marker);

    let without_copy = COPY_TOKEN.replace_all(stem, " ");
    let mut name = without_copy.trim().to_string();
    loop {
        let stripped = TRAILING_DUPLICATE.replace(&name, "");
        if stripped.len() == name.len() {
            break;
        }
        name = stripped.into_owned();
    }
    let name = WHITESPACE_RUN.replace_all(&name, " ");
    let name = name.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '_');

    if name.is_empty() {
        PlayerIdentity::Unknown
    } else {
        PlayerIdentity::Named(name.to_string())
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}

fn extension_of(name: &str) -> Option<usize> {
    let (stem, ext) = name.rsplit_once('.')?;
    SPREADSHEET_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
        .then_some(stem.len())
}

fn strip_extension(name: &str) -> &str {
    match extension_of(name) {
        Some(stem_len) => &name[..stem_len],
        None => name,
    }
}
