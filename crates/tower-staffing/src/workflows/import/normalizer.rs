use regex::Regex;
use std::sync::OnceLock;

static BARE_KEY: OnceLock<Regex> = OnceLock::new();
static TRAILING_COMMA: OnceLock<Regex> = OnceLock::new();

/// Strips markdown fences and chatter around the JSON list a model returned.
pub(crate) fn strip_wrappers(raw: &str) -> String {
    let unfenced = raw
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .replace(['\u{feff}', '\u{200b}'], "");

    let start = unfenced.find(['[', '{']).unwrap_or(unfenced.len());
    let mut body = &unfenced[start..];
    if let Some(end) = body.rfind(']') {
        body = &body[..=end];
    }
    body.trim().to_string()
}

/// Second-chance repair: quotes bare object keys and drops trailing commas.
pub(crate) fn relax_json(text: &str) -> String {
    let bare_key = BARE_KEY.get_or_init(|| {
        Regex::new(r#"([\{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).expect("bare key pattern")
    });
    let trailing_comma =
        TRAILING_COMMA.get_or_init(|| Regex::new(r",(\s*[\}\]])").expect("trailing comma pattern"));

    let quoted = bare_key.replace_all(text, r#"$1"$2":"#);
    trailing_comma.replace_all(&quoted, "$1").into_owned()
}
