use chrono::Utc;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Convierte un texto en un slug apto para IDs.
pub fn slugify(text: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static DASHES: OnceLock<Regex> = OnceLock::new();

    let lower = text.to_lowercase();
    let stripped = regex(&NON_WORD, r"[^\w\s-]").replace_all(&lower, "");
    let hyphened = regex(&SPACES, r"\s+").replace_all(&stripped, "-");
    regex(&DASHES, r"--+")
        .replace_all(&hyphened, "-")
        .trim()
        .to_string()
}

/// Quita etiquetas HTML y normaliza espacios.
pub fn clean_description(description: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    if description.is_empty() {
        return String::new();
    }

    let untagged = regex(&TAGS, r"</?[^>]+(>|$)").replace_all(description, " ");
    let decoded = decode_entities(&untagged);
    regex(&WHITESPACE, r"\s\s+")
        .replace_all(&decoded, " ")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; va al final para no decodificar dos veces
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

pub fn generated_feed_id() -> String {
    format!("feed_{}", Utc::now().timestamp_millis())
}

/// ID de pista de respaldo cuando el documento no trae uno.
pub fn generated_track_id(slug: Option<&str>) -> String {
    let millis = Utc::now().timestamp_millis();
    let salt: u32 = rand::thread_rng().gen_range(0..10_000);
    match slug {
        Some(slug) => format!("track_{}_{}_{}", slug, millis, salt),
        None => format!("track_{}_{}", millis, salt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Palm Springs Radio!"), "palm-springs-radio");
        assert_eq!(slugify("Episode  #12 -- Finale"), "episode-12-finale");
        assert_eq!(slugify("ÁNIMO"), "ánimo");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_clean_description() {
        assert_eq!(
            clean_description("<p>Hello <b>world</b></p>\n\n<br/>Bye"),
            "Hello world Bye"
        );
        assert_eq!(clean_description("Tom &amp; Jerry&nbsp;&nbsp;live"), "Tom & Jerry live");
        assert_eq!(clean_description(""), "");
        assert_eq!(clean_description("plain text"), "plain text");
    }

    #[test]
    fn test_generated_ids() {
        assert!(generated_feed_id().starts_with("feed_"));
        let id = generated_track_id(Some("intro"));
        assert!(id.starts_with("track_intro_"));
        assert_eq!(id.split('_').count(), 4);
        assert_eq!(generated_track_id(None).split('_').count(), 3);
    }
}
