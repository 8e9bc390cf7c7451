use std::sync::LazyLock;

use regex::Regex;

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"20\d{2}").expect("year token pattern is valid"));

/// One user turn prepared for option matching.
///
/// Matching is deliberately naive: an option matches when its lower-cased name
/// appears anywhere inside the lower-cased utterance, and the first matching
/// option in list order wins. There is no tokenisation and no scoring, so an
/// option whose name is a substring of another's (`"mat"` inside `"mats"`)
/// can shadow it depending on order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utterance {
    raw: String,
    lowered: String,
}

impl Utterance {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let lowered = raw.to_lowercase();
        Self { raw, lowered }
    }

    /// First `20xx` run in the text, wherever it appears.
    pub fn year(&self) -> Option<u16> {
        YEAR_TOKEN.find(&self.raw).and_then(|token| token.as_str().parse().ok())
    }

    pub fn mentions(&self, option: &str) -> bool {
        let option = option.trim().to_lowercase();
        !option.is_empty() && self.lowered.contains(&option)
    }

    pub fn first_match<'a, T, F>(&self, options: &'a [T], name: F) -> Option<&'a T>
    where
        F: Fn(&T) -> &str,
    {
        options.iter().find(|option| self.mentions(name(*option)))
    }
}
