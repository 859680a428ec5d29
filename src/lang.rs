//! Target languages.
//!
//! Labels and descriptions are fetched per language, and every output file
//! and cache file is language-specific.
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Languages the sampler can produce a dataset for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lang {
    En,
    De,
    Ru,
}

impl Lang {
    /// Every supported language, in quota table column order.
    pub const ALL: [Lang; 3] = [Lang::En, Lang::De, Lang::Ru];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::De => "de",
            Lang::Ru => "ru",
        }
    }

    /// Parse a comma-separated list such as `en,de,ru`.
    pub fn parse_list(s: &str) -> Result<Vec<Lang>, Error> {
        let mut langs = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let lang = part.parse()?;
            if !langs.contains(&lang) {
                langs.push(lang);
            }
        }
        Ok(langs)
    }
}

impl FromStr for Lang {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Lang::En),
            "de" => Ok(Lang::De),
            "ru" => Ok(Lang::Ru),
            _ => Err(Error::UnknownLang(s.to_string())),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_langs() {
        assert_eq!("EN".parse::<Lang>().unwrap(), Lang::En);
        assert_eq!("ru".parse::<Lang>().unwrap(), Lang::Ru);
        assert!(matches!("fr".parse::<Lang>(), Err(Error::UnknownLang(_))));
    }

    #[test]
    fn parse_list_dedups() {
        let langs = Lang::parse_list("en, de,en,ru").unwrap();
        assert_eq!(langs, vec![Lang::En, Lang::De, Lang::Ru]);
    }
}
