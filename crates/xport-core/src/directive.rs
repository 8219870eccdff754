//! Name directive parser
//!
//! Entity names carry export directives as whitespace-delimited tokens:
//!
//! | Token          | Effect                                   |
//! |----------------|------------------------------------------|
//! | `-dir:<path>`  | write the output under `<path>`          |
//! | `-sep`         | start a new export root                  |
//! | `-dk`          | never export this entity or its subtree  |
//! | `-sk`          | transparent container, children still visited |
//! | `-anim`        | carry animation data when the format allows |
//!
//! Tokens are exact and case-sensitive. `-separate` or `Crate-sep` are plain
//! words, not directives.

use serde::{Deserialize, Serialize};
use std::fmt;

const DIR_PREFIX: &str = "-dir:";

/// A single whitespace-delimited piece of a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `-dir:<path>`; `None` for a bare `-dir:`
    Dir(Option<&'a str>),
    /// `-sep`
    Separate,
    /// `-dk`
    Exclude,
    /// `-sk`
    Skip,
    /// `-anim`
    Animation,
    /// Anything else, kept in the clean name
    Word(&'a str),
}

impl<'a> Token<'a> {
    /// Classify one whitespace-free piece of text
    pub fn classify(piece: &'a str) -> Self {
        if let Some(path) = piece.strip_prefix(DIR_PREFIX) {
            return Token::Dir((!path.is_empty()).then_some(path));
        }

        match piece {
            "-sep" => Token::Separate,
            "-dk" => Token::Exclude,
            "-sk" => Token::Skip,
            "-anim" => Token::Animation,
            word => Token::Word(word),
        }
    }

    /// Whether this token is a directive (stripped from the clean name)
    pub fn is_directive(&self) -> bool {
        !matches!(self, Token::Word(_))
    }
}

/// Split a name into its typed token stream
pub fn tokenize(name: &str) -> impl Iterator<Item = Token<'_>> {
    name.split_whitespace().map(Token::classify)
}

/// Export directives parsed from a name
///
/// Derived from the name on every call and never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directives {
    /// Sub-directory for the output file (first `-dir:` wins)
    pub directory: Option<String>,
    /// `-sep`
    pub separate: bool,
    /// `-dk`
    pub exclude: bool,
    /// `-sk`
    pub skip: bool,
    /// `-anim`
    pub include_animation: bool,
}

impl Directives {
    /// True when no directive was present
    pub fn is_empty(&self) -> bool {
        *self == Directives::default()
    }
}

impl fmt::Display for Directives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(dir) = &self.directory {
            parts.push(format!("{}{}", DIR_PREFIX, dir));
        }
        if self.separate {
            parts.push("-sep".to_string());
        }
        if self.exclude {
            parts.push("-dk".to_string());
        }
        if self.skip {
            parts.push("-sk".to_string());
        }
        if self.include_animation {
            parts.push("-anim".to_string());
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// A name split into its display part and its directives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    /// Name with every directive token removed and whitespace collapsed
    pub clean_name: String,
    /// Directives found in the name
    pub directives: Directives,
}

/// Parse a name into its clean name and directives
///
/// Never fails: unrecognized text stays in the clean name.
pub fn parse_name(name: &str) -> ParsedName {
    let mut directives = Directives::default();
    let mut words: Vec<&str> = Vec::new();

    for token in tokenize(name) {
        match token {
            Token::Dir(path) => {
                if directives.directory.is_none() {
                    directives.directory = path.map(str::to_string);
                }
            }
            Token::Separate => directives.separate = true,
            Token::Exclude => directives.exclude = true,
            Token::Skip => directives.skip = true,
            Token::Animation => directives.include_animation = true,
            Token::Word(word) => words.push(word),
        }
    }

    ParsedName {
        clean_name: words.join(" "),
        directives,
    }
}

/// Shorthand for `parse_name(name).clean_name`
pub fn clean_name(name: &str) -> String {
    parse_name(name).clean_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dir_directive() {
        let parsed = parse_name("Sword -dir:weapons");
        assert_eq!(parsed.clean_name, "Sword");
        assert_eq!(parsed.directives.directory.as_deref(), Some("weapons"));
        assert!(!parsed.directives.separate);
    }

    #[test]
    fn test_parse_all_flags() {
        let parsed = parse_name("-anim Hero -sep -dk   Rig -sk");
        assert_eq!(parsed.clean_name, "Hero Rig");
        assert!(parsed.directives.separate);
        assert!(parsed.directives.exclude);
        assert!(parsed.directives.skip);
        assert!(parsed.directives.include_animation);
        assert_eq!(parsed.directives.directory, None);
    }

    #[test]
    fn test_duplicate_flags_collapse() {
        let parsed = parse_name("Crate -sep -sep -sep");
        assert_eq!(parsed.clean_name, "Crate");
        assert!(parsed.directives.separate);
    }

    #[test]
    fn test_first_dir_wins_and_all_are_stripped() {
        let parsed = parse_name("Rock -dir:props/nature -dir:other Big");
        assert_eq!(parsed.clean_name, "Rock Big");
        assert_eq!(parsed.directives.directory.as_deref(), Some("props/nature"));
    }

    #[test]
    fn test_bare_dir_is_stripped_without_directory() {
        let parsed = parse_name("Tree -dir:");
        assert_eq!(parsed.clean_name, "Tree");
        assert_eq!(parsed.directives.directory, None);

        let parsed = parse_name("Tree -dir: leaves");
        assert_eq!(parsed.clean_name, "Tree leaves");
        assert_eq!(parsed.directives.directory, None);
    }

    #[test]
    fn test_bare_dir_does_not_block_later_dir() {
        let parsed = parse_name("Tree -dir: -dir:plants");
        assert_eq!(parsed.directives.directory.as_deref(), Some("plants"));
    }

    #[test]
    fn test_word_boundaries_respected() {
        let parsed = parse_name("Door-sep -separate -SEP x-dk");
        assert_eq!(parsed.clean_name, "Door-sep -separate -SEP x-dk");
        assert!(parsed.directives.is_empty());
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let parsed = parse_name("  Big \t  Tower  -sk ");
        assert_eq!(parsed.clean_name, "Big Tower");
    }

    #[test]
    fn test_clean_name_has_no_directive_tokens() {
        let names = [
            "-sep",
            "A -dk B -sk C",
            "-dir:x/y -anim Z -dir:",
            "plain name",
            "",
        ];
        for name in names {
            let clean = parse_name(name).clean_name;
            assert!(tokenize(&clean).all(|t| !t.is_directive()), "{:?}", clean);
        }
    }

    #[test]
    fn test_reparse_with_appended_directive_is_stable() {
        let names = ["Sword -dir:weapons", "  a  b -sk", "-sep", "Lamp -anim -dk"];
        for name in names {
            let clean = parse_name(name).clean_name;
            let again = parse_name(&format!("{} -sep", clean)).clean_name;
            assert_eq!(again, clean);
        }
    }

    #[test]
    fn test_directives_display() {
        let parsed = parse_name("Boss -anim -dir:enemies -sep");
        assert_eq!(parsed.directives.to_string(), "-dir:enemies -sep -anim");
        assert_eq!(Directives::default().to_string(), "");
    }

    #[test]
    fn test_token_classify() {
        assert_eq!(Token::classify("-dir:a"), Token::Dir(Some("a")));
        assert_eq!(Token::classify("-dir:"), Token::Dir(None));
        assert_eq!(Token::classify("-sk"), Token::Skip);
        assert_eq!(Token::classify("-skip"), Token::Word("-skip"));
    }
}
