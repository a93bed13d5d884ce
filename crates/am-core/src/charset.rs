use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 70 caractères (Paul Bourke), résolution maximale (dense → clair).
pub const CHARSET_DETAILED: &str =
    "$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\\|()1{}[]?-_+~<>i!lI;:,\"^`'. ";

/// 10 caractères : compact, bon contraste.
pub const CHARSET_STANDARD: &str = "@%#*+=-:. ";

/// Blocs Unicode : pseudo-pixels.
pub const CHARSET_BLOCKS: &str = "█▓▒░ ";

/// Binaire, style « matrix ».
pub const CHARSET_BINARY: &str = "01 ";

/// Minimal : haut contraste.
pub const CHARSET_MINIMAL: &str = "#:. ";

/// Blocs puis ASCII standard.
pub const CHARSET_DENSE: &str = "█▓▒░@%#*+=-:. ";

/// Fallback quand le charset personnalisé est vide.
const CUSTOM_FALLBACK: &str = "@ ";

/// Identifiant de charset sélectionnable.
///
/// # Example
/// ```
/// use am_core::charset::CharsetId;
/// let id: CharsetId = "blocks".parse().unwrap();
/// assert_eq!(id, CharsetId::Blocks);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CharsetId {
    /// [`CHARSET_DETAILED`].
    Detailed,
    /// [`CHARSET_STANDARD`].
    #[default]
    Standard,
    /// [`CHARSET_BLOCKS`].
    Blocks,
    /// [`CHARSET_BINARY`].
    Binary,
    /// [`CHARSET_MINIMAL`].
    Minimal,
    /// [`CHARSET_DENSE`].
    Dense,
    /// Chaîne fournie par l'utilisateur.
    Custom,
}

impl CharsetId {
    /// Tous les identifiants, dans l'ordre de cycle de l'UI.
    pub const ALL: [CharsetId; 7] = [
        CharsetId::Detailed,
        CharsetId::Standard,
        CharsetId::Blocks,
        CharsetId::Binary,
        CharsetId::Minimal,
        CharsetId::Dense,
        CharsetId::Custom,
    ];

    /// Nom court stable (clé de config).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CharsetId::Detailed => "detailed",
            CharsetId::Standard => "standard",
            CharsetId::Blocks => "blocks",
            CharsetId::Binary => "binary",
            CharsetId::Minimal => "minimal",
            CharsetId::Dense => "dense",
            CharsetId::Custom => "custom",
        }
    }

    /// Identifiant suivant dans le cycle.
    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for CharsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharsetId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("charset inconnu '{s}'"))
    }
}

/// Dégradé de caractères ordonné du plus sombre au plus clair.
///
/// La longueur définit le nombre de niveaux de quantification.
///
/// # Example
/// ```
/// use am_core::charset::{CharsetId, Gradient};
/// let g = Gradient::resolve(CharsetId::Standard, "");
/// assert_eq!(g.levels(), 10);
/// assert_eq!(g.char_at(0), '@');
/// assert_eq!(g.char_at(9), ' ');
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gradient {
    chars: Vec<char>,
}

impl Gradient {
    /// Dégradé à partir d'une chaîne brute, sans transformation.
    ///
    /// Une chaîne vide retombe sur `"@ "`.
    #[must_use]
    pub fn new(chars: &str) -> Self {
        let chars: Vec<char> = if chars.is_empty() {
            CUSTOM_FALLBACK.chars().collect()
        } else {
            chars.chars().collect()
        };
        Self { chars }
    }

    /// Résout un identifiant (et la chaîne custom éventuelle) en dégradé.
    ///
    /// Pour `Custom`, un espace final (noir pur) est ajouté s'il manque.
    ///
    /// # Example
    /// ```
    /// use am_core::charset::{CharsetId, Gradient};
    /// assert_eq!(Gradient::resolve(CharsetId::Custom, "#+").as_string(), "#+ ");
    /// assert_eq!(Gradient::resolve(CharsetId::Custom, "").as_string(), "@ ");
    /// ```
    #[must_use]
    pub fn resolve(id: CharsetId, custom: &str) -> Self {
        match id {
            CharsetId::Detailed => Self::new(CHARSET_DETAILED),
            CharsetId::Standard => Self::new(CHARSET_STANDARD),
            CharsetId::Blocks => Self::new(CHARSET_BLOCKS),
            CharsetId::Binary => Self::new(CHARSET_BINARY),
            CharsetId::Minimal => Self::new(CHARSET_MINIMAL),
            CharsetId::Dense => Self::new(CHARSET_DENSE),
            CharsetId::Custom => {
                let base = if custom.is_empty() {
                    CUSTOM_FALLBACK
                } else {
                    custom
                };
                if base.ends_with(' ') {
                    Self::new(base)
                } else {
                    Self::new(&format!("{base} "))
                }
            }
        }
    }

    /// Nombre de niveaux (≥ 1).
    #[inline(always)]
    #[must_use]
    pub fn levels(&self) -> usize {
        self.chars.len()
    }

    /// Caractère du niveau `level` (borné au dernier niveau).
    #[inline(always)]
    #[must_use]
    pub fn char_at(&self, level: usize) -> char {
        self.chars[level.min(self.chars.len() - 1)]
    }

    /// Index direct (sans tramage) : `round(luma / 255 * (levels - 1))`.
    ///
    /// # Example
    /// ```
    /// use am_core::charset::Gradient;
    /// let g = Gradient::new("@ ");
    /// assert_eq!(g.level_for(0.0), 0);
    /// assert_eq!(g.level_for(255.0), 1);
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn level_for(&self, luma: f32) -> usize {
        let max = (self.chars.len() - 1) as f32;
        ((luma / 255.0) * max).round().clamp(0.0, max) as usize
    }

    /// Chaîne d'origine.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_mapping_is_monotonic() {
        for id in CharsetId::ALL {
            let g = Gradient::resolve(id, "abc");
            let mut prev = 0usize;
            for v in 0..=255u16 {
                let level = g.level_for(f32::from(v));
                assert!(level >= prev, "{id}: niveau non monotone à {v}");
                assert!(level < g.levels());
                prev = level;
            }
            assert_eq!(prev, g.levels() - 1);
        }
    }

    #[test]
    fn builtin_gradients_end_with_blank() {
        for id in CharsetId::ALL {
            let g = Gradient::resolve(id, "xyz");
            assert_eq!(g.char_at(g.levels() - 1), ' ', "{id}");
        }
    }

    #[test]
    fn custom_keeps_existing_trailing_space() {
        let g = Gradient::resolve(CharsetId::Custom, "#. ");
        assert_eq!(g.levels(), 3);
    }

    #[test]
    fn unicode_blocks_count_chars_not_bytes() {
        assert_eq!(Gradient::resolve(CharsetId::Blocks, "").levels(), 5);
        assert_eq!(Gradient::resolve(CharsetId::Dense, "").levels(), 14);
    }

    #[test]
    fn charset_id_parse_roundtrip() {
        for id in CharsetId::ALL {
            assert_eq!(id.as_str().parse::<CharsetId>(), Ok(id));
        }
        assert!("nope".parse::<CharsetId>().is_err());
    }
}
