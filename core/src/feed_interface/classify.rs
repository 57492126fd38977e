use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of record categories understood by presentation code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Alert,
    WeatherStation,
    Traffic,
    Siren,
    TouristPoint,
    Beach,
    Other,
}

impl Category {
    /// Parses the loose category labels found on the wire, in Portuguese or English.
    pub fn from_label(label: &str) -> Category {
        let folded = fold(label);
        match folded.replace(&['_', ' '][..], "-").as_str() {
            "alert" | "alerts" | "alerta" | "alertas" => Category::Alert,
            "weather-station" | "weather-stations" | "weather" | "estacao"
            | "estacao-meteorologica" | "pluviometro" => Category::WeatherStation,
            "traffic" | "interdiction" | "interdictions" | "interdicao" | "transito" => {
                Category::Traffic
            }
            "siren" | "sirens" | "sirene" | "sirenes" => Category::Siren,
            "tourist-point" | "tourist-points" | "ponto-turistico" | "turismo" => {
                Category::TouristPoint
            }
            "beach" | "beaches" | "praia" | "praias" => Category::Beach,
            _ => Category::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Alert => "alert",
            Category::WeatherStation => "weather-station",
            Category::Traffic => "traffic",
            Category::Siren => "siren",
            Category::TouristPoint => "tourist-point",
            Category::Beach => "beach",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity bucket derived from a raw status string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum StatusLevel {
    Unknown,
    Inactive,
    Normal,
    Attention,
    Alert,
    Critical,
}

impl StatusLevel {
    pub fn label(self) -> &'static str {
        match self {
            StatusLevel::Unknown => "unknown",
            StatusLevel::Inactive => "inactive",
            StatusLevel::Normal => "normal",
            StatusLevel::Attention => "attention",
            StatusLevel::Alert => "alert",
            StatusLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const INACTIVE_MARKERS: &[&str] = &[
    "inativ",
    "desativad",
    "desligad",
    "fora de operacao",
    "manutencao",
    "inoperant",
    "inactive",
    "unarmed",
    "disarmed",
    "offline",
    "maintenance",
];

/// Maps a raw status string to a [`StatusLevel`] for the given category.
///
/// Matching is case- and accent-insensitive. This is the only place raw
/// status text is interpreted; everything downstream switches on the enum.
pub fn classify_status(category: Category, raw: &str) -> StatusLevel {
    let status = fold(raw);
    if status.is_empty() {
        return StatusLevel::Unknown;
    }
    if contains_any(&status, INACTIVE_MARKERS) {
        return StatusLevel::Inactive;
    }

    let level = match category {
        Category::Alert => classify_alert(&status),
        Category::WeatherStation => classify_rain(&status),
        Category::Traffic => classify_traffic(&status),
        Category::Siren => classify_siren(&status),
        Category::TouristPoint => classify_tourist_point(&status),
        Category::Beach => classify_beach(&status),
        Category::Other => None,
    };

    level.unwrap_or_else(|| {
        if contains_any(&status, &["normal"]) || has_word(&status, "ok") {
            StatusLevel::Normal
        } else {
            StatusLevel::Unknown
        }
    })
}

fn classify_alert(status: &str) -> Option<StatusLevel> {
    for stage in ["estagio", "stage", "nivel", "level"] {
        if let Some(rest) = status.split(stage).nth(1) {
            let digit = rest.trim().chars().next().and_then(|c| c.to_digit(10));
            match digit {
                Some(4..=5) => return Some(StatusLevel::Critical),
                Some(3) => return Some(StatusLevel::Alert),
                Some(2) => return Some(StatusLevel::Attention),
                Some(1) => return Some(StatusLevel::Normal),
                _ => {}
            }
        }
    }
    if contains_any(status, &["crise", "critic", "emergencia", "emergency"]) {
        Some(StatusLevel::Critical)
    } else if contains_any(status, &["alerta", "alert"]) {
        Some(StatusLevel::Alert)
    } else if contains_any(status, &["atencao", "attention", "mobilizacao", "watch"]) {
        Some(StatusLevel::Attention)
    } else {
        None
    }
}

fn classify_rain(status: &str) -> Option<StatusLevel> {
    if contains_any(status, &["muito forte", "very heavy", "torrencial"]) {
        Some(StatusLevel::Critical)
    } else if contains_any(status, &["forte", "heavy"]) {
        Some(StatusLevel::Alert)
    } else if contains_any(status, &["moderad", "moderate"]) {
        Some(StatusLevel::Attention)
    } else if contains_any(status, &["fraca", "sem chuva", "no rain", "light", "dry"]) {
        Some(StatusLevel::Normal)
    } else {
        None
    }
}

fn classify_traffic(status: &str) -> Option<StatusLevel> {
    // "parcialmente interditada" is a partial closure, not a full one.
    if contains_any(status, &["parcial", "partial", "lent", "slow"]) {
        Some(StatusLevel::Attention)
    } else if contains_any(status, &["interditad", "bloquead", "closed", "blocked"]) {
        Some(StatusLevel::Alert)
    } else if contains_any(status, &["liberad", "open", "fluindo", "clear"]) {
        Some(StatusLevel::Normal)
    } else {
        None
    }
}

fn classify_siren(status: &str) -> Option<StatusLevel> {
    if contains_any(status, &["nao acionad", "not triggered", "silenciad", "silent"]) {
        Some(StatusLevel::Normal)
    } else if contains_any(status, &["acionad", "tocando", "triggered", "sounding"]) {
        Some(StatusLevel::Critical)
    } else if contains_any(status, &["ativ", "operante", "active", "armed"]) {
        Some(StatusLevel::Normal)
    } else {
        None
    }
}

fn classify_tourist_point(status: &str) -> Option<StatusLevel> {
    if contains_any(status, &["fechad", "closed"]) {
        Some(StatusLevel::Inactive)
    } else if contains_any(status, &["lotad", "crowded"]) {
        Some(StatusLevel::Attention)
    } else if contains_any(status, &["abert", "open"]) {
        Some(StatusLevel::Normal)
    } else {
        None
    }
}

fn classify_beach(status: &str) -> Option<StatusLevel> {
    // "impropria" contains "propria"; check it first.
    if contains_any(status, &["impropria", "unsuitable", "unfit"]) {
        Some(StatusLevel::Alert)
    } else if contains_any(status, &["propria", "suitable", "fit"]) {
        Some(StatusLevel::Normal)
    } else {
        None
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn has_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

/// Lowercases and strips the Portuguese diacritics used by the feeds.
fn fold(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
