//! Injected rule tables for the import pipeline.
//!
//! Header aliases, floor/process synonyms and category/priority keyword
//! tables are plain data handed to the pipeline at construction time, so
//! tests can substitute fixtures. `DEFAULT_RULES` holds the tables
//! shipped with the worker.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Accepted header variants per canonical spreadsheet field
#[derive(Debug, Clone)]
pub struct ColumnAliases {
    pub date: Vec<String>,
    pub floor: Vec<String>,
    pub wing: Vec<String>,
    pub process: Vec<String>,
    pub location: Vec<String>,
    pub issue_description: Vec<String>,
}

/// One category with its trigger keywords
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

/// Full rule configuration for one import pipeline
#[derive(Debug, Clone)]
pub struct ImportRules {
    pub aliases: ColumnAliases,
    /// Normalized free text -> canonical floor name
    pub floor_synonyms: HashMap<String, String>,
    /// Normalized free text -> canonical process name
    pub process_synonyms: HashMap<String, String>,
    /// Checked in order; first category with a keyword hit wins
    pub categories: Vec<CategoryRule>,
    /// Category used when no keyword matches
    pub fallback_category: String,
    pub urgent_keywords: Vec<String>,
    pub high_keywords: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn synonym_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl Default for ImportRules {
    fn default() -> Self {
        Self {
            aliases: ColumnAliases {
                date: strings(&["date", "request date", "dt"]),
                floor: strings(&["floor", "floor name", "building floor"]),
                wing: strings(&["wing", "side", "section"]),
                process: strings(&["process", "process name", "brand", "tenant"]),
                location: strings(&["location", "area", "spot", "exact location"]),
                issue_description: strings(&[
                    "issue description",
                    "issue",
                    "description",
                    "complaint",
                    "issue details",
                ]),
            },
            floor_synonyms: synonym_map(&[
                ("gf", "ground floor"),
                ("g f", "ground floor"),
                ("ground", "ground floor"),
                ("1st", "1st floor"),
                ("2nd", "2nd floor"),
                ("3rd", "3rd floor"),
                ("4th", "4th floor"),
                ("bsmt", "basement"),
                ("b1", "basement"),
                ("terrace floor", "terrace"),
                ("cafe", "cafeteria"),
                ("canteen", "cafeteria"),
            ]),
            process_synonyms: synonym_map(&[
                ("common", "common area"),
                ("common areas", "common area"),
                ("fnb", "food court"),
                ("f b", "food court"),
            ]),
            categories: vec![
                CategoryRule {
                    category: "Fire Safety".into(),
                    keywords: strings(&[
                        "fire",
                        "extinguisher",
                        "smoke",
                        "sprinkler",
                        "alarm",
                        "emergency exit",
                    ]),
                },
                CategoryRule {
                    category: "Electrical".into(),
                    keywords: strings(&[
                        "light", "lamp", "power", "socket", "switch", "wiring", "electrical", "bulb",
                    ]),
                },
                CategoryRule {
                    category: "Plumbing".into(),
                    keywords: strings(&[
                        "leak", "tap", "water", "drain", "toilet", "flush", "pipe", "washbasin",
                    ]),
                },
                CategoryRule {
                    category: "HVAC".into(),
                    keywords: strings(&[
                        "ac", "air conditioning", "ventilation", "exhaust", "cooling", "chiller",
                    ]),
                },
                CategoryRule {
                    category: "Housekeeping".into(),
                    keywords: strings(&[
                        "clean", "dust", "garbage", "trash", "pest", "stain", "spill",
                    ]),
                },
                CategoryRule {
                    category: "Civil".into(),
                    keywords: strings(&[
                        "wall", "ceiling", "door", "window", "paint", "crack", "tile", "flooring",
                    ]),
                },
            ],
            fallback_category: "Other".into(),
            urgent_keywords: strings(&[
                "fire", "smoke", "gas leak", "spark", "shock", "burning", "short circuit",
            ]),
            high_keywords: strings(&[
                "safety",
                "extinguisher",
                "leak",
                "broken",
                "not working",
                "blocked exit",
                "injury",
            ]),
        }
    }
}

/// Rule tables shipped with the worker, shared across sessions
pub static DEFAULT_RULES: Lazy<ImportRules> = Lazy::new(ImportRules::default);
