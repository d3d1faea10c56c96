use std::fmt::{Display, Formatter};

/// Coarse POI category derived from a free-text name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Education,
    Health,
    Recreation,
    Religious,
    Commercial,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Education => "Education",
            Category::Health => "Health",
            Category::Recreation => "Recreation",
            Category::Religious => "Religious",
            Category::Commercial => "Commercial",
            Category::Unknown => "Unknown",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered keyword table. First rule whose keyword is a substring of the
/// lower-cased name wins, so a name containing "school" and "market"
/// resolves to Education.
pub const CATEGORY_RULES: &[(&str, Category)] = &[
    ("school", Category::Education),
    ("college", Category::Education),
    ("university", Category::Education),
    ("hospital", Category::Health),
    ("clinic", Category::Health),
    ("pharmacy", Category::Health),
    ("park", Category::Recreation),
    ("garden", Category::Recreation),
    ("mosque", Category::Religious),
    ("masjid", Category::Religious),
    ("church", Category::Religious),
    ("mall", Category::Commercial),
    ("market", Category::Commercial),
    ("shop", Category::Commercial),
];

/// Classify a POI name against [`CATEGORY_RULES`]
///
/// Matching is plain substring containment on the case-folded name
/// ("schoolbag" matches "school"). Empty input yields `Unknown`.
pub fn classify(name: &str) -> Category {
    classify_with(CATEGORY_RULES, name)
}

/// Classify against an arbitrary ordered rule table
pub fn classify_with(rules: &[(&str, Category)], name: &str) -> Category {
    let lower = name.to_lowercase();
    rules
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Unknown)
}
