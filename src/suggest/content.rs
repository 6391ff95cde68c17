use std::sync::LazyLock;

use regex::Regex;

macro_rules! shape {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect("valid content shape regex"));
    };
}

shape!(EMAIL, r"^[\w.-]+@[\w.-]+\.\w+$");
shape!(UUID, r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$");
shape!(DATE, r"^\d{4}-\d{2}-\d{2}$|^\d{1,2}/\d{1,2}/\d{2,4}$");
shape!(CURRENCY, r"^\$?\d{1,3}(,\d{3})*(\.\d+)?$");
shape!(DECIMAL, r"^-?\d*(\.\d+)?$");
shape!(PHONE, r"^(\+\d{1,2}\s)?\(?\d{3}\)?[\s.-]\d{3}[\s.-]\d{4}$");
shape!(ZIP_CODE, r"^\d{5}(-\d{4})?$");
shape!(
    URL,
    r"^(https?://)?((([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,})|localhost|(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}))(:\d+)?(/[-a-zA-Z0-9%_.~+]*)*(\?[;&a-zA-Z0-9%_.~+=-]*)?(#[-a-zA-Z0-9_]*)?$"
);
shape!(BOOLEAN, r"(?i)^(true|false|yes|no|1|0)$");
shape!(INTEGER, r"^\d+$");

/// Condition on a lower-cased schema field name.
#[derive(Debug, Clone, Copy)]
pub enum NameGuard {
    Contains(&'static [&'static str]),
    StartsWith(&'static [&'static str]),
    EndsWith(&'static [&'static str]),
    Any(&'static [NameGuard]),
}

impl NameGuard {
    pub fn matches(&self, field_lower: &str) -> bool {
        match self {
            NameGuard::Contains(words) => words.iter().any(|w| field_lower.contains(w)),
            NameGuard::StartsWith(words) => words.iter().any(|w| field_lower.starts_with(w)),
            NameGuard::EndsWith(words) => words.iter().any(|w| field_lower.ends_with(w)),
            NameGuard::Any(guards) => guards.iter().any(|g| g.matches(field_lower)),
        }
    }
}

pub struct ContentRule {
    pub shape: &'static str,
    pub guard: NameGuard,
    pattern: &'static LazyLock<Regex>,
}

impl ContentRule {
    pub fn pattern(&self) -> &Regex {
        self.pattern
    }
}

pub static CONTENT_RULES: &[ContentRule] = &[
    ContentRule {
        shape: "email",
        guard: NameGuard::Contains(&["email", "e-mail"]),
        pattern: &EMAIL,
    },
    ContentRule {
        shape: "uuid",
        guard: NameGuard::Contains(&["uuid", "guid"]),
        pattern: &UUID,
    },
    ContentRule {
        shape: "date",
        guard: NameGuard::Contains(&["date", "time", "dob", "birth", "deadline", "period"]),
        pattern: &DATE,
    },
    ContentRule {
        shape: "currency",
        guard: NameGuard::Contains(&[
            "price", "cost", "amount", "total", "balance", "revenue", "tax", "fee", "salary",
            "budget",
        ]),
        pattern: &CURRENCY,
    },
    ContentRule {
        shape: "decimal",
        guard: NameGuard::Contains(&["percent", "rate", "ratio", "margin"]),
        pattern: &DECIMAL,
    },
    ContentRule {
        shape: "phone",
        guard: NameGuard::Contains(&["phone", "mobile", "fax"]),
        pattern: &PHONE,
    },
    ContentRule {
        shape: "zip_code",
        guard: NameGuard::Contains(&["zip", "postal"]),
        pattern: &ZIP_CODE,
    },
    ContentRule {
        shape: "url",
        guard: NameGuard::Contains(&["url", "website", "link", "image"]),
        pattern: &URL,
    },
    ContentRule {
        shape: "boolean",
        guard: NameGuard::Any(&[
            NameGuard::StartsWith(&["is_", "has_"]),
            NameGuard::Contains(&["flag", "enabled"]),
        ]),
        pattern: &BOOLEAN,
    },
    ContentRule {
        shape: "integer",
        guard: NameGuard::Contains(&["qty", "quantity", "count", "num", "age", "year"]),
        pattern: &INTEGER,
    },
    ContentRule {
        shape: "integer",
        guard: NameGuard::EndsWith(&["id"]),
        pattern: &INTEGER,
    },
];

/// The first rule whose guard accepts `field_name`, if any.
pub fn rule_for_field(field_name: &str) -> Option<&'static ContentRule> {
    let lowered = field_name.to_lowercase();
    CONTENT_RULES.iter().find(|rule| rule.guard.matches(&lowered))
}

/// Fraction of `samples` matching the shape selected by `field_name`.
///
/// Empty samples and field names no rule recognises both score `0.0`.
pub fn content_match_score<S: AsRef<str>>(samples: &[S], field_name: &str) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let Some(rule) = rule_for_field(field_name) else {
        return 0.0;
    };
    let matches = samples
        .iter()
        .filter(|sample| rule.pattern().is_match(sample.as_ref()))
        .count();
    matches as f64 / samples.len() as f64
}
