use chrono::NaiveDate;
use itertools::Itertools;
use log::debug;

use crate::{
    data::{is_blank, parse_calendar_date, parse_date, parse_datetime},
    mapping::Mapping,
    schema::{CrossFieldRule, FieldType, PredefinedSchema, RuleType, SchemaField},
    source::RawTable,
};

/// Appends one error per violated rule, in rule declaration order.
pub(crate) fn apply_rules(
    schema: &PredefinedSchema,
    mapping: &Mapping,
    sample: &RawTable,
    today: NaiveDate,
    errors: &mut Vec<String>,
) {
    for rule in &schema.cross_field_rules {
        let outcome = match rule.rule_type {
            RuleType::NotFuture => not_future(rule, schema, mapping, sample, today),
            RuleType::DateOrder => date_order(rule, schema, mapping, sample),
            RuleType::ConditionalRequired => conditional_required(rule, schema, mapping, sample),
        };
        match outcome {
            Some(Some(error)) => errors.push(error),
            Some(None) => {}
            None => debug!("Skipping rule '{}' ({})", rule.name, rule.rule_type.as_str()),
        }
    }
}

struct Bound<'a> {
    field: &'a SchemaField,
    column: &'a str,
    values: Vec<&'a str>,
}

fn bind<'a>(
    name: Option<&str>,
    schema: &'a PredefinedSchema,
    mapping: &'a Mapping,
    sample: &'a RawTable,
) -> Option<Bound<'a>> {
    let field = schema.field_by_name(name?)?;
    let column = mapping.column_for(&field.name)?;
    let values = sample.column(column)?;
    Some(Bound {
        field,
        column,
        values,
    })
}

fn calendar_date(field_type: FieldType, value: &str) -> Option<NaiveDate> {
    match field_type {
        FieldType::DateTime => parse_datetime(value).map(|dt| dt.date()),
        _ => parse_date(value),
    }
}

/// `None` when the rule does not apply; otherwise the error it raised, if any.
type RuleOutcome = Option<Option<String>>;

fn not_future(
    rule: &CrossFieldRule,
    schema: &PredefinedSchema,
    mapping: &Mapping,
    sample: &RawTable,
    today: NaiveDate,
) -> RuleOutcome {
    let bound = bind(Some(rule.field_a.as_str()), schema, mapping, sample)?;
    if !bound.field.field_type.is_temporal() {
        return None;
    }
    let violation = bound.values.iter().find(|value| {
        calendar_date(bound.field.field_type, value).is_some_and(|date| date > today)
    });
    Some(violation.map(|value| {
        format!(
            "Field '{}' (column '{}') has value '{value}' in the future (rule: {}).",
            bound.field.name, bound.column, rule.name
        )
    }))
}

fn date_order(
    rule: &CrossFieldRule,
    schema: &PredefinedSchema,
    mapping: &Mapping,
    sample: &RawTable,
) -> RuleOutcome {
    let earlier = bind(Some(rule.field_a.as_str()), schema, mapping, sample)?;
    let later = bind(rule.field_b.as_deref(), schema, mapping, sample)?;
    if !earlier.field.field_type.is_temporal() || !later.field.field_type.is_temporal() {
        return None;
    }
    let violation = earlier
        .values
        .iter()
        .zip(&later.values)
        .find(|(a, b)| match (parse_calendar_date(a), parse_calendar_date(b)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        });
    Some(violation.map(|(a, b)| {
        format!(
            "Rule '{}' violated: '{}' ({a}) should be on or before '{}' ({b}).",
            rule.name, earlier.field.name, later.field.name
        )
    }))
}

fn conditional_required(
    rule: &CrossFieldRule,
    schema: &PredefinedSchema,
    mapping: &Mapping,
    sample: &RawTable,
) -> RuleOutcome {
    let trigger = bind(Some(rule.field_a.as_str()), schema, mapping, sample)?;
    let dependent = bind(rule.field_b.as_deref(), schema, mapping, sample)?;
    let triggers = rule.trigger_values();
    let violated = trigger
        .values
        .iter()
        .zip(&dependent.values)
        .any(|(a, b)| triggers.iter().any(|t| t == a) && is_blank(b));
    Some(violated.then(|| {
        let listed = triggers.iter().map(|t| format!("'{t}'")).join(", ");
        format!(
            "Rule '{}' violated: when '{}' is one of [{listed}], '{}' must be non-empty.",
            rule.name, trigger.field.name, dependent.field.name
        )
    }))
}
