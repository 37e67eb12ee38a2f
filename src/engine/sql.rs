//! Statement text rendering.
//!
//! Every piece of SQL this crate generates funnels through these
//! functions, so the quote-iff-textual contract lives in exactly one
//! place and can later be swapped for parameterized binding without
//! touching call sites. Content is interpolated without escaping; see
//! the crate-level security note.

use crate::models::{SqlValue, Where};

/// Substitutes positional `$0,$1,…` placeholders into `text`.
///
/// One replacement per index, in ascending index order: each argument
/// replaces the **first** occurrence of its own `$N` token with its
/// unquoted textual form. Repeated occurrences and indexes beyond the
/// argument list are left verbatim. Substitution is raw text insertion;
/// the caller controls surrounding quoting and syntax. The token match
/// is plain text, so `$1` also matches the prefix of `$10`; statements
/// with ten or more placeholders must account for that.
///
/// # Examples
///
/// ```
/// use sysdb::engine::sql::substitute_args;
/// use sysdb::SqlValue;
///
/// let q = substitute_args(
///     "SELECT $0 FROM $1 WHERE $2 = $3",
///     &["col".into(), "tbl".into(), "user_id".into(), SqlValue::Int(1)],
/// );
/// assert_eq!(q, "SELECT col FROM tbl WHERE user_id = 1");
/// ```
#[must_use]
pub fn substitute_args(text: &str, args: &[SqlValue]) -> String {
    let mut out = text.to_string();
    for (i, value) in args.iter().enumerate() {
        let token = format!("${i}");
        if let Some(pos) = out.find(&token) {
            out.replace_range(pos..pos + token.len(), &value.raw());
        }
    }
    out
}

/// Renders the mapping shorthand: one equality per pair, in supplied
/// order, joined with `" AND "`.
#[must_use]
pub fn render_pairs(pairs: &[(String, SqlValue)], quote: char) -> String {
    let parts: Vec<String> = pairs
        .iter()
        .map(|(col, val)| format!("{col}={}", val.render(quote)))
        .collect();
    parts.join(" AND ")
}

/// Renders any accepted WHERE form to predicate text (without the
/// leading `WHERE` keyword).
#[must_use]
pub fn render_where(clause: &Where, quote: char) -> String {
    match clause {
        Where::Criterion(c) => c.to_text(),
        Where::Group(g) => g.to_text(),
        Where::Pairs(pairs) => render_pairs(pairs, quote),
    }
}

/// Renders `SET col=val,…` assignments in supplied order.
#[must_use]
pub fn render_assignments(pairs: &[(String, SqlValue)], quote: char) -> String {
    let parts: Vec<String> = pairs
        .iter()
        .map(|(col, val)| format!("{col}={}", val.render(quote)))
        .collect();
    parts.join(",")
}

/// Renders a full `INSERT INTO t (cols…) VALUES (vals…)` statement.
#[must_use]
pub fn render_insert(table: &str, row: &[(String, SqlValue)], quote: char) -> String {
    let cols: Vec<&str> = row.iter().map(|(c, _)| c.as_str()).collect();
    let vals: Vec<String> = row.iter().map(|(_, v)| v.render(quote)).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        cols.join(","),
        vals.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criterion, CriterionGroup};

    #[test]
    fn substitution_replaces_first_occurrence_per_index() {
        assert_eq!(substitute_args("$0 $0", &["x".into()]), "x $0");
        assert_eq!(
            substitute_args("$0 $1 $0", &["a".into(), "b".into()]),
            "a b $0"
        );
    }

    #[test]
    fn substitution_index_token_matches_as_plain_text() {
        // $1 matches the prefix of $10, leaving the trailing digit.
        assert_eq!(substitute_args("$10", &["a".into(), "b".into()]), "b0");
    }

    #[test]
    fn substitution_leaves_unmatched_placeholders() {
        assert_eq!(substitute_args("a $0 b $5", &["x".into()]), "a x b $5");
    }

    #[test]
    fn substitution_is_raw_text() {
        // Text arguments are inserted without quotes.
        assert_eq!(
            substitute_args("SELECT $0", &["name".into()]),
            "SELECT name"
        );
    }

    #[test]
    fn pairs_expand_in_order_with_and() {
        let pairs = vec![
            ("user_id".to_string(), SqlValue::Int(1)),
            ("active".to_string(), SqlValue::Int(1)),
            ("role".to_string(), SqlValue::from("admin")),
        ];
        assert_eq!(
            render_pairs(&pairs, '\''),
            "user_id=1 AND active=1 AND role='admin'"
        );
    }

    #[test]
    fn where_forms_render_consistently() {
        let c = Criterion::new("id", "=", 1);
        assert_eq!(render_where(&c.clone().into(), '\''), "(id = 1)");

        let g = CriterionGroup::of(c).and(Criterion::new("x", ">", 2));
        assert_eq!(
            render_where(&g.into(), '\''),
            "((id = 1) AND (x > 2))"
        );

        let w = Where::pairs([("a", 1i64)]);
        assert_eq!(render_where(&w, '\''), "a=1");
    }

    #[test]
    fn insert_renders_columns_and_values_in_order() {
        let row = vec![
            ("name".to_string(), SqlValue::from("tz")),
            ("value".to_string(), SqlValue::Int(2)),
        ];
        assert_eq!(
            render_insert("zf101_configuration", &row, '\''),
            "INSERT INTO zf101_configuration (name,value) VALUES ('tz',2)"
        );
    }

    #[test]
    fn assignments_join_with_comma() {
        let row = vec![
            ("seq".to_string(), SqlValue::Int(0)),
            ("note".to_string(), SqlValue::from("x")),
        ];
        assert_eq!(render_assignments(&row, '\''), "seq=0,note='x'");
    }
}
