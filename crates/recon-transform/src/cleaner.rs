//! Table-wide cleaning.
//!
//! The cleaner projects the source table onto the accepted bindings, runs
//! the free-text pass over every bound column, normalizes canonical columns
//! through their field handler, applies cross-field defaults and reports
//! what changed.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use recon_model::{
    CanonicalSchema, CellValue, CleaningIssue, CleaningOptions, CleaningRuleKind, ColumnBinding,
    DefaultValueRule, FieldKind, FieldReport, ModelError, RuleSet, Table,
};
use tracing::{debug, info, info_span};

use crate::error::Result;
use crate::handlers::handler;
use crate::normalization::datetime::ISO_DATE;
use crate::normalization::{collapse_control_whitespace, is_null_token};

/// Before/after pairs kept per issue.
pub const ISSUE_SAMPLE_LIMIT: usize = 5;

/// Result of cleaning one table.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    /// Canonical columns in schema order, then kept extras.
    pub table: Table,
    /// Bindings that fed the table, in output order.
    pub bindings: Vec<ColumnBinding>,
    pub issues: Vec<CleaningIssue>,
    pub reports: Vec<FieldReport>,
}

impl CleanOutcome {
    /// Every canonical field (unmapped ones entirely missing), then extras.
    pub fn complete_table(&self, schema: &CanonicalSchema) -> Result<Table> {
        let mut names: Vec<String> = schema.names().map(str::to_string).collect();
        names.extend(
            self.table
                .columns()
                .iter()
                .filter(|c| !schema.contains(c))
                .cloned(),
        );
        let indices: Vec<Option<usize>> = names
            .iter()
            .map(|name| self.table.column_index(name))
            .collect();
        let mut complete = Table::new(names)?;
        for row in self.table.rows() {
            complete.push_row(
                indices
                    .iter()
                    .map(|idx| idx.map_or(CellValue::Missing, |i| row[i].clone()))
                    .collect(),
            );
        }
        Ok(complete)
    }

    /// Issues whose rule fired on `column`.
    pub fn issues_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CleaningIssue> {
        self.issues.iter().filter(move |issue| issue.column == column)
    }
}

/// One bound column while it is being cleaned.
struct WorkColumn {
    binding: ColumnBinding,
    cells: Vec<CellValue>,
    missing_before: usize,
}

#[derive(Default)]
struct IssueLog {
    issues: Vec<CleaningIssue>,
}

impl IssueLog {
    fn record(
        &mut self,
        column: &str,
        rule: CleaningRuleKind,
        confidence: f32,
        before: &CellValue,
        after: &CellValue,
        marker: &str,
    ) {
        let position = self
            .issues
            .iter()
            .position(|issue| issue.column == column && issue.rule == rule);
        let issue = match position {
            Some(idx) => &mut self.issues[idx],
            None => {
                self.issues.push(CleaningIssue {
                    column: column.to_string(),
                    rule,
                    before_sample: Vec::new(),
                    after_sample: Vec::new(),
                    changed: 0,
                    confidence,
                });
                let last = self.issues.len() - 1;
                &mut self.issues[last]
            }
        };
        issue.changed += 1;
        let before = render(before, marker);
        let after = render(after, marker);
        let seen = issue
            .before_sample
            .iter()
            .zip(&issue.after_sample)
            .any(|(b, a)| *b == before && *a == after);
        if !seen && issue.before_sample.len() < ISSUE_SAMPLE_LIMIT {
            issue.before_sample.push(before);
            issue.after_sample.push(after);
        }
    }
}

fn render(value: &CellValue, marker: &str) -> String {
    value.as_text().unwrap_or(marker).to_string()
}

fn is_raw_missing(value: &CellValue) -> bool {
    value.as_text().is_none_or(is_null_token)
}

/// Applies field normalization and default policies across a mapped table.
#[derive(Debug, Clone)]
pub struct Cleaner {
    schema: CanonicalSchema,
    options: CleaningOptions,
    defaults: BTreeMap<String, DefaultValueRule>,
    today: NaiveDate,
}

impl Cleaner {
    pub fn new(schema: CanonicalSchema, options: CleaningOptions) -> Self {
        Self {
            schema,
            options,
            defaults: BTreeMap::new(),
            today: Local::now().date_naive(),
        }
    }

    /// Use the persisted default-value rules.
    pub fn with_rules(mut self, rules: &RuleSet) -> Self {
        self.defaults = rules.default_values.clone();
        self
    }

    /// Date used by `current_date` default rules.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn options(&self) -> &CleaningOptions {
        &self.options
    }

    fn default_fill_value(&self, rule: &DefaultValueRule) -> String {
        if rule.is_current_date() {
            self.today.format(ISO_DATE).to_string()
        } else {
            rule.value.clone()
        }
    }

    fn default_rule_for(&self, output: &str) -> Option<&DefaultValueRule> {
        self.defaults.get(output).or_else(|| {
            self.defaults
                .iter()
                .find(|(column, _)| column.eq_ignore_ascii_case(output))
                .map(|(_, rule)| rule)
        })
    }

    /// Clean `source` according to `bindings`.
    pub fn clean(&self, source: &Table, bindings: &[ColumnBinding]) -> Result<CleanOutcome> {
        let span = info_span!("clean", rows = source.height(), columns = bindings.len());
        let _guard = span.enter();

        let marker = self.options.missing_marker.as_str();
        let mut log = IssueLog::default();
        let mut work = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let cells: Vec<CellValue> = source
                .column_values(&binding.source_column)
                .ok_or_else(|| ModelError::ColumnNotFound(binding.source_column.clone()))?
                .cloned()
                .collect();
            let missing_before = cells.iter().filter(|c| is_raw_missing(c)).count();
            let mut column = WorkColumn {
                binding: binding.clone(),
                cells,
                missing_before,
            };
            self.clean_text(&mut column, &mut log, marker);
            if let Some(kind) = binding.kind {
                self.normalize_column(&mut column, kind, &mut log, marker);
            }
            debug!(
                column = %binding.output,
                source = %binding.source_column,
                missing_before,
                "normalized column"
            );
            work.push(column);
        }

        self.backfill_addresses(&mut work, &mut log, marker);
        self.fill_defaults(&mut work, &mut log, marker);

        let reports = work
            .iter()
            .filter_map(|column| {
                let kind = column.binding.kind?;
                let handler = handler(kind);
                Some(FieldReport {
                    field: column.binding.output.clone(),
                    source_column: column.binding.source_column.clone(),
                    total: column.cells.len(),
                    missing_before: column.missing_before,
                    missing_after: column.cells.iter().filter(|c| c.is_blank()).count(),
                    invalid_after: column.cells.iter().filter(|c| !handler.validate(c)).count(),
                })
            })
            .collect();

        let (table, bindings) = self.assemble(work, source.height())?;
        info!(
            rows = table.height(),
            columns = table.width(),
            issues = log.issues.len(),
            "cleaning complete"
        );
        Ok(CleanOutcome {
            table,
            bindings,
            issues: log.issues,
            reports,
        })
    }

    fn clean_text(&self, column: &mut WorkColumn, log: &mut IssueLog, marker: &str) {
        let output = column.binding.output.clone();
        for cell in &mut column.cells {
            let Some(text) = cell.as_text() else {
                continue;
            };
            let (rule, cleaned) = if is_null_token(text) {
                (CleaningRuleKind::NullTokens, CellValue::Missing)
            } else {
                let collapsed = collapse_control_whitespace(text);
                if collapsed == text {
                    continue;
                }
                (CleaningRuleKind::WhitespaceCleanup, CellValue::Text(collapsed))
            };
            log.record(&output, rule, 1.0, cell, &cleaned, marker);
            *cell = cleaned;
        }
    }

    fn normalize_column(
        &self,
        column: &mut WorkColumn,
        kind: FieldKind,
        log: &mut IssueLog,
        marker: &str,
    ) {
        let handler = handler(kind);
        let output = column.binding.output.clone();
        for cell in &mut column.cells {
            let normalized = handler.normalize(cell, &self.options);
            if normalized != *cell {
                log.record(&output, handler.rule, handler.confidence, cell, &normalized, marker);
                *cell = normalized;
            }
        }
    }

    /// A missing address inherits the other address column's value.
    fn backfill_addresses(&self, work: &mut [WorkColumn], log: &mut IssueLog, marker: &str) {
        let addresses: Vec<usize> = work
            .iter()
            .enumerate()
            .filter(|(_, c)| c.binding.kind == Some(FieldKind::Address))
            .map(|(idx, _)| idx)
            .collect();
        if addresses.len() < 2 {
            return;
        }
        let snapshot: Vec<Vec<CellValue>> =
            addresses.iter().map(|&idx| work[idx].cells.clone()).collect();
        for (pos, &idx) in addresses.iter().enumerate() {
            let output = work[idx].binding.output.clone();
            for row in 0..work[idx].cells.len() {
                if !work[idx].cells[row].is_blank() {
                    continue;
                }
                let donor = snapshot
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != pos)
                    .find_map(|(_, cells)| cells.get(row).filter(|c| !c.is_blank()));
                if let Some(value) = donor {
                    log.record(
                        &output,
                        CleaningRuleKind::AddressBackfill,
                        0.8,
                        &work[idx].cells[row],
                        value,
                        marker,
                    );
                    work[idx].cells[row] = value.clone();
                }
            }
        }
    }

    /// Country/currency defaults and persisted default-value rules.
    fn fill_defaults(&self, work: &mut [WorkColumn], log: &mut IssueLog, marker: &str) {
        for column in work.iter_mut() {
            let fill = match column.binding.kind {
                Some(FieldKind::Country) => Some(self.options.default_country.clone()),
                Some(FieldKind::Currency) => Some(self.options.default_currency.clone()),
                _ => None,
            }
            .or_else(|| {
                self.default_rule_for(&column.binding.output)
                    .map(|rule| self.default_fill_value(rule))
            });
            let Some(fill) = fill else {
                continue;
            };
            let value = CellValue::Text(fill);
            for cell in &mut column.cells {
                if cell.is_blank() {
                    log.record(
                        &column.binding.output,
                        CleaningRuleKind::DefaultFill,
                        0.8,
                        cell,
                        &value,
                        marker,
                    );
                    *cell = value.clone();
                }
            }
        }
    }

    /// Lay out canonical fields in schema order (constant columns for
    /// unmapped fields with a default rule), then extras in binding order.
    fn assemble(
        &self,
        mut work: Vec<WorkColumn>,
        height: usize,
    ) -> Result<(Table, Vec<ColumnBinding>)> {
        let mut columns: Vec<(String, Vec<CellValue>)> = Vec::new();
        let mut bindings = Vec::new();
        for field in self.schema.fields() {
            let bound = work
                .iter()
                .position(|c| c.binding.is_canonical() && c.binding.output == field.name);
            if let Some(idx) = bound {
                let column = work.remove(idx);
                columns.push((field.name.clone(), column.cells));
                bindings.push(column.binding);
            } else if let Some(rule) = self.default_rule_for(&field.name) {
                debug!(field = %field.name, "emitting default-value column");
                let value = CellValue::Text(self.default_fill_value(rule));
                columns.push((field.name.clone(), vec![value; height]));
            }
        }
        for column in work {
            columns.push((column.binding.output.clone(), column.cells));
            bindings.push(column.binding);
        }

        let mut table = Table::new(columns.iter().map(|(name, _)| name.clone()).collect())?;
        for row in 0..height {
            table.push_row(
                columns
                    .iter()
                    .map(|(_, cells)| cells.get(row).cloned().unwrap_or(CellValue::Missing))
                    .collect(),
            );
        }
        Ok((table, bindings))
    }
}

#[cfg(test)]
mod tests {
    use recon_model::{RULE_TYPE_CONSTANT, RULE_TYPE_CURRENT_DATE};

    use super::*;

    fn schema() -> CanonicalSchema {
        CanonicalSchema::new([
            ("order_id", "", FieldKind::Identifier),
            ("order_date", "", FieldKind::Date),
            ("billing_address", "", FieldKind::Address),
            ("shipping_address", "", FieldKind::Address),
            ("country", "", FieldKind::Country),
            ("channel", "", FieldKind::Text),
        ])
        .unwrap()
    }

    fn bind(source: &str, output: &str, kind: Option<FieldKind>) -> ColumnBinding {
        ColumnBinding {
            source_column: source.to_string(),
            output: output.to_string(),
            kind,
        }
    }

    fn column<'a>(table: &'a Table, name: &str) -> Vec<Option<&'a str>> {
        table
            .column_values(name)
            .unwrap()
            .map(CellValue::as_text)
            .collect()
    }

    #[test]
    fn addresses_backfill_each_other() {
        let source = Table::from_rows(
            &["Bill", "Ship"],
            &[
                vec![Some("12 MG Road"), None],
                vec![Some("N/A"), Some("4 Park St")],
                vec![None, None],
            ],
        )
        .unwrap();
        let outcome = Cleaner::new(schema(), CleaningOptions::default())
            .clean(
                &source,
                &[
                    bind("Bill", "billing_address", Some(FieldKind::Address)),
                    bind("Ship", "shipping_address", Some(FieldKind::Address)),
                ],
            )
            .unwrap();
        assert_eq!(
            column(&outcome.table, "billing_address"),
            [Some("12 MG Road"), Some("4 Park St"), None]
        );
        assert_eq!(
            column(&outcome.table, "shipping_address"),
            [Some("12 MG Road"), Some("4 Park St"), None]
        );
        let report = &outcome.reports[0];
        assert_eq!(report.missing_before, 2);
        assert_eq!(report.missing_after, 1);
        assert_eq!(report.invalid_after, 1);
    }

    #[test]
    fn country_defaults_when_missing() {
        let source = Table::from_rows(&["Country"], &[vec![None], vec![Some("ind")]]).unwrap();
        let outcome = Cleaner::new(schema(), CleaningOptions::default())
            .clean(&source, &[bind("Country", "country", Some(FieldKind::Country))])
            .unwrap();
        assert_eq!(column(&outcome.table, "country"), [Some("India"), Some("India")]);
        assert!(
            outcome
                .issues_for("country")
                .any(|issue| issue.rule == CleaningRuleKind::DefaultFill && issue.changed == 1)
        );
    }

    #[test]
    fn default_rules_fill_and_emit_constant_columns() {
        let mut rules = RuleSet::default();
        rules.default_values.insert(
            "order_date".into(),
            DefaultValueRule {
                value: String::new(),
                rule_type: RULE_TYPE_CURRENT_DATE.into(),
                created_at: String::new(),
            },
        );
        rules.default_values.insert(
            "channel".into(),
            DefaultValueRule {
                value: "web".into(),
                rule_type: RULE_TYPE_CONSTANT.into(),
                created_at: String::new(),
            },
        );
        let today = NaiveDate::from_ymd_opt(2025, 8, 9).unwrap();
        let source = Table::from_rows(&["Order", "Placed"], &[vec![Some("a-12345"), None]]).unwrap();
        let outcome = Cleaner::new(schema(), CleaningOptions::default())
            .with_rules(&rules)
            .with_today(today)
            .clean(
                &source,
                &[
                    bind("Order", "order_id", Some(FieldKind::Identifier)),
                    bind("Placed", "order_date", Some(FieldKind::Date)),
                ],
            )
            .unwrap();
        assert_eq!(outcome.table.columns(), ["order_id", "order_date", "channel"]);
        assert_eq!(column(&outcome.table, "order_date"), [Some("2025-08-09")]);
        assert_eq!(column(&outcome.table, "channel"), [Some("web")]);
        assert_eq!(column(&outcome.table, "order_id"), [Some("A12345")]);
    }

    #[test]
    fn extras_follow_canonical_columns_untouched() {
        let source = Table::from_rows(
            &["Coupon", "Order"],
            &[vec![Some("save10\tnow"), Some("ord-00001")]],
        )
        .unwrap();
        let outcome = Cleaner::new(schema(), CleaningOptions::default())
            .clean(
                &source,
                &[
                    bind("Order", "order_id", Some(FieldKind::Identifier)),
                    bind("Coupon", "coupon_code", None),
                ],
            )
            .unwrap();
        assert_eq!(outcome.table.columns(), ["order_id", "coupon_code"]);
        assert_eq!(column(&outcome.table, "coupon_code"), [Some("save10 now")]);
        assert_eq!(outcome.reports.len(), 1);

        let complete = outcome.complete_table(&schema()).unwrap();
        assert_eq!(complete.width(), schema().len() + 1);
        assert_eq!(complete.cell(0, "country").unwrap(), &CellValue::Missing);
        assert_eq!(complete.cell(0, "coupon_code").unwrap(), &CellValue::text("save10 now"));
    }

    #[test]
    fn unknown_source_column_is_an_error() {
        let source = Table::from_rows(&["A"], &[vec![Some("x")]]).unwrap();
        let result = Cleaner::new(schema(), CleaningOptions::default())
            .clean(&source, &[bind("B", "order_id", Some(FieldKind::Identifier))]);
        assert!(result.is_err());
    }
}
