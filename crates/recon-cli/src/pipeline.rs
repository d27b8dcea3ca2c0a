//! End-to-end processing of one input file.
//!
//! Stages run in order: ingest, type inference, header matching, manual
//! overrides, cleaning, fix detection, fix application and promotion, and
//! output. Everything except ingest and output degrades instead of failing.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use recon_fix::{FixDetector, FixLedger, LedgerEntry, apply_promoted, promote_fix};
use recon_ingest::read_table;
use recon_map::{
    ColumnProfile, CommandFallback, HeaderMatcher, MappingState, RuleStore, TimeoutFallback,
};
use recon_model::{
    CanonicalSchema, ColumnBinding, MappingSuggestion, ReconConfig, RuleSet, Table, TargetedFix,
};
use recon_standards::{VariationTable, default_variations_path, load_schema_or_builtin};
use recon_transform::{CleanOutcome, Cleaner, infer_table, write_csv_file};
use tracing::{debug, info, info_span, trace, warn};

use crate::logging::redact_value;

/// Bulk key for fixes applied with `--apply-fixes`.
pub const APPLY_FIXES_KEY: &str = "apply_fixes";

/// Shared state for every command: schema, variations, configuration and rules.
pub struct PipelineContext {
    pub schema: CanonicalSchema,
    pub variations: VariationTable,
    pub config: ReconConfig,
    pub store: Box<dyn RuleStore>,
}

impl PipelineContext {
    pub fn new(
        schema: CanonicalSchema,
        variations: VariationTable,
        config: ReconConfig,
        store: Box<dyn RuleStore>,
    ) -> Self {
        Self {
            schema,
            variations,
            config,
            store,
        }
    }

    /// Load reference tables from disk, falling back to the built-in ones.
    pub fn load(
        config: ReconConfig,
        schema_path: Option<&Path>,
        variations_path: Option<&Path>,
        store: Box<dyn RuleStore>,
    ) -> Self {
        let schema = load_schema_or_builtin(schema_path);
        let variations = load_variations(variations_path);
        Self::new(schema, variations, config, store)
    }

    /// A matcher over the current schema, seeded with `rules`.
    pub fn matcher(&self, rules: RuleSet) -> HeaderMatcher {
        let matcher = HeaderMatcher::new(
            self.schema.clone(),
            self.variations.clone(),
            self.config.matcher.clone(),
        )
        .with_rules(rules);
        let fallback = &self.config.fallback;
        match &fallback.command {
            Some(command) => {
                let timeout = Duration::from_millis(fallback.timeout_ms);
                debug!(command = %command, timeout_ms = fallback.timeout_ms, "using command fallback");
                let inner = CommandFallback::new(command.clone(), fallback.args.clone(), timeout);
                matcher.with_fallback(Box::new(TimeoutFallback::new(inner, timeout)))
            }
            None => matcher,
        }
    }
}

fn load_variations(path: Option<&Path>) -> VariationTable {
    let explicit = path.is_some();
    let path = path.map_or_else(default_variations_path, Path::to_path_buf);
    if !explicit && !path.exists() {
        return VariationTable::builtin();
    }
    match VariationTable::load_with_overrides(&path) {
        Ok(table) => table,
        Err(error) => {
            warn!(%error, "using built-in header variations");
            VariationTable::builtin()
        }
    }
}

/// Options for one `clean` run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub input: PathBuf,
    /// Cleaned artifact; `None` skips writing.
    pub output: Option<PathBuf>,
    /// Artifact with every canonical field.
    pub complete_output: Option<PathBuf>,
    /// Manual `source column -> field` assignments.
    pub manual: Vec<(String, String)>,
    /// Extra columns to keep, optionally renamed.
    pub keep: Vec<(String, Option<String>)>,
    pub apply_fixes: bool,
    pub promote_fixes: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub input: PathBuf,
    pub suggestions: Vec<MappingSuggestion>,
    pub bindings: Vec<ColumnBinding>,
    pub unmapped_columns: Vec<String>,
    pub outcome: CleanOutcome,
    /// Fixes still open after any application.
    pub fixes: Vec<TargetedFix>,
    pub applied: Vec<LedgerEntry>,
    pub promoted: usize,
    pub output: Option<PathBuf>,
    pub complete_output: Option<PathBuf>,
}

/// Read an input file and return its column profiles.
pub fn profile_input(path: &Path) -> Result<(Table, Vec<ColumnProfile>)> {
    let table = read_table(path).with_context(|| format!("read input {}", path.display()))?;
    let profiles = infer_table(&table)
        .into_iter()
        .map(|(name, ty)| ColumnProfile::new(name, ty))
        .collect();
    Ok((table, profiles))
}

/// Suggestions for an input file, highest confidence first.
pub fn suggest_mappings(context: &PipelineContext, path: &Path) -> Result<Vec<MappingSuggestion>> {
    let (_, profiles) = profile_input(path)?;
    let matcher = context.matcher(context.store.load());
    Ok(matcher.match_columns(&profiles))
}

pub fn run_pipeline(context: &PipelineContext, options: &PipelineOptions) -> Result<PipelineResult> {
    let span = info_span!("pipeline", input = %options.input.display());
    let _guard = span.enter();
    let started = Instant::now();

    let (source, profiles) = profile_input(&options.input)?;
    info!(rows = source.height(), columns = source.width(), "ingested input");

    let rules = context.store.load();
    let matcher = context.matcher(rules.clone());
    let suggestions = matcher.match_columns(&profiles);
    let mapped = suggestions.iter().filter(|s| s.is_mapped()).count();
    info!(mapped, total = suggestions.len(), "matched headers");

    let mut state = MappingState::new(
        context.schema.clone(),
        source.columns().to_vec(),
        suggestions.clone(),
    );
    for (column, field) in &options.manual {
        state
            .accept_manual(field, column)
            .with_context(|| format!("map {column} to {field}"))?;
    }
    for (column, name) in &options.keep {
        let output = name.as_deref().unwrap_or(column);
        state
            .keep_extra(column, output)
            .with_context(|| format!("keep {column} as {output}"))?;
    }
    let bindings = state.bindings();
    let unmapped_columns = state
        .unmapped_columns()
        .into_iter()
        .map(str::to_string)
        .collect();

    let cleaner = Cleaner::new(context.schema.clone(), context.config.cleaning.clone())
        .with_rules(&rules);
    let mut outcome = cleaner
        .clean(&source, &bindings)
        .context("clean mapped table")?;

    let detector = FixDetector::new(context.config.cleaning.clone());
    let mut ledger = FixLedger::new();
    let detected = detector.detect(&outcome.table, &outcome.bindings);
    for fix in &detected {
        trace!(
            kind = %fix.kind,
            column = %fix.column,
            row = fix.row,
            value = redact_value(&fix.current_value),
            "detected fix"
        );
    }

    let mut promoted = 0;
    if options.promote_fixes {
        for fix in &detected {
            match promote_fix(context.store.as_ref(), fix) {
                Ok(_) => promoted += 1,
                Err(error) => warn!(%error, kind = %fix.kind, column = %fix.column, "fix not promoted"),
            }
        }
    }

    if let Err(error) = apply_promoted(&mut ledger, &mut outcome.table, &rules, &detected) {
        warn!(%error, "skipping promoted cleaning rules");
    }
    if options.apply_fixes {
        let open = detector.detect(&outcome.table, &outcome.bindings);
        if !open.is_empty() {
            ledger
                .apply_bulk(&mut outcome.table, APPLY_FIXES_KEY, &open)
                .context("apply detected fixes")?;
        }
    }
    let fixes = detector.detect(&outcome.table, &outcome.bindings);

    if let Some(path) = &options.output {
        write_csv_file(&outcome.table, path, &context.config.cleaning.missing_marker)
            .with_context(|| format!("write cleaned output {}", path.display()))?;
    }
    if let Some(path) = &options.complete_output {
        let complete = outcome
            .complete_table(&context.schema)
            .context("build complete output")?;
        write_csv_file(&complete, path, &context.config.cleaning.missing_marker)
            .with_context(|| format!("write complete output {}", path.display()))?;
    }

    info!(
        fixes_open = fixes.len(),
        fixes_applied = ledger.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pipeline complete"
    );
    Ok(PipelineResult {
        input: options.input.clone(),
        suggestions,
        bindings,
        unmapped_columns,
        outcome,
        fixes,
        applied: ledger.entries().to_vec(),
        promoted,
        output: options.output.clone(),
        complete_output: options.complete_output.clone(),
    })
}

/// `orders.csv` -> `orders_cleaned.csv` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_cleaned.csv"))
}
