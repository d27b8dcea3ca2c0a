use anyhow::{Context, Result, bail};
use comfy_table::Table;
use recon_map::JsonRuleStore;
use recon_model::{RULE_TYPE_CONSTANT, RULE_TYPE_CURRENT_DATE};
use tracing::info;

use crate::cli::{CleanArgs, Cli, DefaultArgs, KeepArgs, LearnArgs, MapArgs};
use crate::config::{ConfigOverrides, apply_overrides, load_config};
use crate::pipeline::{
    PipelineContext, PipelineOptions, PipelineResult, default_output_path, run_pipeline,
    suggest_mappings,
};
use crate::summary::{apply_table_style, print_suggestions};

/// Build the shared context from global flags.
pub fn load_context(cli: &Cli) -> Result<PipelineContext> {
    let config = load_config(cli.config.as_deref())?;
    let config = apply_overrides(
        config,
        &ConfigOverrides {
            threshold: cli.threshold,
            fallback_command: cli.fallback_command.clone(),
        },
    );
    let store = JsonRuleStore::new(cli.rules.clone());
    Ok(PipelineContext::load(
        config,
        cli.schema.as_deref(),
        cli.variations.as_deref(),
        Box::new(store),
    ))
}

pub fn run_fields(context: &PipelineContext) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["#", "Field", "Kind", "Description"]);
    apply_table_style(&mut table);
    for field in context.schema.fields() {
        table.add_row(vec![
            (field.position + 1).to_string(),
            field.name.clone(),
            field.kind.as_str().to_string(),
            field.description.clone(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_map(context: &PipelineContext, args: &MapArgs) -> Result<()> {
    let suggestions = suggest_mappings(context, &args.input)?;
    print_suggestions(&suggestions);
    Ok(())
}

pub fn run_clean(context: &PipelineContext, args: &CleanArgs) -> Result<PipelineResult> {
    let output = if args.dry_run {
        None
    } else {
        Some(
            args.output
                .clone()
                .unwrap_or_else(|| default_output_path(&args.input)),
        )
    };
    let options = PipelineOptions {
        input: args.input.clone(),
        output,
        complete_output: args.complete_output.clone().filter(|_| !args.dry_run),
        manual: args.map.clone(),
        keep: args.keep.clone(),
        apply_fixes: args.apply_fixes,
        promote_fixes: args.promote_fixes,
    };
    run_pipeline(context, &options)
}

pub fn run_learn(context: &PipelineContext, args: &LearnArgs) -> Result<()> {
    let field = args.field.trim();
    if !context.schema.contains(field) {
        bail!("unknown field '{field}'; run `recon fields` for the schema");
    }
    context
        .store
        .promote_mapping(&args.source, field, args.confidence)
        .context("save learned mapping")?;
    info!(source = %args.source, field, "learned mapping");
    println!("Learned: {} -> {field}", args.source.trim());
    Ok(())
}

pub fn run_keep(context: &PipelineContext, args: &KeepArgs) -> Result<()> {
    let output = args.name.as_deref().unwrap_or(&args.column);
    if output.trim().is_empty() {
        bail!("output name is empty");
    }
    context
        .store
        .promote_column(&args.column, output)
        .context("save kept column")?;
    println!("Keeping: {} as {}", args.column, output.trim());
    Ok(())
}

pub fn run_default(context: &PipelineContext, args: &DefaultArgs) -> Result<()> {
    let (value, rule_type) = match (&args.value, args.current_date) {
        (_, true) => ("", RULE_TYPE_CURRENT_DATE),
        (Some(value), false) => (value.as_str(), RULE_TYPE_CONSTANT),
        (None, false) => bail!("pass --value or --current-date"),
    };
    context
        .store
        .save_default_value(&args.column, value, rule_type)
        .context("save default value")?;
    println!("Default for {}: {rule_type}", args.column);
    Ok(())
}

pub fn run_rules(context: &PipelineContext) -> Result<()> {
    let rules = context.store.load();
    let json = serde_json::to_string_pretty(&rules).context("serialize rules")?;
    println!("{json}");
    Ok(())
}
