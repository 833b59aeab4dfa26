//! `stx print`: render the stacks of every instance as YAML

use std::io::{self, Write};
use std::sync::Arc;

use colored::Colorize;
use serde_json::Value;
use stx_engine::{
    Concurrency, ExcludeFilter, Instance, InstanceHandler, LoadConfig, Loader, ProcessReport,
    Scheduler, UnifyEvaluator, WriterSink,
};

use crate::cli::PrintArgs;
use crate::config::StxConfig;
use crate::render::indented_yaml;
use crate::stacks::StacksIter;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintOptions {
    pub path: Option<String>,
    pub only_errors: bool,
    pub hide_errors: bool,
}

impl From<&PrintArgs> for PrintOptions {
    fn from(args: &PrintArgs) -> Self {
        Self {
            path: args.path.clone().filter(|p| !p.is_empty()),
            only_errors: args.only_errors,
            hide_errors: args.hide_errors,
        }
    }
}

/// Writes one block per instance to stdout.
#[derive(Debug)]
pub struct PrintHandler {
    options: PrintOptions,
}

impl PrintHandler {
    pub fn new(options: PrintOptions) -> Self {
        Self { options }
    }

    /// The whole block for one instance, so it can be written in one go.
    ///
    /// Each stack header is `name:` without a path and `name.path:` with one.
    pub fn render(&self, display_path: &str, value: &Value) -> String {
        let mut out = format!("{}\n", display_path.cyan());
        for stack in StacksIter::new(value) {
            let (document, label) = match &self.options.path {
                Some(path) => match stack.lookup(path) {
                    Some(found) => (found, format!(".{path}:")),
                    None => {
                        tracing::debug!(stack = stack.name, path = %path, "path not found");
                        continue;
                    }
                },
                None => (stack.value, ":".to_string()),
            };

            out.push_str(&format!("{}{}\n", stack.name.magenta(), label.bright_blue()));
            match indented_yaml(document) {
                Ok(yaml) if !self.options.only_errors => out.push_str(&yaml),
                Ok(_) => {}
                Err(err) if !self.options.hide_errors => {
                    out.push_str(&format!("{}\n", format!("  {err}").red()));
                }
                Err(err) => tracing::debug!(stack = stack.name, error = %err, "yaml error hidden"),
            }
        }
        out
    }
}

impl InstanceHandler for PrintHandler {
    fn handle(&self, instance: &Instance, value: &Value) {
        let block = self.render(instance.display_path(), value);
        let mut stdout = io::stdout().lock();
        if let Err(err) = stdout.write_all(block.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::warn!(display_path = instance.display_path(), error = %err, "failed to write output");
        }
    }
}

pub async fn run(args: PrintArgs, config: &StxConfig) -> ProcessReport {
    let sink = Arc::new(WriterSink::stdout().with_color(config.color));
    let loader = Loader::new(LoadConfig::default().with_package(config.package.as_str()));
    let instances = loader.load(&args.args);

    let filter = ExcludeFilter::compile(config.exclude.as_deref(), &*sink);
    let scheduler = Scheduler::new(Arc::new(UnifyEvaluator), sink)
        .with_concurrency(Concurrency::from_limit(config.concurrency));
    let handler = PrintHandler::new(PrintOptions::from(&args));

    scheduler.process(instances, &filter, handler).await
}
