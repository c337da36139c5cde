//! Source-managed batch execution.
//!
//! Keys sharing a source are folded into one command invocation with
//! `{package_list}` substituted by the space-joined names. The batch has a
//! single outcome: OS package managers do not report per-package results
//! for a combined transaction, so neither does this pipeline. One failing
//! package fails the whole batch's reported outcome.

use super::substitute;
use crate::catalog::Operation;
use crate::core::{Result, UnipakError};
use crate::engine::Engine;
use crate::runner::CommandRunner;

impl Engine {
    /// Run one batched source command for `names` against `source_name`.
    pub(crate) async fn run_source_batch(
        &self,
        source_name: &str,
        names: &[String],
        operation: Operation,
        runner: &dyn CommandRunner,
    ) -> Result<String> {
        let source = self.catalog().source(source_name).ok_or_else(|| {
            UnipakError::SourceNotFound { name: source_name.to_string() }
        })?;
        let template = match operation {
            Operation::Install => &source.install,
            Operation::Update => &source.update,
            Operation::Remove => &source.remove,
        };
        if template.is_empty() {
            return Err(UnipakError::MissingScript {
                name: source_name.to_string(),
                step: operation.step().to_string(),
            });
        }
        let script = substitute(template, "{package_list}", &names.join(" "));
        runner.run(source_name, operation.batch_step(), &script).await?;
        Ok(operation.done_message().to_string())
    }
}
